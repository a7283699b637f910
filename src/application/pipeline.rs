//! Forecast pipeline orchestrator.
//!
//! One tick runs fetch → indicators → features → predict → decide →
//! persist, sequentially. The market-hours gate precedes the fetch and
//! turns a closed market into a skip, not a failure. Persistence happens
//! only after the latest feature vector is confirmed extractable, so the
//! store never holds a bar window that cannot produce a signal. The bar
//! replace and the signal append remain two independent effects: a failure
//! between them leaves bars refreshed with no signal row, never a partial
//! signal.

use crate::application::{features, indicators};
use crate::application::predictor::PredictionService;
use crate::domain::decision::{self, DecisionConfig};
use crate::domain::errors::PipelineError;
use crate::domain::market::{BarInterval, IndicatorBar, TradingSession};
use crate::domain::ports::BarSource;
use crate::domain::repositories::{BarRepository, SignalRepository};
use crate::domain::signal::Signal;
use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// What to fetch and how far back.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub symbol: String,
    pub interval: BarInterval,
    pub lookback_days: u32,
}

/// Outcome of one scheduled tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Completed(Signal),
    /// Outside the configured trading window. Nothing fetched or written.
    SkippedMarketClosed,
    /// A tick for this symbol is still in flight. Nothing fetched or written.
    SkippedTickInFlight,
}

pub struct ForecastPipeline {
    settings: PipelineSettings,
    source: Arc<dyn BarSource>,
    models: Arc<dyn PredictionService>,
    bars: Arc<dyn BarRepository>,
    signals: Arc<dyn SignalRepository>,
    session: TradingSession,
    decision: DecisionConfig,
    // At most one in-flight tick per symbol; two concurrent ticks would
    // race on the full-table bar replace.
    run_lock: Mutex<()>,
}

impl ForecastPipeline {
    pub fn new(
        settings: PipelineSettings,
        source: Arc<dyn BarSource>,
        models: Arc<dyn PredictionService>,
        bars: Arc<dyn BarRepository>,
        signals: Arc<dyn SignalRepository>,
        session: TradingSession,
        decision: DecisionConfig,
    ) -> Self {
        Self {
            settings,
            source,
            models,
            bars,
            signals,
            session,
            decision,
            run_lock: Mutex::new(()),
        }
    }

    /// Run one tick. Component failures are returned to the caller after
    /// logging; they never partially persist a signal and never take the
    /// process down — the next scheduled tick still runs.
    pub async fn run_tick(&self) -> Result<TickOutcome> {
        let Ok(_guard) = self.run_lock.try_lock() else {
            warn!(
                symbol = %self.settings.symbol,
                "Tick already in flight, skipping"
            );
            return Ok(TickOutcome::SkippedTickInFlight);
        };

        if !self.session.is_open_at(Utc::now()) {
            debug!(symbol = %self.settings.symbol, "Market closed, skipping tick");
            return Ok(TickOutcome::SkippedMarketClosed);
        }

        match self.execute_tick().await {
            Ok(signal) => Ok(TickOutcome::Completed(signal)),
            Err(e) => {
                error!(
                    symbol = %self.settings.symbol,
                    timestamp = Utc::now().timestamp(),
                    "Tick aborted: {e:#}"
                );
                Err(e)
            }
        }
    }

    async fn execute_tick(&self) -> Result<Signal> {
        let settings = &self.settings;

        let bars = self
            .source
            .fetch(&settings.symbol, settings.interval, settings.lookback_days)
            .await
            .context("fetch stage")?;
        if bars.is_empty() {
            return Err(PipelineError::NoDataAvailable {
                symbol: settings.symbol.clone(),
            }
            .into());
        }
        debug!(symbol = %settings.symbol, bars = bars.len(), "Fetched bar window");

        let enriched = indicators::enrich(&bars);
        let row = features::latest(&enriched).context("featurize stage")?;

        let prediction = self.models.predict(&row.features).context("predict stage")?;

        let signal = decision::decide(
            row.timestamp,
            row.close,
            prediction.predicted_price,
            prediction.probability_up,
            row.volatility,
            &self.decision,
        );

        // The feature vector is confirmed extractable; only now touch the
        // store. Rows with unsatisfied windows are not persisted.
        let complete: Vec<IndicatorBar> =
            enriched.into_iter().filter(IndicatorBar::is_complete).collect();
        self.bars
            .replace_all(&settings.symbol, &complete)
            .await
            .map_err(|e| PipelineError::StoreUnavailable {
                reason: format!("bar replace: {e:#}"),
            })?;
        self.signals
            .append(&signal)
            .await
            .map_err(|e| PipelineError::StoreUnavailable {
                reason: format!("signal append: {e:#}"),
            })?;

        info!(
            symbol = %settings.symbol,
            action = %signal.trade_action,
            direction = %signal.direction,
            probability_up = signal.probability_up,
            expected_return_percent = signal.expected_return_percent,
            "Tick completed"
        );
        Ok(signal)
    }

    /// Compute a signal from the latest *stored* features, without writing
    /// anything. Serves the on-demand `/predict` endpoint.
    pub async fn predict_on_demand(&self) -> Result<Signal> {
        let rows = self
            .bars
            .all_ordered(&self.settings.symbol)
            .await
            .map_err(|e| PipelineError::StoreUnavailable {
                reason: format!("bar read: {e:#}"),
            })?;
        let row = features::latest(&rows)?;
        let prediction = self.models.predict(&row.features)?;

        Ok(decision::decide(
            row.timestamp,
            row.close,
            prediction.predicted_price,
            prediction.probability_up,
            row.volatility,
            &self.decision,
        ))
    }
}

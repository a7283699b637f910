//! End-to-end tick flow against an in-memory store and a mock bar source.

use chrono::{FixedOffset, NaiveTime, Utc};
use intracast::application::pipeline::{ForecastPipeline, PipelineSettings, TickOutcome};
use intracast::application::query::QueryService;
use intracast::domain::errors::PipelineError;
use intracast::domain::market::{BarInterval, TradingSession};
use intracast::domain::repositories::{BarRepository, SignalRepository};
use intracast::domain::signal::{TradeAction, VolatilityClass};
use intracast::infrastructure::mock::{MockBarSource, StaticPredictionService, synthetic_bars};
use intracast::infrastructure::persistence::{
    Database, SqliteBarRepository, SqliteSignalRepository,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const SYMBOL: &str = "TEST";

fn open_session() -> TradingSession {
    TradingSession::new(
        FixedOffset::east_opt(0).unwrap(),
        NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(23, 59, 59).unwrap(),
        false,
        HashSet::new(),
    )
}

fn closed_session() -> TradingSession {
    // Today is a holiday: deterministically closed whenever the test runs.
    let mut holidays = HashSet::new();
    holidays.insert(Utc::now().date_naive());
    TradingSession::new(
        FixedOffset::east_opt(0).unwrap(),
        NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(23, 59, 59).unwrap(),
        false,
        holidays,
    )
}

struct Harness {
    pipeline: Arc<ForecastPipeline>,
    bars: Arc<SqliteBarRepository>,
    signals: Arc<SqliteSignalRepository>,
}

async fn harness(source: MockBarSource, session: TradingSession, prob_up: f64) -> Harness {
    let db = Database::new("sqlite::memory:").await.unwrap();
    let bars = Arc::new(SqliteBarRepository::new(db.pool.clone()));
    let signals = Arc::new(SqliteSignalRepository::new(db.pool.clone()));

    let pipeline = Arc::new(ForecastPipeline::new(
        PipelineSettings {
            symbol: SYMBOL.to_string(),
            interval: BarInterval::FifteenMinutes,
            lookback_days: 30,
        },
        Arc::new(source),
        Arc::new(StaticPredictionService::new(0.01, prob_up)),
        bars.clone(),
        signals.clone(),
        session,
        Default::default(),
    ));

    Harness {
        pipeline,
        bars,
        signals,
    }
}

#[tokio::test]
async fn test_tick_persists_bars_and_signal() {
    let window = synthetic_bars(60, 100.0);
    let h = harness(MockBarSource::new(window.clone()), open_session(), 0.70).await;

    let outcome = h.pipeline.run_tick().await.unwrap();
    let TickOutcome::Completed(signal) = outcome else {
        panic!("expected completed tick, got {outcome:?}");
    };

    // A steady drift with a one-percent predicted move and clear
    // probability is a BUY in a low-volatility regime.
    assert_eq!(signal.trade_action, TradeAction::Buy);
    assert_eq!(signal.volatility_class, VolatilityClass::Low);
    assert_eq!(signal.current_price, window.last().unwrap().close);
    assert_eq!(signal.timestamp, window.last().unwrap().timestamp);

    // Only rows with every indicator window satisfied are persisted.
    assert_eq!(h.bars.count(SYMBOL).await.unwrap(), 60 - 33);
    assert_eq!(h.signals.count().await.unwrap(), 1);

    let stored = h.signals.list_ordered().await.unwrap();
    assert_eq!(stored[0], signal);
}

#[tokio::test]
async fn test_closed_market_tick_writes_nothing() {
    let h = harness(
        MockBarSource::new(synthetic_bars(60, 100.0)),
        closed_session(),
        0.70,
    )
    .await;

    let outcome = h.pipeline.run_tick().await.unwrap();
    assert_eq!(outcome, TickOutcome::SkippedMarketClosed);
    assert_eq!(h.bars.count(SYMBOL).await.unwrap(), 0);
    assert_eq!(h.signals.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_short_window_aborts_with_insufficient_data() {
    let h = harness(
        MockBarSource::new(synthetic_bars(20, 100.0)),
        open_session(),
        0.70,
    )
    .await;

    let err = h.pipeline.run_tick().await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::InsufficientData { bars: 20, .. })
    ));

    // Nothing was persisted: the failure came before the store stage.
    assert_eq!(h.bars.count(SYMBOL).await.unwrap(), 0);
    assert_eq!(h.signals.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_empty_source_aborts_with_no_data() {
    let h = harness(MockBarSource::new(vec![]), open_session(), 0.70).await;

    let err = h.pipeline.run_tick().await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::NoDataAvailable { .. })
    ));
    assert_eq!(h.bars.count(SYMBOL).await.unwrap(), 0);
    assert_eq!(h.signals.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_rerun_identical_window_yields_identical_signal() {
    let h = harness(
        MockBarSource::new(synthetic_bars(60, 100.0)),
        open_session(),
        0.60,
    )
    .await;

    let TickOutcome::Completed(first) = h.pipeline.run_tick().await.unwrap() else {
        panic!("first tick did not complete");
    };
    let TickOutcome::Completed(second) = h.pipeline.run_tick().await.unwrap() else {
        panic!("second tick did not complete");
    };

    assert_eq!(first, second);
    // Bars were replaced, not duplicated; signals append per tick.
    assert_eq!(h.bars.count(SYMBOL).await.unwrap(), 60 - 33);
    assert_eq!(h.signals.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_concurrent_tick_is_skipped() {
    let h = harness(
        MockBarSource::with_delay(synthetic_bars(60, 100.0), Duration::from_millis(300)),
        open_session(),
        0.70,
    )
    .await;

    let (a, b) = tokio::join!(h.pipeline.run_tick(), h.pipeline.run_tick());
    let outcomes = [a.unwrap(), b.unwrap()];

    let completed = outcomes
        .iter()
        .filter(|o| matches!(o, TickOutcome::Completed(_)))
        .count();
    let skipped = outcomes
        .iter()
        .filter(|o| matches!(o, TickOutcome::SkippedTickInFlight))
        .count();
    assert_eq!((completed, skipped), (1, 1));
    assert_eq!(h.signals.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_on_demand_prediction_matches_tick_without_writing() {
    let h = harness(
        MockBarSource::new(synthetic_bars(60, 100.0)),
        open_session(),
        0.70,
    )
    .await;

    let TickOutcome::Completed(ticked) = h.pipeline.run_tick().await.unwrap() else {
        panic!("tick did not complete");
    };

    // On-demand prediction reads the stored window and must reproduce the
    // tick's signal exactly, without appending anything.
    let on_demand = h.pipeline.predict_on_demand().await.unwrap();
    assert_eq!(on_demand, ticked);
    assert_eq!(h.signals.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_on_demand_prediction_on_empty_store_is_insufficient_data() {
    let h = harness(MockBarSource::new(vec![]), open_session(), 0.70).await;

    let err = h.pipeline.predict_on_demand().await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::InsufficientData { bars: 0, .. })
    ));
}

#[tokio::test]
async fn test_query_layer_over_persisted_ticks() {
    let h = harness(
        MockBarSource::new(synthetic_bars(60, 100.0)),
        open_session(),
        0.70,
    )
    .await;
    let query = QueryService::new(h.bars.clone(), h.signals.clone(), 252.0 * 25.0);

    // Empty store: documented empty result, not a failure.
    assert!(query.performance().await.unwrap().is_none());

    h.pipeline.run_tick().await.unwrap();
    h.pipeline.run_tick().await.unwrap();

    let report = query.performance().await.unwrap().unwrap();
    assert_eq!(report.series.len(), 2);
    // Identical per-tick returns: cumulative sum doubles, variance is zero,
    // Sharpe reads 0 rather than NaN.
    let first = report.series[0].cumulative_pnl;
    assert!((report.series[1].cumulative_pnl - 2.0 * first).abs() < 1e-9);
    assert_eq!(report.sharpe_ratio, 0.0);

    let history = query.historical(SYMBOL, 10).await.unwrap();
    assert_eq!(history.len(), 10);
    assert!(history.windows(2).all(|w| w[0].bar.timestamp < w[1].bar.timestamp));

    let signals = query.signals().await.unwrap();
    assert_eq!(signals.len(), 2);
}

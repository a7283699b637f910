//! In-memory test doubles for the pipeline's ports.

use crate::application::predictor::{Prediction, PredictionService};
use crate::domain::errors::PipelineError;
use crate::domain::market::{Bar, BarInterval};
use crate::domain::ml::FeatureVector;
use crate::domain::ports::BarSource;
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Bar source returning a canned window; empty windows reproduce the
/// upstream `NoDataAvailable` contract.
pub struct MockBarSource {
    bars: Vec<Bar>,
    delay: Option<Duration>,
}

impl MockBarSource {
    pub fn new(bars: Vec<Bar>) -> Self {
        Self { bars, delay: None }
    }

    /// Simulate a slow upstream, for run-lock tests.
    pub fn with_delay(bars: Vec<Bar>, delay: Duration) -> Self {
        Self {
            bars,
            delay: Some(delay),
        }
    }
}

#[async_trait]
impl BarSource for MockBarSource {
    async fn fetch(
        &self,
        symbol: &str,
        _interval: BarInterval,
        _lookback_days: u32,
    ) -> Result<Vec<Bar>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.bars.is_empty() {
            return Err(PipelineError::NoDataAvailable {
                symbol: symbol.to_string(),
            }
            .into());
        }
        Ok(self.bars.clone())
    }
}

/// Prediction service returning a fixed price offset and probability.
pub struct StaticPredictionService {
    /// Predicted price = close * (1 + return_fraction).
    pub return_fraction: f64,
    pub probability_up: f64,
}

impl StaticPredictionService {
    pub fn new(return_fraction: f64, probability_up: f64) -> Self {
        Self {
            return_fraction,
            probability_up,
        }
    }
}

impl PredictionService for StaticPredictionService {
    fn predict(&self, features: &FeatureVector) -> Result<Prediction> {
        Ok(Prediction {
            predicted_price: features.close * (1.0 + self.return_fraction),
            probability_up: self.probability_up,
        })
    }
}

/// Generate a synthetic intraday series with mild structure, long enough to
/// satisfy every indicator window.
pub fn synthetic_bars(count: usize, start_close: f64) -> Vec<Bar> {
    (0..count)
        .map(|i| {
            let close = start_close + i as f64 * 0.5 + (i as f64 * 0.9).sin() * 2.0;
            Bar {
                timestamp: 1_700_000_000 + i as i64 * 900,
                open: close - 0.3,
                high: close + 1.5,
                low: close - 1.5,
                close,
                volume: 10_000.0 + i as f64 * 10.0,
            }
        })
        .collect()
}

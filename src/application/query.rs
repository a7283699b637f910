//! Read-side query and aggregation.
//!
//! Holds read-only repository references; never writes. The bar table is
//! replaced wholesale by the pipeline, so a reader racing a tick may see a
//! transiently short window — acceptable staleness, eventually consistent.

use crate::domain::market::IndicatorBar;
use crate::domain::repositories::{BarRepository, SignalRepository};
use crate::domain::signal::Signal;
use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformancePoint {
    pub timestamp: i64,
    pub cumulative_pnl: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceReport {
    pub series: Vec<PerformancePoint>,
    pub sharpe_ratio: f64,
}

pub struct QueryService {
    bars: Arc<dyn BarRepository>,
    signals: Arc<dyn SignalRepository>,
    periods_per_year: f64,
}

impl QueryService {
    pub fn new(
        bars: Arc<dyn BarRepository>,
        signals: Arc<dyn SignalRepository>,
        periods_per_year: f64,
    ) -> Self {
        Self {
            bars,
            signals,
            periods_per_year,
        }
    }

    /// The last `limit` persisted bars, newest last.
    pub async fn historical(&self, symbol: &str, limit: usize) -> Result<Vec<IndicatorBar>> {
        self.bars.recent(symbol, limit).await
    }

    /// All persisted signals in timestamp order.
    pub async fn signals(&self) -> Result<Vec<Signal>> {
        self.signals.list_ordered().await
    }

    /// Cumulative P&L series and annualized Sharpe ratio, treating each
    /// signal's expected return as a realized per-tick return. `None` when
    /// no signals exist yet — callers present that as an empty result, not
    /// a failure.
    pub async fn performance(&self) -> Result<Option<PerformanceReport>> {
        let signals = self.signals.list_ordered().await?;
        if signals.is_empty() {
            return Ok(None);
        }

        let returns: Vec<f64> = signals.iter().map(|s| s.expected_return_percent).collect();
        let mut cumulative = 0.0;
        let series = signals
            .iter()
            .map(|s| {
                cumulative += s.expected_return_percent;
                PerformancePoint {
                    timestamp: s.timestamp,
                    cumulative_pnl: cumulative,
                }
            })
            .collect();

        Ok(Some(PerformanceReport {
            series,
            sharpe_ratio: sharpe_ratio(&returns, self.periods_per_year),
        }))
    }
}

/// Annualized Sharpe ratio: `mean / std * sqrt(periods_per_year)`, with the
/// sample standard deviation (n - 1). Zero-variance and short series read
/// 0.0, never NaN. Rounded to three decimals.
pub fn sharpe_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std_dev = variance.sqrt();
    if std_dev <= 1e-12 {
        return 0.0;
    }

    let sharpe = mean / std_dev * periods_per_year.sqrt();
    (sharpe * 1000.0).round() / 1000.0
}

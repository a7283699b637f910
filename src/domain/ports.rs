use crate::domain::market::{Bar, BarInterval};
use anyhow::Result;
use async_trait::async_trait;

/// Market data source supplying raw OHLCV bars.
///
/// Implementations must return bars strictly ordered by timestamp with no
/// duplicates, and fail with [`PipelineError::NoDataAvailable`] when the
/// upstream returns nothing.
///
/// [`PipelineError::NoDataAvailable`]: crate::domain::errors::PipelineError::NoDataAvailable
#[async_trait]
pub trait BarSource: Send + Sync {
    async fn fetch(
        &self,
        symbol: &str,
        interval: BarInterval,
        lookback_days: u32,
    ) -> Result<Vec<Bar>>;
}

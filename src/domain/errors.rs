use thiserror::Error;

/// Errors raised by the forecast pipeline and its collaborators.
///
/// A closed market is deliberately absent here: skipping a tick outside
/// trading hours is a normal outcome, not a failure.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no data available from source for {symbol}")]
    NoDataAvailable { symbol: String },

    #[error("insufficient data: {bars} bars yield no complete feature row (need at least {min_bars})")]
    InsufficientData { bars: usize, min_bars: usize },

    #[error("model unavailable at {path}: {reason}")]
    ModelUnavailable { path: String, reason: String },

    #[error("store unavailable: {reason}")]
    StoreUnavailable { reason: String },
}

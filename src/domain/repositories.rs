//! Repository abstractions over the tabular store.
//!
//! The pipeline orchestrator holds the only write path; the query layer and
//! the HTTP handlers hold read-only references to the same traits.

use crate::domain::market::IndicatorBar;
use crate::domain::signal::Signal;
use anyhow::Result;
use async_trait::async_trait;

/// Persisted indicator-enriched bars, keyed by (symbol, timestamp).
#[async_trait]
pub trait BarRepository: Send + Sync {
    /// Replace every stored row for `symbol` with `rows`, atomically.
    /// A reader never observes a half-replaced table.
    async fn replace_all(&self, symbol: &str, rows: &[IndicatorBar]) -> Result<()>;

    /// All rows for `symbol`, oldest first.
    async fn all_ordered(&self, symbol: &str) -> Result<Vec<IndicatorBar>>;

    /// The most recent `limit` rows for `symbol`, oldest first.
    async fn recent(&self, symbol: &str, limit: usize) -> Result<Vec<IndicatorBar>>;

    async fn count(&self, symbol: &str) -> Result<usize>;
}

/// Append-only store of persisted signals, one row per pipeline tick.
#[async_trait]
pub trait SignalRepository: Send + Sync {
    async fn append(&self, signal: &Signal) -> Result<()>;

    /// All signals in timestamp order.
    async fn list_ordered(&self) -> Result<Vec<Signal>>;

    async fn count(&self) -> Result<usize>;
}

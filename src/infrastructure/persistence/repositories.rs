use crate::domain::market::{Bar, IndicatorBar};
use crate::domain::repositories::{BarRepository, SignalRepository};
use crate::domain::signal::{Direction, Signal, TradeAction, VolatilityClass};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

pub struct SqliteBarRepository {
    pool: SqlitePool,
}

impl SqliteBarRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn map_rows(rows: Vec<sqlx::sqlite::SqliteRow>) -> Result<Vec<IndicatorBar>> {
        let mut bars = Vec::with_capacity(rows.len());
        for row in rows {
            bars.push(IndicatorBar {
                bar: Bar {
                    timestamp: row.try_get("timestamp")?,
                    open: row.try_get("open")?,
                    high: row.try_get("high")?,
                    low: row.try_get("low")?,
                    close: row.try_get("close")?,
                    volume: row.try_get("volume")?,
                },
                ema_9: Some(row.try_get("ema_9")?),
                ema_21: Some(row.try_get("ema_21")?),
                rsi: Some(row.try_get("rsi")?),
                macd: Some(row.try_get("macd")?),
                macd_signal: Some(row.try_get("macd_signal")?),
                atr: Some(row.try_get("atr")?),
                volatility: Some(row.try_get("volatility")?),
            });
        }
        Ok(bars)
    }
}

#[async_trait]
impl BarRepository for SqliteBarRepository {
    async fn replace_all(&self, symbol: &str, rows: &[IndicatorBar]) -> Result<()> {
        // Delete + bulk insert inside one transaction: readers observe the
        // old window or the new one, never a half-written table. Only rows
        // with every window satisfied are persisted.
        let mut tx = self.pool.begin().await.context("begin bar replace")?;

        sqlx::query("DELETE FROM bars WHERE symbol = ?")
            .bind(symbol)
            .execute(&mut *tx)
            .await
            .context("clear bar window")?;

        for row in rows.iter().filter(|r| r.is_complete()) {
            sqlx::query(
                r#"
                INSERT INTO bars
                (symbol, timestamp, open, high, low, close, volume,
                 ema_9, ema_21, rsi, macd, macd_signal, atr, volatility)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(symbol)
            .bind(row.bar.timestamp)
            .bind(row.bar.open)
            .bind(row.bar.high)
            .bind(row.bar.low)
            .bind(row.bar.close)
            .bind(row.bar.volume)
            .bind(row.ema_9)
            .bind(row.ema_21)
            .bind(row.rsi)
            .bind(row.macd)
            .bind(row.macd_signal)
            .bind(row.atr)
            .bind(row.volatility)
            .execute(&mut *tx)
            .await
            .context("insert bar row")?;
        }

        tx.commit().await.context("commit bar replace")?;
        Ok(())
    }

    async fn all_ordered(&self, symbol: &str) -> Result<Vec<IndicatorBar>> {
        let rows = sqlx::query("SELECT * FROM bars WHERE symbol = ? ORDER BY timestamp ASC")
            .bind(symbol)
            .fetch_all(&self.pool)
            .await?;
        Self::map_rows(rows)
    }

    async fn recent(&self, symbol: &str, limit: usize) -> Result<Vec<IndicatorBar>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM (
                SELECT * FROM bars WHERE symbol = ? ORDER BY timestamp DESC LIMIT ?
            ) ORDER BY timestamp ASC
            "#,
        )
        .bind(symbol)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Self::map_rows(rows)
    }

    async fn count(&self, symbol: &str) -> Result<usize> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM bars WHERE symbol = ?")
            .bind(symbol)
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.try_get("count")?;
        Ok(count as usize)
    }
}

pub struct SqliteSignalRepository {
    pool: SqlitePool,
}

impl SqliteSignalRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn map_rows(rows: Vec<sqlx::sqlite::SqliteRow>) -> Result<Vec<Signal>> {
        let mut signals = Vec::with_capacity(rows.len());
        for row in rows {
            let direction: String = row.try_get("direction")?;
            let volatility_class: String = row.try_get("volatility_class")?;
            let trade_action: String = row.try_get("trade_action")?;

            signals.push(Signal {
                timestamp: row.try_get("timestamp")?,
                current_price: row.try_get("current_price")?,
                predicted_price: row.try_get("predicted_price")?,
                expected_return_percent: row.try_get("expected_return_percent")?,
                direction: Direction::from_str(&direction)?,
                probability_up: row.try_get("probability_up")?,
                volatility_class: VolatilityClass::from_str(&volatility_class)?,
                confidence_score: row.try_get("confidence_score")?,
                trade_action: TradeAction::from_str(&trade_action)?,
            });
        }
        Ok(signals)
    }
}

#[async_trait]
impl SignalRepository for SqliteSignalRepository {
    async fn append(&self, signal: &Signal) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO signals
            (timestamp, current_price, predicted_price, expected_return_percent,
             direction, probability_up, volatility_class, confidence_score, trade_action)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(signal.timestamp)
        .bind(signal.current_price)
        .bind(signal.predicted_price)
        .bind(signal.expected_return_percent)
        .bind(signal.direction.to_string())
        .bind(signal.probability_up)
        .bind(signal.volatility_class.to_string())
        .bind(signal.confidence_score)
        .bind(signal.trade_action.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to append signal")?;

        Ok(())
    }

    async fn list_ordered(&self) -> Result<Vec<Signal>> {
        let rows = sqlx::query("SELECT * FROM signals ORDER BY timestamp ASC, id ASC")
            .fetch_all(&self.pool)
            .await?;
        Self::map_rows(rows)
    }

    async fn count(&self) -> Result<usize> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM signals")
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.try_get("count")?;
        Ok(count as usize)
    }
}

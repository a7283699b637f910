use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tokio::fs;
use tracing::info;

/// SQLite database wrapper owning the connection pool.
#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    pub async fn new(db_url: &str) -> Result<Self> {
        // Ensure the directory exists if it's a file path
        if let Some(path_part) = db_url.strip_prefix("sqlite://") {
            let path = Path::new(path_part);
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
                && !parent.exists()
            {
                fs::create_dir_all(parent)
                    .await
                    .context("Failed to create database directory")?;
            }
        }

        let options = SqliteConnectOptions::from_str(db_url)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal); // Better for concurrency

        // An in-memory database exists per connection; it must be pinned to
        // a single persistent connection or every checkout sees a fresh,
        // empty schema.
        let in_memory = db_url.contains(":memory:");
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .min_connections(if in_memory { 1 } else { 0 })
            .idle_timeout(if in_memory {
                None
            } else {
                Some(std::time::Duration::from_secs(600))
            })
            .connect_with(options)
            .await
            .context("Failed to connect to SQLite database")?;

        info!("Connected to database: {}", db_url);

        let db = Self { pool };
        db.init().await?;

        Ok(db)
    }

    /// Initialize database schema.
    async fn init(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;

        // 1. Indicator-enriched bar table, keyed by (symbol, timestamp).
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bars (
                symbol TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                volume REAL NOT NULL,
                ema_9 REAL NOT NULL,
                ema_21 REAL NOT NULL,
                rsi REAL NOT NULL,
                macd REAL NOT NULL,
                macd_signal REAL NOT NULL,
                atr REAL NOT NULL,
                volatility REAL NOT NULL,
                PRIMARY KEY (symbol, timestamp)
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create bars table")?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_bars_symbol_time
            ON bars (symbol, timestamp);
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create bars index")?;

        // 2. Append-only signals table, one row per pipeline tick.
        // Schema v2: includes volatility_class and confidence_score.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS signals (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                current_price REAL NOT NULL,
                predicted_price REAL NOT NULL,
                expected_return_percent REAL NOT NULL,
                direction TEXT NOT NULL,
                probability_up REAL NOT NULL,
                volatility_class TEXT NOT NULL,
                confidence_score REAL NOT NULL,
                trade_action TEXT NOT NULL,
                created_at INTEGER DEFAULT (strftime('%s', 'now'))
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create signals table")?;

        // Migration: a v1 signals table lacked the volatility/confidence
        // columns. Backfill with neutral defaults; errors mean the column
        // already exists and are ignored.
        let _ = sqlx::query(
            "ALTER TABLE signals ADD COLUMN volatility_class TEXT NOT NULL DEFAULT 'MEDIUM'",
        )
        .execute(&mut *conn)
        .await;
        let _ = sqlx::query(
            "ALTER TABLE signals ADD COLUMN confidence_score REAL NOT NULL DEFAULT 0.5",
        )
        .execute(&mut *conn)
        .await;

        info!("Database schema initialized.");
        Ok(())
    }
}

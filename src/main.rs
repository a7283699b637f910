//! Intracast server: scheduled forecast pipeline plus the read-side API.
//!
//! # Environment variables
//! - `SYMBOL` / `BAR_INTERVAL` / `LOOKBACK_DAYS` - market window
//! - `DATABASE_URL` - SQLite store location
//! - `PRICE_MODEL_PATH` / `DIRECTION_MODEL_PATH` - fitted models
//! - `TICK_INTERVAL_SECS` - pipeline cadence (defaults to one bar interval)
//! - `PORT` / `BIND_ADDRESS` / `HEARTBEAT_SECS` - HTTP server

use anyhow::{Context, Result};
use intracast::application::pipeline::{ForecastPipeline, TickOutcome};
use intracast::application::predictor::ForecastModels;
use intracast::application::query::QueryService;
use intracast::config::Config;
use intracast::infrastructure::persistence::{
    Database, SqliteBarRepository, SqliteSignalRepository,
};
use intracast::infrastructure::yahoo::YahooBarSource;
use intracast::interfaces::http::{self, AppState};
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, error, info};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("Intracast {} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: symbol={}, interval={}, lookback={}d",
        config.symbol, config.interval, config.lookback_days
    );

    // Predictors load once and stay immutable; a missing model is fatal
    // here rather than a surprise on the first tick.
    let models = Arc::new(
        ForecastModels::load(&config.price_model_path, &config.direction_model_path)
            .context("Failed to load forecast models")?,
    );

    let database = Database::new(&config.database_url).await?;
    let bar_repo = Arc::new(SqliteBarRepository::new(database.pool.clone()));
    let signal_repo = Arc::new(SqliteSignalRepository::new(database.pool.clone()));

    let source = Arc::new(YahooBarSource::new()?);
    let session = config.session()?;

    let pipeline = Arc::new(ForecastPipeline::new(
        config.pipeline_settings(),
        source,
        models,
        bar_repo.clone(),
        signal_repo.clone(),
        session,
        config.decision.clone(),
    ));

    let query = Arc::new(QueryService::new(
        bar_repo,
        signal_repo,
        config.periods_per_year(),
    ));

    // Scheduled pipeline ticks. A failed tick is logged and the next one
    // still runs; the serving process never goes down with it.
    let tick_pipeline = pipeline.clone();
    let tick_interval = Duration::from_secs(config.tick_interval_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(tick_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match tick_pipeline.run_tick().await {
                Ok(TickOutcome::Completed(signal)) => {
                    info!(
                        "Signal stored: {} at {:.2} (confidence {:.2})",
                        signal.trade_action, signal.current_price, signal.confidence_score
                    );
                }
                Ok(TickOutcome::SkippedMarketClosed | TickOutcome::SkippedTickInFlight) => {}
                Err(e) => error!("Scheduled tick failed: {e:#}"),
            }
        }
    });
    info!("Pipeline scheduler started (every {:?})", tick_interval);

    let state = AppState {
        pipeline,
        query,
        default_symbol: config.symbol.clone(),
        history_limit: config.history_limit,
        heartbeat: Duration::from_secs(config.heartbeat_secs),
    };

    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Serving API on {addr}");

    axum::serve(listener, http::app(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received. Exiting...");
        })
        .await
        .context("Server error")?;

    Ok(())
}

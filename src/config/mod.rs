//! Configuration module for intracast.
//!
//! Structured configuration loading from environment variables, organized
//! by concern: market window, decision thresholds, trading session, store
//! and model paths, and the HTTP server. Every decision threshold is
//! configurable so the rules can be recalibrated without code changes.

use crate::application::pipeline::PipelineSettings;
use crate::domain::decision::DecisionConfig;
use crate::domain::market::{BarInterval, TradingSession};
use anyhow::{Context, Result};
use chrono::{FixedOffset, NaiveDate, NaiveTime};
use std::collections::HashSet;
use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    // Market window
    pub symbol: String,
    pub interval: BarInterval,
    pub lookback_days: u32,
    pub tick_interval_secs: u64,

    // Store and models
    pub database_url: String,
    pub price_model_path: PathBuf,
    pub direction_model_path: PathBuf,

    // Decision thresholds
    pub decision: DecisionConfig,

    // Trading session
    pub market_utc_offset_minutes: i32,
    pub market_open: NaiveTime,
    pub market_close: NaiveTime,
    pub market_weekdays_only: bool,
    pub market_holidays: HashSet<NaiveDate>,

    // HTTP server
    pub bind_address: String,
    pub port: u16,
    pub heartbeat_secs: u64,
    pub history_limit: usize,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}

fn parse_time(key: &str, default: &str) -> Result<NaiveTime> {
    let raw = env_or(key, default);
    NaiveTime::parse_from_str(&raw, "%H:%M")
        .with_context(|| format!("Invalid {key}: {raw} (expected HH:MM)"))
}

fn parse_holidays(raw: &str) -> Result<HashSet<NaiveDate>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .with_context(|| format!("Invalid MARKET_HOLIDAYS entry: {s}"))
        })
        .collect()
}

impl Config {
    /// Load configuration from environment variables, with defaults
    /// matching the NSE 15-minute deployment.
    pub fn from_env() -> Result<Self> {
        let interval: BarInterval = env_or("BAR_INTERVAL", "15m")
            .parse()
            .context("Failed to load bar interval")?;

        let default_decision = DecisionConfig::default();
        let decision = DecisionConfig {
            buy_probability: env_parse("BUY_PROBABILITY", default_decision.buy_probability)?,
            sell_probability: env_parse("SELL_PROBABILITY", default_decision.sell_probability)?,
            buy_return_percent: env_parse(
                "BUY_RETURN_PERCENT",
                default_decision.buy_return_percent,
            )?,
            sell_return_percent: env_parse(
                "SELL_RETURN_PERCENT",
                default_decision.sell_return_percent,
            )?,
            low_volatility_max: env_parse(
                "LOW_VOLATILITY_MAX",
                default_decision.low_volatility_max,
            )?,
            medium_volatility_max: env_parse(
                "MEDIUM_VOLATILITY_MAX",
                default_decision.medium_volatility_max,
            )?,
            model_weight: env_parse("CONFIDENCE_MODEL_WEIGHT", default_decision.model_weight)?,
            prior_probability: env_parse(
                "CONFIDENCE_PRIOR_PROBABILITY",
                default_decision.prior_probability,
            )?,
        };

        Ok(Self {
            symbol: env_or("SYMBOL", "^NSEI"),
            interval,
            lookback_days: env_parse("LOOKBACK_DAYS", 30)?,
            tick_interval_secs: env_parse("TICK_INTERVAL_SECS", interval.seconds())?,

            database_url: env_or("DATABASE_URL", "sqlite://data/market_data.db"),
            price_model_path: PathBuf::from(env_or(
                "PRICE_MODEL_PATH",
                "models/price_model.json",
            )),
            direction_model_path: PathBuf::from(env_or(
                "DIRECTION_MODEL_PATH",
                "models/direction_model.json",
            )),

            decision,

            // NSE: 09:15-15:30 IST (UTC+05:30), weekdays.
            market_utc_offset_minutes: env_parse("MARKET_UTC_OFFSET_MINUTES", 330)?,
            market_open: parse_time("MARKET_OPEN", "09:15")?,
            market_close: parse_time("MARKET_CLOSE", "15:30")?,
            market_weekdays_only: env_parse("MARKET_WEEKDAYS_ONLY", true)?,
            market_holidays: parse_holidays(&env_or("MARKET_HOLIDAYS", ""))?,

            bind_address: env_or("BIND_ADDRESS", "0.0.0.0"),
            port: env_parse("PORT", 8000)?,
            heartbeat_secs: env_parse("HEARTBEAT_SECS", 30)?,
            history_limit: env_parse("HISTORY_LIMIT", 100)?,
        })
    }

    pub fn session(&self) -> Result<TradingSession> {
        let offset = FixedOffset::east_opt(self.market_utc_offset_minutes * 60)
            .context("MARKET_UTC_OFFSET_MINUTES out of range")?;
        Ok(TradingSession::new(
            offset,
            self.market_open,
            self.market_close,
            self.market_weekdays_only,
            self.market_holidays.clone(),
        ))
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            symbol: self.symbol.clone(),
            interval: self.interval,
            lookback_days: self.lookback_days,
        }
    }

    /// Annualization factor for the Sharpe ratio, derived from the bar
    /// interval and the configured session length.
    pub fn periods_per_year(&self) -> f64 {
        let session_minutes = (self.market_close - self.market_open)
            .num_minutes()
            .max(1) as u32;
        self.interval.periods_per_year(session_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_load_without_env() {
        let config = Config::from_env().unwrap();
        assert_eq!(config.interval, BarInterval::FifteenMinutes);
        assert_eq!(config.decision.buy_probability, 0.65);
        assert_eq!(config.decision.prior_probability, 0.53);
        assert_eq!(config.market_utc_offset_minutes, 330);
        assert_eq!(config.history_limit, 100);
    }

    #[test]
    fn test_periods_per_year_from_session() {
        let config = Config::from_env().unwrap();
        // 375-minute session / 15m bars = 25 bars per day.
        assert_eq!(config.periods_per_year(), 252.0 * 25.0);
    }

    #[test]
    fn test_parse_holidays() {
        let holidays = parse_holidays("2026-01-26, 2026-08-15").unwrap();
        assert_eq!(holidays.len(), 2);
        assert!(holidays.contains(&NaiveDate::from_ymd_opt(2026, 1, 26).unwrap()));
        assert!(parse_holidays("not-a-date").is_err());
        assert!(parse_holidays("").unwrap().is_empty());
    }

    #[test]
    fn test_session_gate_from_defaults() {
        let config = Config::from_env().unwrap();
        let session = config.session().unwrap();
        assert_eq!(session.minutes_per_day(), 375);
    }
}

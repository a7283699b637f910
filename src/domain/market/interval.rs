use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported bar intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BarInterval {
    OneMinute,
    FiveMinutes,
    FifteenMinutes,
    OneHour,
    OneDay,
}

impl BarInterval {
    pub fn minutes(&self) -> u32 {
        match self {
            BarInterval::OneMinute => 1,
            BarInterval::FiveMinutes => 5,
            BarInterval::FifteenMinutes => 15,
            BarInterval::OneHour => 60,
            BarInterval::OneDay => 24 * 60,
        }
    }

    pub fn seconds(&self) -> u64 {
        self.minutes() as u64 * 60
    }

    /// Interval token used by the chart data API ("15m", "1h", "1d").
    pub fn as_query_str(&self) -> &'static str {
        match self {
            BarInterval::OneMinute => "1m",
            BarInterval::FiveMinutes => "5m",
            BarInterval::FifteenMinutes => "15m",
            BarInterval::OneHour => "1h",
            BarInterval::OneDay => "1d",
        }
    }

    /// Bar periods in a trading year, given the session length per day.
    ///
    /// Assumes 252 trading days. Used to annualize the Sharpe ratio.
    pub fn periods_per_year(&self, session_minutes: u32) -> f64 {
        if *self == BarInterval::OneDay {
            return 252.0;
        }
        let per_day = (session_minutes as f64 / self.minutes() as f64).max(1.0);
        252.0 * per_day
    }
}

impl FromStr for BarInterval {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1m" => Ok(BarInterval::OneMinute),
            "5m" => Ok(BarInterval::FiveMinutes),
            "15m" => Ok(BarInterval::FifteenMinutes),
            "1h" | "60m" => Ok(BarInterval::OneHour),
            "1d" => Ok(BarInterval::OneDay),
            _ => bail!("Invalid BAR_INTERVAL: {}. Must be 1m, 5m, 15m, 1h or 1d", s),
        }
    }
}

impl fmt::Display for BarInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_query_str())
    }
}

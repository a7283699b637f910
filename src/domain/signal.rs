use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Predicted direction of the next bar's close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// UP iff the probability of an up move exceeds 0.5; the boundary
    /// itself is DOWN.
    pub fn from_probability(probability_up: f64) -> Self {
        if probability_up > 0.5 {
            Direction::Up
        } else {
            Direction::Down
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "UP"),
            Direction::Down => write!(f, "DOWN"),
        }
    }
}

impl FromStr for Direction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UP" => Ok(Direction::Up),
            "DOWN" => Ok(Direction::Down),
            _ => bail!("Invalid direction: {}", s),
        }
    }
}

/// Volatility regime of the current bar window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VolatilityClass {
    Low,
    Medium,
    High,
}

impl fmt::Display for VolatilityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolatilityClass::Low => write!(f, "LOW"),
            VolatilityClass::Medium => write!(f, "MEDIUM"),
            VolatilityClass::High => write!(f, "HIGH"),
        }
    }
}

impl FromStr for VolatilityClass {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(VolatilityClass::Low),
            "MEDIUM" => Ok(VolatilityClass::Medium),
            "HIGH" => Ok(VolatilityClass::High),
            _ => bail!("Invalid volatility class: {}", s),
        }
    }
}

/// Recommended trade action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeAction {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeAction::Buy => write!(f, "BUY"),
            TradeAction::Sell => write!(f, "SELL"),
            TradeAction::Hold => write!(f, "HOLD"),
        }
    }
}

impl FromStr for TradeAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(TradeAction::Buy),
            "SELL" => Ok(TradeAction::Sell),
            "HOLD" => Ok(TradeAction::Hold),
            _ => bail!("Invalid trade action: {}", s),
        }
    }
}

/// One decision output of the pipeline. Immutable once persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub timestamp: i64,
    pub current_price: f64,
    pub predicted_price: f64,
    pub expected_return_percent: f64,
    pub direction: Direction,
    pub probability_up: f64,
    pub volatility_class: VolatilityClass,
    pub confidence_score: f64,
    pub trade_action: TradeAction,
}

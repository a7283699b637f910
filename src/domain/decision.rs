//! Rule-based decision engine.
//!
//! Pure functions, no I/O. Every threshold lives in [`DecisionConfig`] so
//! the rules can be recalibrated without code changes.

use crate::domain::signal::{Direction, Signal, TradeAction, VolatilityClass};

/// Thresholds for the trade-action rule and the confidence blend.
///
/// The volatility bounds are absolute price-unit standard deviations, not
/// percentages of price. They were calibrated against an index in the
/// thousands; recalibrate per instrument before reuse at other price scales.
#[derive(Debug, Clone)]
pub struct DecisionConfig {
    /// Minimum P(up) for a BUY.
    pub buy_probability: f64,
    /// Maximum P(up) for a SELL.
    pub sell_probability: f64,
    /// Minimum expected return (percent) for a BUY.
    pub buy_return_percent: f64,
    /// Maximum expected return (percent) for a SELL.
    pub sell_return_percent: f64,
    /// Rolling close std-dev below this is LOW volatility.
    pub low_volatility_max: f64,
    /// Rolling close std-dev below this (and >= low) is MEDIUM; above is HIGH.
    pub medium_volatility_max: f64,
    /// Weight of the model probability in the confidence blend.
    pub model_weight: f64,
    /// Constant prior probability blended into the confidence score.
    pub prior_probability: f64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            buy_probability: 0.65,
            sell_probability: 0.35,
            buy_return_percent: 0.15,
            sell_return_percent: -0.15,
            low_volatility_max: 15.0,
            medium_volatility_max: 30.0,
            model_weight: 0.7,
            prior_probability: 0.53,
        }
    }
}

/// Expected move of the next bar, as a percentage of the current price.
pub fn expected_return_percent(current_price: f64, predicted_price: f64) -> f64 {
    (predicted_price - current_price) / current_price * 100.0
}

pub fn classify_volatility(volatility: f64, config: &DecisionConfig) -> VolatilityClass {
    if volatility < config.low_volatility_max {
        VolatilityClass::Low
    } else if volatility < config.medium_volatility_max {
        VolatilityClass::Medium
    } else {
        VolatilityClass::High
    }
}

/// BUY and SELL both require a clear probability, a large enough expected
/// move, and a non-HIGH volatility regime; everything else is HOLD.
pub fn trade_action(
    probability_up: f64,
    expected_return_percent: f64,
    volatility_class: VolatilityClass,
    config: &DecisionConfig,
) -> TradeAction {
    if volatility_class != VolatilityClass::High {
        if probability_up > config.buy_probability
            && expected_return_percent > config.buy_return_percent
        {
            return TradeAction::Buy;
        }
        if probability_up < config.sell_probability
            && expected_return_percent < config.sell_return_percent
        {
            return TradeAction::Sell;
        }
    }
    TradeAction::Hold
}

/// Linear blend of the model probability with a constant prior, rounded to
/// two decimals. The prior is a calibration placeholder kept for output
/// parity with the fitted thresholds.
pub fn confidence_score(probability_up: f64, config: &DecisionConfig) -> f64 {
    let blended = probability_up * config.model_weight
        + (1.0 - config.model_weight) * config.prior_probability;
    (blended * 100.0).round() / 100.0
}

/// Evaluate one decision, in the fixed order: expected return, volatility
/// class, trade action, confidence.
pub fn decide(
    timestamp: i64,
    current_price: f64,
    predicted_price: f64,
    probability_up: f64,
    volatility: f64,
    config: &DecisionConfig,
) -> Signal {
    let expected_return = expected_return_percent(current_price, predicted_price);
    let volatility_class = classify_volatility(volatility, config);
    let action = trade_action(probability_up, expected_return, volatility_class, config);

    Signal {
        timestamp,
        current_price,
        predicted_price,
        expected_return_percent: expected_return,
        direction: Direction::from_probability(probability_up),
        probability_up,
        volatility_class,
        confidence_score: confidence_score(probability_up, config),
        trade_action: action,
    }
}

use serde::Serialize;

/// Ordered list of feature names.
/// This order MUST match exactly the order the models were fitted with.
/// Any change here is a breaking change for persisted models.
pub const FEATURE_NAMES: &[&str] = &[
    "close",
    "ema_9",
    "ema_21",
    "rsi",
    "macd",
    "macd_signal",
    "atr",
    "volatility",
    "return_1",
    "return_3",
    "return_5",
    "momentum_5",
];

/// One row of model inputs: the raw close plus eleven derived features.
///
/// Exists only for timestamps whose full lookback is satisfied; the feature
/// builder never constructs a partially-populated vector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    pub close: f64,
    pub ema_9: f64,
    pub ema_21: f64,
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub atr: f64,
    pub volatility: f64,
    pub return_1: f64,
    pub return_3: f64,
    pub return_5: f64,
    pub momentum_5: f64,
}

impl FeatureVector {
    /// Flatten into the canonical model-input order (see [`FEATURE_NAMES`]).
    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            self.close,
            self.ema_9,
            self.ema_21,
            self.rsi,
            self.macd,
            self.macd_signal,
            self.atr,
            self.volatility,
            self.return_1,
            self.return_3,
            self.return_5,
            self.momentum_5,
        ]
    }
}

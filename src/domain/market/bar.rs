use serde::{Deserialize, Serialize};

/// One OHLCV observation at a fixed bar interval.
///
/// `timestamp` is epoch seconds. Bars for a symbol are strictly ordered by
/// timestamp with no duplicates once ingested; the trading-session gate
/// applies the exchange UTC offset when local wall-clock time is needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// A bar enriched with trailing-window indicator columns.
///
/// `None` means the lookback window for that column is not yet satisfied.
/// Rows with any `None` are excluded from feature building and from
/// persistence for modeling purposes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorBar {
    #[serde(flatten)]
    pub bar: Bar,
    pub ema_9: Option<f64>,
    pub ema_21: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub atr: Option<f64>,
    pub volatility: Option<f64>,
}

impl IndicatorBar {
    /// True when every indicator window is satisfied for this row.
    pub fn is_complete(&self) -> bool {
        self.ema_9.is_some()
            && self.ema_21.is_some()
            && self.rsi.is_some()
            && self.macd.is_some()
            && self.macd_signal.is_some()
            && self.atr.is_some()
            && self.volatility.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(ts: i64, close: f64) -> Bar {
        Bar {
            timestamp: ts,
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn test_is_complete_requires_every_column() {
        let mut row = IndicatorBar {
            bar: bar(0, 100.0),
            ema_9: Some(100.0),
            ema_21: Some(100.0),
            rsi: Some(50.0),
            macd: Some(0.0),
            macd_signal: Some(0.0),
            atr: Some(1.0),
            volatility: Some(2.0),
        };
        assert!(row.is_complete());

        row.macd_signal = None;
        assert!(!row.is_complete());
    }

    #[test]
    fn test_indicator_bar_serializes_flat() {
        let row = IndicatorBar {
            bar: bar(1_700_000_000, 100.0),
            ema_9: Some(99.5),
            ema_21: None,
            rsi: Some(55.0),
            macd: None,
            macd_signal: None,
            atr: None,
            volatility: None,
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["timestamp"], 1_700_000_000_i64);
        assert_eq!(json["close"], 100.0);
        assert_eq!(json["ema_9"], 99.5);
        assert!(json["ema_21"].is_null());
    }
}

//! Feature builder.
//!
//! Derives lagged returns and momentum from the indicator-enriched bar
//! sequence, drops every row with an unsatisfied lookback, and emits either
//! the newest complete feature vector (inference) or the full labeled
//! matrix (training). The drop order is part of the model contract: a row
//! survives only when every indicator column and every lagged return is
//! defined, and the training target shift then drops the final row.

use crate::domain::errors::PipelineError;
use crate::domain::market::IndicatorBar;
use crate::domain::ml::FeatureVector;

pub const RETURN_LAGS: [usize; 3] = [1, 3, 5];
pub const MOMENTUM_LAG: usize = 5;

/// Bars required before a single complete feature row exists: the MACD
/// signal line is the longest chain (26-bar slow EMA plus 9-bar signal).
pub const MIN_BARS_FOR_FEATURES: usize = 34;

/// One surviving row: its position in the enriched sequence plus the
/// assembled model inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub timestamp: i64,
    pub close: f64,
    pub volatility: f64,
    pub features: FeatureVector,
}

/// Labeled training matrix in registry column order, aligned with the
/// next-bar close target and up/down label.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub timestamps: Vec<i64>,
    pub matrix: Vec<Vec<f64>>,
    pub target_price: Vec<f64>,
    pub target_direction: Vec<f64>,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.matrix.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.is_empty()
    }
}

fn pct_change(rows: &[IndicatorBar], index: usize, lag: usize) -> Option<f64> {
    if index < lag {
        return None;
    }
    let prev = rows[index - lag].bar.close;
    Some((rows[index].bar.close - prev) / prev)
}

fn momentum(rows: &[IndicatorBar], index: usize, lag: usize) -> Option<f64> {
    if index < lag {
        return None;
    }
    Some(rows[index].bar.close - rows[index - lag].bar.close)
}

fn build_row(rows: &[IndicatorBar], index: usize) -> Option<FeatureRow> {
    let row = &rows[index];
    if !row.is_complete() {
        return None;
    }

    let features = FeatureVector {
        close: row.bar.close,
        ema_9: row.ema_9?,
        ema_21: row.ema_21?,
        rsi: row.rsi?,
        macd: row.macd?,
        macd_signal: row.macd_signal?,
        atr: row.atr?,
        volatility: row.volatility?,
        return_1: pct_change(rows, index, RETURN_LAGS[0])?,
        return_3: pct_change(rows, index, RETURN_LAGS[1])?,
        return_5: pct_change(rows, index, RETURN_LAGS[2])?,
        momentum_5: momentum(rows, index, MOMENTUM_LAG)?,
    };

    Some(FeatureRow {
        timestamp: row.bar.timestamp,
        close: row.bar.close,
        volatility: features.volatility,
        features,
    })
}

/// Every complete feature row, oldest first, paired with its index into the
/// enriched sequence.
pub fn complete_rows(rows: &[IndicatorBar]) -> Vec<(usize, FeatureRow)> {
    (0..rows.len())
        .filter_map(|i| build_row(rows, i).map(|row| (i, row)))
        .collect()
}

/// The newest complete feature row, for inference.
pub fn latest(rows: &[IndicatorBar]) -> Result<FeatureRow, PipelineError> {
    (0..rows.len())
        .rev()
        .find_map(|i| build_row(rows, i))
        .ok_or(PipelineError::InsufficientData {
            bars: rows.len(),
            min_bars: MIN_BARS_FOR_FEATURES,
        })
}

/// The full labeled matrix, for training. The last surviving row has no
/// next bar and is excluded from the labeled set.
pub fn training_set(rows: &[IndicatorBar]) -> Result<TrainingSet, PipelineError> {
    let mut set = TrainingSet {
        timestamps: Vec::new(),
        matrix: Vec::new(),
        target_price: Vec::new(),
        target_direction: Vec::new(),
    };

    for (index, row) in complete_rows(rows) {
        let Some(next) = rows.get(index + 1) else {
            continue;
        };
        let up = if next.bar.close > row.close { 1.0 } else { 0.0 };
        set.timestamps.push(row.timestamp);
        set.matrix.push(row.features.to_vec());
        set.target_price.push(next.bar.close);
        set.target_direction.push(up);
    }

    if set.is_empty() {
        return Err(PipelineError::InsufficientData {
            bars: rows.len(),
            min_bars: MIN_BARS_FOR_FEATURES,
        });
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::indicators;
    use crate::domain::market::Bar;

    fn bars(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let close = 100.0 + i as f64 + (i as f64 * 0.7).sin();
                Bar {
                    timestamp: 1_700_000_000 + i as i64 * 900,
                    open: close - 0.2,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1000.0 + i as f64,
                }
            })
            .collect()
    }

    #[test]
    fn test_latest_insufficient_below_min_bars() {
        for n in [0, 5, 21, MIN_BARS_FOR_FEATURES - 1] {
            let enriched = indicators::enrich(&bars(n));
            let err = latest(&enriched).unwrap_err();
            assert!(
                matches!(err, PipelineError::InsufficientData { bars, .. } if bars == n),
                "expected InsufficientData for {n} bars"
            );
        }
    }

    #[test]
    fn test_latest_at_exact_min_bars() {
        let enriched = indicators::enrich(&bars(MIN_BARS_FOR_FEATURES));
        let row = latest(&enriched).unwrap();
        assert_eq!(row.timestamp, enriched.last().unwrap().bar.timestamp);
    }

    #[test]
    fn test_latest_picks_newest_row() {
        let enriched = indicators::enrich(&bars(60));
        let row = latest(&enriched).unwrap();
        assert_eq!(row.close, enriched[59].bar.close);
        assert_eq!(row.volatility, enriched[59].volatility.unwrap());
    }

    #[test]
    fn test_complete_rows_start_at_macd_signal_edge() {
        let enriched = indicators::enrich(&bars(60));
        let rows = complete_rows(&enriched);
        assert_eq!(rows.first().unwrap().0, 33);
        assert_eq!(rows.len(), 60 - 33);
    }

    #[test]
    fn test_feature_vectors_are_bit_identical() {
        let input = bars(80);
        let a = latest(&indicators::enrich(&input)).unwrap();
        let b = latest(&indicators::enrich(&input)).unwrap();
        assert_eq!(a.features.to_vec(), b.features.to_vec());
    }

    #[test]
    fn test_lagged_returns_match_hand_computation() {
        let input = bars(60);
        let enriched = indicators::enrich(&input);
        let row = latest(&enriched).unwrap();
        let c = |i: usize| input[i].close;
        assert!((row.features.return_1 - (c(59) - c(58)) / c(58)).abs() < 1e-15);
        assert!((row.features.return_3 - (c(59) - c(56)) / c(56)).abs() < 1e-15);
        assert!((row.features.return_5 - (c(59) - c(54)) / c(54)).abs() < 1e-15);
        assert!((row.features.momentum_5 - (c(59) - c(54))).abs() < 1e-15);
    }

    #[test]
    fn test_training_set_shifts_target() {
        let input = bars(60);
        let enriched = indicators::enrich(&input);
        let set = training_set(&enriched).unwrap();

        // Rows 33..58 are labeled; row 59 has no next bar.
        assert_eq!(set.len(), 60 - 33 - 1);
        assert_eq!(set.target_price[0], input[34].close);
        let expected_up = if input[34].close > input[33].close {
            1.0
        } else {
            0.0
        };
        assert_eq!(set.target_direction[0], expected_up);
        assert_eq!(set.matrix[0].len(), crate::domain::ml::FEATURE_NAMES.len());
    }

    #[test]
    fn test_training_set_insufficient_when_too_short() {
        let enriched = indicators::enrich(&bars(30));
        assert!(matches!(
            training_set(&enriched),
            Err(PipelineError::InsufficientData { .. })
        ));
    }
}

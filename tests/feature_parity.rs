//! Determinism and lookback properties of the feature pipeline.

use intracast::application::{features, indicators};
use intracast::domain::errors::PipelineError;
use intracast::domain::ml::FEATURE_NAMES;
use intracast::infrastructure::mock::synthetic_bars;

#[test]
fn test_any_window_below_longest_lookback_is_insufficient() {
    // The longest single-indicator lookback is 21 bars (EMA_21); every
    // window shorter than that must fail, as must everything up to the
    // first fully-complete row.
    for n in 0..features::MIN_BARS_FOR_FEATURES {
        let enriched = indicators::enrich(&synthetic_bars(n, 100.0));
        assert!(
            matches!(
                features::latest(&enriched),
                Err(PipelineError::InsufficientData { .. })
            ),
            "expected InsufficientData for {n} bars"
        );
    }
}

#[test]
fn test_minimum_window_produces_exactly_one_row() {
    let enriched = indicators::enrich(&synthetic_bars(features::MIN_BARS_FOR_FEATURES, 100.0));
    let rows = features::complete_rows(&enriched);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0, features::MIN_BARS_FOR_FEATURES - 1);
}

#[test]
fn test_feature_vectors_are_bit_identical_across_runs() {
    let bars = synthetic_bars(120, 250.0);

    let a = features::latest(&indicators::enrich(&bars)).unwrap();
    let b = features::latest(&indicators::enrich(&bars)).unwrap();

    // Bit-for-bit, not approximately: the vector feeds models fitted on
    // the training-time values.
    assert_eq!(a.features.to_vec(), b.features.to_vec());
    assert_eq!(a.timestamp, b.timestamp);
}

#[test]
fn test_feature_order_matches_registry() {
    let bars = synthetic_bars(60, 100.0);
    let row = features::latest(&indicators::enrich(&bars)).unwrap();
    let vector = row.features.to_vec();

    assert_eq!(vector.len(), FEATURE_NAMES.len());
    assert_eq!(FEATURE_NAMES[0], "close");
    assert_eq!(vector[0], row.close);
    // volatility sits at index 7 and is the value the decision engine
    // classifies on.
    assert_eq!(FEATURE_NAMES[7], "volatility");
    assert_eq!(vector[7], row.volatility);
}

#[test]
fn test_tail_of_longer_window_agrees_with_stored_subwindow() {
    // Inference recomputes returns over the persisted (trimmed) window;
    // the derived features for the newest row must match those computed
    // over the full source window.
    let bars = synthetic_bars(90, 100.0);
    let enriched = indicators::enrich(&bars);

    let full = features::latest(&enriched).unwrap();

    let stored: Vec<_> = enriched
        .iter()
        .filter(|row| row.is_complete())
        .cloned()
        .collect();
    let trimmed = features::latest(&stored).unwrap();

    assert_eq!(full.features.to_vec(), trimmed.features.to_vec());
}

#[test]
fn test_training_set_is_aligned_and_complete() {
    let bars = synthetic_bars(100, 100.0);
    let enriched = indicators::enrich(&bars);
    let set = features::training_set(&enriched).unwrap();

    // One labeled row per complete row except the last, which has no next
    // bar to shift in as a target.
    assert_eq!(set.len(), features::complete_rows(&enriched).len() - 1);
    assert_eq!(set.matrix.len(), set.target_price.len());
    assert_eq!(set.matrix.len(), set.target_direction.len());

    for (i, ts) in set.timestamps.iter().enumerate() {
        let source = bars.iter().position(|b| b.timestamp == *ts).unwrap();
        assert_eq!(set.target_price[i], bars[source + 1].close);
        let expected = if bars[source + 1].close > bars[source].close {
            1.0
        } else {
            0.0
        };
        assert_eq!(set.target_direction[i], expected);
    }
}

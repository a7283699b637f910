//! Batch technical-indicator engine.
//!
//! Every function takes an ordered series and returns a vector aligned with
//! the input, `None` where the lookback window is not yet satisfied. The
//! exact window edges matter: inference must reproduce the values the models
//! were fitted on, so the recursions and their seeds are frozen here. No I/O.

use crate::domain::market::{Bar, IndicatorBar};

pub const EMA_FAST_WINDOW: usize = 9;
pub const EMA_SLOW_WINDOW: usize = 21;
pub const RSI_WINDOW: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const ATR_WINDOW: usize = 14;
pub const VOLATILITY_WINDOW: usize = 20;

/// Exponential moving average, recursion seeded at the first value with
/// `alpha = 2 / (window + 1)`. The first `window - 1` outputs are masked.
pub fn ema(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if values.is_empty() || window == 0 {
        return out;
    }

    let alpha = 2.0 / (window as f64 + 1.0);
    let mut current = values[0];
    for (i, &value) in values.iter().enumerate() {
        if i > 0 {
            current = alpha * value + (1.0 - alpha) * current;
        }
        if i + 1 >= window {
            out[i] = Some(current);
        }
    }
    out
}

/// Wilder's RSI. The first average gain/loss is the simple mean of the
/// first `window` changes; later values use Wilder smoothing. Defined from
/// index `window` onward. A window with no losses reads 100.
pub fn wilder_rsi(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if window == 0 || closes.len() <= window {
        return out;
    }

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=window {
        let change = closes[i] - closes[i - 1];
        if change > 0.0 {
            avg_gain += change;
        } else {
            avg_loss -= change;
        }
    }
    avg_gain /= window as f64;
    avg_loss /= window as f64;
    out[window] = Some(rsi_value(avg_gain, avg_loss));

    let w = window as f64;
    for i in window + 1..closes.len() {
        let change = closes[i] - closes[i - 1];
        let (gain, loss) = if change > 0.0 {
            (change, 0.0)
        } else {
            (0.0, -change)
        };
        avg_gain = (avg_gain * (w - 1.0) + gain) / w;
        avg_loss = (avg_loss * (w - 1.0) + loss) / w;
        out[i] = Some(rsi_value(avg_gain, avg_loss));
    }
    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// MACD line and its signal line.
///
/// The line is `ema(fast) - ema(slow)`, defined once the slow window is
/// satisfied. The signal line is an EMA over the defined MACD region only,
/// so it becomes defined `signal - 1` bars later. That masking order must
/// match the training pipeline exactly.
pub struct MacdSeries {
    pub macd: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
}

pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let n = closes.len();
    let fast_ema = ema_unmasked(closes, fast);
    let slow_ema = ema_unmasked(closes, slow);

    let mut line = vec![None; n];
    for i in slow.saturating_sub(1)..n {
        line[i] = Some(fast_ema[i] - slow_ema[i]);
    }

    let defined: Vec<f64> = line.iter().flatten().copied().collect();
    let signal_defined = ema(&defined, signal);
    let mut signal_line = vec![None; n];
    let offset = n - defined.len();
    for (i, value) in signal_defined.into_iter().enumerate() {
        signal_line[offset + i] = value;
    }

    MacdSeries {
        macd: line,
        signal: signal_line,
    }
}

/// EMA recursion without window masking, for intermediate series.
fn ema_unmasked(values: &[f64], window: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    if values.is_empty() {
        return out;
    }
    let alpha = 2.0 / (window as f64 + 1.0);
    let mut current = values[0];
    out.push(current);
    for &value in &values[1..] {
        current = alpha * value + (1.0 - alpha) * current;
        out.push(current);
    }
    out
}

/// Average true range with Wilder smoothing. The first bar's true range is
/// `high - low`; the first ATR is the simple mean of the first `window`
/// true ranges, emitted at index `window - 1`.
pub fn atr(bars: &[Bar], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; bars.len()];
    if window == 0 || bars.len() < window {
        return out;
    }

    let mut true_ranges = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        let tr = if i == 0 {
            bar.high - bar.low
        } else {
            let prev_close = bars[i - 1].close;
            (bar.high - bar.low)
                .max((bar.high - prev_close).abs())
                .max((bar.low - prev_close).abs())
        };
        true_ranges.push(tr);
    }

    let w = window as f64;
    let mut current = true_ranges[..window].iter().sum::<f64>() / w;
    out[window - 1] = Some(current);
    for i in window..bars.len() {
        current = (current * (w - 1.0) + true_ranges[i]) / w;
        out[i] = Some(current);
    }
    out
}

/// Rolling sample standard deviation (ddof = 1), defined from index
/// `window - 1`.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window < 2 || values.len() < window {
        return out;
    }

    for i in window - 1..values.len() {
        let slice = &values[i + 1 - window..=i];
        let mean = slice.iter().sum::<f64>() / window as f64;
        let variance =
            slice.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (window as f64 - 1.0);
        out[i] = Some(variance.sqrt());
    }
    out
}

/// Enrich an ordered bar sequence with every indicator column.
pub fn enrich(bars: &[Bar]) -> Vec<IndicatorBar> {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

    let ema_9 = ema(&closes, EMA_FAST_WINDOW);
    let ema_21 = ema(&closes, EMA_SLOW_WINDOW);
    let rsi = wilder_rsi(&closes, RSI_WINDOW);
    let macd_series = macd(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
    let atr_series = atr(bars, ATR_WINDOW);
    let volatility = rolling_std(&closes, VOLATILITY_WINDOW);

    bars.iter()
        .enumerate()
        .map(|(i, bar)| IndicatorBar {
            bar: bar.clone(),
            ema_9: ema_9[i],
            ema_21: ema_21[i],
            rsi: rsi[i],
            macd: macd_series.macd[i],
            macd_signal: macd_series.signal[i],
            atr: atr_series[i],
            volatility: volatility[i],
        })
        .collect()
}

//! Series math over optional values. `None` is a missing observation.

/// Rolling simple mean. A point is `None` until `window` consecutive values are present.
pub fn sma(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window == 0 {
        return out;
    }

    let mut sum = 0.0;
    let mut run = 0usize;
    for (i, value) in values.iter().enumerate() {
        match value {
            Some(v) => {
                sum += v;
                run += 1;
                if run > window {
                    // value leaving the window is present because run counts unbroken values
                    sum -= values[i - window].unwrap_or(0.0);
                    run = window;
                }
                if run == window {
                    out[i] = Some(sum / window as f64);
                }
            }
            None => {
                sum = 0.0;
                run = 0;
            }
        }
    }
    out
}

/// Exponential moving average seeded with the first present value
/// (`alpha = 2 / (period + 1)`). Missing inputs yield `None` and leave the state untouched.
pub fn ema(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let alpha = 2.0 / (period.max(1) as f64 + 1.0);
    let mut prev: Option<f64> = None;
    values
        .iter()
        .map(|value| {
            let v = (*value)?;
            let next = match prev {
                Some(p) => ema_from_previous(v, p, alpha),
                None => v,
            };
            prev = Some(next);
            Some(next)
        })
        .collect()
}

pub fn ema_from_previous(value: f64, previous: f64, alpha: f64) -> f64 {
    alpha * value + (1.0 - alpha) * previous
}

/// Shift a series forward by `n`, so point `i` holds the value of `i - n`.
pub fn shift<T: Copy>(values: &[Option<T>], n: usize) -> Vec<Option<T>> {
    (0..values.len())
        .map(|i| if i >= n { values[i - n] } else { None })
        .collect()
}

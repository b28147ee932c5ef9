//! Deterministic starting point for the turn-on fit.
//!
//! Steep turn-ons are only found reliably when the optimizer starts near them:
//! - `L0` is the highest efficiency
//! - `x0` is the bin whose efficiency is closest to half of `L0`
//! - `k0 = 4 / (x(0.9·L0) − x(0.1·L0))`, the 10%–90% crossing width
//! - `b0 = 0`

use tracing::warn;

/// Initial `[L, x0, k, b]` for `x`/`y` of equal, non-zero length.
pub fn initial_params(x: &[f64], y: &[f64]) -> [f64; 4] {
    let l0 = y.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let x0 = x[closest_index(y, 0.5 * l0)];
    let x_hi = x[closest_index(y, 0.9 * l0)];
    let x_lo = x[closest_index(y, 0.1 * l0)];

    let mut k0 = 4.0 / (x_hi - x_lo);
    if !k0.is_finite() {
        let span = x.iter().copied().fold(f64::NEG_INFINITY, f64::max)
            - x.iter().copied().fold(f64::INFINITY, f64::min);
        k0 = if span > 0.0 { 4.0 / span } else { 1.0 };
        warn!(k0, "10%-90% crossings coincide, seeding slope from the x range");
    }

    [l0, x0, k0, 0.0]
}

/// First index minimizing `|y_i − target|`.
fn closest_index(y: &[f64], target: f64) -> usize {
    let mut best = 0;
    for (i, v) in y.iter().enumerate() {
        if (v - target).abs() < (y[best] - target).abs() {
            best = i;
        }
    }
    best
}

//! Basis functions for the additive trend + seasonality model.
//!
//! Time is measured on a scaled axis where `0.0` is the first training day
//! and `1.0` the last one, so:
//!
//! - trend hinges `max(0, t - c)` keep comparable magnitudes for any history length
//! - seasonal terms are evaluated on raw day offsets (period in days)
//!
//! Fourier pairs for order `k` are `sin(2πkd/P)` and `cos(2πkd/P)`.

use std::f64::consts::TAU;

/// Weekly cycle length (days).
pub const WEEK_DAYS: f64 = 7.0;

/// Mean Gregorian year length (days).
pub const YEAR_DAYS: f64 = 365.25;

/// Piecewise-linear trend adjustment starting at changepoint `c`.
pub fn hinge(t: f64, c: f64) -> f64 {
    (t - c).max(0.0)
}

/// Fill `out` with `order` Fourier pairs for a cycle of `period_days`.
///
/// # Panics
/// Panics if `out.len() != 2 * order`. Callers size the row from the model layout.
pub fn fill_fourier(day: f64, period_days: f64, order: usize, out: &mut [f64]) {
    assert_eq!(out.len(), 2 * order, "fourier row has wrong length");
    for k in 0..order {
        let angle = TAU * (k + 1) as f64 * day / period_days;
        out[2 * k] = angle.sin();
        out[2 * k + 1] = angle.cos();
    }
}

/// Evenly spaced changepoints over `[0, range]` (endpoints excluded).
pub fn changepoints(count: usize, range: f64) -> Vec<f64> {
    (1..=count)
        .map(|i| range * i as f64 / (count + 1) as f64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hinge_is_zero_before_changepoint() {
        assert_eq!(hinge(0.2, 0.5), 0.0);
        assert!((hinge(0.75, 0.5) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn fourier_repeats_every_period() {
        let mut a = [0.0; 6];
        let mut b = [0.0; 6];
        fill_fourier(3.0, WEEK_DAYS, 3, &mut a);
        fill_fourier(3.0 + 7.0 * 11.0, WEEK_DAYS, 3, &mut b);
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn changepoints_exclude_endpoints() {
        let cps = changepoints(3, 0.8);
        assert_eq!(cps.len(), 3);
        assert!((cps[0] - 0.2).abs() < 1e-12);
        assert!((cps[2] - 0.6).abs() < 1e-12);
        assert!(changepoints(0, 0.8).is_empty());
    }
}

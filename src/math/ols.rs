//! Least squares solvers.
//!
//! The built-in forecast model is linear in its coefficients, so fitting is a
//! single (ridge-penalized) least squares problem:
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2 + Σ λ_j β_j^2
//! ```
//!
//! Implementation choices:
//! - Ridge penalties are applied by appending `sqrt(λ_j) e_j` rows (with target
//!   0) to the design matrix, which turns the problem back into plain OLS.
//! - We solve with SVD so tall and rank-deficient designs are handled without
//!   panicking (Nalgebra's `QR::solve` expects square systems).

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Solve a ridge problem with a per-column penalty.
///
/// `penalties[j]` is `λ_j`; zero leaves column `j` unpenalized.
///
/// # Panics
/// Panics if `penalties.len() != x.ncols()`.
pub fn solve_ridge(x: &DMatrix<f64>, y: &DVector<f64>, penalties: &[f64]) -> Option<DVector<f64>> {
    assert_eq!(penalties.len(), x.ncols(), "one penalty per column");

    let penalized: Vec<(usize, f64)> = penalties
        .iter()
        .enumerate()
        .filter(|(_, l)| **l > 0.0)
        .map(|(j, l)| (j, l.sqrt()))
        .collect();

    if penalized.is_empty() {
        return solve_least_squares(x, y);
    }

    let n = x.nrows();
    let p = x.ncols();
    let mut xa = DMatrix::<f64>::zeros(n + penalized.len(), p);
    xa.view_mut((0, 0), (n, p)).copy_from(x);
    for (row, (j, w)) in penalized.iter().enumerate() {
        xa[(n + row, *j)] = *w;
    }

    let mut ya = DVector::<f64>::zeros(n + penalized.len());
    ya.rows_mut(0, n).copy_from(y);

    solve_least_squares(&xa, &ya)
}

//! Least-squares solver and linear-trend fitting.
//!
//! The forecast engine fits one small regression per country: the
//! unemployment level against its observation index. The design matrix is
//! tall and skinny (n×2), so we solve with SVD, which stays robust when the
//! series is short or nearly constant.

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

/// Ordinary least squares of `y` against its index `0..n`.
///
/// Returns `(intercept, slope)`, or `None` for fewer than three points or a
/// degenerate system. The caller extrapolates with `intercept + slope·x`.
pub fn fit_linear_trend(y: &[f64]) -> Option<(f64, f64)> {
    if y.len() < 3 {
        return None;
    }

    let n = y.len();
    let mut x = DMatrix::<f64>::zeros(n, 2);
    for i in 0..n {
        x[(i, 0)] = 1.0;
        x[(i, 1)] = i as f64;
    }
    let yv = DVector::from_column_slice(y);

    let beta = solve_least_squares(&x, &yv)?;
    Some((beta[0], beta[1]))
}

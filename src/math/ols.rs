//! Linear least squares pieces used by the Levenberg–Marquardt fitter.
//!
//! Each damped step is the solution of a small, tall linear system
//!
//! ```text
//! [ J              ]       [ -r ]
//! [ sqrt(λ·D)      ] δ  =  [  0 ]
//! ```
//!
//! with `D = diag(JᵀJ)`. We solve it with SVD rather than forming the normal
//! equations, which keeps steep turn-on fits (large `k`, nearly flat columns in `J`)
//! solvable. The parameter covariance is the inverse of `JᵀJ`.

use nalgebra::{DMatrix, DVector};

/// Solve `min ‖x·β − y‖²` using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Inverse through SVD, `None` if the matrix is rank deficient or not finite.
pub fn invert_full_rank(m: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    if m.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let svd = m.clone().svd(true, true);
    let largest = svd.singular_values.max();
    let eps = 1e-12 * largest;
    if largest <= 0.0 || svd.singular_values.iter().any(|&s| s <= eps) {
        return None;
    }
    let inv = svd.pseudo_inverse(eps).ok()?;
    inv.iter().all(|v| v.is_finite()).then_some(inv)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn damping_rows_shrink_the_step() {
        let j = DMatrix::from_row_slice(2, 1, &[1.0, 1.0]);
        let r = DVector::from_row_slice(&[4.0, 4.0]);

        let plain = solve_least_squares(&j, &r).unwrap();
        let damped_j = DMatrix::from_row_slice(3, 1, &[1.0, 1.0, 2.0]);
        let damped_r = DVector::from_row_slice(&[4.0, 4.0, 0.0]);
        let damped = solve_least_squares(&damped_j, &damped_r).unwrap();

        assert!((plain[0] - 4.0).abs() < 1e-10);
        assert!((damped[0] - 8.0 / 6.0).abs() < 1e-10);
    }

    #[test]
    fn inverts_diagonal_and_rejects_singular() {
        let m = DMatrix::from_row_slice(2, 2, &[4.0, 0.0, 0.0, 0.5]);
        let inv = invert_full_rank(&m).unwrap();
        assert!((inv[(0, 0)] - 0.25).abs() < 1e-12);
        assert!((inv[(1, 1)] - 2.0).abs() < 1e-12);
        assert!(inv[(0, 1)].abs() < 1e-12);

        let singular = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        assert!(invert_full_rank(&singular).is_none());
    }
}

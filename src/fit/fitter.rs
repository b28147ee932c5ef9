//! Weighted nonlinear least squares for one turn-on curve.
//!
//! Given:
//! - bin centers `x_i`
//! - efficiencies `y_i`
//! - symmetrized errors `w_i`
//!
//! we minimize `Σ ((f(x_i; p) − y_i) / w_i)²` over `p = [L, x0, k, b]` with a
//! Levenberg–Marquardt loop seeded by [`initial_params`]. Each damped step is a small
//! linear least squares problem solved by [`solve_least_squares`]; the damping uses
//! Marquardt's diagonal scaling so the very different parameter scales (`x0` in
//! GeV, `k` per GeV) do not need manual conditioning.

use nalgebra::{DMatrix, DVector};
use tracing::{debug, warn};

use crate::domain::{CHI2_SENTINEL, EfficiencyCurve, FitFamily, FitParams, FitResult};
use crate::error::AppError;
use crate::fit::initial_params;
use crate::math::{invert_full_rank, solve_least_squares};
use crate::models::{gradient, predict};

const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_MIN: f64 = 1e-15;
const LAMBDA_MAX: f64 = 1e16;

/// Why the optimizer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    ExactFit,
    Gradient,
    CostReduction,
    StepSize,
    /// No damping produced a downhill step.
    Stalled,
}

/// Optimizer controls.
#[derive(Debug, Clone, PartialEq)]
pub struct FitOptions {
    /// Budget of trial steps (accepted or rejected).
    pub max_iterations: usize,
    /// Relative reduction of the cost below which the fit is converged.
    pub ftol: f64,
    /// Relative step size below which the fit is converged.
    pub xtol: f64,
    /// Largest gradient component below which the fit is converged.
    pub gtol: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        FitOptions {
            max_iterations: 1000,
            ftol: 1.49012e-8,
            xtol: 1.49012e-8,
            gtol: 1e-10,
        }
    }
}

/// Fit an efficiency curve with its symmetrized errors as weights.
pub fn fit_efficiency(
    curve: &EfficiencyCurve,
    family: FitFamily,
    opts: &FitOptions,
) -> Result<FitResult, AppError> {
    fit_curve(
        family,
        &curve.xs(),
        &curve.efficiencies(),
        &curve.fit_weights(),
        opts,
    )
}

/// Fit `family` to `(x, y)` with per-point errors `weights`.
pub fn fit_curve(
    family: FitFamily,
    x: &[f64],
    y: &[f64],
    weights: &[f64],
    opts: &FitOptions,
) -> Result<FitResult, AppError> {
    let n = x.len();
    if n == 0 {
        return Err(AppError::config("No bins to fit."));
    }
    if y.len() != n || weights.len() != n {
        return Err(AppError::config(format!(
            "Fit inputs differ in length: x={n}, y={}, weights={}.",
            y.len(),
            weights.len()
        )));
    }
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return Err(AppError::Numerical("Fit input contains non-finite values.".into()));
    }
    if weights.iter().any(|w| !w.is_finite() || *w <= 0.0) {
        return Err(AppError::Numerical("Fit weights must be finite and positive.".into()));
    }

    let problem = Problem {
        family,
        x,
        y,
        weights,
    };
    let (p, iterations, stop) = problem.minimize(initial_params(x, y), opts)?;
    let params = FitParams::from_array(p);
    if !params.is_finite() {
        return Err(AppError::FitNonConvergence {
            iterations,
            reason: "parameters became non-finite".into(),
        });
    }

    let covariance = problem.covariance(&p);
    let chi2 = problem.cost(&p);
    let chi2_ndf = if n > family.param_count() {
        chi2 / (n - family.param_count()) as f64
    } else {
        CHI2_SENTINEL
    };
    debug!(family = %family, iterations, chi2_ndf, ?stop, "fit converged");

    Ok(FitResult {
        family,
        params,
        covariance,
        chi2_ndf,
        n_bins: n,
        iterations,
    })
}

struct Problem<'a> {
    family: FitFamily,
    x: &'a [f64],
    y: &'a [f64],
    weights: &'a [f64],
}

impl Problem<'_> {
    fn residuals(&self, p: &[f64; 4]) -> DVector<f64> {
        DVector::from_iterator(
            self.x.len(),
            (0..self.x.len())
                .map(|i| (predict(self.family, self.x[i], p) - self.y[i]) / self.weights[i]),
        )
    }

    fn jacobian(&self, p: &[f64; 4]) -> DMatrix<f64> {
        let mut j = DMatrix::<f64>::zeros(self.x.len(), 4);
        for i in 0..self.x.len() {
            let g = gradient(self.family, self.x[i], p);
            for k in 0..4 {
                j[(i, k)] = g[k] / self.weights[i];
            }
        }
        j
    }

    fn cost(&self, p: &[f64; 4]) -> f64 {
        self.residuals(p).norm_squared()
    }

    fn minimize(
        &self,
        seed: [f64; 4],
        opts: &FitOptions,
    ) -> Result<([f64; 4], usize, Stop), AppError> {
        let n = self.x.len();
        let mut p = seed;
        let mut r = self.residuals(&p);
        let mut cost = r.norm_squared();
        if !cost.is_finite() {
            return Err(AppError::Numerical("Cost is not finite at the starting point.".into()));
        }
        let mut lambda = LAMBDA_INIT;
        let mut iterations = 0usize;

        loop {
            if cost < 1e-30 {
                return Ok((p, iterations, Stop::ExactFit));
            }
            let j = self.jacobian(&p);
            let g = j.transpose() * &r;
            let g_max = g.amax();
            if g_max <= opts.gtol {
                return Ok((p, iterations, Stop::Gradient));
            }
            let scale: Vec<f64> = (0..4)
                .map(|k| j.column(k).norm_squared().max(f64::MIN_POSITIVE))
                .collect();

            loop {
                iterations += 1;
                if iterations > opts.max_iterations {
                    return Err(AppError::FitNonConvergence {
                        iterations: opts.max_iterations,
                        reason: format!("no convergence criterion met (cost {cost:.6e})"),
                    });
                }

                let mut a = DMatrix::<f64>::zeros(n + 4, 4);
                let mut rhs = DVector::<f64>::zeros(n + 4);
                for i in 0..n {
                    for k in 0..4 {
                        a[(i, k)] = j[(i, k)];
                    }
                    rhs[i] = -r[i];
                }
                for k in 0..4 {
                    a[(n + k, k)] = (lambda * scale[k]).sqrt();
                }

                let Some(delta) = solve_least_squares(&a, &rhs) else {
                    lambda *= 10.0;
                    continue;
                };
                let trial: [f64; 4] = std::array::from_fn(|k| p[k] + delta[k]);
                let r_trial = self.residuals(&trial);
                let cost_trial = r_trial.norm_squared();

                if cost_trial.is_finite() && cost_trial < cost {
                    let f_converged = cost - cost_trial <= opts.ftol * cost;
                    let p_norm = trial.iter().map(|v| v * v).sum::<f64>().sqrt();
                    let x_converged = delta.norm() <= opts.xtol * (p_norm + opts.xtol);

                    p = trial;
                    r = r_trial;
                    cost = cost_trial;
                    lambda = (lambda / 10.0).max(LAMBDA_MIN);
                    if f_converged {
                        return Ok((p, iterations, Stop::CostReduction));
                    }
                    if x_converged {
                        return Ok((p, iterations, Stop::StepSize));
                    }
                    break;
                }

                lambda *= 10.0;
                if lambda > LAMBDA_MAX {
                    // A stall with a gradient well above the tolerance is not a
                    // clean minimum; the result is kept but flagged.
                    if g_max > opts.gtol.max(1e-6) * (1.0 + cost) {
                        warn!(
                            family = %self.family,
                            iterations,
                            gradient = g_max,
                            cost,
                            "optimizer stalled before meeting a convergence criterion"
                        );
                    } else {
                        debug!(iterations, gradient = g_max, "optimizer stalled at a minimum");
                    }
                    return Ok((p, iterations, Stop::Stalled));
                }
            }
        }
    }

    /// `(JᵀJ)⁻¹` at `p`, all-infinite when singular.
    fn covariance(&self, p: &[f64; 4]) -> [[f64; 4]; 4] {
        let j = self.jacobian(p);
        let jtj = j.transpose() * &j;
        match invert_full_rank(&jtj) {
            Some(inv) => std::array::from_fn(|a| std::array::from_fn(|b| inv[(a, b)])),
            None => {
                warn!(family = %self.family, "singular Jacobian, covariance set to infinity");
                [[f64::INFINITY; 4]; 4]
            }
        }
    }
}

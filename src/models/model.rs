//! Model evaluation for the logistic and arctangent turn-on families.
//!
//! The fitter relies on two primitive operations:
//! - predict `y(x)` given the four parameters (for residuals/plots)
//! - the gradient of `y(x)` with respect to the parameters (for the Jacobian)
//!
//! The serializer additionally needs each family's algebraic form with the fitted
//! numbers substituted in.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::domain::{FitFamily, FitParams};

/// Predict `y(x)` for the given family. `p = [L, x0, k, b]`.
pub fn predict(family: FitFamily, x: f64, p: &[f64; 4]) -> f64 {
    let [l, x0, k, b] = *p;
    match family {
        FitFamily::Logistic => l / (1.0 + (-k * (x - x0)).exp()) + b,
        FitFamily::Arctangent => l * ((k * (x - x0)).atan() + FRAC_PI_2) / PI + b,
    }
}

/// Partial derivatives of `y(x)` with respect to `[L, x0, k, b]`.
pub fn gradient(family: FitFamily, x: f64, p: &[f64; 4]) -> [f64; 4] {
    let [l, x0, k, _] = *p;
    let dx = x - x0;
    match family {
        FitFamily::Logistic => {
            let s = 1.0 / (1.0 + (-k * dx).exp());
            let ds = l * s * (1.0 - s);
            [s, -k * ds, dx * ds, 1.0]
        }
        FitFamily::Arctangent => {
            let u = k * dx;
            let du = l / (PI * (1.0 + u * u));
            [(u.atan() + FRAC_PI_2) / PI, -k * du, dx * du, 1.0]
        }
    }
}

/// The family's closed form in `var`, with fitted values as literals.
///
/// Negative literals are parenthesized so the text stays valid after substitution.
pub fn expression(family: FitFamily, params: &FitParams, var: &str) -> String {
    let l = literal(params.asymptote);
    let x0 = literal(params.midpoint);
    let k = literal(params.slope);
    let b = literal(params.offset);
    match family {
        FitFamily::Logistic => format!("({l}/(1+exp(-{k}*({var}-{x0})))+{b})"),
        FitFamily::Arctangent => format!(
            "({l}*(atan({k}*({var}-{x0}))+{})/{}+{b})",
            literal(FRAC_PI_2),
            literal(PI)
        ),
    }
}

fn literal(v: f64) -> String {
    if v.is_sign_negative() {
        format!("({v})")
    } else {
        format!("{v}")
    }
}

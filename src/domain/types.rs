//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - passed between the estimator, the fitter and the serializer
//! - exported to JSON/CSV reports
//! - printed by the terminal summary

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::fit::FitOptions;

/// Reduced chi-square reported when the fit has no degrees of freedom left.
pub const CHI2_SENTINEL: f64 = -9999.0;

/// Parametric turn-on model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FitFamily {
    /// `L / (1 + exp(-k (x - x0))) + b`
    #[serde(alias = "sigmoid")]
    #[value(alias = "sigmoid")]
    Logistic,
    /// `L (atan(k (x - x0)) + π/2) / π + b`
    #[serde(alias = "arctan")]
    #[value(alias = "arctan")]
    Arctangent,
}

impl FitFamily {
    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            FitFamily::Logistic => "logistic",
            FitFamily::Arctangent => "arctangent",
        }
    }

    /// Number of free parameters (asymptote, midpoint, slope, offset).
    pub fn param_count(self) -> usize {
        4
    }
}

impl fmt::Display for FitFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Turn-on parameters shared by every family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitParams {
    /// Plateau height `L`.
    pub asymptote: f64,
    /// Turn-on position `x0`.
    pub midpoint: f64,
    /// Steepness `k`.
    pub slope: f64,
    /// Baseline `b`.
    pub offset: f64,
}

impl FitParams {
    pub fn to_array(self) -> [f64; 4] {
        [self.asymptote, self.midpoint, self.slope, self.offset]
    }

    pub fn from_array(p: [f64; 4]) -> Self {
        FitParams {
            asymptote: p[0],
            midpoint: p[1],
            slope: p[2],
            offset: p[3],
        }
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

/// Output of one curve fit. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub family: FitFamily,
    pub params: FitParams,
    /// Parameter covariance; all entries are infinite when `JᵀJ` was singular.
    pub covariance: [[f64; 4]; 4],
    /// Reduced chi-square, or [`CHI2_SENTINEL`] when `n_bins <= 4`.
    pub chi2_ndf: f64,
    pub n_bins: usize,
    pub iterations: usize,
}

impl FitResult {
    /// One-sigma parameter errors from the covariance diagonal.
    pub fn errors(&self) -> [f64; 4] {
        std::array::from_fn(|i| self.covariance[i][i].max(0.0).sqrt())
    }

    pub fn has_goodness_of_fit(&self) -> bool {
        self.chi2_ndf != CHI2_SENTINEL
    }
}

/// One bin of an efficiency curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyPoint {
    /// Bin center.
    pub x: f64,
    pub efficiency: f64,
    pub error_low: f64,
    pub error_high: f64,
}

impl EfficiencyPoint {
    /// Symmetrized least-squares weight: the larger error, 1 when both are 0.
    pub fn fit_weight(&self) -> f64 {
        let w = self.error_low.abs().max(self.error_high.abs());
        if w == 0.0 { 1.0 } else { w }
    }
}

/// Efficiency versus the probe variable for one (category, shift, process).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyCurve {
    pub variable: String,
    pub edges: Vec<f64>,
    pub points: Vec<EfficiencyPoint>,
}

impl EfficiencyCurve {
    pub fn xs(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.x).collect()
    }

    pub fn efficiencies(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.efficiency).collect()
    }

    pub fn fit_weights(&self) -> Vec<f64> {
        self.points.iter().map(EfficiencyPoint::fit_weight).collect()
    }
}

/// Identifies one estimator → fit chain.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CurveKey {
    pub category: String,
    pub shift: String,
    pub process: String,
}

impl CurveKey {
    pub fn new(category: &str, shift: &str, process: &str) -> Self {
        CurveKey {
            category: category.to_string(),
            shift: shift.to_string(),
            process: process.to_string(),
        }
    }
}

impl fmt::Display for CurveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.category, self.shift, self.process)
    }
}

/// Efficiency curve of one tuple with its fit, when the fit succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveRecord {
    pub key: CurveKey,
    pub curve: EfficiencyCurve,
    pub fit: Option<FitResult>,
}

/// A tuple or correction that could not be produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    /// Tuple key (`category/shift/process`) or correction name.
    pub target: String,
    /// Stable error label, see `AppError::kind`.
    pub kind: String,
    pub message: String,
}

impl Failure {
    pub fn new(target: impl Into<String>, err: &AppError) -> Self {
        Failure {
            target: target.into(),
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Names of the categorical axes the pipeline slices on.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisNames {
    pub shift: String,
    pub category: String,
    /// Selection-step axis; index 0 is the reference selection.
    pub step: String,
    /// Weighted/unweighted axis, when the bundle carries one.
    pub weighting: Option<String>,
}

impl Default for AxisNames {
    fn default() -> Self {
        AxisNames {
            shift: "shift".to_string(),
            category: "category".to_string(),
            step: "step".to_string(),
            weighting: Some("weighting".to_string()),
        }
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Coverage of the Clopper–Pearson interval, in (0, 1).
    pub confidence_level: f64,
    pub fit_family: FitFamily,
    /// Step index used as numerator; step 0 is always the denominator.
    pub eff_bin: usize,
    /// Use the unweighted slice of the weighting axis.
    pub unweighted: bool,
    /// Display name replacing the `eff_bin` step label in descriptions.
    pub alias: Option<String>,
    /// Numerator process first, optional reference process second.
    pub processes: Vec<String>,
    pub shifts: Vec<String>,
    pub nominal_shift: String,
    pub categories: Vec<String>,
    pub axes: AxisNames,
    pub correction_name: String,
    pub output_name: String,
    pub fit: FitOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            confidence_level: 0.6827,
            fit_family: FitFamily::Logistic,
            eff_bin: 1,
            unweighted: false,
            alias: None,
            processes: vec!["data".to_string()],
            shifts: vec!["nominal".to_string()],
            nominal_shift: "nominal".to_string(),
            categories: vec!["incl".to_string()],
            axes: AxisNames::default(),
            correction_name: "trig_cor".to_string(),
            output_name: "weight".to_string(),
            fit: FitOptions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_aliases_parse() {
        let f: FitFamily = serde_json::from_str("\"sigmoid\"").unwrap();
        assert_eq!(f, FitFamily::Logistic);
        let f = FitFamily::from_str("arctan", true).unwrap();
        assert_eq!(f, FitFamily::Arctangent);
    }

    #[test]
    fn zero_errors_give_unit_weight() {
        let p = EfficiencyPoint {
            x: 1.0,
            efficiency: 1.0,
            error_low: 0.0,
            error_high: 0.0,
        };
        assert_eq!(p.fit_weight(), 1.0);

        let q = EfficiencyPoint {
            error_low: 0.02,
            error_high: 0.05,
            ..p
        };
        assert_eq!(q.fit_weight(), 0.05);
    }

    #[test]
    fn errors_from_covariance_diagonal() {
        let mut covariance = [[0.0; 4]; 4];
        covariance[0][0] = 0.04;
        covariance[2][2] = 9.0;
        let r = FitResult {
            family: FitFamily::Logistic,
            params: FitParams::from_array([1.0, 2.0, 3.0, 0.0]),
            covariance,
            chi2_ndf: CHI2_SENTINEL,
            n_bins: 4,
            iterations: 3,
        };
        let e = r.errors();
        assert!((e[0] - 0.2).abs() < 1e-12);
        assert!((e[2] - 3.0).abs() < 1e-12);
        assert!(!r.has_goodness_of_fit());
    }
}

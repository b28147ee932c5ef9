//! Per-bin efficiency with Clopper–Pearson errors.
//!
//! Efficiency is `num / den`, 0 where the denominator is empty. Errors are the
//! distances from the efficiency to the interval bounds. Bounds that collapse onto a
//! boundary (empty bins, saturated bins, a bound at exactly ±1 away) are reported as
//! a zero error rather than a degenerate full-range bar; no error is ever NaN.

use crate::domain::{EfficiencyCurve, EfficiencyPoint};
use crate::error::AppError;
use crate::hist::{BinnedSeries, Histogram};
use crate::math::clopper_pearson;

/// Efficiency of `numerator` relative to `denominator`, both 1-D over the same axis.
pub fn estimate_efficiency(
    numerator: &Histogram,
    denominator: &Histogram,
    confidence_level: f64,
) -> Result<EfficiencyCurve, AppError> {
    let num = numerator.to_series()?;
    let den = denominator.to_series()?;
    efficiency_from_series(&num, &den, confidence_level)
}

pub fn efficiency_from_series(
    num: &BinnedSeries,
    den: &BinnedSeries,
    confidence_level: f64,
) -> Result<EfficiencyCurve, AppError> {
    if !(confidence_level > 0.0 && confidence_level < 1.0) {
        return Err(AppError::config(format!(
            "Confidence level must be in (0, 1), got {confidence_level}."
        )));
    }
    num.check_binning(den)?;

    let points = num
        .centers()
        .into_iter()
        .zip(num.sumw.iter().zip(den.sumw.iter()))
        .map(|(x, (&n, &d))| bin_efficiency(x, n, d, confidence_level))
        .collect();

    Ok(EfficiencyCurve {
        variable: num.axis.clone(),
        edges: num.edges.clone(),
        points,
    })
}

fn bin_efficiency(x: f64, num: f64, den: f64, confidence_level: f64) -> EfficiencyPoint {
    if den == 0.0 {
        return EfficiencyPoint {
            x,
            efficiency: 0.0,
            error_low: 0.0,
            error_high: 0.0,
        };
    }

    let efficiency = num / den;
    if num == den {
        return EfficiencyPoint {
            x,
            efficiency,
            error_low: 0.0,
            error_high: 0.0,
        };
    }

    let (low, high) = clopper_pearson(num, den, confidence_level);
    EfficiencyPoint {
        x,
        efficiency,
        error_low: clamp_error(efficiency - low, efficiency),
        error_high: clamp_error(high - efficiency, efficiency),
    }
}

fn clamp_error(error: f64, efficiency: f64) -> f64 {
    if !error.is_finite() || error <= 0.0 || error == efficiency || error == 1.0 {
        0.0
    } else {
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> BinnedSeries {
        BinnedSeries {
            axis: "ht".to_string(),
            edges: (0..=values.len()).map(|i| 10.0 * i as f64 + 5.0).collect(),
            sumw: values.to_vec(),
            sumw2: values.to_vec(),
        }
    }

    #[test]
    fn ratios_and_bin_centers() {
        let curve =
            efficiency_from_series(&series(&[2.0, 10.0, 48.0, 50.0]), &series(&[50.0; 4]), 0.6827)
                .unwrap();
        let eff = curve.efficiencies();
        let expected = [0.04, 0.2, 0.96, 1.0];
        for (e, x) in eff.iter().zip(expected) {
            assert!((e - x).abs() < 1e-12);
        }
        assert_eq!(curve.xs(), vec![10.0, 20.0, 30.0, 40.0]);

        let mid = curve.points[1];
        assert!(mid.error_low > 0.0 && mid.error_high > 0.0);
        assert!(mid.error_low < 0.1 && mid.error_high < 0.1);
    }

    #[test]
    fn empty_bin_is_zero_without_nan() {
        let curve = efficiency_from_series(&series(&[0.0]), &series(&[0.0]), 0.6827).unwrap();
        let p = curve.points[0];
        assert_eq!((p.efficiency, p.error_low, p.error_high), (0.0, 0.0, 0.0));
    }

    #[test]
    fn saturated_bin_clamps_both_errors() {
        let curve = efficiency_from_series(&series(&[50.0]), &series(&[50.0]), 0.6827).unwrap();
        let p = curve.points[0];
        assert_eq!((p.efficiency, p.error_low, p.error_high), (1.0, 0.0, 0.0));
    }

    #[test]
    fn zero_numerator_keeps_upper_error() {
        let curve = efficiency_from_series(&series(&[0.0]), &series(&[10.0]), 0.6827).unwrap();
        let p = curve.points[0];
        assert_eq!(p.efficiency, 0.0);
        assert_eq!(p.error_low, 0.0);
        assert!(p.error_high > 0.1 && p.error_high < 0.2);
    }

    #[test]
    fn mismatched_edges_name_the_axis() {
        let mut other = series(&[1.0, 1.0]);
        other.edges[1] = 16.0;
        let err = efficiency_from_series(&series(&[1.0, 1.0]), &other, 0.6827).unwrap_err();
        assert!(matches!(err, AppError::AxisMismatch { ref axis, .. } if axis == "ht"));
    }

    #[test]
    fn invalid_confidence_level_is_config_error() {
        let err = efficiency_from_series(&series(&[1.0]), &series(&[2.0]), 1.0).unwrap_err();
        assert_eq!(err.kind(), "config");
    }
}

//! Reporting utilities: per-tuple fit rows and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::{CurveKey, CurveRecord, FitFamily};

/// One fitted tuple, flattened for display.
#[derive(Debug, Clone, PartialEq)]
pub struct FitRow {
    pub key: CurveKey,
    pub family: FitFamily,
    pub params: [f64; 4],
    /// One-sigma errors; infinite when the covariance could not be computed.
    pub errors: [f64; 4],
    /// `None` when the fit had no degrees of freedom left.
    pub chi2_ndf: Option<f64>,
    pub n_bins: usize,
    pub iterations: usize,
}

/// Collect the rows of every record that carries a fit, in record order.
pub fn fit_rows(records: &[CurveRecord]) -> Vec<FitRow> {
    records
        .iter()
        .filter_map(|r| {
            let fit = r.fit.as_ref()?;
            Some(FitRow {
                key: r.key.clone(),
                family: fit.family,
                params: fit.params.to_array(),
                errors: fit.errors(),
                chi2_ndf: fit.has_goodness_of_fit().then_some(fit.chi2_ndf),
                n_bins: fit.n_bins,
                iterations: fit.iterations,
            })
        })
        .collect()
}

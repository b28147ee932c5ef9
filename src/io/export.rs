//! Export efficiency curves and fit results.
//!
//! - CSV: one row per (category, shift, process, bin), easy to consume in
//!   spreadsheets or plotting scripts
//! - JSON: every fit result plus the failure list

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::domain::{CurveKey, CurveRecord, Failure, FitFamily, FitResult};
use crate::error::AppError;
use crate::models::predict;

/// Write per-bin efficiencies (and fitted values where a fit exists) to CSV.
pub fn write_efficiency_csv(path: &Path, records: &[CurveRecord]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);

    writeln!(
        out,
        "category,shift,process,x,efficiency,error_low,error_high,fit_weight,fitted"
    )
    .map_err(|e| AppError::io(format!("Failed to write export CSV header: {e}")))?;

    for r in records {
        for p in &r.curve.points {
            let fitted = r
                .fit
                .as_ref()
                .map(|f| format!("{:.6}", predict(f.family, p.x, &f.params.to_array())))
                .unwrap_or_default();
            writeln!(
                out,
                "{},{},{},{},{:.6},{:.6},{:.6},{:.6},{}",
                r.key.category,
                r.key.shift,
                r.key.process,
                p.x,
                p.efficiency,
                p.error_low,
                p.error_high,
                p.fit_weight(),
                fitted,
            )
            .map_err(|e| AppError::io(format!("Failed to write export CSV row: {e}")))?;
        }
    }

    out.flush()
        .map_err(|e| AppError::io(format!("Failed to flush export CSV: {e}")))
}

#[derive(Serialize)]
struct FitReport<'a> {
    tool: &'static str,
    family: FitFamily,
    confidence_level: f64,
    fits: Vec<FitEntry<'a>>,
    failures: &'a [Failure],
}

#[derive(Serialize)]
struct FitEntry<'a> {
    key: &'a CurveKey,
    result: &'a FitResult,
}

/// Write all fit results and failures as JSON.
///
/// Non-finite covariance entries (singular fits) are written as `null`.
pub fn write_fit_report(
    path: &Path,
    family: FitFamily,
    confidence_level: f64,
    records: &[CurveRecord],
    failures: &[Failure],
) -> Result<(), AppError> {
    let report = FitReport {
        tool: "tw",
        family,
        confidence_level,
        fits: records
            .iter()
            .filter_map(|r| r.fit.as_ref().map(|result| FitEntry { key: &r.key, result }))
            .collect(),
        failures,
    };
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create fit report '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, &report)
        .map_err(|e| AppError::io(format!("Failed to write fit report: {e}")))
}

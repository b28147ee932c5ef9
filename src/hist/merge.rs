use std::collections::BTreeMap;

use tracing::debug;

use super::histogram::Histogram;
use crate::error::AppError;

/// Histograms of one data-taking period, keyed by process.
pub type ProcessMap = BTreeMap<String, Histogram>;

/// Per-period process maps, keyed by period identifier.
pub type PeriodMap = BTreeMap<String, ProcessMap>;

/// Sum each process across periods.
///
/// A process seen in a single period passes through unchanged, and a single period
/// is returned as-is.
pub fn merge_periods(periods: PeriodMap) -> Result<ProcessMap, AppError> {
    if periods.len() == 1 {
        return Ok(periods.into_values().next().unwrap_or_default());
    }

    let mut merged = ProcessMap::new();
    for (period, processes) in periods {
        for (process, hist) in processes {
            match merged.get_mut(&process) {
                Some(total) => {
                    debug!(period = period.as_str(), process = process.as_str(), "adding period");
                    total.add(&hist)?;
                }
                None => {
                    merged.insert(process, hist);
                }
            }
        }
    }
    Ok(merged)
}

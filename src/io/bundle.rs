//! Histogram bundle JSON: the input handed over by the binning stage.
//!
//! ```json
//! {
//!   "variable": "ht",
//!   "periods": { "2017": { "data": { "axes": [...], "storage": {...} } } },
//!   "category_leaves": { "incl": ["4j", "5j", "6j"] }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::hist::PeriodMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBundle {
    /// Name of the numeric probe axis.
    pub variable: String,
    pub periods: PeriodMap,
    /// Categories that are sums of finer leaf categories on the category axis.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub category_leaves: BTreeMap<String, Vec<String>>,
}

impl HistogramBundle {
    /// Check every histogram and that the probe axis exists everywhere.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.periods.is_empty() {
            return Err(AppError::config("Bundle contains no periods."));
        }
        for (period, processes) in &self.periods {
            for (process, hist) in processes {
                hist.validate().map_err(|e| {
                    AppError::config(format!("Histogram {period}/{process}: {e}"))
                })?;
                if !hist.axis(&self.variable).is_some_and(|a| a.is_numeric()) {
                    return Err(AppError::config(format!(
                        "Histogram {period}/{process} has no numeric axis '{}'.",
                        self.variable
                    )));
                }
            }
        }
        Ok(())
    }

    /// Leaf categories making up `category` (the category itself when it has none).
    pub fn leaves(&self, category: &str) -> Vec<String> {
        self.category_leaves
            .get(category)
            .cloned()
            .unwrap_or_else(|| vec![category.to_string()])
    }
}

/// Read and validate a bundle JSON file.
pub fn read_bundle(path: &Path) -> Result<HistogramBundle, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open bundle '{}': {e}", path.display())))?;
    let bundle: HistogramBundle = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::io(format!("Invalid bundle JSON '{}': {e}", path.display())))?;
    bundle.validate()?;
    Ok(bundle)
}

/// Write a bundle JSON file.
pub fn write_bundle(path: &Path, bundle: &HistogramBundle) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create bundle '{}': {e}", path.display())))?;
    serde_json::to_writer(BufWriter::new(file), bundle)
        .map_err(|e| AppError::io(format!("Failed to write bundle JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hist::{Axis, Histogram, ProcessMap, Storage};

    fn bundle() -> HistogramBundle {
        let h = Histogram::new(
            vec![
                Axis::category("shift", ["nominal"]),
                Axis::numeric("ht", vec![0.0, 100.0, 200.0]),
            ],
            Storage::Count(vec![3.0, 4.0]),
        )
        .unwrap();
        let mut processes = ProcessMap::new();
        processes.insert("data".to_string(), h);
        let mut periods = PeriodMap::new();
        periods.insert("2018".to_string(), processes);
        HistogramBundle {
            variable: "ht".to_string(),
            periods,
            category_leaves: BTreeMap::new(),
        }
    }

    #[test]
    fn json_round_trip_keeps_layout() {
        let b = bundle();
        let text = serde_json::to_string(&b).unwrap();
        assert!(text.contains("\"kind\":\"category\""));
        assert!(text.contains("\"type\":\"count\""));
        let back: HistogramBundle = serde_json::from_str(&text).unwrap();
        assert_eq!(back, b);
        back.validate().unwrap();
    }

    #[test]
    fn missing_probe_axis_is_rejected() {
        let mut b = bundle();
        b.variable = "mjj".to_string();
        assert!(matches!(b.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn leaves_default_to_the_category() {
        let mut b = bundle();
        assert_eq!(b.leaves("incl"), vec!["incl".to_string()]);
        b.category_leaves
            .insert("incl".to_string(), vec!["4j".to_string(), "5j".to_string()]);
        assert_eq!(b.leaves("incl").len(), 2);
    }
}

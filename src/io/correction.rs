//! Read/write correction-set JSON files.
//!
//! This is the artifact handed to the event-weighting stage, so it is written
//! pretty-printed and read back with the same schema types.

use std::fs::File;
use std::path::Path;

use crate::correction::CorrectionSet;
use crate::error::AppError;

pub fn write_correction_json(path: &Path, set: &CorrectionSet) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::io(format!("Failed to create correction JSON '{}': {e}", path.display()))
    })?;
    serde_json::to_writer_pretty(file, set)
        .map_err(|e| AppError::io(format!("Failed to write correction JSON: {e}")))
}

pub fn read_correction_json(path: &Path) -> Result<CorrectionSet, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::io(format!("Failed to open correction JSON '{}': {e}", path.display()))
    })?;
    serde_json::from_reader(file)
        .map_err(|e| AppError::io(format!("Invalid correction JSON '{}': {e}", path.display())))
}

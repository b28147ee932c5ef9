//! Crate-wide error type.
//!
//! Every failure carries a stable exit code so the binary can map it to a process
//! status, and a short `kind()` label used when reporting failed tuples.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AppError {
    /// Invalid or inconsistent configuration (missing nominal shift, unknown axis,
    /// unsupported storage or fit family, ...).
    #[error("configuration error: {0}")]
    Config(String),

    /// Two histograms that are combined or divided disagree on an axis.
    #[error("axis mismatch on '{axis}': {detail}")]
    AxisMismatch { axis: String, detail: String },

    /// The optimizer stopped without meeting any convergence criterion.
    #[error("fit did not converge after {iterations} iterations: {reason}")]
    FitNonConvergence { iterations: usize, reason: String },

    /// Non-finite numbers where a finite value is required.
    #[error("numerical error: {0}")]
    Numerical(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl AppError {
    pub fn config(message: impl Into<String>) -> Self {
        AppError::Config(message.into())
    }

    pub fn axis_mismatch(axis: impl Into<String>, detail: impl Into<String>) -> Self {
        AppError::AxisMismatch {
            axis: axis.into(),
            detail: detail.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        AppError::Io(message.into())
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Config(_) | AppError::Io(_) => 2,
            AppError::AxisMismatch { .. } => 3,
            AppError::FitNonConvergence { .. } | AppError::Numerical(_) => 4,
        }
    }

    /// Short label for reports and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::AxisMismatch { .. } => "axis-mismatch",
            AppError::FitNonConvergence { .. } => "fit-non-convergence",
            AppError::Numerical(_) => "numerical",
            AppError::Io(_) => "io",
        }
    }
}

//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the fit family enum and fitted parameters (`FitFamily`, `FitParams`, `FitResult`)
//! - efficiency curves and the key of one estimator → fit chain (`EfficiencyCurve`, `CurveKey`)
//! - the run configuration (`PipelineConfig`, `AxisNames`)

pub mod types;

pub use types::*;

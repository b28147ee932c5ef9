//! `trigger-weights` library crate.
//!
//! Turns per-period trigger histograms into fitted efficiency turn-on curves and
//! portable correction formulas. The binary (`tw`) is a thin wrapper around this
//! library so that:
//!
//! - the pipeline is testable without spawning processes
//! - the estimator, fitter and serializer are reusable on their own

pub mod app;
pub mod cli;
pub mod correction;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod hist;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;

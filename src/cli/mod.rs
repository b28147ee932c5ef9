//! Command-line parsing for the trigger-efficiency fitter.
//!
//! Argument parsing and command dispatch stay separate from the estimation and
//! fitting code; `app` turns these structs into a [`PipelineConfig`].
//!
//! [`PipelineConfig`]: crate::domain::PipelineConfig

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::FitFamily;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "tw", version, about = "Trigger efficiency fits and correction weights")]
pub struct Cli {
    /// Maximum log level (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit efficiency curves from a histogram bundle and write the correction set.
    Fit(FitArgs),
    /// Generate a synthetic histogram bundle.
    Toy(ToyArgs),
    /// Evaluate a correction from a correction-set JSON.
    Eval(EvalArgs),
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// Histogram bundle JSON.
    #[arg(value_name = "BUNDLE")]
    pub bundle: PathBuf,

    /// Output correction-set JSON.
    #[arg(short, long, default_value = "trigger_corrections.json")]
    pub out: PathBuf,

    /// Turn-on model.
    #[arg(long, value_enum, default_value_t = FitFamily::Logistic)]
    pub family: FitFamily,

    /// Coverage of the Clopper–Pearson interval.
    #[arg(long, default_value_t = 0.6827)]
    pub confidence_level: f64,

    /// Selection step used as numerator (step 0 is the denominator).
    #[arg(long, default_value_t = 1)]
    pub eff_bin: usize,

    /// Use the unweighted slice of the weighting axis.
    #[arg(long)]
    pub unweighted: bool,

    /// Display name of the signal trigger in correction descriptions.
    #[arg(long)]
    pub alias: Option<String>,

    /// Numerator process, optionally followed by the reference process.
    #[arg(short, long = "process", num_args = 1.., default_values_t = ["data".to_string()])]
    pub processes: Vec<String>,

    /// Shifts to produce corrections for.
    #[arg(long = "shift", num_args = 1.., default_values_t = ["nominal".to_string()])]
    pub shifts: Vec<String>,

    /// Name of the nominal shift.
    #[arg(long, default_value = "nominal")]
    pub nominal: String,

    /// Categories to produce corrections for.
    #[arg(short, long = "category", num_args = 1.., default_values_t = ["incl".to_string()])]
    pub categories: Vec<String>,

    #[arg(long, default_value = "shift")]
    pub shift_axis: String,

    #[arg(long, default_value = "category")]
    pub category_axis: String,

    #[arg(long, default_value = "step")]
    pub step_axis: String,

    /// Weighted/unweighted axis; `none` when the bundle has no such axis.
    #[arg(long, default_value = "weighting")]
    pub weighting_axis: String,

    /// Base name of the produced corrections.
    #[arg(long, default_value = "trig_cor")]
    pub correction_name: String,

    /// Name of the correction output variable.
    #[arg(long, default_value = "weight")]
    pub output_name: String,

    /// Budget of optimizer trial steps per fit.
    #[arg(long, default_value_t = 1000)]
    pub max_iterations: usize,

    /// Export per-bin efficiencies to CSV.
    #[arg(long)]
    pub export_csv: Option<PathBuf>,

    /// Export all fit results and failures to JSON.
    #[arg(long)]
    pub report_json: Option<PathBuf>,

    /// Plot the efficiency curve of every fitted tuple.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

#[derive(Debug, Args, Clone)]
pub struct ToyArgs {
    /// Output bundle JSON.
    #[arg(short, long, default_value = "toy_bundle.json")]
    pub out: PathBuf,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Data-taking periods to generate.
    #[arg(long = "period", num_args = 1.., default_values_t = ["2017".to_string(), "2018".to_string()])]
    pub periods: Vec<String>,

    /// Scale factor on the mean number of reference events per bin.
    #[arg(long, default_value_t = 1.0)]
    pub luminosity: f64,
}

#[derive(Debug, Args, Clone)]
pub struct EvalArgs {
    /// Correction-set JSON produced by `tw fit`.
    #[arg(long, value_name = "JSON")]
    pub corrections: PathBuf,

    /// Correction name; defaults to the first correction in the set.
    #[arg(long)]
    pub name: Option<String>,

    /// Input values, one evaluation each.
    #[arg(required = true, allow_negative_numbers = true)]
    pub values: Vec<f64>,
}

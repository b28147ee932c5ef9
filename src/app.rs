//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the "real main" that:
//! - parses CLI arguments and installs the log subscriber
//! - runs the correction pipeline on a histogram bundle
//! - prints the summary and plots
//! - writes the correction set and optional exports

use clap::Parser;
use tracing::info;

use crate::cli::{Cli, Command, EvalArgs, FitArgs, ToyArgs};
use crate::data::{ToyConfig, generate_bundle};
use crate::domain::{AxisNames, PipelineConfig};
use crate::error::AppError;
use crate::fit::FitOptions;

pub mod pipeline;

/// Entry point for the `tw` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Toy(args) => handle_toy(args),
        Command::Eval(args) => handle_eval(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = pipeline_config_from_args(&args);
    let bundle = crate::io::read_bundle(&args.bundle)?;
    let output = pipeline::run_pipeline(bundle, &config)?;

    println!("{}", crate::report::format_run_summary(&output, &config));

    if args.plot {
        for record in output.records.iter().filter(|r| r.fit.is_some()) {
            println!(
                "{}",
                crate::plot::render_efficiency_plot(record, args.width, args.height)
            );
        }
    }

    crate::io::write_correction_json(&args.out, &output.corrections)?;
    info!(
        path = %args.out.display(),
        corrections = output.corrections.corrections.len(),
        "wrote correction set"
    );

    if let Some(path) = &args.export_csv {
        crate::io::write_efficiency_csv(path, &output.records)?;
    }
    if let Some(path) = &args.report_json {
        crate::io::write_fit_report(
            path,
            config.fit_family,
            config.confidence_level,
            &output.records,
            &output.failures,
        )?;
    }

    Ok(())
}

fn handle_toy(args: ToyArgs) -> Result<(), AppError> {
    if !(args.luminosity.is_finite() && args.luminosity > 0.0) {
        return Err(AppError::config(format!(
            "Luminosity scale must be positive, got {}.",
            args.luminosity
        )));
    }
    let mut config = ToyConfig {
        seed: args.seed,
        periods: args.periods,
        ..ToyConfig::default()
    };
    for process in &mut config.processes {
        process.events_per_bin *= args.luminosity;
    }

    let bundle = generate_bundle(&config)?;
    crate::io::write_bundle(&args.out, &bundle)?;
    println!(
        "Wrote {} period(s) x {} process(es) to {}",
        bundle.periods.len(),
        config.processes.len(),
        args.out.display()
    );
    Ok(())
}

fn handle_eval(args: EvalArgs) -> Result<(), AppError> {
    let set = crate::io::read_correction_json(&args.corrections)?;
    let correction = match &args.name {
        Some(name) => set
            .get(name)
            .ok_or_else(|| AppError::config(format!("No correction named '{name}'.")))?,
        None => set
            .corrections
            .first()
            .ok_or_else(|| AppError::config("Correction set is empty."))?,
    };

    for &x in &args.values {
        println!("{x}\t{}", correction.evaluate(&[x])?);
    }
    Ok(())
}

pub fn pipeline_config_from_args(args: &FitArgs) -> PipelineConfig {
    PipelineConfig {
        confidence_level: args.confidence_level,
        fit_family: args.family,
        eff_bin: args.eff_bin,
        unweighted: args.unweighted,
        alias: args.alias.clone(),
        processes: args.processes.clone(),
        shifts: args.shifts.clone(),
        nominal_shift: args.nominal.clone(),
        categories: args.categories.clone(),
        axes: AxisNames {
            shift: args.shift_axis.clone(),
            category: args.category_axis.clone(),
            step: args.step_axis.clone(),
            weighting: (args.weighting_axis != "none").then(|| args.weighting_axis.clone()),
        },
        correction_name: args.correction_name.clone(),
        output_name: args.output_name.clone(),
        fit: FitOptions {
            max_iterations: args.max_iterations,
            ..FitOptions::default()
        },
    }
}

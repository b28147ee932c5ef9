//! The correction pipeline shared by `tw fit` and the integration tests.
//!
//! normalize -> align shifts -> merge periods -> (per tuple, in parallel)
//! reduce -> efficiency -> fit -> (per category and shift) serialize
//!
//! Failures are isolated: a process that cannot be prepared fails all of its tuples,
//! a tuple that cannot be estimated or fitted fails alone, and a correction that
//! cannot be serialized is skipped. Everything else is still produced.

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::correction::{CorrectionLabels, CorrectionSet, build_correction};
use crate::domain::{CurveKey, CurveRecord, Failure, FitResult, PipelineConfig};
use crate::error::AppError;
use crate::fit::{estimate_efficiency, fit_efficiency};
use crate::hist::{Histogram, PeriodMap, align_shifts, merge_periods, normalize};
use crate::io::HistogramBundle;

/// Everything a pipeline run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// One record per tuple whose efficiency could be estimated, in
    /// (category, shift, process) configuration order.
    pub records: Vec<CurveRecord>,
    pub corrections: CorrectionSet,
    pub failures: Vec<Failure>,
}

impl PipelineOutput {
    pub fn record(&self, key: &CurveKey) -> Option<&CurveRecord> {
        self.records.iter().find(|r| &r.key == key)
    }
}

/// Check the configuration before touching any histogram.
pub fn validate_config(config: &PipelineConfig) -> Result<(), AppError> {
    if !(config.confidence_level > 0.0 && config.confidence_level < 1.0) {
        return Err(AppError::config(format!(
            "Confidence level must be in (0, 1), got {}.",
            config.confidence_level
        )));
    }
    match config.processes.len() {
        1 | 2 => {}
        0 => return Err(AppError::config("At least one process is required.")),
        n => {
            return Err(AppError::config(format!(
                "At most two processes (numerator, reference) are supported, got {n}: {:?}.",
                config.processes
            )));
        }
    }
    if config.categories.is_empty() {
        return Err(AppError::config("At least one category is required."));
    }
    if config.shifts.is_empty() {
        return Err(AppError::config("At least one shift is required."));
    }
    if config.eff_bin == 0 {
        warn!("bin zero is used for efficiency calculation, numerator equals denominator");
    }
    Ok(())
}

/// Run the full pipeline on a bundle.
///
/// Only configuration problems abort the run; data problems become [`Failure`]s.
pub fn run_pipeline(
    bundle: HistogramBundle,
    config: &PipelineConfig,
) -> Result<PipelineOutput, AppError> {
    validate_config(config)?;
    let mut expected_shifts = config.shifts.clone();
    if !expected_shifts.contains(&config.nominal_shift) {
        expected_shifts.insert(0, config.nominal_shift.clone());
    }

    let keys: Vec<CurveKey> = config
        .categories
        .iter()
        .flat_map(|category| {
            config.shifts.iter().flat_map(move |shift| {
                config
                    .processes
                    .iter()
                    .map(move |process| CurveKey::new(category, shift, process))
            })
        })
        .collect();

    // Prepare each requested process: normalize, align, merge across periods.
    let mut merged: BTreeMap<String, Histogram> = BTreeMap::new();
    let mut failures = Vec::new();
    for process in &config.processes {
        match prepare_process(&bundle.periods, process, &expected_shifts, config) {
            Ok(hist) => {
                merged.insert(process.clone(), hist);
            }
            Err(err) => {
                warn!(process = process.as_str(), kind = err.kind(), "{err}");
                failures.extend(
                    keys.iter()
                        .filter(|k| &k.process == process)
                        .map(|k| Failure::new(k.to_string(), &err)),
                );
            }
        }
    }

    let outcomes: Vec<(Option<CurveRecord>, Option<Failure>)> = keys
        .par_iter()
        .filter_map(|key| {
            let hist = merged.get(&key.process)?;
            Some(run_tuple(hist, key, &bundle.leaves(&key.category), config))
        })
        .collect();

    let mut records = Vec::new();
    for (record, failure) in outcomes {
        if let Some(failure) = failure {
            warn!(
                tuple = failure.target.as_str(),
                kind = failure.kind.as_str(),
                "{}",
                failure.message
            );
            failures.push(failure);
        }
        records.extend(record);
    }

    let description = describe(
        merged
            .get(&config.processes[0])
            .or_else(|| merged.values().next()),
        config,
    );
    let mut corrections = Vec::new();
    for category in &config.categories {
        for shift in &config.shifts {
            let name = correction_name(config, category, shift);
            let fit_of = |process: &str| find_fit(&records, &CurveKey::new(category, shift, process));
            let Some(numerator) = fit_of(config.processes[0].as_str()) else {
                warn!(correction = name.as_str(), "numerator fit unavailable, skipping");
                continue;
            };
            let reference = match config.processes.get(1) {
                Some(process) => match fit_of(process.as_str()) {
                    Some(fit) => Some(fit),
                    None => {
                        warn!(correction = name.as_str(), "reference fit unavailable, skipping");
                        continue;
                    }
                },
                None => None,
            };

            let labels = CorrectionLabels {
                name: &name,
                description: &description,
                input: &bundle.variable,
                output: &config.output_name,
            };
            match build_correction(&labels, numerator, reference) {
                Ok(correction) => {
                    info!(correction = name.as_str(), "produced correction");
                    corrections.push(correction);
                }
                Err(err) => {
                    warn!(correction = name.as_str(), kind = err.kind(), "{err}");
                    failures.push(Failure::new(name, &err));
                }
            }
        }
    }

    Ok(PipelineOutput {
        records,
        corrections: CorrectionSet::new(corrections),
        failures,
    })
}

fn find_fit<'a>(records: &'a [CurveRecord], key: &CurveKey) -> Option<&'a FitResult> {
    records.iter().find(|r| &r.key == key)?.fit.as_ref()
}

/// Normalize and align every period's histogram of `process`, then sum the periods.
fn prepare_process(
    periods: &PeriodMap,
    process: &str,
    expected_shifts: &[String],
    config: &PipelineConfig,
) -> Result<Histogram, AppError> {
    let mut per_period = PeriodMap::new();
    for (period, processes) in periods {
        let Some(hist) = processes.get(process) else {
            continue;
        };
        let aligned = align_shifts(
            normalize(hist.clone()),
            &config.axes.shift,
            expected_shifts,
            &config.nominal_shift,
        )?;
        per_period
            .entry(period.clone())
            .or_default()
            .insert(process.to_string(), aligned);
    }
    if per_period.is_empty() {
        return Err(AppError::config(format!(
            "Process '{process}' is not present in any period."
        )));
    }
    merge_periods(per_period)?
        .remove(process)
        .ok_or_else(|| AppError::config(format!("Process '{process}' vanished while merging.")))
}

/// Reduce one tuple to numerator/denominator, estimate, fit.
fn run_tuple(
    hist: &Histogram,
    key: &CurveKey,
    leaves: &[String],
    config: &PipelineConfig,
) -> (Option<CurveRecord>, Option<Failure>) {
    let curve = match reduce(hist, key, leaves, config).and_then(|(num, den)| {
        estimate_efficiency(&num, &den, config.confidence_level)
    }) {
        Ok(curve) => curve,
        Err(err) => return (None, Some(Failure::new(key.to_string(), &err))),
    };

    match fit_efficiency(&curve, config.fit_family, &config.fit) {
        Ok(fit) => (
            Some(CurveRecord {
                key: key.clone(),
                curve,
                fit: Some(fit),
            }),
            None,
        ),
        Err(err) => (
            Some(CurveRecord {
                key: key.clone(),
                curve,
                fit: None,
            }),
            Some(Failure::new(key.to_string(), &err)),
        ),
    }
}

fn reduce(
    hist: &Histogram,
    key: &CurveKey,
    leaves: &[String],
    config: &PipelineConfig,
) -> Result<(Histogram, Histogram), AppError> {
    let axes = &config.axes;
    let mut h = match &axes.weighting {
        Some(weighting) if hist.axis(weighting).is_some() => {
            hist.select_index(weighting, usize::from(config.unweighted))?
        }
        _ => hist.clone(),
    };
    h = h.select(&axes.shift, &key.shift)?;
    h = h.sum_labels(&axes.category, leaves)?;

    let numerator = h.select_index(&axes.step, config.eff_bin)?;
    let denominator = h.select_index(&axes.step, 0)?;
    Ok((numerator, denominator))
}

/// Correction name: base name, `_{category}` for multi-category runs, `_{shift}` off nominal.
pub fn correction_name(config: &PipelineConfig, category: &str, shift: &str) -> String {
    let mut name = config.correction_name.clone();
    if config.categories.len() > 1 {
        name.push('_');
        name.push_str(category);
    }
    if shift != config.nominal_shift {
        name.push('_');
        name.push_str(shift);
    }
    name
}

fn describe(hist: Option<&Histogram>, config: &PipelineConfig) -> String {
    let step_label = |index: usize| -> String {
        hist.and_then(|h| h.axis(&config.axes.step))
            .and_then(|a| a.labels())
            .and_then(|labels| labels.get(index).cloned())
            .unwrap_or_else(|| format!("step {index}"))
    };
    let signal = config
        .alias
        .clone()
        .unwrap_or_else(|| step_label(config.eff_bin));
    format!(
        "Trigger correction using {} as the base trigger and {signal} as the signal trigger",
        step_label(0)
    )
}

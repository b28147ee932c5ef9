//! Seeded synthetic histogram bundles.
//!
//! Every process draws, per (period, shift, category, bin), a reference count
//! `N ~ Poisson(events_per_bin)` and a passing count `k ~ Binomial(N, eff(x))` from
//! its true turn-on. Events are filled into weighted-mean storage on the axes
//! `weighting × shift × category × <variable> × step`: the weighted slice carries
//! per-event weights drawn around 1, the unweighted slice weight 1. Step 0 holds all
//! `N` events, every later step the `k` passing ones.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{Binomial, Poisson, Uniform};

use crate::domain::{FitFamily, FitParams};
use crate::error::AppError;
use crate::hist::{
    Axis, Histogram, MeanAccumulator, PeriodMap, ProcessMap, Storage, StorageKind,
};
use crate::io::HistogramBundle;
use crate::models::predict;

/// One simulated process.
#[derive(Debug, Clone)]
pub struct ToyProcess {
    pub name: String,
    /// True turn-on of the signal steps (logistic).
    pub truth: FitParams,
    /// Mean reference count per bin and period.
    pub events_per_bin: f64,
    /// Shifts this process does not provide (exercises the shift aligner).
    pub omit_shifts: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ToyConfig {
    pub seed: u64,
    pub variable: String,
    pub edges: Vec<f64>,
    pub periods: Vec<String>,
    pub shifts: Vec<String>,
    pub categories: Vec<String>,
    pub steps: Vec<String>,
    pub processes: Vec<ToyProcess>,
}

impl Default for ToyConfig {
    fn default() -> Self {
        ToyConfig {
            seed: 42,
            variable: "ht".to_string(),
            edges: (0..=30).map(|i| 200.0 + 20.0 * i as f64).collect(),
            periods: vec!["2017".to_string(), "2018".to_string()],
            shifts: vec!["nominal".to_string(), "jec_up".to_string(), "jec_down".to_string()],
            categories: vec!["incl".to_string()],
            steps: vec!["ref".to_string(), "signal".to_string()],
            processes: vec![
                ToyProcess {
                    name: "data".to_string(),
                    truth: FitParams::from_array([0.97, 420.0, 0.04, 0.01]),
                    events_per_bin: 400.0,
                    omit_shifts: vec!["jec_up".to_string(), "jec_down".to_string()],
                },
                ToyProcess {
                    name: "tt".to_string(),
                    truth: FitParams::from_array([0.99, 400.0, 0.045, 0.0]),
                    events_per_bin: 600.0,
                    omit_shifts: Vec::new(),
                },
            ],
        }
    }
}

/// Shifted turn-on position for the `index`-th shift (0 is nominal).
fn shifted(truth: &FitParams, index: usize) -> [f64; 4] {
    let mut p = truth.to_array();
    let sign = if index % 2 == 1 { 1.0 } else { -1.0 };
    p[1] += sign * 5.0 * index.div_ceil(2) as f64;
    p
}

pub fn generate_bundle(config: &ToyConfig) -> Result<HistogramBundle, AppError> {
    if config.edges.len() < 2 {
        return Err(AppError::config("Toy binning needs at least two edges."));
    }
    if config.steps.len() < 2 {
        return Err(AppError::config("Toy needs a reference step and at least one signal step."));
    }
    let mut rng = StdRng::seed_from_u64(config.seed);
    let event_weight = Uniform::new(0.8, 1.2);
    let centers: Vec<f64> = config.edges.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect();

    let mut periods = PeriodMap::new();
    for period in &config.periods {
        let mut processes = ProcessMap::new();
        for process in &config.processes {
            let shifts: Vec<(usize, &String)> = config
                .shifts
                .iter()
                .enumerate()
                .filter(|(_, s)| !process.omit_shifts.contains(*s))
                .collect();
            let axes = vec![
                Axis::category("weighting", ["weighted", "unweighted"]),
                Axis::category("shift", shifts.iter().map(|(_, s)| s.as_str())),
                Axis::category("category", config.categories.iter().map(String::as_str)),
                Axis::numeric(&config.variable, config.edges.clone()),
                Axis::category("step", config.steps.iter().map(String::as_str)),
            ];
            let mut hist = Histogram::zeros(axes, StorageKind::WeightedMean)?;
            let poisson = Poisson::new(process.events_per_bin)
                .map_err(|e| AppError::Numerical(format!("Poisson mean: {e}")))?;

            for (si, (shift_index, _)) in shifts.iter().enumerate() {
                let params = shifted(&process.truth, *shift_index);
                for ci in 0..config.categories.len() {
                    for (bi, &x) in centers.iter().enumerate() {
                        let eff = predict(FitFamily::Logistic, x, &params).clamp(0.0, 1.0);
                        let n = poisson.sample(&mut rng) as u64;
                        let k = Binomial::new(n, eff)
                            .map_err(|e| AppError::Numerical(format!("Binomial: {e}")))?
                            .sample(&mut rng);
                        let weights: Vec<f64> =
                            (0..n).map(|_| event_weight.sample(&mut rng)).collect();

                        for step in 0..config.steps.len() {
                            let passing = if step == 0 { n as usize } else { k as usize };
                            let mut weighted = MeanAccumulator::default();
                            let mut unweighted = MeanAccumulator::default();
                            for &w in &weights[..passing] {
                                weighted.fill(x, w);
                                unweighted.fill(x, 1.0);
                            }
                            for (wi, acc) in [weighted, unweighted].into_iter().enumerate() {
                                let flat = hist.flat_index(&[wi, si, ci, bi, step])?;
                                if let Storage::WeightedMean(bins) = hist.storage_mut() {
                                    bins[flat] = acc;
                                }
                            }
                        }
                    }
                }
            }
            processes.insert(process.name.clone(), hist);
        }
        periods.insert(period.clone(), processes);
    }

    Ok(HistogramBundle {
        variable: config.variable.clone(),
        periods,
        category_leaves: Default::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> ToyConfig {
        ToyConfig {
            edges: vec![0.0, 100.0, 200.0, 300.0, 400.0],
            periods: vec!["2018".to_string()],
            ..ToyConfig::default()
        }
    }

    #[test]
    fn same_seed_same_bundle() {
        let a = generate_bundle(&small()).unwrap();
        let b = generate_bundle(&small()).unwrap();
        assert_eq!(a, b);
        a.validate().unwrap();
    }

    #[test]
    fn omitted_shifts_are_absent() {
        let bundle = generate_bundle(&small()).unwrap();
        let data = &bundle.periods["2018"]["data"];
        let labels = data.axis("shift").and_then(|a| a.labels()).unwrap();
        assert_eq!(labels, ["nominal".to_string()]);
        let tt = &bundle.periods["2018"]["tt"];
        assert_eq!(tt.axis("shift").and_then(|a| a.labels()).unwrap().len(), 3);
    }

    #[test]
    fn signal_never_exceeds_reference() {
        let bundle = generate_bundle(&small()).unwrap();
        let h = bundle.periods["2018"]["tt"]
            .select_index("weighting", 0)
            .unwrap()
            .select("shift", "nominal")
            .unwrap()
            .select("category", "incl")
            .unwrap();
        let reference = h.select_index("step", 0).unwrap().storage().sum_of_weights();
        let signal = h.select_index("step", 1).unwrap().storage().sum_of_weights();
        for (s, r) in signal.iter().zip(&reference) {
            assert!(s <= r);
        }
        assert!(reference.iter().all(|r| *r > 0.0));
    }
}

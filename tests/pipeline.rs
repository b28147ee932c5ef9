//! End-to-end runs through the public API: bundle -> corrections -> evaluation.

use trigger_weights::app::pipeline::run_pipeline;
use trigger_weights::correction::{CorrectionSet, SCHEMA_VERSION};
use trigger_weights::data::{ToyConfig, generate_bundle};
use trigger_weights::domain::{CurveKey, FitFamily, PipelineConfig};
use trigger_weights::error::AppError;
use trigger_weights::hist::{Axis, Histogram, PeriodMap, ProcessMap, Storage};
use trigger_weights::io::{HistogramBundle, read_correction_json, write_correction_json};
use trigger_weights::models::predict;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// One-period bundle with a single count histogram `shift × category × x × step`.
fn count_bundle(edges: Vec<f64>, num: &[f64], den: &[f64]) -> HistogramBundle {
    let bins: Vec<f64> = den.iter().zip(num).flat_map(|(&d, &n)| [d, n]).collect();
    let hist = Histogram::new(
        vec![
            Axis::category("shift", ["nominal"]),
            Axis::category("category", ["incl"]),
            Axis::numeric("x", edges),
            Axis::category("step", ["HLT_IsoMu24", "HLT_PFHT350"]),
        ],
        Storage::Count(bins),
    )
    .unwrap();
    let mut processes = ProcessMap::new();
    processes.insert("data".to_string(), hist);
    let mut periods = PeriodMap::new();
    periods.insert("2018".to_string(), processes);
    HistogramBundle {
        variable: "x".to_string(),
        periods,
        category_leaves: Default::default(),
    }
}

/// Count histogram repeating the same turn-on for every shift label.
fn shifted_hist(shifts: &[&str], num: &[f64], den: &[f64]) -> Histogram {
    let per_shift: Vec<f64> = den.iter().zip(num).flat_map(|(&d, &n)| [d, n]).collect();
    let bins = shifts.iter().flat_map(|_| per_shift.iter().copied()).collect();
    Histogram::new(
        vec![
            Axis::category("shift", shifts.to_vec()),
            Axis::category("category", ["incl"]),
            Axis::numeric("x", vec![5.0, 15.0, 25.0, 35.0, 45.0]),
            Axis::category("step", ["HLT_IsoMu24", "HLT_PFHT350"]),
        ],
        Storage::Count(bins),
    )
    .unwrap()
}

fn toy_config() -> PipelineConfig {
    PipelineConfig {
        processes: strings(&["data", "tt"]),
        shifts: strings(&["nominal", "jec_up", "jec_down"]),
        ..PipelineConfig::default()
    }
}

#[test]
fn four_bin_turn_on() {
    let bundle = count_bundle(
        vec![5.0, 15.0, 25.0, 35.0, 45.0],
        &[2.0, 10.0, 48.0, 50.0],
        &[50.0; 4],
    );
    let output = run_pipeline(bundle, &PipelineConfig::default()).unwrap();
    assert!(output.failures.is_empty(), "{:?}", output.failures);

    let record = output
        .record(&CurveKey::new("incl", "nominal", "data"))
        .unwrap();
    let xs = record.curve.xs();
    assert_eq!(xs, vec![10.0, 20.0, 30.0, 40.0]);
    let expected = [0.04, 0.2, 0.96, 1.0];
    for (p, e) in record.curve.points.iter().zip(expected) {
        assert!((p.efficiency - e).abs() < 1e-12);
    }
    let last = record.curve.points[3];
    assert_eq!((last.error_low, last.error_high), (0.0, 0.0));

    let fit = record.fit.as_ref().unwrap();
    assert!(fit.params.midpoint > 20.0 && fit.params.midpoint < 30.0);
    assert!(!fit.has_goodness_of_fit());

    let correction = output.corrections.get("trig_cor").unwrap();
    assert_eq!(
        correction.description,
        "Trigger correction using HLT_IsoMu24 as the base trigger and HLT_PFHT350 as the signal trigger"
    );
    for v in fit.params.to_array() {
        assert!(correction.data.expression.contains(&format!("{v}")));
    }
    let p = fit.params.to_array();
    for x in [10.0, 25.0, 40.0] {
        let w = correction.evaluate(&[x]).unwrap();
        assert!((w - predict(FitFamily::Logistic, x, &p)).abs() < 1e-12);
    }
}

#[test]
fn toy_bundle_produces_ratio_corrections() {
    let bundle = generate_bundle(&ToyConfig::default()).unwrap();
    let output = run_pipeline(bundle, &toy_config()).unwrap();
    assert!(output.failures.is_empty(), "{:?}", output.failures);

    let names: Vec<&str> = output
        .corrections
        .corrections
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, ["trig_cor", "trig_cor_jec_up", "trig_cor_jec_down"]);

    // `data` only has the nominal shift; its shifted curves are copies of it.
    let nominal = output
        .record(&CurveKey::new("incl", "nominal", "data"))
        .unwrap();
    let up = output
        .record(&CurveKey::new("incl", "jec_up", "data"))
        .unwrap();
    assert_eq!(nominal.curve, up.curve);

    let data_fit = nominal.fit.as_ref().unwrap();
    assert!((data_fit.params.midpoint - 420.0).abs() < 10.0);
    let tt_fit = output
        .record(&CurveKey::new("incl", "nominal", "tt"))
        .and_then(|r| r.fit.as_ref())
        .unwrap();

    let correction = output.corrections.get("trig_cor").unwrap();
    for x in [300.0, 420.0, 700.0] {
        let expected = predict(FitFamily::Logistic, x, &data_fit.params.to_array())
            / predict(FitFamily::Logistic, x, &tt_fit.params.to_array());
        let w = correction.evaluate(&[x]).unwrap();
        assert!((w - expected).abs() < 1e-9 * expected.abs().max(1.0));
    }
}

#[test]
fn correction_set_survives_a_file_round_trip() {
    let bundle = count_bundle(
        vec![5.0, 15.0, 25.0, 35.0, 45.0],
        &[2.0, 10.0, 48.0, 50.0],
        &[50.0; 4],
    );
    let output = run_pipeline(bundle, &PipelineConfig::default()).unwrap();
    let path = std::env::temp_dir().join(format!("tw-corrections-{}.json", std::process::id()));
    write_correction_json(&path, &output.corrections).unwrap();
    let back: CorrectionSet = read_correction_json(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(back, output.corrections);
    assert_eq!(back.schema_version, SCHEMA_VERSION);
    assert_eq!(back.corrections[0].data.parser, "TFormula");
}

#[test]
fn arctangent_fits_are_not_serialized() {
    let config = PipelineConfig {
        fit_family: FitFamily::Arctangent,
        ..PipelineConfig::default()
    };
    let output = run_pipeline(generate_bundle(&ToyConfig::default()).unwrap(), &config).unwrap();

    assert!(output.corrections.corrections.is_empty());
    let failure = output
        .failures
        .iter()
        .find(|f| f.target == "trig_cor")
        .unwrap();
    assert_eq!(failure.kind, "config");
}

#[test]
fn more_than_two_processes_is_a_configuration_error() {
    let config = PipelineConfig {
        processes: strings(&["data", "tt", "qcd"]),
        ..PipelineConfig::default()
    };
    let err = run_pipeline(generate_bundle(&ToyConfig::default()).unwrap(), &config).unwrap_err();
    assert!(matches!(err, AppError::Config(_)));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn mismatched_periods_fail_only_their_process() {
    let mut bundle = count_bundle(
        vec![5.0, 15.0, 25.0, 35.0, 45.0],
        &[2.0, 10.0, 48.0, 50.0],
        &[50.0; 4],
    );
    let other = count_bundle(
        vec![5.0, 15.0, 25.0, 36.0, 45.0],
        &[2.0, 10.0, 48.0, 50.0],
        &[50.0; 4],
    );
    let mut shifted = other.periods["2018"].clone();
    // A second, well-formed process that is present in one period only.
    let good = bundle.periods["2018"]["data"].clone();
    shifted.insert("tt".to_string(), good);
    bundle.periods.insert("2017".to_string(), shifted);

    let config = PipelineConfig {
        processes: strings(&["tt"]),
        ..PipelineConfig::default()
    };
    let output = run_pipeline(bundle.clone(), &config).unwrap();
    assert!(output.failures.is_empty(), "{:?}", output.failures);
    assert_eq!(output.corrections.corrections.len(), 1);

    let config = PipelineConfig {
        processes: strings(&["data", "tt"]),
        ..PipelineConfig::default()
    };
    let output = run_pipeline(bundle, &config).unwrap();
    let failure = output
        .failures
        .iter()
        .find(|f| f.target == "incl/nominal/data")
        .unwrap();
    assert_eq!(failure.kind, "axis-mismatch");
    assert!(failure.message.contains("'x'"));
    assert!(output.record(&CurveKey::new("incl", "nominal", "tt")).is_some());
    assert!(output.corrections.corrections.is_empty());
}

#[test]
fn missing_nominal_shift_fails_the_process() {
    let hist = Histogram::new(
        vec![
            Axis::category("shift", ["jec_up"]),
            Axis::category("category", ["incl"]),
            Axis::numeric("x", vec![0.0, 1.0]),
            Axis::category("step", ["HLT_IsoMu24", "HLT_PFHT350"]),
        ],
        Storage::Count(vec![10.0, 5.0]),
    )
    .unwrap();
    let mut bundle = count_bundle(vec![0.0, 1.0], &[5.0], &[10.0]);
    bundle
        .periods
        .get_mut("2018")
        .unwrap()
        .insert("data".to_string(), hist);

    let output = run_pipeline(bundle, &PipelineConfig::default()).unwrap();
    assert_eq!(output.failures.len(), 1);
    assert_eq!(output.failures[0].kind, "config");
    assert!(output.records.is_empty());
}

#[test]
fn periods_omitting_different_shifts_still_merge() {
    let num = [2.0, 10.0, 48.0, 50.0];
    let den = [50.0; 4];
    let mut periods = PeriodMap::new();
    for (period, shifts) in [
        ("2017", &["nominal", "jec_up", "pu_up"][..]),
        ("2018", &["nominal", "pu_up"][..]),
    ] {
        let mut processes = ProcessMap::new();
        processes.insert("data".to_string(), shifted_hist(shifts, &num, &den));
        periods.insert(period.to_string(), processes);
    }
    let bundle = HistogramBundle {
        variable: "x".to_string(),
        periods,
        category_leaves: Default::default(),
    };
    let config = PipelineConfig {
        shifts: strings(&["nominal", "jec_up", "pu_up"]),
        ..PipelineConfig::default()
    };

    let output = run_pipeline(bundle, &config).unwrap();
    assert!(output.failures.is_empty(), "{:?}", output.failures);
    assert_eq!(output.corrections.corrections.len(), 3);

    // Every shift sees the same summed counts, 2 x 50 per bin.
    let nominal = output
        .record(&CurveKey::new("incl", "nominal", "data"))
        .unwrap();
    for shift in ["jec_up", "pu_up"] {
        let record = output.record(&CurveKey::new("incl", shift, "data")).unwrap();
        assert_eq!(record.curve, nominal.curve);
    }
    assert!((nominal.curve.points[1].efficiency - 0.2).abs() < 1e-12);
}

#[test]
fn non_converging_tuple_does_not_stop_its_siblings() {
    let mut bundle = count_bundle(
        vec![5.0, 15.0, 25.0, 35.0, 45.0],
        &[2.0, 10.0, 48.0, 50.0],
        &[50.0; 4],
    );
    // No passing events: the seed already fits exactly.
    let flat = count_bundle(vec![5.0, 15.0, 25.0, 35.0, 45.0], &[0.0; 4], &[50.0; 4]);
    let flat_hist = flat.periods["2018"]["data"].clone();
    bundle
        .periods
        .get_mut("2018")
        .unwrap()
        .insert("tt".to_string(), flat_hist);

    let mut config = PipelineConfig {
        processes: strings(&["data", "tt"]),
        ..PipelineConfig::default()
    };
    config.fit.max_iterations = 3;
    let output = run_pipeline(bundle, &config).unwrap();

    assert_eq!(output.failures.len(), 1, "{:?}", output.failures);
    let failure = &output.failures[0];
    assert_eq!(failure.target, "incl/nominal/data");
    assert_eq!(failure.kind, "fit-non-convergence");

    let data = output
        .record(&CurveKey::new("incl", "nominal", "data"))
        .unwrap();
    assert!(data.fit.is_none());
    assert_eq!(data.curve.points.len(), 4);

    let tt = output
        .record(&CurveKey::new("incl", "nominal", "tt"))
        .unwrap();
    let tt_fit = tt.fit.as_ref().unwrap();
    assert_eq!(tt_fit.iterations, 0);
    assert!(tt_fit.params.is_finite());

    // The ratio needs the numerator fit, so no correction is produced.
    assert!(output.corrections.corrections.is_empty());
}

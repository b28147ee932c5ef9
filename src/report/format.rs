//! Formatted terminal output for a pipeline run.
//!
//! Formatting lives here so the estimator and fitter stay free of presentation code.

use crate::app::pipeline::PipelineOutput;
use crate::domain::PipelineConfig;

use super::{FitRow, fit_rows};

/// Format the full run summary: configuration, fitted tuples, failures, corrections.
pub fn format_run_summary(output: &PipelineOutput, config: &PipelineConfig) -> String {
    let mut out = String::new();

    out.push_str("=== tw - Trigger efficiency fit ===\n");
    out.push_str(&format!(
        "Family: {} | CL={} | eff_bin={}{}\n",
        config.fit_family,
        config.confidence_level,
        config.eff_bin,
        if config.unweighted { " | unweighted" } else { "" }
    ));
    out.push_str(&format!("Processes: {}\n", config.processes.join(" / ")));
    out.push_str(&format!(
        "Tuples: {} fitted, {} failed\n",
        output.records.iter().filter(|r| r.fit.is_some()).count(),
        output.failures.len()
    ));

    let rows = fit_rows(&output.records);
    if !rows.is_empty() {
        out.push_str("\nFits:\n");
        out.push_str(&format_table(&rows));
    }

    if !output.failures.is_empty() {
        out.push_str("\nFailures:\n");
        for f in &output.failures {
            out.push_str(&format!("- {} [{}] {}\n", f.target, f.kind, f.message));
        }
    }

    out.push_str("\nCorrections:\n");
    if output.corrections.corrections.is_empty() {
        out.push_str("  (none)\n");
    }
    for c in &output.corrections.corrections {
        out.push_str(&format!("- {}: {}\n", c.name, c.data.expression));
    }

    out
}

fn format_table(rows: &[FitRow]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<28} {:>20} {:>20} {:>20} {:>20} {:>10} {:>5}",
            "tuple", "L", "x0", "k", "b", "chi2/ndf", "iter"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<28} {:-<20} {:-<20} {:-<20} {:-<20} {:-<10} {:-<5}",
            "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for r in rows {
        let chi2 = r
            .chi2_ndf
            .map(|c| format!("{c:.3}"))
            .unwrap_or_else(|| "n/a".to_string());
        out.push_str(
            format!(
                "{:<28} {:>20} {:>20} {:>20} {:>20} {:>10} {:>5}",
                truncate(&r.key.to_string(), 28),
                fmt_value(r.params[0], r.errors[0]),
                fmt_value(r.params[1], r.errors[1]),
                fmt_value(r.params[2], r.errors[2]),
                fmt_value(r.params[3], r.errors[3]),
                chi2,
                r.iterations,
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

fn fmt_value(v: f64, err: f64) -> String {
    if err.is_finite() {
        format!("{v:.4} ± {err:.4}")
    } else {
        format!("{v:.4} ± inf")
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

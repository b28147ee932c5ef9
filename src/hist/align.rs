use tracing::debug;

use super::histogram::Histogram;
use crate::error::AppError;

/// Guarantee every shift in `expected` exists on `shift_axis`.
///
/// Missing shifts receive a copy of the nominal slice; existing slices are never
/// touched. A missing nominal is a configuration error. The axis is left in a
/// canonical order, `expected` first and any other labels sorted after it, so
/// histograms of periods that omitted different shifts line up bin for bin.
pub fn align_shifts(
    mut hist: Histogram,
    shift_axis: &str,
    expected: &[String],
    nominal: &str,
) -> Result<Histogram, AppError> {
    let tags = hist.tags();
    if tags.shift_axis.as_deref() == Some(shift_axis)
        && hist.axis(shift_axis).is_some()
        && expected.iter().all(|s| tags.aligned_shifts.contains(s))
    {
        debug!(axis = shift_axis, "shifts already aligned");
        return Ok(hist);
    }

    let axis = hist
        .axis(shift_axis)
        .ok_or_else(|| AppError::config(format!("Histogram has no shift axis '{shift_axis}'.")))?;
    let labels = axis.labels().ok_or_else(|| {
        AppError::config(format!("Shift axis '{shift_axis}' is not categorical."))
    })?;
    if !labels.iter().any(|l| l == nominal) {
        return Err(AppError::config(format!(
            "Nominal shift '{nominal}' is missing, nothing to backfill from."
        )));
    }

    let missing: Vec<String> = expected
        .iter()
        .filter(|s| !labels.contains(s))
        .cloned()
        .collect();
    let mut order: Vec<String> = Vec::with_capacity(labels.len() + missing.len());
    for shift in expected {
        if !order.contains(shift) {
            order.push(shift.clone());
        }
    }
    let mut extra: Vec<String> = labels
        .iter()
        .filter(|l| !order.contains(l))
        .cloned()
        .collect();
    extra.sort();
    order.extend(extra);

    for shift in &missing {
        debug!(shift = shift.as_str(), "backfilling shift from nominal");
        hist.insert_label(shift_axis, shift, nominal)?;
    }
    hist.reorder_labels(shift_axis, &order)?;

    let tags = hist.tags_mut();
    tags.shift_axis = Some(shift_axis.to_string());
    for shift in expected {
        if !tags.aligned_shifts.contains(shift) {
            tags.aligned_shifts.push(shift.clone());
        }
    }
    Ok(hist)
}

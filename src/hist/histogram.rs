//! N-dimensional binned counts addressed by named axes.
//!
//! Layout is row-major with the last axis fastest. Numeric axes keep their optional
//! underflow/overflow bins inside the layout (underflow first, overflow last), so
//! flow content survives every reduction until a histogram is turned into a 1-D
//! [`BinnedSeries`], which only exposes the visible bins.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// One histogram axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Axis {
    /// Finite ordered set of labels (process, shift, category, selection step, ...).
    Category { name: String, labels: Vec<String> },
    /// Ordered bin edges with optional open-ended flow bins.
    Numeric {
        name: String,
        edges: Vec<f64>,
        #[serde(default)]
        underflow: bool,
        #[serde(default)]
        overflow: bool,
    },
}

impl Axis {
    pub fn category<S: Into<String>>(name: &str, labels: impl IntoIterator<Item = S>) -> Self {
        Axis::Category {
            name: name.to_string(),
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// Numeric axis without flow bins.
    pub fn numeric(name: &str, edges: Vec<f64>) -> Self {
        Axis::Numeric {
            name: name.to_string(),
            edges,
            underflow: false,
            overflow: false,
        }
    }

    /// Regular binning between `start` and `stop`.
    pub fn regular(name: &str, bins: usize, start: f64, stop: f64) -> Self {
        let bins = bins.max(1);
        let step = (stop - start) / bins as f64;
        let edges = (0..=bins).map(|i| start + step * i as f64).collect();
        Axis::numeric(name, edges)
    }

    /// Enable both flow bins on a numeric axis; categorical axes are returned as-is.
    pub fn with_flow(self) -> Self {
        match self {
            Axis::Numeric { name, edges, .. } => Axis::Numeric {
                name,
                edges,
                underflow: true,
                overflow: true,
            },
            other => other,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Axis::Category { name, .. } | Axis::Numeric { name, .. } => name,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Axis::Numeric { .. })
    }

    pub fn labels(&self) -> Option<&[String]> {
        match self {
            Axis::Category { labels, .. } => Some(labels),
            Axis::Numeric { .. } => None,
        }
    }

    pub fn position(&self, label: &str) -> Option<usize> {
        self.labels()?.iter().position(|l| l == label)
    }

    /// Number of storage slots along this axis (flow bins included).
    pub fn extent(&self) -> usize {
        match self {
            Axis::Category { labels, .. } => labels.len(),
            Axis::Numeric {
                edges,
                underflow,
                overflow,
                ..
            } => edges.len().saturating_sub(1) + usize::from(*underflow) + usize::from(*overflow),
        }
    }

    fn validate(&self) -> Result<(), AppError> {
        match self {
            Axis::Category { name, labels } => {
                if labels.is_empty() {
                    return Err(AppError::config(format!("Category axis '{name}' has no labels.")));
                }
                for (i, label) in labels.iter().enumerate() {
                    if labels[..i].contains(label) {
                        return Err(AppError::config(format!(
                            "Category axis '{name}' has duplicate label '{label}'."
                        )));
                    }
                }
                Ok(())
            }
            Axis::Numeric { name, edges, .. } => {
                if edges.len() < 2 {
                    return Err(AppError::config(format!(
                        "Numeric axis '{name}' needs at least two edges."
                    )));
                }
                if edges.iter().any(|e| !e.is_finite()) || edges.windows(2).any(|w| w[1] <= w[0]) {
                    return Err(AppError::config(format!(
                        "Numeric axis '{name}' edges must be finite and strictly increasing."
                    )));
                }
                Ok(())
            }
        }
    }

    /// Compare two axes, naming this axis in the error.
    fn check_same(&self, other: &Axis) -> Result<(), AppError> {
        let name = self.name();
        if name != other.name() {
            return Err(AppError::axis_mismatch(
                name,
                format!("found axis '{}' in its place", other.name()),
            ));
        }
        match (self, other) {
            (Axis::Category { labels: a, .. }, Axis::Category { labels: b, .. }) => {
                if a != b {
                    return Err(AppError::axis_mismatch(
                        name,
                        format!("labels differ: {a:?} vs {b:?}"),
                    ));
                }
                Ok(())
            }
            (
                Axis::Numeric {
                    edges: ea,
                    underflow: ua,
                    overflow: oa,
                    ..
                },
                Axis::Numeric {
                    edges: eb,
                    underflow: ub,
                    overflow: ob,
                    ..
                },
            ) => {
                if ea.len() != eb.len() {
                    return Err(AppError::axis_mismatch(
                        name,
                        format!("{} bins vs {} bins", ea.len() - 1, eb.len() - 1),
                    ));
                }
                if let Some(j) = ea.iter().zip(eb.iter()).position(|(a, b)| a != b) {
                    return Err(AppError::axis_mismatch(
                        name,
                        format!("edge {j} differs: {} vs {}", ea[j], eb[j]),
                    ));
                }
                if ua != ub || oa != ob {
                    return Err(AppError::axis_mismatch(name, "flow bin configuration differs"));
                }
                Ok(())
            }
            _ => Err(AppError::axis_mismatch(name, "categorical vs numeric axis")),
        }
    }
}

/// Plain weight-sum bin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightSum {
    pub sum_of_weights: f64,
    pub sum_of_weights_squared: f64,
}

impl WeightSum {
    pub fn fill(&mut self, weight: f64) {
        self.sum_of_weights += weight;
        self.sum_of_weights_squared += weight * weight;
    }

    fn merge(&mut self, other: &WeightSum) {
        self.sum_of_weights += other.sum_of_weights;
        self.sum_of_weights_squared += other.sum_of_weights_squared;
    }
}

/// Weighted-mean accumulator: weight accounting plus the running weighted mean of a
/// secondary quantity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MeanAccumulator {
    pub sum_of_weights: f64,
    pub sum_of_weights_squared: f64,
    pub value: f64,
    pub sum_of_weighted_deltas_squared: f64,
}

impl MeanAccumulator {
    /// Add one weighted sample of the averaged quantity.
    pub fn fill(&mut self, sample: f64, weight: f64) {
        self.sum_of_weights += weight;
        self.sum_of_weights_squared += weight * weight;
        if self.sum_of_weights == 0.0 {
            return;
        }
        let delta = sample - self.value;
        self.value += weight * delta / self.sum_of_weights;
        self.sum_of_weighted_deltas_squared += weight * delta * (sample - self.value);
    }

    fn merge(&mut self, other: &MeanAccumulator) {
        let w_self = self.sum_of_weights;
        let w_other = other.sum_of_weights;
        let w = w_self + w_other;
        self.sum_of_weights_squared += other.sum_of_weights_squared;
        if w == 0.0 {
            self.sum_of_weights = w;
            return;
        }
        let delta = other.value - self.value;
        self.value += delta * w_other / w;
        self.sum_of_weighted_deltas_squared +=
            other.sum_of_weighted_deltas_squared + delta * delta * w_self * w_other / w;
        self.sum_of_weights = w;
    }

    pub fn weight_sum(&self) -> WeightSum {
        WeightSum {
            sum_of_weights: self.sum_of_weights,
            sum_of_weights_squared: self.sum_of_weights_squared,
        }
    }
}

/// Storage kind, without the bins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Count,
    Weight,
    WeightedMean,
}

impl std::fmt::Display for StorageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            StorageKind::Count => "count",
            StorageKind::Weight => "weight",
            StorageKind::WeightedMean => "weighted_mean",
        };
        write!(f, "{label}")
    }
}

/// Flat bin storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "bins", rename_all = "snake_case")]
pub enum Storage {
    Count(Vec<f64>),
    Weight(Vec<WeightSum>),
    WeightedMean(Vec<MeanAccumulator>),
}

impl Storage {
    pub fn zeros(kind: StorageKind, len: usize) -> Self {
        match kind {
            StorageKind::Count => Storage::Count(vec![0.0; len]),
            StorageKind::Weight => Storage::Weight(vec![WeightSum::default(); len]),
            StorageKind::WeightedMean => Storage::WeightedMean(vec![MeanAccumulator::default(); len]),
        }
    }

    pub fn kind(&self) -> StorageKind {
        match self {
            Storage::Count(_) => StorageKind::Count,
            Storage::Weight(_) => StorageKind::Weight,
            Storage::WeightedMean(_) => StorageKind::WeightedMean,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Storage::Count(v) => v.len(),
            Storage::Weight(v) => v.len(),
            Storage::WeightedMean(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of weights per bin (counts for count storage).
    pub fn sum_of_weights(&self) -> Vec<f64> {
        match self {
            Storage::Count(v) => v.clone(),
            Storage::Weight(v) => v.iter().map(|b| b.sum_of_weights).collect(),
            Storage::WeightedMean(v) => v.iter().map(|b| b.sum_of_weights).collect(),
        }
    }

    /// Sum of squared weights per bin (Poisson variance for count storage).
    pub fn sum_of_weights_squared(&self) -> Vec<f64> {
        match self {
            Storage::Count(v) => v.clone(),
            Storage::Weight(v) => v.iter().map(|b| b.sum_of_weights_squared).collect(),
            Storage::WeightedMean(v) => v.iter().map(|b| b.sum_of_weights_squared).collect(),
        }
    }

    /// Add bin `src` of `other` into bin `dst` of `self`. Kinds must match.
    fn accumulate(&mut self, dst: usize, other: &Storage, src: usize) {
        match (self, other) {
            (Storage::Count(a), Storage::Count(b)) => a[dst] += b[src],
            (Storage::Weight(a), Storage::Weight(b)) => a[dst].merge(&b[src]),
            (Storage::WeightedMean(a), Storage::WeightedMean(b)) => a[dst].merge(&b[src]),
            _ => unreachable!("storage kinds are checked before accumulation"),
        }
    }
}

/// Markers that make the normalizer and the shift aligner safe to re-apply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistTags {
    /// Set once weighted-mean storage has been converted to weight storage.
    #[serde(default)]
    pub normalized: bool,
    /// Shift labels guaranteed present by a previous alignment.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aligned_shifts: Vec<String>,
    /// Axis the alignment was applied to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shift_axis: Option<String>,
}

impl HistTags {
    /// Forget a previous shift alignment.
    pub fn clear_alignment(&mut self) {
        self.aligned_shifts.clear();
        self.shift_axis = None;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    axes: Vec<Axis>,
    storage: Storage,
    #[serde(default)]
    tags: HistTags,
}

impl Histogram {
    pub fn new(axes: Vec<Axis>, storage: Storage) -> Result<Self, AppError> {
        let h = Histogram {
            axes,
            storage,
            tags: HistTags::default(),
        };
        h.validate()?;
        Ok(h)
    }

    /// Empty histogram of the given storage kind.
    pub fn zeros(axes: Vec<Axis>, kind: StorageKind) -> Result<Self, AppError> {
        let len = axes.iter().map(Axis::extent).product();
        Histogram::new(axes, Storage::zeros(kind, len))
    }

    /// Check axis definitions and that the storage length matches the axis layout.
    ///
    /// Deserialized histograms skip `new`, so loaders call this explicitly.
    pub fn validate(&self) -> Result<(), AppError> {
        for (i, axis) in self.axes.iter().enumerate() {
            axis.validate()?;
            if self.axes[..i].iter().any(|a| a.name() == axis.name()) {
                return Err(AppError::config(format!("Duplicate axis name '{}'.", axis.name())));
            }
        }
        let expected: usize = self.axes.iter().map(Axis::extent).product();
        if self.storage.len() != expected {
            return Err(AppError::config(format!(
                "Storage holds {} bins but the axes describe {expected}.",
                self.storage.len()
            )));
        }
        Ok(())
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut Storage {
        &mut self.storage
    }

    pub fn kind(&self) -> StorageKind {
        self.storage.kind()
    }

    pub fn tags(&self) -> &HistTags {
        &self.tags
    }

    pub(crate) fn tags_mut(&mut self) -> &mut HistTags {
        &mut self.tags
    }

    pub(crate) fn into_parts(self) -> (Vec<Axis>, Storage, HistTags) {
        (self.axes, self.storage, self.tags)
    }

    pub(crate) fn from_parts(axes: Vec<Axis>, storage: Storage, tags: HistTags) -> Self {
        Histogram { axes, storage, tags }
    }

    pub fn shape(&self) -> Vec<usize> {
        self.axes.iter().map(Axis::extent).collect()
    }

    pub fn axis(&self, name: &str) -> Option<&Axis> {
        self.axes.iter().find(|a| a.name() == name)
    }

    fn axis_index(&self, name: &str) -> Result<usize, AppError> {
        self.axes.iter().position(|a| a.name() == name).ok_or_else(|| {
            let names: Vec<&str> = self.axes.iter().map(Axis::name).collect();
            AppError::config(format!("Histogram has no axis '{name}' (axes: {names:?})."))
        })
    }

    /// Flat storage index for per-axis coordinates.
    pub fn flat_index(&self, coords: &[usize]) -> Result<usize, AppError> {
        if coords.len() != self.axes.len() {
            return Err(AppError::config(format!(
                "Expected {} coordinates, got {}.",
                self.axes.len(),
                coords.len()
            )));
        }
        let mut flat = 0usize;
        for (axis, &c) in self.axes.iter().zip(coords) {
            let extent = axis.extent();
            if c >= extent {
                return Err(AppError::config(format!(
                    "Coordinate {c} out of range for axis '{}' (extent {extent}).",
                    axis.name()
                )));
            }
            flat = flat * extent + c;
        }
        Ok(flat)
    }

    /// Compare axis definitions with `other`, naming the first offending axis.
    pub fn check_binning(&self, other: &Histogram) -> Result<(), AppError> {
        for (a, b) in self.axes.iter().zip(other.axes.iter()) {
            a.check_same(b)?;
        }
        if self.axes.len() != other.axes.len() {
            let longer = if self.axes.len() > other.axes.len() {
                &self.axes
            } else {
                &other.axes
            };
            let extra = &longer[self.axes.len().min(other.axes.len())];
            return Err(AppError::axis_mismatch(
                extra.name(),
                "axis present in only one histogram",
            ));
        }
        Ok(())
    }

    /// Bin-for-bin sum. Axes and storage kinds must agree.
    pub fn add(&mut self, other: &Histogram) -> Result<(), AppError> {
        self.check_binning(other)?;
        if self.kind() != other.kind() {
            return Err(AppError::config(format!(
                "Cannot add {} storage to {} storage.",
                other.kind(),
                self.kind()
            )));
        }
        for i in 0..self.storage.len() {
            self.storage.accumulate(i, &other.storage, i);
        }
        self.tags.normalized &= other.tags.normalized;
        if self.tags.aligned_shifts != other.tags.aligned_shifts
            || self.tags.shift_axis != other.tags.shift_axis
        {
            self.tags.clear_alignment();
        }
        Ok(())
    }

    /// Keep the slice at `label` of a categorical axis and drop that axis.
    pub fn select(&self, axis: &str, label: &str) -> Result<Histogram, AppError> {
        let a = self.axis_index(axis)?;
        let pos = self.axes[a].position(label).ok_or_else(|| {
            AppError::config(format!("Axis '{axis}' has no label '{label}'."))
        })?;
        Ok(self.project(a, &[pos]))
    }

    /// Keep the slice at storage position `index` of any axis and drop that axis.
    pub fn select_index(&self, axis: &str, index: usize) -> Result<Histogram, AppError> {
        let a = self.axis_index(axis)?;
        let extent = self.axes[a].extent();
        if index >= extent {
            return Err(AppError::config(format!(
                "Index {index} out of range for axis '{axis}' (extent {extent})."
            )));
        }
        Ok(self.project(a, &[index]))
    }

    /// Sum the given labels of a categorical axis and drop that axis.
    pub fn sum_labels(&self, axis: &str, labels: &[String]) -> Result<Histogram, AppError> {
        let a = self.axis_index(axis)?;
        let mut positions = Vec::with_capacity(labels.len());
        for label in labels {
            let pos = self.axes[a].position(label).ok_or_else(|| {
                AppError::config(format!("Axis '{axis}' has no label '{label}'."))
            })?;
            if !positions.contains(&pos) {
                positions.push(pos);
            }
        }
        if positions.is_empty() {
            return Err(AppError::config(format!("No labels given to sum on axis '{axis}'.")));
        }
        Ok(self.project(a, &positions))
    }

    /// Sum an entire axis (flow bins included) and drop it.
    pub fn sum_axis(&self, axis: &str) -> Result<Histogram, AppError> {
        let a = self.axis_index(axis)?;
        let positions: Vec<usize> = (0..self.axes[a].extent()).collect();
        Ok(self.project(a, &positions))
    }

    fn project(&self, a: usize, positions: &[usize]) -> Histogram {
        let shape = self.shape();
        let outer: usize = shape[..a].iter().product();
        let inner: usize = shape[a + 1..].iter().product();
        let extent = shape[a];

        let mut storage = Storage::zeros(self.kind(), outer * inner);
        for o in 0..outer {
            for &p in positions {
                for i in 0..inner {
                    let src = (o * extent + p) * inner + i;
                    storage.accumulate(o * inner + i, &self.storage, src);
                }
            }
        }

        let mut axes = self.axes.clone();
        let dropped = axes.remove(a);
        let mut tags = self.tags.clone();
        if tags.shift_axis.as_deref() == Some(dropped.name()) {
            tags.clear_alignment();
        }
        Histogram::from_parts(axes, storage, tags)
    }

    /// Permute a categorical axis so its labels follow `order`.
    ///
    /// `order` must hold exactly the axis labels.
    pub fn reorder_labels(&mut self, axis: &str, order: &[String]) -> Result<(), AppError> {
        let a = self.axis_index(axis)?;
        let Axis::Category { labels, .. } = &self.axes[a] else {
            return Err(AppError::config(format!("Axis '{axis}' is not categorical.")));
        };
        if labels.as_slice() == order {
            return Ok(());
        }
        if order.len() != labels.len() {
            return Err(AppError::config(format!(
                "Cannot reorder axis '{axis}' {labels:?} as {order:?}."
            )));
        }
        let mut from = Vec::with_capacity(order.len());
        for label in order {
            let pos = labels.iter().position(|l| l == label).ok_or_else(|| {
                AppError::config(format!("Axis '{axis}' has no label '{label}'."))
            })?;
            if from.contains(&pos) {
                return Err(AppError::config(format!(
                    "Label '{label}' repeated when reordering axis '{axis}'."
                )));
            }
            from.push(pos);
        }

        let shape = self.shape();
        let outer: usize = shape[..a].iter().product();
        let inner: usize = shape[a + 1..].iter().product();
        let extent = shape[a];

        let mut storage = Storage::zeros(self.kind(), self.storage.len());
        for o in 0..outer {
            for (p, &src_p) in from.iter().enumerate() {
                for i in 0..inner {
                    let src = (o * extent + src_p) * inner + i;
                    let dst = (o * extent + p) * inner + i;
                    storage.accumulate(dst, &self.storage, src);
                }
            }
        }

        if let Axis::Category { labels, .. } = &mut self.axes[a] {
            *labels = order.to_vec();
        }
        self.storage = storage;
        Ok(())
    }

    /// Append `label` to a categorical axis, filling it with a copy of `source`'s slice.
    pub fn insert_label(&mut self, axis: &str, label: &str, source: &str) -> Result<(), AppError> {
        let a = self.axis_index(axis)?;
        let Axis::Category { labels, .. } = &self.axes[a] else {
            return Err(AppError::config(format!("Axis '{axis}' is not categorical.")));
        };
        if labels.iter().any(|l| l == label) {
            return Err(AppError::config(format!("Axis '{axis}' already has label '{label}'.")));
        }
        let src_pos = labels.iter().position(|l| l == source).ok_or_else(|| {
            AppError::config(format!("Axis '{axis}' has no label '{source}'."))
        })?;

        let shape = self.shape();
        let outer: usize = shape[..a].iter().product();
        let inner: usize = shape[a + 1..].iter().product();
        let extent = shape[a];

        let mut storage = Storage::zeros(self.kind(), outer * (extent + 1) * inner);
        for o in 0..outer {
            for p in 0..=extent {
                let from = if p < extent { p } else { src_pos };
                for i in 0..inner {
                    let src = (o * extent + from) * inner + i;
                    let dst = (o * (extent + 1) + p) * inner + i;
                    storage.accumulate(dst, &self.storage, src);
                }
            }
        }

        if let Axis::Category { labels, .. } = &mut self.axes[a] {
            labels.push(label.to_string());
        }
        self.storage = storage;
        Ok(())
    }

    /// Turn a 1-D histogram over a numeric axis into visible-bin arrays.
    pub fn to_series(&self) -> Result<BinnedSeries, AppError> {
        let [
            Axis::Numeric {
                name,
                edges,
                underflow,
                ..
            },
        ] = self.axes.as_slice()
        else {
            let names: Vec<&str> = self.axes.iter().map(Axis::name).collect();
            return Err(AppError::config(format!(
                "Expected a 1-D histogram over a numeric axis, found axes {names:?}."
            )));
        };
        if self.kind() == StorageKind::WeightedMean {
            return Err(AppError::config(
                "Weighted-mean storage must be normalized before efficiency arithmetic.",
            ));
        }

        let start = usize::from(*underflow);
        let n = edges.len() - 1;
        let sumw = self.storage.sum_of_weights()[start..start + n].to_vec();
        let sumw2 = self.storage.sum_of_weights_squared()[start..start + n].to_vec();

        Ok(BinnedSeries {
            axis: name.clone(),
            edges: edges.clone(),
            sumw,
            sumw2,
        })
    }
}

/// Visible bins of a 1-D histogram with plain weight accounting.
#[derive(Debug, Clone, PartialEq)]
pub struct BinnedSeries {
    pub axis: String,
    pub edges: Vec<f64>,
    pub sumw: Vec<f64>,
    pub sumw2: Vec<f64>,
}

impl BinnedSeries {
    pub fn len(&self) -> usize {
        self.sumw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sumw.is_empty()
    }

    pub fn centers(&self) -> Vec<f64> {
        self.edges.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect()
    }

    pub fn check_binning(&self, other: &BinnedSeries) -> Result<(), AppError> {
        if self.axis != other.axis {
            return Err(AppError::axis_mismatch(
                &self.axis,
                format!("divided by a series over '{}'", other.axis),
            ));
        }
        if self.edges.len() != other.edges.len() {
            return Err(AppError::axis_mismatch(
                &self.axis,
                format!("{} bins vs {} bins", self.len(), other.len()),
            ));
        }
        if let Some(j) = self.edges.iter().zip(other.edges.iter()).position(|(a, b)| a != b) {
            return Err(AppError::axis_mismatch(
                &self.axis,
                format!("edge {j} differs: {} vs {}", self.edges[j], other.edges[j]),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shift_by_var() -> Histogram {
        let axes = vec![
            Axis::category("shift", ["nominal", "jec_up"]),
            Axis::numeric("pt", vec![0.0, 10.0, 20.0]),
        ];
        Histogram::new(axes, Storage::Count(vec![1.0, 2.0, 3.0, 4.0])).unwrap()
    }

    #[test]
    fn storage_length_is_validated() {
        let axes = vec![Axis::numeric("pt", vec![0.0, 1.0, 2.0])];
        let err = Histogram::new(axes, Storage::Count(vec![1.0])).unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn flow_bins_count_in_layout_but_not_in_series() {
        let axes = vec![Axis::numeric("pt", vec![0.0, 1.0, 2.0]).with_flow()];
        let h = Histogram::new(axes, Storage::Count(vec![9.0, 1.0, 2.0, 7.0])).unwrap();
        let s = h.to_series().unwrap();
        assert_eq!(s.sumw, vec![1.0, 2.0]);
        assert_eq!(s.centers(), vec![0.5, 1.5]);
    }

    #[test]
    fn select_and_sum_reduce_the_axis() {
        let h = shift_by_var();
        let up = h.select("shift", "jec_up").unwrap();
        assert_eq!(up.storage().sum_of_weights(), vec![3.0, 4.0]);

        let total = h.sum_axis("shift").unwrap();
        assert_eq!(total.storage().sum_of_weights(), vec![4.0, 6.0]);

        let pt_sum = h.sum_axis("pt").unwrap();
        assert_eq!(pt_sum.storage().sum_of_weights(), vec![3.0, 7.0]);
    }

    #[test]
    fn insert_label_copies_source_slice() {
        let mut h = shift_by_var();
        h.insert_label("shift", "pu_up", "nominal").unwrap();
        assert_eq!(h.shape(), vec![3, 2]);
        assert_eq!(
            h.select("shift", "pu_up").unwrap().storage().sum_of_weights(),
            vec![1.0, 2.0]
        );
        assert_eq!(
            h.select("shift", "jec_up").unwrap().storage().sum_of_weights(),
            vec![3.0, 4.0]
        );
    }

    #[test]
    fn reorder_labels_moves_slices() {
        let mut h = shift_by_var();
        let order = vec!["jec_up".to_string(), "nominal".to_string()];
        h.reorder_labels("shift", &order).unwrap();
        assert_eq!(h.axis("shift").and_then(|a| a.labels()).unwrap(), order.as_slice());
        assert_eq!(h.storage().sum_of_weights(), vec![3.0, 4.0, 1.0, 2.0]);
        assert_eq!(
            h.select("shift", "nominal").unwrap().storage().sum_of_weights(),
            vec![1.0, 2.0]
        );

        let err = h.reorder_labels("shift", &["nominal".to_string()]).unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn dropping_the_aligned_axis_forgets_alignment() {
        let mut h = shift_by_var();
        h.tags_mut().aligned_shifts = vec!["nominal".to_string(), "jec_up".to_string()];
        h.tags_mut().shift_axis = Some("shift".to_string());

        let kept = h.sum_axis("pt").unwrap();
        assert_eq!(kept.tags(), h.tags());

        let dropped = h.select("shift", "nominal").unwrap();
        assert!(dropped.tags().aligned_shifts.is_empty());
        assert_eq!(dropped.tags().shift_axis, None);
    }

    #[test]
    fn add_rejects_different_edges_naming_axis() {
        let mut a = shift_by_var();
        let axes = vec![
            Axis::category("shift", ["nominal", "jec_up"]),
            Axis::numeric("pt", vec![0.0, 10.0, 25.0]),
        ];
        let b = Histogram::new(axes, Storage::Count(vec![0.0; 4])).unwrap();
        match a.add(&b).unwrap_err() {
            AppError::AxisMismatch { axis, .. } => assert_eq!(axis, "pt"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn mean_accumulators_merge_exactly() {
        let mut a = MeanAccumulator::default();
        let mut b = MeanAccumulator::default();
        let mut all = MeanAccumulator::default();
        for (i, x) in [1.0, 2.0, 4.0, 8.0, 3.0].iter().enumerate() {
            let w = 0.5 + i as f64;
            if i % 2 == 0 { a.fill(*x, w) } else { b.fill(*x, w) }
            all.fill(*x, w);
        }
        a.merge(&b);
        assert!((a.sum_of_weights - all.sum_of_weights).abs() < 1e-12);
        assert!((a.value - all.value).abs() < 1e-12);
        assert!((a.sum_of_weighted_deltas_squared - all.sum_of_weighted_deltas_squared).abs() < 1e-9);
    }
}

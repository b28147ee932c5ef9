pub mod align;
pub mod histogram;
pub mod merge;
pub mod normalize;

pub use align::align_shifts;
pub use histogram::{
    Axis, BinnedSeries, HistTags, Histogram, MeanAccumulator, Storage, StorageKind, WeightSum,
};
pub use merge::{PeriodMap, ProcessMap, merge_periods};
pub use normalize::normalize;

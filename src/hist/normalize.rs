use tracing::{debug, warn};

use super::histogram::{Histogram, Storage};

/// Replace weighted-mean accumulators by their weight accounting.
///
/// The averaged quantity is discarded. Anything that is not weighted-mean storage is
/// handed back untouched: silently for a histogram this function already produced,
/// with a warning otherwise, since ratio arithmetic downstream assumes weight sums.
pub fn normalize(hist: Histogram) -> Histogram {
    let (axes, storage, mut tags) = hist.into_parts();
    let storage = match storage {
        Storage::WeightedMean(bins) => {
            tags.normalized = true;
            Storage::Weight(bins.iter().map(|b| b.weight_sum()).collect())
        }
        other => {
            if tags.normalized {
                debug!("histogram already normalized");
            } else {
                warn!(
                    storage = %other.kind(),
                    "expected weighted_mean storage, returning histogram unchanged"
                );
            }
            other
        }
    };
    Histogram::from_parts(axes, storage, tags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hist::histogram::{Axis, MeanAccumulator, StorageKind};

    fn mean_hist() -> Histogram {
        let mut bins = vec![MeanAccumulator::default(); 3];
        bins[0].fill(12.0, 1.5);
        bins[0].fill(30.0, 0.5);
        bins[2].fill(7.0, 2.0);
        let axes = vec![Axis::numeric("ht", vec![0.0, 1.0, 2.0, 3.0])];
        Histogram::new(axes, Storage::WeightedMean(bins)).unwrap()
    }

    #[test]
    fn keeps_weight_accounting_exactly() {
        let h = mean_hist();
        let sumw = h.storage().sum_of_weights();
        let sumw2 = h.storage().sum_of_weights_squared();

        let n = normalize(h);
        assert_eq!(n.kind(), StorageKind::Weight);
        assert!(n.tags().normalized);
        assert_eq!(n.storage().sum_of_weights(), sumw);
        assert_eq!(n.storage().sum_of_weights_squared(), sumw2);
    }

    #[test]
    fn second_application_is_identity() {
        let once = normalize(mean_hist());
        let twice = normalize(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn count_storage_passes_through() {
        let axes = vec![Axis::numeric("ht", vec![0.0, 1.0])];
        let h = Histogram::new(axes, Storage::Count(vec![4.0])).unwrap();
        let out = normalize(h.clone());
        assert_eq!(out, h);
        assert!(!out.tags().normalized);
    }
}

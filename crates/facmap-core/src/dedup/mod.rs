//! Cross-provider deduplication.
//!
//! Records are bucketed by [`normalize_key`]; inside a bucket a record
//! from the incoming set is merged into the first candidate within the
//! proximity box, otherwise it joins the bucket as a new facility.

mod merge;
mod normalize;

use std::collections::HashMap;

pub use merge::{merge, union};
pub use normalize::normalize_key;

use crate::facility::{CanonicalFacility, Provider};

/// Maximum longitude difference for two records to be duplicates (exclusive).
pub const MAX_LNG_DIFF: f64 = 0.002;

/// Maximum latitude difference for two records to be duplicates (exclusive).
pub const MAX_LAT_DIFF: f64 = 0.001;

/// Order in which provider record sets are folded with [`combine`].
///
/// Earlier providers win scalar conflicts and own name and location.
pub const PROVIDER_FOLD_ORDER: [Provider; 2] = [Provider::Multisport, Provider::Medicover];

/// Proximity predicate: both coordinate deltas strictly below the box size.
#[must_use]
pub fn is_duplicate(a: &CanonicalFacility, b: &CanonicalFacility) -> bool {
    (a.location.lng - b.location.lng).abs() < MAX_LNG_DIFF
        && (a.location.lat - b.location.lat).abs() < MAX_LAT_DIFF
}

/// Records grouped by normalized name, in first-seen key order.
#[derive(Debug, Default)]
struct Buckets {
    index: HashMap<String, usize>,
    buckets: Vec<Vec<CanonicalFacility>>,
}

impl Buckets {
    fn bucket_mut(&mut self, record: &CanonicalFacility) -> &mut Vec<CanonicalFacility> {
        let key = normalize_key(&record.name);
        let next = self.buckets.len();
        let idx = *self.index.entry(key).or_insert(next);
        if idx == next {
            self.buckets.push(Vec::new());
        }
        &mut self.buckets[idx]
    }

    fn add(&mut self, record: CanonicalFacility) {
        self.bucket_mut(&record).push(record);
    }

    fn add_or_merge(&mut self, record: CanonicalFacility) -> bool {
        let bucket = self.bucket_mut(&record);
        match bucket.iter().position(|candidate| is_duplicate(candidate, &record)) {
            Some(pos) => {
                let candidate = std::mem::take(&mut bucket[pos]);
                bucket[pos] = merge(candidate, record);
                true
            }
            None => {
                bucket.push(record);
                false
            }
        }
    }

    fn into_records(self) -> Vec<CanonicalFacility> {
        self.buckets.into_iter().flatten().collect()
    }
}

/// Combine two record sets, merging records of `second` into duplicates
/// already present.
///
/// Every record of `first` is kept as-is. A record of `second` may also
/// match an earlier unmatched record of `second`. Not associative: the
/// fold order decides field precedence.
#[must_use]
pub fn combine(first: Vec<CanonicalFacility>, second: Vec<CanonicalFacility>) -> Vec<CanonicalFacility> {
    let mut buckets = Buckets::default();
    for record in first {
        buckets.add(record);
    }
    let mut merged = 0usize;
    for record in second {
        if buckets.add_or_merge(record) {
            merged += 1;
        }
    }
    tracing::debug!(merged, "combined record sets");
    buckets.into_records()
}

/// Fold per-provider record sets left to right in [`PROVIDER_FOLD_ORDER`].
///
/// Providers missing from `sets` are skipped. The first present provider's
/// records seed the accumulator unchanged.
#[must_use]
pub fn fold_providers(mut sets: Vec<(Provider, Vec<CanonicalFacility>)>) -> Vec<CanonicalFacility> {
    let mut acc: Option<Vec<CanonicalFacility>> = None;
    for provider in PROVIDER_FOLD_ORDER {
        let Some(pos) = sets.iter().position(|(p, _)| *p == provider) else {
            continue;
        };
        let (_, records) = sets.swap_remove(pos);
        acc = Some(match acc {
            None => records,
            Some(prev) => combine(prev, records),
        });
    }
    acc.unwrap_or_default()
}

#[cfg(test)]
#[path = "../dedup_test.rs"]
mod tests;

//! The canonical store boundary consumed by ingestion and the query engine.

use async_trait::async_trait;
use facmap_core::{
    CanonicalFacility, ClusterGroup, Facility, FuzzyMatch, OrderBy, Page, Selection, TagField,
};

use crate::DbError;

/// Result of a full replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceOutcome {
    pub written: usize,
    /// Store generation after the replace became visible.
    pub generation: u64,
}

/// Persistence for canonical facility records.
///
/// Implementations give every read a consistent point-in-time view: a
/// concurrent [`replace_all`](FacilityStore::replace_all) is observed
/// either entirely or not at all.
#[async_trait]
pub trait FacilityStore: Send + Sync {
    /// Replace the whole record set, assigning fresh ids.
    async fn replace_all(&self, records: Vec<CanonicalFacility>)
        -> Result<ReplaceOutcome, DbError>;

    async fn find_one(&self, id: i64) -> Result<Option<Facility>, DbError>;

    /// Records matching `selection`, sorted by `order`, one page.
    async fn search(
        &self,
        selection: &Selection,
        order: OrderBy,
        page: Page,
    ) -> Result<Vec<Facility>, DbError>;

    /// Partition the records matching `selection` into at most
    /// `max_clusters` non-empty groups.
    async fn cluster(
        &self,
        selection: &Selection,
        max_clusters: usize,
    ) -> Result<Vec<ClusterGroup>, DbError>;

    /// Records whose name similarity to `input` is strictly above
    /// `threshold`, best first, ties by ascending id.
    async fn fuzzy(
        &self,
        input: &str,
        threshold: f64,
        limit: usize,
    ) -> Result<Vec<FuzzyMatch>, DbError>;

    /// Every value used in one tag field, sorted ascending.
    async fn distinct_values(&self, field: TagField) -> Result<Vec<String>, DbError>;

    /// Counter bumped by every committed replace.
    async fn generation(&self) -> Result<u64, DbError>;

    /// Verify the backend is reachable.
    async fn health(&self) -> Result<(), DbError>;
}

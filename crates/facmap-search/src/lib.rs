//! Spatial Query Engine: map clustering, paged search, fuzzy lookup and
//! distinct tag values over a [`FacilityStore`].

mod distinct;

use std::sync::Arc;

use facmap_core::{
    Facility, FuzzyMatch, MapObject, OrderBy, Page, QueryError, Selection, TagField,
    FUZZY_LIMIT, MAX_CLUSTERS, SIMILARITY_THRESHOLD,
};
use facmap_db::{DbError, FacilityStore};
use thiserror::Error;

pub use distinct::DistinctCache;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("facility {0} not found")]
    NotFound(i64),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Store(#[from] DbError),
}

/// Read-side facade shared by the HTTP server and the CLI.
///
/// Cheap to clone; clones share the store and the distinct-value cache.
#[derive(Clone)]
pub struct FacilityService {
    store: Arc<dyn FacilityStore>,
    distinct: Arc<DistinctCache>,
}

impl FacilityService {
    #[must_use]
    pub fn new(store: Arc<dyn FacilityStore>) -> Self {
        Self {
            store,
            distinct: Arc::new(DistinctCache::default()),
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn FacilityStore> {
        &self.store
    }

    /// Markers for every record matching `selection`, at most
    /// [`MAX_CLUSTERS`] of them.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Store`] when the store fails.
    pub async fn map_query(&self, selection: &Selection) -> Result<Vec<MapObject>, SearchError> {
        let groups = self.store.cluster(selection, MAX_CLUSTERS).await?;
        let objects: Vec<MapObject> = groups.iter().filter_map(MapObject::from_group).collect();
        tracing::debug!(objects = objects.len(), "map query answered");
        Ok(objects)
    }

    /// One page of full records matching `selection`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Store`] when the store fails.
    pub async fn full_search(
        &self,
        selection: &Selection,
        order: OrderBy,
        page: Page,
    ) -> Result<Vec<Facility>, SearchError> {
        Ok(self.store.search(selection, order, page).await?)
    }

    /// Best name matches for `input`. Blank input answers empty without
    /// touching the store.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Store`] when the store fails.
    pub async fn fuzzy_search(&self, input: &str) -> Result<Vec<FuzzyMatch>, SearchError> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .store
            .fuzzy(input, SIMILARITY_THRESHOLD, FUZZY_LIMIT)
            .await?)
    }

    /// # Errors
    ///
    /// Returns [`SearchError::NotFound`] for an unknown id.
    pub async fn get_facility(&self, id: i64) -> Result<Facility, SearchError> {
        self.store
            .find_one(id)
            .await?
            .ok_or(SearchError::NotFound(id))
    }

    /// Every value used in `field`, sorted. Served from the cache while
    /// the store generation is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Store`] when the store fails.
    pub async fn distinct_values(&self, field: TagField) -> Result<Arc<Vec<String>>, SearchError> {
        Ok(self.distinct.get(self.store.as_ref(), field).await?)
    }

    /// Drop every memoized distinct-value list. Called after ingestion.
    pub fn invalidate(&self) {
        self.distinct.clear();
    }
}

#[cfg(test)]
#[path = "service_test.rs"]
mod tests;

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use facmap_core::TagField;
use facmap_db::{DbError, FacilityStore};

#[derive(Debug)]
struct Entry {
    generation: u64,
    values: Arc<Vec<String>>,
}

/// Memoized distinct tag values, keyed by field and tagged with the store
/// generation they were read at.
///
/// An entry is reused only while the store reports the same generation, so
/// a replace made by another process is picked up on the next read even
/// without [`clear`](DistinctCache::clear).
#[derive(Debug, Default)]
pub struct DistinctCache {
    entries: RwLock<HashMap<TagField, Entry>>,
}

impl DistinctCache {
    /// # Errors
    ///
    /// Propagates store failures; nothing is cached in that case.
    pub async fn get(
        &self,
        store: &dyn FacilityStore,
        field: TagField,
    ) -> Result<Arc<Vec<String>>, DbError> {
        let generation = store.generation().await?;

        let cached = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&field)
            .filter(|e| e.generation == generation)
            .map(|e| Arc::clone(&e.values));
        if let Some(values) = cached {
            return Ok(values);
        }

        let values = Arc::new(store.distinct_values(field).await?);
        tracing::debug!(%field, generation, count = values.len(), "distinct values refreshed");
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                field,
                Entry {
                    generation,
                    values: Arc::clone(&values),
                },
            );
        Ok(values)
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

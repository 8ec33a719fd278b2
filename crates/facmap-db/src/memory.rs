//! In-process [`FacilityStore`] backed by an R-tree.
//!
//! Every replace builds a complete new [`Snapshot`] and swaps it in behind
//! an `Arc`, so readers holding the previous snapshot are never affected.
//! Optionally the record set is persisted to a JSON file and reloaded on
//! start.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use facmap_core::cluster::kmeans;
use facmap_core::similarity::name_similarity;
use facmap_core::{
    CanonicalFacility, ClusterGroup, Facility, FuzzyMatch, OrderBy, Page, Selection, TagField,
};
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

use crate::store::{FacilityStore, ReplaceOutcome};
use crate::DbError;

#[derive(Debug, Clone, Copy, PartialEq)]
struct IndexedPoint {
    id: i64,
    /// `[lng, lat]`
    point: [f64; 2],
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

#[derive(Debug, Deserialize)]
struct SnapshotFile {
    generation: u64,
    next_id: i64,
    facilities: Vec<Facility>,
}

#[derive(Serialize)]
struct SnapshotFileRef<'a> {
    generation: u64,
    next_id: i64,
    facilities: &'a [Facility],
}

/// An immutable, fully indexed record set.
struct Snapshot {
    generation: u64,
    next_id: i64,
    facilities: Vec<Facility>,
    by_id: HashMap<i64, usize>,
    index: RTree<IndexedPoint>,
}

impl Snapshot {
    fn empty() -> Self {
        Self::build(0, 1, Vec::new())
    }

    fn build(generation: u64, next_id: i64, facilities: Vec<Facility>) -> Self {
        let by_id = facilities
            .iter()
            .enumerate()
            .map(|(idx, f)| (f.id, idx))
            .collect();
        let points = facilities
            .iter()
            .map(|f| IndexedPoint {
                id: f.id,
                point: [f.record.location.lng, f.record.location.lat],
            })
            .collect();
        Self {
            generation,
            next_id,
            facilities,
            by_id,
            index: RTree::bulk_load(points),
        }
    }

    /// Records matching `selection`, in ascending id order.
    fn select(&self, selection: &Selection) -> Vec<&Facility> {
        let sw = selection.bounds.south_west;
        let ne = selection.bounds.north_east;
        let envelope = AABB::from_corners([sw.lng, sw.lat], [ne.lng, ne.lat]);

        let mut out: Vec<&Facility> = self
            .index
            .locate_in_envelope_intersecting(&envelope)
            .filter_map(|p| self.by_id.get(&p.id).map(|idx| &self.facilities[*idx]))
            .filter(|f| selection.matches(&f.record))
            .collect();
        out.sort_by_key(|f| f.id);
        out
    }
}

/// R-tree indexed store living in process memory.
pub struct MemoryStore {
    current: RwLock<Arc<Snapshot>>,
    snapshot_path: Option<PathBuf>,
    writer: tokio::sync::Mutex<()>,
}

impl MemoryStore {
    /// An empty store without persistence.
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(Snapshot::empty())),
            snapshot_path: None,
            writer: tokio::sync::Mutex::new(()),
        }
    }

    /// A store persisted to `path`, loading existing contents when the
    /// file is present.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::SnapshotIo`] or [`DbError::SnapshotParse`] when an
    /// existing file cannot be read or decoded.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, DbError> {
        let path = path.into();
        let snapshot = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let file: SnapshotFile =
                    serde_json::from_slice(&bytes).map_err(|source| DbError::SnapshotParse {
                        path: path.display().to_string(),
                        source,
                    })?;
                tracing::info!(
                    path = %path.display(),
                    records = file.facilities.len(),
                    generation = file.generation,
                    "loaded facility snapshot"
                );
                Snapshot::build(file.generation, file.next_id, file.facilities)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Snapshot::empty(),
            Err(source) => {
                return Err(DbError::SnapshotIo {
                    path: path.display().to_string(),
                    source,
                })
            }
        };

        Ok(Self {
            current: RwLock::new(Arc::new(snapshot)),
            snapshot_path: Some(path),
            writer: tokio::sync::Mutex::new(()),
        })
    }

    fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Number of records currently visible.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot().facilities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

async fn persist(path: &Path, file: &SnapshotFileRef<'_>) -> Result<(), DbError> {
    let io_err = |source| DbError::SnapshotIo {
        path: path.display().to_string(),
        source,
    };
    let bytes = serde_json::to_vec(file).map_err(|source| DbError::SnapshotParse {
        path: path.display().to_string(),
        source,
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await.map_err(io_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(io_err)?;
    Ok(())
}

#[async_trait]
impl FacilityStore for MemoryStore {
    async fn replace_all(
        &self,
        records: Vec<CanonicalFacility>,
    ) -> Result<ReplaceOutcome, DbError> {
        let _writer = self.writer.lock().await;
        let previous = self.snapshot();

        let mut next_id = previous.next_id;
        let facilities: Vec<Facility> = records
            .into_iter()
            .map(|record| {
                let id = next_id;
                next_id += 1;
                Facility { id, record }
            })
            .collect();
        let generation = previous.generation + 1;

        if let Some(path) = &self.snapshot_path {
            persist(
                path,
                &SnapshotFileRef {
                    generation,
                    next_id,
                    facilities: &facilities,
                },
            )
            .await?;
        }

        let written = facilities.len();
        let next = Arc::new(Snapshot::build(generation, next_id, facilities));
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = next;

        tracing::debug!(written, generation, "memory store replaced");
        Ok(ReplaceOutcome {
            written,
            generation,
        })
    }

    async fn find_one(&self, id: i64) -> Result<Option<Facility>, DbError> {
        let snapshot = self.snapshot();
        Ok(snapshot
            .by_id
            .get(&id)
            .map(|idx| snapshot.facilities[*idx].clone()))
    }

    async fn search(
        &self,
        selection: &Selection,
        order: OrderBy,
        page: Page,
    ) -> Result<Vec<Facility>, DbError> {
        let snapshot = self.snapshot();
        let mut selected = snapshot.select(selection);
        match order {
            OrderBy::Name => selected.sort_by(|a, b| {
                a.record
                    .name
                    .cmp(&b.record.name)
                    .then_with(|| a.id.cmp(&b.id))
            }),
        }
        Ok(selected
            .into_iter()
            .skip(page.offset())
            .take(page.limit())
            .cloned()
            .collect())
    }

    async fn cluster(
        &self,
        selection: &Selection,
        max_clusters: usize,
    ) -> Result<Vec<ClusterGroup>, DbError> {
        let snapshot = self.snapshot();
        let points: Vec<_> = snapshot
            .select(selection)
            .into_iter()
            .map(|f| (f.id, f.record.location))
            .collect();
        Ok(kmeans(&points, max_clusters))
    }

    async fn fuzzy(
        &self,
        input: &str,
        threshold: f64,
        limit: usize,
    ) -> Result<Vec<FuzzyMatch>, DbError> {
        let snapshot = self.snapshot();
        let mut hits: Vec<FuzzyMatch> = snapshot
            .facilities
            .iter()
            .filter_map(|f| {
                let score = name_similarity(&f.record.name, input);
                (score > threshold).then(|| FuzzyMatch {
                    id: f.id,
                    name: f.record.name.clone(),
                    city: f.record.city.clone(),
                    score,
                })
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn distinct_values(&self, field: TagField) -> Result<Vec<String>, DbError> {
        let snapshot = self.snapshot();
        let values: BTreeSet<&String> = snapshot
            .facilities
            .iter()
            .flat_map(|f| f.record.tags(field))
            .collect();
        Ok(values.into_iter().cloned().collect())
    }

    async fn generation(&self) -> Result<u64, DbError> {
        Ok(self.snapshot().generation)
    }

    async fn health(&self) -> Result<(), DbError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;

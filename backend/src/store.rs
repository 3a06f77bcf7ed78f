//! Persistence of generated routes, keyed by area hash.

use std::{
    future::Future,
    num::NonZeroUsize,
    sync::{
        Mutex,
        atomic::{AtomicI64, Ordering},
    },
};

use chrono::{DateTime, Utc};
use lru::LruCache;
use serde::{Deserialize, Serialize};

use crate::{database::DatabaseError, models::GeneratedRoute};

pub type RouteId = i64;

/// A generated route as persisted, with its bookkeeping columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRoute {
    pub id: RouteId,
    pub area_hash: String,
    pub generated_at: DateTime<Utc>,
    pub last_activity_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub route: GeneratedRoute,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    pub deleted: u64,
    /// Routes past the retention window that survived because someone walked them.
    pub kept: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error("route not found: {0}")]
    NotFound(RouteId),
    #[error("route cache lock poisoned")]
    Poisoned,
}

pub trait RouteStore {
    /// Routes previously generated for `area_hash`, in insertion order.
    fn find_by_area(&self, area_hash: &str) -> impl Future<Output = Result<Vec<StoredRoute>, StoreError>> + Send;

    /// Persist a batch for one area; assigns ids and `generated_at`.
    fn store_generated(
        &self,
        area_hash: &str,
        routes: Vec<GeneratedRoute>,
    ) -> impl Future<Output = Result<Vec<StoredRoute>, StoreError>> + Send;

    /// Mark a route as used so purges keep it.
    fn record_activity(&self, id: RouteId) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Delete routes generated before `older_than` that never saw activity.
    fn purge_stale(&self, older_than: DateTime<Utc>) -> impl Future<Output = Result<PurgeReport, StoreError>> + Send;
}

/// Process-local store; evicts whole areas once `capacity` is exceeded.
pub struct MemoryRouteStore {
    areas: Mutex<LruCache<String, Vec<StoredRoute>>>,
    next_id: AtomicI64,
}

impl MemoryRouteStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            areas: Mutex::new(LruCache::new(capacity)),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn area_count(&self) -> usize {
        self.areas.lock().map(|areas| areas.len()).unwrap_or(0)
    }

    pub fn store_generated_at(
        &self,
        area_hash: &str,
        routes: Vec<GeneratedRoute>,
        generated_at: DateTime<Utc>,
    ) -> Result<Vec<StoredRoute>, StoreError> {
        let stored: Vec<StoredRoute> = routes
            .into_iter()
            .map(|route| StoredRoute {
                id: self.next_id.fetch_add(1, Ordering::Relaxed),
                area_hash: area_hash.to_string(),
                generated_at,
                last_activity_at: None,
                route,
            })
            .collect();

        let mut areas = self.areas.lock().map_err(|_| StoreError::Poisoned)?;
        match areas.get_mut(area_hash) {
            Some(existing) => existing.extend(stored.iter().cloned()),
            None => {
                if let Some((evicted, _)) = areas.push(area_hash.to_string(), stored.clone()) {
                    tracing::debug!("evicted cached routes for area {evicted}");
                }
            }
        }
        Ok(stored)
    }
}

impl Default for MemoryRouteStore {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_CACHE_CAPACITY)
    }
}

impl RouteStore for MemoryRouteStore {
    async fn find_by_area(&self, area_hash: &str) -> Result<Vec<StoredRoute>, StoreError> {
        let mut areas = self.areas.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(areas.get(area_hash).cloned().unwrap_or_default())
    }

    async fn store_generated(
        &self,
        area_hash: &str,
        routes: Vec<GeneratedRoute>,
    ) -> Result<Vec<StoredRoute>, StoreError> {
        self.store_generated_at(area_hash, routes, Utc::now())
    }

    async fn record_activity(&self, id: RouteId) -> Result<(), StoreError> {
        let mut areas = self.areas.lock().map_err(|_| StoreError::Poisoned)?;
        let route = areas
            .iter_mut()
            .flat_map(|(_, routes)| routes.iter_mut())
            .find(|route| route.id == id)
            .ok_or(StoreError::NotFound(id))?;
        route.last_activity_at = Some(Utc::now());
        Ok(())
    }

    async fn purge_stale(&self, older_than: DateTime<Utc>) -> Result<PurgeReport, StoreError> {
        let mut areas = self.areas.lock().map_err(|_| StoreError::Poisoned)?;
        let mut report = PurgeReport::default();
        let mut emptied = Vec::new();

        for (area, routes) in areas.iter_mut() {
            routes.retain(|route| {
                if route.generated_at >= older_than {
                    return true;
                }
                if route.last_activity_at.is_some() {
                    report.kept += 1;
                    true
                } else {
                    report.deleted += 1;
                    false
                }
            });
            if routes.is_empty() {
                emptied.push(area.clone());
            }
        }
        for area in emptied {
            areas.pop(&area);
        }

        tracing::info!("purged {} stale routes, kept {} active", report.deleted, report.kept);
        Ok(report)
    }
}

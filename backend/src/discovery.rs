//! Serve walks around a user: cached per area, synthesized on a miss.

use serde::{Deserialize, Serialize};

use crate::{
    area::area_hash,
    engine::RouteSynthesizer,
    geometry::distance_m,
    models::{Coordinate, GeneratedRoute, TerrainType},
    overpass::{FetchError, SegmentSource},
    store::{RouteId, RouteStore, StoredRoute},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteFilter {
    pub min_duration: Option<u32>,
    pub max_duration: Option<u32>,
    pub terrain: Option<TerrainType>,
}

impl RouteFilter {
    pub fn accepts(&self, route: &GeneratedRoute) -> bool {
        self.min_duration.is_none_or(|min| route.duration_minutes >= min)
            && self.max_duration.is_none_or(|max| route.duration_minutes <= max)
            && self.terrain.is_none_or(|terrain| route.terrain_type == terrain)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryQuery {
    pub lat: f64,
    pub lng: f64,
    pub radius_m: u32,
    pub filter: RouteFilter,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveredRoute {
    /// `None` when the store failed and the route was served unsaved.
    pub id: Option<RouteId>,
    pub area_hash: String,
    #[serde(flatten)]
    pub route: GeneratedRoute,
    pub distance_from_user_m: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("invalid coordinates: lat {lat}, lng {lng}")]
    InvalidCoordinates { lat: f64, lng: f64 },
    #[error("failed to fetch map segments: {0}")]
    Fetch(#[from] FetchError),
}

pub struct Discovery<S, R> {
    source: S,
    store: R,
    synthesizer: RouteSynthesizer,
}

impl<S: SegmentSource, R: RouteStore> Discovery<S, R> {
    pub fn new(source: S, store: R, synthesizer: RouteSynthesizer) -> Self {
        Self {
            source,
            store,
            synthesizer,
        }
    }

    pub fn store(&self) -> &R {
        &self.store
    }

    /// Routes near the query point, closest first.
    pub async fn discover(&self, query: &DiscoveryQuery) -> Result<Vec<DiscoveredRoute>, DiscoveryError> {
        let origin = Coordinate::new(query.lat, query.lng);
        if !origin.is_valid() {
            return Err(DiscoveryError::InvalidCoordinates {
                lat: query.lat,
                lng: query.lng,
            });
        }

        let area = area_hash(query.lat, query.lng);
        let cached = match self.store.find_by_area(&area).await {
            Ok(routes) => routes,
            Err(err) => {
                tracing::warn!("route lookup for area {area} failed, regenerating: {err}");
                Vec::new()
            }
        };

        let candidates: Vec<(Option<RouteId>, GeneratedRoute)> = if cached.is_empty() {
            self.generate(&area, query).await?
        } else {
            tracing::info!("serving {} cached routes for area {area}", cached.len());
            cached.into_iter().map(|stored| (Some(stored.id), stored.route)).collect()
        };

        let mut discovered: Vec<DiscoveredRoute> = candidates
            .into_iter()
            .filter(|(_, route)| query.filter.accepts(route))
            .map(|(id, route)| {
                let center = Coordinate::new(route.center_lat, route.center_lng);
                DiscoveredRoute {
                    id,
                    area_hash: area.clone(),
                    distance_from_user_m: distance_m(origin, center).round() as u32,
                    route,
                }
            })
            .collect();
        discovered.sort_by_key(|route| route.distance_from_user_m);

        Ok(discovered)
    }

    async fn generate(
        &self,
        area: &str,
        query: &DiscoveryQuery,
    ) -> Result<Vec<(Option<RouteId>, GeneratedRoute)>, DiscoveryError> {
        let segments = self
            .source
            .fetch_segments(query.lat, query.lng, query.radius_m)
            .await?;
        tracing::info!("fetched {} segments for area {area}", segments.len());

        let generated = self.synthesizer.synthesize(&segments);
        if generated.is_empty() {
            tracing::info!("no walkable routes around area {area}");
            return Ok(Vec::new());
        }

        match self.store.store_generated(area, generated.clone()).await {
            Ok(stored) => Ok(stored
                .into_iter()
                .map(|StoredRoute { id, route, .. }| (Some(id), route))
                .collect()),
            Err(err) => {
                tracing::warn!("failed to store routes for area {area}, serving unsaved: {err}");
                Ok(generated.into_iter().map(|route| (None, route)).collect())
            }
        }
    }
}

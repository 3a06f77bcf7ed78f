use std::{cmp::Ordering, collections::HashSet};

use kdtree::KdTree;
use kdtree::distance::squared_euclidean;

use crate::{
    config::CONNECTION_RADIUS_M,
    geometry::{distance_m, EARTH_RADIUS_M},
    models::{Coordinate, MapSegment, SegmentId},
};

/// Widening applied to the degree-space search box so it always covers the
/// metric connection radius.
const SEARCH_SLACK: f64 = 1.5;
/// Largest `radius / (2R cos(lat))` for which the slack box still bounds the
/// radius. Closer to the poles the index falls back to scanning every segment.
const MAX_POLAR_RATIO: f64 = 0.25;

/// Lookup of the closest connectable segment (Dependency Inversion Principle)
///
/// # Contract
/// All implementations must:
/// - Skip segments whose id is in `excluded`
/// - Measure a segment by the nearer of its two endpoints
/// - Return `None` unless the best distance is strictly below the radius
/// - Resolve ties to the segment that came first in input order
pub trait NearestSegment<'a> {
    fn find_nearest(&self, point: Coordinate, excluded: &HashSet<SegmentId>) -> Option<&'a MapSegment>;
}

/// Closest segment endpoint to `point` within [`CONNECTION_RADIUS_M`].
pub fn find_nearest<'a>(
    candidates: impl IntoIterator<Item = &'a MapSegment>,
    point: Coordinate,
    excluded: &HashSet<SegmentId>,
) -> Option<&'a MapSegment> {
    find_nearest_within(candidates, point, excluded, CONNECTION_RADIUS_M)
}

pub fn find_nearest_within<'a>(
    candidates: impl IntoIterator<Item = &'a MapSegment>,
    point: Coordinate,
    excluded: &HashSet<SegmentId>,
    radius_m: f64,
) -> Option<&'a MapSegment> {
    let mut best = None;
    let mut best_dist = f64::INFINITY;

    for segment in candidates {
        if excluded.contains(&segment.id) {
            continue;
        }
        let Some(dist) = endpoint_distance_m(segment, point) else {
            continue;
        };
        if dist < best_dist {
            best_dist = dist;
            best = Some(segment);
        }
    }

    best.filter(|_| best_dist < radius_m)
}

fn endpoint_distance_m(segment: &MapSegment, point: Coordinate) -> Option<f64> {
    let (start, end) = segment.endpoints()?;
    Some(distance_m(point, start).min(distance_m(point, end)))
}

/// Brute-force scan over every candidate. Reference implementation.
pub struct LinearScan<'a> {
    segments: Vec<&'a MapSegment>,
    radius_m: f64,
}

impl<'a> LinearScan<'a> {
    pub fn new(segments: impl IntoIterator<Item = &'a MapSegment>, radius_m: f64) -> Self {
        Self {
            segments: segments.into_iter().collect(),
            radius_m,
        }
    }
}

impl<'a> NearestSegment<'a> for LinearScan<'a> {
    fn find_nearest(&self, point: Coordinate, excluded: &HashSet<SegmentId>) -> Option<&'a MapSegment> {
        find_nearest_within(self.segments.iter().copied(), point, excluded, self.radius_m)
    }
}

/// Endpoint index backed by a KD-Tree over `[lon, lat]`.
///
/// The tree only narrows the candidate set: a degree-space box wide enough to
/// contain the metric radius is queried, then candidates are ranked with the
/// same haversine comparison as [`LinearScan`], in input order, so both
/// implementations agree on every query.
pub struct SegmentIndex<'a> {
    segments: Vec<&'a MapSegment>,
    tree: KdTree<f64, usize, [f64; 2]>,
    radius_m: f64,
}

impl<'a> SegmentIndex<'a> {
    pub fn new(segments: impl IntoIterator<Item = &'a MapSegment>, radius_m: f64) -> Self {
        let segments: Vec<&'a MapSegment> = segments.into_iter().collect();
        let mut tree = KdTree::new(2);
        for (idx, segment) in segments.iter().enumerate() {
            if let Some((start, end)) = segment.endpoints() {
                // Non-finite endpoints are rejected by the tree; such segments are never reachable.
                let _ = tree.add([start.lon, start.lat], idx);
                let _ = tree.add([end.lon, end.lat], idx);
            }
        }
        Self {
            segments,
            tree,
            radius_m,
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[&'a MapSegment] {
        &self.segments
    }

    fn candidate_indices(&self, point: Coordinate) -> Vec<usize> {
        let Some(search_deg) = search_radius_deg(point.lat, self.radius_m) else {
            return (0..self.segments.len()).collect();
        };
        let mut indices = Vec::new();

        for lon in query_longitudes(point.lon, search_deg) {
            match self
                .tree
                .within(&[lon, point.lat], search_deg * search_deg, &squared_euclidean)
            {
                Ok(hits) => indices.extend(hits.into_iter().map(|(_, &idx)| idx)),
                Err(err) => tracing::debug!("endpoint query at {:?} failed: {:?}", point, err),
            }
        }

        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

impl<'a> NearestSegment<'a> for SegmentIndex<'a> {
    fn find_nearest(&self, point: Coordinate, excluded: &HashSet<SegmentId>) -> Option<&'a MapSegment> {
        let candidates = self.candidate_indices(point);
        find_nearest_within(
            candidates.into_iter().map(|idx| self.segments[idx]),
            point,
            excluded,
            self.radius_m,
        )
    }
}

/// Degree radius covering `radius_m` in every direction around `lat`, or
/// `None` when no degree box can (near the poles or for huge radii).
fn search_radius_deg(lat: f64, radius_m: f64) -> Option<f64> {
    let meters_per_degree = EARTH_RADIUS_M.to_radians();
    let lat_span = radius_m / meters_per_degree;
    let worst_lat = (lat.abs() + lat_span).min(90.0);
    let cos_lat = worst_lat.to_radians().cos();
    let limit_m = MAX_POLAR_RATIO * 2.0 * EARTH_RADIUS_M * cos_lat;
    match radius_m.partial_cmp(&limit_m) {
        Some(Ordering::Less | Ordering::Equal) => Some(radius_m / (meters_per_degree * cos_lat) * SEARCH_SLACK),
        _ => None,
    }
}

/// Query longitudes, mirrored across the antimeridian when the box crosses it.
fn query_longitudes(lon: f64, search_deg: f64) -> Vec<f64> {
    let mut lons = vec![lon];
    if lon + search_deg > 180.0 {
        lons.push(lon - 360.0);
    }
    if lon - search_deg < -180.0 {
        lons.push(lon + 360.0);
    }
    lons
}

use std::collections::HashSet;

use rayon::prelude::*;

use crate::{
    chain::{build_chain, Chain},
    classify::classify,
    config::{ConfigError, SynthesisConfig},
    geometry::{centroid, polyline_length_m},
    loops::close_loop_within,
    models::{Coordinate, Difficulty, GeneratedRoute, MapSegment, SegmentId, TerrainType},
    segment_index::SegmentIndex,
};

/// Assembles raw map segments into loop walks of several target durations.
///
/// # Algorithm: Greedy Seeded Chaining
///
/// For every target duration, in order:
/// 1. Seed with the longest segment not yet used as a seed
/// 2. Chain nearest segments toward half the target distance
/// 3. Close the loop (near-loop kept, otherwise out-and-back)
/// 4. Cap the distance at `max_overshoot_ratio` × target and drop
///    candidates shorter than `min_duration_ratio` × target minutes
///
/// Two separate id sets are kept: seeds are unique per call, while any
/// segment may be chained into several routes.
///
/// The synthesizer holds no mutable state, so one instance can serve any
/// number of threads. Output depends only on the input order of segments.
#[derive(Debug, Clone, Default)]
pub struct RouteSynthesizer {
    config: SynthesisConfig,
}

impl RouteSynthesizer {
    pub fn new(config: SynthesisConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    pub fn synthesize(&self, segments: &[MapSegment]) -> Vec<GeneratedRoute> {
        let usable = usable_segments(segments);
        if usable.is_empty() {
            tracing::debug!("no usable segments, nothing to synthesize");
            return Vec::new();
        }

        let index = SegmentIndex::new(usable.iter().copied(), self.config.connection_radius_m);
        let lengths: Vec<f64> = usable.iter().map(|s| polyline_length_m(&s.points)).collect();
        let mut used_seeds: HashSet<SegmentId> = HashSet::new();
        let mut routes = Vec::new();

        for &target_min in &self.config.target_durations_min {
            let Some(seed_idx) = pick_seed(&usable, &lengths, &used_seeds) else {
                tracing::debug!("seed pool exhausted before the {target_min} min target");
                break;
            };
            let seed = usable[seed_idx];
            used_seeds.insert(seed.id);

            let target_m = self.config.target_distance_m(target_min);
            let chain = build_chain(seed, &index, target_m / 2.0);

            match self.assemble(chain, target_min, target_m) {
                Some(route) => {
                    tracing::info!(
                        "accepted {} min target: \"{}\" {}m / {} min ({})",
                        target_min,
                        route.name,
                        route.distance_meters,
                        route.duration_minutes,
                        route.terrain_type
                    );
                    routes.push(route);
                }
                None => tracing::debug!(
                    "skipped {} min target: chain from seed {} ({:.0}m) grew too little",
                    target_min,
                    seed.id,
                    lengths[seed_idx]
                ),
            }
        }

        routes
    }

    /// Synthesize independent areas in parallel; results keep input order.
    pub fn synthesize_many(&self, areas: &[Vec<MapSegment>]) -> Vec<Vec<GeneratedRoute>> {
        areas.par_iter().map(|segments| self.synthesize(segments)).collect()
    }

    fn assemble(&self, chain: Chain<'_>, target_min: u32, target_m: f64) -> Option<GeneratedRoute> {
        let distance = (chain.total_distance_m * 2.0).min(target_m * self.config.max_overshoot_ratio);
        let duration_minutes = (distance / self.config.walk_speed_mps() / 60.0).round() as u32;
        if (duration_minutes as f64) < target_min as f64 * self.config.min_duration_ratio {
            return None;
        }

        let terrain_type = dominant_terrain(&chain.segments);
        let path = close_loop_within(chain.coordinates, self.config.loop_closure_tolerance_m);
        let center = centroid(&path)?;
        let distance_meters = distance.round() as u32;

        Some(GeneratedRoute {
            name: route_name(&chain.segments, terrain_type, center),
            description: route_description(terrain_type, duration_minutes, distance_meters),
            duration_minutes,
            distance_meters,
            difficulty: Difficulty::from_distance_m(distance_meters as f64),
            terrain_type,
            path,
            center_lat: center.lat,
            center_lng: center.lon,
        })
    }
}

/// Synthesize with the default durations and constants.
pub fn synthesize_routes(segments: &[MapSegment]) -> Vec<GeneratedRoute> {
    RouteSynthesizer::default().synthesize(segments)
}

fn usable_segments(segments: &[MapSegment]) -> Vec<&MapSegment> {
    segments
        .iter()
        .filter(|segment| {
            let usable = segment.is_usable();
            if !usable {
                tracing::warn!(
                    "skipping segment {}: needs at least 2 finite points, got {}",
                    segment.id,
                    segment.points.len()
                );
            }
            usable
        })
        .collect()
}

/// Longest segment not yet used as a seed; the earliest wins on equal length.
fn pick_seed(segments: &[&MapSegment], lengths: &[f64], used_seeds: &HashSet<SegmentId>) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (idx, segment) in segments.iter().enumerate() {
        if used_seeds.contains(&segment.id) {
            continue;
        }
        if best.map_or(true, |b| lengths[idx] > lengths[b]) {
            best = Some(idx);
        }
    }
    best
}

/// Majority terrain among contributing segments; ties go to the category
/// that was counted first.
pub fn dominant_terrain(segments: &[&MapSegment]) -> TerrainType {
    let mut tally: Vec<(TerrainType, usize)> = Vec::with_capacity(3);
    for segment in segments {
        let terrain = classify(&segment.tags);
        match tally.iter_mut().find(|(t, _)| *t == terrain) {
            Some((_, count)) => *count += 1,
            None => tally.push((terrain, 1)),
        }
    }

    let mut best: Option<(TerrainType, usize)> = None;
    for (terrain, count) in tally {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((terrain, count));
        }
    }
    best.map_or(TerrainType::Mixed, |(terrain, _)| terrain)
}

fn terrain_label(terrain: TerrainType) -> &'static str {
    match terrain {
        TerrainType::Nature => "Nature walk",
        TerrainType::Urban => "Urban walk",
        TerrainType::Mixed => "Mixed walk",
    }
}

fn terrain_sentence(terrain: TerrainType) -> &'static str {
    match terrain {
        TerrainType::Nature => "A walk through nature",
        TerrainType::Urban => "An urban walk",
        TerrainType::Mixed => "A mixed town and nature walk",
    }
}

pub fn route_name(segments: &[&MapSegment], terrain: TerrainType, center: Coordinate) -> String {
    if let Some(name) = segments.iter().find_map(|s| s.tag("name")) {
        return format!("Walk {name}");
    }
    format!("{} ({:.3}, {:.3})", terrain_label(terrain), center.lat, center.lon)
}

pub fn route_description(terrain: TerrainType, duration_minutes: u32, distance_meters: u32) -> String {
    format!(
        "{} of {} min ({:.1} km). Route generated automatically from OpenStreetMap paths.",
        terrain_sentence(terrain),
        duration_minutes,
        distance_meters as f64 / 1000.0
    )
}

use std::collections::HashSet;

use crate::{
    geometry::{distance_m, polyline_length_m},
    models::{Coordinate, MapSegment, SegmentId},
    segment_index::NearestSegment,
};

/// A path under construction: segments glued end to end.
#[derive(Debug, Clone)]
pub struct Chain<'a> {
    pub coordinates: Vec<Coordinate>,
    pub used_segment_ids: HashSet<SegmentId>,
    /// Contributing segments in absorption order, seed first.
    pub segments: Vec<&'a MapSegment>,
    pub total_distance_m: f64,
}

impl<'a> Chain<'a> {
    fn from_seed(seed: &'a MapSegment) -> Self {
        Self {
            coordinates: seed.points.clone(),
            used_segment_ids: HashSet::from([seed.id]),
            segments: vec![seed],
            total_distance_m: polyline_length_m(&seed.points),
        }
    }

    pub fn last_point(&self) -> Option<Coordinate> {
        self.coordinates.last().copied()
    }

    fn absorb(&mut self, segment: &'a MapSegment, from: Coordinate) {
        let forward = match segment.endpoints() {
            Some((start, end)) => distance_m(from, start) <= distance_m(from, end),
            None => true,
        };
        if forward {
            self.coordinates.extend_from_slice(&segment.points);
        } else {
            self.coordinates.extend(segment.points.iter().rev().copied());
        }
        self.total_distance_m += polyline_length_m(&segment.points);
        self.used_segment_ids.insert(segment.id);
        self.segments.push(segment);
    }
}

/// Greedily extend `seed` with the nearest connectable segment until the
/// running length reaches `target_distance_m` or nothing is left in reach.
///
/// No backtracking: the chain may stop short of the target, which callers
/// accept. Every iteration either marks one more id as used or stops, so the
/// walk terminates after at most `pool.len()` steps.
pub fn build_chain<'a, F>(seed: &'a MapSegment, finder: &F, target_distance_m: f64) -> Chain<'a>
where
    F: NearestSegment<'a> + ?Sized,
{
    let mut chain = Chain::from_seed(seed);

    while chain.total_distance_m < target_distance_m {
        let Some(last) = chain.last_point() else {
            break;
        };
        let Some(next) = finder.find_nearest(last, &chain.used_segment_ids) else {
            tracing::debug!(
                "chain from segment {} stopped at {:.0}m of {:.0}m: no connectable segment",
                seed.id,
                chain.total_distance_m,
                target_distance_m
            );
            break;
        };
        chain.absorb(next, last);
    }

    chain
}

use std::collections::HashSet;

use walk_routes::{
    area_hash,
    chain::build_chain,
    config::{CONNECTION_RADIUS_M, LOOP_CLOSURE_TOLERANCE_M},
    loops::is_closed,
    models::{Coordinate, Difficulty, MapSegment, SegmentId, TerrainType},
    overpass::load_segments,
    segment_index::SegmentIndex,
    synthesize_routes, RouteSynthesizer, SynthesisConfig,
};

const METERS_PER_DEGREE: f64 = 111_194.926_644_558_7;

fn north(lon: f64, meters: f64) -> Coordinate {
    Coordinate {
        lat: 45.0 + meters / METERS_PER_DEGREE,
        lon,
    }
}

fn straight(id: SegmentId, lon: f64, from_m: f64, to_m: f64) -> MapSegment {
    MapSegment::new(
        id,
        vec![north(lon, from_m), north(lon, (from_m + to_m) / 2.0), north(lon, to_m)],
    )
}

fn synthesizer(durations: &[u32]) -> RouteSynthesizer {
    RouteSynthesizer::new(SynthesisConfig {
        target_durations_min: durations.to_vec(),
        ..SynthesisConfig::default()
    })
    .expect("valid config")
}

#[test]
fn empty_input_yields_no_routes() {
    assert!(synthesize_routes(&[]).is_empty());
}

#[test]
fn isolated_segment_becomes_out_and_back() {
    let segments = vec![
        straight(1, 5.0, 0.0, 1_000.0).with_tag("highway", "path"),
        // 1km east of the first one, far beyond the connection radius
        straight(2, 5.013, 0.0, 300.0),
    ];
    let routes = synthesizer(&[30]).synthesize(&segments);

    assert_eq!(routes.len(), 1);
    let route = &routes[0];
    assert_eq!(route.distance_meters, 2_000);
    assert_eq!(route.duration_minutes, 27);
    assert_eq!(route.difficulty, Difficulty::Moderate);
    assert_eq!(route.terrain_type, TerrainType::Nature);
    assert_eq!(route.path.len(), 5);
    assert!(is_closed(&route.path, LOOP_CLOSURE_TOLERANCE_M));
}

#[test]
fn short_target_caps_the_doubled_distance() {
    let segments = vec![straight(1, 5.0, 0.0, 1_000.0)];
    let routes = synthesizer(&[15]).synthesize(&segments);

    assert_eq!(routes.len(), 1);
    // 1.3 x 1125m one-way target
    assert!((1_462..=1_463).contains(&routes[0].distance_meters));
    assert!((19..=20).contains(&routes[0].duration_minutes));
    assert_eq!(routes[0].difficulty, Difficulty::Easy);
}

#[test]
fn three_connectable_segments_chain_fully() {
    let segments = vec![
        straight(1, 5.0, 0.0, 500.0),
        straight(2, 5.0, 540.0, 1_040.0),
        straight(3, 5.0, 1_080.0, 1_580.0),
    ];
    let index = SegmentIndex::new(&segments, CONNECTION_RADIUS_M);
    let chain = build_chain(&segments[0], &index, 10_000.0);

    assert_eq!(chain.used_segment_ids, HashSet::from([1, 2, 3]));
    assert!((chain.total_distance_m - 1_500.0).abs() < 1.0);
}

#[test]
fn area_hash_groups_nearby_points() {
    assert_eq!(area_hash(48.8566, 2.3522), area_hash(48.8566001, 2.35221));
    assert_ne!(area_hash(48.8566, 2.3522), area_hash(48.87, 2.37));
}

#[test]
fn default_durations_use_each_seed_once() {
    let segments: Vec<MapSegment> = (0..8)
        .map(|i| straight(i, 5.0 + i as f64 * 0.02, 0.0, 2_000.0 + i as f64 * 500.0))
        .collect();
    let routes = synthesize_routes(&segments);

    assert_eq!(routes.len(), 5);
    let durations: Vec<u32> = routes.iter().map(|r| r.duration_minutes).collect();
    assert!(durations.iter().all(|&d| d > 0));
    let centers: HashSet<String> = routes
        .iter()
        .map(|r| format!("{:.4},{:.4}", r.center_lat, r.center_lng))
        .collect();
    assert_eq!(centers.len(), routes.len());
}

#[test]
fn identical_inputs_give_identical_routes() {
    let segments = vec![
        straight(1, 5.0, 0.0, 500.0).with_tag("name", "Promenade des Berges"),
        straight(2, 5.0, 540.0, 1_040.0).with_tag("leisure", "park"),
        straight(3, 5.0, 1_080.0, 1_580.0).with_tag("highway", "pedestrian"),
        straight(4, 5.03, 0.0, 2_000.0),
    ];
    assert_eq!(synthesize_routes(&segments), synthesize_routes(&segments));
}

#[test]
fn segments_load_from_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("area.json");
    let segments = vec![
        straight(1, 5.0, 0.0, 1_000.0).with_tag("name", "Chemin du Lac"),
        straight(2, 5.0, 1_050.0, 1_600.0),
    ];
    std::fs::write(&path, serde_json::to_string(&segments).expect("serialize")).expect("write");

    let loaded = load_segments(&path).expect("load");
    assert_eq!(loaded, segments);

    let routes = synthesizer(&[30]).synthesize(&loaded);
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].name, "Walk Chemin du Lac");
}

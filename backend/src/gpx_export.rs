use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use geo_types::Point;
use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};

use crate::error::RouteError;
use crate::models::{Coordinate, GeneratedRoute};

const CREATOR: &str = "walk_routes";

/// Serialize a route as a single-track GPX 1.1 document, base64 encoded.
pub fn encode_route_as_gpx(route: &GeneratedRoute) -> Result<String, RouteError> {
    let buffer = write_gpx(route)?;
    Ok(BASE64.encode(buffer))
}

pub fn write_gpx(route: &GeneratedRoute) -> Result<Vec<u8>, RouteError> {
    let mut gpx = Gpx {
        version: GpxVersion::Gpx11,
        creator: Some(CREATOR.into()),
        ..Default::default()
    };
    let mut track = Track {
        name: Some(route.name.clone()),
        description: Some(route.description.clone()),
        type_: Some(route.terrain_type.to_string()),
        ..Default::default()
    };

    let mut segment = TrackSegment::new();
    for waypoint in route.path.iter().map(to_waypoint) {
        segment.points.push(waypoint);
    }
    track.segments.push(segment);
    gpx.tracks.push(track);

    let mut buffer = Vec::new();
    gpx::write(&gpx, &mut buffer)?;
    Ok(buffer)
}

fn to_waypoint(coord: &Coordinate) -> Waypoint {
    Waypoint::new(Point::new(coord.lon, coord.lat))
}

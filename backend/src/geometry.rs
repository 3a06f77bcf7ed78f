use serde_json::{json, Value};

use crate::error::RouteError;
use crate::models::Coordinate;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters (haversine).
///
/// The haversine term is clamped to `[0, 1]` so rounding near antipodal
/// points cannot push `sqrt(1 - h)` into NaN.
pub fn distance_m(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();

    let h = (sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon).clamp(0.0, 1.0);
    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}

pub fn polyline_length_m(points: &[Coordinate]) -> f64 {
    points.windows(2).map(|w| distance_m(w[0], w[1])).sum()
}

/// Arithmetic mean of latitudes and longitudes.
///
/// Good enough at walking scale; it is wrong for paths straddling the
/// antimeridian and degrades near the poles.
pub fn centroid(points: &[Coordinate]) -> Option<Coordinate> {
    if points.is_empty() {
        return None;
    }
    let (lat_sum, lon_sum) = points
        .iter()
        .fold((0.0, 0.0), |(lat, lon), p| (lat + p.lat, lon + p.lon));
    let n = points.len() as f64;
    Some(Coordinate {
        lat: lat_sum / n,
        lon: lon_sum / n,
    })
}

/// Encode a path as a GeoJSON `LineString` (`[lon, lat]` positions).
pub fn to_geojson_line_string(path: &[Coordinate]) -> Value {
    json!({
        "type": "LineString",
        "coordinates": path.iter().map(|c| [c.lon, c.lat]).collect::<Vec<_>>(),
    })
}

pub fn from_geojson_line_string(value: &Value) -> Result<Vec<Coordinate>, RouteError> {
    if value.get("type").and_then(Value::as_str) != Some("LineString") {
        return Err(RouteError::GeoJson("expected a LineString".into()));
    }
    let positions = value
        .get("coordinates")
        .and_then(Value::as_array)
        .ok_or_else(|| RouteError::GeoJson("missing coordinates array".into()))?;

    positions
        .iter()
        .enumerate()
        .map(|(idx, position)| {
            let pair = position.as_array().filter(|p| p.len() >= 2);
            match pair.map(|p| (p[0].as_f64(), p[1].as_f64())) {
                Some((Some(lon), Some(lat))) => Ok(Coordinate { lat, lon }),
                _ => Err(RouteError::GeoJson(format!("invalid position at index {idx}"))),
            }
        })
        .collect()
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use shared::{Coordinate, Difficulty, GeneratedRoute, TerrainType};

pub type SegmentId = i64;

/// Free-form OSM attributes. Ordered so iteration never depends on hashing.
pub type Tags = BTreeMap<String, String>;

/// One mapped way as handed over by the map-data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapSegment {
    pub id: SegmentId,
    pub points: Vec<Coordinate>,
    #[serde(default)]
    pub tags: Tags,
}

impl MapSegment {
    pub fn new(id: SegmentId, points: Vec<Coordinate>) -> Self {
        Self {
            id,
            points,
            tags: Tags::new(),
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// First and last point of the polyline.
    pub fn endpoints(&self) -> Option<(Coordinate, Coordinate)> {
        Some((*self.points.first()?, *self.points.last()?))
    }

    /// A segment the engine can chain: at least two finite points.
    pub fn is_usable(&self) -> bool {
        self.points.len() >= 2
            && self
                .points
                .iter()
                .all(|p| p.lat.is_finite() && p.lon.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_without_tags() {
        let json = r#"{"id": 7, "points": [{"lat": 45.0, "lon": 5.0}, {"lat": 45.001, "lon": 5.0}]}"#;
        let segment: MapSegment = serde_json::from_str(json).unwrap();
        assert_eq!(segment.id, 7);
        assert!(segment.tags.is_empty());
        assert!(segment.is_usable());
    }

    #[test]
    fn rejects_degenerate_geometry() {
        let single = MapSegment::new(1, vec![Coordinate::new(45.0, 5.0)]);
        assert!(!single.is_usable());
        assert_eq!(
            single.endpoints(),
            Some((Coordinate::new(45.0, 5.0), Coordinate::new(45.0, 5.0)))
        );

        let empty = MapSegment::new(2, Vec::new());
        assert!(!empty.is_usable());
        assert!(empty.endpoints().is_none());

        let nan = MapSegment::new(3, vec![Coordinate::new(45.0, 5.0), Coordinate::new(f64::NAN, 5.0)]);
        assert!(!nan.is_usable());
    }

    #[test]
    fn tag_lookup() {
        let segment = MapSegment::new(1, Vec::new()).with_tag("highway", "path");
        assert_eq!(segment.tag("highway"), Some("path"));
        assert_eq!(segment.tag("surface"), None);
    }
}

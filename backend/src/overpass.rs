//! Walkable ways from the Overpass API.

use std::{fs, future::Future, path::Path, time::Duration};

use serde::Deserialize;

use crate::models::{Coordinate, MapSegment, SegmentId, Tags};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Overpass request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Overpass API error: {status}")]
    Status { status: reqwest::StatusCode },
    #[error("invalid segment data: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("failed to read segment file: {0}")]
    Io(#[from] std::io::Error),
}

/// Supplier of raw map segments around a point.
pub trait SegmentSource {
    fn fetch_segments(
        &self,
        lat: f64,
        lng: f64,
        radius_m: u32,
    ) -> impl Future<Output = Result<Vec<MapSegment>, FetchError>> + Send;
}

#[derive(Debug, Clone)]
pub struct OverpassClient {
    http: reqwest::Client,
    url: String,
}

impl OverpassClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("walk_routes/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

impl SegmentSource for OverpassClient {
    async fn fetch_segments(&self, lat: f64, lng: f64, radius_m: u32) -> Result<Vec<MapSegment>, FetchError> {
        let query = build_query(lat, lng, radius_m);
        tracing::debug!("querying Overpass at {} for ({lat}, {lng}) r={radius_m}m", self.url);

        let response = self
            .http
            .post(&self.url)
            .form(&[("data", query.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("Overpass API returned {status}");
            return Err(FetchError::Status { status });
        }

        let body = response.text().await?;
        let segments = parse_response(&body)?;
        tracing::info!("Overpass returned {} ways around ({lat}, {lng})", segments.len());
        Ok(segments)
    }
}

/// Overpass QL selecting walkable ways within `radius_m` of a point.
pub fn build_query(lat: f64, lng: f64, radius_m: u32) -> String {
    const SELECTORS: [&str; 8] = [
        r#"["highway"="footway"]"#,
        r#"["highway"="path"]"#,
        r#"["highway"="pedestrian"]"#,
        r#"["leisure"="park"]"#,
        r#"["leisure"="garden"]"#,
        r#"["waterway"="riverbank"]"#,
        r#"["highway"="track"]["tracktype"="grade1"]"#,
        r#"["highway"="living_street"]"#,
    ];

    let mut query = String::from("[out:json][timeout:25];\n(\n");
    for selector in SELECTORS {
        query.push_str(&format!("  way{selector}(around:{radius_m},{lat},{lng});\n"));
    }
    query.push_str(");\nout body geom;\n");
    query
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    #[serde(rename = "type")]
    kind: String,
    id: SegmentId,
    #[serde(default)]
    tags: Tags,
    geometry: Option<Vec<Option<Coordinate>>>,
}

/// Keep only `way` elements that carry geometry.
pub fn parse_response(body: &str) -> Result<Vec<MapSegment>, FetchError> {
    let response: OverpassResponse = serde_json::from_str(body)?;
    Ok(response
        .elements
        .into_iter()
        .filter(|el| el.kind == "way")
        .filter_map(|el| {
            let points: Vec<Coordinate> = el.geometry?.into_iter().flatten().collect();
            Some(MapSegment {
                id: el.id,
                points,
                tags: el.tags,
            })
        })
        .collect())
}

/// Read segments from disk: either a JSON array of segments or a raw
/// Overpass response.
pub fn load_segments(path: impl AsRef<Path>) -> Result<Vec<MapSegment>, FetchError> {
    let content = fs::read_to_string(path)?;
    parse_segments(&content)
}

pub fn parse_segments(content: &str) -> Result<Vec<MapSegment>, FetchError> {
    if content.trim_start().starts_with('[') {
        Ok(serde_json::from_str(content)?)
    } else {
        parse_response(content)
    }
}

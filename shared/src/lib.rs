use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Routes shorter than this are rated easy.
pub const EASY_MAX_DISTANCE_M: f64 = 2_000.0;
/// Routes shorter than this (and not easy) are rated moderate.
pub const MODERATE_MAX_DISTANCE_M: f64 = 4_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerrainType {
    Urban,
    Nature,
    Mixed,
}

impl TerrainType {
    pub fn as_str(self) -> &'static str {
        match self {
            TerrainType::Urban => "urban",
            TerrainType::Nature => "nature",
            TerrainType::Mixed => "mixed",
        }
    }
}

impl fmt::Display for TerrainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TerrainType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "urban" => Ok(TerrainType::Urban),
            "nature" => Ok(TerrainType::Nature),
            "mixed" => Ok(TerrainType::Mixed),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Moderate,
    Difficult,
}

impl Difficulty {
    /// Rate a route purely by its length.
    pub fn from_distance_m(distance_m: f64) -> Self {
        if distance_m < EASY_MAX_DISTANCE_M {
            Difficulty::Easy
        } else if distance_m < MODERATE_MAX_DISTANCE_M {
            Difficulty::Moderate
        } else {
            Difficulty::Difficult
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Moderate => "moderate",
            Difficulty::Difficult => "difficult",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "moderate" => Ok(Difficulty::Moderate),
            "difficult" => Ok(Difficulty::Difficult),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown variant `{}`", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

/// A synthesized loop walk, ready to be cached and served.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedRoute {
    pub name: String,
    pub description: String,
    pub duration_minutes: u32,
    pub distance_meters: u32,
    pub difficulty: Difficulty,
    pub terrain_type: TerrainType,
    pub path: Vec<Coordinate>,
    pub center_lat: f64,
    pub center_lng: f64,
}

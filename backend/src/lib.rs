pub mod area;
pub mod chain;
pub mod classify;
pub mod config;
pub mod database;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod gpx_export;
pub mod loops;
pub mod models;
pub mod overpass;
pub mod segment_index;
pub mod store;

pub use crate::area::area_hash;
pub use crate::config::{ServiceConfig, SynthesisConfig};
pub use crate::engine::{RouteSynthesizer, synthesize_routes};
pub use crate::models::{Coordinate, Difficulty, GeneratedRoute, MapSegment, TerrainType};

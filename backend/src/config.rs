//! Synthesis parameters and service configuration from environment.

use std::{env, fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

/// Route lengths generated for every area, in minutes.
pub const DEFAULT_TARGET_DURATIONS_MIN: [u32; 5] = [15, 30, 45, 60, 75];
/// Average dog-walking pace.
pub const WALK_SPEED_KMH: f64 = 4.5;
/// Segments whose nearest endpoint is this far or farther are not chained.
pub const CONNECTION_RADIUS_M: f64 = 200.0;
/// A chain ending closer than this to its start already counts as a loop.
pub const LOOP_CLOSURE_TOLERANCE_M: f64 = 100.0;
/// Reported distance is capped at this multiple of the target distance.
pub const MAX_OVERSHOOT_RATIO: f64 = 1.3;
/// Candidates shorter than this fraction of the target duration are dropped.
pub const MIN_DURATION_RATIO: f64 = 0.5;

pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";
pub const DEFAULT_SEARCH_RADIUS_M: u32 = 3_000;
pub const DEFAULT_RETENTION_DAYS: u32 = 30;
pub const DEFAULT_CACHE_CAPACITY: usize = 64;
const DEFAULT_OVERPASS_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("at least one target duration is required")]
    NoTargetDurations,
    #[error("target durations must be strictly positive")]
    ZeroDuration,
    #[error("{0} must be finite and strictly positive")]
    NonPositive(&'static str),
    #[error("invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    pub target_durations_min: Vec<u32>,
    pub walk_speed_kmh: f64,
    pub connection_radius_m: f64,
    pub loop_closure_tolerance_m: f64,
    pub max_overshoot_ratio: f64,
    pub min_duration_ratio: f64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            target_durations_min: DEFAULT_TARGET_DURATIONS_MIN.to_vec(),
            walk_speed_kmh: WALK_SPEED_KMH,
            connection_radius_m: CONNECTION_RADIUS_M,
            loop_closure_tolerance_m: LOOP_CLOSURE_TOLERANCE_M,
            max_overshoot_ratio: MAX_OVERSHOOT_RATIO,
            min_duration_ratio: MIN_DURATION_RATIO,
        }
    }
}

impl SynthesisConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_durations_min.is_empty() {
            return Err(ConfigError::NoTargetDurations);
        }
        if self.target_durations_min.contains(&0) {
            return Err(ConfigError::ZeroDuration);
        }
        let positive = [
            ("walk_speed_kmh", self.walk_speed_kmh),
            ("connection_radius_m", self.connection_radius_m),
            ("loop_closure_tolerance_m", self.loop_closure_tolerance_m),
            ("max_overshoot_ratio", self.max_overshoot_ratio),
            ("min_duration_ratio", self.min_duration_ratio),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NonPositive(name));
            }
        }
        Ok(())
    }

    pub fn walk_speed_mps(&self) -> f64 {
        self.walk_speed_kmh / 3.6
    }

    /// One-way distance walked in `minutes` at the configured pace.
    pub fn target_distance_m(&self, minutes: u32) -> f64 {
        (minutes as f64 / 60.0) * self.walk_speed_kmh * 1000.0
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub overpass_url: String,
    pub overpass_timeout: Duration,
    pub search_radius_m: u32,
    pub database_url: Option<String>,
    pub retention_days: u32,
    pub cache_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            overpass_url: DEFAULT_OVERPASS_URL.to_string(),
            overpass_timeout: Duration::from_secs(DEFAULT_OVERPASS_TIMEOUT_SECS),
            search_radius_m: DEFAULT_SEARCH_RADIUS_M,
            database_url: None,
            retention_days: DEFAULT_RETENTION_DAYS,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let timeout_secs = parse_var(&lookup, "OVERPASS_TIMEOUT_SECS", DEFAULT_OVERPASS_TIMEOUT_SECS)?;
        Ok(Self {
            overpass_url: lookup("OVERPASS_URL").unwrap_or(defaults.overpass_url),
            overpass_timeout: Duration::from_secs(timeout_secs),
            search_radius_m: parse_var(&lookup, "SEARCH_RADIUS_M", defaults.search_radius_m)?,
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            retention_days: parse_var(&lookup, "ROUTE_RETENTION_DAYS", defaults.retention_days)?,
            cache_capacity: parse_var(&lookup, "ROUTE_CACHE_CAPACITY", defaults.cache_capacity)?,
        })
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidEnv { name, value }),
    }
}

use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use walk_routes::{
    area_hash,
    config::{ServiceConfig, SynthesisConfig},
    database::Database,
    discovery::{DiscoveredRoute, Discovery, DiscoveryQuery, RouteFilter},
    engine::RouteSynthesizer,
    error::RouteError,
    gpx_export::{encode_route_as_gpx, write_gpx},
    models::{GeneratedRoute, TerrainType},
    overpass::{OverpassClient, load_segments},
    store::{MemoryRouteStore, RouteId, RouteStore},
};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Synthesize loop walks from OpenStreetMap paths"
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate routes from segment files (JSON segments or raw Overpass output)
    Synthesize {
        #[arg(long = "input", required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,
        /// JSON file overriding synthesis parameters
        #[arg(long)]
        config: Option<PathBuf>,
        /// Also write one GPX file per route into this directory
        #[arg(long)]
        gpx_dir: Option<PathBuf>,
    },
    /// Find routes around a point, fetching map data on a cache miss
    Discover {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        /// Search radius in meters (defaults to SEARCH_RADIUS_M)
        #[arg(long)]
        radius: Option<u32>,
        #[arg(long)]
        min_duration: Option<u32>,
        #[arg(long)]
        max_duration: Option<u32>,
        /// urban, nature or mixed
        #[arg(long)]
        terrain: Option<TerrainType>,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Embed each route as a base64 GPX document
        #[arg(long)]
        gpx: bool,
    },
    /// Mark a stored route as walked so purges keep it
    RecordActivity {
        #[arg(long)]
        id: RouteId,
    },
    /// Delete stale generated routes that nobody walked
    Purge {
        #[arg(long)]
        retention_days: Option<u32>,
    },
    /// Print the cache key of the area containing a point
    AreaHash {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
    },
}

#[derive(Serialize)]
struct SynthesisOutput<'a> {
    input: &'a Path,
    routes: &'a [GeneratedRoute],
}

#[derive(Serialize)]
struct DiscoveryOutput {
    #[serde(flatten)]
    route: DiscoveredRoute,
    #[serde(skip_serializing_if = "Option::is_none")]
    gpx_base64: Option<String>,
}

fn discovery_output(routes: Vec<DiscoveredRoute>, gpx: bool) -> Result<Vec<DiscoveryOutput>, RouteError> {
    routes
        .into_iter()
        .map(|route| {
            let gpx_base64 = if gpx {
                Some(encode_route_as_gpx(&route.route)?)
            } else {
                None
            };
            Ok(DiscoveryOutput { route, gpx_base64 })
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "walk_routes=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    match args.command {
        Command::Synthesize {
            inputs,
            config,
            gpx_dir,
        } => synthesize(&inputs, config.as_deref(), gpx_dir.as_deref()),
        Command::Discover {
            lat,
            lng,
            radius,
            min_duration,
            max_duration,
            terrain,
            config,
            gpx,
        } => {
            let service = ServiceConfig::from_env()?;
            let query = DiscoveryQuery {
                lat,
                lng,
                radius_m: radius.unwrap_or(service.search_radius_m),
                filter: RouteFilter {
                    min_duration,
                    max_duration,
                    terrain,
                },
            };
            let synthesizer = RouteSynthesizer::new(load_config(config.as_deref())?)?;
            match &service.database_url {
                Some(url) => {
                    let db = Database::connect(url).await?;
                    db.migrate().await?;
                    discover(&service, db, synthesizer, &query, gpx).await
                }
                None => {
                    tracing::info!("DATABASE_URL not set, caching routes in memory");
                    let store = MemoryRouteStore::new(service.cache_capacity);
                    discover(&service, store, synthesizer, &query, gpx).await
                }
            }
        }
        Command::RecordActivity { id } => {
            let db = open_database(&ServiceConfig::from_env()?, "record-activity").await?;
            db.record_activity(id).await?;
            tracing::info!("recorded activity on route {id}");
            Ok(())
        }
        Command::Purge { retention_days } => {
            let service = ServiceConfig::from_env()?;
            let days = retention_days.unwrap_or(service.retention_days);
            let db = open_database(&service, "purge").await?;

            let report = db.purge_stale(Utc::now() - Duration::days(i64::from(days))).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::AreaHash { lat, lng } => {
            println!("{}", area_hash(lat, lng));
            Ok(())
        }
    }
}

/// Activity and purges only make sense against the shared database.
async fn open_database(service: &ServiceConfig, command: &str) -> Result<Database, Box<dyn std::error::Error>> {
    let Some(url) = &service.database_url else {
        return Err(format!("{command} needs DATABASE_URL").into());
    };
    let db = Database::connect(url).await?;
    db.migrate().await?;
    Ok(db)
}

fn load_config(path: Option<&Path>) -> Result<SynthesisConfig, Box<dyn std::error::Error>> {
    Ok(match path {
        Some(path) => {
            tracing::info!("loading synthesis config from {:?}", path);
            SynthesisConfig::from_file(path)?
        }
        None => SynthesisConfig::default(),
    })
}

fn synthesize(
    inputs: &[PathBuf],
    config: Option<&Path>,
    gpx_dir: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let synthesizer = RouteSynthesizer::new(load_config(config)?)?;

    let areas = inputs
        .iter()
        .map(|path| {
            tracing::info!("reading segments from {:?}", path);
            load_segments(path)
        })
        .collect::<Result<Vec<_>, _>>()?;
    let results = synthesizer.synthesize_many(&areas);

    if let Some(dir) = gpx_dir {
        std::fs::create_dir_all(dir)?;
        for (input, routes) in inputs.iter().zip(&results) {
            let stem = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "routes".to_string());
            for (idx, route) in routes.iter().enumerate() {
                let path = dir.join(format!("{stem}-{}min-{idx}.gpx", route.duration_minutes));
                std::fs::write(&path, write_gpx(route)?)?;
                tracing::info!("wrote {:?}", path);
            }
        }
    }

    let output: Vec<SynthesisOutput<'_>> = inputs
        .iter()
        .zip(&results)
        .map(|(input, routes)| SynthesisOutput {
            input: input.as_path(),
            routes,
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn discover<R: RouteStore>(
    service: &ServiceConfig,
    store: R,
    synthesizer: RouteSynthesizer,
    query: &DiscoveryQuery,
    gpx: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = OverpassClient::new(service.overpass_url.clone(), service.overpass_timeout)?;
    let discovery = Discovery::new(source, store, synthesizer);

    let routes = discovery.discover(query).await?;
    tracing::info!("found {} routes around ({}, {})", routes.len(), query.lat, query.lng);
    println!("{}", serde_json::to_string_pretty(&discovery_output(routes, gpx)?)?);
    Ok(())
}

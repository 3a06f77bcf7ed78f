// Module database - PostgreSQL-backed route store

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, postgres::PgPoolOptions};

use crate::{
    geometry::{from_geojson_line_string, to_geojson_line_string},
    models::GeneratedRoute,
    store::{PurgeReport, RouteId, RouteStore, StoreError, StoredRoute},
};

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Invalid route data: {0}")]
    InvalidData(String),
}

/// Row of `generated_routes`
#[derive(Debug, Clone, FromRow)]
struct GeneratedRouteRow {
    id: i64,
    area_hash: String,
    name: String,
    description: String,
    duration_minutes: i32,
    distance_meters: i32,
    difficulty: String,
    terrain_type: String,
    geojson_path: sqlx::types::JsonValue,
    center_lat: f64,
    center_lng: f64,
    generated_at: DateTime<Utc>,
    last_activity_at: Option<DateTime<Utc>>,
}

impl TryFrom<GeneratedRouteRow> for StoredRoute {
    type Error = DatabaseError;

    fn try_from(row: GeneratedRouteRow) -> Result<Self, Self::Error> {
        let invalid = |field: &str, detail: String| {
            DatabaseError::InvalidData(format!("route {} {field}: {detail}", row.id))
        };

        let route = GeneratedRoute {
            duration_minutes: u32::try_from(row.duration_minutes)
                .map_err(|e| invalid("duration_minutes", e.to_string()))?,
            distance_meters: u32::try_from(row.distance_meters)
                .map_err(|e| invalid("distance_meters", e.to_string()))?,
            difficulty: row
                .difficulty
                .parse()
                .map_err(|e: shared::UnknownVariant| invalid("difficulty", e.to_string()))?,
            terrain_type: row
                .terrain_type
                .parse()
                .map_err(|e: shared::UnknownVariant| invalid("terrain_type", e.to_string()))?,
            path: from_geojson_line_string(&row.geojson_path)
                .map_err(|e| invalid("geojson_path", e.to_string()))?,
            name: row.name,
            description: row.description,
            center_lat: row.center_lat,
            center_lng: row.center_lng,
        };

        Ok(StoredRoute {
            id: row.id,
            area_hash: row.area_hash,
            generated_at: row.generated_at,
            last_activity_at: row.last_activity_at,
            route,
        })
    }
}

fn to_i32(value: u32, field: &str) -> Result<i32, DatabaseError> {
    i32::try_from(value).map_err(|_| DatabaseError::InvalidData(format!("{field} out of range: {value}")))
}

/// Database connection pool
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create new database connection pool
    ///
    /// # Errors
    /// Returns DatabaseError if the connection fails
    pub async fn connect(database_url: &str) -> Result<Self, DatabaseError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        tracing::info!("PostgreSQL connection pool created");

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        // query() runs a single statement; the migration file holds several
        let mut conn = self.pool.acquire().await?;

        let migration_sql = include_str!("../migrations/20260301_create_generated_routes.sql");
        sqlx::raw_sql(migration_sql).execute(&mut *conn).await?;

        tracing::info!("Database migrations completed");
        Ok(())
    }

    async fn insert_batch(
        &self,
        area_hash: &str,
        routes: Vec<GeneratedRoute>,
    ) -> Result<Vec<StoredRoute>, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let mut stored = Vec::with_capacity(routes.len());

        for route in routes {
            let row = sqlx::query_as::<_, GeneratedRouteRow>(
                r#"
                INSERT INTO generated_routes (
                    area_hash, name, description, duration_minutes, distance_meters,
                    difficulty, terrain_type, geojson_path, center_lat, center_lng
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                RETURNING *
                "#,
            )
            .bind(area_hash)
            .bind(&route.name)
            .bind(&route.description)
            .bind(to_i32(route.duration_minutes, "duration_minutes")?)
            .bind(to_i32(route.distance_meters, "distance_meters")?)
            .bind(route.difficulty.as_str())
            .bind(route.terrain_type.as_str())
            .bind(to_geojson_line_string(&route.path))
            .bind(route.center_lat)
            .bind(route.center_lng)
            .fetch_one(&mut *tx)
            .await?;

            stored.push(StoredRoute::try_from(row)?);
        }

        tx.commit().await?;
        tracing::info!("Stored {} routes for area {}", stored.len(), area_hash);
        Ok(stored)
    }

    async fn purge(&self, older_than: DateTime<Utc>) -> Result<PurgeReport, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let kept: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM generated_routes WHERE generated_at < $1 AND last_activity_at IS NOT NULL",
        )
        .bind(older_than)
        .fetch_one(&mut *tx)
        .await?;

        let deleted = sqlx::query(
            "DELETE FROM generated_routes WHERE generated_at < $1 AND last_activity_at IS NULL",
        )
        .bind(older_than)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        let report = PurgeReport {
            deleted,
            kept: u64::try_from(kept).unwrap_or_default(),
        };
        tracing::info!("Purged {} stale routes, kept {} active", report.deleted, report.kept);
        Ok(report)
    }
}

impl RouteStore for Database {
    async fn find_by_area(&self, area_hash: &str) -> Result<Vec<StoredRoute>, StoreError> {
        let rows = sqlx::query_as::<_, GeneratedRouteRow>(
            "SELECT * FROM generated_routes WHERE area_hash = $1 ORDER BY id",
        )
        .bind(area_hash)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        let routes = rows
            .into_iter()
            .map(StoredRoute::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!("Retrieved {} routes for area {}", routes.len(), area_hash);
        Ok(routes)
    }

    async fn store_generated(
        &self,
        area_hash: &str,
        routes: Vec<GeneratedRoute>,
    ) -> Result<Vec<StoredRoute>, StoreError> {
        Ok(self.insert_batch(area_hash, routes).await?)
    }

    async fn record_activity(&self, id: RouteId) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE generated_routes SET last_activity_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn purge_stale(&self, older_than: DateTime<Utc>) -> Result<PurgeReport, StoreError> {
        Ok(self.purge(older_than).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coordinate, Difficulty, TerrainType};

    /// Helper to create test database with testcontainers
    /// Returns (Database, Container) - keep container alive to prevent Docker cleanup
    async fn setup_test_db() -> (Database, testcontainers::ContainerAsync<testcontainers_modules::postgres::Postgres>) {
        use testcontainers::{ImageExt, runners::AsyncRunner};
        use testcontainers_modules::postgres::Postgres;

        let container = Postgres::default()
            .with_tag("17-alpine")
            .start()
            .await
            .expect("Failed to start PostgreSQL container");

        let host = container.get_host().await.expect("Failed to get host");
        let port = container
            .get_host_port_ipv4(5432)
            .await
            .expect("Failed to get port");
        let database_url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

        let db = Database::connect(&database_url)
            .await
            .expect("Failed to connect to test DB");
        db.migrate().await.expect("Failed to run migrations");

        (db, container)
    }

    fn sample_route(name: &str) -> GeneratedRoute {
        GeneratedRoute {
            name: name.to_string(),
            description: "Nature walk of 30 min (2.0 km).".to_string(),
            duration_minutes: 27,
            distance_meters: 2_000,
            difficulty: Difficulty::Moderate,
            terrain_type: TerrainType::Nature,
            path: vec![
                Coordinate { lat: 45.0, lon: 5.0 },
                Coordinate { lat: 45.009, lon: 5.0 },
                Coordinate { lat: 45.0, lon: 5.0 },
            ],
            center_lat: 45.003,
            center_lng: 5.0,
        }
    }

    #[test]
    fn test_row_with_unknown_difficulty_is_rejected() {
        let row = GeneratedRouteRow {
            id: 3,
            area_hash: "45.00,5.00".to_string(),
            name: "x".to_string(),
            description: "y".to_string(),
            duration_minutes: 20,
            distance_meters: 1_500,
            difficulty: "extreme".to_string(),
            terrain_type: "urban".to_string(),
            geojson_path: to_geojson_line_string(&sample_route("x").path),
            center_lat: 45.0,
            center_lng: 5.0,
            generated_at: Utc::now(),
            last_activity_at: None,
        };
        let result = StoredRoute::try_from(row.clone());
        assert!(matches!(result, Err(DatabaseError::InvalidData(msg)) if msg.contains("difficulty")));

        let valid = GeneratedRouteRow {
            difficulty: "easy".to_string(),
            ..row
        };
        let stored = StoredRoute::try_from(valid).unwrap();
        assert_eq!(stored.route.difficulty, Difficulty::Easy);
        assert_eq!(stored.route.path.len(), 3);
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_store_and_find_by_area() {
        let (db, _container) = setup_test_db().await;

        let stored = db
            .store_generated("45.00,5.00", vec![sample_route("Walk A"), sample_route("Walk B")])
            .await
            .expect("Failed to store routes");
        assert_eq!(stored.len(), 2);
        assert!(stored[0].id < stored[1].id);

        let found = db.find_by_area("45.00,5.00").await.expect("Failed to find routes");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].route, sample_route("Walk A"));
        assert_eq!(found[1].route.name, "Walk B");

        let other = db.find_by_area("46.00,5.00").await.expect("Failed to query");
        assert!(other.is_empty());
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_record_activity() {
        let (db, _container) = setup_test_db().await;
        let stored = db
            .store_generated("45.00,5.00", vec![sample_route("Walk")])
            .await
            .expect("Failed to store route");

        db.record_activity(stored[0].id).await.expect("Failed to record activity");
        let found = db.find_by_area("45.00,5.00").await.expect("Failed to find routes");
        assert!(found[0].last_activity_at.is_some());

        let missing = db.record_activity(9999).await;
        assert!(matches!(missing, Err(StoreError::NotFound(9999))));
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_purge_stale() {
        let (db, _container) = setup_test_db().await;
        let stored = db
            .store_generated("45.00,5.00", vec![sample_route("Unused"), sample_route("Walked")])
            .await
            .expect("Failed to store routes");
        db.record_activity(stored[1].id).await.expect("Failed to record activity");

        // Everything generated before "tomorrow" counts as stale
        let cutoff = Utc::now() + chrono::Duration::days(1);
        let report = db.purge_stale(cutoff).await.expect("Failed to purge");
        assert_eq!(report, PurgeReport { deleted: 1, kept: 1 });

        let remaining = db.find_by_area("45.00,5.00").await.expect("Failed to find routes");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].route.name, "Walked");
    }
}

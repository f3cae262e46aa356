use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use pagesift_core::error::AppError;
use pagesift_core::quota::store::{QuotaStore, WindowCount};

/// Connection settings for the quota counter database. Only consulted when
/// the server runs with `QUOTA_BACKEND=postgres`.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// Read `DATABASE_URL` (required) and `DATABASE_MAX_CONNECTIONS`
    /// (default 5) from the environment.
    pub fn from_env() -> Result<Self, AppError> {
        let url = std::env::var("DATABASE_URL").map_err(|_| {
            AppError::ConfigError(
                "DATABASE_URL is required when QUOTA_BACKEND=postgres".into(),
            )
        })?;

        let max_connections = match std::env::var("DATABASE_MAX_CONNECTIONS") {
            Err(_) => 5,
            Ok(raw) => match raw.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(AppError::ConfigError(format!(
                        "DATABASE_MAX_CONNECTIONS must be a positive integer, got '{raw}'"
                    )))
                }
            },
        };

        Ok(Self {
            url,
            max_connections,
        })
    }
}

/// Quota counters in PostgreSQL, shared across server instances.
///
/// Each increment is a single upsert, so two instances hitting the same
/// key concurrently serialize on the row and never hand out the same
/// count. Expired windows reset in place inside the same statement.
#[derive(Debug, Clone)]
pub struct PostgresQuotaStore {
    pool: PgPool,
}

impl PostgresQuotaStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .map_err(|e| AppError::StoreError(format!("Failed to connect: {e}")))?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool (useful for testing).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run all pending migrations.
    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::StoreError(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// Check database connectivity.
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::StoreError(e.to_string()))?;
        Ok(())
    }

    /// Drop windows whose start is older than any configured window could
    /// reach. Counters reset in place on the next hit either way; this just
    /// keeps the table small.
    pub async fn purge_expired(&self) -> Result<u64, AppError> {
        let result = sqlx::query(
            "DELETE FROM quota_windows WHERE window_start < NOW() - INTERVAL '2 hours'",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::StoreError(e.to_string()))?;
        tracing::debug!(purged = result.rows_affected(), "expired quota windows removed");
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl QuotaStore for PostgresQuotaStore {
    async fn increment(&self, key: &str, ttl: Duration) -> Result<WindowCount, AppError> {
        let ttl_secs = ttl.as_secs_f64();
        let row: (i64, i64) = sqlx::query_as(
            r#"
            INSERT INTO quota_windows (key, count, window_start)
            VALUES ($1, 1, NOW())
            ON CONFLICT (key) DO UPDATE
            SET count = CASE
                    WHEN quota_windows.window_start + make_interval(secs => $2) <= NOW()
                    THEN 1
                    ELSE quota_windows.count + 1
                END,
                window_start = CASE
                    WHEN quota_windows.window_start + make_interval(secs => $2) <= NOW()
                    THEN NOW()
                    ELSE quota_windows.window_start
                END
            RETURNING count,
                GREATEST(1, CEIL(EXTRACT(EPOCH FROM
                    (window_start + make_interval(secs => $2) - NOW()))))::BIGINT
            "#,
        )
        .bind(key)
        .bind(ttl_secs)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::StoreError(e.to_string()))?;

        Ok(WindowCount {
            count: row.0.max(0) as u64,
            reset_after: row.1.max(0) as u64,
        })
    }
}

use crate::log_info;
use crate::shared::errors::AppError;
use crate::shared::utils::logger::LogContext;
use diesel::pg::PgConnection;
use diesel::r2d2::{self, ConnectionManager, Pool};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::time::Duration;

pub type DbPool = Pool<ConnectionManager<PgConnection>>;
pub type DbConnection = r2d2::PooledConnection<ConnectionManager<PgConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
    url: String,
}

impl Database {
    /// Shared pool for the coordinating process (migrations, scans, counts).
    pub fn new(database_url: &str) -> Result<Self, AppError> {
        let url = Self::validate_database_url(database_url)?;
        let max_size = Self::get_optimal_pool_size();
        let pool = Self::build_pool(&url, max_size)?;

        log_info!(
            "Database connection pool initialized with max_size: {}",
            pool.max_size()
        );

        Ok(Self { pool, url })
    }

    /// Single-connection pool owned by one worker. Workers never share a
    /// connection; each builds its own after it starts.
    pub fn for_worker(database_url: &str) -> Result<Self, AppError> {
        let url = Self::validate_database_url(database_url)?;
        let pool = Self::build_pool(&url, 1)?;
        Ok(Self { pool, url })
    }

    /// Create a Database instance from an existing pool (useful for testing)
    pub fn from_pool(pool: DbPool, url: impl Into<String>) -> Self {
        Self {
            pool,
            url: url.into(),
        }
    }

    fn build_pool(url: &str, max_size: u32) -> Result<DbPool, AppError> {
        let manager = ConnectionManager::<PgConnection>::new(url);

        r2d2::Pool::builder()
            .max_size(max_size)
            .min_idle(Some(max_size.min(1)))
            .connection_timeout(Duration::from_secs(30))
            .test_on_check_out(true)
            .build(manager)
            .map_err(|e| AppError::DatabaseError(format!("Failed to create connection pool: {}", e)))
    }

    /// Validate a database URL with basic sanity checks
    pub fn validate_database_url(database_url: &str) -> Result<String, AppError> {
        if !database_url.starts_with("postgres://") && !database_url.starts_with("postgresql://") {
            return Err(AppError::ValidationError(
                "Invalid database URL format. Must start with postgres:// or postgresql://"
                    .to_string(),
            ));
        }

        if database_url.len() < 20 {
            return Err(AppError::ValidationError(
                "Database URL appears to be malformed".to_string(),
            ));
        }

        Ok(database_url.to_string())
    }

    fn get_optimal_pool_size() -> u32 {
        let cpu_count = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);

        std::cmp::min(cpu_count, 8) as u32
    }

    pub fn get_connection(&self) -> Result<DbConnection, AppError> {
        let start = std::time::Instant::now();

        match self.pool.get() {
            Ok(conn) => {
                let duration = start.elapsed().as_millis() as u64;
                if duration > 100 {
                    LogContext::performance_metric("db_connection_acquire", duration, Some("slow"));
                }
                Ok(conn)
            }
            Err(e) => {
                LogContext::error_with_context(
                    &e,
                    "Failed to acquire database connection from pool",
                );
                Err(AppError::from(e))
            }
        }
    }

    /// Drop every pooled connection and open fresh ones. Used by workers
    /// after a failed statement leaves their session unusable.
    pub fn reset(&mut self) -> Result<(), AppError> {
        let max_size = self.pool.max_size();
        self.pool = Self::build_pool(&self.url, max_size)?;
        log_info!("Database connection reset");
        Ok(())
    }

    /// Apply pending embedded migrations (extensions, tables, indexes).
    pub fn run_migrations(&self) -> Result<(), AppError> {
        let mut conn = self.get_connection()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| AppError::DatabaseError(format!("Migration failed: {}", e)))?;

        for version in applied {
            log_info!("Applied migration {}", version);
        }
        Ok(())
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get the underlying connection pool (useful for testing and repository initialization)
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

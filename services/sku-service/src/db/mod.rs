//! Storage layer for the SKU service.
//!
//! This module provides:
//! - Connection pool management
//! - Sequence counters (atomic reserve, peek, reset, list)
//! - Equipment instance records and SKU uniqueness lookups
//! - The process-wide auto-generation setting
//!
//! Each concern is a trait with a Postgres implementation (SQLx) and an
//! in-memory implementation used by tests and single-process development.

mod equipment;
mod error;
mod memory;
mod sequences;
mod settings;

pub use equipment::{EquipmentInstance, EquipmentStore, PgEquipmentStore};
pub use error::DbError;
pub use memory::MemoryStore;
pub use sequences::{PgSequenceStore, SequenceCounter, SequenceStore};
pub use settings::{PgSettingsStore, SettingsStore};

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database connection URL.
    pub database_url: String,

    /// Maximum number of connections in the pool.
    pub max_connections: u32,

    /// Minimum number of idle connections.
    pub min_connections: u32,

    /// Connection acquire timeout.
    pub acquire_timeout: Duration,

    /// Idle connection timeout.
    pub idle_timeout: Duration,

    /// Maximum lifetime of a connection.
    pub max_lifetime: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/epg".to_string(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
        }
    }
}

impl DbConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/epg".to_string());

        let max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        let min_connections = std::env::var("DB_MIN_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1);

        Self {
            database_url,
            max_connections,
            min_connections,
            ..Default::default()
        }
    }
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Connecting to database"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .max_lifetime(Some(config.max_lifetime))
            .connect(&config.database_url)
            .await
            .map_err(DbError::Connect)?;

        info!("Database connection pool established");

        Ok(Self { pool })
    }

    /// Check if the database is reachable.
    pub async fn health_check(&self) -> Result<(), DbError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(DbError::Query)?;
        Ok(())
    }

    /// Run pending migrations.
    ///
    /// Migrations are loaded at runtime from the first directory that exists.
    pub async fn run_migrations(&self) -> Result<(), DbError> {
        info!("Running database migrations");

        let candidates = vec![
            std::path::PathBuf::from("./migrations"),
            std::path::PathBuf::from("services/sku-service/migrations"),
            std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations"),
        ];
        let mut last_error: Option<sqlx::migrate::MigrateError> = None;

        for dir in &candidates {
            match sqlx::migrate::Migrator::new(dir.clone()).await {
                Ok(migrator) => {
                    info!(migrations_dir = %dir.display(), "Loaded migrations");
                    migrator.run(&self.pool).await.map_err(DbError::Migration)?;
                    info!("Database migrations complete");
                    return Ok(());
                }
                Err(e) => {
                    last_error = Some(e);
                }
            }
        }

        let tried = candidates
            .iter()
            .map(|dir| dir.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");

        Err(DbError::MigrationDirNotFound {
            tried,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string()),
        })
    }

    /// Get a sequence store handle.
    pub fn sequence_store(&self) -> PgSequenceStore {
        PgSequenceStore::new(self.pool.clone())
    }

    /// Get an equipment store handle.
    pub fn equipment_store(&self) -> PgEquipmentStore {
        PgEquipmentStore::new(self.pool.clone())
    }

    /// Get a settings store handle.
    pub fn settings_store(&self) -> PgSettingsStore {
        PgSettingsStore::new(self.pool.clone())
    }
}

/// The set of stores the allocator and API operate on.
#[derive(Clone)]
pub struct Stores {
    pub sequences: Arc<dyn SequenceStore>,
    pub equipment: Arc<dyn EquipmentStore>,
    pub settings: Arc<dyn SettingsStore>,
}

impl Stores {
    /// Stores backed by Postgres.
    pub fn postgres(db: &Database) -> Self {
        Self {
            sequences: Arc::new(db.sequence_store()),
            equipment: Arc::new(db.equipment_store()),
            settings: Arc::new(db.settings_store()),
        }
    }

    /// Stores sharing one in-memory state.
    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            sequences: store.clone(),
            equipment: store.clone(),
            settings: store,
        }
    }
}

//! Process-wide allocation settings.

use async_trait::async_trait;
use sqlx::postgres::PgPool;

use super::DbError;

/// Storage for the auto-generation switch.
///
/// The flag lives in the database so every replica sees the same value.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn auto_generation_enabled(&self) -> Result<bool, DbError>;

    async fn set_auto_generation(&self, enabled: bool) -> Result<(), DbError>;
}

/// Postgres-backed settings store.
#[derive(Clone)]
pub struct PgSettingsStore {
    pool: PgPool,
}

impl PgSettingsStore {
    /// Create a new settings store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsStore for PgSettingsStore {
    async fn auto_generation_enabled(&self) -> Result<bool, DbError> {
        let enabled: Option<bool> =
            sqlx::query_scalar("SELECT auto_generation_enabled FROM sku_settings")
                .fetch_optional(&self.pool)
                .await
                .map_err(DbError::Query)?;

        // Missing row means the defaults were never customised.
        Ok(enabled.unwrap_or(true))
    }

    async fn set_auto_generation(&self, enabled: bool) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO sku_settings (singleton, auto_generation_enabled, updated_at)
            VALUES (TRUE, $1, now())
            ON CONFLICT (singleton)
            DO UPDATE SET auto_generation_enabled = EXCLUDED.auto_generation_enabled,
                          updated_at = now()
            "#,
        )
        .bind(enabled)
        .execute(&self.pool)
        .await
        .map_err(DbError::Query)?;

        Ok(())
    }
}

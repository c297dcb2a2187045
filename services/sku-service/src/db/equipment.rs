//! Equipment instance records.
//!
//! Only the fields needed to allocate and check SKUs are stored here; the
//! wider catalog lives with the content backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use epg_sku::{BrandPrefix, CategoryPrefix};
use serde::Serialize;
use sqlx::{postgres::PgPool, postgres::PgRow, Row};

use super::DbError;
use crate::ids::InstanceId;

/// A persisted equipment instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EquipmentInstance {
    pub instance_id: InstanceId,
    pub sku: String,
    pub category: String,
    pub brand: String,
    pub category_prefix: CategoryPrefix,
    pub brand_prefix: BrandPrefix,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Equipment instance storage.
#[async_trait]
pub trait EquipmentStore: Send + Sync {
    /// Returns true if any instance other than `exclude` holds `sku`.
    async fn sku_in_use(&self, sku: &str, exclude: Option<&InstanceId>) -> Result<bool, DbError>;

    /// Inserts a new instance. Fails with `UniqueViolation` on a duplicate SKU.
    async fn insert(&self, instance: &EquipmentInstance) -> Result<(), DbError>;

    async fn get(&self, instance_id: &InstanceId) -> Result<Option<EquipmentInstance>, DbError>;

    /// Replaces the SKU of an existing instance. Returns `None` if it does not exist.
    async fn update_sku(
        &self,
        instance_id: &InstanceId,
        sku: &str,
    ) -> Result<Option<EquipmentInstance>, DbError>;

    async fn count(&self) -> Result<u64, DbError>;
}

struct EquipmentRow {
    instance_id: String,
    sku: String,
    category: String,
    brand: String,
    category_prefix: String,
    brand_prefix: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for EquipmentRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            instance_id: row.try_get("instance_id")?,
            sku: row.try_get("sku")?,
            category: row.try_get("category")?,
            brand: row.try_get("brand")?,
            category_prefix: row.try_get("category_prefix")?,
            brand_prefix: row.try_get("brand_prefix")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl TryFrom<EquipmentRow> for EquipmentInstance {
    type Error = DbError;

    fn try_from(row: EquipmentRow) -> Result<Self, Self::Error> {
        let invalid = |message: String| DbError::InvalidRow {
            table: "equipment_instances",
            message,
        };

        Ok(Self {
            instance_id: InstanceId::parse(&row.instance_id).map_err(|e| invalid(e.to_string()))?,
            sku: row.sku,
            category: row.category,
            brand: row.brand,
            category_prefix: CategoryPrefix::parse(&row.category_prefix)
                .map_err(|e| invalid(e.to_string()))?,
            brand_prefix: BrandPrefix::parse(&row.brand_prefix)
                .map_err(|e| invalid(e.to_string()))?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Postgres-backed equipment store.
#[derive(Clone)]
pub struct PgEquipmentStore {
    pool: PgPool,
}

impl PgEquipmentStore {
    /// Create a new equipment store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EquipmentStore for PgEquipmentStore {
    async fn sku_in_use(&self, sku: &str, exclude: Option<&InstanceId>) -> Result<bool, DbError> {
        let in_use: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM equipment_instances
                WHERE sku = $1
                  AND ($2::TEXT IS NULL OR instance_id <> $2)
            )
            "#,
        )
        .bind(sku)
        .bind(exclude.map(|id| id.to_string()))
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::Query)?;

        Ok(in_use)
    }

    async fn insert(&self, instance: &EquipmentInstance) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO equipment_instances (
                instance_id,
                sku,
                category,
                brand,
                category_prefix,
                brand_prefix,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(instance.instance_id.to_string())
        .bind(&instance.sku)
        .bind(&instance.category)
        .bind(&instance.brand)
        .bind(instance.category_prefix.as_str())
        .bind(instance.brand_prefix.as_str())
        .bind(instance.created_at)
        .bind(instance.updated_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::from_write)?;

        Ok(())
    }

    async fn get(&self, instance_id: &InstanceId) -> Result<Option<EquipmentInstance>, DbError> {
        let row = sqlx::query_as::<_, EquipmentRow>(
            r#"
            SELECT instance_id, sku, category, brand, category_prefix, brand_prefix,
                   created_at, updated_at
            FROM equipment_instances
            WHERE instance_id = $1
            "#,
        )
        .bind(instance_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::Query)?;

        row.map(EquipmentInstance::try_from).transpose()
    }

    async fn update_sku(
        &self,
        instance_id: &InstanceId,
        sku: &str,
    ) -> Result<Option<EquipmentInstance>, DbError> {
        let row = sqlx::query_as::<_, EquipmentRow>(
            r#"
            UPDATE equipment_instances
            SET sku = $2, updated_at = now()
            WHERE instance_id = $1
            RETURNING instance_id, sku, category, brand, category_prefix, brand_prefix,
                      created_at, updated_at
            "#,
        )
        .bind(instance_id.to_string())
        .bind(sku)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from_write)?;

        row.map(EquipmentInstance::try_from).transpose()
    }

    async fn count(&self) -> Result<u64, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*)::BIGINT FROM equipment_instances")
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::Query)?;

        Ok(u64::try_from(count).unwrap_or(0))
    }
}

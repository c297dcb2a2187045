//! Per-(category, brand) sequence counters.
//!
//! The counter row is the only source of truth for "next number". Reserving
//! a number is a single upsert statement, so two concurrent requests (from
//! the same process or from different replicas) can never observe the same
//! value. Numbers reserved by aborted requests are skipped, never reclaimed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use epg_sku::{BrandPrefix, CategoryPrefix};
use serde::Serialize;
use sqlx::{postgres::PgPool, postgres::PgRow, Row};

use super::DbError;

/// Allocation state for one (category, brand) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequenceCounter {
    pub category_prefix: CategoryPrefix,
    pub brand_prefix: BrandPrefix,
    pub last_issued: u64,
    pub last_used: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Durable counter storage.
#[async_trait]
pub trait SequenceStore: Send + Sync {
    /// Atomically increments and returns the counter, creating it at 1.
    async fn next_sequence(
        &self,
        category: CategoryPrefix,
        brand: BrandPrefix,
    ) -> Result<u64, DbError>;

    /// Returns the last issued number without consuming one (0 if unused).
    async fn peek_sequence(
        &self,
        category: CategoryPrefix,
        brand: BrandPrefix,
    ) -> Result<u64, DbError>;

    /// Sets the counter back to zero. Returns false if the pair was never used.
    async fn reset_sequence(
        &self,
        category: CategoryPrefix,
        brand: BrandPrefix,
    ) -> Result<bool, DbError>;

    /// All counters ordered by category, then brand.
    async fn list_sequences(&self) -> Result<Vec<SequenceCounter>, DbError>;

    /// Records that a reserved number ended up on a persisted instance.
    async fn mark_used(&self, category: CategoryPrefix, brand: BrandPrefix)
        -> Result<(), DbError>;
}

struct SequenceRow {
    category_prefix: String,
    brand_prefix: String,
    last_issued: i64,
    last_used: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for SequenceRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            category_prefix: row.try_get("category_prefix")?,
            brand_prefix: row.try_get("brand_prefix")?,
            last_issued: row.try_get("last_issued")?,
            last_used: row.try_get("last_used")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl TryFrom<SequenceRow> for SequenceCounter {
    type Error = DbError;

    fn try_from(row: SequenceRow) -> Result<Self, Self::Error> {
        let invalid = |message: String| DbError::InvalidRow {
            table: "sku_sequences",
            message,
        };

        Ok(Self {
            category_prefix: CategoryPrefix::parse(&row.category_prefix)
                .map_err(|e| invalid(e.to_string()))?,
            brand_prefix: BrandPrefix::parse(&row.brand_prefix)
                .map_err(|e| invalid(e.to_string()))?,
            last_issued: to_sequence(row.last_issued)?,
            last_used: row.last_used,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn to_sequence(value: i64) -> Result<u64, DbError> {
    u64::try_from(value).map_err(|_| DbError::InvalidRow {
        table: "sku_sequences",
        message: format!("negative last_issued {value}"),
    })
}

/// Postgres-backed sequence store.
#[derive(Clone)]
pub struct PgSequenceStore {
    pool: PgPool,
}

impl PgSequenceStore {
    /// Create a new sequence store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SequenceStore for PgSequenceStore {
    async fn next_sequence(
        &self,
        category: CategoryPrefix,
        brand: BrandPrefix,
    ) -> Result<u64, DbError> {
        // ON CONFLICT DO UPDATE takes a row lock, so the increment and the
        // read of the new value happen as one step.
        let issued: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO sku_sequences (category_prefix, brand_prefix, last_issued)
            VALUES ($1, $2, 1)
            ON CONFLICT (category_prefix, brand_prefix)
            DO UPDATE SET
                last_issued = sku_sequences.last_issued + 1,
                updated_at = now()
            RETURNING last_issued
            "#,
        )
        .bind(category.as_str())
        .bind(brand.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::Query)?;

        to_sequence(issued)
    }

    async fn peek_sequence(
        &self,
        category: CategoryPrefix,
        brand: BrandPrefix,
    ) -> Result<u64, DbError> {
        let issued: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT last_issued
            FROM sku_sequences
            WHERE category_prefix = $1 AND brand_prefix = $2
            "#,
        )
        .bind(category.as_str())
        .bind(brand.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::Query)?;

        to_sequence(issued.unwrap_or(0))
    }

    async fn reset_sequence(
        &self,
        category: CategoryPrefix,
        brand: BrandPrefix,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE sku_sequences
            SET last_issued = 0, updated_at = now()
            WHERE category_prefix = $1 AND brand_prefix = $2
            "#,
        )
        .bind(category.as_str())
        .bind(brand.as_str())
        .execute(&self.pool)
        .await
        .map_err(DbError::Query)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_sequences(&self) -> Result<Vec<SequenceCounter>, DbError> {
        let rows = sqlx::query_as::<_, SequenceRow>(
            r#"
            SELECT category_prefix, brand_prefix, last_issued, last_used, created_at, updated_at
            FROM sku_sequences
            ORDER BY category_prefix, brand_prefix
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::Query)?;

        rows.into_iter().map(SequenceCounter::try_from).collect()
    }

    async fn mark_used(
        &self,
        category: CategoryPrefix,
        brand: BrandPrefix,
    ) -> Result<(), DbError> {
        sqlx::query(
            r#"
            UPDATE sku_sequences
            SET last_used = now()
            WHERE category_prefix = $1 AND brand_prefix = $2
            "#,
        )
        .bind(category.as_str())
        .bind(brand.as_str())
        .execute(&self.pool)
        .await
        .map_err(DbError::Query)?;

        Ok(())
    }
}

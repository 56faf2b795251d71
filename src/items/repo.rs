use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Validated item fields, used for both create and full update.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemFields {
    pub name: String,
    pub description: String,
    pub price: f64,
}

#[async_trait]
pub trait ItemRepo: Send + Sync {
    async fn create(&self, fields: &ItemFields) -> Result<Item, StoreError>;
    /// Oldest first. `limit: None` returns everything past `offset`.
    async fn list(&self, limit: Option<i64>, offset: i64) -> Result<Vec<Item>, StoreError>;
    async fn find(&self, id: Uuid) -> Result<Option<Item>, StoreError>;
    async fn update(&self, id: Uuid, fields: &ItemFields) -> Result<Option<Item>, StoreError>;
}

#[derive(Clone)]
pub struct PgItemRepo {
    db: PgPool,
}

impl PgItemRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ItemRepo for PgItemRepo {
    async fn create(&self, fields: &ItemFields) -> Result<Item, StoreError> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO items (name, description, price)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, price, created_at, updated_at
            "#,
        )
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(fields.price)
        .fetch_one(&self.db)
        .await?;
        Ok(item)
    }

    async fn list(&self, limit: Option<i64>, offset: i64) -> Result<Vec<Item>, StoreError> {
        // LIMIT NULL means no limit in Postgres
        let rows = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, name, description, price, created_at, updated_at
            FROM items
            ORDER BY created_at ASC, id ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Item>, StoreError> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, name, description, price, created_at, updated_at
            FROM items
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(item)
    }

    async fn update(&self, id: Uuid, fields: &ItemFields) -> Result<Option<Item>, StoreError> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            UPDATE items
               SET name = $2, description = $3, price = $4, updated_at = now()
             WHERE id = $1
            RETURNING id, name, description, price, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(fields.price)
        .fetch_optional(&self.db)
        .await?;
        Ok(item)
    }
}

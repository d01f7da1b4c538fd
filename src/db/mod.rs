use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use crate::config::DatabaseConfig;
use crate::models::{Category, ExpenseDocument};
use anyhow::Result;

pub use operations::*;
pub use pool::*;

pub mod pool;
pub mod operations;

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect(&config.url)
        .await?;

    // Test connection
    sqlx::query("SELECT 1")
        .fetch_one(&pool)
        .await?;

    Ok(pool)
}

/// Metadata store for uploaded documents.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn insert(&self, document: &ExpenseDocument) -> Result<ExpenseDocument, sqlx::Error>;

    async fn find(&self, id: &str) -> Result<Option<ExpenseDocument>, sqlx::Error>;

    async fn ping(&self) -> Result<(), sqlx::Error>;
}

/// Read-only source of expense categories, owned outside this service.
#[async_trait]
pub trait CategorySource: Send + Sync {
    async fn list(&self) -> Result<Vec<Category>, sqlx::Error>;
}

use async_trait::async_trait;
use sqlx::PgPool;

use super::{CategorySource, DocumentRepository};
use crate::models::{Category, ExpenseDocument};

/// PostgreSQL-backed document metadata.
#[derive(Clone)]
pub struct PgDocuments {
    pool: PgPool,
}

impl PgDocuments {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentRepository for PgDocuments {
    async fn insert(&self, document: &ExpenseDocument) -> Result<ExpenseDocument, sqlx::Error> {
        sqlx::query_as::<_, ExpenseDocument>(
            r#"
            INSERT INTO expense_documents (id, url, width, height, expense_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, url, width, height, expense_id
            "#,
        )
        .bind(&document.id)
        .bind(&document.url)
        .bind(document.width)
        .bind(document.height)
        .bind(&document.expense_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn find(&self, id: &str) -> Result<Option<ExpenseDocument>, sqlx::Error> {
        sqlx::query_as::<_, ExpenseDocument>(
            "SELECT id, url, width, height, expense_id FROM expense_documents WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        super::health_check(&self.pool).await
    }
}

/// Categories read from the shared `categories` table.
#[derive(Clone)]
pub struct PgCategories {
    pool: PgPool,
}

impl PgCategories {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategorySource for PgCategories {
    async fn list(&self) -> Result<Vec<Category>, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            "SELECT id, grouping, name FROM categories ORDER BY grouping ASC, name ASC",
        )
        .fetch_all(&self.pool)
        .await
    }
}

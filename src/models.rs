use std::sync::Arc;

use crate::config::Config;
use crate::db::{CategorySource, DocumentRepository};
use crate::llm::LLMAdapter;
use crate::storage::{ObjectStore, ObjectUrls};

/// Shared handler state. Every collaborator is injected so tests can swap in
/// in-memory fakes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// `None` when object storage is disabled or not configured.
    pub store: Option<Arc<dyn ObjectStore>>,
    pub urls: ObjectUrls,
    pub documents: Arc<dyn DocumentRepository>,
    pub categories: Arc<dyn CategorySource>,
    pub model: Arc<dyn LLMAdapter>,
}

impl AppState {
    pub fn store(&self) -> crate::types::AppResult<&Arc<dyn ObjectStore>> {
        self.store
            .as_ref()
            .ok_or(crate::types::AppError::ServiceDisabled)
    }
}

// FromRow: queries are built at runtime, no DATABASE_URL needed at compile time

/// Metadata row describing one uploaded receipt.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseDocument {
    pub id: String,
    pub url: String,
    pub width: i32,
    pub height: i32,
    pub expense_id: Option<String>,
}

/// Upload response: the stored record plus the uploaded filename, which is
/// only echoed back for display.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedDocument {
    #[serde(flatten)]
    pub document: ExpenseDocument,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: i32,
    pub grouping: String,
    pub name: String,
}

impl Category {
    /// Rendering used in the extraction prompt.
    pub fn prompt_label(&self) -> String {
        format!("\"{}/{}\" (ID: {})", self.grouping, self.name, self.id)
    }
}

#[derive(Debug, serde::Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub database: String,
    pub storage: String,
}

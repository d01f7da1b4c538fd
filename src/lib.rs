// Expense Docs - receipt upload, retrieval and extraction over S3-compatible storage

pub mod config;
pub mod db;
pub mod models;
pub mod types;
pub mod llm;
pub mod storage;
pub mod extraction;
pub mod routes;
pub mod middleware;
pub mod utils;
pub mod client;

#[cfg(test)]
mod test_helpers;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;
pub use types::{AppError, AppResult};

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}

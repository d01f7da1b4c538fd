use axum::{extract::State, routing::get, Json, Router};
use tracing::warn;

use crate::models::{AppState, HealthResponse};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match state.documents.ping().await {
        Ok(()) => "connected",
        Err(e) => {
            warn!(error = %e, "Database health check failed");
            "unreachable"
        }
    };

    let storage = if state.store.is_some() {
        "enabled"
    } else {
        "disabled"
    };

    Json(HealthResponse {
        status: if database == "connected" { "ok" } else { "degraded" }.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        database: database.to_string(),
        storage: storage.to_string(),
    })
}

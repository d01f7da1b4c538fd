//! API Routes
//!
//! HTTP endpoints exposed by the service:
//! - `POST /api/documents` - Upload a receipt (multipart)
//! - `GET /api/documents/{id}` - Stream a stored receipt back
//! - `POST /api/documents/{id}/extract` - Read amount, category, date and title from a receipt
//! - `/api/health` - Health checks

pub mod documents;
pub mod health;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::apply_cors;
use crate::models::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let origins = state.config.server.cors_allowed_origins.clone();

    let api_router = Router::new()
        .merge(documents::router(state.clone()))
        .merge(health::router(state));

    apply_cors(api_router, &origins).layer(TraceLayer::new_for_http())
}

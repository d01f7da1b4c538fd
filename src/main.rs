use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use expense_docs::{
    config::Config,
    db::{self, PgCategories, PgDocuments},
    llm::build_adapter,
    routes::create_router,
    storage::{ObjectStore, ObjectUrls, S3ObjectStore},
    utils::init_logger,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded: {:?}", config.server);

    // Connect to database
    let pool = db::create_pool(&config.database).await?;

    // Run migrations
    info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
    info!("Database migrations completed");

    // Object storage is optional; handlers answer 501 without it
    let store: Option<Arc<dyn ObjectStore>> = if config.storage.is_configured() {
        let store = S3ObjectStore::new(&config.storage)?;
        info!(
            bucket = config.storage.bucket(),
            region = config.storage.region(),
            endpoint = ?config.storage.endpoint,
            "Object storage enabled"
        );
        Some(Arc::new(store))
    } else {
        if config.storage.enabled {
            warn!("ENABLE_EXPENSE_DOCUMENTS is set but S3 settings are incomplete");
        }
        None
    };

    if config.extraction.enabled && config.extraction.api_key.is_empty() {
        warn!("Receipt extraction is enabled without OPENAI_API_KEY");
    }

    let state = AppState {
        urls: ObjectUrls::from_config(&config.storage),
        model: build_adapter(&config.extraction),
        documents: Arc::new(PgDocuments::new(pool.clone())),
        categories: Arc::new(PgCategories::new(pool)),
        store,
        config: Arc::new(config.clone()),
    };

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}

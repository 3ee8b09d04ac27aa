// API Server Binary Entry Point
//
// Purpose: Load the classifier, connect the production store, serve HTTP
// Usage: cargo run --bin api_server

use crop_recommender::{create_router, AppState, ServerConfig};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up .env before anything reads the environment
    let dotenv_path = dotenvy::dotenv().ok();

    // Initialize tracing (structured logging)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    // Default log level: info for our crate, warn for others
                    "crop_recommender=info,api_server=info,tower_http=debug,axum=debug,warn".into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting API server...");
    if let Some(path) = dotenv_path {
        tracing::info!("Loaded environment from {:?}", path);
    }

    let config = ServerConfig::from_env()?;

    tracing::info!("Configuration:");
    tracing::info!("  PORT: {}", config.port);
    tracing::info!("  MODEL_PATH: {:?}", config.model_path);
    tracing::info!("  TEMPERATURE_SCALE: {}", config.recommender.temperature);
    tracing::info!("  TOP_K: {}", config.recommender.top_k);
    tracing::info!("  SELECTION_POLICY: {}", config.recommender.policy);
    tracing::info!("  LOOKUP_FALLBACK: {}", config.recommender.lookup_failure);

    // Classifier must load before we accept any request
    let state = AppState::new(&config).await?;
    tracing::info!("Application state initialized successfully");

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .await?;

    Ok(())
}

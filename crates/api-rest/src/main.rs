//! Standalone REST API server binary.
//!
//! ## Purpose
//! Serves the read API over an existing parsed-data directory without watching or processing
//! raw exports.
//!
//! ## Intended use
//! Useful for development, or for serving output produced elsewhere (for example by `rt process`).
//! The workspace's main `record-transformer` binary runs the watcher and the REST API together.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{router, AppState};
use api_shared::allowed_origins_from_env_value;
use transformer_core::{
    config::dir_from_env_value,
    constants::{DEFAULT_CACHE_DATA_DIR, DEFAULT_PARSED_DATA_DIR, DEFAULT_RAW_DATA_DIR},
    CoreConfig, DataService,
};

/// Main entry point for the standalone REST API server
///
/// # Environment Variables
/// - `RT_REST_ADDR`: Server address (default: "0.0.0.0:3001")
/// - `RAW_DATA_DIR`, `PARSED_DATA_DIR`, `CACHE_DATA_DIR`: data locations
/// - `ALLOWED_ORIGINS`: comma-separated CORS origins (default: any)
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("RT_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".into());

    let cfg = Arc::new(CoreConfig::new(
        dir_from_env_value(std::env::var("RAW_DATA_DIR").ok(), DEFAULT_RAW_DATA_DIR),
        dir_from_env_value(std::env::var("PARSED_DATA_DIR").ok(), DEFAULT_PARSED_DATA_DIR),
        dir_from_env_value(std::env::var("CACHE_DATA_DIR").ok(), DEFAULT_CACHE_DATA_DIR),
    ));
    let allowed_origins = allowed_origins_from_env_value(std::env::var("ALLOWED_ORIGINS").ok());

    let state = AppState {
        data_service: DataService::new(cfg.clone()),
    };
    let app = router(state, &allowed_origins);

    tracing::info!("-- Starting record transformer REST API on {}", addr);
    tracing::info!("Serving parsed data from {}", cfg.parsed_data_dir().display());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}

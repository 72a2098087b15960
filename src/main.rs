use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, router};
use api_shared::allowed_origins_from_env_value;
use transformer_core::{
    CoreConfig, DataService, FileWatcher,
    config::{
        clinical_only_policy_from_env_value, dir_from_env_value,
        processing_interval_from_env_value,
    },
    constants::{DEFAULT_CACHE_DATA_DIR, DEFAULT_PARSED_DATA_DIR, DEFAULT_RAW_DATA_DIR},
};

/// Main entry point for the record transformer
///
/// Starts the file watcher (initial processing run, change-triggered and scheduled re-runs) and
/// serves the read API on the REST address. In demo mode the watcher is not started and only
/// the API runs.
///
/// # Environment Variables
/// - `RT_REST_ADDR`: REST server address (default: "0.0.0.0:3001")
/// - `RAW_DATA_DIR`: facility export root (default: "data/raw")
/// - `PARSED_DATA_DIR`: resident document root (default: "data/parsed")
/// - `CACHE_DATA_DIR`: read-fallback cache root (default: "data/cache")
/// - `PROCESSING_INTERVAL_MINUTES`: scheduled re-run period (default: 30)
/// - `ALLOWED_ORIGINS`: comma-separated CORS origins (default: any)
/// - `CLINICAL_ONLY_POLICY`: `drop` or `include` (default: `drop`)
///
/// # Returns
/// * `Ok(())` - After a clean shutdown on Ctrl-C
/// * `Err(anyhow::Error)` - If configuration, startup or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("record_transformer=info".parse()?)
                .add_directive("transformer_core=info".parse()?)
                .add_directive("records=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("RT_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".into());

    let cfg = CoreConfig::new(
        dir_from_env_value(std::env::var("RAW_DATA_DIR").ok(), DEFAULT_RAW_DATA_DIR),
        dir_from_env_value(std::env::var("PARSED_DATA_DIR").ok(), DEFAULT_PARSED_DATA_DIR),
        dir_from_env_value(std::env::var("CACHE_DATA_DIR").ok(), DEFAULT_CACHE_DATA_DIR),
    )
    .with_processing_interval(processing_interval_from_env_value(
        std::env::var("PROCESSING_INTERVAL_MINUTES").ok(),
    )?)?
    .with_clinical_only_policy(clinical_only_policy_from_env_value(
        std::env::var("CLINICAL_ONLY_POLICY").ok(),
    )?);
    cfg.ensure_directories()?;
    let cfg = Arc::new(cfg);

    let allowed_origins = allowed_origins_from_env_value(std::env::var("ALLOWED_ORIGINS").ok());

    tracing::info!("++ Raw data: {}", cfg.raw_data_dir().display());
    tracing::info!("++ Parsed data: {}", cfg.parsed_data_dir().display());
    tracing::info!("++ Starting record transformer REST on {}", rest_addr);

    // The initial processing run happens inside `start`; serve meanwhile.
    let watcher = FileWatcher::new(cfg.clone());
    let watcher_task = tokio::spawn(async move { watcher.start().await });

    let app = router(
        AppState {
            data_service: DataService::new(cfg),
        },
        &allowed_origins,
    );
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await;

    match watcher_task.await {
        Ok(Some(handle)) => handle.stop(),
        Ok(None) => {}
        Err(e) => tracing::error!("File watcher task failed: {}", e),
    }
    served?;

    Ok(())
}

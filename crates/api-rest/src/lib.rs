//! # API REST
//!
//! REST API for the record transformer.
//!
//! Handles:
//! - HTTP endpoints with axum (`/health`, `/residents`, `/residents/:id`, `/status`)
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON error bodies, CORS)
//!
//! The API only reads the persisted output through [`DataService`]; it never triggers
//! processing.

#![warn(rust_2018_idioms)]

use api_shared::{ErrorRes, HealthRes, HealthService};
use axum::{
    extract::{Path as AxumPath, State},
    http::{HeaderValue, Method, StatusCode},
    response::Json,
    routing::get,
    Router,
};
use records::{
    AdministrationWindow, ClinicalEntry, Facesheet, OrderCategory, PhysicalMonitoring,
    PrnAdministration, PrnFollowUp, Resident,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use transformer_core::{
    DataService, DataType, HasData, RawFileInfo, ResidentIndex, ResidentSummary, StatusDocument,
    TransformerResult,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

type ApiError = (StatusCode, Json<ErrorRes>);

/// Application state for the REST API server
///
/// Shared by all request handlers. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub data_service: DataService,
}

#[derive(OpenApi)]
#[openapi(
    paths(health, list_residents, get_resident, get_status),
    components(schemas(
        HealthRes,
        ErrorRes,
        ResidentIndex,
        ResidentSummary,
        HasData,
        Resident,
        Facesheet,
        ClinicalEntry,
        AdministrationWindow,
        PhysicalMonitoring,
        PrnAdministration,
        PrnFollowUp,
        OrderCategory,
        StatusDocument,
        DataType,
        RawFileInfo,
    ))
)]
pub struct ApiDoc;

/// Builds the application router.
///
/// # Arguments
/// * `state` - Shared handler state
/// * `allowed_origins` - CORS origins; an empty list allows any origin
pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/residents", get(list_residents))
        .route("/residents/:id", get(get_resident))
        .route("/status", get(get_status))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

/// CORS for read-only cross-origin access.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any)
}

/// Runs a data service read on the blocking pool; reads touch the filesystem.
async fn read_blocking<T, F>(service: &DataService, read: F) -> TransformerResult<T>
where
    T: Send + 'static,
    F: FnOnce(&DataService) -> TransformerResult<T> + Send + 'static,
{
    let service = service.clone();
    tokio::task::spawn_blocking(move || read(&service)).await?
}

fn internal_error(message: &'static str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorRes::new(message)),
    )
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Reports liveness only; it does not inspect the data directories.
#[axum::debug_handler]
async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/residents",
    responses(
        (status = 200, description = "Resident index", body = ResidentIndex),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// List all residents
///
/// Returns the anonymized index when present, otherwise the index of the last processing run,
/// or an empty index before the first run.
///
/// # Errors
/// Returns `500 Internal Server Error` if the index exists but cannot be read.
#[axum::debug_handler]
async fn list_residents(
    State(state): State<AppState>,
) -> Result<Json<ResidentIndex>, ApiError> {
    match read_blocking(&state.data_service, DataService::get_residents).await {
        Ok(index) => Ok(Json(index)),
        Err(e) => {
            tracing::error!("Get residents error: {:?}", e);
            Err(internal_error("Failed to get residents"))
        }
    }
}

#[utoipa::path(
    get,
    path = "/residents/{id}",
    params(("id" = String, Path, description = "Resident ID")),
    responses(
        (status = 200, description = "Resident document", body = Resident),
        (status = 404, description = "Resident not found", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Get one resident document
///
/// # Arguments
/// * `id` - Resident ID. Demo IDs are answered with a generated record.
///
/// # Errors
/// Returns `404 Not Found` if there is no such resident, and `500 Internal Server Error` if the
/// document exists but cannot be read.
#[axum::debug_handler]
async fn get_resident(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<Resident>, ApiError> {
    let requested = id.clone();
    let read = move |service: &DataService| service.get_resident(&requested);
    match read_blocking(&state.data_service, read).await {
        Ok(Some(resident)) => Ok(Json(resident)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorRes::new("Resident not found")),
        )),
        Err(e) => {
            tracing::error!("Get resident {} error: {:?}", id, e);
            Err(internal_error("Failed to get resident"))
        }
    }
}

#[utoipa::path(
    get,
    path = "/status",
    responses(
        (status = 200, description = "Service status", body = StatusDocument),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Service status
///
/// Reports the data source in use, the last processing run and which raw exports are present.
///
/// # Errors
/// Returns `500 Internal Server Error` if the index exists but cannot be read.
#[axum::debug_handler]
async fn get_status(State(state): State<AppState>) -> Result<Json<StatusDocument>, ApiError> {
    match read_blocking(&state.data_service, DataService::get_status).await {
        Ok(status) => Ok(Json(status)),
        Err(e) => {
            tracing::error!("Get status error: {:?}", e);
            Err(internal_error("Failed to get status"))
        }
    }
}

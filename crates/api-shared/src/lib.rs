//! # API Shared
//!
//! Shared utilities and definitions for the record transformer's outer surfaces.
//!
//! Contains:
//! - the health check (`HealthService`, `HealthRes`)
//! - the error response body (`ErrorRes`)
//! - CORS origin configuration parsing
//!
//! Used by `api-rest`, the `cli` and the combined server binary.

pub mod cors;
pub mod error;
pub mod health;

pub use cors::allowed_origins_from_env_value;
pub use error::ErrorRes;
pub use health::{HealthRes, HealthService};

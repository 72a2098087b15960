use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Name reported by the health endpoint.
pub const SERVICE_NAME: &str = "record-transformer";

/// Liveness response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub status: String,
    pub timestamp: String,
    pub service: String,
}

/// Simple health service used by the REST API and the CLI.
///
/// Health only reports that the process is up; it does not look at the data directories.
#[derive(Clone)]
pub struct HealthService;

impl HealthService {
    /// Static method to check health without creating an instance
    ///
    /// # Returns
    /// A `HealthRes` with status `OK` and the current time.
    pub fn check_health() -> HealthRes {
        HealthRes {
            status: "OK".into(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            service: SERVICE_NAME.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_reports_ok_for_the_service() {
        let res = HealthService::check_health();
        assert_eq!(res.status, "OK");
        assert_eq!(res.service, "record-transformer");
        assert!(res.timestamp.ends_with('Z'));

        let value = serde_json::to_value(&res).unwrap();
        assert_eq!(value["status"], "OK");
        assert!(value.get("timestamp").is_some());
    }
}

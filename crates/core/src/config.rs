//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into the processor, the data
//! service and the watcher as an `Arc<CoreConfig>`. Nothing below reads environment variables
//! during processing or request handling; the binaries translate raw env values through the
//! `*_from_env_value` helpers.

use crate::constants::{
    ANONYMIZED_INDEX_FILENAME, DEFAULT_PROCESSING_INTERVAL_MINUTES, INDEX_FILENAME,
    RESIDENT_DOCUMENT_EXTENSION, WRITE_STABILITY_WINDOW,
};
use crate::{TransformerError, TransformerResult};
use rt_types::ResidentId;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// What the processor does with clinical entries whose resident has no facesheet in the same
/// facility.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClinicalOnlyPolicy {
    /// Discard the entries. The resident is not persisted.
    #[default]
    Drop,
    /// Persist the resident with an empty name and an empty facesheet.
    Include,
}

impl FromStr for ClinicalOnlyPolicy {
    type Err = TransformerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(Self::Drop),
            "include" => Ok(Self::Include),
            other => Err(TransformerError::InvalidConfig(format!(
                "unknown clinical-only policy '{other}' (expected 'drop' or 'include')"
            ))),
        }
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    raw_data_dir: PathBuf,
    parsed_data_dir: PathBuf,
    cache_data_dir: PathBuf,
    processing_interval: Duration,
    stability_window: Duration,
    clinical_only_policy: ClinicalOnlyPolicy,
}

impl CoreConfig {
    /// Create a new `CoreConfig` with the default interval, stability window and policy.
    pub fn new(raw_data_dir: PathBuf, parsed_data_dir: PathBuf, cache_data_dir: PathBuf) -> Self {
        Self {
            raw_data_dir,
            parsed_data_dir,
            cache_data_dir,
            processing_interval: Duration::from_secs(DEFAULT_PROCESSING_INTERVAL_MINUTES * 60),
            stability_window: WRITE_STABILITY_WINDOW,
            clinical_only_policy: ClinicalOnlyPolicy::default(),
        }
    }

    /// Replace the scheduled re-run period.
    ///
    /// # Errors
    ///
    /// Returns `TransformerError::InvalidConfig` if `interval` is zero.
    pub fn with_processing_interval(mut self, interval: Duration) -> TransformerResult<Self> {
        if interval.is_zero() {
            return Err(TransformerError::InvalidConfig(
                "processing interval must be greater than zero".into(),
            ));
        }
        self.processing_interval = interval;
        Ok(self)
    }

    pub fn with_stability_window(mut self, window: Duration) -> Self {
        self.stability_window = window;
        self
    }

    pub fn with_clinical_only_policy(mut self, policy: ClinicalOnlyPolicy) -> Self {
        self.clinical_only_policy = policy;
        self
    }

    pub fn raw_data_dir(&self) -> &Path {
        &self.raw_data_dir
    }

    pub fn parsed_data_dir(&self) -> &Path {
        &self.parsed_data_dir
    }

    pub fn cache_data_dir(&self) -> &Path {
        &self.cache_data_dir
    }

    pub fn processing_interval(&self) -> Duration {
        self.processing_interval
    }

    pub fn stability_window(&self) -> Duration {
        self.stability_window
    }

    pub fn clinical_only_policy(&self) -> ClinicalOnlyPolicy {
        self.clinical_only_policy
    }

    pub fn index_path(&self) -> PathBuf {
        self.parsed_data_dir.join(INDEX_FILENAME)
    }

    pub fn anonymized_index_path(&self) -> PathBuf {
        self.parsed_data_dir.join(ANONYMIZED_INDEX_FILENAME)
    }

    /// Location of a resident document. Callers must have checked the ID is storage-safe.
    pub fn resident_path(&self, id: &ResidentId) -> PathBuf {
        self.parsed_data_dir
            .join(format!("{}.{}", id.as_str(), RESIDENT_DOCUMENT_EXTENSION))
    }

    /// True when an anonymized index is present, i.e. demo data replaces live data.
    pub fn demo_mode(&self) -> bool {
        self.anonymized_index_path().is_file()
    }

    /// Create the raw and parsed directories if they do not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `TransformerError::DirectoryCreation` if either directory cannot be created.
    pub fn ensure_directories(&self) -> TransformerResult<()> {
        for dir in [&self.raw_data_dir, &self.parsed_data_dir] {
            std::fs::create_dir_all(dir).map_err(|source| TransformerError::DirectoryCreation {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the processing interval (whole minutes) from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the default of 30 minutes.
///
/// # Errors
///
/// Returns `TransformerError::InvalidConfig` if the value is not a positive integer.
pub fn processing_interval_from_env_value(value: Option<String>) -> TransformerResult<Duration> {
    let Some(value) = non_empty(value) else {
        return Ok(Duration::from_secs(DEFAULT_PROCESSING_INTERVAL_MINUTES * 60));
    };

    match value.parse::<u64>() {
        Ok(minutes) if minutes > 0 => Ok(Duration::from_secs(minutes.saturating_mul(60))),
        _ => Err(TransformerError::InvalidConfig(format!(
            "PROCESSING_INTERVAL_MINUTES must be a positive integer, got '{value}'"
        ))),
    }
}

/// Parse the clinical-only policy from an optional string value, defaulting to `Drop`.
pub fn clinical_only_policy_from_env_value(
    value: Option<String>,
) -> TransformerResult<ClinicalOnlyPolicy> {
    non_empty(value)
        .map(|v| v.parse::<ClinicalOnlyPolicy>())
        .transpose()
        .map(Option::unwrap_or_default)
}

/// Resolve a directory from an optional string value, falling back to `default`.
pub fn dir_from_env_value(value: Option<String>, default: &str) -> PathBuf {
    PathBuf::from(non_empty(value).unwrap_or_else(|| default.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn interval_defaults_to_thirty_minutes() {
        assert_eq!(
            processing_interval_from_env_value(None).unwrap(),
            Duration::from_secs(30 * 60)
        );
        assert_eq!(
            processing_interval_from_env_value(Some("  ".into())).unwrap(),
            Duration::from_secs(30 * 60)
        );
        assert_eq!(
            processing_interval_from_env_value(Some("5".into())).unwrap(),
            Duration::from_secs(300)
        );
    }

    #[test]
    fn interval_must_be_positive() {
        assert!(processing_interval_from_env_value(Some("0".into())).is_err());
        assert!(processing_interval_from_env_value(Some("-3".into())).is_err());
        assert!(processing_interval_from_env_value(Some("soon".into())).is_err());

        let cfg = CoreConfig::new("raw".into(), "parsed".into(), "cache".into());
        assert!(cfg.with_processing_interval(Duration::ZERO).is_err());
    }

    #[test]
    fn policy_parses_case_insensitively() {
        assert_eq!(
            clinical_only_policy_from_env_value(None).unwrap(),
            ClinicalOnlyPolicy::Drop
        );
        assert_eq!(
            clinical_only_policy_from_env_value(Some("Include".into())).unwrap(),
            ClinicalOnlyPolicy::Include
        );
        assert!(clinical_only_policy_from_env_value(Some("keep".into())).is_err());
    }

    #[test]
    fn paths_are_derived_from_parsed_dir() {
        let cfg = CoreConfig::new("raw".into(), "out".into(), "cache".into());
        let id = ResidentId::new("5001").unwrap();

        assert_eq!(cfg.index_path(), Path::new("out/index.json"));
        assert_eq!(
            cfg.anonymized_index_path(),
            Path::new("out/anonymized-index.json")
        );
        assert_eq!(cfg.resident_path(&id), Path::new("out/5001.json"));
        assert_eq!(dir_from_env_value(None, "data/raw"), Path::new("data/raw"));
        assert_eq!(
            dir_from_env_value(Some("/srv/raw".into()), "data/raw"),
            Path::new("/srv/raw")
        );
    }

    #[test]
    fn ensure_directories_creates_missing_roots() {
        let temp = TempDir::new().unwrap();
        let cfg = CoreConfig::new(
            temp.path().join("a/raw"),
            temp.path().join("b/parsed"),
            temp.path().join("cache"),
        );

        cfg.ensure_directories().unwrap();
        assert!(cfg.raw_data_dir().is_dir());
        assert!(cfg.parsed_data_dir().is_dir());
        assert!(!cfg.demo_mode());
    }
}

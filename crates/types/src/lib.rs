//! Validated identifier types shared by the record transformer crates.
//!
//! Residents and facilities are addressed by plain strings in the raw exports, but both end up
//! as file and directory names on disk. The newtypes here make the validation happen once, at the
//! boundary, instead of at every call site.

use std::fmt;

/// Errors that can occur when creating validated identifier types.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input text was empty or contained only whitespace
    #[error("identifier cannot be empty")]
    Empty,

    /// The identifier cannot be used as a persisted document name
    #[error("identifier is not safe to use as a file name: {0}")]
    UnsafeForStorage(String),
}

/// Prefix used for residents that carry none of the three real identifiers.
pub const FALLBACK_ID_PREFIX: &str = "unknown_";

const MAX_STORAGE_LEN: usize = 128;

/// Stable identifier of a resident.
///
/// Resolved from the `InternalID`, `AdmissionID` and `EnterpriseID` attributes of a care receiver
/// element, in that priority order. Residents without any of them get a positional fallback
/// (`unknown_<index>`), which is **not** stable across processing runs: inserting a care receiver
/// earlier in the export shifts every later fallback id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResidentId(String);

impl ResidentId {
    /// Creates a resident id from raw text. Leading and trailing whitespace is trimmed.
    pub fn new(input: impl AsRef<str>) -> Result<Self, IdError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(IdError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Resolves the id of a care receiver by attribute priority.
    ///
    /// Empty or whitespace-only candidates are treated as absent.
    pub fn resolve(
        internal_id: Option<&str>,
        admission_id: Option<&str>,
        enterprise_id: Option<&str>,
        position: usize,
    ) -> Self {
        [internal_id, admission_id, enterprise_id]
            .into_iter()
            .flatten()
            .find_map(|candidate| Self::new(candidate).ok())
            .unwrap_or_else(|| Self::fallback(position))
    }

    /// Positional fallback id for a care receiver without identifiers.
    pub fn fallback(position: usize) -> Self {
        Self(format!("{FALLBACK_ID_PREFIX}{position}"))
    }

    pub fn is_fallback(&self) -> bool {
        self.0.starts_with(FALLBACK_ID_PREFIX)
    }

    /// Checks that the id can be used verbatim as a document file stem.
    ///
    /// Path separators, NUL, a leading dot (hidden files and `..`) and over-long ids are rejected.
    /// Anything else, including spaces and non-ASCII letters, is kept as-is.
    pub fn ensure_storage_safe(&self) -> Result<(), IdError> {
        let safe = self.0.len() <= MAX_STORAGE_LEN
            && !self.0.starts_with('.')
            && !self.0.contains("..")
            && !self.0.chars().any(|c| matches!(c, '/' | '\\' | '\0'));

        if safe {
            Ok(())
        } else {
            Err(IdError::UnsafeForStorage(self.0.clone()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResidentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResidentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for ResidentId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for ResidentId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ResidentId::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Name of a facility, taken from the raw-data directory that holds its exports.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FacilityName(String);

impl FacilityName {
    pub fn new(input: impl AsRef<str>) -> Result<Self, IdError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(IdError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FacilityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FacilityName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for FacilityName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for FacilityName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FacilityName::new(&s).map_err(serde::de::Error::custom)
    }
}

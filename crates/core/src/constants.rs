//! Constants used throughout the transformer core crate.
//!
//! Path, filename and timing constants live here so the processor, the data service and the
//! watcher agree on the storage layout.

use std::time::Duration;

/// Default directory holding one subdirectory of raw exports per facility.
pub const DEFAULT_RAW_DATA_DIR: &str = "data/raw";

/// Default directory for the resident documents and the index.
pub const DEFAULT_PARSED_DATA_DIR: &str = "data/parsed";

/// Default directory for the persisted read-fallback cache.
pub const DEFAULT_CACHE_DATA_DIR: &str = "data/cache";

/// Filename of the resident index written by every processing run.
pub const INDEX_FILENAME: &str = "index.json";

/// Filename of the externally supplied anonymized index. Its presence switches on demo mode.
pub const ANONYMIZED_INDEX_FILENAME: &str = "anonymized-index.json";

/// Extension of the per-resident documents.
pub const RESIDENT_DOCUMENT_EXTENSION: &str = "json";

/// Default period between scheduled processing runs, in minutes.
pub const DEFAULT_PROCESSING_INTERVAL_MINUTES: u64 = 30;

/// A changed export must be quiet this long before a run is triggered.
pub const WRITE_STABILITY_WINDOW: Duration = Duration::from_secs(2);

/// Maximum age of a persisted cache entry still served as a fallback.
pub const CACHE_VALIDITY: Duration = Duration::from_secs(24 * 60 * 60);

/// Value of the `status` field of the status document.
pub const SERVICE_STATUS_RUNNING: &str = "running";

//! Read-only access to the persisted output.

use crate::cache::ReadCache;
use crate::config::CoreConfig;
use crate::constants::SERVICE_STATUS_RUNNING;
use crate::demo;
use crate::documents::{
    format_timestamp, timestamp_now, DataType, RawFileInfo, RawFiles, ResidentIndex,
    StatusDocument,
};
use crate::storage;
use crate::TransformerResult;
use chrono::{DateTime, Utc};
use records::{RecordKind, Resident};
use rt_types::ResidentId;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

const INDEX_CACHE_KEY: &str = "index";
const ANONYMIZED_INDEX_CACHE_KEY: &str = "anonymized-index";

/// Serves the index, resident documents and the status report.
///
/// Cheap to clone; clones share the read caches.
#[derive(Clone, Debug)]
pub struct DataService {
    cfg: Arc<CoreConfig>,
    index_cache: Arc<ReadCache<ResidentIndex>>,
    resident_cache: Arc<ReadCache<Resident>>,
}

impl DataService {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        let cache_dir = cfg.cache_data_dir().to_path_buf();
        Self {
            index_cache: Arc::new(ReadCache::new(cache_dir.join("index"))),
            resident_cache: Arc::new(ReadCache::new(cache_dir.join("residents"))),
            cfg,
        }
    }

    /// Returns the resident index.
    ///
    /// The anonymized index takes precedence over the regular one. Before the first processing
    /// run neither exists and an empty index is returned.
    ///
    /// # Errors
    ///
    /// Returns `TransformerError` if an existing index cannot be read and no cached copy is
    /// available.
    pub fn get_residents(&self) -> TransformerResult<ResidentIndex> {
        let anonymized = self.cfg.anonymized_index_path();
        if anonymized.is_file() {
            tracing::debug!("Serving anonymized index");
            if let Some(index) = self
                .index_cache
                .read_through(ANONYMIZED_INDEX_CACHE_KEY, || {
                    storage::read_json_if_exists(&anonymized)
                })?
            {
                return Ok(index);
            }
        }

        let index_path = self.cfg.index_path();
        let index = self
            .index_cache
            .read_through(INDEX_CACHE_KEY, || storage::read_json_if_exists(&index_path))?;
        Ok(index.unwrap_or_default())
    }

    /// Returns one resident document, or `None` if there is no such resident.
    ///
    /// Demo IDs are answered with a generated record without touching storage. IDs that cannot
    /// name a stored document are reported as not found.
    ///
    /// # Errors
    ///
    /// Returns `TransformerError` if the document exists but cannot be read and no cached copy
    /// is available.
    pub fn get_resident(&self, id: &str) -> TransformerResult<Option<Resident>> {
        if let Some(resident) = demo::demo_resident(id) {
            return Ok(Some(resident));
        }

        let Ok(id) = ResidentId::new(id) else {
            return Ok(None);
        };
        if let Err(e) = id.ensure_storage_safe() {
            tracing::debug!("Rejecting resident lookup: {}", e);
            return Ok(None);
        }

        let path = self.cfg.resident_path(&id);
        self.resident_cache
            .read_through(id.as_str(), || storage::read_json_if_exists(&path))
    }

    /// Which data source `get_residents` currently serves from.
    pub fn data_type(&self) -> DataType {
        if self.cfg.demo_mode() {
            DataType::DemoAnonymized
        } else {
            DataType::Regular
        }
    }

    /// Builds the status report.
    ///
    /// # Errors
    ///
    /// Returns `TransformerError` if an existing index cannot be read.
    pub fn get_status(&self) -> TransformerResult<StatusDocument> {
        let data_type = self.data_type();
        let index_path = match data_type {
            DataType::DemoAnonymized => self.cfg.anonymized_index_path(),
            DataType::Regular => self.cfg.index_path(),
        };
        let index: ResidentIndex = storage::read_json_if_exists(&index_path)?.unwrap_or_default();

        Ok(StatusDocument {
            status: SERVICE_STATUS_RUNNING.to_owned(),
            last_processed: index.last_updated,
            total_residents: index.total_residents,
            facilities_processed: index.facilities_processed,
            data_type,
            raw_files: self.scan_raw_files(),
            parsed_data_location: self.cfg.parsed_data_dir().display().to_string(),
            timestamp: timestamp_now(),
        })
    }

    fn scan_raw_files(&self) -> RawFiles {
        let facility_dirs = match storage::list_subdirectories(self.cfg.raw_data_dir()) {
            Ok(dirs) => dirs,
            Err(e) => {
                tracing::warn!("Could not read raw data directory: {}", e);
                return RawFiles::new();
            }
        };

        facility_dirs
            .iter()
            .filter_map(|dir| {
                let facility = dir.file_name()?.to_string_lossy().into_owned();
                let files: BTreeMap<String, RawFileInfo> = RecordKind::ALL
                    .into_iter()
                    .map(|kind| {
                        let file_name = kind.file_name();
                        (file_name.to_owned(), raw_file_info(&dir.join(file_name)))
                    })
                    .collect();
                Some((facility, files))
            })
            .collect()
    }
}

fn raw_file_info(path: &Path) -> RawFileInfo {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() => RawFileInfo {
            exists: true,
            last_modified: meta
                .modified()
                .ok()
                .map(|at| format_timestamp(DateTime::<Utc>::from(at))),
            size: Some(meta.len()),
        },
        Ok(_) => RawFileInfo::default(),
        Err(e) => {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!("Could not stat {}: {}", path.display(), e);
            }
            RawFileInfo::default()
        }
    }
}

//! Processing runs: parse every facility, merge into one resident map, persist.
//!
//! A run is synchronous and filesystem-bound. Facilities are parsed in parallel on scoped
//! threads; the merge then walks the facility results in name order, so the persisted output
//! only depends on the raw inputs. Callers on an async runtime should run [`Processor::run`] on
//! the blocking pool.

use crate::config::{ClinicalOnlyPolicy, CoreConfig};
use crate::constants::{ANONYMIZED_INDEX_FILENAME, INDEX_FILENAME, RESIDENT_DOCUMENT_EXTENSION};
use crate::documents::{timestamp_now, ProcessingResult, ResidentIndex, ResidentSummary};
use crate::storage;
use crate::{TransformerError, TransformerResult};
use records::{
    ClinicalParser, FacesheetParser, ParsedFacesheet, RecordKind, RecordParser, Resident,
    ResidentEntries,
};
use rt_types::{FacilityName, ResidentId};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

/// Parser outputs for one facility directory.
#[derive(Debug)]
struct FacilityRecords {
    facility: FacilityName,
    facesheets: Vec<ParsedFacesheet>,
    clinical: Vec<(RecordKind, ResidentEntries)>,
}

/// Runs the parse/merge/persist pipeline over the configured raw tree.
#[derive(Clone, Debug)]
pub struct Processor {
    cfg: Arc<CoreConfig>,
}

impl Processor {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self { cfg }
    }

    /// Facility directories under the raw root, in processing order.
    ///
    /// # Errors
    ///
    /// Returns `TransformerError::DirectoryRead` if the raw root cannot be listed.
    pub fn facility_dirs(&self) -> TransformerResult<Vec<PathBuf>> {
        storage::list_subdirectories(self.cfg.raw_data_dir())
    }

    /// Performs one full processing run.
    ///
    /// A facility that fails is logged and skipped; it neither contributes residents nor counts
    /// towards `facilitiesProcessed`. Every resident document and the index are replaced, and
    /// documents of residents absent from this run are removed.
    ///
    /// # Errors
    ///
    /// Returns `TransformerError` if the raw root cannot be listed or the output cannot be
    /// written.
    pub fn run(&self) -> TransformerResult<ProcessingResult> {
        tracing::info!("Starting file processing...");

        let facility_dirs = self.facility_dirs()?;
        tracing::info!("Found {} facility directories", facility_dirs.len());

        let outcomes = parse_facilities(&facility_dirs);

        let mut residents: BTreeMap<ResidentId, Resident> = BTreeMap::new();
        let mut facilities_processed = 0usize;
        for (dir, outcome) in facility_dirs.iter().zip(outcomes) {
            match outcome {
                Ok(records) => {
                    let facility = records.facility.clone();
                    let merged = merge_facility(records, self.cfg.clinical_only_policy());
                    tracing::info!(
                        "Processed facility {}: {} residents",
                        facility,
                        merged.len()
                    );
                    for (id, resident) in merged {
                        if let Some(previous) = residents.insert(id, resident) {
                            tracing::warn!(
                                "Resident {} from {} replaced by a later facility",
                                previous.id,
                                previous.facility
                            );
                        }
                    }
                    facilities_processed += 1;
                }
                Err(e) => {
                    tracing::error!("Error processing facility {}: {}", dir.display(), e);
                }
            }
        }

        let written = self.persist(&residents, facilities_processed)?;

        tracing::info!(
            "Processing complete: {} residents from {} facilities",
            written,
            facilities_processed
        );

        Ok(ProcessingResult {
            success: true,
            residents_processed: written,
            facilities_processed,
            timestamp: timestamp_now(),
        })
    }

    /// Writes resident documents and the index, then prunes stale documents.
    fn persist(
        &self,
        residents: &BTreeMap<ResidentId, Resident>,
        facilities_processed: usize,
    ) -> TransformerResult<usize> {
        let parsed_dir = self.cfg.parsed_data_dir();
        storage::ensure_dir(parsed_dir)?;

        let mut summaries = Vec::with_capacity(residents.len());
        let mut written = BTreeSet::new();
        for (id, resident) in residents {
            if let Err(e) = id.ensure_storage_safe() {
                tracing::warn!("Skipping resident with unsafe id: {}", e);
                continue;
            }
            storage::write_json_atomic(&self.cfg.resident_path(id), resident)?;
            summaries.push(ResidentSummary::of(resident));
            written.insert(id.as_str().to_owned());
        }

        self.prune_stale_documents(&written);

        let index = ResidentIndex {
            last_updated: Some(timestamp_now()),
            total_residents: summaries.len(),
            facilities_processed,
            residents: summaries,
        };
        storage::write_json_atomic(&self.cfg.index_path(), &index)?;

        Ok(written.len())
    }

    fn prune_stale_documents(&self, keep: &BTreeSet<String>) {
        let documents = match storage::list_files_with_extension(
            self.cfg.parsed_data_dir(),
            RESIDENT_DOCUMENT_EXTENSION,
        ) {
            Ok(documents) => documents,
            Err(e) => {
                tracing::warn!("Could not list parsed documents for pruning: {}", e);
                return;
            }
        };

        for path in documents {
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if file_name == INDEX_FILENAME || file_name == ANONYMIZED_INDEX_FILENAME {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if keep.contains(stem) {
                continue;
            }
            match storage::remove_if_exists(&path) {
                Ok(()) => tracing::debug!("Removed stale resident document {}", path.display()),
                Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
    }
}

/// Parses every facility on its own scoped thread, returning results in input order.
fn parse_facilities(dirs: &[PathBuf]) -> Vec<TransformerResult<FacilityRecords>> {
    thread::scope(|scope| {
        let handles: Vec<_> = dirs
            .iter()
            .map(|dir| scope.spawn(move || parse_facility(dir)))
            .collect();

        handles
            .into_iter()
            .zip(dirs)
            .map(|(handle, dir)| {
                handle.join().unwrap_or_else(|_| {
                    Err(TransformerError::InvalidInput(format!(
                        "parser thread panicked for {}",
                        dir.display()
                    )))
                })
            })
            .collect()
    })
}

fn parse_facility(dir: &Path) -> TransformerResult<FacilityRecords> {
    let facility = dir
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            TransformerError::InvalidInput(format!("invalid facility directory {}", dir.display()))
        })
        .and_then(|name| FacilityName::new(name).map_err(TransformerError::from))?;

    tracing::info!("Processing facility: {}", facility);

    let mut records = FacilityRecords {
        facility,
        facesheets: Vec::new(),
        clinical: Vec::new(),
    };

    for kind in RecordKind::ALL {
        let path = dir.join(kind.file_name());
        if !export_present(&path)? {
            tracing::debug!("No {} export in {}", kind.label(), dir.display());
            continue;
        }

        match ClinicalParser::for_kind(kind) {
            Some(parser) => records.clinical.push((kind, parser.parse_file(&path))),
            None => records.facesheets = FacesheetParser.parse_file(&path),
        }
    }

    Ok(records)
}

/// Whether an export exists. Errors other than not-found fail the facility.
fn export_present(path: &Path) -> TransformerResult<bool> {
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.is_file()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(source) => Err(TransformerError::FileRead {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Builds the residents of one facility.
///
/// Facesheets seed the map. Clinical entries attach to seeded residents; entries for anyone
/// else are handled by `policy`.
fn merge_facility(
    records: FacilityRecords,
    policy: ClinicalOnlyPolicy,
) -> BTreeMap<ResidentId, Resident> {
    let FacilityRecords {
        facility,
        facesheets,
        clinical,
    } = records;

    let mut residents: BTreeMap<ResidentId, Resident> = BTreeMap::new();
    for parsed in facesheets {
        let resident = residents
            .entry(parsed.id.clone())
            .or_insert_with(|| Resident::new(parsed.id.clone(), "", facility.clone()));
        resident.name = parsed.name;
        resident.facesheet = Some(parsed.facesheet);
    }
    let seeded: BTreeSet<ResidentId> = residents.keys().cloned().collect();

    let mut dropped = 0usize;
    for (kind, entries_by_resident) in clinical {
        for (id, entries) in entries_by_resident {
            if !seeded.contains(&id) && policy == ClinicalOnlyPolicy::Drop {
                tracing::debug!(
                    "Dropping {} entries for {} without facesheet in {}",
                    kind.label(),
                    id,
                    facility
                );
                dropped += 1;
                continue;
            }

            let resident = residents
                .entry(id.clone())
                .or_insert_with(|| Resident::new(id, "", facility.clone()));
            if let Some(slot) = resident.entries_mut(kind) {
                *slot = entries;
            }
        }
    }

    if dropped > 0 {
        tracing::info!(
            "{} clinical record sets in {} had no matching facesheet and were dropped",
            dropped,
            facility
        );
    }

    residents
}

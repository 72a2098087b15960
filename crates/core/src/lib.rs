//! # Transformer Core
//!
//! Core business logic of the record transformer.
//!
//! This crate contains the processing pipeline and the read side over its output:
//! - processing runs that parse every facility's exports and persist resident documents plus
//!   an index (`processor`)
//! - read access to the persisted output with a fallback cache and generated demo residents
//!   (`data_service`, `cache`, `demo`)
//! - file watching and scheduled reprocessing (`watcher`)
//!
//! **No API concerns**: HTTP routing and command-line handling belong in `api-rest` and `cli`.

pub mod cache;
pub mod config;
pub mod constants;
pub mod data_service;
pub mod demo;
pub mod documents;
pub mod error;
pub mod processor;
mod storage;
pub mod watcher;

#[cfg(test)]
mod test_support;

pub use config::{ClinicalOnlyPolicy, CoreConfig};
pub use data_service::DataService;
pub use documents::{
    DataType, HasData, ProcessingResult, RawFileInfo, ResidentIndex, ResidentSummary,
    StatusDocument,
};
pub use error::{TransformerError, TransformerResult};
pub use processor::Processor;
pub use watcher::{FileWatcher, WatcherHandle};

pub use records::Resident;

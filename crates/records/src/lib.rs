//! Wire models and parsers for facility record exports.
//!
//! Facilities export four HTML reports per site (facesheet, medication, treatment and other
//! orders). Each report embeds one XML payload inside a marker element; this crate turns those
//! payloads into the resident-keyed document model served by the transformer.
//!
//! This crate focuses on:
//! - locating the embedded payload in the HTML report (`html`)
//! - a small owned XML element tree with scoped descendant search (`xml`)
//! - typed field extraction from element attributes (`attributes`)
//! - one parser per record kind (`parsers`)
//! - the serialised document model (`model`) and order categorisation (`category`)
//!
//! Parsers never fail outward: a missing marker, unreadable file or malformed payload degrades
//! to an empty result for that file and is logged.

pub mod attributes;
pub mod category;
pub mod html;
pub mod model;
pub mod parsers;
pub mod xml;

pub use category::categorise_order;
pub use model::{
    AdministrationWindow, ClinicalEntry, DayValues, Facesheet, OrderCategory, PhysicalMonitoring,
    PrnAdministration, PrnFollowUp, RecordKind, Resident,
};
pub use parsers::{ClinicalParser, FacesheetParser, ParsedFacesheet, RecordParser, ResidentEntries};
pub use rt_types::{FacilityName, ResidentId};
pub use xml::XmlElement;

use std::path::PathBuf;

/// Errors returned by the `records` crate.
#[derive(Debug, thiserror::Error)]
pub enum RecordsError {
    #[error("failed to read record file {path}: {source}", path = path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid XML payload: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("invalid XML attribute: {0}")]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("malformed XML payload: {0}")]
    MalformedXml(String),
}

/// Type alias for Results that can fail with a [`RecordsError`].
pub type RecordsResult<T> = Result<T, RecordsError>;

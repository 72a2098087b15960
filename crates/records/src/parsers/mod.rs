//! Record parsers, one per export kind.
//!
//! Every parser follows the same contract: read one HTML export, pull the embedded XML payload
//! out of its marker element, walk the `CareReceiver` elements and produce a result. Failures
//! never propagate past the file: a missing marker is logged as a warning, an unreadable file or
//! malformed payload as an error, and both yield the parser's empty output.

mod clinical;
mod facesheet;

pub use clinical::{ClinicalParser, ResidentEntries};
pub use facesheet::{FacesheetParser, ParsedFacesheet};

use crate::html::extract_marker_text;
use crate::model::RecordKind;
use crate::xml::XmlElement;
use crate::{RecordsError, RecordsResult};
use rt_types::ResidentId;
use std::fs;
use std::path::Path;

pub const CARE_RECEIVER_ELEMENT: &str = "CareReceiver";

/// Shared parsing contract for the four export kinds.
pub trait RecordParser {
    type Output: Default;

    /// The export kind this parser reads.
    fn kind(&self) -> RecordKind;

    /// Builds the output from a parsed payload document.
    fn parse_document(&self, document: &XmlElement) -> Self::Output;

    /// Number of residents in an output, for logging.
    fn resident_count(output: &Self::Output) -> usize;

    /// Parses one export file, degrading to the empty output on any failure.
    fn parse_file(&self, path: &Path) -> Self::Output {
        let kind = self.kind();
        match load_payload(path, kind) {
            Ok(Some(document)) => {
                let output = self.parse_document(&document);
                tracing::info!(
                    "Parsed {} data for {} residents from {}",
                    kind.label(),
                    Self::resident_count(&output),
                    path.display()
                );
                output
            }
            Ok(None) => {
                tracing::warn!("No XML data found in {}", path.display());
                Self::Output::default()
            }
            Err(e) => {
                tracing::error!("Error parsing {} file {}: {}", kind.label(), path.display(), e);
                Self::Output::default()
            }
        }
    }
}

/// Reads an export and parses its embedded payload.
///
/// Returns `Ok(None)` when the marker element is missing or empty.
///
/// # Errors
///
/// Returns `RecordsError` if the file cannot be read or the payload is not well-formed XML.
pub fn load_payload(path: &Path, kind: RecordKind) -> RecordsResult<Option<XmlElement>> {
    let bytes = fs::read(path).map_err(|source| RecordsError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let html = String::from_utf8_lossy(&bytes);

    extract_marker_text(&html, kind.marker_id())
        .map(|payload| XmlElement::parse_document(&payload))
        .transpose()
}

/// Care receivers of a payload paired with their resolved resident ids.
///
/// Fallback ids use the receiver's position among all care receivers in the payload.
pub(crate) fn care_receivers(document: &XmlElement) -> Vec<(ResidentId, &XmlElement)> {
    document
        .find_all(CARE_RECEIVER_ELEMENT)
        .into_iter()
        .enumerate()
        .map(|(position, receiver)| {
            let id = ResidentId::resolve(
                receiver.attr("InternalID"),
                receiver.attr("AdmissionID"),
                receiver.attr("EnterpriseID"),
                position,
            );
            (id, receiver)
        })
        .collect()
}

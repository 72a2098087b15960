//! Facesheet export parser.

use super::{care_receivers, RecordParser};
use crate::attributes::facesheet_from;
use crate::model::{Facesheet, RecordKind};
use crate::xml::XmlElement;
use rt_types::ResidentId;

/// Identity and demographics of one care receiver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedFacesheet {
    pub id: ResidentId,
    pub name: String,
    pub facesheet: Facesheet,
}

/// Parses `Facesheet_data.html` into one record per care receiver, in document order.
#[derive(Clone, Copy, Debug, Default)]
pub struct FacesheetParser;

impl RecordParser for FacesheetParser {
    type Output = Vec<ParsedFacesheet>;

    fn kind(&self) -> RecordKind {
        RecordKind::Facesheet
    }

    fn parse_document(&self, document: &XmlElement) -> Self::Output {
        care_receivers(document)
            .into_iter()
            .map(|(id, receiver)| ParsedFacesheet {
                id,
                name: receiver.text("ResidentName"),
                facesheet: facesheet_from(receiver),
            })
            .collect()
    }

    fn resident_count(output: &Self::Output) -> usize {
        output.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::test_support::write_export;
    use tempfile::TempDir;

    #[test]
    fn parses_one_record_per_care_receiver() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = write_export(
            &dir,
            "Facesheet_data.html",
            "FSXML",
            r#"<Residents>
                 <CareReceiver InternalID="5001" ResidentName="Doe, Jane" Age="81"/>
                 <CareReceiver AdmissionID="A-17" ResidentName="Roe, Rick"/>
                 <CareReceiver ResidentName="Nobody"/>
               </Residents>"#,
        );

        let residents = FacesheetParser.parse_file(&path);

        assert_eq!(residents.len(), 3);
        assert_eq!(residents[0].id.as_str(), "5001");
        assert_eq!(residents[0].name, "Doe, Jane");
        assert_eq!(residents[0].facesheet.age, "81");
        assert_eq!(residents[1].id.as_str(), "A-17");
        assert_eq!(residents[2].id.as_str(), "unknown_2");
    }

    #[test]
    fn ignores_the_medication_marker() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = write_export(
            &dir,
            "Facesheet_data.html",
            "DRXML",
            r#"<CareReceiver InternalID="5001"/>"#,
        );

        assert!(FacesheetParser.parse_file(&path).is_empty());
    }

    #[test]
    fn missing_file_yields_empty_list() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let residents = FacesheetParser.parse_file(&dir.path().join("Facesheet_data.html"));
        assert!(residents.is_empty());
    }

    #[test]
    fn malformed_payload_yields_empty_list() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = write_export(
            &dir,
            "Facesheet_data.html",
            "FSXML",
            r#"<Residents><CareReceiver InternalID="5001"></Residents>"#,
        );

        assert!(FacesheetParser.parse_file(&path).is_empty());
    }
}

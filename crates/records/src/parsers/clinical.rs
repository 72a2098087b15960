//! Medication, treatment and order export parser.
//!
//! The three clinical exports share one XML structure: care receivers holding `Order` elements,
//! each with an optional administration schedule. Only the marker file name differs, plus the
//! derived category on other-order entries.

use super::{care_receivers, RecordParser};
use crate::attributes::{clinical_entry_from, ORDER_ELEMENT};
use crate::model::{ClinicalEntry, RecordKind};
use crate::xml::XmlElement;
use rt_types::ResidentId;
use std::collections::BTreeMap;

/// Clinical entries per resident, in document order within each resident.
pub type ResidentEntries = BTreeMap<ResidentId, Vec<ClinicalEntry>>;

/// Parser for one of the three clinical export kinds.
#[derive(Clone, Copy, Debug)]
pub struct ClinicalParser {
    kind: RecordKind,
}

impl ClinicalParser {
    pub fn medication() -> Self {
        Self {
            kind: RecordKind::Medication,
        }
    }

    pub fn treatment() -> Self {
        Self {
            kind: RecordKind::Treatment,
        }
    }

    pub fn order() -> Self {
        Self {
            kind: RecordKind::Order,
        }
    }

    /// Parser for a clinical kind; `None` for [`RecordKind::Facesheet`].
    pub fn for_kind(kind: RecordKind) -> Option<Self> {
        match kind {
            RecordKind::Facesheet => None,
            RecordKind::Medication | RecordKind::Treatment | RecordKind::Order => {
                Some(Self { kind })
            }
        }
    }
}

impl RecordParser for ClinicalParser {
    type Output = ResidentEntries;

    fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Residents without any `Order` element are left out of the output. A resident id seen
    /// twice keeps the entries of its last care receiver.
    fn parse_document(&self, document: &XmlElement) -> Self::Output {
        let mut by_resident = ResidentEntries::new();

        for (id, receiver) in care_receivers(document) {
            let entries: Vec<ClinicalEntry> = receiver
                .find_all(ORDER_ELEMENT)
                .into_iter()
                .map(|order| clinical_entry_from(order, self.kind))
                .collect();

            if !entries.is_empty() {
                by_resident.insert(id, entries);
            }
        }

        by_resident
    }

    fn resident_count(output: &Self::Output) -> usize {
        output.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OrderCategory;
    use crate::parsers::test_support::write_export;
    use tempfile::TempDir;

    fn id(value: &str) -> ResidentId {
        ResidentId::new(value).unwrap()
    }

    #[test]
    fn medication_entries_keep_document_order() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = write_export(
            &dir,
            "MED_data.html",
            "DRXML",
            r#"<Root>
                 <CareReceiver InternalID="5001">
                   <Order Description="Aspirin 81mg" hasadmins="1">
                     <adminTime timeDesc="08:00" d1="Given"/>
                   </Order>
                   <Order Description="Metformin 500mg"/>
                 </CareReceiver>
               </Root>"#,
        );

        let meds = ClinicalParser::medication().parse_file(&path);
        let entries = &meds[&id("5001")];

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].description, "Aspirin 81mg");
        assert!(entries[0].has_admins);
        assert_eq!(entries[0].administrations[0].daily_admins.get(1), Some("Given"));
        assert_eq!(entries[0].administrations[0].daily_admins.len(), 1);
        assert_eq!(entries[1].description, "Metformin 500mg");
        assert!(!entries[1].has_admins);
    }

    #[test]
    fn residents_without_orders_are_omitted() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = write_export(
            &dir,
            "TRE_data.html",
            "DRXML",
            r#"<Root>
                 <CareReceiver InternalID="1"/>
                 <CareReceiver InternalID="2"><Order Description="Wound care"/></CareReceiver>
               </Root>"#,
        );

        let treatments = ClinicalParser::treatment().parse_file(&path);

        assert_eq!(treatments.len(), 1);
        assert!(treatments.contains_key(&id("2")));
        assert!(!treatments.contains_key(&id("1")));
    }

    #[test]
    fn duplicate_resident_keeps_last_receiver() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = write_export(
            &dir,
            "MED_data.html",
            "DRXML",
            r#"<Root>
                 <CareReceiver InternalID="7"><Order Description="First"/></CareReceiver>
                 <CareReceiver InternalID="7"><Order Description="Second"/></CareReceiver>
               </Root>"#,
        );

        let meds = ClinicalParser::medication().parse_file(&path);
        assert_eq!(meds[&id("7")][0].description, "Second");
    }

    #[test]
    fn orders_are_categorised() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = write_export(
            &dir,
            "Oth_data.html",
            "DRXML",
            r#"<Root>
                 <CareReceiver EnterpriseID="E-1">
                   <Order OrderTypeFullDesc="Laboratory" Description="CBC"/>
                   <Order OrderTypeFullDesc="Nursing" Description="Weigh weekly"/>
                 </CareReceiver>
               </Root>"#,
        );

        let orders = ClinicalParser::order().parse_file(&path);
        let entries = &orders[&id("E-1")];

        assert_eq!(entries[0].category, Some(OrderCategory::Laboratory));
        assert_eq!(entries[1].category, Some(OrderCategory::Other));
    }

    #[test]
    fn missing_marker_yields_empty_mapping() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("MED_data.html");
        std::fs::write(&path, "<html><body>No payload</body></html>").unwrap();

        assert!(ClinicalParser::medication().parse_file(&path).is_empty());
    }

    #[test]
    fn for_kind_rejects_facesheet() {
        assert!(ClinicalParser::for_kind(RecordKind::Facesheet).is_none());
        assert_eq!(
            ClinicalParser::for_kind(RecordKind::Order).map(|p| p.kind()),
            Some(RecordKind::Order)
        );
    }
}

//! Documents produced by processing runs and returned by the data service.

use chrono::{DateTime, SecondsFormat, Utc};
use records::Resident;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Current time in the RFC 3339 millisecond form used by every timestamp field.
pub fn timestamp_now() -> String {
    format_timestamp(Utc::now())
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Which data-availability flags a resident has.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct HasData {
    pub facesheet: bool,
    pub medications: bool,
    pub treatments: bool,
    pub orders: bool,
}

impl HasData {
    pub fn of(resident: &Resident) -> Self {
        Self {
            facesheet: resident.has_facesheet(),
            medications: !resident.medications.is_empty(),
            treatments: !resident.treatments.is_empty(),
            orders: !resident.orders.is_empty(),
        }
    }
}

/// One row of the resident index.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct ResidentSummary {
    #[serde(rename = "ResidentID")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    pub facility: String,
    #[serde(rename = "hasData")]
    pub has_data: HasData,
}

impl ResidentSummary {
    pub fn of(resident: &Resident) -> Self {
        Self {
            id: resident.id.to_string(),
            name: resident.name.clone(),
            facility: resident.facility.to_string(),
            has_data: HasData::of(resident),
        }
    }
}

/// Summary listing written as `index.json`, or supplied as `anonymized-index.json`.
///
/// The default value is the empty index served before the first run: no `lastUpdated`, zero
/// counts and no residents.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ResidentIndex {
    pub last_updated: Option<String>,
    pub total_residents: usize,
    pub facilities_processed: usize,
    pub residents: Vec<ResidentSummary>,
}

/// Outcome of one processing run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingResult {
    pub success: bool,
    pub residents_processed: usize,
    pub facilities_processed: usize,
    pub timestamp: String,
}

/// Origin of the data currently served.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    DemoAnonymized,
    Regular,
}

/// Presence and metadata of one raw export file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RawFileInfo {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Raw export presence keyed by facility, then by export file name.
pub type RawFiles = BTreeMap<String, BTreeMap<String, RawFileInfo>>;

/// Service status report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusDocument {
    pub status: String,
    pub last_processed: Option<String>,
    pub total_residents: usize,
    pub facilities_processed: usize,
    pub data_type: DataType,
    #[schema(value_type = Object)]
    pub raw_files: RawFiles,
    pub parsed_data_location: String,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use records::{ClinicalEntry, Facesheet, FacilityName, ResidentId};
    use serde_json::json;

    #[test]
    fn empty_index_has_null_last_updated() {
        let value = serde_json::to_value(ResidentIndex::default()).unwrap();
        assert_eq!(
            value,
            json!({
                "lastUpdated": null,
                "totalResidents": 0,
                "facilitiesProcessed": 0,
                "residents": []
            })
        );
    }

    #[test]
    fn summary_flags_follow_resident_contents() {
        let mut resident = Resident::new(
            ResidentId::new("5001").unwrap(),
            "Jane Doe",
            FacilityName::new("FAC_A").unwrap(),
        );
        resident.medications.push(ClinicalEntry::default());
        resident.facesheet = Some(Facesheet {
            resident_name: "Jane Doe".into(),
            ..Default::default()
        });

        let value = serde_json::to_value(ResidentSummary::of(&resident)).unwrap();
        assert_eq!(
            value,
            json!({
                "ResidentID": "5001",
                "Name": "Jane Doe",
                "facility": "FAC_A",
                "hasData": {
                    "facesheet": true,
                    "medications": true,
                    "treatments": false,
                    "orders": false
                }
            })
        );
    }

    #[test]
    fn data_type_wire_names() {
        assert_eq!(
            serde_json::to_value(DataType::DemoAnonymized).unwrap(),
            json!("DEMO_ANONYMIZED")
        );
        assert_eq!(serde_json::to_value(DataType::Regular).unwrap(), json!("REGULAR"));
    }

    #[test]
    fn anonymized_index_tolerates_missing_fields() {
        let index: ResidentIndex = serde_json::from_value(json!({
            "residents": [{ "ResidentID": "20001", "Name": "Protea Resident 20001" }]
        }))
        .unwrap();

        assert_eq!(index.last_updated, None);
        assert_eq!(index.residents[0].id, "20001");
        assert_eq!(index.residents[0].has_data, HasData::default());
    }

    #[test]
    fn timestamps_use_millisecond_utc_form() {
        let at = DateTime::parse_from_rfc3339("2024-05-01T10:20:30.123456Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_timestamp(at), "2024-05-01T10:20:30.123Z");
    }
}

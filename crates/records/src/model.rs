//! Serialised document model for residents and their clinical entries.
//!
//! Field names on the wire follow the existing UI consumer: resident documents keep the
//! `ResidentID`/`Name` keys and PascalCase facesheet attributes of the source exports, while
//! clinical entries use camelCase.

use rt_types::{FacilityName, ResidentId};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use utoipa::ToSchema;

/// Days addressable by the `d1`..`d31` attributes.
pub const DAY_RANGE: RangeInclusive<u8> = 1..=31;

// ============================================================================
// Record kinds
// ============================================================================

/// The four report exports found in every facility directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKind {
    Facesheet,
    Medication,
    Treatment,
    Order,
}

impl RecordKind {
    pub const ALL: [RecordKind; 4] = [
        RecordKind::Facesheet,
        RecordKind::Medication,
        RecordKind::Treatment,
        RecordKind::Order,
    ];

    /// File name of the export inside a facility directory.
    pub fn file_name(self) -> &'static str {
        match self {
            RecordKind::Facesheet => "Facesheet_data.html",
            RecordKind::Medication => "MED_data.html",
            RecordKind::Treatment => "TRE_data.html",
            RecordKind::Order => "Oth_data.html",
        }
    }

    /// Id of the HTML element holding the embedded XML payload.
    pub fn marker_id(self) -> &'static str {
        match self {
            RecordKind::Facesheet => "FSXML",
            RecordKind::Medication | RecordKind::Treatment | RecordKind::Order => "DRXML",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RecordKind::Facesheet => "facesheet",
            RecordKind::Medication => "medication",
            RecordKind::Treatment => "treatment",
            RecordKind::Order => "order",
        }
    }

    /// Looks up the kind watched for a given export file name.
    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.file_name() == name)
    }
}

// ============================================================================
// Day-indexed values
// ============================================================================

/// Sparse mapping of day of month to the value recorded for it.
///
/// Serialised as an object keyed `d1`..`d31` in day order. Days without a recorded value are
/// never present.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DayValues(BTreeMap<u8, String>);

impl DayValues {
    /// Builds the mapping by probing `d1`..`d31` through `lookup`.
    ///
    /// Absent and empty values are skipped.
    pub fn from_lookup<'a>(mut lookup: impl FnMut(&str) -> Option<&'a str>) -> Self {
        let mut days = BTreeMap::new();
        for day in DAY_RANGE {
            if let Some(value) = lookup(&day_key(day)).filter(|v| !v.is_empty()) {
                days.insert(day, value.to_owned());
            }
        }
        Self(days)
    }

    pub fn get(&self, day: u8) -> Option<&str> {
        self.0.get(&day).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &str)> {
        self.0.iter().map(|(day, value)| (*day, value.as_str()))
    }
}

fn day_key(day: u8) -> String {
    format!("d{day}")
}

fn parse_day_key(key: &str) -> Option<u8> {
    let day: u8 = key.strip_prefix('d')?.parse().ok()?;
    DAY_RANGE.contains(&day).then_some(day)
}

impl Serialize for DayValues {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (day, value) in &self.0 {
            map.serialize_entry(&day_key(*day), value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for DayValues {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, String>::deserialize(deserializer)?;
        let mut days = BTreeMap::new();
        for (key, value) in raw {
            let day = parse_day_key(&key).ok_or_else(|| {
                serde::de::Error::custom(format!("invalid day key `{key}`, expected d1..d31"))
            })?;
            if !value.is_empty() {
                days.insert(day, value);
            }
        }
        Ok(Self(days))
    }
}

// ============================================================================
// Clinical entries
// ============================================================================

/// Derived classification of an order, see [`crate::categorise_order`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum OrderCategory {
    Laboratory,
    Therapy,
    Imaging,
    Dietary,
    Consultation,
    Other,
}

/// One physical monitoring row (`pm` element).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PhysicalMonitoring {
    pub pm_type: String,
    pub is_follow_up: bool,
    pub date: String,
    pub time: String,
    pub description: String,
    pub result: String,
    pub initials: String,
    #[schema(value_type = Object)]
    pub daily_data: DayValues,
}

/// Follow-up recorded against a PRN administration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PrnFollowUp {
    pub shown: bool,
    pub date: String,
    pub time: String,
    pub result: String,
    pub initials: String,
}

/// One as-needed administration event (`PRNAdmin` element).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PrnAdministration {
    pub date: String,
    pub time: String,
    pub status: String,
    pub result: String,
    pub initials: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<PrnFollowUp>,
    pub physical_monitoring: Vec<PhysicalMonitoring>,
}

/// One scheduled time slot of a clinical entry (`adminTime` or nested `followupTime`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct AdministrationWindow {
    pub time_desc: String,
    #[serde(rename = "isPRN")]
    pub is_prn: bool,
    #[schema(value_type = Object)]
    pub daily_admins: DayValues,
    pub physical_monitoring: Vec<PhysicalMonitoring>,
    pub follow_ups: Vec<AdministrationWindow>,
    pub prn_administrations: Vec<PrnAdministration>,
}

/// One medication, treatment or order entry for a resident.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ClinicalEntry {
    pub order_id: String,
    pub order_number: String,
    pub order_total: String,
    pub order_type: String,

    pub description: String,
    pub quantity: String,
    pub dosage_form: String,
    pub route: String,
    pub frequency: String,

    /// Absent when the source leaves the date unspecified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub begin_date: Option<String>,
    /// Absent for ongoing entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,

    pub notes: String,
    pub instructions: String,
    pub treatment_range: String,

    pub specimen_collected_by: String,
    pub specimen_collected_by_desc: String,
    pub specimen: String,
    pub specimen_desc: String,
    pub test_priority: String,
    pub test_priority_desc: String,

    pub is_original_drug: bool,
    pub gen_sub_date_active: String,

    pub has_admins: bool,
    pub administrations: Vec<AdministrationWindow>,

    /// Only set for entries parsed from the other-orders export.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<OrderCategory>,
}

// ============================================================================
// Facesheet and resident
// ============================================================================

/// Demographic, administrative and medical attributes of a resident.
///
/// The related-party, stay, procedure, referral and note lists are part of the document shape
/// but are never populated from the exports.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Facesheet {
    #[serde(rename = "InternalID")]
    pub internal_id: String,
    #[serde(rename = "AdmissionID")]
    pub admission_id: String,
    #[serde(rename = "EnterpriseID")]
    pub enterprise_id: String,
    #[serde(rename = "ResidentName")]
    pub resident_name: String,
    #[serde(rename = "PreferredName")]
    pub preferred_name: String,
    #[serde(rename = "Age")]
    pub age: String,
    #[serde(rename = "BirthDate")]
    pub birth_date: String,
    #[serde(rename = "Gender")]
    pub gender: String,

    #[serde(rename = "Phone")]
    pub phone: String,
    #[serde(rename = "EmailAddress")]
    pub email_address: String,
    #[serde(rename = "PrimaryResidence")]
    pub primary_residence: String,
    #[serde(rename = "County")]
    pub county: String,

    #[serde(rename = "OrgLocation")]
    pub org_location: String,
    #[serde(rename = "FacilityName")]
    pub facility_name: String,
    #[serde(rename = "AdmitDate")]
    pub admit_date: String,
    #[serde(rename = "AdmitTime")]
    pub admit_time: String,
    #[serde(rename = "DischargeDate")]
    pub discharge_date: String,
    #[serde(rename = "LevelOfCare")]
    pub level_of_care: String,

    #[serde(rename = "SocSecNum")]
    pub soc_sec_num: String,
    #[serde(rename = "MedicaidNum")]
    pub medicaid_num: String,
    #[serde(rename = "MedicareANum")]
    pub medicare_a_num: String,
    #[serde(rename = "MedicareBNum")]
    pub medicare_b_num: String,
    #[serde(rename = "OtherInsNum")]
    pub other_ins_num: String,

    #[serde(rename = "AdmittingDiagICD1Hdr")]
    pub admitting_diag_icd1_hdr: String,
    #[serde(rename = "AdmittingDiagICD1")]
    pub admitting_diag_icd1: String,
    #[serde(rename = "AdmittingDiagICD2Hdr")]
    pub admitting_diag_icd2_hdr: String,
    #[serde(rename = "AdmittingDiagICD2")]
    pub admitting_diag_icd2: String,
    #[serde(rename = "OtherDiagICD1Hdr")]
    pub other_diag_icd1_hdr: String,
    #[serde(rename = "OtherDiagICD1")]
    pub other_diag_icd1: String,
    #[serde(rename = "OtherDiagICD2Hdr")]
    pub other_diag_icd2_hdr: String,
    #[serde(rename = "OtherDiagICD2")]
    pub other_diag_icd2: String,

    #[serde(rename = "Allergies")]
    pub allergies: String,
    #[serde(rename = "Medications")]
    pub medications: String,
    #[serde(rename = "AdvancedDirectives")]
    pub advanced_directives: String,
    #[serde(rename = "ClinicalAlerts")]
    pub clinical_alerts: String,
    #[serde(rename = "PsychotherapyAlerts")]
    pub psychotherapy_alerts: String,

    #[serde(rename = "Religion")]
    pub religion: String,
    #[serde(rename = "PrimaryLanguage")]
    pub primary_language: String,
    #[serde(rename = "Nationality")]
    pub nationality: String,
    #[serde(rename = "Ethnicity")]
    pub ethnicity: String,
    #[serde(rename = "MaritalStatusDesc")]
    pub marital_status_desc: String,

    #[serde(rename = "physicians")]
    #[schema(value_type = Vec<Object>)]
    pub physicians: Vec<serde_json::Value>,
    #[serde(rename = "relatedParties")]
    #[schema(value_type = Vec<Object>)]
    pub related_parties: Vec<serde_json::Value>,
    #[serde(rename = "otherParties")]
    #[schema(value_type = Vec<Object>)]
    pub other_parties: Vec<serde_json::Value>,
    #[serde(rename = "stays")]
    #[schema(value_type = Vec<Object>)]
    pub stays: Vec<serde_json::Value>,
    #[serde(rename = "surgicalProcedures")]
    #[schema(value_type = Vec<Object>)]
    pub surgical_procedures: Vec<serde_json::Value>,
    #[serde(rename = "referralAgencies")]
    #[schema(value_type = Vec<Object>)]
    pub referral_agencies: Vec<serde_json::Value>,
    #[serde(rename = "notes")]
    #[schema(value_type = Vec<Object>)]
    pub notes: Vec<serde_json::Value>,
}

/// Resident aggregate as persisted and served.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Resident {
    #[serde(rename = "ResidentID")]
    #[schema(value_type = String)]
    pub id: ResidentId,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[schema(value_type = String)]
    pub facility: FacilityName,
    /// Serialised as `{}` when the resident has no facesheet.
    #[serde(default, with = "facesheet_or_empty")]
    pub facesheet: Option<Facesheet>,
    #[serde(default)]
    pub medications: Vec<ClinicalEntry>,
    #[serde(default)]
    pub treatments: Vec<ClinicalEntry>,
    #[serde(default)]
    pub orders: Vec<ClinicalEntry>,
}

impl Resident {
    /// A resident with identity only and no clinical data.
    pub fn new(id: ResidentId, name: impl Into<String>, facility: FacilityName) -> Self {
        Self {
            id,
            name: name.into(),
            facility,
            facesheet: None,
            medications: Vec::new(),
            treatments: Vec::new(),
            orders: Vec::new(),
        }
    }

    pub fn has_facesheet(&self) -> bool {
        self.facesheet.is_some()
    }

    /// Mutable access to the entry sequence a clinical record kind feeds.
    ///
    /// Returns `None` for [`RecordKind::Facesheet`].
    pub fn entries_mut(&mut self, kind: RecordKind) -> Option<&mut Vec<ClinicalEntry>> {
        match kind {
            RecordKind::Facesheet => None,
            RecordKind::Medication => Some(&mut self.medications),
            RecordKind::Treatment => Some(&mut self.treatments),
            RecordKind::Order => Some(&mut self.orders),
        }
    }
}

mod facesheet_or_empty {
    use super::Facesheet;
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(value: &Option<Facesheet>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(facesheet) => facesheet.serialize(serializer),
            None => serializer.serialize_map(Some(0))?.end(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Facesheet>, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Only the `{}` placeholder means "no facesheet"; a facesheet with blank fields is kept.
        match Option::<serde_json::Value>::deserialize(deserializer)? {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(serde_json::Value::Object(map)) if map.is_empty() => Ok(None),
            Some(value) => Facesheet::deserialize(value)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_values_skip_absent_and_empty_days() {
        let days = DayValues::from_lookup(|key| match key {
            "d1" => Some("Given"),
            "d2" => Some(""),
            "d31" => Some("Refused"),
            "d32" => Some("ignored"),
            _ => None,
        });

        assert_eq!(days.len(), 2);
        assert_eq!(days.get(1), Some("Given"));
        assert_eq!(days.get(2), None);
        assert_eq!(days.get(31), Some("Refused"));
    }

    #[test]
    fn day_values_serialise_in_day_order() {
        let days = DayValues::from_lookup(|key| match key {
            "d2" | "d10" | "d1" => Some("x"),
            _ => None,
        });

        let json = serde_json::to_string(&days).unwrap();
        assert_eq!(json, r#"{"d1":"x","d2":"x","d10":"x"}"#);
    }

    #[test]
    fn day_values_reject_out_of_range_keys() {
        let result: Result<DayValues, _> = serde_json::from_str(r#"{"d32":"x"}"#);
        assert!(result.is_err());

        let result: Result<DayValues, _> = serde_json::from_str(r#"{"day1":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn resident_without_facesheet_serialises_empty_object() {
        let resident = Resident::new(
            ResidentId::new("9").unwrap(),
            "",
            FacilityName::new("FAC_A").unwrap(),
        );

        let value = serde_json::to_value(&resident).unwrap();
        assert_eq!(value["ResidentID"], "9");
        assert_eq!(value["facility"], "FAC_A");
        assert_eq!(value["facesheet"], serde_json::json!({}));

        let back: Resident = serde_json::from_value(value).unwrap();
        assert_eq!(back.facesheet, None);
        assert!(!back.has_facesheet());
    }

    #[test]
    fn blank_facesheet_still_counts_as_present() {
        let mut resident = Resident::new(
            ResidentId::new("5003").unwrap(),
            "",
            FacilityName::new("FAC_A").unwrap(),
        );
        resident.facesheet = Some(Facesheet::default());
        assert!(resident.has_facesheet());

        let value = serde_json::to_value(&resident).unwrap();
        assert_ne!(value["facesheet"], serde_json::json!({}));

        let back: Resident = serde_json::from_value(value).unwrap();
        assert_eq!(back.facesheet, Some(Facesheet::default()));
        assert!(back.has_facesheet());
    }

    #[test]
    fn partial_documents_deserialise_with_defaults() {
        let resident: Resident = serde_json::from_str(
            r#"{
                "ResidentID": "20001",
                "Name": "Protea Resident 20001",
                "facility": "PROTEA_LTC",
                "facesheet": { "Age": "72", "EmergencyContact": "ignored" },
                "medications": [ { "description": "Multivitamin", "hasAdmins": true } ]
            }"#,
        )
        .unwrap();

        assert!(resident.has_facesheet());
        assert_eq!(resident.facesheet.as_ref().unwrap().age, "72");
        assert_eq!(resident.medications[0].description, "Multivitamin");
        assert!(resident.medications[0].administrations.is_empty());
        assert!(resident.orders.is_empty());
    }

    #[test]
    fn kind_lookup_by_file_name() {
        assert_eq!(
            RecordKind::from_file_name("MED_data.html"),
            Some(RecordKind::Medication)
        );
        assert_eq!(RecordKind::from_file_name("notes.html"), None);
    }
}

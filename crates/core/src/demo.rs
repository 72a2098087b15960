//! Generated demo residents.
//!
//! IDs of the form `X00NN` (X in 2..=5, NN in 01..=21) address fictional residents that are
//! synthesised on request and never read from storage. Every field is a pure function of the ID.

use records::{AdministrationWindow, ClinicalEntry, Facesheet, OrderCategory, Resident};
use regex::Regex;
use rt_types::{FacilityName, ResidentId};
use std::sync::LazyLock;

static DEMO_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[2-5]00(0[1-9]|1[0-9]|2[0-1])$").expect("demo id pattern is valid")
});

const AGES: [u32; 8] = [68, 72, 75, 78, 81, 84, 87, 90];
const GENDERS: [&str; 2] = ["Male", "Female"];
const MARITAL_STATUSES: [&str; 4] = ["Married", "Widowed", "Single", "Divorced"];
const DEMO_BEGIN_DATE: &str = "2024-01-01";

/// Facility bucket selected by the first digit of a demo ID.
struct DemoFacility {
    name: &'static str,
    level_of_care: &'static str,
}

fn demo_facility(id: &str) -> DemoFacility {
    match id.as_bytes().first() {
        Some(b'2') => DemoFacility {
            name: "PROTEA_LTC",
            level_of_care: "Long Term Care",
        },
        Some(b'3') => DemoFacility {
            name: "PROTEA_RC",
            level_of_care: "Residential Care",
        },
        Some(b'4') => DemoFacility {
            name: "PROTEA_OP",
            level_of_care: "Outpatient Services",
        },
        _ => DemoFacility {
            name: "PROTEA_DAY",
            level_of_care: "Day Services",
        },
    }
}

pub fn is_demo_id(id: &str) -> bool {
    DEMO_ID_PATTERN.is_match(id)
}

/// Builds the demo resident for `id`, or `None` if `id` is not a demo ID.
pub fn demo_resident(id: &str) -> Option<Resident> {
    if !is_demo_id(id) {
        return None;
    }

    // The pattern guarantees five ASCII digits.
    let digits: Vec<u32> = id.chars().filter_map(|c| c.to_digit(10)).collect();
    let last = digits[4];
    let last_two = digits[3] * 10 + last;

    let facility = demo_facility(id);
    let age = AGES[(last_two % 8) as usize];
    let name = format!("Protea Resident {id}");

    let facesheet = Facesheet {
        internal_id: id.to_owned(),
        resident_name: name.clone(),
        age: age.to_string(),
        birth_date: format!("{}-0{}-{}", 1900 + 124 - age, last % 9 + 1, 10 + last_two % 18),
        gender: GENDERS[(last % 2) as usize].to_owned(),
        marital_status_desc: MARITAL_STATUSES[(last_two % 4) as usize].to_owned(),
        facility_name: facility.name.to_owned(),
        level_of_care: facility.level_of_care.to_owned(),
        allergies: "NKDA (No Known Drug Allergies)".to_owned(),
        admitting_diag_icd1: "General Medical Care".to_owned(),
        advanced_directives: "On file".to_owned(),
        primary_language: "English".to_owned(),
        ..Default::default()
    };

    let medication = ClinicalEntry {
        order_id: format!("{id}-MED-1"),
        description: "Multivitamin 1 Tablet".to_owned(),
        quantity: "1".to_owned(),
        dosage_form: "Tablet".to_owned(),
        route: "Oral".to_owned(),
        frequency: "Daily".to_owned(),
        begin_date: Some(DEMO_BEGIN_DATE.to_owned()),
        notes: "General health maintenance".to_owned(),
        is_original_drug: true,
        has_admins: true,
        administrations: vec![AdministrationWindow {
            time_desc: "08:00".to_owned(),
            ..Default::default()
        }],
        ..Default::default()
    };

    let treatment = ClinicalEntry {
        order_id: format!("{id}-TRE-1"),
        order_type: "Nursing".to_owned(),
        description: "General Care Activities".to_owned(),
        frequency: "Daily".to_owned(),
        begin_date: Some(DEMO_BEGIN_DATE.to_owned()),
        instructions: "Standard care protocols".to_owned(),
        notes: "Routine care and monitoring".to_owned(),
        ..Default::default()
    };

    let order = ClinicalEntry {
        order_id: format!("{id}-ORD-1"),
        order_type: "Assessment".to_owned(),
        description: "Annual Physical Assessment".to_owned(),
        begin_date: Some("2024-02-01".to_owned()),
        test_priority: "Routine".to_owned(),
        test_priority_desc: "Routine".to_owned(),
        instructions: "Complete annual assessment".to_owned(),
        notes: "Standard annual review".to_owned(),
        category: Some(OrderCategory::Other),
        ..Default::default()
    };

    let resident_id = ResidentId::new(id).ok()?;
    let facility_name = FacilityName::new(facility.name).ok()?;
    let mut resident = Resident::new(resident_id, name, facility_name);
    resident.facesheet = Some(facesheet);
    resident.medications.push(medication);
    resident.treatments.push(treatment);
    resident.orders.push(order);
    Some(resident)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_demo_ids() {
        for id in ["20001", "30009", "40010", "50021", "20019"] {
            assert!(is_demo_id(id), "{id}");
        }
        for id in ["10001", "60001", "20000", "20022", "2001", "200011", "5001", " 20001"] {
            assert!(!is_demo_id(id), "{id}");
        }
    }

    #[test]
    fn facility_bucket_follows_prefix() {
        let facilities: Vec<_> = ["20001", "30001", "40001", "50001"]
            .into_iter()
            .map(|id| demo_resident(id).unwrap().facility.to_string())
            .collect();
        assert_eq!(
            facilities,
            vec!["PROTEA_LTC", "PROTEA_RC", "PROTEA_OP", "PROTEA_DAY"]
        );
    }

    #[test]
    fn demo_resident_is_deterministic_and_complete() {
        let first = demo_resident("30012").unwrap();
        assert_eq!(first, demo_resident("30012").unwrap());

        assert_eq!(first.id.as_str(), "30012");
        assert_eq!(first.name, "Protea Resident 30012");
        let facesheet = first.facesheet.as_ref().unwrap();
        // last two digits 12: age index 4, marital index 0; last digit 2: gender index 0
        assert_eq!(facesheet.age, "81");
        assert_eq!(facesheet.birth_date, "1943-03-22");
        assert_eq!(facesheet.gender, "Male");
        assert_eq!(facesheet.marital_status_desc, "Married");
        assert_eq!(first.medications.len(), 1);
        assert_eq!(first.treatments.len(), 1);
        assert_eq!(first.orders[0].category, Some(OrderCategory::Other));
        assert!(first.medications[0].has_admins);
        assert!(!first.medications[0].administrations.is_empty());
    }

    #[test]
    fn non_demo_ids_are_not_generated() {
        assert!(demo_resident("5001").is_none());
    }
}

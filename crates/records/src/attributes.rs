//! Typed field extraction from export element attributes.
//!
//! Attribute conventions of the exports:
//! - text fields default to the empty string when absent,
//! - boolean flags are true only for the literal `"1"`,
//! - day columns are the sparse `d1`..`d31` attributes.

use crate::category::categorise_order;
use crate::model::{
    AdministrationWindow, ClinicalEntry, DayValues, Facesheet, PhysicalMonitoring,
    PrnAdministration, PrnFollowUp, RecordKind,
};
use crate::xml::XmlElement;

pub const ORDER_ELEMENT: &str = "Order";
pub const ADMIN_TIME_ELEMENT: &str = "adminTime";
pub const FOLLOW_UP_ELEMENT: &str = "followupTime";
pub const PRN_ADMIN_ELEMENT: &str = "PRNAdmin";
pub const MONITORING_ELEMENT: &str = "pm";

impl XmlElement {
    /// Attribute value, or the empty string when absent.
    pub fn text(&self, name: &str) -> String {
        self.attr(name).unwrap_or_default().to_owned()
    }

    /// Attribute value when present and non-empty.
    pub fn optional(&self, name: &str) -> Option<String> {
        self.attr(name)
            .filter(|value| !value.is_empty())
            .map(str::to_owned)
    }

    /// `"1"` is true, anything else (including absence) is false.
    pub fn flag(&self, name: &str) -> bool {
        self.attr(name) == Some("1")
    }

    pub fn day_values(&self) -> DayValues {
        DayValues::from_lookup(|key| self.attr(key))
    }
}

// ============================================================================
// Facesheet
// ============================================================================

pub fn facesheet_from(receiver: &XmlElement) -> Facesheet {
    Facesheet {
        internal_id: receiver.text("InternalID"),
        admission_id: receiver.text("AdmissionID"),
        enterprise_id: receiver.text("EnterpriseID"),
        resident_name: receiver.text("ResidentName"),
        preferred_name: receiver.text("PreferredName"),
        age: receiver.text("Age"),
        birth_date: receiver.text("BirthDate"),
        gender: receiver.text("Gender"),

        phone: receiver.text("Phone"),
        email_address: receiver.text("EmailAddress"),
        primary_residence: receiver.text("PrimaryResidence"),
        county: receiver.text("County"),

        org_location: receiver.text("OrgLocation"),
        facility_name: receiver.text("FacilityName"),
        admit_date: receiver.text("AdmitDate"),
        admit_time: receiver.text("AdmitTime"),
        discharge_date: receiver.text("DischargeDate"),
        level_of_care: receiver.text("LevelOfCare"),

        soc_sec_num: receiver.text("SocSecNum"),
        medicaid_num: receiver.text("MedicaidNum"),
        medicare_a_num: receiver.text("MedicareANum"),
        medicare_b_num: receiver.text("MedicareBNum"),
        other_ins_num: receiver.text("OtherInsNum"),

        admitting_diag_icd1_hdr: receiver.text("AdmittingDiagICD1Hdr"),
        admitting_diag_icd1: receiver.text("AdmittingDiagICD1"),
        admitting_diag_icd2_hdr: receiver.text("AdmittingDiagICD2Hdr"),
        admitting_diag_icd2: receiver.text("AdmittingDiagICD2"),
        other_diag_icd1_hdr: receiver.text("OtherDiagICD1Hdr"),
        other_diag_icd1: receiver.text("OtherDiagICD1"),
        other_diag_icd2_hdr: receiver.text("OtherDiagICD2Hdr"),
        other_diag_icd2: receiver.text("OtherDiagICD2"),

        allergies: receiver.text("Allergies"),
        medications: receiver.text("Medications"),
        advanced_directives: receiver.text("AdvancedDirectives"),
        clinical_alerts: receiver.text("ClinicalAlerts"),
        psychotherapy_alerts: receiver.text("PsychotherapyAlerts"),

        religion: receiver.text("Religion"),
        primary_language: receiver.text("PrimaryLanguage"),
        nationality: receiver.text("Nationality"),
        ethnicity: receiver.text("Ethnicity"),
        marital_status_desc: receiver.text("MaritalStatusDesc"),

        // Sub-element parsing for parties, stays, procedures, referrals and notes is not done.
        ..Facesheet::default()
    }
}

// ============================================================================
// Clinical entries
// ============================================================================

/// Builds one clinical entry from an `Order` element.
///
/// `hasAdmins` is what the element declares in its `hasadmins` attribute, independent of how
/// many administration windows were actually exported.
pub fn clinical_entry_from(order: &XmlElement, kind: RecordKind) -> ClinicalEntry {
    let administrations: Vec<AdministrationWindow> = order
        .find_all(ADMIN_TIME_ELEMENT)
        .into_iter()
        .map(administration_window_from)
        .collect();

    let has_admins = order.flag("hasadmins");
    if has_admins == administrations.is_empty() {
        tracing::debug!(
            "{} order {:?} declares hasadmins={} but has {} administration windows",
            kind.label(),
            order.attr("ResOrderSys").unwrap_or_default(),
            has_admins,
            administrations.len()
        );
    }

    let order_type = order.text("OrderTypeFullDesc");
    let description = order.text("Description");
    let category = (kind == RecordKind::Order).then(|| categorise_order(&order_type, &description));

    ClinicalEntry {
        order_id: order.text("ResOrderSys"),
        order_number: order.text("resordernum"),
        order_total: order.text("resordertotal"),
        order_type,

        description,
        quantity: order.text("Quantity"),
        dosage_form: order.text("DosageForm"),
        route: order.text("Route"),
        frequency: order.text("Frequency"),

        begin_date: order.optional("BeginDate"),
        end_date: order.optional("EndDate"),

        notes: order.text("Notes"),
        instructions: order.text("Instructions"),
        treatment_range: order.text("TreatmentRange"),

        // The export misspells "Collected" in both attribute names.
        specimen_collected_by: order.text("SpecimenCollctedBy"),
        specimen_collected_by_desc: order.text("SpecimenCollctedByDesc"),
        specimen: order.text("Specimen"),
        specimen_desc: order.text("SpecimenDesc"),
        test_priority: order.text("TestPriority"),
        test_priority_desc: order.text("TestPriorityDesc"),

        is_original_drug: order.flag("isOriginalDrug"),
        gen_sub_date_active: order.text("genSubDateActive"),

        has_admins,
        administrations,
        category,
    }
}

/// Builds a window from an `adminTime` or `followupTime` element.
///
/// Nested follow-up windows are parsed recursively; monitoring rows and PRN events are scoped to
/// the window that directly encloses them.
pub fn administration_window_from(window: &XmlElement) -> AdministrationWindow {
    AdministrationWindow {
        time_desc: window.text("timeDesc"),
        is_prn: window.flag("isPRN"),
        daily_admins: window.day_values(),
        physical_monitoring: window
            .find_scoped(MONITORING_ELEMENT, &[FOLLOW_UP_ELEMENT, PRN_ADMIN_ELEMENT])
            .into_iter()
            .map(physical_monitoring_from)
            .collect(),
        follow_ups: window
            .find_scoped(FOLLOW_UP_ELEMENT, &[PRN_ADMIN_ELEMENT])
            .into_iter()
            .map(administration_window_from)
            .collect(),
        prn_administrations: window
            .find_scoped(PRN_ADMIN_ELEMENT, &[FOLLOW_UP_ELEMENT])
            .into_iter()
            .map(prn_administration_from)
            .collect(),
    }
}

pub fn physical_monitoring_from(pm: &XmlElement) -> PhysicalMonitoring {
    PhysicalMonitoring {
        pm_type: pm.text("pmType"),
        is_follow_up: pm.flag("isFupPM"),
        date: pm.text("date"),
        time: pm.text("time"),
        description: pm.text("desc"),
        result: pm.text("res"),
        initials: pm.text("init"),
        daily_data: pm.day_values(),
    }
}

pub fn prn_administration_from(prn: &XmlElement) -> PrnAdministration {
    let follow_up = PrnFollowUp {
        shown: prn.flag("showfu"),
        date: prn.text("fudate"),
        time: prn.text("futime"),
        result: prn.text("fures"),
        initials: prn.text("fuinit"),
    };
    let has_follow_up = follow_up != PrnFollowUp::default();

    PrnAdministration {
        date: prn.text("date"),
        time: prn.text("time"),
        status: prn.text("status"),
        result: prn.text("res"),
        initials: prn.text("init"),
        follow_up: has_follow_up.then_some(follow_up),
        physical_monitoring: prn
            .find_scoped(MONITORING_ELEMENT, &[FOLLOW_UP_ELEMENT])
            .into_iter()
            .map(physical_monitoring_from)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OrderCategory;

    fn order(xml: &str) -> XmlElement {
        let doc = XmlElement::parse_document(xml).unwrap();
        doc.find_all(ORDER_ELEMENT)[0].clone()
    }

    #[test]
    fn flags_are_literal_one_only() {
        let el = order(r#"<Order isOriginalDrug="1" hasadmins="true"/>"#);
        assert!(el.flag("isOriginalDrug"));
        assert!(!el.flag("hasadmins"));
        assert!(!el.flag("missing"));
    }

    #[test]
    fn entry_fields_and_optional_dates() {
        let el = order(
            r#"<Order ResOrderSys="77" Description="Aspirin 81mg" Route="Oral"
                      BeginDate="2024-01-15" EndDate="" SpecimenCollctedBy="RN"/>"#,
        );
        let entry = clinical_entry_from(&el, RecordKind::Medication);

        assert_eq!(entry.order_id, "77");
        assert_eq!(entry.description, "Aspirin 81mg");
        assert_eq!(entry.route, "Oral");
        assert_eq!(entry.begin_date.as_deref(), Some("2024-01-15"));
        assert_eq!(entry.end_date, None);
        assert_eq!(entry.specimen_collected_by, "RN");
        assert_eq!(entry.category, None);
        assert!(!entry.has_admins);
    }

    #[test]
    fn has_admins_follows_declared_attribute() {
        let declared_without_windows = order(r#"<Order Description="X" hasadmins="1"/>"#);
        let entry = clinical_entry_from(&declared_without_windows, RecordKind::Order);
        assert!(entry.has_admins);
        assert!(entry.administrations.is_empty());

        let windows_without_flag = order(r#"<Order><adminTime d3="Done"/></Order>"#);
        let entry = clinical_entry_from(&windows_without_flag, RecordKind::Treatment);
        assert!(!entry.has_admins);
        assert_eq!(entry.administrations.len(), 1);
    }

    #[test]
    fn only_orders_are_categorised() {
        let el = order(r#"<Order OrderTypeFullDesc="Lab" Description="CBC"/>"#);
        assert_eq!(
            clinical_entry_from(&el, RecordKind::Order).category,
            Some(OrderCategory::Laboratory)
        );
        assert_eq!(clinical_entry_from(&el, RecordKind::Medication).category, None);
    }

    #[test]
    fn nested_window_structure_is_scoped() {
        let el = order(
            r#"<Order hasadmins="1">
                 <adminTime timeDesc="08:00" isPRN="0" d1="Given" d15="Held">
                   <pm pmType="BP" isFupPM="0" d1="120/80"/>
                   <followupTime timeDesc="09:00" d1="OK">
                     <pm pmType="Pulse" isFupPM="1" d1="72"/>
                   </followupTime>
                   <PRNAdmin date="2024-02-01" time="10:00" status="Given" res="Effective"
                             init="AB" showfu="1" fudate="2024-02-01" fures="Calm" fuinit="CD">
                     <pm pmType="Pain" res="2"/>
                   </PRNAdmin>
                 </adminTime>
               </Order>"#,
        );
        let entry = clinical_entry_from(&el, RecordKind::Medication);
        let window = &entry.administrations[0];

        assert_eq!(window.time_desc, "08:00");
        assert!(!window.is_prn);
        assert_eq!(window.daily_admins.len(), 2);
        assert_eq!(window.daily_admins.get(15), Some("Held"));

        assert_eq!(window.physical_monitoring.len(), 1);
        assert_eq!(window.physical_monitoring[0].pm_type, "BP");
        assert_eq!(window.physical_monitoring[0].daily_data.get(1), Some("120/80"));

        assert_eq!(window.follow_ups.len(), 1);
        let follow_up = &window.follow_ups[0];
        assert_eq!(follow_up.daily_admins.get(1), Some("OK"));
        assert_eq!(follow_up.physical_monitoring.len(), 1);
        assert!(follow_up.physical_monitoring[0].is_follow_up);

        assert_eq!(window.prn_administrations.len(), 1);
        let prn = &window.prn_administrations[0];
        assert_eq!(prn.result, "Effective");
        assert_eq!(prn.physical_monitoring[0].result, "2");
        let prn_follow_up = prn.follow_up.as_ref().unwrap();
        assert!(prn_follow_up.shown);
        assert_eq!(prn_follow_up.result, "Calm");
        assert_eq!(prn_follow_up.time, "");
    }

    #[test]
    fn prn_without_follow_up_attributes_has_none() {
        let el = order(r#"<Order><adminTime isPRN="1"><PRNAdmin status="Given"/></adminTime></Order>"#);
        let entry = clinical_entry_from(&el, RecordKind::Medication);
        let window = &entry.administrations[0];

        assert!(window.is_prn);
        assert_eq!(window.prn_administrations[0].follow_up, None);
    }

    #[test]
    fn facesheet_reads_fixed_attribute_set() {
        let doc = XmlElement::parse_document(
            r#"<CareReceiver InternalID="5001" ResidentName="Doe, Jane" AdmittingDiagICD1="I50.9"
                             MedicareANum="123A" Unrelated="x"/>"#,
        )
        .unwrap();
        let facesheet = facesheet_from(&doc.find_all("CareReceiver")[0]);

        assert_eq!(facesheet.internal_id, "5001");
        assert_eq!(facesheet.resident_name, "Doe, Jane");
        assert_eq!(facesheet.admitting_diag_icd1, "I50.9");
        assert_eq!(facesheet.medicare_a_num, "123A");
        assert!(facesheet.physicians.is_empty());
    }
}

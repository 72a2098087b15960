//! Raw export fixtures shared by the core tests.

use crate::CoreConfig;
use records::RecordKind;
use std::fs;
use std::path::PathBuf;

/// Facesheet payload with one resident, `5001`.
pub const FACESHEET_5001: &str = r#"<Root>
  <CareReceiver InternalID="5001" ResidentName="Jane Doe" Age="82" Gender="Female"
                Allergies="Penicillin" LevelOfCare="Skilled"/>
</Root>"#;

/// Medication payload for `5001` (with one administration) and `9999` (no facesheet).
pub const MED_5001_AND_9999: &str = r#"<Root>
  <CareReceiver InternalID="5001">
    <Order Description="Aspirin 81mg" hasadmins="1" BeginDate="2024-01-01">
      <adminTime timeDesc="08:00" d1="Given"/>
    </Order>
  </CareReceiver>
  <CareReceiver InternalID="9999">
    <Order Description="Warfarin 2mg"/>
  </CareReceiver>
</Root>"#;

/// Writes one export of `kind` for `facility` under the configured raw root.
pub fn write_export(cfg: &CoreConfig, facility: &str, kind: RecordKind, payload: &str) -> PathBuf {
    let dir = cfg.raw_data_dir().join(facility);
    fs::create_dir_all(&dir).expect("create facility dir");
    let path = dir.join(kind.file_name());
    let html = format!(
        "<html><head><script id=\"{}\" type=\"text/xml\">{payload}</script></head>\
         <body></body></html>",
        kind.marker_id()
    );
    fs::write(&path, html).expect("write export");
    path
}

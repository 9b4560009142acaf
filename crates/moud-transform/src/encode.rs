//! Categorical encoding of demographic codes and treatment indicators.

use moud_model::codelist::{self, Codelist};
use moud_model::{EncodedCategory, Medication, PatientRecord, TreatmentStatus};

/// Encode one raw code against a codelist.
///
/// Codes outside the list come back as an explicit unmapped category;
/// dropping them would corrupt breakdown denominators.
pub fn encode_code(list: &Codelist, raw: &str) -> EncodedCategory {
    match list.label_for(raw) {
        Some(label) => EncodedCategory::Mapped(label),
        None => EncodedCategory::Unmapped(raw.trim().to_string()),
    }
}

/// Encode one raw demographic code for a column.
///
/// Returns `None` when no codelist covers the column.
pub fn encode_demographic(column: &str, raw: &str) -> Option<EncodedCategory> {
    codelist::codelist_for(column).map(|list| encode_code(list, raw))
}

/// Derive the treatment-status set from a record's medication indicators.
///
/// An indicator of `"1"` puts the medication in the set; `"0"`, any other
/// value, and (post-resolution) absence leave it out. The result is always
/// a concrete set, never unknown: an empty set means off MOUD at this
/// timepoint.
pub fn treatment_status(record: &PatientRecord) -> TreatmentStatus {
    Medication::ALL
        .into_iter()
        .filter(|medication| record.field_text(medication.indicator_column()) == Some("1"))
        .collect()
}

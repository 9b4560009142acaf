//! Patient records and per-timepoint cohorts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{PatientId, Timepoint};

/// A single cell value from a snapshot export.
///
/// `Missing` marks blank, whitespace-only, or absent cells. The distinction
/// from `Text("0")` is load-bearing: the resolver's per-class policies key
/// on it, and a false empty string must never read as a valid zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum FieldValue {
    Text(String),
    Missing,
}

impl FieldValue {
    /// Normalize a raw CSV cell. Surrounding whitespace is trimmed;
    /// anything left empty is `Missing`.
    pub fn from_raw(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            FieldValue::Missing
        } else {
            FieldValue::Text(trimmed.to_string())
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(value) => Some(value),
            FieldValue::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }
}

/// One row of one timepoint snapshot: a patient's raw field mapping.
///
/// Created by the ingestor; mutated only by the resolver (imputed fields);
/// read-only for the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub patient_id: PatientId,
    pub timepoint: Timepoint,
    pub fields: BTreeMap<String, FieldValue>,
}

impl PatientRecord {
    pub fn new(patient_id: PatientId, timepoint: Timepoint) -> Self {
        Self {
            patient_id,
            timepoint,
            fields: BTreeMap::new(),
        }
    }

    /// The field's value; absent fields read as `Missing`.
    pub fn field(&self, name: &str) -> &FieldValue {
        self.fields.get(name).unwrap_or(&FieldValue::Missing)
    }

    /// Non-missing text for the field, if any.
    pub fn field_text(&self, name: &str) -> Option<&str> {
        self.field(name).as_text()
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }
}

/// All records for one timepoint.
///
/// Invariants: no duplicate `patient_id` (enforced at ingest) and
/// `records.len() == declared_response_count` (checked before publication).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cohort {
    pub timepoint: Timepoint,
    /// Header columns in source order.
    pub columns: Vec<String>,
    pub records: Vec<PatientRecord>,
    declared_response_count: usize,
}

impl Cohort {
    pub fn new(timepoint: Timepoint, columns: Vec<String>) -> Self {
        Self {
            timepoint,
            columns,
            records: Vec::new(),
            declared_response_count: 0,
        }
    }

    pub fn push_record(&mut self, record: PatientRecord) {
        self.records.push(record);
    }

    /// Record the response count declared for this snapshot. The ingestor
    /// sets this once, after the last row.
    pub fn declare_response_count(&mut self, count: usize) {
        self.declared_response_count = count;
    }

    pub fn declared_response_count(&self) -> usize {
        self.declared_response_count
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, patient_id: &PatientId) -> Option<&PatientRecord> {
        self.records
            .iter()
            .find(|record| &record.patient_id == patient_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_whitespace_normalize_to_missing() {
        assert_eq!(FieldValue::from_raw(""), FieldValue::Missing);
        assert_eq!(FieldValue::from_raw("   "), FieldValue::Missing);
        assert_eq!(FieldValue::from_raw("\t"), FieldValue::Missing);
    }

    #[test]
    fn zero_is_not_missing() {
        let value = FieldValue::from_raw("0");
        assert_eq!(value, FieldValue::Text("0".to_string()));
        assert!(!value.is_missing());
    }

    #[test]
    fn absent_field_reads_as_missing() {
        let record = PatientRecord::new(
            PatientId::new("1001").unwrap(),
            Timepoint::Baseline,
        );
        assert!(record.field("sex").is_missing());
        assert_eq!(record.field_text("sex"), None);
    }

    #[test]
    fn cohort_lookup_by_patient() {
        let mut cohort = Cohort::new(Timepoint::Month3, vec!["CID".to_string()]);
        let id = PatientId::new("7").unwrap();
        cohort.push_record(PatientRecord::new(id.clone(), Timepoint::Month3));
        cohort.declare_response_count(cohort.len());

        assert_eq!(cohort.len(), 1);
        assert_eq!(cohort.declared_response_count(), 1);
        assert!(cohort.get(&id).is_some());
        assert!(cohort.get(&PatientId::new("8").unwrap()).is_none());
    }
}

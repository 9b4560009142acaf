//! Cross-timepoint patient join.
//!
//! A pure key-based merge over immutable per-timepoint cohorts, built once
//! per run. Absence of a record at a timepoint is attrition, never an
//! error; inconsistent demographics after resolution are a broken join and
//! abort the run.

use std::collections::BTreeMap;

use moud_model::{
    Cohort, PatientId, PatientRecord, Timepoint, TreatmentStatus, ValidationError, VariableClass,
};
use moud_transform::{ColumnClassification, treatment_status};

/// One patient's records and derived treatment status across timepoints.
#[derive(Debug)]
pub struct LongitudinalPatient<'a> {
    pub patient_id: PatientId,
    pub records: BTreeMap<Timepoint, &'a PatientRecord>,
    /// Status derived at join time; present only where a record is.
    pub status: BTreeMap<Timepoint, TreatmentStatus>,
}

impl<'a> LongitudinalPatient<'a> {
    fn new(patient_id: PatientId) -> Self {
        Self {
            patient_id,
            records: BTreeMap::new(),
            status: BTreeMap::new(),
        }
    }

    pub fn record_at(&self, timepoint: Timepoint) -> Option<&'a PatientRecord> {
        self.records.get(&timepoint).copied()
    }

    /// Treatment status at a timepoint. `None` means the patient has no
    /// record there (attrition); an empty set means present but off MOUD.
    pub fn status_at(&self, timepoint: Timepoint) -> Option<&TreatmentStatus> {
        self.status.get(&timepoint)
    }

    /// True when this patient was on `medication` at `timepoint`.
    /// Attrition reads as not on the medication; treatment status is
    /// never carried forward.
    pub fn on_medication_at(
        &self,
        medication: moud_model::Medication,
        timepoint: Timepoint,
    ) -> bool {
        self.status_at(timepoint)
            .is_some_and(|status| status.contains(medication))
    }
}

/// All patients joined across timepoints.
#[derive(Debug, Default)]
pub struct LongitudinalIndex<'a> {
    pub patients: BTreeMap<PatientId, LongitudinalPatient<'a>>,
}

impl<'a> LongitudinalIndex<'a> {
    pub fn get(&self, patient_id: &PatientId) -> Option<&LongitudinalPatient<'a>> {
        self.patients.get(patient_id)
    }

    pub fn len(&self) -> usize {
        self.patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }
}

/// Join cohorts into a longitudinal index.
///
/// Also asserts the post-resolution invariant that a patient's demographic
/// fields agree across all of their records; a disagreement means the
/// forward-fill contract was violated upstream and the run must not
/// publish.
pub fn join_cohorts<'a>(
    cohorts: &[&'a Cohort],
    classification: &ColumnClassification,
) -> Result<LongitudinalIndex<'a>, ValidationError> {
    let mut index = LongitudinalIndex::default();

    for cohort in cohorts {
        for record in &cohort.records {
            let patient = index
                .patients
                .entry(record.patient_id.clone())
                .or_insert_with(|| LongitudinalPatient::new(record.patient_id.clone()));
            patient.records.insert(cohort.timepoint, record);
            patient
                .status
                .insert(cohort.timepoint, treatment_status(record));
        }
    }

    check_demographic_consistency(&index, classification)?;
    Ok(index)
}

fn check_demographic_consistency(
    index: &LongitudinalIndex<'_>,
    classification: &ColumnClassification,
) -> Result<(), ValidationError> {
    let demographic_columns: Vec<&str> =
        classification.columns_in(VariableClass::Demographic).collect();

    for patient in index.patients.values() {
        for column in &demographic_columns {
            let mut seen: Option<&str> = None;
            for record in patient.records.values() {
                let Some(value) = record.field_text(column) else {
                    continue;
                };
                match seen {
                    None => seen = Some(value),
                    Some(previous) if previous != value => {
                        return Err(ValidationError::InconsistentDemographic {
                            patient: patient.patient_id.as_str().to_string(),
                            field: (*column).to_string(),
                        });
                    }
                    Some(_) => {}
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use moud_model::{FieldValue, Medication};
    use moud_transform::classify_columns;

    use super::*;

    fn record(id: &str, timepoint: Timepoint, fields: &[(&str, &str)]) -> PatientRecord {
        let mut record = PatientRecord::new(PatientId::new(id).unwrap(), timepoint);
        for (name, value) in fields {
            record.set_field((*name).to_string(), FieldValue::from_raw(value));
        }
        record
    }

    fn cohort(timepoint: Timepoint, columns: &[&str], records: Vec<PatientRecord>) -> Cohort {
        let mut cohort =
            Cohort::new(timepoint, columns.iter().map(|c| (*c).to_string()).collect());
        for item in records {
            cohort.push_record(item);
        }
        let len = cohort.len();
        cohort.declare_response_count(len);
        cohort
    }

    #[test]
    fn attrition_is_an_absent_entry_not_an_error() {
        let classification = classify_columns(["currentbup"]);
        let baseline = cohort(
            Timepoint::Baseline,
            &["currentbup"],
            vec![record("1", Timepoint::Baseline, &[("currentbup", "1")])],
        );
        let month3 = cohort(Timepoint::Month3, &["currentbup"], vec![]);

        let index = join_cohorts(&[&baseline, &month3], &classification).unwrap();
        let patient = index.get(&PatientId::new("1").unwrap()).unwrap();
        assert!(patient.record_at(Timepoint::Baseline).is_some());
        assert!(patient.record_at(Timepoint::Month3).is_none());
        assert!(patient.status_at(Timepoint::Month3).is_none());
    }

    #[test]
    fn status_is_derived_per_timepoint_without_carry_forward() {
        let classification = classify_columns(["currentbup"]);
        let baseline = cohort(
            Timepoint::Baseline,
            &["currentbup"],
            vec![record("1", Timepoint::Baseline, &[("currentbup", "1")])],
        );
        let month3 = cohort(
            Timepoint::Month3,
            &["currentbup"],
            vec![record("1", Timepoint::Month3, &[("currentbup", "0")])],
        );

        let index = join_cohorts(&[&baseline, &month3], &classification).unwrap();
        let patient = index.get(&PatientId::new("1").unwrap()).unwrap();
        assert!(patient.on_medication_at(Medication::Buprenorphine, Timepoint::Baseline));
        assert!(!patient.on_medication_at(Medication::Buprenorphine, Timepoint::Month3));
    }

    #[test]
    fn inconsistent_demographics_break_the_join() {
        let classification = classify_columns(["sex"]);
        let baseline = cohort(
            Timepoint::Baseline,
            &["sex"],
            vec![record("1", Timepoint::Baseline, &[("sex", "1")])],
        );
        let month6 = cohort(
            Timepoint::Month6,
            &["sex"],
            vec![record("1", Timepoint::Month6, &[("sex", "2")])],
        );

        let error = join_cohorts(&[&baseline, &month6], &classification).unwrap_err();
        assert!(matches!(
            error,
            ValidationError::InconsistentDemographic { ref field, .. } if field == "sex"
        ));
    }
}

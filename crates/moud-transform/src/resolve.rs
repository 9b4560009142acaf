//! Missing-data resolution.
//!
//! One policy per variable class, applied record by record. This match is
//! the single source of imputation truth; no other stage writes defaults:
//!
//! | class        | policy                                              |
//! |--------------|-----------------------------------------------------|
//! | demographic  | forward-fill from the most recent prior timepoint;  |
//! |              | a true baseline gap stays missing                   |
//! | treatment    | missing resolves to the off-MOUD indicator `"0"`    |
//! | utilization  | missing resolves to a zero count                    |
//! | outcome      | preserved missing, excluded from denominators       |
//! | identifier   | passthrough                                         |
//! | unclassified | passthrough                                         |
//!
//! Resolution is idempotent: a second pass over resolved cohorts changes
//! nothing.

use std::collections::BTreeMap;

use tracing::debug;

use moud_model::{Cohort, FieldValue, PatientId, VariableClass};

use crate::classify::ColumnClassification;

/// Counts of what one resolve pass did, for stage logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveReport {
    /// Demographic gaps filled from a prior timepoint.
    pub demographics_filled: usize,
    /// Demographic gaps with no prior value; left missing, record excluded
    /// from demographic aggregation.
    pub demographics_unresolved: usize,
    /// Treatment indicators defaulted to off-MOUD.
    pub treatments_defaulted: usize,
    /// Utilization counts defaulted to zero.
    pub utilization_zeroed: usize,
    /// Outcome values preserved missing.
    pub outcomes_preserved: usize,
}

impl ResolveReport {
    pub fn total_imputed(&self) -> usize {
        self.demographics_filled + self.treatments_defaulted + self.utilization_zeroed
    }
}

/// Resolve missing data across cohorts, in place.
///
/// Cohorts are processed in chronological timepoint order regardless of
/// slice order, so demographic forward-fill always reads from the
/// patient's most recent known value.
pub fn resolve_cohorts(
    cohorts: &mut [Cohort],
    classification: &ColumnClassification,
) -> ResolveReport {
    let mut report = ResolveReport::default();
    // Last known demographic values per patient, keyed by column.
    let mut carry: BTreeMap<PatientId, BTreeMap<String, String>> = BTreeMap::new();

    let mut order: Vec<usize> = (0..cohorts.len()).collect();
    order.sort_by_key(|&index| cohorts[index].timepoint);

    for index in order {
        let cohort = &mut cohorts[index];
        let columns = cohort.columns.clone();
        for record in &mut cohort.records {
            for column in &columns {
                match classification.class_of(column) {
                    VariableClass::Demographic => {
                        if let Some(value) = record.field_text(column) {
                            carry
                                .entry(record.patient_id.clone())
                                .or_default()
                                .insert(column.clone(), value.to_string());
                        } else if let Some(previous) = carry
                            .get(&record.patient_id)
                            .and_then(|fields| fields.get(column))
                        {
                            record
                                .set_field(column.clone(), FieldValue::Text(previous.clone()));
                            report.demographics_filled += 1;
                        } else {
                            report.demographics_unresolved += 1;
                        }
                    }
                    VariableClass::Treatment => {
                        if record.field(column).is_missing() {
                            record.set_field(column.clone(), FieldValue::Text("0".to_string()));
                            report.treatments_defaulted += 1;
                        }
                    }
                    VariableClass::Utilization => {
                        if record.field(column).is_missing() {
                            record.set_field(column.clone(), FieldValue::Text("0".to_string()));
                            report.utilization_zeroed += 1;
                        }
                    }
                    VariableClass::Outcome => {
                        if record.field(column).is_missing() {
                            report.outcomes_preserved += 1;
                        }
                    }
                    VariableClass::Identifier | VariableClass::Unclassified => {}
                }
            }
        }
        debug!(
            timepoint = %cohort.timepoint,
            records = cohort.len(),
            "cohort resolved"
        );
    }

    report
}

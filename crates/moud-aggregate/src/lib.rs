//! Longitudinal aggregation.
//!
//! Joins resolved, encoded cohorts by patient identifier and computes the
//! full metric set: response counts, demographic breakdowns, retention
//! series, utilization rates, medication usage, and outcome rates. The
//! whole set is rebuilt from scratch on every run; nothing is updated in
//! place.

pub mod join;
pub mod metrics;

use tracing::info;

use moud_model::{Cohort, PipelineOptions, Timepoint, ValidationError};
use moud_transform::ColumnClassification;

pub use join::{LongitudinalIndex, LongitudinalPatient, join_cohorts};
pub use metrics::{
    Breakdown, CategoryCount, MedicationUsagePoint, MedicationUsageSeries, OutcomePoint,
    OutcomeSeries, ResponsePoint, RetentionPoint, RetentionSeries, UtilizationPoint,
};

/// The complete derived metric set for one run.
#[derive(Debug, serde::Serialize)]
pub struct AggregateSet {
    pub response: Vec<ResponsePoint>,
    pub demographics: Vec<Breakdown>,
    pub retention: Vec<RetentionSeries>,
    pub utilization: Vec<UtilizationPoint>,
    pub medication_usage: Vec<MedicationUsageSeries>,
    pub outcomes: Vec<OutcomeSeries>,
}

/// Aggregate resolved cohorts into the full metric set.
///
/// Cohorts are taken read-only; they may arrive in any order and are
/// processed chronologically. Fails when there are no cohorts, when the
/// baseline cohort is absent (every retention denominator and the
/// demographic breakdown depend on it), when a cohort violates its
/// declared response count, or when the join uncovers inconsistent
/// demographics.
pub fn aggregate(
    cohorts: &[Cohort],
    classification: &ColumnClassification,
    options: &PipelineOptions,
) -> Result<AggregateSet, ValidationError> {
    if cohorts.is_empty() {
        return Err(ValidationError::EmptyRun);
    }

    let mut ordered: Vec<&Cohort> = cohorts.iter().collect();
    ordered.sort_by_key(|cohort| cohort.timepoint);

    for cohort in &ordered {
        if cohort.len() != cohort.declared_response_count() {
            return Err(ValidationError::ResponseCountMismatch {
                timepoint: cohort.timepoint.to_string(),
                records: cohort.len(),
                declared: cohort.declared_response_count(),
            });
        }
    }

    let baseline = ordered
        .iter()
        .copied()
        .find(|cohort| cohort.timepoint == Timepoint::Baseline)
        .ok_or_else(|| ValidationError::MissingMetric {
            metric: "baseline cohort".to_string(),
        })?;

    let index = join_cohorts(&ordered, classification)?;
    let timepoints: Vec<Timepoint> = ordered.iter().map(|cohort| cohort.timepoint).collect();

    let set = AggregateSet {
        response: metrics::response_series(&ordered),
        demographics: metrics::demographic_breakdowns(baseline, options.unmapped_policy),
        retention: metrics::retention_series(&index, &timepoints),
        utilization: metrics::utilization_series(&ordered, classification),
        medication_usage: metrics::medication_usage(&ordered),
        outcomes: metrics::outcome_series(&ordered, classification),
    };

    info!(
        patients = index.patients.len(),
        timepoints = timepoints.len(),
        breakdowns = set.demographics.len(),
        outcome_series = set.outcomes.len(),
        "aggregation complete"
    );
    Ok(set)
}

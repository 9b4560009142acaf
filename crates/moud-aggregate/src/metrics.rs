//! Per-timepoint and trend metrics.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use moud_model::codelist::{Codelist, STRATIFIERS};
use moud_model::{
    Cohort, EncodedCategory, Medication, Timepoint, UnmappedPolicy, VariableClass,
};
use moud_transform::{ColumnClassification, encode_code, treatment_status};

use crate::join::LongitudinalIndex;

fn percentage(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64 * 100.0
    }
}

// ---------------------------------------------------------------------------
// Response counts
// ---------------------------------------------------------------------------

/// Records observed at one timepoint, with the response rate relative to
/// the baseline cohort.
#[derive(Debug, Clone, Serialize)]
pub struct ResponsePoint {
    pub timepoint: Timepoint,
    pub records: usize,
    pub response_rate_pct: f64,
}

pub fn response_series(cohorts: &[&Cohort]) -> Vec<ResponsePoint> {
    let baseline_count = cohorts
        .iter()
        .find(|cohort| cohort.timepoint == Timepoint::Baseline)
        .map(|cohort| cohort.len())
        .unwrap_or(0);

    cohorts
        .iter()
        .map(|cohort| ResponsePoint {
            timepoint: cohort.timepoint,
            records: cohort.len(),
            response_rate_pct: percentage(cohort.len(), baseline_count),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Retention
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct RetentionPoint {
    pub timepoint: Timepoint,
    /// Baseline starters still on the medication at this timepoint.
    pub retained: usize,
    /// Baseline starters. Patients lost to follow-up stay in here as
    /// discontinued; the resulting downward bias is deliberate and noted
    /// in the artifact metadata.
    pub denominator: usize,
    pub rate_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RetentionSeries {
    pub medication: Medication,
    pub baseline_starters: usize,
    pub points: Vec<RetentionPoint>,
}

/// Retention per medication across the observed timepoints.
///
/// Status is evaluated strictly at each timepoint: a patient absent at an
/// intermediate wave but back on the medication later counts as
/// discontinued in between and retained at the later wave.
pub fn retention_series(
    index: &LongitudinalIndex<'_>,
    timepoints: &[Timepoint],
) -> Vec<RetentionSeries> {
    Medication::ALL
        .into_iter()
        .map(|medication| {
            let starters: Vec<_> = index
                .patients
                .values()
                .filter(|patient| patient.on_medication_at(medication, Timepoint::Baseline))
                .collect();
            let denominator = starters.len();

            let points = timepoints
                .iter()
                .map(|&timepoint| {
                    let retained = starters
                        .iter()
                        .filter(|patient| patient.on_medication_at(medication, timepoint))
                        .count();
                    RetentionPoint {
                        timepoint,
                        retained,
                        denominator,
                        rate_pct: percentage(retained, denominator),
                    }
                })
                .collect();

            RetentionSeries {
                medication,
                baseline_starters: denominator,
                points,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Utilization
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct UtilizationPoint {
    pub timepoint: Timepoint,
    pub patients: usize,
    /// Sum of all utilization-classified counts at this timepoint.
    pub total_count: u64,
    pub months_at_risk: u32,
    /// Events per patient-month over the interval.
    pub rate_per_patient_month: f64,
}

pub fn utilization_series(
    cohorts: &[&Cohort],
    classification: &ColumnClassification,
) -> Vec<UtilizationPoint> {
    cohorts
        .iter()
        .map(|cohort| {
            let columns: Vec<&str> = cohort
                .columns
                .iter()
                .map(String::as_str)
                .filter(|column| {
                    classification.class_of(column) == VariableClass::Utilization
                })
                .collect();

            let mut total_count = 0u64;
            for record in &cohort.records {
                for column in &columns {
                    let Some(text) = record.field_text(column) else {
                        continue;
                    };
                    match text.parse::<u64>() {
                        Ok(count) => total_count += count,
                        Err(_) => debug!(
                            timepoint = %cohort.timepoint,
                            column,
                            "non-numeric utilization value skipped"
                        ),
                    }
                }
            }

            let months_at_risk = cohort.timepoint.months_at_risk();
            let patient_months = cohort.len() as u64 * u64::from(months_at_risk);
            let rate_per_patient_month = if patient_months == 0 {
                0.0
            } else {
                total_count as f64 / patient_months as f64
            };

            UtilizationPoint {
                timepoint: cohort.timepoint,
                patients: cohort.len(),
                total_count,
                months_at_risk,
                rate_per_patient_month,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Demographic breakdowns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct CategoryCount {
    pub label: String,
    pub count: usize,
    pub pct: f64,
}

/// Counts and percentages for one stratifier, computed once on the
/// baseline cohort.
#[derive(Debug, Clone, Serialize)]
pub struct Breakdown {
    pub field: String,
    /// Baseline records inspected.
    pub total: usize,
    /// Denominator actually used for percentages.
    pub denominator: usize,
    /// Records with no resolved value; always outside the denominator.
    pub unresolved: usize,
    /// Unmapped codes held out of the denominator (exclude policy only).
    pub unmapped_excluded: usize,
    pub categories: Vec<CategoryCount>,
}

pub fn demographic_breakdowns(baseline: &Cohort, policy: UnmappedPolicy) -> Vec<Breakdown> {
    STRATIFIERS
        .into_iter()
        .filter_map(|codelist| breakdown_for(baseline, codelist, policy))
        .collect()
}

fn breakdown_for(
    baseline: &Cohort,
    codelist: &Codelist,
    policy: UnmappedPolicy,
) -> Option<Breakdown> {
    let column = baseline
        .columns
        .iter()
        .find(|column| codelist.matches_column(column))?;

    let mut mapped: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut unmapped: BTreeMap<String, usize> = BTreeMap::new();
    let mut unresolved = 0usize;

    for record in &baseline.records {
        match record.field_text(column) {
            None => unresolved += 1,
            Some(raw) => match encode_code(codelist, raw) {
                EncodedCategory::Mapped(label) => *mapped.entry(label).or_insert(0) += 1,
                unmapped_code @ EncodedCategory::Unmapped(_) => {
                    *unmapped.entry(unmapped_code.label()).or_insert(0) += 1;
                }
            },
        }
    }

    let mapped_total: usize = mapped.values().sum();
    let unmapped_total: usize = unmapped.values().sum();
    let (denominator, unmapped_excluded) = match policy {
        UnmappedPolicy::Retain => (mapped_total + unmapped_total, 0),
        UnmappedPolicy::Exclude => (mapped_total, unmapped_total),
    };

    // Canonical labels first, in codelist order, then unmapped codes.
    let mut categories = Vec::new();
    for label in codelist.labels() {
        if let Some(&count) = mapped.get(label) {
            categories.push(CategoryCount {
                label: label.to_string(),
                count,
                pct: percentage(count, denominator),
            });
        }
    }
    if policy == UnmappedPolicy::Retain {
        for (label, count) in unmapped {
            categories.push(CategoryCount {
                pct: percentage(count, denominator),
                label,
                count,
            });
        }
    }

    Some(Breakdown {
        field: codelist.field.to_string(),
        total: baseline.len(),
        denominator,
        unresolved,
        unmapped_excluded,
        categories,
    })
}

// ---------------------------------------------------------------------------
// Medication usage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct MedicationUsagePoint {
    pub timepoint: Timepoint,
    pub patients: usize,
    pub on_medication: usize,
    pub rate_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MedicationUsageSeries {
    pub medication: Medication,
    pub points: Vec<MedicationUsagePoint>,
}

/// Share of each cohort currently on each medication. Unlike retention,
/// the denominator here is everyone present at the timepoint, not the
/// baseline starters.
pub fn medication_usage(cohorts: &[&Cohort]) -> Vec<MedicationUsageSeries> {
    Medication::ALL
        .into_iter()
        .map(|medication| {
            let points = cohorts
                .iter()
                .map(|cohort| {
                    let on_medication = cohort
                        .records
                        .iter()
                        .filter(|record| treatment_status(record).contains(medication))
                        .count();
                    MedicationUsagePoint {
                        timepoint: cohort.timepoint,
                        patients: cohort.len(),
                        on_medication,
                        rate_pct: percentage(on_medication, cohort.len()),
                    }
                })
                .collect();
            MedicationUsageSeries { medication, points }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Outcome rates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct OutcomePoint {
    pub timepoint: Timepoint,
    /// Records with value `1` for the outcome.
    pub positive: usize,
    /// Records with any resolved value; missing outcomes are never
    /// imputed and stay out of this denominator.
    pub known: usize,
    pub rate_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutcomeSeries {
    pub column: String,
    pub points: Vec<OutcomePoint>,
}

pub fn outcome_series(
    cohorts: &[&Cohort],
    classification: &ColumnClassification,
) -> Vec<OutcomeSeries> {
    classification
        .columns_in(VariableClass::Outcome)
        .map(|column| {
            let points = cohorts
                .iter()
                .filter(|cohort| cohort.columns.iter().any(|c| c == column))
                .map(|cohort| {
                    let mut positive = 0usize;
                    let mut known = 0usize;
                    for record in &cohort.records {
                        if let Some(value) = record.field_text(column) {
                            known += 1;
                            if value == "1" {
                                positive += 1;
                            }
                        }
                    }
                    OutcomePoint {
                        timepoint: cohort.timepoint,
                        positive,
                        known,
                        rate_pct: percentage(positive, known),
                    }
                })
                .collect();
            OutcomeSeries {
                column: column.to_string(),
                points,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use moud_model::{FieldValue, PatientId, PatientRecord};
    use moud_transform::classify_columns;

    use super::*;
    use crate::join::join_cohorts;

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
    fn response_rates_are_relative_to_baseline() {
        let baseline = cohort(
            Timepoint::Baseline,
            &["CID"],
            (1..=4)
                .map(|id| record(&id.to_string(), Timepoint::Baseline, &[]))
                .collect(),
        );
        let month3 = cohort(
            Timepoint::Month3,
            &["CID"],
            (1..=3)
                .map(|id| record(&id.to_string(), Timepoint::Month3, &[]))
                .collect(),
        );

        let series = response_series(&[&baseline, &month3]);
        assert_eq!(series[0].records, 4);
        assert!((series[0].response_rate_pct - 100.0).abs() < f64::EPSILON);
        assert_eq!(series[1].records, 3);
        assert!((series[1].response_rate_pct - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn lost_to_follow_up_counts_as_discontinued() {
        // One patient starts buprenorphine at baseline and is never seen
        // again; the other is retained through 18 months.
        let classification = classify_columns(["currentbup"]);
        let baseline = cohort(
            Timepoint::Baseline,
            &["currentbup"],
            vec![
                record("1", Timepoint::Baseline, &[("currentbup", "1")]),
                record("2", Timepoint::Baseline, &[("currentbup", "1")]),
            ],
        );
        let month18 = cohort(
            Timepoint::Month18,
            &["currentbup"],
            vec![record("2", Timepoint::Month18, &[("currentbup", "1")])],
        );

        let cohorts = [&baseline, &month18];
        let index = join_cohorts(&cohorts, &classification).unwrap();
        let series =
            retention_series(&index, &[Timepoint::Baseline, Timepoint::Month18]);

        let bup = series
            .iter()
            .find(|s| s.medication == Medication::Buprenorphine)
            .unwrap();
        assert_eq!(bup.baseline_starters, 2);
        let at_18m = &bup.points[1];
        assert_eq!(at_18m.denominator, 2, "lost patient stays in denominator");
        assert_eq!(at_18m.retained, 1);
        assert!((at_18m.rate_pct - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn intermediate_absence_does_not_carry_status() {
        let classification = classify_columns(["currentmmt"]);
        let baseline = cohort(
            Timepoint::Baseline,
            &["currentmmt"],
            vec![record("1", Timepoint::Baseline, &[("currentmmt", "1")])],
        );
        // Absent at 3 months, back on methadone at 6 months.
        let month3 = cohort(Timepoint::Month3, &["currentmmt"], vec![]);
        let month6 = cohort(
            Timepoint::Month6,
            &["currentmmt"],
            vec![record("1", Timepoint::Month6, &[("currentmmt", "1")])],
        );

        let cohorts = [&baseline, &month3, &month6];
        let index = join_cohorts(&cohorts, &classification).unwrap();
        let series = retention_series(
            &index,
            &[Timepoint::Baseline, Timepoint::Month3, Timepoint::Month6],
        );
        let mmt = series
            .iter()
            .find(|s| s.medication == Medication::Methadone)
            .unwrap();
        assert_eq!(mmt.points[1].retained, 0, "discontinued at 3 months");
        assert_eq!(mmt.points[2].retained, 1, "retained again at 6 months");
    }

    #[test]
    fn retention_rates_stay_in_range() {
        let classification = classify_columns(["currentntx"]);
        let baseline = cohort(
            Timepoint::Baseline,
            &["currentntx"],
            vec![record("1", Timepoint::Baseline, &[("currentntx", "0")])],
        );
        let cohorts = [&baseline];
        let index = join_cohorts(&cohorts, &classification).unwrap();

        for series in retention_series(&index, &[Timepoint::Baseline]) {
            for point in &series.points {
                assert!(point.rate_pct >= 0.0 && point.rate_pct <= 100.0);
                assert!(point.rate_pct.is_finite());
            }
        }
    }

    #[test]
    fn utilization_rate_uses_patient_months() {
        let classification = classify_columns(["edvisit", "hospstay"]);
        let month3 = cohort(
            Timepoint::Month3,
            &["edvisit", "hospstay"],
            vec![
                record(
                    "1",
                    Timepoint::Month3,
                    &[("edvisit", "2"), ("hospstay", "1")],
                ),
                record(
                    "2",
                    Timepoint::Month3,
                    &[("edvisit", "0"), ("hospstay", "0")],
                ),
            ],
        );

        let series = utilization_series(&[&month3], &classification);
        let point = &series[0];
        assert_eq!(point.total_count, 3);
        assert_eq!(point.months_at_risk, 3);
        // 3 events over 2 patients x 3 months.
        assert!((point.rate_per_patient_month - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_cohort_yields_zero_rate_not_nan() {
        let classification = classify_columns(["edvisit"]);
        let month3 = cohort(Timepoint::Month3, &["edvisit"], vec![]);

        let series = utilization_series(&[&month3], &classification);
        assert_eq!(series[0].rate_per_patient_month, 0.0);
        assert!(series[0].rate_per_patient_month.is_finite());
    }

    #[test]
    fn breakdown_encodes_sex_codes() {
        let records = (1..=5)
            .map(|id| {
                let code = if id <= 2 { "1" } else { "2" };
                record(&id.to_string(), Timepoint::Baseline, &[("sex", code)])
            })
            .collect();
        let baseline = cohort(Timepoint::Baseline, &["sex"], records);

        let breakdowns = demographic_breakdowns(&baseline, UnmappedPolicy::Retain);
        let sex = breakdowns.iter().find(|b| b.field == "sex").unwrap();
        assert_eq!(sex.denominator, 5);
        assert_eq!(sex.categories[0].label, "Male");
        assert_eq!(sex.categories[0].count, 2);
        assert_eq!(sex.categories[1].label, "Female");
        assert_eq!(sex.categories[1].count, 3);
        assert!((sex.categories[1].pct - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unmapped_policy_controls_denominator() {
        let baseline = cohort(
            Timepoint::Baseline,
            &["sex"],
            vec![
                record("1", Timepoint::Baseline, &[("sex", "1")]),
                record("2", Timepoint::Baseline, &[("sex", "9")]),
            ],
        );

        let retained = demographic_breakdowns(&baseline, UnmappedPolicy::Retain);
        let sex = &retained[0];
        assert_eq!(sex.denominator, 2);
        assert!(sex.categories.iter().any(|c| c.label == "Unmapped (9)"));

        let excluded = demographic_breakdowns(&baseline, UnmappedPolicy::Exclude);
        let sex = &excluded[0];
        assert_eq!(sex.denominator, 1);
        assert_eq!(sex.unmapped_excluded, 1);
        assert!(!sex.categories.iter().any(|c| c.label == "Unmapped (9)"));
        assert!((sex.categories[0].pct - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unresolved_demographics_stay_out_of_denominator() {
        let baseline = cohort(
            Timepoint::Baseline,
            &["sex"],
            vec![
                record("1", Timepoint::Baseline, &[("sex", "1")]),
                record("2", Timepoint::Baseline, &[]),
            ],
        );

        let breakdowns = demographic_breakdowns(&baseline, UnmappedPolicy::Retain);
        let sex = &breakdowns[0];
        assert_eq!(sex.total, 2);
        assert_eq!(sex.denominator, 1);
        assert_eq!(sex.unresolved, 1);
    }

    #[test]
    fn outcome_denominator_excludes_missing() {
        let classification = classify_columns(["opuse30"]);
        let month3 = cohort(
            Timepoint::Month3,
            &["opuse30"],
            vec![
                record("1", Timepoint::Month3, &[("opuse30", "1")]),
                record("2", Timepoint::Month3, &[("opuse30", "0")]),
                record("3", Timepoint::Month3, &[]),
            ],
        );

        let series = outcome_series(&[&month3], &classification);
        let opuse = series.iter().find(|s| s.column == "opuse30").unwrap();
        let point = &opuse.points[0];
        assert_eq!(point.known, 2, "missing outcome stays out of denominator");
        assert_eq!(point.positive, 1);
        assert!((point.rate_pct - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn medication_usage_uses_cohort_denominator() {
        let month3 = cohort(
            Timepoint::Month3,
            &["currentbup"],
            vec![
                record("1", Timepoint::Month3, &[("currentbup", "1")]),
                record("2", Timepoint::Month3, &[("currentbup", "0")]),
                record("3", Timepoint::Month3, &[("currentbup", "0")]),
            ],
        );

        let series = medication_usage(&[&month3]);
        let bup = series
            .iter()
            .find(|s| s.medication == Medication::Buprenorphine)
            .unwrap();
        assert_eq!(bup.points[0].on_medication, 1);
        assert!((bup.points[0].rate_pct - (100.0 / 3.0)).abs() < 1e-9);
    }
}

//! End-to-end aggregation scenarios over synthetic cohorts.

use moud_aggregate::aggregate;
use moud_model::{
    Cohort, FieldValue, Medication, PatientId, PatientRecord, PipelineOptions, Timepoint,
    ValidationError,
};
use moud_transform::{classify_columns, resolve_cohorts};

fn record(id: &str, timepoint: Timepoint, fields: &[(&str, &str)]) -> PatientRecord {
    let mut record = PatientRecord::new(PatientId::new(id).unwrap(), timepoint);
    for (name, value) in fields {
        record.set_field((*name).to_string(), FieldValue::from_raw(value));
    }
    record
}

fn seal(cohort: &mut Cohort) {
    let len = cohort.len();
    cohort.declare_response_count(len);
}

#[test]
fn full_baseline_cohort_encodes_sex_exactly() {
    // 1,974 baseline patients: codes 1 -> 912 male, 2 -> 1,062 female.
    let mut baseline = Cohort::new(
        Timepoint::Baseline,
        vec!["CID".to_string(), "sex".to_string()],
    );
    for id in 1..=1974 {
        let code = if id <= 912 { "1" } else { "2" };
        baseline.push_record(record(&id.to_string(), Timepoint::Baseline, &[("sex", code)]));
    }
    seal(&mut baseline);

    let classification = classify_columns(["CID", "sex"]);
    let cohorts = vec![baseline];
    let set = aggregate(&cohorts, &classification, &PipelineOptions::default()).unwrap();

    let sex = set.demographics.iter().find(|b| b.field == "sex").unwrap();
    assert_eq!(sex.total, 1974);
    assert_eq!(sex.denominator, 1974);

    let male = sex.categories.iter().find(|c| c.label == "Male").unwrap();
    let female = sex.categories.iter().find(|c| c.label == "Female").unwrap();
    assert_eq!(male.count, 912);
    assert_eq!(female.count, 1062);
    assert_eq!(male.count + female.count, 1974);
}

#[test]
fn baseline_only_starter_is_discontinued_in_every_follow_up_denominator() {
    let columns = ["CID", "currentbup"];
    let classification = classify_columns(columns);

    let mut baseline = Cohort::new(
        Timepoint::Baseline,
        columns.iter().map(|c| (*c).to_string()).collect(),
    );
    baseline.push_record(record("1", Timepoint::Baseline, &[("currentbup", "1")]));
    seal(&mut baseline);

    let mut cohorts = vec![baseline];
    for timepoint in [
        Timepoint::Month3,
        Timepoint::Month6,
        Timepoint::Month12,
        Timepoint::Month18,
    ] {
        let mut empty = Cohort::new(
            timepoint,
            columns.iter().map(|c| (*c).to_string()).collect(),
        );
        seal(&mut empty);
        cohorts.push(empty);
    }

    let set = aggregate(&cohorts, &classification, &PipelineOptions::default()).unwrap();
    let bup = set
        .retention
        .iter()
        .find(|s| s.medication == Medication::Buprenorphine)
        .unwrap();

    assert_eq!(bup.baseline_starters, 1);
    let at_18m = bup
        .points
        .iter()
        .find(|p| p.timepoint == Timepoint::Month18)
        .unwrap();
    assert_eq!(at_18m.denominator, 1, "lost patient still in denominator");
    assert_eq!(at_18m.retained, 0);
    assert_eq!(at_18m.rate_pct, 0.0);
}

#[test]
fn resolved_cohorts_keep_declared_response_counts() {
    let columns = ["CID", "sex", "currentbup", "edvisit", "opuse30"];
    let classification = classify_columns(columns);

    let mut baseline = Cohort::new(
        Timepoint::Baseline,
        columns.iter().map(|c| (*c).to_string()).collect(),
    );
    for id in 1..=10 {
        baseline.push_record(record(
            &id.to_string(),
            Timepoint::Baseline,
            &[("sex", "1"), ("currentbup", "1")],
        ));
    }
    seal(&mut baseline);

    let mut month3 = Cohort::new(
        Timepoint::Month3,
        columns.iter().map(|c| (*c).to_string()).collect(),
    );
    for id in 1..=7 {
        month3.push_record(record(&id.to_string(), Timepoint::Month3, &[]));
    }
    seal(&mut month3);

    let mut cohorts = vec![baseline, month3];
    resolve_cohorts(&mut cohorts, &classification);

    for cohort in &cohorts {
        assert_eq!(cohort.len(), cohort.declared_response_count());
    }

    let set = aggregate(&cohorts, &classification, &PipelineOptions::default()).unwrap();
    assert_eq!(set.response[0].records, 10);
    assert_eq!(set.response[1].records, 7);
    assert!((set.response[1].response_rate_pct - 70.0).abs() < f64::EPSILON);
}

#[test]
fn forward_filled_demographics_agree_across_waves() {
    let columns = ["CID", "agecat"];
    let classification = classify_columns(columns);

    let mut baseline = Cohort::new(
        Timepoint::Baseline,
        columns.iter().map(|c| (*c).to_string()).collect(),
    );
    baseline.push_record(record("1", Timepoint::Baseline, &[("agecat", "3")]));
    seal(&mut baseline);

    let mut month12 = Cohort::new(
        Timepoint::Month12,
        columns.iter().map(|c| (*c).to_string()).collect(),
    );
    month12.push_record(record("1", Timepoint::Month12, &[]));
    seal(&mut month12);

    let mut cohorts = vec![baseline, month12];
    resolve_cohorts(&mut cohorts, &classification);

    let values: Vec<_> = cohorts
        .iter()
        .filter_map(|cohort| cohort.records[0].field_text("agecat"))
        .collect();
    assert_eq!(values, vec!["3", "3"]);

    // And the join-time consistency check accepts the result.
    assert!(aggregate(&cohorts, &classification, &PipelineOptions::default()).is_ok());
}

#[test]
fn response_count_violation_blocks_aggregation() {
    let classification = classify_columns(["CID"]);
    let mut baseline = Cohort::new(Timepoint::Baseline, vec!["CID".to_string()]);
    baseline.push_record(record("1", Timepoint::Baseline, &[]));
    baseline.declare_response_count(5);

    let cohorts = vec![baseline];
    let error =
        aggregate(&cohorts, &classification, &PipelineOptions::default()).unwrap_err();
    assert!(matches!(error, ValidationError::ResponseCountMismatch { .. }));
}

#[test]
fn missing_baseline_blocks_aggregation() {
    let classification = classify_columns(["CID"]);
    let mut month3 = Cohort::new(Timepoint::Month3, vec!["CID".to_string()]);
    month3.push_record(record("1", Timepoint::Month3, &[]));
    seal(&mut month3);

    let cohorts = vec![month3];
    let error =
        aggregate(&cohorts, &classification, &PipelineOptions::default()).unwrap_err();
    assert!(matches!(error, ValidationError::MissingMetric { .. }));
}

#[test]
fn no_cohorts_is_an_empty_run() {
    let classification = classify_columns(["CID"]);
    let error = aggregate(&[], &classification, &PipelineOptions::default()).unwrap_err();
    assert!(matches!(error, ValidationError::EmptyRun));
}

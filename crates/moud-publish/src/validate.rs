//! Validation gating.
//!
//! The publisher refuses to emit an artifact when any required metric is
//! absent, non-finite, or an out-of-range percentage. Checks run over the
//! assembled artifact, so whatever passes here is exactly what lands on
//! disk.

use moud_model::{Medication, Timepoint, ValidationError};

use crate::artifact::Artifact;

fn check_pct(metric: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFinite {
            metric: metric.to_string(),
        });
    }
    if !(0.0..=100.0).contains(&value) {
        return Err(ValidationError::PercentOutOfRange {
            metric: metric.to_string(),
            value,
        });
    }
    Ok(())
}

/// Validate the artifact before emission.
pub fn validate_artifact(artifact: &Artifact) -> Result<(), ValidationError> {
    let metrics = &artifact.metrics;

    if metrics.response.is_empty() {
        return Err(ValidationError::EmptyRun);
    }
    let timepoints: Vec<Timepoint> =
        metrics.response.iter().map(|point| point.timepoint).collect();
    if !timepoints.contains(&Timepoint::Baseline) {
        return Err(ValidationError::MissingMetric {
            metric: "baseline response count".to_string(),
        });
    }
    for point in &metrics.response {
        check_pct(
            &format!("response_rate[{}]", point.timepoint),
            point.response_rate_pct,
        )?;
    }

    // Retention: one series per medication, one point per timepoint.
    for medication in Medication::ALL {
        let series = metrics
            .retention
            .iter()
            .find(|series| series.medication == medication)
            .ok_or_else(|| ValidationError::MissingMetric {
                metric: format!("retention[{}]", medication.key()),
            })?;
        for &timepoint in &timepoints {
            let point = series
                .points
                .iter()
                .find(|point| point.timepoint == timepoint)
                .ok_or_else(|| ValidationError::MissingMetric {
                    metric: format!("retention[{}][{timepoint}]", medication.key()),
                })?;
            check_pct(
                &format!("retention[{}][{timepoint}]", medication.key()),
                point.rate_pct,
            )?;
        }
    }

    // Utilization: one point per timepoint; a rate, not a percentage.
    for &timepoint in &timepoints {
        let point = metrics
            .utilization
            .iter()
            .find(|point| point.timepoint == timepoint)
            .ok_or_else(|| ValidationError::MissingMetric {
                metric: format!("utilization[{timepoint}]"),
            })?;
        if !point.rate_per_patient_month.is_finite() || point.rate_per_patient_month < 0.0 {
            return Err(ValidationError::NonFinite {
                metric: format!("utilization[{timepoint}]"),
            });
        }
    }

    for breakdown in &metrics.demographics {
        for category in &breakdown.categories {
            check_pct(
                &format!("demographics[{}][{}]", breakdown.field, category.label),
                category.pct,
            )?;
        }
    }

    for series in &metrics.medication_usage {
        for point in &series.points {
            check_pct(
                &format!("usage[{}][{}]", series.medication.key(), point.timepoint),
                point.rate_pct,
            )?;
        }
    }

    for series in &metrics.outcomes {
        for point in &series.points {
            check_pct(
                &format!("outcome[{}][{}]", series.column, point.timepoint),
                point.rate_pct,
            )?;
        }
    }

    Ok(())
}

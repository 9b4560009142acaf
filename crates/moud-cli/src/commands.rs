use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use chrono::{SecondsFormat, Utc};
use tracing::{info, info_span};

use moud_aggregate::aggregate;
use moud_ingest::{discover_timepoint_files, manifest_entry, read_cohorts};
use moud_model::{PipelineOptions, RunContext, SourceManifest, VariableClass};
use moud_publish::{build_artifact, publish, validate_artifact};
use moud_transform::{classify_columns, resolve_cohorts};

use crate::cli::RunArgs;
use crate::types::RunOutcome;

/// Run the full pipeline: ingest, classify, resolve, aggregate, publish.
///
/// Fails without side effects: the artifact is only written after every
/// stage, including validation, has succeeded.
pub fn run_pipeline(args: &RunArgs) -> Result<RunOutcome> {
    let run_span = info_span!("run", data_folder = %args.data_folder.display());
    let _run_guard = run_span.enter();

    let options = PipelineOptions::default()
        .with_id_column(args.id_column.as_str())
        .with_unmapped_policy(args.unmapped.into());
    let generated_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

    // Stage 1: Ingest - one worker per timepoint file.
    let ingest_start = Instant::now();
    let (cohorts, manifest) = info_span!("ingest").in_scope(|| -> Result<_> {
        let files = discover_timepoint_files(&args.data_folder);
        if files.is_empty() {
            bail!(
                "no timepoint exports found in {} (expected files like {:?})",
                args.data_folder.display(),
                moud_model::Timepoint::Baseline.source_filename()
            );
        }

        let cohorts = read_cohorts(&files, &options.id_column).context("ingest snapshots")?;

        let mut manifest = SourceManifest::new();
        for ((timepoint, path), cohort) in files.iter().zip(&cohorts) {
            manifest.push(
                manifest_entry(*timepoint, path, cohort.len())
                    .with_context(|| format!("digest {}", path.display()))?,
            );
        }
        Ok((cohorts, manifest))
    })?;
    info!(
        file_count = manifest.len(),
        record_count = cohorts.iter().map(moud_model::Cohort::len).sum::<usize>(),
        duration_ms = ingest_start.elapsed().as_millis(),
        "ingest complete"
    );

    // Stage 2: Classify - one classification for the union of all columns.
    let classify_start = Instant::now();
    let classification = info_span!("classify").in_scope(|| {
        let mut columns: BTreeSet<&str> = BTreeSet::new();
        for cohort in &cohorts {
            columns.extend(cohort.columns.iter().map(String::as_str));
        }
        classify_columns(columns)
    });
    info!(
        column_count = classification.len(),
        unclassified = classification
            .columns_in(VariableClass::Unclassified)
            .count(),
        duration_ms = classify_start.elapsed().as_millis(),
        "classification complete"
    );

    // Stage 3: Resolve missing data per the policy table.
    let resolve_start = Instant::now();
    let mut cohorts = cohorts;
    let resolve =
        info_span!("resolve").in_scope(|| resolve_cohorts(&mut cohorts, &classification));
    info!(
        demographics_filled = resolve.demographics_filled,
        demographics_unresolved = resolve.demographics_unresolved,
        treatments_defaulted = resolve.treatments_defaulted,
        utilization_zeroed = resolve.utilization_zeroed,
        outcomes_preserved = resolve.outcomes_preserved,
        duration_ms = resolve_start.elapsed().as_millis(),
        "resolution complete"
    );

    // Stage 4: Aggregate - join and compute the full metric set.
    let aggregate_start = Instant::now();
    let metrics = info_span!("aggregate")
        .in_scope(|| aggregate(&cohorts, &classification, &options))
        .context("aggregate cohorts")?;
    info!(
        retention_series = metrics.retention.len(),
        breakdowns = metrics.demographics.len(),
        duration_ms = aggregate_start.elapsed().as_millis(),
        "aggregation complete"
    );

    // Stage 5: Publish - validate, then emit atomically (or just validate
    // on a dry run).
    let publish_start = Instant::now();
    let context = RunContext::new(generated_at, options).with_manifest(manifest);
    let artifact = build_artifact(&context, metrics);
    let artifact_path = info_span!("publish").in_scope(|| -> Result<Option<PathBuf>> {
        if args.dry_run {
            validate_artifact(&artifact).context("validate artifact")?;
            info!("dry run, artifact validated but not written");
            return Ok(None);
        }
        let path = args
            .output
            .clone()
            .unwrap_or_else(|| args.data_folder.join("dashboard_data.json"));
        publish(&artifact, &path).context("publish artifact")?;
        Ok(Some(path))
    })?;
    info!(
        duration_ms = publish_start.elapsed().as_millis(),
        "publish complete"
    );

    Ok(RunOutcome {
        artifact_path,
        artifact,
        resolve,
    })
}

//! The published artifact.

use serde::Serialize;

use moud_aggregate::AggregateSet;
use moud_model::{RunContext, SourceManifest, UnmappedPolicy};

/// Methodology notes carried inside the artifact so consumers see them
/// next to the numbers they qualify.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactNotes {
    pub retention_denominator: &'static str,
    pub unmapped_policy: UnmappedPolicy,
}

/// The single document handed to the presentation layer.
///
/// Rebuilt wholesale every run; the presentation layer treats it as
/// read-only and performs no further aggregation.
#[derive(Debug, Serialize)]
pub struct Artifact {
    /// Run timestamp, RFC 3339.
    pub generated_at: String,
    pub sources: SourceManifest,
    #[serde(flatten)]
    pub metrics: AggregateSet,
    pub notes: ArtifactNotes,
}

/// Assemble the artifact from the run context and the aggregated metrics.
pub fn build_artifact(context: &RunContext, metrics: AggregateSet) -> Artifact {
    Artifact {
        generated_at: context.generated_at.clone(),
        sources: context.manifest.clone(),
        metrics,
        notes: ArtifactNotes {
            retention_denominator: "Retention denominators are the baseline starters of each \
                 medication; patients lost to follow-up remain in the denominator as \
                 discontinued, biasing retention conservatively low.",
            unmapped_policy: context.options.unmapped_policy,
        },
    }
}

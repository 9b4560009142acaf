use std::path::PathBuf;

use moud_publish::Artifact;
use moud_transform::ResolveReport;

/// Result of one pipeline run, for the terminal summary.
#[derive(Debug)]
pub struct RunOutcome {
    /// Written artifact path; `None` on a dry run.
    pub artifact_path: Option<PathBuf>,
    /// The validated artifact (built even on dry runs).
    pub artifact: Artifact,
    pub resolve: ResolveReport,
}

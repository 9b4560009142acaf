//! Artifact publication.
//!
//! Serializes the aggregated metric set plus run metadata into the single
//! JSON document the presentation layer consumes. Publication is gated on
//! validation and atomic: the run either emits one complete, internally
//! consistent artifact, or emits nothing.

pub mod artifact;
pub mod validate;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use moud_model::ValidationError;

pub use artifact::{Artifact, ArtifactNotes, build_artifact};
pub use validate::validate_artifact;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to serialize artifact: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write artifact {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Validate and write the artifact.
///
/// Validation runs before any byte touches disk. The write goes to a
/// sibling temp file first and is renamed over the destination, so
/// consumers never observe a partially-written or stale-mixed artifact.
pub fn publish(artifact: &Artifact, path: &Path) -> Result<(), PublishError> {
    validate_artifact(artifact)?;

    let body = serde_json::to_vec_pretty(artifact)?;

    let mut tmp = path.to_path_buf();
    tmp.set_extension("json.tmp");
    std::fs::write(&tmp, &body).map_err(|source| PublishError::Write {
        path: tmp.clone(),
        source,
    })?;
    std::fs::rename(&tmp, path).map_err(|source| PublishError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    info!(
        path = %path.display(),
        bytes = body.len(),
        "artifact published"
    );
    Ok(())
}

//! Per-run context threaded explicitly through pipeline stages.

use crate::{PipelineOptions, SourceManifest};

/// Everything a stage needs to know about the run it belongs to.
///
/// Passed by reference through the stages rather than held as ambient
/// global state; the publisher copies it into the artifact's metadata.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Run start, RFC 3339. Captured once at startup so every stage and
    /// the artifact agree on a single timestamp.
    pub generated_at: String,
    pub manifest: SourceManifest,
    pub options: PipelineOptions,
}

impl RunContext {
    pub fn new(generated_at: impl Into<String>, options: PipelineOptions) -> Self {
        Self {
            generated_at: generated_at.into(),
            manifest: SourceManifest::new(),
            options,
        }
    }

    #[must_use]
    pub fn with_manifest(mut self, manifest: SourceManifest) -> Self {
        self.manifest = manifest;
        self
    }
}

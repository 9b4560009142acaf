//! Source provenance for run metadata.

use serde::{Deserialize, Serialize};

use crate::Timepoint;

/// One ingested snapshot file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFileEntry {
    pub timepoint: Timepoint,
    /// Path as given to the run, for the artifact's file manifest.
    pub path: String,
    /// SHA-256 of the raw file bytes, lowercase hex.
    pub sha256: String,
    /// Data rows read (header excluded).
    pub records: usize,
}

/// Manifest of every source file that fed a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceManifest {
    pub files: Vec<SourceFileEntry>,
}

impl SourceManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: SourceFileEntry) {
        self.files.push(entry);
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn records_for(&self, timepoint: Timepoint) -> Option<usize> {
        self.files
            .iter()
            .find(|entry| entry.timepoint == timepoint)
            .map(|entry| entry.records)
    }
}

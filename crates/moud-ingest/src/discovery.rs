//! Timepoint file discovery and source manifest entries.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

use moud_model::{IngestError, SourceFileEntry, Timepoint};

/// Find the timepoint exports present in a data folder.
///
/// The filenames are a fixed contract; files are returned in
/// chronological timepoint order. A missing follow-up file is attrition
/// of the whole wave, not an error, and is left to the caller to report.
pub fn discover_timepoint_files(dir: &Path) -> Vec<(Timepoint, PathBuf)> {
    let mut found = Vec::new();
    for timepoint in Timepoint::ALL {
        let path = dir.join(timepoint.source_filename());
        if path.is_file() {
            found.push((timepoint, path));
        } else {
            debug!(
                timepoint = %timepoint,
                expected = %path.display(),
                "timepoint export not present"
            );
        }
    }
    found
}

/// SHA-256 of the raw file bytes, lowercase hex.
pub fn file_sha256(path: &Path) -> Result<String, IngestError> {
    let bytes = std::fs::read(path).map_err(|source| IngestError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

/// Build a manifest entry for an ingested snapshot.
pub fn manifest_entry(
    timepoint: Timepoint,
    path: &Path,
    records: usize,
) -> Result<SourceFileEntry, IngestError> {
    Ok(SourceFileEntry {
        timepoint,
        path: path.display().to_string(),
        sha256: file_sha256(path)?,
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Patient-Baseline-Data.csv");
        std::fs::write(&path, "CID\n1\n").unwrap();

        let first = file_sha256(&path).unwrap();
        let second = file_sha256(&path).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn discovery_orders_chronologically() {
        let dir = tempfile::tempdir().unwrap();
        // Write out of order; discovery still yields chronological order.
        for timepoint in [Timepoint::Month18, Timepoint::Baseline, Timepoint::Month6] {
            std::fs::write(dir.path().join(timepoint.source_filename()), "CID\n1\n").unwrap();
        }

        let found = discover_timepoint_files(dir.path());
        let timepoints: Vec<Timepoint> = found.iter().map(|(timepoint, _)| *timepoint).collect();
        assert_eq!(
            timepoints,
            vec![Timepoint::Baseline, Timepoint::Month6, Timepoint::Month18]
        );
    }
}

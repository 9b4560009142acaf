//! Snapshot ingestion.
//!
//! Reads each timepoint's CSV export into a [`moud_model::Cohort`],
//! normalizing text encoding and blank-value representation, and builds
//! the source manifest for run metadata.

pub mod cohort_csv;
pub mod discovery;

pub use cohort_csv::{TextEncoding, decode_text, read_cohort, read_cohorts};
pub use discovery::{discover_timepoint_files, file_sha256, manifest_entry};

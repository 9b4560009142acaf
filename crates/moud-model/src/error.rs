use std::path::PathBuf;

use thiserror::Error;

/// Invalid construction of a model value.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid patient identifier: {0:?}")]
    InvalidPatientId(String),
    #[error("unknown timepoint: {0:?}")]
    UnknownTimepoint(String),
}

/// Fatal ingestion failures. Stage-local recoverable conditions (encoding
/// fallback, unknown columns) are handled inline and never surface here.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: no header row")]
    MissingHeader { path: PathBuf },
    #[error("{path}: identifier column {column:?} not found in header")]
    MissingIdColumn { path: PathBuf, column: String },
    #[error("{path}: record {record} has a blank patient identifier")]
    BlankPatientId { path: PathBuf, record: u64 },
    #[error("{path}: duplicate patient identifier {id:?}")]
    DuplicatePatientId { path: PathBuf, id: String },
    #[error("{path}: malformed csv: {message}")]
    CsvParse { path: PathBuf, message: String },
}

/// Cross-cutting integrity failures. Any of these aborts the run before
/// publication; the pipeline emits a complete artifact or none at all.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("no cohorts to aggregate")]
    EmptyRun,
    #[error("required metric missing: {metric}")]
    MissingMetric { metric: String },
    #[error("metric {metric} is not finite")]
    NonFinite { metric: String },
    #[error("metric {metric} out of range: {value} (expected 0 to 100)")]
    PercentOutOfRange { metric: String, value: f64 },
    #[error(
        "patient {patient}: demographic field {field:?} disagrees across timepoints after resolution"
    )]
    InconsistentDemographic { patient: String, field: String },
    #[error("{timepoint}: cohort has {records} records but declared response count {declared}")]
    ResponseCountMismatch {
        timepoint: String,
        records: usize,
        declared: usize,
    },
}

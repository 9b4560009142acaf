//! Data model for the MOUD longitudinal cohort pipeline.
//!
//! This crate defines the shared vocabulary of the pipeline: timepoints,
//! patient records and cohorts, variable classifications, treatment status,
//! demographic codelists, run context, and the error taxonomy. It has no
//! I/O; ingestion and transformation live in sibling crates.

pub mod codelist;
pub mod context;
pub mod enums;
pub mod error;
pub mod ids;
pub mod lookup;
pub mod options;
pub mod provenance;
pub mod record;
pub mod timepoint;
pub mod treatment;

pub use codelist::{Codelist, EncodedCategory, STRATIFIERS};
pub use context::RunContext;
pub use enums::{Medication, VariableClass};
pub use error::{IngestError, ModelError, ValidationError};
pub use ids::PatientId;
pub use lookup::CaseInsensitiveSet;
pub use options::{PipelineOptions, UnmappedPolicy};
pub use provenance::{SourceFileEntry, SourceManifest};
pub use record::{Cohort, FieldValue, PatientRecord};
pub use timepoint::Timepoint;
pub use treatment::TreatmentStatus;

//! Variable classification, missing-data resolution, and categorical
//! encoding for cohort snapshots.
//!
//! The three stages run strictly in order: columns are classified once per
//! run, the resolver applies one imputation policy per classification, and
//! the encoder maps resolved codes to canonical categories.

pub mod classify;
pub mod encode;
pub mod resolve;

pub use classify::{ColumnClassification, classify_column, classify_columns};
pub use encode::{encode_code, encode_demographic, treatment_status};
pub use resolve::{ResolveReport, resolve_cohorts};

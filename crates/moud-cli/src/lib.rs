//! CLI library components for the MOUD cohort ETL.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod summary;
pub mod types;

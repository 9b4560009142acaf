//! CLI argument definitions for the MOUD cohort ETL.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

use moud_model::UnmappedPolicy;

#[derive(Parser)]
#[command(
    name = "moud-etl",
    version,
    about = "MOUD cohort ETL - build the dashboard dataset from snapshot exports",
    long_about = "Ingest the five timepoint snapshot exports of the MOUD cohort,\n\
                  resolve missing data, encode categorical variables, and publish\n\
                  the aggregated dashboard dataset as a single JSON artifact."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow row-level patient values in trace logs.
    ///
    /// Off by default: snapshot rows are patient data, and logs may leave
    /// the machine the data lives on.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the full pipeline over a data folder and publish the artifact.
    Run(RunArgs),

    /// List the expected timepoint export files.
    Timepoints,
}

#[derive(Parser)]
pub struct RunArgs {
    /// Folder containing the timepoint snapshot exports.
    #[arg(value_name = "DATA_FOLDER")]
    pub data_folder: PathBuf,

    /// Artifact path (default: <DATA_FOLDER>/dashboard_data.json).
    #[arg(long = "output", value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Validate and report without writing the artifact.
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Name of the patient-identifier column.
    #[arg(long = "id-column", value_name = "NAME", default_value = "CID")]
    pub id_column: String,

    /// How unmapped demographic codes enter percentage denominators.
    #[arg(long = "unmapped", value_enum, default_value = "retain")]
    pub unmapped: UnmappedArg,
}

/// CLI choices for the unmapped-code policy.
#[derive(Clone, Copy, ValueEnum)]
pub enum UnmappedArg {
    /// Keep unmapped codes as an explicit category in the denominator.
    Retain,
    /// Report unmapped codes separately, outside the denominator.
    Exclude,
}

impl From<UnmappedArg> for UnmappedPolicy {
    fn from(arg: UnmappedArg) -> Self {
        match arg {
            UnmappedArg::Retain => UnmappedPolicy::Retain,
            UnmappedArg::Exclude => UnmappedPolicy::Exclude,
        }
    }
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

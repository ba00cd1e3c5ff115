//! CLI argument definitions for the cohort linker.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "cohort",
    version,
    about = "Link longitudinal PET scans into one analysis cohort",
    long_about = "Link tau and amyloid PET scans to clinical visits, assessments and \
                  genotypes.\n\n\
                  Every match is scoped to one subject and picks the closest record \
                  in time. Cross-modality pairs outside the tolerance are dropped."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
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

    /// Allow subject IDs and raw values in log output.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Link every input of a data directory into the final cohort table.
    Link(LinkArgs),

    /// Print the resolved region catalog.
    Regions(RegionsArgs),
}

#[derive(Parser)]
pub struct LinkArgs {
    /// Directory holding the input CSV files.
    #[arg(value_name = "DATA_DIR")]
    pub data_dir: PathBuf,

    /// TOML config with source file names and linkage options.
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Cohort CSV path (default: <DATA_DIR>/final_matched_dataset.csv).
    #[arg(long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Also write the run report as JSON.
    #[arg(long = "report", value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Link and summarize without writing any file.
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Maximum cross-modality scan gap in days (exclusive).
    #[arg(long = "tolerance-days", value_name = "DAYS")]
    pub tolerance_days: Option<i64>,

    /// QC code that marks a scan as passing, for both modalities.
    #[arg(long = "qc-pass", value_name = "CODE")]
    pub qc_pass: Option<String>,

    /// Tracer dropped from the primary modality (repeatable; replaces the configured list).
    #[arg(long = "exclude-tracer", value_name = "TRACER")]
    pub exclude_tracer: Vec<String>,

    /// Which records a nearest match may pick.
    #[arg(long = "direction", value_enum)]
    pub direction: Option<DirectionArg>,
}

#[derive(Parser)]
pub struct RegionsArgs {
    /// Region catalog CSV (FS_LABEL and optional SUBCORTICAL columns).
    #[arg(value_name = "CATALOG_CSV")]
    pub catalog: PathBuf,
}

/// CLI nearest-match direction choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum DirectionArg {
    Nearest,
    Backward,
    Forward,
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

//! Command-line parsing.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the pipeline code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "caudal",
    version,
    about = "Fetch, clean, chart, and export daily streamflow for one gauging station"
)]
pub struct Cli {
    /// Verbose logging (debug level).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch from the explorador API, then clean, chart, and export.
    Run(RunArgs),
    /// Re-run the pipeline offline on a previously cached payload file.
    Local(LocalArgs),
}

#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Where to keep a copy of the raw download for offline re-runs.
    #[arg(long, value_name = "FILE", default_value = "data/raw_payload.bin")]
    pub raw_cache: PathBuf,

    /// Skip writing the raw download to disk.
    #[arg(long)]
    pub no_raw_cache: bool,
}

#[derive(Debug, Args, Clone)]
pub struct LocalArgs {
    /// Previously cached payload file.
    #[arg(long, value_name = "FILE")]
    pub input: PathBuf,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Options shared by both subcommands.
#[derive(Debug, Args, Clone)]
pub struct CommonArgs {
    /// Gauging station id.
    #[arg(long, default_value = "10111001")]
    pub station: String,

    /// Station display name, used in the chart title.
    #[arg(long, default_value = "Riñihue")]
    pub station_name: String,

    /// Window start (YYYY-MM-DD), inclusive.
    #[arg(long, default_value = "1960-01-01")]
    pub start: NaiveDate,

    /// Window end (YYYY-MM-DD), inclusive.
    #[arg(long, default_value = "2025-12-31")]
    pub end: NaiveDate,

    /// Use this column as the date column instead of the name heuristics.
    #[arg(long, value_name = "NAME")]
    pub date_column: Option<String>,

    /// Use this column as the streamflow column instead of the name heuristics.
    #[arg(long, value_name = "NAME")]
    pub value_column: Option<String>,

    /// Cleaned CSV output path.
    #[arg(long, value_name = "FILE", default_value = "streamflow_cleaned.csv")]
    pub out_csv: PathBuf,

    /// Chart PNG output path.
    #[arg(long, value_name = "FILE", default_value = "streamflow_plot.png")]
    pub out_plot: PathBuf,

    /// Chart width in pixels.
    #[arg(long, default_value_t = 1800)]
    pub width: u32,

    /// Chart height in pixels.
    #[arg(long, default_value_t = 700)]
    pub height: u32,
}

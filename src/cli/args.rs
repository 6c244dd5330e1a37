//! Command-line argument parsing for Job Fetcher
//!
//! This module defines the CLI structure using clap derive macros: one
//! command to refresh and print, plus commands to inspect the cache and the
//! refresh marker.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::app::models::JobTable;
use crate::config::ConfigOverrides;
use crate::constants::display;

/// Job Fetcher - BestJobs and eJobs listings without the noise
#[derive(Parser, Debug)]
#[command(
    name = "job_fetcher",
    version,
    about = "Fetch and cache job listings from BestJobs and eJobs",
    long_about = "Fetches job listings from the BestJobs and eJobs APIs, removes titles containing banned words and keeps them in a local CSV cache.
A full refresh runs at most once per refresh window; cached data stays available while a refresh runs."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Cache directory path
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Minimum hours between two successful refreshes
    #[arg(long, global = true, value_name = "HOURS")]
    pub window_hours: Option<f64>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a refresh if due, show cached jobs, then show the refreshed ones
    Run(RunArgs),

    /// Run a refresh in the foreground and wait for it
    Refresh(RefreshArgs),

    /// Show marker, refresh window and cache state
    Status,

    /// Print rows of one cached table
    Show(ShowArgs),

    /// Write one cached table to a CSV file
    Export(ExportArgs),

    /// Clear the refresh marker so the next run refreshes
    Force,
}

/// Arguments for the run command
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Stop waiting after this many seconds; an unfinished refresh is
    /// abandoned and retried on the next launch
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

/// Arguments for the refresh command
#[derive(Args, Debug, Clone)]
pub struct RefreshArgs {
    /// Clear the refresh marker first
    #[arg(short, long)]
    pub force: bool,

    /// Fail after waiting this many seconds; the unfinished refresh is
    /// abandoned and retried on the next launch
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

/// Arguments for the show command
#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    /// Table to print
    #[arg(value_enum)]
    pub table: TableArg,

    /// Only titles containing this text (case-insensitive)
    #[arg(short, long)]
    pub search: Option<String>,

    /// Maximum number of rows to print
    #[arg(short, long, default_value_t = display::DEFAULT_SHOW_LIMIT)]
    pub limit: usize,
}

/// Arguments for the export command
#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// Table to export
    #[arg(value_enum)]
    pub table: TableArg,

    /// Destination CSV file
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    /// Only titles containing this text (case-insensitive)
    #[arg(short, long)]
    pub search: Option<String>,
}

/// Table names accepted on the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableArg {
    Bestjobs,
    Ejobs,
    External,
}

impl From<TableArg> for JobTable {
    fn from(arg: TableArg) -> Self {
        match arg {
            TableArg::Bestjobs => JobTable::BestJobs,
            TableArg::Ejobs => JobTable::EJobs,
            TableArg::External => JobTable::External,
        }
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Logging level requested by flags, if any
    pub fn log_level(&self) -> Option<tracing::Level> {
        if self.global.quiet {
            Some(tracing::Level::ERROR)
        } else if self.global.very_verbose {
            Some(tracing::Level::DEBUG)
        } else if self.global.verbose {
            Some(tracing::Level::INFO)
        } else {
            None
        }
    }

    /// Configuration values given as flags
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            cache_dir: self.global.cache_dir.clone(),
            window_hours: self.global.window_hours,
        }
    }
}

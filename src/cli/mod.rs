//! Command-line interface components
//!
//! This module contains CLI-specific code for the Job Fetcher application,
//! including argument parsing, command handlers and progress display.

pub mod args;
pub mod commands;
pub mod progress;

pub use args::{Cli, Commands, ExportArgs, GlobalArgs, RefreshArgs, RunArgs, ShowArgs, TableArg};
pub use commands::{
    handle_export, handle_force, handle_refresh, handle_run, handle_show, handle_status,
};
pub use progress::{follow_refresh, spinner};

//! Job Fetcher Library
//!
//! Fetches job listings from the BestJobs and eJobs boards, drops titles
//! containing banned words and keeps the result in a local CSV cache. A
//! persisted marker limits full refreshes to one per window, and refreshes
//! run in the background while cached data stays readable.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};

//! CSV cache for job tables
//!
//! The cache holds three tables in one directory:
//!
//! - `bjobs.csv` - BestJobs rows (mandatory)
//! - `ejobs.csv` - eJobs rows (mandatory)
//! - `externalJobs.csv` - rows from both sources that apply off-site (optional)
//!
//! Writes are atomic per file (temp file + rename). Reads are all-or-nothing
//! for the two mandatory tables.
//!
//! # Module Organization
//!
//! - [`config`] - Configuration types and defaults
//! - [`store`] - Reading and writing the tables
//!
//! # Examples
//!
//! ```rust,no_run
//! use job_fetcher::app::cache::{CacheConfig, CacheStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = CacheStore::new(&CacheConfig::default());
//! match store.load().await? {
//!     Some(dataset) => println!("{} BestJobs cached", dataset.bestjobs.len()),
//!     None => println!("No data yet"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod store;

#[cfg(test)]
pub mod tests;

// Re-export main public API
pub use config::CacheConfig;
pub use store::{decode_rows, encode_rows, CacheStore, CsvTable};

//! HTTP client for the job-board APIs
//!
//! The module is organized into two components:
//! - `config`: HTTP client configuration and building
//! - `http`: paced requests with retry on transient failures

pub mod config;
pub mod http;

pub use config::ClientConfig;
pub use http::HttpHandler;

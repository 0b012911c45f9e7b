//! Dragnet: a regex-driven concurrent web scraper
//!
//! This crate crawls a website from a seed address, extracts regex-defined
//! data from every fetched page, optionally follows discovered links up to a
//! bounded depth, and streams the extracted `(source, match)` pairs into a
//! pluggable sink.

pub mod client;
pub mod config;
pub mod crawler;
pub mod extract;
pub mod resolver;
pub mod sink;

use thiserror::Error;

/// Main error type for dragnet operations.
///
/// Only pre-flight failures escape [`crawler::crawl`]: a root address that
/// does not resolve, a target pattern that does not compile, or a client pool
/// that could not be configured. Per-page runtime faults are absorbed inside
/// the crawl and surface as log lines only.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("starting address is invalid or poorly formatted: {0}")]
    BadStartingAddress(String),

    #[error("invalid target pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error(transparent)]
    Pool(#[from] client::PoolError),

    #[error("sink error: {0}")]
    Sink(#[from] sink::SinkError),
}

/// Result type alias for dragnet operations
pub type Result<T> = std::result::Result<T, CrawlError>;

// Re-export commonly used types
pub use client::{ClientPool, FetchCapability, PoolSettings};
pub use config::CrawlConfig;
pub use sink::ResultSink;

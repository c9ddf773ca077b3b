//! Fare-Ledger: a daily flight-fare collector
//!
//! This crate walks a rolling window of departure dates for one route, reads the
//! fare listings off each search results page, and appends every observation to
//! an append-only CSV ledger for later analysis.

pub mod config;
pub mod crawler;
pub mod output;
pub mod page;
pub mod record;
pub mod store;
pub mod timing;

use chrono::NaiveDate;
use thiserror::Error;

/// Main error type for Fare-Ledger operations
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Page session fault: {0}")]
    Session(#[from] page::PageError),

    #[error("Gave up on {date} after {attempts} extraction attempts: {last}")]
    ExhaustedRetries {
        date: NaiveDate,
        attempts: u32,
        last: crawler::ExtractionFailure,
    },

    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector '{selector}' for {field}")]
    InvalidSelector { field: String, selector: String },
}

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_crawl, CrawlOrchestrator, CrawlReport, DayFetcher, DayOutcome, RecordExtractor};
pub use page::{HtmlPage, HttpSession, PageSession, StructuredPage};
pub use record::{CrawlWindow, FlightObservation};
pub use store::RecordStore;

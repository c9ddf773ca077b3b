//! Crawler module for collecting fares
//!
//! This module contains the core collection logic, including:
//! - Result page extraction into flight observations
//! - The per-date fetch and retry state machine
//! - Iteration over the date window

mod extractor;
mod fetcher;
mod orchestrator;

pub use extractor::{parse_clock, parse_day_offset, ExtractionFailure, RecordExtractor};
pub use fetcher::{DayFetcher, DayOutcome};
pub use orchestrator::{run_crawl, CrawlOrchestrator, CrawlReport};

//! Output module for reporting on the ledger
//!
//! This module handles:
//! - Reading the ledger back for statistics
//! - Printing run and ledger summaries

pub mod stats;

pub use stats::{load_statistics, print_statistics, summarize, LedgerStatistics};

use crate::crawler::CrawlReport;

/// Prints the totals of a finished crawl to stdout
pub fn print_report(report: &CrawlReport) {
    println!("=== Crawl Report ===\n");
    println!("  Dates searched: {}", report.dates_searched.len());
    println!(
        "  Dates without flights: {}",
        report.dates_without_results.len()
    );
    for date in &report.dates_without_results {
        println!("    - {}", date);
    }
    println!("  Fares stored: {}", report.records_stored);
}

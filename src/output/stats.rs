//! Statistics over the ledger file
//!
//! Counts only; the ledger keeps raw observations and this module does not
//! interpret prices.

use crate::store::{LedgerRows, RecordStore, StoreResult};
use crate::timing::Waiter;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, BTreeSet};

const COLLECTED: usize = 0;
const AIRLINE: usize = 1;
const DEPARTURE: usize = 2;
const CABIN: usize = 6;

/// Ledger statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerStatistics {
    /// Total number of fare rows
    pub total_rows: usize,

    /// Number of distinct extraction passes (distinct collection timestamps)
    pub extraction_passes: usize,

    /// Rows per carrier label
    pub rows_by_airline: BTreeMap<String, usize>,

    /// Departure dates with at least one row
    pub departure_dates: BTreeSet<NaiveDate>,

    /// Rows with an empty cabin column
    pub rows_without_cabin: usize,

    /// Rows whose column count does not match the header
    pub malformed_rows: usize,
}

/// Loads statistics from the ledger
pub fn load_statistics<W: Waiter>(store: &RecordStore<W>) -> StoreResult<LedgerStatistics> {
    let ledger = store.read_rows()?;
    Ok(summarize(&ledger, store.timestamp_format()))
}

/// Computes statistics over rows already read
///
/// `timestamp_format` is the format the ledger was written with; departures
/// that do not parse with it are left out of `departure_dates`.
pub fn summarize(ledger: &LedgerRows, timestamp_format: &str) -> LedgerStatistics {
    let mut stats = LedgerStatistics::default();
    let mut passes = BTreeSet::new();

    for row in &ledger.rows {
        if row.len() != ledger.header.len() {
            stats.malformed_rows += 1;
            continue;
        }

        stats.total_rows += 1;
        passes.insert(row[COLLECTED].as_str());
        *stats
            .rows_by_airline
            .entry(row[AIRLINE].clone())
            .or_insert(0) += 1;
        if let Ok(departure) = NaiveDateTime::parse_from_str(&row[DEPARTURE], timestamp_format) {
            stats.departure_dates.insert(departure.date());
        }
        if row[CABIN].is_empty() {
            stats.rows_without_cabin += 1;
        }
    }

    stats.extraction_passes = passes.len();
    stats
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &LedgerStatistics) {
    println!("=== Ledger Statistics ===\n");

    println!("Overview:");
    println!("  Fare rows: {}", stats.total_rows);
    println!("  Extraction passes: {}", stats.extraction_passes);
    println!("  Rows without cabin: {}", stats.rows_without_cabin);
    match (
        stats.departure_dates.first(),
        stats.departure_dates.last(),
    ) {
        (Some(first), Some(last)) => println!(
            "  Departure dates: {} ({} to {})",
            stats.departure_dates.len(),
            first,
            last
        ),
        _ => println!("  Departure dates: 0"),
    }
    if stats.malformed_rows > 0 {
        println!("  Malformed rows skipped: {}", stats.malformed_rows);
    }
    println!();

    println!("Rows by Airline:");
    let mut airline_counts: Vec<_> = stats.rows_by_airline.iter().collect();
    airline_counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    for (airline, count) in airline_counts {
        let percentage = if stats.total_rows > 0 {
            (*count as f64 / stats.total_rows as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", airline, count, percentage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LEDGER_COLUMNS;

    const FORMAT: &str = "%-m/%-d/%Y %-I:%M %p";

    fn row(collected: &str, airline: &str, cabin: &str) -> Vec<String> {
        vec![
            collected.to_string(),
            airline.to_string(),
            "2/10/2024 7:05 AM".to_string(),
            "2/10/2024 10:10 AM".to_string(),
            "nonstop".to_string(),
            "$129".to_string(),
            cabin.to_string(),
        ]
    }

    #[test]
    fn test_summarize_counts() {
        let mut ledger = LedgerRows {
            header: LEDGER_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: vec![
                row("2/1/2024 6:00 AM", "Delta", "Main"),
                row("2/1/2024 6:00 AM", "Delta", "Basic"),
                row("2/1/2024 6:01 AM", "Amtrak", ""),
                vec!["short".to_string()],
            ],
        };
        let mut later = row("2/1/2024 6:01 AM", "JetBlue", "Blue");
        later[DEPARTURE] = "2/12/2024 11:40 PM".to_string();
        ledger.rows.push(later);

        let stats = summarize(&ledger, FORMAT);

        assert_eq!(stats.total_rows, 4);
        assert_eq!(stats.extraction_passes, 2);
        assert_eq!(stats.rows_by_airline.get("Delta"), Some(&2));
        assert_eq!(stats.rows_by_airline.get("Amtrak"), Some(&1));
        assert_eq!(stats.rows_without_cabin, 1);
        assert_eq!(stats.malformed_rows, 1);
        assert_eq!(
            stats.departure_dates.iter().copied().collect::<Vec<_>>(),
            vec![
                NaiveDate::from_ymd_opt(2024, 2, 10).unwrap(),
                NaiveDate::from_ymd_opt(2024, 2, 12).unwrap()
            ]
        );
    }

    #[test]
    fn test_summarize_empty_ledger() {
        let ledger = LedgerRows {
            header: LEDGER_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: vec![],
        };
        assert_eq!(summarize(&ledger, FORMAT), LedgerStatistics::default());
    }
}

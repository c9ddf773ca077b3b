//! Integration tests for the per-date fetch state machine
//!
//! These drive `DayFetcher` against a fixture session with canned result pages
//! and a recording waiter, then read the ledger back.

mod support;

use fare_ledger::config::Config;
use fare_ledger::crawler::{DayFetcher, DayOutcome, ExtractionFailure};
use fare_ledger::store::RecordStore;
use fare_ledger::timing::FixedClock;
use fare_ledger::LedgerError;
use support::*;
use tempfile::TempDir;

fn fetcher(config: &Config, waiter: &RecordingWaiter) -> DayFetcher<RecordingWaiter, FixedClock> {
    let store = RecordStore::from_config(config, waiter.clone());
    store.ensure_initialized().expect("Failed to create ledger");
    DayFetcher::new(config, store, waiter.clone(), FixedClock(at("2024-02-01", 6, 0)))
        .expect("Failed to create fetcher")
}

#[tokio::test]
async fn test_no_results_container_stores_nothing() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir.path().join("flights.csv"), "2024-02-10", 1, 3);
    let waiter = RecordingWaiter::default();
    let fetcher = fetcher(&config, &waiter);

    let mut session = FixtureSession::new().with_page(date("2024-02-10"), empty_page());
    let outcome = fetcher
        .fetch_day(&mut session, date("2024-02-10"))
        .await
        .expect("No results is not an error");

    assert_eq!(outcome, DayOutcome::NoResults);
    assert_eq!(waiter.waits(), vec![SETTLE]);
    let ledger = fetcher.store().read_rows().unwrap();
    assert!(ledger.rows.is_empty());
}

#[tokio::test]
async fn test_overnight_scenario_end_to_end() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir.path().join("flights.csv"), "2024-02-10", 1, 3);
    let waiter = RecordingWaiter::default();
    let fetcher = fetcher(&config, &waiter);

    let mut session = FixtureSession::new().with_page(date("2024-02-10"), overnight_page());
    let outcome = fetcher
        .fetch_day(&mut session, date("2024-02-10"))
        .await
        .expect("Fetch failed");

    assert_eq!(
        outcome,
        DayOutcome::Stored {
            records: 2,
            attempts: 1
        }
    );
    assert_eq!(
        session.visited[0].as_str(),
        "https://fares.example.com/flights/TPA-JFK/2024-02-10?sort=price_a"
    );
    assert_eq!(waiter.waits(), vec![SETTLE]);

    let ledger = fetcher.store().read_rows().unwrap();
    assert_eq!(ledger.rows.len(), 2);
    for row in &ledger.rows {
        assert_eq!(row[0], "2/1/2024 6:00 AM");
        assert_eq!(row[1], "Delta");
        assert_eq!(row[2], "2/10/2024 7:05 AM");
        assert_eq!(row[3], "2/11/2024 10:10 AM");
        assert_eq!(row[4], "1 stop ATL");
    }
    assert_eq!(ledger.rows[0][5], "$129");
    assert_eq!(ledger.rows[0][6], "Basic Economy");
    assert_eq!(ledger.rows[1][5], "$189");
    assert_eq!(ledger.rows[1][6], "Main Cabin");
}

#[tokio::test]
async fn test_stale_page_recovers_within_attempts() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir.path().join("flights.csv"), "2024-02-10", 1, 3);
    let waiter = RecordingWaiter::default();
    let fetcher = fetcher(&config, &waiter);

    let mut session = FixtureSession::new()
        .with_page(date("2024-02-10"), overnight_page())
        .with_fault(date("2024-02-10"), Fault::Stale, 2);

    let outcome = fetcher
        .fetch_day(&mut session, date("2024-02-10"))
        .await
        .expect("Third attempt should succeed");

    assert_eq!(
        outcome,
        DayOutcome::Stored {
            records: 2,
            attempts: 3
        }
    );
    // One probe plus three extraction passes
    assert_eq!(session.select_calls(), 4);
    assert_eq!(waiter.waits(), vec![SETTLE, RETRY, RETRY]);
    assert_eq!(fetcher.store().read_rows().unwrap().rows.len(), 2);
}

#[tokio::test]
async fn test_success_short_circuits_remaining_attempts() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir.path().join("flights.csv"), "2024-02-10", 1, 5);
    let waiter = RecordingWaiter::default();
    let fetcher = fetcher(&config, &waiter);

    let mut session = FixtureSession::new()
        .with_page(date("2024-02-10"), overnight_page())
        .with_fault(date("2024-02-10"), Fault::Automation, 1);

    let outcome = fetcher
        .fetch_day(&mut session, date("2024-02-10"))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        DayOutcome::Stored {
            records: 2,
            attempts: 2
        }
    );
    assert_eq!(session.select_calls(), 3);
    assert_eq!(waiter.waits(), vec![SETTLE, RETRY]);
}

#[tokio::test]
async fn test_exhausted_retries_is_fatal() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir.path().join("flights.csv"), "2024-02-10", 1, 3);
    let waiter = RecordingWaiter::default();
    let fetcher = fetcher(&config, &waiter);

    let mut session = FixtureSession::new()
        .with_page(date("2024-02-10"), overnight_page())
        .with_fault(date("2024-02-10"), Fault::Stale, 10);

    let err = fetcher
        .fetch_day(&mut session, date("2024-02-10"))
        .await
        .unwrap_err();

    match err {
        LedgerError::ExhaustedRetries {
            date: failed,
            attempts,
            last,
        } => {
            assert_eq!(failed, date("2024-02-10"));
            assert_eq!(attempts, 3);
            assert!(last.is_stale());
        }
        other => panic!("expected ExhaustedRetries, got {other}"),
    }
    // Exactly max_attempts extraction passes, no pause after the last one
    assert_eq!(session.select_calls(), 1 + 3);
    assert_eq!(waiter.waits(), vec![SETTLE, RETRY, RETRY]);
    assert!(fetcher.store().read_rows().unwrap().rows.is_empty());
}

#[tokio::test]
async fn test_results_without_blocks_exhausts_retries() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir.path().join("flights.csv"), "2024-02-10", 1, 2);
    let waiter = RecordingWaiter::default();
    let fetcher = fetcher(&config, &waiter);

    let mut session = FixtureSession::new().with_page(date("2024-02-10"), results_page(&[]));

    let err = fetcher
        .fetch_day(&mut session, date("2024-02-10"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        LedgerError::ExhaustedRetries {
            attempts: 2,
            last: ExtractionFailure::NoResultBlocks,
            ..
        }
    ));
}

#[tokio::test]
async fn test_navigation_fault_propagates() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir.path().join("flights.csv"), "2024-02-10", 1, 3);
    let waiter = RecordingWaiter::default();
    let fetcher = fetcher(&config, &waiter);

    let mut session = FixtureSession::new().with_unreachable(date("2024-02-10"));

    let err = fetcher
        .fetch_day(&mut session, date("2024-02-10"))
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::Session(_)));
    assert!(waiter.waits().is_empty());
}

#[tokio::test]
async fn test_every_record_arrives_after_departure() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir.path().join("flights.csv"), "2024-02-10", 1, 3);
    let waiter = RecordingWaiter::default();
    let fetcher = fetcher(&config, &waiter);

    let page = results_page(&[
        block("Spirit", "5:45am", "8:50am", "nonstop", &[offer("$59", "Economy")]),
        block(
            "JetBlue",
            "9:59pm",
            r#"12:15am<sup class="days">+1</sup>"#,
            "nonstop",
            &[offer("$99", "Blue Basic"), decorative(), offer("$139", "Blue")],
        ),
        block(
            "Delta",
            "11:40pm",
            r#"9:05am<sup class="days">+2</sup>"#,
            "2 stops",
            &[offer("$310", "Main Cabin")],
        ),
    ]);
    let mut session = FixtureSession::new().with_page(date("2024-02-10"), page);

    fetcher
        .fetch_day(&mut session, date("2024-02-10"))
        .await
        .unwrap();

    let ledger = fetcher.store().read_rows().unwrap();
    assert_eq!(ledger.rows.len(), 4);
    let arrivals: Vec<_> = ledger.column(3).collect();
    assert_eq!(
        arrivals,
        vec![
            "2/10/2024 8:50 AM",
            "2/11/2024 12:15 AM",
            "2/11/2024 12:15 AM",
            "2/12/2024 9:05 AM"
        ]
    );
}

#[tokio::test]
async fn test_overnight_block_without_stops_label_is_stored() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir.path().join("flights.csv"), "2024-02-10", 1, 3);
    let waiter = RecordingWaiter::default();
    let fetcher = fetcher(&config, &waiter);

    let page = results_page(&[format!(
        r#"<li class="result">
             <div class="leg">
               <span class="carrier">Frontier</span>
               <span class="time">11:55pm</span>
               <span class="time">6:10am<sup class="days">+1</sup></span>
             </div>
             <div class="fares">{}</div>
           </li>"#,
        offer("$88", "Economy")
    )]);
    let mut session = FixtureSession::new().with_page(date("2024-02-10"), page);

    let outcome = fetcher
        .fetch_day(&mut session, date("2024-02-10"))
        .await
        .expect("A missing stops label must not fail the date");

    assert_eq!(
        outcome,
        DayOutcome::Stored {
            records: 1,
            attempts: 1
        }
    );
    let ledger = fetcher.store().read_rows().unwrap();
    assert_eq!(ledger.rows[0][3], "2/11/2024 6:10 AM");
    assert_eq!(ledger.rows[0][4], "+1");
}

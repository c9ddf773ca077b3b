//! Crawl orchestration over the date window
//!
//! One session, one date at a time, ascending. A date that exhausts its
//! extraction attempts ends the run; there is no checkpoint to resume from.

use crate::config::Config;
use crate::crawler::fetcher::{DayFetcher, DayOutcome};
use crate::page::{HttpSession, PageSession};
use crate::record::CrawlWindow;
use crate::store::RecordStore;
use crate::timing::{Clock, SystemClock, TokioWaiter, Waiter};
use crate::LedgerError;
use chrono::NaiveDate;

/// Totals for a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Dates navigated, in order
    pub dates_searched: Vec<NaiveDate>,

    /// Dates the site offered no flights for
    pub dates_without_results: Vec<NaiveDate>,

    /// Rows appended to the ledger
    pub records_stored: usize,
}

/// Walks the crawl window with a single [`DayFetcher`]
pub struct CrawlOrchestrator<W, C> {
    window: CrawlWindow,
    fetcher: DayFetcher<W, C>,
}

impl<W: Waiter + Clone, C: Clock> CrawlOrchestrator<W, C> {
    /// Creates an orchestrator for the configured route and window
    ///
    /// The window starts at `start-date`, or at the clock's current date when
    /// the config leaves it out.
    pub fn new(config: &Config, waiter: W, clock: C) -> Result<Self, LedgerError> {
        let start = config.search.start_or(clock.now().date());
        let window = CrawlWindow::new(start, config.search.days);
        let store = RecordStore::from_config(config, waiter.clone());
        let fetcher = DayFetcher::new(config, store, waiter, clock)?;

        Ok(Self { window, fetcher })
    }

    pub fn window(&self) -> CrawlWindow {
        self.window
    }

    pub fn fetcher(&self) -> &DayFetcher<W, C> {
        &self.fetcher
    }

    /// Runs every date in the window through `session`, then closes it
    ///
    /// The session is closed even when a date fails; the failure is returned
    /// afterwards and the remaining dates are not visited.
    pub async fn run<S: PageSession>(&self, session: &mut S) -> Result<CrawlReport, LedgerError> {
        self.fetcher.store().ensure_initialized()?;

        tracing::info!(
            "Crawling {} dates starting {} into {}",
            self.window.len(),
            self.window.start(),
            self.fetcher.store().path().display()
        );

        let mut report = CrawlReport::default();
        let outcome = self.crawl_window(session, &mut report).await;

        if let Err(e) = session.close().await {
            tracing::warn!("Failed to close page session: {}", e);
        }

        outcome?;

        tracing::info!(
            "Crawl finished: {} dates searched, {} without flights, {} fares stored",
            report.dates_searched.len(),
            report.dates_without_results.len(),
            report.records_stored
        );
        Ok(report)
    }

    async fn crawl_window<S: PageSession>(
        &self,
        session: &mut S,
        report: &mut CrawlReport,
    ) -> Result<(), LedgerError> {
        for date in self.window.dates() {
            report.dates_searched.push(date);
            match self.fetcher.fetch_day(session, date).await? {
                DayOutcome::NoResults => report.dates_without_results.push(date),
                DayOutcome::Stored { records, .. } => report.records_stored += records,
            }
        }
        Ok(())
    }
}

/// Runs a complete crawl with an HTTP session and real time
///
/// # Example
///
/// ```no_run
/// use fare_ledger::config::load_config;
/// use fare_ledger::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let report = run_crawl(config).await?;
/// println!("{} fares stored", report.records_stored);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config) -> Result<CrawlReport, LedgerError> {
    let orchestrator = CrawlOrchestrator::new(&config, TokioWaiter, SystemClock)?;
    let mut session = HttpSession::new(&config.session)?;
    orchestrator.run(&mut session).await
}

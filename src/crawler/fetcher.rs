//! Per-date fetch state machine
//!
//! For one departure date this module:
//! - Navigates the session to the price-sorted search page
//! - Waits a fixed settle time
//! - Tells "no flights that day" apart from a page that failed to read
//! - Retries extraction a bounded number of times with a fixed delay
//! - Hands successful batches to the ledger
//!
//! # Outcomes
//!
//! | Condition | Result |
//! |-----------|--------|
//! | No results container | `Ok(DayOutcome::NoResults)`, nothing stored |
//! | Extraction succeeds on attempt k | batch stored, `Ok(DayOutcome::Stored)` |
//! | Extraction fails | wait `retry-delay-ms`, try again |
//! | `max-attempts` failures | `Err(LedgerError::ExhaustedRetries)` |
//! | Navigation or probe fault | `Err(LedgerError::Session)` |

use crate::config::Config;
use crate::crawler::extractor::RecordExtractor;
use crate::page::PageSession;
use crate::record::FlightObservation;
use crate::store::RecordStore;
use crate::timing::{Clock, Waiter};
use crate::{ConfigError, LedgerError};
use chrono::NaiveDate;
use std::time::Duration;
use url::Url;

/// What happened to one date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayOutcome {
    /// The site offers no flights on this date
    NoResults,

    /// A batch was extracted and appended to the ledger
    Stored { records: usize, attempts: u32 },
}

/// Fetches and stores the fares for one date at a time
pub struct DayFetcher<W, C> {
    origin: String,
    destination: String,
    base_url: Url,
    page_settle: Duration,
    max_attempts: u32,
    retry_delay: Duration,
    echo: bool,
    extractor: RecordExtractor,
    store: RecordStore<W>,
    waiter: W,
    clock: C,
}

impl<W: Waiter, C: Clock> DayFetcher<W, C> {
    /// Builds a fetcher for the configured route
    ///
    /// # Arguments
    ///
    /// * `config` - Route, timing, output and selector settings
    /// * `store` - Ledger that receives every stored batch
    /// * `waiter` - Pauses for page settle and extraction retries
    /// * `clock` - Source of `collected_at`
    pub fn new(
        config: &Config,
        store: RecordStore<W>,
        waiter: W,
        clock: C,
    ) -> Result<Self, LedgerError> {
        let base_url = Url::parse(&config.search.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidUrl(format!(
                "base_url '{}' cannot carry path segments",
                config.search.base_url
            ))
            .into());
        }

        Ok(Self {
            origin: config.search.origin.clone(),
            destination: config.search.destination.clone(),
            base_url,
            page_settle: config.timing.page_settle(),
            max_attempts: config.timing.max_attempts.max(1),
            retry_delay: config.timing.retry_delay(),
            echo: config.output.echo,
            extractor: RecordExtractor::new(&config.selectors)?,
            store,
            waiter,
            clock,
        })
    }

    pub fn store(&self) -> &RecordStore<W> {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Search page for `date`, cheapest first
    ///
    /// `{base-url}/{ORIGIN}-{DESTINATION}/{YYYY-MM-DD}?sort=price_a`
    pub fn search_url(&self, date: NaiveDate) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push(&format!("{}-{}", self.origin, self.destination))
                .push(&date.format("%Y-%m-%d").to_string());
        }
        url.query_pairs_mut().append_pair("sort", "price_a");
        url
    }

    /// Runs the fetch state machine for one date
    pub async fn fetch_day<S: PageSession>(
        &self,
        session: &mut S,
        date: NaiveDate,
    ) -> Result<DayOutcome, LedgerError> {
        let url = self.search_url(date);
        tracing::info!(
            "Searching {} -> {} departing {}",
            self.origin,
            self.destination,
            date
        );

        session.navigate(&url).await?;
        self.waiter.wait(self.page_settle).await;

        if !self.extractor.has_results(session.page()?)? {
            tracing::info!("No flights offered on {}", date);
            return Ok(DayOutcome::NoResults);
        }

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let collected_at = self.clock.now();

            match self.extractor.extract(session.page()?, date, collected_at) {
                Ok(batch) => {
                    self.store.append(&batch).await?;
                    if self.echo {
                        self.echo_batch(&batch);
                    }
                    tracing::info!(
                        "Stored {} fares for {} (attempt {}/{})",
                        batch.len(),
                        date,
                        attempt,
                        self.max_attempts
                    );
                    return Ok(DayOutcome::Stored {
                        records: batch.len(),
                        attempts: attempt,
                    });
                }
                Err(failure) => {
                    if failure.is_stale() {
                        tracing::warn!(
                            "Stale page for {} on attempt {}/{}: {}",
                            date,
                            attempt,
                            self.max_attempts,
                            failure
                        );
                    } else {
                        tracing::warn!(
                            "Extraction failed for {} on attempt {}/{}: {}",
                            date,
                            attempt,
                            self.max_attempts,
                            failure
                        );
                    }

                    if attempt >= self.max_attempts {
                        tracing::error!("Giving up on {} after {} attempts", date, attempt);
                        return Err(LedgerError::ExhaustedRetries {
                            date,
                            attempts: attempt,
                            last: failure,
                        });
                    }

                    self.waiter.wait(self.retry_delay).await;
                }
            }
        }
    }

    fn echo_batch(&self, batch: &[FlightObservation]) {
        for record in batch {
            tracing::info!(
                "{} | {} -> {} | {} | {} | {}",
                record.airline,
                record.departure_time.format("%Y-%m-%d %H:%M"),
                record.arrival_time.format("%Y-%m-%d %H:%M"),
                record.stop_count,
                record.price,
                record.cabin_class.as_deref().unwrap_or("-")
            );
        }
    }
}

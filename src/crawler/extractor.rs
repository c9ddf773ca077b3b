//! Result page to flight observations
//!
//! A results page is a list of result blocks. Each block holds one itinerary
//! (carrier, departure, arrival, layovers) and a row of fare offer slots:
//!
//! ```text
//! block
//! ├── carrier label ── time (departure) ── time (arrival [+N]) ── stops
//! └── offer slots: [base] [decorative ...] [variant] [variant] [placeholder] ...
//! ```
//!
//! The base offer and every variant before the first placeholder each become
//! one [`FlightObservation`]; all of them share the itinerary fields.

use crate::config::SelectorConfig;
use crate::page::{PageError, PageResult, StructuredPage};
use crate::record::FlightObservation;
use crate::ConfigError;
use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use scraper::Selector;
use thiserror::Error;

/// Stop-count fallback for same-day arrivals without a layover label; rollover
/// arrivals fall back to their own `+N` marker
const SAME_DAY_MARKER: &str = "+0";

/// Why one extraction pass over a page failed
///
/// Every kind is transient from the fetcher's point of view; the kinds exist so
/// logs can tell a page that changed under the reader from a layout mismatch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionFailure {
    #[error("results container present but no result blocks found")]
    NoResultBlocks,

    #[error("missing {what} in result block {block}")]
    MissingElement { what: String, block: usize },

    #[error("unreadable {what} '{text}' in result block {block}")]
    Unparseable {
        what: String,
        text: String,
        block: usize,
    },

    #[error("page went stale while reading {context}")]
    StalePage { context: String },

    #[error("page automation fault while reading {context}: {message}")]
    Automation { context: String, message: String },
}

impl ExtractionFailure {
    /// Returns true if the page mutated while it was being read
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::StalePage { .. })
    }

    fn from_page(err: PageError, what: &str, block: usize) -> Self {
        match err {
            PageError::NotFound(_) => Self::MissingElement {
                what: what.to_string(),
                block,
            },
            PageError::Stale(detail) => Self::StalePage {
                context: format!("{} in result block {} ({})", what, block, detail),
            },
            PageError::Session(message) => Self::Automation {
                context: format!("{} in result block {}", what, block),
                message,
            },
        }
    }
}

type ExtractResult<T> = Result<T, ExtractionFailure>;

struct Selectors {
    results_container: Selector,
    result_block: Selector,
    airline: Selector,
    time: Selector,
    day_offset: Selector,
    stops: Selector,
    offer: Selector,
    price: Selector,
    cabin: Selector,
}

/// Reads flight observations off a results page
pub struct RecordExtractor {
    selectors: Selectors,
    variant_offset: usize,
    price_placeholders: Vec<String>,
    no_cabin_carriers: Vec<String>,
}

impl RecordExtractor {
    /// Compiles the configured selectors
    pub fn new(config: &SelectorConfig) -> Result<Self, ConfigError> {
        let compile = |field: &str, selector: &str| {
            Selector::parse(selector).map_err(|_| ConfigError::InvalidSelector {
                field: field.to_string(),
                selector: selector.to_string(),
            })
        };

        Ok(Self {
            selectors: Selectors {
                results_container: compile("results-container", &config.results_container)?,
                result_block: compile("result-block", &config.result_block)?,
                airline: compile("airline", &config.airline)?,
                time: compile("time", &config.time)?,
                day_offset: compile("day-offset", &config.day_offset)?,
                stops: compile("stops", &config.stops)?,
                offer: compile("offer", &config.offer)?,
                price: compile("price", &config.price)?,
                cabin: compile("cabin", &config.cabin)?,
            },
            variant_offset: config.variant_offset.max(1),
            price_placeholders: config
                .price_placeholders
                .iter()
                .map(|p| p.trim().to_lowercase())
                .collect(),
            no_cabin_carriers: config
                .no_cabin_carriers
                .iter()
                .map(|c| c.trim().to_lowercase())
                .collect(),
        })
    }

    /// Returns true if the page shows a results container
    ///
    /// A page without one has no flights for the date.
    pub fn has_results<P: StructuredPage>(&self, page: &P) -> PageResult<bool> {
        Ok(!page.select(&self.selectors.results_container)?.is_empty())
    }

    /// Extracts every fare on the page for a search on `date`
    ///
    /// All records share `collected_at`.
    pub fn extract<P: StructuredPage>(
        &self,
        page: &P,
        date: NaiveDate,
        collected_at: NaiveDateTime,
    ) -> ExtractResult<Vec<FlightObservation>> {
        let blocks = page
            .select(&self.selectors.result_block)
            .map_err(|e| match e {
                PageError::NotFound(_) => ExtractionFailure::NoResultBlocks,
                PageError::Stale(detail) => ExtractionFailure::StalePage {
                    context: format!("result blocks ({})", detail),
                },
                PageError::Session(message) => ExtractionFailure::Automation {
                    context: "result blocks".to_string(),
                    message,
                },
            })?;

        if blocks.is_empty() {
            return Err(ExtractionFailure::NoResultBlocks);
        }

        let mut batch = Vec::new();
        for (index, block) in blocks.iter().enumerate() {
            let records = self.extract_block(page, *block, index, date, collected_at)?;
            tracing::trace!("Block {} yielded {} fares", index, records.len());
            batch.extend(records);
        }

        tracing::debug!(
            "Extracted {} fares from {} result blocks for {}",
            batch.len(),
            blocks.len(),
            date
        );
        Ok(batch)
    }

    fn extract_block<P: StructuredPage>(
        &self,
        page: &P,
        block: P::Node,
        index: usize,
        date: NaiveDate,
        collected_at: NaiveDateTime,
    ) -> ExtractResult<Vec<FlightObservation>> {
        let fault = |what: &'static str| move |e| ExtractionFailure::from_page(e, what, index);

        let airline_node = page
            .first_within(block, &self.selectors.airline, "airline label")
            .map_err(fault("airline label"))?;
        let airline = page.text(airline_node).map_err(fault("airline label"))?;
        if airline.is_empty() {
            return Err(ExtractionFailure::MissingElement {
                what: "airline label text".to_string(),
                block: index,
            });
        }

        let times = page
            .next_siblings_matching(airline_node, &self.selectors.time)
            .map_err(fault("time containers"))?;
        let (departure_node, arrival_node) = match times.as_slice() {
            [departure, arrival, ..] => (*departure, *arrival),
            _ => {
                return Err(ExtractionFailure::MissingElement {
                    what: "departure and arrival times".to_string(),
                    block: index,
                })
            }
        };

        let departure_text = page.text(departure_node).map_err(fault("departure time"))?;
        let departure_clock = parse_clock(&departure_text).ok_or_else(|| {
            ExtractionFailure::Unparseable {
                what: "departure time".to_string(),
                text: departure_text.clone(),
                block: index,
            }
        })?;
        let departure_time = date.and_time(departure_clock);

        let arrival_text = page.text(arrival_node).map_err(fault("arrival time"))?;
        let indicator = page
            .select_within(arrival_node, &self.selectors.day_offset)
            .map_err(fault("day offset"))?
            .into_iter()
            .next();

        let (arrival_date, arrival_clock_text, stop_fallback) = match indicator {
            Some(node) => {
                let marker = page.text(node).map_err(fault("day offset"))?;
                let days = parse_day_offset(&marker).ok_or_else(|| {
                    ExtractionFailure::Unparseable {
                        what: "day offset".to_string(),
                        text: marker.clone(),
                        block: index,
                    }
                })?;
                let arrival_date = date.checked_add_days(Days::new(days)).ok_or_else(|| {
                    ExtractionFailure::Unparseable {
                        what: "day offset".to_string(),
                        text: marker.clone(),
                        block: index,
                    }
                })?;
                let clock_text = arrival_text.replacen(&marker, "", 1);
                (arrival_date, clock_text, marker)
            }
            None => (date, arrival_text.clone(), SAME_DAY_MARKER.to_string()),
        };

        let arrival_clock = parse_clock(&arrival_clock_text).ok_or_else(|| {
            ExtractionFailure::Unparseable {
                what: "arrival time".to_string(),
                text: arrival_text.clone(),
                block: index,
            }
        })?;
        let arrival_time = arrival_date.and_time(arrival_clock);

        if arrival_time < departure_time {
            return Err(ExtractionFailure::Unparseable {
                what: "arrival time (before departure)".to_string(),
                text: arrival_text,
                block: index,
            });
        }

        let stops_node = page
            .next_siblings_matching(airline_node, &self.selectors.stops)
            .map_err(fault("stops label"))?
            .into_iter()
            .next();
        // Without a layover label the day marker stands in for the stop count
        let stop_count = match stops_node {
            Some(node) => page.text(node).map_err(fault("stops label"))?,
            None => stop_fallback,
        };

        let offers = page
            .select_within(block, &self.selectors.offer)
            .map_err(fault("fare offers"))?;
        let Some((base_offer, _)) = offers.split_first() else {
            return Err(ExtractionFailure::MissingElement {
                what: "fare offer".to_string(),
                block: index,
            });
        };

        let carries_cabin = self.carries_cabin(&airline);
        let base_price = self.read_price(page, *base_offer, index)?;
        if self.is_placeholder(&base_price) {
            return Err(ExtractionFailure::Unparseable {
                what: "base price".to_string(),
                text: base_price,
                block: index,
            });
        }
        let base_cabin = self.read_cabin(page, *base_offer, carries_cabin, index)?;

        let base = FlightObservation {
            collected_at,
            airline,
            departure_time,
            arrival_time,
            stop_count,
            price: base_price,
            cabin_class: base_cabin,
        };

        let mut variants = Vec::new();
        for (slot, offer) in offers.iter().enumerate().skip(self.variant_offset) {
            let price = self.read_price(page, *offer, index)?;
            if self.is_placeholder(&price) {
                tracing::trace!("Placeholder in block {} slot {}, no further offers", index, slot);
                break;
            }
            let cabin = self.read_cabin(page, *offer, carries_cabin, index)?;
            variants.push(base.with_offer(price, cabin));
        }

        let mut records = Vec::with_capacity(variants.len() + 1);
        records.push(base);
        records.extend(variants);
        Ok(records)
    }

    fn read_price<P: StructuredPage>(
        &self,
        page: &P,
        offer: P::Node,
        index: usize,
    ) -> ExtractResult<String> {
        let node = page
            .first_within(offer, &self.selectors.price, "price")
            .map_err(|e| ExtractionFailure::from_page(e, "price", index))?;
        let price = page
            .text(node)
            .map_err(|e| ExtractionFailure::from_page(e, "price", index))?;
        if price.is_empty() {
            return Err(ExtractionFailure::MissingElement {
                what: "price text".to_string(),
                block: index,
            });
        }
        Ok(price)
    }

    fn read_cabin<P: StructuredPage>(
        &self,
        page: &P,
        offer: P::Node,
        carries_cabin: bool,
        index: usize,
    ) -> ExtractResult<Option<String>> {
        if !carries_cabin {
            return Ok(None);
        }
        let node = page
            .first_within(offer, &self.selectors.cabin, "cabin")
            .map_err(|e| ExtractionFailure::from_page(e, "cabin", index))?;
        let cabin = page
            .text(node)
            .map_err(|e| ExtractionFailure::from_page(e, "cabin", index))?;
        Ok(Some(cabin).filter(|c| !c.is_empty()))
    }

    fn is_placeholder(&self, price: &str) -> bool {
        let price = price.trim().to_lowercase();
        self.price_placeholders.iter().any(|p| *p == price)
    }

    fn carries_cabin(&self, airline: &str) -> bool {
        let airline = airline.to_lowercase();
        !self
            .no_cabin_carriers
            .iter()
            .any(|carrier| airline.contains(carrier.as_str()))
    }
}

/// Parses a displayed clock time: `7:05am`, `7:05 PM`, `19:05`
pub fn parse_clock(text: &str) -> Option<NaiveTime> {
    let compact = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();

    let (digits, pm) = if let Some(rest) = compact.strip_suffix("am") {
        (rest, Some(false))
    } else if let Some(rest) = compact.strip_suffix("pm") {
        (rest, Some(true))
    } else {
        (compact.as_str(), None)
    };

    let (hour, minute) = digits.split_once(':')?;
    if hour.is_empty() || minute.len() != 2 {
        return None;
    }
    let hour: u32 = hour.parse().ok()?;
    let minute: u32 = minute.parse().ok()?;

    let hour = match pm {
        Some(_) if hour == 0 || hour > 12 => return None,
        Some(true) => hour % 12 + 12,
        Some(false) => hour % 12,
        None => hour,
    };

    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Parses a `+N` day-rollover marker
pub fn parse_day_offset(marker: &str) -> Option<u64> {
    let digits = marker.trim().strip_prefix('+')?;
    let digits: String = digits.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

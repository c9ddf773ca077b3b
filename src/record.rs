//! Flight observation records and the crawl date window
//!
//! A [`FlightObservation`] is one purchasable fare seen on one results page. All
//! fare variants of an itinerary share the itinerary fields and differ only in
//! price and cabin.

use chrono::{Days, NaiveDate, NaiveDateTime};

/// One fare observed for one itinerary on one results page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightObservation {
    /// When the page was read (one sample per extraction pass)
    pub collected_at: NaiveDateTime,

    /// Carrier label as displayed
    pub airline: String,

    /// Departure on the queried date
    pub departure_time: NaiveDateTime,

    /// Arrival, including any day rollover
    pub arrival_time: NaiveDateTime,

    /// Layover summary, shared by every fare of the itinerary
    pub stop_count: String,

    /// Price as displayed, currency symbol and separators included
    pub price: String,

    /// Cabin label, absent for carriers without a cabin concept
    pub cabin_class: Option<String>,
}

impl FlightObservation {
    /// Builds the fare variant of this itinerary with its own price and cabin
    ///
    /// The itinerary fields are copied from `self`, which is left untouched.
    pub fn with_offer(&self, price: impl Into<String>, cabin_class: Option<String>) -> Self {
        Self {
            collected_at: self.collected_at,
            airline: self.airline.clone(),
            departure_time: self.departure_time,
            arrival_time: self.arrival_time,
            stop_count: self.stop_count.clone(),
            price: price.into(),
            cabin_class,
        }
    }

    /// Returns true if both records describe the same itinerary
    pub fn same_itinerary(&self, other: &Self) -> bool {
        self.collected_at == other.collected_at
            && self.airline == other.airline
            && self.departure_time == other.departure_time
            && self.arrival_time == other.arrival_time
            && self.stop_count == other.stop_count
    }

    /// Renders the record as display fields in ledger column order
    pub fn to_fields(&self, timestamp_format: &str) -> [String; 7] {
        [
            self.collected_at.format(timestamp_format).to_string(),
            self.airline.clone(),
            self.departure_time.format(timestamp_format).to_string(),
            self.arrival_time.format(timestamp_format).to_string(),
            self.stop_count.clone(),
            self.price.clone(),
            self.cabin_class.clone().unwrap_or_default(),
        ]
    }
}

/// Closed-open range of departure dates `[start, start + days)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlWindow {
    start: NaiveDate,
    days: u32,
}

impl CrawlWindow {
    pub fn new(start: NaiveDate, days: u32) -> Self {
        Self { start, days }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn len(&self) -> u32 {
        self.days
    }

    pub fn is_empty(&self) -> bool {
        self.days == 0
    }

    /// Last date in the window, if any
    pub fn last(&self) -> Option<NaiveDate> {
        self.days
            .checked_sub(1)
            .and_then(|offset| self.start.checked_add_days(Days::new(u64::from(offset))))
    }

    /// Dates in ascending order
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        (0..self.days).map_while(move |offset| start.checked_add_days(Days::new(u64::from(offset))))
    }
}

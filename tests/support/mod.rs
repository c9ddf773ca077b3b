//! Shared fixtures for the integration tests
//!
//! A fixture session serves canned result pages per departure date and can be
//! told to make a date's page go stale (or fault) for a number of reads.

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use ego_tree::NodeId;
use fare_ledger::config::{parse_config, Config};
use fare_ledger::page::{HtmlPage, PageError, PageResult, PageSession, StructuredPage};
use fare_ledger::timing::Waiter;
use scraper::Selector;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;
use url::Url;

/// Waiter that records requested pauses without sleeping
#[derive(Clone, Default)]
pub struct RecordingWaiter {
    waits: Rc<RefCell<Vec<Duration>>>,
}

impl RecordingWaiter {
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.borrow().clone()
    }
}

impl Waiter for RecordingWaiter {
    async fn wait(&self, duration: Duration) {
        self.waits.borrow_mut().push(duration);
    }
}

pub const SETTLE: Duration = Duration::from_millis(1500);
pub const RETRY: Duration = Duration::from_millis(500);

/// Test configuration with the fixture page layout
pub fn test_config(csv_path: &Path, start: &str, days: u32, max_attempts: u32) -> Config {
    parse_config(&format!(
        r#"
[search]
origin = "TPA"
destination = "JFK"
start-date = "{start}"
days = {days}
base-url = "https://fares.example.com/flights"

[timing]
page-settle-ms = {settle}
max-attempts = {max_attempts}
retry-delay-ms = {retry}
write-retry-delay-ms = 10

[output]
csv-path = "{csv}"
echo = true

[selectors]
results-container = ".results"
result-block = ".result"
airline = ".carrier"
time = ".time"
day-offset = ".days"
stops = ".stops"
offer = ".offer"
price = ".price"
cabin = ".cabin"
variant-offset = 2
price-placeholders = ["View Deal"]
no-cabin-carriers = ["Amtrak"]
"#,
        start = start,
        days = days,
        settle = SETTLE.as_millis(),
        retry = RETRY.as_millis(),
        max_attempts = max_attempts,
        csv = csv_path.display().to_string().replace('\\', "\\\\"),
    ))
    .expect("test config must be valid")
}

/// One fare offer slot
pub fn offer(price: &str, cabin: &str) -> String {
    format!(
        r#"<div class="offer"><span class="price">{}</span><span class="cabin">{}</span></div>"#,
        price, cabin
    )
}

/// The summary slot between the base offer and the variants
pub fn decorative() -> String {
    r#"<div class="offer"><span class="price">More fares</span></div>"#.to_string()
}

/// One result block
pub fn block(carrier: &str, depart: &str, arrive: &str, stops: &str, offers: &[String]) -> String {
    format!(
        r#"<li class="result">
             <div class="leg">
               <span class="carrier">{}</span>
               <span class="time">{}</span>
               <span class="time">{}</span>
               <span class="stops">{}</span>
             </div>
             <div class="fares">{}</div>
           </li>"#,
        carrier,
        depart,
        arrive,
        stops,
        offers.concat()
    )
}

/// A results page holding `blocks`
pub fn results_page(blocks: &[String]) -> String {
    format!(
        r#"<html><body><ul class="results">{}</ul></body></html>"#,
        blocks.concat()
    )
}

/// The page the site shows for a date without flights
pub fn empty_page() -> String {
    "<html><body><p>No flights match your search</p></body></html>".to_string()
}

/// The overnight TPA-JFK itinerary with two fares
pub fn overnight_page() -> String {
    results_page(&[block(
        "Delta",
        "7:05am",
        r#"10:10am<sup class="days">+1</sup>"#,
        "1 stop ATL",
        &[
            offer("$129", "Basic Economy"),
            decorative(),
            offer("$189", "Main Cabin"),
        ],
    )])
}

/// How a page misbehaves while being read
#[derive(Debug, Clone, Copy)]
pub enum Fault {
    Stale,
    Automation,
}

/// Page that fails text reads while `failures` remain
pub struct FlakyPage {
    inner: HtmlPage,
    fault: Fault,
    failures: Rc<Cell<u32>>,
    selects: Rc<Cell<u32>>,
}

impl FlakyPage {
    fn check(&self) -> PageResult<()> {
        let left = self.failures.get();
        if left == 0 {
            return Ok(());
        }
        self.failures.set(left - 1);
        Err(match self.fault {
            Fault::Stale => PageError::Stale("element detached".to_string()),
            Fault::Automation => PageError::Session("renderer crashed".to_string()),
        })
    }
}

impl StructuredPage for FlakyPage {
    type Node = NodeId;

    fn select(&self, selector: &Selector) -> PageResult<Vec<NodeId>> {
        self.selects.set(self.selects.get() + 1);
        self.inner.select(selector)
    }

    fn select_within(&self, scope: NodeId, selector: &Selector) -> PageResult<Vec<NodeId>> {
        self.inner.select_within(scope, selector)
    }

    fn parent(&self, node: NodeId) -> PageResult<Option<NodeId>> {
        self.inner.parent(node)
    }

    fn next_siblings(&self, node: NodeId) -> PageResult<Vec<NodeId>> {
        self.inner.next_siblings(node)
    }

    fn text(&self, node: NodeId) -> PageResult<String> {
        self.check()?;
        self.inner.text(node)
    }

    fn next_siblings_matching(
        &self,
        node: NodeId,
        selector: &Selector,
    ) -> PageResult<Vec<NodeId>> {
        self.inner.next_siblings_matching(node, selector)
    }
}

/// Session serving canned pages keyed by departure date
#[derive(Default)]
pub struct FixtureSession {
    pages: HashMap<NaiveDate, String>,
    faults: HashMap<NaiveDate, (Fault, u32)>,
    unreachable: Vec<NaiveDate>,
    current: Option<FlakyPage>,
    selects: Rc<Cell<u32>>,
    pub visited: Vec<Url>,
    pub closed: bool,
}

impl FixtureSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, date: NaiveDate, html: String) -> Self {
        self.pages.insert(date, html);
        self
    }

    /// Makes the first `reads` text reads on `date`'s page fail
    pub fn with_fault(mut self, date: NaiveDate, fault: Fault, reads: u32) -> Self {
        self.faults.insert(date, (fault, reads));
        self
    }

    pub fn with_unreachable(mut self, date: NaiveDate) -> Self {
        self.unreachable.push(date);
        self
    }

    /// Page-wide selects so far: one results probe per loaded page plus one
    /// block lookup per extraction pass
    pub fn select_calls(&self) -> u32 {
        self.selects.get()
    }

    pub fn visited_dates(&self) -> Vec<NaiveDate> {
        self.visited.iter().filter_map(date_of).collect()
    }
}

fn date_of(url: &Url) -> Option<NaiveDate> {
    let last = url.path_segments()?.last()?;
    NaiveDate::parse_from_str(last, "%Y-%m-%d").ok()
}

impl PageSession for FixtureSession {
    type Page = FlakyPage;

    async fn navigate(&mut self, url: &Url) -> PageResult<()> {
        self.visited.push(url.clone());
        self.current = None;

        let date = date_of(url).ok_or_else(|| PageError::Session(format!("bad url {}", url)))?;
        if self.unreachable.contains(&date) {
            return Err(PageError::Session(format!("{} timed out", url)));
        }

        let html = self.pages.get(&date).cloned().unwrap_or_else(empty_page);
        let (fault, reads) = self.faults.get(&date).copied().unwrap_or((Fault::Stale, 0));
        self.current = Some(FlakyPage {
            inner: HtmlPage::parse(&html),
            fault,
            failures: Rc::new(Cell::new(reads)),
            selects: Rc::clone(&self.selects),
        });
        Ok(())
    }

    fn page(&self) -> PageResult<&FlakyPage> {
        self.current
            .as_ref()
            .ok_or_else(|| PageError::Session("no page loaded".to_string()))
    }

    async fn close(&mut self) -> PageResult<()> {
        self.closed = true;
        self.current = None;
        Ok(())
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn at(date_str: &str, h: u32, m: u32) -> NaiveDateTime {
    date(date_str).and_hms_opt(h, m, 0).unwrap()
}

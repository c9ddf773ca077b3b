use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Fare-Ledger
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub search: SearchConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
}

/// Route and date window to search
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Origin airport code (e.g., "TPA")
    pub origin: String,

    /// Destination airport code (e.g., "JFK")
    pub destination: String,

    /// First departure date; today (local) when omitted
    #[serde(rename = "start-date", default)]
    pub start_date: Option<NaiveDate>,

    /// Number of consecutive dates to search
    pub days: u32,

    /// Search page root; the route and date are appended as path segments
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,
}

/// Fixed delays and attempt bounds
#[derive(Debug, Clone, Deserialize)]
pub struct TimingConfig {
    /// Time given to a freshly loaded page before it is read (milliseconds)
    #[serde(rename = "page-settle-ms", default = "default_page_settle_ms")]
    pub page_settle_ms: u64,

    /// Extraction attempts per date before the run is aborted
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Pause between extraction attempts (milliseconds)
    #[serde(rename = "retry-delay-ms", default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Pause between attempts to write the ledger (milliseconds)
    #[serde(rename = "write-retry-delay-ms", default = "default_write_retry_delay_ms")]
    pub write_retry_delay_ms: u64,

    /// Cap on ledger write attempts; unbounded when omitted
    #[serde(rename = "max-write-attempts", default)]
    pub max_write_attempts: Option<u32>,
}

/// Ledger output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the CSV ledger
    #[serde(rename = "csv-path")]
    pub csv_path: String,

    /// Echo every stored record to the log
    #[serde(default)]
    pub echo: bool,

    /// chrono format used to render timestamps in the ledger
    #[serde(rename = "timestamp-format", default = "default_timestamp_format")]
    pub timestamp_format: String,
}

/// HTTP session configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Whole-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// CSS selectors describing the results page layout
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Container present only when the date has results
    #[serde(rename = "results-container")]
    pub results_container: String,

    /// One itinerary with its fare offers
    #[serde(rename = "result-block")]
    pub result_block: String,

    /// Carrier label inside a block
    pub airline: String,

    /// Departure/arrival time containers, siblings of the carrier label
    pub time: String,

    /// "+N" marker inside the arrival container
    #[serde(rename = "day-offset")]
    pub day_offset: String,

    /// Layover description, sibling of the carrier label
    pub stops: String,

    /// Fare offer slots inside a block
    pub offer: String,

    /// Price inside an offer slot
    pub price: String,

    /// Cabin label inside an offer slot
    pub cabin: String,

    /// Index of the first variant offer slot; slots between the base offer and this one are decorative
    #[serde(rename = "variant-offset")]
    pub variant_offset: usize,

    /// Price texts that mark the end of extractable offers
    #[serde(rename = "price-placeholders")]
    pub price_placeholders: Vec<String>,

    /// Carriers without a cabin concept (rail, bus)
    #[serde(rename = "no-cabin-carriers")]
    pub no_cabin_carriers: Vec<String>,
}

impl TimingConfig {
    pub fn page_settle(&self) -> Duration {
        Duration::from_millis(self.page_settle_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn write_retry_delay(&self) -> Duration {
        Duration::from_millis(self.write_retry_delay_ms)
    }
}

impl SearchConfig {
    /// Start date, falling back to the given day
    pub fn start_or(&self, today: NaiveDate) -> NaiveDate {
        self.start_date.unwrap_or(today)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            page_settle_ms: default_page_settle_ms(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            write_retry_delay_ms: default_write_retry_delay_ms(),
            max_write_attempts: None,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            results_container: "div[class*='resultsList']".to_string(),
            result_block: "div.nrc6".to_string(),
            airline: ".c_cgF".to_string(),
            time: ".vmXl".to_string(),
            day_offset: "sup".to_string(),
            stops: ".JWEO-stops-text".to_string(),
            offer: ".M_JD-provider".to_string(),
            price: ".f8F1-price-text".to_string(),
            cabin: ".DOum-name".to_string(),
            variant_offset: 2,
            price_placeholders: vec!["View Deal".to_string()],
            no_cabin_carriers: vec!["Amtrak".to_string()],
        }
    }
}

fn default_base_url() -> String {
    "https://www.kayak.com/flights".to_string()
}

fn default_page_settle_ms() -> u64 {
    15_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    5_000
}

fn default_write_retry_delay_ms() -> u64 {
    1_000
}

fn default_timestamp_format() -> String {
    "%-m/%-d/%Y %-I:%M %p".to_string()
}

fn default_user_agent() -> String {
    concat!("fare-ledger/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

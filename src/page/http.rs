//! HTTP-backed page session
//!
//! Fetches each search URL with a plain GET and parses the body as the rendered
//! page. Suited to a rendering proxy or a server-rendered results view; script
//! execution is out of reach.
//!
//! The parsed page is a snapshot and never goes stale. Extraction retries read
//! the same document without a new request, so a layout mismatch fails the
//! same way on every attempt and a date only gives up after
//! `max-attempts × retry-delay`.

use crate::config::SessionConfig;
use crate::page::{HtmlPage, PageError, PageResult, PageSession};
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Page session over a reqwest client
pub struct HttpSession {
    client: Client,
    current: Option<HtmlPage>,
}

impl HttpSession {
    /// Builds a session with the configured user agent and timeout
    ///
    /// # Example
    ///
    /// ```no_run
    /// use fare_ledger::config::SessionConfig;
    /// use fare_ledger::page::HttpSession;
    ///
    /// let session = HttpSession::new(&SessionConfig::default()).unwrap();
    /// ```
    pub fn new(config: &SessionConfig) -> PageResult<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| PageError::Session(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            current: None,
        })
    }
}

impl PageSession for HttpSession {
    type Page = HtmlPage;

    async fn navigate(&mut self, url: &Url) -> PageResult<()> {
        // A failed navigation must not leave the previous date's page readable
        self.current = None;

        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| classify_transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PageError::Session(format!("{} returned HTTP {}", url, status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| PageError::Session(format!("failed to read body of {}: {}", url, e)))?;

        self.current = Some(HtmlPage::parse(&body));
        Ok(())
    }

    fn page(&self) -> PageResult<&HtmlPage> {
        self.current
            .as_ref()
            .ok_or_else(|| PageError::Session("no page loaded".to_string()))
    }

    async fn close(&mut self) -> PageResult<()> {
        self.current = None;
        Ok(())
    }
}

fn classify_transport_error(url: &Url, e: reqwest::Error) -> PageError {
    if e.is_timeout() {
        PageError::Session(format!("request timeout for {}", url))
    } else if e.is_connect() {
        PageError::Session(format!("connection refused for {}", url))
    } else {
        PageError::Session(format!("request to {} failed: {}", url, e))
    }
}

//! Page session capability
//!
//! The extractor never talks to a browser directly. It reads a [`StructuredPage`],
//! a tree of element nodes that can be queried with CSS selectors and walked
//! relative to a found node. A [`PageSession`] navigates and hands out the current
//! page. This module provides:
//! - The capability traits and their error type
//! - [`HtmlPage`], a page over a parsed HTML document
//! - [`HttpSession`], a session that fetches pre-rendered HTML over HTTP

mod html;
mod http;

pub use html::HtmlPage;
pub use http::HttpSession;

use scraper::Selector;
use std::fmt::Debug;
use thiserror::Error;
use url::Url;

/// Faults raised by a page or a session
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    #[error("Element not found: {0}")]
    NotFound(String),

    #[error("Stale element reference: {0}")]
    Stale(String),

    #[error("Session error: {0}")]
    Session(String),
}

/// Result type for page operations
pub type PageResult<T> = Result<T, PageError>;

/// Read access to a rendered page as a tree of element nodes
///
/// Queries that match nothing return an empty list; `NotFound` is reserved for
/// lookups of a single required element (see [`StructuredPage::first_within`]).
pub trait StructuredPage {
    /// Handle to one element node
    type Node: Copy + Debug + PartialEq;

    /// All elements in the page matching `selector`, in document order
    fn select(&self, selector: &Selector) -> PageResult<Vec<Self::Node>>;

    /// All descendants of `scope` matching `selector`, in document order
    fn select_within(&self, scope: Self::Node, selector: &Selector)
        -> PageResult<Vec<Self::Node>>;

    /// Nearest element ancestor
    fn parent(&self, node: Self::Node) -> PageResult<Option<Self::Node>>;

    /// Element siblings that come after `node`, in document order
    fn next_siblings(&self, node: Self::Node) -> PageResult<Vec<Self::Node>>;

    /// Text content of `node` and its descendants, whitespace collapsed
    fn text(&self, node: Self::Node) -> PageResult<String>;

    /// First descendant of `scope` matching `selector`, or `NotFound`
    fn first_within(
        &self,
        scope: Self::Node,
        selector: &Selector,
        what: &str,
    ) -> PageResult<Self::Node> {
        self.select_within(scope, selector)?
            .into_iter()
            .next()
            .ok_or_else(|| PageError::NotFound(what.to_string()))
    }

    /// Following siblings of `node` that themselves match `selector`
    fn next_siblings_matching(
        &self,
        node: Self::Node,
        selector: &Selector,
    ) -> PageResult<Vec<Self::Node>>;
}

/// A navigable page session (one browser tab, one HTTP client, ...)
#[allow(async_fn_in_trait)]
pub trait PageSession {
    type Page: StructuredPage;

    /// Loads `url` and makes it the current page
    async fn navigate(&mut self, url: &Url) -> PageResult<()>;

    /// The page loaded by the last successful navigation
    fn page(&self) -> PageResult<&Self::Page>;

    /// Releases the session
    async fn close(&mut self) -> PageResult<()>;
}

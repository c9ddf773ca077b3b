//! Structured page over a parsed HTML document

use crate::page::{PageError, PageResult, StructuredPage};
use ego_tree::NodeId;
use scraper::{ElementRef, Html, Selector};

/// An HTML document parsed once and queried in place
pub struct HtmlPage {
    document: Html,
}

impl HtmlPage {
    /// Parses a full HTML document
    ///
    /// Parsing is lenient: malformed markup still produces a tree.
    pub fn parse(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
        }
    }

    fn element(&self, node: NodeId) -> PageResult<ElementRef<'_>> {
        self.document
            .tree
            .get(node)
            .and_then(ElementRef::wrap)
            .ok_or_else(|| PageError::Stale(format!("node {:?} is not in the document", node)))
    }
}

impl std::fmt::Debug for HtmlPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HtmlPage")
            .field("nodes", &self.document.tree.nodes().count())
            .finish()
    }
}

impl StructuredPage for HtmlPage {
    type Node = NodeId;

    fn select(&self, selector: &Selector) -> PageResult<Vec<NodeId>> {
        Ok(self.document.select(selector).map(|e| e.id()).collect())
    }

    fn select_within(&self, scope: NodeId, selector: &Selector) -> PageResult<Vec<NodeId>> {
        Ok(self.element(scope)?.select(selector).map(|e| e.id()).collect())
    }

    fn parent(&self, node: NodeId) -> PageResult<Option<NodeId>> {
        Ok(self
            .element(node)?
            .parent()
            .and_then(ElementRef::wrap)
            .map(|e| e.id()))
    }

    fn next_siblings(&self, node: NodeId) -> PageResult<Vec<NodeId>> {
        Ok(self
            .element(node)?
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .map(|e| e.id())
            .collect())
    }

    fn text(&self, node: NodeId) -> PageResult<String> {
        let raw = self.element(node)?.text().collect::<String>();
        Ok(raw.split_whitespace().collect::<Vec<_>>().join(" "))
    }

    fn next_siblings_matching(
        &self,
        node: NodeId,
        selector: &Selector,
    ) -> PageResult<Vec<NodeId>> {
        Ok(self
            .element(node)?
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .filter(|e| selector.matches(e))
            .map(|e| e.id())
            .collect())
    }
}

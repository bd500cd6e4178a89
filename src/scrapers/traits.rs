use crate::error::Result;
use async_trait::async_trait;

/// Snapshot of a rendered page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedPage {
    /// The page loaded but the listing container never appeared
    Empty,
    Html(String),
}

impl RenderedPage {
    pub fn html(&self) -> Option<&str> {
        match self {
            RenderedPage::Empty => None,
            RenderedPage::Html(html) => Some(html),
        }
    }
}

/// Renders pages for the extractors.
///
/// The headless Chrome session is the production implementation; tests plug
/// in scripted renderers.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Navigate to a search-results page, wait for listing cards, scroll to
    /// load lazy content and return the resulting HTML.
    async fn render_listing_page(&self, url: &str) -> Result<RenderedPage>;

    /// Navigate to a listing's detail page, try to reveal the phone number
    /// and return the resulting HTML.
    async fn render_detail_page(&self, url: &str) -> Result<RenderedPage>;
}

//! Rental listing scout: resolves search targets, scrapes search-results
//! pages with headless Chrome, deduplicates across targets and enriches
//! individual listings with contact details.

pub mod config;
pub mod error;
pub mod models;
pub mod progress;
pub mod run_guard;
pub mod scrapers;
pub mod targets;

pub use config::ScoutConfig;
pub use error::{Result, ScoutError};
pub use models::{ContactInfo, Listing, ScrapeReport, ScrapeRequest, SearchParams, Target};
pub use progress::{FnSink, NoopSink, ProgressSink};
pub use run_guard::ScrapeGuard;
pub use targets::{LocalityTable, Resolution};

use scrapers::{Aggregator, BrowserSession, ContactEnricher};

/// Run one aggregation pass in a fresh browser session.
///
/// The session lives exactly as long as this call and is torn down on every
/// exit path. Browser launch failures propagate; per-target failures only
/// show up in the returned logs.
pub async fn scrape(
    config: &ScoutConfig,
    request: &ScrapeRequest,
    progress: Option<&dyn ProgressSink>,
) -> Result<ScrapeReport> {
    let session = BrowserSession::launch(config).await?;
    let report = Aggregator::new(config.clone())
        .run(&session, request, progress)
        .await;
    session.shutdown().await;
    report
}

/// Fetch contact details for one listing. Never fails; see
/// [`ContactEnricher::fetch_contact`].
pub async fn fetch_contact(config: &ScoutConfig, listing_id: &str) -> ContactInfo {
    ContactEnricher::new(config.clone())
        .fetch_contact(listing_id)
        .await
}

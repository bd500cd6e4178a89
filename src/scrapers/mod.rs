pub mod aggregator;
pub mod browser;
pub mod contact;
pub mod listing;
pub mod query;
pub mod selectors;
pub mod traits;

pub use aggregator::{dedup_and_cap, filter_unseen, Aggregator};
pub use browser::BrowserSession;
pub use contact::{extract_contact, fetch_contact_with, ContactEnricher};
pub use listing::{extract_listings, parse_price};
pub use query::{detail_url, search_url};
pub use traits::{PageRenderer, RenderedPage};

use std::collections::HashSet;
use tracing::{info, warn};

use crate::config::ScoutConfig;
use crate::error::Result;
use crate::models::{Listing, ScrapeReport, ScrapeRequest, Target};
use crate::progress::{self, ProgressSink};
use crate::scrapers::listing::extract_listings;
use crate::scrapers::query::search_url;
use crate::scrapers::traits::PageRenderer;

/// Runs the list extractor across targets, one at a time, and merges the
/// results.
pub struct Aggregator {
    config: ScoutConfig,
}

impl Aggregator {
    pub fn new(config: ScoutConfig) -> Self {
        Self { config }
    }

    /// Scrape every target in order, tag listings with their target's display
    /// name, drop duplicate ids (first seen wins) and cap the result.
    ///
    /// A target whose page fails to load contributes nothing and is reported
    /// in the logs; only errors outside a single target propagate.
    pub async fn run(
        &self,
        renderer: &dyn PageRenderer,
        request: &ScrapeRequest,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<ScrapeReport> {
        let mut logs = Vec::new();
        let mut collected: Vec<Listing> = Vec::new();

        for (index, target) in request.targets.iter().enumerate() {
            if index > 0 && !self.config.inter_target_delay.is_zero() {
                tokio::time::sleep(self.config.inter_target_delay).await;
            }

            let url = search_url(&self.config.base_url, target, &request.params);
            match self.scrape_target(renderer, target, &url).await {
                Ok(found) => {
                    record(
                        &mut logs,
                        progress,
                        format!("scraping `{}`… found {} listings", target.display_name, found.len()),
                    );
                    collected.extend(found);
                }
                Err(e) if e.is_target_level() => {
                    warn!("Target {} failed: {e}", target.display_name);
                    record(
                        &mut logs,
                        progress,
                        format!("scraping `{}`… failed: {e}", target.display_name),
                    );
                }
                Err(e) => return Err(e),
            }
        }

        let before = collected.len();
        let (listings, duplicates) = dedup_and_cap(collected, request.max_results);

        record(
            &mut logs,
            progress,
            format!(
                "collected {before} listings, {} unique ({duplicates} duplicates removed)",
                before - duplicates
            ),
        );
        record(&mut logs, progress, format!("total {} listings", listings.len()));

        Ok(ScrapeReport { listings, logs })
    }

    async fn scrape_target(
        &self,
        renderer: &dyn PageRenderer,
        target: &Target,
        url: &str,
    ) -> Result<Vec<Listing>> {
        let page = renderer.render_listing_page(url).await?;
        let mut listings = page
            .html()
            .map(|html| extract_listings(html, &self.config.base_url))
            .unwrap_or_default();

        for listing in &mut listings {
            listing.region = target.display_name.clone();
        }
        Ok(listings)
    }
}

fn record(logs: &mut Vec<String>, sink: Option<&dyn ProgressSink>, line: String) {
    info!("{line}");
    progress::emit(sink, &line);
    logs.push(line);
}

/// Drop listings whose id was already seen, keeping the first occurrence and
/// the original order, then truncate to `cap`. Returns the kept listings and
/// the number of duplicates removed.
pub fn dedup_and_cap(listings: Vec<Listing>, cap: usize) -> (Vec<Listing>, usize) {
    let total = listings.len();
    let mut seen = HashSet::new();
    let mut unique: Vec<Listing> = listings
        .into_iter()
        .filter(|listing| seen.insert(listing.id.clone()))
        .collect();

    let duplicates = total - unique.len();
    unique.truncate(cap);
    (unique, duplicates)
}

/// Keep only listings the persistence layer has not seen in earlier runs.
pub fn filter_unseen<F>(listings: Vec<Listing>, has_id: F) -> Vec<Listing>
where
    F: Fn(&str) -> bool,
{
    listings
        .into_iter()
        .filter(|listing| !has_id(&listing.id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn listing(id: &str, region: &str) -> Listing {
        Listing {
            id: id.to_string(),
            title: format!("listing {id}"),
            price: 10000,
            address: None,
            subway_info: None,
            layout: None,
            tags: Vec::new(),
            images: Vec::new(),
            url: format!("https://rent.591.com.tw/{id}"),
            region: region.to_string(),
            scraped_at: Utc::now(),
        }
    }

    #[test]
    fn first_occurrence_wins() {
        let input = vec![listing("1", "A"), listing("2", "A"), listing("1", "B"), listing("3", "B")];
        let (kept, duplicates) = dedup_and_cap(input, 10);

        let ids: Vec<_> = kept.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(kept[0].region, "A");
        assert_eq!(duplicates, 1);
    }

    #[test]
    fn cap_applies_after_dedup() {
        let input = (0..7).map(|i| listing(&i.to_string(), "A")).collect();
        let (kept, duplicates) = dedup_and_cap(input, 5);
        assert_eq!(kept.len(), 5);
        assert_eq!(kept[4].id, "4");
        assert_eq!(duplicates, 0);

        let (kept, _) = dedup_and_cap(vec![listing("1", "A")], 0);
        assert!(kept.is_empty());
    }

    #[test]
    fn filter_unseen_uses_lookup() {
        let seen: HashSet<&str> = ["2"].into_iter().collect();
        let fresh = filter_unseen(vec![listing("1", "A"), listing("2", "A")], |id| seen.contains(id));
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].id, "1");
    }
}

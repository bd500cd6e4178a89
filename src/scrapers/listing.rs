use chrono::Utc;
use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::LazyLock;
use tracing::{debug, info};

use crate::models::Listing;
use crate::scrapers::query::detail_url;
use crate::scrapers::selectors::{element_text, IMAGE_ATTRS, LISTING_SELECTORS};

/// Currency and unit noise removed before reading the price digits
const PRICE_NOISE: &[&str] = &[",", "，", "NT$", "元", "/月"];

const TRANSIT_TOKENS: &[&str] = &["捷運", "站", "公尺", "mrt", "station", "metro", "transit", "meters"];
const ADDRESS_TOKENS: &[&str] = &["路", "街", "大道", "巷", "區-", "road", "street", "district-"];
const LAYOUT_TOKENS: &[&str] = &["房", "廳", "衛", "樓", "坪", "room", "floor", "ping", "m²", "㎡"];

const PLACEHOLDER_IMAGE_TOKENS: &[&str] = &["placeholder", "default", "loading", "blank", "nopic"];

/// Numeric path segment of a detail link: `/17654321`, `/rent-detail-17654321.html`
static LISTING_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[/-])(\d+)(?:\.html?)?(?:[/?#]|$)").expect("valid listing id regex")
});

/// Floor notation such as "3F/5F"
static FLOOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\s*F\b").expect("valid floor regex"));

/// Kind of secondary text line on a listing card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    Address,
    Transit,
    Layout,
}

/// Extract listings from a rendered search-results page.
///
/// Malformed cards are dropped; only cards with a title and a positive price
/// are returned. `region` is left empty for the caller to fill in.
pub fn extract_listings(html: &str, base_url: &str) -> Vec<Listing> {
    let document = Html::parse_document(html);
    let cards = LISTING_SELECTORS.card.first_group(document.root_element());
    debug!("Found {} listing cards", cards.len());

    let listings: Vec<Listing> = cards
        .into_iter()
        .enumerate()
        .filter_map(|(index, card)| extract_card(card, index, base_url))
        .collect();

    info!("Extracted {} listings from page", listings.len());
    listings
}

fn extract_card(card: ElementRef<'_>, index: usize, base_url: &str) -> Option<Listing> {
    let selectors = &*LISTING_SELECTORS;

    let (title, href) = selectors
        .title_link
        .first_match(card, |anchor| {
            let text = element_text(anchor);
            (!text.is_empty()).then(|| (text, anchor.value().attr("href").map(str::to_string)))
        })
        .unwrap_or_else(|| (selectors.title_text.first_text(card).unwrap_or_default(), None));

    let href = href.filter(|h| !h.trim().is_empty()).or_else(|| {
        selectors.detail_link.first_match(card, |anchor| {
            anchor
                .value()
                .attr("href")
                .filter(|h| !h.trim().is_empty())
                .map(str::to_string)
        })
    });

    let price = selectors
        .price
        .first_match(card, |element| {
            let price = parse_price(&element_text(element));
            (price > 0).then_some(price)
        })
        .unwrap_or(0);

    if title.is_empty() || price == 0 {
        debug!("Skipped card {index}: title={title:?}, price={price}");
        return None;
    }

    let id = href
        .as_deref()
        .and_then(listing_id_from_link)
        .or_else(|| {
            card.value()
                .attr("data-id")
                .map(str::trim)
                .filter(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()))
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("unknown-{index}"));

    let url = if id.starts_with("unknown-") {
        href.as_deref()
            .map(|h| absolutize(h, base_url))
            .unwrap_or_default()
    } else {
        detail_url(base_url, &id)
    };

    let mut address = None;
    let mut subway_info = None;
    let mut layout = None;
    for fragment in selectors.secondary_text.group_texts(card) {
        let slot = match classify_fragment(&fragment) {
            Some(FragmentKind::Address) => &mut address,
            Some(FragmentKind::Transit) => &mut subway_info,
            Some(FragmentKind::Layout) => &mut layout,
            None => continue,
        };
        slot.get_or_insert(fragment);
    }

    Some(Listing {
        id,
        title,
        price,
        address,
        subway_info,
        layout,
        tags: selectors.tags.group_texts(card),
        images: collect_images(card, base_url),
        url,
        region: String::new(),
        scraped_at: Utc::now(),
    })
}

/// Parse a displayed rent into an integer, 0 when nothing parses.
///
/// Known currency/unit tokens are removed first, then the first run of
/// digits is read: `"NT$12,000"` and `"12,000元/月"` both give 12000.
pub fn parse_price(text: &str) -> u32 {
    let cleaned = PRICE_NOISE
        .iter()
        .fold(text.to_string(), |acc, token| acc.replace(token, ""));

    let digits: String = cleaned
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();

    digits.parse().unwrap_or(0)
}

/// Numeric listing identifier embedded in a detail link
pub fn listing_id_from_link(href: &str) -> Option<String> {
    let path = href
        .split_once("://")
        .map(|(_, rest)| rest.split_once('/').map(|(_, path)| path).unwrap_or(""))
        .unwrap_or(href);

    LISTING_ID
        .captures(path)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Classify a secondary text line by substring heuristics; transit wins over
/// address, address over layout. Unrecognized lines give `None`.
pub fn classify_fragment(text: &str) -> Option<FragmentKind> {
    let lower = text.to_lowercase();
    let has_any = |tokens: &[&str]| tokens.iter().any(|token| lower.contains(token));

    if has_any(TRANSIT_TOKENS) {
        Some(FragmentKind::Transit)
    } else if has_any(ADDRESS_TOKENS) {
        Some(FragmentKind::Address)
    } else if has_any(LAYOUT_TOKENS) || FLOOR.is_match(text) {
        Some(FragmentKind::Layout)
    } else {
        None
    }
}

fn collect_images(card: ElementRef<'_>, base_url: &str) -> Vec<String> {
    let mut images: Vec<String> = Vec::new();

    for img in LISTING_SELECTORS.images.first_group(card) {
        let src = IMAGE_ATTRS
            .iter()
            .filter_map(|attr| img.value().attr(attr))
            .map(str::trim)
            .find(|src| !is_placeholder_image(src));

        if let Some(src) = src {
            let src = absolutize(src, base_url);
            if !images.contains(&src) {
                images.push(src);
            }
        }
    }

    images
}

fn is_placeholder_image(src: &str) -> bool {
    let lower = src.to_lowercase();
    src.is_empty()
        || lower.starts_with("data:")
        || PLACEHOLDER_IMAGE_TOKENS.iter().any(|token| lower.contains(token))
}

fn absolutize(href: &str, base_url: &str) -> String {
    let href = href.trim();
    let base = base_url.trim_end_matches('/');
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if let Some(rest) = href.strip_prefix("//") {
        format!("https://{rest}")
    } else if href.starts_with('/') {
        format!("{base}{href}")
    } else {
        format!("{base}/{href}")
    }
}

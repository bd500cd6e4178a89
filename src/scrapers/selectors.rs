//! Selector fallback tables.
//!
//! Every extracted field is described by an ordered list of CSS candidates.
//! Lookups walk the list and the first candidate producing a non-empty result
//! wins; a candidate that fails to parse or match is skipped. New markup
//! variants go into these tables, not into the extraction code.

use scraper::{ElementRef, Selector};
use std::sync::LazyLock;
use tracing::warn;

/// One field's ordered selector candidates
#[derive(Debug, Clone, Copy)]
pub struct FieldStrategy {
    pub field: &'static str,
    pub candidates: &'static [&'static str],
}

pub const LISTING_CARD: FieldStrategy = FieldStrategy {
    field: "listing_card",
    candidates: &[
        ".vue-list-rent-item",
        ".list-wrapper .item[data-id]",
        "div.item[data-id]",
        "[class*='rent-item'][data-id]",
    ],
};

pub const TITLE_LINK: FieldStrategy = FieldStrategy {
    field: "title_link",
    candidates: &[
        ".item-info-title a",
        ".item-title a",
        ".rent-item-right .item-title a",
        "h3 a",
        "a.link",
        "a[href*='rent.591.com.tw']",
    ],
};

pub const TITLE_TEXT: FieldStrategy = FieldStrategy {
    field: "title_text",
    candidates: &[".item-info-title", ".item-title", "h3"],
};

pub const DETAIL_LINK: FieldStrategy = FieldStrategy {
    field: "detail_link",
    candidates: &["a[href*='rent-detail']", "a[href*='591.com.tw/']", "a[href]"],
};

pub const PRICE: FieldStrategy = FieldStrategy {
    field: "price",
    candidates: &[
        ".item-info-price strong",
        ".item-price-text span",
        ".item-price",
        ".price",
        "[class*='price']",
    ],
};

/// Secondary text lines (address, transit, layout) classified after extraction
pub const SECONDARY_TEXT: FieldStrategy = FieldStrategy {
    field: "secondary_text",
    candidates: &[
        ".item-info-txt",
        ".item-msg",
        ".item-style li, .item-area span",
        ".item-info-left p",
    ],
};

pub const TAGS: FieldStrategy = FieldStrategy {
    field: "tags",
    candidates: &[".item-info-tag .tag", ".item-tags span", ".tag"],
};

pub const IMAGES: FieldStrategy = FieldStrategy {
    field: "images",
    candidates: &[".item-img img", ".image-list img", "img"],
};

/// Attributes holding an image URL, lazy-load attributes first
pub const IMAGE_ATTRS: &[&str] = &["data-src", "data-original", "src"];

pub const DETAIL_PHONE: FieldStrategy = FieldStrategy {
    field: "phone",
    candidates: &[
        ".phone-number",
        ".tel-txt",
        ".contact-phone span",
        "[class*='phone'] span",
        "[class*='phone']",
        "a[href^='tel:']",
    ],
};

pub const DETAIL_MESSAGING: FieldStrategy = FieldStrategy {
    field: "messaging_handle",
    candidates: &[".line-id", ".contact-line span", "[class*='line-id']", "[data-line-id]"],
};

pub const DETAIL_CONTACT_NAME: FieldStrategy = FieldStrategy {
    field: "contact_name",
    candidates: &[".contact-name", ".linkman", ".name", "[class*='contact'] .name"],
};

pub const DETAIL_TITLE: FieldStrategy = FieldStrategy {
    field: "title",
    candidates: &[".house-title h1", ".title h1", "h1", ".title"],
};

pub const DETAIL_ADDRESS: FieldStrategy = FieldStrategy {
    field: "address",
    candidates: &[".address .load-map", ".house-address", ".address", "[class*='address']"],
};

/// Controls that reveal a hidden phone number on the detail page
pub const REVEAL_PHONE: &[&str] = &[
    "button.phone-btn",
    ".tel-btn",
    ".contact-phone button",
    "[class*='phone'] button",
    ".show-phone",
];

/// A compiled [`FieldStrategy`]
pub struct SelectorChain {
    field: &'static str,
    selectors: Vec<Selector>,
}

impl SelectorChain {
    pub fn compile(strategy: &FieldStrategy) -> Self {
        let selectors = strategy
            .candidates
            .iter()
            .filter_map(|css| match Selector::parse(css) {
                Ok(selector) => Some(selector),
                Err(e) => {
                    warn!("Skipping invalid {} selector {css:?}: {e:?}", strategy.field);
                    None
                }
            })
            .collect();

        Self {
            field: strategy.field,
            selectors,
        }
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    /// First element, across candidates in order, for which `pick` yields a value
    pub fn first_match<'a, T>(
        &self,
        scope: ElementRef<'a>,
        mut pick: impl FnMut(ElementRef<'a>) -> Option<T>,
    ) -> Option<T> {
        self.selectors
            .iter()
            .flat_map(|selector| scope.select(selector))
            .find_map(|element| pick(element))
    }

    /// First non-empty normalized text
    pub fn first_text(&self, scope: ElementRef<'_>) -> Option<String> {
        self.first_match(scope, |element| non_empty(element_text(element)))
    }

    /// All elements matched by the first candidate that matches anything
    pub fn first_group<'a>(&self, scope: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        self.selectors
            .iter()
            .map(|selector| scope.select(selector).collect::<Vec<_>>())
            .find(|group| !group.is_empty())
            .unwrap_or_default()
    }

    /// Non-empty texts of [`SelectorChain::first_group`], in document order
    pub fn group_texts(&self, scope: ElementRef<'_>) -> Vec<String> {
        self.first_group(scope)
            .into_iter()
            .filter_map(|element| non_empty(element_text(element)))
            .collect()
    }
}

/// Element text with whitespace runs collapsed to single spaces
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Compiled chains for search-results cards
pub struct ListingSelectors {
    pub card: SelectorChain,
    pub title_link: SelectorChain,
    pub title_text: SelectorChain,
    pub detail_link: SelectorChain,
    pub price: SelectorChain,
    pub secondary_text: SelectorChain,
    pub tags: SelectorChain,
    pub images: SelectorChain,
}

pub static LISTING_SELECTORS: LazyLock<ListingSelectors> = LazyLock::new(|| ListingSelectors {
    card: SelectorChain::compile(&LISTING_CARD),
    title_link: SelectorChain::compile(&TITLE_LINK),
    title_text: SelectorChain::compile(&TITLE_TEXT),
    detail_link: SelectorChain::compile(&DETAIL_LINK),
    price: SelectorChain::compile(&PRICE),
    secondary_text: SelectorChain::compile(&SECONDARY_TEXT),
    tags: SelectorChain::compile(&TAGS),
    images: SelectorChain::compile(&IMAGES),
});

/// Compiled chains for a listing's detail page
pub struct DetailSelectors {
    pub phone: SelectorChain,
    pub messaging_handle: SelectorChain,
    pub contact_name: SelectorChain,
    pub title: SelectorChain,
    pub address: SelectorChain,
}

pub static DETAIL_SELECTORS: LazyLock<DetailSelectors> = LazyLock::new(|| DetailSelectors {
    phone: SelectorChain::compile(&DETAIL_PHONE),
    messaging_handle: SelectorChain::compile(&DETAIL_MESSAGING),
    contact_name: SelectorChain::compile(&DETAIL_CONTACT_NAME),
    title: SelectorChain::compile(&DETAIL_TITLE),
    address: SelectorChain::compile(&DETAIL_ADDRESS),
});

/// Comma-joined card candidates, for "wait until any card is present"
pub fn listing_card_wait_selector() -> String {
    LISTING_CARD.candidates.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    const ALL_STRATEGIES: &[FieldStrategy] = &[
        LISTING_CARD,
        TITLE_LINK,
        TITLE_TEXT,
        DETAIL_LINK,
        PRICE,
        SECONDARY_TEXT,
        TAGS,
        IMAGES,
        DETAIL_PHONE,
        DETAIL_MESSAGING,
        DETAIL_CONTACT_NAME,
        DETAIL_TITLE,
        DETAIL_ADDRESS,
    ];

    #[test]
    fn every_candidate_compiles() {
        for strategy in ALL_STRATEGIES {
            let chain = SelectorChain::compile(strategy);
            assert_eq!(chain.len(), strategy.candidates.len(), "{}", strategy.field);
        }
        for css in REVEAL_PHONE {
            assert!(Selector::parse(css).is_ok(), "{css}");
        }
        assert!(Selector::parse(&listing_card_wait_selector()).is_ok());
    }

    #[test]
    fn invalid_candidates_are_skipped() {
        let strategy = FieldStrategy {
            field: "broken",
            candidates: &["[[[", ".ok"],
        };
        let chain = SelectorChain::compile(&strategy);
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.field(), "broken");
    }

    #[test]
    fn falls_through_to_later_candidates() {
        let html = Html::parse_fragment(
            r#"<div><span class="primary">   </span><p class="fallback">  second
               choice </p></div>"#,
        );
        let strategy = FieldStrategy {
            field: "text",
            candidates: &[".missing", ".primary", ".fallback"],
        };
        let chain = SelectorChain::compile(&strategy);
        assert_eq!(
            chain.first_text(html.root_element()).as_deref(),
            Some("second choice")
        );
    }

    #[test]
    fn loose_card_candidate_skips_nested_parts() {
        let html = Html::parse_fragment(
            r#"<div class="rent-item-box" data-id="17000001">
                 <div class="rent-item-title">套房</div>
                 <div class="rent-item-price">9,800</div>
               </div>
               <div class="rent-item-box" data-id="17000002">
                 <div class="rent-item-title">雅房</div>
               </div>"#,
        );
        let cards = SelectorChain::compile(&LISTING_CARD).first_group(html.root_element());
        let ids: Vec<_> = cards
            .iter()
            .filter_map(|card| card.value().attr("data-id"))
            .collect();
        assert_eq!(ids, vec!["17000001", "17000002"]);
    }

    #[test]
    fn group_comes_from_first_matching_candidate() {
        let html = Html::parse_fragment(
            r#"<ul><li class="a">one</li><li class="a">two</li><li class="b">three</li></ul>"#,
        );
        let strategy = FieldStrategy {
            field: "items",
            candidates: &[".none", ".a", "li"],
        };
        let chain = SelectorChain::compile(&strategy);
        assert_eq!(chain.group_texts(html.root_element()), vec!["one", "two"]);
    }
}

use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use crate::config::ScoutConfig;
use crate::models::ContactInfo;
use crate::scrapers::browser::BrowserSession;
use crate::scrapers::query::detail_url;
use crate::scrapers::selectors::{element_text, DETAIL_SELECTORS};
use crate::scrapers::traits::{PageRenderer, RenderedPage};

/// Local landline or mobile number, optionally followed by an extension
static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:tel:|電話[:：]?)?((?:09\d{2}-?\d{3}-?\d{3}|0\d{1,2}-?\d{3,4}-?\d{4})(?:(?:#|轉|ext\.?)\d{1,6})?)$",
    )
    .expect("valid phone regex")
});

/// "LINE: handle" / "LINE ID：handle" in running text
static MESSAGING_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)line\s*(?:id)?\s*[:：]\s*(@?[A-Za-z0-9._-]{2,})").expect("valid messaging regex")
});

static MESSAGING_HANDLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@?[A-Za-z0-9._-]{2,}$").expect("valid handle regex"));

/// A label with no handle after it ("LINE", "Line ID")
static MESSAGING_LABEL_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^line(?:[\s_-]*id)?$").expect("valid label regex"));

/// "屋主: 王小姐", "仲介：陳先生", "Landlord: Lin"
static CONTACT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:仲介|屋主|房東|代理人|經紀人|broker|owner|landlord|agent)\s*[:：]\s*([^\s:：,，、|()（）]{1,20})",
    )
    .expect("valid contact name regex")
});

/// Fetches contact details for a listing on demand.
///
/// Each lookup runs in its own short-lived browser session, never shared
/// with an aggregation run.
pub struct ContactEnricher {
    config: ScoutConfig,
}

impl ContactEnricher {
    pub fn new(config: ScoutConfig) -> Self {
        Self { config }
    }

    /// Look up contact details. Never fails: any error yields an all-empty
    /// record, since enrichment is advisory.
    pub async fn fetch_contact(&self, listing_id: &str) -> ContactInfo {
        if listing_id.trim().is_empty() {
            warn!("Contact lookup requested without a listing id");
            return ContactInfo::default();
        }

        let session = match BrowserSession::launch(&self.config).await {
            Ok(session) => session,
            Err(e) => {
                warn!("Contact lookup for {listing_id} could not start a browser: {e}");
                return ContactInfo::default();
            }
        };

        let contact = fetch_contact_with(&session, &self.config.base_url, listing_id).await;
        session.shutdown().await;
        contact
    }
}

/// Render a listing's detail page with `renderer` and extract its contact
/// details. Failures degrade to an all-empty record.
pub async fn fetch_contact_with(
    renderer: &dyn PageRenderer,
    base_url: &str,
    listing_id: &str,
) -> ContactInfo {
    let url = detail_url(base_url, listing_id);

    match renderer.render_detail_page(&url).await {
        Ok(RenderedPage::Html(html)) => {
            let contact = extract_contact(&html);
            info!(
                "Contact for {listing_id}: phone={}, handle={}, name={}",
                !contact.phone.is_empty(),
                !contact.messaging_handle.is_empty(),
                !contact.contact_name.is_empty()
            );
            contact
        }
        Ok(RenderedPage::Empty) => {
            warn!("Detail page for {listing_id} rendered empty");
            ContactInfo::default()
        }
        Err(e) => {
            warn!("Contact lookup for {listing_id} failed: {e}");
            ContactInfo::default()
        }
    }
}

/// Extract contact fields from a detail page. Each field is looked up
/// independently and left empty when not found.
pub fn extract_contact(html: &str) -> ContactInfo {
    let document = Html::parse_document(html);
    let root = document.root_element();
    let body_text = visible_text(root);
    let selectors = &*DETAIL_SELECTORS;

    let phone = selectors
        .phone
        .first_match(root, |element| {
            normalize_phone(&element_text(element)).or_else(|| {
                element
                    .value()
                    .attr("href")
                    .and_then(normalize_phone)
            })
        })
        .unwrap_or_default();

    let messaging_handle = selectors
        .messaging_handle
        .first_match(root, |element| {
            let text = element_text(element);
            messaging_handle_from_text(&text).or_else(|| {
                element
                    .value()
                    .attr("data-line-id")
                    .and_then(messaging_handle_from_text)
            })
        })
        .or_else(|| labelled_handle(&body_text))
        .unwrap_or_default();

    let contact_name = CONTACT_NAME
        .captures(&body_text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .or_else(|| selectors.contact_name.first_text(root))
        .unwrap_or_default();

    let title = selectors.title.first_text(root).unwrap_or_default();
    let address = selectors.address.first_text(root).unwrap_or_default();

    debug!("Extracted contact: {phone:?} {messaging_handle:?} {contact_name:?}");

    ContactInfo {
        phone,
        messaging_handle,
        contact_name,
        title,
        address,
    }
}

/// Accept text as a phone number only if, with whitespace removed, it has
/// the shape of a local number.
pub fn normalize_phone(text: &str) -> Option<String> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    PHONE
        .captures(&compact)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn messaging_handle_from_text(text: &str) -> Option<String> {
    let text = text.trim();
    labelled_handle(text).or_else(|| {
        (MESSAGING_HANDLE.is_match(text) && !MESSAGING_LABEL_ONLY.is_match(text))
            .then(|| text.to_string())
    })
}

fn labelled_handle(text: &str) -> Option<String> {
    MESSAGING_LABEL
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Text nodes outside script/style, one per line
fn visible_text(root: ElementRef<'_>) -> String {
    root.descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node
                .parent()
                .and_then(|parent| parent.value().as_element().map(|el| el.name()))
                .is_some_and(|name| matches!(name, "script" | "style" | "noscript"));
            let text = text.trim();
            (!hidden && !text.is_empty()).then(|| text.to_string())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, ScoutError};
    use async_trait::async_trait;

    struct FixedRenderer(Result<RenderedPage>);

    #[async_trait]
    impl PageRenderer for FixedRenderer {
        async fn render_listing_page(&self, _url: &str) -> Result<RenderedPage> {
            unreachable!("contact lookups only render detail pages")
        }

        async fn render_detail_page(&self, _url: &str) -> Result<RenderedPage> {
            match &self.0 {
                Ok(page) => Ok(page.clone()),
                Err(_) => Err(ScoutError::navigation("https://rent.591.com.tw/1", "timeout")),
            }
        }
    }

    const DETAIL_PAGE: &str = r#"<html><body>
        <div class="house-title"><h1>信義區景觀套房</h1></div>
        <div class="address"><span class="load-map">信義區松仁路100號</span></div>
        <div class="contact-phone">
          <button>顯示電話</button>
          <span class="tel-txt">0912 345 678</span>
        </div>
        <div class="contact-line"><span>LINE: rent_owner88</span></div>
        <p>屋主: 王小姐</p>
        <script>var phone = "0999-999-999"; var note = "房東: 假名";</script>
      </body></html>"#;

    #[test]
    fn extracts_all_fields() {
        let contact = extract_contact(DETAIL_PAGE);
        assert_eq!(contact.phone, "0912345678");
        assert_eq!(contact.messaging_handle, "rent_owner88");
        assert_eq!(contact.contact_name, "王小姐");
        assert_eq!(contact.title, "信義區景觀套房");
        assert_eq!(contact.address, "信義區松仁路100號");
    }

    #[test]
    fn missing_phone_control_gives_empty_phone() {
        let contact = extract_contact(
            r#"<html><body><h1>雅房出租</h1><div class="phone-number">請來電洽詢</div></body></html>"#,
        );
        assert_eq!(contact.phone, "");
        assert_eq!(contact.title, "雅房出租");
        assert_eq!(contact.messaging_handle, "");
        assert_eq!(contact.contact_name, "");
    }

    #[test]
    fn falls_back_to_body_text_and_name_selectors() {
        let contact = extract_contact(
            r#"<html><body>
                 <a href="tel:02-2345-6789#123">撥打</a>
                 <p>聯絡方式 LINE ID：@house591</p>
                 <div class="linkman">陳先生</div>
               </body></html>"#,
        );
        assert_eq!(contact.phone, "02-2345-6789#123");
        assert_eq!(contact.messaging_handle, "@house591");
        assert_eq!(contact.contact_name, "陳先生");
    }

    #[test]
    fn label_span_is_not_taken_as_handle() {
        let contact = extract_contact(
            r#"<html><body>
                 <div class="contact-line"><span>LINE</span><span>rent_owner88</span></div>
               </body></html>"#,
        );
        assert_eq!(contact.messaging_handle, "rent_owner88");

        assert_eq!(messaging_handle_from_text("Line ID"), None);
        assert_eq!(messaging_handle_from_text("line_id"), None);
        assert_eq!(messaging_handle_from_text("@line"), Some("@line".to_string()));
        assert_eq!(messaging_handle_from_text("liner88"), Some("liner88".to_string()));
    }

    #[test]
    fn phone_shape_is_enforced() {
        assert_eq!(normalize_phone("0912-345-678").as_deref(), Some("0912-345-678"));
        assert_eq!(normalize_phone(" 02 2345 6789 ").as_deref(), Some("0223456789"));
        assert_eq!(normalize_phone("02-2345-6789轉12").as_deref(), Some("02-2345-6789轉12"));
        assert_eq!(normalize_phone("tel:0912345678").as_deref(), Some("0912345678"));
        assert_eq!(normalize_phone("12,000"), None);
        assert_eq!(normalize_phone("2024-05-01"), None);
        assert_eq!(normalize_phone(""), None);
    }

    #[test]
    fn script_text_is_ignored() {
        let contact = extract_contact(
            r#"<html><body><script>document.title = "房東: 腳本";</script></body></html>"#,
        );
        assert!(contact.is_empty());
    }

    #[tokio::test]
    async fn navigation_failure_gives_empty_contact() {
        let renderer = FixedRenderer(Err(ScoutError::BrowserLaunch("unused".into())));
        let contact = fetch_contact_with(&renderer, "https://rent.591.com.tw", "123").await;
        assert_eq!(contact, ContactInfo::default());
    }

    #[tokio::test]
    async fn renders_and_extracts_detail_page() {
        let renderer = FixedRenderer(Ok(RenderedPage::Html(DETAIL_PAGE.to_string())));
        let contact = fetch_contact_with(&renderer, "https://rent.591.com.tw", "123").await;
        assert_eq!(contact.phone, "0912345678");
    }
}

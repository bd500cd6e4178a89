use crate::models::{SearchParams, Target};

/// Amenity filter sent with every search: near transit, cooking allowed
pub const AMENITY_FILTER: &str = "near_subway,cook";

/// Build the search-results URL for one target.
///
/// Parameter names and shapes are dictated by the site: `region`, optional
/// `section`, `price` as `{min}_{max}`, `other`, optional `keywords`.
pub fn search_url(base_url: &str, target: &Target, params: &SearchParams) -> String {
    let mut url = format!(
        "{}/list?region={}",
        base_url.trim_end_matches('/'),
        target.locality_id
    );

    if let Some(section) = target.sub_locality_id {
        url.push_str(&format!("&section={section}"));
    }

    url.push_str(&format!(
        "&price={}_{}&other={}",
        params.min_rent,
        params.max_rent,
        urlencoding::encode(AMENITY_FILTER)
    ));

    if let Some(keywords) = &params.keywords {
        url.push_str(&format!("&keywords={}", urlencoding::encode(keywords)));
    }

    url
}

/// Canonical per-listing page
pub fn detail_url(base_url: &str, listing_id: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(listing_id.trim())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://rent.591.com.tw";

    #[test]
    fn encodes_region_section_and_price() {
        let target = Target::new(1, Some(3), "X");
        let params = SearchParams::new(8000, 12000, None).unwrap();
        let url = search_url(BASE, &target, &params);

        assert!(url.starts_with("https://rent.591.com.tw/list?"));
        assert!(url.contains("region=1"));
        assert!(url.contains("section=3"));
        assert!(url.contains("price=8000_12000"));
        assert!(url.contains("other=near_subway%2Ccook"));
        assert!(!url.contains("keywords="));
    }

    #[test]
    fn whole_locality_has_no_section() {
        let target = Target::new(1, None, "台北市");
        let params = SearchParams::new(5000, 9000, None).unwrap();
        let url = search_url(BASE, &target, &params);
        assert!(!url.contains("section="));
    }

    #[test]
    fn keywords_are_url_encoded() {
        let target = Target::new(1, Some(5), "大安區");
        let params = SearchParams::new(8000, 12000, Some("近捷運 & 陽台")).unwrap();
        let url = search_url(BASE, &target, &params);
        assert!(url.contains("&keywords=%E8%BF%91%E6%8D%B7%E9%81%8B%20%26%20%E9%99%BD%E5%8F%B0"));
    }

    #[test]
    fn build_is_deterministic() {
        let target = Target::new(1, Some(7), "信義區");
        let params = SearchParams::new(10000, 20000, Some("套房")).unwrap();
        assert_eq!(
            search_url(BASE, &target, &params),
            search_url(&format!("{BASE}/"), &target, &params)
        );
    }

    #[test]
    fn detail_url_appends_listing_id() {
        assert_eq!(detail_url(BASE, "17654321"), "https://rent.591.com.tw/17654321");
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScoutError};

/// Upper bound on monthly rent the search form accepts
pub const MAX_RENT: u32 = 1_000_000;

/// One scrapable scope: a locality, optionally narrowed to a sub-locality
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub locality_id: u32,
    pub sub_locality_id: Option<u32>,
    pub display_name: String,
}

impl Target {
    pub fn new(locality_id: u32, sub_locality_id: Option<u32>, display_name: impl Into<String>) -> Self {
        Self {
            locality_id,
            sub_locality_id,
            display_name: display_name.into(),
        }
    }
}

/// Rent bounds and optional keyword for one pipeline invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    pub min_rent: u32,
    pub max_rent: u32,
    pub keywords: Option<String>,
}

impl SearchParams {
    /// Validated constructor. Blank keywords are treated as absent.
    pub fn new(min_rent: u32, max_rent: u32, keywords: Option<&str>) -> Result<Self> {
        if min_rent == 0 {
            return Err(ScoutError::InvalidSearch("minimum rent must be positive".into()));
        }
        if min_rent >= max_rent {
            return Err(ScoutError::InvalidSearch(format!(
                "minimum rent {min_rent} must be below maximum rent {max_rent}"
            )));
        }
        if max_rent > MAX_RENT {
            return Err(ScoutError::InvalidSearch(format!(
                "maximum rent {max_rent} exceeds {MAX_RENT}"
            )));
        }

        let keywords = keywords
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string);

        Ok(Self {
            min_rent,
            max_rent,
            keywords,
        })
    }
}

/// A rental listing as extracted from a search-results page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    pub title: String,
    pub price: u32,
    pub address: Option<String>,
    pub subway_info: Option<String>,
    pub layout: Option<String>,
    pub tags: Vec<String>,
    /// First entry is the primary image
    pub images: Vec<String>,
    pub url: String,
    /// Display name of the target this listing was found under
    pub region: String,
    pub scraped_at: DateTime<Utc>,
}

/// Contact details from a listing's detail page.
///
/// Missing fields are empty strings; partial contact info is a normal result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub phone: String,
    pub messaging_handle: String,
    pub contact_name: String,
    pub title: String,
    pub address: String,
}

impl ContactInfo {
    pub fn is_empty(&self) -> bool {
        self.phone.is_empty()
            && self.messaging_handle.is_empty()
            && self.contact_name.is_empty()
            && self.title.is_empty()
            && self.address.is_empty()
    }
}

/// Input to one aggregation run
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    pub targets: Vec<Target>,
    pub params: SearchParams,
    pub max_results: usize,
}

/// Output of one aggregation run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapeReport {
    pub listings: Vec<Listing>,
    pub logs: Vec<String>,
}

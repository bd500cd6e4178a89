//! Target resolution: free-text locality names to the site's numeric
//! region/section identifiers.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{Result, ScoutError};
use crate::models::Target;

/// Tokens that select an entire locality instead of one district
const WHOLE_LOCALITY_KEYWORDS: &[&str] = &["all", "entire", "全部", "全區", "不限"];

/// Suffixes stripped to produce the short form of a name ("大安區" -> "大安")
const NAME_SUFFIXES: &[&str] = &["區", "区", "市", "縣", "县", " district", " city", " county"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubLocality {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub section: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locality {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub region: u32,
    #[serde(default)]
    pub sections: Vec<SubLocality>,
}

/// Outcome of resolving a multi-name request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub targets: Vec<Target>,
    pub unresolved: Vec<String>,
}

/// Locality/sub-locality identifier table.
///
/// Identifiers belong to the site and drift over time; the built-in table is a
/// starting point and can be replaced with [`LocalityTable::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalityTable {
    localities: Vec<Locality>,
    /// Region searched first for district-only input
    default_region: Option<u32>,
}

enum Match<'a> {
    Locality(&'a Locality),
    District(&'a Locality, &'a SubLocality),
}

impl Match<'_> {
    fn target(&self) -> Target {
        match self {
            Match::Locality(locality) => whole_locality(locality),
            Match::District(locality, district) => {
                Target::new(locality.region, Some(district.section), district.name.clone())
            }
        }
    }
}

impl LocalityTable {
    pub fn new(localities: Vec<Locality>) -> Result<Self> {
        if localities.is_empty() {
            return Err(ScoutError::LocalityTable("table has no localities".into()));
        }
        Ok(Self {
            localities,
            default_region: None,
        })
    }

    /// Taipei City and its twelve districts
    pub fn builtin() -> Self {
        let district = |name: &str, alias: &str, section: u32| SubLocality {
            name: name.to_string(),
            aliases: vec![alias.to_string()],
            section,
        };

        Self {
            localities: vec![Locality {
                name: "台北市".to_string(),
                aliases: vec!["臺北市".to_string(), "Taipei".to_string()],
                region: 1,
                sections: vec![
                    district("中正區", "Zhongzheng", 1),
                    district("大同區", "Datong", 2),
                    district("中山區", "Zhongshan", 3),
                    district("松山區", "Songshan", 4),
                    district("大安區", "Da'an", 5),
                    district("萬華區", "Wanhua", 6),
                    district("信義區", "Xinyi", 7),
                    district("士林區", "Shilin", 8),
                    district("北投區", "Beitou", 9),
                    district("內湖區", "Neihu", 10),
                    district("南港區", "Nangang", 11),
                    district("文山區", "Wenshan", 12),
                ],
            }],
            default_region: None,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let localities: Vec<Locality> = serde_json::from_str(json)?;
        Self::new(localities)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ScoutError::LocalityTable(format!("cannot read {}: {e}", path.display()))
        })?;
        let table = Self::from_json(&json)?;
        info!(
            "Loaded locality table from {} ({} localities)",
            path.display(),
            table.localities.len()
        );
        Ok(table)
    }

    /// Prefer the named locality when a district name exists in several
    /// localities, and use it for the whole-locality keywords.
    pub fn with_default_locality(mut self, name: &str) -> Result<Self> {
        let keys = match_keys(name);
        let region = self
            .localities
            .iter()
            .find(|l| name_matches(&l.name, &l.aliases, &keys))
            .map(|l| l.region)
            .ok_or_else(|| ScoutError::LocalityTable(format!("unknown default locality {name:?}")))?;

        self.default_region = Some(region);
        Ok(self)
    }

    /// Resolve one name to a target.
    ///
    /// Whole-locality keywords map to the default locality (or the first one
    /// in the table); a locality name maps to that whole locality; anything
    /// else is looked up among the districts, default locality first.
    pub fn resolve_one(&self, name: &str) -> Option<Target> {
        self.lookup(name, self.default_region)
            .map(|found| found.target())
    }

    /// Resolve a whitespace/comma separated list of names. Unknown names are
    /// collected in `unresolved` and do not stop the others from resolving.
    ///
    /// A locality name scopes the district names after it, so
    /// `"台北市 信義區"` picks Taipei's 信義區 even when another locality
    /// listed earlier in the table has one too.
    pub fn resolve(&self, input: &str) -> Resolution {
        let mut resolution = Resolution::default();
        let mut scope = self.default_region;

        for token in input
            .split(|c: char| c.is_whitespace() || matches!(c, ',' | '，' | '、'))
            .filter(|t| !t.is_empty())
        {
            let Some(found) = self.lookup(token, scope) else {
                resolution.unresolved.push(token.to_string());
                continue;
            };

            if let Match::Locality(locality) = found {
                scope = Some(locality.region);
            }
            let target = found.target();
            debug!("Resolved {token:?} to {target:?}");
            if !resolution.targets.contains(&target) {
                resolution.targets.push(target);
            }
        }

        resolution
    }

    fn lookup(&self, name: &str, scope: Option<u32>) -> Option<Match<'_>> {
        let keys = match_keys(name);
        let key = &keys[0];
        if key.is_empty() {
            return None;
        }

        if WHOLE_LOCALITY_KEYWORDS.iter().any(|kw| fold(kw) == *key) {
            return self
                .search_order(scope)
                .next()
                .map(Match::Locality);
        }

        if let Some(locality) = self
            .localities
            .iter()
            .find(|l| name_matches(&l.name, &l.aliases, &keys))
        {
            return Some(Match::Locality(locality));
        }

        self.search_order(scope).find_map(|locality| {
            locality
                .sections
                .iter()
                .find(|s| name_matches(&s.name, &s.aliases, &keys))
                .map(|district| Match::District(locality, district))
        })
    }

    /// Localities in table order, with the scoped one moved to the front
    fn search_order(&self, scope: Option<u32>) -> impl Iterator<Item = &Locality> {
        let scoped = scope.and_then(|region| self.localities.iter().find(|l| l.region == region));
        scoped
            .into_iter()
            .chain(self.localities.iter().filter(move |l| Some(l.region) != scope))
    }
}

impl Default for LocalityTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn whole_locality(locality: &Locality) -> Target {
    Target::new(locality.region, None, locality.name.clone())
}

/// Full and short folded forms of user input
fn match_keys(name: &str) -> [String; 2] {
    [fold(name), fold(short_form(name))]
}

fn name_matches(name: &str, aliases: &[String], keys: &[String]) -> bool {
    std::iter::once(name)
        .chain(aliases.iter().map(String::as_str))
        .any(|candidate| {
            let full = fold(candidate);
            let short = fold(short_form(candidate));
            keys.iter().any(|key| !key.is_empty() && (*key == full || *key == short))
        })
}

fn short_form(name: &str) -> &str {
    let trimmed = name.trim();
    let lower = trimmed.to_lowercase();
    for suffix in NAME_SUFFIXES {
        if lower.ends_with(suffix) && lower.len() > suffix.len() {
            // Suffixes are ASCII or single CJK characters, so byte lengths agree
            return trimmed[..trimmed.len() - suffix.len()].trim_end();
        }
    }
    trimmed
}

/// Case- and diacritic-insensitive match key. Punctuation and spacing are
/// dropped so "Da'an", "Daan" and "DA AN" compare equal.
fn fold(input: &str) -> String {
    input
        .chars()
        .flat_map(char::to_lowercase)
        .map(strip_diacritic)
        .filter(|c| c.is_alphanumeric())
        .collect()
}

fn strip_diacritic(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ǎ' => 'a',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ě' => 'e',
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'ǐ' => 'i',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ō' | 'ǒ' => 'o',
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ǔ' | 'ǖ' | 'ǘ' | 'ǚ' | 'ǜ' => 'u',
        'ñ' | 'ń' | 'ň' => 'n',
        'ç' => 'c',
        _ => c,
    }
}

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_BASE_URL: &str = "https://rent.591.com.tw";

/// Runtime knobs for browser sessions and the aggregation loop.
#[derive(Debug, Clone)]
pub struct ScoutConfig {
    /// Site root used for search and detail URLs
    pub base_url: String,
    pub headless: bool,
    pub chrome_path: Option<PathBuf>,
    pub navigation_timeout: Duration,
    /// How long to wait for the listing container before treating a page as empty
    pub selector_timeout: Duration,
    pub settle_delay: Duration,
    pub scroll_step_px: u32,
    pub scroll_max_px: u32,
    pub scroll_max_steps: u32,
    pub scroll_interval: Duration,
    pub inter_target_delay: Duration,
    pub locality_table: Option<PathBuf>,
    /// Locality preferred for district-only target names
    pub default_locality: Option<String>,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            headless: true,
            chrome_path: None,
            navigation_timeout: Duration::from_secs(60),
            selector_timeout: Duration::from_secs(30),
            settle_delay: Duration::from_millis(2000),
            scroll_step_px: 400,
            scroll_max_px: 20_000,
            scroll_max_steps: 40,
            scroll_interval: Duration::from_millis(250),
            inter_target_delay: Duration::from_millis(3000),
            locality_table: None,
            default_locality: None,
        }
    }
}

impl ScoutConfig {
    /// Load configuration from `SCOUT_*` environment variables, falling back
    /// to defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let config = Self {
            base_url: std::env::var("SCOUT_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            headless: parse_env("SCOUT_HEADLESS")?.unwrap_or(defaults.headless),
            chrome_path: std::env::var("SCOUT_CHROME_PATH").ok().map(PathBuf::from),
            navigation_timeout: parse_env("SCOUT_NAVIGATION_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.navigation_timeout),
            selector_timeout: parse_env("SCOUT_SELECTOR_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.selector_timeout),
            settle_delay: parse_env("SCOUT_SETTLE_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.settle_delay),
            scroll_step_px: parse_env("SCOUT_SCROLL_STEP_PX")?.unwrap_or(defaults.scroll_step_px),
            scroll_max_px: parse_env("SCOUT_SCROLL_MAX_PX")?.unwrap_or(defaults.scroll_max_px),
            scroll_max_steps: parse_env("SCOUT_SCROLL_MAX_STEPS")?
                .unwrap_or(defaults.scroll_max_steps),
            scroll_interval: parse_env("SCOUT_SCROLL_INTERVAL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.scroll_interval),
            inter_target_delay: parse_env("SCOUT_INTER_TARGET_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.inter_target_delay),
            locality_table: std::env::var("SCOUT_LOCALITY_TABLE").ok().map(PathBuf::from),
            default_locality: std::env::var("SCOUT_DEFAULT_LOCALITY")
                .ok()
                .filter(|name| !name.trim().is_empty()),
        };

        info!(
            base_url = %config.base_url,
            headless = config.headless,
            navigation_timeout_secs = config.navigation_timeout.as_secs(),
            selector_timeout_secs = config.selector_timeout.as_secs(),
            "Loaded scout configuration"
        );
        Ok(config)
    }
}

fn parse_env<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_bounds() {
        let config = ScoutConfig::default();
        assert_eq!(config.navigation_timeout, Duration::from_secs(60));
        assert_eq!(config.selector_timeout, Duration::from_secs(30));
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.headless);
        assert_eq!(config.default_locality, None);
    }

    #[test]
    fn parse_env_reports_bad_numbers() {
        std::env::set_var("SCOUT_TEST_PARSE_BAD", "ten");
        let parsed: Result<Option<u64>> = parse_env("SCOUT_TEST_PARSE_BAD");
        assert!(parsed.is_err());

        std::env::set_var("SCOUT_TEST_PARSE_OK", " 15 ");
        let parsed: Option<u64> = parse_env("SCOUT_TEST_PARSE_OK").unwrap();
        assert_eq!(parsed, Some(15));

        let missing: Option<u64> = parse_env("SCOUT_TEST_PARSE_MISSING").unwrap();
        assert_eq!(missing, None);
    }
}

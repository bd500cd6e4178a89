use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::ScoutConfig;
use crate::error::{Result, ScoutError};
use crate::scrapers::selectors::{listing_card_wait_selector, REVEAL_PHONE};
use crate::scrapers::traits::{PageRenderer, RenderedPage};

/// Chrome exits on its own after this long without CDP traffic
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(300);

/// One headless Chrome process with a single isolated browsing context.
///
/// A session is owned by exactly one pipeline run (or one contact lookup)
/// and reused for every page it renders. Dropping it terminates Chrome.
pub struct BrowserSession {
    // Keeps the Chrome process alive for as long as the session exists
    #[allow(dead_code)]
    browser: Browser,
    tab: Arc<Tab>,
    config: ScoutConfig,
}

impl BrowserSession {
    /// Launch Chrome and open a fresh browsing context.
    pub async fn launch(config: &ScoutConfig) -> Result<Self> {
        let config = config.clone();
        run_blocking(move || Self::launch_blocking(config)).await
    }

    fn launch_blocking(config: ScoutConfig) -> Result<Self> {
        info!("Launching headless Chrome...");

        let options = LaunchOptions::default_builder()
            .headless(config.headless)
            .path(config.chrome_path.clone())
            .idle_browser_timeout(IDLE_BROWSER_TIMEOUT)
            .build()
            .map_err(|e| ScoutError::BrowserLaunch(format!("invalid launch options: {e}")))?;

        let browser =
            Browser::new(options).map_err(|e| ScoutError::BrowserLaunch(format!("{e:#}")))?;

        // Separate context so cookies and storage never leak between sessions
        let tab = browser
            .new_context()
            .and_then(|context| context.new_tab())
            .map_err(|e| ScoutError::BrowserLaunch(format!("cannot open browsing context: {e:#}")))?;
        tab.set_default_timeout(config.navigation_timeout);

        Ok(Self {
            browser,
            tab,
            config,
        })
    }

    /// Tear the session down off the async executor.
    pub async fn shutdown(self) {
        let closed = tokio::task::spawn_blocking(move || {
            if let Err(e) = self.tab.close(false) {
                debug!("Tab close failed during shutdown: {e:#}");
            }
            drop(self);
        })
        .await;

        if let Err(e) = closed {
            warn!("Browser shutdown task failed: {e}");
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        info!("Closing browser session");
    }
}

#[async_trait]
impl PageRenderer for BrowserSession {
    async fn render_listing_page(&self, url: &str) -> Result<RenderedPage> {
        let tab = Arc::clone(&self.tab);
        let config = self.config.clone();
        let url = url.to_string();
        run_blocking(move || render_listing_blocking(&tab, &config, &url)).await
    }

    async fn render_detail_page(&self, url: &str) -> Result<RenderedPage> {
        let tab = Arc::clone(&self.tab);
        let config = self.config.clone();
        let url = url.to_string();
        run_blocking(move || render_detail_blocking(&tab, &config, &url)).await
    }
}

/// headless_chrome is synchronous; keep its calls off the async workers so
/// the host process stays responsive during a scrape.
async fn run_blocking<T, F>(task: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| ScoutError::Anyhow(anyhow::anyhow!("browser task failed: {e}")))?
}

fn render_listing_blocking(tab: &Tab, config: &ScoutConfig, url: &str) -> Result<RenderedPage> {
    info!("Opening search page {url}");
    navigate(tab, url)?;

    let wait_selector = listing_card_wait_selector();
    if let Err(e) = tab.wait_for_element_with_custom_timeout(&wait_selector, config.selector_timeout)
    {
        info!(
            "No listing container within {}s on {url}: {e}",
            config.selector_timeout.as_secs()
        );
        return Ok(RenderedPage::Empty);
    }

    auto_scroll(tab, config);
    thread::sleep(config.settle_delay);

    snapshot(tab, url).map(RenderedPage::Html)
}

fn render_detail_blocking(tab: &Tab, config: &ScoutConfig, url: &str) -> Result<RenderedPage> {
    info!("Opening detail page {url}");
    navigate(tab, url)?;

    if let Err(e) = tab.wait_for_element_with_custom_timeout("body", config.selector_timeout) {
        debug!("Body wait timed out on {url}: {e}");
    }
    thread::sleep(config.settle_delay);

    if reveal_phone(tab) {
        thread::sleep(config.settle_delay);
    }

    snapshot(tab, url).map(RenderedPage::Html)
}

fn navigate(tab: &Tab, url: &str) -> Result<()> {
    tab.navigate_to(url)
        .map_err(|e| ScoutError::navigation(url, format!("{e:#}")))?;
    tab.wait_until_navigated()
        .map_err(|e| ScoutError::navigation(url, format!("{e:#}")))?;
    Ok(())
}

/// Scroll in fixed steps so lazy-loaded cards materialize. Bounded by both
/// total distance and step count.
fn auto_scroll(tab: &Tab, config: &ScoutConfig) {
    let script = format!(
        "(() => {{ window.scrollBy(0, {}); return window.scrollY; }})()",
        config.scroll_step_px
    );

    let planned = scroll_steps(config);
    let mut steps = 0u32;
    while steps < planned {
        if let Err(e) = tab.evaluate(&script, false) {
            warn!("Auto-scroll stopped after {steps} steps: {e:#}");
            break;
        }
        steps += 1;
        thread::sleep(config.scroll_interval);
    }

    debug!(
        "Auto-scrolled {}px in {steps} steps",
        steps.saturating_mul(config.scroll_step_px)
    );
}

/// Number of scroll steps before either the distance or the step cap is hit.
/// A zero step size never reaches the distance cap, so only the step cap
/// applies.
fn scroll_steps(config: &ScoutConfig) -> u32 {
    if config.scroll_step_px == 0 {
        return config.scroll_max_steps;
    }
    config
        .scroll_max_px
        .div_ceil(config.scroll_step_px)
        .min(config.scroll_max_steps)
}

/// Click the first "show phone" control present. Absence is normal.
fn reveal_phone(tab: &Tab) -> bool {
    let selectors = match serde_json::to_string(REVEAL_PHONE) {
        Ok(json) => json,
        Err(_) => return false,
    };
    let script = format!(
        r#"(() => {{
            for (const sel of {selectors}) {{
                const el = document.querySelector(sel);
                if (el) {{ el.click(); return true; }}
            }}
            return false;
        }})()"#
    );

    match tab.evaluate(&script, false) {
        Ok(result) => {
            let clicked = result.value.and_then(|v| v.as_bool()).unwrap_or(false);
            debug!("Reveal-phone control clicked: {clicked}");
            clicked
        }
        Err(e) => {
            debug!("Reveal-phone click failed: {e:#}");
            false
        }
    }
}

fn snapshot(tab: &Tab, url: &str) -> Result<String> {
    let result = tab
        .evaluate("document.documentElement.outerHTML", false)
        .map_err(|e| ScoutError::render(url, format!("{e:#}")))?;

    result
        .value
        .and_then(|value| value.as_str().map(str::to_string))
        .filter(|html| !html.is_empty())
        .ok_or_else(|| ScoutError::render(url, "page returned no HTML"))
}

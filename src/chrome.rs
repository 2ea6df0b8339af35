//! Headless Chrome rendering session.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use headless_chrome::{Browser, LaunchOptions, Tab};
use tracing::{debug, instrument, warn};

use crate::document::Document;
use crate::error::FetchError;
use crate::pool::{RenderedPage, Session};
use crate::synthesize::{absolute_locator, click_locator};
use crate::tabs::find_tab;
use crate::Config;

/// Pause after each navigation and click for scripts to settle.
const SETTLE: Duration = Duration::from_secs(3);

/// Pooled sessions can sit unused between pages for a while.
const IDLE_TIMEOUT: Duration = Duration::from_secs(600);

fn session_err(e: impl std::fmt::Display) -> FetchError {
    FetchError::Session(e.to_string())
}

/// One browser with one tab, reused for every page it renders.
pub struct ChromeSession {
    // Dropping the browser closes Chrome.
    _browser: Browser,
    tab: Arc<Tab>,
    config: Config,
    settle: Duration,
}

impl ChromeSession {
    /// Launches a headless browser. `config` shapes the fallback locators of
    /// tabs without usable text.
    pub fn launch(config: &Config) -> Result<Self, FetchError> {
        let browser = Browser::new(LaunchOptions {
            headless: true,
            idle_browser_timeout: IDLE_TIMEOUT,
            ..Default::default()
        })
        .map_err(session_err)?;
        let tab = browser.new_tab().map_err(session_err)?;
        Ok(Self {
            _browser: browser,
            tab,
            config: config.clone(),
            settle: SETTLE,
        })
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    fn content(&self) -> Result<String, FetchError> {
        self.tab.get_content().map_err(session_err)
    }

    /// Clicks the tab labelled `label`; returns its recorded locator, or
    /// `None` when the page has no such tab.
    fn click(&self, label: &str) -> Result<Option<String>, FetchError> {
        let doc = Document::parse(&self.content()?);
        let Some(node) = find_tab(&doc, label) else {
            return Ok(None);
        };
        let recorded = click_locator(&doc, node, &self.config)
            .map_err(session_err)?
            .to_string();
        let path = absolute_locator(&doc, node).to_string();
        self.tab
            .find_element_by_xpath(&path)
            .map_err(session_err)?
            .click()
            .map_err(session_err)?;
        if let Err(err) = self.tab.wait_until_navigated() {
            debug!(error = %err, "no navigation after click");
        }
        thread::sleep(self.settle);
        Ok(Some(recorded))
    }
}

impl Session for ChromeSession {
    #[instrument(skip(self, tabs), fields(tabs = tabs.len()))]
    fn render(&mut self, url: &str, tabs: &[String]) -> Result<RenderedPage, FetchError> {
        self.tab.navigate_to(url).map_err(session_err)?;
        self.tab.wait_until_navigated().map_err(session_err)?;
        thread::sleep(self.settle);

        let mut clicked = Vec::new();
        for (i, label) in tabs.iter().enumerate() {
            match self.click(label)? {
                Some(locator) => {
                    debug!(step = i + 1, label = %label, %locator, "clicked tab");
                    clicked.push(locator);
                }
                None => {
                    // later tabs live under this one
                    warn!(label = %label, "tab not found, skipping the rest");
                    break;
                }
            }
        }

        let html = self.content()?;
        if html.trim().is_empty() {
            return Err(FetchError::Empty);
        }
        Ok(RenderedPage { html, clicked })
    }
}

//! Content-region detection and locator synthesis for government web pages.
//!
//! `govlocate` finds the DOM subtree holding a page's repeating item list
//! (notices, announcements) or its single article body, skipping navigation,
//! sidebars, headers and footers, and turns it into an XPath locator that a
//! scraper can re-evaluate against later fetches of the same template.
//!
//! # Quick start
//!
//! ```rust
//! use govlocate::{find_list_container, generate_locator, validate_locator, Config, Document};
//!
//! let html = "<html><body><ul id=\"notices\">\
//!     <li>关于开展安全检查的通知 2025-01-03</li>\
//!     <li>关于做好春节期间值班工作的通知 2025-01-02</li>\
//!     <li>政府信息公开工作年度报告 2025-01-01</li>\
//!     </ul></body></html>";
//! let doc = Document::parse(html);
//! let config = Config::default();
//! let node = find_list_container(&doc, &config).unwrap();
//! let locator = generate_locator(&doc, node, &config).unwrap();
//! assert_eq!(locator, "//ul[@id='notices']");
//! assert!(validate_locator(&locator, &doc, &config).valid);
//! ```

pub mod article;
mod batch;
#[cfg(feature = "chrome")]
mod chrome;
pub mod document;
mod error;
pub mod fetch;
pub mod keywords;
pub mod list;
pub mod locator;
pub mod noise;
pub mod pool;
mod record;
mod retry;
pub mod score;
mod synthesize;
pub mod tabs;
mod validate;

pub use article::find_article_container;
pub use batch::{run_batch, BatchSummary};
pub use document::Document;
pub use error::{FetchError, LocateError, RecordError};
pub use fetch::{click_targets, FetchedPage, Fetcher};
pub use keywords::Matching;
pub use list::find_list_container;
pub use locator::Locator;
pub use record::{parse_work_items, read_work_items, write_results, LocatorResult, Status, WorkItem};
pub use retry::{locate_html, process_one, Outcome};
pub use score::{Breakdown, Candidate};
pub use synthesize::{absolute_locator, click_locator, generate_locator, synthesize};
pub use tabs::find_tab;
pub use validate::{count_list_items, validate_html, validate_locator, Validation};

#[cfg(feature = "chrome")]
pub use chrome::ChromeSession;
#[cfg(feature = "http")]
pub use fetch::HttpFetcher;

use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// Which search runs on each attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Repeating item lists.
    #[default]
    List,
    /// Single-article main content.
    Article,
    /// Article first when its container clears `article_min_score`,
    /// otherwise list.
    Auto,
}

/// Tunables for both searches and the retry loop.
///
/// Defaults are the thresholds the scoring rules were tuned with.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
#[non_exhaustive]
pub struct Config {
    pub strategy: Strategy,
    pub max_retries: usize,
    /// Fixed pause after an attempt that produced no locator.
    #[serde(deserialize_with = "deserialize_secs")]
    pub retry_pause: Duration,
    pub matching: Matching,
    /// Skip furniture words when picking a class token for a locator.
    pub filter_furniture_tokens: bool,
    /// Items a container needs to validate, and to be a first-choice list
    /// candidate.
    pub min_items: usize,
    /// List candidates scoring above this are preferred.
    pub positive_cutoff: i32,
    /// A close-scoring parent may hold at most this many times the items.
    pub parent_growth_factor: f64,
    /// A parent scoring this much higher is taken on score alone.
    pub upgrade_margin: i32,
    /// Scores within this distance count as close.
    pub close_margin: i32,
    /// Climbing stops below a parent with more items than this.
    pub max_parent_items: usize,
    /// Containers with fewer items are under-filled.
    pub underfilled_items: usize,
    /// Ancestor levels inspected for contamination.
    pub ancestor_depth: usize,
    /// Article candidates within this many points of the best are near-tied.
    pub tie_window: i32,
    /// A near-tied descendant must keep this share of its ancestor's text.
    pub specific_ratio: f64,
    /// A near-tied descendant must score at least this much.
    pub specific_min_score: i32,
    /// Under [`Strategy::Auto`] the article container is taken only when it
    /// scores above this.
    pub article_min_score: i32,
    /// Header/footer phrase checks only apply to nodes with at most this
    /// many characters of text.
    pub content_check_max_chars: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strategy: Strategy::List,
            max_retries: 3,
            retry_pause: Duration::from_secs(1),
            matching: Matching::WordBoundary,
            filter_furniture_tokens: true,
            min_items: 3,
            positive_cutoff: -15,
            parent_growth_factor: 2.5,
            upgrade_margin: 10,
            close_margin: 5,
            max_parent_items: 50,
            underfilled_items: 5,
            ancestor_depth: 6,
            tie_window: 20,
            specific_ratio: 0.6,
            specific_min_score: 30,
            article_min_score: 20,
            content_check_max_chars: 600,
        }
    }
}

impl Config {
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }
    pub fn with_max_retries(mut self, n: usize) -> Self {
        self.max_retries = n;
        self
    }
    pub fn with_retry_pause(mut self, pause: Duration) -> Self {
        self.retry_pause = pause;
        self
    }
    pub fn with_matching(mut self, matching: Matching) -> Self {
        self.matching = matching;
        self
    }
    pub fn with_filter_furniture_tokens(mut self, v: bool) -> Self {
        self.filter_furniture_tokens = v;
        self
    }
    pub fn with_min_items(mut self, n: usize) -> Self {
        self.min_items = n;
        self
    }
    pub fn with_positive_cutoff(mut self, v: i32) -> Self {
        self.positive_cutoff = v;
        self
    }
    pub fn with_parent_growth_factor(mut self, v: f64) -> Self {
        self.parent_growth_factor = v;
        self
    }
    pub fn with_upgrade_margin(mut self, v: i32) -> Self {
        self.upgrade_margin = v;
        self
    }
    pub fn with_close_margin(mut self, v: i32) -> Self {
        self.close_margin = v;
        self
    }
    pub fn with_max_parent_items(mut self, n: usize) -> Self {
        self.max_parent_items = n;
        self
    }
    pub fn with_underfilled_items(mut self, n: usize) -> Self {
        self.underfilled_items = n;
        self
    }
    pub fn with_ancestor_depth(mut self, n: usize) -> Self {
        self.ancestor_depth = n;
        self
    }
    pub fn with_tie_window(mut self, v: i32) -> Self {
        self.tie_window = v;
        self
    }
    pub fn with_specific_ratio(mut self, v: f64) -> Self {
        self.specific_ratio = v;
        self
    }
    pub fn with_specific_min_score(mut self, v: i32) -> Self {
        self.specific_min_score = v;
        self
    }
    pub fn with_article_min_score(mut self, v: i32) -> Self {
        self.article_min_score = v;
        self
    }
    pub fn with_content_check_max_chars(mut self, n: usize) -> Self {
        self.content_check_max_chars = n;
        self
    }
}

/// Reads a pause given in (possibly fractional) seconds.
fn deserialize_secs<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let secs = f64::deserialize(deserializer)?;
    Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders_chain() {
        let config = Config::default()
            .with_strategy(Strategy::Auto)
            .with_max_retries(1)
            .with_retry_pause(Duration::ZERO)
            .with_positive_cutoff(0)
            .with_parent_growth_factor(1.5);
        assert_eq!(config.strategy, Strategy::Auto);
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.retry_pause, Duration::ZERO);
        assert_eq!(config.positive_cutoff, 0);
        assert_eq!(config.parent_growth_factor, 1.5);
        // untouched fields keep their defaults
        assert_eq!(config.min_items, 3);
        assert_eq!(config.tie_window, 20);
    }
}

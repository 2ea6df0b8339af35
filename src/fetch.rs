//! Page retrieval collaborators.
//!
//! The engine only ever sees serialized HTML. A [`Fetcher`] turns a
//! [`WorkItem`] into a [`FetchedPage`] or a [`FetchError`]; the batch runner
//! maps the error to `fetch_failed` without running the searches.

use crate::error::FetchError;
use crate::record::WorkItem;

/// A retrieved page, plus the locators of any tabs clicked to reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub html: String,
    pub click_path: Option<Vec<String>>,
}

impl FetchedPage {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            click_path: None,
        }
    }
}

pub trait Fetcher: Send + Sync {
    fn fetch(&self, item: &WorkItem) -> Result<FetchedPage, FetchError>;
}

impl<F: Fetcher + ?Sized> Fetcher for &F {
    fn fetch(&self, item: &WorkItem) -> Result<FetchedPage, FetchError> {
        (**self).fetch(item)
    }
}

/// Tab labels encoded in a work item name.
///
/// Every `js` substring is removed, then the rest is split on `>` when
/// present and on `-` otherwise.
///
/// ```
/// assert_eq!(govlocate::click_targets("政策文件>省级文件js"), vec!["政策文件", "省级文件"]);
/// assert_eq!(govlocate::click_targets("通知-公告js"), vec!["通知", "公告"]);
/// ```
pub fn click_targets(name: &str) -> Vec<String> {
    let cleaned = name.replace("js", "");
    let sep = if cleaned.contains('>') { '>' } else { '-' };
    cleaned
        .split(sep)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(feature = "http")]
mod http {
    use std::time::Duration;

    use reqwest::blocking::Client;
    use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
    use tracing::{debug, instrument};

    use super::{FetchedPage, Fetcher};
    use crate::error::FetchError;
    use crate::record::WorkItem;

    const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                              (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
    const ACCEPT_HTML: &str =
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
    const ACCEPT_LANG: &str = "zh-CN,zh;q=0.9,en;q=0.8";
    const TIMEOUT: Duration = Duration::from_secs(15);

    /// Plain HTTP GET with browser-like headers.
    pub struct HttpFetcher {
        client: Client,
    }

    impl HttpFetcher {
        pub fn new() -> Result<Self, FetchError> {
            let mut headers = HeaderMap::new();
            headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
            headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANG));
            let client = Client::builder()
                .user_agent(USER_AGENT)
                .default_headers(headers)
                .timeout(TIMEOUT)
                .build()
                .map_err(|e| FetchError::Http(e.to_string()))?;
            Ok(Self { client })
        }

        #[instrument(skip(self))]
        pub fn get(&self, url: &str) -> Result<String, FetchError> {
            let response = self
                .client
                .get(url)
                .send()
                .map_err(|e| FetchError::Http(e.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status(status.as_u16()));
            }
            let bytes = response
                .bytes()
                .map_err(|e| FetchError::Http(e.to_string()))?;
            debug!(bytes = bytes.len(), "fetched");
            let html = String::from_utf8_lossy(&bytes).into_owned();
            if html.trim().is_empty() {
                return Err(FetchError::Empty);
            }
            Ok(html)
        }
    }

    impl Fetcher for HttpFetcher {
        fn fetch(&self, item: &WorkItem) -> Result<FetchedPage, FetchError> {
            self.get(&item.url).map(FetchedPage::new)
        }
    }
}

#[cfg(feature = "http")]
pub use http::HttpFetcher;

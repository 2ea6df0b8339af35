//! Bounded pool of rendering sessions.
//!
//! [`SessionPool::acquire`] blocks until a session is free and hands it out
//! inside a [`PoolGuard`]; dropping the guard puts the session back, on every
//! exit path including panics and early returns.

use std::ops::{Deref, DerefMut};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::fetch::{click_targets, FetchedPage, Fetcher};
use crate::record::WorkItem;

/// Page captured by a rendering session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub html: String,
    /// Locators of the tabs that were clicked, in click order.
    pub clicked: Vec<String>,
}

/// A reusable browser-like session that loads a page, runs its scripts and
/// clicks through the given tab labels before capturing the DOM.
pub trait Session: Send {
    fn render(&mut self, url: &str, tabs: &[String]) -> Result<RenderedPage, FetchError>;
}

pub struct SessionPool<S> {
    idle: Mutex<Vec<S>>,
    available: Condvar,
    capacity: usize,
}

impl<S> SessionPool<S> {
    pub fn new(sessions: Vec<S>) -> Self {
        let capacity = sessions.len();
        Self {
            idle: Mutex::new(sessions),
            available: Condvar::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Sessions not currently borrowed.
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }

    /// Borrows a session, waiting until one is returned if all are in use.
    ///
    /// A pool built with no sessions would wait forever; `None` is returned
    /// instead.
    pub fn acquire(&self) -> Option<PoolGuard<'_, S>> {
        if self.capacity == 0 {
            return None;
        }
        let mut idle = self.idle.lock();
        loop {
            if let Some(session) = idle.pop() {
                return Some(PoolGuard {
                    pool: self,
                    session: Some(session),
                });
            }
            self.available.wait(&mut idle);
        }
    }

    /// Borrows a session only if one is idle right now.
    pub fn try_acquire(&self) -> Option<PoolGuard<'_, S>> {
        self.idle.lock().pop().map(|session| PoolGuard {
            pool: self,
            session: Some(session),
        })
    }

    fn release(&self, session: S) {
        self.idle.lock().push(session);
        self.available.notify_one();
    }
}

/// A borrowed session; returned to its pool on drop.
pub struct PoolGuard<'p, S> {
    pool: &'p SessionPool<S>,
    session: Option<S>,
}

impl<S> Deref for PoolGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        // Only `drop` takes the session out.
        self.session.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl<S> DerefMut for PoolGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.session.as_mut().unwrap_or_else(|| unreachable!())
    }
}

impl<S> Drop for PoolGuard<'_, S> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            self.pool.release(session);
        }
    }
}

/// Renders pages that need scripts through pooled sessions and fetches the
/// rest with `fallback`. A failed render also falls back.
pub struct RenderingFetcher<'p, S, F> {
    pool: &'p SessionPool<S>,
    fallback: F,
}

impl<'p, S, F> RenderingFetcher<'p, S, F> {
    pub fn new(pool: &'p SessionPool<S>, fallback: F) -> Self {
        Self { pool, fallback }
    }
}

impl<S: Session, F: Fetcher> Fetcher for RenderingFetcher<'_, S, F> {
    fn fetch(&self, item: &WorkItem) -> Result<FetchedPage, FetchError> {
        if !item.needs_rendering() {
            return self.fallback.fetch(item);
        }
        let tabs = click_targets(&item.name);
        let rendered = match self.pool.acquire() {
            Some(mut session) => session.render(&item.url, &tabs),
            None => Err(FetchError::Session("pool has no sessions".into())),
        };
        match rendered {
            Ok(page) if !page.html.trim().is_empty() => {
                debug!(url = %item.url, clicked = page.clicked.len(), "rendered");
                Ok(FetchedPage {
                    html: page.html,
                    click_path: Some(page.clicked),
                })
            }
            Ok(_) => {
                warn!(url = %item.url, "rendered page is empty, fetching without rendering");
                self.fallback.fetch(item)
            }
            Err(err) => {
                warn!(url = %item.url, error = %err, "rendering failed, fetching without rendering");
                self.fallback.fetch(item)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    struct FakeSession {
        fail: bool,
        renders: Arc<AtomicUsize>,
    }

    impl Session for FakeSession {
        fn render(&mut self, url: &str, tabs: &[String]) -> Result<RenderedPage, FetchError> {
            self.renders.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(FetchError::Session("browser crashed".into()));
            }
            Ok(RenderedPage {
                html: format!("<html><body>rendered {url}</body></html>"),
                clicked: tabs.iter().map(|t| format!("//a[text()='{t}']")).collect(),
            })
        }
    }

    struct Plain;

    impl Fetcher for Plain {
        fn fetch(&self, item: &WorkItem) -> Result<FetchedPage, FetchError> {
            Ok(FetchedPage::new(format!("<html><body>plain {}</body></html>", item.url)))
        }
    }

    fn sessions(n: usize, fail: bool, renders: &Arc<AtomicUsize>) -> Vec<FakeSession> {
        (0..n)
            .map(|_| FakeSession {
                fail,
                renders: Arc::clone(renders),
            })
            .collect()
    }

    #[test]
    fn test_guard_returns_session_on_drop() {
        let renders = Arc::new(AtomicUsize::new(0));
        let pool = SessionPool::new(sessions(2, false, &renders));
        let a = pool.try_acquire().unwrap();
        let b = pool.try_acquire().unwrap();
        assert!(pool.try_acquire().is_none());
        assert_eq!(pool.idle(), 0);
        drop(a);
        assert_eq!(pool.idle(), 1);
        drop(b);
        assert_eq!(pool.idle(), 2);
    }

    #[test]
    fn test_session_returned_after_panic() {
        let renders = Arc::new(AtomicUsize::new(0));
        let pool = SessionPool::new(sessions(1, false, &renders));
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = pool.acquire().unwrap();
            panic!("worker failed");
        }));
        assert!(result.is_err());
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn test_acquire_blocks_until_release() {
        let renders = Arc::new(AtomicUsize::new(0));
        let pool = SessionPool::new(sessions(1, false, &renders));
        let in_use = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    let _guard = pool.acquire().unwrap();
                    let now = in_use.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(5));
                    in_use.fetch_sub(1, Ordering::SeqCst);
                });
            }
        });
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn test_empty_pool_does_not_block() {
        let pool: SessionPool<FakeSession> = SessionPool::new(Vec::new());
        assert!(pool.acquire().is_none());
    }

    #[test]
    fn test_rendering_fetcher_routes_by_name() {
        let renders = Arc::new(AtomicUsize::new(0));
        let pool = SessionPool::new(sessions(1, false, &renders));
        let fetcher = RenderingFetcher::new(&pool, Plain);

        let page = fetcher
            .fetch(&WorkItem::new("政策文件>省级文件js", "https://a.gov.cn/"))
            .unwrap();
        assert!(page.html.contains("rendered"));
        assert_eq!(
            page.click_path,
            Some(vec![
                "//a[text()='政策文件']".to_string(),
                "//a[text()='省级文件']".to_string()
            ])
        );

        let page = fetcher
            .fetch(&WorkItem::new("通知公告", "https://a.gov.cn/"))
            .unwrap();
        assert!(page.html.contains("plain"));
        assert_eq!(page.click_path, None);
        assert_eq!(renders.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_rendering_failure_falls_back() {
        let renders = Arc::new(AtomicUsize::new(0));
        let pool = SessionPool::new(sessions(1, true, &renders));
        let fetcher = RenderingFetcher::new(&pool, Plain);
        let page = fetcher
            .fetch(&WorkItem::new("专题js", "https://a.gov.cn/"))
            .unwrap();
        assert!(page.html.contains("plain"));
        assert_eq!(pool.idle(), 1);
    }
}

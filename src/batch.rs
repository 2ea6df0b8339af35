// Bounded parallel runner over work items.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use parking_lot::Mutex;
use tracing::info;

use crate::fetch::Fetcher;
use crate::record::{LocatorResult, Status, WorkItem};
use crate::retry::process_one;
use crate::Config;

/// Per-status counts for one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub success: usize,
    pub failed: usize,
    pub fetch_failed: usize,
}

impl BatchSummary {
    pub fn from_results(results: &[LocatorResult]) -> Self {
        results.iter().fold(Self::default(), |mut s, r| {
            match r.status {
                Status::Success => s.success += 1,
                Status::Failed => s.failed += 1,
                Status::FetchFailed => s.fetch_failed += 1,
            }
            s
        })
    }

    pub fn total(&self) -> usize {
        self.success + self.failed + self.fetch_failed
    }
}

/// Processes `items` on at most `workers` threads and returns one result per
/// item, in input order.
///
/// Workers pull the next unclaimed index, so a slow page only holds up its
/// own thread. `workers == 0` is treated as one.
pub fn run_batch<F: Fetcher + ?Sized>(
    items: &[WorkItem],
    fetcher: &F,
    config: &Config,
    workers: usize,
) -> (Vec<LocatorResult>, BatchSummary) {
    let workers = workers.clamp(1, items.len().max(1));
    let next = AtomicUsize::new(0);
    let slots: Mutex<Vec<Option<LocatorResult>>> = Mutex::new(vec![None; items.len()]);

    thread::scope(|s| {
        for _ in 0..workers {
            s.spawn(|| loop {
                let i = next.fetch_add(1, Ordering::Relaxed);
                let Some(item) = items.get(i) else {
                    break;
                };
                let result = process_one(item, fetcher, config);
                slots.lock()[i] = Some(result);
            });
        }
    });

    let results: Vec<LocatorResult> = slots
        .into_inner()
        .into_iter()
        .zip(items)
        .map(|(slot, item)| slot.unwrap_or_else(|| LocatorResult::fetch_failed(item)))
        .collect();
    let summary = BatchSummary::from_results(&results);
    info!(
        total = summary.total(),
        success = summary.success,
        failed = summary.failed,
        fetch_failed = summary.fetch_failed,
        workers,
        "batch finished"
    );
    (results, summary)
}

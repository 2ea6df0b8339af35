// Attempt loop: search, synthesize, validate, and keep the best locator seen.

use std::thread;

use tracing::{debug, info, warn};

use crate::document::Document;
use crate::error::LocateError;
use crate::fetch::Fetcher;
use crate::record::{LocatorResult, Status, WorkItem};
use crate::synthesize::generate_locator;
use crate::validate::{validate_locator, Validation};
use crate::{article, list, Config, Strategy};

/// What the attempt loop settled on for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// The first locator that validated, or else the last one synthesized.
    pub locator: Option<String>,
    pub validation: Option<Validation>,
    /// Attempts used, including the one that succeeded.
    pub attempts: usize,
}

impl Outcome {
    pub fn is_valid(&self) -> bool {
        self.validation.as_ref().is_some_and(|v| v.valid)
    }
}

type Attempt = (String, Validation);

fn locate_with(
    doc: &Document,
    config: &Config,
    find: fn(&Document, &Config) -> Option<ego_tree::NodeId>,
) -> Result<Attempt, LocateError> {
    let node = find(doc, config).ok_or(LocateError::NoCandidate)?;
    let locator = generate_locator(doc, node, config)?;
    let validation = validate_locator(&locator, doc, config);
    Ok((locator, validation))
}

fn attempt(doc: &Document, config: &Config) -> Result<Attempt, LocateError> {
    match config.strategy {
        Strategy::List => locate_with(doc, config, list::find_list_container),
        Strategy::Article => locate_with(doc, config, article::find_article_container),
        Strategy::Auto => match article::best_candidate(doc, config) {
            Some(found) if found.score > config.article_min_score => {
                // a list inside the article container is the finer region
                let node = list::find_list_container(doc, config)
                    .filter(|&l| l == found.node || doc.is_ancestor(found.node, l))
                    .unwrap_or(found.node);
                let locator = generate_locator(doc, node, config)?;
                let validation = validate_locator(&locator, doc, config);
                Ok((locator, validation))
            }
            _ => locate_with(doc, config, list::find_list_container),
        },
    }
}

/// Runs up to `config.max_retries` attempts over `html`.
///
/// The page is parsed once and every attempt reads the same tree. An attempt
/// that yields no locator is followed by a fixed `retry_pause` unless it was
/// the last one.
pub fn locate_html(html: &str, config: &Config) -> Outcome {
    let doc = Document::parse(html);
    let attempts = config.max_retries.max(1);
    let mut best: Option<Attempt> = None;

    for n in 1..=attempts {
        match attempt(&doc, config) {
            Ok((locator, validation)) => {
                debug!(attempt = n, %locator, %validation, "candidate locator");
                if validation.valid {
                    return Outcome {
                        locator: Some(locator),
                        validation: Some(validation),
                        attempts: n,
                    };
                }
                best = Some((locator, validation));
            }
            Err(err) => {
                debug!(attempt = n, error = %err, "no locator");
                if n < attempts && !config.retry_pause.is_zero() {
                    thread::sleep(config.retry_pause);
                }
            }
        }
    }

    let (locator, validation) = best.unzip();
    Outcome {
        locator,
        validation,
        attempts,
    }
}

/// Fetches one work item and locates its content region.
///
/// Fetch errors become [`Status::FetchFailed`] without running any search. A
/// locator that never validated is still reported as a success, with the
/// failing [`Validation`] attached.
pub fn process_one<F: Fetcher + ?Sized>(item: &WorkItem, fetcher: &F, config: &Config) -> LocatorResult {
    let page = match fetcher.fetch(item) {
        Ok(page) => page,
        Err(err) => {
            warn!(name = %item.name, url = %item.url, error = %err, "fetch failed");
            return LocatorResult::fetch_failed(item);
        }
    };

    let outcome = locate_html(&page.html, config);
    let status = match (&outcome.locator, &outcome.validation) {
        (None, _) => {
            info!(name = %item.name, attempts = outcome.attempts, "no locator found");
            Status::Failed
        }
        (Some(locator), Some(v)) if !v.valid => {
            warn!(name = %item.name, %locator, validation = %v, "keeping unvalidated locator");
            Status::Success
        }
        (Some(locator), _) => {
            info!(name = %item.name, %locator, attempts = outcome.attempts, "located");
            Status::Success
        }
    };

    LocatorResult {
        name: item.name.clone(),
        url: item.url.clone(),
        locator: outcome.locator,
        status,
        click_path: page.click_path,
        validation: outcome.validation,
    }
}

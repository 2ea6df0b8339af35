//! Locator synthesis.
//!
//! A node gets the first locator form that applies:
//!
//! 1. `//tag[@id='...']` for a non-empty id that is not a furniture word.
//! 2. `//tag[contains(concat(' ', normalize-space(@class), ' '), ' tok ')]`
//!    with the longest class token (first wins on ties).
//! 3. `//tag[@attr='...']` for `aria-label`, `role`, `data-testid` or
//!    `data-role`.
//! 4. The nearest ancestor satisfying 1 or 2, followed by `/tag[n]` steps.
//! 5. `/tag[n]/...` from below the root element.
//!
//! Tabs that have to be clicked get a text locator instead, see
//! [`click_locator`].

use ego_tree::NodeId;
use tracing::trace;

use crate::document::{normalize_whitespace, Document};
use crate::keywords;
use crate::locator::{Axis, Locator, Predicate, Step};
use crate::{Config, LocateError};

/// Texts longer than this are matched by their head and tail only.
const CLICK_TEXT_MAX: usize = 10;

/// Characters kept from each end of a long tab text.
const CLICK_TEXT_EDGE: usize = 5;

/// Attributes tried when a node has neither a usable id nor class.
const FALLBACK_ATTRS: &[&str] = &["aria-label", "role", "data-testid", "data-role"];

/// Builds a locator for `node`.
///
/// Fails only when `node` is not an element of `doc`.
pub fn synthesize(doc: &Document, node: NodeId, config: &Config) -> Result<Locator, LocateError> {
    if !doc.is_element(node) {
        return Err(LocateError::Synthesis(format!(
            "{node:?} is not an element of this document"
        )));
    }
    if let Some(step) = identity_step(doc, node, config) {
        return Ok(Locator::new(vec![step]));
    }
    if let Some(step) = attribute_step(doc, node) {
        return Ok(Locator::new(vec![step]));
    }

    // Ancestors nearest first; the root element never anchors a path.
    let mut below = vec![node];
    for ancestor in doc.ancestors(node) {
        if doc.is_root(ancestor) {
            break;
        }
        if let Some(anchor) = identity_step(doc, ancestor, config) {
            trace!(anchor = %anchor, depth = below.len(), "relative locator");
            return Ok(Locator::new(vec![anchor]).join(positional_steps(doc, &below)));
        }
        below.push(ancestor);
    }

    if doc.is_root(node) {
        return Ok(Locator::new(vec![
            Step::new(Axis::Child, "html").with(Predicate::Position(1))
        ]));
    }
    Ok(Locator::new(positional_steps(doc, &below)))
}

/// Convenience wrapper returning the locator text.
pub fn generate_locator(doc: &Document, node: NodeId, config: &Config) -> Result<String, LocateError> {
    synthesize(doc, node, config).map(|l| l.to_string())
}

/// Builds the locator recorded for a clicked tab.
///
/// The tab's own text (its first text child, whitespace collapsed) is the
/// anchor: `//a[contains(text(), '通知公告')]`. Texts over ten characters
/// keep only their first and last five, as two tests, so a changing middle
/// (counts, dates) does not break it. Tabs without usable text get the
/// regular [`synthesize`] locator.
pub fn click_locator(doc: &Document, node: NodeId, config: &Config) -> Result<Locator, LocateError> {
    let raw = doc.first_text(node);
    let cleaned = normalize_whitespace(raw);
    let chars: Vec<char> = cleaned.chars().collect();
    let pieces: Vec<String> = if chars.len() > CLICK_TEXT_MAX {
        vec![
            chars[..CLICK_TEXT_EDGE].iter().collect(),
            chars[chars.len() - CLICK_TEXT_EDGE..].iter().collect(),
        ]
    } else {
        vec![cleaned.clone()]
    };

    let usable = !cleaned.is_empty()
        && pieces.iter().all(|p| quotable(p) && raw.contains(p.as_str()));
    if !usable {
        trace!(tag = doc.tag(node), "tab text unusable, falling back");
        return synthesize(doc, node, config);
    }
    let step = pieces
        .into_iter()
        .fold(Step::new(Axis::Descendant, doc.tag(node)), |step, piece| {
            step.with(Predicate::TextContains(piece))
        });
    Ok(Locator::new(vec![step]))
}

/// `/html[1]/body[1]/...` down to `node`, selecting exactly that node.
pub fn absolute_locator(doc: &Document, node: NodeId) -> Locator {
    let mut chain = vec![node];
    chain.extend(doc.ancestors(node));
    Locator::new(positional_steps(doc, &chain))
}

/// Forms 1 and 2: id, then longest class token.
fn identity_step(doc: &Document, node: NodeId, config: &Config) -> Option<Step> {
    let tag = doc.tag(node);

    if let Some(id) = exact_value(doc, node, "id") {
        return Some(Step::new(Axis::Descendant, tag).with(Predicate::AttrEquals {
            name: "id".into(),
            value: id.to_string(),
        }));
    }

    let token = longest_class_token(doc, node, config.filter_furniture_tokens)?;
    Some(Step::new(Axis::Descendant, tag).with(Predicate::AttrToken {
        name: "class".into(),
        token: token.to_string(),
    }))
}

/// Form 3.
fn attribute_step(doc: &Document, node: NodeId) -> Option<Step> {
    FALLBACK_ATTRS.iter().find_map(|&attr| {
        let value = exact_value(doc, node, attr)?;
        Some(
            Step::new(Axis::Descendant, doc.tag(node)).with(Predicate::AttrEquals {
                name: attr.into(),
                value: value.to_string(),
            }),
        )
    })
}

/// The untrimmed value of `attr`, for an `@attr='...'` equality test.
///
/// Blank, furniture and unquotable values are rejected; surrounding
/// whitespace is kept so the test still matches.
fn exact_value<'d>(doc: &'d Document, node: NodeId, attr: &str) -> Option<&'d str> {
    let raw = doc.attr(node, attr)?;
    let trimmed = raw.trim();
    (!trimmed.is_empty() && !is_furniture_word(trimmed) && quotable(raw)).then_some(raw)
}

fn longest_class_token(doc: &Document, node: NodeId, filter_furniture: bool) -> Option<&str> {
    doc.class_tokens(node)
        .into_iter()
        .filter(|t| !t.contains(['\'', '"']))
        .filter(|t| !filter_furniture || !is_furniture_word(t))
        // max_by_key keeps the last maximum; fold keeps the first.
        .fold(None, |best: Option<&str>, t| match best {
            Some(b) if b.chars().count() >= t.chars().count() => Some(b),
            _ => Some(t),
        })
}

/// `/tag[n]` steps from the outermost entry of `chain` down to the first.
///
/// `chain` is ordered nearest first, starting at the target node.
fn positional_steps(doc: &Document, chain: &[NodeId]) -> Vec<Step> {
    chain
        .iter()
        .rev()
        .map(|&id| {
            Step::new(Axis::Child, doc.tag(id)).with(Predicate::Position(doc.same_tag_ordinal(id)))
        })
        .collect()
}

/// Whole value equals a furniture keyword (`nav`, `Footer`, `menu2`).
fn is_furniture_word(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    let stem = lower.trim_end_matches(|c: char| c.is_ascii_digit());
    keywords::FURNITURE.contains(&stem)
}

/// An XPath 1.0 literal cannot hold both quote characters.
fn quotable(value: &str) -> bool {
    !(value.contains('\'') && value.contains('"'))
}

//! List-container search.
//!
//! Item-like nodes (`li`, `tr`, `article`, `item`/`list` divs) are grouped by
//! parent, parents with enough items are scored by [`LIST_RULES`], and the
//! winner climbs toward the root while a parent is a clearly better
//! container.

use std::collections::{HashMap, HashSet};

use ego_tree::NodeId;
use tracing::debug;

use crate::document::Document;
use crate::keywords::{self, Matching};
use crate::noise;
use crate::score::{Breakdown, Candidate, Rule};
use crate::synthesize::synthesize;
use crate::validate;
use crate::Config;

/// Ancestor levels checked for furniture before climbing into a parent.
const CLIMB_ANCESTOR_DEPTH: usize = 8;

/// Ancestor levels checked for a bottom-of-page region.
const FOOTER_AREA_DEPTH: usize = 10;

/// A close-scoring parent must also score above this.
const CLOSE_PARENT_FLOOR: i32 = -10;

/// An under-filled container may grow into a parent with at most this many items.
const UNDERFILLED_PARENT_MAX: usize = 20;

/// The final pass only substitutes a parent scoring above this.
const FINAL_PARENT_FLOOR: i32 = -20;

/// Items sampled for text diversity and navigation words.
const SAMPLE_ITEMS: usize = 10;

/// Characters of an item's text compared for diversity.
const DIVERSITY_PREFIX: usize = 30;

/// Items with fewer characters count as short labels.
const SHORT_ITEM_CHARS: usize = 15;

/// Signals gathered for one list container.
pub(crate) struct ListSignals {
    matching: Matching,
    /// Full dates plus explicit date labels.
    precise_dates: usize,
    /// `年`/`月`/`日` characters.
    date_chars: usize,
    avg_item_len: Option<f64>,
    /// Lowercased synthesized locator.
    locator: String,
    class: String,
    id: String,
    role: String,
    sample: Option<ItemSample>,
    link_ratio: Option<f64>,
    footer_area: bool,
    contamination: i32,
}

struct ItemSample {
    diversity: f64,
    short_ratio: f64,
    nav_ratio: f64,
}

fn weak_positive(value: &str, mode: Matching) -> i32 {
    let hits = keywords::attr_hits(value, keywords::LIST_WEAK_POSITIVE, mode).len() as i32;
    if hits == 0 {
        0
    } else if keywords::attr_any(value, keywords::LIST_WEAK_SPOILERS, mode) {
        -5 * hits
    } else {
        8 * hits
    }
}

fn hit_count(value: &str, set: &[&str], mode: Matching) -> i32 {
    keywords::attr_hits(value, set, mode).len() as i32
}

/// Weighted rules for list containers.
pub(crate) const LIST_RULES: &[Rule<ListSignals>] = &[
    Rule {
        label: "precise_time",
        score: |s| s.precise_dates.min(3) as i32 * 20,
    },
    Rule {
        label: "loose_time",
        score: |s| match (s.precise_dates, s.date_chars) {
            (0, n) if n > 3 => (n - 3).min(3) as i32 * 10,
            (0, n) if n <= 2 => -2,
            _ => 0,
        },
    },
    Rule {
        label: "item_length",
        score: |s| match s.avg_item_len {
            Some(avg) if avg > 80.0 => 15,
            Some(avg) if avg > 50.0 => 10,
            Some(avg) if avg > 30.0 => 6,
            Some(avg) if avg > 15.0 => 3,
            Some(avg) if avg < 10.0 => -8,
            _ => 0,
        },
    },
    Rule {
        label: "locator_navigation",
        score: |s| {
            -25 * keywords::LOCATOR_NAVIGATION
                .iter()
                .filter(|kw| s.locator.contains(*kw))
                .count() as i32
        },
    },
    Rule {
        label: "negative_class_id",
        score: |s| {
            -20 * (hit_count(&s.class, keywords::LIST_NEGATIVE, s.matching)
                + hit_count(&s.id, keywords::LIST_NEGATIVE, s.matching))
        },
    },
    Rule {
        label: "negative_role",
        score: |s| -25 * hit_count(&s.role, keywords::LIST_NEGATIVE, s.matching),
    },
    Rule {
        label: "strong_positive",
        score: |s| {
            15 * (hit_count(&s.class, keywords::LIST_STRONG_POSITIVE, s.matching)
                + hit_count(&s.id, keywords::LIST_STRONG_POSITIVE, s.matching))
        },
    },
    Rule {
        label: "weak_positive",
        score: |s| weak_positive(&s.class, s.matching) + weak_positive(&s.id, s.matching),
    },
    Rule {
        label: "diversity",
        score: |s| match &s.sample {
            Some(x) if x.diversity > 0.8 => 10,
            Some(x) if x.diversity < 0.4 => -8,
            _ => 0,
        },
    },
    Rule {
        label: "short_items",
        score: |s| match &s.sample {
            Some(x) if x.short_ratio > 0.7 => -12,
            Some(x) if x.short_ratio < 0.3 => 8,
            _ => 0,
        },
    },
    Rule {
        label: "navigation_words",
        score: |s| match &s.sample {
            Some(x) if x.nav_ratio > 0.4 => -15,
            _ => 0,
        },
    },
    Rule {
        label: "link_ratio",
        score: |s| match s.link_ratio {
            Some(r) if r > 0.9 => -10,
            Some(r) if (0.3..=0.8).contains(&r) => 5,
            Some(r) if r < 0.1 => -3,
            _ => 0,
        },
    },
    Rule {
        label: "footer_area",
        score: |s| if s.footer_area { -50 } else { 0 },
    },
    Rule {
        label: "ancestor_contamination",
        score: |s| -s.contamination,
    },
];

/// Counted list items: `li`, `tr`, `article`, and divs matching `item`.
fn is_item(doc: &Document, id: NodeId, mode: Matching) -> bool {
    validate::is_list_item(doc, id, mode)
}

/// Nodes collected as possible list members; also takes `list` divs.
fn is_item_like(doc: &Document, id: NodeId, mode: Matching) -> bool {
    is_item(doc, id, mode)
        || (doc.tag(id) == "div"
            && keywords::attr_matches(doc.attr_or_empty(id, "class"), "list", mode))
}

fn item_nodes(doc: &Document, id: NodeId, mode: Matching) -> Vec<NodeId> {
    doc.descendants(id).filter(|&d| is_item(doc, d, mode)).collect()
}

fn count_items(doc: &Document, id: NodeId, mode: Matching) -> usize {
    doc.descendants(id).filter(|&d| is_item(doc, d, mode)).count()
}

fn direct_items(doc: &Document, id: NodeId, mode: Matching) -> usize {
    doc.children(id).filter(|&c| is_item(doc, c, mode)).count()
}

/// Parents of item-like nodes with their item counts, in document order.
fn group_items(doc: &Document, mode: Matching) -> Vec<(NodeId, usize)> {
    let mut groups: Vec<(NodeId, usize)> = Vec::new();
    let mut index: HashMap<NodeId, usize> = HashMap::new();
    for id in doc.elements().filter(|&id| is_item_like(doc, id, mode)) {
        let Some(parent) = doc.parent(id) else {
            continue;
        };
        match index.get(&parent) {
            Some(&i) => groups[i].1 += 1,
            None => {
                index.insert(parent, groups.len());
                groups.push((parent, 1));
            }
        }
    }
    groups
}

fn in_footer_area(doc: &Document, id: NodeId, mode: Matching) -> bool {
    std::iter::once(id)
        .chain(doc.ancestors(id))
        .take(FOOTER_AREA_DEPTH + 1)
        .take_while(|&n| !matches!(doc.tag(n), "body" | "html"))
        .any(|n| {
            doc.tag(n) == "footer"
                || keywords::attr_any(doc.attr_or_empty(n, "class"), keywords::FOOTER_AREA, mode)
                || keywords::attr_any(doc.attr_or_empty(n, "id"), keywords::FOOTER_AREA, mode)
        })
}

fn sample_items(texts: &[String]) -> ItemSample {
    let checked = texts.len().max(1) as f64;
    let mut prefixes = HashSet::new();
    let mut short = 0;
    for text in texts.iter().filter(|t| !t.is_empty()) {
        if text.chars().count() < SHORT_ITEM_CHARS {
            short += 1;
        }
        prefixes.insert(text.chars().take(DIVERSITY_PREFIX).collect::<String>());
    }
    let navigational = texts
        .iter()
        .filter(|t| {
            let lower = t.to_lowercase();
            keywords::NAVIGATION_WORDS.iter().any(|w| lower.contains(w))
        })
        .count();
    ItemSample {
        diversity: prefixes.len() as f64 / checked,
        short_ratio: short as f64 / checked,
        nav_ratio: navigational as f64 / checked,
    }
}

fn gather(doc: &Document, node: NodeId, config: &Config) -> (ListSignals, usize) {
    let mode = config.matching;
    let text = doc.text(node).to_lowercase();
    let items = item_nodes(doc, node, mode);
    let texts: Vec<String> = items.iter().map(|&i| doc.text(i)).collect();

    let avg_item_len = (!texts.is_empty()).then(|| {
        texts.iter().map(|t| t.chars().count()).sum::<usize>() as f64 / texts.len() as f64
    });
    let sample = (items.len() > 2).then(|| sample_items(&texts[..texts.len().min(SAMPLE_ITEMS)]));
    let link_ratio = (!items.is_empty())
        .then(|| doc.count_tags(node, &["a"]) as f64 / items.len() as f64);
    let locator = synthesize(doc, node, config)
        .map(|l| l.to_string().to_lowercase())
        .unwrap_or_default();

    let signals = ListSignals {
        matching: mode,
        precise_dates: keywords::PRECISE_DATE_RE.find_iter(&text).count()
            + keywords::phrase_occurrences(&text, keywords::DATE_LABELS),
        date_chars: text.chars().filter(|c| matches!(c, '年' | '月' | '日')).count(),
        avg_item_len,
        locator,
        class: doc.attr_or_empty(node, "class").to_string(),
        id: doc.attr_or_empty(node, "id").to_string(),
        role: doc.attr_or_empty(node, "role").to_string(),
        sample,
        link_ratio,
        footer_area: in_footer_area(doc, node, mode),
        contamination: noise::ancestor_penalty(doc, node, config),
    };
    (signals, items.len())
}

/// Scores `node` as a list container.
pub fn score_container(doc: &Document, node: NodeId, config: &Config) -> Breakdown {
    let (signals, _) = gather(doc, node, config);
    Breakdown::evaluate(LIST_RULES, &signals)
}

fn candidate(doc: &Document, node: NodeId, config: &Config) -> Candidate {
    let (signals, items) = gather(doc, node, config);
    let c = Candidate::new(node, items, Breakdown::evaluate(LIST_RULES, &signals));
    debug!(
        tag = doc.tag(node),
        score = c.score,
        items = c.items,
        breakdown = %c.breakdown,
        "list candidate"
    );
    c
}

/// Parents holding at least `min_items` items, relaxed to two.
fn shortlist(groups: &[(NodeId, usize)], min_items: usize) -> Vec<NodeId> {
    for threshold in [min_items, 2] {
        let picked: Vec<NodeId> = groups
            .iter()
            .filter(|&&(_, n)| n >= threshold)
            .map(|&(p, _)| p)
            .collect();
        if !picked.is_empty() {
            return picked;
        }
    }
    Vec::new()
}

/// Scored candidate parents, in document order.
pub fn candidates(doc: &Document, config: &Config) -> Vec<Candidate> {
    let groups = group_items(doc, config.matching);
    shortlist(&groups, config.min_items)
        .into_iter()
        .map(|p| candidate(doc, p, config))
        .collect()
}

fn first_best<'a>(cands: impl Iterator<Item = &'a Candidate>) -> Option<&'a Candidate> {
    cands.fold(None, |best: Option<&Candidate>, c| match best {
        Some(b) if b.score >= c.score => Some(b),
        _ => Some(c),
    })
}

/// Highest score above the cutoff, else the least negative. First wins ties.
fn select(cands: &[Candidate], cutoff: i32) -> Option<&Candidate> {
    first_best(cands.iter().filter(|c| c.score > cutoff)).or_else(|| first_best(cands.iter()))
}

/// Finds the smallest container of a repeating, non-navigation item list.
pub fn find_list_container(doc: &Document, config: &Config) -> Option<NodeId> {
    let groups = group_items(doc, config.matching);
    let parents = shortlist(&groups, config.min_items);
    if parents.is_empty() {
        // Single item-like nodes only: the busiest parent is all there is.
        return groups
            .iter()
            .fold(None, |best: Option<(NodeId, usize)>, &(p, n)| match best {
                Some((_, m)) if m >= n => best,
                _ => Some((p, n)),
            })
            .map(|(p, _)| p);
    }

    let cands: Vec<Candidate> = parents.into_iter().map(|p| candidate(doc, p, config)).collect();
    let best = select(&cands, config.positive_cutoff)?;
    debug!(score = best.score, items = best.items, "selected list candidate");

    let climbed = climb(doc, best.node, config);
    Some(final_pass(doc, climbed, config))
}

/// Walks up from `start` while a parent is a clearly better container.
fn climb(doc: &Document, start: NodeId, config: &Config) -> NodeId {
    let mode = config.matching;
    let mut current = start;
    let mut current_items = count_items(doc, current, mode);
    let mut current_score = score_container(doc, current, config).total();

    while let Some(parent) = doc.parent(current) {
        if doc.is_root(parent) || noise::has_furniture_ancestor(doc, parent, CLIMB_ANCESTOR_DEPTH, mode)
        {
            break;
        }
        let parent_items = count_items(doc, parent, mode);
        if parent_items <= current_items || parent_items > config.max_parent_items {
            break;
        }
        let parent_score = score_container(doc, parent, config).total();

        let clearly_better = parent_score > current_score + config.upgrade_margin;
        let close_and_bounded = parent_score >= current_score - config.close_margin
            && parent_score > CLOSE_PARENT_FLOOR
            && parent_items as f64 <= current_items as f64 * config.parent_growth_factor;
        let fills_up = current_items < config.underfilled_items
            && parent_items <= UNDERFILLED_PARENT_MAX
            && parent_score > config.positive_cutoff;

        debug!(
            current_score,
            parent_score, current_items, parent_items, clearly_better, close_and_bounded, fills_up,
            "climb"
        );
        if !(clearly_better || close_and_bounded || fills_up) {
            break;
        }
        current = parent;
        current_items = parent_items;
        current_score = parent_score;
        if direct_items(doc, current, mode) < config.min_items {
            break;
        }
    }
    current
}

/// Takes the parent of an under-filled or poorly scored container when the
/// parent holds strictly more items and is not furniture.
fn final_pass(doc: &Document, node: NodeId, config: &Config) -> NodeId {
    let mode = config.matching;
    let items = count_items(doc, node, mode);
    let weak = items < config.underfilled_items
        || score_container(doc, node, config).total() <= config.positive_cutoff;
    if !weak {
        return node;
    }
    let Some(parent) = doc.parent(node).filter(|&p| !doc.is_root(p)) else {
        return node;
    };
    let better = count_items(doc, parent, mode) > items
        && score_container(doc, parent, config).total() > FINAL_PARENT_FLOOR
        && !noise::has_furniture_ancestor(doc, parent, CLIMB_ANCESTOR_DEPTH, mode);
    if better {
        debug!(items, "final pass took the parent");
        parent
    } else {
        node
    }
}

//! Article-container search.
//!
//! Furniture subtrees are excluded first (structural tags and keywords, then
//! header/footer phrasing and link-dominated blocks on what remains). The
//! surviving `div`/`section`/`article`/`main` containers are scored by
//! [`ARTICLE_RULES`]; near ties prefer the more specific container.

use std::collections::{HashMap, HashSet};

use ego_tree::NodeId;
use tracing::{debug, trace};

use crate::document::Document;
use crate::keywords::{self, Matching};
use crate::noise::{self, Furniture};
use crate::score::{Breakdown, Candidate, Rule};
use crate::Config;

/// Tags considered as article containers.
const CONTAINER_TAGS: &[&str] = &["div", "section", "article", "main"];

/// Tags counted as structural blocks.
const BLOCK_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "table", "li", "blockquote", "pre",
];

/// Composite cap for the domain content markers.
const MARKER_CAP: i32 = 40;

/// Cap for positive class/id keyword matches.
const POSITIVE_KEYWORD_CAP: i32 = 30;

/// A read-only view of a document with furniture subtrees excluded.
///
/// The document itself is never modified; every query walks around the
/// excluded subtree roots.
pub struct PrunedView<'a> {
    doc: &'a Document,
    excluded: HashMap<NodeId, Furniture>,
    roots: HashSet<NodeId>,
}

impl<'a> PrunedView<'a> {
    pub fn new(doc: &'a Document, config: &Config) -> Self {
        let mut view = Self {
            doc,
            excluded: HashMap::new(),
            roots: HashSet::new(),
        };

        // Structural furniture first, so the phrase checks below see the
        // text that is left once menus and footers are gone.
        let mut stack = vec![doc.root()];
        while let Some(id) = stack.pop() {
            let structural = !matches!(doc.tag(id), "html" | "body")
                && noise::is_structural(doc, id, config.matching);
            if structural {
                view.exclude(id, Furniture::Structural);
            } else {
                stack.extend(doc.children(id));
            }
        }

        let mut stack = vec![doc.root()];
        while let Some(id) = stack.pop() {
            if view.roots.contains(&id) {
                continue;
            }
            if !matches!(doc.tag(id), "html" | "body") {
                if let Some(kind) = view.content_furniture(id, config) {
                    view.exclude(id, kind);
                    continue;
                }
            }
            stack.extend(doc.children(id));
        }
        view
    }

    fn exclude(&mut self, id: NodeId, kind: Furniture) {
        trace!(tag = self.doc.tag(id), ?kind, "pruned");
        self.excluded.insert(id, kind);
        self.roots.insert(id);
    }

    fn content_furniture(&self, id: NodeId, config: &Config) -> Option<Furniture> {
        let text = self.text(id);
        if let Some(kind) = noise::text_kind(&text, config) {
            return Some(kind);
        }
        let (links, link_chars) = self.link_stats(id);
        noise::is_link_block(links, link_chars, text.chars().count())
            .then_some(Furniture::LinkDominated)
    }

    pub fn document(&self) -> &'a Document {
        self.doc
    }

    /// Why `id` was pruned, if it roots an excluded subtree.
    pub fn exclusion(&self, id: NodeId) -> Option<Furniture> {
        self.excluded.get(&id).copied()
    }

    /// Returns true if `id` lies inside an excluded subtree.
    pub fn is_excluded(&self, id: NodeId) -> bool {
        self.roots.contains(&id) || self.doc.ancestors(id).any(|a| self.roots.contains(&a))
    }

    /// Kept element descendants of `id` in document order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.doc.children(id).collect();
        stack.reverse();
        while let Some(n) = stack.pop() {
            if self.roots.contains(&n) {
                continue;
            }
            out.push(n);
            let mut kids: Vec<NodeId> = self.doc.children(n).collect();
            kids.reverse();
            stack.extend(kids);
        }
        out
    }

    pub fn text(&self, id: NodeId) -> String {
        self.doc.text_excluding(id, &self.roots)
    }

    fn link_stats(&self, id: NodeId) -> (usize, usize) {
        self.descendants(id)
            .into_iter()
            .filter(|&d| self.doc.tag(d) == "a")
            .fold((0, 0), |(n, chars), a| (n + 1, chars + self.doc.text_len(a)))
    }
}

/// Signals gathered for one article container.
pub(crate) struct ArticleSignals {
    matching: Matching,
    text_len: usize,
    class: String,
    id: String,
    role: String,
    dates: usize,
    document_phrases: usize,
    clauses: usize,
    metadata_labels: usize,
    attachments: usize,
    transitions: usize,
    blocks: usize,
    centered: bool,
    images: usize,
    lone_short_child: bool,
}

fn capped(count: usize, weight: i32, cap: i32) -> i32 {
    (count.min(cap as usize) as i32 * weight).min(cap)
}

fn distinct_hits(s: &ArticleSignals, set: &[&str]) -> i32 {
    let mut hits = keywords::attr_hits(&s.class, set, s.matching);
    for kw in keywords::attr_hits(&s.id, set, s.matching) {
        if !hits.contains(&kw) {
            hits.push(kw);
        }
    }
    hits.len() as i32
}

/// Weighted rules for article containers.
pub(crate) const ARTICLE_RULES: &[Rule<ArticleSignals>] = &[
    Rule {
        label: "semantic_role",
        score: |s| {
            if keywords::attr_any(&s.role, keywords::LIST_ROLES, s.matching) {
                25
            } else {
                0
            }
        },
    },
    Rule {
        label: "text_length",
        score: |s| match s.text_len {
            n if n < 50 => -10,
            n if n > 1000 => 30,
            n if n > 500 => 20,
            n if n > 200 => 15,
            _ => 5,
        },
    },
    Rule {
        label: "content_markers",
        score: |s| {
            (capped(s.dates, 4, 12)
                + capped(s.document_phrases, 3, 12)
                + capped(s.clauses, 3, 12)
                + capped(s.metadata_labels, 4, 12)
                + capped(s.attachments, 3, 9)
                + capped(s.transitions, 2, 8))
            .min(MARKER_CAP)
        },
    },
    Rule {
        label: "positive_keywords",
        score: |s| (10 * distinct_hits(s, keywords::ARTICLE_POSITIVE)).min(POSITIVE_KEYWORD_CAP),
    },
    Rule {
        label: "structure",
        score: |s| match s.blocks {
            n if n > 10 => 20,
            n if n > 5 => 15,
            n if n > 0 => 10,
            _ => 0,
        },
    },
    Rule {
        label: "centered",
        score: |s| if s.centered { 15 } else { 0 },
    },
    Rule {
        label: "images",
        score: |s| if s.images > 5 { 30 } else { 3 * s.images as i32 },
    },
    Rule {
        label: "negative_keywords",
        score: |s| -25 * distinct_hits(s, keywords::ARTICLE_NEGATIVE),
    },
    Rule {
        label: "lone_short_child",
        score: |s| if s.lone_short_child { -10 } else { 0 },
    },
];

fn gather(view: &PrunedView<'_>, node: NodeId, config: &Config) -> ArticleSignals {
    let doc = view.document();
    let text = view.text(node);
    let lower = text.to_lowercase();
    let text_len = text.chars().count();
    let descendants = view.descendants(node);

    let mut blocks = 0;
    let mut images = 0;
    let mut centered = false;
    let mut attachment_links = 0;
    for &d in &descendants {
        let style = doc.attr_or_empty(d, "style").to_ascii_lowercase();
        match doc.tag(d) {
            "img" => images += 1,
            "div" if style.contains("text-align") || style.contains("font-size") => {
                blocks += 1;
                centered |= style.replace(' ', "").contains("text-align:center");
            }
            "a" => {
                let href = doc.attr_or_empty(d, "href").to_ascii_lowercase();
                if keywords::ATTACHMENT_MARKERS
                    .iter()
                    .any(|m| m.starts_with('.') && href.ends_with(m))
                {
                    attachment_links += 1;
                }
            }
            tag if BLOCK_TAGS.contains(&tag) => blocks += 1,
            _ => {}
        }
    }
    let child_divs = doc.children(node).filter(|&c| doc.tag(c) == "div").count();

    ArticleSignals {
        matching: config.matching,
        text_len,
        class: doc.attr_or_empty(node, "class").to_string(),
        id: doc.attr_or_empty(node, "id").to_string(),
        role: doc.attr_or_empty(node, "role").to_string(),
        dates: keywords::PRECISE_DATE_RE.find_iter(&lower).count()
            + keywords::phrase_occurrences(&lower, keywords::DATE_LABELS),
        document_phrases: keywords::phrase_occurrences(&lower, keywords::DOCUMENT_PHRASES),
        clauses: keywords::CLAUSE_RE.find_iter(&text).count(),
        metadata_labels: keywords::distinct_phrases(&lower, keywords::METADATA_LABELS),
        attachments: keywords::phrase_occurrences(&lower, keywords::ATTACHMENT_MARKERS)
            + attachment_links,
        transitions: keywords::phrase_occurrences(&lower, keywords::TRANSITION_PHRASES),
        blocks,
        centered,
        images,
        lone_short_child: child_divs == 1 && text_len < 100,
    }
}

struct Scored {
    candidate: Candidate,
    text_len: usize,
    depth: usize,
}

fn score_all(view: &PrunedView<'_>, config: &Config) -> Vec<Scored> {
    let doc = view.document();
    view.descendants(doc.root())
        .into_iter()
        .filter(|&id| CONTAINER_TAGS.contains(&doc.tag(id)))
        .map(|id| {
            let signals = gather(view, id, config);
            let candidate = Candidate::new(
                id,
                signals.blocks,
                Breakdown::evaluate(ARTICLE_RULES, &signals),
            );
            trace!(
                tag = doc.tag(id),
                score = candidate.score,
                breakdown = %candidate.breakdown,
                "article candidate"
            );
            Scored {
                candidate,
                text_len: signals.text_len,
                depth: doc.depth(id),
            }
        })
        .collect()
}

/// Scores `node` as an article container against a freshly pruned view.
pub fn score_container(doc: &Document, node: NodeId, config: &Config) -> Breakdown {
    let view = PrunedView::new(doc, config);
    Breakdown::evaluate(ARTICLE_RULES, &gather(&view, node, config))
}

/// Scored containers that survive pruning, in document order.
pub fn candidates(doc: &Document, config: &Config) -> Vec<Candidate> {
    let view = PrunedView::new(doc, config);
    score_all(&view, config)
        .into_iter()
        .map(|s| s.candidate)
        .collect()
}

/// Finds the main-content container of a single-article page.
///
/// Falls back to `<body>` when no container survives pruning but the body
/// still has text; returns `None` only for a page with neither.
pub fn find_article_container(doc: &Document, config: &Config) -> Option<NodeId> {
    let view = PrunedView::new(doc, config);
    match best_scored(&view, config) {
        Some(chosen) => Some(chosen.node),
        None => doc.body().filter(|&b| !view.text(b).is_empty()),
    }
}

/// The winning article container with its score, without the `<body>`
/// fallback.
pub fn best_candidate(doc: &Document, config: &Config) -> Option<Candidate> {
    best_scored(&PrunedView::new(doc, config), config)
}

fn best_scored(view: &PrunedView<'_>, config: &Config) -> Option<Candidate> {
    let doc = view.document();
    let scored = score_all(view, config);
    if scored.is_empty() {
        return None;
    }
    let chosen = resolve(doc, &scored, config);
    debug!(
        tag = doc.tag(chosen.candidate.node),
        score = chosen.candidate.score,
        breakdown = %chosen.candidate.breakdown,
        "selected article container"
    );
    Some(chosen.candidate.clone())
}

/// Picks among the containers within `tie_window` of the best score.
fn resolve<'s>(doc: &Document, scored: &'s [Scored], config: &Config) -> &'s Scored {
    // First highest score in document order.
    let mut best = &scored[0];
    for s in &scored[1..] {
        if s.candidate.score > best.candidate.score {
            best = s;
        }
    }
    let near: Vec<&Scored> = scored
        .iter()
        .filter(|s| s.candidate.score >= best.candidate.score - config.tie_window)
        .collect();

    let related = near.iter().any(|a| {
        near.iter()
            .any(|b| doc.is_ancestor(a.candidate.node, b.candidate.node))
    });
    if !related {
        return deepest(near.iter().copied()).unwrap_or(best);
    }

    // Start from the outermost near-tied container around the best one.
    let mut current = near
        .iter()
        .copied()
        .filter(|s| {
            s.candidate.node == best.candidate.node
                || doc.is_ancestor(s.candidate.node, best.candidate.node)
        })
        .min_by_key(|s| s.depth)
        .unwrap_or(best);

    loop {
        let floor = current.text_len as f64 * config.specific_ratio;
        let specific = near.iter().copied().filter(|s| {
            doc.is_ancestor(current.candidate.node, s.candidate.node)
                && s.candidate.score >= config.specific_min_score
                && s.text_len as f64 >= floor
        });
        match deepest(specific) {
            Some(next) => current = next,
            None => return current,
        }
    }
}

/// Deepest entry; higher score, then document order, break ties.
fn deepest<'s>(it: impl Iterator<Item = &'s Scored>) -> Option<&'s Scored> {
    it.fold(None, |best: Option<&Scored>, s| match best {
        Some(b) if (b.depth, b.candidate.score) >= (s.depth, s.candidate.score) => Some(b),
        _ => Some(s),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn by_id(doc: &Document, value: &str) -> NodeId {
        doc.elements()
            .find(|&n| doc.attr(n, "id") == Some(value))
            .unwrap()
    }

    fn prose(chars: usize) -> String {
        "为进一步优化营商环境，提升政务服务效能，本机关结合实际制定本实施方案。"
            .chars()
            .cycle()
            .take(chars)
            .collect()
    }

    #[test]
    fn test_prune_excludes_structural_and_footer_text() {
        let doc = Document::parse(
            "<html><body><nav id=\"n\"><a>首页</a></nav>\
             <div id=\"f\"><p>版权所有 © 2025</p><p>网站标识码：123</p></div>\
             <div id=\"c\"><p>正文</p></div></body></html>",
        );
        let view = PrunedView::new(&doc, &Config::default());
        assert_eq!(view.exclusion(by_id(&doc, "n")), Some(Furniture::Structural));
        assert_eq!(view.exclusion(by_id(&doc, "f")), Some(Furniture::FooterContent));
        assert!(!view.is_excluded(by_id(&doc, "c")));
        assert_eq!(view.text(doc.body().unwrap()), "正文");
        // the document itself is untouched
        assert!(doc.text(doc.body().unwrap()).contains("首页"));
    }

    #[test]
    fn test_phrase_check_runs_on_pruned_text() {
        // The wrapper's raw text holds both login links, but they sit in a nav.
        let doc = Document::parse(
            "<html><body><div id=\"w\"><nav><a>登录</a> <a>注册</a></nav><p>正文内容</p></div></body></html>",
        );
        let view = PrunedView::new(&doc, &Config::default());
        assert!(!view.is_excluded(by_id(&doc, "w")));
    }

    #[test]
    fn test_link_dominated_block_is_pruned() {
        let doc = Document::parse(
            "<html><body><div id=\"links\"><a>政策文件</a> <a>解读回应</a> <a>数据发布</a></div>\
             <div id=\"c\"><p>正文</p></div></body></html>",
        );
        let view = PrunedView::new(&doc, &Config::default());
        assert_eq!(
            view.exclusion(by_id(&doc, "links")),
            Some(Furniture::LinkDominated)
        );
    }

    #[test]
    fn test_content_beats_footer() {
        let html = format!(
            "<html><body>\
             <footer><p>版权所有 © 2025 某某市人民政府</p><p>网站标识码：1234567890</p>\
             <p>主办单位：某某市人民政府办公室</p></footer>\
             <div class=\"content\" id=\"c\"><p>{}</p><img src=\"a.png\"><img src=\"b.png\"></div>\
             </body></html>",
            prose(600)
        );
        let doc = Document::parse(&html);
        assert_eq!(
            find_article_container(&doc, &Config::default()),
            Some(by_id(&doc, "c"))
        );
    }

    #[test]
    fn test_rules_fire_on_article_signals() {
        let html = format!(
            "<html><body><div id=\"c\" class=\"article-content\">\
             <p>发布时间：2025-03-01 索引号：001 发文机关：某某局</p>\
             <p>第一条 {}</p><p>第二条 特此通知。</p>\
             <p><a href=\"/files/plan.pdf\">附件：实施方案.pdf</a></p></div></body></html>",
            prose(300)
        );
        let doc = Document::parse(&html);
        let b = score_container(&doc, by_id(&doc, "c"), &Config::default());
        assert_eq!(b.get("text_length"), 15);
        assert_eq!(b.get("structure"), 10);
        // "article" and "content"
        assert_eq!(b.get("positive_keywords"), 20);
        assert!(b.get("content_markers") > 0);
        assert!(b.get("content_markers") <= MARKER_CAP);
    }

    #[test]
    fn test_centered_block_and_role() {
        let html = format!(
            "<html><body><div id=\"c\" role=\"feed\">\
             <div style=\"TEXT-ALIGN: center; font-size: 16px\">关于印发实施方案的通知</div>\
             <p>{}</p></div></body></html>",
            prose(120)
        );
        let doc = Document::parse(&html);
        let b = score_container(&doc, by_id(&doc, "c"), &Config::default());
        assert_eq!(b.get("centered"), 15);
        assert_eq!(b.get("semantic_role"), 25);
        // the styled div and the paragraph
        assert_eq!(b.get("structure"), 10);
    }

    #[test]
    fn test_image_rule_caps_at_thirty() {
        let page = |n: usize| {
            let imgs = "<img src=\"p.jpg\">".repeat(n);
            Document::parse(&format!(
                "<html><body><div id=\"g\"><p>{}</p>{imgs}</div></body></html>",
                prose(120)
            ))
        };
        for (n, points) in [(0, 0), (2, 6), (5, 15), (6, 30), (40, 30)] {
            let doc = page(n);
            let b = score_container(&doc, by_id(&doc, "g"), &Config::default());
            assert_eq!(b.get("images"), points, "{n} images");
        }
    }

    #[test]
    fn test_lone_short_child_penalty() {
        let doc = Document::parse(
            "<html><body><div id=\"w\"><div><p>简短说明</p></div></div>\
             <div id=\"two\"><div><p>简短</p></div><div><p>说明</p></div></div></body></html>",
        );
        let config = Config::default();
        assert_eq!(score_container(&doc, by_id(&doc, "w"), &config).get("lone_short_child"), -10);
        assert_eq!(score_container(&doc, by_id(&doc, "two"), &config).get("lone_short_child"), 0);

        let long = Document::parse(&format!(
            "<html><body><div id=\"w\"><div><p>{}</p></div></div></body></html>",
            prose(150)
        ));
        assert_eq!(score_container(&long, by_id(&long, "w"), &config).get("lone_short_child"), 0);
    }

    #[test]
    fn test_negative_keywords_penalize() {
        let doc = Document::parse(&format!(
            "<html><body><div id=\"r\" class=\"related share\"><p>{}</p></div></body></html>",
            prose(120)
        ));
        let b = score_container(&doc, by_id(&doc, "r"), &Config::default());
        assert_eq!(b.get("negative_keywords"), -50);
    }

    #[test]
    fn test_prefers_specific_descendant() {
        let html = format!(
            "<html><body><div id=\"outer\"><div id=\"inner\" class=\"content\"><p>{}</p><p>{}</p></div>\
             <p>来源</p></div></body></html>",
            prose(400),
            prose(400)
        );
        let doc = Document::parse(&html);
        assert_eq!(
            find_article_container(&doc, &Config::default()),
            Some(by_id(&doc, "inner"))
        );
    }

    #[test]
    fn test_underfilled_descendant_keeps_ancestor() {
        // The inner block is a small part of the outer text.
        let html = format!(
            "<html><body><div id=\"outer\" class=\"content\"><p>{}</p><p>{}</p>\
             <div id=\"inner\" class=\"text\"><p>{}</p></div></div></body></html>",
            prose(500),
            prose(500),
            prose(210)
        );
        let doc = Document::parse(&html);
        assert_eq!(
            find_article_container(&doc, &Config::default()),
            Some(by_id(&doc, "outer"))
        );
    }

    #[test]
    fn test_unrelated_near_ties_prefer_deepest() {
        let html = format!(
            "<html><body><div id=\"a\"><p>{}</p></div>\
             <span><div id=\"b\"><p>{}</p></div></span></body></html>",
            prose(300),
            prose(300)
        );
        let doc = Document::parse(&html);
        assert_eq!(
            find_article_container(&doc, &Config::default()),
            Some(by_id(&doc, "b"))
        );
    }

    #[test]
    fn test_empty_document() {
        let doc = Document::parse("<html><body></body></html>");
        assert_eq!(find_article_container(&doc, &Config::default()), None);
    }

    #[test]
    fn test_body_fallback_without_containers() {
        let doc = Document::parse("<html><body><p>仅有一段文字</p></body></html>");
        assert_eq!(find_article_container(&doc, &Config::default()), doc.body());
    }
}

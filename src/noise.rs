// Page-furniture detection shared by both search strategies.

use ego_tree::NodeId;

use crate::document::Document;
use crate::keywords::{self, Matching};
use crate::Config;

/// Containers with less text than this can be link-dominated menus.
const LINK_BLOCK_MAX_CHARS: usize = 300;

/// Share of the text that must sit inside links for a link-dominated block.
const LINK_BLOCK_RATIO: f64 = 0.8;

/// Why a node counts as furniture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Furniture {
    /// Tag name or class/id/role keyword.
    Structural,
    /// Login bars, accessibility switches and similar header text.
    HeaderContent,
    /// Copyright, site id and sponsor lines.
    FooterContent,
    /// Short block whose text is mostly links.
    LinkDominated,
}

/// Furniture keywords found in the `class`, `id` and `role` of `id`.
pub fn furniture_hits(doc: &Document, id: NodeId, mode: Matching) -> Vec<&'static str> {
    let mut hits = Vec::new();
    for attr in ["class", "id", "role"] {
        for kw in keywords::attr_hits(doc.attr_or_empty(id, attr), keywords::FURNITURE, mode) {
            if !hits.contains(&kw) {
                hits.push(kw);
            }
        }
    }
    hits
}

/// Tag is `header`/`footer`/`nav`/`aside`, or class/id/role carries a furniture keyword.
pub fn is_structural(doc: &Document, id: NodeId, mode: Matching) -> bool {
    keywords::FURNITURE_TAGS.contains(&doc.tag(id)) || !furniture_hits(doc, id, mode).is_empty()
}

/// Text carries at least two distinct header phrases or two distinct footer
/// phrases.
///
/// Only nodes with at most `config.content_check_max_chars` characters are
/// checked, so a page wrapper holding both the header and the article is
/// never classified by its header text.
pub fn content_kind(doc: &Document, id: NodeId, config: &Config) -> Option<Furniture> {
    if matches!(doc.tag(id), "html" | "body") {
        return None;
    }
    text_kind(&doc.text(id), config)
}

/// [`content_kind`] over already extracted text.
pub fn text_kind(text: &str, config: &Config) -> Option<Furniture> {
    if text.is_empty() || text.chars().count() > config.content_check_max_chars {
        return None;
    }
    if keywords::distinct_phrases(text, keywords::FOOTER_CONTENT) >= 2 {
        Some(Furniture::FooterContent)
    } else if keywords::distinct_phrases(text, keywords::HEADER_CONTENT) >= 2 {
        Some(Furniture::HeaderContent)
    } else {
        None
    }
}

/// Short block with at least three links covering most of its text.
pub fn is_link_dominated(doc: &Document, id: NodeId) -> bool {
    let (links, link_chars) = doc.link_stats(id);
    is_link_block(links, link_chars, doc.text_len(id))
}

/// [`is_link_dominated`] over precomputed counts.
pub fn is_link_block(links: usize, link_chars: usize, text_len: usize) -> bool {
    if links < 3 || text_len >= LINK_BLOCK_MAX_CHARS {
        return false;
    }
    text_len == 0 || link_chars as f64 >= text_len as f64 * LINK_BLOCK_RATIO
}

/// Penalty inherited from furniture ancestors, larger for closer ancestors.
///
/// Walks at most `config.ancestor_depth` levels and stops at `<body>`. The
/// node's own header/footer text also counts; its own class/id is left to
/// the caller's scoring rules.
pub fn ancestor_penalty(doc: &Document, id: NodeId, config: &Config) -> i32 {
    let mut penalty = 0;
    if content_kind(doc, id, config).is_some() {
        penalty += 20;
    }
    for (level, ancestor) in (1..).zip(doc.ancestors(id).take(config.ancestor_depth)) {
        if matches!(doc.tag(ancestor), "body" | "html") {
            break;
        }
        if is_structural(doc, ancestor, config.matching) {
            penalty += (35 - 5 * level).max(10);
        }
        if level <= 2 && content_kind(doc, ancestor, config).is_some() {
            penalty += 15;
        }
    }
    penalty
}

/// Returns true if `id` or one of its nearest `depth` ancestors is furniture.
///
/// `<body>` and `<html>` are never contaminating.
pub fn has_furniture_ancestor(doc: &Document, id: NodeId, depth: usize, mode: Matching) -> bool {
    std::iter::once(id)
        .chain(doc.ancestors(id))
        .take(depth + 1)
        .take_while(|&n| !matches!(doc.tag(n), "body" | "html"))
        .any(|n| {
            keywords::FURNITURE_TAGS.contains(&doc.tag(n))
                || ["class", "id"].iter().any(|attr| {
                    keywords::attr_any(doc.attr_or_empty(n, attr), keywords::ANCESTOR_NEGATIVE, mode)
                        || keywords::attr_matches(doc.attr_or_empty(n, attr), "footer", mode)
                })
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

    #[test]
    fn test_structural_by_tag_and_keyword() {
        let doc = Document::parse(
            "<html><body><nav id=\"a\">x</nav><div id=\"b\" class=\"site-header\">y</div>\
             <div id=\"c\" class=\"canvas\">z</div></body></html>",
        );
        let m = Matching::WordBoundary;
        assert!(is_structural(&doc, by_id(&doc, "a"), m));
        assert!(is_structural(&doc, by_id(&doc, "b"), m));
        assert!(!is_structural(&doc, by_id(&doc, "c"), m));
        assert!(is_structural(&doc, by_id(&doc, "c"), Matching::Substring));
    }

    #[test]
    fn test_role_counts_as_structural() {
        let doc = Document::parse("<html><body><div id=\"r\" role=\"navigation\">x</div></body></html>");
        assert_eq!(
            furniture_hits(&doc, by_id(&doc, "r"), Matching::WordBoundary),
            vec!["navigation"]
        );
    }

    #[test]
    fn test_footer_content() {
        let doc = Document::parse(
            "<html><body><div id=\"f\"><p>版权所有 © 2025 某某政府网站</p>\
             <p>网站标识码：1234567890</p></div></body></html>",
        );
        assert_eq!(
            content_kind(&doc, by_id(&doc, "f"), &Config::default()),
            Some(Furniture::FooterContent)
        );
    }

    #[test]
    fn test_single_phrase_is_not_furniture() {
        let doc = Document::parse(
            "<html><body><div id=\"f\"><p>本页面首页已更新</p></div></body></html>",
        );
        assert_eq!(content_kind(&doc, by_id(&doc, "f"), &Config::default()), None);
    }

    #[test]
    fn test_long_text_skips_content_check() {
        let prose = "正文内容".repeat(200);
        let html = format!(
            "<html><body><div id=\"w\"><p>登录 注册</p><p>{prose}</p></div></body></html>"
        );
        let doc = Document::parse(&html);
        assert_eq!(content_kind(&doc, by_id(&doc, "w"), &Config::default()), None);
    }

    #[test]
    fn test_link_dominated() {
        let doc = Document::parse(
            "<html><body><div id=\"m\"><a>首页</a> <a>政务公开</a> <a>办事服务</a> <a>互动交流</a></div>\
             <div id=\"p\"><a>one</a><a>two</a><a>three</a> and a long sentence of ordinary prose here</div>\
             </body></html>",
        );
        assert!(is_link_dominated(&doc, by_id(&doc, "m")));
        assert!(!is_link_dominated(&doc, by_id(&doc, "p")));
    }

    #[test]
    fn test_ancestor_penalty_decreases_with_distance() {
        let doc = Document::parse(
            "<html><body><nav><ul id=\"near\"><li>a</li></ul><div><div><ul id=\"far\"><li>b</li></ul></div></div></nav>\
             <div id=\"clean\"><ul id=\"ok\"><li>c</li></ul></div></body></html>",
        );
        let config = Config::default();
        let near = ancestor_penalty(&doc, by_id(&doc, "near"), &config);
        let far = ancestor_penalty(&doc, by_id(&doc, "far"), &config);
        assert_eq!(near, 30);
        assert_eq!(far, 20);
        assert_eq!(ancestor_penalty(&doc, by_id(&doc, "ok"), &config), 0);
    }

    #[test]
    fn test_has_furniture_ancestor() {
        let doc = Document::parse(
            "<html><body class=\"header-fixed\"><div class=\"menu-box\"><ul id=\"m\"><li>a</li></ul></div>\
             <div><ul id=\"c\"><li>b</li></ul></div></body></html>",
        );
        let m = Matching::WordBoundary;
        assert!(has_furniture_ancestor(&doc, by_id(&doc, "m"), 8, m));
        // body class is ignored
        assert!(!has_furniture_ancestor(&doc, by_id(&doc, "c"), 8, m));
    }

    #[test]
    fn test_body_is_never_content_furniture() {
        let doc = Document::parse("<html><body><p>版权所有 网站标识码</p></body></html>");
        let body = doc.body().unwrap();
        assert_eq!(content_kind(&doc, body, &Config::default()), None);
        assert_eq!(
            text_kind(&doc.text(body), &Config::default()),
            Some(Furniture::FooterContent)
        );
    }

    #[test]
    fn test_aside_tag_is_structural() {
        let doc = Document::parse("<html><body><aside id=\"s\"><p>x</p></aside></body></html>");
        assert!(is_structural(&doc, by_id(&doc, "s"), Matching::WordBoundary));
    }
}

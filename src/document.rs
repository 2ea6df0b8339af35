// Arena-backed view over one parsed HTML document.

use std::collections::HashSet;

use ego_tree::{NodeId, NodeRef};
use scraper::node::Node;
use scraper::{ElementRef, Html};

/// Tags whose text never counts as page content.
const SKIP_TEXT_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// An immutable parsed HTML document.
///
/// The `Html` arena owns every node; everything else in the crate refers to
/// nodes by [`NodeId`], so candidates never hold borrows into the tree.
pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }

    /// The `<html>` element.
    pub fn root(&self) -> NodeId {
        self.html.root_element().id()
    }

    /// The `<body>` element, if the parser produced one.
    pub fn body(&self) -> Option<NodeId> {
        self.children(self.root()).find(|&id| self.tag(id) == "body")
    }

    pub fn element(&self, id: NodeId) -> Option<ElementRef<'_>> {
        self.html.tree.get(id).and_then(ElementRef::wrap)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn is_root(&self, id: NodeId) -> bool {
        id == self.root()
    }

    /// Lowercase tag name, or `""` for ids that are not elements.
    pub fn tag(&self, id: NodeId) -> &str {
        self.element(id).map_or("", |el| el.value().name())
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|el| el.value().attr(name))
    }

    /// Attribute value, trimmed, or `""` when absent.
    pub fn attr_or_empty(&self, id: NodeId, name: &str) -> &str {
        self.attr(id, name).map_or("", str::trim)
    }

    /// Parent element. `None` for the root element and for detached ids.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        let node = self.html.tree.get(id)?;
        node.parent()
            .filter(|p| p.value().is_element())
            .map(|p| p.id())
    }

    /// Element ancestors, nearest first, ending at the root element.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    /// Element children in document order.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.html
            .tree
            .get(id)
            .into_iter()
            .flat_map(|n| n.children())
            .filter(|c| c.value().is_element())
            .map(|c| c.id())
    }

    /// Element descendants in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.html
            .tree
            .get(id)
            .into_iter()
            .flat_map(|n| n.descendants().skip(1))
            .filter(|c| c.value().is_element())
            .map(|c| c.id())
    }

    /// Every element of the document in document order, root included.
    pub fn elements(&self) -> impl Iterator<Item = NodeId> + '_ {
        let root = self.root();
        std::iter::once(root).chain(self.descendants(root))
    }

    /// Number of element ancestors between `id` and the document node.
    pub fn depth(&self, id: NodeId) -> usize {
        self.ancestors(id).count()
    }

    /// Returns true if `ancestor` is a strict ancestor of `node`.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|a| a == ancestor)
    }

    /// 1-based position of `id` among preceding siblings with the same tag.
    pub fn same_tag_ordinal(&self, id: NodeId) -> usize {
        let tag = self.tag(id);
        let Some(node) = self.html.tree.get(id) else {
            return 1;
        };
        1 + node
            .prev_siblings()
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().name() == tag)
            .count()
    }

    /// Concatenated descendant text with whitespace runs collapsed and trimmed.
    ///
    /// Script and style content is not text.
    pub fn text(&self, id: NodeId) -> String {
        self.text_excluding(id, &HashSet::new())
    }

    /// The element's first direct text child, or `""`. This is what
    /// `text()` yields inside an XPath `contains()`.
    pub fn first_text(&self, id: NodeId) -> &str {
        self.html
            .tree
            .get(id)
            .and_then(|n| {
                n.children().find_map(|c| match c.value() {
                    Node::Text(text) => Some(&*text.text),
                    _ => None,
                })
            })
            .unwrap_or("")
    }

    /// [`Document::text`] without the subtrees rooted at `excluded`.
    pub fn text_excluding(&self, id: NodeId, excluded: &HashSet<NodeId>) -> String {
        let mut raw = String::new();
        if let Some(node) = self.html.tree.get(id) {
            collect_text(node, excluded, &mut raw);
        }
        normalize_whitespace(&raw)
    }

    /// Character count of [`Document::text`].
    pub fn text_len(&self, id: NodeId) -> usize {
        self.text(id).chars().count()
    }

    /// Count of descendant elements whose tag is one of `tags`.
    pub fn count_tags(&self, id: NodeId, tags: &[&str]) -> usize {
        self.descendants(id)
            .filter(|&d| tags.contains(&self.tag(d)))
            .count()
    }

    /// Number of `<a>` descendants and the character count of their text.
    pub fn link_stats(&self, id: NodeId) -> (usize, usize) {
        self.descendants(id)
            .filter(|&d| self.tag(d) == "a")
            .fold((0, 0), |(n, chars), a| (n + 1, chars + self.text_len(a)))
    }

    /// Whitespace-separated tokens of the `class` attribute.
    pub fn class_tokens(&self, id: NodeId) -> Vec<&str> {
        self.attr(id, "class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }
}

fn collect_text(node: NodeRef<'_, Node>, excluded: &HashSet<NodeId>, out: &mut String) {
    let mut stack: Vec<NodeRef<'_, Node>> = node.children().rev().collect();
    while let Some(child) = stack.pop() {
        match child.value() {
            Node::Text(text) => out.push_str(&text.text),
            Node::Element(el) if SKIP_TEXT_TAGS.contains(&el.name()) => {}
            Node::Element(_) if excluded.contains(&child.id()) => {}
            Node::Element(_) => stack.extend(child.children().rev()),
            _ => {}
        }
    }
}

/// Collapses every whitespace run (no-break spaces included) to one space and
/// trims both ends.
pub(crate) fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(doc: &Document, tag: &str) -> NodeId {
        doc.elements()
            .find(|&id| doc.tag(id) == tag)
            .unwrap_or_else(|| panic!("no <{tag}> in fixture"))
    }

    #[test]
    fn test_root_and_body() {
        let doc = Document::parse("<html><body><p>x</p></body></html>");
        assert_eq!(doc.tag(doc.root()), "html");
        let body = doc.body().unwrap();
        assert_eq!(doc.tag(body), "body");
        assert_eq!(doc.parent(body), Some(doc.root()));
        assert_eq!(doc.parent(doc.root()), None);
    }

    #[test]
    fn test_text_skips_script_and_style() {
        let doc = Document::parse(
            "<html><body><div><script>var x = 1;</script><style>p{}</style>\
             <p>Hello</p> <p>world</p></div></body></html>",
        );
        let div = find(&doc, "div");
        assert_eq!(doc.text(div), "Hello world");
        assert_eq!(doc.text_len(div), 11);
    }

    #[test]
    fn test_text_excluding_subtrees() {
        let doc = Document::parse(
            "<html><body><div><nav>menu</nav><p>body text</p></div></body></html>",
        );
        let div = find(&doc, "div");
        let nav = find(&doc, "nav");
        assert_eq!(doc.text(div), "menubody text");
        assert_eq!(doc.text_excluding(div, &HashSet::from([nav])), "body text");
    }

    #[test]
    fn test_text_of_deeply_nested_markup() {
        let html = format!("<html><body>{}deep</body></html>", "<span>".repeat(20_000));
        let doc = Document::parse(&html);
        let body = doc.body().unwrap();
        assert_eq!(doc.text(body), "deep");
        assert_eq!(doc.text_len(body), 4);
    }

    #[test]
    fn test_text_counts_chars_not_bytes() {
        let doc = Document::parse("<html><body><p>发布时间</p></body></html>");
        let p = find(&doc, "p");
        assert_eq!(doc.text_len(p), 4);
    }

    #[test]
    fn test_same_tag_ordinal() {
        let doc = Document::parse(
            "<html><body><div>a</div><p>b</p><div>c</div><div id=\"x\">d</div></body></html>",
        );
        let x = doc.elements().find(|&id| doc.attr(id, "id") == Some("x")).unwrap();
        // Preceding <p> is ignored; two <div> siblings precede.
        assert_eq!(doc.same_tag_ordinal(x), 3);
        let p = find(&doc, "p");
        assert_eq!(doc.same_tag_ordinal(p), 1);
    }

    #[test]
    fn test_ancestry() {
        let doc = Document::parse("<html><body><div><ul><li>a</li></ul></div></body></html>");
        let li = find(&doc, "li");
        let div = find(&doc, "div");
        let tags: Vec<&str> = doc.ancestors(li).map(|a| doc.tag(a)).collect();
        assert_eq!(tags, vec!["ul", "div", "body", "html"]);
        assert!(doc.is_ancestor(div, li));
        assert!(!doc.is_ancestor(li, div));
        assert_eq!(doc.depth(li), 4);
    }

    #[test]
    fn test_link_stats() {
        let doc = Document::parse(
            "<html><body><div><a>Home</a> text <a>About us</a></div></body></html>",
        );
        let div = find(&doc, "div");
        assert_eq!(doc.link_stats(div), (2, 12));
    }

    #[test]
    fn test_class_tokens() {
        let doc = Document::parse("<html><body><div class=\"  a  bb\tccc \">x</div></body></html>");
        let div = find(&doc, "div");
        assert_eq!(doc.class_tokens(div), vec!["a", "bb", "ccc"]);
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a \n\t b\u{00A0}c  "), "a b c");
        assert_eq!(normalize_whitespace(""), "");
    }
}

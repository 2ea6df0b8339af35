//! Finding a tab by its visible label.
//!
//! Listing pages often hide the wanted list behind a tab (`政策文件>省级文件`).
//! [`find_tab`] looks the label up with a fixed sequence of lookups and
//! returns the first hit of the first lookup that finds anything.

use ego_tree::NodeId;
use tracing::trace;

use crate::document::{normalize_whitespace, Document};

/// One way of finding a tab, from most to least specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabLookup {
    /// Inside `<body>`, own text contains the label; scripts skipped.
    BodyText,
    /// Whole text equals the label.
    ExactText,
    /// Own text contains the label, anywhere in the document.
    AnyText,
    /// An `<a>` whose whole text equals the label.
    Link,
    /// A `<button>` whose whole text equals the label.
    Button,
    /// `title` attribute equals the label.
    Title,
    /// `data-name` attribute equals the label.
    DataName,
}

impl TabLookup {
    pub const ORDER: [TabLookup; 7] = [
        TabLookup::BodyText,
        TabLookup::ExactText,
        TabLookup::AnyText,
        TabLookup::Link,
        TabLookup::Button,
        TabLookup::Title,
        TabLookup::DataName,
    ];

    fn matches(self, doc: &Document, id: NodeId, label: &str) -> bool {
        match self {
            TabLookup::BodyText => {
                doc.tag(id) != "script"
                    && doc.first_text(id).contains(label)
                    && doc.body().is_some_and(|b| doc.is_ancestor(b, id))
            }
            TabLookup::ExactText => whole_text_is(doc, id, label),
            TabLookup::AnyText => doc.first_text(id).contains(label),
            TabLookup::Link => doc.tag(id) == "a" && whole_text_is(doc, id, label),
            TabLookup::Button => doc.tag(id) == "button" && whole_text_is(doc, id, label),
            TabLookup::Title => doc.attr(id, "title") == Some(label),
            TabLookup::DataName => doc.attr(id, "data-name") == Some(label),
        }
    }
}

fn whole_text_is(doc: &Document, id: NodeId, label: &str) -> bool {
    normalize_whitespace(&doc.text(id)) == label
}

/// Finds the element to click for the tab labelled `label`.
pub fn find_tab(doc: &Document, label: &str) -> Option<NodeId> {
    let label = label.trim();
    if label.is_empty() {
        return None;
    }
    TabLookup::ORDER.iter().find_map(|&lookup| {
        let hit = doc.elements().find(|&id| lookup.matches(doc, id, label))?;
        trace!(?lookup, label, tag = doc.tag(hit), "tab found");
        Some(hit)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn marked(doc: &Document, marker: &str) -> NodeId {
        doc.elements()
            .find(|&n| doc.attr(n, "data-t") == Some(marker))
            .unwrap()
    }

    #[test]
    fn test_own_text_in_body_first() {
        let doc = Document::parse(
            "<html><head><title>政策文件</title></head><body>\
             <script>var tab = '政策文件';</script>\
             <ul><li><a data-t=\"t\">政策文件</a></li><li><a>通知公告</a></li></ul>\
             </body></html>",
        );
        assert_eq!(find_tab(&doc, "政策文件"), Some(marked(&doc, "t")));
    }

    #[test]
    fn test_exact_text_spanning_children() {
        // no single text node holds the label
        let doc = Document::parse(
            "<html><body><div><span data-t=\"t\"><b>省级</b><i>文件</i></span></div></body></html>",
        );
        let hit = find_tab(&doc, "省级文件").unwrap();
        // the outermost element whose whole text is the label comes first
        assert_eq!(doc.tag(hit), "html");
        assert!(doc.is_ancestor(hit, marked(&doc, "t")));
    }

    #[test]
    fn test_attribute_lookups() {
        let doc = Document::parse(
            "<html><body><p>其他</p><a title=\"政策解读\" data-t=\"t\"><img src=\"i.png\"></a>\
             <span data-name=\"图片新闻\" data-t=\"u\"></span></body></html>",
        );
        assert_eq!(find_tab(&doc, "政策解读"), Some(marked(&doc, "t")));
        assert_eq!(find_tab(&doc, "图片新闻"), Some(marked(&doc, "u")));
    }

    #[test]
    fn test_label_is_trimmed_and_missing_tabs_are_none() {
        let doc = Document::parse("<html><body><a data-t=\"t\">通知公告</a></body></html>");
        assert_eq!(find_tab(&doc, "  通知公告 "), Some(marked(&doc, "t")));
        assert_eq!(find_tab(&doc, "人事信息"), None);
        assert_eq!(find_tab(&doc, " "), None);
    }
}

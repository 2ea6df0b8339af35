// Region validation: does a locator still select a list-like container?

use std::fmt;

use ego_tree::NodeId;

use crate::document::Document;
use crate::keywords::{self, Matching};
use crate::locator::Locator;
use crate::Config;

/// Outcome of validating one locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub valid: bool,
    pub message: String,
}

impl Validation {
    fn fail(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
        }
    }
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.valid { "valid" } else { "invalid" };
        write!(f, "{verdict}: {}", self.message)
    }
}

/// Descendants counted as list items: `li`, `tr`, `article`, and `div`s whose
/// class matches `item` under `mode`.
pub fn count_list_items(doc: &Document, container: NodeId, mode: Matching) -> usize {
    doc.descendants(container)
        .filter(|&d| is_list_item(doc, d, mode))
        .count()
}

/// The item test shared with the list search.
pub(crate) fn is_list_item(doc: &Document, id: NodeId, mode: Matching) -> bool {
    match doc.tag(id) {
        "li" | "tr" | "article" => true,
        "div" => keywords::attr_matches(doc.attr_or_empty(id, "class"), "item", mode),
        _ => false,
    }
}

/// Evaluates `locator` and checks that its first match holds at least
/// `config.min_items` list items.
///
/// Malformed locators are reported in the message, never returned as errors.
pub fn validate_locator(locator: &str, doc: &Document, config: &Config) -> Validation {
    let min_items = config.min_items;
    let parsed = match locator.parse::<Locator>() {
        Ok(parsed) => parsed,
        Err(err) => return Validation::fail(format!("locator evaluation error: {err}")),
    };
    let Some(&first) = parsed.evaluate(doc).first() else {
        return Validation::fail("no element matched");
    };
    let count = count_list_items(doc, first, config.matching);
    if count >= min_items {
        Validation {
            valid: true,
            message: format!("found {count} list items"),
        }
    } else {
        Validation::fail(format!(
            "found only {count} list items (at least {min_items} required)"
        ))
    }
}

/// Parses `html` freshly and validates against it.
pub fn validate_html(locator: &str, html: &str, config: &Config) -> Validation {
    validate_locator(locator, &Document::parse(html), config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config() -> Config {
        Config::default()
    }

    const PAGE: &str = "<html><body>\
        <ul id=\"news\"><li>a</li><li>b</li><li>c</li></ul>\
        <ul id=\"short\"><li>a</li><li>b</li></ul>\
        <div id=\"cards\"><div class=\"item big\">1</div><div class=\"item\">2</div>\
          <div class=\"items\">3</div><div class=\"item\">4</div></div>\
        </body></html>";

    #[test]
    fn test_valid_list() {
        let v = validate_html("//ul[@id='news']", PAGE, &config());
        assert!(v.valid);
        assert_eq!(v.message, "found 3 list items");
    }

    #[test]
    fn test_too_few_items() {
        let v = validate_html("//ul[@id='short']", PAGE, &config());
        assert!(!v.valid);
        assert_eq!(v.message, "found only 2 list items (at least 3 required)");
    }

    #[test]
    fn test_item_class_must_be_whole_token() {
        let doc = Document::parse(PAGE);
        let cards = doc
            .elements()
            .find(|&n| doc.attr(n, "id") == Some("cards"))
            .unwrap();
        assert_eq!(count_list_items(&doc, cards, Matching::WordBoundary), 3);
        assert_eq!(count_list_items(&doc, cards, Matching::Substring), 4);
    }

    #[test]
    fn test_hyphenated_item_classes_count() {
        let items: String = (1..=6)
            .map(|n| format!("<div class=\"news-item\"><a href=\"/n/{n}\">通知{n}</a></div>"))
            .collect();
        let html = format!("<html><body><div id=\"list\">{items}</div></body></html>");
        let v = validate_html("//div[@id='list']", &html, &config());
        assert!(v.valid, "{v}");
        assert_eq!(v.message, "found 6 list items");
    }

    #[test]
    fn test_no_match() {
        let v = validate_html("//div[@id='missing']", PAGE, &config());
        assert_eq!(v, Validation::fail("no element matched"));
    }

    #[test]
    fn test_malformed_locator_is_reported() {
        let v = validate_html("//div[@id=", PAGE, &config());
        assert!(!v.valid);
        assert!(v.message.starts_with("locator evaluation error"));
    }

    #[test]
    fn test_first_match_is_used() {
        // //ul selects both lists; the first has three items.
        assert!(validate_html("//ul", PAGE, &config()).valid);
    }
}

// Work items in, locator results out.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::RecordError;
use crate::validate::Validation;

static ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"name:\s*(.*?)\s*url:\s*(https?://\S+)").unwrap());

/// One page to locate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub name: String,
    pub url: String,
}

impl WorkItem {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// Names ending in `js` mark pages that need a rendering fetch.
    pub fn needs_rendering(&self) -> bool {
        self.name.ends_with("js")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Failed,
    FetchFailed,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::Failed => "failed",
            Status::FetchFailed => "fetch_failed",
        }
    }
}

/// Outcome for one [`WorkItem`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorResult {
    pub name: String,
    pub url: String,
    pub locator: Option<String>,
    pub status: Status,
    /// Locators of the tabs clicked before the page was captured.
    pub click_path: Option<Vec<String>>,
    /// Validation of the returned locator, when one was produced.
    pub validation: Option<Validation>,
}

impl LocatorResult {
    pub fn fetch_failed(item: &WorkItem) -> Self {
        Self {
            name: item.name.clone(),
            url: item.url.clone(),
            locator: None,
            status: Status::FetchFailed,
            click_path: None,
            validation: None,
        }
    }
}

/// Extracts every `name: ... url: http(s)://...` pair from `input`, in order.
pub fn parse_work_items(input: &str) -> Vec<WorkItem> {
    ITEM_RE
        .captures_iter(input)
        .map(|caps| WorkItem::new(&caps[1], &caps[2]))
        .collect()
}

pub fn read_work_items(path: impl AsRef<Path>) -> Result<Vec<WorkItem>, RecordError> {
    Ok(parse_work_items(&fs::read_to_string(path)?))
}

fn quoted(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n");
    format!("\"{escaped}\"")
}

/// Writes one `---`-led block per result.
pub fn write_results<W: Write>(out: &mut W, results: &[LocatorResult]) -> Result<(), RecordError> {
    for r in results {
        writeln!(out, "---")?;
        writeln!(out, "name: {}", r.name)?;
        writeln!(out, "url: {}", r.url)?;
        writeln!(out, "xpath: {}", quoted(r.locator.as_deref().unwrap_or("")))?;
        match r.click_path.as_deref() {
            Some(path) if !path.is_empty() => {
                writeln!(out, "xpathList4Click:")?;
                for locator in path {
                    writeln!(out, "  - {}", quoted(locator))?;
                }
            }
            _ => writeln!(out, "xpathList4Click: []")?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_blocks() {
        let input = "---\nname: 通知公告\nurl: https://www.example.gov.cn/tzgg/\n---\n\
                     name:   政策文件>省级文件js\n  url: http://example.gov.cn/zcwj/index.html\n\
                     name: 无效\nurl: ftp://example.gov.cn/\n";
        let items = parse_work_items(input);
        assert_eq!(
            items,
            vec![
                WorkItem::new("通知公告", "https://www.example.gov.cn/tzgg/"),
                WorkItem::new("政策文件>省级文件js", "http://example.gov.cn/zcwj/index.html"),
            ]
        );
        assert!(!items[0].needs_rendering());
        assert!(items[1].needs_rendering());
    }

    #[test]
    fn test_write_results() {
        let results = vec![
            LocatorResult {
                name: "通知公告".into(),
                url: "https://a.gov.cn/".into(),
                locator: Some("//div[@id='list']".into()),
                status: Status::Success,
                click_path: None,
                validation: None,
            },
            LocatorResult {
                name: "政策js".into(),
                url: "https://b.gov.cn/".into(),
                locator: None,
                status: Status::Failed,
                click_path: Some(vec!["//a[@title=\"政策\"]".into()]),
                validation: None,
            },
        ];
        let mut out = Vec::new();
        write_results(&mut out, &results).unwrap();
        let expected = "---\nname: 通知公告\nurl: https://a.gov.cn/\nxpath: \"//div[@id='list']\"\n\
                        xpathList4Click: []\n\
                        ---\nname: 政策js\nurl: https://b.gov.cn/\nxpath: \"\"\n\
                        xpathList4Click:\n  - \"//a[@title=\\\"政策\\\"]\"\n";
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn test_written_output_parses_back() {
        let results = vec![LocatorResult::fetch_failed(&WorkItem::new(
            "办事指南",
            "https://c.gov.cn/bszn/",
        ))];
        let mut out = Vec::new();
        write_results(&mut out, &results).unwrap();
        let items = parse_work_items(&String::from_utf8(out).unwrap());
        assert_eq!(items, vec![WorkItem::new("办事指南", "https://c.gov.cn/bszn/")]);
    }
}

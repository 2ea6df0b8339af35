//! Keyword sets used by the classifiers and scoring rules.
//!
//! Attribute keyword sets are lowercase ASCII and are matched against
//! `class`/`id`/`role` values with [`attr_matches`]. Text keyword sets are
//! matched as plain substrings of lowercased text.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

/// How attribute keywords are matched against `class`/`id`/`role` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Matching {
    /// The keyword must equal a whole `-`/`_`/space separated part of the
    /// value, ignoring a trailing number (`nav2`). `content-nav-related`
    /// matches `nav` but `canvas` does not.
    #[default]
    WordBoundary,
    /// Plain substring test.
    Substring,
}

/// Class/id/role words that mark page furniture.
pub const FURNITURE: &[&str] = &[
    "header",
    "footer",
    "foot",
    "nav",
    "navbar",
    "navigation",
    "menu",
    "menubar",
    "topbar",
    "bottom",
    "sidebar",
    "aside",
    "banner",
    "breadcrumb",
    "toolbar",
    "copyright",
    "sitemap",
];

/// Tags that are furniture by themselves.
pub const FURNITURE_TAGS: &[&str] = &["header", "footer", "nav", "aside"];

/// Header-area phrases (login bars, accessibility toggles, site switchers).
pub const HEADER_CONTENT: &[&str] = &[
    "登录",
    "注册",
    "首页",
    "无障碍",
    "长者模式",
    "关怀版",
    "繁體",
    "简体",
    "移动版",
    "手机版",
    "个人中心",
    "用户中心",
    "设为首页",
    "加入收藏",
    "login",
    "register",
    "sign in",
    "accessibility",
];

/// Footer-area phrases (copyright, site registration, sponsor lines).
pub const FOOTER_CONTENT: &[&str] = &[
    "版权所有",
    "copyright",
    "©",
    "网站标识码",
    "icp备",
    "备案号",
    "公网安备",
    "主办单位",
    "承办单位",
    "技术支持",
    "网站地图",
    "联系我们",
    "政府网站找错",
    "all rights reserved",
    "sponsor",
];

/// Class/id words of bottom-of-page regions.
pub const FOOTER_AREA: &[&str] = &[
    "footer", "bottom", "foot", "copyright", "links", "sitemap", "contact", "about",
];

/// Words that betray navigation when they turn up in a locator string.
pub const LOCATOR_NAVIGATION: &[&str] = &["nav", "menu", "sidebar", "breadcrumb", "pagination"];

/// Negative class/id words for list candidates.
pub const LIST_NEGATIVE: &[&str] = &[
    "nav",
    "menu",
    "sidebar",
    "header",
    "footer",
    "topbar",
    "navigation",
    "breadcrumb",
    "pagination",
    "toolbar",
    "menubar",
    "banner",
    "aside",
];

/// High-confidence positive class/id words for list candidates.
pub const LIST_STRONG_POSITIVE: &[&str] = &[
    "content", "main", "news", "article", "data", "info", "detail", "result",
];

/// Positive class/id words that also show up in menus (`nav-list`, `menu-item`).
pub const LIST_WEAK_POSITIVE: &[&str] = &["list", "item", "container", "body", "section", "con"];

/// Words that turn a weak positive into a negative combination.
pub const LIST_WEAK_SPOILERS: &[&str] = &["nav", "menu", "sidebar", "header", "footer"];

/// Furniture words checked on ancestors of a list candidate.
pub const ANCESTOR_NEGATIVE: &[&str] = &["nav", "menu", "sidebar", "header", "topbar", "navigation"];

/// Typical navigation labels, localized.
pub const NAVIGATION_WORDS: &[&str] = &[
    "首页", "主页", "新闻", "产品", "服务", "关于", "联系", "登录", "注册", "home", "news", "about",
    "contact", "login", "register", "product", "service",
];

/// Explicit publication-time labels.
pub const DATE_LABELS: &[&str] = &[
    "发布时间",
    "更新日期",
    "发布日期",
    "创建时间",
    "更新时间",
    "成文日期",
    "发文日期",
];

/// Positive class/id words for article containers.
pub const ARTICLE_POSITIVE: &[&str] = &[
    "content", "article", "detail", "main", "body", "text", "editor",
];

/// Negative class/id words that survive pruning (sidebars, ads, related links).
pub const ARTICLE_NEGATIVE: &[&str] = &[
    "nav",
    "menu",
    "sidebar",
    "aside",
    "related",
    "recommend",
    "ad",
    "ads",
    "advert",
    "share",
    "comment",
    "banner",
    "header",
    "footer",
];

/// Semantic `role` values of list and grid regions.
pub const LIST_ROLES: &[&str] = &["list", "listbox", "grid", "feed", "table", "treegrid"];

/// Official-document type words.
pub const DOCUMENT_PHRASES: &[&str] = &[
    "通知",
    "公告",
    "通告",
    "意见",
    "办法",
    "措施",
    "决定",
    "规定",
    "方案",
    "批复",
    "条例",
    "细则",
    "规划",
    "notice",
    "announcement",
    "regulation",
    "measures",
    "decision",
];

/// Document metadata field labels.
pub const METADATA_LABELS: &[&str] = &[
    "索引号",
    "文号",
    "发文字号",
    "发文机关",
    "发布机构",
    "发布单位",
    "主题分类",
    "信息来源",
];

/// Attachment and download markers.
pub const ATTACHMENT_MARKERS: &[&str] = &[
    "附件",
    "下载",
    ".pdf",
    ".doc",
    ".xls",
    ".zip",
    ".rar",
    ".wps",
    "attachment",
    "download",
];

/// Boilerplate transition phrases of official prose.
pub const TRANSITION_PHRASES: &[&str] = &[
    "根据",
    "按照",
    "依据",
    "为进一步",
    "现将",
    "特此",
    "经研究",
    "现决定",
    "决定如下",
    "hereby",
    "pursuant to",
    "in accordance with",
];

/// Full calendar dates: `2025-01-15`, `2025/1/15`, `2025.01.15`, `2025年1月15日`.
pub static PRECISE_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{4}-\d{1,2}-\d{1,2}|\d{4}/\d{1,2}/\d{1,2}|\d{4}\.\d{1,2}\.\d{1,2}|\d{4}年\d{1,2}月\d{1,2}日").unwrap()
});

/// Numbered clauses: `第十二条`, `第3条`, `Article 4`.
pub static CLAUSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"第[一二三四五六七八九十百零〇\d]+条|(?i:\barticle\s+\d+)").unwrap()
});

/// Returns true if `keyword` occurs in the attribute `value` under `mode`.
///
/// Matching is ASCII case-insensitive; `keyword` must be lowercase.
pub fn attr_matches(value: &str, keyword: &str, mode: Matching) -> bool {
    if value.is_empty() {
        return false;
    }
    let value = value.to_ascii_lowercase();
    match mode {
        Matching::Substring => value.contains(keyword),
        Matching::WordBoundary => value
            .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
            .map(|part| part.trim_end_matches(|c: char| c.is_ascii_digit()))
            .any(|part| part == keyword),
    }
}

/// Keywords from `set` that occur in `value`.
pub fn attr_hits<'k>(value: &str, set: &[&'k str], mode: Matching) -> Vec<&'k str> {
    set.iter()
        .copied()
        .filter(|kw| attr_matches(value, kw, mode))
        .collect()
}

/// Returns true if any keyword from `set` occurs in `value`.
pub fn attr_any(value: &str, set: &[&str], mode: Matching) -> bool {
    set.iter().any(|kw| attr_matches(value, kw, mode))
}

/// Number of distinct phrases from `set` found in `text` (lowercased).
pub fn distinct_phrases(text: &str, set: &[&str]) -> usize {
    let lower = text.to_lowercase();
    set.iter().filter(|p| lower.contains(*p)).count()
}

/// Total occurrences of phrases from `set` in `text` (lowercased).
pub fn phrase_occurrences(text: &str, set: &[&str]) -> usize {
    let lower = text.to_lowercase();
    set.iter().map(|p| lower.matches(*p).count()).sum()
}

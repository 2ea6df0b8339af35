//! Structural locators.
//!
//! A [`Locator`] is a typed form of the XPath subset this crate emits:
//! `//tag[...]` and `/tag[...]` steps whose predicates are same-tag positions,
//! exact attribute matches, `contains(@attr, '...')`, `contains(text(), '...')`
//! and whitespace-token class tests
//! (`contains(concat(' ', normalize-space(@class), ' '), ' tok ')`).
//! `Display` renders the XPath text, `FromStr` parses it back, and
//! [`Locator::evaluate`] re-selects nodes in a [`Document`].

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use ego_tree::NodeId;

use crate::document::{normalize_whitespace, Document};
use crate::LocateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// `/tag`
    Child,
    /// `//tag`
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `[n]`, 1-based among the step's matches under one parent.
    Position(usize),
    /// `[@name='value']`
    AttrEquals { name: String, value: String },
    /// `[contains(@name, 'value')]`
    AttrContains { name: String, value: String },
    /// `[contains(concat(' ', normalize-space(@name), ' '), ' token ')]`
    AttrToken { name: String, token: String },
    /// `[contains(text(), 'value')]`, tested against the first text child.
    TextContains(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub axis: Axis,
    /// Tag name, or `*`. Matched ASCII case-insensitively.
    pub tag: String,
    pub predicates: Vec<Predicate>,
}

impl Step {
    pub fn new(axis: Axis, tag: impl Into<String>) -> Self {
        Self {
            axis,
            tag: tag.into(),
            predicates: Vec::new(),
        }
    }

    pub fn with(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    steps: Vec<Step>,
}

impl Locator {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Appends `steps` below this locator.
    pub fn join(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Nodes selected by this locator, in document order.
    ///
    /// An absolute path whose first step is not `html` is taken relative to
    /// the root element, so both `/html[1]/body[1]/div[2]` and
    /// `/body[1]/div[2]` select the same node.
    pub fn evaluate(&self, doc: &Document) -> Vec<NodeId> {
        let order: HashMap<NodeId, usize> =
            doc.elements().enumerate().map(|(i, id)| (id, i)).collect();

        // `None` stands for the document node above the root element.
        let mut context: Vec<Option<NodeId>> = match self.steps.first() {
            Some(first)
                if first.axis == Axis::Child && !first.tag.eq_ignore_ascii_case("html") =>
            {
                vec![Some(doc.root())]
            }
            _ => vec![None],
        };

        for step in &self.steps {
            let mut seen = HashSet::new();
            let mut next = Vec::new();
            for ctx in &context {
                for parent in step_parents(doc, *ctx, step.axis) {
                    for id in apply_step(doc, parent, step) {
                        if seen.insert(id) {
                            next.push(id);
                        }
                    }
                }
            }
            next.sort_by_key(|id| order.get(id).copied().unwrap_or(usize::MAX));
            context = next.into_iter().map(Some).collect();
            if context.is_empty() {
                break;
            }
        }
        context.into_iter().flatten().collect()
    }
}

/// Parents whose children a step inspects.
fn step_parents(doc: &Document, ctx: Option<NodeId>, axis: Axis) -> Vec<Option<NodeId>> {
    match (axis, ctx) {
        (Axis::Child, _) => vec![ctx],
        (Axis::Descendant, None) => std::iter::once(None)
            .chain(doc.elements().map(Some))
            .collect(),
        (Axis::Descendant, Some(id)) => std::iter::once(id)
            .chain(doc.descendants(id))
            .map(Some)
            .collect(),
    }
}

fn apply_step(doc: &Document, parent: Option<NodeId>, step: &Step) -> Vec<NodeId> {
    let children: Vec<NodeId> = match parent {
        None => vec![doc.root()],
        Some(id) => doc.children(id).collect(),
    };
    let mut matched: Vec<NodeId> = children
        .into_iter()
        .filter(|&c| step.tag == "*" || doc.tag(c).eq_ignore_ascii_case(&step.tag))
        .collect();
    for predicate in &step.predicates {
        matched = match predicate {
            Predicate::Position(n) => n
                .checked_sub(1)
                .and_then(|i| matched.get(i).copied())
                .into_iter()
                .collect(),
            other => matched
                .into_iter()
                .filter(|&id| node_predicate(doc, id, other))
                .collect(),
        };
    }
    matched
}

fn node_predicate(doc: &Document, id: NodeId, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Position(_) => true,
        Predicate::AttrEquals { name, value } => doc.attr(id, name) == Some(value.as_str()),
        Predicate::AttrContains { name, value } => {
            doc.attr(id, name).is_some_and(|v| v.contains(value.as_str()))
        }
        Predicate::AttrToken { name, token } => doc.attr(id, name).is_some_and(|v| {
            format!(" {} ", normalize_whitespace(v)).contains(&format!(" {token} "))
        }),
        Predicate::TextContains(value) => doc.first_text(id).contains(value.as_str()),
    }
}

/// Renders an XPath string literal, choosing the quote the value lacks.
fn write_literal(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    if value.contains('\'') {
        write!(f, "\"{value}\"")
    } else {
        write!(f, "'{value}'")
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Position(n) => write!(f, "[{n}]"),
            Predicate::AttrEquals { name, value } => {
                write!(f, "[@{name}=")?;
                write_literal(f, value)?;
                f.write_str("]")
            }
            Predicate::AttrContains { name, value } => {
                write!(f, "[contains(@{name}, ")?;
                write_literal(f, value)?;
                f.write_str(")]")
            }
            Predicate::AttrToken { name, token } => write!(
                f,
                "[contains(concat(' ', normalize-space(@{name}), ' '), ' {token} ')]"
            ),
            Predicate::TextContains(value) => {
                f.write_str("[contains(text(), ")?;
                write_literal(f, value)?;
                f.write_str(")]")
            }
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = match self.axis {
            Axis::Child => "/",
            Axis::Descendant => "//",
        };
        write!(f, "{sep}{}", self.tag)?;
        for p in &self.predicates {
            write!(f, "{p}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

impl FromStr for Locator {
    type Err = LocateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Parser::new(s).parse().map_err(|reason| LocateError::Query {
            locator: s.to_string(),
            reason,
        })
    }
}

// --- Parser ---

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Slash,
    DoubleSlash,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    At,
    Eq,
    Name(String),
    Number(usize),
    Literal(String),
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();
    while let Some(&(pos, ch)) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '/' => {
                chars.next();
                if chars.peek().is_some_and(|&(_, c)| c == '/') {
                    chars.next();
                    tokens.push(Token::DoubleSlash);
                } else {
                    tokens.push(Token::Slash);
                }
            }
            '[' | ']' | '(' | ')' | ',' | '@' | '=' => {
                chars.next();
                tokens.push(match ch {
                    '[' => Token::LBracket,
                    ']' => Token::RBracket,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    ',' => Token::Comma,
                    '@' => Token::At,
                    _ => Token::Eq,
                });
            }
            '\'' | '"' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some((_, c)) if c == ch => break,
                        Some((_, c)) => value.push(c),
                        None => return Err(format!("unterminated literal at {pos}")),
                    }
                }
                tokens.push(Token::Literal(value));
            }
            c if c.is_ascii_digit() => {
                let mut digits = String::new();
                while let Some(&(_, d)) = chars.peek().filter(|(_, d)| d.is_ascii_digit()) {
                    digits.push(d);
                    chars.next();
                }
                let n = digits
                    .parse()
                    .map_err(|_| format!("bad number at {pos}"))?;
                tokens.push(Token::Number(n));
            }
            c if is_name_char(c) || c == '*' => {
                let mut name = String::new();
                while let Some(&(_, c)) = chars
                    .peek()
                    .filter(|(_, c)| is_name_char(*c) || *c == '*')
                {
                    name.push(c);
                    chars.next();
                }
                tokens.push(Token::Name(name));
            }
            other => return Err(format!("unexpected {other:?} at {pos}")),
        }
    }
    Ok(tokens)
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')
}

/// Function-call arguments the predicate grammar understands.
#[derive(Debug)]
enum Arg {
    Attr(String),
    Literal(String),
    Call(String, Vec<Arg>),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    input: String,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            tokens: Vec::new(),
            pos: 0,
            input: input.to_string(),
        }
    }

    fn parse(mut self) -> Result<Locator, String> {
        self.tokens = tokenize(&self.input)?;
        if self.tokens.is_empty() {
            return Err("empty locator".to_string());
        }
        let mut steps = Vec::new();
        while self.pos < self.tokens.len() {
            steps.push(self.step()?);
        }
        Ok(Locator::new(steps))
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn expect(&mut self, want: Token) -> Result<(), String> {
        match self.next() {
            Some(t) if t == want => Ok(()),
            Some(t) => Err(format!("expected {want:?}, found {t:?}")),
            None => Err(format!("expected {want:?}, found end of input")),
        }
    }

    fn name(&mut self) -> Result<String, String> {
        match self.next() {
            Some(Token::Name(n)) => Ok(n),
            Some(t) => Err(format!("expected a name, found {t:?}")),
            None => Err("expected a name, found end of input".to_string()),
        }
    }

    fn step(&mut self) -> Result<Step, String> {
        let axis = match self.next() {
            Some(Token::Slash) => Axis::Child,
            Some(Token::DoubleSlash) => Axis::Descendant,
            Some(t) => return Err(format!("expected '/' or '//', found {t:?}")),
            None => return Err("unexpected end of input".to_string()),
        };
        let mut step = Step::new(axis, self.name()?);
        while self.peek() == Some(&Token::LBracket) {
            self.next();
            step.predicates.push(self.predicate()?);
            self.expect(Token::RBracket)?;
        }
        Ok(step)
    }

    fn predicate(&mut self) -> Result<Predicate, String> {
        match self.peek() {
            Some(Token::Number(n)) => {
                let n = *n;
                self.next();
                if n == 0 {
                    return Err("positions are 1-based".to_string());
                }
                Ok(Predicate::Position(n))
            }
            Some(Token::At) => {
                self.next();
                let name = self.name()?;
                self.expect(Token::Eq)?;
                match self.next() {
                    Some(Token::Literal(value)) => Ok(Predicate::AttrEquals { name, value }),
                    other => Err(format!("expected a literal, found {other:?}")),
                }
            }
            Some(Token::Name(_)) => match self.arg()? {
                Arg::Call(func, args) if func == "contains" => contains_predicate(args),
                other => Err(format!("unsupported predicate {other:?}")),
            },
            other => Err(format!("unsupported predicate starting with {other:?}")),
        }
    }

    fn arg(&mut self) -> Result<Arg, String> {
        match self.next() {
            Some(Token::At) => Ok(Arg::Attr(self.name()?)),
            Some(Token::Literal(v)) => Ok(Arg::Literal(v)),
            Some(Token::Name(func)) => {
                self.expect(Token::LParen)?;
                let mut args = Vec::new();
                if self.peek() != Some(&Token::RParen) {
                    loop {
                        args.push(self.arg()?);
                        if self.peek() == Some(&Token::Comma) {
                            self.next();
                        } else {
                            break;
                        }
                    }
                }
                self.expect(Token::RParen)?;
                Ok(Arg::Call(func, args))
            }
            other => Err(format!("unexpected {other:?} in predicate")),
        }
    }
}

fn contains_predicate(args: Vec<Arg>) -> Result<Predicate, String> {
    let mut args = args.into_iter();
    let (Some(haystack), Some(Arg::Literal(needle)), None) = (args.next(), args.next(), args.next())
    else {
        return Err("contains() takes an expression and a literal".to_string());
    };
    match haystack {
        Arg::Attr(name) => Ok(Predicate::AttrContains {
            name,
            value: needle,
        }),
        Arg::Call(func, inner) if func == "text" && inner.is_empty() => {
            Ok(Predicate::TextContains(needle))
        }
        Arg::Call(func, inner) if func == "concat" => {
            let name = padded_normalized_attr(inner)?;
            let token = needle
                .strip_prefix(' ')
                .and_then(|t| t.strip_suffix(' '))
                .filter(|t| !t.is_empty() && !t.contains(char::is_whitespace))
                .ok_or_else(|| format!("token test needs ' token ', found {needle:?}"))?;
            Ok(Predicate::AttrToken {
                name,
                token: token.to_string(),
            })
        }
        other => Err(format!("unsupported contains() argument {other:?}")),
    }
}

/// Accepts `concat(' ', normalize-space(@name), ' ')` and returns `name`.
fn padded_normalized_attr(args: Vec<Arg>) -> Result<String, String> {
    match args.as_slice() {
        [Arg::Literal(a), Arg::Call(func, inner), Arg::Literal(b)]
            if a == " " && b == " " && func == "normalize-space" =>
        {
            match inner.as_slice() {
                [Arg::Attr(name)] => Ok(name.clone()),
                _ => Err("normalize-space() takes one attribute".to_string()),
            }
        }
        _ => Err("unsupported concat() form".to_string()),
    }
}

/// Parses `locator` and evaluates it against `doc`.
pub fn select(doc: &Document, locator: &str) -> Result<Vec<NodeId>, LocateError> {
    Ok(locator.parse::<Locator>()?.evaluate(doc))
}

//! CSS selector subset understood by the host abstraction.
//!
//! Supported: comma-separated lists, the descendant combinator, type selectors (or `*`),
//! `#id`, `.class`, and attribute selectors `[a]`, `[a="v"]`, `[a*="v"]`, `[a^="v"]`,
//! `[a$="v"]`. That covers every selector the signature tables use.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::dom::DomNode;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("unexpected character '{ch}' at {pos}")]
    UnexpectedChar { ch: char, pos: usize },
    #[error("unterminated attribute selector")]
    UnterminatedAttribute,
    #[error("unterminated string")]
    UnterminatedString,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals,
    Contains,
    Prefix,
    Suffix,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct AttrMatcher {
    name: String,
    op: AttrOp,
    value: String,
}

impl AttrMatcher {
    fn matches(&self, actual: Option<String>) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        match self.op {
            AttrOp::Exists => true,
            AttrOp::Equals => actual == self.value,
            // Empty operands never match for substring operators.
            AttrOp::Contains => !self.value.is_empty() && actual.contains(&self.value),
            AttrOp::Prefix => !self.value.is_empty() && actual.starts_with(&self.value),
            AttrOp::Suffix => !self.value.is_empty() && actual.ends_with(&self.value),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrMatcher>,
}

impl Compound {
    fn matches(&self, node: &dyn DomNode) -> bool {
        if let Some(tag) = &self.tag {
            if !node.tag_name().eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if node.attribute("id").as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let class_attr = node.attribute("class").unwrap_or_default();
            let present: Vec<&str> = class_attr.split_whitespace().collect();
            if !self.classes.iter().all(|c| present.contains(&c.as_str())) {
                return false;
            }
        }
        self.attrs
            .iter()
            .all(|attr| attr.matches(node.attribute(&attr.name)))
    }
}

/// Compounds joined by descendant combinators; the last one is the subject.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Complex {
    compounds: Vec<Compound>,
}

impl Complex {
    fn matches(&self, node: &dyn DomNode) -> bool {
        let Some((subject, ancestors)) = self.compounds.split_last() else {
            return false;
        };
        if !subject.matches(node) {
            return false;
        }
        let mut pending = ancestors.iter().rev().peekable();
        let mut cursor = node.parent();
        while let Some(wanted) = pending.peek() {
            let Some(current) = cursor else {
                return false;
            };
            if wanted.matches(current.as_ref()) {
                pending.next();
            }
            cursor = current.parent();
        }
        true
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Complex>,
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let alternatives = split_top_level(input, ',')
            .into_iter()
            .map(|part| parse_complex(&part))
            .collect::<Result<Vec<_>, _>>()?;
        if alternatives.is_empty() {
            return Err(SelectorError::Empty);
        }
        Ok(Self {
            source: input.trim().to_string(),
            alternatives,
        })
    }

    /// Join several selector strings into one selector list.
    pub fn any_of<S: AsRef<str>>(parts: &[S]) -> Result<Self, SelectorError> {
        let joined = parts
            .iter()
            .map(|p| p.as_ref().trim())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        Self::parse(&joined)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, node: &dyn DomNode) -> bool {
        self.alternatives.iter().any(|alt| alt.matches(node))
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Selector").field(&self.source).finish()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Split on `sep` outside brackets and quotes.
fn split_top_level(input: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for ch in input.chars() {
        match (quote, ch) {
            (Some(q), c) if c == q => {
                quote = None;
                current.push(c);
            }
            (Some(_), c) => current.push(c),
            (None, '"') | (None, '\'') => {
                quote = Some(ch);
                current.push(ch);
            }
            (None, '[') => {
                depth += 1;
                current.push(ch);
            }
            (None, ']') => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            (None, c) if c == sep && depth == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            (None, c) => current.push(c),
        }
    }
    parts.push(current);
    parts
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

fn parse_complex(input: &str) -> Result<Complex, SelectorError> {
    let mut compounds = Vec::new();
    for token in split_whitespace_top_level(input) {
        compounds.push(parse_compound(&token)?);
    }
    if compounds.is_empty() {
        return Err(SelectorError::Empty);
    }
    Ok(Complex { compounds })
}

fn split_whitespace_top_level(input: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for ch in input.chars() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            current.push(ch);
            continue;
        }
        match ch {
            '"' | '\'' => {
                quote = Some(ch);
                current.push(ch);
            }
            '[' => {
                depth += 1;
                current.push(ch);
            }
            ']' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            c if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '-' || ch == '_'
}

struct Cursor<'a> {
    chars: Vec<char>,
    pos: usize,
    _src: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            chars: src.chars().collect(),
            pos: 0,
            _src: src,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn ident(&mut self) -> Result<String, SelectorError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if is_ident_char(c)) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.unexpected());
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn unexpected(&self) -> SelectorError {
        match self.peek() {
            Some(ch) => SelectorError::UnexpectedChar { ch, pos: self.pos },
            None => SelectorError::Empty,
        }
    }
}

fn parse_compound(token: &str) -> Result<Compound, SelectorError> {
    let mut cursor = Cursor::new(token);
    let mut compound = Compound::default();

    match cursor.peek() {
        Some('*') => {
            cursor.bump();
        }
        Some(c) if is_ident_char(c) => {
            compound.tag = Some(cursor.ident()?.to_ascii_lowercase());
        }
        _ => {}
    }

    while let Some(ch) = cursor.peek() {
        match ch {
            '#' => {
                cursor.bump();
                compound.id = Some(cursor.ident()?);
            }
            '.' => {
                cursor.bump();
                compound.classes.push(cursor.ident()?);
            }
            '[' => {
                cursor.bump();
                compound.attrs.push(parse_attr(&mut cursor)?);
            }
            _ => return Err(cursor.unexpected()),
        }
    }

    Ok(compound)
}

fn parse_attr(cursor: &mut Cursor<'_>) -> Result<AttrMatcher, SelectorError> {
    cursor.skip_ws();
    let name = cursor.ident()?.to_ascii_lowercase();
    cursor.skip_ws();

    let op = match cursor.bump() {
        Some(']') => {
            return Ok(AttrMatcher {
                name,
                op: AttrOp::Exists,
                value: String::new(),
            })
        }
        Some('=') => AttrOp::Equals,
        Some(prefix @ ('*' | '^' | '$')) => {
            if cursor.bump() != Some('=') {
                return Err(SelectorError::UnterminatedAttribute);
            }
            match prefix {
                '*' => AttrOp::Contains,
                '^' => AttrOp::Prefix,
                _ => AttrOp::Suffix,
            }
        }
        Some(ch) => {
            return Err(SelectorError::UnexpectedChar {
                ch,
                pos: cursor.pos - 1,
            })
        }
        None => return Err(SelectorError::UnterminatedAttribute),
    };

    cursor.skip_ws();
    let value = match cursor.peek() {
        Some(q @ ('"' | '\'')) => {
            cursor.bump();
            let mut value = String::new();
            loop {
                match cursor.bump() {
                    Some(c) if c == q => break,
                    Some(c) => value.push(c),
                    None => return Err(SelectorError::UnterminatedString),
                }
            }
            value
        }
        Some(_) => cursor.ident()?,
        None => return Err(SelectorError::UnterminatedAttribute),
    };

    cursor.skip_ws();
    if cursor.bump() != Some(']') {
        return Err(SelectorError::UnterminatedAttribute);
    }

    Ok(AttrMatcher { name, op, value })
}

//! LDAP-style filter expressions used to select providers
//!
//! Supported syntax:
//! ```text
//! (&(objectClass=org.example.Greeter)(lang=en*))
//! (|(a=1)(!(b>=2)))
//! (key=*)            presence
//! (name~=Hello World) case and whitespace insensitive equality
//! ```

use crate::properties::{self, OBJECT_CLASS, Properties};
use crate::{DmError, DmResult};
use std::fmt;

/// Parsed filter expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Equal { key: String, value: String },
    Approx { key: String, value: String },
    GreaterEq { key: String, value: String },
    LessEq { key: String, value: String },
    Present(String),
    /// `parts` are the literal pieces between `*` wildcards
    Substring { key: String, parts: Vec<String> },
}

impl Filter {
    /// Parse a filter expression
    pub fn parse(input: &str) -> DmResult<Self> {
        let mut parser = Parser::new(input);
        let filter = parser.filter()?;
        parser.skip_whitespace();
        if !parser.at_end() {
            return Err(parser.error("trailing characters after filter"));
        }
        Ok(filter)
    }

    /// Filter matching services registered under `interface`
    pub fn interface(interface: impl Into<String>) -> Self {
        Filter::Equal {
            key: OBJECT_CLASS.to_string(),
            value: interface.into(),
        }
    }

    /// Conjunction of `self` and `other`, flattening nested conjunctions
    pub fn and(self, other: Filter) -> Self {
        let mut parts = match self {
            Filter::And(parts) => parts,
            single => vec![single],
        };
        match other {
            Filter::And(more) => parts.extend(more),
            single => parts.push(single),
        }
        Filter::And(parts)
    }

    /// Evaluate the filter against a property dictionary
    pub fn matches(&self, properties: &Properties) -> bool {
        match self {
            Filter::And(parts) => parts.iter().all(|f| f.matches(properties)),
            Filter::Or(parts) => parts.iter().any(|f| f.matches(properties)),
            Filter::Not(inner) => !inner.matches(properties),
            Filter::Present(key) => properties::get_ignore_case(properties, key).is_some(),
            Filter::Equal { key, value } => {
                lookup(properties, key, |v| compare(v, value, Comparison::Equal))
            }
            Filter::Approx { key, value } => {
                lookup(properties, key, |v| compare(v, value, Comparison::Approx))
            }
            Filter::GreaterEq { key, value } => {
                lookup(properties, key, |v| compare(v, value, Comparison::GreaterEq))
            }
            Filter::LessEq { key, value } => {
                lookup(properties, key, |v| compare(v, value, Comparison::LessEq))
            }
            Filter::Substring { key, parts } => lookup(properties, key, |v| match v {
                serde_json::Value::String(s) => glob_match(s, parts),
                _ => false,
            }),
        }
    }
}

impl std::str::FromStr for Filter {
    type Err = DmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Filter::parse(s)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::And(parts) => {
                write!(f, "(&")?;
                for part in parts {
                    write!(f, "{part}")?;
                }
                write!(f, ")")
            }
            Filter::Or(parts) => {
                write!(f, "(|")?;
                for part in parts {
                    write!(f, "{part}")?;
                }
                write!(f, ")")
            }
            Filter::Not(inner) => write!(f, "(!{inner})"),
            Filter::Equal { key, value } => write!(f, "({key}={})", escape(value)),
            Filter::Approx { key, value } => write!(f, "({key}~={})", escape(value)),
            Filter::GreaterEq { key, value } => write!(f, "({key}>={})", escape(value)),
            Filter::LessEq { key, value } => write!(f, "({key}<={})", escape(value)),
            Filter::Present(key) => write!(f, "({key}=*)"),
            Filter::Substring { key, parts } => {
                let escaped: Vec<String> = parts.iter().map(|p| escape(p)).collect();
                write!(f, "({key}={})", escaped.join("*"))
            }
        }
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '(' | ')' | '*' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn lookup(properties: &Properties, key: &str, test: impl Fn(&serde_json::Value) -> bool) -> bool {
    match properties::get_ignore_case(properties, key) {
        Some(serde_json::Value::Array(items)) => items.iter().any(&test),
        Some(value) => test(value),
        None => false,
    }
}

#[derive(Clone, Copy)]
enum Comparison {
    Equal,
    Approx,
    GreaterEq,
    LessEq,
}

fn compare(actual: &serde_json::Value, expected: &str, op: Comparison) -> bool {
    use std::cmp::Ordering;

    let ordering = match actual {
        serde_json::Value::String(s) => {
            if let Comparison::Approx = op {
                return normalize(s) == normalize(expected);
            }
            Some(s.as_str().cmp(expected))
        }
        serde_json::Value::Number(n) => {
            let Ok(wanted) = expected.trim().parse::<f64>() else {
                return false;
            };
            n.as_f64().and_then(|have| have.partial_cmp(&wanted))
        }
        serde_json::Value::Bool(b) => {
            let Ok(wanted) = expected.trim().to_ascii_lowercase().parse::<bool>() else {
                return false;
            };
            Some(b.cmp(&wanted))
        }
        serde_json::Value::Array(_) | serde_json::Value::Object(_) | serde_json::Value::Null => {
            None
        }
    };

    match (ordering, op) {
        (Some(Ordering::Equal), Comparison::Equal | Comparison::Approx) => true,
        (Some(o), Comparison::GreaterEq) => o != Ordering::Less,
        (Some(o), Comparison::LessEq) => o != Ordering::Greater,
        _ => false,
    }
}

fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn glob_match(value: &str, parts: &[String]) -> bool {
    let Some((first, rest)) = parts.split_first() else {
        return true;
    };
    let Some(mut remaining) = value.strip_prefix(first.as_str()) else {
        return false;
    };
    let Some((last, middle)) = rest.split_last() else {
        return remaining.is_empty();
    };
    for part in middle {
        match remaining.find(part.as_str()) {
            Some(idx) => remaining = &remaining[idx + part.len()..],
            None => return false,
        }
    }
    remaining.ends_with(last.as_str())
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn error(&self, message: &str) -> DmError {
        DmError::InvalidFilter(format!("{message} at position {}", self.pos))
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: char) -> DmResult<()> {
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{expected}'")))
        }
    }

    fn filter(&mut self) -> DmResult<Filter> {
        self.skip_whitespace();
        self.expect('(')?;
        self.skip_whitespace();
        let filter = match self.peek() {
            Some('&') => {
                self.pos += 1;
                Filter::And(self.filter_list()?)
            }
            Some('|') => {
                self.pos += 1;
                Filter::Or(self.filter_list()?)
            }
            Some('!') => {
                self.pos += 1;
                Filter::Not(Box::new(self.filter()?))
            }
            Some(_) => self.item()?,
            None => return Err(self.error("unexpected end of filter")),
        };
        self.skip_whitespace();
        self.expect(')')?;
        Ok(filter)
    }

    fn filter_list(&mut self) -> DmResult<Vec<Filter>> {
        let mut parts = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() != Some('(') {
                break;
            }
            parts.push(self.filter()?);
        }
        if parts.is_empty() {
            return Err(self.error("empty filter list"));
        }
        Ok(parts)
    }

    fn item(&mut self) -> DmResult<Filter> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if matches!(c, '=' | '~' | '<' | '>' | '(' | ')') {
                break;
            }
            self.pos += 1;
        }
        let key: String = self.chars[start..self.pos].iter().collect();
        let key = key.trim().to_string();
        if key.is_empty() {
            return Err(self.error("missing attribute name"));
        }

        let op = match self.peek() {
            Some('=') => {
                self.pos += 1;
                '='
            }
            Some(c @ ('~' | '<' | '>')) => {
                self.pos += 1;
                self.expect('=')?;
                c
            }
            _ => return Err(self.error("expected comparison operator")),
        };

        let parts = self.value()?;
        let single = |parts: Vec<String>| -> DmResult<String> {
            match <[String; 1]>::try_from(parts) {
                Ok([value]) => Ok(value),
                Err(_) => Err(DmError::InvalidFilter(format!(
                    "wildcard not allowed for attribute {key}"
                ))),
            }
        };

        Ok(match op {
            '~' => Filter::Approx {
                value: single(parts)?,
                key,
            },
            '>' => Filter::GreaterEq {
                value: single(parts)?,
                key,
            },
            '<' => Filter::LessEq {
                value: single(parts)?,
                key,
            },
            _ if parts.len() == 1 => Filter::Equal {
                value: single(parts)?,
                key,
            },
            _ if parts.len() == 2 && parts.iter().all(String::is_empty) => Filter::Present(key),
            _ => Filter::Substring { key, parts },
        })
    }

    /// Reads a value up to the closing parenthesis, splitting on unescaped `*`
    fn value(&mut self) -> DmResult<Vec<String>> {
        let mut parts = vec![String::new()];
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated value")),
                Some(')') => break,
                Some('(') => return Err(self.error("unescaped '(' in value")),
                Some('\\') => {
                    self.pos += 1;
                    let escaped = self.peek().ok_or_else(|| self.error("dangling escape"))?;
                    if let Some(current) = parts.last_mut() {
                        current.push(escaped);
                    }
                    self.pos += 1;
                }
                Some('*') => {
                    parts.push(String::new());
                    self.pos += 1;
                }
                Some(c) => {
                    if let Some(current) = parts.last_mut() {
                        current.push(c);
                    }
                    self.pos += 1;
                }
            }
        }
        Ok(parts)
    }
}

#[cfg(test)]
#[path = "filter/filter_tests.rs"]
mod filter_tests;

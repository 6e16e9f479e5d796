//! Flat `key=value` properties model and text codec.
//!
//! # Responsibility
//! - Hold one loaded configuration mapping (string key -> string value).
//! - Parse the line-oriented properties text format, including line
//!   continuations and backslash escapes.
//!
//! # Invariants
//! - Keys are case-sensitive and compared verbatim.
//! - Values are stored verbatim after escape decoding (no trimming).
//! - A later occurrence of a key overwrites the earlier one.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::Chars;

/// Ordered, read-only-after-load configuration mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Inserts one entry, returning the previous value for `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Returns every entry whose key starts with `prefix`, re-keyed by the
    /// remaining suffix. Values are carried verbatim.
    pub fn scoped(&self, prefix: &str) -> Properties {
        let entries = self
            .entries
            .range::<str, _>((std::ops::Bound::Included(prefix), std::ops::Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key[prefix.len()..].to_string(), value.clone()))
            .collect();
        Properties { entries }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Properties {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Properties text decoding errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertiesParseError {
    /// `\u` escape without four hexadecimal digits, or not a scalar value.
    MalformedUnicodeEscape { line: usize },
}

impl Display for PropertiesParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedUnicodeEscape { line } => {
                write!(f, "malformed \\uXXXX escape on line {line}")
            }
        }
    }
}

impl Error for PropertiesParseError {}

/// Parses properties text into a mapping.
pub fn parse_properties(text: &str) -> Result<Properties, PropertiesParseError> {
    let mut properties = Properties::new();
    let mut lines = physical_lines(text).enumerate();

    while let Some((index, raw)) = lines.next() {
        let first_line = index + 1;
        let trimmed = raw.trim_start_matches(is_blank);
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }

        let mut logical = String::from(trimmed);
        while ends_with_continuation(&logical) {
            logical.pop();
            match lines.next() {
                Some((_, next)) => logical.push_str(next.trim_start_matches(is_blank)),
                None => break,
            }
        }

        let (key, value) = split_entry(&logical);
        let key = unescape(key, first_line)?;
        let value = unescape(value, first_line)?;
        properties.insert(key, value);
    }

    Ok(properties)
}

/// Splits on `\n`, `\r\n` and a lone `\r`.
fn physical_lines(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let Some(pos) = rest.find(['\n', '\r']) else {
            let line = rest;
            rest = "";
            return Some(line);
        };
        let line = &rest[..pos];
        let terminator = if rest[pos..].starts_with("\r\n") { 2 } else { 1 };
        rest = &rest[pos + terminator..];
        Some(line)
    })
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t' || c == '\x0c'
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

/// Splits one logical line into its raw (still escaped) key and value.
fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut key_end = line.len();
    for (pos, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if c == '\\' {
            escaped = true;
            continue;
        }
        if c == '=' || c == ':' || is_blank(c) {
            key_end = pos;
            break;
        }
    }

    let key = &line[..key_end];
    let mut rest = line[key_end..].trim_start_matches(is_blank);
    if let Some(stripped) = rest.strip_prefix(['=', ':']) {
        rest = stripped.trim_start_matches(is_blank);
    }
    (key, rest)
}

fn unescape(raw: &str, line: usize) -> Result<String, PropertiesParseError> {
    if !raw.contains('\\') {
        return Ok(raw.to_string());
    }

    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('u') => {
                let unit = read_code_unit(&mut chars, line)?;
                let decoded = if (0xD800..0xDC00).contains(&unit) {
                    let low = match (chars.next(), chars.next()) {
                        (Some('\\'), Some('u')) => read_code_unit(&mut chars, line)?,
                        _ => return Err(PropertiesParseError::MalformedUnicodeEscape { line }),
                    };
                    char::decode_utf16([unit, low]).next().and_then(Result::ok)
                } else {
                    char::from_u32(u32::from(unit))
                };
                out.push(decoded.ok_or(PropertiesParseError::MalformedUnicodeEscape { line })?);
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    Ok(out)
}

/// Reads the four hex digits of one `\u` escape as a UTF-16 code unit.
fn read_code_unit(chars: &mut Chars<'_>, line: usize) -> Result<u16, PropertiesParseError> {
    let hex: String = chars.by_ref().take(4).collect();
    if hex.len() != 4 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(PropertiesParseError::MalformedUnicodeEscape { line });
    }
    u16::from_str_radix(&hex, 16).map_err(|_| PropertiesParseError::MalformedUnicodeEscape { line })
}

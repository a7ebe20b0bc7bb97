//! Declaration-time attribute pairs and the compact attribute string syntax.
//!
//! Attributes can be given one pair at a time or as a single string:
//!
//! ```rust
//! use brrtdispatch::action::Attributes;
//!
//! let attrs = Attributes::parse(":Path('baz') :Args(1)").unwrap();
//! assert_eq!(attrs.get("Path"), Some("baz"));
//! assert_eq!(attrs.get("Args"), Some("1"));
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Ordered key/value attribute pairs scoped to one action.
///
/// A key without a value (`:Local`) is stored with an empty value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a pair. Duplicates are kept and rejected later by metadata parsing.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    /// First value declared for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse an attribute string such as `:Chained('/') :PathPart(users) :CaptureArgs(1)`.
    ///
    /// Each attribute is an identifier, optionally prefixed with `:`, optionally
    /// followed by a parenthesised value. Values may be wrapped in single or
    /// double quotes; quotes are stripped and may contain parentheses.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MalformedAttributes`] for an unterminated value,
    /// a missing identifier, or trailing garbage after a value.
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let malformed = |reason: &str| ConfigError::MalformedAttributes {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let mut attrs = Attributes::new();
        let chars: Vec<char> = input.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            if chars[i].is_whitespace() {
                i += 1;
                continue;
            }
            if chars[i] == ':' {
                i += 1;
            }

            let key_start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            if key_start == i {
                return Err(malformed("expected an attribute name"));
            }
            let key: String = chars[key_start..i].iter().collect();

            if i < chars.len() && chars[i] == '(' {
                i += 1;
                let mut value = String::new();
                let mut quote: Option<char> = None;
                let mut depth = 0usize;
                let mut closed = false;
                while i < chars.len() {
                    let c = chars[i];
                    i += 1;
                    match quote {
                        Some(q) if c == q => quote = None,
                        Some(_) => value.push(c),
                        None => match c {
                            '\'' | '"' => quote = Some(c),
                            '(' => {
                                depth += 1;
                                value.push(c);
                            }
                            ')' if depth == 0 => {
                                closed = true;
                                break;
                            }
                            ')' => {
                                depth -= 1;
                                value.push(c);
                            }
                            _ => value.push(c),
                        },
                    }
                }
                if !closed {
                    return Err(malformed(&format!("unterminated value for '{key}'")));
                }
                attrs.push(key, value.trim());
            } else {
                attrs.push(key, "");
            }

            if i < chars.len() && !chars[i].is_whitespace() && chars[i] != ':' {
                return Err(malformed(&format!("unexpected character '{}'", chars[i])));
            }
        }

        Ok(attrs)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

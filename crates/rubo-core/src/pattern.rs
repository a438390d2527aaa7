//! Pattern construction and capture groups.
//!
//! Directed listeners ("respond") only fire when a message is addressed to
//! the robot. [`ResponderPattern`] wraps the user's pattern with a prefix that
//! accepts the robot's name or alias:
//!
//! ```text
//! ^(?-x:[@]?(?:NAME)[:,]?)\s*(?:USER)                  no alias
//! ^(?-x:[@]?(?:ALIAS[:,]?|NAME[:,]?))\s*(?:USER)       with alias
//! ```
//!
//! Inline flags at the very start of the user pattern (`(?i)`, `(?im)`, ...)
//! are hoisted in front of the prefix so they apply to the whole expression,
//! including the name. Verbose mode (`x`) is switched off inside the prefix
//! so spaces in the name stay literal.

use std::collections::HashMap;

use regex::Regex;

use crate::error::PatternError;

/// Capture groups recorded by a successful pattern match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures {
    groups: Vec<Option<String>>,
    named: HashMap<String, String>,
}

impl Captures {
    /// Empty captures, used for non-pattern listeners and error responses.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Records the captures of `regex` against `text`, or `None` on no match.
    pub fn from_match(regex: &Regex, text: &str) -> Option<Self> {
        let caps = regex.captures(text)?;
        let groups = caps
            .iter()
            .map(|m| m.map(|m| m.as_str().to_string()))
            .collect();
        let named = regex
            .capture_names()
            .flatten()
            .filter_map(|name| caps.name(name).map(|m| (name.to_string(), m.as_str().to_string())))
            .collect();
        Some(Self { groups, named })
    }

    /// Returns group `index` (0 is the whole match).
    pub fn get(&self, index: usize) -> Option<&str> {
        self.groups.get(index).and_then(|g| g.as_deref())
    }

    /// Returns a named group.
    pub fn name(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }

    /// Number of groups including group 0.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether no groups were recorded.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Iterates all groups in order.
    pub fn iter(&self) -> impl Iterator<Item = Option<&str>> {
        self.groups.iter().map(|g| g.as_deref())
    }
}

/// A compiled directed-listener pattern.
#[derive(Debug, Clone)]
pub struct ResponderPattern {
    regex: Regex,
    leading_anchor: bool,
}

impl ResponderPattern {
    /// Builds the anchored pattern for `user_pattern` addressed to `name` or `alias`.
    pub fn build(name: &str, alias: Option<&str>, user_pattern: &str) -> Result<Self, PatternError> {
        let (flags, body) = split_leading_flags(user_pattern);
        let leading_anchor = body.starts_with('^') || body.starts_with("\\A");

        let name = regex::escape(name);
        let prefix = match alias {
            Some(alias) => format!("(?:{}[:,]?|{name}[:,]?)", regex::escape(alias)),
            None => format!("(?:{name})[:,]?"),
        };

        // Hoisted flags must not turn on verbose mode for the escaped names.
        let source = format!("{flags}^(?-x:[@]?{prefix})\\s*(?:{body})");
        let regex = Regex::new(&source)?;
        Ok(Self {
            regex,
            leading_anchor,
        })
    }

    /// The compiled pattern.
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Consumes the pattern, returning the compiled regex.
    pub fn into_regex(self) -> Regex {
        self.regex
    }

    /// Whether the user pattern began with a start anchor.
    ///
    /// Such a pattern can never match once wrapped.
    pub fn leading_anchor(&self) -> bool {
        self.leading_anchor
    }

    /// The full pattern source.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

/// Splits leading flag-only groups such as `(?i)` from the rest of a pattern.
fn split_leading_flags(pattern: &str) -> (&str, &str) {
    let mut end = 0;
    let bytes = pattern.as_bytes();
    while pattern[end..].starts_with("(?") {
        let rest = &bytes[end + 2..];
        let Some(close) = rest.iter().position(|&b| b == b')') else {
            break;
        };
        let flags = &rest[..close];
        if flags.is_empty() || !flags.iter().all(|b| b.is_ascii_alphabetic() || *b == b'-') {
            break;
        }
        end += 2 + close + 1;
    }
    pattern.split_at(end)
}

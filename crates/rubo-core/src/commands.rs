//! Command help registry.
//!
//! Plugins describe the commands they understand with one line each. Lines
//! can be added directly or extracted from a plugin's leading comment block:
//!
//! ```text
//! //! Description:
//! //!   Replies to pings.
//! //!
//! //! Commands:
//! //!   rubo ping - Reply with PONG
//! //!   rubo echo <text> - Reply back with <text>
//! ```

use std::collections::BTreeMap;

const COMMENT_MARKERS: [&str; 4] = ["//!", "///", "//", "#"];

/// Sorted list of human-readable command summaries.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    lines: Vec<String>,
}

impl CommandRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a command line.
    pub fn add(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Appends several command lines.
    pub fn extend<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lines.extend(lines.into_iter().map(Into::into));
    }

    /// All command lines, sorted. Duplicates are kept.
    pub fn commands(&self) -> Vec<String> {
        let mut lines = self.lines.clone();
        lines.sort();
        lines
    }

    /// Number of registered lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Documentation sections pulled from a plugin's header comment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HelpDocumentation {
    sections: BTreeMap<String, Vec<String>>,
}

impl HelpDocumentation {
    /// Parses the leading comment block of `source`.
    ///
    /// Blank lines are skipped; the first non-comment line ends the block.
    pub fn parse(source: &str) -> Self {
        let mut sections: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut current: Option<String> = None;

        for raw in source.lines() {
            let line = raw.trim_start();
            if line.is_empty() {
                continue;
            }
            let Some(cleaned) = strip_comment_marker(line) else {
                break;
            };
            let cleaned = cleaned.trim();
            if cleaned.is_empty() || cleaned.eq_ignore_ascii_case("none") {
                continue;
            }

            if let Some(name) = section_header(cleaned) {
                let name = name.to_lowercase();
                sections.entry(name.clone()).or_default();
                current = Some(name);
            } else if let Some(section) = &current {
                sections
                    .entry(section.clone())
                    .or_default()
                    .push(cleaned.to_string());
            }
        }

        Self { sections }
    }

    /// Lines of the `commands` section.
    pub fn commands(&self) -> &[String] {
        self.section("commands")
    }

    /// Lines of any section, by lower-case name.
    pub fn section(&self, name: &str) -> &[String] {
        self.sections.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Names of all sections found.
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }
}

/// Returns `word` for a line of the form `word:`.
fn section_header(line: &str) -> Option<&str> {
    let word = line.strip_suffix(':')?;
    let is_word = !word.is_empty() && word.chars().all(|c| c.is_alphanumeric() || c == '_');
    is_word.then_some(word)
}

fn strip_comment_marker(line: &str) -> Option<&str> {
    // `#[...]` and `#![...]` are Rust attributes.
    if line.starts_with("#[") || line.starts_with("#![") {
        return None;
    }
    COMMENT_MARKERS.iter().find_map(|marker| {
        line.strip_prefix(marker)
            .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_are_sorted() {
        let mut registry = CommandRegistry::new();
        registry.add("x - does x");
        registry.add("a - does a");
        assert_eq!(registry.commands(), vec!["a - does a", "x - does x"]);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut registry = CommandRegistry::new();
        registry.extend(["b", "a", "b"]);
        assert_eq!(registry.commands(), vec!["a", "b", "b"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_parse_rust_doc_header() {
        let source = "\
//! Description:
//!   Replies to pings.
//!
//! Commands:
//!   rubo ping - Reply with PONG
//!   rubo echo <text> - Reply back with <text>
//!
//! Author:
//!   someone

use rubo::prelude::*;
// Later:
// not scanned
";
        let doc = HelpDocumentation::parse(source);
        assert_eq!(
            doc.commands(),
            ["rubo ping - Reply with PONG", "rubo echo <text> - Reply back with <text>"]
        );
        assert_eq!(doc.section("description"), ["Replies to pings."]);
        assert_eq!(doc.section("author"), ["someone"]);
        assert!(doc.section("later").is_empty());
    }

    #[test]
    fn test_parse_hash_comments_and_none() {
        let source = "# Commands:\n#   None\n# Notes:\n#   keep me\n";
        let doc = HelpDocumentation::parse(source);
        assert!(doc.commands().is_empty());
        assert_eq!(doc.section("notes"), ["keep me"]);
    }

    #[test]
    fn test_attributes_end_the_block() {
        let source = "\
//! Commands:
//!   rubo ping - Reply with PONG

#[derive(Debug, Default)]
struct Settings;
";
        assert_eq!(
            HelpDocumentation::parse(source).commands(),
            ["rubo ping - Reply with PONG"]
        );

        let inner = "//! Commands:\n//!   rubo ping - Reply with PONG\n#![allow(dead_code)]\n";
        assert_eq!(
            HelpDocumentation::parse(inner).commands(),
            ["rubo ping - Reply with PONG"]
        );
    }

    #[test]
    fn test_repeated_header_keeps_earlier_lines() {
        let doc = HelpDocumentation::parse("// Commands:\n// a - does a\n// Commands:\n// b - does b\n");
        assert_eq!(doc.commands(), ["a - does a", "b - does b"]);
    }

    #[test]
    fn test_lines_before_any_section_are_ignored() {
        let doc = HelpDocumentation::parse("// stray line\n// Commands:\n// hi - says hi\n");
        assert_eq!(doc.commands(), ["hi - says hi"]);
        assert_eq!(doc.section_names().count(), 1);
    }

    #[test]
    fn test_header_needs_single_word() {
        let doc = HelpDocumentation::parse("// Commands:\n// rubo x: does x\n");
        assert_eq!(doc.commands(), ["rubo x: does x"]);
    }
}

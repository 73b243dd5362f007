//! Banner Patterns
//!
//! What an `expect` call is waiting for, described as a value rather than a
//! hand-escaped regular expression at every call site.

use regex::Regex;
use std::fmt;
use std::ops::Range;

use crate::error::Result;

#[derive(Debug, Clone)]
pub enum Pattern {
    /// Plain substring
    Literal(String),
    /// Text at the start of a line
    LineStart(String),
    /// Compiled expression with a human-readable description
    Regex { regex: Regex, description: String },
}

impl Pattern {
    /// Match `text` anywhere in the stream
    pub fn literal(text: impl Into<String>) -> Self {
        Pattern::Literal(text.into())
    }

    /// Match `text` only when it ends a line (trailing blanks allowed)
    ///
    /// The terminator must have arrived, so `usage: E` never matches a
    /// partially received `usage: ESC` and `Sign Encrypt` never matches a
    /// partially received `Sign Encrypt Authenticate`.
    pub fn line_tail(text: &str) -> Result<Self> {
        let expr = format!(r"{}[ \t]*\r?\n", regex::escape(text));
        Ok(Pattern::Regex {
            regex: Regex::new(&expr)?,
            description: format!("{} (end of line)", text),
        })
    }

    /// Match `text` at the start of a line
    pub fn line_start(text: impl Into<String>) -> Self {
        Pattern::LineStart(text.into())
    }

    /// Match an arbitrary regular expression
    pub fn regex(expr: &str, description: impl Into<String>) -> Result<Self> {
        Ok(Pattern::Regex {
            regex: Regex::new(expr)?,
            description: description.into(),
        })
    }

    /// Byte range of the first match in `haystack`, which begins a line
    pub fn find(&self, haystack: &str) -> Option<Range<usize>> {
        self.find_at(haystack, true)
    }

    /// Byte range of the first match in `haystack`
    ///
    /// `at_line_start` tells whether the first byte of `haystack` begins a
    /// line; a session's unconsumed output often starts mid-line.
    pub fn find_at(&self, haystack: &str, at_line_start: bool) -> Option<Range<usize>> {
        match self {
            Pattern::Literal(text) => haystack
                .find(text.as_str())
                .map(|start| start..start + text.len()),
            Pattern::LineStart(text) => haystack
                .match_indices(text.as_str())
                .map(|(start, _)| start)
                .find(|&start| {
                    if start == 0 {
                        at_line_start
                    } else {
                        haystack.as_bytes()[start - 1] == b'\n'
                    }
                })
                .map(|start| start..start + text.len()),
            Pattern::Regex { regex, .. } => regex.find(haystack).map(|m| m.range()),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Pattern::Literal(text) => text.clone(),
            Pattern::LineStart(text) => format!("{} (start of line)", text),
            Pattern::Regex { description, .. } => description.clone(),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.describe())
    }
}

impl From<&str> for Pattern {
    fn from(text: &str) -> Self {
        Pattern::literal(text)
    }
}

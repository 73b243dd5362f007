//! Status Line Recognition
//!
//! The peer reports machine-readable status on a dedicated descriptor. Each
//! status line has the shape `[PREFIX] KEYWORD args...` and ends with a
//! newline. Because the status descriptor shares the PTY with the peer's
//! human-readable output, a status line may begin mid-line; only its end is
//! reliable.

use std::fmt;
use std::ops::Range;

/// Default status prefix used by GnuPG
pub const DEFAULT_STATUS_PREFIX: &str = "GNUPG:";

/// How the peer wants a prompt answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    /// `GET_LINE` - free-form line input
    Line,
    /// `GET_HIDDEN` - secret input
    Hidden,
    /// `GET_BOOL` - yes/no input
    Bool,
}

impl PromptKind {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "GET_LINE" => Some(PromptKind::Line),
            "GET_HIDDEN" => Some(PromptKind::Hidden),
            "GET_BOOL" => Some(PromptKind::Bool),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            PromptKind::Line => "GET_LINE",
            PromptKind::Hidden => "GET_HIDDEN",
            PromptKind::Bool => "GET_BOOL",
        }
    }
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// One recognized status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusToken {
    /// The peer asks for a named field
    Prompt { kind: PromptKind, field: String },
    /// `GOT_IT` - the last reply was accepted
    Ack,
    /// `KEY_CREATED <kind> <identifier>`
    KeyCreated { kind: String, identifier: String },
    /// Any other status keyword
    Other { keyword: String, args: Vec<String> },
}

impl StatusToken {
    pub fn is_prompt(&self) -> bool {
        matches!(self, StatusToken::Prompt { .. })
    }

    /// Field name if this is a prompt request for exactly `field`
    pub fn is_prompt_for(&self, field: &str) -> bool {
        matches!(self, StatusToken::Prompt { field: f, .. } if f == field)
    }
}

impl fmt::Display for StatusToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusToken::Prompt { kind, field } => write!(f, "{} {}", kind, field),
            StatusToken::Ack => f.write_str("GOT_IT"),
            StatusToken::KeyCreated { kind, identifier } => {
                write!(f, "KEY_CREATED {} {}", kind, identifier)
            }
            StatusToken::Other { keyword, args } if args.is_empty() => f.write_str(keyword),
            StatusToken::Other { keyword, args } => write!(f, "{} {}", keyword, args.join(" ")),
        }
    }
}

/// A status token together with where it sits in the scanned text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedToken {
    /// From the first byte of the prefix through the terminating newline
    pub span: Range<usize>,
    pub token: StatusToken,
}

/// Recognizes status lines carrying a fixed prefix
#[derive(Debug, Clone)]
pub struct StatusParser {
    /// Full marker including brackets and trailing space, e.g. `[GNUPG:] `
    marker: String,
}

impl StatusParser {
    /// Create a parser for `prefix` (without brackets, e.g. `GNUPG:`)
    pub fn new(prefix: &str) -> Self {
        Self {
            marker: format!("[{}] ", prefix),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Render a status line the way the peer would emit it
    pub fn render(&self, token: &StatusToken) -> String {
        format!("{}{}\n", self.marker, token)
    }

    /// Classify the body of a status line (the part after the marker)
    pub fn parse_body(body: &str) -> Option<StatusToken> {
        let mut parts = body.split_whitespace();
        let keyword = parts.next()?;
        let args: Vec<&str> = parts.collect();

        if let Some(kind) = PromptKind::from_keyword(keyword) {
            return match args.as_slice() {
                [field] => Some(StatusToken::Prompt {
                    kind,
                    field: field.to_string(),
                }),
                _ => None,
            };
        }

        match (keyword, args.as_slice()) {
            ("GOT_IT", []) => Some(StatusToken::Ack),
            ("KEY_CREATED", [kind, identifier, ..]) => Some(StatusToken::KeyCreated {
                kind: kind.to_string(),
                identifier: identifier.to_string(),
            }),
            _ => Some(StatusToken::Other {
                keyword: keyword.to_string(),
                args: args.iter().map(|s| s.to_string()).collect(),
            }),
        }
    }

    /// Parse a single complete line
    pub fn parse_line(&self, line: &str) -> Option<StatusToken> {
        let start = line.find(&self.marker)?;
        let body = line[start + self.marker.len()..].trim_end_matches(['\r', '\n']);
        Self::parse_body(body)
    }

    /// All complete status lines in `text`, in stream order
    ///
    /// A marker without a following newline is an incomplete line and ends
    /// the scan; it will be classified once the rest arrives.
    pub fn scan<'a>(&'a self, text: &'a str) -> impl Iterator<Item = LocatedToken> + 'a {
        let mut offset = 0;
        std::iter::from_fn(move || loop {
            let rel = text[offset..].find(&self.marker)?;
            let start = offset + rel;
            let body_start = start + self.marker.len();
            let newline = text[body_start..].find('\n')?;
            let end = body_start + newline + 1;
            offset = end;

            let body = text[body_start..body_start + newline].trim_end_matches('\r');
            if let Some(token) = Self::parse_body(body) {
                return Some(LocatedToken {
                    span: start..end,
                    token,
                });
            }
        })
    }

    /// First complete prompt request in `text`
    pub fn first_prompt(&self, text: &str) -> Option<LocatedToken> {
        self.scan(text).find(|located| located.token.is_prompt())
    }
}

impl Default for StatusParser {
    fn default() -> Self {
        Self::new(DEFAULT_STATUS_PREFIX)
    }
}

//! Tokenizer for raw configuration lines.
//!
//! A line such as
//!
//! ```text
//! ifconfig_em0 = "inet 10.0.0.4 netmask 255.255.255.0";   # uplink
//! ```
//!
//! is split on a configurable set of delimiter characters into
//! `["ifconfig_em0", "inet", "10.0.0.4", "netmask", "255.255.255.0", "#", "uplink"]`.
//!
//! # How the split works (for beginners)
//!
//! Every character of the line is either a *delimiter* (space, tab, `=`, `:`,
//! `;`, quotes, ...) or part of a token.  Leading delimiters are skipped, and
//! every maximal run of delimiters ends the current token.  Because the
//! delimiters are thrown away, a token can never contain one, and there is no
//! escaping: `"a b"` is two tokens, not one.
//!
//! The tokenizer never fails.  A line made only of delimiters (or an empty
//! line) simply produces no tokens.

use std::fmt;
use std::ops::{Deref, Range};

/// Delimiters used when the caller does not supply its own set.
///
/// Space, tab, carriage return, newline, both quote characters, and the
/// `=`, `:` and `;` punctuation of `key = value;` lines.
pub const DEFAULT_DELIMITERS: &str = " \t\r\n\"':=;";

// ── Token ─────────────────────────────────────────────────────────────────────

/// One delimiter-free unit of text.
///
/// Tokens are immutable once produced.  They deref to `str`, so all the usual
/// string methods are available without unwrapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(String);

impl Token {
    /// Wraps `text` as a token.
    ///
    /// The tokenizer is the normal producer of tokens; this constructor is for
    /// callers that already hold delimiter-free text (request values, tests).
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Returns the token text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` when this token opens an inline comment (`#...`).
    pub fn is_comment(&self) -> bool {
        self.0.starts_with('#')
    }
}

impl Deref for Token {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `pad` honours width and alignment, e.g. `{:<10}` in listings.
        f.pad(&self.0)
    }
}

impl From<&str> for Token {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}

impl From<String> for Token {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl PartialEq<str> for Token {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Token {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

// ── Delimiters ────────────────────────────────────────────────────────────────

/// The set of characters that separate tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
    chars: Vec<char>,
}

impl Delimiters {
    /// Builds a delimiter set from every character of `chars`.
    ///
    /// Duplicate characters are collapsed.
    pub fn new(chars: &str) -> Self {
        let mut set: Vec<char> = Vec::with_capacity(chars.len());
        for ch in chars.chars() {
            if !set.contains(&ch) {
                set.push(ch);
            }
        }
        Self { chars: set }
    }

    /// Returns `true` if `ch` separates tokens.
    pub fn contains(&self, ch: char) -> bool {
        self.chars.contains(&ch)
    }

    /// Returns `true` if the set has no characters (the whole line is one token).
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Returns the delimiter characters as a string, in insertion order.
    pub fn as_string(&self) -> String {
        self.chars.iter().collect()
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITERS)
    }
}

impl From<&str> for Delimiters {
    fn from(chars: &str) -> Self {
        Self::new(chars)
    }
}

// ── Tokenizing ────────────────────────────────────────────────────────────────

/// A token together with the byte range it occupies in the source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub range: Range<usize>,
    pub token: Token,
}

/// Splits `line` into tokens, keeping each token's byte range.
///
/// The Layout Analyzer uses the ranges to find where an inline comment starts
/// in the raw line.
pub fn tokenize_spans(line: &str, delimiters: &Delimiters) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;

    for (idx, ch) in line.char_indices() {
        if delimiters.contains(ch) {
            if let Some(begin) = start.take() {
                spans.push(Span {
                    range: begin..idx,
                    token: Token::from(&line[begin..idx]),
                });
            }
        } else if start.is_none() {
            start = Some(idx);
        }
    }

    if let Some(begin) = start {
        spans.push(Span {
            range: begin..line.len(),
            token: Token::from(&line[begin..]),
        });
    }

    spans
}

/// Splits `line` into tokens on maximal runs of `delimiters`.
///
/// # Examples
///
/// ```rust
/// use sysconf_core::domain::token::{tokenize, Delimiters};
///
/// let tokens = tokenize("key=value", &Delimiters::new("="));
/// assert_eq!(tokens, ["key", "value"]);
///
/// assert!(tokenize("  ;;  ", &Delimiters::default()).is_empty());
/// ```
pub fn tokenize(line: &str, delimiters: &Delimiters) -> Vec<Token> {
    tokenize_spans(line, delimiters)
        .into_iter()
        .map(|span| span.token)
        .collect()
}

// ── Comparison helpers ────────────────────────────────────────────────────────

/// Compares `a` and `b` over the length of the shorter one.
///
/// This is a **prefix match**, not equality: `"a"` matches `"abc"` and
/// `"abc"` matches `"a"`.  Value membership checks ([`contains`]) use it;
/// key lookups only do when asked to via
/// [`crate::domain::entry::KeyMatch::Prefix`].
pub fn prefix_match(a: &str, b: &str) -> bool {
    let len = a.len().min(b.len());
    a.as_bytes()[..len] == b.as_bytes()[..len]
}

/// Returns `true` if any token in `tokens` [`prefix_match`]es `needle`.
pub fn contains(tokens: &[Token], needle: &str) -> bool {
    tokens.iter().any(|token| prefix_match(token, needle))
}

/// Joins `tokens` with single spaces.
///
/// ```rust
/// use sysconf_core::domain::token::{assemble, Token};
///
/// let values = [Token::from("value"), Token::from("value2"), Token::from("value3")];
/// assert_eq!(assemble(&values), "value value2 value3");
/// ```
pub fn assemble(tokens: &[Token]) -> String {
    let mut out = String::with_capacity(tokens.iter().map(|t| t.len() + 1).sum());
    for (idx, token) in tokens.iter().enumerate() {
        if idx > 0 {
            out.push(' ');
        }
        out.push_str(token);
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────

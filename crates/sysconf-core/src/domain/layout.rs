//! Line-Layout Analyzer: recovers how a config line is formatted so that an
//! edited line can be written back in exactly the same style.
//!
//! # What gets recovered
//!
//! ```text
//!   ␣␣ifconfig_em0␣=␣␣"inet 10.0.0.4"␣;␣␣␣# uplink⏎
//!   ├┘└────┬─────┘│││└┬┘└──── values ───┘│││└┬┘└──┬───┘└ ending
//! indent   key   before │ after  quote   pad │trailing comment
//!               separator            terminator
//! ```
//!
//! - **separator** – `=`, `:`, or plain whitespace (`key value`).
//! - **before / after** – the exact whitespace around the separator.  Their
//!   widths are available through [`LineLayout::spaces_before`]
//!   and [`LineLayout::spaces_after`]; the strings themselves are kept so
//!   tabs survive a rewrite.
//! - **quote** – double or single quotes wrapping the value list.  A value
//!   region with exactly two `"` is double-quoted, exactly two `'` is
//!   single-quoted; any other count means unquoted.
//! - **terminator** – a trailing `;` on the value region.
//! - **inline comment** – everything from the first `#` token after the key.
//!
//! Separator detection looks at the first non-blank character after the key
//! rather than scanning the whole line, so a `:` inside a value
//! (`url = http://host`) or a `;` inside a comment does not change the style.

use serde::{Deserialize, Serialize};

use crate::domain::token::{assemble, tokenize, tokenize_spans, Delimiters, Token};

// ── Style enums ───────────────────────────────────────────────────────────────

/// Character between a key and its values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Separator {
    #[default]
    #[serde(alias = "=")]
    Equals,
    #[serde(alias = ":")]
    Colon,
    /// `key value` form; the whitespace run itself separates.
    #[serde(alias = " ")]
    Space,
}

impl Separator {
    pub fn as_char(self) -> char {
        match self {
            Separator::Equals => '=',
            Separator::Colon => ':',
            Separator::Space => ' ',
        }
    }

    fn from_char(ch: char) -> Option<Self> {
        match ch {
            '=' => Some(Separator::Equals),
            ':' => Some(Separator::Colon),
            _ => None,
        }
    }
}

/// Quoting around the whole value list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quote {
    None,
    #[serde(alias = "\"")]
    Double,
    #[serde(alias = "'")]
    Single,
}

impl Quote {
    pub fn as_str(self) -> &'static str {
        match self {
            Quote::None => "",
            Quote::Double => "\"",
            Quote::Single => "'",
        }
    }
}

/// What closes the value list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Terminator {
    #[default]
    None,
    #[serde(alias = ";")]
    Semicolon,
}

impl Terminator {
    pub fn as_str(self) -> &'static str {
        match self {
            Terminator::None => "",
            Terminator::Semicolon => ";",
        }
    }
}

/// Line ending of the physical line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineEnding {
    /// Last line of a file without a trailing newline.
    None,
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::None => "",
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }

    /// Splits `raw` into its body and line ending.
    pub fn split(raw: &str) -> (&str, LineEnding) {
        if let Some(body) = raw.strip_suffix("\r\n") {
            (body, LineEnding::CrLf)
        } else if let Some(body) = raw.strip_suffix('\n') {
            (body, LineEnding::Lf)
        } else {
            (raw, LineEnding::None)
        }
    }
}

/// Style applied to keys that do not exist yet and are appended to a file.
///
/// The default renders `key="value1 value2"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewEntryStyle {
    pub separator: Separator,
    pub quote: Quote,
    pub terminator: Terminator,
}

impl Default for NewEntryStyle {
    fn default() -> Self {
        Self {
            separator: Separator::Equals,
            quote: Quote::Double,
            terminator: Terminator::None,
        }
    }
}

// ── Inline comment ────────────────────────────────────────────────────────────

/// Trailing `# ...` text of a line, kept verbatim from the `#` to the end
/// of the line body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineComment {
    /// Byte offset of the `#` within the line.
    pub offset: usize,
    pub text: String,
}

impl InlineComment {
    /// The comment split into tokens, starting with the `#` token.
    pub fn tokens(&self, delimiters: &Delimiters) -> Vec<Token> {
        tokenize(&self.text, delimiters)
    }
}

// ── LineLayout ────────────────────────────────────────────────────────────────

/// Formatting recovered from one raw config line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineLayout {
    pub indent: String,
    /// Key exactly as written in the line.
    pub key: String,
    pub before: String,
    pub separator: Separator,
    pub after: String,
    pub quote: Quote,
    /// Whitespace between the value list and the terminator.
    pub pad: String,
    pub terminator: Terminator,
    /// Whitespace after the terminator, up to the comment or the line end.
    pub trailing: String,
    pub comment: Option<InlineComment>,
    pub ending: LineEnding,
}

impl LineLayout {
    /// Recovers the layout of `raw_line`, whose first token is the key.
    ///
    /// `raw_line` may include its line ending.  The analyzer never fails:
    /// a line that does not look like `key <sep> values` is described as
    /// well as possible (for example a bare `key` has a space separator and
    /// no values).
    pub fn analyze(raw_line: &str, delimiters: &Delimiters) -> Self {
        let (body, ending) = LineEnding::split(raw_line);
        let spans = tokenize_spans(body, delimiters);

        // Key: the first token, wherever it starts.  Whatever precedes it,
        // whitespace or an opening quote, is kept as indentation.
        let (indent_len, mut cursor) = match spans.first() {
            Some(span) => (span.range.start, span.range.end),
            None => {
                let blank = body.len() - body.trim_start().len();
                (blank, blank)
            }
        };
        let indent = &body[..indent_len];
        let key_text = &body[indent_len..cursor];

        // The quote closing a quoted key, whitespace, then an explicit
        // separator if there is one.
        let closing = match indent.chars().last() {
            Some(q @ ('"' | '\'')) if body[cursor..].starts_with(q) => q.len_utf8(),
            _ => 0,
        };
        let ws = scan_while(&body[cursor + closing..], char::is_whitespace);
        let gap = &body[cursor..cursor + closing + ws];
        cursor += closing + ws;

        let next = body[cursor..].chars().next();
        let (before, separator, after) = match next.and_then(Separator::from_char) {
            Some(sep) => {
                cursor += 1;
                let after_len = scan_while(&body[cursor..], char::is_whitespace);
                let after = &body[cursor..cursor + after_len];
                cursor += after_len;
                (gap, sep, after)
            }
            None => ("", Separator::Space, gap),
        };

        // Inline comment: the first `#` token after the key.
        let comment_start = spans
            .iter()
            .skip(1)
            .find(|span| span.token.is_comment() && span.range.start >= cursor)
            .map(|span| span.range.start);

        let region_end = comment_start.unwrap_or(body.len());
        let region = &body[cursor..region_end];
        let trimmed = region.trim_end();
        let trailing = &region[trimmed.len()..];
        let comment = comment_start.map(|start| InlineComment {
            offset: start,
            text: body[start..].to_string(),
        });

        // Terminator and the whitespace that precedes it.
        let (values_region, pad, terminator) = match trimmed.strip_suffix(';') {
            Some(rest) => {
                let values = rest.trim_end();
                (values, &rest[values.len()..], Terminator::Semicolon)
            }
            None => (trimmed, "", Terminator::None),
        };

        let quote = detect_quote(values_region);

        Self {
            indent: indent.to_string(),
            key: key_text.to_string(),
            before: before.to_string(),
            separator,
            after: after.to_string(),
            quote,
            pad: pad.to_string(),
            terminator,
            trailing: trailing.to_string(),
            comment,
            ending,
        }
    }

    /// Layout for a key that does not exist in the file yet.
    pub fn for_new_entry(key: &str, style: &NewEntryStyle) -> Self {
        Self {
            indent: String::new(),
            key: key.to_string(),
            before: String::new(),
            separator: style.separator,
            after: String::new(),
            quote: style.quote,
            pad: String::new(),
            terminator: style.terminator,
            trailing: String::new(),
            comment: None,
            ending: LineEnding::Lf,
        }
    }

    /// Number of whitespace characters between the key and the separator.
    pub fn spaces_before(&self) -> usize {
        self.before.chars().filter(|ch| ch.is_whitespace()).count()
    }

    /// Number of whitespace characters between the separator and the values.
    ///
    /// For whitespace-separated lines this is the whole run between key and
    /// values.
    pub fn spaces_after(&self) -> usize {
        self.after.chars().filter(|ch| ch.is_whitespace()).count()
    }

    /// Renders `values` in this layout, including the inline comment and the
    /// line ending.
    pub fn render(&self, values: &[Token]) -> String {
        let mut line = self.render_values(values);
        if let Some(comment) = &self.comment {
            line.push_str(&comment.text);
        }
        line.push_str(self.ending.as_str());
        line
    }

    /// Renders the line up to, but not including, the inline comment.
    ///
    /// Without a comment this is everything except the line ending.
    pub fn render_values(&self, values: &[Token]) -> String {
        let joined = assemble(values);
        let mut line = String::with_capacity(self.key.len() + joined.len() + 16);

        line.push_str(&self.indent);
        line.push_str(&self.key);
        line.push_str(&self.before);
        match self.separator {
            Separator::Space => {
                if self.after.is_empty() {
                    line.push(' ');
                }
            }
            sep => line.push(sep.as_char()),
        }
        line.push_str(&self.after);
        line.push_str(self.quote.as_str());
        line.push_str(&joined);
        line.push_str(self.quote.as_str());
        line.push_str(&self.pad);
        line.push_str(self.terminator.as_str());
        line.push_str(&self.trailing);
        line
    }
}

/// Byte length of the longest prefix of `text` whose chars satisfy `pred`.
fn scan_while(text: &str, pred: impl Fn(char) -> bool) -> usize {
    text.char_indices()
        .find(|&(_, ch)| !pred(ch))
        .map_or(text.len(), |(idx, _)| idx)
}

fn detect_quote(region: &str) -> Quote {
    let double = region.matches('"').count();
    let single = region.matches('\'').count();
    if single == 2 {
        Quote::Single
    } else if double == 2 {
        Quote::Double
    } else {
        Quote::None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

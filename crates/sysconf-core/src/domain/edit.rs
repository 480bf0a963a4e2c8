//! Value Editor: turns a requested change into the new value list of an entry.
//!
//! Requests come from expressions such as
//!
//! | Expression          | Meaning                                         |
//! |---------------------|-------------------------------------------------|
//! | `key`               | look the key up                                 |
//! | `key=a b`           | replace the values with `a b`                   |
//! | `key a b`           | same as `key=a b`                               |
//! | `key+=c`            | append `c` unless it is already present         |
//! | `key-=a`            | remove `a`; removing the last value drops the line |
//!
//! Membership uses [`contains`], i.e. the shorter-length prefix compare, so
//! removing `a` also removes `abc`.

use thiserror::Error;

use crate::domain::token::{contains, prefix_match, tokenize, Delimiters, Token};

/// Modifier characters accepted in front of `=` but not implemented.
const UNSUPPORTED_MODIFIERS: &[char] = &['*', '/', '?', '!', '%', '^', '&', '|'];

/// Error raised while parsing a request expression.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("no key given")]
    MissingKey,

    #[error("no value given for `{key}`")]
    MissingValue { key: String },

    #[error("unsupported modifier `{modifier}=` on `{key}`")]
    UnsupportedModifier { key: String, modifier: char },
}

// ── Requests ──────────────────────────────────────────────────────────────────

/// Kind of change applied to an entry's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOp {
    Replace,
    Append,
    Remove,
}

impl EditOp {
    /// Operator as written in a request (`=`, `+=`, `-=`).
    pub fn symbol(self) -> &'static str {
        match self {
            EditOp::Replace => "=",
            EditOp::Append => "+=",
            EditOp::Remove => "-=",
        }
    }
}

/// A change to apply to one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRequest {
    key: String,
    op: EditOp,
    values: Vec<Token>,
}

impl EditRequest {
    pub fn new(key: impl Into<String>, op: EditOp, values: Vec<Token>) -> Self {
        Self {
            key: key.into(),
            op,
            values,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn op(&self) -> EditOp {
        self.op
    }

    pub fn values(&self) -> &[Token] {
        &self.values
    }

    /// Computes the new value list for an entry currently holding `current`.
    pub fn apply(&self, current: &[Token]) -> EditOutcome {
        apply_edit(current, self)
    }
}

/// What the caller asked for on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Lookup { key: String },
    Edit(EditRequest),
}

impl Request {
    /// Parses positional words such as `["key+=a", "b"]`.
    ///
    /// The words are joined with single spaces first, so `key=a b` and
    /// `key=a` `b` are the same request.
    ///
    /// # Errors
    ///
    /// [`RequestError::MissingKey`] for an empty expression or `=value`,
    /// [`RequestError::MissingValue`] for `key=` / `key+=` / `key-=`, and
    /// [`RequestError::UnsupportedModifier`] for operators like `key*=v`.
    pub fn parse<S: AsRef<str>>(words: &[S], delimiters: &Delimiters) -> Result<Self, RequestError> {
        let joined = words
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<&str>>()
            .join(" ");
        let expr = joined.trim();
        if expr.is_empty() {
            return Err(RequestError::MissingKey);
        }

        if let Some(pos) = expr.find('=').or_else(|| expr.find(':')) {
            let (key, modifier) = split_modifier(expr[..pos].trim());
            if !key.contains(char::is_whitespace) {
                return parse_operator(key, modifier, &expr[pos + 1..], delimiters);
            }
        }

        // `key` alone, or the `key value...` form.
        let mut tokens = tokenize(expr, delimiters).into_iter();
        let key = tokens.next().ok_or(RequestError::MissingKey)?;
        let values: Vec<Token> = tokens.collect();
        if values.is_empty() {
            Ok(Request::Lookup {
                key: key.as_str().to_string(),
            })
        } else {
            Ok(Request::Edit(EditRequest::new(
                key.as_str(),
                EditOp::Replace,
                values,
            )))
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Request::Lookup { key } => key,
            Request::Edit(edit) => edit.key(),
        }
    }
}

/// Splits the operator character off the left-hand side, so `key +` and
/// `key+` both name `key`.
fn split_modifier(lhs: &str) -> (&str, Option<char>) {
    match lhs.chars().last() {
        Some(ch) if ch == '+' || ch == '-' || UNSUPPORTED_MODIFIERS.contains(&ch) => {
            (lhs[..lhs.len() - ch.len_utf8()].trim_end(), Some(ch))
        }
        _ => (lhs, None),
    }
}

fn parse_operator(
    key: &str,
    modifier: Option<char>,
    rhs: &str,
    delimiters: &Delimiters,
) -> Result<Request, RequestError> {
    let op = match modifier {
        None => EditOp::Replace,
        Some('+') => EditOp::Append,
        Some('-') => EditOp::Remove,
        Some(modifier) => {
            return Err(RequestError::UnsupportedModifier {
                key: key.to_string(),
                modifier,
            });
        }
    };

    if key.is_empty() {
        return Err(RequestError::MissingKey);
    }

    let values = tokenize(rhs, delimiters);
    if values.is_empty() {
        return Err(RequestError::MissingValue {
            key: key.to_string(),
        });
    }

    Ok(Request::Edit(EditRequest::new(key, op, values)))
}

// ── Editing ───────────────────────────────────────────────────────────────────

/// Result of applying an [`EditRequest`] to an entry's values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// The entry now holds these values.
    Changed(Vec<Token>),
    /// Nothing to do: the values are already what was asked for.
    Unchanged,
    /// A removal named only values that are not present.
    ValueNotFound,
    /// The removal emptied the entry; its line should be dropped.
    EntryRemoved,
}

impl EditOutcome {
    /// Returns `true` if the file has to be rewritten.
    pub fn modifies_file(&self) -> bool {
        matches!(self, EditOutcome::Changed(_) | EditOutcome::EntryRemoved)
    }
}

/// Computes the new value list of an entry holding `current`.
pub fn apply_edit(current: &[Token], request: &EditRequest) -> EditOutcome {
    match request.op() {
        EditOp::Replace => {
            if request.values() == current {
                EditOutcome::Unchanged
            } else {
                EditOutcome::Changed(request.values().to_vec())
            }
        }
        EditOp::Append => {
            let mut merged = current.to_vec();
            for value in request.values() {
                if !contains(&merged, value) {
                    merged.push(value.clone());
                }
            }
            if merged.len() == current.len() {
                EditOutcome::Unchanged
            } else {
                EditOutcome::Changed(merged)
            }
        }
        EditOp::Remove => {
            let kept: Vec<Token> = current
                .iter()
                .filter(|token| !request.values().iter().any(|gone| prefix_match(token, gone)))
                .cloned()
                .collect();
            if kept.len() == current.len() {
                EditOutcome::ValueNotFound
            } else if kept.is_empty() {
                EditOutcome::EntryRemoved
            } else {
                EditOutcome::Changed(kept)
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! Parsed entries and the in-memory config store.
//!
//! Every *eligible* line of a config file becomes one [`Entry`]: its first
//! token is the key, the following tokens are the values, and anything from
//! the first `#` token onward is kept aside as the inline comment.
//!
//! A line is eligible when, after leading whitespace, it is non-empty and
//! does not start with one of the comment markers `#`, `;`, `/`, `*`, `[`.
//! That covers shell comments, `;` comments, C-style `/* ... */` blocks and
//! INI-style `[section]` headers.  Braces of nested blocks (`jail {`, `}`)
//! are *not* special: they are parsed like any other line.

use serde::{Deserialize, Serialize};

use crate::domain::token::{prefix_match, tokenize, Delimiters, Token};

/// First characters (after leading whitespace) that mark a non-entry line.
pub const COMMENT_MARKERS: [char; 5] = ['#', ';', '/', '*', '['];

/// Returns `true` if `line` should be parsed into an [`Entry`].
pub fn is_eligible(line: &str) -> bool {
    match line.trim_start().chars().next() {
        None | Some('\0') => false,
        Some(ch) => !COMMENT_MARKERS.contains(&ch),
    }
}

// ── Key matching ──────────────────────────────────────────────────────────────

/// How a requested key is compared with the key of an entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyMatch {
    /// Keys must be identical.
    #[default]
    Exact,
    /// Keys match over the length of the shorter one, so `ifconfig` also
    /// finds `ifconfig_em0`.
    Prefix,
}

impl KeyMatch {
    /// Returns `true` if the entry key `candidate` answers a lookup for `key`.
    pub fn matches(self, candidate: &str, key: &str) -> bool {
        match self {
            KeyMatch::Exact => candidate == key,
            KeyMatch::Prefix => prefix_match(candidate, key),
        }
    }
}

// ── Entry ─────────────────────────────────────────────────────────────────────

/// One parsed `key value...` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    key: Token,
    values: Vec<Token>,
    comment: Option<Vec<Token>>,
    line: usize,
}

impl Entry {
    /// Parses `raw` (line number `line`, 1-based) into an entry.
    ///
    /// Returns `None` when the line yields no tokens at all.
    pub fn from_line(raw: &str, line: usize, delimiters: &Delimiters) -> Option<Self> {
        Self::from_tokens(tokenize(raw, delimiters), line)
    }

    /// Builds an entry from already tokenized text.
    ///
    /// The first token is the key.  Tokens from the first comment token
    /// onward become the inline comment.
    pub fn from_tokens(tokens: Vec<Token>, line: usize) -> Option<Self> {
        let mut iter = tokens.into_iter();
        let key = iter.next()?;
        let mut values: Vec<Token> = iter.collect();

        let comment = values
            .iter()
            .position(Token::is_comment)
            .map(|at| values.split_off(at));

        Some(Self {
            key,
            values,
            comment,
            line,
        })
    }

    pub fn key(&self) -> &Token {
        &self.key
    }

    /// Values after the key, stopping before any inline comment.
    pub fn values(&self) -> &[Token] {
        &self.values
    }

    /// Inline comment tokens, starting with the `#` token.
    pub fn comment(&self) -> Option<&[Token]> {
        self.comment.as_deref()
    }

    /// 1-based line number in the source file.
    pub fn line(&self) -> usize {
        self.line
    }

    /// All tokens in line order: key, values, then comment.
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        std::iter::once(&self.key)
            .chain(self.values.iter())
            .chain(self.comment.iter().flatten())
    }
}

// ── ConfigStore ───────────────────────────────────────────────────────────────

/// All entries of one config file, in file order.
///
/// Duplicate keys are stored as they appear; lookups return the first one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigStore {
    entries: Vec<Entry>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses every eligible line of `text`.
    ///
    /// No line-length limit applies to in-memory text; see
    /// [`crate::storage::reader::parse_file`] for the file variant.
    pub fn parse_str(text: &str, delimiters: &Delimiters) -> Self {
        let mut store = Self::new();
        for (idx, line) in text.lines().enumerate() {
            store.push_line(line, idx + 1, delimiters);
        }
        store
    }

    /// Parses `raw` and stores it if it is eligible and has at least one token.
    ///
    /// Returns `true` when an entry was stored.
    pub fn push_line(&mut self, raw: &str, line: usize, delimiters: &Delimiters) -> bool {
        if !is_eligible(raw) {
            return false;
        }
        match Entry::from_line(raw, line, delimiters) {
            Some(entry) => {
                self.entries.push(entry);
                true
            }
            None => false,
        }
    }

    pub fn push(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    /// Returns the first entry whose key is exactly `key`.
    pub fn find(&self, key: &str) -> Option<&Entry> {
        self.find_with(key, KeyMatch::Exact)
    }

    /// Returns the first entry whose key matches `key` under `policy`.
    pub fn find_with(&self, key: &str, policy: KeyMatch) -> Option<&Entry> {
        self.entries
            .iter()
            .find(|entry| policy.matches(entry.key(), key))
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a ConfigStore {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
/**
 * This is a test header
 * with multiple lines.
 */
item1 = value2;                 # comment string returned.
item2  = value2 subvalue2;

# shell comment
; semicolon comment
[section]
config {
       item3=value3;
   item5.subitem5 = /bin/sh /etc/rc;
}
item1 = duplicate;
";

    fn store() -> ConfigStore {
        ConfigStore::parse_str(SAMPLE, &Delimiters::default())
    }

    #[test]
    fn test_is_eligible_rejects_comment_markers_and_blank_lines() {
        for line in ["# c", "; c", "// c", "/* c", " * c", "[s]", "", "   \n", "\0"] {
            assert!(!is_eligible(line), "{line:?} must not be eligible");
        }
    }

    #[test]
    fn test_is_eligible_accepts_indented_entries_and_braces() {
        for line in ["key=value", "   key value", "}", "config {"] {
            assert!(is_eligible(line), "{line:?} must be eligible");
        }
    }

    #[test]
    fn test_parse_str_creates_one_entry_per_eligible_line() {
        // Act
        let store = store();

        // Assert: item1, item2, config, item3, item5.subitem5, }, item1
        assert_eq!(store.len(), 7);
        let keys: Vec<&str> = store.iter().map(|e| e.key().as_str()).collect();
        assert_eq!(
            keys,
            ["item1", "item2", "config", "item3", "item5.subitem5", "}", "item1"]
        );
    }

    #[test]
    fn test_parse_str_records_line_numbers() {
        let store = store();
        assert_eq!(store.find("item1").map(Entry::line), Some(5));
        assert_eq!(store.find("item3").map(Entry::line), Some(12));
    }

    #[test]
    fn test_entry_splits_inline_comment_from_values() {
        // Arrange
        let store = store();

        // Act
        let entry = store.find("item1").expect("item1 present");

        // Assert
        assert_eq!(entry.values(), ["value2"]);
        let comment: Vec<&str> = entry.comment().unwrap().iter().map(|t| t.as_str()).collect();
        assert_eq!(comment, ["#", "comment", "string", "returned."]);
    }

    #[test]
    fn test_entry_without_comment_has_none() {
        let store = store();
        let entry = store.find("item2").unwrap();
        assert_eq!(entry.values(), ["value2", "subvalue2"]);
        assert!(entry.comment().is_none());
    }

    #[test]
    fn test_find_returns_first_occurrence_of_duplicate_key() {
        let store = store();
        let entry = store.find("item1").unwrap();
        assert_eq!(entry.line(), 5);
        assert_eq!(entry.values(), ["value2"]);
    }

    #[test]
    fn test_find_exact_does_not_match_prefix() {
        let store = ConfigStore::parse_str("item10 = a\nitem1 = b\n", &Delimiters::default());
        assert_eq!(store.find("item1").unwrap().values(), ["b"]);
    }

    #[test]
    fn test_find_with_prefix_policy_matches_shorter_length() {
        // Arrange
        let store = ConfigStore::parse_str("item10 = a\nitem1 = b\n", &Delimiters::default());

        // Act
        let entry = store.find_with("item1", KeyMatch::Prefix).unwrap();

        // Assert: the compare stops at the shorter key, so item10 wins
        assert_eq!(entry.key(), &Token::from("item10"));
    }

    #[test]
    fn test_find_missing_key_returns_none() {
        assert!(store().find("nope").is_none());
    }

    #[test]
    fn test_delimiter_only_line_stores_no_entry() {
        let mut store = ConfigStore::new();
        assert!(!store.push_line(" == ;", 1, &Delimiters::default()));
        assert!(store.is_empty());
    }

    #[test]
    fn test_entry_tokens_iterates_key_values_and_comment() {
        let entry = Entry::from_line("k = a b # c", 1, &Delimiters::default()).unwrap();
        let all: Vec<&str> = entry.tokens().map(|t| t.as_str()).collect();
        assert_eq!(all, ["k", "a", "b", "#", "c"]);
    }

    #[test]
    fn test_key_match_deserializes_from_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            key_match: KeyMatch,
        }
        let parsed = from_single_field("prefix");
        assert_eq!(parsed.key_match, KeyMatch::Prefix);

        fn from_single_field(value: &str) -> Wrapper {
            use serde::de::value::{Error, MapDeserializer};
            let map = MapDeserializer::<_, Error>::new(std::iter::once(("key_match", value)));
            Wrapper::deserialize(map).expect("deserialize")
        }
    }
}

//! Line-oriented reader for config files.
//!
//! Files are read as raw bytes, one physical line at a time, so that the
//! Rewrite Engine can copy untouched lines back byte for byte.  Text is only
//! decoded (lossily) where a line has to be tokenized.

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::entry::{ConfigStore, KeyMatch};
use crate::domain::token::Delimiters;
use crate::storage::StorageError;

/// Default upper bound on a physical line, line ending included.
pub const MAX_LINE_LEN: usize = 1024;

/// Knobs shared by parsing and rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    pub delimiters: Delimiters,
    /// Longest accepted physical line in bytes, line ending included.
    pub max_line_len: usize,
    pub key_match: KeyMatch,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            delimiters: Delimiters::default(),
            max_line_len: MAX_LINE_LEN,
            key_match: KeyMatch::default(),
        }
    }
}

// ── Raw lines ─────────────────────────────────────────────────────────────────

/// One physical line with its 1-based number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    pub number: usize,
    /// The line's bytes, line ending included.
    pub bytes: Vec<u8>,
}

impl RawLine {
    /// The line decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// The line decoded with every invalid byte replaced by one `?`.
    ///
    /// Unlike [`text`](Self::text) this keeps byte offsets identical to
    /// `bytes`, so positions found in the text can slice the raw line.
    pub fn aligned_text(&self) -> Cow<'_, str> {
        if let Ok(text) = std::str::from_utf8(&self.bytes) {
            return Cow::Borrowed(text);
        }

        let mut text = String::with_capacity(self.bytes.len());
        let mut rest = self.bytes.as_slice();
        while !rest.is_empty() {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, tail) = rest.split_at(e.valid_up_to());
                    text.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    let bad = e.error_len().unwrap_or(tail.len());
                    text.extend(std::iter::repeat('?').take(bad));
                    rest = &tail[bad..];
                }
            }
        }
        Cow::Owned(text)
    }

    /// Returns `true` if the line ends with `\n`.
    pub fn has_newline(&self) -> bool {
        self.bytes.last() == Some(&b'\n')
    }
}

/// Iterator over the physical lines of a reader.
///
/// Yields [`StorageError::LineTooLong`] for the first line over the limit and
/// stops afterwards.
pub struct RawLines<R> {
    reader: R,
    path: PathBuf,
    limit: usize,
    number: usize,
    done: bool,
}

impl<R: BufRead> RawLines<R> {
    /// Wraps `reader`; `path` is only used in error values.
    pub fn new(reader: R, path: impl Into<PathBuf>, limit: usize) -> Self {
        Self {
            reader,
            path: path.into(),
            limit,
            number: 0,
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for RawLines<R> {
    type Item = Result<RawLine, StorageError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut bytes = Vec::new();
        match self.reader.read_until(b'\n', &mut bytes) {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(len) => {
                self.number += 1;
                if len > self.limit {
                    self.done = true;
                    return Some(Err(StorageError::LineTooLong {
                        path: self.path.clone(),
                        line: self.number,
                        len,
                        limit: self.limit,
                    }));
                }
                Some(Ok(RawLine {
                    number: self.number,
                    bytes,
                }))
            }
            Err(source) => {
                self.done = true;
                Some(Err(StorageError::Io {
                    path: self.path.clone(),
                    source,
                }))
            }
        }
    }
}

/// Opens `path` for line-by-line reading.
///
/// # Errors
///
/// [`StorageError::NotFound`] if the file does not exist, otherwise
/// [`StorageError::Io`].
pub fn open_lines(path: &Path, limit: usize) -> Result<RawLines<BufReader<File>>, StorageError> {
    let file = File::open(path).map_err(|e| StorageError::from_io(path, e))?;
    Ok(RawLines::new(BufReader::new(file), path, limit))
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parses every eligible line of `path` into a [`ConfigStore`].
///
/// # Errors
///
/// - [`StorageError::NotFound`] if the file does not exist.
/// - [`StorageError::Io`] for any other read failure.
/// - [`StorageError::LineTooLong`] if a line exceeds `options.max_line_len`.
///   Nothing is truncated; the whole parse fails.
pub fn parse_file(path: &Path, options: &ParseOptions) -> Result<ConfigStore, StorageError> {
    let mut store = ConfigStore::new();
    for line in open_lines(path, options.max_line_len)? {
        let line = line?;
        store.push_line(&line.text(), line.number, &options.delimiters);
    }
    debug!(path = %path.display(), entries = store.len(), "config file parsed");
    Ok(store)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! Rewrite Engine: edits one key of a config file in place.
//!
//! # How a rewrite works (for beginners)
//!
//! Editing a file by seeking and overwriting bytes is fragile: a crash
//! halfway through leaves a half-edited file.  Instead the engine
//!
//! 1. asks a [`StagingArea`] for a fresh file next to the target,
//! 2. streams every line of the original into it, replacing only the line
//!    that holds the key,
//! 3. flushes and syncs the staged copy, and
//! 4. renames it over the original.
//!
//! A rename within one filesystem is atomic, so other readers see either the
//! old file or the new one, never a mix.  If anything fails before step 4 the
//! staged copy is deleted by a drop guard and the original is untouched.
//!
//! Lines that do not hold the key are copied as raw bytes.  When the edit
//! leaves a value list unchanged the matching line is copied verbatim as
//! well, so a no-op edit is byte-for-byte invisible.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::edit::{EditOp, EditOutcome, EditRequest};
use crate::domain::entry::{is_eligible, ConfigStore, Entry};
use crate::domain::layout::{LineLayout, NewEntryStyle};
use crate::domain::token::{Delimiters, Token};
use crate::storage::reader::{open_lines, parse_file, ParseOptions, RawLine};
use crate::storage::StorageError;

// ── Staging ───────────────────────────────────────────────────────────────────

/// A staged file: where it lives and a writer for its contents.
///
/// Flushing `writer` must make the contents durable.
pub struct StagedFile {
    pub path: PathBuf,
    pub writer: Box<dyn Write>,
}

/// Source of staged files and the commit step that publishes them.
#[cfg_attr(test, mockall::automock)]
pub trait StagingArea {
    /// Creates an empty staged file that will later replace `target`.
    fn create(&self, target: &Path) -> io::Result<StagedFile>;

    /// Moves the fully written staged file over `target`.
    fn commit(&self, staged: &Path, target: &Path) -> io::Result<()>;
}

/// Stages files in the target's own directory as `.<name>.<uuid>.tmp`.
///
/// Keeping the staged file on the same filesystem as the target is what makes
/// the final rename atomic.  The random suffix keeps two concurrent runs from
/// sharing a staged file.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColocatedStaging;

impl ColocatedStaging {
    /// Path of a new staged file for `target`.
    pub fn staged_path(target: &Path) -> PathBuf {
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "sysconf".to_string());
        let file = format!(".{name}.{}.tmp", Uuid::new_v4().simple());
        match target.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.join(file),
            _ => PathBuf::from(file),
        }
    }
}

impl StagingArea for ColocatedStaging {
    fn create(&self, target: &Path) -> io::Result<StagedFile> {
        let path = Self::staged_path(target);
        let file = OpenOptions::new().write(true).create_new(true).open(&path)?;

        if let Ok(meta) = fs::metadata(target) {
            if let Err(e) = file.set_permissions(meta.permissions()) {
                let _ = fs::remove_file(&path);
                return Err(e);
            }
        }

        Ok(StagedFile {
            path,
            writer: Box::new(SyncedWriter(BufWriter::new(file))),
        })
    }

    fn commit(&self, staged: &Path, target: &Path) -> io::Result<()> {
        fs::rename(staged, target)
    }
}

/// Buffered file writer whose `flush` also syncs the file to disk.
struct SyncedWriter(BufWriter<File>);

impl Write for SyncedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()?;
        self.0.get_ref().sync_all()
    }
}

/// Deletes a staged file when dropped, unless the file was committed.
struct StagingGuard {
    path: PathBuf,
    armed: bool,
}

impl StagingGuard {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for StagingGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "staged file discarded"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "could not remove staged file"),
        }
    }
}

// ── Results ───────────────────────────────────────────────────────────────────

/// What a single rewrite pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteSummary {
    /// Physical lines written to the new file.
    pub lines_written: usize,
    /// Later lines with the edited key that were left out.
    pub duplicates_dropped: usize,
    /// Outcome for the first matching line; `None` if no line matched.
    pub outcome: Option<EditOutcome>,
    /// 1-based number of the first matching line.
    pub line: Option<usize>,
}

impl RewriteSummary {
    /// Returns `true` if the file on disk was replaced.
    pub fn modified(&self) -> bool {
        self.outcome.as_ref().is_some_and(EditOutcome::modifies_file)
    }
}

/// Result of [`RewriteEngine::update`], carrying what the caller needs to
/// describe the change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateReport {
    /// The key was missing and a new line was appended.
    Appended { key: String, values: Vec<Token> },
    /// A removal named a key that is not in the file.
    KeyNotFound { key: String },
    /// The entry already holds the requested values.
    Unchanged { key: String, values: Vec<Token> },
    /// A removal named only values the entry does not hold.
    ValueNotFound { key: String, values: Vec<Token> },
    Changed {
        key: String,
        before: Vec<Token>,
        after: Vec<Token>,
        summary: RewriteSummary,
    },
    /// The removal emptied the entry and its line was dropped.
    EntryRemoved {
        key: String,
        before: Vec<Token>,
        summary: RewriteSummary,
    },
}

// ── Engine ────────────────────────────────────────────────────────────────────

/// Applies [`EditRequest`]s to config files.
pub struct RewriteEngine<S: StagingArea = ColocatedStaging> {
    staging: S,
    options: ParseOptions,
    style: NewEntryStyle,
}

impl RewriteEngine<ColocatedStaging> {
    /// Engine that stages next to the target file.
    pub fn new(options: ParseOptions) -> Self {
        Self::with_staging(ColocatedStaging, options)
    }
}

impl<S: StagingArea> RewriteEngine<S> {
    pub fn with_staging(staging: S, options: ParseOptions) -> Self {
        Self {
            staging,
            options,
            style: NewEntryStyle::default(),
        }
    }

    /// Sets how brand-new keys are written by [`append`](Self::append).
    pub fn with_new_entry_style(mut self, style: NewEntryStyle) -> Self {
        self.style = style;
        self
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Rewrites `path`, applying `request` to the first line holding its key.
    ///
    /// Later lines carrying exactly the edited line's key are dropped, even
    /// when the request matched it by prefix.  The file is only replaced
    /// when the outcome changes it; otherwise the staged copy is discarded.
    ///
    /// # Errors
    ///
    /// [`StorageError`] if the original cannot be read, a line is too long,
    /// the edited line is not UTF-8 before its comment
    /// ([`StorageError::NotUtf8`]), or the staged copy cannot be written or
    /// committed.  In every error case the original file is left as it was.
    pub fn rewrite(&self, path: &Path, request: &EditRequest) -> Result<RewriteSummary, StorageError> {
        let delimiters = &self.options.delimiters;
        let lines = open_lines(path, self.options.max_line_len)?;

        let staged = self
            .staging
            .create(path)
            .map_err(|e| StorageError::from_io(path, e))?;
        let mut guard = StagingGuard::new(staged.path);
        let mut writer = staged.writer;
        debug!(staged = %guard.path.display(), "staging file created");

        let mut summary = RewriteSummary {
            lines_written: 0,
            duplicates_dropped: 0,
            outcome: None,
            line: None,
        };
        let write_err = |source| StorageError::Io {
            path: guard.path.clone(),
            source,
        };

        // Key of the line the request was applied to; later lines are
        // duplicates only when their key is exactly the same.
        let mut located: Option<Token> = None;

        for line in lines {
            let line = line?;
            let text = line.text();

            let entry = if is_eligible(&text) {
                Entry::from_line(&text, line.number, delimiters).filter(|e| match &located {
                    None => self.options.key_match.matches(e.key(), request.key()),
                    Some(key) => e.key() == key,
                })
            } else {
                None
            };

            let Some(entry) = entry else {
                writer.write_all(&line.bytes).map_err(write_err)?;
                summary.lines_written += 1;
                continue;
            };

            if located.is_some() {
                summary.duplicates_dropped += 1;
                warn!(key = entry.key().as_str(), line = line.number, "dropping duplicate entry");
                continue;
            }

            debug!(key = entry.key().as_str(), line = line.number, "target line located");
            let outcome = request.apply(entry.values());
            match &outcome {
                EditOutcome::Changed(values) => {
                    let edited = render_edited(&line, values, delimiters).ok_or_else(|| {
                        StorageError::NotUtf8 {
                            path: path.to_path_buf(),
                            line: line.number,
                        }
                    })?;
                    writer.write_all(&edited).map_err(write_err)?;
                    summary.lines_written += 1;
                }
                EditOutcome::EntryRemoved => {}
                EditOutcome::Unchanged | EditOutcome::ValueNotFound => {
                    writer.write_all(&line.bytes).map_err(write_err)?;
                    summary.lines_written += 1;
                }
            }
            located = Some(entry.key().clone());
            summary.outcome = Some(outcome);
            summary.line = Some(line.number);
        }

        if !summary.modified() {
            // Nothing to publish; the guard removes the staged copy.
            summary.duplicates_dropped = 0;
            return Ok(summary);
        }

        writer.flush().map_err(write_err)?;
        drop(writer);

        self.staging
            .commit(&guard.path, path)
            .map_err(|source| StorageError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        guard.disarm();

        if summary.duplicates_dropped > 0 {
            warn!(
                key = request.key(),
                dropped = summary.duplicates_dropped,
                "duplicate entries removed from file"
            );
        }
        info!(path = %path.display(), lines = summary.lines_written, "staging file committed");
        Ok(summary)
    }

    /// Appends a new `key` line holding `values` to the end of `path`.
    ///
    /// A newline is written first when the file does not end with one.
    ///
    /// # Errors
    ///
    /// [`StorageError::NotFound`] if the file does not exist, otherwise
    /// [`StorageError::Io`].
    pub fn append(&self, path: &Path, key: &str, values: &[Token]) -> Result<(), StorageError> {
        let needs_newline = !ends_with_newline(path)?;
        let line = LineLayout::for_new_entry(key, &self.style).render(values);

        let mut file = OpenOptions::new()
            .append(true)
            .open(path)
            .map_err(|e| StorageError::from_io(path, e))?;
        let io_err = |source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        };
        if needs_newline {
            file.write_all(b"\n").map_err(io_err)?;
        }
        file.write_all(line.as_bytes()).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;

        info!(path = %path.display(), key, "entry appended");
        Ok(())
    }

    /// Parses `path` and applies `request`, appending or rewriting as needed.
    ///
    /// # Errors
    ///
    /// See [`rewrite`](Self::rewrite) and [`append`](Self::append).
    pub fn update(&self, path: &Path, request: &EditRequest) -> Result<UpdateReport, StorageError> {
        let store = parse_file(path, &self.options)?;
        self.update_parsed(path, &store, request)
    }

    /// Like [`update`](Self::update) for a file the caller already parsed.
    pub fn update_parsed(
        &self,
        path: &Path,
        store: &ConfigStore,
        request: &EditRequest,
    ) -> Result<UpdateReport, StorageError> {
        let key = request.key().to_string();

        let Some(entry) = store.find_with(request.key(), self.options.key_match) else {
            return match request.op() {
                EditOp::Remove => Ok(UpdateReport::KeyNotFound { key }),
                EditOp::Replace | EditOp::Append => {
                    let values = dedup(request.values());
                    self.append(path, request.key(), &values)?;
                    Ok(UpdateReport::Appended { key, values })
                }
            };
        };

        let before = entry.values().to_vec();
        match request.apply(&before) {
            EditOutcome::Unchanged => Ok(UpdateReport::Unchanged { key, values: before }),
            EditOutcome::ValueNotFound => Ok(UpdateReport::ValueNotFound {
                key,
                values: request.values().to_vec(),
            }),
            EditOutcome::Changed(after) => {
                let summary = self.rewrite(path, request)?;
                Ok(UpdateReport::Changed {
                    key,
                    before,
                    after,
                    summary,
                })
            }
            EditOutcome::EntryRemoved => {
                let summary = self.rewrite(path, request)?;
                Ok(UpdateReport::EntryRemoved {
                    key,
                    before,
                    summary,
                })
            }
        }
    }
}

/// Renders the edited form of `line` holding `values`.
///
/// Everything from the inline comment onward (or just the line ending) is
/// copied from the raw bytes, so a comment in an 8-bit encoding such as
/// Latin-1 survives the edit.  Returns `None` when the part of the line that
/// is re-rendered is not valid UTF-8.
fn render_edited(line: &RawLine, values: &[Token], delimiters: &Delimiters) -> Option<Vec<u8>> {
    let layout = LineLayout::analyze(&line.aligned_text(), delimiters);
    let keep_from = match &layout.comment {
        Some(comment) => comment.offset,
        None => line.bytes.len() - layout.ending.as_str().len(),
    };
    let head = line.bytes.get(..keep_from)?;
    std::str::from_utf8(head).ok()?;

    let mut edited = layout.render_values(values).into_bytes();
    edited.extend_from_slice(&line.bytes[keep_from..]);
    Some(edited)
}

/// Rewrites `path` with the default engine.
///
/// # Errors
///
/// See [`RewriteEngine::rewrite`].
pub fn rewrite(path: &Path, request: &EditRequest, options: &ParseOptions) -> Result<RewriteSummary, StorageError> {
    RewriteEngine::new(options.clone()).rewrite(path, request)
}

/// Appends `key` with `values` to `path` in the default new-entry style.
///
/// # Errors
///
/// See [`RewriteEngine::append`].
pub fn append(path: &Path, key: &str, values: &[Token]) -> Result<(), StorageError> {
    RewriteEngine::new(ParseOptions::default()).append(path, key, values)
}

/// Parses `path` and applies `request` with the default engine.
///
/// # Errors
///
/// See [`RewriteEngine::update`].
pub fn update(path: &Path, request: &EditRequest, options: &ParseOptions) -> Result<UpdateReport, StorageError> {
    RewriteEngine::new(options.clone()).update(path, request)
}

fn ends_with_newline(path: &Path) -> Result<bool, StorageError> {
    let bytes = fs::read(path).map_err(|e| StorageError::from_io(path, e))?;
    Ok(bytes.is_empty() || bytes.last() == Some(&b'\n'))
}

/// Request values with exact repeats removed, first occurrence kept.
fn dedup(values: &[Token]) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(values.len());
    for value in values {
        if !out.contains(value) {
            out.push(value.clone());
        }
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────

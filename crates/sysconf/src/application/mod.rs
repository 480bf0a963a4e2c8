//! Application layer use cases for the `sysconf` command.
//!
//! # What is the "application" layer? (for beginners)
//!
//! The application layer sits between the library (`sysconf_core`, which
//! knows how to parse and rewrite config files) and the process boundary
//! (`main.rs`, which knows about arguments, environment variables and exit
//! codes).
//!
//! Use cases in this layer write their output to any [`std::io::Write`], so
//! tests can capture exactly what a user would see on the terminal.
//!
//! # Sub-modules
//!
//! - **`list_entries`** – Prints every entry of a file as `key = values`.
//! - **`lookup_value`** – Prints the values of one key.
//! - **`update_entry`** – Applies a `=`, `+=` or `-=` request and describes
//!   the change.
//! - **`abort`**        – Fatal error codes and their diagnostics.

use std::io::Write;
use std::path::PathBuf;

use sysconf_core::{
    parse_file, NewEntryStyle, ParseOptions, Request, RequestError, RewriteEngine,
};
use tracing::debug;

pub mod abort;
pub mod list_entries;
pub mod lookup_value;
pub mod update_entry;

use abort::{Abort, AbortCode};

/// Non-fatal result of a command, mapped to the process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The command did what was asked (exit 0).
    Success,
    /// Nothing to show or nothing to remove, or the file could not be
    /// parsed (exit 1).
    Failure,
}

impl Status {
    pub fn code(self) -> i32 {
        match self {
            Status::Success => 0,
            Status::Failure => 1,
        }
    }
}

/// One resolved command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Config file to operate on.
    pub file: PathBuf,
    /// Prefix lookup output with `key: `.
    pub show_key: bool,
    /// Positional words forming the request; empty means "list everything".
    pub words: Vec<String>,
}

/// Runs one command against `invocation.file`.
///
/// Regular output goes to `out`, notices about misses to `err`.
///
/// # Errors
///
/// Returns an [`Abort`] for malformed requests ([`AbortCode::InvalidArguments`]),
/// unsupported operators ([`AbortCode::UnimplementedFeature`]) and failed
/// rewrites ([`AbortCode::RuntimeError`]).  The file is never touched when
/// the request itself is invalid.
pub fn run<O: Write, E: Write>(
    invocation: &Invocation,
    options: &ParseOptions,
    style: NewEntryStyle,
    out: &mut O,
    err: &mut E,
) -> Result<Status, Abort> {
    let request = if invocation.words.is_empty() {
        None
    } else {
        Some(Request::parse(invocation.words.as_slice(), &options.delimiters).map_err(request_abort)?)
    };

    let path = invocation.file.as_path();
    let store = match parse_file(path, options) {
        Ok(store) => store,
        Err(e) => {
            writeln!(err, "Failed to parse the configuration file: {e}").map_err(output_abort)?;
            return Ok(Status::Failure);
        }
    };
    debug!(file = %path.display(), entries = store.len(), ?request, "running command");

    match request {
        None => {
            list_entries::list_entries(&store, out).map_err(output_abort)?;
            Ok(Status::Success)
        }
        Some(Request::Lookup { key }) => {
            lookup_value::lookup_value(&store, &key, options.key_match, invocation.show_key, out, err)
                .map_err(output_abort)
        }
        Some(Request::Edit(edit)) => {
            let engine = RewriteEngine::new(options.clone()).with_new_entry_style(style);
            update_entry::update_entry(&engine, path, &store, &edit, out)
                .map_err(|e| Abort::new(AbortCode::RuntimeError, format!("{e:#}")))
        }
    }
}

fn request_abort(error: RequestError) -> Abort {
    match error {
        RequestError::UnsupportedModifier { .. } => Abort::new(AbortCode::UnimplementedFeature, error),
        RequestError::MissingKey | RequestError::MissingValue { .. } => {
            Abort::new(AbortCode::InvalidArguments, error)
        }
    }
}

fn output_abort(error: std::io::Error) -> Abort {
    Abort::new(AbortCode::RuntimeError, format!("writing output: {error}"))
}

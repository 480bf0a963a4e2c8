//! Storage: reading config files into a [`ConfigStore`] and rewriting them.
//!
//! - `reader` streams a file line by line into a [`ConfigStore`], enforcing
//!   the per-line length bound.
//! - `rewrite` edits one key of a file through a staged copy that replaces
//!   the original with a single rename, and appends brand-new keys.
//!
//! Both share [`StorageError`], which always names the file involved.
//!
//! [`ConfigStore`]: crate::domain::entry::ConfigStore

use std::path::PathBuf;

use thiserror::Error;

pub mod reader;
pub mod rewrite;

/// Error type for file access in the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The config file does not exist.
    #[error("config file {path} not found")]
    NotFound { path: PathBuf },

    /// A file system I/O error occurred.
    #[error("I/O error accessing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A physical line exceeds the configured maximum length.
    #[error("line {line} of {path} is {len} bytes long (limit {limit})")]
    LineTooLong {
        path: PathBuf,
        line: usize,
        len: usize,
        limit: usize,
    },

    /// The line to be rewritten holds bytes that are not valid UTF-8 outside
    /// its inline comment.
    #[error("line {line} of {path} is not valid UTF-8; refusing to rewrite it")]
    NotUtf8 { path: PathBuf, line: usize },
}

impl StorageError {
    /// Wraps an I/O error, mapping "not found" to [`StorageError::NotFound`].
    pub(crate) fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound { path }
        } else {
            StorageError::Io { path, source }
        }
    }
}

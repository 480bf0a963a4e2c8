//! # sysconf-core
//!
//! Library behind the `sysconf` tool: reads `key = value` style config files
//! (rc.conf, sysctl.conf, loader.conf and friends) and edits single keys
//! without disturbing the rest of the file.
//!
//! # Architecture overview (for beginners)
//!
//! A config file is a list of lines.  Most of them are *entries*:
//!
//! ```text
//! ifconfig_em0="inet 10.0.0.4 netmask 255.255.255.0"   # uplink
//! ```
//!
//! The crate is split into two layers:
//!
//! - **`domain`** – Pure text processing.  The tokenizer splits lines into
//!   tokens, the config store keeps the parsed entries, the layout analyzer
//!   records how a line was formatted, and the value editor computes new
//!   value lists for `=`, `+=` and `-=` requests.
//!
//! - **`storage`** – File access.  Parses files into a [`ConfigStore`] and
//!   rewrites them through a staged copy that replaces the original with an
//!   atomic rename, so a crash never leaves a half-written config behind.
//!
//! ```no_run
//! use std::path::Path;
//! use sysconf_core::{Delimiters, ParseOptions, Request, RewriteEngine};
//!
//! let path = Path::new("/etc/rc.conf");
//! let request = Request::parse(&["cloned_interfaces+=lo1"], &Delimiters::default())?;
//! if let Request::Edit(edit) = request {
//!     let report = RewriteEngine::new(ParseOptions::default()).update(path, &edit)?;
//!     println!("{report:?}");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod domain;
pub mod storage;

// Re-export the most-used types at the crate root so callers can write
// `sysconf_core::ConfigStore` instead of `sysconf_core::domain::entry::ConfigStore`.
pub use domain::edit::{apply_edit, EditOp, EditOutcome, EditRequest, Request, RequestError};
pub use domain::entry::{ConfigStore, Entry, KeyMatch};
pub use domain::layout::{LineLayout, NewEntryStyle, Quote, Separator, Terminator};
pub use domain::token::{assemble, contains, tokenize, Delimiters, Token, DEFAULT_DELIMITERS};
pub use storage::reader::{parse_file, ParseOptions, MAX_LINE_LEN};
pub use storage::rewrite::{
    ColocatedStaging, RewriteEngine, RewriteSummary, StagedFile, StagingArea, UpdateReport,
};
pub use storage::StorageError;

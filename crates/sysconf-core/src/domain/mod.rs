//! Domain logic for sysconf: tokens, entries, line layouts and value edits.
//!
//! Nothing in this module touches the file system.  Every function takes text
//! in and hands text or typed values back, so the whole layer can be tested
//! from plain string literals.
//!
//! # How the pieces fit together (for beginners)
//!
//! - **`token`** splits a raw line into delimiter-free tokens.
//! - **`entry`** turns the tokens of an eligible line into a key, its values
//!   and an optional inline comment, and collects entries into a
//!   [`entry::ConfigStore`].
//! - **`layout`** remembers *how* a line was written (indentation, separator,
//!   quotes, trailing `;`, comment) so that a changed value can be written
//!   back without disturbing anything else.
//! - **`edit`** parses a request such as `key+=value` and computes the new
//!   value list for an entry.
//!
//! The storage layer (`crate::storage`) drives these pieces over real files.

pub mod edit;
pub mod entry;
pub mod layout;
pub mod token;

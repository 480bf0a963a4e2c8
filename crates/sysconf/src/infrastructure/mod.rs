//! Infrastructure for the `sysconf` command: the tool's own settings file.
//!
//! The settings module is a thin adapter between the file system and the
//! application.  It locates the TOML settings file for the current
//! platform, reads it, and turns it into the [`sysconf_core::ParseOptions`]
//! the core library works with.  A missing file simply means defaults.

pub mod settings;

//! Prints the values of a single key.

use std::io::{self, Write};

use sysconf_core::{assemble, ConfigStore, KeyMatch};
use tracing::info;

use super::Status;

/// Writes the values of `key` to `out`, prefixed by `key: ` when `show_key`
/// is set.
///
/// A missing key writes a notice to `err` and returns [`Status::Failure`].
pub fn lookup_value<O: Write, E: Write>(
    store: &ConfigStore,
    key: &str,
    policy: KeyMatch,
    show_key: bool,
    out: &mut O,
    err: &mut E,
) -> io::Result<Status> {
    let Some(entry) = store.find_with(key, policy) else {
        info!(key, "key not found");
        writeln!(err, "{key}: not found")?;
        return Ok(Status::Failure);
    };

    if show_key {
        write!(out, "{}: ", entry.key())?;
    }
    writeln!(out, "{}", assemble(entry.values()))?;
    Ok(Status::Success)
}

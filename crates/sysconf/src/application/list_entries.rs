//! Lists every entry of a config file.

use std::io::{self, Write};

use sysconf_core::{assemble, ConfigStore};

/// Writes one `key       \t=\tvalues` line per entry, in file order.
///
/// Keys are left-aligned to ten columns.  Inline comments are not shown.
pub fn list_entries<W: Write>(store: &ConfigStore, out: &mut W) -> io::Result<()> {
    for entry in store {
        writeln!(out, "{:<10}\t=\t{}", entry.key(), assemble(entry.values()))?;
    }
    Ok(())
}

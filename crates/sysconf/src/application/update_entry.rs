//! Applies an edit request to a config file and reports what changed.
//!
//! Output lines, one per outcome:
//!
//! | Outcome         | Printed                                               |
//! |-----------------|-------------------------------------------------------|
//! | appended        | `<file>: key = values`                                |
//! | changed         | `key: old values -> new values`                       |
//! | entry removed   | `key: old values -> ` then `Last value for key removed. Key removed from file.` |
//! | unchanged       | `Value found. No change made.`                        |
//! | value not found | `Value not found in value string. No change made.`    |
//! | key not found   | `key: not found. No change made.`                     |

use std::io::{self, Write};
use std::path::Path;

use anyhow::Context;
use sysconf_core::{assemble, ConfigStore, EditRequest, RewriteEngine, StagingArea, UpdateReport};

use super::Status;

/// Applies `request` to the already parsed `store` of `path` and writes a
/// one-line summary to `out`.
///
/// Returns [`Status::Failure`] only when a removal names a missing key.
///
/// # Errors
///
/// Fails when the file cannot be rewritten or appended to; the error chain
/// names the key and the file.
pub fn update_entry<S: StagingArea, W: Write>(
    engine: &RewriteEngine<S>,
    path: &Path,
    store: &ConfigStore,
    request: &EditRequest,
    out: &mut W,
) -> anyhow::Result<Status> {
    let report = engine
        .update_parsed(path, store, request)
        .with_context(|| format!("updating `{}` in {}", request.key(), path.display()))?;

    describe(&report, path, out).context("writing change summary")?;

    Ok(match report {
        UpdateReport::KeyNotFound { .. } => Status::Failure,
        _ => Status::Success,
    })
}

/// Writes the user-facing summary of `report`.
pub fn describe<W: Write>(report: &UpdateReport, path: &Path, out: &mut W) -> io::Result<()> {
    match report {
        UpdateReport::Appended { key, values } => {
            writeln!(out, "{}: {key} = {}", path.display(), assemble(values))
        }
        UpdateReport::KeyNotFound { key } => writeln!(out, "{key}: not found. No change made."),
        UpdateReport::Unchanged { .. } => writeln!(out, "Value found. No change made."),
        UpdateReport::ValueNotFound { .. } => {
            writeln!(out, "Value not found in value string. No change made.")
        }
        UpdateReport::Changed {
            key, before, after, ..
        } => writeln!(out, "{key}: {} -> {}", assemble(before), assemble(after)),
        UpdateReport::EntryRemoved { key, before, .. } => {
            writeln!(out, "{key}: {} -> ", assemble(before))?;
            writeln!(out, "Last value for key removed. Key removed from file.")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    use sysconf_core::{parse_file, Delimiters, ParseOptions, Request, StagedFile};
    use uuid::Uuid;

    fn scratch(contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sysconf_update_{}", Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("rc.conf");
        fs::write(&path, contents).unwrap();
        path
    }

    fn edit(expr: &str) -> EditRequest {
        match Request::parse(&[expr], &Delimiters::default()).unwrap() {
            Request::Edit(edit) => edit,
            other => panic!("expected an edit, got {other:?}"),
        }
    }

    fn run_update(path: &Path, expr: &str) -> (Status, String) {
        let options = ParseOptions::default();
        let store = parse_file(path, &options).unwrap();
        let engine = RewriteEngine::new(options);
        let mut out = Vec::new();
        let status = update_entry(&engine, path, &store, &edit(expr), &mut out).unwrap();
        (status, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_replace_prints_old_and_new_values() {
        // Arrange
        let path = scratch("hostname=\"old.example\"\n");

        // Act
        let (status, out) = run_update(&path, "hostname=new.example");

        // Assert
        assert_eq!(status, Status::Success);
        assert_eq!(out, "hostname: old.example -> new.example\n");
        assert_eq!(fs::read_to_string(&path).unwrap(), "hostname=\"new.example\"\n");
    }

    #[test]
    fn test_append_to_missing_key_prints_file_and_entry() {
        let path = scratch("a=1\n");

        let (status, out) = run_update(&path, "b=2");

        assert_eq!(status, Status::Success);
        assert_eq!(out, format!("{}: b = 2\n", path.display()));
    }

    #[test]
    fn test_remove_last_value_prints_notice() {
        let path = scratch("a=1\nb=\"x\"\n");

        let (_, out) = run_update(&path, "b-=x");

        assert_eq!(out, "b: x -> \nLast value for key removed. Key removed from file.\n");
        assert_eq!(fs::read_to_string(&path).unwrap(), "a=1\n");
    }

    #[test]
    fn test_remove_absent_value_prints_notice() {
        let path = scratch("b=\"x\"\n");
        let (status, out) = run_update(&path, "b-=y");
        assert_eq!(status, Status::Success);
        assert_eq!(out, "Value not found in value string. No change made.\n");
    }

    #[test]
    fn test_append_present_value_prints_notice() {
        let path = scratch("b=\"x\"\n");
        let (_, out) = run_update(&path, "b+=x");
        assert_eq!(out, "Value found. No change made.\n");
    }

    #[test]
    fn test_remove_on_missing_key_is_failure() {
        let path = scratch("a=1\n");

        let (status, out) = run_update(&path, "b-=x");

        assert_eq!(status, Status::Failure);
        assert_eq!(out, "b: not found. No change made.\n");
    }

    struct ReadOnlyStaging;

    impl StagingArea for ReadOnlyStaging {
        fn create(&self, _target: &Path) -> io::Result<StagedFile> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only file system"))
        }

        fn commit(&self, _staged: &Path, _target: &Path) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_rewrite_failure_carries_key_and_file_context() {
        // Arrange
        let path = scratch("a=1\n");
        let options = ParseOptions::default();
        let store = parse_file(&path, &options).unwrap();
        let engine = RewriteEngine::with_staging(ReadOnlyStaging, options);
        let mut out = Vec::new();

        // Act
        let error = update_entry(&engine, &path, &store, &edit("a=2"), &mut out).unwrap_err();

        // Assert
        let chain = format!("{error:#}");
        assert!(chain.starts_with("updating `a` in "), "{chain}");
        assert!(chain.contains("read-only file system"), "{chain}");
        assert!(out.is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), "a=1\n");
    }
}

//! Integration tests for parsing and rewriting real files.
//!
//! Every test works on its own scratch directory under the system temp dir
//! and goes through the public API only.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use sysconf_core::{
    parse_file, ConfigStore, Delimiters, EditOp, EditOutcome, EditRequest, KeyMatch, ParseOptions,
    Request, RewriteEngine, StagedFile, StagingArea, StorageError, Token, UpdateReport,
};
use uuid::Uuid;

const RC_CONF: &str = "\
# /etc/rc.conf
hostname=\"builder.example.org\"
ifconfig_em0=\"inet 10.0.0.4 netmask 255.255.255.0\"   # uplink
cloned_interfaces=\"lo1 bridge0\"
  sshd_flags = '-4 -o UseDNS=no';
[jail]
kern.securelevel: 1
";

fn scratch(contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("sysconf_it_{}", Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("create scratch dir");
    let path = dir.join("rc.conf");
    fs::write(&path, contents).expect("write fixture");
    path
}

fn edit(words: &[&str]) -> EditRequest {
    match Request::parse(words, &Delimiters::default()).expect("valid request") {
        Request::Edit(edit) => edit,
        Request::Lookup { key } => panic!("expected an edit for {key}"),
    }
}

fn toks(values: &[&str]) -> Vec<Token> {
    values.iter().map(|v| Token::from(*v)).collect()
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).expect("read back")
}

fn engine() -> RewriteEngine {
    RewriteEngine::new(ParseOptions::default())
}

// ── Parsing ───────────────────────────────────────────────────────────────────

#[test]
fn test_parse_file_matches_in_memory_parse() {
    // Arrange
    let path = scratch(RC_CONF);

    // Act
    let from_disk = parse_file(&path, &ParseOptions::default()).expect("parse");
    let from_text = ConfigStore::parse_str(RC_CONF, &Delimiters::default());

    // Assert
    assert_eq!(from_disk, from_text);
    assert_eq!(from_disk.len(), 5);
    let em0 = from_disk.find("ifconfig_em0").expect("em0 present");
    assert_eq!(em0.values(), toks(&["inet", "10.0.0.4", "netmask", "255.255.255.0"]));
    assert_eq!(em0.line(), 3);
}

#[test]
fn test_parse_file_reports_overlong_line() {
    let path = scratch(&format!("a=1\nb={}\n", "v".repeat(2000)));

    let result = parse_file(&path, &ParseOptions::default());

    assert!(matches!(
        result,
        Err(StorageError::LineTooLong { line: 2, limit: 1024, .. })
    ));
}

// ── Rewrite properties ────────────────────────────────────────────────────────

#[test]
fn test_replacing_with_current_values_leaves_file_byte_identical() {
    let path = scratch(RC_CONF);
    let store = parse_file(&path, &ParseOptions::default()).unwrap();

    for entry in &store {
        // Arrange
        let request = EditRequest::new(entry.key().as_str(), EditOp::Replace, entry.values().to_vec());

        // Act
        let summary = engine().rewrite(&path, &request).expect("rewrite");

        // Assert
        assert!(!summary.modified(), "{} must not be rewritten", entry.key());
        assert_eq!(read(&path), RC_CONF);
    }
}

#[test]
fn test_rewrite_preserves_layout_of_each_style() {
    // Arrange
    let path = scratch(RC_CONF);

    // Act
    engine().update(&path, &edit(&["ifconfig_em0=DHCP"])).unwrap();
    engine().update(&path, &edit(&["sshd_flags=-6"])).unwrap();
    engine().update(&path, &edit(&["kern.securelevel=2"])).unwrap();

    // Assert
    let text = read(&path);
    assert!(text.contains("ifconfig_em0=\"DHCP\"   # uplink\n"), "{text}");
    assert!(text.contains("  sshd_flags = '-6';\n"), "{text}");
    assert!(text.contains("kern.securelevel: 2\n"), "{text}");
    assert!(text.starts_with("# /etc/rc.conf\nhostname=\"builder.example.org\"\n"));
}

#[test]
fn test_append_then_remove_round_trip() {
    let path = scratch(RC_CONF);

    let appended = engine().update(&path, &edit(&["cloned_interfaces+=lo2"])).unwrap();
    assert!(matches!(
        appended,
        UpdateReport::Changed { ref after, .. } if *after == toks(&["lo1", "bridge0", "lo2"])
    ));
    assert!(read(&path).contains("cloned_interfaces=\"lo1 bridge0 lo2\"\n"));

    engine().update(&path, &edit(&["cloned_interfaces-=lo2"])).unwrap();
    assert_eq!(read(&path), RC_CONF);
}

#[test]
fn test_removing_last_value_deletes_the_line() {
    // Arrange
    let path = scratch(RC_CONF);
    let before = parse_file(&path, &ParseOptions::default()).unwrap().len();

    // Act
    let report = engine().update(&path, &edit(&["hostname-=builder.example.org"])).unwrap();

    // Assert
    assert!(matches!(report, UpdateReport::EntryRemoved { .. }));
    let after = parse_file(&path, &ParseOptions::default()).unwrap();
    assert_eq!(after.len(), before - 1);
    assert!(after.find("hostname").is_none());
    assert!(!read(&path).contains("hostname"));
}

#[test]
fn test_remove_absent_value_is_reported_and_file_untouched() {
    let path = scratch(RC_CONF);

    let report = engine().update(&path, &edit(&["cloned_interfaces-=tap0"])).unwrap();

    assert!(matches!(report, UpdateReport::ValueNotFound { .. }));
    assert_eq!(read(&path), RC_CONF);
}

#[test]
fn test_append_existing_value_is_unchanged() {
    let path = scratch(RC_CONF);

    let report = engine().update(&path, &edit(&["cloned_interfaces+=lo1"])).unwrap();

    assert!(matches!(report, UpdateReport::Unchanged { .. }));
    assert_eq!(read(&path), RC_CONF);
}

#[test]
fn test_new_key_is_appended_after_unterminated_last_line() {
    // Arrange
    let path = scratch("a=\"1\"");

    // Act
    let report = engine().update(&path, &edit(&["b=2", "3"])).unwrap();

    // Assert
    assert_eq!(
        report,
        UpdateReport::Appended {
            key: "b".to_string(),
            values: toks(&["2", "3"]),
        }
    );
    assert_eq!(read(&path), "a=\"1\"\nb=\"2 3\"\n");
    let store = parse_file(&path, &ParseOptions::default()).unwrap();
    assert_eq!(store.find("b").unwrap().values(), toks(&["2", "3"]));
}

#[test]
fn test_duplicate_keys_after_the_first_are_dropped() {
    let path = scratch("k=1\nk=2\nother=x\nk=3\n");

    let report = engine().update(&path, &edit(&["k=9"])).unwrap();

    let UpdateReport::Changed { summary, .. } = report else {
        panic!("expected a change");
    };
    assert_eq!(summary.duplicates_dropped, 2);
    assert_eq!(summary.lines_written, 2);
    assert_eq!(summary.outcome, Some(EditOutcome::Changed(toks(&["9"]))));
    assert_eq!(read(&path), "k=9\nother=x\n");
}

#[test]
fn test_rewrite_keeps_crlf_line_endings() {
    let path = scratch("a = 1\r\nb = 2\r\n");

    engine().update(&path, &edit(&["a=5"])).unwrap();

    assert_eq!(read(&path), "a = 5\r\nb = 2\r\n");
}

#[test]
fn test_rewrite_keeps_key_written_after_a_quote() {
    // Arrange
    let path = scratch("\"key\" = old\nother = x\n");

    // Act
    let report = engine().update(&path, &edit(&["key=new"])).unwrap();

    // Assert
    assert!(matches!(report, UpdateReport::Changed { .. }));
    assert_eq!(read(&path), "\"key\" = new\nother = x\n");
    let store = parse_file(&path, &ParseOptions::default()).unwrap();
    assert_eq!(store.len(), 2);
    assert_eq!(store.find("key").unwrap().values(), toks(&["new"]));
}

#[test]
fn test_rewrite_keeps_latin1_comment_bytes() {
    // Arrange
    let path = scratch("");
    fs::write(&path, b"key = old   # caf\xe9\nnext = \xe9t\xe9\n").unwrap();

    // Act
    engine().update(&path, &edit(&["key=new"])).unwrap();

    // Assert
    assert_eq!(fs::read(&path).unwrap(), b"key = new   # caf\xe9\nnext = \xe9t\xe9\n");
}

#[test]
fn test_rewrite_refuses_line_with_invalid_value_bytes() {
    // Arrange
    let raw: &[u8] = b"key = caf\xe9\n";
    let path = scratch("");
    fs::write(&path, raw).unwrap();

    // Act
    let result = engine().update(&path, &edit(&["key+=bar"]));

    // Assert
    assert!(matches!(result, Err(StorageError::NotUtf8 { line: 1, .. })));
    assert_eq!(fs::read(&path).unwrap(), raw);
    let leftovers = fs::read_dir(path.parent().unwrap()).unwrap().count();
    assert_eq!(leftovers, 1);
}

#[test]
fn test_prefix_mode_only_drops_exact_duplicates_of_located_key() {
    // Arrange
    let path = scratch("ifconfig_em0=\"DHCP\"\nifconfig_em1=\"up\"\nifconfig_em0=\"old\"\n");
    let options = ParseOptions {
        key_match: KeyMatch::Prefix,
        ..ParseOptions::default()
    };

    // Act
    let summary = RewriteEngine::new(options)
        .rewrite(&path, &edit(&["ifconfig=SYNCDHCP"]))
        .unwrap();

    // Assert
    assert_eq!(summary.line, Some(1));
    assert_eq!(summary.duplicates_dropped, 1);
    assert_eq!(read(&path), "ifconfig_em0=\"SYNCDHCP\"\nifconfig_em1=\"up\"\n");
}

#[cfg(unix)]
#[test]
fn test_rewrite_preserves_file_permissions() {
    use std::os::unix::fs::PermissionsExt;

    // Arrange
    let path = scratch("a = 1\n");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();

    // Act
    engine().update(&path, &edit(&["a=2"])).unwrap();

    // Assert
    let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o640);
}

#[test]
fn test_missing_file_is_not_found() {
    let path = std::env::temp_dir().join(format!("sysconf_absent_{}.conf", Uuid::new_v4()));

    let result = engine().update(&path, &edit(&["a=1"]));

    assert!(matches!(result, Err(StorageError::NotFound { .. })));
}

// ── Atomicity ─────────────────────────────────────────────────────────────────

/// Staging area whose files accept `budget` bytes and then fail.
struct FailingStaging {
    budget: usize,
}

struct FailingWriter {
    inner: fs::File,
    remaining: usize,
}

impl Write for FailingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.len() > self.remaining {
            return Err(io::Error::new(io::ErrorKind::Other, "simulated write failure"));
        }
        self.remaining -= buf.len();
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl StagingArea for FailingStaging {
    fn create(&self, target: &Path) -> io::Result<StagedFile> {
        let path = target.with_file_name(format!(".failing.{}.tmp", Uuid::new_v4().simple()));
        let inner = fs::File::create(&path)?;
        Ok(StagedFile {
            path,
            writer: Box::new(FailingWriter {
                inner,
                remaining: self.budget,
            }),
        })
    }

    fn commit(&self, staged: &Path, target: &Path) -> io::Result<()> {
        fs::rename(staged, target)
    }
}

#[test]
fn test_write_failure_mid_rewrite_leaves_original_intact() {
    // Arrange: the staged copy fails on its second line
    let path = scratch(RC_CONF);
    let dir = path.parent().unwrap().to_path_buf();
    let engine = RewriteEngine::with_staging(FailingStaging { budget: 40 }, ParseOptions::default());

    // Act
    let result = engine.rewrite(&path, &edit(&["sshd_flags=-6"]));

    // Assert
    assert!(matches!(result, Err(StorageError::Io { .. })));
    assert_eq!(read(&path), RC_CONF);
    let leftovers: Vec<_> = fs::read_dir(&dir).unwrap().collect();
    assert_eq!(leftovers.len(), 1, "staged file must be removed on failure");
}

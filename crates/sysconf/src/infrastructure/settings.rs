//! TOML settings for the `sysconf` tool itself.
//!
//! The settings file is optional and lives at
//! - Windows:  `%APPDATA%\sysconf\config.toml`
//! - Linux:    `$XDG_CONFIG_HOME/sysconf/config.toml` or `~/.config/sysconf/config.toml`
//! - macOS:    `~/Library/Application Support/sysconf/config.toml`
//!
//! unless `--config <path>` (or `$SYSCONF_CONFIG`) names another file.
//!
//! # Example
//!
//! ```toml
//! default_file = "/etc/rc.conf"
//! key_match = "exact"        # or "prefix"
//! log_level = "info"
//!
//! [new_entry]
//! separator = "="            # "=", ":" or " "
//! quote = "double"           # "none", "double" or "single"
//! terminator = "none"        # "none" or ";"
//! ```
//!
//! Every field is optional; missing fields take the defaults listed on
//! [`Settings`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sysconf_core::{Delimiters, KeyMatch, NewEntryStyle, ParseOptions, DEFAULT_DELIMITERS, MAX_LINE_LEN};
use thiserror::Error;

/// Error type for settings file operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse settings TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── Settings schema ───────────────────────────────────────────────────────────

/// Contents of the settings file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Config file used when `-f` is not given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_file: Option<PathBuf>,
    /// Characters that separate tokens.  Default: space, tab, CR, LF, both
    /// quotes, `:`, `=` and `;`.
    pub delimiters: String,
    /// Longest accepted line in bytes.  Default: 1024.
    pub max_line_len: usize,
    /// How keys are compared.  Default: `"exact"`.
    pub key_match: KeyMatch,
    /// `tracing` level used when `RUST_LOG` is unset.  Default: `"warn"`.
    pub log_level: String,
    /// Style of newly appended keys.  Default: `key="value"`.
    pub new_entry: NewEntryStyle,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_file: None,
            delimiters: DEFAULT_DELIMITERS.to_string(),
            max_line_len: MAX_LINE_LEN,
            key_match: KeyMatch::default(),
            log_level: "warn".to_string(),
            new_entry: NewEntryStyle::default(),
        }
    }
}

impl Settings {
    /// Parse options for the core library.
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            delimiters: Delimiters::new(&self.delimiters),
            max_line_len: self.max_line_len,
            key_match: self.key_match,
        }
    }

    /// The file to operate on: `cli_file` if given, else `default_file`.
    pub fn resolve_file(&self, cli_file: Option<PathBuf>) -> Option<PathBuf> {
        cli_file.or_else(|| self.default_file.clone())
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Path of the settings file in the platform config directory, if the
/// directory can be determined.
pub fn default_settings_path() -> Option<PathBuf> {
    platform_config_dir().map(|dir| dir.join("config.toml"))
}

/// Loads settings from `explicit`, or from the platform default location.
///
/// A missing file at the default location yields [`Settings::default`]; a
/// missing file named explicitly is an error.
///
/// # Errors
///
/// Returns [`SettingsError::Io`] for file-system errors and
/// [`SettingsError::Parse`] if the TOML is malformed.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings, SettingsError> {
    let Some(path) = explicit.map(Path::to_path_buf).or_else(default_settings_path) else {
        return Ok(Settings::default());
    };

    match std::fs::read_to_string(&path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && explicit.is_none() => {
            Ok(Settings::default())
        }
        Err(e) => Err(SettingsError::Io { path, source: e }),
    }
}

/// Resolves the platform config base directory including the `sysconf`
/// subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        // %APPDATA% e.g. C:\Users\<user>\AppData\Roaming
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("sysconf"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("sysconf")
        })
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        // XDG_CONFIG_HOME or ~/.config; also covers the BSDs.
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("sysconf"))
    }

    #[cfg(not(any(unix, target_os = "windows")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! sysconf: list, query and edit `key = value` style config files.
//!
//! # Usage
//!
//! ```text
//! sysconf [-f <file>] [-n] [--config <path>] [key[<op><value>...]]
//!
//!   sysconf -f /etc/rc.conf                       list every entry
//!   sysconf -f /etc/rc.conf hostname              print the value of a key
//!   sysconf -f /etc/rc.conf -n hostname           ... prefixed with `hostname: `
//!   sysconf -f /etc/rc.conf hostname=box.lan      replace the value
//!   sysconf -f /etc/rc.conf cloned_interfaces+=lo1   add a value
//!   sysconf -f /etc/rc.conf cloned_interfaces-=lo1   remove a value
//! ```
//!
//! Dotted keys such as `kern.securelevel` and `:`-separated lines work the
//! same way.
//!
//! # Environment variable overrides
//!
//! | Variable         | Description                                         |
//! |------------------|-----------------------------------------------------|
//! | `SYSCONF_FILE`   | Config file to operate on when `-f` is not given     |
//! | `SYSCONF_CONFIG` | Settings file when `--config` is not given           |
//! | `RUST_LOG`       | Log filter; overrides `log_level` from the settings  |
//!
//! # Exit status
//!
//! `0` on success, `1` when a key is not found or the file cannot be
//! parsed, and `-1` / `-2` / `-3` for invalid arguments, runtime errors and
//! unimplemented operators.

use std::io;
use std::path::PathBuf;
use std::process;

use clap::error::ErrorKind;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use sysconf::application::abort::{Abort, AbortCode};
use sysconf::application::{self, Invocation, Status};
use sysconf::infrastructure::settings::load_settings;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// List, query and edit `key = value` style configuration files.
#[derive(Debug, Parser)]
#[command(name = "sysconf", version)]
struct Cli {
    /// Config file to read or edit.
    #[arg(short = 'f', long = "file", env = "SYSCONF_FILE", value_name = "FILE")]
    file: Option<PathBuf>,

    /// Print `key: ` before a looked-up value.
    #[arg(short = 'n')]
    show_key: bool,

    /// Settings file for sysconf itself.
    #[arg(long, env = "SYSCONF_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// `key`, `key=value...`, `key+=value...` or `key-=value...`.
    ///
    /// Words after the first are values, even when they start with `-`.
    #[arg(value_name = "EXPR", trailing_var_arg = true)]
    expr: Vec<String>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => AbortCode::InvalidArguments.code(),
            };
            let _ = e.print();
            process::exit(code);
        }
    };

    let code = match run(cli) {
        Ok(status) => status.code(),
        Err(abort) => {
            eprintln!("{abort}");
            abort.code().code()
        }
    };
    process::exit(code);
}

/// Loads settings, initialises logging and runs the command.
fn run(cli: Cli) -> Result<Status, Abort> {
    let settings = match load_settings(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            init_logging("warn");
            return Err(Abort::new(AbortCode::InvalidArguments, e));
        }
    };
    init_logging(&settings.log_level);

    let file = settings.resolve_file(cli.file).ok_or_else(|| {
        Abort::new(
            AbortCode::InvalidArguments,
            "no configuration file given (use -f <file> or set default_file)",
        )
    })?;
    debug!(file = %file.display(), "configuration file resolved");

    let invocation = Invocation {
        file,
        show_key: cli.show_key,
        words: cli.expr,
    };
    application::run(
        &invocation,
        &settings.parse_options(),
        settings.new_entry,
        &mut io::stdout().lock(),
        &mut io::stderr().lock(),
    )
}

/// Sends `tracing` output to standard error.
///
/// `RUST_LOG` wins when set and valid; otherwise `fallback` is used.
fn init_logging(fallback: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(io::stderr)
        .init();
}

// ── Tests ─────────────────────────────────────────────────────────────────────

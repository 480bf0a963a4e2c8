//! Fatal errors and the exit codes they end the process with.

use std::fmt;

/// Exit code for a failure the command cannot recover from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum AbortCode {
    InvalidArguments = -1,
    RuntimeError = -2,
    UnimplementedFeature = -3,
}

impl AbortCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Short description printed in the diagnostic line.
    pub fn reason(self) -> &'static str {
        match self {
            AbortCode::InvalidArguments => "Invalid command line arguments",
            AbortCode::RuntimeError => "Runtime error",
            AbortCode::UnimplementedFeature => "Unimplemented feature",
        }
    }
}

/// A fatal failure: its code plus a one-line detail.
///
/// Displays as `sysconf: fatal: <reason>: <detail>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Abort {
    code: AbortCode,
    detail: String,
}

impl Abort {
    pub fn new(code: AbortCode, detail: impl fmt::Display) -> Self {
        Self {
            code,
            detail: detail.to_string(),
        }
    }

    pub fn code(&self) -> AbortCode {
        self.code
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl fmt::Display for Abort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sysconf: fatal: {}: {}", self.code.reason(), self.detail)
    }
}

impl std::error::Error for Abort {}

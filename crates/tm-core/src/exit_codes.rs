//! Exit codes for the tm-core CLI.
//!
//! Exit codes communicate the outcome without requiring output parsing.

/// Exit codes for tm-core operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Clean = 0,

    /// Interrupted by Ctrl-C after a successful final save
    Interrupted = 6,

    /// Discriminator config or settings error
    ConfigError = 10,

    /// Dataset corrupt or unencodable
    DatasetError = 11,

    /// Invalid input document
    InputError = 12,

    /// I/O error
    IoError = 13,

    /// Internal/unknown error
    InternalError = 99,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Check if this exit code indicates success.
    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Clean | ExitCode::Interrupted)
    }

    /// Check if this exit code indicates an error requiring attention.
    pub fn is_error(self) -> bool {
        (self as i32) >= 10
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl From<&tm_common::Error> for ExitCode {
    fn from(err: &tm_common::Error) -> Self {
        match err.code() {
            10..=19 => ExitCode::ConfigError,
            20..=29 => ExitCode::DatasetError,
            30..=39 => ExitCode::InputError,
            60..=69 => ExitCode::IoError,
            _ => ExitCode::InternalError,
        }
    }
}

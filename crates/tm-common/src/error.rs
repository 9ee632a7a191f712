//! Error types for typemap.

use thiserror::Error;

/// Result type alias for typemap operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for typemap.
///
/// Crate-specific errors (config parsing, dataset codec, persistence) convert
/// into this type at the binary boundary.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("invalid discriminator config at line {line}: {reason}")]
    InvalidDiscriminatorConfig { line: usize, reason: String },

    // Dataset errors (20-29)
    #[error("corrupt schema data: {0}")]
    CorruptSchemaData(String),

    #[error("invalid discriminator encoding: {0}")]
    InvalidDiscriminatorEncoding(String),

    #[error("dataset decompression failed: {0}")]
    DecompressionFailure(String),

    #[error("value cannot be encoded: {0}")]
    Unencodable(String),

    // Input errors (30-39)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    /// Used for detailed error reporting and exit code mapping.
    pub fn code(&self) -> u32 {
        match self {
            Error::InvalidDiscriminatorConfig { .. } => 11,
            Error::CorruptSchemaData(_) => 20,
            Error::InvalidDiscriminatorEncoding(_) => 21,
            Error::DecompressionFailure(_) => 22,
            Error::Unencodable(_) => 23,
            Error::InvalidInput(_) => 30,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// True for errors caused by the on-disk dataset.
    pub fn is_dataset_error(&self) -> bool {
        (20..30).contains(&self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_grouped() {
        assert_eq!(
            Error::InvalidDiscriminatorConfig {
                line: 3,
                reason: "empty segment".into()
            }
            .code(),
            11
        );
        assert!(Error::CorruptSchemaData("eof".into()).is_dataset_error());
        assert!(Error::DecompressionFailure("bad".into()).is_dataset_error());
        assert!(!Error::InvalidInput("x".into()).is_dataset_error());
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert_eq!(err.code(), 60);
        assert!(err.to_string().contains("gone"));
    }
}

//! Error types for dataset encoding and decoding.

use thiserror::Error;

/// Errors that can occur while encoding or decoding a dataset.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// I/O error from the compression stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Truncated or malformed node/literal bytes
    #[error("corrupt schema data at byte {offset}: {reason}")]
    CorruptSchemaData { offset: usize, reason: String },

    /// A discriminator key blob that does not start with the object tag
    #[error("invalid discriminator encoding at byte {offset}: expected object tag 0x07, found {tag:#04x}")]
    InvalidDiscriminatorEncoding { offset: usize, tag: u8 },

    /// Compressed stream is invalid
    #[error("dataset decompression failed: {0}")]
    DecompressionFailure(#[source] std::io::Error),

    /// A name or string the wire format cannot represent
    #[error("{what} {value:?} cannot be encoded: {reason}")]
    UnencodableString {
        what: &'static str,
        value: String,
        reason: &'static str,
    },

    /// A number with no wire representation
    #[error("number {0} cannot be encoded")]
    UnencodableNumber(String),
}

/// Result type alias for dataset operations.
pub type Result<T> = std::result::Result<T, DatasetError>;

impl From<DatasetError> for tm_common::Error {
    fn from(err: DatasetError) -> Self {
        match err {
            DatasetError::Io(e) => tm_common::Error::Io(e),
            e @ DatasetError::CorruptSchemaData { .. } => {
                tm_common::Error::CorruptSchemaData(e.to_string())
            }
            e @ DatasetError::InvalidDiscriminatorEncoding { .. } => {
                tm_common::Error::InvalidDiscriminatorEncoding(e.to_string())
            }
            DatasetError::DecompressionFailure(e) => {
                tm_common::Error::DecompressionFailure(e.to_string())
            }
            e @ (DatasetError::UnencodableString { .. } | DatasetError::UnencodableNumber(_)) => {
                tm_common::Error::Unencodable(e.to_string())
            }
        }
    }
}

//! Centralized error types for eml2md.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the eml2md library.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified file does not exist.
    #[error("email file not found: {0}")]
    FileNotFound(PathBuf),

    /// The input is not a parseable RFC 5322 message.
    #[error("failed to parse email: {0}")]
    InvalidMessage(String),

    /// A `Content-Type` or `Content-Disposition` value does not follow the grammar.
    #[error("malformed content type '{value}': {reason}")]
    MalformedContentType { value: String, reason: String },

    /// The header block of a MIME part could not be parsed.
    #[error("MIME decoding error: {0}")]
    MimeError(String),

    /// The character encoding is not supported.
    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// A `Content-Transfer-Encoding` could not be reversed.
    #[error("failed to decode {encoding} content: {reason}")]
    TransferDecode { encoding: String, reason: String },

    /// A directory could not be created.
    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An invalid path was provided.
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

/// Convenience alias for `Result<T, ExtractError>`.
pub type Result<T> = std::result::Result<T, ExtractError>;

impl ExtractError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a `MalformedContentType` variant for the given raw value.
    pub fn content_type(value: &str, reason: impl Into<String>) -> Self {
        Self::MalformedContentType {
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

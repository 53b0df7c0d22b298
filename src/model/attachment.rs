//! Saved attachment records.

use std::path::PathBuf;

/// An attachment written to disk during extraction.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Attachment {
    /// Final file name after sanitizing and collision resolution.
    pub filename: String,

    /// Location relative to the extraction directory (`attachments/<filename>`).
    pub path: PathBuf,

    /// Number of decoded bytes written.
    pub size: u64,
}

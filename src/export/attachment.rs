//! Write extracted attachments to disk.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::filename::unique_filename;
use crate::error::{ExtractError, Result};
use crate::model::attachment::Attachment;
use crate::parser::mime::AttachmentSink;

/// Subdirectory of the extraction directory holding the attachments.
pub const ATTACHMENTS_DIR: &str = "attachments";

/// Saves attachments under `<output_dir>/attachments/`.
///
/// The directory is created when the first attachment arrives, so messages
/// without attachments leave no empty folder behind. Existing files are
/// never overwritten; colliding names get a `_<n>` suffix.
#[derive(Debug)]
pub struct AttachmentWriter {
    dir: PathBuf,
    dir_ready: bool,
}

impl AttachmentWriter {
    pub fn new(output_dir: &Path) -> Self {
        Self {
            dir: output_dir.join(ATTACHMENTS_DIR),
            dir_ready: false,
        }
    }

    /// Absolute attachment directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn ensure_dir(&mut self) -> Result<()> {
        if !self.dir_ready {
            std::fs::create_dir_all(&self.dir).map_err(|source| ExtractError::CreateDir {
                path: self.dir.clone(),
                source,
            })?;
            debug!(dir = %self.dir.display(), "Created attachments directory");
            self.dir_ready = true;
        }
        Ok(())
    }
}

impl AttachmentSink for AttachmentWriter {
    fn store(&mut self, filename: &str, content: &[u8]) -> Result<Attachment> {
        self.ensure_dir()?;

        let name = unique_filename(filename, |candidate| self.dir.join(candidate).exists());
        let path = self.dir.join(&name);
        std::fs::write(&path, content).map_err(|e| ExtractError::io(&path, e))?;

        Ok(Attachment {
            path: Path::new(ATTACHMENTS_DIR).join(&name),
            filename: name,
            size: content.len() as u64,
        })
    }
}

//! Extraction pipeline: one `.eml` file in, one Markdown folder out.
//!
//! ```text
//! <output_dir>/<name>_email/
//!   email.md
//!   attachments/
//! ```

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{ExtractError, Result};
use crate::export::attachment::AttachmentWriter;
use crate::export::filename::{sanitize_filename, truncate_chars};
use crate::export::markdown::{render_markdown, MARKDOWN_FILENAME};
use crate::model::attachment::Attachment;
use crate::model::metadata::EmailMetadata;
use crate::parser::message::Message;
use crate::parser::mime::extract_parts;

/// Suffix every extraction folder name ends with.
pub const FOLDER_SUFFIX: &str = "_email";

/// Tunables for [`extract_email_content`].
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Maximum length, in characters, of a subject-derived folder name (before the suffix).
    pub folder_name_max_len: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            folder_name_max_len: 100,
        }
    }
}

/// Everything produced by one extraction.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExtractionResult {
    /// Full text of `email.md`.
    pub markdown: String,
    pub metadata: EmailMetadata,
    pub attachments: Vec<Attachment>,
    /// Absolute extraction folder.
    pub output_dir: PathBuf,
    /// Absolute path of `email.md`.
    pub markdown_file: PathBuf,
    /// Extraction folder name (`<name>_email`).
    pub email_name: String,
}

/// Extract one message into a Markdown folder.
///
/// Without `output_dir` the folder is created next to the `.eml` file. A
/// given `output_dir` that already ends with the folder name is used as is.
/// Only a missing or unreadable input, an unparseable header block, or an
/// unwritable output folder are errors; problems inside the MIME tree are
/// logged and skipped.
pub fn extract_email_content(
    eml_path: &Path,
    output_dir: Option<&Path>,
    options: &ExtractOptions,
) -> Result<ExtractionResult> {
    let eml_path = expand_path(eml_path)?;
    if !eml_path.exists() {
        return Err(ExtractError::FileNotFound(eml_path));
    }
    info!(path = %eml_path.display(), "Extracting");

    let raw = std::fs::read(&eml_path).map_err(|e| ExtractError::io(&eml_path, e))?;
    let message = Message::parse(&raw)?;
    let metadata = EmailMetadata::from_headers(&message.headers);

    let email_name = folder_name(&metadata.subject, &eml_stem(&eml_path), options.folder_name_max_len);
    let output_dir = resolve_output_dir(&eml_path, output_dir, &email_name)?;
    std::fs::create_dir_all(&output_dir).map_err(|source| ExtractError::CreateDir {
        path: output_dir.clone(),
        source,
    })?;
    info!(output_dir = %output_dir.display(), "Output directory ready");

    let mut writer = AttachmentWriter::new(&output_dir);
    let extracted = extract_parts(&message, &mut writer);

    let markdown = render_markdown(&metadata, &extracted.body, &extracted.attachments);
    let markdown_file = output_dir.join(MARKDOWN_FILENAME);
    std::fs::write(&markdown_file, &markdown).map_err(|e| ExtractError::io(&markdown_file, e))?;

    Ok(ExtractionResult {
        markdown,
        metadata,
        attachments: extracted.attachments,
        output_dir,
        markdown_file,
        email_name,
    })
}

/// Remove an extraction folder and everything in it.
pub fn cleanup_extraction(output_dir: &Path) -> Result<()> {
    std::fs::remove_dir_all(output_dir).map_err(|e| ExtractError::io(output_dir, e))?;
    info!(output_dir = %output_dir.display(), "Removed extraction directory");
    Ok(())
}

/// Expand a leading `~` to the home directory and make the path absolute.
pub fn expand_path(path: &Path) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(ExtractError::InvalidPath("empty path".into()));
    }

    let expanded = match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    };

    std::path::absolute(&expanded)
        .map_err(|e| ExtractError::InvalidPath(format!("{}: {e}", expanded.display())))
}

/// Name of the extraction folder.
///
/// The sanitized subject cut to `max_len` characters, or `fallback` when the
/// subject is empty; `_email` is appended unless already present.
pub fn folder_name(subject: &str, fallback: &str, max_len: usize) -> String {
    let mut name = if subject.is_empty() {
        fallback.to_string()
    } else {
        truncate_chars(&sanitize_filename(subject), max_len).to_string()
    };
    if !name.ends_with(FOLDER_SUFFIX) {
        name.push_str(FOLDER_SUFFIX);
    }
    name
}

/// File name of the input without a trailing `.eml`.
fn eml_stem(eml_path: &Path) -> String {
    let file_name = eml_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match file_name.strip_suffix(".eml") {
        Some(stem) => stem.to_string(),
        None => file_name,
    }
}

fn resolve_output_dir(eml_path: &Path, output_dir: Option<&Path>, email_name: &str) -> Result<PathBuf> {
    match output_dir {
        None => {
            let parent = eml_path.parent().unwrap_or(Path::new("."));
            Ok(parent.join(email_name))
        }
        Some(dir) => {
            let dir = expand_path(dir)?;
            if dir.ends_with(email_name) {
                Ok(dir)
            } else {
                Ok(dir.join(email_name))
            }
        }
    }
}

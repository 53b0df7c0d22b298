//! MIME body and attachment extraction.
//!
//! One recursive pass over the multipart tree does two jobs at once: it picks
//! the readable body (first `text/plain` wins over first `text/html`) and it
//! hands every attachment-disposed leaf to an [`AttachmentSink`].

use std::borrow::Cow;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use quoted_printable::ParseMode;
use tracing::{debug, info, warn};

use crate::error::{ExtractError, Result};
use crate::export::filename::sanitize_filename;
use crate::model::attachment::Attachment;
use crate::parser::content_type::{check_media_type, ContentType};
use crate::parser::header::decode_encoded_words;
use crate::parser::html::html_to_text;
use crate::parser::message::Message;
use crate::parser::multipart::{MimePart, MimeTree};

/// Body text used when no readable part was found.
pub const NO_READABLE_CONTENT: &str = "[No readable content found]";

/// Maximum depth for recursive multipart parsing (to prevent stack overflow on adversarial input).
const MAX_DEPTH: usize = 10;

/// Destination for decoded attachments.
pub trait AttachmentSink {
    /// Persist one decoded attachment under the sanitized `filename`.
    ///
    /// The sink picks the final (collision-free) name and reports it back.
    /// [`ExtractError::CreateDir`] means no attachment can be stored at all.
    fn store(&mut self, filename: &str, content: &[u8]) -> Result<Attachment>;
}

/// Body text and saved attachments of one message.
#[derive(Debug, Clone, Default)]
pub struct Extracted {
    pub body: String,
    pub attachments: Vec<Attachment>,
}

/// Extract body and attachments in a single pass.
pub fn extract_parts(msg: &Message<'_>, sink: &mut dyn AttachmentSink) -> Extracted {
    MimeWalker::new(true, Some(sink)).run(msg)
}

/// Extract only the readable body.
pub fn extract_body(msg: &Message<'_>) -> String {
    MimeWalker::new(true, None).run(msg).body
}

/// Extract only the attachments.
pub fn extract_attachments(msg: &Message<'_>, sink: &mut dyn AttachmentSink) -> Vec<Attachment> {
    MimeWalker::new(false, Some(sink)).run(msg).attachments
}

/// First-seen body candidates of one multipart level.
#[derive(Debug, Default)]
struct BodyCandidates {
    plain: Option<String>,
    html: Option<String>,
}

impl BodyCandidates {
    fn offer_leaf(&mut self, media_type: &str, text: String) {
        if text.is_empty() {
            return;
        }
        match media_type {
            "text/plain" if self.plain.is_none() => self.plain = Some(text),
            "text/html" if self.html.is_none() => self.html = Some(text),
            _ => {}
        }
    }

    /// A nested multipart counts as one body at this level. Nested
    /// `alternative` groups fill the HTML slot, anything else the plain slot.
    fn offer_nested(&mut self, media_type: &str, text: String) {
        if text.is_empty() {
            return;
        }
        if media_type.contains("alternative") && self.html.is_none() {
            self.html = Some(text);
        } else if self.plain.is_none() {
            self.plain = Some(text);
        }
    }

    /// Plain text first, then the HTML slot reduced to text, then the sentinel.
    fn resolve(self) -> String {
        let Self { plain, html } = self;
        plain
            .or_else(|| html.map(|h| html_to_text(&h)))
            .unwrap_or_else(|| NO_READABLE_CONTENT.to_string())
    }
}

/// Recursive walker over a message's MIME tree.
struct MimeWalker<'s> {
    collect_body: bool,
    sink: Option<&'s mut dyn AttachmentSink>,
    attachments: Vec<Attachment>,
}

impl<'s> MimeWalker<'s> {
    fn new(collect_body: bool, sink: Option<&'s mut dyn AttachmentSink>) -> Self {
        Self {
            collect_body,
            sink,
            attachments: Vec::new(),
        }
    }

    fn run(mut self, msg: &Message<'_>) -> Extracted {
        let content_type = match msg.content_type() {
            None => {
                let body = if self.collect_body {
                    String::from_utf8_lossy(msg.body).into_owned()
                } else {
                    String::new()
                };
                return Extracted {
                    body,
                    attachments: Vec::new(),
                };
            }
            Some(Ok(ct)) => ct,
            Some(Err(e)) => {
                warn!(error = %e, "Unreadable top-level Content-Type, treating body as plain text");
                ContentType::default()
            }
        };

        let body = if content_type.is_multipart() {
            self.walk_message(msg, &content_type)
        } else if self.collect_body {
            let encoding = msg.headers.get_or_empty("content-transfer-encoding");
            let content = decode_transfer_encoding(msg.body, encoding);
            decode_part_body(&content, content_type.charset(), &content_type.media_type)
        } else {
            String::new()
        };

        Extracted {
            body: if self.collect_body { body } else { String::new() },
            attachments: self.attachments,
        }
    }

    fn walk_message(&mut self, msg: &Message<'_>, content_type: &ContentType) -> String {
        if content_type.boundary().is_none() {
            warn!(
                media_type = %content_type.media_type,
                "Multipart message without boundary"
            );
            return NO_READABLE_CONTENT.to_string();
        }
        let Some(tree) = msg.mime_tree() else {
            warn!("Could not read the MIME structure of the message");
            return NO_READABLE_CONTENT.to_string();
        };
        match tree.root() {
            Ok(root) => self.walk(&tree, &root, self.collect_body, 0),
            Err(e) => {
                warn!(error = %e, "Could not read the top-level MIME part");
                NO_READABLE_CONTENT.to_string()
            }
        }
    }

    /// Walk the children of one multipart part and resolve its body text.
    fn walk(
        &mut self,
        tree: &MimeTree<'_>,
        parent: &MimePart<'_>,
        collect_body: bool,
        depth: usize,
    ) -> String {
        let mut candidates = BodyCandidates::default();

        for part in tree.children(parent) {
            match part {
                Ok(part) => self.visit(tree, &part, collect_body, depth, &mut candidates),
                Err(e) => {
                    warn!(error = %e, depth, "Stopping at malformed MIME part");
                    break;
                }
            }
        }

        candidates.resolve()
    }

    fn visit(
        &mut self,
        tree: &MimeTree<'_>,
        part: &MimePart<'_>,
        collect_body: bool,
        depth: usize,
        candidates: &mut BodyCandidates,
    ) {
        let content_type = match part.content_type() {
            Ok(ct) => Some(ct),
            Err(e) => {
                warn!(error = %e, "Skipping MIME part with unreadable Content-Type");
                None
            }
        };
        let is_attachment = part.is_attachment();
        let wants_body = collect_body && !is_attachment && content_type.is_some();

        if let Some(ct) = content_type.as_ref().filter(|ct| ct.is_multipart()) {
            if !wants_body && self.sink.is_none() {
                return;
            }
            if ct.boundary().is_none() {
                debug!(media_type = %ct.media_type, "Nested multipart without boundary");
                return;
            }
            if depth + 1 > MAX_DEPTH {
                warn!(depth, "Multipart nesting too deep, skipping");
                return;
            }
            let text = self.walk(tree, part, wants_body, depth + 1);
            if wants_body {
                candidates.offer_nested(&ct.media_type, text);
            }
            return;
        }

        if is_attachment {
            self.save_attachment(part);
            return;
        }

        if let Some(ct) = content_type.filter(|_| wants_body) {
            let content = decode_transfer_encoding(part.body, part.transfer_encoding());
            let text = decode_part_body(&content, ct.charset(), &ct.media_type);
            candidates.offer_leaf(&ct.media_type, text);
        }
    }

    fn save_attachment(&mut self, part: &MimePart<'_>) {
        let Some(sink) = self.sink.as_deref_mut() else {
            return;
        };
        let Some(declared) = attachment_filename(part) else {
            warn!(
                disposition = part.disposition(),
                "Skipping attachment without a filename"
            );
            return;
        };

        let filename = sanitize_filename(&decode_encoded_words(&declared));
        let content = decode_transfer_encoding(part.body, part.transfer_encoding());

        match sink.store(&filename, &content) {
            Ok(attachment) => {
                info!(
                    filename = %attachment.filename,
                    size = attachment.size,
                    "Extracted attachment"
                );
                self.attachments.push(attachment);
            }
            Err(e @ ExtractError::CreateDir { .. }) => {
                warn!(error = %e, "Cannot create attachments directory, skipping attachments");
                self.sink = None;
            }
            Err(e) => {
                warn!(filename = %filename, error = %e, "Failed to save attachment");
            }
        }
    }
}

/// Name declared for an attachment part.
///
/// A well-formed `Content-Disposition` gives its `filename` reduced to the
/// last path segment. Otherwise the `filename` a lenient read of the raw
/// value finds is used as written. `Content-Type` `name` is not consulted.
fn attachment_filename(part: &MimePart<'_>) -> Option<String> {
    let filename = part.disposition_param("filename")?;
    let name = if check_media_type(part.disposition()).is_ok() {
        base_name(filename)
    } else {
        filename
    };
    Some(name.to_string()).filter(|name| !name.trim().is_empty())
}

/// Last `/`-separated segment of a path, ignoring trailing slashes.
fn base_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return if path.is_empty() { path } else { "/" };
    }
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Reverse a `Content-Transfer-Encoding`, keeping the original bytes on failure.
pub fn decode_transfer_encoding<'b>(body: &'b [u8], encoding: &str) -> Cow<'b, [u8]> {
    match try_decode_transfer_encoding(body, encoding) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!(error = %e, "Keeping content undecoded");
            Cow::Borrowed(body)
        }
    }
}

/// Reverse a `Content-Transfer-Encoding`.
///
/// Only the exact values `base64` and `quoted-printable` are decoded; every
/// other value (including none) passes the bytes through.
pub fn try_decode_transfer_encoding<'b>(body: &'b [u8], encoding: &str) -> Result<Cow<'b, [u8]>> {
    match encoding {
        "base64" => {
            let compact: Vec<u8> = body
                .iter()
                .copied()
                .filter(|b| !b.is_ascii_whitespace())
                .collect();
            STANDARD
                .decode(compact)
                .map(Cow::Owned)
                .map_err(|e| ExtractError::TransferDecode {
                    encoding: encoding.to_string(),
                    reason: e.to_string(),
                })
        }
        "quoted-printable" => quoted_printable::decode(body, ParseMode::Robust)
            .map(Cow::Owned)
            .map_err(|e| ExtractError::TransferDecode {
                encoding: encoding.to_string(),
                reason: e.to_string(),
            }),
        _ => Ok(Cow::Borrowed(body)),
    }
}

/// Turn a leaf body into trimmed UTF-8 text.
///
/// A charset other than empty, `utf-8` or `UTF-8` is transcoded; an unknown
/// charset falls back to reading the bytes as UTF-8. `text/html` is rendered
/// to plain text.
pub fn decode_part_body(raw: &[u8], charset: &str, media_type: &str) -> String {
    let text = if charset.is_empty() || charset == "utf-8" || charset == "UTF-8" {
        String::from_utf8_lossy(raw).into_owned()
    } else {
        transcode(raw, charset).unwrap_or_else(|e| {
            warn!(charset, error = %e, "Charset conversion failed, using raw bytes");
            String::from_utf8_lossy(raw).into_owned()
        })
    };

    let text = if text.contains('\r') {
        text.replace("\r\n", "\n")
    } else {
        text
    };

    if media_type == "text/html" {
        html_to_text(&text)
    } else {
        text.trim().to_string()
    }
}

/// Convert bytes in `charset` to UTF-8 using the WHATWG label registry.
pub fn transcode(raw: &[u8], charset: &str) -> Result<String> {
    let encoding = encoding_rs::Encoding::for_label(charset.trim().as_bytes())
        .ok_or_else(|| ExtractError::UnsupportedEncoding(charset.to_string()))?;
    let (decoded, _, _) = encoding.decode(raw);
    Ok(decoded.into_owned())
}

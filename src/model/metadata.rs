//! Header metadata shown in the Markdown summary.

use super::address::EmailAddress;
use crate::parser::header::{decode_encoded_words, format_date, HeaderMap};

/// Rendered when the message has no `From` header.
pub const UNKNOWN_SENDER: &str = "Unknown";

/// Normalized top-level headers of one message.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EmailMetadata {
    /// First sender as `Name <addr>` or `addr`.
    pub from: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    /// Subject with encoded-words decoded.
    pub subject: String,
    /// `YYYY-MM-DD HH:MM:SS` in the sender's offset, or the raw header value.
    pub date: String,
    pub message_id: String,
    pub in_reply_to: String,
    pub references: String,
}

impl EmailMetadata {
    /// Collect metadata from a parsed top-level header block.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            from: format_sender(headers.get_or_empty("from")),
            to: format_address_list(headers.get_or_empty("to")),
            cc: format_address_list(headers.get_or_empty("cc")),
            subject: decode_encoded_words(headers.get_or_empty("subject")),
            date: format_date(headers.get_or_empty("date")),
            message_id: headers.get_or_empty("message-id").trim().to_string(),
            in_reply_to: headers.get_or_empty("in-reply-to").trim().to_string(),
            references: headers.get_or_empty("references").trim().to_string(),
        }
    }

    /// `true` when the message belongs to a thread.
    pub fn has_thread_info(&self) -> bool {
        !self.in_reply_to.is_empty() || !self.references.is_empty()
    }
}

fn format_sender(raw: &str) -> String {
    if raw.trim().is_empty() {
        return UNKNOWN_SENDER.to_string();
    }
    EmailAddress::parse_list(raw)
        .first()
        .map(EmailAddress::display)
        .unwrap_or_else(|| raw.trim().to_string())
}

fn format_address_list(raw: &str) -> Vec<String> {
    EmailAddress::parse_list(raw)
        .iter()
        .map(EmailAddress::display)
        .collect()
}

//! Top-level RFC 5322 message: header block plus body bytes.

use crate::error::{ExtractError, Result};
use crate::parser::content_type::{parse_content_type, ContentType};
use crate::parser::header::{find_header_end, HeaderMap};
use crate::parser::multipart::MimeTree;

/// A parsed message. The body is borrowed from the input buffer.
#[derive(Debug, Clone)]
pub struct Message<'a> {
    /// Unfolded top-level headers.
    pub headers: HeaderMap,
    /// Everything after the first blank line.
    pub body: &'a [u8],
    /// The message itself, after any BOM or mbox separator line.
    raw: &'a [u8],
}

impl<'a> Message<'a> {
    /// Parse a raw `.eml` buffer.
    ///
    /// A leading UTF-8 BOM and an mbox `From ` separator line are skipped.
    /// Input without a blank line is treated as headers only.
    pub fn parse(raw: &'a [u8]) -> Result<Self> {
        let data = skip_from_line(raw);
        if data.iter().all(u8::is_ascii_whitespace) {
            return Err(ExtractError::InvalidMessage("input is empty".into()));
        }

        let (header_end, body_start) = find_header_end(data).unwrap_or((data.len(), data.len()));
        let headers = HeaderMap::parse(&data[..header_end])?;

        Ok(Self {
            headers,
            body: &data[body_start..],
            raw: data,
        })
    }

    /// Raw value of the top-level `Content-Type`, if any.
    pub fn content_type_raw(&self) -> Option<&str> {
        self.headers.get("content-type")
    }

    /// Parse the top-level `Content-Type`; `None` when the header is absent.
    pub fn content_type(&self) -> Option<Result<ContentType>> {
        self.content_type_raw().map(parse_content_type)
    }

    /// Parse the MIME part tree of the whole message.
    pub fn mime_tree(&self) -> Option<MimeTree<'a>> {
        MimeTree::parse(self.raw)
    }
}

/// Skip the `From ` separator line at the start of MBOX-exported messages.
fn skip_from_line(data: &[u8]) -> &[u8] {
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);

    if data.starts_with(b"From ") {
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
    }
    data
}

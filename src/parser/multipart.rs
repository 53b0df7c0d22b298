//! The multipart structure of a message, read from `mail-parser`'s part tree.
//!
//! `mail-parser` finds the delimiters and parses part headers; a [`MimePart`]
//! still exposes the raw header block and the raw (transfer-encoded) body
//! bytes from the original buffer, so decoding stays under our control.

use std::slice;

use mail_parser::{MessageParser, MessagePart, MessagePartId, MimeHeaders, PartType};

use crate::error::{ExtractError, Result};
use crate::parser::content_type::{check_media_type, ContentType};
use crate::parser::header::HeaderMap;

/// Parsed MIME tree of one message, borrowing the message buffer.
pub struct MimeTree<'a> {
    raw: &'a [u8],
    message: mail_parser::Message<'a>,
}

impl<'a> MimeTree<'a> {
    /// Parse the MIME structure of a complete message (headers included).
    ///
    /// Returns `None` when `mail-parser` finds no header block at all.
    pub fn parse(raw: &'a [u8]) -> Option<Self> {
        MessageParser::default()
            .parse(raw)
            .map(|message| Self { raw, message })
    }

    /// The top-level part.
    pub fn root(&self) -> Result<MimePart<'_>> {
        self.part(0)
    }

    /// Iterate the direct children of a multipart part in stream order.
    pub fn children<'t>(&'t self, parent: &MimePart<'t>) -> MultipartReader<'t> {
        MultipartReader {
            tree: self,
            ids: parent.child_ids().iter(),
        }
    }

    fn part(&self, id: MessagePartId) -> Result<MimePart<'_>> {
        let part = self
            .message
            .parts
            .get(id)
            .ok_or_else(|| ExtractError::MimeError(format!("no MIME part #{id}")))?;

        let header_block = self
            .raw
            .get(part.offset_header..part.offset_body)
            .unwrap_or_default();
        let headers = HeaderMap::parse(header_block)
            .map_err(|e| ExtractError::MimeError(format!("malformed part headers: {e}")))?;

        Ok(MimePart {
            headers,
            body: self.raw.get(part.offset_body..part.offset_end).unwrap_or_default(),
            part,
        })
    }
}

/// Forward-only iterator over the children of one multipart part.
///
/// A child whose header block is malformed yields an error; callers stop
/// reading that level there.
pub struct MultipartReader<'t> {
    tree: &'t MimeTree<'t>,
    ids: slice::Iter<'t, MessagePartId>,
}

impl<'t> Iterator for MultipartReader<'t> {
    type Item = Result<MimePart<'t>>;

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        self.ids.next().map(|&id| tree.part(id))
    }
}

/// One body part: its own headers plus its (still transfer-encoded) body.
#[derive(Debug, Clone)]
pub struct MimePart<'t> {
    pub headers: HeaderMap,
    pub body: &'t [u8],
    part: &'t MessagePart<'t>,
}

impl<'t> MimePart<'t> {
    /// This part's `Content-Type`. An absent header means `text/plain`.
    pub fn content_type(&self) -> Result<ContentType> {
        let Some(raw) = self.headers.get("content-type") else {
            return Ok(ContentType::default());
        };
        check_media_type(raw)?;
        self.part
            .content_type()
            .map(ContentType::from)
            .ok_or_else(|| ExtractError::content_type(raw, "no media type"))
    }

    /// Raw `Content-Disposition` value, or `""`.
    pub fn disposition(&self) -> &str {
        self.headers.get_or_empty("content-disposition")
    }

    /// `true` when the disposition mentions `attachment` anywhere.
    pub fn is_attachment(&self) -> bool {
        self.disposition().contains("attachment")
    }

    /// A `Content-Disposition` parameter as read by the lenient field parser.
    pub fn disposition_param(&self, name: &str) -> Option<&str> {
        self.part.content_disposition()?.attribute(name)
    }

    /// Raw `Content-Transfer-Encoding` value, or `""`.
    pub fn transfer_encoding(&self) -> &str {
        self.headers.get_or_empty("content-transfer-encoding")
    }

    fn child_ids(&self) -> &'t [MessagePartId] {
        match &self.part.body {
            PartType::Multipart(ids) => ids.as_slice(),
            _ => &[],
        }
    }
}

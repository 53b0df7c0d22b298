//! Message parsing: header decoding, content types, the `mail-parser` part tree, and MIME extraction.

pub mod content_type;
pub mod header;
pub mod html;
pub mod message;
pub mod mime;
pub mod multipart;

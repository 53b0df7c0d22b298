//! `Content-Type` / `Content-Disposition` values.
//!
//! Parameters (quoting, RFC 2231 continuations and charsets, RFC 2047 words)
//! are read by `mail-parser`'s field parser; this module adds the media type
//! check and the lookups the extractor needs.

use std::collections::HashMap;

use mail_parser::parsers::MessageStream;

use crate::error::{ExtractError, Result};

/// Media type assumed for a part without a `Content-Type` header (RFC 2045 §5.2).
pub const DEFAULT_MEDIA_TYPE: &str = "text/plain";

/// A parsed `type/subtype; key=value; ...` header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Lower-cased media type, e.g. `"multipart/alternative"`.
    ///
    /// For `Content-Disposition` this is the disposition type (`"attachment"`).
    pub media_type: String,
    /// Parameters keyed by lower-cased name. The first occurrence of a name wins.
    pub params: HashMap<String, String>,
}

impl ContentType {
    /// Resolve an optional header value. An absent header means `text/plain`.
    pub fn resolve(raw: Option<&str>) -> Result<Self> {
        match raw {
            Some(value) => parse_content_type(value),
            None => Ok(Self::default()),
        }
    }

    /// Look up a parameter by (case-insensitive) name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(&name.to_lowercase()).map(String::as_str)
    }

    /// The declared `charset`, or `""` when none was given.
    pub fn charset(&self) -> &str {
        self.param("charset").unwrap_or("")
    }

    /// The multipart `boundary`, if present and non-empty.
    pub fn boundary(&self) -> Option<&str> {
        self.param("boundary").filter(|b| !b.is_empty())
    }

    pub fn is_multipart(&self) -> bool {
        self.media_type.starts_with("multipart/")
    }
}

impl Default for ContentType {
    fn default() -> Self {
        Self {
            media_type: DEFAULT_MEDIA_TYPE.to_string(),
            params: HashMap::new(),
        }
    }
}

impl From<&mail_parser::ContentType<'_>> for ContentType {
    fn from(ct: &mail_parser::ContentType<'_>) -> Self {
        let media_type = match ct.subtype() {
            Some(sub) => format!("{}/{sub}", ct.ctype()),
            None => ct.ctype().to_string(),
        };

        let mut params = HashMap::new();
        for (name, value) in ct.attributes().unwrap_or_default() {
            params
                .entry(name.to_lowercase())
                .or_insert_with(|| value.to_string());
        }

        Self {
            media_type: media_type.to_lowercase(),
            params,
        }
    }
}

/// Parse a `Content-Type` (or `Content-Disposition`) header value.
///
/// The media type must be `token ["/" token]`; anything else is
/// [`ExtractError::MalformedContentType`]. Parameters are read leniently.
pub fn parse_content_type(raw: &str) -> Result<ContentType> {
    check_media_type(raw)?;

    // The field parser reads up to the end of the header line
    let line = format!("{}\n", raw.trim());
    let value = MessageStream::new(line.as_bytes()).parse_content_type();
    match value.as_content_type() {
        Some(ct) => Ok(ContentType::from(ct)),
        None => Err(ExtractError::content_type(raw, "no media type")),
    }
}

/// Check the `type/subtype` segment of a raw header value.
pub fn check_media_type(raw: &str) -> Result<()> {
    let media = raw.split(';').next().unwrap_or_default().trim();
    let (main, sub) = match media.split_once('/') {
        Some((main, sub)) => (main.trim(), Some(sub.trim())),
        None => (media, None),
    };

    let reason = if main.is_empty() {
        "no media type"
    } else if !main.chars().all(is_token_char) {
        "invalid character in media type"
    } else {
        match sub {
            Some("") => "expected token after slash",
            Some(sub) if !sub.chars().all(is_token_char) => "unexpected content after media subtype",
            _ => return Ok(()),
        }
    };
    Err(ExtractError::content_type(raw, reason))
}

/// RFC 2045 token characters: printable ASCII minus space and tspecials.
fn is_token_char(c: char) -> bool {
    c.is_ascii_graphic() && !"()<>@,;:\\\"/[]?=".contains(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let ct = parse_content_type("text/plain; charset=\"UTF-8\"").unwrap();
        assert_eq!(ct.media_type, "text/plain");
        assert_eq!(ct.charset(), "UTF-8");
        assert!(!ct.is_multipart());
    }

    #[test]
    fn test_media_type_lowercased_params_keys_lowercased() {
        let ct = parse_content_type("Multipart/Mixed; BOUNDARY=\"AbC\"").unwrap();
        assert_eq!(ct.media_type, "multipart/mixed");
        assert_eq!(ct.boundary(), Some("AbC"));
        assert!(ct.is_multipart());
    }

    #[test]
    fn test_trailing_semicolon_and_folding_whitespace() {
        let ct = parse_content_type("text/html;\n\tcharset=iso-8859-1;").unwrap();
        assert_eq!(ct.media_type, "text/html");
        assert_eq!(ct.charset(), "iso-8859-1");
    }

    #[test]
    fn test_disposition_without_subtype() {
        let cd = parse_content_type("attachment; filename=\"report.pdf\"").unwrap();
        assert_eq!(cd.media_type, "attachment");
        assert_eq!(cd.param("filename"), Some("report.pdf"));
    }

    #[test]
    fn test_malformed_media_types() {
        assert!(parse_content_type("").is_err());
        assert!(parse_content_type(";;;").is_err());
        assert!(parse_content_type("text/").is_err());
        assert!(parse_content_type("text plain").is_err());
        assert!(matches!(
            parse_content_type("text/pl@in"),
            Err(ExtractError::MalformedContentType { .. })
        ));
    }

    #[test]
    fn test_missing_header_defaults_to_plain_text() {
        let ct = ContentType::resolve(None).unwrap();
        assert_eq!(ct.media_type, "text/plain");
        assert_eq!(ct.charset(), "");
        assert_eq!(ct.boundary(), None);
    }

    #[test]
    fn test_multipart_without_boundary() {
        let ct = parse_content_type("multipart/mixed").unwrap();
        assert!(ct.is_multipart());
        assert_eq!(ct.boundary(), None);
    }

    #[test]
    fn test_rfc2231_extended_value() {
        let cd =
            parse_content_type("attachment; filename*=UTF-8''r%C3%A9sum%C3%A9.pdf").unwrap();
        assert_eq!(cd.param("filename"), Some("résumé.pdf"));
    }

    #[test]
    fn test_encoded_word_parameter() {
        let cd = parse_content_type("attachment; filename=\"=?UTF-8?B?aW5mb3JtZS5wZGY=?=\"")
            .unwrap();
        assert_eq!(cd.param("filename"), Some("informe.pdf"));
    }

    #[test]
    fn test_from_mail_parser_value() {
        let value = MessageStream::new(b"Text/HTML; Charset=latin1\n").parse_content_type();
        let ct = ContentType::from(value.as_content_type().unwrap());
        assert_eq!(ct.media_type, "text/html");
        assert_eq!(ct.charset(), "latin1");
    }
}

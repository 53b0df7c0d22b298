//! RFC 5322 header parsing: folding, encoded-words (RFC 2047), and date parsing.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use tracing::{debug, warn};

use crate::error::{ExtractError, Result};

/// Encoded-words in the wild are often missing their `=` padding.
const ENCODED_WORD_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// An unfolded header block.
///
/// Names are stored lower-cased so lookups are case-insensitive. A name may
/// appear several times; [`HeaderMap::get`] returns the first occurrence.
#[derive(Debug, Clone, Default)]
pub struct HeaderMap {
    entries: Vec<(String, String)>,
}

impl HeaderMap {
    /// Parse a raw header block (everything before the first blank line).
    ///
    /// Continuation lines are joined to the previous header with a single
    /// space. A line that is neither a continuation nor `name: value` makes the
    /// whole block invalid.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let text = decode_header_bytes(raw);
        let mut entries: Vec<(String, String)> = Vec::new();

        for line in text.lines() {
            if line.is_empty() {
                continue;
            }
            if line.starts_with(' ') || line.starts_with('\t') {
                let Some(last) = entries.last_mut() else {
                    return Err(ExtractError::InvalidMessage(
                        "continuation line before the first header".into(),
                    ));
                };
                let folded = line.trim();
                if !folded.is_empty() {
                    if !last.1.is_empty() {
                        last.1.push(' ');
                    }
                    last.1.push_str(folded);
                }
                continue;
            }

            let Some(colon_pos) = line.find(':') else {
                return Err(ExtractError::InvalidMessage(format!(
                    "malformed header line: {line:?}"
                )));
            };
            let name = line[..colon_pos].trim();
            if name.is_empty() || name.contains(char::is_whitespace) {
                return Err(ExtractError::InvalidMessage(format!(
                    "malformed header name: {line:?}"
                )));
            }
            let value = line[colon_pos + 1..].trim().to_string();
            entries.push((name.to_lowercase(), value));
        }

        Ok(Self { entries })
    }

    /// Get the first value for a header name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&str> {
        let name = name.to_lowercase();
        self.entries
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get the first value for a header name, or `""` when absent.
    pub fn get_or_empty(&self, name: &str) -> &str {
        self.get(name).unwrap_or("")
    }

    /// Iterate every value recorded for a header name, in order.
    pub fn get_all<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> + 'a {
        let name = name.to_lowercase();
        self.entries
            .iter()
            .filter(move |(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Number of header lines after unfolding.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if the block contained no headers.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Find the byte offset where headers end (position of the first blank line).
///
/// Returns `(header_end, body_start)`.
pub fn find_header_end(data: &[u8]) -> Option<(usize, usize)> {
    // A block that starts with an empty line has no headers at all.
    if data.starts_with(b"\r\n") {
        return Some((0, 2));
    }
    if data.starts_with(b"\n") {
        return Some((0, 1));
    }
    for i in 0..data.len().saturating_sub(1) {
        if data[i] == b'\n' && data[i + 1] == b'\n' {
            return Some((i, i + 2));
        }
        if i + 3 < data.len()
            && data[i] == b'\r'
            && data[i + 1] == b'\n'
            && data[i + 2] == b'\r'
            && data[i + 3] == b'\n'
        {
            return Some((i, i + 4));
        }
        if i + 2 < data.len() && data[i] == b'\n' && data[i + 1] == b'\r' && data[i + 2] == b'\n'
        {
            return Some((i, i + 3));
        }
    }
    None
}

/// Decode raw header bytes to a string.
///
/// Tries UTF-8 first, then falls back to Windows-1252 (which accepts every byte).
fn decode_header_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Decode RFC 2047 encoded-words in a header value.
///
/// `"=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?="` → `"Hola mundo"`. Text that
/// does not form a valid encoded-word is copied through unchanged.
pub fn decode_encoded_words(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    let mut after_word = false;

    while let Some(start) = rest.find("=?") {
        let (literal, candidate) = rest.split_at(start);
        let decoded = parse_encoded_word(&candidate[2..])
            .and_then(|(word, consumed)| word.decode().map(|text| (text, consumed)));

        match decoded {
            Some((text, consumed)) => {
                // Only whitespace between two encoded-words is dropped (RFC 2047 §6.2)
                if !(after_word && literal.trim().is_empty()) {
                    out.push_str(literal);
                }
                out.push_str(&text);
                rest = &candidate[2 + consumed..];
                after_word = true;
            }
            None => {
                out.push_str(literal);
                out.push_str("=?");
                rest = &candidate[2..];
                after_word = false;
            }
        }
    }

    out.push_str(rest);
    out
}

/// The three fields of one `=?charset?encoding?text?=` word.
struct EncodedWord<'a> {
    charset: &'a str,
    base64: bool,
    text: &'a str,
}

impl EncodedWord<'_> {
    fn decode(&self) -> Option<String> {
        let bytes = if self.base64 {
            let compact: Vec<u8> = self
                .text
                .bytes()
                .filter(|b| !b.is_ascii_whitespace())
                .collect();
            ENCODED_WORD_BASE64.decode(compact).ok()?
        } else {
            decode_q_encoding(self.text)
        };
        // RFC 2231 allows a language suffix: `UTF-8*en`
        let charset = self.charset.split_once('*').map_or(self.charset, |(c, _)| c);
        Some(decode_charset(charset, &bytes))
    }
}

/// Split an encoded-word that follows an `=?`; also returns the bytes it spans.
fn parse_encoded_word(s: &str) -> Option<(EncodedWord<'_>, usize)> {
    let (charset, rest) = s.split_once('?')?;
    if charset.is_empty() || charset.contains(char::is_whitespace) {
        return None;
    }
    let (encoding, rest) = rest.split_once('?')?;
    let base64 = match encoding {
        "B" | "b" => true,
        "Q" | "q" => false,
        _ => return None,
    };
    let end = rest.find("?=")?;

    let consumed = charset.len() + encoding.len() + end + 4;
    Some((
        EncodedWord {
            charset,
            base64,
            text: &rest[..end],
        },
        consumed,
    ))
}

/// Q-encoding: `_` is a space and `=XX` a hex byte.
fn decode_q_encoding(input: &str) -> Vec<u8> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        let escaped = if bytes[i] == b'=' {
            bytes.get(i + 1..i + 3).and_then(|h| hex_pair(h[0], h[1]))
        } else {
            None
        };
        match (bytes[i], escaped) {
            (_, Some(byte)) => {
                out.push(byte);
                i += 3;
            }
            (b'_', None) => {
                out.push(b' ');
                i += 1;
            }
            (other, None) => {
                out.push(other);
                i += 1;
            }
        }
    }
    out
}

fn hex_pair(hi: u8, lo: u8) -> Option<u8> {
    let hi = (hi as char).to_digit(16)?;
    let lo = (lo as char).to_digit(16)?;
    Some((hi * 16 + lo) as u8)
}

/// Decode bytes using a named charset.
///
/// Unknown labels fall back to lossy UTF-8 so a header is never dropped.
pub fn decode_charset(charset: &str, bytes: &[u8]) -> String {
    let label = charset.trim();
    if ["utf-8", "utf8", "us-ascii"]
        .iter()
        .any(|l| l.eq_ignore_ascii_case(label))
    {
        return String::from_utf8_lossy(bytes).into_owned();
    }

    match encoding_rs::Encoding::for_label(label.as_bytes()) {
        Some(encoding) => encoding.decode(bytes).0.into_owned(),
        None => {
            warn!(charset = label, "Unknown charset, reading as UTF-8");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

/// Layouts tried when neither RFC 2822 nor RFC 3339 fits.
const DATE_LAYOUTS: &[&str] = &[
    "%d %b %Y %H:%M:%S %z",
    "%d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M %z",
    "%b %d %H:%M:%S %Y",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

/// Parse a `Date:` header value.
///
/// RFC 2822 first, then RFC 3339, then a ladder of layouts seen in the wild
/// (missing weekday, IMAP style, named zones, ISO 8601), then `mail-parser`.
/// The offset written in the header is kept so the date can be shown as sent;
/// dates without any zone are taken as UTC.
pub fn parse_date(date_str: &str) -> Option<DateTime<FixedOffset>> {
    let trimmed = date_str.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parsed = DateTime::parse_from_rfc2822(trimmed)
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(trimmed).ok())
        .or_else(|| parse_with_layouts(trimmed))
        .or_else(|| mail_parser_date(trimmed));
    if parsed.is_none() {
        debug!(date = trimmed, "Could not parse date");
    }
    parsed
}

/// Format a `Date:` header value as `YYYY-MM-DD HH:MM:SS`, or return it unchanged.
pub fn format_date(date_str: &str) -> String {
    match parse_date(date_str) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => date_str.to_string(),
    }
}

fn parse_with_layouts(raw: &str) -> Option<DateTime<FixedOffset>> {
    let bare = without_weekday(raw);
    let imap = imap_to_rfc(bare);
    let candidates = [
        bare.to_string(),
        numeric_zone(bare),
        numeric_zone(&imap),
        imap,
    ];

    candidates.iter().find_map(|candidate| {
        DATE_LAYOUTS.iter().find_map(|layout| {
            DateTime::parse_from_str(candidate, layout).ok().or_else(|| {
                NaiveDateTime::parse_from_str(candidate, layout)
                    .ok()
                    .map(|ndt| Utc.from_utc_datetime(&ndt).fixed_offset())
            })
        })
    })
}

/// Attempt to parse a date using `mail-parser`'s built-in parser.
fn mail_parser_date(input: &str) -> Option<DateTime<FixedOffset>> {
    use mail_parser::MessageParser;

    // mail-parser only parses whole messages
    let wrapped = format!("Date: {input}\n\n");
    let message = MessageParser::default().parse(wrapped.as_bytes())?;
    DateTime::parse_from_rfc3339(&message.date()?.to_rfc3339()).ok()
}

/// Drop a leading `Thu,` / `Thu ` day name.
fn without_weekday(s: &str) -> &str {
    const DAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
    match s.get(..3) {
        Some(prefix)
            if DAYS.iter().any(|d| d.eq_ignore_ascii_case(prefix))
                && s[3..].starts_with([',', ' ']) =>
        {
            s[3..].trim_start_matches(',').trim_start()
        }
        _ => s,
    }
}

/// IMAP internal dates: `"16-JUL-2025 03:01:03"` → `"16 Jul 2025 03:01:03"`.
fn imap_to_rfc(s: &str) -> String {
    const MONTHS: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    let Some((day, rest)) = s.split_once('-') else {
        return s.to_string();
    };
    let Some((month, rest)) = rest.split_once('-') else {
        return s.to_string();
    };
    let day_ok = !day.is_empty() && day.len() <= 2 && day.bytes().all(|b| b.is_ascii_digit());
    match MONTHS.iter().find(|m| m.eq_ignore_ascii_case(month)) {
        Some(m) if day_ok => format!("{day} {m} {rest}"),
        _ => s.to_string(),
    }
}

/// Replace a trailing zone name (`EST`, `GMT`, ...) with its numeric offset,
/// dropping a trailing `(comment)` first.
fn numeric_zone(s: &str) -> String {
    let s = match s.rfind(" (") {
        Some(pos) if s.ends_with(')') => &s[..pos],
        _ => s,
    };
    let Some((head, zone)) = s.rsplit_once(' ') else {
        return s.to_string();
    };
    let offset = match zone.to_ascii_uppercase().as_str() {
        "GMT" | "UTC" | "UT" | "Z" => "+0000",
        "EST" | "CDT" => "-0500",
        "EDT" => "-0400",
        "CST" | "MDT" => "-0600",
        "MST" | "PDT" => "-0700",
        "PST" => "-0800",
        "CET" => "+0100",
        "CEST" => "+0200",
        "JST" => "+0900",
        _ => return s.to_string(),
    };
    format!("{head} {offset}")
}

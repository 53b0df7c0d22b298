//! HTML-to-text reduction for message bodies.
//!
//! This is a tag-driven rewrite, not a DOM parse. The replacements run in a
//! fixed order: later rules rely on earlier ones having removed structural
//! markup already.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

static SCRIPT_BLOCK: LazyLock<Regex> = LazyLock::new(|| regex(r"(?is)<script[^>]*>.*?</script\s*>"));
static STYLE_BLOCK: LazyLock<Regex> = LazyLock::new(|| regex(r"(?is)<style[^>]*>.*?</style\s*>"));
static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)<br\s*/?>"));
static PARAGRAPH_END: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)</p>"));
static DIV_OR_ROW_END: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)</(?:div|tr)>"));
static LIST_ITEM: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)<li\b[^>]*>"));
static HEADING_END: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)</h[1-6]>"));
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| regex(r"<[^>]+>"));
// Numeric references may omit the `;`, and so may the few legacy names
// browsers still accept bare.
static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    regex(
        r"&(?:#[0-9]{1,7};?|#[xX][0-9a-fA-F]{1,6};?|[A-Za-z][A-Za-z0-9]{1,31};|(?:amp|lt|gt|quot|nbsp|copy|reg|deg|shy|times|middot|laquo|raquo))",
    )
});

/// Convert HTML to plain text.
///
/// - Drops `<script>` and `<style>` blocks with their contents
/// - `<br>` becomes a newline, `</p>` and `</h1>`..`</h6>` a blank line
/// - `</div>` and `</tr>` end a line
/// - `<li>` becomes a `- ` bullet on its own line
/// - Remaining tags are stripped and entities decoded
/// - Runs of blank lines collapse to one; the result is trimmed
pub fn html_to_text(html: &str) -> String {
    let text = html.replace("\r\n", "\n");

    let text = SCRIPT_BLOCK.replace_all(&text, "");
    let text = STYLE_BLOCK.replace_all(&text, "");
    let text = LINE_BREAK.replace_all(&text, "\n");
    let text = PARAGRAPH_END.replace_all(&text, "\n\n");
    let text = DIV_OR_ROW_END.replace_all(&text, "\n");
    let text = LIST_ITEM.replace_all(&text, "\n- ");
    let text = HEADING_END.replace_all(&text, "\n\n");
    let text = ANY_TAG.replace_all(&text, "");
    let text = unescape_entities(&text);

    collapse_blank_lines(&text)
}

/// Decode named and numeric character references. Unknown ones stay as written.
fn unescape_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures<'_>| {
            let entity = &caps[0];
            let terminated = if entity.ends_with(';') {
                Cow::Borrowed(entity)
            } else {
                Cow::Owned(format!("{entity};"))
            };
            htmlescape::decode_html(&terminated).unwrap_or_else(|_| entity.to_string())
        })
        .into_owned()
}

/// Strip trailing blanks per line and keep at most one blank line in a row.
fn collapse_blank_lines(text: &str) -> String {
    let mut cleaned: Vec<&str> = Vec::new();
    let mut prev_blank = false;

    for line in text.split('\n') {
        let trimmed = line.trim_end_matches([' ', '\t']);
        let is_blank = trimmed.trim().is_empty();
        if !(is_blank && prev_blank) {
            cleaned.push(trimmed);
        }
        prev_blank = is_blank;
    }

    cleaned.join("\n").trim().to_string()
}

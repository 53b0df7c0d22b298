//! Mailbox and address-list parsing for `From`, `To` and `Cc` (RFC 5322 §3.4).

use crate::parser::header::decode_encoded_words;

/// One mailbox from an address header.
///
/// # Examples
/// - `"Juan García <juan@ejemplo.com>"` → `display_name = "Juan García"`, `address = "juan@ejemplo.com"`
/// - `"=?UTF-8?Q?Jos=C3=A9?= <jose@example.com>"` → `display_name = "José"`
/// - `"user@example.com"` → `display_name = ""`, `address = "user@example.com"`
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct EmailAddress {
    /// Display name with encoded-words decoded (may be empty).
    pub display_name: String,
    /// The bare address (`user@domain`), or the raw text when unparseable.
    pub address: String,
}

impl EmailAddress {
    /// Parse a single mailbox.
    ///
    /// Supported forms:
    /// - `user@domain.com`
    /// - `<user@domain.com>`
    /// - `Display Name <user@domain.com>`
    /// - `"Display, Name" <user@domain.com>`
    /// - `user@domain.com (Display Name)`
    ///
    /// Anything else is kept verbatim as `address`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();

        if let (Some(open), Some(close)) = (trimmed.rfind('<'), trimmed.rfind('>')) {
            if close > open {
                return Self {
                    display_name: decode_display_name(&trimmed[..open]),
                    address: trimmed[open + 1..close].trim().to_string(),
                };
            }
        }

        // Legacy "addr (Name)" form
        if let (Some(open), true) = (trimmed.find('('), trimmed.ends_with(')')) {
            let address = trimmed[..open].trim();
            if address.contains('@') {
                return Self {
                    display_name: decode_display_name(&trimmed[open + 1..trimmed.len() - 1]),
                    address: address.to_string(),
                };
            }
        }

        Self {
            display_name: String::new(),
            address: trimmed.to_string(),
        }
    }

    /// Parse a comma-separated address list.
    ///
    /// Commas inside quotes, angle brackets and comments do not split.
    /// Empty entries and bare group labels (`undisclosed-recipients:;`) are dropped.
    pub fn parse_list(raw: &str) -> Vec<Self> {
        let mut results = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;
        let mut in_angle = false;
        let mut comment_depth = 0usize;

        for ch in raw.chars() {
            match ch {
                '"' if comment_depth == 0 => in_quotes = !in_quotes,
                '<' if !in_quotes => in_angle = true,
                '>' if !in_quotes => in_angle = false,
                '(' if !in_quotes => comment_depth += 1,
                ')' if !in_quotes => comment_depth = comment_depth.saturating_sub(1),
                ',' if !in_quotes && !in_angle && comment_depth == 0 => {
                    push_entry(&mut results, &current);
                    current.clear();
                    continue;
                }
                _ => {}
            }
            current.push(ch);
        }
        push_entry(&mut results, &current);

        results
    }

    /// `"Display Name <address>"`, or just `"address"` without a name.
    pub fn display(&self) -> String {
        if self.display_name.is_empty() {
            self.address.clone()
        } else {
            format!("{} <{}>", self.display_name, self.address)
        }
    }
}

fn push_entry(results: &mut Vec<EmailAddress>, entry: &str) {
    let entry = entry.trim();
    if entry.is_empty() || (entry.ends_with(":;") && !entry.contains('@')) {
        return;
    }
    // "Group: a@b.c, d@e.f;" leaves a group label on the first member
    let entry = match entry.split_once(':') {
        Some((label, member)) if !label.contains(['<', '"', '@']) => member,
        _ => entry,
    };
    let entry = entry.trim().trim_end_matches(';');
    let addr = EmailAddress::parse(entry);
    if !addr.address.is_empty() {
        results.push(addr);
    }
}

/// Strip quoting from a display name, then decode its encoded-words.
fn decode_display_name(raw: &str) -> String {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .map(|s| s.replace("\\\"", "\"").replace("\\\\", "\\"))
        .unwrap_or_else(|| trimmed.to_string());
    decode_encoded_words(unquoted.trim()).trim().to_string()
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

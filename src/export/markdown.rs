//! Render an extracted message as Markdown (`email.md`).

use crate::model::attachment::Attachment;
use crate::model::metadata::EmailMetadata;

/// File name of the rendered message inside the extraction directory.
pub const MARKDOWN_FILENAME: &str = "email.md";

/// Build the Markdown document for one message.
///
/// Sections: title, metadata list, attachments (if any), the body between
/// horizontal rules, and thread information when the message is a reply.
pub fn render_markdown(metadata: &EmailMetadata, body: &str, attachments: &[Attachment]) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Email: {}\n\n", metadata.subject));
    md.push_str("## Metadata\n\n");
    md.push_str(&format!("- **From:** {}\n", metadata.from));
    if !metadata.to.is_empty() {
        md.push_str(&format!("- **To:** {}\n", metadata.to.join(", ")));
    }
    if !metadata.cc.is_empty() {
        md.push_str(&format!("- **Cc:** {}\n", metadata.cc.join(", ")));
    }
    md.push_str(&format!("- **Date:** {}\n", metadata.date));
    md.push_str(&format!("- **Subject:** {}\n\n", metadata.subject));

    if !attachments.is_empty() {
        md.push_str("## Attachments\n\n");
        for att in attachments {
            md.push_str(&format!(
                "- **{}** ({}) - `{}`\n",
                att.filename,
                format_file_size(att.size),
                att.path.display()
            ));
        }
        md.push('\n');
    }

    md.push_str("---\n\n");
    md.push_str("## Message\n\n");
    md.push_str(body);
    md.push_str("\n\n---\n");

    if metadata.has_thread_info() {
        md.push_str("\n## Thread Information\n\n");
        if !metadata.message_id.is_empty() {
            md.push_str(&format!("- **Message ID:** `{}`\n", metadata.message_id));
        }
        if !metadata.in_reply_to.is_empty() {
            md.push_str(&format!("- **In Reply To:** `{}`\n", metadata.in_reply_to));
        }
        if !metadata.references.is_empty() {
            md.push_str(&format!("- **References:** `{}`\n", metadata.references));
        }
    }

    md
}

/// Human-readable size with binary units: `512 B`, `2.3 KB`, `1.0 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    const PREFIXES: [char; 6] = ['K', 'M', 'G', 'T', 'P', 'E'];

    if bytes < UNIT {
        return format!("{bytes} B");
    }
    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    format!("{:.1} {}B", bytes as f64 / div as f64, PREFIXES[exp])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn metadata() -> EmailMetadata {
        EmailMetadata {
            from: "Alice <alice@example.com>".into(),
            to: vec!["bob@example.com".into(), "Carol <carol@example.com>".into()],
            cc: Vec::new(),
            subject: "Status".into(),
            date: "2024-03-05 14:30:00".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(1023), "1023 B");
        assert_eq!(format_file_size(1024), "1.0 KB");
        assert_eq!(format_file_size(2355), "2.3 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_file_size(u64::MAX), "16.0 EB");
    }

    #[test]
    fn test_render_plain_message() {
        let md = render_markdown(&metadata(), "Hello there", &[]);
        assert_eq!(
            md,
            "# Email: Status\n\n\
## Metadata\n\n\
- **From:** Alice <alice@example.com>\n\
- **To:** bob@example.com, Carol <carol@example.com>\n\
- **Date:** 2024-03-05 14:30:00\n\
- **Subject:** Status\n\n\
---\n\n\
## Message\n\n\
Hello there\n\n\
---\n"
        );
    }

    #[test]
    fn test_render_attachments_and_thread() {
        let mut meta = metadata();
        meta.cc = vec!["dave@example.com".into()];
        meta.message_id = "<2@x>".into();
        meta.in_reply_to = "<1@x>".into();
        let attachments = [Attachment {
            filename: "report.pdf".into(),
            path: PathBuf::from("attachments").join("report.pdf"),
            size: 2355,
        }];

        let md = render_markdown(&meta, "body", &attachments);
        assert!(md.contains("- **Cc:** dave@example.com\n"));
        assert!(md.contains(
            "## Attachments\n\n- **report.pdf** (2.3 KB) - `attachments/report.pdf`\n\n---\n"
        ));
        assert!(md.ends_with(
            "\n## Thread Information\n\n- **Message ID:** `<2@x>`\n- **In Reply To:** `<1@x>`\n"
        ));
        assert!(!md.contains("References"));
    }
}

//! File and folder naming: sanitizing and collision-free names.

use std::sync::LazyLock;

use regex::Regex;

static INVALID_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s\-.]").expect("valid regex"));
static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Make a string safe to use as a file or folder name.
///
/// Every character that is not a (Unicode) word character, whitespace, `-`
/// or `.` becomes `_`, then each whitespace run becomes a single `_`.
pub fn sanitize_filename(name: &str) -> String {
    let replaced = INVALID_CHARS.replace_all(name, "_");
    WHITESPACE_RUN.replace_all(&replaced, "_").into_owned()
}

/// Keep at most `max_chars` characters.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Pick a name that `exists` does not report as taken.
///
/// Tries `desired`, then `stem_1.ext`, `stem_2.ext`, ... A name without an
/// extension gets the counter at the end (`README_1`).
pub fn unique_filename(desired: &str, exists: impl Fn(&str) -> bool) -> String {
    if !exists(desired) {
        return desired.to_string();
    }

    let (stem, ext) = split_extension(desired);
    let mut counter: u64 = 1;
    loop {
        let candidate = format!("{stem}_{counter}{ext}");
        if !exists(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// Split `name` before its last `.`; a leading dot does not start an extension.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) if pos > 0 => name.split_at(pos),
        _ => (name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Re: Meeting / notes?"), "Re__Meeting___notes_");
        assert_eq!(sanitize_filename("report  final.pdf"), "report_final.pdf");
        assert_eq!(sanitize_filename("año-2024.v2"), "año-2024.v2");
        assert_eq!(sanitize_filename("tab\there"), "tab_here");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_unique_filename() {
        let taken: HashSet<&str> = ["report.pdf", "report_1.pdf", "README"].into();
        let exists = |name: &str| taken.contains(name);

        assert_eq!(unique_filename("new.txt", exists), "new.txt");
        assert_eq!(unique_filename("report.pdf", exists), "report_2.pdf");
        assert_eq!(unique_filename("README", exists), "README_1");
    }

    #[test]
    fn test_unique_filename_multiple_dots_and_dotfiles() {
        let exists = |name: &str| name == "archive.tar.gz" || name == ".env";
        assert_eq!(unique_filename("archive.tar.gz", exists), "archive.tar_1.gz");
        assert_eq!(unique_filename(".env", exists), ".env_1");
    }
}

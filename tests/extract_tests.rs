//! Integration tests for the extraction pipeline and the `eml2md` binary.

use std::path::{Path, PathBuf};
use std::process::Command;

use assert_fs::prelude::*;
use predicates::prelude::*;

use eml2md::error::ExtractError;
use eml2md::extract::{cleanup_extraction, extract_email_content, ExtractOptions};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Copy a fixture into `dir` so the default output lands inside the temp dir.
fn stage(dir: &assert_fs::TempDir, name: &str) -> PathBuf {
    let child = dir.child(name);
    child.write_binary(&std::fs::read(fixture(name)).unwrap()).unwrap();
    child.path().to_path_buf()
}

// ─── Plain message ──────────────────────────────────────────────────

#[test]
fn test_simple_message() {
    let temp = assert_fs::TempDir::new().unwrap();
    let eml = stage(&temp, "simple.eml");

    let result = extract_email_content(&eml, None, &ExtractOptions::default()).unwrap();

    assert_eq!(result.email_name, "Weekly_sync_notes_email");
    assert_eq!(result.output_dir, temp.path().join("Weekly_sync_notes_email"));
    assert!(result.attachments.is_empty());
    assert_eq!(result.metadata.from, "Alice Example <alice@example.com>");
    assert_eq!(result.metadata.to, ["Bob <bob@example.com>", "carol@example.com"]);
    assert_eq!(result.metadata.cc, ["Lee, Dana <dana@example.com>"]);
    assert_eq!(result.metadata.date, "2024-03-04 09:15:00");

    let expected_body = "Hi team,\n\nNotes from today's sync are below.\n\n\
- Release moves to Friday\n- Dana owns the changelog\n\nAlice";
    assert!(result.markdown.starts_with("# Email: Weekly sync notes\n\n## Metadata\n\n"));
    assert!(result
        .markdown
        .contains(&format!("## Message\n\n{expected_body}\n\n---\n")));
    assert!(!result.markdown.contains("## Attachments"));
    assert!(!result.markdown.contains("## Thread Information"));

    let md = temp.child("Weekly_sync_notes_email/email.md");
    md.assert(predicate::path::is_file());
    assert_eq!(std::fs::read_to_string(md.path()).unwrap(), result.markdown);
    temp.child("Weekly_sync_notes_email/attachments")
        .assert(predicate::path::missing());
}

// ─── Multipart with attachments ─────────────────────────────────────

#[test]
fn test_multipart_with_attachments() {
    let temp = assert_fs::TempDir::new().unwrap();
    let eml = stage(&temp, "attachments.eml");
    let out = temp.child("out");

    let result =
        extract_email_content(&eml, Some(out.path()), &ExtractOptions::default()).unwrap();

    assert_eq!(result.email_name, "Informe_trimestral_email");
    assert_eq!(result.output_dir, out.path().join("Informe_trimestral_email"));
    assert_eq!(result.metadata.subject, "Informe trimestral");
    assert_eq!(result.metadata.from, "José Pérez <jose@example.com>");

    // Plain text of the nested alternative, decoded from quoted-printable latin-1
    assert!(result
        .markdown
        .contains("## Message\n\nAdjunto el informe del trimestre. Está listo para revisión.\n\n---\n"));

    let names: Vec<_> = result.attachments.iter().map(|a| a.filename.as_str()).collect();
    assert_eq!(names, ["report.pdf", "report_1.pdf", "cifras_résumé.csv"]);
    assert_eq!(result.attachments[0].size, 52);
    assert_eq!(result.attachments[1].size, 9);
    assert_eq!(result.attachments[2].size, 13);
    assert_eq!(result.attachments[1].path, Path::new("attachments/report_1.pdf"));

    let dir = out.child("Informe_trimestral_email/attachments");
    dir.child("report.pdf")
        .assert(predicate::str::starts_with("%PDF-1.4\n"));
    dir.child("report_1.pdf").assert("%PDF-1.7\n");
    dir.child("cifras_résumé.csv").assert("q,total\n1,100");
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 3);

    assert!(result.markdown.contains(
        "## Attachments\n\n\
- **report.pdf** (52 B) - `attachments/report.pdf`\n\
- **report_1.pdf** (9 B) - `attachments/report_1.pdf`\n\
- **cifras_résumé.csv** (13 B) - `attachments/cifras_résumé.csv`\n\n---\n"
    ));
}

#[test]
fn test_rerun_keeps_earlier_attachments() {
    let temp = assert_fs::TempDir::new().unwrap();
    let eml = stage(&temp, "attachments.eml");

    extract_email_content(&eml, None, &ExtractOptions::default()).unwrap();
    let second = extract_email_content(&eml, None, &ExtractOptions::default()).unwrap();

    let names: Vec<_> = second.attachments.iter().map(|a| a.filename.as_str()).collect();
    assert_eq!(names, ["report_2.pdf", "report_3.pdf", "cifras_résumé_1.csv"]);
}

#[test]
fn test_output_dir_already_named_after_folder() {
    let temp = assert_fs::TempDir::new().unwrap();
    let eml = stage(&temp, "attachments.eml");
    let target = temp.child("Informe_trimestral_email");

    let result =
        extract_email_content(&eml, Some(target.path()), &ExtractOptions::default()).unwrap();

    assert_eq!(result.output_dir, target.path());
    target.child("email.md").assert(predicate::path::is_file());
}

// ─── HTML body and thread info ──────────────────────────────────────

#[test]
fn test_html_only_message() {
    let temp = assert_fs::TempDir::new().unwrap();
    let eml = stage(&temp, "html_only.eml");

    let result = extract_email_content(&eml, None, &ExtractOptions::default()).unwrap();

    assert_eq!(result.metadata.date, "2024-02-01 08:00:00");
    assert!(result.markdown.contains(
        "## Message\n\nDigest\n\nTop stories & updates\n\n- First item\n- Second item\nCafé opens\nnext week\n\n---\n"
    ));
    assert!(!result.markdown.contains("margin"));
    assert!(result.markdown.ends_with(
        "\n## Thread Information\n\n\
- **Message ID:** `<digest-2024-02@example.org>`\n\
- **In Reply To:** `<digest-2024-01@example.org>`\n\
- **References:** `<digest-2023-12@example.org> <digest-2024-01@example.org>`\n"
    ));
}

// ─── Degraded inputs ────────────────────────────────────────────────

#[test]
fn test_message_without_subject_or_content_type() {
    let temp = assert_fs::TempDir::new().unwrap();
    let eml = stage(&temp, "no_subject.eml");

    let result = extract_email_content(&eml, None, &ExtractOptions::default()).unwrap();

    assert_eq!(result.email_name, "no_subject_email");
    assert_eq!(result.metadata.date, "not a real date");
    assert!(result.markdown.starts_with("# Email: \n\n"));
    assert!(!result.markdown.contains("- **To:**"));
    assert!(result
        .markdown
        .contains("## Message\n\nBody without any MIME headers.\n\n\n---\n"));
}

#[test]
fn test_invalid_message_is_fatal() {
    let temp = assert_fs::TempDir::new().unwrap();
    let eml = stage(&temp, "broken.eml");

    let err = extract_email_content(&eml, None, &ExtractOptions::default()).unwrap_err();
    assert!(matches!(err, ExtractError::InvalidMessage(_)));
}

#[test]
fn test_missing_file() {
    let temp = assert_fs::TempDir::new().unwrap();
    let err = extract_email_content(
        &temp.path().join("nope.eml"),
        None,
        &ExtractOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, ExtractError::FileNotFound(_)));
}

#[test]
fn test_folder_name_length_option() {
    let temp = assert_fs::TempDir::new().unwrap();
    let eml = stage(&temp, "simple.eml");
    let options = ExtractOptions {
        folder_name_max_len: 6,
    };

    let result = extract_email_content(&eml, None, &options).unwrap();
    assert_eq!(result.email_name, "Weekly_email");
}

#[test]
fn test_cleanup_removes_folder() {
    let temp = assert_fs::TempDir::new().unwrap();
    let eml = stage(&temp, "attachments.eml");

    let result = extract_email_content(&eml, None, &ExtractOptions::default()).unwrap();
    assert!(result.output_dir.exists());

    cleanup_extraction(&result.output_dir).unwrap();
    temp.child("Informe_trimestral_email")
        .assert(predicate::path::missing());
    temp.child("attachments.eml").assert(predicate::path::exists());
}

// ─── Binary ─────────────────────────────────────────────────────────

fn eml2md(temp: &assert_fs::TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_eml2md"));
    cmd.env("EML2MD_CONFIG", temp.path().join("no-config.toml"))
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_prints_markdown() {
    let temp = assert_fs::TempDir::new().unwrap();
    let eml = stage(&temp, "simple.eml");

    let output = eml2md(&temp).arg(&eml).output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stdout.starts_with("# Email: Weekly sync notes\n"));
    assert!(stderr.contains("EXTRACTED CONTENT:"));
    assert!(stderr.contains("Attachments extracted: 0"));
    assert!(stderr.contains("--cleanup"));
    temp.child("Weekly_sync_notes_email/email.md")
        .assert(predicate::path::is_file());
}

#[test]
fn test_cli_json_and_cleanup() {
    let temp = assert_fs::TempDir::new().unwrap();
    let eml = stage(&temp, "attachments.eml");

    let output = eml2md(&temp)
        .args(["--json", "--cleanup"])
        .arg(&eml)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["email_name"], "Informe_trimestral_email");
    assert_eq!(json["attachments"].as_array().unwrap().len(), 3);
    assert_eq!(json["attachments"][1]["filename"], "report_1.pdf");
    assert_eq!(json["metadata"]["subject"], "Informe trimestral");

    temp.child("Informe_trimestral_email")
        .assert(predicate::path::missing());
}

#[test]
fn test_cli_quiet_skips_markdown() {
    let temp = assert_fs::TempDir::new().unwrap();
    let eml = stage(&temp, "simple.eml");

    let output = eml2md(&temp).arg("-q").arg(&eml).output().unwrap();
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn test_cli_fails_on_missing_file() {
    let temp = assert_fs::TempDir::new().unwrap();

    let output = eml2md(&temp)
        .arg(temp.path().join("missing.eml"))
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("email file not found"));
}

#[test]
fn test_cli_requires_input() {
    let temp = assert_fs::TempDir::new().unwrap();
    let output = eml2md(&temp).output().unwrap();
    assert!(!output.status.success());
}

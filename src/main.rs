//! CLI entry point for `eml2md`.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;

use eml2md::config::{self, Config};
use eml2md::export::markdown::format_file_size;
use eml2md::extract::{cleanup_extraction, extract_email_content, ExtractOptions, ExtractionResult};

const BANNER_WIDTH: usize = 80;

#[derive(Parser)]
#[command(
    name = "eml2md",
    version,
    about = "Extract content and attachments from .eml files to markdown format",
    after_help = "Examples:\n  eml2md message.eml\n  eml2md ~/Downloads/email.eml ~/Documents/extracted\n  eml2md --cleanup message.eml"
)]
struct Cli {
    /// Path to the .eml file to extract
    #[arg(value_name = "EML_FILE")]
    eml_file: PathBuf,

    /// Base directory for extraction (default: same directory as the .eml file)
    #[arg(value_name = "OUTPUT_DIRECTORY")]
    output_dir: Option<PathBuf>,

    /// Clean up extraction directory after reading
    #[arg(long)]
    cleanup: bool,

    /// Print the extraction result as JSON instead of Markdown
    #[arg(long)]
    json: bool,

    /// Do not print the extracted Markdown
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    let output_dir = cli.output_dir.or_else(|| config.output.default_dir.clone());
    let options = ExtractOptions {
        folder_name_max_len: config.output.folder_name_max_len,
    };

    let result = extract_email_content(&cli.eml_file, output_dir.as_deref(), &options)
        .with_context(|| format!("Error extracting email from {}", cli.eml_file.display()))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        let print_markdown = config.output.print_markdown && !cli.quiet;
        print_summary(&result, print_markdown);
    }

    if cli.cleanup || config.output.cleanup {
        cmd_cleanup(&result.output_dir);
    } else {
        eprintln!();
        eprintln!("Tip: Use --cleanup flag to automatically remove extraction directory after reading");
        eprintln!("   Or manually clean up: rm -rf \"{}\"", result.output_dir.display());
    }

    Ok(())
}

/// Print where things went on stderr and the Markdown itself on stdout.
fn print_summary(result: &ExtractionResult, print_markdown: bool) {
    eprintln!();
    eprintln!("Email: {}", result.metadata.subject);
    eprintln!("Output directory: {}", result.output_dir.display());
    eprintln!("Markdown file: {}", result.markdown_file.display());
    eprintln!("Attachments extracted: {}", result.attachments.len());
    if !result.attachments.is_empty() {
        eprintln!("   Attachment files:");
        for att in &result.attachments {
            eprintln!("   - {} ({})", att.filename, format_file_size(att.size));
        }
    }

    if !print_markdown {
        return;
    }

    let banner = "=".repeat(BANNER_WIDTH);
    eprintln!();
    eprintln!("{banner}");
    eprintln!("EXTRACTED CONTENT:");
    eprintln!("{banner}");
    println!("{}", result.markdown);
    eprintln!("{banner}");
}

/// Remove the extraction directory, reporting but not failing on errors.
fn cmd_cleanup(output_dir: &Path) {
    match cleanup_extraction(output_dir) {
        Ok(()) => {
            eprintln!();
            eprintln!("Cleaned up: {}", output_dir.display());
        }
        Err(e) => {
            eprintln!();
            eprintln!("Warning: Failed to clean up: {e}");
        }
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    // File logging only when asked for and the directory is usable
    let file_layer = if config.general.log_to_file {
        let log_dir = config::cache_dir(config);
        match std::fs::create_dir_all(&log_dir) {
            Ok(()) => {
                let file_appender = tracing_appender::rolling::never(&log_dir, config::LOG_FILE_NAME);
                Some(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(file_appender),
                )
            }
            Err(e) => {
                eprintln!("Warning: cannot create log directory {}: {e}", log_dir.display());
                None
            }
        }
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    if config.general.log_to_file {
        tracing::debug!(path = %config::log_file_path(config).display(), "Logging to file");
    }
}

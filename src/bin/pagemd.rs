//! CLI binary for pagemd.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `TransformConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use pagemd::{inspect, transform, transform_from_bytes, transform_to_file, TransformConfig};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic transformation (stdout)
  pagemd document.pdf

  # Write Markdown to a file
  pagemd document.pdf -o output.md

  # Include embedded images as base64 PNG references
  pagemd --images document.pdf --json > output.json

  # Read the PDF from stdin
  cat document.pdf | pagemd - -o output.md

  # Encrypted document
  pagemd --password secret report.pdf

  # Inspect PDF metadata, no transformation
  pagemd --inspect-only document.pdf

ENVIRONMENT VARIABLES:
  PAGEMD_OUTPUT       Default output path (same as -o)
  PAGEMD_BATCH_SIZE   Pages per processing batch
  PAGEMD_RESOLUTION   Image rasterisation DPI
  PAGEMD_PASSWORD     PDF user password
  PDFIUM_LIB_PATH     Path to an existing libpdfium

NOTES:
  Structure is reconstructed from page geometry: tall lines become
  headings, gap statistics split paragraphs, ruled boxes become pipe
  tables. No network access, no API keys.
"#;

/// Reconstruct Markdown from PDF page geometry.
#[derive(Parser, Debug)]
#[command(
    name = "pagemd",
    version,
    about = "Reconstruct Markdown from PDF page geometry",
    long_about = "Transform PDF documents into structured Markdown by analysing page \
geometry: line heights select headings, vertical gap statistics split paragraphs, ruled \
boxes become pipe tables, and embedded images become numbered base64 PNG references.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path, or `-` to read the PDF from stdin.
    input: String,

    /// Write Markdown to this file instead of stdout.
    #[arg(short, long, env = "PAGEMD_OUTPUT")]
    output: Option<PathBuf>,

    /// Extract embedded images as base64 PNG references.
    #[arg(long, env = "PAGEMD_IMAGES")]
    images: bool,

    /// Pages per processing batch.
    #[arg(long, env = "PAGEMD_BATCH_SIZE", default_value_t = 30)]
    batch_size: usize,

    /// Image rasterisation DPI (72-1200).
    #[arg(long, env = "PAGEMD_RESOLUTION", default_value_t = 500,
          value_parser = clap::value_parser!(u32).range(72..=1200))]
    resolution: u32,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PAGEMD_PASSWORD")]
    password: Option<String>,

    /// Output structured JSON (markdown + images + errors + stats).
    #[arg(long, env = "PAGEMD_JSON")]
    json: bool,

    /// Print PDF metadata only, no transformation.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PAGEMD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PAGEMD_QUIET")]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&cli.input).context("Failed to inspect PDF")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialise metadata")?
            );
        } else {
            println!("File:         {}", cli.input);
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            if let Some(ref s) = meta.subject {
                println!("Subject:      {}", s);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────
    let mut builder = TransformConfig::builder()
        .include_images(cli.images)
        .batch_size(cli.batch_size)
        .image_resolution(cli.resolution);
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    let config = builder.build().context("Invalid configuration")?;

    // ── Run transformation ───────────────────────────────────────────
    if cli.input == "-" {
        let mut bytes = Vec::new();
        io::stdin()
            .read_to_end(&mut bytes)
            .context("Failed to read PDF from stdin")?;
        let output = transform_from_bytes(&bytes, &config).context("Transformation failed")?;
        emit(&cli, &output)?;
        return Ok(());
    }

    if let Some(ref output_path) = cli.output {
        if cli.json {
            let output = transform(&cli.input, &config).context("Transformation failed")?;
            let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
            std::fs::write(output_path, json).with_context(|| {
                format!("Failed to write output to {}", output_path.display())
            })?;
            summarise(&cli, &output.stats, &output.errors, Some(output_path));
        } else {
            let stats =
                transform_to_file(&cli.input, output_path, &config).context("Transformation failed")?;
            summarise(&cli, &stats, &[], Some(output_path));
        }
        return Ok(());
    }

    let output = transform(&cli.input, &config).context("Transformation failed")?;
    emit(&cli, &output)?;
    Ok(())
}

/// Print the result to stdout as Markdown or JSON.
fn emit(cli: &Cli, output: &pagemd::TransformOutput) -> Result<()> {
    if let Some(ref output_path) = cli.output {
        let body = if cli.json {
            serde_json::to_string_pretty(output).context("Failed to serialise output")?
        } else {
            output.markdown.clone()
        };
        std::fs::write(output_path, body)
            .with_context(|| format!("Failed to write output to {}", output_path.display()))?;
        summarise(cli, &output.stats, &output.errors, Some(output_path));
        return Ok(());
    }

    if cli.json {
        let json = serde_json::to_string_pretty(output).context("Failed to serialise output")?;
        println!("{json}");
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(output.markdown.as_bytes())
            .context("Failed to write to stdout")?;
        if !output.markdown.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }
    summarise(cli, &output.stats, &output.errors, None);
    Ok(())
}

/// One summary line on stderr, plus any recoverable errors.
fn summarise(
    cli: &Cli,
    stats: &pagemd::TransformStats,
    errors: &[String],
    output_path: Option<&PathBuf>,
) {
    if cli.quiet {
        return;
    }
    let tick = if stats.failed_batches == 0 {
        green("✔")
    } else {
        cyan("⚠")
    };
    let destination = output_path
        .map(|p| format!("  →  {}", bold(&p.display().to_string())))
        .unwrap_or_default();
    eprintln!(
        "{}  {} pages  {} lines  {} tables  {} images  {}ms{}",
        tick,
        stats.total_pages,
        stats.lines,
        stats.tables,
        stats.images,
        stats.total_duration_ms,
        destination,
    );
    if stats.failed_batches > 0 {
        eprintln!(
            "   {} of {} batches failed",
            stats.failed_batches,
            stats.processed_batches + stats.failed_batches
        );
    }
    for err in errors {
        eprintln!("   {}", dim(err));
    }
}

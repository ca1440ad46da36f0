//! CLI binary for docfield.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ProcessingConfig`, reads the input file, and prints the JSON egress
//! record (or just the extracted text with `--text-only`).

use anyhow::{Context, Result};
use clap::Parser;
use docfield::{process_document, ProcessResponse, ProcessingConfig};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "docfield",
    version,
    about = "Extract structured fields from a scanned image or PDF"
)]
struct Cli {
    /// Input file (image or PDF).
    input: PathBuf,

    /// Declared content type; inferred from the file extension when omitted.
    #[arg(long)]
    content_type: Option<String>,

    /// Maximum PDF pages to process.
    #[arg(long, default_value_t = 5)]
    max_pages: usize,

    /// Concurrent page pipelines.
    #[arg(long, default_value_t = 4)]
    concurrency: usize,

    /// Model identifier for field extraction.
    #[arg(long, default_value = "gpt-4o-mini")]
    model: String,

    /// API base URL (OpenAI-compatible chat-completions endpoint).
    #[arg(long, default_value = "https://api.openai.com/v1")]
    base_url: String,

    /// API key; with no key, pages fall back to raw OCR text.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Tesseract language code(s), e.g. "eng" or "eng+deu".
    #[arg(long, default_value = "eng")]
    ocr_language: String,

    /// Per-call model timeout in seconds.
    #[arg(long, default_value_t = 120)]
    model_timeout: u64,

    /// Print only the extracted text instead of the full JSON record.
    #[arg(long)]
    text_only: bool,
}

/// Infer a content type from the file extension.
fn content_type_from_path(path: &Path) -> Option<&'static str> {
    match path
        .extension()
        .and_then(|ext| ext.to_str())?
        .to_ascii_lowercase()
        .as_str()
    {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        "tif" | "tiff" => Some("image/tiff"),
        "pdf" => Some("application/pdf"),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let bytes = std::fs::read(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;

    let content_type = match cli.content_type {
        Some(ct) => ct,
        None => content_type_from_path(&cli.input)
            .with_context(|| {
                format!(
                    "cannot infer content type from '{}'; pass --content-type",
                    cli.input.display()
                )
            })?
            .to_string(),
    };

    let mut builder = ProcessingConfig::builder()
        .max_pages(cli.max_pages)
        .concurrency(cli.concurrency)
        .model(cli.model)
        .base_url(cli.base_url)
        .ocr_language(cli.ocr_language)
        .model_timeout_secs(cli.model_timeout);
    if let Some(key) = cli.api_key {
        builder = builder.api_key(key);
    }
    let config = builder.build()?;

    let outcome = process_document(&bytes, &content_type, &config).await?;

    if cli.text_only {
        println!("{}", outcome.text);
    } else {
        let response = ProcessResponse::from_outcome(&outcome);
        println!("{}", serde_json::to_string_pretty(&response)?);
    }

    if !outcome.success {
        std::process::exit(1);
    }
    Ok(())
}

//! # docfield
//!
//! Extract structured business-document fields from scanned images and PDFs.
//!
//! ## Why this crate?
//!
//! Scanned invoices and receipts arrive as pixels, not data. Plain OCR gets
//! you a noisy text blob; what callers actually want is "invoice INV-001,
//! ACME Corp, total 1,234.50 EUR". This crate renders each page, runs a
//! deterministic image-enhancement chain tuned for scans, OCRs the cleaned
//! page, then asks a chat-completion model to normalise the text and fill a
//! fixed field schema — tolerating partial failure across pages throughout.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload (image or PDF)
//!  │
//!  ├─ 1. Validate  size ceiling, accepted content types
//!  ├─ 2. Render    rasterise up to max_pages via pdfium (spawn_blocking)
//!  ├─ 3. Enhance   fixed filter chain + per-step log
//!  ├─ 4. OCR       Tesseract (or injected engine); blank pages are fine
//!  ├─ 5. Extract   chat model → cleaned text + FieldRecord, with fallback
//!  └─ 6. Aggregate page-complete text, token totals, first-success fields
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docfield::{process_document, ProcessingConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bytes = std::fs::read("invoice.pdf")?;
//!     let config = ProcessingConfig::builder()
//!         .api_key(std::env::var("OPENAI_API_KEY")?)
//!         .build()?;
//!     let outcome = process_document(&bytes, "application/pdf", &config).await?;
//!     println!("{}", outcome.text);
//!     if let Some(fields) = &outcome.fields {
//!         println!("invoice: {:?}", fields.invoice_number);
//!     }
//!     eprintln!("tokens: {}", outcome.tokens_used);
//!     Ok(())
//! }
//! ```
//!
//! ## Degradation, not all-or-nothing
//!
//! - No API key configured? Pages carry raw OCR text and succeed.
//! - Model endpoint down? Same.
//! - One page times out in a five-page scan? That page gets an inline
//!   failure marker; the other four are returned normally.
//! - The document fails as a whole only when *every* page failed — and even
//!   then the response carries the rendered imagery for diagnostics.
//!
//! ## Feature Flags
//!
//! | Feature     | Default | Description |
//! |-------------|---------|-------------|
//! | `cli`       | on      | Enables the `docfield` binary (clap + anyhow + tracing-subscriber) |
//! | `tesseract` | on      | Tesseract OCR via leptess; disable on systems without the native libraries |
//!
//! With `tesseract` disabled, inject a recognizer through
//! [`ProcessingConfig::builder()`](config::ProcessingConfig::builder) or
//! every page reads as blank.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod fields;
pub mod outcome;
pub mod pipeline;
pub mod process;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ModelConfig, ProcessingConfig, ProcessingConfigBuilder};
pub use error::{DocfieldError, PageError};
pub use fields::FieldRecord;
pub use outcome::{
    Dimensions, DocumentOutcome, PageOutcome, ProcessResponse, ResponseMetadata,
    NO_TEXT_PLACEHOLDER,
};
pub use pipeline::extract::{HttpModelClient, ModelCallError, ModelClient, ModelCompletion};
pub use pipeline::ocr::TextRecognizer;
pub use pipeline::render::{DocumentKind, ACCEPTED_CONTENT_TYPES};
pub use process::{process_document, process_document_sync};

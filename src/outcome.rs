//! Result types: per-page outcomes, the aggregated document outcome, and the
//! serialisable caller-facing response record.
//!
//! The split mirrors the pipeline: [`PageOutcome`] is what the page pipeline
//! produces and never escapes as an error; [`DocumentOutcome`] is the
//! orchestrator's in-memory aggregate including raw imagery buffers; and
//! [`ProcessResponse`] is the egress record with imagery base64-encoded for
//! transport.

use crate::fields::FieldRecord;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Placeholder carried by a successful page whose OCR output was blank.
///
/// A blank page is a valid, expected input — not an error.
pub const NO_TEXT_PLACEHOLDER: &str = "[No text detected in this image]";

/// One rendered raster page of a document.
///
/// Produced once by the renderer; the enhancer replaces `image` with the
/// cleaned buffer and appends to `enhancement_log`; immutable after the page
/// pipeline consumes it.
#[derive(Debug)]
pub struct Page {
    /// Zero-based page index.
    pub index: usize,
    /// Raster pixels for this page.
    pub image: DynamicImage,
    /// Ordered human-readable record of filter steps applied.
    pub enhancement_log: Vec<String>,
}

/// The result of running the page pipeline on one page.
///
/// Invariant: `success == false` implies `fields` is `None` and `text`
/// holds no extracted content (the aggregate inserts an inline failure
/// marker instead).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageOutcome {
    /// Zero-based page index.
    pub index: usize,
    pub success: bool,
    /// Extracted text — possibly the model's cleaned version of the OCR
    /// output, possibly [`NO_TEXT_PLACEHOLDER`] for a blank page.
    pub text: String,
    /// Structured fields, present only on a successful extraction.
    pub fields: Option<FieldRecord>,
    /// Tokens consumed by the remote call; 0 when no call was made or the
    /// call failed.
    pub tokens_used: u64,
    /// Human-readable failure description when `success == false`.
    pub error: Option<String>,
}

impl PageOutcome {
    /// A failed outcome carrying an error message. Upholds the invariant
    /// that failed pages have no text and no field record.
    pub fn failed(index: usize, error: impl Into<String>) -> Self {
        Self {
            index,
            success: false,
            text: String::new(),
            fields: None,
            tokens_used: 0,
            error: Some(error.into()),
        }
    }
}

/// Pixel dimensions recorded for the display imagery.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// The orchestrator's final aggregate for one document.
///
/// `success` is false only when every page's outcome failed; partial failure
/// is reported inline in `text` while the document as a whole succeeds.
#[derive(Debug)]
pub struct DocumentOutcome {
    pub success: bool,
    /// Caller-facing message when `success == false`.
    pub error: Option<String>,
    /// Concatenated text across pages, each tagged with a `Page i of N`
    /// marker when more than one page was processed, with inline failure
    /// markers for failed pages. Page-complete even under partial failure.
    pub text: String,
    /// First non-absent field record in page-index order.
    pub fields: Option<FieldRecord>,
    /// Tokens summed across all page calls.
    pub tokens_used: u64,
    /// Total pages in the source document.
    pub page_count: usize,
    /// Pages actually rendered and processed (`min(page_count, max_pages)`).
    pub processed_page_count: usize,
    /// Enhancement log from the first page.
    pub enhancement_log: Vec<String>,
    /// Per-page outcomes in index order.
    pub pages: Vec<PageOutcome>,
    /// Unenhanced reference image for display (raw upload bytes for a
    /// single-image document, an unmodified render of page 0 for a PDF).
    pub original_image: Vec<u8>,
    /// Cleaned first-page image, losslessly encoded.
    pub cleaned_image: Vec<u8>,
    pub original_dimensions: Dimensions,
    pub processed_dimensions: Dimensions,
    /// Uploaded size in bytes.
    pub uploaded_bytes: usize,
}

/// Serialisable egress record for one processed document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Base64 of the unenhanced reference image.
    pub original_image: String,
    /// Base64 of the cleaned first-page image.
    pub cleaned_image: String,
    /// Display MIME type — always the enhancer's output format.
    pub image_mime: String,
    pub extracted_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldRecord>,
    pub metadata: ResponseMetadata,
}

/// Processing metadata attached to every response, success or failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub original_dimensions: Dimensions,
    pub processed_dimensions: Dimensions,
    /// Encoding format of the cleaned imagery.
    pub format: String,
    pub uploaded_bytes: usize,
    pub enhancement_log: Vec<String>,
    pub tokens_used: u64,
    pub page_count: usize,
    pub processed_page_count: usize,
}

impl ProcessResponse {
    /// Encode a [`DocumentOutcome`] for transport.
    pub fn from_outcome(outcome: &DocumentOutcome) -> Self {
        Self {
            success: outcome.success,
            error: outcome.error.clone(),
            original_image: STANDARD.encode(&outcome.original_image),
            cleaned_image: STANDARD.encode(&outcome.cleaned_image),
            image_mime: "image/png".to_string(),
            extracted_text: outcome.text.clone(),
            fields: outcome.fields.clone(),
            metadata: ResponseMetadata {
                original_dimensions: outcome.original_dimensions,
                processed_dimensions: outcome.processed_dimensions,
                format: "png".to_string(),
                uploaded_bytes: outcome.uploaded_bytes,
                enhancement_log: outcome.enhancement_log.clone(),
                tokens_used: outcome.tokens_used,
                page_count: outcome.page_count,
                processed_page_count: outcome.processed_page_count,
            },
        }
    }
}

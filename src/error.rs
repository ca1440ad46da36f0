//! Error types for the docfield library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`DocfieldError`] — **Fatal**: the document cannot be processed at all
//!   (empty upload, unsupported content type, PDF that pdfium cannot open).
//!   Returned as `Err(DocfieldError)` from [`crate::process::process_document`].
//!
//! * [`PageError`] — **Non-fatal**: a single page's pipeline failed (OCR
//!   panic, remote call timed out) but sibling pages are fine. Absorbed into
//!   [`crate::outcome::PageOutcome`] so callers receive partial success
//!   rather than losing the whole document to one bad page.
//!
//! A document-level failure is only declared when *every* page failed, and
//! even then the orchestrator returns the rendered imagery for diagnostics
//! instead of an `Err` — see [`crate::process`].

use thiserror::Error;

/// All fatal errors returned by the docfield library.
///
/// Page-level failures use [`PageError`] and are stored in
/// [`crate::outcome::PageOutcome`] rather than propagated here.
#[derive(Debug, Error)]
pub enum DocfieldError {
    // ── Ingress validation ────────────────────────────────────────────────
    /// Upload was zero bytes. Rejected before any processing begins.
    #[error("Uploaded document is empty")]
    EmptyInput,

    /// Upload exceeds the configured size ceiling.
    #[error("Uploaded document is {size} bytes, exceeding the {limit}-byte limit")]
    OversizedInput { size: usize, limit: usize },

    /// The declared content type is not in the accepted set.
    #[error("Unsupported content type '{kind}'. Accepted: {accepted}")]
    UnsupportedFormat { kind: String, accepted: String },

    // ── Render errors ─────────────────────────────────────────────────────
    /// The bytes could not be decoded as the declared format.
    #[error("Document could not be decoded: {detail}")]
    CorruptDocument { detail: String },

    /// pdfium returned an error while rasterising a page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RenderFailed { page: usize, detail: String },

    // ── Aggregate errors ──────────────────────────────────────────────────
    /// Every page's pipeline failed; carries the last page's error.
    ///
    /// Used to format the caller-facing message on the outcome — the
    /// orchestrator still returns the rendered imagery alongside it.
    #[error("All {total} pages failed to process. Last error: {last_error}")]
    AllPagesFailed { total: usize, last_error: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
///
/// Stored as a message inside [`crate::outcome::PageOutcome`] when a page
/// fails. Processing of sibling pages continues regardless.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The remote model call raised an unexpected error. Unavailability and
    /// bad credentials degrade gracefully and never reach this variant.
    #[error("Page {page}: model call failed: {detail}")]
    ModelCallFailed { page: usize, detail: String },

    /// The remote model call exceeded the configured timeout.
    #[error("Page {page}: model call timed out after {secs}s")]
    ModelTimeout { page: usize, secs: u64 },

    /// A blocking task for this page panicked.
    #[error("Page {page}: pipeline task panicked: {detail}")]
    TaskPanicked { page: usize, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_display() {
        let e = DocfieldError::OversizedInput {
            size: 30_000_000,
            limit: 20_971_520,
        };
        let msg = e.to_string();
        assert!(msg.contains("30000000"), "got: {msg}");
        assert!(msg.contains("20971520"), "got: {msg}");
    }

    #[test]
    fn unsupported_format_names_kind_and_accepted_set() {
        let e = DocfieldError::UnsupportedFormat {
            kind: "image/gif".into(),
            accepted: "image/png, application/pdf".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("image/gif"));
        assert!(msg.contains("application/pdf"));
    }

    #[test]
    fn all_pages_failed_surfaces_last_error() {
        let e = DocfieldError::AllPagesFailed {
            total: 3,
            last_error: "model call timed out".into(),
        };
        assert!(e.to_string().contains("model call timed out"));
        assert!(e.to_string().contains('3'));
    }

    #[test]
    fn model_timeout_display() {
        let e = PageError::ModelTimeout { page: 2, secs: 120 };
        assert!(e.to_string().contains("120s"));
        assert!(e.to_string().contains("Page 2"));
    }
}

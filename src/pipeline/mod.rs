//! Pipeline stages for document field extraction.
//!
//! Each submodule implements exactly one transformation step. Keeping
//! stages separate makes each independently testable and lets us swap
//! implementations (a different OCR engine, a different model endpoint)
//! without touching other stages.
//!
//! ## Data Flow
//!
//! ```text
//! upload ──▶ render ──▶ enhance ──▶ ocr ──▶ extract
//! (bytes)   (pdfium /  (filter     (text)  (chat model,
//!            decode)    chain)              field record)
//! ```
//!
//! 1. [`render`]  — resolve the document kind once and rasterise pages;
//!    pdfium work runs in `spawn_blocking`
//! 2. [`enhance`] — deterministic filter chain plus a human-readable log
//! 3. [`ocr`]     — text recognition behind a trait seam; blank and broken
//!    both read as "no text"
//! 4. [`extract`] — the only stage with network I/O; degrades gracefully
//!    to raw OCR text when the remote model is unusable
//! 5. [`page`]    — composes 3 and 4 for one page and absorbs every failure
//!    into a `PageOutcome`

pub mod enhance;
pub mod extract;
pub mod ocr;
pub mod page;
pub mod render;

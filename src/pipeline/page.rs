//! The per-page pipeline: text recognition followed by field extraction.
//!
//! This is the error-absorption boundary of the system. Whatever happens in
//! the two stages — a panic on a blocking thread, a timed-out model call —
//! the result is always a [`PageOutcome`]; nothing propagates upward, so a
//! single bad page never aborts its siblings or the document.
//!
//! Blank OCR output is **not** a failure: a blank page is a valid, expected
//! input and yields a successful outcome carrying
//! [`NO_TEXT_PLACEHOLDER`](crate::outcome::NO_TEXT_PLACEHOLDER) and zero
//! tokens, with no model call made.

use crate::error::PageError;
use crate::outcome::{PageOutcome, NO_TEXT_PLACEHOLDER};
use crate::pipeline::extract::{self, ModelCallError, ModelClient};
use crate::pipeline::ocr::TextRecognizer;
use image::DynamicImage;
use std::sync::Arc;
use tracing::{debug, info};

/// Run recognition and extraction for one cleaned page.
pub async fn run_page(
    recognizer: Arc<dyn TextRecognizer>,
    client: Arc<dyn ModelClient>,
    image: DynamicImage,
    index: usize,
    system_prompt: Arc<str>,
    max_input_chars: usize,
) -> PageOutcome {
    // OCR is CPU-bound; keep it off the async workers. A panic inside the
    // engine surfaces as a JoinError and fails this page only.
    let engine = recognizer.name();
    let raw_text = match tokio::task::spawn_blocking(move || recognizer.recognize(&image)).await {
        Ok(text) => text,
        Err(e) => {
            return PageOutcome::failed(
                index,
                PageError::TaskPanicked {
                    page: index,
                    detail: e.to_string(),
                }
                .to_string(),
            );
        }
    };
    debug!(
        "Page {index}: {engine} recognised {} chars",
        raw_text.len()
    );

    if raw_text.trim().is_empty() {
        info!("Page {index}: no text detected");
        return PageOutcome {
            index,
            success: true,
            text: NO_TEXT_PLACEHOLDER.to_string(),
            fields: None,
            tokens_used: 0,
            error: None,
        };
    }

    match extract::extract_fields(client.as_ref(), &raw_text, &system_prompt, max_input_chars)
        .await
    {
        Ok(extraction) => PageOutcome {
            index,
            success: true,
            text: extraction.text,
            fields: extraction.fields,
            tokens_used: extraction.tokens_used,
            error: None,
        },
        Err(ModelCallError::Timeout(secs)) => PageOutcome::failed(
            index,
            PageError::ModelTimeout { page: index, secs }.to_string(),
        ),
        Err(e) => PageOutcome::failed(
            index,
            PageError::ModelCallFailed {
                page: index,
                detail: e.to_string(),
            }
            .to_string(),
        ),
    }
}

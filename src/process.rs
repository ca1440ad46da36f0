//! The document orchestrator: drive one uploaded document through render,
//! enhancement, and the per-page pipeline, then aggregate.
//!
//! ## Failure policy
//!
//! Structural errors (validation, rendering) are terminal and returned as
//! `Err`. Page-level failures are absorbed: pages are independent, a
//! failure on page *k* never prevents processing page *k + 1*, and the
//! final text stream is page-complete even under partial failure — failed
//! pages appear as inline markers rather than being silently omitted. The
//! document as a whole fails only when *every* page failed, and even then
//! the outcome is returned as `Ok` so the rendered imagery reaches the
//! caller for diagnostics.
//!
//! ## Ordering
//!
//! Pages may be enhanced and processed concurrently, but results are joined
//! back in index order (`buffered`, not `buffer_unordered`): both the
//! `Page i of N` text assembly and first-success field selection depend on
//! page order. Dropping the returned future cancels remaining page work; no
//! state is persisted anywhere.

use crate::config::ProcessingConfig;
use crate::error::DocfieldError;
use crate::fields::FieldRecord;
use crate::outcome::{Dimensions, DocumentOutcome, Page, PageOutcome};
use crate::pipeline::extract::{HttpModelClient, ModelClient};
use crate::pipeline::ocr::TextRecognizer;
use crate::pipeline::{enhance, page, render};
use crate::prompts::DEFAULT_SYSTEM_PROMPT;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Process one uploaded document into a [`DocumentOutcome`].
///
/// # Arguments
/// * `bytes` — the raw upload
/// * `content_type` — declared kind, e.g. `image/png` or `application/pdf`
/// * `config` — processing configuration (passed explicitly; nothing global)
///
/// # Errors
/// Returns `Err(DocfieldError)` only for structural failures: empty or
/// oversized input, an unsupported content type, or a document that cannot
/// be rendered. Per-page failures are reported inside the outcome.
pub async fn process_document(
    bytes: &[u8],
    content_type: &str,
    config: &ProcessingConfig,
) -> Result<DocumentOutcome, DocfieldError> {
    // ── Step 1: Validate ingress ─────────────────────────────────────────
    if bytes.is_empty() {
        return Err(DocfieldError::EmptyInput);
    }
    if bytes.len() > config.max_upload_bytes {
        return Err(DocfieldError::OversizedInput {
            size: bytes.len(),
            limit: config.max_upload_bytes,
        });
    }
    let kind = render::DocumentKind::from_content_type(content_type)?;
    info!(
        "Processing {} bytes as {:?}",
        bytes.len(),
        kind
    );

    // ── Step 2: Render pages ─────────────────────────────────────────────
    let rendered = render::render_document(bytes, kind, config).await?;
    let total_pages = rendered.total_pages;
    let processed_page_count = rendered.pages.len();
    let original_image = rendered.original_image;
    let original_dimensions = rendered.original_dimensions;

    // ── Step 3: Enhance pages (concurrent, joined in index order) ────────
    // EXIF rotation metadata only exists on raw image uploads; PDF renders
    // are already upright.
    let orientation = match kind {
        render::DocumentKind::SingleImage(_) => enhance::exif_orientation(bytes),
        render::DocumentKind::Paginated => None,
    };
    let max_dimension = config.max_dimension;
    let enhanced: Vec<Page> = stream::iter(rendered.pages.into_iter().map(|mut pg| async move {
        tokio::task::spawn_blocking(move || {
            let (cleaned, log) = enhance::enhance(&pg.image, orientation, max_dimension);
            pg.image = cleaned;
            pg.enhancement_log = log;
            pg
        })
        .await
        .map_err(|e| DocfieldError::Internal(format!("Enhancement task panicked: {e}")))
    }))
    .buffered(config.concurrency)
    .collect::<Vec<_>>()
    .await
    .into_iter()
    .collect::<Result<_, _>>()?;

    let first_page = &enhanced[0];
    let mut enhancement_log = first_page.enhancement_log.clone();
    let processed_dimensions = Dimensions {
        width: first_page.image.width(),
        height: first_page.image.height(),
    };
    let cleaned_image = enhance::encode_png(&first_page.image)
        .map_err(|e| DocfieldError::Internal(format!("PNG encoding failed: {e}")))?;
    enhancement_log.push("Encoded losslessly as PNG".to_string());

    // ── Step 4: Run the page pipeline per page ───────────────────────────
    let recognizer = resolve_recognizer(config);
    let client = resolve_model_client(config)?;
    let system_prompt: Arc<str> = Arc::from(
        config
            .system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_PROMPT),
    );
    let max_input_chars = config.model.max_input_chars;

    let outcomes: Vec<PageOutcome> = stream::iter(enhanced.into_iter().map(|pg| {
        let recognizer = Arc::clone(&recognizer);
        let client = Arc::clone(&client);
        let system_prompt = Arc::clone(&system_prompt);
        async move {
            page::run_page(
                recognizer,
                client,
                pg.image,
                pg.index,
                system_prompt,
                max_input_chars,
            )
            .await
        }
    }))
    .buffered(config.concurrency)
    .collect()
    .await;

    // ── Step 5: Aggregate ────────────────────────────────────────────────
    let tokens_used: u64 = outcomes.iter().map(|o| o.tokens_used).sum();
    let text = assemble_text(&outcomes, total_pages);
    let fields = select_fields(&outcomes);
    let succeeded = outcomes.iter().filter(|o| o.success).count();
    let success = succeeded > 0;

    let error = if success {
        None
    } else {
        let last_error = outcomes
            .iter()
            .rev()
            .find_map(|o| o.error.clone())
            .unwrap_or_else(|| "Unknown error".to_string());
        warn!(
            "{}",
            DocfieldError::AllPagesFailed {
                total: outcomes.len(),
                last_error: last_error.clone(),
            }
        );
        Some(last_error)
    };

    debug!(
        "Aggregated {}/{} successful pages, {} tokens",
        succeeded,
        outcomes.len(),
        tokens_used
    );

    Ok(DocumentOutcome {
        success,
        error,
        text,
        fields,
        tokens_used,
        page_count: total_pages,
        processed_page_count,
        enhancement_log,
        pages: outcomes,
        original_image,
        cleaned_image,
        original_dimensions,
        processed_dimensions,
        uploaded_bytes: bytes.len(),
    })
}

/// Synchronous wrapper around [`process_document`].
///
/// Creates a temporary tokio runtime internally.
pub fn process_document_sync(
    bytes: &[u8],
    content_type: &str,
    config: &ProcessingConfig,
) -> Result<DocumentOutcome, DocfieldError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DocfieldError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(process_document(bytes, content_type, config))
}

/// Resolve the text recognizer: injected instance first, then the built-in
/// engine.
fn resolve_recognizer(config: &ProcessingConfig) -> Arc<dyn TextRecognizer> {
    if let Some(ref recognizer) = config.recognizer {
        return Arc::clone(recognizer);
    }

    #[cfg(feature = "tesseract")]
    {
        Arc::new(crate::pipeline::ocr::TesseractRecognizer::new(
            config.ocr_language.clone(),
        ))
    }
    #[cfg(not(feature = "tesseract"))]
    {
        Arc::new(crate::pipeline::ocr::NullRecognizer)
    }
}

/// Resolve the model client: injected instance first, then the HTTP client
/// built from the model config.
fn resolve_model_client(config: &ProcessingConfig) -> Result<Arc<dyn ModelClient>, DocfieldError> {
    if let Some(ref client) = config.model_client {
        return Ok(Arc::clone(client));
    }
    Ok(Arc::new(HttpModelClient::new(config.model.clone())?))
}

/// Concatenate page text in index order.
///
/// With more than one page in the document, every page's text is prefixed
/// with a `Page i of N` marker; a failed page contributes an inline failure
/// marker naming the page and its error instead of being omitted, so the
/// stream is page-complete even under partial failure.
fn assemble_text(outcomes: &[PageOutcome], total_pages: usize) -> String {
    let multi_page = total_pages > 1;
    let mut parts: Vec<String> = Vec::with_capacity(outcomes.len());

    for outcome in outcomes {
        let body = if outcome.success {
            outcome.text.clone()
        } else {
            format!(
                "[Processing failed: {}]",
                outcome.error.as_deref().unwrap_or("unknown error")
            )
        };
        if multi_page {
            parts.push(format!(
                "Page {} of {}:\n{}",
                outcome.index + 1,
                total_pages,
                body
            ));
        } else {
            parts.push(body);
        }
    }

    parts.join("\n\n")
}

/// Select the canonical field record: the first outcome (by page index)
/// that succeeded and carries a record.
///
/// First-success wins even when a later page's record has more populated
/// fields — a deliberate simplicity trade-off, not a quality heuristic.
fn select_fields(outcomes: &[PageOutcome]) -> Option<FieldRecord> {
    outcomes
        .iter()
        .find(|o| o.success && o.fields.is_some())
        .and_then(|o| o.fields.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_page(index: usize, text: &str, fields: Option<FieldRecord>, tokens: u64) -> PageOutcome {
        PageOutcome {
            index,
            success: true,
            text: text.to_string(),
            fields,
            tokens_used: tokens,
            error: None,
        }
    }

    fn record_with_invoice(number: &str) -> FieldRecord {
        FieldRecord {
            invoice_number: Some(number.to_string()),
            ..FieldRecord::default()
        }
    }

    #[test]
    fn single_page_text_has_no_marker() {
        let outcomes = vec![ok_page(0, "hello", None, 0)];
        assert_eq!(assemble_text(&outcomes, 1), "hello");
    }

    #[test]
    fn multi_page_text_markers_and_inline_failure() {
        // The 3-page scenario: page 1 (index 1) timed out, pages 0 and 2
        // succeeded. Text must stay page-complete with markers for all.
        let outcomes = vec![
            ok_page(0, "first page", Some(record_with_invoice("A-1")), 40),
            PageOutcome::failed(1, "model call timed out after 120s"),
            ok_page(2, "third page", Some(record_with_invoice("A-3")), 60),
        ];
        let text = assemble_text(&outcomes, 3);
        assert!(text.contains("Page 1 of 3:\nfirst page"));
        assert!(text.contains("Page 2 of 3:\n[Processing failed: model call timed out after 120s]"));
        assert!(text.contains("Page 3 of 3:\nthird page"));

        // Tokens sum only over pages that consumed them.
        let tokens: u64 = outcomes.iter().map(|o| o.tokens_used).sum();
        assert_eq!(tokens, 100);

        // First success wins: page 0's record, not page 2's.
        let selected = select_fields(&outcomes).unwrap();
        assert_eq!(selected.invoice_number.as_deref(), Some("A-1"));
    }

    #[test]
    fn sparse_early_record_beats_full_later_record() {
        // Page 0 returned a record with every field null; page 1 returned a
        // fully populated one. Policy: page 0's record is selected.
        let outcomes = vec![
            ok_page(0, "page one", Some(FieldRecord::default()), 10),
            ok_page(
                1,
                "page two",
                Some(FieldRecord {
                    invoice_number: Some("FULL-1".into()),
                    vendor_name: Some("ACME".into()),
                    total_amount: Some("99.00".into()),
                    ..FieldRecord::default()
                }),
                10,
            ),
        ];
        let selected = select_fields(&outcomes).unwrap();
        assert!(selected.is_empty());
        assert!(selected.invoice_number.is_none());
    }

    #[test]
    fn failed_pages_never_contribute_fields() {
        let outcomes = vec![
            PageOutcome::failed(0, "boom"),
            ok_page(1, "page two", Some(record_with_invoice("B-2")), 5),
        ];
        let selected = select_fields(&outcomes).unwrap();
        assert_eq!(selected.invoice_number.as_deref(), Some("B-2"));
    }

    #[test]
    fn no_successful_records_selects_nothing() {
        let outcomes = vec![
            ok_page(0, "degraded raw text", None, 0),
            PageOutcome::failed(1, "boom"),
        ];
        assert!(select_fields(&outcomes).is_none());
    }
}

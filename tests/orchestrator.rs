//! End-to-end tests for the document orchestrator.
//!
//! These run entirely in memory: input images are generated with the
//! `image` crate and the OCR engine and remote model are injected through
//! the config, so no Tesseract install, network access, or API key is
//! needed.

use async_trait::async_trait;
use docfield::{
    process_document, DocfieldError, ModelCallError, ModelClient, ModelCompletion,
    ProcessResponse, ProcessingConfig, TextRecognizer, NO_TEXT_PLACEHOLDER,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::Arc;

// ── Test doubles ─────────────────────────────────────────────────────────

struct FixedRecognizer(&'static str);

impl TextRecognizer for FixedRecognizer {
    fn name(&self) -> &'static str {
        "fixed"
    }
    fn recognize(&self, _image: &DynamicImage) -> String {
        self.0.to_string()
    }
}

struct FixedClient(Result<ModelCompletion, ModelCallError>);

#[async_trait]
impl ModelClient for FixedClient {
    async fn complete(&self, _system: &str, _user: &str) -> Result<ModelCompletion, ModelCallError> {
        self.0.clone()
    }
}

fn white_png(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([255, 255, 255])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .expect("encode");
    buf
}

fn config_with(
    recognizer: &'static str,
    client: Result<ModelCompletion, ModelCallError>,
) -> ProcessingConfig {
    ProcessingConfig::builder()
        .recognizer(Arc::new(FixedRecognizer(recognizer)))
        .model_client(Arc::new(FixedClient(client)))
        .build()
        .unwrap()
}

// ── Scenarios ────────────────────────────────────────────────────────────

#[tokio::test]
async fn blank_white_image_succeeds_with_placeholder() {
    let bytes = white_png(80, 60);
    let config = config_with("", Err(ModelCallError::NotConfigured));

    let outcome = process_document(&bytes, "image/png", &config).await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.text, NO_TEXT_PLACEHOLDER);
    assert!(outcome.fields.is_none());
    assert_eq!(outcome.tokens_used, 0);
    assert_eq!(outcome.page_count, 1);
    assert_eq!(outcome.processed_page_count, 1);
    assert!(!outcome.enhancement_log.is_empty());
    // The PNG entry is logged where the encode actually happens, as the
    // final document-level step.
    assert_eq!(
        outcome.enhancement_log.last().map(String::as_str),
        Some("Encoded losslessly as PNG")
    );
    // The original display artifact is the upload itself.
    assert_eq!(outcome.original_image, bytes);
    assert!(!outcome.cleaned_image.is_empty());
}

#[tokio::test]
async fn unreachable_model_still_succeeds_with_raw_ocr_text() {
    let bytes = white_png(50, 50);
    let config = config_with(
        "INVOICE INV-7 total 88.00",
        Err(ModelCallError::Unavailable("HTTP 503".into())),
    );

    let outcome = process_document(&bytes, "image/png", &config).await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.text, "INVOICE INV-7 total 88.00");
    assert!(outcome.fields.is_none());
    assert_eq!(outcome.tokens_used, 0);
    assert!(outcome.error.is_none());
}

#[tokio::test]
async fn successful_extraction_populates_fields_and_tokens() {
    let bytes = white_png(50, 50);
    let config = config_with(
        "lnvoice 1NV-7 from ACME",
        Ok(ModelCompletion {
            content: concat!(
                "{\"cleanedText\":\"Invoice INV-7 from ACME\",",
                "\"documentType\":\"invoice\",",
                "\"invoiceNumber\":\"INV-7\",",
                "\"vendorName\":\"ACME\",",
                "\"additionalFields\":{\"poNumber\":\"PO-12\"}}"
            )
            .into(),
            tokens_used: 73,
        }),
    );

    let outcome = process_document(&bytes, "image/png", &config).await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.text, "Invoice INV-7 from ACME");
    assert_eq!(outcome.tokens_used, 73);
    let fields = outcome.fields.unwrap();
    assert_eq!(fields.document_type.as_deref(), Some("invoice"));
    assert_eq!(fields.invoice_number.as_deref(), Some("INV-7"));
    assert_eq!(
        fields.additional_fields.get("poNumber").map(String::as_str),
        Some("PO-12")
    );
}

#[tokio::test]
async fn every_page_failing_fails_the_document_but_keeps_imagery() {
    let bytes = white_png(50, 50);
    let config = config_with("some text", Err(ModelCallError::Timeout(120)));

    let outcome = process_document(&bytes, "image/png", &config).await.unwrap();

    assert!(!outcome.success);
    let error = outcome.error.as_deref().unwrap();
    assert!(error.contains("timed out"), "got: {error}");
    // Diagnostic imagery survives an all-pages failure.
    assert!(!outcome.original_image.is_empty());
    assert!(!outcome.cleaned_image.is_empty());
    assert_eq!(outcome.tokens_used, 0);
    assert!(outcome.fields.is_none());
}

#[tokio::test]
async fn processing_is_deterministic_for_identical_input() {
    let bytes = white_png(40, 30);
    let config = config_with("", Err(ModelCallError::NotConfigured));

    let first = process_document(&bytes, "image/png", &config).await.unwrap();
    let second = process_document(&bytes, "image/png", &config).await.unwrap();

    assert_eq!(first.cleaned_image, second.cleaned_image);
    assert_eq!(first.enhancement_log, second.enhancement_log);
}

#[tokio::test]
async fn response_record_round_trips_through_json() {
    let bytes = white_png(32, 32);
    let config = config_with("", Err(ModelCallError::NotConfigured));

    let outcome = process_document(&bytes, "image/png", &config).await.unwrap();
    let response = ProcessResponse::from_outcome(&outcome);
    let json = serde_json::to_string(&response).unwrap();
    let reparsed: ProcessResponse = serde_json::from_str(&json).unwrap();

    assert!(reparsed.success);
    assert_eq!(reparsed.extracted_text, NO_TEXT_PLACEHOLDER);
    assert_eq!(reparsed.image_mime, "image/png");
    assert_eq!(reparsed.metadata.page_count, 1);
    assert_eq!(reparsed.metadata.uploaded_bytes, bytes.len());
}

// ── Ingress validation ───────────────────────────────────────────────────

#[tokio::test]
async fn empty_input_is_rejected_before_processing() {
    let config = config_with("", Err(ModelCallError::NotConfigured));
    let err = process_document(&[], "image/png", &config).await.unwrap_err();
    assert!(matches!(err, DocfieldError::EmptyInput));
}

#[tokio::test]
async fn oversized_input_is_rejected_before_processing() {
    let config = ProcessingConfig::builder()
        .max_upload_bytes(16)
        .recognizer(Arc::new(FixedRecognizer("")))
        .model_client(Arc::new(FixedClient(Err(ModelCallError::NotConfigured))))
        .build()
        .unwrap();
    let err = process_document(&[0u8; 64], "image/png", &config)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DocfieldError::OversizedInput { size: 64, limit: 16 }
    ));
}

#[tokio::test]
async fn unsupported_content_type_is_rejected_with_accepted_set() {
    let config = config_with("", Err(ModelCallError::NotConfigured));
    let err = process_document(&white_png(10, 10), "image/gif", &config)
        .await
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("image/gif"));
    assert!(msg.contains("application/pdf"));
}

#[tokio::test]
async fn corrupt_image_bytes_are_a_structural_failure() {
    let config = config_with("", Err(ModelCallError::NotConfigured));
    let err = process_document(b"not an image at all", "image/png", &config)
        .await
        .unwrap_err();
    assert!(matches!(err, DocfieldError::CorruptDocument { .. }));
}

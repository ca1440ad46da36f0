//! System prompt for model-based text normalisation and field extraction.
//!
//! Centralising the prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing the schema (adding a field,
//!    renaming a key) requires editing exactly one place, together with the
//!    parser in [`crate::fields`].
//!
//! 2. **Testability** — unit tests can inspect the prompt directly without
//!    calling a real model, so schema regressions are caught cheaply.
//!
//! Callers can override the default via
//! [`crate::config::ProcessingConfig::system_prompt`]; the constant here is
//! used only when no override is provided.

/// Default system instruction fixing the exact output schema.
///
/// The model receives the raw OCR text as the only user message and must
/// answer with a single JSON object. Every schema key is nullable; the
/// parser in [`crate::fields`] tolerates casing drift, numeric values, and
/// stray code fences anyway.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a document analysis assistant. You receive raw OCR text extracted from a scanned business document. Your task is to clean the text and extract key fields.

Respond with ONE JSON object and nothing else, using exactly this schema:

{
  "cleanedText": string,        // the OCR text with recognition errors fixed, null if unusable
  "documentType": string|null,  // one of: "invoice", "receipt", "purchase_order", "contract", "letter", "form", "other"
  "invoiceNumber": string|null,
  "invoiceDate": string|null,   // as printed on the document
  "dueDate": string|null,
  "vendorName": string|null,
  "customerName": string|null,
  "subtotal": string|null,
  "taxAmount": string|null,
  "totalAmount": string|null,
  "currency": string|null,      // ISO code when identifiable, e.g. "USD"
  "paymentTerms": string|null,
  "additionalFields": { }       // any other labelled values found, as string key/value pairs
}

Rules:
- Use null for any field not present in the text. Never invent values.
- Keep amounts exactly as printed, including separators.
- Do NOT wrap the JSON in markdown code fences.
- Do NOT add commentary before or after the JSON."#;

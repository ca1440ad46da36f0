//! Structured field extraction: the fixed schema and the defensive parser
//! for the remote model's output.
//!
//! All knowledge of the model's response shape lives in this one module, so
//! schema drift in the remote model's output is a one-place fix. The parser
//! deliberately does **not** deserialize into a rigid serde struct — models
//! vary key casing, emit numbers where strings were asked for, wrap output
//! in code fences, and return `null` for absent fields. Instead the response
//! is walked as a generic [`serde_json::Value`] tree with case-insensitive
//! key lookup and explicit scalar coercion.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A sparse structured representation of a document's key business fields.
///
/// All fields are optional — absence means "not found", never "empty
/// string". Created once per successful page extraction and immutable
/// afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRecord {
    /// Document classification, e.g. "invoice", "receipt", "contract".
    pub document_type: Option<String>,
    pub invoice_number: Option<String>,
    pub invoice_date: Option<String>,
    pub due_date: Option<String>,
    pub vendor_name: Option<String>,
    pub customer_name: Option<String>,
    pub subtotal: Option<String>,
    pub tax_amount: Option<String>,
    pub total_amount: Option<String>,
    pub currency: Option<String>,
    pub payment_terms: Option<String>,
    /// Open-ended key/value pairs for fields outside the fixed schema.
    #[serde(default)]
    pub additional_fields: BTreeMap<String, String>,
}

impl FieldRecord {
    /// True when every scalar is absent and the additional-field map is empty.
    ///
    /// Note: an "empty" record is still a record — field selection at the
    /// document level takes the first successful page's record even when it
    /// is empty (first-success-wins, by index).
    pub fn is_empty(&self) -> bool {
        self.document_type.is_none()
            && self.invoice_number.is_none()
            && self.invoice_date.is_none()
            && self.due_date.is_none()
            && self.vendor_name.is_none()
            && self.customer_name.is_none()
            && self.subtotal.is_none()
            && self.tax_amount.is_none()
            && self.total_amount.is_none()
            && self.currency.is_none()
            && self.payment_terms.is_none()
            && self.additional_fields.is_empty()
    }
}

/// Result of parsing one model response.
#[derive(Debug, Clone)]
pub struct ParsedExtraction {
    /// Normalised text, when the model supplied a usable `cleanedText`.
    pub cleaned_text: Option<String>,
    /// The structured field record assembled from the response.
    pub record: FieldRecord,
}

/// Parse a model response into a [`ParsedExtraction`].
///
/// Returns `None` when the content is not JSON at all (after fence
/// stripping) or its top level is not an object. A `None` here is a
/// content-level parse failure — the caller carries the raw OCR text
/// forward and the page is still considered successful.
pub fn parse_model_output(content: &str) -> Option<ParsedExtraction> {
    let stripped = strip_code_fences(content);
    let value: Value = serde_json::from_str(stripped.trim()).ok()?;
    let obj = value.as_object()?;

    let cleaned_text = get_ci(obj, "cleanedText")
        .and_then(coerce_scalar)
        .filter(|t| !t.trim().is_empty());

    let scalar = |key: &str| get_ci(obj, key).and_then(coerce_scalar);

    let mut additional_fields = BTreeMap::new();
    // Only an object-valued additionalFields contributes; strings, arrays,
    // and null all yield no additional fields.
    if let Some(Value::Object(map)) = get_ci(obj, "additionalFields") {
        for (key, val) in map {
            if let Some(text) = coerce_scalar(val) {
                additional_fields.insert(key.clone(), text);
            }
        }
    }

    let record = FieldRecord {
        document_type: scalar("documentType"),
        invoice_number: scalar("invoiceNumber"),
        invoice_date: scalar("invoiceDate"),
        due_date: scalar("dueDate"),
        vendor_name: scalar("vendorName"),
        customer_name: scalar("customerName"),
        subtotal: scalar("subtotal"),
        tax_amount: scalar("taxAmount"),
        total_amount: scalar("totalAmount"),
        currency: scalar("currency"),
        payment_terms: scalar("paymentTerms"),
        additional_fields,
    };

    Some(ParsedExtraction {
        cleaned_text,
        record,
    })
}

/// Strip surrounding code-fence markers — models sometimes wrap JSON in
/// ` ```json … ``` ` despite instructions not to.
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the fence line.
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.strip_suffix("```").map(str::trim).unwrap_or(rest.trim())
}

/// Case-insensitive property lookup on a JSON object.
fn get_ci<'a>(obj: &'a serde_json::Map<String, Value>, key: &str) -> Option<&'a Value> {
    if let Some(v) = obj.get(key) {
        return Some(v);
    }
    obj.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v)
}

/// Coerce any scalar JSON value to its textual form.
///
/// `null` maps to absent, matching the schema's "absence means not found".
/// Objects and arrays are never coerced — a nested structure where a scalar
/// was expected is treated as absent rather than stringified.
fn coerce_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Object(_) | Value::Array(_) => None,
    }
}

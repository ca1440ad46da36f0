//! Configuration types for document processing.
//!
//! All processing behaviour is controlled through [`ProcessingConfig`], built
//! via its [`ProcessingConfigBuilder`]. The struct is constructed once per
//! process and passed explicitly into the orchestrator — there are no
//! ambient/global configuration reads anywhere in the pipeline, so two runs
//! with the same config and input are directly comparable.
//!
//! # Design choice: builder over constructor
//! A dozen-field constructor is unreadable and breaks on every new field.
//! The builder lets callers set only what they care about and rely on
//! well-documented defaults for the rest.

use crate::error::DocfieldError;
use crate::pipeline::extract::ModelClient;
use crate::pipeline::ocr::TextRecognizer;
use std::fmt;
use std::sync::Arc;

/// Default upload ceiling: 20 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Configuration for processing one or more documents.
///
/// Built via [`ProcessingConfig::builder()`] or using
/// [`ProcessingConfig::default()`].
///
/// # Example
/// ```rust
/// use docfield::ProcessingConfig;
///
/// let config = ProcessingConfig::builder()
///     .max_pages(3)
///     .concurrency(2)
///     .model("gpt-4o-mini")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ProcessingConfig {
    /// Maximum number of PDF pages processed per document. Default: 5.
    ///
    /// Pages beyond this cap are counted (`page_count` reports the true
    /// total) but never rendered. Business documents carry their key fields
    /// on the first pages; the cap bounds OCR and model cost on large scans.
    pub max_pages: usize,

    /// Maximum rendered/enhanced image dimension (longer side) in pixels.
    /// Default: 2048.
    ///
    /// Used twice: as the pdfium render target width, and as the enhancer's
    /// downscale threshold for single-image uploads. 2048 px keeps text
    /// legible for OCR while bounding the pixel buffers a page allocates.
    pub max_dimension: u32,

    /// Upload size ceiling in bytes. Default: 20 MiB.
    ///
    /// Enforced before any decoding happens; oversized and zero-length
    /// uploads are rejected without touching the pipeline.
    pub max_upload_bytes: usize,

    /// Number of page pipelines run concurrently. Default: 4.
    ///
    /// OCR is CPU-bound and the model call is network-bound, so overlapping
    /// pages helps both. Results are still joined back in page-index order —
    /// concurrency never reorders the text stream or the field selection.
    /// This is also the only knob bounding in-flight remote calls; lower it
    /// if the provider throttles.
    pub concurrency: usize,

    /// Tesseract language code(s), e.g. "eng" or "eng+fra". Default: "eng".
    pub ocr_language: String,

    /// Remote model settings (endpoint, credential, sampling).
    pub model: ModelConfig,

    /// Custom system instruction for field extraction. If None, uses the
    /// built-in schema prompt from [`crate::prompts`].
    pub system_prompt: Option<String>,

    /// Pre-constructed model client. Takes precedence over [`ModelConfig`]
    /// endpoint settings. Useful in tests or when the caller needs custom
    /// middleware around the remote call.
    pub model_client: Option<Arc<dyn ModelClient>>,

    /// Pre-constructed text recognizer. Takes precedence over the built-in
    /// Tesseract engine. Same injection seam as `model_client`.
    pub recognizer: Option<Arc<dyn TextRecognizer>>,
}

/// Settings for the remote chat-completion model.
///
/// Treated as opaque configuration: the orchestrator only knows it can send
/// a system instruction plus one user message and get text and token counts
/// back. The endpoint must speak the OpenAI-compatible chat-completions
/// protocol.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// API base URL, without the `/chat/completions` suffix.
    pub base_url: String,

    /// Bearer credential. `None` means no call is attempted and pages fall
    /// back to raw OCR text — a configuration gap is not a page failure.
    pub api_key: Option<String>,

    /// Model identifier, e.g. "gpt-4o-mini".
    pub model: String,

    /// Maximum tokens the model may generate per page. Default: 1024.
    pub max_tokens: u32,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Low temperature keeps the model faithful to the OCR text — exactly
    /// what you want for normalisation and field extraction.
    pub temperature: f32,

    /// Per-call timeout in seconds. Default: 120.
    ///
    /// A timed-out call fails that page only; sibling pages and the
    /// document as a whole proceed.
    pub timeout_secs: u64,

    /// Maximum characters of OCR text sent to the model. Default: 1500.
    ///
    /// A cost/latency trade-off, not a correctness requirement: the fixed
    /// schema's fields typically appear near document headers.
    pub max_input_chars: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            max_tokens: 1024,
            temperature: 0.1,
            timeout_secs: 120,
            max_input_chars: 1500,
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_pages: 5,
            max_dimension: 2048,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            concurrency: 4,
            ocr_language: "eng".to_string(),
            model: ModelConfig::default(),
            system_prompt: None,
            model_client: None,
            recognizer: None,
        }
    }
}

impl fmt::Debug for ProcessingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessingConfig")
            .field("max_pages", &self.max_pages)
            .field("max_dimension", &self.max_dimension)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("concurrency", &self.concurrency)
            .field("ocr_language", &self.ocr_language)
            .field("model", &self.model)
            .field("model_client", &self.model_client.as_ref().map(|_| "<dyn ModelClient>"))
            .field("recognizer", &self.recognizer.as_ref().map(|_| "<dyn TextRecognizer>"))
            .finish()
    }
}

impl ProcessingConfig {
    /// Create a new builder for `ProcessingConfig`.
    pub fn builder() -> ProcessingConfigBuilder {
        ProcessingConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ProcessingConfig`].
#[derive(Debug)]
pub struct ProcessingConfigBuilder {
    config: ProcessingConfig,
}

impl ProcessingConfigBuilder {
    pub fn max_pages(mut self, n: usize) -> Self {
        self.config.max_pages = n.max(1);
        self
    }

    pub fn max_dimension(mut self, px: u32) -> Self {
        self.config.max_dimension = px.max(100);
        self
    }

    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.model.base_url = url.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.model.api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model.model = model.into();
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.model.max_tokens = n;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.model.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn model_timeout_secs(mut self, secs: u64) -> Self {
        self.config.model.timeout_secs = secs;
        self
    }

    pub fn max_input_chars(mut self, n: usize) -> Self {
        self.config.model.max_input_chars = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn model_client(mut self, client: Arc<dyn ModelClient>) -> Self {
        self.config.model_client = Some(client);
        self
    }

    pub fn recognizer(mut self, recognizer: Arc<dyn TextRecognizer>) -> Self {
        self.config.recognizer = Some(recognizer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ProcessingConfig, DocfieldError> {
        let c = &self.config;
        if c.max_pages == 0 {
            return Err(DocfieldError::InvalidConfig("max_pages must be ≥ 1".into()));
        }
        if c.concurrency == 0 {
            return Err(DocfieldError::InvalidConfig("concurrency must be ≥ 1".into()));
        }
        if c.max_dimension < 100 {
            return Err(DocfieldError::InvalidConfig(format!(
                "max_dimension must be ≥ 100 px, got {}",
                c.max_dimension
            )));
        }
        if c.max_upload_bytes == 0 {
            return Err(DocfieldError::InvalidConfig(
                "max_upload_bytes must be non-zero".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = ProcessingConfig::default();
        assert_eq!(c.max_pages, 5);
        assert_eq!(c.max_dimension, 2048);
        assert_eq!(c.max_upload_bytes, 20 * 1024 * 1024);
        assert_eq!(c.model.max_input_chars, 1500);
        assert!(c.model.api_key.is_none());
        assert!((c.model.temperature - 0.1).abs() < f32::EPSILON);
    }

    #[test]
    fn builder_clamps_degenerate_values() {
        let c = ProcessingConfig::builder()
            .max_pages(0)
            .concurrency(0)
            .max_dimension(1)
            .build()
            .unwrap();
        assert_eq!(c.max_pages, 1);
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.max_dimension, 100);
    }

    #[test]
    fn builder_sets_model_fields() {
        let c = ProcessingConfig::builder()
            .api_key("sk-test")
            .model("gpt-4o")
            .base_url("http://localhost:8080/v1")
            .model_timeout_secs(30)
            .build()
            .unwrap();
        assert_eq!(c.model.api_key.as_deref(), Some("sk-test"));
        assert_eq!(c.model.model, "gpt-4o");
        assert_eq!(c.model.base_url, "http://localhost:8080/v1");
        assert_eq!(c.model.timeout_secs, 30);
    }

    #[test]
    fn debug_elides_trait_objects() {
        let dbg = format!("{:?}", ProcessingConfig::default());
        assert!(dbg.contains("max_pages"));
        assert!(!dbg.contains("dyn ModelClient {"));
    }
}

//! Field extraction: send raw OCR text to a chat-completion model and parse
//! the structured answer.
//!
//! ## Graceful degradation
//!
//! A broken remote dependency must not fail a page when OCR already
//! succeeded. The ladder, from most to least recoverable:
//!
//! - no credential configured → no call attempted, raw text kept, 0 tokens
//! - non-success HTTP status → raw text kept, 0 tokens
//! - empty or unparseable response envelope → raw text kept, 0 tokens
//! - model content not parseable as the schema → raw text kept, record
//!   absent, reported token usage still counted (the work was billed)
//! - timeout or any other transport error → page-level failure, handled at
//!   the page-pipeline boundary
//!
//! The client sits behind the [`ModelClient`] trait so tests inject mocks
//! via [`crate::config::ProcessingConfig::model_client`].

use crate::config::ModelConfig;
use crate::fields::{self, FieldRecord};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// A single text completion plus its token usage.
#[derive(Debug, Clone)]
pub struct ModelCompletion {
    pub content: String,
    pub tokens_used: u64,
}

/// Failure modes of one remote model call, ranked by recoverability.
#[derive(Debug, Clone, Error)]
pub enum ModelCallError {
    /// No credential configured; the call was never attempted.
    #[error("no model credential configured")]
    NotConfigured,

    /// The endpoint answered but unusably (non-success status, empty or
    /// unparseable envelope). Degrades to raw OCR text.
    #[error("model endpoint unavailable: {0}")]
    Unavailable(String),

    /// The call exceeded the configured timeout. Fails this page only.
    #[error("model call timed out after {0}s")]
    Timeout(u64),

    /// Any other transport or protocol error. Fails this page only.
    #[error("model call failed: {0}")]
    Other(String),
}

/// A chat-completion-style remote model.
///
/// Accepts a system instruction and one user message; returns a single text
/// completion plus token usage.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<ModelCompletion, ModelCallError>;
}

/// What one page's extraction produced.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Normalised text when the model supplied it, otherwise the raw input.
    pub text: String,
    /// Structured record, absent when the call degraded or parsing failed.
    pub fields: Option<FieldRecord>,
    pub tokens_used: u64,
}

/// Run field extraction for one page's raw OCR text.
///
/// Input is truncated to `max_input_chars` — the fixed schema's fields
/// typically appear near document headers, so the tail is cost without
/// signal. Returns `Err` only for the fatal-for-this-page modes
/// ([`ModelCallError::Timeout`] / [`ModelCallError::Other`]); everything
/// else degrades to a successful extraction carrying the raw text.
pub async fn extract_fields(
    client: &dyn ModelClient,
    raw_text: &str,
    system_prompt: &str,
    max_input_chars: usize,
) -> Result<Extraction, ModelCallError> {
    let input: String = raw_text.chars().take(max_input_chars).collect();

    let completion = match client.complete(system_prompt, &input).await {
        Ok(completion) => completion,
        Err(ModelCallError::NotConfigured) => {
            debug!("No model credential configured; keeping raw OCR text");
            return Ok(Extraction {
                text: raw_text.to_string(),
                fields: None,
                tokens_used: 0,
            });
        }
        Err(ModelCallError::Unavailable(reason)) => {
            warn!("Model unavailable ({reason}); keeping raw OCR text");
            return Ok(Extraction {
                text: raw_text.to_string(),
                fields: None,
                tokens_used: 0,
            });
        }
        Err(fatal) => return Err(fatal),
    };

    match fields::parse_model_output(&completion.content) {
        Some(parsed) => Ok(Extraction {
            text: parsed
                .cleaned_text
                .unwrap_or_else(|| raw_text.to_string()),
            fields: Some(parsed.record),
            tokens_used: completion.tokens_used,
        }),
        None => {
            warn!("Model output was not parseable as the field schema; keeping raw OCR text");
            Ok(Extraction {
                text: raw_text.to_string(),
                fields: None,
                tokens_used: completion.tokens_used,
            })
        }
    }
}

// ── HTTP client ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize, Default)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

/// [`ModelClient`] over an OpenAI-compatible `/chat/completions` endpoint.
pub struct HttpModelClient {
    http: reqwest::Client,
    config: ModelConfig,
}

impl HttpModelClient {
    /// Build a client with the configured per-call timeout.
    pub fn new(config: ModelConfig) -> Result<Self, crate::error::DocfieldError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| crate::error::DocfieldError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl ModelClient for HttpModelClient {
    async fn complete(&self, system: &str, user: &str) -> Result<ModelCompletion, ModelCallError> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return Err(ModelCallError::NotConfigured);
        };

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        debug!("Calling model '{}' at {url}", self.config.model);

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelCallError::Timeout(self.config.timeout_secs)
                } else {
                    ModelCallError::Other(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ModelCallError::Unavailable(format!("HTTP {status}")));
        }

        let envelope: ChatResponse = response
            .json()
            .await
            .map_err(|_| ModelCallError::Unavailable("unparseable response body".into()))?;

        let Some(choice) = envelope.choices.into_iter().next() else {
            return Err(ModelCallError::Unavailable("response carried no completion".into()));
        };
        if choice.message.content.trim().is_empty() {
            return Err(ModelCallError::Unavailable("response completion was empty".into()));
        }

        let usage = envelope.usage.unwrap_or_default();
        Ok(ModelCompletion {
            content: choice.message.content,
            tokens_used: usage.prompt_tokens + usage.completion_tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedClient(Result<ModelCompletion, ModelCallError>);

    #[async_trait]
    impl ModelClient for FixedClient {
        async fn complete(
            &self,
            _system: &str,
            _user: &str,
        ) -> Result<ModelCompletion, ModelCallError> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn missing_credential_degrades_to_raw_text() {
        let client = FixedClient(Err(ModelCallError::NotConfigured));
        let extraction = extract_fields(&client, "raw ocr text", "sys", 1500)
            .await
            .unwrap();
        assert_eq!(extraction.text, "raw ocr text");
        assert!(extraction.fields.is_none());
        assert_eq!(extraction.tokens_used, 0);
    }

    #[tokio::test]
    async fn unavailable_endpoint_degrades_to_raw_text() {
        let client = FixedClient(Err(ModelCallError::Unavailable("HTTP 503".into())));
        let extraction = extract_fields(&client, "raw", "sys", 1500).await.unwrap();
        assert_eq!(extraction.text, "raw");
        assert_eq!(extraction.tokens_used, 0);
    }

    #[tokio::test]
    async fn timeout_is_fatal_for_the_page() {
        let client = FixedClient(Err(ModelCallError::Timeout(120)));
        let err = extract_fields(&client, "raw", "sys", 1500).await.unwrap_err();
        assert!(matches!(err, ModelCallError::Timeout(120)));
    }

    #[tokio::test]
    async fn successful_completion_yields_record_and_cleaned_text() {
        let client = FixedClient(Ok(ModelCompletion {
            content: r#"{"cleanedText":"Invoice INV-9","invoiceNumber":"INV-9"}"#.into(),
            tokens_used: 42,
        }));
        let extraction = extract_fields(&client, "lnvoice 1NV-9", "sys", 1500)
            .await
            .unwrap();
        assert_eq!(extraction.text, "Invoice INV-9");
        assert_eq!(
            extraction.fields.unwrap().invoice_number.as_deref(),
            Some("INV-9")
        );
        assert_eq!(extraction.tokens_used, 42);
    }

    #[tokio::test]
    async fn unparseable_content_keeps_raw_text_and_counts_tokens() {
        let client = FixedClient(Ok(ModelCompletion {
            content: "Sorry, I cannot help with that.".into(),
            tokens_used: 17,
        }));
        let extraction = extract_fields(&client, "raw ocr", "sys", 1500).await.unwrap();
        assert_eq!(extraction.text, "raw ocr");
        assert!(extraction.fields.is_none());
        assert_eq!(extraction.tokens_used, 17);
    }

    #[tokio::test]
    async fn input_is_truncated_to_max_chars() {
        struct CapturingClient;

        #[async_trait]
        impl ModelClient for CapturingClient {
            async fn complete(
                &self,
                _system: &str,
                user: &str,
            ) -> Result<ModelCompletion, ModelCallError> {
                assert_eq!(user.chars().count(), 10);
                Ok(ModelCompletion {
                    content: "{}".into(),
                    tokens_used: 1,
                })
            }
        }

        let long_text = "x".repeat(500);
        extract_fields(&CapturingClient, &long_text, "sys", 10)
            .await
            .unwrap();
    }
}

//! Hosted text-generation provider (HuggingFace Inference API)
//!
//! Sends the field prompt as raw `inputs` and reads `generated_text` back.
//! The key is optional: anonymous calls work but are throttled harder. A
//! model still loading answers 503, which the router treats as a cooldown.

use super::chat::build_prompt;
use super::parse::parse_completion;
use super::{FallbackRequest, GenerativeProvider, ProviderReply};
use crate::error::{ResolveError, ResolveResult};
use crate::router::CallOutcome;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

pub const HUGGINGFACE_BASE_URL: &str = "https://api-inference.huggingface.co/models";
pub const HUGGINGFACE_MODEL: &str = "mistralai/Mistral-7B-Instruct-v0.2";

const INSTRUCTION: &str = "You are a literary reference assistant. Answer with a single JSON object and nothing else.";

#[derive(Debug, Serialize)]
struct GenerationRequest {
    inputs: String,
    parameters: GenerationParameters,
}

#[derive(Debug, Serialize)]
struct GenerationParameters {
    max_new_tokens: u32,
    temperature: f32,
    return_full_text: bool,
}

/// Text-generation fallback provider
#[derive(Debug, Clone)]
pub struct TextGenerationProvider {
    id: String,
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl TextGenerationProvider {
    pub fn new(
        id: &str,
        base_url: &str,
        model: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> ResolveResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ResolveError::HttpClient(e.to_string()))?;

        Ok(Self {
            id: id.to_string(),
            client,
            url: format!("{}/{}", base_url.trim_end_matches('/'), model.trim_matches('/')),
            api_key: api_key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty()),
        })
    }

    pub fn huggingface(api_key: Option<String>, timeout: Duration) -> ResolveResult<Self> {
        Self::new("huggingface", HUGGINGFACE_BASE_URL, HUGGINGFACE_MODEL, api_key, timeout)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post(&self, prompt: String) -> anyhow::Result<(u16, Option<String>)> {
        let body = GenerationRequest {
            inputs: prompt,
            parameters: GenerationParameters {
                max_new_tokens: 500,
                temperature: 0.3,
                return_full_text: false,
            },
        };

        let mut builder = self.client.post(&self.url).json(&body);
        if let Some(key) = self.api_key.as_deref() {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await.context("text generation request failed")?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Ok((status, None));
        }
        let value: Value = response
            .json()
            .await
            .context("failed to decode text generation response")?;
        Ok((status, generated_text(&value)))
    }
}

#[async_trait]
impl GenerativeProvider for TextGenerationProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn complete(&self, request: &FallbackRequest<'_>) -> ProviderReply {
        if request.missing.is_empty() {
            return ProviderReply::empty(CallOutcome::Success);
        }

        let prompt = format!("{INSTRUCTION}\n\n{}", build_prompt(request));
        let (status, text) = match self.post(prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(provider = %self.id, error = %e, "Provider call failed");
                return ProviderReply::empty(CallOutcome::Failed);
            }
        };

        let outcome = CallOutcome::from_status(status);
        if outcome != CallOutcome::Success {
            warn!(provider = %self.id, status = status, "Provider returned error status");
            return ProviderReply::empty(outcome);
        }

        let fields = text.as_deref().and_then(parse_completion).map(|mut fields| {
            fields.retain(|field, _| request.missing.contains(field));
            fields
        });
        match fields {
            Some(fields) if !fields.is_empty() => ProviderReply::success(fields),
            _ => {
                debug!(provider = %self.id, "Generation held no usable fields");
                ProviderReply::empty(CallOutcome::Failed)
            }
        }
    }
}

/// `generated_text` from either the list or the single-object response shape
pub fn generated_text(value: &Value) -> Option<String> {
    let entry = match value {
        Value::Array(items) => items.first()?,
        other => other,
    };
    entry
        .get("generated_text")
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_generated_text_shapes() {
        assert_eq!(
            generated_text(&json!([{"generated_text": "{\"genre\": \"Novel\"}"}])).as_deref(),
            Some("{\"genre\": \"Novel\"}")
        );
        assert_eq!(generated_text(&json!({"generated_text": "x"})).as_deref(), Some("x"));
        assert_eq!(generated_text(&json!([])), None);
        assert_eq!(generated_text(&json!({"error": "Model is loading"})), None);
        assert_eq!(generated_text(&json!([{"generated_text": "  "}])), None);
    }

    #[test]
    fn test_model_url() {
        let provider = TextGenerationProvider::huggingface(None, Duration::from_secs(5)).unwrap();
        assert_eq!(
            provider.url(),
            "https://api-inference.huggingface.co/models/mistralai/Mistral-7B-Instruct-v0.2"
        );
        assert_eq!(provider.id(), "huggingface");
    }
}

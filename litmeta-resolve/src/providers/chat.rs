//! OpenAI-compatible chat-completions provider
//!
//! Covers Groq and Together (same wire format, different base URL and model).
//! HTTP status maps to the router's outcome signal; a provider without an API
//! key reports `NotConfigured` and sends nothing.
//!
//! A call has up to two stages. The model is first asked directly and may
//! answer `WEB_SEARCH` when it does not know the work; with a [`WebSearch`]
//! attached, the provider then asks again with the search digest in the
//! prompt. Reasoning models sometimes leave `content` empty and put the answer
//! in their reasoning trace, which is parsed instead.

use super::parse::parse_completion;
use super::search::{truncate_chars, WebSearch, DEFAULT_MAX_CONTEXT_CHARS};
use super::{FallbackRequest, GenerativeProvider, ProviderReply};
use crate::error::{ResolveError, ResolveResult};
use crate::router::CallOutcome;
use crate::types::Field;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const GROQ_MODEL: &str = "openai/gpt-oss-20b";
pub const TOGETHER_BASE_URL: &str = "https://api.together.xyz/v1";
pub const TOGETHER_MODEL: &str = "meta-llama/Llama-3.1-70B-Instruct-Turbo";

/// Reply asking for search context instead of an answer
pub const WEB_SEARCH_MARKER: &str = "WEB_SEARCH";

const DIRECT_SYSTEM_PROMPT: &str = "You are a literary reference assistant. If you know the work, answer with a \
     single JSON object and nothing else. If you do not know it or are unsure, reply with WEB_SEARCH only.";
const SEARCH_SYSTEM_PROMPT: &str = "You are a literary reference assistant. Extract the requested fields from the \
     search results and answer with a single JSON object only. Do not explain.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ChatReplyMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default, alias = "reasoning_content")]
    reasoning: Option<String>,
}

/// Text of the first choice of a completion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionText {
    pub content: Option<String>,
    pub reasoning: Option<String>,
}

impl CompletionText {
    fn from_response(response: ChatResponse) -> Self {
        response
            .choices
            .into_iter()
            .next()
            .map(|choice| Self {
                content: choice.message.content,
                reasoning: choice.message.reasoning,
            })
            .unwrap_or_default()
    }

    /// Answer text: the content, else the reasoning trace
    pub fn answer(&self) -> Option<&str> {
        fn non_blank(text: &Option<String>) -> Option<&str> {
            text.as_deref().filter(|t| !t.trim().is_empty())
        }
        non_blank(&self.content).or_else(|| non_blank(&self.reasoning))
    }

    /// Whether the model asked for search context or gave no content
    pub fn wants_search(&self) -> bool {
        match self.content.as_deref().map(str::trim) {
            Some(content) if !content.is_empty() => content.to_uppercase().contains(WEB_SEARCH_MARKER),
            _ => true,
        }
    }

    /// Requested fields found in the answer
    pub fn fields_for(&self, missing: &[Field]) -> Option<BTreeMap<Field, String>> {
        let mut fields = self.answer().and_then(parse_completion)?;
        fields.retain(|field, _| missing.contains(field));
        (!fields.is_empty()).then_some(fields)
    }
}

/// One request/response exchange
struct Turn {
    system: &'static str,
    prompt: String,
    temperature: f32,
    max_tokens: u32,
}

/// Chat-completions fallback provider
#[derive(Clone)]
pub struct ChatCompletionsProvider {
    id: String,
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    search: Option<Arc<dyn WebSearch>>,
}

impl ChatCompletionsProvider {
    /// Provider against an arbitrary OpenAI-compatible endpoint
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
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty()),
            search: None,
        })
    }

    pub fn groq(api_key: Option<String>, timeout: Duration) -> ResolveResult<Self> {
        Self::new("groq", GROQ_BASE_URL, GROQ_MODEL, api_key, timeout)
    }

    pub fn together(api_key: Option<String>, timeout: Duration) -> ResolveResult<Self> {
        Self::new("together", TOGETHER_BASE_URL, TOGETHER_MODEL, api_key, timeout)
    }

    /// Enable the search-backed second stage
    pub fn with_search(mut self, search: Arc<dyn WebSearch>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn post(&self, api_key: &str, turn: Turn) -> anyhow::Result<(u16, CompletionText)> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: turn.system.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: turn.prompt,
                },
            ],
            temperature: turn.temperature,
            max_tokens: turn.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .context("chat completion request failed")?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Ok((status, CompletionText::default()));
        }

        let reply: ChatResponse = response
            .json()
            .await
            .context("failed to decode chat completion")?;
        Ok((status, CompletionText::from_response(reply)))
    }

    /// Run one turn; `Err` carries the reply to return when it did not succeed
    async fn exchange(&self, api_key: &str, turn: Turn) -> Result<CompletionText, ProviderReply> {
        let (status, text) = match self.post(api_key, turn).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(provider = %self.id, error = %e, "Provider call failed");
                return Err(ProviderReply::empty(CallOutcome::Failed));
            }
        };

        let outcome = CallOutcome::from_status(status);
        if outcome != CallOutcome::Success {
            warn!(provider = %self.id, status = status, "Provider returned error status");
            return Err(ProviderReply::empty(outcome));
        }
        Ok(text)
    }

    async fn complete_inner(&self, api_key: &str, request: &FallbackRequest<'_>) -> Result<ProviderReply, ProviderReply> {
        let direct = Turn {
            system: DIRECT_SYSTEM_PROMPT,
            prompt: build_prompt(request),
            temperature: 0.3,
            max_tokens: 500,
        };
        let first = self.exchange(api_key, direct).await?;
        if let Some(fields) = first.fields_for(request.missing) {
            return Ok(ProviderReply::success(fields));
        }

        if !first.wants_search() {
            debug!(provider = %self.id, "Completion held no usable fields");
            return Ok(ProviderReply::empty(CallOutcome::Failed));
        }
        let Some(search) = self.search.as_ref() else {
            debug!(provider = %self.id, "Model asked for search context, no search configured");
            return Ok(ProviderReply::empty(CallOutcome::Failed));
        };

        info!(provider = %self.id, title = %request.title, "Model does not know the work, searching");
        let Some(context) = search.search(request.title, request.author).await else {
            debug!(provider = %self.id, "Search found nothing");
            return Ok(ProviderReply::empty(CallOutcome::Failed));
        };

        let grounded = Turn {
            system: SEARCH_SYSTEM_PROMPT,
            prompt: build_search_prompt(request, &context),
            temperature: 0.1,
            max_tokens: 1000,
        };
        let second = self.exchange(api_key, grounded).await?;
        Ok(match second.fields_for(request.missing) {
            Some(fields) => ProviderReply::success(fields),
            None => {
                debug!(provider = %self.id, "Search-grounded completion held no usable fields");
                ProviderReply::empty(CallOutcome::Failed)
            }
        })
    }
}

impl std::fmt::Debug for ChatCompletionsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsProvider")
            .field("id", &self.id)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("configured", &self.is_configured())
            .field("search", &self.search.is_some())
            .finish()
    }
}

#[async_trait]
impl GenerativeProvider for ChatCompletionsProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn complete(&self, request: &FallbackRequest<'_>) -> ProviderReply {
        let Some(api_key) = self.api_key.as_deref() else {
            debug!(provider = %self.id, "No API key, provider not configured");
            return ProviderReply::empty(CallOutcome::NotConfigured);
        };
        if request.missing.is_empty() {
            return ProviderReply::empty(CallOutcome::Success);
        }

        match self.complete_inner(api_key, request).await {
            Ok(reply) | Err(reply) => reply,
        }
    }
}

/// Second-stage prompt: the search digest followed by the field request
pub fn build_search_prompt(request: &FallbackRequest<'_>, context: &str) -> String {
    format!(
        "Search results:\n{}\n\n{}",
        truncate_chars(context.trim(), DEFAULT_MAX_CONTEXT_CHARS),
        build_prompt(request)
    )
}

/// User prompt asking for the missing fields as one JSON object
pub fn build_prompt(request: &FallbackRequest<'_>) -> String {
    let mut prompt = format!("Work: {}\nAuthor: {}\n", request.title.trim(), request.author.trim());

    if !request.known.is_empty() {
        prompt.push_str("\nKnown information:\n");
        for (field, value) in request.known {
            prompt.push_str(&format!("- {}: {}\n", field.label(), value));
        }
    }

    prompt.push_str("\nProvide the following fields:\n");
    for field in request.missing {
        prompt.push_str(&format!("- {} ({})\n", field.key(), field.label()));
    }

    prompt.push_str(
        "\nRespond with a JSON object using the field keys above. \
         first_published is the year of first publication in the original language, not of a translation. \
         original_title is the title in the original language and script. \
         Use an empty string for anything you do not know.",
    );
    prompt
}

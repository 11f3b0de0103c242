//! Engine configuration
//!
//! Loaded from TOML through [`litmeta_common::config`]; every section and
//! every key has a compiled default, so an empty or absent file yields a
//! working engine.
//!
//! ```toml
//! [logging]
//! level = "debug"
//!
//! [sources]
//! foreign_language = "en"
//! local_language = "tr"
//! requests_per_second = 5
//!
//! [router]
//! cooldown_secs = 10
//!
//! [retry]
//! backoff_hours = 6
//! fallback_confidence = 0.5
//!
//! [[providers]]
//! id = "groq"
//! api_key_env = "GROQ_API_KEY"
//!
//! [[providers]]
//! id = "huggingface"
//!
//! [search]
//! max_context_chars = 1500
//!
//! [lexicon]
//! classic_authors = ["tolstoy", "hugo"]
//! ```

use crate::error::ResolveResult;
use crate::gates::GateLexicon;
use crate::providers::chat::{GROQ_BASE_URL, GROQ_MODEL, TOGETHER_BASE_URL, TOGETHER_MODEL};
use crate::providers::huggingface::{HUGGINGFACE_BASE_URL, HUGGINGFACE_MODEL};
use crate::providers::search::DEFAULT_MAX_CONTEXT_CHARS;
use crate::providers::{ChatCompletionsProvider, GenerativeProvider, TextGenerationProvider, WebSearch};
use crate::router::QuotaRouter;
use crate::sources::HttpSourceOptions;
use litmeta_common::config::{self as common_config, LoggingConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub logging: LoggingConfig,
    pub sources: SourceSettings,
    pub router: RouterSettings,
    pub retry: RetrySettings,
    /// Fallback providers, in call order
    pub providers: Vec<ProviderSettings>,
    pub search: SearchSettings,
    pub lexicon: GateLexicon,
}

impl EngineConfig {
    /// Load from an explicit path, `LITMETA_CONFIG`, or the platform default
    ///
    /// An absent file yields defaults (with one Groq provider); a file with no
    /// `[[providers]]` entries also gets the Groq default.
    pub fn load(explicit: Option<&Path>) -> ResolveResult<Self> {
        let path = common_config::resolve_config_path(explicit);
        let mut config: EngineConfig = common_config::load_toml_or_default(path.as_deref())?;
        if config.providers.is_empty() {
            config.providers = vec![ProviderSettings::default()];
        }
        Ok(config)
    }

    /// Router with the configured base cooldown
    ///
    /// Build one and share it (`Arc`) across every resolver in the process.
    pub fn build_router(&self) -> QuotaRouter {
        QuotaRouter::with_cooldown(Duration::from_secs(self.router.cooldown_secs))
    }
}

/// Structured-source settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    /// Encyclopedia edition holding original-work information
    pub foreign_language: String,
    /// Encyclopedia edition in the catalogue's language
    pub local_language: String,
    /// Characters marking text as written in the local language
    pub local_script_marks: String,
    pub user_agent: String,
    /// Per-request timeout for structured sources
    pub timeout_secs: u64,
    /// Cap on structured requests per second, across all sources
    pub requests_per_second: u32,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            foreign_language: "en".to_string(),
            local_language: "tr".to_string(),
            local_script_marks: "çğıöşüÇĞİÖŞÜ".to_string(),
            user_agent: format!("litmeta/{} (literary metadata resolver)", env!("CARGO_PKG_VERSION")),
            timeout_secs: 5,
            requests_per_second: 5,
        }
    }
}

impl SourceSettings {
    pub fn http_options(&self) -> HttpSourceOptions {
        HttpSourceOptions {
            foreign_language: self.foreign_language.clone(),
            local_language: self.local_language.clone(),
            local_script_marks: self.local_script_marks.clone(),
            user_agent: self.user_agent.clone(),
            timeout: Duration::from_secs(self.timeout_secs.max(1)),
            requests_per_second: self.requests_per_second,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterSettings {
    /// Base cooldown after a rate-limited outcome (jitter is added on top)
    pub cooldown_secs: u64,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self { cooldown_secs: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Delay before an unresolved record should be retried
    pub backoff_hours: u32,
    /// Confidence recorded for values from generative providers
    pub fallback_confidence: f32,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            backoff_hours: 6,
            fallback_confidence: 0.5,
        }
    }
}

/// Second-stage web search for chat providers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub enabled: bool,
    /// Cap on the digest placed in the second prompt
    pub max_context_chars: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
        }
    }
}

/// Wire format spoken by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderApi {
    /// OpenAI-compatible `/chat/completions`
    ChatCompletions,
    /// Hosted `inputs` / `generated_text` inference
    TextGeneration,
}

/// One generative fallback provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Provenance source and router key
    pub id: String,
    /// Wire format; `huggingface` defaults to text generation, others to chat
    pub api: Option<ProviderApi>,
    /// Endpoint base; empty selects the preset for `id`
    pub base_url: String,
    /// Model; empty selects the preset for `id`
    pub model: String,
    /// Key stored in the file (environment takes precedence)
    pub api_key: Option<String>,
    /// Environment variable holding the key; defaults to `<ID>_API_KEY`
    pub api_key_env: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            id: "groq".to_string(),
            api: None,
            base_url: String::new(),
            model: String::new(),
            api_key: None,
            api_key_env: None,
            timeout_secs: 30,
        }
    }
}

impl ProviderSettings {
    /// Endpoint and model, filling blanks from the preset for `id`
    pub fn endpoint(&self) -> (String, String) {
        let (preset_url, preset_model) = match self.id.as_str() {
            "together" => (TOGETHER_BASE_URL, TOGETHER_MODEL),
            "huggingface" => (HUGGINGFACE_BASE_URL, HUGGINGFACE_MODEL),
            _ => (GROQ_BASE_URL, GROQ_MODEL),
        };
        let pick = |value: &str, preset: &str| {
            if value.trim().is_empty() {
                preset.to_string()
            } else {
                value.trim().to_string()
            }
        };
        (pick(&self.base_url, preset_url), pick(&self.model, preset_model))
    }

    /// Environment variable consulted for the key
    pub fn key_env(&self) -> String {
        match self.api_key_env.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("{}_API_KEY", self.id.trim().to_uppercase()),
        }
    }

    pub fn api(&self) -> ProviderApi {
        match (self.api, self.id.as_str()) {
            (Some(api), _) => api,
            (None, "huggingface") => ProviderApi::TextGeneration,
            (None, _) => ProviderApi::ChatCompletions,
        }
    }

    /// Key from the environment, then the file
    pub fn resolve_key(&self) -> Option<String> {
        let key_env = self.key_env();
        common_config::resolve_api_key(Some(key_env.as_str()), self.api_key.as_deref())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Build the provider; a missing key leaves it unconfigured, not failed
    ///
    /// `search` backs the second stage of chat providers only.
    pub fn build(&self, search: Option<Arc<dyn WebSearch>>) -> ResolveResult<Arc<dyn GenerativeProvider>> {
        let api_key = self.resolve_key();
        let (base_url, model) = self.endpoint();
        let provider: Arc<dyn GenerativeProvider> = match self.api() {
            ProviderApi::ChatCompletions => {
                let provider = ChatCompletionsProvider::new(&self.id, &base_url, &model, api_key, self.timeout())?;
                match search {
                    Some(search) => Arc::new(provider.with_search(search)),
                    None => Arc::new(provider),
                }
            }
            ProviderApi::TextGeneration => {
                Arc::new(TextGenerationProvider::new(&self.id, &base_url, &model, api_key, self.timeout())?)
            }
        };
        Ok(provider)
    }
}

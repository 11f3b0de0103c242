//! Generative fallback providers
//!
//! A provider is asked once per pass for every field the structured sources
//! left empty. Providers never return errors; failures are reported as a
//! [`CallOutcome`] so the [`crate::router::QuotaRouter`] can classify them the
//! same way whatever the transport.

pub mod chat;
pub mod huggingface;
pub mod parse;
pub mod search;

use crate::router::CallOutcome;
use crate::types::Field;
use async_trait::async_trait;
use std::collections::BTreeMap;

pub use chat::ChatCompletionsProvider;
pub use huggingface::TextGenerationProvider;
pub use search::{HttpWebSearch, WebSearch};

/// What a provider is asked for
#[derive(Debug, Clone, Copy)]
pub struct FallbackRequest<'a> {
    pub title: &'a str,
    pub author: &'a str,
    /// Fields still empty, in record order
    pub missing: &'a [Field],
    /// Fields already known, offered as grounding
    pub known: &'a BTreeMap<Field, String>,
}

/// Provider answer: optional field values plus the outcome signal
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderReply {
    pub fields: Option<BTreeMap<Field, String>>,
    pub outcome: CallOutcome,
}

impl ProviderReply {
    pub fn success(fields: BTreeMap<Field, String>) -> Self {
        Self {
            fields: Some(fields),
            outcome: CallOutcome::Success,
        }
    }

    /// Reply carrying no values
    pub fn empty(outcome: CallOutcome) -> Self {
        Self { fields: None, outcome }
    }
}

/// Generative model adapter
#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    /// Identifier recorded as provenance source and used as router key
    fn id(&self) -> &str;

    async fn complete(&self, request: &FallbackRequest<'_>) -> ProviderReply;
}

//! Resolution orchestrator
//!
//! Drives one [`Record`] through a pass:
//!
//! 1. **Structured sources**: for each empty field, consult the field's
//!    sources in priority order and commit the first candidate its gate
//!    accepts. Each source is fetched at most once per pass (after its
//!    prerequisites) and shared by every field that trusts it.
//! 2. **Generative fallback**: ask each provider, through the shared
//!    [`QuotaRouter`], for every field still empty; gated values are
//!    committed with the fixed fallback confidence.
//! 3. **Bookkeeping**: status, missing fields, retry schedule, best source.
//!
//! A record that is already `OK` with every field set is left untouched and
//! no source is queried. Non-empty fields are never overwritten.

use crate::config::{EngineConfig, ProviderApi};
use crate::error::ResolveResult;
use crate::gates::{GateContext, GateKind, QualityGates};
use crate::policy::FieldPolicy;
use crate::providers::{FallbackRequest, GenerativeProvider, HttpWebSearch, WebSearch};
use crate::record::Record;
use crate::router::{CallOutcome, QuotaRouter};
use crate::sources::{HttpSources, SourceCatalog, SourceSnapshot, WorkQuery};
use crate::types::{Candidate, Field, Provenance, SourceId, SourceKind};
use chrono::{DateTime, Utc};
use litmeta_common::time;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Confidence multiplier for values a gate accepted with a warning
pub const ADVISORY_CONFIDENCE_FACTOR: f32 = 0.75;

/// Tunables of a resolution pass
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverSettings {
    /// Delay before an unresolved record should be retried
    pub retry_backoff_hours: u32,
    /// Confidence recorded for generative values
    pub fallback_confidence: f32,
    /// Upper bound on one generative call
    pub generative_timeout: Duration,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            retry_backoff_hours: 6,
            fallback_confidence: 0.5,
            generative_timeout: Duration::from_secs(30),
        }
    }
}

/// Field-resolution engine
pub struct Resolver<C> {
    policy: FieldPolicy,
    gates: QualityGates,
    catalog: C,
    providers: Vec<Arc<dyn GenerativeProvider>>,
    router: Arc<QuotaRouter>,
    settings: ResolverSettings,
}

impl<C: SourceCatalog> Resolver<C> {
    /// Engine with the standard policy, built-in gates and no providers
    pub fn new(catalog: C, router: Arc<QuotaRouter>) -> Self {
        Self {
            policy: FieldPolicy::standard(),
            gates: QualityGates::default(),
            catalog,
            providers: Vec::new(),
            router,
            settings: ResolverSettings::default(),
        }
    }

    pub fn with_policy(mut self, policy: FieldPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_gates(mut self, gates: QualityGates) -> Self {
        self.gates = gates;
        self
    }

    /// Append a fallback provider (called in insertion order)
    pub fn with_provider(mut self, provider: Arc<dyn GenerativeProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_settings(mut self, settings: ResolverSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn policy(&self) -> &FieldPolicy {
        &self.policy
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn router(&self) -> &Arc<QuotaRouter> {
        &self.router
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    /// Run one resolution pass on `record`
    ///
    /// # Errors
    /// [`crate::ResolveError::MissingRule`] if the policy lacks a rule for any
    /// field. Source, gate and provider failures never surface here.
    pub async fn resolve(&self, record: &mut Record) -> ResolveResult<()> {
        self.resolve_at(record, time::now()).await
    }

    /// [`Resolver::resolve`] with an explicit attempt timestamp
    pub async fn resolve_at(&self, record: &mut Record, now: DateTime<Utc>) -> ResolveResult<()> {
        self.policy.validate()?;

        if record.is_complete() {
            debug!(title = %record.title, "Record already resolved, skipping");
            return Ok(());
        }

        let span = info_span!("resolve", attempt_id = %Uuid::new_v4(), title = %record.title);
        self.run_pass(record, now).instrument(span).await
    }

    async fn run_pass(&self, record: &mut Record, now: DateTime<Utc>) -> ResolveResult<()> {
        let title = record.title.clone();
        let author = record.author.clone();
        let work = WorkQuery {
            title: &title,
            author: &author,
        };

        let mut snapshot = SourceSnapshot::new();
        let mut commits: Vec<String> = Vec::new();

        // Structured sources, priority order per field
        for field in Field::ALL {
            if record.is_set(field) {
                continue;
            }
            let rule = self.policy.rule(field)?;

            for &source in &rule.sources {
                self.ensure_fetched(source, &work, &mut snapshot).await;
                let Some(fields) = snapshot.get(source) else {
                    continue;
                };
                let Some(value) = fields.get(field) else {
                    continue;
                };

                let candidate = Candidate {
                    field,
                    value: value.to_string(),
                    source: source.as_str().to_string(),
                    context: fields.context.clone(),
                };
                let Some(confidence) = self.admit(&candidate, rule.gate, source.kind(), &work, rule.default_confidence)
                else {
                    continue;
                };

                if record.set_field(field, &candidate.value, Provenance::new(&candidate.source, confidence)) {
                    debug!(field = %field, source = %source, confidence = confidence, "Field resolved");
                    commits.push(candidate.source);
                }
                break;
            }
        }

        if record.canonical_id.is_none() {
            record.canonical_id = canonical_id(&snapshot);
        }

        // Generative fallback for whatever is still empty
        for provider in &self.providers {
            let missing = record.empty_fields();
            if missing.is_empty() {
                break;
            }
            let committed = self.fallback(provider.as_ref(), record, &work, &missing).await?;
            commits.extend(committed);
        }

        record.finish_pass(now, self.settings.retry_backoff_hours, best_source(&commits));

        info!(
            status = %record.status.map(|s| s.as_str()).unwrap_or_default(),
            resolved = commits.len(),
            missing = record.missing_fields.len(),
            canonical_id = record.canonical_id.as_deref().unwrap_or_default(),
            "Resolution pass complete"
        );
        Ok(())
    }

    /// Fetch a source (and its prerequisites) once per pass
    async fn ensure_fetched(&self, source: SourceId, work: &WorkQuery<'_>, snapshot: &mut SourceSnapshot) {
        for &prerequisite in source.prerequisites() {
            self.fetch_into(prerequisite, work, snapshot).await;
        }
        self.fetch_into(source, work, snapshot).await;
    }

    async fn fetch_into(&self, source: SourceId, work: &WorkQuery<'_>, snapshot: &mut SourceSnapshot) {
        if snapshot.is_fetched(source) {
            return;
        }
        let result = self.catalog.fetch(source, work, snapshot).await;
        debug!(
            source = %source,
            found = result.is_some(),
            fields = result.as_ref().map(|r| r.values.len()).unwrap_or(0),
            "Source consulted"
        );
        snapshot.insert(source, result);
    }

    /// Ask one provider for the missing fields; returns the sources committed
    async fn fallback(
        &self,
        provider: &dyn GenerativeProvider,
        record: &mut Record,
        work: &WorkQuery<'_>,
        missing: &[Field],
    ) -> ResolveResult<Vec<String>> {
        let known: BTreeMap<Field, String> = record.values().map(|(f, v)| (f, v.to_string())).collect();
        let request = FallbackRequest {
            title: work.title,
            author: work.author,
            missing,
            known: &known,
        };
        let id = provider.id().to_string();
        let timeout = self.settings.generative_timeout;

        let reply = self
            .router
            .call(&id, || async {
                match tokio::time::timeout(timeout, provider.complete(&request)).await {
                    Ok(reply) => (reply.fields, reply.outcome),
                    Err(_) => {
                        warn!(provider = %id, timeout_secs = timeout.as_secs(), "Provider timed out");
                        (None, CallOutcome::Failed)
                    }
                }
            })
            .await;

        let Some(values) = reply else {
            return Ok(Vec::new());
        };

        let mut committed = Vec::new();
        for &field in missing {
            let Some(value) = values.get(&field) else {
                continue;
            };
            let rule = self.policy.rule(field)?;
            let candidate = Candidate {
                field,
                value: value.clone(),
                source: id.clone(),
                context: String::new(),
            };
            let Some(confidence) = self.admit(
                &candidate,
                rule.gate,
                SourceKind::Generative,
                work,
                self.settings.fallback_confidence,
            ) else {
                continue;
            };

            if record.set_field(field, &candidate.value, Provenance::new(&id, confidence)) {
                debug!(field = %field, provider = %id, confidence = confidence, "Field resolved by fallback");
                committed.push(id.clone());
            }
        }
        Ok(committed)
    }

    /// Run the field's gate; `Some(confidence)` if the candidate may be committed
    fn admit(
        &self,
        candidate: &Candidate,
        gate: Option<GateKind>,
        kind: SourceKind,
        work: &WorkQuery<'_>,
        confidence: f32,
    ) -> Option<f32> {
        let Some(gate) = gate else {
            return Some(confidence);
        };

        let ctx = GateContext {
            source: kind,
            extract: &candidate.context,
            localized_title: work.title,
            author: work.author,
        };
        let verdict = self.gates.check(gate, &candidate.value, &ctx);

        if !verdict.accepted {
            debug!(
                field = %candidate.field,
                source = %candidate.source,
                value = %candidate.value,
                reason = verdict.reason.unwrap_or_default(),
                "Candidate rejected by gate"
            );
            return None;
        }
        if verdict.is_advisory() {
            debug!(
                field = %candidate.field,
                source = %candidate.source,
                reason = verdict.reason.unwrap_or_default(),
                "Candidate accepted with warning"
            );
            return Some(confidence * ADVISORY_CONFIDENCE_FACTOR);
        }
        Some(confidence)
    }
}

impl Resolver<HttpSources> {
    /// Production engine from configuration
    ///
    /// `router` is shared by every resolver that should honor the same
    /// cooldowns; see [`EngineConfig::build_router`].
    pub fn from_config(config: &EngineConfig, router: Arc<QuotaRouter>) -> ResolveResult<Self> {
        let gates = QualityGates::new(config.lexicon.clone())?;
        let catalog = HttpSources::new(&config.sources.http_options(), &config.lexicon)?;

        let generative_timeout = config
            .providers
            .iter()
            .map(|p| p.timeout())
            .max()
            .unwrap_or(Duration::from_secs(30));

        let mut resolver = Resolver::new(catalog, router)
            .with_gates(gates)
            .with_settings(ResolverSettings {
                retry_backoff_hours: config.retry.backoff_hours,
                fallback_confidence: config.retry.fallback_confidence.clamp(0.0, 1.0),
                generative_timeout,
            });

        let search: Option<Arc<dyn WebSearch>> = if config.search.enabled {
            Some(Arc::new(HttpWebSearch::new(
                resolver.catalog().http().clone(),
                &config.sources.local_language,
                config.search.max_context_chars,
            )))
        } else {
            None
        };

        for settings in &config.providers {
            if settings.api() == ProviderApi::ChatCompletions && settings.resolve_key().is_none() {
                info!(provider = %settings.id, "Fallback provider has no API key");
            }
            resolver = resolver.with_provider(settings.build(search.clone())?);
        }
        Ok(resolver)
    }
}

/// Knowledge-graph identifier from the resolved entity, else from any page
fn canonical_id(snapshot: &SourceSnapshot) -> Option<String> {
    [SourceId::Wikidata, SourceId::ForeignWiki, SourceId::LocalWiki]
        .iter()
        .filter_map(|source| snapshot.get(*source))
        .find_map(|fields| fields.cross_ref.clone())
}

/// Source with the most commits; ties go to the one that committed first
fn best_source(commits: &[String]) -> Option<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for source in commits {
        match counts.iter_mut().find(|(name, _)| *name == source.as_str()) {
            Some(entry) => entry.1 += 1,
            None => counts.push((source.as_str(), 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (name, count) in counts {
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((name, count));
        }
    }
    best.map(|(name, _)| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SourceFields;

    #[test]
    fn test_best_source_majority_then_first() {
        let commits: Vec<String> = ["wiki_foreign", "wikidata", "wikidata", "groq"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(best_source(&commits).as_deref(), Some("wikidata"));

        let tie: Vec<String> = ["wiki_local", "wikidata"].iter().map(|s| s.to_string()).collect();
        assert_eq!(best_source(&tie).as_deref(), Some("wiki_local"));
        assert_eq!(best_source(&[]), None);
    }

    #[test]
    fn test_canonical_id_prefers_entity() {
        let mut snapshot = SourceSnapshot::new();
        let page = SourceFields {
            cross_ref: Some("Q1".into()),
            ..SourceFields::default()
        };
        snapshot.insert(SourceId::ForeignWiki, Some(page));
        assert_eq!(canonical_id(&snapshot).as_deref(), Some("Q1"));

        let entity = SourceFields {
            cross_ref: Some("Q2".into()),
            ..SourceFields::default()
        };
        snapshot.insert(SourceId::Wikidata, Some(entity));
        assert_eq!(canonical_id(&snapshot).as_deref(), Some("Q2"));
    }
}

//! Structured source adapters
//!
//! Every structured source is addressed by a [`SourceId`] and resolved
//! through a [`SourceCatalog`]. The orchestrator is generic over the catalog,
//! so production code uses [`HttpSources`] and tests substitute a fake.
//!
//! Adapters never fail: network and parse errors are logged at the adapter
//! boundary and become "no result".

pub mod google_books;
pub mod http;
pub mod open_library;
pub mod text;
pub mod wikipedia;

use crate::entity::EntityResolver;
use crate::gates::GateLexicon;
use crate::types::{Field, SourceId};
use async_trait::async_trait;
use google_books::GoogleBooksClient;
use http::HttpContext;
use open_library::OpenLibraryClient;
use std::collections::{BTreeMap, HashMap};
use wikipedia::{PageRole, WikipediaClient};

/// Identifying fields of the work being resolved
#[derive(Debug, Clone, Copy)]
pub struct WorkQuery<'a> {
    /// Localized title as catalogued by the caller
    pub title: &'a str,
    pub author: &'a str,
}

/// Field candidates from one source, plus the context used to gate them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceFields {
    pub values: BTreeMap<Field, String>,
    /// Raw text the values were extracted from
    pub context: String,
    /// Title of the page the values came from (encyclopedia sources)
    pub page_title: Option<String>,
    /// Knowledge-graph identifier carried by the page or resolved entity
    pub cross_ref: Option<String>,
    /// Language edition the page was read from
    pub language: Option<String>,
}

impl SourceFields {
    pub fn with_context(context: &str) -> Self {
        Self {
            context: context.to_string(),
            ..Self::default()
        }
    }

    /// Store a value; blank or absent values are dropped
    pub fn insert(&mut self, field: Field, value: Option<String>) {
        if let Some(value) = value {
            let value = value.trim();
            if !value.is_empty() {
                self.values.insert(field, value.to_string());
            }
        }
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }
}

/// Sources already consulted in the current pass
///
/// A source can be fetched yet hold nothing: [`SourceSnapshot::is_fetched`]
/// is true while [`SourceSnapshot::get`] is `None`.
#[derive(Debug, Default)]
pub struct SourceSnapshot {
    results: HashMap<SourceId, Option<SourceFields>>,
}

impl SourceSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fetched(&self, source: SourceId) -> bool {
        self.results.contains_key(&source)
    }

    /// Fields of a fetched source that returned something
    pub fn get(&self, source: SourceId) -> Option<&SourceFields> {
        self.results.get(&source).and_then(Option::as_ref)
    }

    pub fn insert(&mut self, source: SourceId, fields: Option<SourceFields>) {
        self.results.insert(source, fields);
    }

    /// Fetched pages among `sources`, in the given order
    pub fn pages(&self, sources: &[SourceId]) -> Vec<&SourceFields> {
        sources.iter().filter_map(|s| self.get(*s)).collect()
    }
}

/// Resolves a tagged source to field candidates
#[async_trait]
pub trait SourceCatalog: Send + Sync {
    /// Fetch one source for the work
    ///
    /// `snapshot` holds every source fetched earlier in the pass, including
    /// the source's [`SourceId::prerequisites`].
    async fn fetch(
        &self,
        source: SourceId,
        work: &WorkQuery<'_>,
        snapshot: &SourceSnapshot,
    ) -> Option<SourceFields>;
}

/// Settings for the HTTP-backed catalog
#[derive(Debug, Clone)]
pub struct HttpSourceOptions {
    pub foreign_language: String,
    pub local_language: String,
    pub local_script_marks: String,
    pub user_agent: String,
    pub timeout: std::time::Duration,
    pub requests_per_second: u32,
}

/// Production catalog backed by the public HTTP APIs
#[derive(Debug, Clone)]
pub struct HttpSources {
    http: HttpContext,
    foreign_wiki: WikipediaClient,
    local_wiki: WikipediaClient,
    google_books: GoogleBooksClient,
    open_library: OpenLibraryClient,
    entities: EntityResolver,
}

impl HttpSources {
    pub fn new(options: &HttpSourceOptions, lexicon: &GateLexicon) -> crate::error::ResolveResult<Self> {
        let http = HttpContext::new(&options.user_agent, options.timeout, options.requests_per_second)?;

        Ok(Self {
            http: http.clone(),
            foreign_wiki: WikipediaClient::new(
                http.clone(),
                &options.foreign_language,
                PageRole::Foreign,
                &options.local_script_marks,
            ),
            local_wiki: WikipediaClient::new(
                http.clone(),
                &options.local_language,
                PageRole::Local,
                &options.local_script_marks,
            ),
            google_books: GoogleBooksClient::new(http.clone()),
            open_library: OpenLibraryClient::new(http.clone()),
            entities: EntityResolver::new(
                http,
                &options.foreign_language,
                &options.local_language,
                lexicon.native_script_authors.clone(),
            ),
        })
    }

    /// Client and rate limit shared by every adapter
    pub fn http(&self) -> &HttpContext {
        &self.http
    }
}

#[async_trait]
impl SourceCatalog for HttpSources {
    async fn fetch(
        &self,
        source: SourceId,
        work: &WorkQuery<'_>,
        snapshot: &SourceSnapshot,
    ) -> Option<SourceFields> {
        match source {
            SourceId::ForeignWiki => self.foreign_wiki.fetch(work).await,
            SourceId::LocalWiki => self.local_wiki.fetch(work).await,
            SourceId::GoogleBooks => self.google_books.fetch(work).await,
            SourceId::OpenLibrary => self.open_library.fetch(work).await,
            SourceId::Wikidata => {
                let pages = snapshot.pages(source.prerequisites());
                self.entities.resolve(work, &pages).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_values_are_dropped() {
        let mut fields = SourceFields::with_context("ctx");
        fields.insert(Field::Genre, Some("  ".into()));
        fields.insert(Field::Synopsis, None);
        fields.insert(Field::FirstPublished, Some(" 1869 ".into()));
        assert_eq!(fields.get(Field::Genre), None);
        assert_eq!(fields.get(Field::FirstPublished), Some("1869"));
    }

    #[test]
    fn test_snapshot_distinguishes_empty_from_unfetched() {
        let mut snapshot = SourceSnapshot::new();
        snapshot.insert(SourceId::ForeignWiki, None);
        assert!(snapshot.is_fetched(SourceId::ForeignWiki));
        assert_eq!(snapshot.get(SourceId::ForeignWiki), None);
        assert!(!snapshot.is_fetched(SourceId::LocalWiki));
        assert!(snapshot.pages(&[SourceId::ForeignWiki, SourceId::LocalWiki]).is_empty());
    }
}

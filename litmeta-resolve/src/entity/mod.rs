//! Knowledge-graph entity resolution
//!
//! Resolves a work to its Wikidata identifier with progressively weaker
//! strategies, stopping at the first hit:
//!
//! 1. a cross-reference carried by an already-fetched encyclopedia page
//! 2. a page-properties lookup for each fetched page title, in that page's language
//! 3. a fuzzy SPARQL search over literary works (label, and author label when known)
//!
//! The resolved entity is then fetched once and reduced to field candidates.
//! Every step degrades to "absent" on failure.

pub mod extract;

use crate::gates::native_language_for_author;
use crate::sources::http::HttpContext;
use crate::sources::{SourceFields, WorkQuery};
use crate::types::Field;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use tracing::{debug, warn};

const ENTITY_DATA_URL: &str = "https://www.wikidata.org/wiki/Special:EntityData";
const SPARQL_URL: &str = "https://query.wikidata.org/sparql";

/// "literary work"
const LITERARY_WORK: &str = "Q7725634";

#[derive(Debug, Deserialize, Default)]
struct PagePropsResponse {
    #[serde(default)]
    query: PagePropsQuery,
}

#[derive(Debug, Deserialize, Default)]
struct PagePropsQuery {
    #[serde(default)]
    pages: HashMap<String, PageEntry>,
}

#[derive(Debug, Deserialize, Default)]
struct PageEntry {
    #[serde(default)]
    pageprops: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Default)]
struct SparqlResponse {
    #[serde(default)]
    results: SparqlResults,
}

#[derive(Debug, Deserialize, Default)]
struct SparqlResults {
    #[serde(default)]
    bindings: Vec<HashMap<String, SparqlTerm>>,
}

#[derive(Debug, Deserialize)]
struct SparqlTerm {
    value: String,
}

/// Wikidata-backed entity resolver
#[derive(Debug, Clone)]
pub struct EntityResolver {
    http: HttpContext,
    foreign_language: String,
    local_language: String,
    /// Author name fragment → native language, for title preference
    native_authors: BTreeMap<String, String>,
}

impl EntityResolver {
    pub fn new(
        http: HttpContext,
        foreign_language: &str,
        local_language: &str,
        native_authors: BTreeMap<String, String>,
    ) -> Self {
        Self {
            http,
            foreign_language: foreign_language.to_string(),
            local_language: local_language.to_string(),
            native_authors,
        }
    }

    /// Resolve the work and extract field candidates from its entity
    ///
    /// `pages` are encyclopedia results fetched earlier in the pass.
    pub async fn resolve(&self, work: &WorkQuery<'_>, pages: &[&SourceFields]) -> Option<SourceFields> {
        let qid = self.find_identifier(work, pages).await?;
        let doc = self.fetch_entity(&qid).await?;
        let entity = extract::entity_body(&doc, &qid)?;

        let native_language = extract::work_language(entity)
            .or_else(|| native_language_for_author(&self.native_authors, work.author));

        let mut label_preference: Vec<&str> = Vec::with_capacity(3);
        if let Some(native) = native_language {
            label_preference.push(native);
        }
        label_preference.push(&self.foreign_language);
        label_preference.push(&self.local_language);

        let context = extract::pick_description(entity, &label_preference).unwrap_or_default();
        let mut fields = SourceFields::with_context(&context);
        fields.cross_ref = Some(qid.clone());

        fields.insert(
            Field::FirstPublished,
            extract::earliest_publication_year(entity).map(|year| year.to_string()),
        );
        fields.insert(
            Field::OriginalTitle,
            extract::original_title(entity, native_language, &label_preference),
        );

        let country_items = extract::country_items(entity);
        let country_labels = [self.foreign_language.as_str(), self.local_language.as_str()];
        let country = first_resolved(&country_items, |item| self.label_for(item, &country_labels)).await;
        fields.insert(Field::CountryTradition, country);

        debug!(qid = %qid, fields = fields.values.len(), "Knowledge-graph entity resolved");
        Some(fields)
    }

    /// Canonical identifier for the work, if any strategy finds one
    pub async fn find_identifier(&self, work: &WorkQuery<'_>, pages: &[&SourceFields]) -> Option<String> {
        if let Some(qid) = pages.iter().find_map(|page| page.cross_ref.clone()) {
            debug!(qid = %qid, "Identifier from page cross-reference");
            return Some(qid);
        }

        for page in pages {
            let (Some(title), Some(language)) = (page.page_title.as_deref(), page.language.as_deref()) else {
                continue;
            };
            if let Some(qid) = self.identifier_from_page(title, language).await {
                debug!(qid = %qid, page = title, language = language, "Identifier from page properties");
                return Some(qid);
            }
        }

        let qid = self.search(work).await;
        if let Some(qid) = &qid {
            debug!(qid = %qid, "Identifier from structured search");
        }
        qid
    }

    async fn identifier_from_page(&self, title: &str, language: &str) -> Option<String> {
        let url = format!("https://{language}.wikipedia.org/w/api.php");
        let query = [
            ("action", "query"),
            ("format", "json"),
            ("prop", "pageprops"),
            ("ppprop", "wikibase_item"),
            ("titles", title),
        ];

        match self.http.get_json::<PagePropsResponse>(&url, &query).await {
            Ok(Some(response)) => response
                .query
                .pages
                .into_values()
                .find_map(|page| page.pageprops.get("wikibase_item").cloned()),
            Ok(None) => None,
            Err(e) => {
                warn!(page = title, language = language, error = %e, "Page properties lookup failed");
                None
            }
        }
    }

    async fn search(&self, work: &WorkQuery<'_>) -> Option<String> {
        let query = build_search_query(work.title, work.author)?;

        match self
            .http
            .get_json::<SparqlResponse>(SPARQL_URL, &[("query", query.as_str()), ("format", "json")])
            .await
        {
            Ok(Some(response)) => response
                .results
                .bindings
                .iter()
                .filter_map(|binding| binding.get("item"))
                .find_map(|term| extract::qid_from_uri(&term.value)),
            Ok(None) => None,
            Err(e) => {
                warn!(title = work.title, error = %e, "Structured search failed");
                None
            }
        }
    }

    /// Fetch the full entity document
    pub async fn fetch_entity(&self, qid: &str) -> Option<Value> {
        let url = format!("{ENTITY_DATA_URL}/{qid}.json");
        match self.http.get_json::<Value>(&url, &[]).await {
            Ok(doc) => doc,
            Err(e) => {
                warn!(qid = qid, error = %e, "Entity fetch failed");
                None
            }
        }
    }

    async fn label_for(&self, qid: &str, preferred: &[&str]) -> Option<String> {
        let doc = self.fetch_entity(qid).await?;
        extract::entity_body(&doc, qid).and_then(|entity| extract::pick_label(entity, preferred))
    }
}

/// First item `lookup` resolves, trying `items` in order
async fn first_resolved<'a, F, Fut>(items: &'a [String], mut lookup: F) -> Option<String>
where
    F: FnMut(&'a str) -> Fut,
    Fut: Future<Output = Option<String>>,
{
    for item in items {
        if let Some(resolved) = lookup(item.as_str()).await {
            return Some(resolved);
        }
    }
    None
}

/// SPARQL query for a literary work whose label contains `title`
///
/// When `author` is non-empty the work's author label must contain it too.
/// Returns `None` for a blank title.
pub fn build_search_query(title: &str, author: &str) -> Option<String> {
    let title = sparql_literal(title)?;

    let author_clause = match sparql_literal(author) {
        Some(author) => format!(
            "  ?item wdt:P50 ?author .\n  ?author rdfs:label ?authorLabel .\n  FILTER(CONTAINS(LCASE(?authorLabel), {author}))\n"
        ),
        None => String::new(),
    };

    Some(format!(
        "SELECT ?item WHERE {{\n  ?item wdt:P31 wd:{LITERARY_WORK} ;\n        rdfs:label ?label .\n  FILTER(CONTAINS(LCASE(?label), {title}))\n{author_clause}}}\nLIMIT 1"
    ))
}

/// Lower-cased, escaped string literal; `None` when blank
fn sparql_literal(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let escaped = raw.to_lowercase().replace('\\', "\\\\").replace('"', "\\\"");
    Some(format!("\"{escaped}\""))
}

//! Library aggregator adapter (Open Library search)
//!
//! Only `first_publish_year` is trusted for the year; `publish_year` lists
//! reprints and is ignored.

use super::http::HttpContext;
use super::text;
use super::{SourceFields, WorkQuery};
use crate::types::Field;
use serde::Deserialize;
use tracing::warn;

const SEARCH_URL: &str = "https://openlibrary.org/search.json";

/// Subjects inspected for a genre
const MAX_SUBJECTS: usize = 10;

#[derive(Debug, Deserialize, Default)]
pub struct SearchResponse {
    #[serde(default)]
    pub docs: Vec<SearchDoc>,
}

#[derive(Debug, Deserialize, Default)]
pub struct SearchDoc {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub first_publish_year: Option<i32>,
    #[serde(default)]
    pub subject: Vec<String>,
    #[serde(default)]
    pub first_sentence: Vec<String>,
}

/// Open Library client
#[derive(Debug, Clone)]
pub struct OpenLibraryClient {
    http: HttpContext,
}

impl OpenLibraryClient {
    pub fn new(http: HttpContext) -> Self {
        Self { http }
    }

    pub async fn fetch(&self, work: &WorkQuery<'_>) -> Option<SourceFields> {
        let query = format!("{} {}", work.title.trim(), work.author.trim());

        match self
            .http
            .get_json::<SearchResponse>(SEARCH_URL, &[("q", query.trim()), ("limit", "1")])
            .await
        {
            Ok(Some(response)) => response.docs.first().map(|doc| parse_doc(doc, work)),
            Ok(None) => None,
            Err(e) => {
                warn!(source = "open_library", error = %e, "Aggregator lookup failed");
                None
            }
        }
    }
}

pub fn parse_doc(doc: &SearchDoc, work: &WorkQuery<'_>) -> SourceFields {
    let first_sentence = doc.first_sentence.first().cloned().unwrap_or_default();
    let mut fields = SourceFields::with_context(&first_sentence);

    let title = doc.title.trim();
    if !title.is_empty() && title.to_lowercase() != work.title.trim().to_lowercase() {
        fields.insert(Field::OriginalTitle, Some(title.to_string()));
    }
    fields.insert(
        Field::FirstPublished,
        doc.first_publish_year.map(|year| year.to_string()),
    );
    fields.insert(
        Field::Genre,
        text::detect_genre_in(doc.subject.iter().take(MAX_SUBJECTS).map(String::as_str))
            .map(str::to_string),
    );
    fields.insert(Field::Synopsis, text::first_sentences(&first_sentence, 2));

    fields
}

//! Bibliographic catalog adapter (Google Books volumes search)

use super::http::HttpContext;
use super::text;
use super::{SourceFields, WorkQuery};
use crate::types::Field;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::warn;

pub const VOLUMES_URL: &str = "https://www.googleapis.com/books/v1/volumes";

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{4})\b").expect("year pattern"));

#[derive(Debug, Deserialize, Default)]
pub struct VolumesResponse {
    #[serde(default)]
    pub items: Vec<Volume>,
}

#[derive(Debug, Deserialize, Default)]
pub struct Volume {
    #[serde(rename = "volumeInfo", default)]
    pub info: VolumeInfo,
}

#[derive(Debug, Deserialize, Default)]
pub struct VolumeInfo {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(rename = "publishedDate", default)]
    pub published_date: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

/// Google Books client
#[derive(Debug, Clone)]
pub struct GoogleBooksClient {
    http: HttpContext,
    max_results: u32,
}

impl GoogleBooksClient {
    pub fn new(http: HttpContext) -> Self {
        Self { http, max_results: 5 }
    }

    pub async fn fetch(&self, work: &WorkQuery<'_>) -> Option<SourceFields> {
        let query = format!("{} {}", work.title.trim(), work.author.trim());
        let max_results = self.max_results.to_string();

        match self
            .http
            .get_json::<VolumesResponse>(VOLUMES_URL, &[("q", query.trim()), ("maxResults", &max_results)])
            .await
        {
            Ok(Some(response)) => parse_volumes(&response, work),
            Ok(None) => None,
            Err(e) => {
                warn!(source = "google_books", error = %e, "Catalog lookup failed");
                None
            }
        }
    }
}

/// Pick the best volume (author match first, else the top hit) and extract fields
///
/// `publishedDate` is an edition date; the publication-year gate decides
/// whether it can stand for first publication.
pub fn parse_volumes(response: &VolumesResponse, work: &WorkQuery<'_>) -> Option<SourceFields> {
    let author = work.author.trim().to_lowercase();
    let volume = response
        .items
        .iter()
        .find(|v| {
            !author.is_empty()
                && v.info.authors.iter().any(|a| {
                    let a = a.to_lowercase();
                    a.contains(&author) || author.contains(&a)
                })
        })
        .or_else(|| response.items.first())?;

    let info = &volume.info;
    let description = info.description.clone().unwrap_or_default();
    let mut fields = SourceFields::with_context(&description);

    let title = info.title.trim();
    if !title.is_empty() && title.to_lowercase() != work.title.trim().to_lowercase() {
        fields.insert(Field::OriginalTitle, Some(title.to_string()));
    }

    fields.insert(
        Field::FirstPublished,
        info.published_date
            .as_deref()
            .and_then(|date| YEAR_RE.captures(date))
            .map(|caps| caps[1].to_string()),
    );
    fields.insert(
        Field::Genre,
        text::detect_genre_in(info.categories.iter().map(String::as_str)).map(str::to_string),
    );
    fields.insert(Field::Synopsis, text::first_sentences(&description, 2));

    Some(fields)
}

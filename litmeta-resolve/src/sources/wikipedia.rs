//! Encyclopedia summary adapter (Wikipedia REST `page/summary`)
//!
//! The same client serves the foreign-language and the local-language
//! edition; only the language code and the [`PageRole`] differ.

use super::http::{encode_title, HttpContext};
use super::text;
use super::{SourceFields, WorkQuery};
use crate::types::Field;
use serde::Deserialize;
use tracing::{debug, warn};

/// Which edition a page was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRole {
    /// Edition in the language original-work information is written in
    Foreign,
    /// Edition in the catalogue's own language
    Local,
}

/// REST summary payload (fields we use)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PageSummary {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub extract: String,
    #[serde(rename = "type", default)]
    pub page_type: String,
    #[serde(default)]
    pub wikibase_item: Option<String>,
}

/// Encyclopedia summary client for one language edition
#[derive(Debug, Clone)]
pub struct WikipediaClient {
    http: HttpContext,
    language: String,
    role: PageRole,
    /// Characters that mark text as written in the local language
    local_script_marks: String,
}

impl WikipediaClient {
    pub fn new(http: HttpContext, language: &str, role: PageRole, local_script_marks: &str) -> Self {
        Self {
            http,
            language: language.to_string(),
            role,
            local_script_marks: local_script_marks.to_string(),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Find the work's page and extract field candidates
    ///
    /// Tries `"{title} ({author})"`, `"{title}"`, `"{author} {title}"` in
    /// order. A page is accepted when the author is named in its extract, or
    /// when it was found under the bare title.
    pub async fn fetch(&self, work: &WorkQuery<'_>) -> Option<SourceFields> {
        for term in search_terms(work) {
            let url = format!(
                "https://{}.wikipedia.org/api/rest_v1/page/summary/{}",
                self.language,
                encode_title(&term)
            );

            let summary = match self.http.get_json::<PageSummary>(&url, &[]).await {
                Ok(Some(summary)) => summary,
                Ok(None) => {
                    debug!(language = %self.language, term = %term, "No encyclopedia page");
                    continue;
                }
                Err(e) => {
                    warn!(language = %self.language, term = %term, error = %e, "Encyclopedia lookup failed");
                    continue;
                }
            };

            if summary.extract.trim().is_empty() || summary.page_type == "disambiguation" {
                debug!(language = %self.language, term = %term, "Page has no usable extract");
                continue;
            }

            if !accepts_page(&summary, work, &term) {
                debug!(language = %self.language, term = %term, "Page does not mention author");
                continue;
            }

            debug!(language = %self.language, page = %summary.title, "Encyclopedia page matched");
            return Some(parse_summary(
                &summary,
                work,
                self.role,
                &self.language,
                &self.local_script_marks,
            ));
        }

        None
    }
}

fn search_terms(work: &WorkQuery<'_>) -> Vec<String> {
    let title = work.title.trim();
    let author = work.author.trim();
    if author.is_empty() {
        return vec![title.to_string()];
    }
    vec![
        format!("{title} ({author})"),
        title.to_string(),
        format!("{author} {title}"),
    ]
}

fn accepts_page(summary: &PageSummary, work: &WorkQuery<'_>, term: &str) -> bool {
    let author = work.author.trim().to_lowercase();
    (!author.is_empty() && summary.extract.to_lowercase().contains(&author)) || term == work.title.trim()
}

/// Extract field candidates from a summary payload
pub fn parse_summary(
    summary: &PageSummary,
    work: &WorkQuery<'_>,
    role: PageRole,
    language: &str,
    local_script_marks: &str,
) -> SourceFields {
    let extract = summary.extract.as_str();
    let mut fields = SourceFields::with_context(extract);
    fields.page_title = Some(summary.title.clone()).filter(|t| !t.is_empty());
    fields.cross_ref = summary.wikibase_item.clone().filter(|q| !q.is_empty());
    fields.language = Some(language.to_string());

    let has_local_marks = |s: &str| s.chars().any(|c| local_script_marks.contains(c));

    let original_title = match role {
        PageRole::Foreign => text::labelled_original_title(extract)
            .or_else(|| text::parenthetical_title(extract).filter(|t| !has_local_marks(t)))
            .or_else(|| {
                Some(summary.title.clone())
                    .filter(|t| !t.is_empty() && t.to_lowercase() != work.title.trim().to_lowercase())
            }),
        PageRole::Local => {
            text::labelled_original_title(extract).or_else(|| text::parenthetical_title(extract))
        }
    };
    fields.insert(Field::OriginalTitle, original_title);
    fields.insert(Field::Synopsis, text::first_sentences(extract, 2));
    fields.insert(Field::FirstPublished, text::extract_year(extract));
    fields.insert(Field::Genre, text::detect_genre(extract).map(str::to_string));
    fields.insert(Field::CountryTradition, text::detect_country(extract).map(str::to_string));

    fields
}

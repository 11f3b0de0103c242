//! Web search context for the second stage of a generative call
//!
//! When a model answers that it does not know a work, the provider gathers a
//! short text digest about it and asks again with that digest in the prompt.
//! Backends are tried in order until one yields text:
//!
//! 1. DuckDuckGo instant answers
//! 2. the local-language encyclopedia summary (several title variants)
//! 3. catalog volumes restricted to the local language

use crate::sources::google_books::{VolumesResponse, VOLUMES_URL};
use crate::sources::http::{encode_title, HttpContext};
use crate::sources::wikipedia::PageSummary;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

const INSTANT_ANSWER_URL: &str = "https://api.duckduckgo.com/";

/// Default cap on the digest handed to the model
pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 2000;

/// Source of free-text context about a work
#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Digest about the work, or `None` when nothing was found
    async fn search(&self, title: &str, author: &str) -> Option<String>;
}

#[derive(Debug, Deserialize, Default)]
pub struct InstantAnswer {
    #[serde(rename = "Heading", default)]
    pub heading: String,
    #[serde(rename = "AbstractText", default)]
    pub abstract_text: String,
    #[serde(rename = "RelatedTopics", default)]
    pub related: Vec<RelatedTopic>,
}

/// Related topic entry; groups nest further topics
#[derive(Debug, Deserialize, Default)]
pub struct RelatedTopic {
    #[serde(rename = "Text", default)]
    pub text: String,
    #[serde(rename = "Topics", default)]
    pub topics: Vec<RelatedTopic>,
}

/// HTTP-backed search over public JSON endpoints
#[derive(Debug, Clone)]
pub struct HttpWebSearch {
    http: HttpContext,
    local_language: String,
    max_chars: usize,
}

impl HttpWebSearch {
    pub fn new(http: HttpContext, local_language: &str, max_chars: usize) -> Self {
        Self {
            http,
            local_language: local_language.to_string(),
            max_chars: max_chars.max(1),
        }
    }

    async fn instant_answer(&self, title: &str, author: &str) -> Option<String> {
        for query in [format!("{title} {author}"), format!("\"{title}\" {author}"), format!("{title} book {author}")] {
            let params = [
                ("q", query.trim()),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ];
            match self.http.get_json::<InstantAnswer>(INSTANT_ANSWER_URL, &params).await {
                Ok(Some(answer)) => {
                    if let Some(digest) = instant_answer_digest(&answer) {
                        return Some(digest);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, "Instant answer lookup failed");
                    return None;
                }
            }
        }
        None
    }

    async fn encyclopedia(&self, title: &str, author: &str) -> Option<String> {
        let mut variants = vec![format!("{title} {author}"), format!("{title} ({author})"), title.to_string()];
        if title.split_whitespace().count() <= 3 {
            variants.push(format!("{author} {title}"));
        }

        for variant in variants {
            let url = format!(
                "https://{}.wikipedia.org/api/rest_v1/page/summary/{}",
                self.local_language,
                encode_title(&variant)
            );
            match self.http.get_json::<PageSummary>(&url, &[]).await {
                Ok(Some(summary)) if !summary.extract.trim().is_empty() => {
                    return Some(format!("{}: {}", summary.title, truncate_chars(&summary.extract, 1500)));
                }
                Ok(_) => {}
                Err(e) => debug!(error = %e, variant = %variant, "Encyclopedia search variant failed"),
            }
        }
        None
    }

    async fn catalog(&self, title: &str, author: &str) -> Option<String> {
        let query = format!("{title} {author}");
        let params = [
            ("q", query.trim()),
            ("maxResults", "10"),
            ("langRestrict", self.local_language.as_str()),
        ];
        match self.http.get_json::<VolumesResponse>(VOLUMES_URL, &params).await {
            Ok(Some(response)) => volumes_digest(&response),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Catalog search failed");
                None
            }
        }
    }
}

#[async_trait]
impl WebSearch for HttpWebSearch {
    async fn search(&self, title: &str, author: &str) -> Option<String> {
        let (title, author) = (title.trim(), author.trim());
        if title.is_empty() {
            return None;
        }

        let digest = match self.instant_answer(title, author).await {
            Some(digest) => Some(digest),
            None => match self.encyclopedia(title, author).await {
                Some(digest) => Some(digest),
                None => self.catalog(title, author).await,
            },
        };

        debug!(title = %title, found = digest.is_some(), "Web search finished");
        digest.map(|text| truncate_chars(&text, self.max_chars))
    }
}

/// Heading, abstract and related-topic lines of an instant answer
pub fn instant_answer_digest(answer: &InstantAnswer) -> Option<String> {
    let mut lines = Vec::new();
    if !answer.abstract_text.trim().is_empty() {
        lines.push(format!("{}: {}", answer.heading.trim(), answer.abstract_text.trim()));
    }

    let mut stack: Vec<&RelatedTopic> = answer.related.iter().rev().collect();
    while let Some(topic) = stack.pop() {
        if !topic.text.trim().is_empty() {
            lines.push(truncate_chars(topic.text.trim(), 200));
        }
        stack.extend(topic.topics.iter().rev());
    }

    (!lines.is_empty()).then(|| lines.join("\n"))
}

/// One `Title: .. | Author: ..` line per catalog volume
pub fn volumes_digest(response: &VolumesResponse) -> Option<String> {
    let lines: Vec<String> = response
        .items
        .iter()
        .take(10)
        .filter_map(|volume| {
            let info = &volume.info;
            let mut parts = Vec::new();
            if !info.title.trim().is_empty() {
                parts.push(format!("Title: {}", info.title.trim()));
            }
            if !info.authors.is_empty() {
                parts.push(format!("Author: {}", info.authors.join(", ")));
            }
            let labelled = [
                ("Published", info.published_date.as_deref()),
                ("Publisher", info.publisher.as_deref()),
                ("Language", info.language.as_deref()),
            ];
            for (label, value) in labelled {
                if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
                    parts.push(format!("{label}: {value}"));
                }
            }
            if let Some(description) = info.description.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
                parts.push(format!("Description: {}", truncate_chars(description, 400)));
            }
            (!parts.is_empty()).then(|| parts.join(" | "))
        })
        .collect();

    (!lines.is_empty()).then(|| lines.join("\n"))
}

/// Prefix of at most `max` characters
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instant_answer_digest_flattens_topic_groups() {
        let answer: InstantAnswer = serde_json::from_str(
            r#"{
                "Heading": "Kürk Mantolu Madonna",
                "AbstractText": "A 1943 novel by Sabahattin Ali.",
                "RelatedTopics": [
                    {"Text": "Sabahattin Ali - Turkish novelist", "FirstURL": "https://duckduckgo.com/x"},
                    {"Name": "Adaptations", "Topics": [{"Text": "2022 stage adaptation"}]}
                ]
            }"#,
        )
        .unwrap();

        let digest = instant_answer_digest(&answer).unwrap();
        assert_eq!(
            digest,
            "Kürk Mantolu Madonna: A 1943 novel by Sabahattin Ali.\n\
             Sabahattin Ali - Turkish novelist\n\
             2022 stage adaptation"
        );
    }

    #[test]
    fn test_empty_instant_answer_has_no_digest() {
        assert_eq!(instant_answer_digest(&InstantAnswer::default()), None);
    }

    #[test]
    fn test_volumes_digest_lists_known_parts() {
        let response: VolumesResponse = serde_json::from_str(
            r#"{"items": [
                {"volumeInfo": {"title": "İçimizdeki Şeytan", "authors": ["Sabahattin Ali"],
                                "publishedDate": "2004", "publisher": "YKY", "language": "tr"}},
                {"volumeInfo": {}}
            ]}"#,
        )
        .unwrap();

        assert_eq!(
            volumes_digest(&response).as_deref(),
            Some("Title: İçimizdeki Şeytan | Author: Sabahattin Ali | Published: 2004 | Publisher: YKY | Language: tr")
        );
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("çğıöşü", 3), "çğı");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}

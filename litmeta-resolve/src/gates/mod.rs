//! Quality Gates
//!
//! Pure predicates that reject contextually wrong candidate values before they
//! are committed. Every gate is a function of `(value, context)` plus the
//! loaded [`GateLexicon`]; gates never fail, they return a [`GateResult`] whose
//! reason code the caller logs before moving on to the next source.
//!
//! # Gates
//! - **Publication year**: per-source-kind context checks (translation
//!   vocabulary, first-publication phrasing, classic-work edition dates) plus a
//!   universal year bound. Year ranges such as `1865-1869` bypass the bound.
//! - **Original title**: empty values, volume/part markers, echoes of the
//!   localized title, and Latin-script echoes from catalogs for authors who
//!   write in a non-Latin script.

pub mod lexicon;

pub use lexicon::GateLexicon;

use crate::error::{ResolveError, ResolveResult};
use crate::types::SourceKind;
use regex::{Regex, RegexSet, RegexSetBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Gate attached to a field rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateKind {
    PublicationYear,
    OriginalTitle,
}

/// Context a candidate is judged in
#[derive(Debug, Clone, Copy)]
pub struct GateContext<'a> {
    /// Kind of source that produced the candidate
    pub source: SourceKind,
    /// Raw text the candidate was extracted from (may be empty)
    pub extract: &'a str,
    /// Caller-supplied localized title of the work
    pub localized_title: &'a str,
    /// Caller-supplied author
    pub author: &'a str,
}

/// Outcome of a gate check
///
/// `accepted` with a reason is an advisory pass: the value may be committed
/// but the reason flags it as suspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateResult {
    pub accepted: bool,
    pub reason: Option<&'static str>,
}

impl GateResult {
    pub fn accept() -> Self {
        Self {
            accepted: true,
            reason: None,
        }
    }

    pub fn reject(reason: &'static str) -> Self {
        Self {
            accepted: false,
            reason: Some(reason),
        }
    }

    /// Accept, but flag the value as suspect
    pub fn advisory(reason: &'static str) -> Self {
        Self {
            accepted: true,
            reason: Some(reason),
        }
    }

    pub fn is_advisory(&self) -> bool {
        self.accepted && self.reason.is_some()
    }
}

/// Compiled quality gates
#[derive(Debug, Clone)]
pub struct QualityGates {
    lexicon: GateLexicon,
    volume_markers: RegexSet,
    translation_context: RegexSet,
}

impl QualityGates {
    /// Compile gates from lexicon data
    ///
    /// # Errors
    /// [`ResolveError::InvalidPattern`] if any pattern does not compile.
    pub fn new(lexicon: GateLexicon) -> ResolveResult<Self> {
        let volume_markers = compile_set("volume", &lexicon.volume_patterns)?;
        let translation_context = compile_set("translation", &lexicon.translation_patterns)?;

        Ok(Self {
            lexicon,
            volume_markers,
            translation_context,
        })
    }

    pub fn lexicon(&self) -> &GateLexicon {
        &self.lexicon
    }

    /// Run the gate of the given kind
    pub fn check(&self, kind: GateKind, value: &str, ctx: &GateContext<'_>) -> GateResult {
        match kind {
            GateKind::PublicationYear => self.publication_year(value, ctx),
            GateKind::OriginalTitle => self.original_title(value, ctx),
        }
    }

    /// Publication-year gate
    pub fn publication_year(&self, value: &str, ctx: &GateContext<'_>) -> GateResult {
        let value = value.trim();
        if value.is_empty() {
            return GateResult::reject("empty");
        }
        let year = value.parse::<i32>().ok();
        let mut verdict = GateResult::accept();

        match ctx.source {
            SourceKind::LocalEncyclopedia => {
                if self.has_translation_context(ctx.extract) {
                    return GateResult::reject("tr_translation_context");
                }
            }
            SourceKind::ForeignEncyclopedia => {
                if !self.has_first_publication_context(ctx.extract) {
                    return GateResult::reject("missing_en_pub_context");
                }
            }
            SourceKind::Catalog | SourceKind::LibraryAggregator => {
                if let Some(year) = year {
                    if self.is_classic_work(ctx.localized_title, ctx.author) {
                        if year > self.lexicon.recent_year_threshold {
                            return GateResult::reject(if ctx.source == SourceKind::Catalog {
                                "catalog_edition_date_recent"
                            } else {
                                "aggregator_wrong_first_publish_year"
                            });
                        }
                        if ctx.source == SourceKind::Catalog
                            && year > self.lexicon.classic_year_threshold
                        {
                            verdict = GateResult::advisory("catalog_edition_date_suspect");
                        }
                    }
                }
            }
            SourceKind::KnowledgeGraph | SourceKind::Generative => {}
        }

        // Universal bound; ranges like "1865-1869" do not parse and pass through
        if let Some(year) = year {
            if year < self.lexicon.min_year || year > self.lexicon.max_year {
                return GateResult::reject("year_out_of_range");
            }
        }

        verdict
    }

    /// Original-title gate
    pub fn original_title(&self, value: &str, ctx: &GateContext<'_>) -> GateResult {
        let value = value.trim();
        if value.is_empty() {
            return GateResult::reject("empty");
        }

        if self.has_volume_marker(value) {
            return GateResult::reject("volume_marker");
        }

        let localized = ctx.localized_title.trim();
        if !localized.is_empty() && value.to_lowercase() == localized.to_lowercase() {
            return GateResult::reject("same_as_localized");
        }

        // Catalogs echo the translated title; for non-Latin-script authors insist
        // on either the native script or a genuinely different transliteration.
        if matches!(ctx.source, SourceKind::Catalog | SourceKind::LibraryAggregator)
            && self.native_language_for_author(ctx.author).is_some()
            && is_latin_script(value)
            && !localized.is_empty()
            && loose_key(value) == loose_key(localized)
        {
            return GateResult::reject("latin_same_as_localized");
        }

        GateResult::accept()
    }

    /// Whether text carries a volume / part / chapter marker
    pub fn has_volume_marker(&self, text: &str) -> bool {
        !text.is_empty() && self.volume_markers.is_match(text)
    }

    /// Whether text carries local-language translation / edition vocabulary
    pub fn has_translation_context(&self, text: &str) -> bool {
        !text.is_empty() && self.translation_context.is_match(text)
    }

    /// Whether text carries explicit first-publication phrasing
    pub fn has_first_publication_context(&self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        let lower = text.to_lowercase();
        self.lexicon
            .first_publication_phrases
            .iter()
            .any(|phrase| lower.contains(&phrase.to_lowercase()))
    }

    /// Classic-work heuristic (known author or known title)
    pub fn is_classic_work(&self, title: &str, author: &str) -> bool {
        if title.trim().is_empty() || author.trim().is_empty() {
            return false;
        }
        let author = author.to_lowercase();
        let title = title.to_lowercase();

        self.lexicon
            .classic_authors
            .iter()
            .any(|name| author.contains(name.as_str()))
            || self
                .lexicon
                .classic_titles
                .iter()
                .any(|known| title.contains(known.as_str()))
    }

    /// Native language of an author known to write in a non-Latin script
    pub fn native_language_for_author(&self, author: &str) -> Option<&str> {
        native_language_for_author(&self.lexicon.native_script_authors, author)
    }
}

impl Default for QualityGates {
    fn default() -> Self {
        // Built-in patterns are constants; failure here is a programming error
        Self::new(GateLexicon::default()).expect("built-in gate lexicon must compile")
    }
}

/// Native language of an author, from a name-fragment → language table
pub fn native_language_for_author<'a>(
    authors: &'a BTreeMap<String, String>,
    author: &str,
) -> Option<&'a str> {
    let author = author.to_lowercase();
    if author.trim().is_empty() {
        return None;
    }
    authors
        .iter()
        .find(|(name, _)| author.contains(name.as_str()))
        .map(|(_, lang)| lang.as_str())
}

/// True if text contains characters from a non-Latin script
///
/// Covers Greek, Cyrillic, Hebrew, Arabic, kana, CJK ideographs and Hangul.
pub fn has_non_latin_script(text: &str) -> bool {
    text.chars().any(|c| {
        matches!(c as u32,
            0x0370..=0x03FF
            | 0x0400..=0x04FF
            | 0x0590..=0x05FF
            | 0x0600..=0x06FF
            | 0x3040..=0x30FF
            | 0x4E00..=0x9FFF
            | 0xAC00..=0xD7AF)
    })
}

/// True if text is written in Latin script only
pub fn is_latin_script(text: &str) -> bool {
    !has_non_latin_script(text)
}

/// Comparison key ignoring case, punctuation and spacing
fn loose_key(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn compile_set(list: &'static str, patterns: &[String]) -> ResolveResult<RegexSet> {
    // Validate individually so the error names the offending pattern
    for pattern in patterns {
        Regex::new(pattern).map_err(|e| ResolveError::InvalidPattern {
            list,
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
    }

    RegexSetBuilder::new(patterns)
        .case_insensitive(true)
        .build()
        .map_err(|e| ResolveError::InvalidPattern {
            list,
            pattern: patterns.join(" | "),
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(source: SourceKind, extract: &'a str, title: &'a str, author: &'a str) -> GateContext<'a> {
        GateContext {
            source,
            extract,
            localized_title: title,
            author,
        }
    }

    #[test]
    fn test_year_range_bypasses_bound() {
        let gates = QualityGates::default();
        let result = gates.publication_year("1865-1869", &ctx(SourceKind::KnowledgeGraph, "", "", ""));
        assert_eq!(result, GateResult::accept());
    }

    #[test]
    fn test_year_out_of_range() {
        let gates = QualityGates::default();
        let kg = ctx(SourceKind::KnowledgeGraph, "", "", "");
        assert_eq!(gates.publication_year("1499", &kg).reason, Some("year_out_of_range"));
        assert_eq!(gates.publication_year("2101", &kg).reason, Some("year_out_of_range"));
        assert!(gates.publication_year("1500", &kg).accepted);
        assert!(gates.publication_year("2100", &kg).accepted);
    }

    #[test]
    fn test_foreign_encyclopedia_requires_publication_phrase() {
        let gates = QualityGates::default();
        let without = ctx(SourceKind::ForeignEncyclopedia, "A novel set in 1812.", "", "");
        assert_eq!(gates.publication_year("1812", &without).reason, Some("missing_en_pub_context"));

        let with = ctx(SourceKind::ForeignEncyclopedia, "It was originally published in 1869.", "", "");
        assert!(gates.publication_year("1869", &with).accepted);
    }

    #[test]
    fn test_catalog_mid_century_year_is_advisory_for_classics() {
        let gates = QualityGates::default();
        let c = ctx(SourceKind::Catalog, "", "Anna Karenina", "Leo Tolstoy");
        let result = gates.publication_year("1975", &c);
        assert!(result.is_advisory());
        assert_eq!(result.reason, Some("catalog_edition_date_suspect"));
    }

    #[test]
    fn test_aggregator_recent_year_rejected_for_classics() {
        let gates = QualityGates::default();
        let c = ctx(SourceKind::LibraryAggregator, "", "Madame Bovary", "Gustave Flaubert");
        assert_eq!(
            gates.publication_year("2015", &c).reason,
            Some("aggregator_wrong_first_publish_year")
        );
        // Mid-century years are not flagged for the aggregator
        assert_eq!(gates.publication_year("1975", &c), GateResult::accept());
    }

    #[test]
    fn test_non_classic_recent_catalog_year_accepted() {
        let gates = QualityGates::default();
        let c = ctx(SourceKind::Catalog, "", "Some Recent Novel", "Jane Doe");
        assert_eq!(gates.publication_year("2015", &c), GateResult::accept());
    }

    #[test]
    fn test_roman_numeral_and_localized_volume_markers() {
        let gates = QualityGates::default();
        assert!(gates.has_volume_marker("Les Misérables Part II"));
        assert!(gates.has_volume_marker("Savaş ve Barış 1. Cilt"));
        assert!(gates.has_volume_marker("Suç ve Ceza II. Kitap"));
        assert!(!gates.has_volume_marker("Война и мир"));
        assert!(!gates.has_volume_marker("Catch-22"));
    }

    #[test]
    fn test_latin_echo_from_catalog_for_cyrillic_author() {
        let gates = QualityGates::default();
        let c = ctx(SourceKind::Catalog, "", "War and Peace", "Leo Tolstoy");
        assert_eq!(
            gates.original_title("War and Peace.", &c).reason,
            Some("latin_same_as_localized")
        );
        assert!(gates.original_title("Voyna i mir", &c).accepted);
        assert!(gates.original_title("Война и мир", &c).accepted);
    }

    #[test]
    fn test_latin_echo_allowed_from_encyclopedia() {
        let gates = QualityGates::default();
        let c = ctx(SourceKind::ForeignEncyclopedia, "", "War and Peace", "Leo Tolstoy");
        assert!(gates.original_title("War and Peace.", &c).accepted);
    }

    #[test]
    fn test_empty_original_title_rejected() {
        let gates = QualityGates::default();
        let c = ctx(SourceKind::KnowledgeGraph, "", "Suç ve Ceza", "");
        assert_eq!(gates.original_title("   ", &c).reason, Some("empty"));
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let lexicon = GateLexicon {
            volume_patterns: vec![r"\bvolume(".to_string()],
            ..GateLexicon::default()
        };
        match QualityGates::new(lexicon) {
            Err(ResolveError::InvalidPattern { list, pattern, .. }) => {
                assert_eq!(list, "volume");
                assert_eq!(pattern, r"\bvolume(");
            }
            other => panic!("expected InvalidPattern, got {other:?}"),
        }
    }

    #[test]
    fn test_script_detection() {
        assert!(has_non_latin_script("Война и мир"));
        assert!(has_non_latin_script("吾輩は猫である"));
        assert!(is_latin_script("Madame Bovary"));
        assert!(is_latin_script("Suç ve Ceza"));
    }
}

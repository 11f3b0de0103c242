//! Core types shared by every stage of a resolution pass
//!
//! - [`Field`]: the closed set of resolvable value fields
//! - [`SourceId`] / [`SourceKind`]: tagged structured sources and how gates treat them
//! - [`Candidate`]: a proposed value, not yet accepted
//! - [`Provenance`]: the (source, confidence) pair behind an accepted value

use serde::{Deserialize, Serialize};
use std::fmt;

/// Resolvable value field of a literary work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Title in the original language of the work
    OriginalTitle,
    /// Literary genre (novel, poetry, ...)
    Genre,
    /// Country of origin or literary tradition
    CountryTradition,
    /// Year of first publication
    FirstPublished,
    /// Period in which the narrative takes place
    NarratedPeriod,
    /// Short synopsis
    Synopsis,
}

impl Field {
    /// Every field, in stable record order
    pub const ALL: [Field; 6] = [
        Field::OriginalTitle,
        Field::Genre,
        Field::CountryTradition,
        Field::FirstPublished,
        Field::NarratedPeriod,
        Field::Synopsis,
    ];

    /// Stable column key (also used for `src_<key>` / `conf_<key>` provenance columns)
    pub fn key(&self) -> &'static str {
        match self {
            Field::OriginalTitle => "original_title",
            Field::Genre => "genre",
            Field::CountryTradition => "country_tradition",
            Field::FirstPublished => "first_published",
            Field::NarratedPeriod => "narrated_period",
            Field::Synopsis => "synopsis",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Field::OriginalTitle => "Original Title",
            Field::Genre => "Genre",
            Field::CountryTradition => "Country/Literary Tradition",
            Field::FirstPublished => "First Published",
            Field::NarratedPeriod => "Narrated Period",
            Field::Synopsis => "Synopsis",
        }
    }

    /// Look a field up by column key or label (case-insensitive)
    pub fn from_key(raw: &str) -> Option<Field> {
        let wanted = raw.trim();
        Field::ALL.into_iter().find(|field| {
            field.key().eq_ignore_ascii_case(wanted) || field.label().eq_ignore_ascii_case(wanted)
        })
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Tagged structured source
///
/// Closed set: the orchestrator iterates these in priority order and resolves
/// each through a [`crate::sources::SourceCatalog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    /// Encyclopedia summary in the foreign (original-information) language
    ForeignWiki,
    /// Encyclopedia summary in the local (catalogue) language
    LocalWiki,
    /// Bibliographic catalog (Google Books)
    GoogleBooks,
    /// Library aggregator (Open Library)
    OpenLibrary,
    /// Knowledge graph (Wikidata)
    Wikidata,
}

impl SourceId {
    /// Provenance identifier written to `src_<field>` columns
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::ForeignWiki => "wiki_foreign",
            SourceId::LocalWiki => "wiki_local",
            SourceId::GoogleBooks => "google_books",
            SourceId::OpenLibrary => "open_library",
            SourceId::Wikidata => "wikidata",
        }
    }

    /// How quality gates treat candidates from this source
    pub fn kind(&self) -> SourceKind {
        match self {
            SourceId::ForeignWiki => SourceKind::ForeignEncyclopedia,
            SourceId::LocalWiki => SourceKind::LocalEncyclopedia,
            SourceId::GoogleBooks => SourceKind::Catalog,
            SourceId::OpenLibrary => SourceKind::LibraryAggregator,
            SourceId::Wikidata => SourceKind::KnowledgeGraph,
        }
    }

    /// Sources whose results must be fetched before this one
    ///
    /// Entity resolution reuses cross-references and page titles from
    /// already-fetched encyclopedia pages.
    pub fn prerequisites(&self) -> &'static [SourceId] {
        match self {
            SourceId::Wikidata => &[SourceId::ForeignWiki, SourceId::LocalWiki],
            _ => &[],
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source classification used by the quality gates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    LocalEncyclopedia,
    ForeignEncyclopedia,
    Catalog,
    LibraryAggregator,
    KnowledgeGraph,
    /// Generative fallback provider
    Generative,
}

/// A proposed field value from one source, not yet accepted
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub field: Field,
    pub value: String,
    /// Source identifier (structured source or provider id)
    pub source: String,
    /// Raw context text the value was taken from (used for gating)
    pub context: String,
}

/// Recorded (source, confidence) pair behind an accepted value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// Source that provided this value
    pub source: String,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
}

impl Provenance {
    /// Create provenance with clamped confidence (0.0-1.0)
    pub fn new(source: impl Into<String>, confidence: f32) -> Self {
        Self {
            source: source.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

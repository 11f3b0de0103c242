//! Keyword and pattern data behind the quality gates
//!
//! Kept as plain data so deployments can retune the heuristics from the
//! `[lexicon]` TOML section without touching gate logic.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Gate heuristics data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateLexicon {
    /// Volume / part / chapter markers (regex, matched case-insensitively)
    pub volume_patterns: Vec<String>,
    /// Local-language translation / edition vocabulary (regex)
    pub translation_patterns: Vec<String>,
    /// Foreign-language first-publication phrasing (plain substrings)
    pub first_publication_phrases: Vec<String>,
    /// Author name fragments marking a classic work
    pub classic_authors: Vec<String>,
    /// Title fragments marking a classic work
    pub classic_titles: Vec<String>,
    /// Author name fragment → native language code, for authors writing in a non-Latin script
    pub native_script_authors: BTreeMap<String, String>,
    /// Catalog years above this are suspicious for classic works
    pub classic_year_threshold: i32,
    /// Catalog years above this are rejected for classic works
    pub recent_year_threshold: i32,
    /// Inclusive bounds for a single-year value
    pub min_year: i32,
    pub max_year: i32,
}

impl Default for GateLexicon {
    fn default() -> Self {
        Self {
            volume_patterns: strings(&[
                r"\bvolume\b",
                r"\bvol\.?\b",
                r"\btome\b",
                r"\bpart\b",
                r"\bbook\s+(?:one|two|three)\b",
                r"\bchapter\s+\d+",
                r"\bpart\s+[ivx]+\b",
                r"\bpart\s+\d+",
                r"\bvolume\s+\w+\b",
                r"\b\d+\.?\s*(?:part|volume)",
                // Turkish volume / ordinal vocabulary
                r"\bcilt\b",
                r"\bc\.?\s*\d+\b",
                r"\b(?:birinci|ikinci|[üu][çc][üu]nc[üu]|d[öo]rd[üu]nc[üu]|be[şs]inci)\b",
                r"\bb[öo]l[üu]m\s+\d+",
                r"\bkitap\s+(?:[ivx]+|\d+)\b",
                r"\b\d+\.?\s*(?:kitap|cilt)",
                r"\b[ivx]+\.?\s*(?:cilt|kitap)\b",
            ]),
            translation_patterns: strings(&[
                r"t[üu]rk[çc]eye\s+.*\s+[0-9]{4}\s*y[ıi]l[ıi]nda",
                r"t[üu]rk[çc]eye\s+[çc]evril",
                r"t[üu]rk[çc]e\s+bask[ıi]",
                r"t[üu]rk[çc]e\s+bas[ıi]m",
                r"t[üu]rk[çc]e\s+yay[ıi]n",
                r"t[üu]rkiye'?de\s+.*\s+[0-9]{4}\s*y[ıi]l[ıi]nda",
                r"t[üu]rkiye'?de\s+.*\s+(?:yay[ıi]mland[ıi]|bas[ıi]ld[ıi]|[çc]evrildi)",
                r"ilk\s+kez\s+t[üu]rk[çc]e",
                r"ilk\s+t[üu]rk[çc]e\s+bask[ıi]",
                r"[çc]evir",
                r"t[üu]rk[çc]e\s+(?:edisyon|versiyon)",
            ]),
            first_publication_phrases: strings(&[
                "first published",
                "originally published",
                "initially published",
                "published in",
                "written in",
                "first appeared",
                "first edition",
                "original publication",
            ]),
            classic_authors: strings(&[
                "tolstoy", "dostoyevsky", "dostoevsky", "chekhov", "gogol", "pushkin",
                "dickens", "austen", "bronte", "shakespeare", "homer", "virgil", "dante",
                "cervantes", "goethe", "schiller", "balzac", "flaubert", "zola", "stendhal",
                "verne", "wilde", "twain", "melville", "hawthorne", "poe", "whitman",
                "emerson", "thoreau", "thackeray", "eliot", "hardy", "conrad", "joyce",
                "kafka", "mann", "proust",
            ]),
            classic_titles: strings(&[
                "war and peace", "anna karenina", "crime and punishment",
                "brothers karamazov", "the idiot", "les miserables", "the hunchback",
                "don quixote", "the iliad", "the odyssey", "the divine comedy", "faust",
                "moby dick", "the scarlet letter", "pride and prejudice", "jane eyre",
                "wuthering heights", "great expectations", "david copperfield",
                "oliver twist", "the count of monte cristo", "the three musketeers",
                "madame bovary", "robinson crusoe",
            ]),
            native_script_authors: [
                ("tolstoy", "ru"),
                ("dostoyevsky", "ru"),
                ("dostoevsky", "ru"),
                ("chekhov", "ru"),
                ("gogol", "ru"),
                ("pushkin", "ru"),
                ("turgenev", "ru"),
            ]
            .into_iter()
            .map(|(name, lang)| (name.to_string(), lang.to_string()))
            .collect(),
            classic_year_threshold: 1950,
            recent_year_threshold: 2000,
            min_year: 1500,
            max_year: 2100,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

//! Text heuristics shared by the summary and catalog adapters
//!
//! Keyword tables are matched case-insensitively at word starts. A keyword
//! may carry up to two inflection suffixes (plural, case, copula), so
//! "novels", "romandır" and "İngiltere'de" all count. Labels are canonical
//! English names; the caller localizes for display.

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

/// Plural, case and copula endings accepted after a keyword
const INFLECTIONS: &str = "s|es|lar|ler|ları|leri|dır|dir|dur|dür|tır|tir|tur|tür|dan|den|tan|ten|da|de|ta|te|\
                           nın|nin|nun|nün|ın|in|un|ün|yla|yle|ya|ye|yı|yi|la|le|lı|li|lu|lü|ca|ce|ça|çe|ı|i|u|ü";

/// Genre keyword → canonical label, most specific first
static GENRE_KEYWORDS: &[(&str, &str)] = &[
    ("novella", "Novella"),
    ("novelle", "Novella"),
    ("short story", "Short story"),
    ("short stories", "Short story"),
    ("öykü", "Short story"),
    ("hikaye", "Short story"),
    ("novel", "Novel"),
    ("roman", "Novel"),
    ("fiction", "Novel"),
    ("story", "Short story"),
    ("poetry", "Poetry"),
    ("poem", "Poetry"),
    ("şiir", "Poetry"),
    ("play", "Drama"),
    ("drama", "Drama"),
    ("theatre", "Drama"),
    ("theater", "Drama"),
    ("tiyatro", "Drama"),
    ("philosophy", "Philosophy"),
    ("philosophical", "Philosophy"),
    ("felsefe", "Philosophy"),
    ("history", "History"),
    ("historical", "History"),
    ("tarih", "History"),
    ("science", "Science"),
    ("scientific", "Science"),
    ("bilim", "Science"),
];

/// Nationality / country keyword → country label
static COUNTRY_KEYWORDS: &[(&str, &str)] = &[
    ("turkish", "Turkey"),
    ("turkey", "Turkey"),
    ("türkiye", "Turkey"),
    ("british", "United Kingdom"),
    ("english", "United Kingdom"),
    ("england", "United Kingdom"),
    ("ingiltere", "United Kingdom"),
    ("american", "United States"),
    ("united states", "United States"),
    ("usa", "United States"),
    ("amerika", "United States"),
    ("french", "France"),
    ("france", "France"),
    ("fransa", "France"),
    ("german", "Germany"),
    ("germany", "Germany"),
    ("almanya", "Germany"),
    ("russian", "Russia"),
    ("russia", "Russia"),
    ("rusya", "Russia"),
    ("spanish", "Spain"),
    ("spain", "Spain"),
    ("ispanya", "Spain"),
    ("italian", "Italy"),
    ("italy", "Italy"),
    ("italya", "Italy"),
    ("greek", "Greece"),
    ("greece", "Greece"),
    ("yunanistan", "Greece"),
    ("japanese", "Japan"),
    ("japan", "Japan"),
    ("japonya", "Japan"),
    ("chinese", "China"),
    ("china", "China"),
    ("çin", "China"),
    ("indian", "India"),
    ("india", "India"),
    ("hindistan", "India"),
];

/// `keyword` at a word start, optionally inflected, ending at a word end
fn keyword_pattern(keyword: &str) -> String {
    format!(r"\b(?:{keyword})(?:['’]?(?:{INFLECTIONS})){{0,2}}\b")
}

static GENRE_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    GENRE_KEYWORDS
        .iter()
        .map(|(keyword, label)| {
            let re = Regex::new(&format!("(?i){}", keyword_pattern(&regex::escape(keyword))))
                .expect("genre keyword pattern");
            (re, *label)
        })
        .collect()
});

static COUNTRY_RE: Lazy<Regex> = Lazy::new(|| {
    let alternatives: Vec<String> = COUNTRY_KEYWORDS
        .iter()
        .map(|(keyword, _)| regex::escape(keyword))
        .collect();
    let pattern = keyword_pattern(&format!("({})", alternatives.join("|")));
    Regex::new(&format!("(?i){pattern}")).expect("country keyword pattern")
});

/// Year phrasing, strongest first
static YEAR_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)(?:first published|originally published)\s+(?:in\s+)?(\d{4})",
        r"(?i)(?:written|published)\s+(?:in\s+)?(\d{4})",
        r"(?i)(\d{4})\s+(?:yılında|yılı|year)\s+(?:yayınlandı|published|written)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("year pattern"))
    .collect()
});

static ORIGINAL_TITLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:original title|original name|originally published as|orijinal adı)[:\s]+([^()\n]+)")
        .expect("original title pattern")
});

static PARENTHETICAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([^)]+)\)").expect("parenthetical pattern"));

/// Canonical genre label for the first keyword found in `text`
pub fn detect_genre(text: &str) -> Option<&'static str> {
    let text = fold_dotted_i(text);
    GENRE_PATTERNS
        .iter()
        .find(|(re, _)| re.is_match(&text))
        .map(|(_, label)| *label)
}

/// Genre from a list of catalog categories or subjects
pub fn detect_genre_in<'a>(labels: impl IntoIterator<Item = &'a str>) -> Option<&'static str> {
    labels.into_iter().find_map(detect_genre)
}

/// Country label for the earliest nationality / country mention in `text`
pub fn detect_country(text: &str) -> Option<&'static str> {
    let text = fold_dotted_i(text);
    let keyword = COUNTRY_RE.captures(&text)?.get(1)?.as_str().to_lowercase();
    COUNTRY_KEYWORDS
        .iter()
        .find(|(k, _)| *k == keyword)
        .map(|(_, label)| *label)
}

/// First-publication year mentioned in `text`
pub fn extract_year(text: &str) -> Option<String> {
    YEAR_PATTERNS
        .iter()
        .find_map(|re| re.captures(text))
        .map(|caps| caps[1].to_string())
}

/// First `count` sentences, if the result is long enough to be useful
pub fn first_sentences(text: &str, count: usize) -> Option<String> {
    let sentences: Vec<&str> = text
        .split(|c| matches!(c, '.' | '!' | '?'))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(count)
        .collect();

    let joined = sentences.join(". ");
    if joined.chars().count() <= 20 {
        return None;
    }
    Some(format!("{joined}."))
}

/// Title following an explicit "original title:" phrase
pub fn labelled_original_title(text: &str) -> Option<String> {
    ORIGINAL_TITLE_RE
        .captures(text)
        .map(|caps| caps[1].trim().trim_end_matches([',', ';', '.']).trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Title from the first parenthetical, e.g. `(Russian: Война и мир, romanized: ...)`
///
/// Takes the first comma/semicolon segment and drops a leading `Language:`
/// tag. Parentheticals without letters (years, page ranges) are skipped.
pub fn parenthetical_title(text: &str) -> Option<String> {
    let inner = PARENTHETICAL_RE.captures(text)?.get(1)?.as_str();
    let segment = inner.split([',', ';']).next()?.trim();
    let title = match segment.split_once(':') {
        Some((_, rest)) => rest.trim(),
        None => segment,
    };
    if title.is_empty() || !title.chars().any(char::is_alphabetic) {
        return None;
    }
    Some(title.to_string())
}

/// Map `İ` (and the `i` + combining dot it lowercases to) onto plain `i`
///
/// Case-insensitive matching has no simple fold for `İ`, so "İngiltere"
/// would otherwise never meet the keyword "ingiltere".
fn fold_dotted_i(text: &str) -> Cow<'_, str> {
    if text.contains(['İ', '\u{0307}']) {
        Cow::Owned(text.replace('İ', "i").replace('\u{0307}', ""))
    } else {
        Cow::Borrowed(text)
    }
}

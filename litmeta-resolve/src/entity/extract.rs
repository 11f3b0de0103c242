//! Field extraction from knowledge-graph entity documents
//!
//! Works on the raw `Special:EntityData` JSON. Claims live under
//! `entities.<QID>.claims.<PID>[].mainsnak.datavalue.value`; deprecated
//! statements are skipped.

use serde_json::Value;

/// Publication date
pub const PUBLICATION_DATE: &str = "P577";
/// Title (monolingual text, tagged with its language)
pub const TITLE: &str = "P1476";
/// Narrower original-title style properties, in preference order
pub const ALTERNATE_TITLES: [&str; 3] = ["P1705", "P1680", "P1813"];
pub const COUNTRY_OF_ORIGIN: &str = "P495";
pub const COUNTRY: &str = "P17";
/// Language of work or name
pub const WORK_LANGUAGE: &str = "P407";

/// Sane bounds for a publication-date statement
const MIN_YEAR: i32 = 1000;
const MAX_YEAR: i32 = 3000;

/// Language item → language code, for the languages catalogued works most often use
const LANGUAGE_ITEMS: &[(&str, &str)] = &[
    ("Q7737", "ru"),
    ("Q1860", "en"),
    ("Q150", "fr"),
    ("Q188", "de"),
    ("Q1321", "es"),
    ("Q652", "it"),
    ("Q5146", "pt"),
    ("Q256", "tr"),
    ("Q9129", "el"),
    ("Q35497", "grc"),
    ("Q397", "la"),
    ("Q5287", "ja"),
    ("Q7850", "zh"),
    ("Q9176", "ko"),
    ("Q13955", "ar"),
    ("Q9168", "fa"),
    ("Q9288", "he"),
    ("Q8798", "uk"),
    ("Q809", "pl"),
    ("Q9027", "sv"),
];

/// Body of `qid` in an entity document
///
/// Falls back to the first entity, since redirects key the body by the
/// target identifier.
pub fn entity_body<'a>(doc: &'a Value, qid: &str) -> Option<&'a Value> {
    let entities = doc.get("entities")?.as_object()?;
    entities.get(qid).or_else(|| entities.values().next())
}

fn statements<'a>(entity: &'a Value, property: &str) -> impl Iterator<Item = &'a Value> {
    entity
        .get("claims")
        .and_then(|claims| claims.get(property))
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|claim| claim.get("rank").and_then(Value::as_str) != Some("deprecated"))
        .filter_map(|claim| claim.pointer("/mainsnak/datavalue/value"))
}

/// Year of a time value such as `+1869-00-00T00:00:00Z`
fn year_from_time(time: &str) -> Option<i32> {
    let raw = time.trim();
    let raw = raw.strip_prefix('+').unwrap_or(raw);
    let year: i32 = raw.split('-').next()?.parse().ok()?;
    (MIN_YEAR..=MAX_YEAR).contains(&year).then_some(year)
}

/// Earliest sane publication year across all date statements
///
/// Later statements usually record re-editions, so the minimum wins.
pub fn earliest_publication_year(entity: &Value) -> Option<i32> {
    statements(entity, PUBLICATION_DATE)
        .filter_map(|value| value.get("time").and_then(Value::as_str))
        .filter_map(year_from_time)
        .min()
}

/// Item identifier of an entity-valued statement
fn entity_id(value: &Value) -> Option<String> {
    if let Some(id) = value.get("id").and_then(Value::as_str) {
        return Some(id.to_string());
    }
    value
        .get("numeric-id")
        .and_then(Value::as_u64)
        .map(|n| format!("Q{n}"))
}

/// Text of a monolingual / string statement, with its language tag if any
fn text_value(value: &Value) -> Option<(String, Option<&str>)> {
    let (text, language) = match value {
        Value::String(s) => (s.as_str(), None),
        Value::Object(_) => (
            value.get("text").and_then(Value::as_str)?,
            value.get("language").and_then(Value::as_str),
        ),
        _ => return None,
    };
    let text = text.trim();
    (!text.is_empty()).then(|| (text.to_string(), language))
}

/// Language code of the work, from its language-of-work statement
pub fn work_language(entity: &Value) -> Option<&'static str> {
    statements(entity, WORK_LANGUAGE)
        .filter_map(entity_id)
        .find_map(|id| {
            LANGUAGE_ITEMS
                .iter()
                .find(|(item, _)| *item == id)
                .map(|(_, code)| *code)
        })
}

/// Label under the first preferred language, else any label
pub fn pick_label(entity: &Value, preferred: &[&str]) -> Option<String> {
    let labels = entity.get("labels")?.as_object()?;
    let label_of = |entry: &Value| {
        entry
            .get("value")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    preferred
        .iter()
        .filter_map(|lang| labels.get(*lang))
        .find_map(label_of)
        .or_else(|| labels.values().find_map(label_of))
}

/// Description in the first preferred language that has one
pub fn pick_description(entity: &Value, preferred: &[&str]) -> Option<String> {
    let descriptions = entity.get("descriptions")?;
    preferred.iter().find_map(|lang| {
        descriptions
            .get(*lang)
            .and_then(|d| d.get("value"))
            .and_then(Value::as_str)
            .map(str::to_string)
    })
}

/// Original title of the work
///
/// Order: a title statement tagged with the native language, any title
/// statement, the narrower title properties, then the label under
/// `label_preference`.
pub fn original_title(entity: &Value, native_language: Option<&str>, label_preference: &[&str]) -> Option<String> {
    let titles: Vec<(String, Option<&str>)> = statements(entity, TITLE).filter_map(text_value).collect();

    if let Some(native) = native_language {
        if let Some((text, _)) = titles.iter().find(|(_, lang)| *lang == Some(native)) {
            return Some(text.clone());
        }
    }
    if let Some((text, _)) = titles.into_iter().next() {
        return Some(text);
    }

    ALTERNATE_TITLES
        .iter()
        .find_map(|property| statements(entity, property).find_map(text_value))
        .map(|(text, _)| text)
        .or_else(|| pick_label(entity, label_preference))
}

/// Items that may hold the work's country, best first
///
/// Every country-of-origin value, then every country value, without repeats.
/// Callers walk the list until one item has a usable label.
pub fn country_items(entity: &Value) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for property in [COUNTRY_OF_ORIGIN, COUNTRY] {
        for id in statements(entity, property).filter_map(entity_id) {
            if !items.contains(&id) {
                items.push(id);
            }
        }
    }
    items
}

/// Identifier at the end of an entity URI (`http://www.wikidata.org/entity/Q42`)
pub fn qid_from_uri(uri: &str) -> Option<String> {
    let id = uri.trim().rsplit('/').next()?;
    let valid = id.len() > 1 && id.starts_with('Q') && id[1..].chars().all(|c| c.is_ascii_digit());
    valid.then(|| id.to_string())
}

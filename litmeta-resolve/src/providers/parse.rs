//! Lenient parsing of generative completions
//!
//! Models wrap JSON in prose, fence it, or stop mid-object when they run out
//! of tokens. Attempts, in order:
//!
//! 1. a fenced ```` ```json ```` block
//! 2. the first balanced `{...}` object
//! 3. the text from the first `{`, with missing closers appended
//! 4. per-field `"key": "value"` extraction

use crate::types::Field;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

static FENCED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("fenced block pattern"));

/// Field values found in a completion, keyed by field
///
/// Keys match either the field key (`first_published`) or its label
/// (`First Published`). Blank values and `...` placeholders are dropped.
pub fn parse_completion(content: &str) -> Option<BTreeMap<Field, String>> {
    if content.trim().is_empty() {
        return None;
    }

    let candidate = FENCED_RE
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .or_else(|| balanced_object(content).map(str::to_string))
        .or_else(|| auto_close(content));

    if let Some(json) = candidate.as_deref() {
        if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(json) {
            let fields = fields_from_object(&object);
            if !fields.is_empty() {
                return Some(fields);
            }
        }
    }

    let fields = scrape_fields(candidate.as_deref().unwrap_or(content));
    (!fields.is_empty()).then_some(fields)
}

fn fields_from_object(object: &Map<String, Value>) -> BTreeMap<Field, String> {
    object
        .iter()
        .filter_map(|(key, value)| {
            let field = Field::from_key(key)?;
            let text = match value {
                Value::String(s) => s.trim().to_string(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            is_meaningful(&text).then_some((field, text))
        })
        .collect()
}

/// First balanced object, ignoring braces inside string literals
fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Close a truncated object: terminate an open string, drop a dangling
/// separator, append missing braces
fn auto_close(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let mut json = text[start..].trim_end().to_string();

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    for c in json.chars() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => depth -= 1,
            _ => {}
        }
    }

    if in_string {
        json.push('"');
    }
    while json.ends_with(',') || json.ends_with(':') {
        json.pop();
        json = json.trim_end().to_string();
    }
    for _ in 0..depth.max(0) {
        json.push('}');
    }
    Some(json)
}

fn scrape_fields(text: &str) -> BTreeMap<Field, String> {
    let mut fields = BTreeMap::new();
    for field in Field::ALL {
        let pattern = format!(
            r#"(?i)"(?:{}|{})"\s*:\s*"([^"]*)""#,
            regex::escape(field.key()),
            regex::escape(field.label())
        );
        let Ok(re) = Regex::new(&pattern) else {
            continue;
        };
        if let Some(value) = re.captures(text).map(|caps| caps[1].trim().to_string()) {
            if is_meaningful(&value) {
                fields.insert(field, value);
            }
        }
    }
    fields
}

fn is_meaningful(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && value != "..." && !value.eq_ignore_ascii_case("unknown")
}

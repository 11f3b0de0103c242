//! Record and provenance/status model
//!
//! A [`Record`] is the unit of resolution: one work's identifying fields, its
//! value fields, a provenance entry per non-empty value, and the status columns
//! the caller persists between passes.
//!
//! Invariants maintained by the mutators here:
//! - a non-empty value is never overwritten
//! - every non-empty value has a provenance entry
//! - `status == OK` exactly when `missing_fields` is empty
//! - `next_retry_at` is set exactly when `status != OK`

use crate::types::{Field, Provenance};
use chrono::{DateTime, Utc};
use litmeta_common::time;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// Provenance source recorded for values supplied by the caller
pub const MANUAL_SOURCE: &str = "manual";

/// Separator for the `missing_fields` column
pub const MISSING_FIELDS_SEPARATOR: &str = ";";

/// Terminal status of a resolution pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStatus {
    /// Every field resolved
    Ok,
    /// Some fields resolved
    Partial,
    /// Nothing resolved
    Fail,
}

impl ResolutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStatus::Ok => "OK",
            ResolutionStatus::Partial => "PARTIAL",
            ResolutionStatus::Fail => "FAIL",
        }
    }
}

impl fmt::Display for ResolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OK" => Ok(ResolutionStatus::Ok),
            "PARTIAL" => Ok(ResolutionStatus::Partial),
            "FAIL" => Ok(ResolutionStatus::Fail),
            other => Err(format!("unknown resolution status: {other}")),
        }
    }
}

/// One work's metadata plus provenance and status bookkeeping
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub title: String,
    pub author: String,
    values: BTreeMap<Field, String>,
    provenance: BTreeMap<Field, Provenance>,
    pub status: Option<ResolutionStatus>,
    pub missing_fields: Vec<Field>,
    pub retry_count: u32,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub best_source: Option<String>,
    /// Knowledge-graph identifier of the work
    pub canonical_id: Option<String>,
}

impl Record {
    /// New record with identifying fields only
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            ..Self::default()
        }
    }

    /// New record carrying caller-supplied values (manual provenance)
    pub fn with_existing<I, S>(title: impl Into<String>, author: impl Into<String>, existing: I) -> Self
    where
        I: IntoIterator<Item = (Field, S)>,
        S: Into<String>,
    {
        let mut record = Self::new(title, author);
        for (field, value) in existing {
            record.set_field(field, value, Provenance::new(MANUAL_SOURCE, 1.0));
        }
        record
    }

    /// Current non-empty value of a field
    pub fn value(&self, field: Field) -> Option<&str> {
        self.values
            .get(&field)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn is_set(&self, field: Field) -> bool {
        self.value(field).is_some()
    }

    pub fn provenance(&self, field: Field) -> Option<&Provenance> {
        self.provenance.get(&field)
    }

    /// Non-empty values, in field order
    pub fn values(&self) -> impl Iterator<Item = (Field, &str)> {
        Field::ALL
            .into_iter()
            .filter_map(move |field| self.value(field).map(|v| (field, v)))
    }

    /// Fields with no value yet
    pub fn empty_fields(&self) -> Vec<Field> {
        Field::ALL.into_iter().filter(|f| !self.is_set(*f)).collect()
    }

    /// Commit a value unless the field already holds one
    ///
    /// Returns `true` if the value was written. Blank values are ignored.
    pub fn set_field(&mut self, field: Field, value: impl Into<String>, provenance: Provenance) -> bool {
        let value = value.into();
        let value = value.trim();
        if value.is_empty() || self.is_set(field) {
            return false;
        }
        self.values.insert(field, value.to_string());
        self.provenance.insert(field, provenance);
        true
    }

    /// Compute status and retry bookkeeping at the end of a pass
    pub fn finish_pass(&mut self, now: DateTime<Utc>, backoff_hours: u32, best_source: Option<String>) {
        let missing = self.empty_fields();

        let status = if missing.is_empty() {
            ResolutionStatus::Ok
        } else if missing.len() < Field::ALL.len() {
            ResolutionStatus::Partial
        } else {
            ResolutionStatus::Fail
        };

        self.status = Some(status);
        self.missing_fields = missing;
        self.last_attempt_at = Some(now);

        if status == ResolutionStatus::Ok {
            self.retry_count = 0;
            self.next_retry_at = None;
        } else {
            self.retry_count = self.retry_count.saturating_add(1);
            self.next_retry_at = Some(time::hours_after(now, backoff_hours.max(1)));
        }

        if best_source.is_some() {
            self.best_source = best_source;
        }
    }

    /// Whether the record is fully resolved and needs no further pass
    pub fn is_complete(&self) -> bool {
        self.status == Some(ResolutionStatus::Ok) && self.empty_fields().is_empty()
    }

    /// Flatten into the persisted column layout
    ///
    /// Value columns use [`Field::key`]; provenance goes to `src_<key>` and
    /// `conf_<key>` (two decimals); status columns follow.
    pub fn to_row(&self) -> BTreeMap<String, String> {
        let mut row = BTreeMap::new();
        row.insert("title".to_string(), self.title.clone());
        row.insert("author".to_string(), self.author.clone());

        for field in Field::ALL {
            let key = field.key();
            row.insert(key.to_string(), self.value(field).unwrap_or_default().to_string());
            let (src, conf) = match (self.value(field), self.provenance(field)) {
                (Some(_), Some(p)) => (p.source.clone(), format!("{:.2}", p.confidence)),
                _ => (String::new(), String::new()),
            };
            row.insert(format!("src_{key}"), src);
            row.insert(format!("conf_{key}"), conf);
        }

        row.insert(
            "status".to_string(),
            self.status.map(|s| s.to_string()).unwrap_or_default(),
        );
        row.insert(
            "missing_fields".to_string(),
            self.missing_fields
                .iter()
                .map(Field::key)
                .collect::<Vec<_>>()
                .join(MISSING_FIELDS_SEPARATOR),
        );
        row.insert(
            "last_attempt_at".to_string(),
            self.last_attempt_at.as_ref().map(time::format_timestamp).unwrap_or_default(),
        );
        row.insert("retry_count".to_string(), self.retry_count.to_string());
        row.insert(
            "next_retry_at".to_string(),
            self.next_retry_at.as_ref().map(time::format_timestamp).unwrap_or_default(),
        );
        row.insert("best_source".to_string(), self.best_source.clone().unwrap_or_default());
        row.insert("canonical_id".to_string(), self.canonical_id.clone().unwrap_or_default());
        row
    }

    /// Rebuild a record from persisted columns
    ///
    /// Unknown columns are ignored; unparseable status or timestamps are
    /// treated as absent. A value without a `src_<key>` column is attributed
    /// to the caller.
    pub fn from_row(row: &HashMap<String, String>) -> Self {
        let get = |key: &str| row.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        let mut record = Record::new(get("title").unwrap_or_default(), get("author").unwrap_or_default());

        for field in Field::ALL {
            let key = field.key();
            if let Some(value) = get(key) {
                let source = get(&format!("src_{key}")).unwrap_or(MANUAL_SOURCE);
                let confidence = get(&format!("conf_{key}"))
                    .and_then(|c| c.parse::<f32>().ok())
                    .unwrap_or(1.0);
                record.set_field(field, value, Provenance::new(source, confidence));
            }
        }

        record.status = get("status").and_then(|s| s.parse().ok());
        record.missing_fields = get("missing_fields")
            .map(|raw| {
                raw.split(MISSING_FIELDS_SEPARATOR)
                    .filter_map(Field::from_key)
                    .collect()
            })
            .unwrap_or_default();
        record.retry_count = get("retry_count").and_then(|c| c.parse().ok()).unwrap_or(0);
        record.last_attempt_at = get("last_attempt_at").and_then(time::parse_timestamp);
        record.next_retry_at = get("next_retry_at").and_then(time::parse_timestamp);
        record.best_source = get("best_source").map(str::to_string);
        record.canonical_id = get("canonical_id").map(str::to_string);
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_set_field_never_overwrites() {
        let mut record = Record::new("Suç ve Ceza", "Dostoyevski");
        assert!(record.set_field(Field::Genre, "Novel", Provenance::new("wiki_foreign", 0.7)));
        assert!(!record.set_field(Field::Genre, "Poetry", Provenance::new("wikidata", 0.9)));
        assert_eq!(record.value(Field::Genre), Some("Novel"));
        assert_eq!(record.provenance(Field::Genre).unwrap().source, "wiki_foreign");
    }

    #[test]
    fn test_blank_value_is_not_committed() {
        let mut record = Record::new("t", "a");
        assert!(!record.set_field(Field::Synopsis, "   ", Provenance::new("x", 0.5)));
        assert!(record.provenance(Field::Synopsis).is_none());
    }

    #[test]
    fn test_existing_values_get_manual_provenance() {
        let record = Record::with_existing("t", "a", [(Field::Genre, "Novel"), (Field::Synopsis, "")]);
        assert_eq!(record.provenance(Field::Genre).unwrap().source, MANUAL_SOURCE);
        assert!(!record.is_set(Field::Synopsis));
    }

    #[test]
    fn test_finish_pass_statuses() {
        let mut record = Record::new("t", "a");
        record.finish_pass(at(10), 6, None);
        assert_eq!(record.status, Some(ResolutionStatus::Fail));
        assert_eq!(record.retry_count, 1);
        assert_eq!(record.next_retry_at, Some(at(16)));

        record.set_field(Field::Genre, "Novel", Provenance::new("x", 0.7));
        record.finish_pass(at(17), 6, Some("x".into()));
        assert_eq!(record.status, Some(ResolutionStatus::Partial));
        assert_eq!(record.retry_count, 2);

        for field in Field::ALL {
            record.set_field(field, "v", Provenance::new("x", 0.7));
        }
        record.finish_pass(at(23), 6, None);
        assert_eq!(record.status, Some(ResolutionStatus::Ok));
        assert!(record.missing_fields.is_empty());
        assert_eq!(record.retry_count, 0);
        assert_eq!(record.next_retry_at, None);
        // Previous best source kept when the pass names none
        assert_eq!(record.best_source.as_deref(), Some("x"));
    }

    #[test]
    fn test_row_columns() {
        let mut record = Record::new("Savaş ve Barış", "Tolstoy");
        record.set_field(Field::FirstPublished, "1869", Provenance::new("wikidata", 0.9));
        record.canonical_id = Some("Q161531".into());
        record.finish_pass(at(8), 6, Some("wikidata".into()));

        let row = record.to_row();
        assert_eq!(row["first_published"], "1869");
        assert_eq!(row["src_first_published"], "wikidata");
        assert_eq!(row["conf_first_published"], "0.90");
        assert_eq!(row["src_genre"], "");
        assert_eq!(row["status"], "PARTIAL");
        assert_eq!(
            row["missing_fields"],
            "original_title;genre;country_tradition;narrated_period;synopsis"
        );
        assert_eq!(row["last_attempt_at"], "2024-03-01T08:00:00Z");
        assert_eq!(row["next_retry_at"], "2024-03-01T14:00:00Z");
        assert_eq!(row["retry_count"], "1");
        assert_eq!(row["canonical_id"], "Q161531");
    }

    #[test]
    fn test_from_row_restores_record() {
        let mut record = Record::new("Savaş ve Barış", "Tolstoy");
        record.set_field(Field::OriginalTitle, "Война и мир", Provenance::new("wikidata", 0.85));
        record.finish_pass(at(8), 6, Some("wikidata".into()));

        let row: HashMap<String, String> = record.to_row().into_iter().collect();
        assert_eq!(Record::from_row(&row), record);
    }

    #[test]
    fn test_from_row_tolerates_bad_columns() {
        let row: HashMap<String, String> = [
            ("title", "t"),
            ("genre", "Novel"),
            ("status", "MAYBE"),
            ("retry_count", "x"),
            ("next_retry_at", "yesterday"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let record = Record::from_row(&row);
        assert_eq!(record.status, None);
        assert_eq!(record.retry_count, 0);
        assert_eq!(record.next_retry_at, None);
        assert_eq!(record.provenance(Field::Genre).unwrap().source, MANUAL_SOURCE);
    }
}

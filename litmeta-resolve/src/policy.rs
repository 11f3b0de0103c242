//! Field policy registry
//!
//! Static per-field configuration: which structured sources are trusted for a
//! field (highest trust first), the gate a candidate must pass, and the
//! confidence recorded when a value is committed.
//!
//! The knowledge graph leads for dates and country, encyclopedia summaries
//! lead for synopsis. Generative fallback is not listed here; it runs after
//! every structured source.

use crate::error::{ResolveError, ResolveResult};
use crate::gates::GateKind;
use crate::types::{Field, SourceId};

/// Resolution rule for one field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRule {
    pub field: Field,
    /// Trusted sources, highest trust first
    pub sources: Vec<SourceId>,
    /// Gate every candidate must pass
    pub gate: Option<GateKind>,
    /// Confidence recorded for a committed value (0.0-1.0)
    pub default_confidence: f32,
}

impl FieldRule {
    pub fn new(field: Field, sources: &[SourceId], gate: Option<GateKind>, confidence: f32) -> Self {
        Self {
            field,
            sources: sources.to_vec(),
            gate,
            default_confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// Lookup from field to its rule
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPolicy {
    rules: Vec<FieldRule>,
}

impl FieldPolicy {
    /// The standard source-priority table
    pub fn standard() -> Self {
        use SourceId::*;

        Self::from_rules(vec![
            FieldRule::new(
                Field::FirstPublished,
                &[Wikidata, ForeignWiki, LocalWiki, OpenLibrary, GoogleBooks],
                Some(GateKind::PublicationYear),
                0.9,
            ),
            FieldRule::new(
                Field::OriginalTitle,
                &[Wikidata, ForeignWiki, LocalWiki, OpenLibrary, GoogleBooks],
                Some(GateKind::OriginalTitle),
                0.85,
            ),
            FieldRule::new(
                Field::CountryTradition,
                &[Wikidata, ForeignWiki, LocalWiki],
                None,
                0.85,
            ),
            FieldRule::new(
                Field::Genre,
                &[ForeignWiki, LocalWiki, GoogleBooks, OpenLibrary],
                None,
                0.7,
            ),
            // No structured source reports the narrated period
            FieldRule::new(Field::NarratedPeriod, &[], None, 0.6),
            FieldRule::new(
                Field::Synopsis,
                &[LocalWiki, ForeignWiki, GoogleBooks, OpenLibrary],
                None,
                0.7,
            ),
        ])
    }

    /// Build a policy from explicit rules (later rules for the same field win)
    pub fn from_rules(rules: Vec<FieldRule>) -> Self {
        let mut deduped: Vec<FieldRule> = Vec::with_capacity(rules.len());
        for rule in rules {
            match deduped.iter_mut().find(|r| r.field == rule.field) {
                Some(existing) => *existing = rule,
                None => deduped.push(rule),
            }
        }
        Self { rules: deduped }
    }

    /// Rule for a field
    ///
    /// # Errors
    /// [`ResolveError::MissingRule`] if the field has no rule.
    pub fn rule(&self, field: Field) -> ResolveResult<&FieldRule> {
        self.rules
            .iter()
            .find(|rule| rule.field == field)
            .ok_or(ResolveError::MissingRule(field))
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    /// Check that every resolvable field has a rule
    pub fn validate(&self) -> ResolveResult<()> {
        for field in Field::ALL {
            self.rule(field)?;
        }
        Ok(())
    }
}

impl Default for FieldPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_policy_covers_every_field() {
        let policy = FieldPolicy::standard();
        assert!(policy.validate().is_ok());
        assert_eq!(policy.rules().len(), Field::ALL.len());
    }

    #[test]
    fn test_knowledge_graph_leads_for_dates_and_country() {
        let policy = FieldPolicy::standard();
        for field in [Field::FirstPublished, Field::CountryTradition, Field::OriginalTitle] {
            assert_eq!(policy.rule(field).unwrap().sources[0], SourceId::Wikidata);
        }
        assert_eq!(policy.rule(Field::Synopsis).unwrap().sources[0], SourceId::LocalWiki);
    }

    #[test]
    fn test_gates_attached_to_year_and_title() {
        let policy = FieldPolicy::standard();
        assert_eq!(
            policy.rule(Field::FirstPublished).unwrap().gate,
            Some(GateKind::PublicationYear)
        );
        assert_eq!(
            policy.rule(Field::OriginalTitle).unwrap().gate,
            Some(GateKind::OriginalTitle)
        );
        assert_eq!(policy.rule(Field::Genre).unwrap().gate, None);
    }

    #[test]
    fn test_missing_rule_is_error() {
        let policy = FieldPolicy::from_rules(vec![FieldRule::new(Field::Genre, &[], None, 0.7)]);
        assert!(matches!(
            policy.rule(Field::Synopsis),
            Err(ResolveError::MissingRule(Field::Synopsis))
        ));
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_later_rule_replaces_earlier() {
        let policy = FieldPolicy::from_rules(vec![
            FieldRule::new(Field::Genre, &[SourceId::GoogleBooks], None, 0.7),
            FieldRule::new(Field::Genre, &[], None, 1.4),
        ]);
        let rule = policy.rule(Field::Genre).unwrap();
        assert!(rule.sources.is_empty());
        assert_eq!(rule.default_confidence, 1.0);
    }
}

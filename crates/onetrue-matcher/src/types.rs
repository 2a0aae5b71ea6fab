//! Request and result types for matching

use onetrue_domain::{AddressRecord, CandidateAnalysis, FieldValue, SearchCriteria, SourceType};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Candidates found for one input address
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    /// Search terms parsed from the input
    pub criteria: SearchCriteria,

    /// Golden source candidates, descending by score
    pub golden_source_matches: Vec<AddressRecord>,

    /// Internal candidates, descending by score
    pub internal_matches: Vec<AddressRecord>,

    /// Total candidates across both sources
    pub total_matches: usize,
}

/// Structured verdict recovered from an adjudication reply
///
/// Every field the reply might omit or garble is optional here; defaults are
/// applied where the verdict is used.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdjudicationVerdict {
    /// Whether the model considers any candidate a match (absent = true)
    pub match_found: bool,

    /// Source of the chosen candidate, if recognized
    pub best_match_source: Option<SourceType>,

    /// 1-based index of the chosen candidate within its source
    pub best_match_index: Option<usize>,

    /// Confidence in the chosen candidate, clamped to [0, 100]
    pub confidence: Option<f64>,

    /// Explanation of the choice
    pub reasoning: Option<String>,

    /// Any concerns raised
    pub concerns: Option<String>,

    /// Per-candidate notes keyed by source and 1-based index
    pub analyses: BTreeMap<(SourceType, usize), CandidateAnalysis>,
}

/// How the adjudication step concluded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjudicationOutcome {
    /// A structured verdict was recovered and applied
    Reviewed,
    /// The reply could not be parsed; fuzzy result used
    Unparsed,
    /// The request failed; fuzzy result used
    Failed,
}

impl AdjudicationOutcome {
    /// Outcome name as reported in results
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjudicationOutcome::Reviewed => "reviewed",
            AdjudicationOutcome::Unparsed => "unparsed",
            AdjudicationOutcome::Failed => "failed",
        }
    }
}

impl fmt::Display for AdjudicationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The adjudicator's decision, or its fallback
#[derive(Debug, Clone)]
pub struct Adjudication {
    /// How the step concluded
    pub outcome: AdjudicationOutcome,

    /// Chosen candidate (top fuzzy candidate on fallback)
    pub best_match: AddressRecord,

    /// Confidence in the chosen candidate
    pub confidence: f64,

    /// Human-readable explanation
    pub reasoning: String,

    /// Concerns raised by the model
    pub concerns: Option<String>,

    /// Score of the top fuzzy candidate
    pub fuzzy_score: f64,

    /// The verdict's own `match_found`; `None` on fallback
    pub verdict_match_found: Option<bool>,

    /// Number of candidates that received a per-candidate note
    pub analyses_attached: usize,
}

/// Summary of the adjudication step carried in a [`MatchResult`]
#[derive(Debug, Clone, PartialEq)]
pub struct AdjudicationSummary {
    /// How the step concluded
    pub outcome: AdjudicationOutcome,

    /// Reasoning model used
    pub model: String,

    /// Score of the top fuzzy candidate
    pub fuzzy_score: f64,

    /// Concerns raised by the model
    pub concerns: Option<String>,

    /// The verdict's own `match_found`; `None` on fallback
    pub match_found: Option<bool>,
}

/// Deterministic secondary lookup and exact-match check for a golden match
#[derive(Debug, Clone)]
pub struct Verification {
    /// Table the lookup ran against
    pub table: String,

    /// Rows sharing street number, core street name and state
    pub candidates: Vec<AddressRecord>,

    /// Whether one candidate equals the golden match on all four fields
    pub is_exact_match: bool,

    /// The first exactly-equal candidate
    pub matched_record: Option<AddressRecord>,
}

/// How the result was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    /// Fuzzy retrieval only (nothing to adjudicate)
    FuzzyMatch,
    /// Fuzzy retrieval followed by adjudication
    FuzzyMatchWithAi,
}

impl SearchMethod {
    /// Method name as reported in results
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMethod::FuzzyMatch => "fuzzy_match",
            SearchMethod::FuzzyMatchWithAi => "fuzzy_match_with_ai",
        }
    }
}

/// Final decision for one input address
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// Address as supplied
    pub input_address: String,

    /// Whether any candidate was found
    pub match_found: bool,

    /// Chosen candidate
    pub best_match: Option<AddressRecord>,

    /// All golden source candidates
    pub golden_source_matches: Vec<AddressRecord>,

    /// All internal candidates
    pub internal_matches: Vec<AddressRecord>,

    /// Whether the golden source produced candidates
    pub has_golden_source: bool,

    /// Whether the internal table produced candidates
    pub has_internal: bool,

    /// Confidence in the chosen candidate
    pub confidence: f64,

    /// Human-readable explanation
    pub reasoning: String,

    /// Confidence fell below the threshold; recommend manual review
    pub business_rule_exception: bool,

    /// Threshold the confidence was compared against
    pub confidence_threshold: f64,

    /// Total candidates across both sources
    pub candidates_searched: usize,

    /// How the result was produced
    pub search_method: SearchMethod,

    /// Adjudication summary, absent when nothing was adjudicated
    pub adjudication: Option<AdjudicationSummary>,

    /// Secondary lookup, present when the best match is a golden source row
    pub verification: Option<Verification>,
}

fn field_to_json(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Integer(i) => json!(i),
        FieldValue::Real(r) => serde_json::Number::from_f64(*r).map_or(Value::Null, Value::Number),
        FieldValue::Text(s) => json!(s),
    }
}

/// Render a record as a JSON object: its columns plus `_`-prefixed metadata
pub fn record_to_json(record: &AddressRecord) -> Value {
    let mut object = Map::new();
    for (column, value) in record.fields() {
        object.insert(column.clone(), field_to_json(value));
    }
    object.insert("_canonical".to_string(), json!(record.canonical_text()));
    object.insert("_similarity_score".to_string(), json!(record.similarity_score()));
    object.insert("_source_type".to_string(), json!(record.source_type().as_str()));
    object.insert("_source_table".to_string(), json!(record.source_table()));
    if let Some(analysis) = record.ai_analysis() {
        object.insert(
            "_ai_analysis".to_string(),
            json!({
                "assessment": analysis.assessment,
                "confidence": analysis.confidence,
            }),
        );
    }
    Value::Object(object)
}

impl MatchResult {
    /// JSON view of the result
    pub fn to_json(&self) -> Value {
        let records = |list: &[AddressRecord]| list.iter().map(record_to_json).collect::<Vec<_>>();

        json!({
            "input_address": self.input_address,
            "match_found": self.match_found,
            "best_match": self.best_match.as_ref().map(record_to_json),
            "golden_source_matches": records(&self.golden_source_matches),
            "internal_matches": records(&self.internal_matches),
            "has_golden_source": self.has_golden_source,
            "has_internal": self.has_internal,
            "confidence": self.confidence,
            "reasoning": self.reasoning,
            "business_rule_exception": self.business_rule_exception,
            "confidence_threshold": self.confidence_threshold,
            "candidates_searched": self.candidates_searched,
            "search_method": self.search_method.as_str(),
            "adjudication": self.adjudication.as_ref().map(|a| json!({
                "outcome": a.outcome.as_str(),
                "model": a.model,
                "fuzzy_score": a.fuzzy_score,
                "concerns": a.concerns,
                "match_found": a.match_found,
            })),
            "verification": self.verification.as_ref().map(|v| json!({
                "table": v.table,
                "candidates": records(&v.candidates),
                "is_exact_match": v.is_exact_match,
                "matched_record": v.matched_record.as_ref().map(record_to_json),
            })),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onetrue_domain::ColumnMapping;

    #[test]
    fn test_record_to_json() {
        let columns = ["address1", "Mailing City", "state", "zipcode"];
        let mut record = AddressRecord::new(
            vec![
                ("address1".to_string(), FieldValue::from("100 Main St")),
                ("Mailing City".to_string(), FieldValue::from("Tampa")),
                ("state".to_string(), FieldValue::Null),
                ("zipcode".to_string(), FieldValue::Integer(33701)),
            ],
            ColumnMapping::discover(&columns),
            SourceType::GoldenSource,
            "public.addresses",
        )
        .with_similarity_score(88.5);
        record.attach_analysis(CandidateAnalysis {
            assessment: "Same street".to_string(),
            confidence: Some(92.0),
        });

        let json = record_to_json(&record);
        assert_eq!(json["address1"], "100 Main St");
        assert_eq!(json["state"], Value::Null);
        assert_eq!(json["zipcode"], 33701);
        assert_eq!(json["_similarity_score"], 88.5);
        assert_eq!(json["_source_type"], "golden_source");
        assert_eq!(json["_source_table"], "public.addresses");
        assert_eq!(json["_canonical"], "100 Main St, Tampa, 33701");
        assert_eq!(json["_ai_analysis"]["confidence"], 92.0);
    }

    #[test]
    fn test_enum_names() {
        assert_eq!(SearchMethod::FuzzyMatchWithAi.as_str(), "fuzzy_match_with_ai");
        assert_eq!(AdjudicationOutcome::Unparsed.to_string(), "unparsed");
        assert_eq!(
            serde_json::to_value(SearchMethod::FuzzyMatch).unwrap(),
            Value::String("fuzzy_match".to_string())
        );
    }
}

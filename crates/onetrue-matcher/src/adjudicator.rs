//! Reasoning-model adjudication of fuzzy candidates
//!
//! The adjudicator never fails. A request error or an unreadable reply
//! degrades to the top-ranked fuzzy candidate with its own similarity score
//! as the confidence, and the reason is carried in the reasoning text.

use crate::merge::{self, RankedCandidate};
use crate::parser::{parse_response, ParsedResponse};
use crate::prompt::PromptBuilder;
use crate::types::{Adjudication, AdjudicationOutcome, AdjudicationVerdict};
use onetrue_domain::traits::LlmProvider;
use onetrue_domain::{AddressRecord, SourceType};
use std::fmt::Display;
use tracing::{debug, info, warn};

const DEFAULT_REVIEWED_REASONING: &str = "The model reviewed the matches";
const DEFAULT_NO_MATCH_REASONING: &str = "Fuzzy match result";

/// Sends the top candidates of each source to a reasoning model and applies
/// its verdict
pub struct Adjudicator<'a, L> {
    llm: &'a L,
}

impl<'a, L> Adjudicator<'a, L>
where
    L: LlmProvider,
    L::Error: Display,
{
    /// Create an adjudicator over a provider
    pub fn new(llm: &'a L) -> Self {
        Self { llm }
    }

    /// Adjudicate between ranked candidate lists
    ///
    /// Each list is truncated to `top_n` before prompting. Per-candidate
    /// notes from the verdict are attached in place to the truncated
    /// candidates. Returns `None`, without contacting the model, when both
    /// lists are empty.
    pub fn adjudicate(
        &self,
        input_address: &str,
        golden_source: &mut [AddressRecord],
        internal: &mut [AddressRecord],
        top_n: usize,
    ) -> Option<Adjudication> {
        let golden_len = golden_source.len().min(top_n);
        let internal_len = internal.len().min(top_n);
        let golden_source = &mut golden_source[..golden_len];
        let internal = &mut internal[..internal_len];

        let ranked = merge::merge(golden_source, internal);
        let top = *ranked.first()?;

        let prompt = PromptBuilder::new(input_address, golden_source, internal).build();
        debug!("Adjudication prompt length: {} chars", prompt.len());

        let response = match self.llm.generate(&prompt) {
            Ok(response) => response,
            Err(e) => {
                warn!("Adjudication request failed, using fuzzy result: {}", e);
                return Some(Self::fallback(
                    AdjudicationOutcome::Failed,
                    format!("Using fuzzy match result (adjudication failed: {})", e),
                    top,
                    golden_source,
                    internal,
                ));
            }
        };
        debug!("Adjudication response length: {} chars", response.len());

        let mut verdict = match parse_response(&response) {
            ParsedResponse::Parsed(verdict) => verdict,
            ParsedResponse::Unparsed(_) => {
                warn!("Adjudication response could not be parsed, using fuzzy result");
                return Some(Self::fallback(
                    AdjudicationOutcome::Unparsed,
                    "Using fuzzy match result (adjudication unavailable)".to_string(),
                    top,
                    golden_source,
                    internal,
                ));
            }
        };

        let analyses_attached = Self::attach_analyses(&mut verdict, golden_source, internal);
        info!(
            "Attached {} analyses ({} golden source, {} internal candidates reviewed)",
            analyses_attached,
            golden_source.len(),
            internal.len()
        );

        let fuzzy_score = top.score;
        let (best_match, confidence, reasoning) = if verdict.match_found {
            let pick = Self::resolve_pick(&verdict, golden_source, internal).unwrap_or(top);
            (
                Self::record_at(pick, golden_source, internal).clone(),
                verdict.confidence.unwrap_or(fuzzy_score),
                verdict
                    .reasoning
                    .take()
                    .unwrap_or_else(|| DEFAULT_REVIEWED_REASONING.to_string()),
            )
        } else {
            info!("Model found no convincing match, keeping top fuzzy candidate");
            (
                Self::record_at(top, golden_source, internal).clone(),
                fuzzy_score,
                verdict
                    .reasoning
                    .take()
                    .unwrap_or_else(|| DEFAULT_NO_MATCH_REASONING.to_string()),
            )
        };

        Some(Adjudication {
            outcome: AdjudicationOutcome::Reviewed,
            best_match,
            confidence,
            reasoning,
            concerns: verdict.concerns.take(),
            fuzzy_score,
            verdict_match_found: Some(verdict.match_found),
            analyses_attached,
        })
    }

    fn fallback(
        outcome: AdjudicationOutcome,
        reasoning: String,
        top: RankedCandidate,
        golden_source: &[AddressRecord],
        internal: &[AddressRecord],
    ) -> Adjudication {
        Adjudication {
            outcome,
            best_match: Self::record_at(top, golden_source, internal).clone(),
            confidence: top.score,
            reasoning,
            concerns: None,
            fuzzy_score: top.score,
            verdict_match_found: None,
            analyses_attached: 0,
        }
    }

    fn record_at<'r>(
        candidate: RankedCandidate,
        golden_source: &'r [AddressRecord],
        internal: &'r [AddressRecord],
    ) -> &'r AddressRecord {
        match candidate.source {
            SourceType::GoldenSource => &golden_source[candidate.index],
            SourceType::Internal => &internal[candidate.index],
        }
    }

    /// Translate the verdict's 1-based pick into a checked 0-based position
    fn resolve_pick(
        verdict: &AdjudicationVerdict,
        golden_source: &[AddressRecord],
        internal: &[AddressRecord],
    ) -> Option<RankedCandidate> {
        let (Some(source), Some(index)) = (verdict.best_match_source, verdict.best_match_index) else {
            warn!("Verdict names no usable best match, using top fuzzy candidate");
            return None;
        };
        let list = match source {
            SourceType::GoldenSource => golden_source,
            SourceType::Internal => internal,
        };
        match index.checked_sub(1).and_then(|i| list.get(i).map(|r| (i, r))) {
            Some((index, record)) => Some(RankedCandidate {
                source,
                index,
                score: record.similarity_score(),
            }),
            None => {
                warn!(
                    "Verdict picked {}-{} but only {} candidates were sent, using top fuzzy candidate",
                    source.label(),
                    index,
                    list.len()
                );
                None
            }
        }
    }

    /// Attach per-candidate notes, skipping indices outside the sent lists
    fn attach_analyses(
        verdict: &mut AdjudicationVerdict,
        golden_source: &mut [AddressRecord],
        internal: &mut [AddressRecord],
    ) -> usize {
        let mut attached = 0;
        for ((source, index), analysis) in std::mem::take(&mut verdict.analyses) {
            let list = match source {
                SourceType::GoldenSource => &mut *golden_source,
                SourceType::Internal => &mut *internal,
            };
            match index.checked_sub(1).and_then(|i| list.get_mut(i)) {
                Some(record) => {
                    record.attach_analysis(analysis);
                    attached += 1;
                }
                None => debug!("No candidate {}-{} for analysis", source.label(), index),
            }
        }
        attached
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onetrue_domain::{ColumnMapping, FieldValue};
    use onetrue_llm::MockProvider;

    fn record(source: SourceType, text: &str, score: f64) -> AddressRecord {
        AddressRecord::new(
            vec![("MasterAddress".to_string(), FieldValue::from(text))],
            ColumnMapping::discover(&["MasterAddress"]),
            source,
            "t",
        )
        .with_similarity_score(score)
    }

    fn candidates() -> (Vec<AddressRecord>, Vec<AddressRecord>) {
        (
            vec![
                record(SourceType::GoldenSource, "77 Village Ln, Largo, FL", 92.0),
                record(SourceType::GoldenSource, "79 Village Ln, Largo, FL", 85.0),
            ],
            vec![
                record(SourceType::Internal, "77 VILLAGE RD, LARGO, FL", 95.0),
                record(SourceType::Internal, "77 Village Road, Largo, FL", 88.0),
                record(SourceType::Internal, "177 Village Rd, Largo, FL", 80.0),
            ],
        )
    }

    #[test]
    fn test_no_candidates_no_request() {
        let llm = MockProvider::new("{}");
        let adjudicator = Adjudicator::new(&llm);
        assert!(adjudicator.adjudicate("x", &mut [], &mut [], 10).is_none());
        assert_eq!(llm.call_count(), 0);
    }

    #[test]
    fn test_verdict_pick_applied() {
        let llm = MockProvider::new(
            r#"{"match_found": true, "best_match_source": "golden_source", "best_match_index": 2,
                "confidence": 87, "reasoning": "Closest number", "concerns": "Unit unknown"}"#,
        );
        let (mut golden, mut internal) = candidates();
        let adjudication = Adjudicator::new(&llm)
            .adjudicate("79 Village Ln, Largo, FL", &mut golden, &mut internal, 10)
            .unwrap();

        assert_eq!(adjudication.outcome, AdjudicationOutcome::Reviewed);
        assert_eq!(adjudication.best_match.canonical_text(), "79 Village Ln, Largo, FL");
        assert_eq!(adjudication.confidence, 87.0);
        assert_eq!(adjudication.reasoning, "Closest number");
        assert_eq!(adjudication.concerns.as_deref(), Some("Unit unknown"));
        assert_eq!(adjudication.fuzzy_score, 95.0);
        assert_eq!(adjudication.verdict_match_found, Some(true));
        assert_eq!(llm.call_count(), 1);
    }

    #[test]
    fn test_out_of_range_index_falls_back_to_top() {
        let llm = MockProvider::new(r#"{"best_match_source": "internal", "best_match_index": 5, "confidence": 70}"#);
        let (mut golden, mut internal) = candidates();
        let adjudication = Adjudicator::new(&llm)
            .adjudicate("77 Village Rd", &mut golden, &mut internal, 10)
            .unwrap();
        assert_eq!(adjudication.best_match.canonical_text(), "77 VILLAGE RD, LARGO, FL");
        assert_eq!(adjudication.confidence, 70.0);
        assert_eq!(adjudication.reasoning, DEFAULT_REVIEWED_REASONING);
    }

    #[test]
    fn test_index_beyond_truncation_falls_back() {
        // INT-3 exists in the full list but was not sent with top_n = 2
        let llm = MockProvider::new(r#"{"best_match_source": "internal", "best_match_index": 3}"#);
        let (mut golden, mut internal) = candidates();
        let adjudication = Adjudicator::new(&llm)
            .adjudicate("177 Village Rd", &mut golden, &mut internal, 2)
            .unwrap();
        assert_eq!(adjudication.best_match.canonical_text(), "77 VILLAGE RD, LARGO, FL");
        assert_eq!(adjudication.confidence, 95.0);
        assert!(!llm.last_prompt().unwrap().contains("INT-3. ["));
    }

    #[test]
    fn test_zero_index_falls_back() {
        let llm = MockProvider::new(r#"{"best_match_source": "golden_source", "best_match_index": 0}"#);
        let (mut golden, mut internal) = candidates();
        let adjudication = Adjudicator::new(&llm)
            .adjudicate("x", &mut golden, &mut internal, 10)
            .unwrap();
        assert_eq!(adjudication.best_match.source_type(), SourceType::Internal);
    }

    #[test]
    fn test_no_match_verdict_keeps_top_candidate() {
        let llm = MockProvider::new(
            r#"{"match_found": false, "best_match_source": "golden_source", "best_match_index": 2,
                "confidence": 20, "reasoning": "None of these are the same parcel"}"#,
        );
        let (mut golden, mut internal) = candidates();
        let adjudication = Adjudicator::new(&llm)
            .adjudicate("5 Elm St", &mut golden, &mut internal, 10)
            .unwrap();
        assert_eq!(adjudication.best_match.canonical_text(), "77 VILLAGE RD, LARGO, FL");
        assert_eq!(adjudication.confidence, 95.0);
        assert_eq!(adjudication.reasoning, "None of these are the same parcel");
        assert_eq!(adjudication.verdict_match_found, Some(false));
    }

    #[test]
    fn test_request_failure_falls_back() {
        let llm = MockProvider::failing("connection refused");
        let (mut golden, mut internal) = candidates();
        let adjudication = Adjudicator::new(&llm)
            .adjudicate("x", &mut golden, &mut internal, 10)
            .unwrap();
        assert_eq!(adjudication.outcome, AdjudicationOutcome::Failed);
        assert_eq!(adjudication.confidence, 95.0);
        assert!(adjudication.reasoning.starts_with("Using fuzzy match result (adjudication failed:"));
        assert!(adjudication.reasoning.contains("connection refused"));
        assert_eq!(adjudication.verdict_match_found, None);
    }

    #[test]
    fn test_unparsed_reply_falls_back() {
        let llm = MockProvider::new("I'm not sure which one you mean.");
        let (mut golden, mut internal) = candidates();
        let adjudication = Adjudicator::new(&llm)
            .adjudicate("x", &mut golden, &mut internal, 10)
            .unwrap();
        assert_eq!(adjudication.outcome, AdjudicationOutcome::Unparsed);
        assert_eq!(adjudication.reasoning, "Using fuzzy match result (adjudication unavailable)");
        assert_eq!(adjudication.best_match.similarity_score(), 95.0);
        assert_eq!(adjudication.confidence, 95.0);
    }

    #[test]
    fn test_analyses_attached_within_sent_lists() {
        let llm = MockProvider::new(
            r#"Here you go:
```json
{
  "match_found": true,
  "best_match_source": "internal",
  "best_match_index": 1,
  "confidence": 96,
  "golden_source_analyses": {"1": {"assessment": "Street type differs", "confidence": 90}},
  "internal_analyses": {
    "2": {"assessment": "Same street, type spelled out", "confidence": 88},
    "3": {"assessment": "Not sent", "confidence": 10},
    "x": {"assessment": "Bad key", "confidence": 0}
  }
}
```"#,
        );
        let (mut golden, mut internal) = candidates();
        let adjudication = Adjudicator::new(&llm)
            .adjudicate("77 Village Rd", &mut golden, &mut internal, 2)
            .unwrap();

        assert_eq!(adjudication.analyses_attached, 2);
        assert_eq!(golden[0].ai_analysis().unwrap().assessment, "Street type differs");
        assert!(golden[1].ai_analysis().is_none());
        assert!(internal[0].ai_analysis().is_none());
        assert_eq!(internal[1].ai_analysis().unwrap().confidence, Some(88.0));
        assert!(internal[2].ai_analysis().is_none());
        assert_eq!(adjudication.best_match.canonical_text(), "77 VILLAGE RD, LARGO, FL");
    }
}

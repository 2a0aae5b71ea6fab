//! Adjudication prompt construction

use onetrue_domain::{AddressRecord, SourceType};

/// Builds the adjudication prompt for one input address
///
/// Candidates are enumerated per source as `GS-n` / `INT-n` (1-based), each
/// with its similarity percentage and canonical text. The reply is expected
/// to point back at a candidate by source and that same 1-based index.
pub struct PromptBuilder<'a> {
    input_address: &'a str,
    golden_source: &'a [AddressRecord],
    internal: &'a [AddressRecord],
}

impl<'a> PromptBuilder<'a> {
    /// Create a new prompt builder over already-truncated candidate lists
    pub fn new(
        input_address: &'a str,
        golden_source: &'a [AddressRecord],
        internal: &'a [AddressRecord],
    ) -> Self {
        Self {
            input_address,
            golden_source,
            internal,
        }
    }

    /// Build the complete adjudication prompt
    pub fn build(&self) -> String {
        let mut prompt = String::new();

        prompt.push_str(PREAMBLE);
        prompt.push_str("\n\n");

        prompt.push_str("INPUT ADDRESS:\n");
        prompt.push_str(self.input_address.trim());
        prompt.push_str("\n\n");

        prompt.push_str(&Self::section(
            "GOLDEN SOURCE MATCHES",
            SourceType::GoldenSource,
            self.golden_source,
        ));
        prompt.push_str("\n\n");
        prompt.push_str(&Self::section("INTERNAL MATCHES", SourceType::Internal, self.internal));
        prompt.push_str("\n\n");

        prompt.push_str(TASK_RULES);
        prompt.push_str("\n\n");
        prompt.push_str(OUTPUT_FORMAT);

        prompt
    }

    fn section(title: &str, source: SourceType, candidates: &[AddressRecord]) -> String {
        let mut section = format!("{}:\n", title);
        if candidates.is_empty() {
            section.push_str("None");
            return section;
        }

        let lines: Vec<String> = candidates
            .iter()
            .enumerate()
            .map(|(i, candidate)| {
                let text = match candidate.canonical_text() {
                    "" => "N/A",
                    text => text,
                };
                format!(
                    "{}-{}. [{:.1}%] {}",
                    source.label(),
                    i + 1,
                    candidate.similarity_score(),
                    text
                )
            })
            .collect();
        section.push_str(&lines.join("\n"));
        section
    }
}

const PREAMBLE: &str = "You are an address matching expert. Review these fuzzy match results \
and provide detailed analysis FOR EVERY SINGLE MATCH.";

const TASK_RULES: &str = r#"CRITICAL TASK:
1. You MUST analyze EVERY match listed above individually (1-2 sentences each)
2. For each match, provide an assessment and confidence score
3. Determine which is the overall best match
4. Consider ONLY: street number, street name, city, and state
5. DO NOT consider zip codes in your analysis - they were already normalized before matching
6. In your assessments, DO NOT use labels like "GS-1" or "INT-1" - just describe the address directly (e.g., "This address matches perfectly" not "GS-1 matches perfectly")"#;

const OUTPUT_FORMAT: &str = r#"Return your analysis in JSON format with analysis for EVERY match:
{
    "match_found": true/false,
    "best_match_source": "golden_source" or "internal",
    "best_match_index": 1-based index within that source,
    "confidence": 0-100,
    "reasoning": "Why this is the best overall match",
    "concerns": "Any concerns (or null)",
    "golden_source_analyses": {
        "1": {"assessment": "Analysis of GS-1", "confidence": 0-100},
        "2": {"assessment": "Analysis of GS-2", "confidence": 0-100},
        ... (include ALL Golden Source matches)
    },
    "internal_analyses": {
        "1": {"assessment": "Analysis of INT-1", "confidence": 0-100},
        "2": {"assessment": "Analysis of INT-2", "confidence": 0-100},
        ... (include ALL Internal matches)
    }
}"#;

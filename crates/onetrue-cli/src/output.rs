//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use onetrue_domain::AddressRecord;
use onetrue_matcher::MatchResult;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format a match result.
    pub fn format_result(&self, result: &MatchResult) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&result.to_json())?),
            OutputFormat::Table => Ok(self.format_result_table(result)),
            OutputFormat::Quiet => Ok(result
                .best_match
                .as_ref()
                .map(|m| m.canonical_text().to_string())
                .unwrap_or_default()),
        }
    }

    fn format_result_table(&self, result: &MatchResult) -> String {
        let mut out = Vec::new();
        out.push(format!("Input Address: {}", result.input_address));
        out.push(format!("Golden Source Table: {}", golden_table(result)));
        out.push(format!("Candidates Searched: {}", result.candidates_searched));
        out.push(String::new());

        let Some(best) = &result.best_match else {
            out.push(self.error("No Match Found"));
            out.push(format!("Reasoning: {}", result.reasoning));
            return out.join("\n");
        };

        out.push(self.success("Match Found"));
        out.push(format!("Confidence: {:.1}%", result.confidence));
        if result.business_rule_exception {
            out.push(self.warning(&format!(
                "BUSINESS RULE EXCEPTION: confidence below threshold ({}%), manual review recommended",
                result.confidence_threshold
            )));
        }
        out.push(format!(
            "Best Match: {} [{} / {}]",
            best.canonical_text(),
            best.source_type().label(),
            best.source_table()
        ));
        out.push(format!("Reasoning: {}", result.reasoning));
        if let Some(adjudication) = &result.adjudication {
            out.push(format!(
                "Adjudication: {} by {} (top fuzzy score {:.1}%)",
                adjudication.outcome, adjudication.model, adjudication.fuzzy_score
            ));
            if let Some(concerns) = &adjudication.concerns {
                out.push(self.warning(&format!("Concerns: {}", concerns)));
            }
        }

        for (title, candidates) in [
            ("Golden Source Matches", &result.golden_source_matches),
            ("Internal Matches", &result.internal_matches),
        ] {
            out.push(String::new());
            out.push(self.colorize(title, "cyan"));
            if candidates.is_empty() {
                out.push(self.colorize("No matches found.", "yellow"));
            } else {
                out.push(candidate_table(candidates));
            }
        }

        if let Some(verification) = &result.verification {
            out.push(String::new());
            out.push(self.colorize(&format!("Verification ({})", verification.table), "cyan"));
            match &verification.matched_record {
                Some(record) => out.push(self.success(&format!("Exact match: {}", record.canonical_text()))),
                None => out.push(self.info(&format!(
                    "No exact match among {} candidate(s)",
                    verification.candidates.len()
                ))),
            }
        }

        out.join("\n")
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            _ => text.to_string(),
        }
    }
}

fn golden_table(result: &MatchResult) -> &str {
    result
        .golden_source_matches
        .first()
        .or(result.best_match.as_ref())
        .map(|r| r.source_table())
        .unwrap_or("-")
}

fn candidate_table(candidates: &[AddressRecord]) -> String {
    let mut builder = Builder::default();
    builder.push_record(["#", "Score", "Address", "Assessment"]);

    for (i, candidate) in candidates.iter().enumerate() {
        let assessment = candidate
            .ai_analysis()
            .map(|a| match a.confidence {
                Some(confidence) => format!("{} ({:.0}%)", a.assessment, confidence),
                None => a.assessment.clone(),
            })
            .unwrap_or_default();
        builder.push_record([
            format!("{}-{}", candidate.source_type().label(), i + 1),
            format!("{:.1}%", candidate.similarity_score()),
            candidate.canonical_text().to_string(),
            assessment,
        ]);
    }

    let mut table = builder.build();
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    table.to_string()
}

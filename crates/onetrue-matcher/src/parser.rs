//! Recover a structured verdict from free-form model output
//!
//! The reply is untrusted text. Three recovery tiers are tried in order,
//! each only if the previous one fails:
//!
//! 1. the whole reply parsed as a JSON object
//! 2. the first fenced code block (optionally labelled `json`) holding an object
//! 3. the first `{` and its matching `}`, found by string-aware brace counting
//!
//! Field extraction is lenient: numbers may arrive as strings, analysis keys
//! that are not integers are skipped, and missing fields stay `None`.

use crate::types::AdjudicationVerdict;
use once_cell::sync::Lazy;
use onetrue_domain::{CandidateAnalysis, SourceType};
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

static FENCED_JSON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("fenced JSON pattern is valid")
});

/// Outcome of parsing an adjudication reply
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedResponse {
    /// A JSON object was recovered
    Parsed(AdjudicationVerdict),
    /// No JSON object could be recovered; carries the original text
    Unparsed(String),
}

/// Parse an adjudication reply
pub fn parse_response(response: &str) -> ParsedResponse {
    match extract_object(response) {
        Some(object) => ParsedResponse::Parsed(verdict_from_object(&object)),
        None => ParsedResponse::Unparsed(response.to_string()),
    }
}

fn as_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

/// Run the three recovery tiers
fn extract_object(response: &str) -> Option<Map<String, Value>> {
    if let Some(object) = as_object(response.trim()) {
        return Some(object);
    }

    if let Some(object) = FENCED_JSON
        .captures(response)
        .and_then(|captures| captures.get(1))
        .and_then(|body| as_object(body.as_str()))
    {
        debug!("Recovered verdict from fenced code block");
        return Some(object);
    }

    let object = balanced_object(response).and_then(as_object);
    if object.is_some() {
        debug!("Recovered verdict by brace matching");
    }
    object
}

/// Slice from the first `{` to its matching `}`
///
/// Braces inside string literals are ignored and backslash escapes inside
/// strings are honoured. Returns `None` if the braces never balance.
fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn verdict_from_object(object: &Map<String, Value>) -> AdjudicationVerdict {
    let mut verdict = AdjudicationVerdict {
        match_found: object.get("match_found").and_then(lenient_bool).unwrap_or(true),
        best_match_source: object
            .get("best_match_source")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<SourceType>().ok()),
        best_match_index: object.get("best_match_index").and_then(lenient_index),
        confidence: object.get("confidence").and_then(lenient_number).map(clamp_confidence),
        reasoning: object.get("reasoning").and_then(lenient_text),
        concerns: object.get("concerns").and_then(lenient_text),
        ..AdjudicationVerdict::default()
    };

    for (key, source) in [
        ("golden_source_analyses", SourceType::GoldenSource),
        ("internal_analyses", SourceType::Internal),
    ] {
        let Some(analyses) = object.get(key).and_then(Value::as_object) else {
            continue;
        };
        for (index, analysis) in analyses {
            match index.trim().parse::<usize>() {
                Ok(index) if index >= 1 => {
                    verdict.analyses.insert((source, index), analysis_from_value(analysis));
                }
                _ => debug!("Skipping {} entry with non-integer key '{}'", key, index),
            }
        }
    }

    verdict
}

fn analysis_from_value(value: &Value) -> CandidateAnalysis {
    match value {
        Value::Object(fields) => CandidateAnalysis {
            assessment: fields
                .get("assessment")
                .and_then(lenient_text)
                .unwrap_or_default(),
            confidence: fields
                .get("confidence")
                .and_then(lenient_number)
                .map(clamp_confidence),
        },
        other => CandidateAnalysis {
            assessment: lenient_text(other).unwrap_or_default(),
            confidence: None,
        },
    }
}

fn lenient_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn lenient_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn lenient_index(value: &Value) -> Option<usize> {
    let n = lenient_number(value)?;
    (n.fract() == 0.0 && n >= 0.0).then_some(n as usize)
}

fn lenient_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Null | Value::String(_) => None,
        other => Some(other.to_string()),
    }
}

fn clamp_confidence(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

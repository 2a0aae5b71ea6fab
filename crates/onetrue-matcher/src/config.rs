//! Configuration for the matcher

use onetrue_domain::TableRef;
use serde::{Deserialize, Serialize};

/// Configuration for one matcher run
///
/// Built once and passed into [`AddressMatcher::new`](crate::AddressMatcher::new);
/// nothing in the pipeline reads settings from anywhere else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Golden source table (`schema.table` or `table`)
    pub golden_source_table: String,

    /// Internal table searched alongside the golden source
    pub internal_table: String,

    /// Table for the deterministic secondary lookup (defaults to the internal table)
    pub verification_table: Option<String>,

    /// Minimum similarity (0-100) for a row to become a candidate
    pub fuzzy_threshold: f64,

    /// Confidence (0-100) below which a result is flagged for manual review
    pub confidence_threshold: f64,

    /// Maximum rows fetched per source query
    pub candidate_limit: usize,

    /// Candidates per source sent for adjudication
    pub adjudication_top_n: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            golden_source_table: "addresses".to_string(),
            internal_table: "internal_addresses".to_string(),
            verification_table: None,
            fuzzy_threshold: 70.0,
            confidence_threshold: 90.0,
            candidate_limit: 100,
            adjudication_top_n: 10,
        }
    }
}

impl MatcherConfig {
    /// Strict preset: fewer, closer candidates and a higher review bar
    pub fn strict() -> Self {
        Self {
            fuzzy_threshold: 85.0,
            confidence_threshold: 95.0,
            candidate_limit: 50,
            ..Self::default()
        }
    }

    /// Lenient preset: cast a wider net for messy input
    pub fn lenient() -> Self {
        Self {
            fuzzy_threshold: 50.0,
            confidence_threshold: 75.0,
            candidate_limit: 250,
            ..Self::default()
        }
    }

    /// Golden source table reference
    pub fn golden_source(&self) -> TableRef {
        TableRef::parse(&self.golden_source_table)
    }

    /// Internal table reference
    pub fn internal(&self) -> TableRef {
        TableRef::parse(&self.internal_table)
    }

    /// Secondary lookup table reference
    pub fn verification(&self) -> TableRef {
        TableRef::parse(
            self.verification_table
                .as_deref()
                .unwrap_or(&self.internal_table),
        )
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.golden_source_table.trim().is_empty() {
            return Err("golden_source_table must not be empty".to_string());
        }
        if self.internal_table.trim().is_empty() {
            return Err("internal_table must not be empty".to_string());
        }
        if matches!(&self.verification_table, Some(t) if t.trim().is_empty()) {
            return Err("verification_table must not be empty when set".to_string());
        }
        if !(0.0..=100.0).contains(&self.fuzzy_threshold) {
            return Err(format!(
                "fuzzy_threshold must be between 0 and 100 (got {})",
                self.fuzzy_threshold
            ));
        }
        if !(0.0..=100.0).contains(&self.confidence_threshold) {
            return Err(format!(
                "confidence_threshold must be between 0 and 100 (got {})",
                self.confidence_threshold
            ));
        }
        if self.candidate_limit == 0 {
            return Err("candidate_limit must be greater than 0".to_string());
        }
        if self.adjudication_top_n == 0 {
            return Err("adjudication_top_n must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

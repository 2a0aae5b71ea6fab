//! Address records returned by candidate retrieval

use crate::mapping::{CanonicalField, ColumnMapping};
use std::fmt;
use std::str::FromStr;

/// Scalar value of a single column
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// SQL NULL
    Null,
    /// Integer column
    Integer(i64),
    /// Floating-point column
    Real(f64),
    /// Text column
    Text(String),
}

impl FieldValue {
    /// Whether this value is NULL or blank text
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Integer(i) => write!(f, "{}", i),
            // Postal codes loaded as REAL would otherwise render as "33701.0"
            FieldValue::Real(r) if r.fract() == 0.0 && r.abs() < 1e15 => write!(f, "{}", *r as i64),
            FieldValue::Real(r) => write!(f, "{}", r),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Integer(i)
    }
}

/// Which table a candidate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceType {
    /// The authoritative address table
    GoldenSource,
    /// The secondary, independently-schemed table
    Internal,
}

impl SourceType {
    /// Wire name used in verdicts and output (`golden_source` / `internal`)
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::GoldenSource => "golden_source",
            SourceType::Internal => "internal",
        }
    }

    /// Short label used when enumerating candidates (`GS` / `INT`)
    pub fn label(&self) -> &'static str {
        match self {
            SourceType::GoldenSource => "GS",
            SourceType::Internal => "INT",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "golden_source" | "goldensource" | "golden" | "gs" => Ok(SourceType::GoldenSource),
            "internal" | "int" => Ok(SourceType::Internal),
            _ => Err(format!("Unknown source type: {}", s)),
        }
    }
}

/// Per-candidate note produced by adjudication
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateAnalysis {
    /// Short free-text assessment
    pub assessment: String,
    /// Confidence in [0, 100], if the model gave one
    pub confidence: Option<f64>,
}

/// A candidate address row from one source table
///
/// Columns keep the source table's own names and declaration order. The
/// record also remembers the column mapping discovered for its table so the
/// canonical fields can be read back without knowing the schema.
///
/// Records are not mutated after creation except to attach an adjudication
/// note via [`AddressRecord::attach_analysis`].
#[derive(Debug, Clone, PartialEq)]
pub struct AddressRecord {
    fields: Vec<(String, FieldValue)>,
    mapping: ColumnMapping,
    canonical: String,
    similarity_score: f64,
    source_type: SourceType,
    source_table: String,
    ai_analysis: Option<CandidateAnalysis>,
}

impl AddressRecord {
    /// Build a record from column/value pairs
    ///
    /// The canonical text is derived from the mapping: the full-text column
    /// when bound, otherwise `"street, city, state zip"` from the bound fields.
    pub fn new(
        fields: Vec<(String, FieldValue)>,
        mapping: ColumnMapping,
        source_type: SourceType,
        source_table: impl Into<String>,
    ) -> Self {
        let mut record = Self {
            fields,
            mapping,
            canonical: String::new(),
            similarity_score: 0.0,
            source_type,
            source_table: source_table.into(),
            ai_analysis: None,
        };
        record.canonical = record.compose_canonical();
        record
    }

    /// Set the similarity score, clamped to [0, 100]
    pub fn with_similarity_score(mut self, score: f64) -> Self {
        self.similarity_score = if score.is_nan() { 0.0 } else { score.clamp(0.0, 100.0) };
        self
    }

    fn compose_canonical(&self) -> String {
        if let Some(full) = self.field(CanonicalField::FullText) {
            return full;
        }

        let mut parts: Vec<String> = Vec::new();
        for field in [CanonicalField::Address, CanonicalField::City] {
            if let Some(value) = self.field(field) {
                parts.push(value);
            }
        }
        let region: Vec<String> = [CanonicalField::State, CanonicalField::Zip]
            .into_iter()
            .filter_map(|f| self.field(f))
            .collect();
        if !region.is_empty() {
            parts.push(region.join(" "));
        }
        parts.join(", ")
    }

    /// Value of a column by its exact name
    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Column value rendered as text; empty when absent or NULL
    pub fn text(&self, column: &str) -> String {
        self.get(column).map(|v| v.to_string()).unwrap_or_default()
    }

    /// Trimmed value of a canonical field, if its column is bound and non-blank
    pub fn field(&self, field: CanonicalField) -> Option<String> {
        let column = self.mapping.get(field)?;
        let value = self.get(column)?;
        if value.is_blank() {
            return None;
        }
        Some(value.to_string().trim().to_string())
    }

    /// All column/value pairs in table declaration order
    pub fn fields(&self) -> &[(String, FieldValue)] {
        &self.fields
    }

    /// Column names in table declaration order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// The column mapping discovered for this record's table
    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    /// Canonical free text used as the primary match target
    pub fn canonical_text(&self) -> &str {
        &self.canonical
    }

    /// Similarity to the match target, in [0, 100]
    pub fn similarity_score(&self) -> f64 {
        self.similarity_score
    }

    /// Source table kind
    pub fn source_type(&self) -> SourceType {
        self.source_type
    }

    /// Source table name as configured
    pub fn source_table(&self) -> &str {
        &self.source_table
    }

    /// Adjudication note, if one was attached
    pub fn ai_analysis(&self) -> Option<&CandidateAnalysis> {
        self.ai_analysis.as_ref()
    }

    /// Attach an adjudication note to this candidate
    pub fn attach_analysis(&mut self, analysis: CandidateAnalysis) {
        self.ai_analysis = Some(analysis);
    }
}

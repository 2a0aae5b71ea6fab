//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the reconciliation core and
//! infrastructure. Implementations live in other crates.

use crate::query::{RowSet, SelectQuery, TableRef};

/// Read-only access to address tables
///
/// Implemented by the infrastructure layer (onetrue-store)
pub trait AddressSource {
    /// Error type for source operations
    type Error;

    /// Column names of a table, in declaration order
    ///
    /// Identifiers are quoted by the implementation.
    fn columns(&self, table: &TableRef) -> Result<Vec<String>, Self::Error>;

    /// Run a filtered, row-limited select
    fn select(&self, query: &SelectQuery) -> Result<RowSet, Self::Error>;
}

/// Trait for reasoning-model operations
///
/// A text-in/text-out oracle: no streaming, no multi-turn state. Output is
/// untrusted and parsed defensively by the caller.
///
/// Implemented by the infrastructure layer (onetrue-llm)
pub trait LlmProvider {
    /// Error type for LLM operations
    type Error;

    /// Generate a completion for a single prompt
    fn generate(&self, prompt: &str) -> Result<String, Self::Error>;

    /// Model identifier, for logs and results
    fn model_name(&self) -> &str {
        "llm"
    }
}

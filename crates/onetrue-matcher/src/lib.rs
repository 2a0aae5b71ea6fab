//! OneTrueAddress Matcher
//!
//! Reconciles a free-text address against two independently-schemed address
//! tables: a golden source and an internal table.
//!
//! # Overview
//!
//! Neither table's schema is known in advance. Columns are discovered per
//! table on every run, candidates are retrieved by fuzzy similarity, and a
//! reasoning model adjudicates between the top candidates of each source.
//! When the chosen match comes from the golden source it is checked against
//! the verification table by a deterministic, non-fuzzy lookup.
//!
//! # Architecture
//!
//! ```text
//! Input → parse → Retriever (golden, internal) → Merge/Top-N → Adjudicator → LLM
//!                                                                  │
//!                      MatchResult ← Verifier ← secondary lookup ←─┘
//! ```
//!
//! # Key Features
//!
//! - **Schema-agnostic retrieval**: column mappings inferred from names
//! - **Per-source truncation**: neither table can crowd the other out
//! - **Tolerant adjudication**: request failures and unreadable replies fall
//!   back to the top fuzzy candidate instead of failing the match
//! - **Exact-match verification**: street number, core street name and state
//!   lookup followed by a four-field equality check
//!
//! # Example Usage
//!
//! ```no_run
//! use onetrue_matcher::{AddressMatcher, MatcherConfig};
//! use onetrue_llm::MockProvider;
//! use onetrue_store::SqliteSource;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let llm = MockProvider::new("{}");
//! let source = SqliteSource::open("addresses.db")?;
//! let matcher = AddressMatcher::new(llm, source, MatcherConfig::default())?;
//!
//! let result = matcher.match_address("123 Main St, Tampa, FL 33701")?;
//!
//! println!("Match found: {}", result.match_found);
//! println!("Confidence: {:.1}%", result.confidence);
//! if result.business_rule_exception {
//!     println!("Manual review recommended");
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod adjudicator;
mod config;
mod error;
mod matcher;
mod merge;
mod parser;
mod prompt;
mod retriever;
mod similarity;
mod types;
mod verifier;


pub use adjudicator::Adjudicator;
pub use config::MatcherConfig;
pub use error::MatcherError;
pub use matcher::AddressMatcher;
pub use merge::{merge, rank, top_n, RankedCandidate};
pub use parser::{parse_response, ParsedResponse};
pub use prompt::PromptBuilder;
pub use retriever::CandidateRetriever;
pub use similarity::{SimilarityScorer, TokenSortRatio};
pub use types::{
    record_to_json, Adjudication, AdjudicationOutcome, AdjudicationSummary, AdjudicationVerdict,
    MatchResult, RetrievalResult, SearchMethod, Verification,
};
pub use verifier::verify_exact_match;

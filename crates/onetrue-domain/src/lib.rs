//! OneTrueAddress Domain Layer
//!
//! This crate contains the core value types and pure logic for address
//! reconciliation. It has ZERO external dependencies and defines the
//! concepts and trait interfaces that all other layers depend upon.
//!
//! ## Key Concepts
//!
//! - **AddressRecord**: A row from a source table, tagged with its similarity
//!   score, source type and source table
//! - **ColumnMapping**: Which columns of an unknown schema hold the street
//!   address, city, state and postal code
//! - **DecomposedAddress**: A street line split into number, full name and
//!   core name (street type removed)
//! - **Golden source / internal**: The two independently-schemed tables
//!
//! ## Architecture
//!
//! - No external crate dependencies
//! - Pure functions over schema snapshots (no live database needed)
//! - Trait definitions for the database and reasoning-model collaborators

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod address;
pub mod mapping;
pub mod query;
pub mod record;
pub mod traits;

// Re-exports for convenience
pub use address::{decompose, parse_input, DecomposedAddress, DecompositionError, SearchCriteria};
pub use mapping::{CanonicalField, ColumnMapping};
pub use query::{Filter, LikePattern, RowSet, SelectQuery, TableRef};
pub use record::{AddressRecord, CandidateAnalysis, FieldValue, SourceType};

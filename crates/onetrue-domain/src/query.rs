//! Backend-neutral query description handed to the database collaborator
//!
//! The core never writes SQL. It describes a filtered, row-limited read and
//! the [`AddressSource`](crate::traits::AddressSource) implementation renders
//! it with its own quoting and parameter binding.

use crate::record::FieldValue;
use std::fmt;

/// A possibly schema-qualified table identifier (`schema.table` or `table`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    /// Optional schema qualifier
    pub schema: Option<String>,
    /// Table name
    pub name: String,
}

impl TableRef {
    /// Parse `schema.table` or a bare `table`
    ///
    /// Only the first dot separates schema from table.
    pub fn parse(value: &str) -> Self {
        match value.trim().split_once('.') {
            Some((schema, name)) if !schema.is_empty() && !name.is_empty() => Self {
                schema: Some(schema.to_string()),
                name: name.to_string(),
            },
            _ => Self {
                schema: None,
                name: value.trim().to_string(),
            },
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Case-insensitive text predicate (`ILIKE`-equivalent)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LikePattern {
    /// `%value%`
    Contains(String),
    /// `value%`
    StartsWith(String),
    /// `value` (whole-value, case-insensitive)
    Equals(String),
}

impl LikePattern {
    /// The unescaped search term
    pub fn term(&self) -> &str {
        match self {
            LikePattern::Contains(s) | LikePattern::StartsWith(s) | LikePattern::Equals(s) => s,
        }
    }

    /// Reference semantics, used by in-memory sources and tests
    pub fn matches(&self, value: &str) -> bool {
        let value = value.to_lowercase();
        let term = self.term().to_lowercase();
        match self {
            LikePattern::Contains(_) => value.contains(&term),
            LikePattern::StartsWith(_) => value.starts_with(&term),
            LikePattern::Equals(_) => value == term,
        }
    }
}

/// Boolean filter tree over column predicates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Column text matches the pattern, case-insensitively
    Like {
        /// Column name as returned by introspection
        column: String,
        /// Pattern to test
        pattern: LikePattern,
    },
    /// Every child must hold (empty = true)
    All(Vec<Filter>),
    /// At least one non-trivial child must hold (no such child = true)
    Any(Vec<Filter>),
}

impl Filter {
    /// Convenience constructor for [`Filter::Like`]
    pub fn like(column: impl Into<String>, pattern: LikePattern) -> Self {
        Filter::Like {
            column: column.into(),
            pattern,
        }
    }

    /// A filter that accepts every row
    pub fn none() -> Self {
        Filter::All(Vec::new())
    }

    /// Whether this filter places no constraint
    pub fn is_trivial(&self) -> bool {
        match self {
            Filter::Like { .. } => false,
            Filter::All(children) | Filter::Any(children) => children.iter().all(Filter::is_trivial),
        }
    }

    /// Evaluate against a row, used by in-memory sources and tests
    ///
    /// Trivial children are ignored, the same as when the filter is rendered
    /// to SQL: `Any[All[], x]` holds exactly when `x` does.
    pub fn matches(&self, columns: &[String], values: &[FieldValue]) -> bool {
        match self {
            Filter::Like { column, pattern } => columns
                .iter()
                .position(|c| c == column)
                .and_then(|i| values.get(i))
                .map_or(false, |v| pattern.matches(&v.to_string())),
            Filter::All(children) => children.iter().all(|c| c.matches(columns, values)),
            Filter::Any(children) => {
                let mut active = children.iter().filter(|c| !c.is_trivial()).peekable();
                active.peek().is_none() || active.any(|c| c.matches(columns, values))
            }
        }
    }
}

/// A filtered, optionally projected and row-limited read of one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery {
    /// Table to read
    pub table: TableRef,
    /// Columns to return; `None` selects all columns in declaration order
    pub columns: Option<Vec<String>>,
    /// Row filter
    pub filter: Filter,
    /// Maximum number of rows
    pub limit: Option<usize>,
}

impl SelectQuery {
    /// Select all columns of a table with no filter and no limit
    pub fn all(table: TableRef) -> Self {
        Self {
            table,
            columns: None,
            filter: Filter::none(),
            limit: None,
        }
    }

    /// Set the row filter
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Set the row limit
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Rows returned by a select, as ordered values paired with the column list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    /// Column names, in the order values appear in each row
    pub columns: Vec<String>,
    /// Row values
    pub rows: Vec<Vec<FieldValue>>,
}

impl RowSet {
    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no rows were returned
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows as column/value pairs
    pub fn into_pairs(self) -> Vec<Vec<(String, FieldValue)>> {
        let columns = self.columns;
        self.rows
            .into_iter()
            .map(|row| columns.iter().cloned().zip(row).collect())
            .collect()
    }
}

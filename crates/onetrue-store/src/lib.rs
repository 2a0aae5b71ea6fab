//! OneTrueAddress Storage Layer
//!
//! Implements the `AddressSource` trait over SQLite.
//!
//! # Architecture
//!
//! - Schema introspection via `PRAGMA table_info`, honouring `schema.table`
//!   (SQLite schemas are attached databases)
//! - Filter trees rendered to `LIKE ... ESCAPE '\'` predicates with bound
//!   parameters; SQLite `LIKE` is case-insensitive, matching `ILIKE`
//! - Read-only access: databases are opened with `SQLITE_OPEN_READ_ONLY`
//!
//! # Examples
//!
//! ```no_run
//! use onetrue_store::SqliteSource;
//!
//! let source = SqliteSource::open("addresses.db").unwrap();
//! // Source is now ready for address lookups
//! ```

#![warn(missing_docs)]

use onetrue_domain::traits::AddressSource;
use onetrue_domain::{FieldValue, Filter, LikePattern, RowSet, SelectQuery, TableRef};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, ErrorCode, OpenFlags};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The database could not be opened
    #[error("Could not open database: {message}\n{hint}")]
    Connection {
        /// Underlying failure
        message: String,
        /// What to check, chosen from the failure signature
        hint: String,
    },

    /// Table does not exist or has no columns
    #[error("Table not found: {0}")]
    TableNotFound(String),
}

/// SQLite-based implementation of AddressSource
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Each concurrent pipeline run
/// should open its own SqliteSource.
pub struct SqliteSource {
    conn: Connection,
}

impl SqliteSource {
    /// Open an existing database file read-only
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] with a diagnostic hint if the file
    /// is missing, unreadable, locked, or not a SQLite database.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use onetrue_store::SqliteSource;
    ///
    /// let source = SqliteSource::open("/var/lib/onetrue/addresses.db").unwrap();
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX | OpenFlags::SQLITE_OPEN_URI,
        )
        .map_err(|e| connection_error(path, e))?;

        // SQLite opens lazily; touch the schema so bad files fail here
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| row.get::<_, i64>(0))
            .map_err(|e| connection_error(path, e))?;

        debug!("Opened database {}", path.display());
        Ok(Self { conn })
    }

    /// Open a private in-memory database (useful for testing)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Wrap an already-open connection
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Underlying connection, e.g. to seed fixtures
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Quote an identifier, doubling embedded quotes
    fn quote_ident(ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn qualified_table(table: &TableRef) -> String {
        match &table.schema {
            Some(schema) => format!("{}.{}", Self::quote_ident(schema), Self::quote_ident(&table.name)),
            None => Self::quote_ident(&table.name),
        }
    }

    /// Escape `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern
    fn escape_like(term: &str) -> String {
        let mut escaped = String::with_capacity(term.len());
        for c in term.chars() {
            if matches!(c, '%' | '_' | '\\') {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        escaped
    }

    fn like_param(pattern: &LikePattern) -> String {
        let term = Self::escape_like(pattern.term());
        match pattern {
            LikePattern::Contains(_) => format!("%{}%", term),
            LikePattern::StartsWith(_) => format!("{}%", term),
            LikePattern::Equals(_) => term,
        }
    }

    /// Column value as text, with integral REAL values rendered without a
    /// fractional part (`33701.0` reads as `33701`, the same as `FieldValue`)
    fn text_expr(column: &str) -> String {
        let ident = Self::quote_ident(column);
        format!(
            "(CASE WHEN typeof({0}) = 'real' AND {0} = CAST({0} AS INTEGER) \
             THEN CAST(CAST({0} AS INTEGER) AS TEXT) ELSE CAST({0} AS TEXT) END)",
            ident
        )
    }

    /// Render a filter tree into `sql`, pushing bound parameters in order
    ///
    /// Trivial children are dropped, which is how `Filter::matches`
    /// evaluates them too.
    fn render_filter(filter: &Filter, sql: &mut String, params: &mut Vec<String>) {
        match filter {
            Filter::Like { column, pattern } => {
                sql.push_str(&format!("{} LIKE ? ESCAPE '\\'", Self::text_expr(column)));
                params.push(Self::like_param(pattern));
            }
            Filter::All(children) | Filter::Any(children) => {
                let joiner = if matches!(filter, Filter::All(_)) { " AND " } else { " OR " };
                let active: Vec<&Filter> = children.iter().filter(|c| !c.is_trivial()).collect();
                if active.len() > 1 {
                    sql.push('(');
                }
                for (i, child) in active.iter().enumerate() {
                    if i > 0 {
                        sql.push_str(joiner);
                    }
                    Self::render_filter(child, sql, params);
                }
                if active.len() > 1 {
                    sql.push(')');
                }
            }
        }
    }

    /// Build the SQL text and parameters for a select
    fn build_select(query: &SelectQuery, columns: &[String]) -> (String, Vec<String>) {
        let projection = columns
            .iter()
            .map(|c| Self::quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!("SELECT {} FROM {}", projection, Self::qualified_table(&query.table));
        let mut params = Vec::new();

        if !query.filter.is_trivial() {
            sql.push_str(" WHERE ");
            Self::render_filter(&query.filter, &mut sql, &mut params);
        }

        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        (sql, params)
    }

    fn to_field_value(value: ValueRef<'_>) -> FieldValue {
        match value {
            ValueRef::Null => FieldValue::Null,
            ValueRef::Integer(i) => FieldValue::Integer(i),
            ValueRef::Real(r) => FieldValue::Real(r),
            ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
                FieldValue::Text(String::from_utf8_lossy(bytes).into_owned())
            }
        }
    }
}

/// Map an open/handshake failure to a `Connection` error with a hint
fn connection_error(path: &Path, error: rusqlite::Error) -> StoreError {
    let hint = match error.sqlite_error_code() {
        Some(ErrorCode::CannotOpen) => format!(
            "Please verify:\n  1. The file {} exists\n  2. The path in GOLDEN_SOURCE_DATABASE is correct",
            path.display()
        ),
        Some(ErrorCode::NotADatabase) => format!(
            "{} is not a SQLite database. Check GOLDEN_SOURCE_DATABASE.",
            path.display()
        ),
        Some(ErrorCode::PermissionDenied) | Some(ErrorCode::ReadOnly) | Some(ErrorCode::AuthorizationForStatementDenied) => {
            format!("Check that the current user can read {}", path.display())
        }
        Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
            "Another process holds a lock on the database; retry when it is released".to_string()
        }
        _ => "Check the database settings in your config file or environment".to_string(),
    };
    StoreError::Connection {
        message: error.to_string(),
        hint,
    }
}

impl AddressSource for SqliteSource {
    type Error = StoreError;

    fn columns(&self, table: &TableRef) -> Result<Vec<String>, Self::Error> {
        let sql = match &table.schema {
            Some(schema) => format!(
                "PRAGMA {}.table_info({})",
                Self::quote_ident(schema),
                Self::quote_ident(&table.name)
            ),
            None => format!("PRAGMA table_info({})", Self::quote_ident(&table.name)),
        };

        let mut stmt = self.conn.prepare(&sql)?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;

        if columns.is_empty() {
            return Err(StoreError::TableNotFound(table.to_string()));
        }
        Ok(columns)
    }

    fn select(&self, query: &SelectQuery) -> Result<RowSet, Self::Error> {
        let columns = match &query.columns {
            Some(columns) => columns.clone(),
            None => self.columns(&query.table)?,
        };
        let (sql, params) = Self::build_select(query, &columns);

        debug!("Query: {}", sql);
        debug!("Params: {:?}", params);

        let mut stmt = self.conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> =
            params.iter().map(|p| p as &dyn rusqlite::ToSql).collect();

        let width = columns.len();
        let rows = stmt
            .query_map(&param_refs[..], |row| {
                (0..width)
                    .map(|i| row.get_ref(i).map(Self::to_field_value))
                    .collect::<Result<Vec<_>, _>>()
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RowSet { columns, rows })
    }
}

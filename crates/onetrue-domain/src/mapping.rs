//! Schema-agnostic column discovery
//!
//! Address tables arrive with arbitrary column names (`address1`,
//! `SITE_ADDR`, `Mailing City`, `ST`, `postal_code`, ...). Discovery is a
//! pure function over the ordered column list, so it can be tested against
//! synthetic schemas and recomputed whenever the target table changes.

use std::fmt;

/// Canonical address fields a table's columns are mapped onto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    /// Pre-composed full address (e.g. `MasterAddress`)
    FullText,
    /// Street address line
    Address,
    /// City or town
    City,
    /// State or province
    State,
    /// Postal code
    Zip,
}

impl CanonicalField {
    /// Discovery order. Earlier fields claim columns first.
    pub const ALL: [CanonicalField; 5] = [
        CanonicalField::FullText,
        CanonicalField::Address,
        CanonicalField::City,
        CanonicalField::State,
        CanonicalField::Zip,
    ];

    /// Field name as used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::FullText => "full_text",
            CanonicalField::Address => "address",
            CanonicalField::City => "city",
            CanonicalField::State => "state",
            CanonicalField::Zip => "zip",
        }
    }

    fn patterns(&self) -> &'static [Pattern] {
        match self {
            CanonicalField::FullText => FULL_TEXT_PATTERNS,
            CanonicalField::Address => ADDRESS_PATTERNS,
            CanonicalField::City => CITY_PATTERNS,
            CanonicalField::State => STATE_PATTERNS,
            CanonicalField::Zip => ZIP_PATTERNS,
        }
    }
}

/// One column-name heuristic, applied to the lowercased column name
#[derive(Debug, Clone, Copy)]
enum Pattern {
    /// Column name contains the needle
    Contains(&'static str),
    /// Column name contains the needle but not the excluded word
    ContainsExcept(&'static str, &'static str),
    /// Column name equals the needle
    Exact(&'static str),
}

impl Pattern {
    fn matches(&self, column_lower: &str) -> bool {
        match *self {
            Pattern::Contains(needle) => column_lower.contains(needle),
            Pattern::ContainsExcept(needle, excluded) => {
                column_lower.contains(needle) && !column_lower.contains(excluded)
            }
            Pattern::Exact(needle) => column_lower == needle,
        }
    }
}

const FULL_TEXT_PATTERNS: &[Pattern] = &[
    Pattern::Contains("masteraddress"),
    Pattern::Contains("master_address"),
    Pattern::Contains("full_address"),
    Pattern::Contains("fulladdress"),
];

const ADDRESS_PATTERNS: &[Pattern] = &[
    Pattern::Contains("address"),
    Pattern::Contains("street"),
    Pattern::Contains("addr"),
];

const CITY_PATTERNS: &[Pattern] = &[
    Pattern::Contains("city"),
    Pattern::Contains("town"),
];

// A bare "st" substring would hit "street", "postal" and "last_sale"
const STATE_PATTERNS: &[Pattern] = &[
    Pattern::ContainsExcept("state", "estate"),
    Pattern::Exact("st"),
    Pattern::Contains("province"),
];

const ZIP_PATTERNS: &[Pattern] = &[
    Pattern::Contains("zip"),
    Pattern::Contains("postal"),
];

/// Discovered column for each canonical field of one table
///
/// Unbound fields are `None`; callers treat an unbound field as "cannot
/// filter or match on this dimension" and degrade instead of failing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    /// Pre-composed full address column
    pub full_text: Option<String>,
    /// Street address column
    pub address: Option<String>,
    /// City column
    pub city: Option<String>,
    /// State column
    pub state: Option<String>,
    /// Postal code column
    pub zip: Option<String>,
}

impl ColumnMapping {
    /// Infer the mapping from a table's ordered column list
    ///
    /// For each field, patterns are tried in priority order and each pattern
    /// scans the columns in declaration order; the first hit binds the field.
    /// A column already bound to an earlier field is never reused, with one
    /// exception: when no other column is address-like, the full-text column
    /// also serves as the address column.
    pub fn discover<S: AsRef<str>>(columns: &[S]) -> Self {
        let lowered: Vec<(String, &str)> = columns
            .iter()
            .map(|c| (c.as_ref().to_lowercase(), c.as_ref()))
            .collect();

        let mut mapping = ColumnMapping::default();
        for field in CanonicalField::ALL {
            let found = field.patterns().iter().find_map(|pattern| {
                lowered
                    .iter()
                    .find(|(lower, actual)| pattern.matches(lower) && !mapping.is_column_bound(actual))
                    .map(|(_, actual)| actual.to_string())
            });
            mapping.set(field, found);
        }
        if mapping.address.is_none() {
            mapping.address = mapping.full_text.clone();
        }
        mapping
    }

    fn set(&mut self, field: CanonicalField, column: Option<String>) {
        match field {
            CanonicalField::FullText => self.full_text = column,
            CanonicalField::Address => self.address = column,
            CanonicalField::City => self.city = column,
            CanonicalField::State => self.state = column,
            CanonicalField::Zip => self.zip = column,
        }
    }

    /// Column bound to a canonical field
    pub fn get(&self, field: CanonicalField) -> Option<&str> {
        match field {
            CanonicalField::FullText => self.full_text.as_deref(),
            CanonicalField::Address => self.address.as_deref(),
            CanonicalField::City => self.city.as_deref(),
            CanonicalField::State => self.state.as_deref(),
            CanonicalField::Zip => self.zip.as_deref(),
        }
    }

    /// Whether a canonical field has a column
    pub fn is_bound(&self, field: CanonicalField) -> bool {
        self.get(field).is_some()
    }

    fn is_column_bound(&self, column: &str) -> bool {
        CanonicalField::ALL
            .iter()
            .any(|f| self.get(*f) == Some(column))
    }

    /// Which of the given fields are left unbound
    pub fn missing(&self, required: &[CanonicalField]) -> Vec<CanonicalField> {
        required
            .iter()
            .copied()
            .filter(|f| !self.is_bound(*f))
            .collect()
    }
}

impl fmt::Display for ColumnMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = CanonicalField::ALL
            .iter()
            .map(|field| format!("{}={}", field.as_str(), self.get(*field).unwrap_or("-")))
            .collect();
        f.write_str(&parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_golden_source_schema() {
        let columns = ["address1", "address2", "Mailing City", "state", "zipcode"];
        let mapping = ColumnMapping::discover(&columns);
        assert_eq!(mapping.address.as_deref(), Some("address1"));
        assert_eq!(mapping.city.as_deref(), Some("Mailing City"));
        assert_eq!(mapping.state.as_deref(), Some("state"));
        assert_eq!(mapping.zip.as_deref(), Some("zipcode"));
        assert_eq!(mapping.full_text, None);
    }

    #[test]
    fn test_first_column_in_declaration_order_wins() {
        let columns = ["id", "site_address", "mail_address", "city"];
        let mapping = ColumnMapping::discover(&columns);
        assert_eq!(mapping.address.as_deref(), Some("site_address"));
    }

    #[test]
    fn test_pattern_priority_beats_column_order() {
        // "addr" appears first but "street" is a higher-priority pattern
        let columns = ["ADDR_LINE", "STREET_NAME"];
        let mapping = ColumnMapping::discover(&columns);
        assert_eq!(mapping.address.as_deref(), Some("STREET_NAME"));
    }

    #[test]
    fn test_state_ignores_estate() {
        let columns = ["real_estate_value", "St", "street"];
        let mapping = ColumnMapping::discover(&columns);
        assert_eq!(mapping.state.as_deref(), Some("St"));
        assert_eq!(mapping.address.as_deref(), Some("street"));
    }

    #[test]
    fn test_state_short_pattern_does_not_steal_other_columns() {
        let columns = ["postal_code", "last_sale", "situs_street"];
        let mapping = ColumnMapping::discover(&columns);
        assert_eq!(mapping.state, None);
        assert_eq!(mapping.zip.as_deref(), Some("postal_code"));
        assert_eq!(mapping.address.as_deref(), Some("situs_street"));
    }

    #[test]
    fn test_full_text_column_not_reused_as_address() {
        let columns = ["MasterAddress", "Address1", "City", "State", "Zip"];
        let mapping = ColumnMapping::discover(&columns);
        assert_eq!(mapping.full_text.as_deref(), Some("MasterAddress"));
        assert_eq!(mapping.address.as_deref(), Some("Address1"));
    }

    #[test]
    fn test_full_text_column_doubles_as_address() {
        let columns = ["FullAddress", "City", "State", "Zip"];
        let mapping = ColumnMapping::discover(&columns);
        assert_eq!(mapping.full_text.as_deref(), Some("FullAddress"));
        assert_eq!(mapping.address.as_deref(), Some("FullAddress"));
        assert_eq!(mapping.city.as_deref(), Some("City"));
        assert_eq!(mapping.state.as_deref(), Some("State"));
        assert_eq!(mapping.zip.as_deref(), Some("Zip"));
        assert!(mapping.missing(&[CanonicalField::Address]).is_empty());
    }

    #[test]
    fn test_partial_mapping() {
        let columns = ["id", "owner_name", "city"];
        let mapping = ColumnMapping::discover(&columns);
        assert_eq!(mapping.address, None);
        assert_eq!(mapping.city.as_deref(), Some("city"));
        assert_eq!(
            mapping.missing(&[CanonicalField::Address, CanonicalField::City, CanonicalField::State]),
            vec![CanonicalField::Address, CanonicalField::State]
        );
    }

    #[test]
    fn test_empty_schema() {
        let columns: [&str; 0] = [];
        let mapping = ColumnMapping::discover(&columns);
        assert_eq!(mapping, ColumnMapping::default());
    }

    #[test]
    fn test_display() {
        let mapping = ColumnMapping::discover(&["street", "town"]);
        assert_eq!(
            mapping.to_string(),
            "full_text=-, address=street, city=town, state=-, zip=-"
        );
    }
}

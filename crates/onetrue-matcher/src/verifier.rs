//! Exact-match verification against secondary lookup results
//!
//! Independent of schema discovery: the candidate columns are sniffed from
//! the first candidate's column names only, on the assumption that every
//! candidate from one query shares a schema.
//!
//! Fields are compared after trimming and lowercasing. A field missing on
//! both sides compares as `""` and therefore equal, so two records that both
//! lack, say, a postal code can still verify as exact. That is kept as-is and
//! covered by tests; callers that need stricter semantics should check
//! [`AddressRecord::field`] for presence themselves.

use onetrue_domain::{AddressRecord, CanonicalField};

#[derive(Debug, Default, PartialEq, Eq)]
struct SniffedColumns {
    address: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zip: Option<String>,
}

/// First matching rule wins for each column name
fn sniff_columns<'a>(columns: impl Iterator<Item = &'a str>) -> SniffedColumns {
    let mut sniffed = SniffedColumns::default();
    for column in columns {
        let lower = column.to_lowercase();
        let slot = if lower.contains("address") || lower.contains("street") {
            &mut sniffed.address
        } else if lower.contains("city") || lower.contains("town") {
            &mut sniffed.city
        } else if lower == "state" || lower == "st" {
            &mut sniffed.state
        } else if lower.contains("zip") || lower.contains("postal") {
            &mut sniffed.zip
        } else {
            continue;
        };
        if slot.is_none() {
            *slot = Some(column.to_string());
        }
    }
    sniffed
}

fn normalized(value: Option<String>) -> String {
    value.unwrap_or_default().trim().to_lowercase()
}

/// Find the first candidate equal to the golden record on street, city,
/// state and postal code
///
/// Returns `None` when there are no candidates or none is equal.
pub fn verify_exact_match<'a>(
    golden: &AddressRecord,
    candidates: &'a [AddressRecord],
) -> Option<&'a AddressRecord> {
    let first = candidates.first()?;
    let columns = sniff_columns(first.columns());

    let expected = [
        normalized(golden.field(CanonicalField::Address)),
        normalized(golden.field(CanonicalField::City)),
        normalized(golden.field(CanonicalField::State)),
        normalized(golden.field(CanonicalField::Zip)),
    ];

    candidates.iter().find(|candidate| {
        let actual = [&columns.address, &columns.city, &columns.state, &columns.zip]
            .map(|column| normalized(column.as_deref().map(|c| candidate.text(c))));
        actual == expected
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use onetrue_domain::{ColumnMapping, FieldValue, SourceType};

    fn record(source: SourceType, pairs: &[(&str, &str)]) -> AddressRecord {
        let columns: Vec<&str> = pairs.iter().map(|(c, _)| *c).collect();
        let fields = pairs
            .iter()
            .map(|(c, v)| (c.to_string(), FieldValue::from(*v)))
            .collect();
        AddressRecord::new(fields, ColumnMapping::discover(&columns), source, "t")
    }

    fn golden() -> AddressRecord {
        record(
            SourceType::GoldenSource,
            &[
                ("address1", "100 Main St"),
                ("Mailing City", "Tampa"),
                ("state", "FL"),
                ("zipcode", "33701"),
            ],
        )
    }

    #[test]
    fn test_exact_match_across_schemas() {
        let candidates = vec![
            record(
                SourceType::Internal,
                &[("Street", "102 Main St"), ("City", "tampa"), ("St", "fl"), ("Zip", "33701")],
            ),
            record(
                SourceType::Internal,
                &[("Street", "  100 MAIN ST "), ("City", "TAMPA"), ("St", "fl"), ("Zip", "33701")],
            ),
        ];
        let matched = verify_exact_match(&golden(), &candidates).expect("exact match");
        assert_eq!(matched.text("Street"), "  100 MAIN ST ");
    }

    #[test]
    fn test_no_candidates() {
        assert!(verify_exact_match(&golden(), &[]).is_none());
    }

    #[test]
    fn test_street_type_difference_is_not_exact() {
        let candidates = vec![record(
            SourceType::Internal,
            &[("Street", "100 Main Street"), ("City", "Tampa"), ("St", "FL"), ("Zip", "33701")],
        )];
        assert!(verify_exact_match(&golden(), &candidates).is_none());
    }

    #[test]
    fn test_first_exact_match_wins() {
        let candidates = vec![
            record(
                SourceType::Internal,
                &[("id", "a"), ("Street", "100 Main St"), ("City", "Tampa"), ("St", "FL"), ("Zip", "33701")],
            ),
            record(
                SourceType::Internal,
                &[("id", "b"), ("Street", "100 Main St"), ("City", "Tampa"), ("St", "FL"), ("Zip", "33701")],
            ),
        ];
        assert_eq!(verify_exact_match(&golden(), &candidates).unwrap().text("id"), "a");
    }

    #[test]
    fn test_missing_fields_compare_equal() {
        // Neither side has a postal code: the empty values are considered equal
        let golden = record(
            SourceType::GoldenSource,
            &[("address1", "100 Main St"), ("Mailing City", "Tampa"), ("state", "FL")],
        );
        let candidates = vec![record(
            SourceType::Internal,
            &[("SITE_ADDRESS", "100 Main St"), ("SITE_CITY", "Tampa"), ("ST", "FL")],
        )];
        assert!(verify_exact_match(&golden, &candidates).is_some());

        // One side blank, the other present: not equal
        let candidates = vec![record(
            SourceType::Internal,
            &[("SITE_ADDRESS", "100 Main St"), ("SITE_CITY", "Tampa"), ("ST", "FL"), ("SITE_ZIP", "33701")],
        )];
        assert!(verify_exact_match(&golden, &candidates).is_none());
    }

    #[test]
    fn test_golden_full_address_column_is_compared() {
        let golden = record(
            SourceType::GoldenSource,
            &[("FullAddress", "100 Main St"), ("City", "Tampa"), ("State", "FL"), ("Zip", "33701")],
        );
        let same = vec![record(
            SourceType::Internal,
            &[("Street", "100 main st"), ("City", "Tampa"), ("St", "FL"), ("Zip", "33701")],
        )];
        assert!(verify_exact_match(&golden, &same).is_some());

        // The street is compared, not treated as blank on the golden side
        let other = vec![record(
            SourceType::Internal,
            &[("Street", "102 Main St"), ("City", "Tampa"), ("St", "FL"), ("Zip", "33701")],
        )];
        assert!(verify_exact_match(&golden, &other).is_none());
    }

    #[test]
    fn test_sniff_uses_first_hit_per_field() {
        let sniffed = sniff_columns(
            ["OwnerAddress", "street", "town", "ST", "state", "postal_code"].into_iter(),
        );
        assert_eq!(sniffed.address.as_deref(), Some("OwnerAddress"));
        assert_eq!(sniffed.city.as_deref(), Some("town"));
        assert_eq!(sniffed.state.as_deref(), Some("ST"));
        assert_eq!(sniffed.zip.as_deref(), Some("postal_code"));
    }

    #[test]
    fn test_sniff_state_requires_whole_name() {
        // "estate_state" is not exactly "state"; "status" is not "st"
        let sniffed = sniff_columns(["estate_state", "status"].into_iter());
        assert_eq!(sniffed, SniffedColumns::default());
    }
}

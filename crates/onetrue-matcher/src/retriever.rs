//! Candidate retrieval from the source tables
//!
//! Two structurally different lookups:
//!
//! - **Fuzzy retrieval** filters a table on the parsed input (state AND city
//!   AND (street name OR street type)), scores each row's canonical text
//!   against the input and keeps rows at or above the threshold.
//! - **Secondary lookup** is a deterministic scan for one already-chosen
//!   golden record: street number prefix AND core street name AND state.
//!
//! Column mappings are rediscovered on every call; schemas are never cached.

use crate::config::MatcherConfig;
use crate::error::MatcherError;
use crate::merge;
use crate::similarity::SimilarityScorer;
use crate::types::RetrievalResult;
use onetrue_domain::traits::AddressSource;
use onetrue_domain::{
    decompose, parse_input, AddressRecord, CanonicalField, ColumnMapping, Filter, LikePattern,
    SearchCriteria, SelectQuery, SourceType, TableRef,
};
use std::fmt::Display;
use tracing::{debug, info, warn};

/// Runs candidate queries against one [`AddressSource`]
pub struct CandidateRetriever<'a, S> {
    source: &'a S,
    scorer: &'a dyn SimilarityScorer,
    config: &'a MatcherConfig,
}

impl<'a, S> CandidateRetriever<'a, S>
where
    S: AddressSource,
    S::Error: Display,
{
    /// Create a retriever over a source
    pub fn new(source: &'a S, scorer: &'a dyn SimilarityScorer, config: &'a MatcherConfig) -> Self {
        Self {
            source,
            scorer,
            config,
        }
    }

    /// Retrieve fuzzy candidates from the golden source and internal tables
    ///
    /// Tables are queried sequentially. `threshold` overrides the configured
    /// fuzzy threshold for this call.
    ///
    /// # Errors
    ///
    /// Returns [`MatcherError::Source`] if either table cannot be introspected
    /// or queried. An unmappable schema is not an error: that source simply
    /// contributes no candidates.
    pub fn retrieve(
        &self,
        input_address: &str,
        threshold: Option<f64>,
    ) -> Result<RetrievalResult, MatcherError> {
        let threshold = threshold.unwrap_or(self.config.fuzzy_threshold);
        let criteria = parse_input(input_address);
        debug!("Search criteria: {:?}", criteria);

        let golden_source_matches = self.fuzzy_candidates(
            input_address,
            &criteria,
            &self.config.golden_source(),
            SourceType::GoldenSource,
            threshold,
        )?;
        let internal_matches = self.fuzzy_candidates(
            input_address,
            &criteria,
            &self.config.internal(),
            SourceType::Internal,
            threshold,
        )?;

        let total_matches = golden_source_matches.len() + internal_matches.len();
        info!(
            "Found {} candidates ({} golden source, {} internal) at threshold {}",
            total_matches,
            golden_source_matches.len(),
            internal_matches.len(),
            threshold
        );

        Ok(RetrievalResult {
            criteria,
            golden_source_matches,
            internal_matches,
            total_matches,
        })
    }

    /// Fuzzy candidates from one table, descending by score
    pub fn fuzzy_candidates(
        &self,
        input_address: &str,
        criteria: &SearchCriteria,
        table: &TableRef,
        source_type: SourceType,
        threshold: f64,
    ) -> Result<Vec<AddressRecord>, MatcherError> {
        let columns = self
            .source
            .columns(table)
            .map_err(|e| MatcherError::Source(format!("{}: {}", table, e)))?;
        let mapping = ColumnMapping::discover(&columns);
        info!("Column mapping for {}: {}", table, mapping);

        let Some(filter) = Self::fuzzy_filter(criteria, &mapping) else {
            warn!(
                "No street column discovered in {}; skipping {} candidates",
                table, source_type
            );
            return Ok(Vec::new());
        };

        let query = SelectQuery::all(table.clone())
            .with_filter(filter)
            .with_limit(self.config.candidate_limit);
        let rows = self
            .source
            .select(&query)
            .map_err(|e| MatcherError::Source(format!("Database query error on {}: {}", table, e)))?;
        let fetched = rows.len();

        let table_name = table.to_string();
        let mut candidates: Vec<AddressRecord> = rows
            .into_pairs()
            .into_iter()
            .map(|fields| {
                let record = AddressRecord::new(fields, mapping.clone(), source_type, table_name.as_str());
                let score = self.scorer.score(input_address, record.canonical_text());
                record.with_similarity_score(score)
            })
            .filter(|record| record.similarity_score() >= threshold)
            .collect();
        merge::rank(&mut candidates);

        debug!(
            "{}: {} rows fetched, {} at or above {}",
            table,
            fetched,
            candidates.len(),
            threshold
        );
        Ok(candidates)
    }

    /// state AND city AND (street name OR street type)
    ///
    /// Dimensions whose column is unbound, or whose term is absent, are left
    /// out. Returns `None` when no address column is bound (a lone full-text
    /// column counts), since the table cannot be matched on the street at all.
    fn fuzzy_filter(criteria: &SearchCriteria, mapping: &ColumnMapping) -> Option<Filter> {
        let street_column = mapping.get(CanonicalField::Address)?;

        let mut all = Vec::new();
        for (field, term) in [
            (CanonicalField::State, &criteria.state),
            (CanonicalField::City, &criteria.city),
        ] {
            if let (Some(column), Some(term)) = (mapping.get(field), term) {
                all.push(Filter::like(column, LikePattern::Contains(term.clone())));
            }
        }

        let street_terms: Vec<Filter> = [&criteria.street_name, &criteria.street_type]
            .into_iter()
            .flatten()
            .map(|term| Filter::like(street_column, LikePattern::Contains(term.clone())))
            .collect();
        all.push(Filter::Any(street_terms));

        Some(Filter::All(all))
    }

    /// Deterministic lookup of rows that share a golden record's street
    /// number, core street name and state
    ///
    /// Never fails: a missing table, an unmappable schema, a golden record
    /// without a decomposable street line or a failed query all yield an
    /// empty list. Rows are scored against the golden record's canonical
    /// text for display only.
    pub fn lookup_secondary(&self, golden: &AddressRecord, table: &TableRef) -> Vec<AddressRecord> {
        let columns = match self.source.columns(table) {
            Ok(columns) => columns,
            Err(e) => {
                warn!("Secondary lookup skipped, cannot introspect {}: {}", table, e);
                return Vec::new();
            }
        };
        let mapping = ColumnMapping::discover(&columns);
        info!("Column mapping for {}: {}", table, mapping);

        let (Some(address_column), Some(state_column)) =
            (mapping.get(CanonicalField::Address), mapping.get(CanonicalField::State))
        else {
            warn!(
                "Secondary lookup skipped, {} is missing {:?}",
                table,
                mapping
                    .missing(&[CanonicalField::Address, CanonicalField::State])
                    .iter()
                    .map(|f| f.as_str())
                    .collect::<Vec<_>>()
            );
            return Vec::new();
        };

        let (Some(street_line), Some(state)) = (
            golden.field(CanonicalField::Address),
            golden.field(CanonicalField::State),
        ) else {
            debug!("Secondary lookup skipped, golden record has no street line or state");
            return Vec::new();
        };

        let parts = match decompose(&street_line) {
            Ok(parts) => parts,
            Err(e) => {
                warn!("Secondary lookup skipped: {}", e);
                return Vec::new();
            }
        };
        debug!(
            "Secondary lookup: number={} core='{}' (from '{}') state={}",
            parts.street_number, parts.street_name_core, parts.street_name_full, state
        );

        let query = SelectQuery::all(table.clone()).with_filter(Filter::All(vec![
            Filter::like(address_column, LikePattern::StartsWith(parts.street_number)),
            Filter::like(address_column, LikePattern::Contains(parts.street_name_core)),
            Filter::like(state_column, LikePattern::Equals(state)),
        ]));

        let rows = match self.source.select(&query) {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Error querying {}: {}", table, e);
                return Vec::new();
            }
        };

        let table_name = table.to_string();
        let matches: Vec<AddressRecord> = rows
            .into_pairs()
            .into_iter()
            .map(|fields| {
                let record = AddressRecord::new(fields, mapping.clone(), SourceType::Internal, table_name.as_str());
                let score = self.scorer.score(golden.canonical_text(), record.canonical_text());
                record.with_similarity_score(score)
            })
            .collect();

        info!("Found {} matching address(es) in {}", matches.len(), table);
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::TokenSortRatio;
    use onetrue_domain::{FieldValue, RowSet};
    use std::cell::RefCell;

    /// In-memory source evaluating filters with the reference semantics
    #[derive(Default)]
    struct MemorySource {
        tables: Vec<(String, RowSet)>,
        queries: RefCell<Vec<SelectQuery>>,
        fail_select: bool,
    }

    impl MemorySource {
        fn with_table(mut self, name: &str, columns: &[&str], rows: &[&[&str]]) -> Self {
            self.tables.push((
                name.to_string(),
                RowSet {
                    columns: columns.iter().map(|c| c.to_string()).collect(),
                    rows: rows
                        .iter()
                        .map(|row| row.iter().map(|v| FieldValue::from(*v)).collect())
                        .collect(),
                },
            ));
            self
        }

        fn table(&self, table: &TableRef) -> Result<&RowSet, String> {
            self.tables
                .iter()
                .find(|(name, _)| *name == table.to_string())
                .map(|(_, rows)| rows)
                .ok_or_else(|| format!("no such table: {}", table))
        }
    }

    impl AddressSource for MemorySource {
        type Error = String;

        fn columns(&self, table: &TableRef) -> Result<Vec<String>, Self::Error> {
            Ok(self.table(table)?.columns.clone())
        }

        fn select(&self, query: &SelectQuery) -> Result<RowSet, Self::Error> {
            self.queries.borrow_mut().push(query.clone());
            if self.fail_select {
                return Err("connection reset".to_string());
            }
            let table = self.table(&query.table)?;
            let rows = table
                .rows
                .iter()
                .filter(|row| query.filter.matches(&table.columns, row))
                .take(query.limit.unwrap_or(usize::MAX))
                .cloned()
                .collect();
            Ok(RowSet {
                columns: table.columns.clone(),
                rows,
            })
        }
    }

    const GOLDEN_COLUMNS: &[&str] = &["address1", "address2", "Mailing City", "state", "zipcode"];
    const PINELLAS_COLUMNS: &[&str] = &["PARCEL_ID", "SITE_ADDRESS", "SITE_CITY", "ST", "SITE_ZIP"];

    fn config() -> MatcherConfig {
        MatcherConfig {
            golden_source_table: "public.addresses".to_string(),
            internal_table: "pinellas.baddata".to_string(),
            ..MatcherConfig::default()
        }
    }

    fn source() -> MemorySource {
        MemorySource::default()
            .with_table(
                "public.addresses",
                GOLDEN_COLUMNS,
                &[
                    &["77 Village Ln", "", "Largo", "FL", "33770"],
                    &["79 Village Ln", "", "Largo", "FL", "33770"],
                    &["100 Main St", "", "Tampa", "FL", "33701"],
                    &["77 Village Ln", "", "Albany", "NY", "12207"],
                ],
            )
            .with_table(
                "pinellas.baddata",
                PINELLAS_COLUMNS,
                &[
                    &["1", "77 VILLAGE RD", "LARGO", "FL", "33770"],
                    &["2", "177 Village Rd", "LARGO", "FL", "33770"],
                    &["3", "77 Village Rd", "Albany", "NY", "12207"],
                    &["4", "77 Oak Rd", "LARGO", "FL", "33770"],
                ],
            )
    }

    #[test]
    fn test_retrieve_filters_and_scores() {
        let source = source();
        let config = config();
        let retriever = CandidateRetriever::new(&source, &TokenSortRatio, &config);

        let result = retriever.retrieve("77 Village Ln, Largo, FL 33770", Some(60.0)).unwrap();
        assert_eq!(result.criteria.street_name.as_deref(), Some("Village"));

        // State AND city exclude Albany and Tampa
        assert_eq!(result.golden_source_matches.len(), 2);
        let best = &result.golden_source_matches[0];
        assert_eq!(best.text("address1"), "77 Village Ln");
        assert_eq!(best.similarity_score(), 100.0);
        assert_eq!(best.source_type(), SourceType::GoldenSource);
        assert_eq!(best.source_table(), "public.addresses");
        assert!(result.golden_source_matches[1].similarity_score() < 100.0);
        assert_eq!(
            result.total_matches,
            result.golden_source_matches.len() + result.internal_matches.len()
        );
    }

    #[test]
    fn test_retrieve_applies_threshold() {
        let source = source();
        let config = config();
        let retriever = CandidateRetriever::new(&source, &TokenSortRatio, &config);

        let result = retriever.retrieve("77 Village Ln, Largo, FL 33770", Some(100.0)).unwrap();
        assert_eq!(result.golden_source_matches.len(), 1);
    }

    #[test]
    fn test_filter_shape() {
        let source = source();
        let config = config();
        let scorer = |_: &str, _: &str| 100.0;
        let retriever = CandidateRetriever::new(&source, &scorer, &config);
        retriever.retrieve("77 Village Ln, Largo, FL", None).unwrap();

        let queries = source.queries.borrow();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].limit, Some(config.candidate_limit));
        assert_eq!(
            queries[0].filter,
            Filter::All(vec![
                Filter::like("state", LikePattern::Contains("FL".into())),
                Filter::like("Mailing City", LikePattern::Contains("Largo".into())),
                Filter::Any(vec![
                    Filter::like("address1", LikePattern::Contains("Village".into())),
                    Filter::like("address1", LikePattern::Contains("Ln".into())),
                ]),
            ])
        );
        // The internal table is filtered through its own discovered columns
        assert_eq!(
            queries[1].filter,
            Filter::All(vec![
                Filter::like("ST", LikePattern::Contains("FL".into())),
                Filter::like("SITE_CITY", LikePattern::Contains("Largo".into())),
                Filter::Any(vec![
                    Filter::like("SITE_ADDRESS", LikePattern::Contains("Village".into())),
                    Filter::like("SITE_ADDRESS", LikePattern::Contains("Ln".into())),
                ]),
            ])
        );
    }

    #[test]
    fn test_unmappable_table_yields_no_candidates() {
        let source = source().with_table("legacy", &["id", "owner_name", "land_use"], &[&["1", "x", "y"]]);
        let mut config = config();
        config.internal_table = "legacy".to_string();
        let retriever = CandidateRetriever::new(&source, &TokenSortRatio, &config);

        let result = retriever.retrieve("77 Village Ln, Largo, FL", Some(0.0)).unwrap();
        assert!(result.internal_matches.is_empty());
        assert!(!result.golden_source_matches.is_empty());
        // No query is issued against the unmappable table
        assert_eq!(source.queries.borrow().len(), 1);
    }

    #[test]
    fn test_query_failure_is_source_error() {
        let mut source = source();
        source.fail_select = true;
        let config = config();
        let retriever = CandidateRetriever::new(&source, &TokenSortRatio, &config);

        let err = retriever.retrieve("77 Village Ln, Largo, FL", None).unwrap_err();
        assert!(matches!(err, MatcherError::Source(ref m) if m.contains("connection reset")));
    }

    #[test]
    fn test_missing_table_is_source_error() {
        let source = source();
        let mut config = config();
        config.golden_source_table = "nope".to_string();
        let retriever = CandidateRetriever::new(&source, &TokenSortRatio, &config);
        assert!(matches!(
            retriever.retrieve("77 Village Ln", None),
            Err(MatcherError::Source(_))
        ));
    }

    fn golden_record(street: &str, state: &str) -> AddressRecord {
        AddressRecord::new(
            vec![
                ("address1".to_string(), FieldValue::from(street)),
                ("address2".to_string(), FieldValue::Null),
                ("Mailing City".to_string(), FieldValue::from("Largo")),
                ("state".to_string(), FieldValue::from(state)),
                ("zipcode".to_string(), FieldValue::from("33770")),
            ],
            ColumnMapping::discover(GOLDEN_COLUMNS),
            SourceType::GoldenSource,
            "public.addresses",
        )
    }

    #[test]
    fn test_secondary_lookup_bridges_street_types() {
        let source = source();
        let config = config();
        let retriever = CandidateRetriever::new(&source, &TokenSortRatio, &config);

        let matches = retriever.lookup_secondary(&golden_record("77 Village LN", "FL"), &config.verification());
        let ids: Vec<String> = matches.iter().map(|m| m.text("PARCEL_ID")).collect();
        // "177 Village Rd" fails the number prefix, Albany fails the state
        assert_eq!(ids, vec!["1"]);
        assert_eq!(matches[0].source_type(), SourceType::Internal);

        let queries = source.queries.borrow();
        assert_eq!(
            queries[0].filter,
            Filter::All(vec![
                Filter::like("SITE_ADDRESS", LikePattern::StartsWith("77".into())),
                Filter::like("SITE_ADDRESS", LikePattern::Contains("Village".into())),
                Filter::like("ST", LikePattern::Equals("FL".into())),
            ])
        );
        assert_eq!(queries[0].limit, None);
    }

    #[test]
    fn test_secondary_lookup_skips_undecomposable_street() {
        let source = source();
        let config = config();
        let retriever = CandidateRetriever::new(&source, &TokenSortRatio, &config);

        let matches = retriever.lookup_secondary(&golden_record("Rural Route 5", "FL"), &config.verification());
        assert!(matches.is_empty());
        assert!(source.queries.borrow().is_empty());
    }

    #[test]
    fn test_secondary_lookup_degrades_on_errors() {
        let mut source = source();
        source.fail_select = true;
        let config = config();
        let retriever = CandidateRetriever::new(&source, &TokenSortRatio, &config);
        let golden = golden_record("77 Village Ln", "FL");

        assert!(retriever.lookup_secondary(&golden, &config.verification()).is_empty());
        assert!(retriever.lookup_secondary(&golden, &TableRef::parse("missing")).is_empty());
    }

    #[test]
    fn test_secondary_lookup_on_full_address_column() {
        let source = source().with_table(
            "parcels",
            &["FullAddress", "City", "ST", "Zip"],
            &[
                &["77 Village Rd", "Largo", "FL", "33770"],
                &["78 Village Rd", "Largo", "FL", "33770"],
            ],
        );
        let config = config();
        let retriever = CandidateRetriever::new(&source, &TokenSortRatio, &config);

        let matches = retriever.lookup_secondary(&golden_record("77 Village Ln", "FL"), &TableRef::parse("parcels"));
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].text("FullAddress"), "77 Village Rd");
        assert_eq!(
            source.queries.borrow()[0].filter,
            Filter::All(vec![
                Filter::like("FullAddress", LikePattern::StartsWith("77".into())),
                Filter::like("FullAddress", LikePattern::Contains("Village".into())),
                Filter::like("ST", LikePattern::Equals("FL".into())),
            ])
        );
    }

    #[test]
    fn test_secondary_lookup_requires_state_column() {
        let source = source().with_table("nostate", &["street", "city"], &[&["77 Village Rd", "Largo"]]);
        let config = config();
        let retriever = CandidateRetriever::new(&source, &TokenSortRatio, &config);
        let golden = golden_record("77 Village Ln", "FL");
        assert!(retriever.lookup_secondary(&golden, &TableRef::parse("nostate")).is_empty());
    }
}

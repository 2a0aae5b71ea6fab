//! The reconciliation pipeline

use crate::adjudicator::Adjudicator;
use crate::config::MatcherConfig;
use crate::error::MatcherError;
use crate::retriever::CandidateRetriever;
use crate::similarity::{SimilarityScorer, TokenSortRatio};
use crate::types::{AdjudicationSummary, MatchResult, SearchMethod, Verification};
use crate::verifier::verify_exact_match;
use onetrue_domain::traits::{AddressSource, LlmProvider};
use onetrue_domain::{AddressRecord, SourceType};
use std::fmt::Display;
use tracing::{info, warn};

const NO_MATCH_REASONING: &str =
    "No addresses found matching the search criteria with sufficient similarity in either table.";

/// Matches free-text addresses against the golden source and internal tables
///
/// One run per input address: retrieve fuzzy candidates from both tables,
/// adjudicate the top candidates with the reasoning model, flag low
/// confidence, and verify a golden source pick against the verification
/// table. Every step runs in sequence on the calling thread.
pub struct AddressMatcher<L, S> {
    llm: L,
    source: S,
    config: MatcherConfig,
    scorer: Box<dyn SimilarityScorer>,
}

impl<L, S> AddressMatcher<L, S>
where
    L: LlmProvider,
    S: AddressSource,
    L::Error: Display,
    S::Error: Display,
{
    /// Create a new matcher
    ///
    /// # Errors
    ///
    /// Returns [`MatcherError::Config`] if the configuration is invalid.
    pub fn new(llm: L, source: S, config: MatcherConfig) -> Result<Self, MatcherError> {
        config.validate().map_err(MatcherError::Config)?;
        Ok(Self {
            llm,
            source,
            config,
            scorer: Box::new(TokenSortRatio),
        })
    }

    /// Replace the similarity scorer
    pub fn with_scorer(mut self, scorer: impl SimilarityScorer + 'static) -> Self {
        self.scorer = Box::new(scorer);
        self
    }

    /// The configuration this matcher runs with
    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// The address source
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The reasoning-model provider
    pub fn llm(&self) -> &L {
        &self.llm
    }

    /// Match an address at the configured fuzzy threshold
    pub fn match_address(&self, input_address: &str) -> Result<MatchResult, MatcherError> {
        self.match_address_with_threshold(input_address, None)
    }

    /// Match an address, optionally overriding the fuzzy threshold
    ///
    /// # Errors
    ///
    /// Returns [`MatcherError::Source`] if candidate retrieval fails.
    /// Adjudication and secondary lookup failures degrade instead.
    pub fn match_address_with_threshold(
        &self,
        input_address: &str,
        threshold: Option<f64>,
    ) -> Result<MatchResult, MatcherError> {
        info!("Matching address: {}", input_address);

        let retriever = CandidateRetriever::new(&self.source, self.scorer.as_ref(), &self.config);
        let retrieval = retriever.retrieve(input_address, threshold)?;
        let mut golden_source_matches = retrieval.golden_source_matches;
        let mut internal_matches = retrieval.internal_matches;

        let adjudication = Adjudicator::new(&self.llm).adjudicate(
            input_address,
            &mut golden_source_matches,
            &mut internal_matches,
            self.config.adjudication_top_n,
        );
        let Some(adjudication) = adjudication else {
            info!("No candidates found for '{}'", input_address);
            return Ok(self.no_match(input_address));
        };

        let confidence_threshold = self.config.confidence_threshold;
        let business_rule_exception = adjudication.confidence < confidence_threshold;
        if business_rule_exception {
            warn!(
                "Business rule exception: confidence {:.2}% is below threshold {}%, manual review recommended",
                adjudication.confidence, confidence_threshold
            );
        } else {
            info!(
                "High confidence match: {:.2}% >= {}%",
                adjudication.confidence, confidence_threshold
            );
        }

        let verification = match adjudication.best_match.source_type() {
            SourceType::GoldenSource => Some(self.verify(&retriever, &adjudication.best_match)),
            SourceType::Internal => None,
        };

        Ok(MatchResult {
            input_address: input_address.to_string(),
            match_found: true,
            has_golden_source: !golden_source_matches.is_empty(),
            has_internal: !internal_matches.is_empty(),
            candidates_searched: retrieval.total_matches,
            confidence: adjudication.confidence,
            reasoning: adjudication.reasoning,
            business_rule_exception,
            confidence_threshold,
            search_method: SearchMethod::FuzzyMatchWithAi,
            adjudication: Some(AdjudicationSummary {
                outcome: adjudication.outcome,
                model: self.llm.model_name().to_string(),
                fuzzy_score: adjudication.fuzzy_score,
                concerns: adjudication.concerns,
                match_found: adjudication.verdict_match_found,
            }),
            best_match: Some(adjudication.best_match),
            golden_source_matches,
            internal_matches,
            verification,
        })
    }

    fn no_match(&self, input_address: &str) -> MatchResult {
        MatchResult {
            input_address: input_address.to_string(),
            match_found: false,
            best_match: None,
            golden_source_matches: Vec::new(),
            internal_matches: Vec::new(),
            has_golden_source: false,
            has_internal: false,
            confidence: 0.0,
            reasoning: NO_MATCH_REASONING.to_string(),
            business_rule_exception: false,
            confidence_threshold: self.config.confidence_threshold,
            candidates_searched: 0,
            search_method: SearchMethod::FuzzyMatch,
            adjudication: None,
            verification: None,
        }
    }

    /// Secondary lookup of a golden source match, then the exact-match check
    fn verify(&self, retriever: &CandidateRetriever<'_, S>, golden: &AddressRecord) -> Verification {
        let table = self.config.verification();
        let candidates = retriever.lookup_secondary(golden, &table);
        let matched_record = verify_exact_match(golden, &candidates).cloned();
        if matched_record.is_some() {
            info!("Exact match confirmed in {}", table);
        }
        Verification {
            table: table.to_string(),
            is_exact_match: matched_record.is_some(),
            matched_record,
            candidates,
        }
    }
}

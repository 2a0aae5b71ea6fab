//! Candidate ranking across sources
//!
//! Each source's list is ranked and truncated on its own before the lists
//! are merged, so one source with many entries cannot crowd the other out of
//! the adjudication window.

use onetrue_domain::{AddressRecord, SourceType};

/// A pointer into one source's candidate list, with its score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedCandidate {
    /// Which list the candidate lives in
    pub source: SourceType,
    /// 0-based position within that list
    pub index: usize,
    /// Similarity score
    pub score: f64,
}

/// Sort candidates by descending similarity, keeping input order on ties
pub fn rank(candidates: &mut [AddressRecord]) {
    candidates.sort_by(|a, b| b.similarity_score().total_cmp(&a.similarity_score()));
}

/// The first `n` candidates of an already-ranked list
pub fn top_n(candidates: &[AddressRecord], n: usize) -> &[AddressRecord] {
    &candidates[..candidates.len().min(n)]
}

/// Merge two ranked lists into one ranking, descending by score
///
/// Golden source entries are concatenated before internal entries and the
/// sort is stable, so on equal scores the golden source comes first and each
/// source keeps its own order.
pub fn merge(golden_source: &[AddressRecord], internal: &[AddressRecord]) -> Vec<RankedCandidate> {
    let mut ranked: Vec<RankedCandidate> = golden_source
        .iter()
        .enumerate()
        .map(|(index, r)| (SourceType::GoldenSource, index, r))
        .chain(
            internal
                .iter()
                .enumerate()
                .map(|(index, r)| (SourceType::Internal, index, r)),
        )
        .map(|(source, index, record)| RankedCandidate {
            source,
            index,
            score: record.similarity_score(),
        })
        .collect();

    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}

//! Fuzzy similarity scoring

/// Scores how alike two address strings are, in [0, 100]
pub trait SimilarityScorer {
    /// Similarity of `a` and `b`; 100 means identical after normalization
    fn score(&self, a: &str, b: &str) -> f64;
}

impl<F> SimilarityScorer for F
where
    F: Fn(&str, &str) -> f64,
{
    fn score(&self, a: &str, b: &str) -> f64 {
        self(a, b)
    }
}

/// Token-sort ratio
///
/// Lowercases, replaces punctuation with spaces, sorts the whitespace
/// tokens, then takes the normalized Levenshtein similarity. Word order and
/// comma placement therefore do not affect the score.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenSortRatio;

impl TokenSortRatio {
    fn normalize(text: &str) -> String {
        let cleaned: String = text
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { ' ' })
            .collect::<String>()
            .to_lowercase();
        let mut tokens: Vec<&str> = cleaned.split_whitespace().collect();
        tokens.sort_unstable();
        tokens.join(" ")
    }
}

impl SimilarityScorer for TokenSortRatio {
    fn score(&self, a: &str, b: &str) -> f64 {
        let a = Self::normalize(a);
        let b = Self::normalize(b);
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        strsim::normalized_levenshtein(&a, &b) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_after_normalization() {
        let scorer = TokenSortRatio;
        assert_eq!(scorer.score("100 Main St, Tampa, FL", "tampa fl 100 MAIN st"), 100.0);
    }

    #[test]
    fn test_close_and_distant() {
        let scorer = TokenSortRatio;
        let close = scorer.score("77 Village Ln, Largo, FL", "77 Village Lane, Largo, FL");
        let distant = scorer.score("77 Village Ln, Largo, FL", "9 Ocean Blvd, Miami, FL");
        assert!(close > 65.0, "close = {}", close);
        assert!(distant < close);
        assert!((0.0..=100.0).contains(&distant));
    }

    #[test]
    fn test_empty_scores_zero() {
        assert_eq!(TokenSortRatio.score("", "100 Main St"), 0.0);
        assert_eq!(TokenSortRatio.score(" , ", " "), 0.0);
    }

    #[test]
    fn test_closure_scorer() {
        let fixed = |_: &str, _: &str| 42.0;
        assert_eq!(fixed.score("a", "b"), 42.0);
    }
}

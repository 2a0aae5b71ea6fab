//! Street address decomposition and free-text input parsing
//!
//! The two source tables disagree on street-type notation ("Village LN" vs
//! "Village Road"). Stripping the trailing street type yields a core street
//! name that matches across both conventions.

use std::fmt;

/// Street-type suffixes recognized at the end of a street name
pub const STREET_TYPES: &[&str] = &[
    "street", "st", "avenue", "ave", "road", "rd", "drive", "dr",
    "lane", "ln", "court", "ct", "circle", "cir", "boulevard", "blvd",
    "way", "place", "pl", "terrace", "ter", "parkway", "pkwy",
    "highway", "hwy", "trail", "trl", "plaza", "plz", "alley", "aly",
    "loop", "square", "sq", "crossing", "xing", "run", "point", "pt",
    "pike", "row", "path", "walk", "commons", "green", "crescent", "cres",
];

/// A street line split into number and name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecomposedAddress {
    /// Leading numeric token ("123")
    pub street_number: String,
    /// Everything after the number ("Oak Ln")
    pub street_name_full: String,
    /// Full name with one trailing street type removed ("Oak")
    pub street_name_core: String,
}

/// Why a street line could not be decomposed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecompositionError {
    /// The line was empty or whitespace
    Empty,
    /// No leading numeric street number
    NoStreetNumber(String),
}

impl fmt::Display for DecompositionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecompositionError::Empty => write!(f, "Address line is empty"),
            DecompositionError::NoStreetNumber(line) => {
                write!(f, "Cannot extract street number from '{}'", line)
            }
        }
    }
}

impl std::error::Error for DecompositionError {}

/// Split a street line into street number, full name and core name
///
/// # Errors
/// Returns [`DecompositionError`] when the line has no leading run of digits
/// followed by a name; callers skip the record rather than match spuriously.
///
/// # Examples
///
/// ```
/// use onetrue_domain::decompose;
///
/// let parts = decompose("123 Oak Ln").unwrap();
/// assert_eq!(parts.street_number, "123");
/// assert_eq!(parts.street_name_core, "Oak");
/// ```
pub fn decompose(address_line: &str) -> Result<DecomposedAddress, DecompositionError> {
    let line = address_line.trim();
    if line.is_empty() {
        return Err(DecompositionError::Empty);
    }

    let (street_number, street_name_full) = match leading_number(line) {
        Some(split) => split,
        None => {
            // Fallback: first whitespace-delimited token must be all digits
            let mut parts = line.splitn(2, char::is_whitespace);
            match (parts.next(), parts.next()) {
                (Some(first), Some(rest))
                    if !first.is_empty() && first.chars().all(|c| c.is_ascii_digit()) =>
                {
                    (first.to_string(), rest.trim().to_string())
                }
                _ => return Err(DecompositionError::NoStreetNumber(line.to_string())),
            }
        }
    };

    if street_name_full.is_empty() {
        return Err(DecompositionError::NoStreetNumber(line.to_string()));
    }

    let (street_name_core, _) = strip_street_type(&street_name_full);

    Ok(DecomposedAddress {
        street_number,
        street_name_full,
        street_name_core,
    })
}

/// `^(\d+)\s+(.+)$`
fn leading_number(line: &str) -> Option<(String, String)> {
    let digits_end = line
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)?;
    if digits_end == 0 {
        return None;
    }
    let rest = &line[digits_end..];
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let name = rest.trim();
    if name.is_empty() {
        return None;
    }
    Some((line[..digits_end].to_string(), name.to_string()))
}

/// Remove one trailing street-type token from a street name
///
/// Returns the core name and the stripped token, if any. Single-token names
/// are returned unchanged: "Court" alone is a name, not a type.
pub fn strip_street_type(street_name: &str) -> (String, Option<String>) {
    let tokens: Vec<&str> = street_name.split_whitespace().collect();
    if tokens.len() < 2 {
        return (street_name.trim().to_string(), None);
    }
    let last = tokens[tokens.len() - 1];
    if is_street_type(last) {
        (tokens[..tokens.len() - 1].join(" "), Some(last.to_string()))
    } else {
        (street_name.trim().to_string(), None)
    }
}

/// Case-insensitive street-type check, trailing "." tolerated
pub fn is_street_type(token: &str) -> bool {
    let normalized = token.trim_end_matches('.').to_lowercase();
    STREET_TYPES.contains(&normalized.as_str())
}

/// Search terms parsed from a free-form input address
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchCriteria {
    /// First comma-separated part ("123 Main St")
    pub street_line: String,
    /// Leading street number, when one was found
    pub street_number: Option<String>,
    /// Core street name, or the whole street line if it could not be decomposed
    pub street_name: Option<String>,
    /// Stripped street-type suffix ("St")
    pub street_type: Option<String>,
    /// City
    pub city: Option<String>,
    /// Two-letter state
    pub state: Option<String>,
    /// 5-digit or ZIP+4 postal code
    pub zip: Option<String>,
}

/// Parse a free-form address such as `"123 Main St, New York, NY 10001"`
///
/// The first comma-separated part is the street line. From the remaining
/// tokens a trailing ZIP and then a trailing two-letter state are peeled off;
/// what is left is the city. Without commas ZIP and state are peeled from the
/// end of the line, and the street line ends at its first street-type token
/// after the number and name; any words after it are the city.
pub fn parse_input(input: &str) -> SearchCriteria {
    let parts: Vec<&str> = input
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    let mut criteria = SearchCriteria::default();
    let Some((street_part, rest)) = parts.split_first() else {
        return criteria;
    };
    let mut street_tokens: Vec<&str> = street_part.split_whitespace().collect();
    let mut tail: Vec<&str> = rest.iter().flat_map(|p| p.split_whitespace()).collect();

    if tail.is_empty() {
        // Without commas the region trails the street line itself; keep at
        // least a number and a name, and never take a street type for a state
        peel_region(&mut street_tokens, 2, true, &mut criteria);
        if let Some(end) = street_type_end(&street_tokens) {
            tail = street_tokens.split_off(end + 1);
        }
    } else {
        peel_region(&mut tail, 0, false, &mut criteria);
    }

    if !tail.is_empty() {
        criteria.city = Some(tail.join(" "));
    }
    criteria.street_line = street_tokens.join(" ");

    match decompose(&criteria.street_line) {
        Ok(parts) => {
            let (_, street_type) = strip_street_type(&parts.street_name_full);
            criteria.street_number = Some(parts.street_number);
            criteria.street_name = Some(parts.street_name_core);
            criteria.street_type = street_type;
        }
        Err(_) if !criteria.street_line.is_empty() => {
            criteria.street_name = Some(criteria.street_line.clone());
        }
        Err(_) => {}
    }

    criteria
}

fn peel_region(tokens: &mut Vec<&str>, keep: usize, street_line: bool, criteria: &mut SearchCriteria) {
    if tokens.len() > keep && tokens.last().is_some_and(|t| looks_like_zip(t)) {
        criteria.zip = tokens.pop().map(str::to_string);
    }
    if tokens.len() > keep
        && tokens
            .last()
            .is_some_and(|t| looks_like_state(t) && !(street_line && is_street_type(t)))
    {
        criteria.state = tokens.pop().map(|s| s.trim_end_matches('.').to_uppercase());
    }
}

/// Index of the first street-type token that follows a number and a name
/// and is itself followed by more words
fn street_type_end(tokens: &[&str]) -> Option<usize> {
    tokens
        .iter()
        .enumerate()
        .skip(2)
        .take(tokens.len().saturating_sub(3))
        .find(|(_, t)| is_street_type(t))
        .map(|(i, _)| i)
}

fn looks_like_zip(token: &str) -> bool {
    let (five, plus_four) = match token.split_once('-') {
        Some((a, b)) => (a, Some(b)),
        None => (token, None),
    };
    five.len() == 5
        && five.chars().all(|c| c.is_ascii_digit())
        && plus_four.map_or(true, |p| p.len() == 4 && p.chars().all(|c| c.is_ascii_digit()))
}

fn looks_like_state(token: &str) -> bool {
    let token = token.trim_end_matches('.');
    token.len() == 2 && token.chars().all(|c| c.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decompose_with_street_type() {
        let parts = decompose("123 Oak Ln").unwrap();
        assert_eq!(parts.street_number, "123");
        assert_eq!(parts.street_name_full, "Oak Ln");
        assert_eq!(parts.street_name_core, "Oak");
    }

    #[test]
    fn test_decompose_without_recognized_suffix() {
        let parts = decompose("456 Grand Concourse").unwrap();
        assert_eq!(parts.street_number, "456");
        assert_eq!(parts.street_name_core, "Grand Concourse");
    }

    #[test]
    fn test_decompose_trailing_period_and_case() {
        let parts = decompose("  77 Village LN.  ").unwrap();
        assert_eq!(parts.street_number, "77");
        assert_eq!(parts.street_name_core, "Village");

        let parts = decompose("9 Bay Pines BLVD").unwrap();
        assert_eq!(parts.street_name_core, "Bay Pines");
    }

    #[test]
    fn test_decompose_strips_only_one_suffix() {
        let parts = decompose("10 Park Ave Ct").unwrap();
        assert_eq!(parts.street_name_core, "Park Ave");
    }

    #[test]
    fn test_decompose_single_token_name_preserved() {
        let parts = decompose("12 Court").unwrap();
        assert_eq!(parts.street_name_core, "Court");
    }

    #[test]
    fn test_decompose_failures() {
        assert_eq!(decompose(""), Err(DecompositionError::Empty));
        assert!(matches!(
            decompose("Rural Route 5"),
            Err(DecompositionError::NoStreetNumber(_))
        ));
        assert!(matches!(decompose("12B Main St"), Err(DecompositionError::NoStreetNumber(_))));
        assert!(matches!(decompose("123"), Err(DecompositionError::NoStreetNumber(_))));
    }

    #[test]
    fn test_is_street_type() {
        assert!(is_street_type("St."));
        assert!(is_street_type("BOULEVARD"));
        assert!(!is_street_type("Concourse"));
    }

    #[test]
    fn test_parse_full_input() {
        let criteria = parse_input("123 Main St, New York, NY 10001");
        assert_eq!(criteria.street_line, "123 Main St");
        assert_eq!(criteria.street_number.as_deref(), Some("123"));
        assert_eq!(criteria.street_name.as_deref(), Some("Main"));
        assert_eq!(criteria.street_type.as_deref(), Some("St"));
        assert_eq!(criteria.city.as_deref(), Some("New York"));
        assert_eq!(criteria.state.as_deref(), Some("NY"));
        assert_eq!(criteria.zip.as_deref(), Some("10001"));
    }

    #[test]
    fn test_parse_two_parts() {
        let criteria = parse_input("500 Bay Pines Blvd, St Petersburg fl 33709-1234");
        assert_eq!(criteria.city.as_deref(), Some("St Petersburg"));
        assert_eq!(criteria.state.as_deref(), Some("FL"));
        assert_eq!(criteria.zip.as_deref(), Some("33709-1234"));
        assert_eq!(criteria.street_name.as_deref(), Some("Bay Pines"));
    }

    #[test]
    fn test_parse_without_commas() {
        let criteria = parse_input("77 Village Ln FL 33770");
        assert_eq!(criteria.street_line, "77 Village Ln");
        assert_eq!(criteria.state.as_deref(), Some("FL"));
        assert_eq!(criteria.zip.as_deref(), Some("33770"));
        assert_eq!(criteria.city, None);
    }

    #[test]
    fn test_parse_city_without_commas() {
        let criteria = parse_input("77 Village Ln Largo FL 33770");
        assert_eq!(criteria.street_line, "77 Village Ln");
        assert_eq!(criteria.street_name.as_deref(), Some("Village"));
        assert_eq!(criteria.street_type.as_deref(), Some("Ln"));
        assert_eq!(criteria.city.as_deref(), Some("Largo"));
        assert_eq!(criteria.state.as_deref(), Some("FL"));
        assert_eq!(criteria.zip.as_deref(), Some("33770"));

        // The first street type ends the street line, so "St" can start a city
        let criteria = parse_input("12 Main St St Petersburg FL");
        assert_eq!(criteria.street_line, "12 Main St");
        assert_eq!(criteria.city.as_deref(), Some("St Petersburg"));

        // A street type in the name position is part of the name
        let criteria = parse_input("5 Court St Tampa");
        assert_eq!(criteria.street_name.as_deref(), Some("Court"));
        assert_eq!(criteria.city.as_deref(), Some("Tampa"));
    }

    #[test]
    fn test_parse_non_numeric_street() {
        let criteria = parse_input("Rural Route 5, Dade City, FL");
        assert_eq!(criteria.street_number, None);
        assert_eq!(criteria.street_name.as_deref(), Some("Rural Route 5"));
        assert_eq!(criteria.city.as_deref(), Some("Dade City"));
        assert_eq!(criteria.state.as_deref(), Some("FL"));
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(parse_input("  , "), SearchCriteria::default());
    }
}

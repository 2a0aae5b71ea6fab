//! Command-line argument parsing.

use clap::Parser;
use std::path::PathBuf;

/// Words that mark a trailing argument as a table name rather than part of the address
const TABLE_KEYWORDS: &[&str] = &["addresses", "table", "backup", "_alt"];

/// OneTrueAddress - Match an address against the golden source and internal tables.
#[derive(Debug, Parser)]
#[command(name = "onetrue")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Address to match; words are joined with spaces. A trailing
    /// `schema.table` argument overrides the golden source table.
    #[arg(required = true, num_args = 1..)]
    pub address: Vec<String>,

    /// Golden source table (`schema.table` or `table`)
    #[arg(short, long)]
    pub table: Option<String>,

    /// Golden source table used when none is given on the command line [env: GOLDEN_SOURCE_TABLE_ALT]
    #[arg(long)]
    pub default_table: Option<String>,

    /// Internal table searched alongside the golden source [env: INTERNAL_TABLE]
    #[arg(long)]
    pub internal_table: Option<String>,

    /// Table for exact-match verification, defaults to the internal table [env: PINELLAS_TABLE]
    #[arg(long)]
    pub verification_table: Option<String>,

    /// SQLite database file [env: GOLDEN_SOURCE_DATABASE]
    #[arg(short, long)]
    pub database: Option<PathBuf>,

    /// Minimum similarity (0-100) for a candidate [env: FUZZY_MATCH_THRESHOLD]
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Confidence (0-100) below which manual review is recommended [env: CONFIDENCE_THRESHOLD]
    #[arg(long)]
    pub confidence_threshold: Option<f64>,

    /// Reasoning model provider [env: LLM_PROVIDER]
    #[arg(long, value_enum)]
    pub provider: Option<ProviderArg>,

    /// Reasoning model name [env: LLM_MODEL]
    #[arg(long)]
    pub model: Option<String>,

    /// Reasoning model API endpoint [env: LLM_ENDPOINT]
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Anthropic API key [env: ANTHROPIC_API_KEY]
    #[arg(long)]
    pub api_key: Option<String>,

    /// Output format
    #[arg(short, long, value_enum)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long)]
    pub verbose: bool,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliFormat {
    /// Summary and candidate tables (default)
    Table,
    /// Full result as JSON
    Json,
    /// Best match text only
    Quiet,
}

/// Reasoning model provider options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ProviderArg {
    /// Anthropic Messages API
    Anthropic,
    /// Local Ollama server
    Ollama,
}

impl Cli {
    /// Split the positional words into the address and an optional table name
    ///
    /// With `--table` every word belongs to the address. Otherwise, when
    /// there are at least two words and the last looks like a table
    /// reference, it is taken as the table.
    pub fn address_and_table(&self) -> (String, Option<String>) {
        if self.table.is_none() && self.address.len() >= 2 {
            if let Some((last, words)) = self.address.split_last() {
                if looks_like_table(last) {
                    return (words.join(" "), Some(last.clone()));
                }
            }
        }
        (self.address.join(" "), self.table.clone())
    }
}

/// `schema.table`, or a name containing one of the table keywords
pub fn looks_like_table(arg: &str) -> bool {
    let lower = arg.to_lowercase();
    lower.contains('.') || TABLE_KEYWORDS.iter().any(|k| lower.contains(k))
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}

impl From<ProviderArg> for crate::config::ProviderKind {
    fn from(provider: ProviderArg) -> Self {
        match provider {
            ProviderArg::Anthropic => crate::config::ProviderKind::Anthropic,
            ProviderArg::Ollama => crate::config::ProviderKind::Ollama,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("onetrue").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_single_argument_address() {
        let cli = parse(&["123 Main St, Tampa, FL 33701"]);
        assert_eq!(
            cli.address_and_table(),
            ("123 Main St, Tampa, FL 33701".to_string(), None)
        );
    }

    #[test]
    fn test_words_joined() {
        let cli = parse(&["123", "Main", "St,", "Tampa,", "FL"]);
        assert_eq!(cli.address_and_table().0, "123 Main St, Tampa, FL");
        assert_eq!(cli.address_and_table().1, None);
    }

    #[test]
    fn test_trailing_table_reference() {
        let cli = parse(&["123 Main St, Tampa, FL", "public.addresses_backup"]);
        assert_eq!(
            cli.address_and_table(),
            (
                "123 Main St, Tampa, FL".to_string(),
                Some("public.addresses_backup".to_string())
            )
        );

        let cli = parse(&["123", "Main", "St", "gs_alt"]);
        assert_eq!(cli.address_and_table().1.as_deref(), Some("gs_alt"));
    }

    #[test]
    fn test_lone_table_like_argument_is_address() {
        let cli = parse(&["St. Petersburg"]);
        assert_eq!(cli.address_and_table(), ("St. Petersburg".to_string(), None));
    }

    #[test]
    fn test_explicit_table_keeps_all_words() {
        let cli = parse(&["--table", "gs", "1 Main St.", "Tampa"]);
        assert_eq!(
            cli.address_and_table(),
            ("1 Main St. Tampa".to_string(), Some("gs".to_string()))
        );
    }

    #[test]
    fn test_looks_like_table() {
        assert!(looks_like_table("public.addresses"));
        assert!(looks_like_table("ADDRESSES_2024"));
        assert!(looks_like_table("my_table"));
        assert!(!looks_like_table("33701"));
        assert!(!looks_like_table("FL"));
    }

    #[test]
    fn test_parsing_reads_only_arguments() {
        // Environment variables are applied later, in Config::resolve
        let cli = parse(&["1 Main St"]);
        assert_eq!(cli.database, None);
        assert_eq!(cli.default_table, None);
        assert_eq!(cli.threshold, None);
        assert_eq!(cli.provider, None);
        assert_eq!(cli.api_key, None);
    }

    #[test]
    fn test_address_required() {
        assert!(Cli::try_parse_from(["onetrue"]).is_err());
    }

    #[test]
    fn test_options() {
        let cli = parse(&[
            "-f", "json", "--provider", "ollama", "--threshold", "80", "-v", "1 Main St",
        ]);
        assert_eq!(cli.format, Some(CliFormat::Json));
        assert_eq!(cli.provider, Some(ProviderArg::Ollama));
        assert_eq!(cli.threshold, Some(80.0));
        assert!(cli.verbose);
    }
}

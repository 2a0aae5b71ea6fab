//! Configuration management for the CLI.
//!
//! Settings are resolved once per run with the precedence command-line flag,
//! then environment, then `~/.onetrue/config.toml`, then the built-in default.

use crate::cli::Cli;
use crate::error::{CliError, Result};
use onetrue_matcher::MatcherConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Golden source table when nothing else names one
pub const DEFAULT_GOLDEN_SOURCE_TABLE: &str = "addresses_backup";

/// Ollama model when none is configured
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.1";

/// SQLite database file
pub const ENV_DATABASE: &str = "GOLDEN_SOURCE_DATABASE";
/// Golden source table when none is given on the command line
pub const ENV_DEFAULT_TABLE: &str = "GOLDEN_SOURCE_TABLE_ALT";
/// Internal table
pub const ENV_INTERNAL_TABLE: &str = "INTERNAL_TABLE";
/// Verification table
pub const ENV_VERIFICATION_TABLE: &str = "PINELLAS_TABLE";
/// Minimum candidate similarity
pub const ENV_FUZZY_THRESHOLD: &str = "FUZZY_MATCH_THRESHOLD";
/// Manual review threshold
pub const ENV_CONFIDENCE_THRESHOLD: &str = "CONFIDENCE_THRESHOLD";
/// `anthropic` or `ollama`
pub const ENV_PROVIDER: &str = "LLM_PROVIDER";
/// Reasoning model name
pub const ENV_MODEL: &str = "LLM_MODEL";
/// Reasoning model endpoint
pub const ENV_ENDPOINT: &str = "LLM_ENDPOINT";
/// Anthropic API key
pub const ENV_API_KEY: &str = "ANTHROPIC_API_KEY";

/// CLI configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Database settings
    #[serde(default)]
    pub database: DatabaseSection,

    /// Table names
    #[serde(default)]
    pub tables: TablesSection,

    /// Matching thresholds and limits
    #[serde(default)]
    pub matching: MatchingSection,

    /// Reasoning model settings
    #[serde(default)]
    pub llm: LlmSection,

    /// Display settings
    #[serde(default)]
    pub settings: Settings,
}

/// `[database]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseSection {
    /// SQLite database file
    pub path: Option<PathBuf>,
}

/// `[tables]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TablesSection {
    /// Golden source table
    pub golden_source: Option<String>,
    /// Internal table
    pub internal: Option<String>,
    /// Verification table
    pub verification: Option<String>,
}

/// `[matching]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchingSection {
    /// Minimum similarity for a candidate
    pub fuzzy_threshold: Option<f64>,
    /// Manual review threshold
    pub confidence_threshold: Option<f64>,
    /// Rows fetched per source query
    pub candidate_limit: Option<usize>,
    /// Candidates per source sent for adjudication
    pub adjudication_top_n: Option<usize>,
}

/// `[llm]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmSection {
    /// Provider
    pub provider: Option<ProviderKind>,
    /// Model name
    pub model: Option<String>,
    /// API endpoint
    pub endpoint: Option<String>,
    /// API key (prefer the environment)
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
    /// Completion budget (Anthropic only)
    pub max_tokens: Option<u32>,
}

/// Global CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
    /// Quiet (minimal) format
    Quiet,
}

/// Reasoning model provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Anthropic Messages API
    #[default]
    Anthropic,
    /// Local Ollama server
    Ollama,
}

/// Everything one run needs, after precedence has been applied.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Address to match
    pub address: String,
    /// SQLite database file
    pub database: PathBuf,
    /// Matcher configuration
    pub matcher: MatcherConfig,
    /// Reasoning model settings
    pub llm: LlmSettings,
    /// Output format
    pub format: OutputFormat,
    /// Colored output
    pub color: bool,
}

/// Resolved reasoning model settings.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
    /// Provider
    pub provider: ProviderKind,
    /// Model name (provider default when `None`)
    pub model: Option<String>,
    /// API endpoint (provider default when `None`)
    pub endpoint: Option<String>,
    /// API key
    pub api_key: Option<String>,
    /// Request timeout in seconds (provider default when `None`)
    pub timeout_secs: Option<u64>,
    /// Completion budget (provider default when `None`)
    pub max_tokens: Option<u32>,
}

impl Config {
    /// Get the default configuration file path.
    pub fn path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".onetrue").join("config.toml"))
    }

    /// Load the default configuration file, or defaults if it does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Load a configuration file, or defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)?;
            Ok(toml::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply command-line and process-environment overrides on top of this file.
    pub fn resolve(&self, cli: &Cli) -> Result<RunConfig> {
        self.resolve_with_env(cli, |key| std::env::var(key).ok())
    }

    /// Apply overrides with environment lookups going through `env`.
    ///
    /// Blank environment values count as unset.
    pub fn resolve_with_env<F>(&self, cli: &Cli, env: F) -> Result<RunConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let (address, table_arg) = cli.address_and_table();
        if address.trim().is_empty() {
            return Err(CliError::InvalidInput("Address must not be empty".to_string()));
        }

        let database = cli
            .database
            .clone()
            .or_else(|| var(ENV_DATABASE).map(PathBuf::from))
            .or_else(|| self.database.path.clone())
            .ok_or_else(|| {
                CliError::Config(format!(
                    "No database configured. Use --database, {} or [database] path in the config file",
                    ENV_DATABASE
                ))
            })?;

        let defaults = MatcherConfig::default();
        let matching = &self.matching;
        let fuzzy_threshold = match cli.threshold {
            Some(threshold) => Some(threshold),
            None => var(ENV_FUZZY_THRESHOLD)
                .map(|v| parse_env(ENV_FUZZY_THRESHOLD, &v))
                .transpose()?,
        };
        let confidence_threshold = match cli.confidence_threshold {
            Some(threshold) => Some(threshold),
            None => var(ENV_CONFIDENCE_THRESHOLD)
                .map(|v| parse_env(ENV_CONFIDENCE_THRESHOLD, &v))
                .transpose()?,
        };
        let matcher = MatcherConfig {
            golden_source_table: table_arg
                .or_else(|| cli.default_table.clone())
                .or_else(|| var(ENV_DEFAULT_TABLE))
                .or_else(|| self.tables.golden_source.clone())
                .unwrap_or_else(|| DEFAULT_GOLDEN_SOURCE_TABLE.to_string()),
            internal_table: cli
                .internal_table
                .clone()
                .or_else(|| var(ENV_INTERNAL_TABLE))
                .or_else(|| self.tables.internal.clone())
                .unwrap_or(defaults.internal_table),
            verification_table: cli
                .verification_table
                .clone()
                .or_else(|| var(ENV_VERIFICATION_TABLE))
                .or_else(|| self.tables.verification.clone()),
            fuzzy_threshold: fuzzy_threshold
                .or(matching.fuzzy_threshold)
                .unwrap_or(defaults.fuzzy_threshold),
            confidence_threshold: confidence_threshold
                .or(matching.confidence_threshold)
                .unwrap_or(defaults.confidence_threshold),
            candidate_limit: matching.candidate_limit.unwrap_or(defaults.candidate_limit),
            adjudication_top_n: matching
                .adjudication_top_n
                .unwrap_or(defaults.adjudication_top_n),
        };
        matcher.validate().map_err(CliError::Config)?;

        let provider = match cli.provider {
            Some(provider) => Some(provider.into()),
            None => var(ENV_PROVIDER)
                .map(|v| parse_env::<ProviderKind>(ENV_PROVIDER, &v))
                .transpose()?,
        };
        let llm = LlmSettings {
            provider: provider.or(self.llm.provider).unwrap_or_default(),
            model: cli
                .model
                .clone()
                .or_else(|| var(ENV_MODEL))
                .or_else(|| self.llm.model.clone()),
            endpoint: cli
                .endpoint
                .clone()
                .or_else(|| var(ENV_ENDPOINT))
                .or_else(|| self.llm.endpoint.clone()),
            api_key: cli
                .api_key
                .clone()
                .or_else(|| var(ENV_API_KEY))
                .or_else(|| self.llm.api_key.clone()),
            timeout_secs: self.llm.timeout_secs,
            max_tokens: self.llm.max_tokens,
        };
        if llm.provider == ProviderKind::Anthropic
            && llm.api_key.as_deref().map_or(true, |k| k.trim().is_empty())
        {
            return Err(CliError::Config(format!(
                "Anthropic provider requires an API key. Set {}, --api-key or [llm] api_key",
                ENV_API_KEY
            )));
        }

        Ok(RunConfig {
            address,
            database,
            matcher,
            llm,
            format: cli.format.map(Into::into).unwrap_or(self.settings.format),
            color: !cli.no_color && self.settings.color,
        })
    }
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid value for {}: '{}'", key, value)))
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" => Ok(ProviderKind::Anthropic),
            "ollama" => Ok(ProviderKind::Ollama),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}

//! OneTrueAddress CLI library.
//!
//! Argument parsing, configuration layering, provider selection and
//! output formatting for the `onetrue` command.

pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod provider;

pub use cli::Cli;
pub use config::{Config, RunConfig};
pub use error::{CliError, Result};
pub use output::Formatter;
pub use provider::Provider;

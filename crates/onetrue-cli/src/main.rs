//! OneTrueAddress CLI - reconcile one address against the golden source and internal tables.

use clap::Parser;
use onetrue_cli::{Cli, Config, Formatter, Provider};
use onetrue_matcher::AddressMatcher;
use onetrue_store::SqliteSource;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> onetrue_cli::Result<()> {
    let cli = Cli::parse();

    // Log to stderr so stdout carries only the result
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let run = config.resolve(&cli)?;
    debug!("Golden source table: {}", run.matcher.golden_source_table);
    debug!("Internal table: {}", run.matcher.internal_table);

    let source = SqliteSource::open(&run.database)?;
    let provider = Provider::from_settings(&run.llm)?;
    let matcher = AddressMatcher::new(provider, source, run.matcher)?;

    let result = matcher.match_address(&run.address)?;

    let formatter = Formatter::new(run.format, run.color);
    println!("{}", formatter.format_result(&result)?);

    Ok(())
}

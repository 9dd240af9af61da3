//! Montage CLI
//!
//! Loads a session description, drives it through the session commands and
//! prints the resulting scope tree or fixture.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use montage_core::logging_facility::{self, Profile};
use montage_engine::EngineConfig;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "montage")]
#[command(about = "Montage - Session model of the edit", long_about = None)]
struct Cli {
    /// Logging profile: dev, prod or quiet
    #[arg(long, global = true, default_value = "quiet")]
    log: Profile,

    /// Engine configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the scope tree of a session
    Tree(commands::tree::TreeArgs),
    /// Build and print the fixture of a session
    Fixture(commands::fixture::FixtureArgs),
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(EngineConfig::from_toml_file(path)?),
        None => Ok(EngineConfig::default()),
    }
}

fn main() {
    let cli = Cli::parse();
    logging_facility::init(cli.log);

    let result = load_config(cli.config.as_ref()).and_then(|config| match cli.command {
        Commands::Tree(args) => commands::tree::execute(args, &config),
        Commands::Fixture(args) => commands::fixture::execute(args, &config),
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

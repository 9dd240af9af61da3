//! Fixture command
//!
//! Usage: montage fixture <SESSION> [--output <FILE>]

use clap::Args;
use montage_core::Fixture;
use montage_engine::EngineConfig;
use std::path::PathBuf;

use super::session_file;

#[derive(Debug, Args)]
pub struct FixtureArgs {
    /// Session description (JSON)
    pub session: PathBuf,

    /// Also write the fixture as JSON to this file
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub fn execute(args: FixtureArgs, config: &EngineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let loaded = session_file::load(&args.session, config)?;
    let fixture = loaded.session.fixture()?;

    for line in summary(&fixture) {
        println!("{}", line);
    }

    if let Some(output) = &args.output {
        let json = serde_json::to_string_pretty(fixture.as_ref())?;
        std::fs::write(output, json)?;
        println!("Fixture written to {}", output.display());
    }

    loaded.close()
}

fn summary(fixture: &Fixture) -> Vec<String> {
    let mut lines: Vec<String> = fixture
        .segments()
        .iter()
        .map(|segment| {
            let names: Vec<&str> = segment.elements.iter().map(|e| e.name.as_str()).collect();
            format!("[{} .. {}) {}", segment.span.start, segment.span.end, names.join(", "))
        })
        .collect();
    lines.push(format!("segments: {}", fixture.len()));
    lines.push(format!("digest: {}", fixture.digest()));
    lines
}

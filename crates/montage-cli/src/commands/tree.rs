//! Scope tree command
//!
//! Usage: montage tree <SESSION> [--ids]

use clap::Args;
use montage_core::{PlacementId, PlacementIndex, Result};
use montage_engine::EngineConfig;
use std::path::PathBuf;

use super::session_file;

#[derive(Debug, Args)]
pub struct TreeArgs {
    /// Session description (JSON)
    pub session: PathBuf,

    /// Append the short placement ID to every line
    #[arg(long)]
    pub ids: bool,
}

pub fn execute(args: TreeArgs, config: &EngineConfig) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let loaded = session_file::load(&args.session, config)?;

    let index = loaded.session.index();
    let mut lines = Vec::new();
    render(index, index.root_id(), 0, args.ids, &mut lines)?;
    for line in &lines {
        println!("{}", line);
    }

    loaded.close()
}

/// One line per placement, children indented below their scope
fn render(
    index: &PlacementIndex,
    id: PlacementId,
    depth: usize,
    ids: bool,
    lines: &mut Vec<String>,
) -> Result<()> {
    let placement = index.find(id)?;
    let subject = placement.subject();

    let mut line = format!("{}{} \"{}\"", "  ".repeat(depth), subject.kind_name(), subject.name());
    if let Some(duration) = subject.duration() {
        let start = placement.resolve(index)?.start;
        line.push_str(&format!(" @{} +{}", start, duration));
    }
    if ids {
        line.push_str(&format!(" [{}]", id.short()));
    }
    lines.push(line);

    for child in index.children(id)? {
        render(index, child, depth + 1, ids, lines)?;
    }
    Ok(())
}

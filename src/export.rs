//! Export the whole board as a single JSON document.
//!
//! Unlike the persisted snapshot this is the in-memory state verbatim: it
//! includes the credential and any open draft or insight text.

use anyhow::{Context, Result};
use std::path::Path;

use crate::app::AppController;

/// Export the board as JSON.
///
/// If `output` is `Some`, writes to that file path. Otherwise writes
/// to stdout for piping.
pub fn run_export(app: &AppController, output: Option<&Path>) -> Result<()> {
    let json = app.export_json()?;
    let state = app.state();

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &json)
                .with_context(|| format!("Failed to write export: {}", path.display()))?;
            eprintln!(
                "Exported {} blocks, {} channels to {}",
                state.blocks.len(),
                state.channels.len(),
                path.display()
            );
            if state.has_api_key() {
                eprintln!("Note: the export contains your API key.");
            }
        }
        None => {
            println!("{}", json);
        }
    }

    Ok(())
}

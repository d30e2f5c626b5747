//! Quire CLI: LLM enrichment and review for a markdown content directory.
//!
//! Reads articles with YAML frontmatter, fills in structured metadata, and
//! annotates drafts with paragraph-level editorial comments.

mod commands;

use std::path::Path;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing::{debug, warn};

use commands::Cli;

/// Environment files read from the working directory, highest priority first.
const ENV_FILES: [&str; 2] = [".env.local", ".env"];

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    for name in ENV_FILES {
        load_env_file(Path::new(name));
    }
    commands::run(cli).await
}

#[derive(Debug, PartialEq, Eq)]
enum EnvFile {
    Loaded,
    Missing,
    Invalid,
}

/// Load one env file. Absent files are fine; unreadable or malformed ones
/// are reported and skipped.
fn load_env_file(path: &Path) -> EnvFile {
    match dotenvy::from_path(path) {
        Ok(()) => {
            debug!(path = %path.display(), "loaded environment file");
            EnvFile::Loaded
        }
        Err(e) if e.not_found() => EnvFile::Missing,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not load environment file");
            EnvFile::Invalid
        }
    }
}

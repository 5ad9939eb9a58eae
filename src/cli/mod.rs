pub mod build;
pub mod clean;
pub mod completions;
pub mod watch;

use clap::{Parser, Subcommand};

/// kiln - Asset pipeline for 2D tile games
#[derive(Parser, Debug)]
#[command(name = "kiln")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build all assets from the project's source directories
    Build(build::BuildArgs),

    /// Rebuild on changes and emit live-reload events
    Watch(watch::WatchArgs),

    /// Remove generated artifacts
    Clean(clean::CleanArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

use clap::Parser;
use kiln::cli::{Cli, Commands};
use miette::Result;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build(args) => kiln::cli::build::run(args)?,
        Commands::Watch(args) => kiln::cli::watch::run(args)?,
        Commands::Clean(args) => kiln::cli::clean::run(args)?,
        Commands::Completions(args) => kiln::cli::completions::run(args)?,
    }

    Ok(())
}

//! Build command implementation.
//!
//! Runs one dependency-ordered pass over all registered plugins. The
//! exit status reflects the accumulated error counter: independent
//! plugins keep building past a failure, and the command fails at the
//! end if anything went wrong.

use std::path::PathBuf;

use clap::Args;

use crate::context::BuildContext;
use crate::error::{KilnError, Result};
use crate::manifest::Manifest;
use crate::output::{display_path, plural};
use crate::plugin::Orchestrator;
use crate::sprite::SpriteCompositor;

/// Build all assets from the project's source directories
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Project root directory (holds kiln.yaml)
    #[arg(default_value = ".")]
    pub root: PathBuf,

    /// Ignore staleness checks and rebuild everything
    #[arg(long)]
    pub clean: bool,

    /// Use production encode settings
    #[arg(long)]
    pub production: bool,

    /// Output directory override
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

pub fn run(args: BuildArgs) -> Result<()> {
    let manifest = load_manifest(&args.root, args.output.as_deref())?;
    let ctx = BuildContext::new(args.production || manifest.production, args.clean);

    let mut orchestrator = register_plugins(&manifest);
    orchestrator.run_init(&ctx)?;
    orchestrator.run_build(&ctx);

    let errors = ctx.error_count();
    if errors > 0 {
        return Err(KilnError::Build {
            message: format!("Build finished with {}", plural(errors, "error", "errors")),
            help: None,
        });
    }

    println!("Built assets to {}", display_path(&manifest.output));
    Ok(())
}

/// Register the built-in plugin set against one project manifest.
pub fn register_plugins(manifest: &Manifest) -> Orchestrator {
    let mut orchestrator = Orchestrator::new();
    orchestrator.register(Box::new(SpriteCompositor::new(manifest)));
    orchestrator
}

/// Load kiln.yaml and resolve its paths against the project root.
pub fn load_manifest(root: &std::path::Path, output_override: Option<&std::path::Path>) -> Result<Manifest> {
    let mut manifest = Manifest::load_or_default(root)?;
    if let Some(output) = output_override {
        manifest.output = output.to_path_buf();
    }
    // `join` keeps absolute paths as-is.
    manifest.sprites = root.join(&manifest.sprites);
    manifest.output = root.join(&manifest.output);
    Ok(manifest)
}

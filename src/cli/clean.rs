//! Clean command implementation.
//!
//! Best-effort removal of every plugin's declared output paths.

use std::path::PathBuf;

use clap::Args;

use crate::context::BuildContext;
use crate::error::Result;

use super::build::{load_manifest, register_plugins};

/// Remove generated artifacts
#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Project root directory (holds kiln.yaml)
    #[arg(default_value = ".")]
    pub root: PathBuf,
}

pub fn run(args: CleanArgs) -> Result<()> {
    let manifest = load_manifest(&args.root, None)?;
    let ctx = BuildContext::new(false, true);

    let mut orchestrator = register_plugins(&manifest);
    orchestrator.run_clean(&ctx)
}

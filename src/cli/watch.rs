//! Watch command implementation.
//!
//! Runs one full build, then hands control to the watch router: file
//! events are debounced into batches, classified per plugin, and each
//! affected sheet is rebuilt with a "sheet updated" event for
//! live-reload listeners. The session logs errors continuously and only
//! terminates with the watcher backend.

use std::path::PathBuf;

use clap::Args;

use crate::context::BuildContext;
use crate::error::Result;
use crate::plugin::watch_session;

use super::build::{load_manifest, register_plugins};

/// Rebuild on changes and emit live-reload events
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Project root directory (holds kiln.yaml)
    #[arg(default_value = ".")]
    pub root: PathBuf,

    /// Use production encode settings
    #[arg(long)]
    pub production: bool,

    /// Output directory override
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

pub fn run(args: WatchArgs) -> Result<()> {
    let manifest = load_manifest(&args.root, args.output.as_deref())?;
    let ctx = BuildContext::new(args.production || manifest.production, false);

    let mut orchestrator = register_plugins(&manifest);
    orchestrator.run_init(&ctx)?;
    orchestrator.run_build(&ctx);

    watch_session(&mut orchestrator, &ctx)
}

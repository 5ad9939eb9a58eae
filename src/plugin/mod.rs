//! Plugin model for the kiln pipeline.
//!
//! A plugin owns one asset domain (sprites, maps, static files) and
//! exposes four lifecycle operations: init, build, watch re-entry, and
//! clean. The [`Orchestrator`] resolves execution order from declared
//! dependency names and drives the phases; the [`WatchRouter`] maps
//! filesystem events back to the plugins that registered the roots.

mod graph;
mod orchestrator;
mod watch;

use std::path::PathBuf;

pub use graph::PluginGraph;
pub use orchestrator::Orchestrator;
pub use watch::{watch_session, FsEvent, FsEventKind, WatchRouter};

use crate::context::BuildContext;
use crate::error::Result;

/// Outcome of a plugin's init phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applicability {
    /// The plugin found its sources and takes part in later phases.
    Applicable,
    /// The plugin's source directory is absent; it is skipped in later
    /// phases. Dependents still run and must tolerate the missing
    /// upstream output.
    NotApplicable,
}

/// One asset-domain build plugin.
pub trait Plugin {
    /// Unique name, referenced by other plugins' dependency lists.
    fn name(&self) -> &str;

    /// Names of plugins whose corresponding phase must complete first.
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Probe sources and prepare state.
    fn init(&mut self, ctx: &BuildContext) -> Result<Applicability>;

    /// Run one full build pass.
    fn build(&mut self, ctx: &BuildContext) -> Result<()>;

    /// Filesystem roots this plugin wants watched.
    fn watch_roots(&self) -> Vec<PathBuf> {
        Vec::new()
    }

    /// Handle one batch of filesystem events under this plugin's roots.
    /// Never re-entered concurrently; the next batch waits for this one.
    fn on_events(&mut self, ctx: &BuildContext, events: &[FsEvent]) -> Result<()> {
        let _ = (ctx, events);
        Ok(())
    }

    /// Paths removed (best-effort) by the clean phase.
    fn output_paths(&self) -> Vec<PathBuf> {
        Vec::new()
    }
}

//! Filesystem event routing for watch mode.
//!
//! Plugins register the roots they care about; the router fans each
//! debounced event batch out to the owning plugins. Dispatch happens on
//! the watch thread, one plugin at a time, so a plugin's watch handler
//! is never re-entered concurrently.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use notify::{RecursiveMode, Watcher};

use crate::context::BuildContext;
use crate::error::{KilnError, Result};

use super::Orchestrator;

/// Quiet period that closes an event batch.
const DEBOUNCE: Duration = Duration::from_millis(120);

/// What happened to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsEventKind {
    Create,
    Update,
    Delete,
}

/// One filesystem event, already reduced from the backend's vocabulary.
#[derive(Debug, Clone)]
pub struct FsEvent {
    pub path: PathBuf,
    pub kind: FsEventKind,
}

/// Maps watched roots back to the plugins that registered them.
#[derive(Debug, Default)]
pub struct WatchRouter {
    routes: Vec<(String, PathBuf)>,
}

impl WatchRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plugin: &str, root: &Path) {
        self.routes.push((plugin.to_string(), root.to_path_buf()));
    }

    /// Distinct roots to hand to the backend watcher.
    pub fn roots(&self) -> Vec<PathBuf> {
        let mut roots: Vec<PathBuf> = Vec::new();
        for (_, root) in &self.routes {
            if !roots.contains(root) {
                roots.push(root.clone());
            }
        }
        roots
    }

    /// Split a batch by owning plugin, preserving registration order.
    /// Events outside every registered root are dropped.
    pub fn route(&self, batch: &[FsEvent]) -> Vec<(String, Vec<FsEvent>)> {
        let mut routed: Vec<(String, Vec<FsEvent>)> = Vec::new();

        for (plugin, root) in &self.routes {
            let matching: Vec<FsEvent> = batch
                .iter()
                .filter(|e| e.path.starts_with(root))
                .cloned()
                .collect();
            if matching.is_empty() {
                continue;
            }
            match routed.iter_mut().find(|(name, _)| name == plugin) {
                Some((_, events)) => events.extend(matching),
                None => routed.push((plugin.clone(), matching)),
            }
        }

        routed
    }
}

/// Reduce a backend event to the kinds the pipeline understands.
fn convert(event: &notify::Event) -> Vec<FsEvent> {
    let kind = match event.kind {
        notify::EventKind::Create(_) => FsEventKind::Create,
        notify::EventKind::Modify(_) => FsEventKind::Update,
        notify::EventKind::Remove(_) => FsEventKind::Delete,
        _ => return Vec::new(),
    };
    event
        .paths
        .iter()
        .map(|path| FsEvent {
            path: path.clone(),
            kind,
        })
        .collect()
}

/// Run a blocking watch session: register roots, debounce events into
/// batches, route each batch to its plugins. Returns when the backend
/// watcher shuts down.
pub fn watch_session(orchestrator: &mut Orchestrator, ctx: &BuildContext) -> Result<()> {
    let router = orchestrator.watch_router();
    let roots = router.roots();
    if roots.is_empty() {
        ctx.warn("no plugin registered a watch root; nothing to do");
        return Ok(());
    }

    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        if let Ok(event) = res {
            let _ = tx.send(event);
        }
    })
    .map_err(watch_error)?;

    for root in &roots {
        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(watch_error)?;
        ctx.log("watching", &crate::output::display_path(root));
    }

    loop {
        let first = match rx.recv() {
            Ok(event) => event,
            Err(_) => break,
        };
        let mut batch = convert(&first);
        while let Ok(event) = rx.recv_timeout(DEBOUNCE) {
            batch.extend(convert(&event));
        }
        if batch.is_empty() {
            continue;
        }
        for (plugin, events) in router.route(&batch) {
            orchestrator.dispatch(ctx, &plugin, &events);
        }
    }

    Ok(())
}

fn watch_error(e: notify::Error) -> KilnError {
    KilnError::Build {
        message: format!("File watcher error: {}", e),
        help: None,
    }
}

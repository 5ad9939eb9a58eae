//! Shared build context handed to every plugin.
//!
//! Carries the scoped logger, the running error count, the build mode
//! flags, and the domain-event sink that live-reload listeners subscribe
//! to. The logger is append-only and safe to use from worker threads.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;

use crate::output::Printer;

/// A domain event emitted during a build or watch session.
///
/// Listeners (the dev server's live-reload channel, tests) receive these
/// through [`BuildContext::subscribe`].
#[derive(Debug, Clone)]
pub enum Event {
    /// A sheet was rebuilt successfully. Carries the full descriptor so
    /// listeners can push it straight to the editor without re-reading
    /// the artifact from disk.
    SheetUpdated {
        sheet: String,
        descriptor: serde_json::Value,
    },
}

/// Shared logging/config/event surface for one build or watch session.
pub struct BuildContext {
    printer: Printer,
    depth: AtomicUsize,
    errors: AtomicUsize,
    /// Production builds trade encode speed for smaller artifacts.
    pub production: bool,
    /// Clean builds skip the staleness comparison and rebuild everything.
    pub clean: bool,
    subscribers: Mutex<Vec<Sender<Event>>>,
}

impl BuildContext {
    pub fn new(production: bool, clean: bool) -> Self {
        Self {
            printer: Printer::new(),
            depth: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
            production,
            clean,
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Enter a named logging scope. Subsequent lines indent one level
    /// deeper until the matching [`pop_scope`](Self::pop_scope).
    pub fn push_scope(&self, verb: &str, name: &str) {
        let depth = self.depth.fetch_add(1, Ordering::Relaxed);
        self.printer.status(verb, name, depth);
    }

    /// Leave the current logging scope.
    pub fn pop_scope(&self) {
        // Saturate rather than underflow on unbalanced pops.
        let _ = self
            .depth
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |d| {
                Some(d.saturating_sub(1))
            });
    }

    pub fn log(&self, verb: &str, message: &str) {
        self.printer
            .status(verb, message, self.depth.load(Ordering::Relaxed));
    }

    pub fn info(&self, verb: &str, message: &str) {
        self.printer
            .info(verb, message, self.depth.load(Ordering::Relaxed));
    }

    pub fn warn(&self, message: &str) {
        self.printer
            .warning("warning", message, self.depth.load(Ordering::Relaxed));
    }

    /// Log an error and bump the running error count.
    pub fn error(&self, message: &str) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        self.printer
            .error("error", message, self.depth.load(Ordering::Relaxed));
    }

    /// Number of errors logged so far. Non-zero at end-of-run is the
    /// external failure signal.
    pub fn error_count(&self) -> usize {
        self.errors.load(Ordering::Relaxed)
    }

    /// Subscribe to domain events. Each subscriber gets every event
    /// emitted after the call.
    pub fn subscribe(&self) -> Receiver<Event> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.lock().unwrap().push(tx);
        rx
    }

    /// Broadcast an event to all live subscribers, dropping any whose
    /// receiver has gone away.
    pub fn emit(&self, event: Event) {
        let mut subs = self.subscribers.lock().unwrap();
        subs.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

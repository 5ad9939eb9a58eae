//! Lifecycle orchestration for registered plugins.
//!
//! Resolves dependency order once, up front, then drives init/build/
//! clean phases. Topology errors are fatal and reported before any
//! plugin code runs; a plugin failing its own phase is caught at the
//! invocation boundary, logged against the shared error counter, and
//! only its transitive dependents are skipped for that pass.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::context::BuildContext;
use crate::error::Result;

use super::graph::PluginGraph;
use super::watch::{FsEvent, WatchRouter};
use super::{Applicability, Plugin};

pub struct Orchestrator {
    plugins: Vec<Box<dyn Plugin>>,
    /// name -> index into `plugins`.
    by_name: HashMap<String, usize>,
    /// Execution order resolved by `init`.
    order: Vec<String>,
    /// Plugins whose init reported sources present.
    applicable: HashSet<String>,
    /// Plugins whose init or build failed this run.
    failed: HashSet<String>,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self {
            plugins: Vec::new(),
            by_name: HashMap::new(),
            order: Vec::new(),
            applicable: HashSet::new(),
            failed: HashSet::new(),
        }
    }

    /// Register a plugin. Order of registration breaks ties between
    /// plugins with no dependency relationship.
    pub fn register(&mut self, plugin: Box<dyn Plugin>) {
        self.by_name
            .insert(plugin.name().to_string(), self.plugins.len());
        self.plugins.push(plugin);
    }

    /// Resolve execution order and run every plugin's init phase.
    ///
    /// Returns an error only for graph topology problems (cycle or
    /// unknown dependency name); those abort before any plugin executes.
    /// A plugin whose init itself fails is logged, counted, and treated
    /// as failed for this run.
    pub fn run_init(&mut self, ctx: &BuildContext) -> Result<()> {
        let mut graph = PluginGraph::new();
        for plugin in &self.plugins {
            graph.register(plugin.name(), &plugin.dependencies());
        }
        self.order = graph.resolve_order()?;

        for name in &self.order.clone() {
            let idx = self.by_name[name];
            match self.plugins[idx].init(ctx) {
                Ok(Applicability::Applicable) => {
                    self.applicable.insert(name.clone());
                }
                Ok(Applicability::NotApplicable) => {
                    ctx.info("skipping", &format!("{} (no sources)", name));
                }
                Err(e) => {
                    ctx.error(&format!("{}: init failed: {}", name, e));
                    self.failed.insert(name.clone());
                }
            }
        }

        Ok(())
    }

    /// Run one build pass over every applicable plugin, in order.
    ///
    /// A failing plugin does not abort the pass; only plugins that
    /// transitively depend on it are skipped, since their inputs are
    /// unreliable.
    pub fn run_build(&mut self, ctx: &BuildContext) {
        let mut graph = PluginGraph::new();
        for plugin in &self.plugins {
            graph.register(plugin.name(), &plugin.dependencies());
        }

        let mut skipped: HashSet<String> = HashSet::new();
        for name in &self.failed {
            skipped.extend(graph.transitive_dependents(name));
        }

        for name in &self.order.clone() {
            if !self.applicable.contains(name) || self.failed.contains(name) {
                continue;
            }
            if skipped.contains(name) {
                ctx.warn(&format!("{}: skipped (upstream build failed)", name));
                continue;
            }

            let idx = self.by_name[name];
            if let Err(e) = self.plugins[idx].build(ctx) {
                ctx.error(&format!("{}: {}", name, e));
                self.failed.insert(name.clone());
                skipped.extend(graph.transitive_dependents(name));
            }
        }
    }

    /// Register every applicable plugin's watch roots with a router.
    pub fn watch_router(&self) -> WatchRouter {
        let mut router = WatchRouter::new();
        for name in &self.order {
            if !self.applicable.contains(name) {
                continue;
            }
            let plugin = &self.plugins[self.by_name[name]];
            for root in plugin.watch_roots() {
                router.register(name, &root);
            }
        }
        router
    }

    /// Hand one routed event batch to a plugin's watch handler. Batches
    /// are dispatched through `&mut self`, so re-entry per plugin is
    /// serialized by construction.
    pub fn dispatch(&mut self, ctx: &BuildContext, plugin: &str, events: &[FsEvent]) {
        let Some(&idx) = self.by_name.get(plugin) else {
            return;
        };
        if let Err(e) = self.plugins[idx].on_events(ctx, events) {
            ctx.error(&format!("{}: {}", plugin, e));
        }
    }

    /// Best-effort removal of every plugin's declared output paths.
    /// Removal failures are swallowed; only topology errors surface.
    pub fn run_clean(&mut self, ctx: &BuildContext) -> Result<()> {
        let mut graph = PluginGraph::new();
        for plugin in &self.plugins {
            graph.register(plugin.name(), &plugin.dependencies());
        }
        let order = graph.resolve_order()?;

        for name in &order {
            let plugin = &self.plugins[self.by_name[name]];
            for path in plugin.output_paths() {
                if remove_path(&path) {
                    ctx.log("removed", &crate::output::display_path(&path));
                }
            }
        }
        Ok(())
    }

}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

fn remove_path(path: &PathBuf) -> bool {
    if path.is_dir() {
        std::fs::remove_dir_all(path).is_ok()
    } else {
        std::fs::remove_file(path).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KilnError;
    use std::sync::{Arc, Mutex};

    /// Test plugin that records lifecycle calls into a shared journal.
    struct Probe {
        name: String,
        deps: Vec<String>,
        applicable: bool,
        fail_build: bool,
        journal: Arc<Mutex<Vec<String>>>,
        outputs: Vec<PathBuf>,
    }

    impl Probe {
        fn new(name: &str, deps: &[&str], journal: &Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                name: name.to_string(),
                deps: deps.iter().map(|s| s.to_string()).collect(),
                applicable: true,
                fail_build: false,
                journal: journal.clone(),
                outputs: vec![],
            }
        }

        fn note(&self, phase: &str) {
            self.journal
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.name, phase));
        }
    }

    impl Plugin for Probe {
        fn name(&self) -> &str {
            &self.name
        }

        fn dependencies(&self) -> Vec<String> {
            self.deps.clone()
        }

        fn init(&mut self, _ctx: &BuildContext) -> crate::error::Result<Applicability> {
            self.note("init");
            Ok(if self.applicable {
                Applicability::Applicable
            } else {
                Applicability::NotApplicable
            })
        }

        fn build(&mut self, _ctx: &BuildContext) -> crate::error::Result<()> {
            if self.fail_build {
                return Err(KilnError::Build {
                    message: "boom".to_string(),
                    help: None,
                });
            }
            self.note("build");
            Ok(())
        }

        fn on_events(
            &mut self,
            _ctx: &BuildContext,
            events: &[FsEvent],
        ) -> crate::error::Result<()> {
            self.note(&format!("events[{}]", events.len()));
            Ok(())
        }

        fn output_paths(&self) -> Vec<PathBuf> {
            self.outputs.clone()
        }
    }

    fn journal() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[test]
    fn test_dependency_order_respected() {
        let log = journal();
        let ctx = BuildContext::new(false, false);
        let mut orch = Orchestrator::new();
        orch.register(Box::new(Probe::new("maps", &["sprites"], &log)));
        orch.register(Box::new(Probe::new("sprites", &[], &log)));

        orch.run_init(&ctx).unwrap();
        orch.run_build(&ctx);

        let entries = log.lock().unwrap().clone();
        let pos = |e: &str| entries.iter().position(|x| x == e).unwrap();
        assert!(pos("sprites:init") < pos("maps:init"));
        assert!(pos("sprites:build") < pos("maps:build"));
    }

    #[test]
    fn test_cycle_fails_before_any_plugin_runs() {
        let log = journal();
        let ctx = BuildContext::new(false, false);
        let mut orch = Orchestrator::new();
        orch.register(Box::new(Probe::new("a", &["b"], &log)));
        orch.register(Box::new(Probe::new("b", &["a"], &log)));

        assert!(matches!(
            orch.run_init(&ctx),
            Err(KilnError::CyclicDependency { .. })
        ));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_dependency_fails_before_any_plugin_runs() {
        let log = journal();
        let ctx = BuildContext::new(false, false);
        let mut orch = Orchestrator::new();
        orch.register(Box::new(Probe::new("maps", &["missing"], &log)));

        assert!(matches!(
            orch.run_init(&ctx),
            Err(KilnError::UnknownDependency { .. })
        ));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_not_applicable_skips_build_but_not_dependents() {
        let log = journal();
        let ctx = BuildContext::new(false, false);
        let mut orch = Orchestrator::new();

        let mut sprites = Probe::new("sprites", &[], &log);
        sprites.applicable = false;
        orch.register(Box::new(sprites));
        orch.register(Box::new(Probe::new("maps", &["sprites"], &log)));

        orch.run_init(&ctx).unwrap();
        orch.run_build(&ctx);

        let entries = log.lock().unwrap().clone();
        assert!(!entries.contains(&"sprites:build".to_string()));
        assert!(entries.contains(&"maps:build".to_string()));
        assert_eq!(ctx.error_count(), 0);
    }

    #[test]
    fn test_build_failure_skips_only_dependents() {
        let log = journal();
        let ctx = BuildContext::new(false, false);
        let mut orch = Orchestrator::new();

        let mut sprites = Probe::new("sprites", &[], &log);
        sprites.fail_build = true;
        orch.register(Box::new(sprites));
        orch.register(Box::new(Probe::new("maps", &["sprites"], &log)));
        orch.register(Box::new(Probe::new("static", &[], &log)));

        orch.run_init(&ctx).unwrap();
        orch.run_build(&ctx);

        let entries = log.lock().unwrap().clone();
        assert!(!entries.contains(&"sprites:build".to_string()));
        assert!(!entries.contains(&"maps:build".to_string()));
        assert!(entries.contains(&"static:build".to_string()));
        assert_eq!(ctx.error_count(), 1);
    }

    #[test]
    fn test_dispatch_reaches_plugin() {
        let log = journal();
        let ctx = BuildContext::new(false, false);
        let mut orch = Orchestrator::new();
        orch.register(Box::new(Probe::new("sprites", &[], &log)));
        orch.run_init(&ctx).unwrap();

        let events = vec![FsEvent {
            path: PathBuf::from("assets/sprites/tiles/grass-8x8.png"),
            kind: super::super::FsEventKind::Update,
        }];
        orch.dispatch(&ctx, "sprites", &events);

        assert!(log
            .lock()
            .unwrap()
            .contains(&"sprites:events[1]".to_string()));
    }

    #[test]
    fn test_clean_removes_outputs_and_swallows_failures() {
        let log = journal();
        let ctx = BuildContext::new(false, false);
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("atlas.png");
        std::fs::write(&real, b"x").unwrap();

        let mut plugin = Probe::new("sprites", &[], &log);
        plugin.outputs = vec![real.clone(), dir.path().join("never-existed.png")];

        let mut orch = Orchestrator::new();
        orch.register(Box::new(plugin));
        orch.run_init(&ctx).unwrap();
        orch.run_clean(&ctx).unwrap();

        assert!(!real.exists());
        assert_eq!(ctx.error_count(), 0);
    }
}

//! kiln - Asset pipeline for 2D tile games
//!
//! A library for turning author-facing asset sources (sprite strips,
//! layered animation documents) into runtime artifacts: channel
//! atlases, normal maps, and lookup metadata, with a plugin
//! orchestrator and a live-reload watch mode.

pub mod cli;
pub mod context;
pub mod error;
pub mod manifest;
pub mod output;
pub mod plugin;
pub mod sprite;

pub use context::{BuildContext, Event};
pub use error::{KilnError, Result};
pub use manifest::Manifest;
pub use plugin::{
    Applicability, FsEvent, FsEventKind, Orchestrator, Plugin, PluginGraph, WatchRouter,
};
pub use sprite::{
    classify_batch, detect_source, finalize, needs_rebuild, normalize_cell, synthesize, Channel,
    CompositeQueue, FrameRect, Sheet, SheetState, SourceKind, SpriteCompositor, SpriteRecord,
};

//! One staleness decision for two rule sets.
//!
//! Full builds compare source and artifact modification times; watch
//! mode classifies filesystem events by depth and extension. Both
//! funnel into the same [`SheetState`] decision consumed by the
//! compositor's rebuild entry point. The depth/extension table filters
//! editor temp-file noise and is deliberately exact.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;

use crate::plugin::{FsEvent, FsEventKind};

use super::source::has_sprite_extension;

/// What a batch of evidence says about one sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetState {
    /// Sources changed; the sheet must be reprocessed.
    Stale,
    /// The whole sheet directory is gone; its artifacts go too.
    Removed,
}

/// Full-build staleness: rebuild when any artifact is missing or older
/// than the newest source file in the sheet directory.
pub fn needs_rebuild(sheet_dir: &Path, artifacts: &[PathBuf]) -> bool {
    let Some(newest_source) = newest_mtime(sheet_dir) else {
        // Unreadable directory; rebuilding will surface the real error.
        return true;
    };

    artifacts.iter().any(|artifact| {
        match std::fs::metadata(artifact).and_then(|m| m.modified()) {
            Ok(modified) => modified < newest_source,
            Err(_) => true,
        }
    })
}

fn newest_mtime(dir: &Path) -> Option<SystemTime> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.metadata().ok())
        .filter_map(|meta| meta.modified().ok())
        .max()
}

/// Classify one watch event against the sprite source root.
///
/// - depth 1, create/update: a sheet member changed (the directory
///   itself was touched), mark it stale.
/// - depth 1, delete: the sheet is gone.
/// - deeper, any kind, recognized sprite extension: the owning sheet is
///   stale (a deleted member still changes composition).
/// - anything else (temp files, swap files) is ignored.
pub fn classify_event(root: &Path, event: &FsEvent) -> Option<(String, SheetState)> {
    let rel = event.path.strip_prefix(root).ok()?;
    let mut components = rel.components();
    let sheet = components.next()?.as_os_str().to_str()?.to_string();
    let depth = 1 + components.count();

    if depth == 1 {
        return match event.kind {
            FsEventKind::Create | FsEventKind::Update => Some((sheet, SheetState::Stale)),
            FsEventKind::Delete => Some((sheet, SheetState::Removed)),
        };
    }

    if has_sprite_extension(&event.path) {
        return Some((sheet, SheetState::Stale));
    }

    None
}

/// Coalesce a batch: at most one decision per sheet, the latest event
/// winning, ordered by sheet name for deterministic processing.
pub fn classify_batch(root: &Path, events: &[FsEvent]) -> Vec<(String, SheetState)> {
    let mut decisions: BTreeMap<String, SheetState> = BTreeMap::new();
    for event in events {
        if let Some((sheet, state)) = classify_event(root, event) {
            decisions.insert(sheet, state);
        }
    }
    decisions.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn event(path: &str, kind: FsEventKind) -> FsEvent {
        FsEvent {
            path: PathBuf::from(path),
            kind,
        }
    }

    const ROOT: &str = "assets/sprites";

    #[test]
    fn test_depth_one_update_marks_member_changed() {
        let decision = classify_event(Path::new(ROOT), &event("assets/sprites/characters", FsEventKind::Update));
        assert_eq!(decision, Some(("characters".to_string(), SheetState::Stale)));
    }

    #[test]
    fn test_depth_one_delete_removes_sheet() {
        let decision = classify_event(Path::new(ROOT), &event("assets/sprites/characters", FsEventKind::Delete));
        assert_eq!(decision, Some(("characters".to_string(), SheetState::Removed)));
    }

    #[test]
    fn test_nested_sprite_file_marks_owner_dirty() {
        for kind in [FsEventKind::Create, FsEventKind::Update, FsEventKind::Delete] {
            let decision = classify_event(
                Path::new(ROOT),
                &event("assets/sprites/characters/hero-16x32.png", kind),
            );
            assert_eq!(decision, Some(("characters".to_string(), SheetState::Stale)));
        }
    }

    #[test]
    fn test_nested_noise_is_ignored() {
        for path in [
            "assets/sprites/characters/.hero-16x32.png.swp",
            "assets/sprites/characters/notes.txt",
            "assets/sprites/characters/deep/scratch.psd",
        ] {
            assert_eq!(
                classify_event(Path::new(ROOT), &event(path, FsEventKind::Update)),
                None
            );
        }
    }

    #[test]
    fn test_event_outside_root_is_ignored() {
        assert_eq!(
            classify_event(Path::new(ROOT), &event("assets/maps/overworld.map", FsEventKind::Update)),
            None
        );
    }

    #[test]
    fn test_batch_coalesces_per_sheet() {
        let events = vec![
            event("assets/sprites/characters/hero-16x32.png", FsEventKind::Update),
            event("assets/sprites/characters/npc.sprite.json", FsEventKind::Update),
            event("assets/sprites/characters/slime-8x8.png", FsEventKind::Create),
            event("assets/sprites/tiles/grass-8x8.png", FsEventKind::Update),
        ];
        let decisions = classify_batch(Path::new(ROOT), &events);
        assert_eq!(
            decisions,
            vec![
                ("characters".to_string(), SheetState::Stale),
                ("tiles".to_string(), SheetState::Stale),
            ]
        );
    }

    #[test]
    fn test_batch_latest_event_wins() {
        let events = vec![
            event("assets/sprites/characters/hero-16x32.png", FsEventKind::Update),
            event("assets/sprites/characters", FsEventKind::Delete),
        ];
        let decisions = classify_batch(Path::new(ROOT), &events);
        assert_eq!(decisions, vec![("characters".to_string(), SheetState::Removed)]);
    }

    #[test]
    fn test_needs_rebuild_when_artifact_missing() {
        let dir = tempfile::tempdir().unwrap();
        let sheet_dir = dir.path().join("characters");
        fs::create_dir(&sheet_dir).unwrap();
        fs::write(sheet_dir.join("hero-2x2.png"), b"x").unwrap();

        assert!(needs_rebuild(&sheet_dir, &[dir.path().join("characters-diffuse.png")]));
    }

    #[test]
    fn test_fresh_artifacts_skip_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let sheet_dir = dir.path().join("characters");
        fs::create_dir(&sheet_dir).unwrap();
        fs::write(sheet_dir.join("hero-2x2.png"), b"x").unwrap();

        // Artifact written after the source.
        let artifact = dir.path().join("characters-diffuse.png");
        fs::write(&artifact, b"atlas").unwrap();
        let later = SystemTime::now() + std::time::Duration::from_secs(5);
        let file = fs::File::options().write(true).open(&artifact).unwrap();
        file.set_modified(later).unwrap();

        assert!(!needs_rebuild(&sheet_dir, &[artifact]));
    }

    #[test]
    fn test_stale_artifact_triggers_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let sheet_dir = dir.path().join("characters");
        fs::create_dir(&sheet_dir).unwrap();

        let artifact = dir.path().join("characters-diffuse.png");
        fs::write(&artifact, b"atlas").unwrap();
        let earlier = SystemTime::now() - std::time::Duration::from_secs(60);
        let file = fs::File::options().write(true).open(&artifact).unwrap();
        file.set_modified(earlier).unwrap();

        fs::write(sheet_dir.join("hero-2x2.png"), b"x").unwrap();

        assert!(needs_rebuild(&sheet_dir, &[artifact]));
    }
}

//! Source document detection for sheet directories.
//!
//! Every file in a sheet directory is resolved to a source kind exactly
//! once, by filename, and dispatched through exhaustive matching from
//! then on: `<name>-<W>x<H>.png` is a static strip, `*.sprite.json` is
//! a layered document, anything else is rejected.

use std::path::Path;

/// A sprite source file, resolved by filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// A flat PNG holding equal-width frames in one horizontal row.
    /// The filename encodes the sprite name and the cell size.
    StaticStrip {
        name: String,
        frame_width: u32,
        frame_height: u32,
    },
    /// A multi-frame, multi-layer, tagged animation document.
    LayeredDocument,
}

/// Extension of layered documents.
pub const LAYERED_EXTENSION: &str = ".sprite.json";

/// Resolve a file to its source kind. `None` means the file is not a
/// recognized sprite source.
pub fn detect_source(path: &Path) -> Option<SourceKind> {
    let filename = path.file_name()?.to_str()?;

    if filename.ends_with(LAYERED_EXTENSION) {
        return Some(SourceKind::LayeredDocument);
    }

    let stem = filename.strip_suffix(".png")?;
    let (name, dims) = stem.rsplit_once('-')?;
    let (w, h) = dims.split_once('x')?;
    let frame_width: u32 = w.parse().ok().filter(|&n| n > 0)?;
    let frame_height: u32 = h.parse().ok().filter(|&n| n > 0)?;
    if name.is_empty() {
        return None;
    }

    Some(SourceKind::StaticStrip {
        name: name.to_string(),
        frame_width,
        frame_height,
    })
}

/// Whether a path carries a recognized sprite-source extension. Watch
/// mode uses this to drop editor temp-file noise. Weaker than
/// [`detect_source`]: a stray `.png` passes here and is rejected with a
/// proper error at build time.
pub fn has_sprite_extension(path: &Path) -> bool {
    let Some(filename) = path.file_name().and_then(|f| f.to_str()) else {
        return false;
    };
    filename.ends_with(".png") || filename.ends_with(LAYERED_EXTENSION)
}

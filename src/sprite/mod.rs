//! The sprite compositor plugin.
//!
//! Transforms each sheet directory under the sprite source root into
//! four channel atlases plus lookup metadata. Source files are
//! processed strictly in discovery order: sprite records stack
//! vertically, so the running atlas height is threaded through the loop
//! and concurrent processing within one sheet would scramble the
//! layout. Validation failures abort only the offending sheet and leave
//! its previous artifacts in place.

mod atlas;
mod cell;
mod layered;
mod normal;
mod sheet;
mod source;
mod stale;

use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use palette::{IntoColor, Srgb, SrgbLuma};
use walkdir::WalkDir;

pub use atlas::{artifact_paths, content_hash, descriptor_path, finalize, index_path};
pub use cell::{normalize_cell, Channel, CompositeQueue};
pub use layered::{LayeredDoc, LAYER_DIFFUSE, LAYER_EMISSIVE, LAYER_HEIGHT, LAYER_SPECULAR};
pub use normal::{synthesize, FLAT_NORMAL};
pub use sheet::{FrameRect, Sheet, SpriteRecord};
pub use source::{detect_source, has_sprite_extension, SourceKind};
pub use stale::{classify_batch, needs_rebuild, SheetState};

use crate::context::{BuildContext, Event};
use crate::error::{KilnError, Result};
use crate::manifest::Manifest;
use crate::plugin::{Applicability, FsEvent, Plugin};

pub struct SpriteCompositor {
    source_root: PathBuf,
    output_root: PathBuf,
    manifest: Manifest,
}

impl SpriteCompositor {
    pub fn new(manifest: &Manifest) -> Self {
        Self {
            source_root: manifest.sprites.clone(),
            output_root: manifest.output.clone(),
            manifest: manifest.clone(),
        }
    }

    /// Sheet directories under the source root, in deterministic order.
    fn sheet_dirs(&self) -> Vec<(String, PathBuf)> {
        let mut dirs = Vec::new();
        if let Ok(entries) = std::fs::read_dir(&self.source_root) {
            for entry in entries.flatten() {
                let path = entry.path();
                if !path.is_dir() || self.manifest.is_excluded(&path) {
                    continue;
                }
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    dirs.push((name.to_string(), path));
                }
            }
        }
        dirs.sort();
        dirs
    }

    /// Sprite source files of one sheet, in discovery order.
    fn sheet_files(&self, sheet_dir: &Path) -> Vec<PathBuf> {
        WalkDir::new(sheet_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| !self.manifest.is_excluded(path))
            .collect()
    }

    /// Rebuild one sheet, emitting a "sheet updated" event on success.
    /// Errors are logged and counted; the previous artifacts stay put.
    fn rebuild_sheet(&self, ctx: &BuildContext, name: &str) {
        let sheet_dir = self.source_root.join(name);
        if !sheet_dir.is_dir() {
            self.remove_sheet(ctx, name);
            return;
        }

        ctx.push_scope("composing", name);
        let result = self.compose_sheet(ctx, name, &sheet_dir);
        ctx.pop_scope();

        match result {
            Ok(Some(descriptor)) => {
                ctx.log("finished", &format!("{} atlas", name));
                ctx.emit(Event::SheetUpdated {
                    sheet: name.to_string(),
                    descriptor,
                });
            }
            Ok(None) => ctx.info("skipping", &format!("{} (no sprite sources)", name)),
            Err(e) => ctx.error(&format!("{}: {}", name, e)),
        }
    }

    /// Build a fresh sheet from its directory and write its artifacts.
    fn compose_sheet(
        &self,
        ctx: &BuildContext,
        name: &str,
        sheet_dir: &Path,
    ) -> Result<Option<serde_json::Value>> {
        let mut sheet = Sheet::new(name);
        let mut queue = CompositeQueue::new();
        let mut atlas_height = 0u32;

        for file in self.sheet_files(sheet_dir) {
            atlas_height = match detect_source(&file) {
                Some(SourceKind::StaticStrip {
                    name,
                    frame_width,
                    frame_height,
                }) => process_strip(
                    ctx,
                    &mut sheet,
                    &mut queue,
                    &file,
                    &name,
                    frame_width,
                    frame_height,
                    atlas_height,
                )?,
                Some(SourceKind::LayeredDocument) => {
                    process_layered(ctx, &mut sheet, &mut queue, &file, atlas_height)?
                }
                None => return Err(KilnError::UnknownSpriteFormat { path: file }),
            };
        }

        if sheet.is_empty() {
            return Ok(None);
        }
        sheet.height = atlas_height;

        finalize(&sheet, queue, &self.output_root, ctx.production).map(Some)
    }

    /// Best-effort removal of a sheet's generated artifacts.
    fn remove_sheet(&self, ctx: &BuildContext, name: &str) {
        let mut removed = false;
        for path in artifact_paths(&self.output_root, name) {
            removed |= std::fs::remove_file(&path).is_ok();
        }
        if removed {
            ctx.log("removed", &format!("{} artifacts", name));
        }
    }
}

impl Plugin for SpriteCompositor {
    fn name(&self) -> &str {
        "sprites"
    }

    fn init(&mut self, _ctx: &BuildContext) -> Result<Applicability> {
        if !self.source_root.is_dir() {
            return Ok(Applicability::NotApplicable);
        }
        std::fs::create_dir_all(&self.output_root).map_err(|e| KilnError::Io {
            path: self.output_root.clone(),
            message: format!("Failed to create output directory: {}", e),
        })?;
        Ok(Applicability::Applicable)
    }

    fn build(&mut self, ctx: &BuildContext) -> Result<()> {
        for (name, sheet_dir) in self.sheet_dirs() {
            let artifacts = artifact_paths(&self.output_root, &name);
            if !ctx.clean && !needs_rebuild(&sheet_dir, &artifacts) {
                ctx.info("fresh", &name);
                continue;
            }
            self.rebuild_sheet(ctx, &name);
        }
        Ok(())
    }

    fn watch_roots(&self) -> Vec<PathBuf> {
        vec![self.source_root.clone()]
    }

    fn on_events(&mut self, ctx: &BuildContext, events: &[FsEvent]) -> Result<()> {
        for (name, state) in classify_batch(&self.source_root, events) {
            match state {
                SheetState::Stale => self.rebuild_sheet(ctx, &name),
                SheetState::Removed => self.remove_sheet(ctx, &name),
            }
        }
        Ok(())
    }

    fn output_paths(&self) -> Vec<PathBuf> {
        self.sheet_dirs()
            .iter()
            .flat_map(|(name, _)| artifact_paths(&self.output_root, name))
            .collect()
    }
}

/// Slice a static strip into the sheet: the whole strip lands in the
/// diffuse queue at the current atlas height, one record with one
/// synthetic frame rect per cell. Returns the new atlas height.
#[allow(clippy::too_many_arguments)]
fn process_strip(
    ctx: &BuildContext,
    sheet: &mut Sheet,
    queue: &mut CompositeQueue,
    path: &Path,
    name: &str,
    frame_width: u32,
    frame_height: u32,
    atlas_height: u32,
) -> Result<u32> {
    let image = image::open(path)
        .map_err(|e| KilnError::Io {
            path: path.to_path_buf(),
            message: format!("Failed to read strip: {}", e),
        })?
        .to_rgba8();

    if image.width() == 0 || image.width() % frame_width != 0 {
        return Err(KilnError::InvalidDimensions {
            path: path.to_path_buf(),
            message: format!(
                "width {} is not a multiple of the {}px cell",
                image.width(),
                frame_width
            ),
        });
    }
    if image.height() != frame_height {
        return Err(KilnError::InvalidDimensions {
            path: path.to_path_buf(),
            message: format!(
                "height {} does not match the {}px cell",
                image.height(),
                frame_height
            ),
        });
    }

    let frame_count = image.width() / frame_width;
    let frames = (0..frame_count)
        .map(|i| {
            FrameRect::new(
                i * frame_width,
                atlas_height,
                (i + 1) * frame_width,
                atlas_height + frame_height,
            )
        })
        .collect();

    let strip_width = image.width();
    queue.push(Channel::Diffuse, image, 0, atlas_height);

    let (_, replaced) = sheet.insert(
        name,
        SpriteRecord {
            width: frame_width,
            height: frame_height,
            index: 0,
            frames,
        },
    );
    if replaced {
        ctx.warn(&format!("sprite '{}' defined more than once; keeping the latest", name));
    }

    sheet.width = sheet.width.max(strip_width);
    Ok(atlas_height + frame_height)
}

/// Compose a layered document: one sprite per tag, one canvas-sized
/// cell per frame on each channel. Returns the new atlas height.
fn process_layered(
    ctx: &BuildContext,
    sheet: &mut Sheet,
    queue: &mut CompositeQueue,
    path: &Path,
    atlas_height: u32,
) -> Result<u32> {
    let doc = LayeredDoc::load(path)?;
    let canvas = (doc.width, doc.height);
    let mut y = atlas_height;

    for tag in &doc.tags {
        let strip_width = tag.frame_count() * doc.width;
        let mut frames = Vec::with_capacity(tag.frame_count() as usize);

        for (i, frame) in (tag.from..=tag.to).enumerate() {
            let cell_x = i as u32 * doc.width;

            let Some(cel) = doc.cel(LAYER_DIFFUSE, frame) else {
                return Err(KilnError::MissingDiffuseLayer {
                    path: path.to_path_buf(),
                    message: format!("tag '{}' frame {}", tag.name, frame),
                });
            };
            let pixels = cel.decode(path)?;
            queue.push(
                Channel::Diffuse,
                normalize_cell(&pixels, (cel.x, cel.y), canvas, Channel::Diffuse.background()),
                cell_x,
                y,
            );

            if let Some(cel) = doc.cel(LAYER_EMISSIVE, frame) {
                let pixels = cel.decode(path)?;
                queue.push(
                    Channel::Emissive,
                    normalize_cell(&pixels, (cel.x, cel.y), canvas, Channel::Emissive.background()),
                    cell_x,
                    y,
                );
            }

            // Height converts to a tangent-space normal cell; without
            // one, a flat placeholder keeps every atlas region defined.
            let normal_cell = match doc.cel(LAYER_HEIGHT, frame) {
                Some(cel) => {
                    let pixels = cel.decode(path)?;
                    let field = normalize_cell(&pixels, (cel.x, cel.y), canvas, Rgba([0, 0, 0, 0]));
                    synthesize(&field)
                }
                None => RgbaImage::from_pixel(doc.width, doc.height, FLAT_NORMAL),
            };
            queue.push(Channel::Normal, normal_cell, cell_x, y);

            let specular_cell = match doc.cel(LAYER_SPECULAR, frame) {
                Some(cel) => {
                    let pixels = cel.decode(path)?;
                    normalize_cell(
                        &force_intensity(&pixels),
                        (cel.x, cel.y),
                        canvas,
                        Channel::Specular.background(),
                    )
                }
                None => RgbaImage::from_pixel(doc.width, doc.height, Rgba([0, 0, 0, 255])),
            };
            queue.push(Channel::Specular, specular_cell, cell_x, y);

            frames.push(FrameRect::new(cell_x, y, cell_x + doc.width, y + doc.height));
        }

        let (_, replaced) = sheet.insert(
            &tag.name,
            SpriteRecord {
                width: doc.width,
                height: doc.height,
                index: 0,
                frames,
            },
        );
        if replaced {
            ctx.warn(&format!(
                "sprite '{}' defined more than once; keeping the latest",
                tag.name
            ));
        }

        sheet.width = sheet.width.max(strip_width);
        y += doc.height;
    }

    Ok(y)
}

/// Collapse an authored specular cel to one perceptual intensity
/// channel, weighted by alpha.
fn force_intensity(pixels: &RgbaImage) -> RgbaImage {
    let mut out = RgbaImage::new(pixels.width(), pixels.height());
    for (x, y, Rgba([r, g, b, a])) in pixels.enumerate_pixels() {
        let luma: SrgbLuma<f32> = Srgb::new(
            *r as f32 / 255.0,
            *g as f32 / 255.0,
            *b as f32 / 255.0,
        )
        .into_color();
        let v = (luma.luma * (*a as f32 / 255.0) * 255.0).round() as u8;
        out.put_pixel(x, y, Rgba([v, v, v, 255]));
    }
    out
}

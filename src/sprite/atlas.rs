//! Atlas rasterization and artifact emission.
//!
//! Consumes a sheet's composite queues: rasterizes the four channel
//! canvases (concurrently; they share no output), PNG-encodes them,
//! then writes the images, the descriptor JSON, and the flat
//! reverse-index text consumed by the map-tile compositor. Atlas URLs
//! carry a content-hash query suffix for cache busting.

use std::path::{Path, PathBuf};

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ExtendedColorType, ImageEncoder, Rgba, RgbaImage};
use serde_json::json;

use crate::error::{KilnError, Result};

use super::cell::{Channel, CompositeQueue, QueueEntry};
use super::sheet::Sheet;

/// Path of one channel image artifact.
pub fn channel_path(output: &Path, sheet: &str, channel: Channel) -> PathBuf {
    output.join(format!("{}-{}.png", sheet, channel.suffix()))
}

/// Path of the sheet descriptor artifact.
pub fn descriptor_path(output: &Path, sheet: &str) -> PathBuf {
    output.join(format!("{}.sheet.json", sheet))
}

/// Path of the flat name -> index artifact.
pub fn index_path(output: &Path, sheet: &str) -> PathBuf {
    output.join(format!("{}.index.txt", sheet))
}

/// Every artifact a sheet produces.
pub fn artifact_paths(output: &Path, sheet: &str) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = Channel::ALL
        .iter()
        .map(|&c| channel_path(output, sheet, c))
        .collect();
    paths.push(descriptor_path(output, sheet));
    paths.push(index_path(output, sheet));
    paths
}

/// Rasterize one channel's queue onto a canvas.
fn rasterize(width: u32, height: u32, background: Rgba<u8>, entries: &[QueueEntry]) -> RgbaImage {
    let mut canvas = RgbaImage::from_pixel(width, height, background);

    for entry in entries {
        for (sx, sy, pixel) in entry.pixels.enumerate_pixels() {
            let tx = entry.x + sx;
            let ty = entry.y + sy;
            if tx < width && ty < height {
                canvas.put_pixel(tx, ty, *pixel);
            }
        }
    }

    canvas
}

/// Rasterize and PNG-encode one channel. Specular collapses to a single
/// intensity channel; everything else stays RGBA.
fn encode_channel(
    channel: Channel,
    entries: &[QueueEntry],
    width: u32,
    height: u32,
    production: bool,
) -> Result<Vec<u8>> {
    let canvas = rasterize(width, height, channel.background(), entries);

    let compression = if production {
        CompressionType::Best
    } else {
        CompressionType::Fast
    };

    let mut bytes = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut bytes, compression, FilterType::Adaptive);
    let encode_error = |e: image::ImageError| KilnError::Build {
        message: format!("Failed to encode {} atlas: {}", channel.suffix(), e),
        help: None,
    };

    match channel {
        Channel::Specular => {
            let gray = DynamicImage::ImageRgba8(canvas).to_luma8();
            encoder
                .write_image(gray.as_raw(), width, height, ExtendedColorType::L8)
                .map_err(encode_error)?;
        }
        _ => {
            encoder
                .write_image(canvas.as_raw(), width, height, ExtendedColorType::Rgba8)
                .map_err(encode_error)?;
        }
    }

    Ok(bytes)
}

/// Short content hash used as the cache-busting query suffix.
pub fn content_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex()[..16].to_string()
}

/// Consume the queues and write all of a sheet's artifacts.
///
/// The four channel rasterizations run concurrently and all complete
/// before the descriptor and index are written, since those depend only
/// on finalized frame rects. Returns the descriptor for event emission.
pub fn finalize(
    sheet: &Sheet,
    mut queue: CompositeQueue,
    output: &Path,
    production: bool,
) -> Result<serde_json::Value> {
    let (width, height) = (sheet.width, sheet.height);

    let jobs: Vec<(Channel, Vec<QueueEntry>)> = Channel::ALL
        .iter()
        .map(|&channel| (channel, queue.take(channel)))
        .collect();

    let results: Vec<Result<(Channel, Vec<u8>)>> = std::thread::scope(|scope| {
        let handles: Vec<_> = jobs
            .into_iter()
            .map(|(channel, entries)| {
                scope.spawn(move || {
                    encode_channel(channel, &entries, width, height, production)
                        .map(|bytes| (channel, bytes))
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| {
                handle.join().unwrap_or_else(|_| {
                    Err(KilnError::Build {
                        message: "channel rasterizer panicked".to_string(),
                        help: None,
                    })
                })
            })
            .collect()
    });

    // All four encodes must succeed before the first artifact write, so
    // a failure leaves the previous build intact.
    let mut encoded = Vec::with_capacity(results.len());
    for result in results {
        encoded.push(result?);
    }

    let mut atlases = serde_json::Map::new();
    for (channel, bytes) in encoded {
        let path = channel_path(output, &sheet.name, channel);
        std::fs::write(&path, &bytes).map_err(|e| KilnError::Io {
            path: path.clone(),
            message: format!("Failed to write atlas: {}", e),
        })?;
        atlases.insert(
            channel.suffix().to_string(),
            json!(format!(
                "{}-{}.png?v={}",
                sheet.name,
                channel.suffix(),
                content_hash(&bytes)
            )),
        );
    }

    let descriptor = build_descriptor(sheet, atlases);
    let descriptor_text = serde_json::to_string_pretty(&descriptor).map_err(|e| KilnError::Build {
        message: format!("Failed to serialize descriptor: {}", e),
        help: None,
    })?;
    write_text(
        &descriptor_path(output, &sheet.name),
        &format!("{}\n", descriptor_text),
    )?;
    write_text(&index_path(output, &sheet.name), &reverse_index(sheet))?;

    Ok(descriptor)
}

/// Lookup metadata: atlas URLs, per-sprite records with Y-flipped frame
/// rects, and the index list with slot 0 reserved empty.
fn build_descriptor(sheet: &Sheet, atlases: serde_json::Map<String, serde_json::Value>) -> serde_json::Value {
    let mut sprites = serde_json::Map::new();
    let mut index = vec![String::new(); sheet.len() + 1];

    for (name, record) in sheet.sprites() {
        let frames: Vec<_> = record
            .frames
            .iter()
            .map(|rect| rect.flip_y(sheet.height))
            .collect();
        sprites.insert(
            name.to_string(),
            json!({
                "index": record.index,
                "width": record.width,
                "height": record.height,
                "frames": frames,
            }),
        );
        index[record.index as usize] = name.to_string();
    }

    json!({
        "name": sheet.name,
        "width": sheet.width,
        "height": sheet.height,
        "atlases": atlases,
        "sprites": sprites,
        "index": index,
    })
}

/// The flat name -> 1-based index text the map-tile compositor reads.
fn reverse_index(sheet: &Sheet) -> String {
    let mut out = String::new();
    for (name, record) in sheet.sprites() {
        out.push_str(name);
        out.push('\t');
        out.push_str(&record.index.to_string());
        out.push('\n');
    }
    out
}

fn write_text(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).map_err(|e| KilnError::Io {
        path: path.to_path_buf(),
        message: format!("Failed to write artifact: {}", e),
    })
}

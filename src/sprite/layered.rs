//! Layered document parsing.
//!
//! A `.sprite.json` document is the exported form of an editor project:
//! a fixed canvas, named layers, a frame timeline, named tag ranges, and
//! cels. Each cel carries a base64 PNG payload plus the authored offset
//! of its (possibly trimmed) content on the canvas.

use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::RgbaImage;
use serde::Deserialize;

use crate::error::{KilnError, Result};

/// Well-known layer names, matched case-insensitively.
pub const LAYER_DIFFUSE: &str = "diffuse";
pub const LAYER_HEIGHT: &str = "height";
pub const LAYER_SPECULAR: &str = "specular";
pub const LAYER_EMISSIVE: &str = "emissive";

/// A parsed layered document.
#[derive(Debug, Deserialize)]
pub struct LayeredDoc {
    /// Canvas size; every frame cell is exactly this big.
    pub width: u32,
    pub height: u32,
    pub layers: Vec<Layer>,
    /// Total number of frames on the timeline.
    pub frames: u32,
    /// Tag ranges; each yields one sprite record.
    pub tags: Vec<Tag>,
    pub cels: Vec<Cel>,
}

#[derive(Debug, Deserialize)]
pub struct Layer {
    pub name: String,
}

/// An inclusive frame range with a name.
#[derive(Debug, Deserialize)]
pub struct Tag {
    pub name: String,
    pub from: u32,
    pub to: u32,
}

impl Tag {
    pub fn frame_count(&self) -> u32 {
        self.to - self.from + 1
    }
}

/// One drawable cell: pixels for one layer on one frame. Content may be
/// trimmed; `x`/`y` place it on the canvas and may be negative.
#[derive(Debug, Deserialize)]
pub struct Cel {
    pub layer: String,
    pub frame: u32,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    /// Base64-encoded PNG payload.
    pub data: String,
}

impl LayeredDoc {
    /// Read and validate a document.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| KilnError::Io {
            path: path.to_path_buf(),
            message: format!("Failed to read layered document: {}", e),
        })?;
        let doc: LayeredDoc = serde_json::from_str(&content).map_err(|e| KilnError::Parse {
            message: format!("{}: {}", path.display(), e),
            help: Some("expected a .sprite.json layered document".to_string()),
        })?;
        doc.validate(path)?;
        Ok(doc)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        let parse = |message: String| KilnError::Parse {
            message: format!("{}: {}", path.display(), message),
            help: None,
        };

        if self.width == 0 || self.height == 0 {
            return Err(parse("canvas dimensions must be non-zero".to_string()));
        }
        for tag in &self.tags {
            if tag.from > tag.to || tag.to >= self.frames {
                return Err(parse(format!(
                    "tag '{}' range {}..={} is outside the {}-frame timeline",
                    tag.name, tag.from, tag.to, self.frames
                )));
            }
        }
        for cel in &self.cels {
            if cel.frame >= self.frames {
                return Err(parse(format!(
                    "cel on layer '{}' references frame {} of {}",
                    cel.layer, cel.frame, self.frames
                )));
            }
            if !self
                .layers
                .iter()
                .any(|l| l.name.eq_ignore_ascii_case(&cel.layer))
            {
                return Err(parse(format!("cel references unknown layer '{}'", cel.layer)));
            }
        }
        Ok(())
    }

    /// Find the cel for a layer (case-insensitive) on a frame.
    pub fn cel(&self, layer: &str, frame: u32) -> Option<&Cel> {
        self.cels
            .iter()
            .find(|c| c.frame == frame && c.layer.eq_ignore_ascii_case(layer))
    }
}

impl Cel {
    /// Decode the embedded PNG payload.
    pub fn decode(&self, path: &Path) -> Result<RgbaImage> {
        let bytes = BASE64.decode(&self.data).map_err(|e| KilnError::Parse {
            message: format!(
                "{}: invalid cel payload on layer '{}' frame {}: {}",
                path.display(),
                self.layer,
                self.frame,
                e
            ),
            help: None,
        })?;
        let image = image::load_from_memory(&bytes).map_err(|e| KilnError::Parse {
            message: format!(
                "{}: undecodable cel on layer '{}' frame {}: {}",
                path.display(),
                self.layer,
                self.frame,
                e
            ),
            help: None,
        })?;
        Ok(image.to_rgba8())
    }
}

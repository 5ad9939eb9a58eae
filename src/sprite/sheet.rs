//! Sheet and sprite bookkeeping for the compositor.
//!
//! A [`Sheet`] accumulates sprite records while a source directory is
//! processed, tracking the running atlas dimensions. Frame rects are
//! kept in top-left-origin atlas coordinates until finalize, where the
//! renderer's bottom-left convention is applied once via
//! [`FrameRect::flip_y`].

use serde::Serialize;

/// Pixel rectangle locating one frame within the finished atlas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl FrameRect {
    pub fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }

    /// Convert to the renderer's bottom-left-origin convention. The
    /// compositor core stays top-left; this runs exactly once per rect,
    /// at finalize.
    pub fn flip_y(self, atlas_height: u32) -> Self {
        Self {
            left: self.left,
            right: self.right,
            top: atlas_height - self.bottom,
            bottom: atlas_height - self.top,
        }
    }
}

/// Metadata for one named graphic/animation within a sheet.
#[derive(Debug, Clone)]
pub struct SpriteRecord {
    /// Width of one frame, in pixels.
    pub width: u32,
    /// Height of one frame, in pixels.
    pub height: u32,
    /// 1-based index into the sheet; 0 is reserved for "absent".
    pub index: u32,
    pub frames: Vec<FrameRect>,
}

/// One sprite atlas being built from one source directory.
///
/// State is ephemeral: a sheet is reconstructed from scratch on every
/// (re)build of its directory.
#[derive(Debug)]
pub struct Sheet {
    pub name: String,
    /// Running maximum frame-strip width seen so far.
    pub width: u32,
    /// Running sum of sprite heights (strict vertical stacking).
    pub height: u32,
    sprites: Vec<(String, SpriteRecord)>,
}

impl Sheet {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            width: 0,
            height: 0,
            sprites: Vec::new(),
        }
    }

    /// Record a sprite, assigning the next 1-based index. Re-inserting
    /// an existing name replaces the record but keeps its index, so
    /// numbering stays stable for every other sprite. Returns the index
    /// and whether the name was already present.
    pub fn insert(&mut self, name: &str, record_without_index: SpriteRecord) -> (u32, bool) {
        if let Some((_, existing)) = self.sprites.iter_mut().find(|(n, _)| n == name) {
            let index = existing.index;
            *existing = SpriteRecord {
                index,
                ..record_without_index
            };
            return (index, true);
        }

        let index = self.sprites.len() as u32 + 1;
        self.sprites.push((
            name.to_string(),
            SpriteRecord {
                index,
                ..record_without_index
            },
        ));
        (index, false)
    }

    /// Sprites in insertion (= numbering) order.
    pub fn sprites(&self) -> impl Iterator<Item = (&str, &SpriteRecord)> {
        self.sprites.iter().map(|(n, r)| (n.as_str(), r))
    }

    pub fn get(&self, name: &str) -> Option<&SpriteRecord> {
        self.sprites
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, r)| r)
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(width: u32, height: u32) -> SpriteRecord {
        SpriteRecord {
            width,
            height,
            index: 0,
            frames: vec![FrameRect::new(0, 0, width, height)],
        }
    }

    #[test]
    fn test_insert_assigns_one_based_indices() {
        let mut sheet = Sheet::new("characters");
        let (first, _) = sheet.insert("hero", record(16, 32));
        let (second, _) = sheet.insert("slime", record(8, 8));

        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_eq!(sheet.get("hero").unwrap().index, 1);
    }

    #[test]
    fn test_insert_duplicate_keeps_index() {
        let mut sheet = Sheet::new("characters");
        sheet.insert("hero", record(16, 32));
        sheet.insert("slime", record(8, 8));
        let (index, replaced) = sheet.insert("hero", record(24, 24));

        assert_eq!(index, 1);
        assert!(replaced);
        assert_eq!(sheet.len(), 2);
        assert_eq!(sheet.get("hero").unwrap().width, 24);
        assert_eq!(sheet.get("slime").unwrap().index, 2);
    }

    #[test]
    fn test_sprites_iterate_in_insertion_order() {
        let mut sheet = Sheet::new("tiles");
        sheet.insert("water", record(8, 8));
        sheet.insert("grass", record(8, 8));

        let names: Vec<&str> = sheet.sprites().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["water", "grass"]);
    }

    #[test]
    fn test_flip_y_round_trips() {
        let rect = FrameRect::new(4, 10, 20, 42);
        let flipped = rect.flip_y(100);

        assert_eq!(flipped, FrameRect::new(4, 58, 20, 90));
        assert_eq!(flipped.width(), rect.width());
        assert_eq!(flipped.height(), rect.height());
        assert_eq!(flipped.flip_y(100), rect);
    }
}

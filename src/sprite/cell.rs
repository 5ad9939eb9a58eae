//! Cell normalization and the per-channel composite queues.
//!
//! Trimmed cel content rarely matches the canvas size it was authored
//! on; [`normalize_cell`] turns any (pixels, authored offset) pair into
//! a buffer of exactly the target size, padding with the channel
//! background and clipping whatever extends past the cell. Normalized
//! buffers are queued per output channel until the sheet is rasterized.

use image::{Rgba, RgbaImage};

/// The four output channels of a composed sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Diffuse,
    Normal,
    Specular,
    Emissive,
}

impl Channel {
    pub const ALL: [Channel; 4] = [
        Channel::Diffuse,
        Channel::Normal,
        Channel::Specular,
        Channel::Emissive,
    ];

    /// Artifact filename suffix.
    pub fn suffix(&self) -> &'static str {
        match self {
            Channel::Diffuse => "diffuse",
            Channel::Normal => "normal",
            Channel::Specular => "specular",
            Channel::Emissive => "emissive",
        }
    }

    /// Canvas background for regions no queue entry covers.
    pub fn background(&self) -> Rgba<u8> {
        match self {
            Channel::Diffuse | Channel::Emissive => Rgba([0, 0, 0, 0]),
            Channel::Normal => super::normal::FLAT_NORMAL,
            Channel::Specular => Rgba([0, 0, 0, 255]),
        }
    }

    fn slot(&self) -> usize {
        match self {
            Channel::Diffuse => 0,
            Channel::Normal => 1,
            Channel::Specular => 2,
            Channel::Emissive => 3,
        }
    }
}

/// A pixel buffer waiting to be rasterized at a fixed atlas position.
#[derive(Debug)]
pub struct QueueEntry {
    pub pixels: RgbaImage,
    pub x: u32,
    pub y: u32,
}

/// Four ordered sequences of (buffer, placement), one per channel.
/// Consumed exactly once per sheet, at finalize.
#[derive(Debug, Default)]
pub struct CompositeQueue {
    queues: [Vec<QueueEntry>; 4],
}

impl CompositeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, channel: Channel, pixels: RgbaImage, x: u32, y: u32) {
        self.queues[channel.slot()].push(QueueEntry { pixels, x, y });
    }

    pub fn len(&self, channel: Channel) -> usize {
        self.queues[channel.slot()].len()
    }

    /// Drain one channel's queue.
    pub fn take(&mut self, channel: Channel) -> Vec<QueueEntry> {
        std::mem::take(&mut self.queues[channel.slot()])
    }
}

/// Normalize cel content to exactly `target` size: the source lands at
/// its authored `offset`, missing area is padded with `fill`, content
/// past the cell is clipped. Pure; independent of file and atlas
/// context.
pub fn normalize_cell(
    source: &RgbaImage,
    offset: (i32, i32),
    target: (u32, u32),
    fill: Rgba<u8>,
) -> RgbaImage {
    let (target_w, target_h) = target;
    let mut out = RgbaImage::from_pixel(target_w, target_h, fill);

    for (sx, sy, pixel) in source.enumerate_pixels() {
        let tx = offset.0 + sx as i32;
        let ty = offset.1 + sy as i32;
        if tx < 0 || ty < 0 || tx >= target_w as i32 || ty >= target_h as i32 {
            continue;
        }
        out.put_pixel(tx as u32, ty as u32, *pixel);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

    #[test]
    fn test_normalize_pads_trimmed_content() {
        let source = RgbaImage::from_pixel(2, 2, RED);
        let out = normalize_cell(&source, (1, 1), (4, 4), CLEAR);

        assert_eq!(out.dimensions(), (4, 4));
        assert_eq!(*out.get_pixel(0, 0), CLEAR);
        assert_eq!(*out.get_pixel(1, 1), RED);
        assert_eq!(*out.get_pixel(2, 2), RED);
        assert_eq!(*out.get_pixel(3, 3), CLEAR);
    }

    #[test]
    fn test_normalize_clips_overhang() {
        let source = RgbaImage::from_pixel(4, 4, RED);
        let out = normalize_cell(&source, (2, 2), (4, 4), CLEAR);

        assert_eq!(*out.get_pixel(3, 3), RED);
        assert_eq!(*out.get_pixel(1, 1), CLEAR);
        // No panic for the clipped half; output stays target-sized.
        assert_eq!(out.dimensions(), (4, 4));
    }

    #[test]
    fn test_normalize_negative_offset_clips_left_and_top() {
        let source = RgbaImage::from_pixel(3, 3, RED);
        let out = normalize_cell(&source, (-2, -2), (4, 4), CLEAR);

        assert_eq!(*out.get_pixel(0, 0), RED);
        assert_eq!(*out.get_pixel(1, 1), CLEAR);
    }

    #[test]
    fn test_normalize_exact_fit_is_identity() {
        let mut source = RgbaImage::from_pixel(2, 2, CLEAR);
        source.put_pixel(1, 0, RED);
        let out = normalize_cell(&source, (0, 0), (2, 2), CLEAR);
        assert_eq!(out, source);
    }

    #[test]
    fn test_normalize_fill_colour() {
        let source = RgbaImage::new(0, 0);
        let fill = Rgba([10, 20, 30, 255]);
        let out = normalize_cell(&source, (0, 0), (2, 2), fill);
        assert!(out.pixels().all(|p| *p == fill));
    }

    #[test]
    fn test_queue_per_channel_order() {
        let mut queue = CompositeQueue::new();
        queue.push(Channel::Diffuse, RgbaImage::new(1, 1), 0, 0);
        queue.push(Channel::Diffuse, RgbaImage::new(1, 1), 0, 8);
        queue.push(Channel::Normal, RgbaImage::new(1, 1), 0, 0);

        assert_eq!(queue.len(Channel::Diffuse), 2);
        assert_eq!(queue.len(Channel::Normal), 1);
        assert_eq!(queue.len(Channel::Specular), 0);

        let drained = queue.take(Channel::Diffuse);
        assert_eq!(drained.len(), 2);
        assert_eq!((drained[1].x, drained[1].y), (0, 8));
        // Consumed exactly once.
        assert_eq!(queue.len(Channel::Diffuse), 0);
    }

    #[test]
    fn test_channel_backgrounds() {
        assert_eq!(Channel::Diffuse.background(), Rgba([0, 0, 0, 0]));
        assert_eq!(Channel::Specular.background(), Rgba([0, 0, 0, 255]));
        assert_eq!(
            Channel::Normal.background(),
            crate::sprite::normal::FLAT_NORMAL
        );
    }
}

//! Tangent-space normal map synthesis from authored height fields.
//!
//! Height is taken as min(red, alpha), so fully transparent padding
//! reads as height zero. Gradients come from the Sobel kernels over the
//! 3x3 neighborhood with clamp-to-edge sampling; the canonical tangent
//! and binormal are perturbed by the scaled gradients, crossed, and the
//! result is rebased into tangent space and packed into a colour. Pure
//! and stateless, one output pixel per input pixel.

use image::{Rgba, RgbaImage};

/// Gradient scale. Kept small so single-step height edges tilt rather
/// than fold the surface.
const ROUGHNESS: f32 = 0.5;

/// The flat "straight up" normal, packed. Canvas background and the
/// placeholder colour for sprites without a height layer.
pub const FLAT_NORMAL: Rgba<u8> = Rgba([127, 127, 255, 255]);

#[derive(Debug, Clone, Copy)]
struct Vec3 {
    x: f32,
    y: f32,
    z: f32,
}

impl Vec3 {
    const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    fn dot(self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    fn cross(self, other: Vec3) -> Vec3 {
        Vec3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    fn normalize(self) -> Vec3 {
        let len = self.dot(self).sqrt();
        Vec3::new(self.x / len, self.y / len, self.z / len)
    }
}

/// Canonical surface frame. Binormal points down because image rows
/// grow downward; B x T is then the outward +Z.
const TANGENT: Vec3 = Vec3::new(1.0, 0.0, 0.0);
const BINORMAL: Vec3 = Vec3::new(0.0, -1.0, 0.0);
const NORMAL: Vec3 = Vec3::new(0.0, 0.0, 1.0);

/// Synthesize a tangent-space normal map from a height field.
pub fn synthesize(height_field: &RgbaImage) -> RgbaImage {
    let (width, height) = height_field.dimensions();
    let mut out = RgbaImage::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let (gx, gy) = sobel(height_field, x as i64, y as i64);
            out.put_pixel(x, y, pack(local_normal(gx * ROUGHNESS, gy * ROUGHNESS)));
        }
    }

    out
}

/// Height of one texel: min(red, alpha), normalized to [0, 1].
fn height_at(field: &RgbaImage, x: i64, y: i64) -> f32 {
    // Out-of-bounds coordinates clamp to the nearest valid texel.
    let cx = x.clamp(0, field.width() as i64 - 1) as u32;
    let cy = y.clamp(0, field.height() as i64 - 1) as u32;
    let Rgba([r, _, _, a]) = *field.get_pixel(cx, cy);
    r.min(a) as f32 / 255.0
}

/// Sobel X/Y gradients at one texel.
fn sobel(field: &RgbaImage, x: i64, y: i64) -> (f32, f32) {
    let s = |dx: i64, dy: i64| height_at(field, x + dx, y + dy);

    let gx = (s(1, -1) + 2.0 * s(1, 0) + s(1, 1)) - (s(-1, -1) + 2.0 * s(-1, 0) + s(-1, 1));
    let gy = (s(-1, 1) + 2.0 * s(0, 1) + s(1, 1)) - (s(-1, -1) + 2.0 * s(0, -1) + s(1, -1));

    (gx, gy)
}

/// Perturb the canonical frame by the scaled gradients and rebase the
/// resulting surface normal into tangent space.
fn local_normal(sgx: f32, sgy: f32) -> Vec3 {
    let tangent = Vec3::new(TANGENT.x, TANGENT.y, TANGENT.z + sgx);
    let binormal = Vec3::new(BINORMAL.x, BINORMAL.y, BINORMAL.z + sgy);
    let surface = binormal.cross(tangent).normalize();

    Vec3::new(
        surface.dot(TANGENT),
        surface.dot(BINORMAL),
        surface.dot(NORMAL),
    )
}

/// Pack a signed unit component into an unsigned byte.
fn pack(normal: Vec3) -> Rgba<u8> {
    let byte = |v: f32| (v * 128.0 + 127.0).clamp(0.0, 255.0) as u8;
    Rgba([byte(normal.x), byte(normal.y), byte(normal.z), 255])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_height_is_uniformly_flat() {
        // Zero gradient everywhere, including at the clamped borders.
        let field = RgbaImage::from_pixel(6, 6, Rgba([180, 180, 180, 255]));
        let normals = synthesize(&field);
        assert!(normals.pixels().all(|p| *p == FLAT_NORMAL));
    }

    #[test]
    fn test_transparent_field_is_flat() {
        let field = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 0]));
        let normals = synthesize(&field);
        assert!(normals.pixels().all(|p| *p == FLAT_NORMAL));
    }

    #[test]
    fn test_height_uses_min_of_red_and_alpha() {
        assert_eq!(
            height_at(&RgbaImage::from_pixel(1, 1, Rgba([255, 0, 0, 51])), 0, 0),
            0.2
        );
        assert_eq!(
            height_at(&RgbaImage::from_pixel(1, 1, Rgba([51, 0, 0, 255])), 0, 0),
            0.2
        );
    }

    #[test]
    fn test_step_edge_tilts_x() {
        // Left half raised, right half at zero.
        let mut field = RgbaImage::from_pixel(6, 4, Rgba([0, 0, 0, 255]));
        for y in 0..4 {
            for x in 0..3 {
                field.put_pixel(x, y, Rgba([255, 255, 255, 255]));
            }
        }
        let normals = synthesize(&field);

        // Interior of either half stays flat.
        assert_eq!(*normals.get_pixel(1, 2), FLAT_NORMAL);
        assert_eq!(*normals.get_pixel(5, 2), FLAT_NORMAL);
        // At the step the normal leans toward the lower side.
        let edge = normals.get_pixel(2, 2);
        assert!(edge.0[0] > 127, "expected x tilt, got {:?}", edge);
        assert_eq!(edge.0[3], 255);
    }

    #[test]
    fn test_single_texel_is_flat() {
        let field = RgbaImage::from_pixel(1, 1, Rgba([99, 0, 0, 255]));
        assert_eq!(*synthesize(&field).get_pixel(0, 0), FLAT_NORMAL);
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        let mut field = RgbaImage::new(5, 5);
        for (x, y, p) in field.enumerate_pixels_mut() {
            *p = Rgba([(x * 40 + y * 13) as u8, 0, 0, 255]);
        }
        assert_eq!(synthesize(&field), synthesize(&field));
    }
}

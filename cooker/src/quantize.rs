//! Fixed-point position quantization.

use meshforge_core::math::{Aabb, Vec3};

const MAX_XY: f64 = ((1u64 << 22) - 1) as f64;
const MAX_Z: f64 = ((1u64 << 20) - 1) as f64;
const MIN_RANGE: f64 = 0.1;

/// Maps positions inside a bounding box to a 22/22/20-bit fixed-point
/// encoding packed into a `u64`.
///
/// The helper stores an affine transform (offset then per-axis scale) so
/// dequantization at load time is a single multiply-add. X and Y get two
/// more bits than Z since meshes tend to be wider than they are deep.
/// All chunks in one quantization group share one helper so their
/// positions stay comparable after packing.
#[derive(Debug, Clone)]
pub struct QuantizationHelper {
    offset: [f64; 3],
    scale: [f64; 3],
}

impl QuantizationHelper {
    /// Builds a helper for positions inside `bounds`.
    ///
    /// Empty bounds fall back to a unit box around the origin; degenerate
    /// axes are widened to a minimum range so the scale stays finite.
    pub fn from_bounds(bounds: &Aabb) -> Self {
        let bounds = if bounds.is_empty() {
            Aabb::from_center_extent(Vec3::zeros(), 1.0)
        } else {
            *bounds
        };

        let offset = [
            -bounds.min.x as f64,
            -bounds.min.y as f64,
            -bounds.min.z as f64,
        ];
        let range = [
            ((bounds.max.x - bounds.min.x) as f64).max(MIN_RANGE),
            ((bounds.max.y - bounds.min.y) as f64).max(MIN_RANGE),
            ((bounds.max.z - bounds.min.z) as f64).max(MIN_RANGE),
        ];
        Self {
            offset,
            scale: [MAX_XY / range[0], MAX_XY / range[1], MAX_Z / range[2]],
        }
    }

    /// Quantizes a position into the packed 22/22/20 encoding.
    ///
    /// Positions outside the source bounds clamp to the box faces.
    pub fn quantize_position(&self, position: Vec3) -> u64 {
        let x = ((position.x as f64 + self.offset[0]) * self.scale[0])
            .round()
            .clamp(0.0, MAX_XY) as u64;
        let y = ((position.y as f64 + self.offset[1]) * self.scale[1])
            .round()
            .clamp(0.0, MAX_XY) as u64;
        let z = ((position.z as f64 + self.offset[2]) * self.scale[2])
            .round()
            .clamp(0.0, MAX_Z) as u64;
        x | (y << 22) | (z << 44)
    }

    /// Inverse of [`quantize_position`](Self::quantize_position), up to
    /// the fixed-point resolution.
    pub fn dequantize_position(&self, packed: u64) -> Vec3 {
        let x = (packed & 0x3f_ffff) as f64 / self.scale[0] - self.offset[0];
        let y = ((packed >> 22) & 0x3f_ffff) as f64 / self.scale[1] - self.offset[1];
        let z = ((packed >> 44) & 0xf_ffff) as f64 / self.scale[2] - self.offset[2];
        Vec3::new(x as f32, y as f32, z as f32)
    }

    /// Translation applied before scaling (`-bounds.min`).
    pub fn offset(&self) -> Vec3 {
        Vec3::new(
            self.offset[0] as f32,
            self.offset[1] as f32,
            self.offset[2] as f32,
        )
    }

    /// Per-axis quantization scale.
    pub fn scale(&self) -> Vec3 {
        Vec3::new(
            self.scale[0] as f32,
            self.scale[1] as f32,
            self.scale[2] as f32,
        )
    }
}

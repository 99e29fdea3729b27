//! Math type aliases and geometric helpers.
//!
//! Provides f32 types used across the cooking pipeline and an
//! axis-aligned bounding box suited to incremental unions.

pub use nalgebra;

/// 2D vector (f32).
pub type Vec2 = nalgebra::Vector2<f32>;

/// 3D vector (f32).
pub type Vec3 = nalgebra::Vector3<f32>;

/// 4D vector (f32).
pub type Vec4 = nalgebra::Vector4<f32>;

/// Axis-Aligned Bounding Box.
///
/// A fresh box starts *empty* (inverted infinite corners) so that
/// merging any number of boxes or points yields their exact union
/// without special-casing the first merge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box.
    pub min: Vec3,
    /// Maximum corner of the bounding box.
    pub max: Vec3,
}

impl Aabb {
    /// Creates a new AABB from min and max corners.
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Creates an empty AABB that acts as the identity for [`merge`](Self::merge).
    #[inline]
    pub fn empty() -> Self {
        Self {
            min: Vec3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Vec3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    /// Creates an AABB centered at `center` with the given half-extent on every axis.
    #[inline]
    pub fn from_center_extent(center: Vec3, half_extent: f32) -> Self {
        let he = Vec3::new(half_extent, half_extent, half_extent);
        Self {
            min: center - he,
            max: center + he,
        }
    }

    /// Returns whether the box contains no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Returns the size (full extents) of the AABB.
    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Returns the center point of the AABB.
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Grows the box to contain `other`.
    #[inline]
    pub fn merge(&mut self, other: &Aabb) {
        self.min = self.min.inf(&other.min);
        self.max = self.max.sup(&other.max);
    }

    /// Grows the box to contain `point`.
    #[inline]
    pub fn merge_point(&mut self, point: Vec3) {
        self.min = self.min.inf(&point);
        self.max = self.max.sup(&point);
    }

    /// Checks if a point is inside the AABB.
    #[inline]
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_box_is_merge_identity() {
        let mut a = Aabb::empty();
        assert!(a.is_empty());

        let b = Aabb::new(Vec3::new(-1.0, 0.0, 2.0), Vec3::new(1.0, 3.0, 4.0));
        a.merge(&b);
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn merge_takes_union() {
        let mut a = Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0));
        let b = Aabb::new(Vec3::new(-2.0, 0.5, 0.5), Vec3::new(0.5, 4.0, 0.5));
        a.merge(&b);
        assert_eq!(a.min, Vec3::new(-2.0, 0.0, 0.0));
        assert_eq!(a.max, Vec3::new(1.0, 4.0, 1.0));
    }

    #[test]
    fn merge_point_and_contains() {
        let mut a = Aabb::empty();
        a.merge_point(Vec3::new(1.0, 2.0, 3.0));
        a.merge_point(Vec3::new(-1.0, 0.0, 0.0));
        assert!(a.contains_point(Vec3::new(0.0, 1.0, 1.5)));
        assert!(!a.contains_point(Vec3::new(0.0, 3.0, 1.5)));
    }

    #[test]
    fn size_and_center() {
        let a = Aabb::new(Vec3::new(-1.0, -2.0, -3.0), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(a.size(), Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(a.center(), Vec3::new(0.0, 0.0, 0.0));
    }
}

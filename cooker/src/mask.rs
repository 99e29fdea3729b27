//! Render pass participation masks.

use bitflags::bitflags;

bitflags! {
    /// Render passes and usages a chunk participates in.
    ///
    /// Part of the build-chunk routing key: chunks with different masks
    /// never merge, so a shadow-only proxy stays in its own buffer pair
    /// even when it shares a material with the main geometry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RenderMask: u32 {
        /// Main scene color pass.
        const SCENE = 1 << 0;
        /// Casts shadows from other objects.
        const OBJECT_SHADOWS = 1 << 1;
        /// Casts shadows onto itself.
        const LOCAL_SHADOWS = 1 << 2;
        /// Shadow cascade slice 0.
        const CASCADE_0 = 1 << 3;
        /// Shadow cascade slice 1.
        const CASCADE_1 = 1 << 4;
        /// Shadow cascade slice 2.
        const CASCADE_2 = 1 << 5;
        /// Shadow cascade slice 3.
        const CASCADE_3 = 1 << 6;
        /// Merged far-distance LOD rendering.
        const LOD_MERGE = 1 << 7;
        /// Dedicated shadow proxy geometry.
        const SHADOW_MESH = 1 << 8;
        /// Visible in local reflection probes.
        const LOCAL_REFLECTION = 1 << 9;
        /// Visible in global reflection probes.
        const GLOBAL_REFLECTION = 1 << 10;
        /// Participates in lighting computation.
        const LIGHTING = 1 << 11;
        /// Static occlusion geometry (not rendered).
        const STATIC_OCCLUDER = 1 << 12;
        /// Dynamic occlusion geometry (not rendered).
        const DYNAMIC_OCCLUDER = 1 << 13;
        /// Convex collision hull (not rendered).
        const CONVEX_COLLISION = 1 << 14;
        /// Exact triangle collision (not rendered).
        const EXACT_COLLISION = 1 << 15;
        /// Cloth simulation geometry (not rendered).
        const CLOTH = 1 << 16;
    }
}

impl RenderMask {
    /// Bits describing geometry that never reaches the rasterizer.
    ///
    /// These are stripped during routing; a chunk whose mask becomes
    /// empty after stripping produces no output.
    pub const NON_RENDERABLE: RenderMask = RenderMask::STATIC_OCCLUDER
        .union(RenderMask::DYNAMIC_OCCLUDER)
        .union(RenderMask::CONVEX_COLLISION)
        .union(RenderMask::EXACT_COLLISION)
        .union(RenderMask::CLOTH);

    /// Default mask for imported geometry: all renderable passes.
    pub fn renderable_default() -> Self {
        Self::all().difference(Self::NON_RENDERABLE)
    }

    /// Mask with the non-renderable bits removed.
    pub fn renderable(self) -> Self {
        self.difference(Self::NON_RENDERABLE)
    }
}

impl Default for RenderMask {
    fn default() -> Self {
        Self::renderable_default()
    }
}

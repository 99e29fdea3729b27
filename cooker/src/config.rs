//! Cooking configuration and the swappable algorithm set.

use crate::compress::{BufferCompressor, Lz4Compressor};
use crate::optimize::{
    ForsythCacheOptimizer, LinearFetchOptimizer, VertexCacheOptimizer, VertexFetchOptimizer,
};
use crate::tangent::{MikkTangentGenerator, TangentGenerator};

/// Policy for recomputing a derived per-vertex attribute during cooking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeshDataRecalculationMode {
    /// Leave the imported data untouched.
    Never,
    /// Generate only for chunks that lack the attribute.
    #[default]
    WhenMissing,
    /// Regenerate unconditionally, discarding imported data.
    Always,
    /// Strip the attribute entirely.
    Remove,
}

/// Normal generation algorithm.
///
/// Only flat per-face normals are generated; the smooth modes are
/// accepted so import manifests round-trip, but currently fall back to
/// flat generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormalComputationMode {
    /// One normal per face, broadcast to its vertices.
    #[default]
    Flat,
    /// Smooth normals, uniform face weighting.
    FaceUniform,
    /// Smooth normals, face-area weighting.
    FaceArea,
}

/// The packing manifest: every recognized cooking option.
#[derive(Debug, Clone)]
pub struct CookSettings {
    /// When to (re)compute vertex normals.
    pub normal_recalculation: MeshDataRecalculationMode,
    /// Normal generation algorithm (flat only, see [`NormalComputationMode`]).
    pub normal_computation_mode: NormalComputationMode,
    /// Crease angle in degrees for smooth normal generation.
    pub normal_angular_threshold: f32,
    /// Honor source smoothing groups when smoothing normals.
    pub use_face_smooth_groups: bool,
    /// Negate normals after generation.
    pub flip_normals: bool,
    /// When to (re)compute tangent space.
    pub tangents_recalculation: MeshDataRecalculationMode,
    /// Crease angle in degrees for tangent generation.
    pub tangents_angular_threshold: f32,
    /// Negate tangents after generation.
    pub flip_tangent: bool,
    /// Negate bitangents after generation.
    pub flip_bitangent: bool,
    /// Collapse bit-identical output vertices.
    pub merge_duplicate_vertices: bool,
    /// Reorder indices for GPU transform-cache reuse.
    pub optimize_vertex_cache: bool,
    /// Reorder vertices for fetch locality.
    pub optimize_vertex_fetch: bool,
}

impl Default for CookSettings {
    fn default() -> Self {
        Self {
            normal_recalculation: MeshDataRecalculationMode::WhenMissing,
            normal_computation_mode: NormalComputationMode::Flat,
            normal_angular_threshold: 45.0,
            use_face_smooth_groups: true,
            flip_normals: false,
            tangents_recalculation: MeshDataRecalculationMode::WhenMissing,
            tangents_angular_threshold: 45.0,
            flip_tangent: false,
            flip_bitangent: false,
            merge_duplicate_vertices: true,
            optimize_vertex_cache: true,
            optimize_vertex_fetch: true,
        }
    }
}

/// The swappable algorithm boundary of the pipeline.
///
/// Every slot holds a trait object so callers can substitute
/// alternative implementations (or test doubles) without touching the
/// pipeline itself.
pub struct CookAlgorithms {
    /// Tangent-space generator driven by the attribute stage.
    pub tangents: Box<dyn TangentGenerator>,
    /// Index reorderer for transform-cache reuse.
    pub vertex_cache: Box<dyn VertexCacheOptimizer>,
    /// Vertex reorderer for fetch locality.
    pub vertex_fetch: Box<dyn VertexFetchOptimizer>,
    /// Buffer compressor for packed output.
    pub compressor: Box<dyn BufferCompressor>,
}

impl Default for CookAlgorithms {
    fn default() -> Self {
        Self {
            tangents: Box::new(MikkTangentGenerator),
            vertex_cache: Box::new(ForsythCacheOptimizer::default()),
            vertex_fetch: Box::new(LinearFetchOptimizer),
            compressor: Box::new(Lz4Compressor::default()),
        }
    }
}

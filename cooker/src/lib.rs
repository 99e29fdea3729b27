//! # MeshForge Cooker
//!
//! The mesh cooking pipeline: converts imported, artist-authored meshes
//! (arbitrary per-vertex attribute streams, quad or triangle topology,
//! arbitrary material/LOD groupings) into a small number of GPU-ready,
//! quantized, compressed vertex/index buffer pairs grouped by render
//! state.
//!
//! The pipeline runs as a linear sequence of stages with cancellation
//! checkpoints at every boundary:
//!
//! 1. Extract import chunks from the source mesh
//! 2. Generate or strip normals / tangent space per chunk
//! 3. Route chunks into build chunks keyed by
//!    (vertex format, material, render mask, detail mask)
//! 4. Pack every build chunk: convert to the output vertex layout,
//!    deduplicate, optimize for the GPU transform cache and vertex
//!    fetch locality, quantize positions, compress
//! 5. Export materials and cooked chunks
//!
//! Entry point: [`cook::cook_mesh`].

pub mod build;
pub mod compress;
pub mod config;
pub mod cook;
pub mod format;
pub mod import;
pub mod mask;
pub mod optimize;
pub mod quantize;
pub mod stream;
pub mod tangent;

pub use build::{BuildChunk, BuildChunkRegistry, SourceChunkInfo};
pub use compress::{BufferCompressor, Lz4Compressor};
pub use config::{CookAlgorithms, CookSettings, MeshDataRecalculationMode, NormalComputationMode};
pub use cook::{
    cook_mesh, CookStats, CookedChunk, CookedMaterial, CookedMesh, MaterialBinding, SourceChunk,
    SourceMaterial, SourceMesh, SourceTopology,
};
pub use format::{MeshVertexFormat, PackedFormat, VertexFormatInfo};
pub use import::{ImportChunk, ImportChunkRegistry};
pub use mask::RenderMask;
pub use optimize::{
    ForsythCacheOptimizer, LinearFetchOptimizer, VertexCacheOptimizer, VertexFetchOptimizer,
};
pub use quantize::QuantizationHelper;
pub use stream::{MeshStreamKind, VertexStream};
pub use tangent::{MikkTangentGenerator, TangentGenerator, TangentSpaceMesh};

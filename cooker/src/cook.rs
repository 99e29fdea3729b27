//! The cook orchestrator: source mesh in, packed mesh out.
//!
//! A linear stage sequence with a cancellation checkpoint at every
//! boundary: extract, normal generation, tangent generation, UV
//! generation (placeholder), build-chunk routing, packing, material
//! export, chunk export, assembly. Cancellation anywhere discards the
//! whole cook; there is no partial result.

use meshforge_core::compute::{Cancelled, ProgressTracker, TaskPool};
use meshforge_core::math::{Aabb, Vec3};

use crate::build::BuildChunkRegistry;
use crate::config::{CookAlgorithms, CookSettings, MeshDataRecalculationMode};
use crate::format::MeshVertexFormat;
use crate::import::{ImportChunk, ImportChunkRegistry};
use crate::mask::RenderMask;
use crate::stream::{MeshStreamKind, VertexStream};

/// Face topology of a source geometry group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceTopology {
    /// Three vertices per face.
    Triangles,
    /// Four vertices per face, split into two triangles while packing.
    Quads,
}

/// One geometry group handed over by the importer.
#[derive(Debug, Clone)]
pub struct SourceChunk {
    /// Index into the source mesh's material table.
    pub material_index: u32,
    /// Render passes the geometry participates in.
    pub render_mask: RenderMask,
    /// Detail/LOD mask.
    pub detail_mask: u32,
    /// Face topology.
    pub topology: SourceTopology,
    /// Number of face vertices.
    pub vertex_count: u32,
    /// Number of faces.
    pub face_count: u32,
    /// Per-vertex attribute streams.
    pub streams: Vec<VertexStream>,
    /// Bounding box; recomputed from positions when empty.
    pub bounds: Aabb,
}

/// One texture binding of a source material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialBinding {
    /// Material parameter name.
    pub name: String,
    /// Bound texture path.
    pub texture: String,
}

/// A source material: a name plus its texture bindings, carried through
/// the cook untouched.
#[derive(Debug, Clone)]
pub struct SourceMaterial {
    /// Material name.
    pub name: String,
    /// Texture bindings.
    pub bindings: Vec<MaterialBinding>,
}

/// The full importer hand-off: geometry groups plus the material table
/// their `material_index` fields point into.
#[derive(Debug, Clone, Default)]
pub struct SourceMesh {
    /// Geometry groups.
    pub chunks: Vec<SourceChunk>,
    /// Material table.
    pub materials: Vec<SourceMaterial>,
}

/// An exported material, pass-through from the source.
#[derive(Debug, Clone)]
pub struct CookedMaterial {
    /// Material name.
    pub name: String,
    /// Texture bindings.
    pub bindings: Vec<MaterialBinding>,
}

/// One packed buffer pair ready for the mesh-asset serializer.
#[derive(Debug, Clone)]
pub struct CookedChunk {
    /// Render passes of the chunk.
    pub render_mask: RenderMask,
    /// Detail/LOD mask.
    pub detail_mask: u32,
    /// Index into [`CookedMesh::materials`].
    pub material_index: u32,
    /// Output vertex layout.
    pub vertex_format: MeshVertexFormat,
    /// Vertex count after deduplication.
    pub vertex_count: u32,
    /// Index count (always a multiple of 3).
    pub index_count: u32,
    /// Vertex data, compressed unless sizes match.
    pub packed_vertex_data: Vec<u8>,
    /// Index data, compressed unless sizes match.
    pub packed_index_data: Vec<u8>,
    /// Raw vertex buffer size in bytes.
    pub unpacked_vertex_size: u32,
    /// Raw index buffer size in bytes.
    pub unpacked_index_size: u32,
    /// Quantization translation, zero for unquantized formats.
    pub quantization_offset: Vec3,
    /// Quantization scale, one for unquantized formats.
    pub quantization_scale: Vec3,
}

/// Counters accumulated across one cook.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CookStats {
    /// Geometry groups in the source mesh.
    pub source_chunks: u32,
    /// Build chunks produced by routing.
    pub build_chunks: u32,
    /// Source chunks dropped by routing (non-renderable masks).
    pub skipped_chunks: u32,
}

/// The final cooked mesh.
#[derive(Debug, Clone)]
pub struct CookedMesh {
    /// Merged bounding box of all accepted geometry.
    pub bounds: Aabb,
    /// Exported materials.
    pub materials: Vec<CookedMaterial>,
    /// Packed chunks, one per build chunk.
    pub chunks: Vec<CookedChunk>,
    /// Cook counters.
    pub stats: CookStats,
}

const STAGE_COUNT: u32 = 9;

fn stage(progress: &dyn ProgressTracker, current: u32, label: &str) -> Result<(), Cancelled> {
    progress.checkpoint()?;
    progress.report(current, STAGE_COUNT, label);
    Ok(())
}

/// Cooks a source mesh into packed, GPU-ready chunks.
///
/// Returns `None` when the cook is cancelled; an empty source mesh is
/// not a failure and cooks to an empty output with fallback bounds.
pub fn cook_mesh(
    source: &SourceMesh,
    settings: &CookSettings,
    algorithms: &CookAlgorithms,
    pool: &TaskPool,
    progress: &dyn ProgressTracker,
) -> Option<CookedMesh> {
    match cook_mesh_inner(source, settings, algorithms, pool, progress) {
        Ok(mesh) => Some(mesh),
        Err(Cancelled) => {
            log::info!("mesh cook cancelled");
            None
        }
    }
}

fn cook_mesh_inner(
    source: &SourceMesh,
    settings: &CookSettings,
    algorithms: &CookAlgorithms,
    pool: &TaskPool,
    progress: &dyn ProgressTracker,
) -> Result<CookedMesh, Cancelled> {
    stage(progress, 1, "extracting import chunks")?;
    let mut import = ImportChunkRegistry::from_source(&source.chunks);

    stage(progress, 2, "generating normals")?;
    generate_normals(&mut import, settings, pool);

    stage(progress, 3, "generating tangent space")?;
    generate_tangents(&mut import, settings, algorithms, pool);

    // UV generation slot; no generator exists yet
    stage(progress, 4, "generating uvs")?;

    stage(progress, 5, "routing build chunks")?;
    let mut builds = BuildChunkRegistry::new();
    let mut skipped = 0u32;
    for (chunk_index, chunk) in import.chunks.iter().enumerate() {
        let format = select_vertex_format(chunk);
        match builds.find_build_chunk(
            format,
            chunk.material_index,
            chunk.render_mask,
            chunk.detail_mask,
        ) {
            Some(build) => build.add_chunk(chunk_index, chunk),
            None => {
                skipped += 1;
                log::debug!(
                    "skipping non-renderable source chunk (material {})",
                    chunk.material_index
                );
            }
        }
    }
    log::debug!(
        "routed {} import chunks into {} build chunks ({} skipped)",
        import.chunks.len(),
        builds.chunks().len(),
        skipped
    );

    stage(progress, 6, "packing chunks")?;
    builds.pack_all(&import, settings, algorithms, pool, progress)?;

    stage(progress, 7, "exporting materials")?;
    let materials = source
        .materials
        .iter()
        .map(|m| CookedMaterial {
            name: m.name.clone(),
            bindings: m.bindings.clone(),
        })
        .collect();

    stage(progress, 8, "exporting chunks")?;
    let mut chunks = Vec::with_capacity(builds.chunks().len());
    for build in builds.chunks() {
        let (Some(vertex_count), Some(index_count)) =
            (build.final_vertex_count, build.final_index_count)
        else {
            continue;
        };
        let (quantization_offset, quantization_scale) = match &build.quantization {
            Some(q) => (q.offset(), q.scale()),
            None => (Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0)),
        };
        chunks.push(CookedChunk {
            render_mask: build.render_mask,
            detail_mask: build.detail_mask,
            material_index: build.material_index,
            vertex_format: build.format,
            vertex_count,
            index_count,
            packed_vertex_data: build.packed_vertex_data.clone(),
            packed_index_data: build.packed_index_data.clone(),
            unpacked_vertex_size: build.unpacked_vertex_size,
            unpacked_index_size: build.unpacked_index_size,
            quantization_offset,
            quantization_scale,
        });
    }

    stage(progress, 9, "assembling mesh")?;
    let bounds = if import.bounds.is_empty() {
        Aabb::from_center_extent(Vec3::zeros(), 1.0)
    } else {
        import.bounds
    };
    Ok(CookedMesh {
        bounds,
        materials,
        chunks,
        stats: CookStats {
            source_chunks: source.chunks.len() as u32,
            build_chunks: builds.chunks().len() as u32,
            skipped_chunks: skipped,
        },
    })
}

/// Output layout policy. Fixed to the quantized static layout for now;
/// skinned and extended layouts route through the same machinery once a
/// selection policy exists.
fn select_vertex_format(_chunk: &ImportChunk) -> MeshVertexFormat {
    MeshVertexFormat::Static
}

fn generate_normals(import: &mut ImportChunkRegistry, settings: &CookSettings, pool: &TaskPool) {
    if settings.normal_recalculation == MeshDataRecalculationMode::Remove {
        for chunk in &mut import.chunks {
            chunk.remove_normals();
        }
        return;
    }

    // smooth modes fall back to flat generation, see NormalComputationMode
    let targets: Vec<&mut ImportChunk> = import
        .chunks
        .iter_mut()
        .filter(|chunk| match settings.normal_recalculation {
            MeshDataRecalculationMode::Never => false,
            MeshDataRecalculationMode::WhenMissing => !chunk.has_normals(),
            MeshDataRecalculationMode::Always => true,
            MeshDataRecalculationMode::Remove => false,
        })
        .collect();
    pool.for_each(targets, |chunk| {
        chunk.compute_flat_normals();
    });

    if settings.flip_normals {
        let all: Vec<&mut ImportChunk> = import.chunks.iter_mut().collect();
        pool.for_each(all, |chunk| {
            chunk.flip_stream(MeshStreamKind::Normal);
        });
    }
}

fn generate_tangents(
    import: &mut ImportChunkRegistry,
    settings: &CookSettings,
    algorithms: &CookAlgorithms,
    pool: &TaskPool,
) {
    if settings.tangents_recalculation == MeshDataRecalculationMode::Remove {
        for chunk in &mut import.chunks {
            chunk.remove_tangent_space();
        }
        return;
    }

    let generator = algorithms.tangents.as_ref();
    let threshold = settings.tangents_angular_threshold;
    let targets: Vec<&mut ImportChunk> = import
        .chunks
        .iter_mut()
        .filter(|chunk| match settings.tangents_recalculation {
            MeshDataRecalculationMode::Never => false,
            MeshDataRecalculationMode::WhenMissing => !chunk.has_tangents(),
            MeshDataRecalculationMode::Always => true,
            MeshDataRecalculationMode::Remove => false,
        })
        .collect();
    pool.for_each(targets, |chunk| {
        chunk.compute_tangent_space(generator, threshold);
    });

    if settings.flip_tangent {
        let all: Vec<&mut ImportChunk> = import.chunks.iter_mut().collect();
        pool.for_each(all, |chunk| {
            chunk.flip_stream(MeshStreamKind::Tangent);
        });
    }
    if settings.flip_bitangent {
        let all: Vec<&mut ImportChunk> = import.chunks.iter_mut().collect();
        pool.for_each(all, |chunk| {
            chunk.flip_stream(MeshStreamKind::Binormal);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_source_cooks_to_empty_output_with_fallback_bounds() {
        let source = SourceMesh::default();
        let cooked = cook_mesh(
            &source,
            &CookSettings::default(),
            &CookAlgorithms::default(),
            &TaskPool::new(2),
            &meshforge_core::compute::NullProgress,
        )
        .expect("not cancelled");

        assert!(cooked.chunks.is_empty());
        assert!(cooked.materials.is_empty());
        assert_eq!(cooked.stats, CookStats::default());
        assert!(!cooked.bounds.is_empty());
        assert!(cooked.bounds.contains_point(Vec3::zeros()));
    }
}

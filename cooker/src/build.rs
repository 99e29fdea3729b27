//! Build chunks: merge, pack and optimize routed geometry.

use meshforge_core::compute::{Cancelled, ProgressTracker, TaskPool};
use meshforge_core::math::Aabb;
use parking_lot::Mutex;

use crate::config::{CookAlgorithms, CookSettings};
use crate::format::{self, MeshVertexFormat};
use crate::import::{ImportChunk, ImportChunkRegistry};
use crate::mask::RenderMask;
use crate::optimize;
use crate::quantize::QuantizationHelper;

/// Bookkeeping for one import chunk merged into a build chunk.
#[derive(Debug, Clone)]
pub struct SourceChunkInfo {
    /// Index of the import chunk in the [`ImportChunkRegistry`].
    pub chunk_index: usize,
    /// Vertex slot where this chunk's vertices start in the merged buffer.
    pub first_vertex: u32,
    /// Index slot where this chunk's indices start in the merged buffer.
    pub first_index: u32,
    /// Number of vertices contributed.
    pub vertex_count: u32,
    /// Number of indices contributed (after quad expansion).
    pub index_count: u32,
    /// Bounding box of the contributing chunk.
    pub bounds: Aabb,
    /// Chunk-local triangle-list indices, rebased during packing.
    pub indices: Vec<u32>,
}

#[derive(Debug, Default)]
struct ChunkAccumulator {
    source_chunks: Vec<SourceChunkInfo>,
    total_vertices: u32,
    total_indices: u32,
}

/// Accumulates import chunks that share an output key and packs them
/// into one GPU buffer pair.
///
/// Accumulation ([`add_chunk`](Self::add_chunk)) assigns disjoint vertex
/// and index ranges under a lock, anticipating concurrent producers.
/// [`pack`](Self::pack) then fills those ranges in parallel without any
/// further synchronization.
pub struct BuildChunk {
    /// Output vertex layout.
    pub format: MeshVertexFormat,
    /// Index into the source mesh's material table.
    pub material_index: u32,
    /// Render passes of the merged geometry (non-renderable bits removed).
    pub render_mask: RenderMask,
    /// Detail/LOD mask.
    pub detail_mask: u32,
    /// Quantization group, `Some(0)` for quantized formats. Group 0 is
    /// the single global group; per-group quantization is an extension
    /// point.
    pub quantization_group: Option<u32>,
    /// Shared quantization transform, assigned before packing.
    pub quantization: Option<QuantizationHelper>,
    /// Vertex count after packing, unset until `pack` completes.
    pub final_vertex_count: Option<u32>,
    /// Index count after packing, unset until `pack` completes.
    pub final_index_count: Option<u32>,
    /// Packed (possibly compressed) vertex data.
    pub packed_vertex_data: Vec<u8>,
    /// Packed (possibly compressed) index data.
    pub packed_index_data: Vec<u8>,
    /// Raw vertex buffer size; equal to the packed size when stored raw.
    pub unpacked_vertex_size: u32,
    /// Raw index buffer size; equal to the packed size when stored raw.
    pub unpacked_index_size: u32,
    accumulator: Mutex<ChunkAccumulator>,
}

impl BuildChunk {
    fn new(
        format: MeshVertexFormat,
        material_index: u32,
        render_mask: RenderMask,
        detail_mask: u32,
    ) -> Self {
        Self {
            format,
            material_index,
            render_mask,
            detail_mask,
            quantization_group: format.info().quantized_position.then_some(0),
            quantization: None,
            final_vertex_count: None,
            final_index_count: None,
            packed_vertex_data: Vec::new(),
            packed_index_data: Vec::new(),
            unpacked_vertex_size: 0,
            unpacked_index_size: 0,
            accumulator: Mutex::new(ChunkAccumulator::default()),
        }
    }

    /// Merges one import chunk, assigning it the next free vertex and
    /// index ranges.
    pub fn add_chunk(&self, chunk_index: usize, chunk: &ImportChunk) {
        let indices = chunk.build_triangle_list_index_buffer();
        let mut acc = self.accumulator.lock();
        let info = SourceChunkInfo {
            chunk_index,
            first_vertex: acc.total_vertices,
            first_index: acc.total_indices,
            vertex_count: chunk.vertex_count,
            index_count: indices.len() as u32,
            bounds: chunk.bounds,
            indices,
        };
        acc.total_vertices += info.vertex_count;
        acc.total_indices += info.index_count;
        acc.source_chunks.push(info);
    }

    /// Sum of vertices over all merged chunks.
    pub fn total_vertices(&self) -> u32 {
        self.accumulator.lock().total_vertices
    }

    /// Sum of indices over all merged chunks.
    pub fn total_indices(&self) -> u32 {
        self.accumulator.lock().total_indices
    }

    /// Number of merged import chunks.
    pub fn source_chunk_count(&self) -> usize {
        self.accumulator.lock().source_chunks.len()
    }

    /// Packs all merged chunks into the final buffer pair.
    ///
    /// Runs gather, dedup, cache reorder, fetch reorder and compression
    /// in order, checking for cancellation between phases.
    /// On cancellation the chunk is left without final counts; its
    /// partial buffers must not be consumed.
    pub fn pack(
        &mut self,
        registry: &ImportChunkRegistry,
        settings: &CookSettings,
        algorithms: &CookAlgorithms,
        pool: &TaskPool,
        progress: &dyn ProgressTracker,
    ) -> Result<(), Cancelled> {
        progress.checkpoint()?;

        let stride = self.format.stride();
        let vertex_format = self.format;
        let quantizer = self.quantization.as_ref();
        let acc = self.accumulator.get_mut();
        let total_vertices = acc.total_vertices as usize;
        let total_indices = acc.total_indices as usize;

        let mut vertex_data = vec![0u8; stride * total_vertices];
        let mut index_data = vec![0u32; total_indices];

        // gather: disjoint pre-assigned ranges, two tasks per source chunk
        pool.scope(|s| {
            let mut vertex_rest: &mut [u8] = &mut vertex_data;
            let mut index_rest: &mut [u32] = &mut index_data;
            for src in acc.source_chunks.iter() {
                let (vertex_slice, tail) =
                    vertex_rest.split_at_mut(src.vertex_count as usize * stride);
                vertex_rest = tail;
                let (index_slice, tail) = index_rest.split_at_mut(src.index_count as usize);
                index_rest = tail;

                let chunk = &registry.chunks[src.chunk_index];
                s.spawn(move || {
                    format::pack_vertex_data(chunk, vertex_format, quantizer, vertex_slice);
                });

                let first_vertex = src.first_vertex;
                let local_indices = &src.indices;
                s.spawn(move || {
                    for (dst, &index) in index_slice.iter_mut().zip(local_indices.iter()) {
                        *dst = index + first_vertex;
                    }
                });
            }
        });

        progress.checkpoint()?;

        let mut vertex_count = total_vertices as u32;
        if settings.merge_duplicate_vertices {
            let (remap, unique) = optimize::generate_vertex_remap(&vertex_data, stride);
            vertex_data = optimize::remap_vertex_buffer(&vertex_data, stride, &remap, unique);
            optimize::remap_index_buffer(&mut index_data, &remap);
            log::debug!(
                "build chunk material {}: dedup {} -> {} vertices",
                self.material_index,
                vertex_count,
                unique
            );
            vertex_count = unique;

            if settings.optimize_vertex_cache {
                algorithms.vertex_cache.optimize(&mut index_data, vertex_count);
            }
            progress.checkpoint()?;
            if settings.optimize_vertex_fetch {
                algorithms
                    .vertex_fetch
                    .optimize(&mut vertex_data, stride, &mut index_data);
            }
        }

        progress.checkpoint()?;
        self.final_vertex_count = Some(vertex_count);
        self.final_index_count = Some(index_data.len() as u32);

        self.unpacked_vertex_size = vertex_data.len() as u32;
        self.packed_vertex_data = match algorithms.compressor.compress(&vertex_data) {
            Some(compressed) => compressed,
            None => vertex_data,
        };

        progress.checkpoint()?;
        let index_bytes: Vec<u8> = bytemuck::cast_slice(&index_data).to_vec();
        self.unpacked_index_size = index_bytes.len() as u32;
        self.packed_index_data = match algorithms.compressor.compress(&index_bytes) {
            Some(compressed) => compressed,
            None => index_bytes,
        };
        log::debug!(
            "build chunk material {}: packed {}/{} vertex bytes, {}/{} index bytes",
            self.material_index,
            self.packed_vertex_data.len(),
            self.unpacked_vertex_size,
            self.packed_index_data.len(),
            self.unpacked_index_size
        );
        Ok(())
    }
}

/// Owns all build chunks for one cook and routes import chunks to them.
#[derive(Default)]
pub struct BuildChunkRegistry {
    chunks: Vec<BuildChunk>,
}

impl BuildChunkRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes geometry to the build chunk matching
    /// `(format, material, masked render mask, detail mask)`, creating
    /// one on demand.
    ///
    /// Returns `None` when no renderable bit survives masking; the
    /// caller drops the source chunk and counts the skip.
    pub fn find_build_chunk(
        &mut self,
        format: MeshVertexFormat,
        material_index: u32,
        render_mask: RenderMask,
        detail_mask: u32,
    ) -> Option<&mut BuildChunk> {
        let masked = render_mask.renderable();
        if masked.is_empty() {
            return None;
        }

        let at = self.chunks.iter().position(|c| {
            c.format == format
                && c.material_index == material_index
                && c.render_mask == masked
                && c.detail_mask == detail_mask
        });
        let at = match at {
            Some(at) => at,
            None => {
                log::debug!(
                    "new build chunk: {} material {} mask {:?} detail {:#x}",
                    format.info().name,
                    material_index,
                    masked,
                    detail_mask
                );
                self.chunks
                    .push(BuildChunk::new(format, material_index, masked, detail_mask));
                self.chunks.len() - 1
            }
        };
        Some(&mut self.chunks[at])
    }

    /// All build chunks, in creation order.
    pub fn chunks(&self) -> &[BuildChunk] {
        &self.chunks
    }

    /// Establishes the shared quantization transform, then packs every
    /// chunk in parallel. Cancellation in any chunk aborts the stage.
    pub fn pack_all(
        &mut self,
        registry: &ImportChunkRegistry,
        settings: &CookSettings,
        algorithms: &CookAlgorithms,
        pool: &TaskPool,
        progress: &dyn ProgressTracker,
    ) -> Result<(), Cancelled> {
        progress.checkpoint()?;

        // one helper per quantization group; only group 0 exists today
        let mut group_bounds = Aabb::empty();
        for chunk in self.chunks.iter_mut().filter(|c| c.quantization_group.is_some()) {
            for src in &chunk.accumulator.get_mut().source_chunks {
                group_bounds.merge(&src.bounds);
            }
        }
        let helper = QuantizationHelper::from_bounds(&group_bounds);
        for chunk in self.chunks.iter_mut() {
            if chunk.quantization_group.is_some() {
                chunk.quantization = Some(helper.clone());
            }
        }

        let cancelled = std::sync::atomic::AtomicBool::new(false);
        let chunk_refs: Vec<&mut BuildChunk> = self.chunks.iter_mut().collect();
        pool.for_each(chunk_refs, |chunk| {
            if chunk
                .pack(registry, settings, algorithms, pool, progress)
                .is_err()
            {
                cancelled.store(true, std::sync::atomic::Ordering::Relaxed);
            }
        });

        if cancelled.load(std::sync::atomic::Ordering::Relaxed) {
            return Err(Cancelled);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cook::{SourceChunk, SourceTopology};
    use crate::stream::{MeshStreamKind, VertexStream};
    use meshforge_core::compute::{CancellationToken, NullProgress, TokenProgress};
    use meshforge_core::math::Vec3;

    fn source_chunk(topology: SourceTopology, positions: &[[f32; 3]]) -> SourceChunk {
        let vertex_count = positions.len() as u32;
        let verts_per_face = match topology {
            SourceTopology::Triangles => 3,
            SourceTopology::Quads => 4,
        };
        SourceChunk {
            material_index: 0,
            render_mask: RenderMask::default(),
            detail_mask: 1,
            topology,
            vertex_count,
            face_count: vertex_count / verts_per_face,
            streams: vec![VertexStream::from_data(
                MeshStreamKind::Position,
                positions.len(),
                bytemuck::cast_slice(positions).to_vec(),
            )],
            bounds: Aabb::empty(),
        }
    }

    fn registry_of(chunks: &[SourceChunk]) -> ImportChunkRegistry {
        ImportChunkRegistry::from_source(chunks)
    }

    #[test]
    fn routing_rejects_non_renderable_masks() {
        let mut registry = BuildChunkRegistry::new();
        assert!(registry
            .find_build_chunk(
                MeshVertexFormat::Static,
                0,
                RenderMask::CONVEX_COLLISION,
                1
            )
            .is_none());
        assert!(registry.chunks().is_empty());
    }

    #[test]
    fn routing_merges_matching_keys_and_splits_different_ones() {
        let mut registry = BuildChunkRegistry::new();
        let mask = RenderMask::default();
        registry
            .find_build_chunk(MeshVertexFormat::Static, 0, mask, 1)
            .expect("renderable");
        registry
            .find_build_chunk(MeshVertexFormat::Static, 0, mask, 1)
            .expect("renderable");
        assert_eq!(registry.chunks().len(), 1);

        registry
            .find_build_chunk(MeshVertexFormat::Static, 1, mask, 1)
            .expect("renderable");
        assert_eq!(registry.chunks().len(), 2);
    }

    #[test]
    fn non_renderable_bits_are_stripped_from_the_key() {
        let mut registry = BuildChunkRegistry::new();
        let chunk = registry
            .find_build_chunk(
                MeshVertexFormat::Static,
                0,
                RenderMask::SCENE | RenderMask::EXACT_COLLISION,
                1,
            )
            .expect("scene bit survives");
        assert_eq!(chunk.render_mask, RenderMask::SCENE);
    }

    #[test]
    fn quantized_formats_join_group_zero() {
        let mut registry = BuildChunkRegistry::new();
        let quantized = registry
            .find_build_chunk(MeshVertexFormat::Static, 0, RenderMask::default(), 1)
            .expect("renderable");
        assert_eq!(quantized.quantization_group, Some(0));

        let raw = registry
            .find_build_chunk(MeshVertexFormat::StaticEx, 0, RenderMask::default(), 1)
            .expect("renderable");
        assert_eq!(raw.quantization_group, None);
    }

    #[test]
    fn quad_and_triangle_chunks_merge_into_expected_totals() {
        let quad = source_chunk(
            SourceTopology::Quads,
            &[
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
        );
        let tri = source_chunk(
            SourceTopology::Triangles,
            &[[0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [0.0, 1.0, 1.0]],
        );
        let import = registry_of(&[quad, tri]);

        let mut registry = BuildChunkRegistry::new();
        for (i, chunk) in import.chunks.iter().enumerate() {
            let build = registry
                .find_build_chunk(
                    MeshVertexFormat::Static,
                    chunk.material_index,
                    chunk.render_mask,
                    chunk.detail_mask,
                )
                .expect("renderable");
            build.add_chunk(i, chunk);
        }

        assert_eq!(registry.chunks().len(), 1);
        let build = &registry.chunks()[0];
        assert_eq!(build.total_vertices(), 7);
        assert_eq!(build.total_indices(), 9);
        assert_eq!(build.source_chunk_count(), 2);
    }

    #[test]
    fn pack_produces_valid_final_counts_and_indices() {
        let tri = source_chunk(
            SourceTopology::Triangles,
            &[
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
        );
        let import = registry_of(&[tri]);

        let mut registry = BuildChunkRegistry::new();
        let chunk = &import.chunks[0];
        registry
            .find_build_chunk(
                MeshVertexFormat::StaticEx,
                chunk.material_index,
                chunk.render_mask,
                chunk.detail_mask,
            )
            .expect("renderable")
            .add_chunk(0, chunk);

        let settings = CookSettings::default();
        let algorithms = CookAlgorithms::default();
        let pool = TaskPool::new(2);
        registry
            .pack_all(&import, &settings, &algorithms, &pool, &NullProgress)
            .expect("not cancelled");

        let build = &registry.chunks()[0];
        let final_vertices = build.final_vertex_count.expect("pack completed");
        let final_indices = build.final_index_count.expect("pack completed");
        // the two triangles share two corners
        assert_eq!(final_vertices, 4);
        assert_eq!(final_indices, 6);
        assert_eq!(final_indices % 3, 0);
        assert!(build.unpacked_vertex_size >= build.packed_vertex_data.len() as u32);
        assert!(build.unpacked_index_size >= build.packed_index_data.len() as u32);
    }

    #[test]
    fn quantized_pack_round_trips_positions() {
        let tri = source_chunk(
            SourceTopology::Triangles,
            &[[0.0, 0.0, 0.0], [4.0, 0.0, 0.0], [0.0, 4.0, 2.0]],
        );
        let import = registry_of(&[tri]);

        let mut registry = BuildChunkRegistry::new();
        let chunk = &import.chunks[0];
        registry
            .find_build_chunk(
                MeshVertexFormat::Static,
                chunk.material_index,
                chunk.render_mask,
                chunk.detail_mask,
            )
            .expect("renderable")
            .add_chunk(0, chunk);

        let settings = CookSettings {
            merge_duplicate_vertices: false,
            optimize_vertex_cache: false,
            optimize_vertex_fetch: false,
            ..CookSettings::default()
        };
        let algorithms = CookAlgorithms::default();
        let pool = TaskPool::new(1);
        registry
            .pack_all(&import, &settings, &algorithms, &pool, &NullProgress)
            .expect("not cancelled");

        let build = &registry.chunks()[0];
        let helper = build.quantization.as_ref().expect("quantized format");
        let raw = if build.packed_vertex_data.len() as u32 == build.unpacked_vertex_size {
            build.packed_vertex_data.clone()
        } else {
            algorithms
                .compressor
                .decompress(
                    &build.packed_vertex_data,
                    build.unpacked_vertex_size as usize,
                )
                .expect("valid payload")
        };
        let stride = MeshVertexFormat::Static.stride();
        let expected = [[0.0f32, 0.0, 0.0], [4.0, 0.0, 0.0], [0.0, 4.0, 2.0]];
        for (i, want) in expected.iter().enumerate() {
            let at = i * stride;
            let mut packed = [0u8; 8];
            packed.copy_from_slice(&raw[at..at + 8]);
            let got = helper.dequantize_position(u64::from_ne_bytes(packed));
            assert!((got - Vec3::from(*want)).norm() < 1e-3, "{want:?} vs {got:?}");
        }
    }

    #[test]
    fn cancelled_pack_leaves_counts_unset() {
        let tri = source_chunk(
            SourceTopology::Triangles,
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        );
        let import = registry_of(&[tri]);

        let mut registry = BuildChunkRegistry::new();
        let chunk = &import.chunks[0];
        registry
            .find_build_chunk(
                MeshVertexFormat::Static,
                chunk.material_index,
                chunk.render_mask,
                chunk.detail_mask,
            )
            .expect("renderable")
            .add_chunk(0, chunk);

        let token = CancellationToken::new();
        token.cancel();
        let progress = TokenProgress::new(token);

        let settings = CookSettings::default();
        let algorithms = CookAlgorithms::default();
        let pool = TaskPool::new(2);
        let result = registry.pack_all(&import, &settings, &algorithms, &pool, &progress);
        assert_eq!(result, Err(Cancelled));

        let build = &registry.chunks()[0];
        assert_eq!(build.final_vertex_count, None);
        assert_eq!(build.final_index_count, None);
    }
}

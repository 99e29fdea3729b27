//! Import chunks: raw source geometry prior to packing.

use meshforge_core::math::{Aabb, Vec3};

use crate::cook::{SourceChunk, SourceTopology};
use crate::mask::RenderMask;
use crate::stream::{MeshStreamKind, VertexStream};
use crate::tangent::{TangentGenerator, TangentSpaceMesh};

/// One source geometry group: a run of faces sharing material, masks
/// and topology, with per-vertex attributes stored as flat streams.
///
/// Topology is implicit: vertex `i` belongs to face
/// `i / vertices_per_face()`. An explicit index buffer only exists once
/// [`build_triangle_list_index_buffer`](Self::build_triangle_list_index_buffer)
/// synthesizes one.
#[derive(Debug, Clone)]
pub struct ImportChunk {
    /// Index into the source mesh's material table.
    pub material_index: u32,
    /// Render passes this geometry participates in.
    pub render_mask: RenderMask,
    /// Detail/LOD mask.
    pub detail_mask: u32,
    /// Faces are quads instead of triangles.
    pub quads: bool,
    /// Number of face vertices across all streams.
    pub vertex_count: u32,
    /// Number of faces.
    pub face_count: u32,
    /// Bounding box of the position stream.
    pub bounds: Aabb,
    streams: Vec<VertexStream>,
}

impl ImportChunk {
    /// Copies a source geometry group into an import chunk.
    ///
    /// Missing bounds are recomputed from the position stream.
    pub fn from_source(source: &SourceChunk) -> Self {
        let mut chunk = Self {
            material_index: source.material_index,
            render_mask: source.render_mask,
            detail_mask: source.detail_mask,
            quads: source.topology == SourceTopology::Quads,
            vertex_count: source.vertex_count,
            face_count: source.face_count,
            bounds: source.bounds,
            streams: source.streams.clone(),
        };
        debug_assert_eq!(
            chunk.vertex_count,
            chunk.face_count * chunk.vertices_per_face(),
            "vertex count does not cover the implicit faces"
        );
        if chunk.bounds.is_empty() {
            chunk.bounds = chunk.compute_position_bounds();
        }
        chunk
    }

    /// Vertices per face: 3 for triangles, 4 for quads.
    pub fn vertices_per_face(&self) -> u32 {
        if self.quads {
            4
        } else {
            3
        }
    }

    /// All streams owned by this chunk.
    pub fn streams(&self) -> &[VertexStream] {
        &self.streams
    }

    /// Whether a stream of the given kind exists.
    pub fn has_vertex_stream(&self, kind: MeshStreamKind) -> bool {
        self.streams.iter().any(|s| s.kind == kind)
    }

    /// The stream of the given kind, if present.
    pub fn vertex_stream(&self, kind: MeshStreamKind) -> Option<&VertexStream> {
        self.streams.iter().find(|s| s.kind == kind)
    }

    /// Mutable access to the stream of the given kind, if present.
    pub fn vertex_stream_mut(&mut self, kind: MeshStreamKind) -> Option<&mut VertexStream> {
        self.streams.iter_mut().find(|s| s.kind == kind)
    }

    /// Returns the stream of the given kind, allocating a
    /// zero-initialized one on first use.
    pub fn create_vertex_stream(&mut self, kind: MeshStreamKind) -> &mut VertexStream {
        if let Some(at) = self.streams.iter().position(|s| s.kind == kind) {
            return &mut self.streams[at];
        }
        self.streams
            .push(VertexStream::zeroed(kind, self.vertex_count as usize));
        let last = self.streams.len() - 1;
        &mut self.streams[last]
    }

    /// Removes the stream of the given kind. Returns whether one existed.
    pub fn remove_vertex_stream(&mut self, kind: MeshStreamKind) -> bool {
        let before = self.streams.len();
        self.streams.retain(|s| s.kind != kind);
        self.streams.len() != before
    }

    /// Whether the chunk carries vertex normals.
    pub fn has_normals(&self) -> bool {
        self.has_vertex_stream(MeshStreamKind::Normal)
    }

    /// Whether the chunk carries a full tangent space.
    pub fn has_tangents(&self) -> bool {
        self.has_vertex_stream(MeshStreamKind::Tangent)
            && self.has_vertex_stream(MeshStreamKind::Binormal)
    }

    /// Strips vertex normals.
    pub fn remove_normals(&mut self) {
        self.remove_vertex_stream(MeshStreamKind::Normal);
    }

    /// Strips tangents and bitangents.
    pub fn remove_tangent_space(&mut self) {
        self.remove_vertex_stream(MeshStreamKind::Tangent);
        self.remove_vertex_stream(MeshStreamKind::Binormal);
    }

    /// Expands the implicit topology into an explicit triangle-list
    /// index buffer. Quads split as (0,1,2),(0,2,3).
    pub fn build_triangle_list_index_buffer(&self) -> Vec<u32> {
        debug_assert_eq!(self.vertex_count % self.vertices_per_face(), 0);
        if self.quads {
            let mut indices = Vec::with_capacity(self.face_count as usize * 6);
            for face in 0..self.face_count {
                let base = face * 4;
                indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
            }
            indices
        } else {
            (0..self.vertex_count).collect()
        }
    }

    /// Computes per-face flat normals and broadcasts each face normal to
    /// every vertex of its face, replacing any existing normal stream.
    ///
    /// The face normal comes from the first three positions of the face,
    /// negated to match the engine's winding convention.
    pub fn compute_flat_normals(&mut self) {
        let Some(positions) = self.vertex_stream(MeshStreamKind::Position) else {
            return;
        };
        let positions = positions.as_vec3();
        let vpf = self.vertices_per_face() as usize;

        let mut normals = vec![[0.0f32; 3]; positions.len()];
        for (face, chunk) in positions.chunks_exact(vpf).enumerate() {
            let a = Vec3::from(chunk[0]);
            let b = Vec3::from(chunk[1]);
            let c = Vec3::from(chunk[2]);
            let n = (b - a)
                .cross(&(c - a))
                .try_normalize(1.0e-12)
                .map(|n| -n)
                .unwrap_or_else(Vec3::zeros);
            for vert in 0..vpf {
                normals[face * vpf + vert] = n.into();
            }
        }

        let stream = self.create_vertex_stream(MeshStreamKind::Normal);
        stream.as_vec3_mut().copy_from_slice(&normals);
    }

    /// Generates the tangent space through the given generator.
    ///
    /// Requires texture coordinates: without a TexCoord0 stream the call
    /// is a silent skip, detectable via [`has_tangents`](Self::has_tangents).
    /// Returns whether tangents were written.
    pub fn compute_tangent_space(
        &mut self,
        generator: &dyn TangentGenerator,
        angular_threshold_deg: f32,
    ) -> bool {
        let (Some(positions), Some(normals), Some(uvs)) = (
            self.vertex_stream(MeshStreamKind::Position),
            self.vertex_stream(MeshStreamKind::Normal),
            self.vertex_stream(MeshStreamKind::TexCoord0),
        ) else {
            log::debug!(
                "skipping tangent generation for material {}: missing position/normal/uv data",
                self.material_index
            );
            return false;
        };

        let mut mesh = ChunkTangentMesh {
            verts_per_face: self.vertices_per_face() as usize,
            positions: positions.as_vec3().to_vec(),
            normals: normals.as_vec3().to_vec(),
            uvs: uvs.as_vec2().to_vec(),
            tangents: vec![[0.0f32; 3]; self.vertex_count as usize],
            bitangents: vec![[0.0f32; 3]; self.vertex_count as usize],
        };
        if !generator.generate(&mut mesh, angular_threshold_deg) {
            log::warn!(
                "tangent generation failed for material {}",
                self.material_index
            );
            return false;
        }

        self.create_vertex_stream(MeshStreamKind::Tangent)
            .as_vec3_mut()
            .copy_from_slice(&mesh.tangents);
        self.create_vertex_stream(MeshStreamKind::Binormal)
            .as_vec3_mut()
            .copy_from_slice(&mesh.bitangents);
        true
    }

    /// Negates every vector of a 3-component stream, if present.
    pub fn flip_stream(&mut self, kind: MeshStreamKind) {
        if let Some(stream) = self.vertex_stream_mut(kind) {
            for v in stream.as_vec3_mut() {
                v[0] = -v[0];
                v[1] = -v[1];
                v[2] = -v[2];
            }
        }
    }

    fn compute_position_bounds(&self) -> Aabb {
        let mut bounds = Aabb::empty();
        if let Some(positions) = self.vertex_stream(MeshStreamKind::Position) {
            for p in positions.as_vec3() {
                bounds.merge_point(Vec3::from(*p));
            }
        }
        bounds
    }
}

/// Geometry adapter driving a [`TangentGenerator`] over one chunk's
/// flat face-vertex layout.
struct ChunkTangentMesh {
    verts_per_face: usize,
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    uvs: Vec<[f32; 2]>,
    tangents: Vec<[f32; 3]>,
    bitangents: Vec<[f32; 3]>,
}

impl TangentSpaceMesh for ChunkTangentMesh {
    fn face_count(&self) -> usize {
        self.positions.len() / self.verts_per_face
    }

    fn vertices_per_face(&self) -> usize {
        self.verts_per_face
    }

    fn position(&self, face: usize, vert: usize) -> [f32; 3] {
        self.positions[face * self.verts_per_face + vert]
    }

    fn normal(&self, face: usize, vert: usize) -> [f32; 3] {
        self.normals[face * self.verts_per_face + vert]
    }

    fn tex_coord(&self, face: usize, vert: usize) -> [f32; 2] {
        self.uvs[face * self.verts_per_face + vert]
    }

    fn set_tangent(&mut self, face: usize, vert: usize, tangent: [f32; 3]) {
        self.tangents[face * self.verts_per_face + vert] = tangent;
    }

    fn set_bitangent(&mut self, face: usize, vert: usize, bitangent: [f32; 3]) {
        self.bitangents[face * self.verts_per_face + vert] = bitangent;
    }
}

/// All import chunks extracted from one source mesh, plus their merged
/// bounding box.
#[derive(Debug, Default)]
pub struct ImportChunkRegistry {
    /// Extracted chunks, in source order.
    pub chunks: Vec<ImportChunk>,
    /// Union of all chunk bounds.
    pub bounds: Aabb,
}

impl ImportChunkRegistry {
    /// Extracts import chunks from the source geometry groups.
    pub fn from_source(source_chunks: &[SourceChunk]) -> Self {
        let mut registry = Self::default();
        for source in source_chunks {
            let chunk = ImportChunk::from_source(source);
            registry.bounds.merge(&chunk.bounds);
            registry.chunks.push(chunk);
        }
        log::debug!("extracted {} import chunks", registry.chunks.len());
        registry
    }
}

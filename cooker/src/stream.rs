//! Per-vertex attribute streams.
//!
//! A source chunk stores its vertex data as a set of independent,
//! tightly packed streams (one per attribute kind) in the flat
//! per-face-vertex order: vertex `i` belongs to face
//! `i / vertices_per_face`. No index buffer exists at this level; the
//! topology is implicit.

/// Kind of a per-vertex attribute stream.
///
/// The element layout of each kind is fixed globally by
/// [`stride()`](Self::stride); a chunk owns zero or one stream per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshStreamKind {
    /// Vertex position, 3 x f32.
    Position,
    /// Vertex normal, 3 x f32.
    Normal,
    /// Vertex tangent, 3 x f32.
    Tangent,
    /// Vertex bitangent, 3 x f32.
    Binormal,
    /// Texture coordinates set 0, 2 x f32.
    TexCoord0,
    /// Texture coordinates set 1, 2 x f32.
    TexCoord1,
    /// Texture coordinates set 2, 2 x f32.
    TexCoord2,
    /// Texture coordinates set 3, 2 x f32.
    TexCoord3,
    /// Vertex color set 0, 4 x u8 (RGBA).
    Color0,
    /// Vertex color set 1, 4 x u8 (RGBA).
    Color1,
    /// Vertex color set 2, 4 x u8 (RGBA).
    Color2,
    /// Vertex color set 3, 4 x u8 (RGBA).
    Color3,
    /// Skinning bone indices, 4 x u8.
    SkinIndices,
    /// Extended skinning bone indices, 4 x u8.
    SkinIndicesEx,
    /// Skinning bone weights, 4 x f32.
    SkinWeights,
    /// Extended skinning bone weights, 4 x f32.
    SkinWeightsEx,
}

impl MeshStreamKind {
    /// Size in bytes of one element of this stream kind.
    pub fn stride(&self) -> usize {
        match self {
            Self::Position | Self::Normal | Self::Tangent | Self::Binormal => 12,
            Self::TexCoord0 | Self::TexCoord1 | Self::TexCoord2 | Self::TexCoord3 => 8,
            Self::Color0 | Self::Color1 | Self::Color2 | Self::Color3 => 4,
            Self::SkinIndices | Self::SkinIndicesEx => 4,
            Self::SkinWeights | Self::SkinWeightsEx => 16,
        }
    }
}

/// One tightly packed per-vertex attribute stream.
///
/// Invariant: `data.len() == vertex_count * kind.stride()` for the
/// owning chunk's vertex count. Enforced at construction; the typed
/// views below rely on it.
#[derive(Debug, Clone)]
pub struct VertexStream {
    /// Attribute kind stored in this stream.
    pub kind: MeshStreamKind,
    /// Raw element data, `vertex_count` elements of `kind.stride()` bytes.
    pub data: Vec<u8>,
}

impl VertexStream {
    /// Creates a stream from existing element data.
    ///
    /// Panics if `data` is not a whole number of `vertex_count` elements.
    pub fn from_data(kind: MeshStreamKind, vertex_count: usize, data: Vec<u8>) -> Self {
        assert_eq!(
            data.len(),
            vertex_count * kind.stride(),
            "stream data size does not match vertex count for {kind:?}"
        );
        Self { kind, data }
    }

    /// Creates a zero-initialized stream sized for `vertex_count` elements.
    pub fn zeroed(kind: MeshStreamKind, vertex_count: usize) -> Self {
        Self {
            kind,
            data: vec![0u8; vertex_count * kind.stride()],
        }
    }

    /// Number of elements in the stream.
    pub fn len(&self) -> usize {
        self.data.len() / self.kind.stride()
    }

    /// Returns whether the stream holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Typed view for 12-byte (3 x f32) stream kinds.
    ///
    /// Panics if the stream kind has a different element size.
    pub fn as_vec3(&self) -> &[[f32; 3]] {
        assert_eq!(self.kind.stride(), 12);
        bytemuck::cast_slice(&self.data)
    }

    /// Mutable typed view for 12-byte (3 x f32) stream kinds.
    pub fn as_vec3_mut(&mut self) -> &mut [[f32; 3]] {
        assert_eq!(self.kind.stride(), 12);
        bytemuck::cast_slice_mut(&mut self.data)
    }

    /// Typed view for 8-byte (2 x f32) stream kinds.
    pub fn as_vec2(&self) -> &[[f32; 2]] {
        assert_eq!(self.kind.stride(), 8);
        bytemuck::cast_slice(&self.data)
    }

    /// Typed view for 16-byte (4 x f32) stream kinds.
    pub fn as_vec4(&self) -> &[[f32; 4]] {
        assert_eq!(self.kind.stride(), 16);
        bytemuck::cast_slice(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(MeshStreamKind::Position, 12)]
    #[case(MeshStreamKind::Normal, 12)]
    #[case(MeshStreamKind::Tangent, 12)]
    #[case(MeshStreamKind::Binormal, 12)]
    #[case(MeshStreamKind::TexCoord0, 8)]
    #[case(MeshStreamKind::TexCoord3, 8)]
    #[case(MeshStreamKind::Color0, 4)]
    #[case(MeshStreamKind::SkinIndices, 4)]
    #[case(MeshStreamKind::SkinWeights, 16)]
    fn stream_strides(#[case] kind: MeshStreamKind, #[case] stride: usize) {
        assert_eq!(kind.stride(), stride);
    }

    #[test]
    fn zeroed_stream_matches_vertex_count() {
        let stream = VertexStream::zeroed(MeshStreamKind::Position, 7);
        assert_eq!(stream.len(), 7);
        assert_eq!(stream.data.len(), 7 * 12);
        assert!(stream.as_vec3().iter().all(|v| *v == [0.0, 0.0, 0.0]));
    }

    #[test]
    fn typed_views_round_trip() {
        let mut stream = VertexStream::zeroed(MeshStreamKind::Normal, 2);
        stream.as_vec3_mut()[1] = [0.0, 0.0, 1.0];
        assert_eq!(stream.as_vec3()[0], [0.0, 0.0, 0.0]);
        assert_eq!(stream.as_vec3()[1], [0.0, 0.0, 1.0]);
    }

    #[test]
    #[should_panic(expected = "stream data size")]
    fn from_data_checks_size() {
        let _ = VertexStream::from_data(MeshStreamKind::Position, 2, vec![0u8; 13]);
    }
}

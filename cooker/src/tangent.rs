//! Tangent-space generation boundary.
//!
//! The pipeline drives an external per-face tangent generator through
//! [`TangentSpaceMesh`], which exposes geometry in the flat
//! `face * vertices_per_face + vertex` layout the import chunks use.
//! The default backend is the MikkTSpace algorithm.

/// Geometry access for tangent generation over the flat per-face-vertex
/// layout. No index buffer exists at this stage.
pub trait TangentSpaceMesh {
    /// Number of faces.
    fn face_count(&self) -> usize;
    /// Vertices per face (3 for triangles, 4 for quads).
    fn vertices_per_face(&self) -> usize;
    /// Position of a face vertex.
    fn position(&self, face: usize, vert: usize) -> [f32; 3];
    /// Normal of a face vertex.
    fn normal(&self, face: usize, vert: usize) -> [f32; 3];
    /// First texture coordinate set of a face vertex.
    fn tex_coord(&self, face: usize, vert: usize) -> [f32; 2];
    /// Stores the generated tangent for a face vertex.
    fn set_tangent(&mut self, face: usize, vert: usize, tangent: [f32; 3]);
    /// Stores the generated bitangent for a face vertex.
    fn set_bitangent(&mut self, face: usize, vert: usize, bitangent: [f32; 3]);
}

/// A tangent-space generation algorithm.
pub trait TangentGenerator: Send + Sync {
    /// Fills the tangent/bitangent slots of `mesh`.
    ///
    /// `angular_threshold_deg` is the crease angle above which tangent
    /// bases must not be smoothed across faces; backends without that
    /// control accept and ignore it. Returns `false` if the geometry
    /// could not be processed (the mesh is left partially written).
    fn generate(&self, mesh: &mut dyn TangentSpaceMesh, angular_threshold_deg: f32) -> bool;
}

/// [`TangentGenerator`] backed by the MikkTSpace algorithm.
///
/// This backend has no crease-angle control; the threshold argument is
/// accepted for interface compatibility and ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct MikkTangentGenerator;

impl TangentGenerator for MikkTangentGenerator {
    fn generate(&self, mesh: &mut dyn TangentSpaceMesh, _angular_threshold_deg: f32) -> bool {
        let mut adapter = MikkAdapter { mesh };
        mikktspace::generate_tangents(&mut adapter)
    }
}

struct MikkAdapter<'a> {
    mesh: &'a mut dyn TangentSpaceMesh,
}

impl mikktspace::Geometry for MikkAdapter<'_> {
    fn num_faces(&self) -> usize {
        self.mesh.face_count()
    }

    fn num_vertices_of_face(&self, _face: usize) -> usize {
        self.mesh.vertices_per_face()
    }

    fn position(&self, face: usize, vert: usize) -> [f32; 3] {
        self.mesh.position(face, vert)
    }

    fn normal(&self, face: usize, vert: usize) -> [f32; 3] {
        self.mesh.normal(face, vert)
    }

    fn tex_coord(&self, face: usize, vert: usize) -> [f32; 2] {
        self.mesh.tex_coord(face, vert)
    }

    fn set_tangent(
        &mut self,
        tangent: [f32; 3],
        bi_tangent: [f32; 3],
        _f_mag_s: f32,
        _f_mag_t: f32,
        _bi_tangent_preserves_orientation: bool,
        face: usize,
        vert: usize,
    ) {
        self.mesh.set_tangent(face, vert, tangent);
        self.mesh.set_bitangent(face, vert, bi_tangent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PlaneMesh {
        positions: Vec<[f32; 3]>,
        uvs: Vec<[f32; 2]>,
        tangents: Vec<[f32; 3]>,
        bitangents: Vec<[f32; 3]>,
    }

    impl PlaneMesh {
        fn unit_triangle() -> Self {
            Self {
                positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                uvs: vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
                tangents: vec![[0.0; 3]; 3],
                bitangents: vec![[0.0; 3]; 3],
            }
        }
    }

    impl TangentSpaceMesh for PlaneMesh {
        fn face_count(&self) -> usize {
            self.positions.len() / 3
        }

        fn vertices_per_face(&self) -> usize {
            3
        }

        fn position(&self, face: usize, vert: usize) -> [f32; 3] {
            self.positions[face * 3 + vert]
        }

        fn normal(&self, _face: usize, _vert: usize) -> [f32; 3] {
            [0.0, 0.0, 1.0]
        }

        fn tex_coord(&self, face: usize, vert: usize) -> [f32; 2] {
            self.uvs[face * 3 + vert]
        }

        fn set_tangent(&mut self, face: usize, vert: usize, tangent: [f32; 3]) {
            self.tangents[face * 3 + vert] = tangent;
        }

        fn set_bitangent(&mut self, face: usize, vert: usize, bitangent: [f32; 3]) {
            self.bitangents[face * 3 + vert] = bitangent;
        }
    }

    #[test]
    fn tangents_of_an_axis_aligned_triangle_follow_u() {
        let mut mesh = PlaneMesh::unit_triangle();
        assert!(MikkTangentGenerator.generate(&mut mesh, 45.0));

        for t in &mesh.tangents {
            assert!((t[0] - 1.0).abs() < 1e-3, "tangent {t:?}");
            assert!(t[1].abs() < 1e-3 && t[2].abs() < 1e-3, "tangent {t:?}");
        }
        for b in &mesh.bitangents {
            assert!(b[1].abs() > 0.99, "bitangent {b:?}");
        }
    }
}

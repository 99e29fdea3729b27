//! Vertex buffer deduplication and GPU-oriented reordering.
//!
//! Three independent post-merge passes over a packed buffer pair:
//! bit-exact vertex deduplication, greedy transform-cache index
//! reordering, and vertex fetch-locality reordering. The reorderings
//! are behind traits so alternative heuristics can be swapped in.

use std::collections::HashMap;

/// Computes an old-to-new remap collapsing bit-identical vertex records.
///
/// Returns the remap table (one entry per input vertex) and the number
/// of distinct records. Distinct records keep their first-occurrence
/// order, so running this on an already-deduplicated buffer yields the
/// identity remap.
pub fn generate_vertex_remap(vertices: &[u8], vertex_size: usize) -> (Vec<u32>, u32) {
    assert!(vertex_size > 0);
    assert_eq!(vertices.len() % vertex_size, 0, "vertex size mismatch");

    let count = vertices.len() / vertex_size;
    let mut table: HashMap<&[u8], u32> = HashMap::with_capacity(count);
    let mut remap = vec![0u32; count];
    let mut unique = 0u32;
    for (i, slot) in remap.iter_mut().enumerate() {
        let record = &vertices[i * vertex_size..(i + 1) * vertex_size];
        *slot = *table.entry(record).or_insert_with(|| {
            let id = unique;
            unique += 1;
            id
        });
    }
    (remap, unique)
}

/// Rewrites a vertex buffer to `unique_count` records using a remap
/// from [`generate_vertex_remap`].
pub fn remap_vertex_buffer(
    vertices: &[u8],
    vertex_size: usize,
    remap: &[u32],
    unique_count: u32,
) -> Vec<u8> {
    let mut out = vec![0u8; unique_count as usize * vertex_size];
    for (old, &new) in remap.iter().enumerate() {
        let src = old * vertex_size;
        let dst = new as usize * vertex_size;
        out[dst..dst + vertex_size].copy_from_slice(&vertices[src..src + vertex_size]);
    }
    out
}

/// Rewrites every index through a remap table in place.
pub fn remap_index_buffer(indices: &mut [u32], remap: &[u32]) {
    for index in indices.iter_mut() {
        *index = remap[*index as usize];
    }
}

/// Reorders a triangle-list index buffer to maximize reuse of a small
/// GPU transform-cache window. Triangles are permuted; the vertices
/// within each triangle are untouched.
pub trait VertexCacheOptimizer: Send + Sync {
    /// Reorders `indices` in place. `vertex_count` bounds the index range.
    fn optimize(&self, indices: &mut [u32], vertex_count: u32);
}

/// Reorders a vertex buffer so vertices referenced near each other in
/// the index stream are stored near each other in memory, rewriting the
/// indices to match.
pub trait VertexFetchOptimizer: Send + Sync {
    /// Reorders `vertices` (records of `vertex_size` bytes) and rewrites
    /// `indices` accordingly.
    fn optimize(&self, vertices: &mut Vec<u8>, vertex_size: usize, indices: &mut [u32]);
}

const LAST_TRI_SCORE: f32 = 0.75;
const CACHE_DECAY_POWER: f32 = 1.5;
const VALENCE_BOOST_SCALE: f32 = 2.0;
const VALENCE_BOOST_POWER: f32 = 0.5;

/// Greedy linear-time transform-cache optimizer (Forsyth scoring).
///
/// Simulates an LRU post-transform cache; at every step emits the
/// not-yet-emitted triangle with the highest summed vertex score, where
/// a vertex scores high when it sits near the front of the simulated
/// cache or has few remaining triangles.
#[derive(Debug, Clone, Copy)]
pub struct ForsythCacheOptimizer {
    cache_size: usize,
}

impl ForsythCacheOptimizer {
    /// Creates an optimizer simulating a cache of `cache_size` entries.
    pub fn new(cache_size: usize) -> Self {
        assert!(cache_size > 3);
        Self { cache_size }
    }

    fn vertex_score(&self, cache_position: i32, remaining_tris: u32) -> f32 {
        if remaining_tris == 0 {
            return -1.0;
        }
        let mut score = 0.0;
        if cache_position >= 0 {
            if cache_position < 3 {
                // the three most recent vertices score equally, so the
                // optimizer does not keep chewing on one fan forever
                score = LAST_TRI_SCORE;
            } else {
                let scale = 1.0 / (self.cache_size - 3) as f32;
                score = (1.0 - (cache_position - 3) as f32 * scale).powf(CACHE_DECAY_POWER);
            }
        }
        score + VALENCE_BOOST_SCALE * (remaining_tris as f32).powf(-VALENCE_BOOST_POWER)
    }
}

impl Default for ForsythCacheOptimizer {
    fn default() -> Self {
        Self::new(32)
    }
}

impl VertexCacheOptimizer for ForsythCacheOptimizer {
    fn optimize(&self, indices: &mut [u32], vertex_count: u32) {
        assert_eq!(indices.len() % 3, 0, "index count not divisible by 3");
        let tri_count = indices.len() / 3;
        let vertex_count = vertex_count as usize;
        if tri_count < 2 {
            return;
        }

        // per-vertex triangle adjacency, CSR layout
        let mut valence = vec![0u32; vertex_count];
        for &i in indices.iter() {
            valence[i as usize] += 1;
        }
        let mut offsets = vec![0usize; vertex_count + 1];
        for v in 0..vertex_count {
            offsets[v + 1] = offsets[v] + valence[v] as usize;
        }
        let mut adjacency = vec![0u32; indices.len()];
        let mut fill: Vec<usize> = offsets[..vertex_count].to_vec();
        for (t, tri) in indices.chunks_exact(3).enumerate() {
            for &v in tri {
                adjacency[fill[v as usize]] = t as u32;
                fill[v as usize] += 1;
            }
        }

        let mut live = valence;
        let mut cache_position = vec![-1i32; vertex_count];
        let mut vertex_scores = vec![0f32; vertex_count];
        for v in 0..vertex_count {
            vertex_scores[v] = self.vertex_score(-1, live[v]);
        }
        let mut tri_scores = vec![0f32; tri_count];
        let mut best_tri = 0usize;
        let mut best_score = f32::MIN;
        for (t, tri) in indices.chunks_exact(3).enumerate() {
            let score: f32 = tri.iter().map(|&v| vertex_scores[v as usize]).sum();
            tri_scores[t] = score;
            if score > best_score {
                best_score = score;
                best_tri = t;
            }
        }

        let mut emitted = vec![false; tri_count];
        let mut cache: Vec<u32> = Vec::with_capacity(self.cache_size + 3);
        let mut output: Vec<u32> = Vec::with_capacity(indices.len());
        let mut cursor = 0usize;
        let mut have_best = true;

        while output.len() < indices.len() {
            let t = if have_best {
                best_tri
            } else {
                // score updates found no candidate: scan forward for any
                // remaining triangle (disconnected component)
                while cursor < tri_count && emitted[cursor] {
                    cursor += 1;
                }
                cursor
            };

            emitted[t] = true;
            let tri = [indices[t * 3], indices[t * 3 + 1], indices[t * 3 + 2]];
            output.extend_from_slice(&tri);

            let mut evicted: Vec<u32> = Vec::new();
            for &v in &tri {
                let v = v as usize;
                // drop this triangle from the vertex's live adjacency span
                let span = &mut adjacency[offsets[v]..offsets[v] + live[v] as usize];
                if let Some(at) = span.iter().position(|&x| x == t as u32) {
                    let last = span.len() - 1;
                    span.swap(at, last);
                }
                live[v] -= 1;
            }
            for &v in tri.iter().rev() {
                if let Some(at) = cache.iter().position(|&c| c == v) {
                    cache.remove(at);
                }
                cache.insert(0, v);
            }
            while cache.len() > self.cache_size {
                if let Some(v) = cache.pop() {
                    cache_position[v as usize] = -1;
                    evicted.push(v);
                }
            }
            for (at, &v) in cache.iter().enumerate() {
                cache_position[v as usize] = at as i32;
            }

            // rescore touched vertices and their remaining triangles
            have_best = false;
            best_score = f32::MIN;
            for &v in cache.iter().chain(evicted.iter()) {
                let v = v as usize;
                let score = self.vertex_score(cache_position[v], live[v]);
                let diff = score - vertex_scores[v];
                vertex_scores[v] = score;
                for &t2 in &adjacency[offsets[v]..offsets[v] + live[v] as usize] {
                    let t2 = t2 as usize;
                    tri_scores[t2] += diff;
                    if !emitted[t2] && tri_scores[t2] > best_score {
                        best_score = tri_scores[t2];
                        best_tri = t2;
                        have_best = true;
                    }
                }
            }
        }

        indices.copy_from_slice(&output);
    }
}

/// Fetch optimizer that stores vertices in first-use order of the index
/// stream. Unreferenced vertices are appended after the referenced ones.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinearFetchOptimizer;

impl VertexFetchOptimizer for LinearFetchOptimizer {
    fn optimize(&self, vertices: &mut Vec<u8>, vertex_size: usize, indices: &mut [u32]) {
        assert!(vertex_size > 0);
        assert_eq!(vertices.len() % vertex_size, 0, "vertex size mismatch");
        let vertex_count = vertices.len() / vertex_size;

        const UNSEEN: u32 = u32::MAX;
        let mut remap = vec![UNSEEN; vertex_count];
        let mut next = 0u32;
        for &i in indices.iter() {
            let slot = &mut remap[i as usize];
            if *slot == UNSEEN {
                *slot = next;
                next += 1;
            }
        }
        for slot in remap.iter_mut() {
            if *slot == UNSEEN {
                *slot = next;
                next += 1;
            }
        }

        *vertices = remap_vertex_buffer(vertices, vertex_size, &remap, vertex_count as u32);
        remap_index_buffer(indices, &remap);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 4-byte records: vertex i carries its id, duplicates share bytes
    fn vertex_buffer(ids: &[u32]) -> Vec<u8> {
        ids.iter().flat_map(|id| id.to_ne_bytes()).collect()
    }

    fn gather_triangles(vertices: &[u8], vertex_size: usize, indices: &[u32]) -> Vec<Vec<Vec<u8>>> {
        indices
            .chunks_exact(3)
            .map(|tri| {
                tri.iter()
                    .map(|&i| {
                        let at = i as usize * vertex_size;
                        vertices[at..at + vertex_size].to_vec()
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn dedup_collapses_identical_records() {
        let vertices = vertex_buffer(&[7, 8, 7, 9, 8]);
        let (remap, unique) = generate_vertex_remap(&vertices, 4);
        assert_eq!(unique, 3);
        assert_eq!(remap, vec![0, 1, 0, 2, 1]);

        let packed = remap_vertex_buffer(&vertices, 4, &remap, unique);
        assert_eq!(packed, vertex_buffer(&[7, 8, 9]));
    }

    #[test]
    fn dedup_is_idempotent() {
        let vertices = vertex_buffer(&[5, 5, 6, 5]);
        let (remap, unique) = generate_vertex_remap(&vertices, 4);
        let packed = remap_vertex_buffer(&vertices, 4, &remap, unique);

        let (remap2, unique2) = generate_vertex_remap(&packed, 4);
        assert_eq!(unique2, unique);
        assert_eq!(remap2, (0..unique).collect::<Vec<_>>());
    }

    #[test]
    fn index_remap_follows_vertex_remap() {
        let vertices = vertex_buffer(&[1, 2, 1, 3]);
        let (remap, unique) = generate_vertex_remap(&vertices, 4);
        let mut indices = vec![0, 1, 2, 2, 1, 3];
        remap_index_buffer(&mut indices, &remap);
        assert!(indices.iter().all(|&i| i < unique));
        assert_eq!(indices, vec![0, 1, 0, 0, 1, 2]);
    }

    #[test]
    fn cache_optimizer_preserves_triangles() {
        // two fans sharing vertex 0, deliberately interleaved badly
        let original: Vec<u32> = vec![0, 1, 2, 5, 6, 7, 0, 2, 3, 6, 7, 8, 0, 3, 4, 5, 7, 6];
        let vertices = vertex_buffer(&[10, 11, 12, 13, 14, 15, 16, 17, 18]);
        let mut indices = original.clone();
        ForsythCacheOptimizer::default().optimize(&mut indices, 9);

        assert_eq!(indices.len(), original.len());
        let mut before = gather_triangles(&vertices, 4, &original);
        let mut after = gather_triangles(&vertices, 4, &indices);
        before.sort();
        after.sort();
        assert_eq!(before, after);
    }

    #[test]
    fn cache_optimizer_handles_disconnected_components() {
        let original: Vec<u32> = vec![0, 1, 2, 3, 4, 5, 6, 7, 8];
        let mut indices = original.clone();
        ForsythCacheOptimizer::default().optimize(&mut indices, 9);

        let mut before: Vec<_> = original.chunks_exact(3).collect();
        let mut after: Vec<_> = indices.chunks_exact(3).collect();
        before.sort();
        after.sort();
        assert_eq!(before, after);
    }

    #[test]
    fn fetch_optimizer_orders_vertices_by_first_use() {
        let mut vertices = vertex_buffer(&[100, 101, 102, 103, 104]);
        let mut indices = vec![3, 1, 4, 3, 4, 0];
        let expected = gather_triangles(&vertices, 4, &indices);

        LinearFetchOptimizer.optimize(&mut vertices, 4, &mut indices);

        // first-use order: 3, 1, 4, 0; unreferenced 2 goes last
        assert_eq!(vertices, vertex_buffer(&[103, 101, 104, 100, 102]));
        assert_eq!(indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(gather_triangles(&vertices, 4, &indices), expected);
    }

    #[test]
    fn fetch_optimizer_keeps_vertex_count() {
        let mut vertices = vertex_buffer(&[1, 2, 3, 4]);
        let mut indices = vec![2, 1, 0];
        LinearFetchOptimizer.optimize(&mut vertices, 4, &mut indices);
        assert_eq!(vertices.len(), 16);
        assert!(indices.iter().all(|&i| i < 4));
    }
}

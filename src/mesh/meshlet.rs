//! Greedy meshlet clustering: `generate_meshlets` packs a mesh's triangles
//! into small, boundable clusters ("meshlets") suitable for coarse culling.
//!
//! Grounded in the meshlet/cluster shape used by
//! `other_examples/.../nanite_preprocess.rs` (vertex list + triangle index
//! list + bounding volume per cluster). Triangles are consumed in mesh
//! order, and within a meshlet vertices/triangles keep their insertion
//! order — an observable property the tests below rely on.

use crate::math::V3;

use super::mesh::Mesh;

/// Default maximum vertices referenced by one meshlet.
pub const DEFAULT_V_MAX: usize = 64;
/// Default maximum triangles packed into one meshlet.
pub const DEFAULT_T_MAX: usize = 126;

/// A small cluster of triangles with a bounding sphere, used for coarse
/// culling ahead of per-triangle work.
#[derive(Debug, Clone, PartialEq)]
pub struct Meshlet {
    /// Indices into the source mesh's vertex array, in first-referenced
    /// order.
    pub vertex_indices: Vec<u32>,
    /// Indices into the source mesh's triangle array, in insertion order.
    pub triangle_indices: Vec<u32>,
    /// Arithmetic mean of the positions of `vertex_indices`.
    pub bounds_center: V3,
    /// Max Euclidean distance from `bounds_center` to any referenced
    /// vertex.
    pub bounds_radius: f32,
}

/// Greedily packs `mesh`'s triangles into meshlets no larger than `v_max`
/// vertices / `t_max` triangles each.
///
/// `v_max` is clamped to a minimum of 3 (a meshlet can't hold less than one
/// triangle's worth of vertices); `t_max` is clamped to a minimum of 1.
/// Triangles are consumed in mesh order; a triangle that would overflow the
/// current meshlet flushes it (emitting a completed [`Meshlet`]) and starts
/// a fresh one. An empty mesh yields an empty meshlet list.
pub fn generate_meshlets(mesh: &Mesh, v_max: usize, t_max: usize) -> Vec<Meshlet> {
    let v_max = v_max.max(3);
    let t_max = t_max.max(1);

    let mut meshlets = Vec::new();
    let mut current = Builder::default();

    for (tri_index, tri) in mesh.triangles().iter().enumerate() {
        let indices = tri.indices();
        let added = indices
            .iter()
            .filter(|&&v| !current.vertex_membership.contains(&v))
            .count();

        if (current.vertex_indices.len() + added > v_max || current.triangle_indices.len() >= t_max)
            && !current.triangle_indices.is_empty()
        {
            meshlets.push(current.flush(mesh.vertices()));
            current = Builder::default();
        }

        for v in indices {
            if current.vertex_membership.insert(v) {
                current.vertex_indices.push(v);
            }
        }
        current.triangle_indices.push(tri_index as u32);
    }

    if !current.triangle_indices.is_empty() {
        meshlets.push(current.flush(mesh.vertices()));
    }

    meshlets
}

/// Accumulator for the meshlet currently being packed.
#[derive(Default)]
struct Builder {
    vertex_indices: Vec<u32>,
    triangle_indices: Vec<u32>,
    vertex_membership: std::collections::HashSet<u32>,
}

impl Builder {
    /// Computes bounds and emits the accumulated triangles as a [`Meshlet`].
    fn flush(self, vertices: &[V3]) -> Meshlet {
        let mut center = V3::ZERO;
        for &v in &self.vertex_indices {
            center += vertices[v as usize];
        }
        let center = center * (1.0 / self.vertex_indices.len() as f32);

        let radius = self
            .vertex_indices
            .iter()
            .map(|&v| (vertices[v as usize] - center).length())
            .fold(0.0_f32, f32::max);

        Meshlet {
            vertex_indices: self.vertex_indices,
            triangle_indices: self.triangle_indices,
            bounds_center: center,
            bounds_radius: radius,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::mesh::Triangle;
    use crate::math::V2;

    /// A fan of `n` triangles all sharing vertex 0, each introducing exactly
    /// one new vertex. Useful for forcing deterministic flush points.
    fn fan_mesh(n: usize) -> Mesh {
        let mut vertices = vec![V3::new(0.0, 0.0, 0.0)];
        let mut triangles = Vec::new();
        for i in 0..n {
            vertices.push(V3::new(i as f32 + 1.0, 0.0, 0.0));
            vertices.push(V3::new(i as f32 + 1.0, 1.0, 0.0));
            let base = vertices.len() as u32 - 2;
            triangles.push(Triangle::new(0, base, base + 1, 0xFFFFFFFF));
        }
        let tex_coords = vec![V2::ZERO; vertices.len()];
        Mesh::new(vertices, tex_coords, triangles).unwrap()
    }

    #[test]
    fn empty_mesh_yields_no_meshlets() {
        let mesh = Mesh::new(Vec::new(), Vec::new(), Vec::new()).unwrap();
        assert!(generate_meshlets(&mesh, DEFAULT_V_MAX, DEFAULT_T_MAX).is_empty());
    }

    #[test]
    fn budgets_are_clamped() {
        let mesh = fan_mesh(1);
        // v_max < 3 and t_max < 1 both clamp; a single triangle still fits.
        let meshlets = generate_meshlets(&mesh, 0, 0);
        assert_eq!(meshlets.len(), 1);
        assert_eq!(meshlets[0].triangle_indices.len(), 1);
    }

    #[test]
    fn triangle_budget_forces_a_flush() {
        // Each fan triangle adds 2 new vertices (vertex 0 is shared), so with
        // v_max large and t_max=2, every 2 triangles should flush.
        let mesh = fan_mesh(5);
        let meshlets = generate_meshlets(&mesh, 1000, 2);
        assert_eq!(meshlets.len(), 3); // 2 + 2 + 1
        assert_eq!(meshlets[0].triangle_indices, vec![0, 1]);
        assert_eq!(meshlets[1].triangle_indices, vec![2, 3]);
        assert_eq!(meshlets[2].triangle_indices, vec![4]);
    }

    #[test]
    fn every_triangle_appears_in_exactly_one_meshlet() {
        let mesh = fan_mesh(400);
        let meshlets = generate_meshlets(&mesh, 64, 126);
        let mut seen = vec![false; mesh.triangles().len()];
        for meshlet in &meshlets {
            assert!(meshlet.vertex_indices.len() <= 64);
            assert!(meshlet.triangle_indices.len() <= 126);
            for &t in &meshlet.triangle_indices {
                assert!(!seen[t as usize], "triangle {t} appeared twice");
                seen[t as usize] = true;
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn bounds_contain_every_referenced_vertex() {
        let mesh = fan_mesh(400);
        let meshlets = generate_meshlets(&mesh, 64, 126);
        for meshlet in &meshlets {
            let eps = 1e-5 * meshlet.bounds_radius.max(1.0);
            for &v in &meshlet.vertex_indices {
                let dist = (mesh.vertices()[v as usize] - meshlet.bounds_center).length();
                assert!(dist <= meshlet.bounds_radius + eps);
            }
        }
    }

    #[test]
    fn insertion_order_is_mesh_order() {
        let mesh = fan_mesh(10);
        let meshlets = generate_meshlets(&mesh, 64, 126);
        assert_eq!(meshlets.len(), 1);
        assert_eq!(meshlets[0].triangle_indices, (0..10).collect::<Vec<u32>>());
        // Vertex 0 is first (shared apex), followed by each fan edge pair.
        assert_eq!(meshlets[0].vertex_indices[0], 0);
    }
}

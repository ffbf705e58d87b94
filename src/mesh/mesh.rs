//! The triangle mesh data model: vertices, UVs, triangles and their face
//! normals, plus the meshlets clustered from them.
//!
//! Stores parallel vertex/UV arrays plus a triangle record carrying
//! culling flags and a base color, with a parallel face-normal array
//! derived from the geometry itself.

use std::fmt;

use crate::math::V2;
use crate::math::V3;

use super::meshlet::Meshlet;

/// One triangle of a [`Mesh`]: three vertex indices plus the per-face state
/// the rasterizer needs (culling flags, flat base color).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triangle {
    /// Index of the first vertex, into `Mesh::vertices`.
    pub v0: u32,
    /// Index of the second vertex.
    pub v1: u32,
    /// Index of the third vertex.
    pub v2: u32,
    /// If set, the rasterizer's fill pass skips this triangle entirely.
    pub cull_fill: bool,
    /// If set, the rasterizer's wireframe pass skips this triangle's edges.
    pub cull_wire: bool,
    /// Flat base color, `0xAARRGGBB`, used when no texture is bound.
    pub base_color: u32,
}

impl Triangle {
    /// Builds a triangle with culling enabled on neither pass.
    pub fn new(v0: u32, v1: u32, v2: u32, base_color: u32) -> Self {
        Triangle {
            v0,
            v1,
            v2,
            cull_fill: false,
            cull_wire: false,
            base_color,
        }
    }

    /// The three vertex indices as an array, in winding order.
    #[inline(always)]
    pub fn indices(&self) -> [u32; 3] {
        [self.v0, self.v1, self.v2]
    }
}

/// A triangle mesh: object-space vertices, parallel UVs, triangle records,
/// their face normals, and any meshlets built from them.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    vertices: Vec<V3>,
    tex_coords: Vec<V2>,
    triangles: Vec<Triangle>,
    face_normals: Vec<V3>,
    meshlets: Vec<Meshlet>,
}

/// Errors constructing or validating a [`Mesh`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    /// `tex_coords.len() != vertices.len()`.
    TexCoordCountMismatch { vertices: usize, tex_coords: usize },
    /// A triangle referenced a vertex index `>= vertices.len()`.
    VertexIndexOutOfRange { triangle: usize, index: u32 },
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshError::TexCoordCountMismatch { vertices, tex_coords } => write!(
                f,
                "mesh has {vertices} vertices but {tex_coords} tex coords; they must match 1:1"
            ),
            MeshError::VertexIndexOutOfRange { triangle, index } => write!(
                f,
                "triangle {triangle} references vertex index {index}, which is out of range"
            ),
        }
    }
}
impl std::error::Error for MeshError {}

impl Mesh {
    /// Builds a mesh from its vertices, parallel UVs and triangle records,
    /// computing face normals from the geometry itself.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError`] if `tex_coords` isn't parallel to `vertices`, or
    /// if any triangle references an out-of-range vertex index.
    pub fn new(vertices: Vec<V3>, tex_coords: Vec<V2>, triangles: Vec<Triangle>) -> Result<Self, MeshError> {
        if tex_coords.len() != vertices.len() {
            return Err(MeshError::TexCoordCountMismatch {
                vertices: vertices.len(),
                tex_coords: tex_coords.len(),
            });
        }
        for (i, tri) in triangles.iter().enumerate() {
            for index in tri.indices() {
                if index as usize >= vertices.len() {
                    return Err(MeshError::VertexIndexOutOfRange { triangle: i, index });
                }
            }
        }
        let face_normals = compute_face_normals(&vertices, &triangles);
        Ok(Mesh {
            vertices,
            tex_coords,
            triangles,
            face_normals,
            meshlets: Vec::new(),
        })
    }

    /// Recomputes `face_normals` from the current vertices and triangles.
    /// Used both by [`Mesh::new`] and to re-derive normals after vertices
    /// are edited in place.
    pub fn recompute_face_normals(&mut self) {
        self.face_normals = compute_face_normals(&self.vertices, &self.triangles);
    }

    /// The mesh's vertices, in object space.
    pub fn vertices(&self) -> &[V3] {
        &self.vertices
    }

    /// The mesh's UV coordinates, parallel to [`Mesh::vertices`].
    pub fn tex_coords(&self) -> &[V2] {
        &self.tex_coords
    }

    /// The mesh's triangles.
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Face normals, parallel to [`Mesh::triangles`].
    pub fn face_normals(&self) -> &[V3] {
        &self.face_normals
    }

    /// The meshlets currently cached on this mesh (empty until populated by
    /// [`crate::mesh::generate_meshlets`] or a cache load).
    pub fn meshlets(&self) -> &[Meshlet] {
        &self.meshlets
    }

    /// Replaces the mesh's meshlets (used by the orchestrator after a
    /// cache load or a fresh `generate_meshlets` run).
    pub fn set_meshlets(&mut self, meshlets: Vec<Meshlet>) {
        self.meshlets = meshlets;
    }
}

/// Computes one face normal per triangle. Degenerate triangles (zero-area,
/// where the cross product of two edges has near-zero length) get the zero
/// vector rather than a NaN-laced unit vector.
fn compute_face_normals(vertices: &[V3], triangles: &[Triangle]) -> Vec<V3> {
    triangles
        .iter()
        .map(|tri| {
            let a = vertices[tri.v0 as usize];
            let b = vertices[tri.v1 as usize];
            let c = vertices[tri.v2 as usize];
            (b - a).cross(c - a).normalize()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> Mesh {
        let vertices = vec![
            V3::new(0.0, 0.0, 0.0),
            V3::new(1.0, 0.0, 0.0),
            V3::new(0.0, 1.0, 0.0),
        ];
        let tex_coords = vec![V2::ZERO; 3];
        let triangles = vec![Triangle::new(0, 1, 2, 0xFFFFFFFF)];
        Mesh::new(vertices, tex_coords, triangles).unwrap()
    }

    #[test]
    fn face_normal_points_along_z() {
        let mesh = unit_triangle();
        assert_eq!(mesh.face_normals()[0], V3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn degenerate_triangle_gets_zero_normal() {
        let vertices = vec![V3::ZERO, V3::ZERO, V3::ZERO];
        let tex_coords = vec![V2::ZERO; 3];
        let triangles = vec![Triangle::new(0, 1, 2, 0)];
        let mesh = Mesh::new(vertices, tex_coords, triangles).unwrap();
        assert_eq!(mesh.face_normals()[0], V3::ZERO);
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let vertices = vec![V3::ZERO, V3::ZERO];
        let tex_coords = vec![V2::ZERO; 2];
        let triangles = vec![Triangle::new(0, 1, 5, 0)];
        assert!(matches!(
            Mesh::new(vertices, tex_coords, triangles),
            Err(MeshError::VertexIndexOutOfRange { triangle: 0, index: 5 })
        ));
    }

    #[test]
    fn recompute_matches_constructor_within_tolerance() {
        let mut mesh = unit_triangle();
        let before = mesh.face_normals().to_vec();
        mesh.recompute_face_normals();
        for (a, b) in before.iter().zip(mesh.face_normals()) {
            assert!((a.x - b.x).abs() < 1e-5);
            assert!((a.y - b.y).abs() < 1e-5);
            assert!((a.z - b.z).abs() < 1e-5);
        }
    }
}

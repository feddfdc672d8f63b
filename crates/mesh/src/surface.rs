use cgmath::{InnerSpace, Zero};

use crate::geometry::{Face, Triangle, Vector3};
use crate::{IndexedMesh, MeshError};

/// A triangulated surface: vertex positions plus faces indexing into them.
///
/// All surfaces of one experiment are expected to be in correspondence with a
/// common reference, i.e. share vertex count and connectivity. Only the vertex
/// positions differ between samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    vertices: Vec<Vector3>,
    faces: Vec<Face>,
}

impl Surface {
    /// Builds a surface, checking that every face refers to an existing vertex.
    pub fn new(vertices: Vec<Vector3>, faces: Vec<Face>) -> Result<Self, MeshError> {
        let vertex_count = vertices.len();
        for (face, f) in faces.iter().enumerate() {
            if let Some(&index) = f.indices().iter().find(|&&i| i >= vertex_count) {
                return Err(MeshError::FaceIndexOutOfRange {
                    face,
                    index,
                    vertex_count,
                });
            }
        }
        Ok(Self { vertices, faces })
    }

    pub fn vertices(&self) -> &[Vector3] {
        &self.vertices
    }

    pub fn vertices_mut(&mut self) -> &mut [Vector3] {
        &mut self.vertices
    }

    /// Replaces all vertex positions, keeping the connectivity.
    pub fn set_vertices(&mut self, vertices: Vec<Vector3>) -> Result<(), MeshError> {
        if vertices.len() != self.vertices.len() {
            return Err(MeshError::VertexCountMismatch {
                expected: self.vertices.len(),
                actual: vertices.len(),
            });
        }
        self.vertices = vertices;
        Ok(())
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn triangle(&self, face: &Face) -> Triangle {
        Triangle {
            p0: self.vertices[face.p0 as usize],
            p1: self.vertices[face.p1 as usize],
            p2: self.vertices[face.p2 as usize],
        }
    }

    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.faces.iter().map(|f| self.triangle(f))
    }

    /// Two surfaces share topology when they have the same vertex count and the
    /// same face list.
    pub fn same_topology(&self, other: &Surface) -> bool {
        self.vertices.len() == other.vertices.len() && self.faces == other.faces
    }

    pub fn centroid(&self) -> Vector3 {
        if self.vertices.is_empty() {
            return Vector3::zero();
        }
        let sum = self.vertices.iter().fold(Vector3::zero(), |a, v| a + *v);
        sum / self.vertices.len() as f64
    }

    pub fn area(&self) -> f64 {
        self.triangles().map(|t| t.area()).sum()
    }

    /// Root of the summed squared distances of the vertices to the centroid.
    pub fn centroid_size(&self) -> f64 {
        let c = self.centroid();
        self.vertices
            .iter()
            .map(|v| (*v - c).magnitude2())
            .sum::<f64>()
            .sqrt()
    }

    /// Views the vertex positions as `[x0, y0, z0, x1, ...]`.
    pub fn flat_vertices(&self) -> &[f64] {
        // Safety: Vector3 is asserted to have the size and alignment of [f64; 3]
        // (see geometry.rs), so a slice of n vertices is a slice of 3n floats.
        unsafe {
            std::slice::from_raw_parts(
                self.vertices.as_ptr() as *const f64,
                self.vertices.len() * 3,
            )
        }
    }
}

impl IndexedMesh for Surface {
    fn from_parts(vertices: Vec<Vector3>, faces: Vec<Face>) -> Result<Self, MeshError> {
        Surface::new(vertices, faces)
    }

    fn vertices(&self) -> &[Vector3] {
        &self.vertices
    }

    fn faces(&self) -> &[Face] {
        &self.faces
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;

    fn unit_square() -> Surface {
        Surface::new(
            vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(1.0, 1.0, 0.0),
                Vector3::new(0.0, 1.0, 0.0),
            ],
            vec![Face::new(0, 1, 2), Face::new(0, 2, 3)],
        )
        .unwrap()
    }

    #[test]
    fn rejects_out_of_range_face() {
        let err = Surface::new(
            vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0)],
            vec![Face::new(0, 1, 2)],
        )
        .unwrap_err();
        assert_eq!(
            err,
            MeshError::FaceIndexOutOfRange {
                face: 0,
                index: 2,
                vertex_count: 2
            }
        );
    }

    #[test]
    fn square_measures() {
        let s = unit_square();
        assert_float_eq!(s.area(), 1.0, abs <= 1e-12);
        assert_eq!(s.centroid(), Vector3::new(0.5, 0.5, 0.0));
        assert_float_eq!(s.centroid_size(), 2f64.sqrt(), abs <= 1e-12);
    }

    #[test]
    fn flat_vertices_follow_vertex_order() {
        let s = unit_square();
        assert_eq!(
            s.flat_vertices(),
            &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0]
        );
    }

    #[test]
    fn set_vertices_keeps_count() {
        let mut s = unit_square();
        assert!(s.set_vertices(vec![Vector3::zero()]).is_err());
        let moved: Vec<_> = s.vertices().iter().map(|v| *v * 2.0).collect();
        s.set_vertices(moved).unwrap();
        assert_float_eq!(s.area(), 4.0, abs <= 1e-12);
    }

    #[test]
    fn topology_ignores_positions() {
        let a = unit_square();
        let mut b = unit_square();
        b.vertices_mut()[2].z = 5.0;
        assert!(a.same_topology(&b));
        let c = Surface::new(a.vertices().to_vec(), vec![Face::new(0, 1, 2)]).unwrap();
        assert!(!a.same_topology(&c));
    }
}

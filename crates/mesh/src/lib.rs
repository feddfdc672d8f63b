mod geometry;
mod surface;

pub use geometry::*;
pub use surface::*;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum MeshError {
    #[error("face {face} refers to vertex {index} but the mesh has {vertex_count} vertices")]
    FaceIndexOutOfRange {
        face: usize,
        index: usize,
        vertex_count: usize,
    },
    #[error("expected {expected} vertices, got {actual}")]
    VertexCountMismatch { expected: usize, actual: usize },
}

pub trait IndexedMesh: Sized {
    /// Creates a mesh from its vertex positions and triangle faces.
    ///
    /// # Arguments
    ///
    /// * `vertices` - The vertex positions, in file order.
    /// * `faces` - Triangles indexing into `vertices`.
    fn from_parts(vertices: Vec<Vector3>, faces: Vec<Face>) -> Result<Self, MeshError>;

    /// Returns the vertex positions of this mesh.
    fn vertices(&self) -> &[Vector3];

    /// Returns the triangle faces of this mesh.
    fn faces(&self) -> &[Face];
}

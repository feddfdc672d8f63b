pub struct TestModel {
    pub bytes: &'static [u8],
    pub vertex_count: usize,
    pub face_count: usize,
}

/// Corner tetrahedron with 20 unit legs, ascii encoded.
pub const PLY_TETRAHEDRON_ASCII: TestModel = TestModel {
    bytes: include_bytes!("../../../res/tetrahedron/tetrahedron-ascii.ply"),
    vertex_count: 4,
    face_count: 4,
};

/// Same tetrahedron, binary little endian with per-vertex normals.
pub const PLY_TETRAHEDRON_BIN: TestModel = TestModel {
    bytes: include_bytes!("../../../res/tetrahedron/tetrahedron-bin.ply"),
    vertex_count: 4,
    face_count: 4,
};

/// Open spherical cap on a 5x5 grid, a small stand-in for a sundial shadow surface.
pub const PLY_BOWL_ASCII: TestModel = TestModel {
    bytes: include_bytes!("../../../res/bowl/bowl-ascii.ply"),
    vertex_count: 25,
    face_count: 32,
};

/// The bowl again, binary big endian with double precision vertices.
pub const PLY_BOWL_BIN: TestModel = TestModel {
    bytes: include_bytes!("../../../res/bowl/bowl-bin.ply"),
    vertex_count: 25,
    face_count: 32,
};

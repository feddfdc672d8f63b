use sundials_mesh::{Face, Surface, Vector3};
use sundials_ply::{parse_ply, read_ply, write_ply, Format, PlyReader};
use sundials_test_data::{
    PLY_BOWL_ASCII, PLY_BOWL_BIN, PLY_TETRAHEDRON_ASCII, PLY_TETRAHEDRON_BIN,
};

#[test]
fn parse_tetrahedron() {
    let mesh = parse_ply::<Surface>(PLY_TETRAHEDRON_ASCII.bytes).unwrap();
    assert_eq!(PLY_TETRAHEDRON_ASCII.vertex_count, mesh.vertex_count());
    assert_eq!(PLY_TETRAHEDRON_ASCII.face_count, mesh.face_count());
    assert_eq!(Vector3::new(0.0, 0.0, 20.0), mesh.vertices()[3]);
    assert_eq!(Face::new(2, 0, 3), mesh.faces()[3]);
}

#[test]
fn binary_and_ascii_agree() {
    let ascii = parse_ply::<Surface>(PLY_TETRAHEDRON_ASCII.bytes).unwrap();
    let binary = parse_ply::<Surface>(PLY_TETRAHEDRON_BIN.bytes).unwrap();
    assert_eq!(ascii, binary);

    let ascii = parse_ply::<Surface>(PLY_BOWL_ASCII.bytes).unwrap();
    let binary = parse_ply::<Surface>(PLY_BOWL_BIN.bytes).unwrap();
    assert_eq!(PLY_BOWL_BIN.face_count, binary.face_count());
    assert_eq!(ascii, binary);
}

#[test]
fn reader_trait() {
    let mut c = std::io::Cursor::new(PLY_BOWL_BIN.bytes);
    let mesh: Surface = c.read_ply().unwrap();
    assert_eq!(PLY_BOWL_BIN.vertex_count, mesh.vertex_count());
}

#[test]
fn write_then_read_file() {
    let dir = tempfile::tempdir().unwrap();
    let mesh = parse_ply::<Surface>(PLY_BOWL_ASCII.bytes).unwrap();
    for (name, format) in [
        ("ascii.ply", Format::Ascii),
        ("binary.ply", Format::BinaryLittleEndian),
    ] {
        let path = dir.path().join(name);
        write_ply(&mesh, &path, format).unwrap();
        assert_eq!(mesh, read_ply::<Surface, _>(&path).unwrap());
    }
}

#[test]
fn missing_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(read_ply::<Surface, _>(dir.path().join("absent.ply")).is_err());
}

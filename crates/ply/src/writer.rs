use byteorder::{LittleEndian, WriteBytesExt};
use std::io::Write;
use std::path::Path;
use sundials_mesh::IndexedMesh;

use crate::{Format, PlyError};

fn write_header<W: Write>(w: &mut W, format: Format, vertices: usize, faces: usize) -> std::io::Result<()> {
    writeln!(w, "ply")?;
    writeln!(w, "format {} 1.0", format.keyword())?;
    writeln!(w, "element vertex {}", vertices)?;
    writeln!(w, "property double x")?;
    writeln!(w, "property double y")?;
    writeln!(w, "property double z")?;
    writeln!(w, "element face {}", faces)?;
    writeln!(w, "property list uchar int vertex_indices")?;
    writeln!(w, "end_header")
}

/// Writes `mesh` as a PLY stream in ascii or little endian binary form.
///
/// Vertex positions are stored as doubles so that a written surface reads
/// back bit-for-bit.
pub fn write_ply_to<M: IndexedMesh, W: Write>(
    mesh: &M,
    w: &mut W,
    format: Format,
) -> Result<(), PlyError> {
    let vertices = mesh.vertices();
    let faces = mesh.faces();
    write_header(w, format, vertices.len(), faces.len())?;
    match format {
        Format::Ascii => {
            for v in vertices {
                // `{:?}` prints the shortest representation that round-trips.
                writeln!(w, "{:?} {:?} {:?}", v.x, v.y, v.z)?;
            }
            for f in faces {
                writeln!(w, "3 {} {} {}", f.p0, f.p1, f.p2)?;
            }
        }
        Format::BinaryLittleEndian => {
            for v in vertices {
                w.write_f64::<LittleEndian>(v.x)?;
                w.write_f64::<LittleEndian>(v.y)?;
                w.write_f64::<LittleEndian>(v.z)?;
            }
            for f in faces {
                w.write_u8(3)?;
                for index in [f.p0, f.p1, f.p2] {
                    w.write_i32::<LittleEndian>(index as i32)?;
                }
            }
        }
        Format::BinaryBigEndian => {
            return Err(PlyError::UnsupportedFormat(
                format.keyword().to_string(),
            ))
        }
    }
    Ok(())
}

pub fn write_ply<M: IndexedMesh, P: AsRef<Path>>(
    mesh: &M,
    p: P,
    format: Format,
) -> Result<(), PlyError> {
    let mut f = std::io::BufWriter::new(std::fs::File::create(p)?);
    write_ply_to(mesh, &mut f, format)?;
    f.flush()?;
    Ok(())
}

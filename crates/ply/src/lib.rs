use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt};
use std::collections::VecDeque;
use std::io::{BufRead, BufReader};
use std::marker::PhantomData;
use std::path::Path;
use sundials_mesh::{Face, IndexedMesh, MeshError, Vector3};

mod header;
mod writer;

pub use header::*;
pub use writer::*;

#[derive(Debug, thiserror::Error)]
pub enum PlyError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    #[error("unsupported format '{0}'")]
    UnsupportedFormat(String),
    #[error("missing element '{0}'")]
    MissingElement(&'static str),
    #[error("element '{element}' has no property '{property}'")]
    MissingProperty {
        element: &'static str,
        property: &'static str,
    },
    #[error("property '{property}' of element '{element}' is not a list")]
    NotAList {
        element: &'static str,
        property: &'static str,
    },
    #[error("could not parse '{0}' as a number")]
    InvalidNumber(String),
    #[error("unexpected end of data")]
    UnexpectedEof,
    #[error("face {face} has {count} vertices, only triangles are supported")]
    UnsupportedFace { face: usize, count: usize },
    #[error("face {face} has invalid vertex index {value}")]
    InvalidIndex { face: usize, value: f64 },
    #[error(transparent)]
    Mesh(#[from] MeshError),
}

/// Source of the scalar values that make up the body of a PLY file.
trait ScalarSource {
    fn scalar(&mut self, ty: ScalarType) -> Result<f64, PlyError>;
}

struct AsciiSource<'a, R> {
    reader: &'a mut R,
    tokens: VecDeque<String>,
}

impl<'a, R: BufRead> ScalarSource for AsciiSource<'a, R> {
    fn scalar(&mut self, _ty: ScalarType) -> Result<f64, PlyError> {
        // The ascii body is a stream of whitespace separated numbers. Rows are
        // conventionally one per line, but we don't depend on that.
        while self.tokens.is_empty() {
            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                return Err(PlyError::UnexpectedEof);
            }
            self.tokens
                .extend(line.split_whitespace().map(str::to_string));
        }
        let token = self.tokens.pop_front().ok_or(PlyError::UnexpectedEof)?;
        token
            .parse::<f64>()
            .map_err(|_| PlyError::InvalidNumber(token))
    }
}

struct BinarySource<'a, R, B> {
    reader: &'a mut R,
    _order: PhantomData<B>,
}

impl<'a, R: BufRead, B: ByteOrder> ScalarSource for BinarySource<'a, R, B> {
    fn scalar(&mut self, ty: ScalarType) -> Result<f64, PlyError> {
        let r = &mut self.reader;
        let value = match ty {
            ScalarType::Int8 => r.read_i8()? as f64,
            ScalarType::UInt8 => r.read_u8()? as f64,
            ScalarType::Int16 => r.read_i16::<B>()? as f64,
            ScalarType::UInt16 => r.read_u16::<B>()? as f64,
            ScalarType::Int32 => r.read_i32::<B>()? as f64,
            ScalarType::UInt32 => r.read_u32::<B>()? as f64,
            ScalarType::Float32 => r.read_f32::<B>()? as f64,
            ScalarType::Float64 => r.read_f64::<B>()?,
        };
        Ok(value)
    }
}

/// Upper bound on rows reserved up front; the declared count is untrusted.
const MAX_PREALLOCATION: usize = 1 << 20;

fn to_index(face: usize, value: f64) -> Result<u32, PlyError> {
    if value < 0.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
        return Err(PlyError::InvalidIndex { face, value });
    }
    Ok(value as u32)
}

fn read_body<M: IndexedMesh, S: ScalarSource>(
    header: &Header,
    source: &mut S,
) -> Result<M, PlyError> {
    let mut vertices: Option<Vec<Vector3>> = None;
    let mut faces: Option<Vec<Face>> = None;

    // Elements have to be consumed in file order, including the ones we don't
    // care about, since the body carries no offsets.
    for element in &header.elements {
        match element.name.as_str() {
            "vertex" => {
                let axes = ["x", "y", "z"].map(|axis| element.property_index(axis));
                let [Some(x), Some(y), Some(z)] = axes else {
                    let missing = ["x", "y", "z"]
                        .into_iter()
                        .zip(axes)
                        .find_map(|(name, index)| index.is_none().then_some(name))
                        .unwrap_or("x");
                    return Err(PlyError::MissingProperty {
                        element: "vertex",
                        property: missing,
                    });
                };
                let mut points = Vec::with_capacity(element.count.min(MAX_PREALLOCATION));
                let mut row = vec![0.0; element.properties.len()];
                for _ in 0..element.count {
                    for (slot, property) in row.iter_mut().zip(&element.properties) {
                        *slot = match property.ty {
                            PropertyType::Scalar(ty) => source.scalar(ty)?,
                            PropertyType::List { count, item } => {
                                skip_list(source, count, item)?;
                                0.0
                            }
                        };
                    }
                    points.push(Vector3::new(row[x], row[y], row[z]));
                }
                vertices = Some(points);
            }
            "face" => {
                let indices = element
                    .property_index("vertex_indices")
                    .or_else(|| element.property_index("vertex_index"))
                    .ok_or(PlyError::MissingProperty {
                        element: "face",
                        property: "vertex_indices",
                    })?;
                if !matches!(element.properties[indices].ty, PropertyType::List { .. }) {
                    return Err(PlyError::NotAList {
                        element: "face",
                        property: "vertex_indices",
                    });
                }
                let mut triangles = Vec::with_capacity(element.count.min(MAX_PREALLOCATION));
                for face in 0..element.count {
                    let mut triangle = None;
                    for (i, property) in element.properties.iter().enumerate() {
                        match property.ty {
                            PropertyType::Scalar(ty) => {
                                source.scalar(ty)?;
                            }
                            PropertyType::List { count, item } if i == indices => {
                                // The first column of every face row is its vertex count.
                                let n = source.scalar(count)? as usize;
                                if n != 3 {
                                    return Err(PlyError::UnsupportedFace { face, count: n });
                                }
                                let p0 = to_index(face, source.scalar(item)?)?;
                                let p1 = to_index(face, source.scalar(item)?)?;
                                let p2 = to_index(face, source.scalar(item)?)?;
                                triangle = Some(Face::new(p0, p1, p2));
                            }
                            PropertyType::List { count, item } => {
                                skip_list(source, count, item)?;
                            }
                        }
                    }
                    triangles.push(triangle.ok_or(PlyError::NotAList {
                        element: "face",
                        property: "vertex_indices",
                    })?);
                }
                faces = Some(triangles);
            }
            _ => {
                for _ in 0..element.count {
                    for property in &element.properties {
                        match property.ty {
                            PropertyType::Scalar(ty) => {
                                source.scalar(ty)?;
                            }
                            PropertyType::List { count, item } => skip_list(source, count, item)?,
                        }
                    }
                }
            }
        }
    }

    let vertices = vertices.ok_or(PlyError::MissingElement("vertex"))?;
    let faces = faces.ok_or(PlyError::MissingElement("face"))?;
    Ok(M::from_parts(vertices, faces)?)
}

fn skip_list<S: ScalarSource>(
    source: &mut S,
    count: ScalarType,
    item: ScalarType,
) -> Result<(), PlyError> {
    let n = source.scalar(count)? as usize;
    for _ in 0..n {
        source.scalar(item)?;
    }
    Ok(())
}

fn read_ply_from<M: IndexedMesh, R: BufRead>(r: &mut R) -> Result<M, PlyError> {
    let header = read_header(r)?;
    match header.format {
        Format::Ascii => read_body(
            &header,
            &mut AsciiSource {
                reader: r,
                tokens: VecDeque::new(),
            },
        ),
        Format::BinaryLittleEndian => read_body(
            &header,
            &mut BinarySource::<_, LittleEndian> {
                reader: r,
                _order: PhantomData,
            },
        ),
        Format::BinaryBigEndian => read_body(
            &header,
            &mut BinarySource::<_, BigEndian> {
                reader: r,
                _order: PhantomData,
            },
        ),
    }
}

pub fn read_ply<M: IndexedMesh, P: AsRef<Path>>(p: P) -> Result<M, PlyError> {
    let f = std::fs::File::open(p)?;
    read_ply_from(&mut BufReader::new(f))
}

pub fn parse_ply<M: IndexedMesh>(data: &[u8]) -> Result<M, PlyError> {
    let mut c = std::io::Cursor::new(data);
    read_ply_from(&mut c)
}

pub trait PlyReader: BufRead {
    fn read_ply<M: IndexedMesh>(&mut self) -> Result<M, PlyError>;
}

impl<T: BufRead> PlyReader for T {
    fn read_ply<M: IndexedMesh>(&mut self) -> Result<M, PlyError> {
        read_ply_from(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sundials_mesh::Surface;

    const TRIANGLE: &str = "ply\n\
                            format ascii 1.0\n\
                            element vertex 3\n\
                            property float x\n\
                            property float y\n\
                            property float z\n\
                            element face 1\n\
                            property list uchar int vertex_indices\n\
                            end_header\n\
                            0 0 0\n\
                            1 0 0\n\
                            0 1 0.5\n\
                            3 0 1 2\n";

    #[test]
    fn parse_ascii_triangle() {
        let s = parse_ply::<Surface>(TRIANGLE.as_bytes()).unwrap();
        assert_eq!(s.vertex_count(), 3);
        assert_eq!(s.faces(), &[Face::new(0, 1, 2)]);
        assert_eq!(s.vertices()[2], Vector3::new(0.0, 1.0, 0.5));
    }

    #[test]
    fn reject_quads() {
        let text = TRIANGLE.replace("3 0 1 2\n", "4 0 1 2 0\n");
        assert!(matches!(
            parse_ply::<Surface>(text.as_bytes()),
            Err(PlyError::UnsupportedFace { face: 0, count: 4 })
        ));
    }

    #[test]
    fn reject_out_of_range_face() {
        let text = TRIANGLE.replace("3 0 1 2\n", "3 0 1 7\n");
        assert!(matches!(
            parse_ply::<Surface>(text.as_bytes()),
            Err(PlyError::Mesh(MeshError::FaceIndexOutOfRange { .. }))
        ));
    }

    #[test]
    fn reject_garbage_number() {
        let text = TRIANGLE.replace("0 1 0.5", "0 one 0.5");
        assert!(matches!(
            parse_ply::<Surface>(text.as_bytes()),
            Err(PlyError::InvalidNumber(_))
        ));
    }

    #[test]
    fn truncated_body() {
        let text = TRIANGLE.replace("3 0 1 2\n", "");
        assert!(matches!(
            parse_ply::<Surface>(text.as_bytes()),
            Err(PlyError::UnexpectedEof)
        ));
    }

    #[test]
    fn huge_declared_counts_fail_without_reserving() {
        let huge = usize::MAX.to_string();
        let vertices = TRIANGLE.replace("element vertex 3", &format!("element vertex {}", huge));
        assert!(matches!(
            parse_ply::<Surface>(vertices.as_bytes()),
            Err(PlyError::UnexpectedEof)
        ));
        let faces = TRIANGLE.replace("element face 1", &format!("element face {}", huge));
        assert!(matches!(
            parse_ply::<Surface>(faces.as_bytes()),
            Err(PlyError::UnexpectedEof)
        ));
    }

    #[test]
    fn reject_scalar_vertex_indices() {
        let text = TRIANGLE
            .replace("property list uchar int vertex_indices", "property int vertex_indices")
            .replace("3 0 1 2\n", "0\n");
        assert!(matches!(
            parse_ply::<Surface>(text.as_bytes()),
            Err(PlyError::NotAList {
                element: "face",
                property: "vertex_indices"
            })
        ));
    }

    #[test]
    fn missing_faces() {
        let text = "ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\nproperty float y\nproperty float z\nend_header\n0 0 0\n";
        assert!(matches!(
            parse_ply::<Surface>(text.as_bytes()),
            Err(PlyError::MissingElement("face"))
        ));
    }

    #[test]
    fn skips_extra_properties() {
        let text = "ply\n\
                    format ascii 1.0\n\
                    element vertex 3\n\
                    property float x\n\
                    property float y\n\
                    property float z\n\
                    property uchar red\n\
                    element face 1\n\
                    property uchar flags\n\
                    property list uchar int vertex_index\n\
                    element edge 1\n\
                    property int vertex1\n\
                    property int vertex2\n\
                    end_header\n\
                    0 0 0 255\n\
                    1 0 0 255\n\
                    0 1 0 255\n\
                    9 3 2 1 0\n\
                    0 1\n";
        let s = parse_ply::<Surface>(text.as_bytes()).unwrap();
        assert_eq!(s.faces(), &[Face::new(2, 1, 0)]);
        assert_eq!(s.vertices()[1], Vector3::new(1.0, 0.0, 0.0));
    }
}

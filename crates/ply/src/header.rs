use std::io::BufRead;

use crate::PlyError;

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Format {
    Ascii,
    BinaryLittleEndian,
    BinaryBigEndian,
}

impl Format {
    fn parse(s: &str) -> Result<Self, PlyError> {
        match s {
            "ascii" => Ok(Format::Ascii),
            "binary_little_endian" => Ok(Format::BinaryLittleEndian),
            "binary_big_endian" => Ok(Format::BinaryBigEndian),
            _ => Err(PlyError::UnsupportedFormat(s.to_string())),
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Format::Ascii => "ascii",
            Format::BinaryLittleEndian => "binary_little_endian",
            Format::BinaryBigEndian => "binary_big_endian",
        }
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum ScalarType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Float32,
    Float64,
}

impl ScalarType {
    fn parse(s: &str) -> Result<Self, PlyError> {
        // Both the classic type names and the sized aliases show up in the wild.
        match s {
            "char" | "int8" => Ok(ScalarType::Int8),
            "uchar" | "uint8" => Ok(ScalarType::UInt8),
            "short" | "int16" => Ok(ScalarType::Int16),
            "ushort" | "uint16" => Ok(ScalarType::UInt16),
            "int" | "int32" => Ok(ScalarType::Int32),
            "uint" | "uint32" => Ok(ScalarType::UInt32),
            "float" | "float32" => Ok(ScalarType::Float32),
            "double" | "float64" => Ok(ScalarType::Float64),
            _ => Err(PlyError::InvalidHeader(format!("unknown scalar type '{}'", s))),
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            ScalarType::Int8 => "char",
            ScalarType::UInt8 => "uchar",
            ScalarType::Int16 => "short",
            ScalarType::UInt16 => "ushort",
            ScalarType::Int32 => "int",
            ScalarType::UInt32 => "uint",
            ScalarType::Float32 => "float",
            ScalarType::Float64 => "double",
        }
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum PropertyType {
    Scalar(ScalarType),
    List { count: ScalarType, item: ScalarType },
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Property {
    pub name: String,
    pub ty: PropertyType,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Element {
    pub name: String,
    pub count: usize,
    pub properties: Vec<Property>,
}

impl Element {
    pub fn property_index(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|p| p.name == name)
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Header {
    pub format: Format,
    pub elements: Vec<Element>,
}

fn next_line<R: BufRead>(r: &mut R, buf: &mut String) -> Result<(), PlyError> {
    buf.clear();
    if r.read_line(buf)? == 0 {
        return Err(PlyError::InvalidHeader("missing end_header".to_string()));
    }
    Ok(())
}

/// Reads the header up to and including the `end_header` line.
///
/// The reader is left positioned at the first byte of the body.
pub fn read_header<R: BufRead>(r: &mut R) -> Result<Header, PlyError> {
    let mut line = String::new();
    next_line(r, &mut line)?;
    if line.trim_end() != "ply" {
        return Err(PlyError::InvalidHeader("missing 'ply' magic".to_string()));
    }

    let mut format = None;
    let mut elements: Vec<Element> = Vec::new();
    loop {
        next_line(r, &mut line)?;
        let mut words = line.split_whitespace();
        match words.next() {
            // Blank lines are tolerated by most writers' readers, so we do the same.
            None => continue,
            Some("comment") | Some("obj_info") => continue,
            Some("end_header") => break,
            Some("format") => {
                let kind = words
                    .next()
                    .ok_or_else(|| PlyError::InvalidHeader("empty format line".to_string()))?;
                format = Some(Format::parse(kind)?);
            }
            Some("element") => {
                let (name, count) = match (words.next(), words.next()) {
                    (Some(name), Some(count)) => (name, count),
                    _ => return Err(PlyError::InvalidHeader(line.trim_end().to_string())),
                };
                let count = count
                    .parse::<usize>()
                    .map_err(|_| PlyError::InvalidHeader(line.trim_end().to_string()))?;
                elements.push(Element {
                    name: name.to_string(),
                    count,
                    properties: Vec::new(),
                });
            }
            Some("property") => {
                let element = elements.last_mut().ok_or_else(|| {
                    PlyError::InvalidHeader("property declared before any element".to_string())
                })?;
                let words: Vec<&str> = words.collect();
                let property = match words.as_slice() {
                    ["list", count, item, name] => Property {
                        name: name.to_string(),
                        ty: PropertyType::List {
                            count: ScalarType::parse(count)?,
                            item: ScalarType::parse(item)?,
                        },
                    },
                    [ty, name] => Property {
                        name: name.to_string(),
                        ty: PropertyType::Scalar(ScalarType::parse(ty)?),
                    },
                    _ => return Err(PlyError::InvalidHeader(line.trim_end().to_string())),
                };
                element.properties.push(property);
            }
            Some(other) => {
                return Err(PlyError::InvalidHeader(format!(
                    "unexpected header keyword '{}'",
                    other
                )))
            }
        }
    }

    let format =
        format.ok_or_else(|| PlyError::InvalidHeader("missing format line".to_string()))?;
    Ok(Header { format, elements })
}

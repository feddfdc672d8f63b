//! Loading a provisioned sundial dataset from disk.
//!
//! The expected layout is
//!
//! ```text
//! <root>/Roman/*.ply   one surface per sundial, in correspondence with the mean
//! <root>/mean.ply      the reference shape
//! ```
//!
//! Loading never touches the network; see [`crate::provision`] for fetching
//! the archive.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::info;
use nalgebra::DMatrix;
use ordered_float::OrderedFloat;
use sundials_mesh::Surface;
use sundials_ply::PlyError;

/// Latitudes (degrees) of the ten Roman sundials, in file name order.
pub const ROMAN_LATITUDES: [f64; 10] = [
    42.0913, 41.67, 40.7503, 40.7503, 40.7503, 41.8034, 41.7561, 40.7503, 40.703, 43.31554,
];

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("{0} does not exist, provision the dataset first")]
    MissingDirectory(PathBuf),
    #[error("failed to read {path}: {source}")]
    Mesh { path: PathBuf, source: PlyError },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("no mesh files in {0}")]
    Empty(PathBuf),
    #[error("the dataset has no samples")]
    NoSamples,
    #[error("sample '{0}' does not share the topology of the reference")]
    TopologyMismatch(String),
    #[error("{samples} samples but {latitudes} latitudes")]
    LatitudeCount { samples: usize, latitudes: usize },
    #[error("no latitude for sample '{0}'")]
    MissingLatitude(String),
    #[error("latitude given for unknown sample '{0}'")]
    UnknownSample(String),
    #[error("line {line}: {message}")]
    InvalidLatitudeTable { line: usize, message: String },
    #[error("latitudes need at least two distinct values")]
    DegenerateLatitudes,
}

/// One sundial: its identifier (the file stem) and surface.
#[derive(Debug, Clone)]
pub struct Sample {
    pub id: String,
    pub surface: Surface,
}

pub fn load_surface<P: AsRef<Path>>(path: P) -> Result<Surface, DatasetError> {
    let path = path.as_ref();
    sundials_ply::read_ply::<Surface, _>(path).map_err(|source| DatasetError::Mesh {
        path: path.to_path_buf(),
        source,
    })
}

fn is_mesh_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("ply"))
            .unwrap_or(false)
}

/// Loads every `.ply` file in `dir`, sorted by file name.
pub fn load_directory<P: AsRef<Path>>(dir: P) -> Result<Vec<Sample>, DatasetError> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(DatasetError::MissingDirectory(dir.to_path_buf()));
    }
    let io_error = |source| DatasetError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if is_mesh_file(&path) {
            paths.push(path);
        }
    }
    paths.sort();

    paths
        .into_iter()
        .map(|path| {
            let id = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(Sample {
                id,
                surface: load_surface(&path)?,
            })
        })
        .collect()
}

/// Installation latitudes of the samples.
#[derive(Debug, Clone, PartialEq)]
pub enum LatitudeTable {
    /// Matched to samples by file name order.
    Positional(Vec<f64>),
    /// Matched to samples by id.
    Keyed(BTreeMap<String, f64>),
}

impl LatitudeTable {
    pub fn roman() -> Self {
        LatitudeTable::Positional(ROMAN_LATITUDES.to_vec())
    }

    /// Parses `id,latitude` lines. Blank lines and lines starting with `#`
    /// are ignored, as is a leading `id,latitude` header.
    pub fn parse(text: &str) -> Result<Self, DatasetError> {
        let mut table = BTreeMap::new();
        for (i, line) in text.lines().enumerate() {
            let line_no = i + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let invalid = |message: String| DatasetError::InvalidLatitudeTable {
                line: line_no,
                message,
            };
            let Some((id, value)) = line.split_once(',') else {
                return Err(invalid(format!("expected 'id,latitude', got '{}'", line)));
            };
            let (id, value) = (id.trim(), value.trim());
            if table.is_empty() && id == "id" && value == "latitude" {
                continue;
            }
            let latitude: f64 = value
                .parse()
                .map_err(|_| invalid(format!("invalid latitude '{}'", value)))?;
            if !latitude.is_finite() {
                return Err(invalid(format!("invalid latitude '{}'", value)));
            }
            if table.insert(id.to_string(), latitude).is_some() {
                return Err(invalid(format!("duplicate sample '{}'", id)));
            }
        }
        Ok(LatitudeTable::Keyed(table))
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// The latitude of every sample in `ids`, in the same order.
    ///
    /// Fails unless every sample has exactly one latitude and every latitude
    /// belongs to a sample.
    pub fn assign(&self, ids: &[String]) -> Result<Vec<f64>, DatasetError> {
        match self {
            LatitudeTable::Positional(values) => {
                if values.len() != ids.len() {
                    return Err(DatasetError::LatitudeCount {
                        samples: ids.len(),
                        latitudes: values.len(),
                    });
                }
                Ok(values.clone())
            }
            LatitudeTable::Keyed(table) => {
                if let Some(unknown) = table.keys().find(|k| !ids.contains(k)) {
                    return Err(DatasetError::UnknownSample(unknown.clone()));
                }
                ids.iter()
                    .map(|id| {
                        table
                            .get(id)
                            .copied()
                            .ok_or_else(|| DatasetError::MissingLatitude(id.clone()))
                    })
                    .collect()
            }
        }
    }
}

/// Min-max scaling of latitudes onto [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub min: f64,
    pub max: f64,
}

impl Normalization {
    pub fn fit(values: &[f64]) -> Result<Self, DatasetError> {
        let min = values.iter().copied().map(OrderedFloat).min();
        let max = values.iter().copied().map(OrderedFloat).max();
        match (min, max) {
            (Some(min), Some(max)) if max > min => Ok(Self {
                min: min.0,
                max: max.0,
            }),
            _ => Err(DatasetError::DegenerateLatitudes),
        }
    }

    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    pub fn apply(&self, value: f64) -> f64 {
        (value - self.min) / self.range()
    }

    pub fn apply_all(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|v| self.apply(*v)).collect()
    }
}

/// Where the files of a provisioned dataset live.
#[derive(Debug, Clone, PartialEq)]
pub struct DataLayout {
    pub samples: PathBuf,
    pub reference: PathBuf,
}

impl DataLayout {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        Self {
            samples: root.join("Roman"),
            reference: root.join("mean.ply"),
        }
    }
}

/// A loaded dataset: reference surface, samples and their latitudes (degrees).
#[derive(Debug, Clone)]
pub struct Dataset {
    pub reference: Surface,
    pub samples: Vec<Sample>,
    pub latitudes: Vec<f64>,
}

impl Dataset {
    pub fn load(layout: &DataLayout, table: &LatitudeTable) -> Result<Self, DatasetError> {
        if !layout.samples.is_dir() {
            return Err(DatasetError::MissingDirectory(layout.samples.clone()));
        }
        let reference = load_surface(&layout.reference)?;
        let samples = load_directory(&layout.samples)?;
        if samples.is_empty() {
            return Err(DatasetError::Empty(layout.samples.clone()));
        }
        Self::new(reference, samples, table)
    }

    pub fn new(
        reference: Surface,
        samples: Vec<Sample>,
        table: &LatitudeTable,
    ) -> Result<Self, DatasetError> {
        if samples.is_empty() {
            return Err(DatasetError::NoSamples);
        }
        if let Some(s) = samples
            .iter()
            .find(|s| !s.surface.same_topology(&reference))
        {
            return Err(DatasetError::TopologyMismatch(s.id.clone()));
        }
        let ids: Vec<String> = samples.iter().map(|s| s.id.clone()).collect();
        let latitudes = table.assign(&ids)?;
        info!(
            "loaded {} samples with {} vertices each",
            samples.len(),
            reference.vertex_count()
        );
        Ok(Self {
            reference,
            samples,
            latitudes,
        })
    }

    pub fn ids(&self) -> Vec<String> {
        self.samples.iter().map(|s| s.id.clone()).collect()
    }
}

/// Flattened vertex coordinates, one row per surface, centered on the mean row.
pub fn raw_coordinates(surfaces: &[&Surface]) -> DMatrix<f64> {
    let columns = surfaces.first().map(|s| s.flat_vertices().len()).unwrap_or(0);
    let mut x = DMatrix::from_fn(surfaces.len(), columns, |i, j| surfaces[i].flat_vertices()[j]);
    let mean = x.row_mean();
    for mut row in x.row_iter_mut() {
        row -= &mean;
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;
    use sundials_test_data::PLY_BOWL_ASCII;

    #[test]
    fn roman_latitudes_normalize_to_unit_interval() {
        let n = Normalization::fit(&ROMAN_LATITUDES).unwrap();
        assert_eq!(n.min, 40.703);
        assert_eq!(n.max, 43.31554);
        let t = n.apply_all(&ROMAN_LATITUDES);
        assert_eq!(t[8], 0.0);
        assert_eq!(t[9], 1.0);
        assert!(t.iter().all(|t| (0.0..=1.0).contains(t)));
        // Monotone: order of latitudes is kept.
        for (a, b) in ROMAN_LATITUDES.iter().zip(&t) {
            for (c, d) in ROMAN_LATITUDES.iter().zip(&t) {
                assert_eq!(a < c, b < d);
            }
        }
        assert_float_eq!(t[0] * n.range(), 42.0913 - 40.703, abs <= 1e-12);
    }

    #[test]
    fn normalization_needs_spread() {
        assert!(Normalization::fit(&[]).is_err());
        assert!(Normalization::fit(&[41.0, 41.0]).is_err());
    }

    #[test]
    fn positional_table_checks_count() {
        let ids: Vec<String> = (0..9).map(|i| format!("s{}", i)).collect();
        assert!(matches!(
            LatitudeTable::roman().assign(&ids),
            Err(DatasetError::LatitudeCount {
                samples: 9,
                latitudes: 10
            })
        ));
    }

    #[test]
    fn keyed_table_matches_ids() {
        let table = LatitudeTable::parse("id,latitude\n# comment\nb, 41.5\n\na,40.0\n").unwrap();
        let ids = vec!["a".to_string(), "b".to_string()];
        assert_eq!(table.assign(&ids).unwrap(), vec![40.0, 41.5]);

        let ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert!(matches!(
            table.assign(&ids),
            Err(DatasetError::MissingLatitude(id)) if id == "c"
        ));
        let ids = vec!["a".to_string()];
        assert!(matches!(
            table.assign(&ids),
            Err(DatasetError::UnknownSample(id)) if id == "b"
        ));
    }

    #[test]
    fn latitude_table_parse_errors() {
        assert!(matches!(
            LatitudeTable::parse("a,40\na,41\n"),
            Err(DatasetError::InvalidLatitudeTable { line: 2, .. })
        ));
        assert!(matches!(
            LatitudeTable::parse("a 40\n"),
            Err(DatasetError::InvalidLatitudeTable { line: 1, .. })
        ));
        assert!(matches!(
            LatitudeTable::parse("a,north\n"),
            Err(DatasetError::InvalidLatitudeTable { line: 1, .. })
        ));
        assert!(LatitudeTable::parse("a,NaN\n").is_err());
    }

    #[test]
    fn missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_directory(dir.path().join("Roman")),
            Err(DatasetError::MissingDirectory(_))
        ));
        assert!(matches!(
            Dataset::load(&DataLayout::new(dir.path()), &LatitudeTable::roman()),
            Err(DatasetError::MissingDirectory(_))
        ));
    }

    #[test]
    fn empty_sample_directory() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        std::fs::create_dir(&layout.samples).unwrap();
        std::fs::write(&layout.reference, PLY_BOWL_ASCII.bytes).unwrap();
        assert!(matches!(
            Dataset::load(&layout, &LatitudeTable::roman()),
            Err(DatasetError::Empty(path)) if path == layout.samples
        ));
    }

    #[test]
    fn directory_is_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.ply", "a.PLY", "c.ply"] {
            std::fs::write(dir.path().join(name), PLY_BOWL_ASCII.bytes).unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "not a mesh").unwrap();
        let samples = load_directory(dir.path()).unwrap();
        let ids: Vec<&str> = samples.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn corrupt_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.ply"), "ply\nformat ascii 1.0\n").unwrap();
        let err = load_directory(dir.path()).unwrap_err();
        assert!(err.to_string().contains("broken.ply"), "{}", err);
    }

    #[test]
    fn raw_coordinates_are_centered() {
        let a = sundials_ply::parse_ply::<Surface>(PLY_BOWL_ASCII.bytes).unwrap();
        let mut b = a.clone();
        for v in b.vertices_mut() {
            v.z += 2.0;
        }
        let x = raw_coordinates(&[&a, &b]);
        assert_eq!(x.shape(), (2, 75));
        assert_float_eq!(x[(0, 2)], -1.0, abs <= 1e-12);
        assert_float_eq!(x[(1, 2)], 1.0, abs <= 1e-12);
        assert_float_eq!(x[(0, 0)], 0.0, abs <= 1e-12);
    }
}

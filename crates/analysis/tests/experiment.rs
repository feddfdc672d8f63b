use std::path::Path;

use float_eq::assert_float_eq;
use sundials::dataset::{DataLayout, Dataset, DatasetError, LatitudeTable, Normalization};
use sundials::{evaluate, AnalysisError, ExperimentConfig};
use sundials_mesh::{Face, Surface, Vector3};
use sundials_ply::{write_ply, Format};

const LATITUDES: [f64; 6] = [41.0, 43.5, 40.2, 42.1, 44.0, 40.9];

/// A flat 5x5 grid centered on the origin, stretched along x by `stretch`.
fn grid(stretch: f64) -> Surface {
    let mut vertices = Vec::new();
    for j in 0..5 {
        for i in 0..5 {
            vertices.push(Vector3::new(stretch * (i as f64 - 2.0), j as f64 - 2.0, 0.0));
        }
    }
    let mut faces = Vec::new();
    for j in 0..4u32 {
        for i in 0..4u32 {
            let v = 5 * j + i;
            faces.push(Face::new(v, v + 1, v + 6));
            faces.push(Face::new(v, v + 6, v + 5));
        }
    }
    Surface::new(vertices, faces).unwrap()
}

/// Writes a dataset whose samples lie on a single geodesic: the log-stretch of
/// every face grows linearly with the normalized latitude.
fn write_dataset(root: &Path) -> Normalization {
    let layout = DataLayout::new(root);
    std::fs::create_dir_all(&layout.samples).unwrap();
    write_ply(&grid(1.0), &layout.reference, Format::Ascii).unwrap();

    let normalization = Normalization::fit(&LATITUDES).unwrap();
    let mut table = String::from("id,latitude\n");
    for (i, latitude) in LATITUDES.iter().enumerate() {
        let id = format!("dial{:02}", i);
        let stretch = (0.3 * normalization.apply(*latitude)).exp();
        let format = if i % 2 == 0 {
            Format::Ascii
        } else {
            Format::BinaryLittleEndian
        };
        write_ply(&grid(stretch), layout.samples.join(format!("{}.ply", id)), format).unwrap();
        table.push_str(&format!("{},{}\n", id, latitude));
    }
    std::fs::write(root.join("latitudes.csv"), table).unwrap();
    normalization
}

#[test]
fn geodesic_family_is_predicted_exactly() {
    let dir = tempfile::tempdir().unwrap();
    let normalization = write_dataset(dir.path());

    let table = LatitudeTable::read(dir.path().join("latitudes.csv")).unwrap();
    let dataset = Dataset::load(&DataLayout::new(dir.path()), &table).unwrap();
    assert_eq!(dataset.samples.len(), 6);
    assert_eq!(dataset.latitudes, LATITUDES.to_vec());

    let evaluation = evaluate(&dataset, &ExperimentConfig::default()).unwrap();
    assert_eq!(evaluation.normalization, normalization);
    assert_eq!(evaluation.ids[0], "dial00");
    assert_eq!(evaluation.cross_validation.predictions.len(), 6);

    for (p, latitude) in evaluation.cross_validation.predictions.iter().zip(LATITUDES) {
        assert_float_eq!(p.truth, normalization.apply(latitude), abs <= 1e-12);
        assert_float_eq!(p.geodesic, p.truth, abs <= 1e-6);
        assert!(p.pls.is_finite());
    }
    let report = &evaluation.report;
    assert!(report.geodesic.mean < 1e-5);
    assert_eq!(report.pls.errors.len(), 6);
    assert!(report.pls.errors.iter().all(|e| *e >= 0.0));
    assert!(report.pls.std >= 0.0);
}

#[test]
fn positional_table_must_match_sample_count() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path());
    let result = Dataset::load(&DataLayout::new(dir.path()), &LatitudeTable::roman());
    assert!(matches!(
        result,
        Err(DatasetError::LatitudeCount {
            samples: 6,
            latitudes: 10
        })
    ));
}

#[test]
fn single_sample_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    let layout = DataLayout::new(dir.path());
    std::fs::create_dir_all(&layout.samples).unwrap();
    write_ply(&grid(1.0), &layout.reference, Format::Ascii).unwrap();
    write_ply(&grid(1.1), layout.samples.join("only.ply"), Format::Ascii).unwrap();

    let table = LatitudeTable::Positional(vec![41.0]);
    let dataset = Dataset::load(&layout, &table).unwrap();
    assert!(matches!(
        evaluate(&dataset, &ExperimentConfig::default()),
        Err(AnalysisError::NotEnoughSamples(1))
    ));
}

#[test]
fn missing_data_points_at_provisioning() {
    let dir = tempfile::tempdir().unwrap();
    let err = Dataset::load(&DataLayout::new(dir.path()), &LatitudeTable::roman()).unwrap_err();
    assert!(matches!(err, DatasetError::MissingDirectory(_)));
    assert!(err.to_string().contains("provision"));
}

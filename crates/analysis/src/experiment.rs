use log::info;
use sundials_mesh::Surface;

use crate::config::ExperimentConfig;
use crate::dataset::{raw_coordinates, Dataset, Normalization};
use crate::procrustes::{align, generalized_procrustes};
use crate::report::{Report, Summary};
use crate::space::{DifferentialCoords, ShapeSpace};
use crate::validation::{leave_one_out, CrossValidation};
use crate::AnalysisError;

/// Everything the experiment produced.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub ids: Vec<String>,
    pub normalization: Normalization,
    pub cross_validation: CrossValidation,
    pub report: Report,
    pub procrustes_iterations: usize,
}

/// Runs the sundial experiment on a loaded dataset.
///
/// The samples are aligned with generalized Procrustes analysis, the reference
/// is rigidly moved onto the resulting mean, and the differential coordinates
/// space is built around it. Leave-one-out predictions of the normalized
/// latitudes are then made with geodesic regression and with PLS on the raw
/// coordinates.
pub fn evaluate(dataset: &Dataset, config: &ExperimentConfig) -> Result<Evaluation, AnalysisError> {
    let n = dataset.samples.len();
    if n < 2 {
        return Err(AnalysisError::NotEnoughSamples(n));
    }
    let normalization = Normalization::fit(&dataset.latitudes)?;
    let t = normalization.apply_all(&dataset.latitudes);

    let mut surfaces: Vec<Surface> = dataset.samples.iter().map(|s| s.surface.clone()).collect();
    let procrustes = generalized_procrustes(&mut surfaces, &config.procrustes)?;
    info!(
        "aligned {} samples in {} iterations",
        n, procrustes.iterations
    );

    let mut reference = dataset.reference.clone();
    let aligned = align(reference.vertices(), &procrustes.mean, config.procrustes.scaling)?;
    reference.set_vertices(aligned)?;

    let space = DifferentialCoords::new(&reference)?;
    let points = surfaces
        .iter()
        .map(|s| space.encode(s.vertices()))
        .collect::<Result<Vec<_>, _>>()?;
    let raw = raw_coordinates(&surfaces.iter().collect::<Vec<_>>());

    let cross_validation = leave_one_out(&space, &points, &raw, &t, config)?;
    let range = normalization.range();
    let report = Report {
        geodesic: Summary::from_errors(&cross_validation.geodesic_errors(), range),
        pls: Summary::from_errors(&cross_validation.pls_errors(), range),
    };

    Ok(Evaluation {
        ids: dataset.ids(),
        normalization,
        cross_validation,
        report,
        procrustes_iterations: procrustes.iterations,
    })
}

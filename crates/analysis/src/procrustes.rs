use log::{debug, warn};
use nalgebra::{Matrix3, Vector3 as NaVector3};
use sundials_mesh::{MeshError, Surface, Vector3};

use crate::config::ProcrustesConfig;
use crate::AnalysisError;

fn centroid(points: &[Vector3]) -> Vector3 {
    let mut sum = Vector3::new(0.0, 0.0, 0.0);
    for p in points {
        sum += *p;
    }
    sum / points.len().max(1) as f64
}

fn to_na(v: Vector3) -> NaVector3<f64> {
    NaVector3::new(v.x, v.y, v.z)
}

/// Rigidly moves `source` onto `target` (same length, corresponding points).
///
/// Kabsch alignment: both sets are centered, the optimal rotation is taken
/// from the SVD of their cross covariance, excluding reflections. With
/// `scaling` the optimal isotropic scale is applied too.
pub fn align(source: &[Vector3], target: &[Vector3], scaling: bool) -> Result<Vec<Vector3>, AnalysisError> {
    if source.len() != target.len() {
        return Err(MeshError::VertexCountMismatch {
            expected: target.len(),
            actual: source.len(),
        }
        .into());
    }
    let cs = centroid(source);
    let ct = centroid(target);

    let mut h = Matrix3::<f64>::zeros();
    let mut source_ss = 0.0;
    for (s, t) in source.iter().zip(target) {
        let s = to_na(*s - cs);
        let t = to_na(*t - ct);
        h += s * t.transpose();
        source_ss += s.norm_squared();
    }

    let svd = h.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Err(AnalysisError::AlignmentFailed);
    };
    let v = v_t.transpose();
    let mut signs = NaVector3::new(1.0, 1.0, 1.0);
    if (v * u.transpose()).determinant() < 0.0 {
        // Flip the axis of the smallest singular value to get a proper rotation.
        let smallest = svd.singular_values.imin();
        signs[smallest] = -1.0;
    }
    let rotation = v * Matrix3::from_diagonal(&signs) * u.transpose();
    let scale = if scaling && source_ss > 0.0 {
        svd.singular_values.component_mul(&signs).sum() / source_ss
    } else {
        1.0
    };

    Ok(source
        .iter()
        .map(|p| {
            let r = rotation * to_na(*p - cs) * scale;
            ct + Vector3::new(r.x, r.y, r.z)
        })
        .collect())
}

/// Outcome of [`generalized_procrustes`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProcrustesMean {
    /// Vertex-wise mean of the aligned surfaces, rescaled to the size of the
    /// first surface when scaling is on.
    pub mean: Vec<Vector3>,
    pub iterations: usize,
}

/// Generalized Procrustes alignment, in place.
///
/// Starting with the first surface as the reference, every surface is aligned
/// to the reference and the reference is replaced by the vertex-wise mean,
/// until the reference moves less than `config.tolerance` or
/// `config.max_iterations` is reached. Returns the final reference.
pub fn generalized_procrustes(
    surfaces: &mut [Surface],
    config: &ProcrustesConfig,
) -> Result<ProcrustesMean, AnalysisError> {
    let Some(first) = surfaces.first() else {
        return Err(AnalysisError::NotEnoughSamples(0));
    };
    let vertex_count = first.vertex_count();
    if let Some(s) = surfaces.iter().find(|s| s.vertex_count() != vertex_count) {
        return Err(MeshError::VertexCountMismatch {
            expected: vertex_count,
            actual: s.vertex_count(),
        }
        .into());
    }
    let size = first.centroid_size();

    let mut reference = first.vertices().to_vec();
    let mut iterations = 0;
    loop {
        if iterations == config.max_iterations {
            warn!(
                "procrustes alignment stopped after {} iterations",
                iterations
            );
            break;
        }
        iterations += 1;

        for s in surfaces.iter_mut() {
            let aligned = align(s.vertices(), &reference, config.scaling)?;
            s.set_vertices(aligned)?;
        }

        let n = surfaces.len() as f64;
        let mut mean = vec![Vector3::new(0.0, 0.0, 0.0); vertex_count];
        for s in surfaces.iter() {
            for (m, v) in mean.iter_mut().zip(s.vertices()) {
                *m += *v / n;
            }
        }
        if config.scaling {
            // Without a size constraint the mean would shrink a little every round.
            let c = centroid(&mean);
            let mean_size = mean
                .iter()
                .map(|v| cgmath::InnerSpace::magnitude2(*v - c))
                .sum::<f64>()
                .sqrt();
            if mean_size > 0.0 {
                for v in mean.iter_mut() {
                    *v = c + (*v - c) * (size / mean_size);
                }
            }
        }

        let change = reference
            .iter()
            .zip(&mean)
            .map(|(a, b)| cgmath::InnerSpace::magnitude2(*a - *b))
            .sum::<f64>()
            .sqrt();
        reference = mean;
        if change <= config.tolerance {
            break;
        }
    }
    debug!(
        "aligned {} surfaces in {} iterations",
        surfaces.len(),
        iterations
    );
    Ok(ProcrustesMean {
        mean: reference,
        iterations,
    })
}

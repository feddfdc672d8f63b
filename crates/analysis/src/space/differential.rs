use log::{debug, warn};
use sundials_mesh::{Surface, Vector3};

use super::lie::{self, Mat3, Vec3};
use super::{check_dim, dot, GeodesicTrend, ShapeError, ShapeSpace};
use crate::config::RegressionConfig;
use crate::regression::geodesic::check_regression_input;
use crate::regression::least_squares::{levenberg_marquardt, LeastSquaresProblem};

/// Entries of a tangent vector per face: a rotation (3) and a symmetric stretch (6).
const FACE_DIM: usize = 9;

/// A surface in differential coordinates: for every face of the reference, the
/// rotation and the logarithm of the stretch of its deformation gradient.
#[derive(Debug, Clone, PartialEq)]
pub struct DifferentialPoint {
    pub rotations: Vec<Mat3>,
    pub stretches: Vec<Mat3>,
}

/// Shape space of differential coordinates anchored at a reference surface.
///
/// Every face of a surface in correspondence with the reference is described
/// by the deformation gradient `D` mapping the reference face onto it. `D`
/// is split by polar decomposition into a rotation `R` and a stretch `U`, and
/// the point stores `(R, log U)` for every face. The metric is the
/// area-weighted sum of the bi-invariant metric on SO(3) and the log-Euclidean
/// metric on the stretches:
///
/// ```text
/// d(a, b)^2 = sum_i w_i (|log(Ra_i^T Rb_i)|^2 + |La_i - Lb_i|^2)
/// ```
///
/// with `w_i` the reference face areas normalized to sum to one. The
/// reference itself maps to the origin (identity rotations, zero stretches).
pub struct DifferentialCoords {
    reference: Surface,
    /// Inverse of the edge/normal frame of every reference face.
    inverse_frames: Vec<Mat3>,
    /// Square roots of the normalized face areas.
    sqrt_weights: Vec<f64>,
}

fn to_na(v: &Vector3) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

/// The frame spanned by two edges of a triangle and its normal.
///
/// The normal is scaled by the inverse square root of its length so that it
/// changes with the triangle like an edge does.
fn face_frame(p0: &Vector3, p1: &Vector3, p2: &Vector3) -> Option<Mat3> {
    let e1 = to_na(&(*p1 - *p0));
    let e2 = to_na(&(*p2 - *p0));
    let n = e1.cross(&e2);
    let len = n.norm();
    if len <= f64::EPSILON {
        return None;
    }
    Some(Mat3::from_columns(&[e1, e2, n / len.sqrt()]))
}

impl DifferentialCoords {
    pub fn new(reference: &Surface) -> Result<Self, ShapeError> {
        let mut inverse_frames = Vec::with_capacity(reference.face_count());
        let mut areas = Vec::with_capacity(reference.face_count());
        for (face, t) in reference.triangles().enumerate() {
            let frame = face_frame(&t.p0, &t.p1, &t.p2)
                .and_then(|f| f.try_inverse())
                .ok_or(ShapeError::DegenerateFace { face })?;
            inverse_frames.push(frame);
            areas.push(t.area());
        }
        let total: f64 = areas.iter().sum();
        let sqrt_weights = areas.iter().map(|a| (a / total).sqrt()).collect();
        debug!(
            "differential coordinates over {} faces, reference area {}",
            reference.face_count(),
            total
        );
        Ok(Self {
            reference: reference.clone(),
            inverse_frames,
            sqrt_weights,
        })
    }

    /// The coordinates of the reference surface.
    pub fn origin(&self) -> DifferentialPoint {
        let n = self.reference.face_count();
        DifferentialPoint {
            rotations: vec![Mat3::identity(); n],
            stretches: vec![Mat3::zeros(); n],
        }
    }

    fn check_point(&self, p: &DifferentialPoint) -> Result<(), ShapeError> {
        check_dim(self.reference.face_count(), p.rotations.len())?;
        check_dim(self.reference.face_count(), p.stretches.len())
    }

    /// Reconstructs vertex positions from differential coordinates.
    ///
    /// Solves the weighted least-squares problem of matching every edge of the
    /// result to the reference edge mapped by the face's deformation gradient.
    /// The solution is unique up to translation; it is placed so that its
    /// centroid matches the reference centroid.
    pub fn decode(&self, p: &DifferentialPoint) -> Result<Vec<Vector3>, ShapeError> {
        self.check_point(p)?;
        let reference = &self.reference;
        let n = reference.vertex_count();

        // Laplacian edges (a, b, weight) and right hand sides per axis.
        let mut edges = Vec::with_capacity(reference.face_count() * 3);
        let mut rhs = vec![[0.0; 3]; n];
        for (face, f) in reference.faces().iter().enumerate() {
            let d = p.rotations[face] * lie::sym_exp(&p.stretches[face]);
            let w = self.sqrt_weights[face] * self.sqrt_weights[face];
            let [i0, i1, i2] = f.indices();
            let v = reference.vertices();
            for (a, b) in [(i0, i1), (i1, i2), (i2, i0)] {
                let target = d * to_na(&(v[b] - v[a]));
                edges.push((a, b, w));
                for axis in 0..3 {
                    rhs[b][axis] += w * target[axis];
                    rhs[a][axis] -= w * target[axis];
                }
            }
        }

        let mut solution = vec![[0.0; 3]; n];
        for axis in 0..3 {
            let b: Vec<f64> = rhs.iter().map(|r| r[axis]).collect();
            let x0: Vec<f64> = reference.vertices().iter().map(|v| v[axis]).collect();
            let x = conjugate_gradient(&edges, &b, x0);
            for (s, x) in solution.iter_mut().zip(x) {
                s[axis] = x;
            }
        }

        let mut vertices: Vec<Vector3> = solution
            .iter()
            .map(|s| Vector3::new(s[0], s[1], s[2]))
            .collect();
        let offset = reference.centroid() - centroid(&vertices);
        for v in vertices.iter_mut() {
            *v += offset;
        }
        Ok(vertices)
    }
}

fn centroid(vertices: &[Vector3]) -> Vector3 {
    let mut sum = Vector3::new(0.0, 0.0, 0.0);
    for v in vertices {
        sum += *v;
    }
    sum / vertices.len().max(1) as f64
}

/// Applies the weighted graph Laplacian given by `edges` to `x`.
fn laplacian(edges: &[(usize, usize, f64)], x: &[f64]) -> Vec<f64> {
    let mut y = vec![0.0; x.len()];
    for &(a, b, w) in edges {
        let d = w * (x[a] - x[b]);
        y[a] += d;
        y[b] -= d;
    }
    y
}

/// Solves `L x = b` for the positive semi-definite Laplacian `L`.
///
/// `b` sums to zero, so the system is consistent and CG converges to the
/// solution closest to the translate of the start vector.
fn conjugate_gradient(edges: &[(usize, usize, f64)], b: &[f64], mut x: Vec<f64>) -> Vec<f64> {
    let ax = laplacian(edges, &x);
    let mut r: Vec<f64> = b.iter().zip(&ax).map(|(b, a)| b - a).collect();
    let mut p = r.clone();
    let mut rr = dot(&r, &r);
    let scale = dot(b, b).max(f64::MIN_POSITIVE);
    let max_iterations = 10 * x.len().max(10);
    for iteration in 0..max_iterations {
        if rr <= 1e-28 * scale {
            debug!("reconstruction converged after {} iterations", iteration);
            break;
        }
        let ap = laplacian(edges, &p);
        let pap = dot(&p, &ap);
        if pap <= 0.0 {
            break;
        }
        let alpha = rr / pap;
        for i in 0..x.len() {
            x[i] += alpha * p[i];
            r[i] -= alpha * ap[i];
        }
        let rr_next = dot(&r, &r);
        let beta = rr_next / rr;
        for i in 0..p.len() {
            p[i] = r[i] + beta * p[i];
        }
        rr = rr_next;
    }
    x
}

/// Geodesic regression on SO(3) for one face: residuals
/// `log((start * exp(shift) * exp(t_i * w))^T q_i)` over `x = [shift, w]`.
struct FaceRotation<'a> {
    start: Mat3,
    observed: Vec<Mat3>,
    params: &'a [f64],
}

impl<'a> LeastSquaresProblem for FaceRotation<'a> {
    fn param_dim(&self) -> usize {
        6
    }

    fn residual_dim(&self) -> usize {
        3 * self.observed.len()
    }

    fn residual(&self, x: &[f64], out: &mut [f64]) -> Result<(), ShapeError> {
        let base = self.start * lie::rotation_exp(&Vec3::new(x[0], x[1], x[2]));
        let w = Vec3::new(x[3], x[4], x[5]);
        for ((q, t), chunk) in self
            .observed
            .iter()
            .zip(self.params)
            .zip(out.chunks_exact_mut(3))
        {
            let on_trend = base * lie::rotation_exp(&(w * *t));
            chunk.copy_from_slice(lie::rotation_log(&(on_trend.transpose() * q)).as_slice());
        }
        Ok(())
    }
}

impl ShapeSpace for DifferentialCoords {
    type Point = DifferentialPoint;

    fn dim(&self) -> usize {
        FACE_DIM * self.reference.face_count()
    }

    fn encode(&self, vertices: &[Vector3]) -> Result<DifferentialPoint, ShapeError> {
        check_dim(self.reference.vertex_count(), vertices.len())?;
        let n = self.reference.face_count();
        let mut rotations = Vec::with_capacity(n);
        let mut stretches = Vec::with_capacity(n);
        for (face, (f, inverse)) in self
            .reference
            .faces()
            .iter()
            .zip(&self.inverse_frames)
            .enumerate()
        {
            let [i0, i1, i2] = f.indices();
            let (r, l) = face_frame(&vertices[i0], &vertices[i1], &vertices[i2])
                .and_then(|frame| lie::polar_log(&(frame * inverse)))
                .ok_or(ShapeError::DegenerateFace { face })?;
            rotations.push(r);
            stretches.push(l);
        }
        Ok(DifferentialPoint {
            rotations,
            stretches,
        })
    }

    fn exp(&self, p: &DifferentialPoint, v: &[f64]) -> Result<DifferentialPoint, ShapeError> {
        self.check_point(p)?;
        check_dim(self.dim(), v.len())?;
        let mut q = p.clone();
        for (face, chunk) in v.chunks_exact(FACE_DIM).enumerate() {
            let s = self.sqrt_weights[face];
            let w = Vec3::new(chunk[0], chunk[1], chunk[2]) / s;
            q.rotations[face] = p.rotations[face] * lie::rotation_exp(&w);
            q.stretches[face] = p.stretches[face] + lie::coords_to_sym(&chunk[3..]) / s;
        }
        Ok(q)
    }

    fn log(&self, p: &DifferentialPoint, q: &DifferentialPoint) -> Result<Vec<f64>, ShapeError> {
        self.check_point(p)?;
        self.check_point(q)?;
        let mut v = Vec::with_capacity(self.dim());
        for face in 0..self.reference.face_count() {
            let s = self.sqrt_weights[face];
            let w = lie::rotation_log(&(p.rotations[face].transpose() * q.rotations[face]));
            v.extend(w.iter().map(|x| x * s));
            let l = q.stretches[face] - p.stretches[face];
            v.extend(lie::sym_to_coords(&l).iter().map(|x| x * s));
        }
        Ok(v)
    }

    /// Geodesic regression, solved face by face.
    ///
    /// The squared distance is a weighted sum over faces of independent
    /// rotation and stretch terms, so the least-squares problem splits. The
    /// stretches follow a straight line fitted by ordinary least squares. The
    /// rotations of every face are regressed on SO(3) with Levenberg-Marquardt,
    /// started from a line fitted in the tangent space at the observation
    /// closest to parameter 0.
    fn fit_trend(
        &self,
        points: &[DifferentialPoint],
        params: &[f64],
        config: &RegressionConfig,
    ) -> Result<GeodesicTrend<DifferentialPoint>, ShapeError> {
        let (t_mean, t_var) = check_regression_input(points, params)?;
        for p in points {
            self.check_point(p)?;
        }
        let n = params.len() as f64;
        let start = params
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
            .map(|(i, _)| i)
            .unwrap_or(0);

        let mut base = self.origin();
        let mut velocity = Vec::with_capacity(self.dim());
        let mut unconverged = 0;
        for face in 0..self.reference.face_count() {
            let s = self.sqrt_weights[face];

            let mean = points
                .iter()
                .fold(Mat3::zeros(), |acc, p| acc + p.stretches[face])
                / n;
            let slope = points.iter().zip(params).fold(Mat3::zeros(), |acc, (p, t)| {
                acc + (p.stretches[face] - mean) * ((t - t_mean) / t_var)
            });
            base.stretches[face] = mean - slope * t_mean;

            let r0 = points[start].rotations[face];
            let lifted: Vec<Vec3> = points
                .iter()
                .map(|p| lie::rotation_log(&(r0.transpose() * p.rotations[face])))
                .collect();
            let lifted_mean = lifted.iter().fold(Vec3::zeros(), |acc, u| acc + u) / n;
            let w = lifted.iter().zip(params).fold(Vec3::zeros(), |acc, (u, t)| {
                acc + (u - lifted_mean) * ((t - t_mean) / t_var)
            });
            let shift = lifted_mean - w * t_mean;
            let problem = FaceRotation {
                start: r0,
                observed: points.iter().map(|p| p.rotations[face]).collect(),
                params,
            };
            let x = vec![shift.x, shift.y, shift.z, w.x, w.y, w.z];
            let solution = levenberg_marquardt(&problem, x, config)?;
            if !solution.converged {
                unconverged += 1;
            }
            let x = solution.x;
            base.rotations[face] = r0 * lie::rotation_exp(&Vec3::new(x[0], x[1], x[2]));
            velocity.extend(x[3..].iter().map(|v| v * s));
            velocity.extend(lie::sym_to_coords(&slope).iter().map(|v| v * s));
        }
        if unconverged > 0 {
            warn!(
                "rotation regression did not converge on {} faces within {} iterations",
                unconverged, config.max_iterations
            );
        }
        Ok(GeodesicTrend { base, velocity })
    }
}

//! Geodesic regression and projection for any [`ShapeSpace`].
//!
//! Both work in the tangent coordinates of the space. They assume the velocity
//! of `t -> exp(p, t * v)` is `v` at every point of the geodesic, as
//! [`ShapeSpace`] requires.

use log::{debug, warn};

use super::least_squares::{levenberg_marquardt, LeastSquaresProblem};
use crate::config::RegressionConfig;
use crate::space::{dot, norm, GeodesicTrend, ShapeError, ShapeSpace};

/// Geodesics shorter than this are treated as a single point.
const MIN_LENGTH: f64 = 1e-12;

/// Checks regression input and returns the mean and spread of `params`.
pub(crate) fn check_regression_input<P>(
    points: &[P],
    params: &[f64],
) -> Result<(f64, f64), ShapeError> {
    if points.len() != params.len() {
        return Err(ShapeError::LengthMismatch {
            points: points.len(),
            params: params.len(),
        });
    }
    if points.len() < 2 {
        return Err(ShapeError::NotEnoughPoints(points.len()));
    }
    let n = params.len() as f64;
    let t_mean = params.iter().sum::<f64>() / n;
    let t_var: f64 = params.iter().map(|t| (t - t_mean).powi(2)).sum();
    if t_var == 0.0 {
        return Err(ShapeError::DegenerateParameters);
    }
    Ok((t_mean, t_var))
}

/// Fits a geodesic `t -> exp(base, t * velocity)` to `points` observed at `params`.
///
/// Minimizes `sum_i dist(exp(base, t_i * velocity), q_i)^2`. The start is found
/// by iterated tangent-space least squares: the points are lifted into the
/// tangent space at the current base, a straight line is fitted there, and the
/// base is moved to the line's value at parameter 0. Levenberg-Marquardt over
/// `(base, velocity)` then refines it, with the base perturbed through `exp`.
///
/// The Jacobian is taken by finite differences over all `2 * dim` parameters,
/// so spaces of high dimension should override [`ShapeSpace::fit_trend`].
pub fn fit_geodesic<S: ShapeSpace + ?Sized>(
    space: &S,
    points: &[S::Point],
    params: &[f64],
    config: &RegressionConfig,
) -> Result<GeodesicTrend<S::Point>, ShapeError> {
    let start = tangent_fit(space, points, params, config)?;
    let problem = GeodesicProblem {
        space,
        base: &start.base,
        points,
        params,
    };
    let mut x = vec![0.0; space.dim()];
    x.extend_from_slice(&start.velocity);
    let solution = levenberg_marquardt(&problem, x, config)?;
    if !solution.converged {
        warn!(
            "geodesic regression did not converge within {} iterations",
            config.max_iterations
        );
    }
    let (shift, velocity) = solution.x.split_at(space.dim());
    Ok(GeodesicTrend {
        base: space.exp(&start.base, shift)?,
        velocity: velocity.to_vec(),
    })
}

/// Iterated tangent-space least squares. Exact in flat spaces.
fn tangent_fit<S: ShapeSpace + ?Sized>(
    space: &S,
    points: &[S::Point],
    params: &[f64],
    config: &RegressionConfig,
) -> Result<GeodesicTrend<S::Point>, ShapeError> {
    let (t_mean, t_var) = check_regression_input(points, params)?;
    let n = params.len() as f64;

    // Start from the observation closest to parameter 0.
    let start = params
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let mut base = points[start].clone();
    let mut velocity = vec![0.0; space.dim()];

    for iteration in 0..config.max_iterations {
        let lifted = points
            .iter()
            .map(|p| space.log(&base, p))
            .collect::<Result<Vec<_>, _>>()?;
        let mut mean = vec![0.0; space.dim()];
        for u in &lifted {
            for (m, x) in mean.iter_mut().zip(u) {
                *m += x / n;
            }
        }
        velocity.iter_mut().for_each(|v| *v = 0.0);
        for (u, t) in lifted.iter().zip(params) {
            let dt = (t - t_mean) / t_var;
            for ((v, x), m) in velocity.iter_mut().zip(u).zip(&mean) {
                *v += dt * (x - m);
            }
        }
        let intercept: Vec<f64> = mean
            .iter()
            .zip(&velocity)
            .map(|(m, v)| m - v * t_mean)
            .collect();
        base = space.exp(&base, &intercept)?;
        if norm(&intercept) <= config.tolerance {
            debug!(
                "tangent-space regression converged after {} iterations",
                iteration + 1
            );
            break;
        }
    }
    Ok(GeodesicTrend { base, velocity })
}

/// Residuals `log(exp(exp(base, shift), t_i * velocity), q_i)` over
/// `x = [shift, velocity]`.
struct GeodesicProblem<'a, S: ShapeSpace + ?Sized> {
    space: &'a S,
    base: &'a S::Point,
    points: &'a [S::Point],
    params: &'a [f64],
}

impl<'a, S: ShapeSpace + ?Sized> LeastSquaresProblem for GeodesicProblem<'a, S> {
    fn param_dim(&self) -> usize {
        2 * self.space.dim()
    }

    fn residual_dim(&self) -> usize {
        self.points.len() * self.space.dim()
    }

    fn residual(&self, x: &[f64], out: &mut [f64]) -> Result<(), ShapeError> {
        let dim = self.space.dim();
        let (shift, velocity) = x.split_at(dim);
        let base = self.space.exp(self.base, shift)?;
        for ((q, t), chunk) in self
            .points
            .iter()
            .zip(self.params)
            .zip(out.chunks_exact_mut(dim))
        {
            let v: Vec<f64> = velocity.iter().map(|v| v * t).collect();
            let on_trend = self.space.exp(&base, &v)?;
            chunk.copy_from_slice(&self.space.log(&on_trend, q)?);
        }
        Ok(())
    }
}

/// Closest point to `p` on the geodesic through `x` and `y`.
///
/// The geodesic is not bounded by its endpoints: the result may lie before `x`
/// or beyond `y`. Gauss-Newton on the geodesic parameter, started from the
/// projection in the tangent space at `x`.
pub fn project_to_geodesic<S: ShapeSpace + ?Sized>(
    space: &S,
    x: &S::Point,
    y: &S::Point,
    p: &S::Point,
    config: &RegressionConfig,
) -> Result<S::Point, ShapeError> {
    let v = space.log(x, y)?;
    let vv = dot(&v, &v);
    if float_eq::float_eq!(vv, 0.0, abs <= MIN_LENGTH * MIN_LENGTH) {
        return Err(ShapeError::DegenerateGeodesic);
    }
    let along = |s: f64| -> Result<S::Point, ShapeError> {
        let w: Vec<f64> = v.iter().map(|x| x * s).collect();
        space.exp(x, &w)
    };

    let mut s = dot(&space.log(x, p)?, &v) / vv;
    let mut closest = along(s)?;
    for iteration in 0..config.max_iterations {
        let ds = dot(&space.log(&closest, p)?, &v) / vv;
        s += ds;
        closest = along(s)?;
        if ds.abs() <= config.tolerance {
            debug!("projection converged after {} iterations", iteration + 1);
            return Ok(closest);
        }
    }
    warn!(
        "projection onto geodesic did not converge within {} iterations",
        config.max_iterations
    );
    Ok(closest)
}

/// Position of `p` along the geodesic from `x` to `y`, as a fraction of its length.
///
/// `p` is projected onto the geodesic first. The ratio is 0 at `x` and 1 at `y`.
/// It is not clamped: projections beyond `y` give values above 1, and since it
/// is a ratio of distances, projections before `x` count positively.
pub fn geodesic_ratio<S: ShapeSpace + ?Sized>(
    space: &S,
    x: &S::Point,
    y: &S::Point,
    p: &S::Point,
    config: &RegressionConfig,
) -> Result<f64, ShapeError> {
    let length = space.dist(x, y)?;
    if float_eq::float_eq!(length, 0.0, abs <= MIN_LENGTH) {
        return Err(ShapeError::DegenerateGeodesic);
    }
    let projected = space.project_to_geodesic(x, y, p, config)?;
    Ok(space.dist(x, &projected)? / length)
}

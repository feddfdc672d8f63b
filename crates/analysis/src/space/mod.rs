//! Shape spaces.
//!
//! A shape space turns vertex positions of a surface into a point on a
//! Riemannian manifold and offers the few geometric primitives the experiment
//! needs: exponential and logarithmic maps, geodesic distance, closest-point
//! projection onto a geodesic and degree-1 geodesic regression.

use sundials_mesh::Vector3;

use crate::config::RegressionConfig;
use crate::regression::geodesic;

mod differential;
mod euclidean;
mod lie;

pub use differential::*;
pub use euclidean::*;

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ShapeError {
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("face {face} is degenerate")]
    DegenerateFace { face: usize },
    #[error("the geodesic endpoints coincide")]
    DegenerateGeodesic,
    #[error("regression parameters have no spread")]
    DegenerateParameters,
    #[error("{points} points but {params} parameters")]
    LengthMismatch { points: usize, params: usize },
    #[error("regression needs at least 2 points, got {0}")]
    NotEnoughPoints(usize),
}

/// A Riemannian shape space.
///
/// Tangent vectors are plain coordinate vectors of length [`ShapeSpace::dim`]
/// in an orthonormal frame, so the metric is the Euclidean dot product of
/// those coordinates. The frame is chosen such that the velocity of
/// `t -> exp(p, t * v)` is `v` for every `t`; the generic geodesic algorithms
/// rely on this.
pub trait ShapeSpace {
    type Point: Clone;

    /// Dimension of the tangent spaces.
    fn dim(&self) -> usize;

    /// Embeds the vertex positions of a surface into the space.
    fn encode(&self, vertices: &[Vector3]) -> Result<Self::Point, ShapeError>;

    fn exp(&self, p: &Self::Point, v: &[f64]) -> Result<Self::Point, ShapeError>;

    fn log(&self, p: &Self::Point, q: &Self::Point) -> Result<Vec<f64>, ShapeError>;

    fn dist(&self, p: &Self::Point, q: &Self::Point) -> Result<f64, ShapeError> {
        Ok(norm(&self.log(p, q)?))
    }

    /// Closest point to `p` on the (unbounded) geodesic through `x` and `y`.
    fn project_to_geodesic(
        &self,
        x: &Self::Point,
        y: &Self::Point,
        p: &Self::Point,
        config: &RegressionConfig,
    ) -> Result<Self::Point, ShapeError> {
        geodesic::project_to_geodesic(self, x, y, p, config)
    }

    /// Fits a geodesic `t -> point` through `points` observed at `params`.
    fn fit_trend(
        &self,
        points: &[Self::Point],
        params: &[f64],
        config: &RegressionConfig,
    ) -> Result<GeodesicTrend<Self::Point>, ShapeError> {
        geodesic::fit_geodesic(self, points, params, config)
    }
}

/// A geodesic parameterized over the regression parameter.
///
/// `base` is the point at parameter 0 and `velocity` the tangent at `base`
/// per unit of parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct GeodesicTrend<P> {
    pub base: P,
    pub velocity: Vec<f64>,
}

impl<P: Clone> GeodesicTrend<P> {
    pub fn eval<S: ShapeSpace<Point = P> + ?Sized>(
        &self,
        space: &S,
        t: f64,
    ) -> Result<P, ShapeError> {
        let v: Vec<f64> = self.velocity.iter().map(|x| x * t).collect();
        space.exp(&self.base, &v)
    }
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub(crate) fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

pub(crate) fn check_dim(expected: usize, actual: usize) -> Result<(), ShapeError> {
    if expected != actual {
        return Err(ShapeError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

use sundials_mesh::Vector3;

use super::{check_dim, dot, GeodesicTrend, ShapeError, ShapeSpace};
use crate::config::RegressionConfig;
use crate::regression::geodesic::check_regression_input;

/// Flat space of flattened vertex coordinates.
///
/// Geodesics are straight lines, so regression and projection have closed
/// forms. Useful as a baseline engine and wherever the curved geometry is
/// beside the point.
#[derive(Debug, Clone)]
pub struct Euclidean {
    dim: usize,
}

impl Euclidean {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    /// The space of surfaces with `vertex_count` vertices.
    pub fn for_vertices(vertex_count: usize) -> Self {
        Self::new(3 * vertex_count)
    }
}

impl ShapeSpace for Euclidean {
    type Point = Vec<f64>;

    fn dim(&self) -> usize {
        self.dim
    }

    fn encode(&self, vertices: &[Vector3]) -> Result<Vec<f64>, ShapeError> {
        check_dim(self.dim, 3 * vertices.len())?;
        Ok(vertices.iter().flat_map(|v| [v.x, v.y, v.z]).collect())
    }

    /// exp_p(v) = p + v
    fn exp(&self, p: &Vec<f64>, v: &[f64]) -> Result<Vec<f64>, ShapeError> {
        check_dim(self.dim, p.len())?;
        check_dim(self.dim, v.len())?;
        Ok(p.iter().zip(v).map(|(a, b)| a + b).collect())
    }

    /// log_p(q) = q - p
    fn log(&self, p: &Vec<f64>, q: &Vec<f64>) -> Result<Vec<f64>, ShapeError> {
        check_dim(self.dim, p.len())?;
        check_dim(self.dim, q.len())?;
        Ok(q.iter().zip(p).map(|(a, b)| a - b).collect())
    }

    fn project_to_geodesic(
        &self,
        x: &Vec<f64>,
        y: &Vec<f64>,
        p: &Vec<f64>,
        _config: &RegressionConfig,
    ) -> Result<Vec<f64>, ShapeError> {
        let v = self.log(x, y)?;
        let vv = dot(&v, &v);
        if vv == 0.0 {
            return Err(ShapeError::DegenerateGeodesic);
        }
        let s = dot(&self.log(x, p)?, &v) / vv;
        Ok(x.iter().zip(&v).map(|(a, b)| a + s * b).collect())
    }

    /// Ordinary least squares per coordinate.
    fn fit_trend(
        &self,
        points: &[Vec<f64>],
        params: &[f64],
        _config: &RegressionConfig,
    ) -> Result<GeodesicTrend<Vec<f64>>, ShapeError> {
        let (t_mean, t_var) = check_regression_input(points, params)?;
        for p in points {
            check_dim(self.dim, p.len())?;
        }
        let n = params.len() as f64;
        let mut base = vec![0.0; self.dim];
        let mut velocity = vec![0.0; self.dim];
        for k in 0..self.dim {
            let mean = points.iter().map(|p| p[k]).sum::<f64>() / n;
            let slope = points
                .iter()
                .zip(params)
                .map(|(p, t)| (t - t_mean) * (p[k] - mean))
                .sum::<f64>()
                / t_var;
            velocity[k] = slope;
            base[k] = mean - slope * t_mean;
        }
        Ok(GeodesicTrend { base, velocity })
    }
}

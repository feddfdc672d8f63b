//! Damped Gauss-Newton (Levenberg-Marquardt) for small nonlinear least squares.

use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::config::RegressionConfig;
use crate::space::ShapeError;

/// Relative step of the central differences in [`LeastSquaresProblem::jacobian`].
const DIFF_STEP: f64 = 1e-6;

/// A problem `min_x 1/2 |r(x)|^2`.
pub trait LeastSquaresProblem {
    fn param_dim(&self) -> usize;

    fn residual_dim(&self) -> usize;

    /// Fills `out` (length [`residual_dim`](Self::residual_dim)) with `r(x)`.
    fn residual(&self, x: &[f64], out: &mut [f64]) -> Result<(), ShapeError>;

    /// Jacobian of the residual, `residual_dim x param_dim`.
    ///
    /// Defaults to central differences.
    fn jacobian(&self, x: &[f64]) -> Result<DMatrix<f64>, ShapeError> {
        let (m, n) = (self.residual_dim(), self.param_dim());
        let mut jacobian = DMatrix::zeros(m, n);
        let mut shifted = x.to_vec();
        let mut plus = vec![0.0; m];
        let mut minus = vec![0.0; m];
        for k in 0..n {
            let h = DIFF_STEP * x[k].abs().max(1.0);
            shifted[k] = x[k] + h;
            self.residual(&shifted, &mut plus)?;
            shifted[k] = x[k] - h;
            self.residual(&shifted, &mut minus)?;
            shifted[k] = x[k];
            for i in 0..m {
                jacobian[(i, k)] = (plus[i] - minus[i]) / (2.0 * h);
            }
        }
        Ok(jacobian)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub x: Vec<f64>,
    /// `1/2 |r(x)|^2` at the solution.
    pub cost: f64,
    pub iterations: usize,
    pub converged: bool,
}

fn cost_at<P: LeastSquaresProblem + ?Sized>(
    problem: &P,
    x: &[f64],
    r: &mut [f64],
) -> Result<f64, ShapeError> {
    problem.residual(x, r)?;
    Ok(0.5 * r.iter().map(|v| v * v).sum::<f64>())
}

/// Minimizes `1/2 |r(x)|^2` starting from `x`.
///
/// Stops when the gradient or the accepted step falls below
/// `config.tolerance`, or when no damping produces a decrease.
pub fn levenberg_marquardt<P: LeastSquaresProblem + ?Sized>(
    problem: &P,
    mut x: Vec<f64>,
    config: &RegressionConfig,
) -> Result<Solution, ShapeError> {
    let n = problem.param_dim();
    let mut r = vec![0.0; problem.residual_dim()];
    let mut cost = cost_at(problem, &x, &mut r)?;
    let mut trial_r = r.clone();
    let mut lambda = 1e-3;

    for iteration in 0..config.max_iterations {
        let jacobian = problem.jacobian(&x)?;
        let gradient = jacobian.tr_mul(&DVector::from_column_slice(&r));
        if gradient.amax() <= config.tolerance {
            debug!("least squares converged after {} iterations", iteration);
            return Ok(Solution {
                x,
                cost,
                iterations: iteration,
                converged: true,
            });
        }
        let normal = jacobian.tr_mul(&jacobian);

        let mut accepted = None;
        while lambda < 1e12 {
            let mut damped = normal.clone();
            for k in 0..n {
                damped[(k, k)] += lambda * normal[(k, k)].max(1e-12);
            }
            let Some(step) = damped.cholesky().map(|c| c.solve(&(-&gradient))) else {
                lambda *= 10.0;
                continue;
            };
            let trial: Vec<f64> = x.iter().zip(step.iter()).map(|(a, b)| a + b).collect();
            let trial_cost = cost_at(problem, &trial, &mut trial_r)?;
            if trial_cost < cost {
                lambda = (lambda / 10.0).max(1e-12);
                accepted = Some((trial, trial_cost, step.norm()));
                break;
            }
            lambda *= 10.0;
        }

        let Some((trial, trial_cost, step)) = accepted else {
            debug!("least squares stalled after {} iterations", iteration);
            return Ok(Solution {
                x,
                cost,
                iterations: iteration,
                converged: true,
            });
        };
        let scale = 1.0 + x.iter().map(|v| v * v).sum::<f64>().sqrt();
        x = trial;
        cost = trial_cost;
        std::mem::swap(&mut r, &mut trial_r);
        if step <= config.tolerance * scale {
            debug!("least squares converged after {} iterations", iteration + 1);
            return Ok(Solution {
                x,
                cost,
                iterations: iteration + 1,
                converged: true,
            });
        }
    }
    Ok(Solution {
        x,
        cost,
        iterations: config.max_iterations,
        converged: false,
    })
}

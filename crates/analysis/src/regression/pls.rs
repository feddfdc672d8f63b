use nalgebra::{DMatrix, DVector, RowDVector};

use crate::config::PlsConfig;
use crate::AnalysisError;

/// Partial least squares regression of a single response (PLS1).
///
/// Fitted with NIPALS. Predictors and response are centered, and scaled to
/// unit sample variance when [`PlsConfig::scale`] is set; constant predictors
/// are left unscaled.
#[derive(Debug, Clone)]
pub struct PlsRegression {
    x_mean: RowDVector<f64>,
    x_std: RowDVector<f64>,
    y_mean: f64,
    y_std: f64,
    /// Regression coefficients in the normalized predictor space.
    coefficients: DVector<f64>,
}

fn sample_std(column: impl Iterator<Item = f64>, n: usize) -> f64 {
    let ss: f64 = column.map(|x| x * x).sum();
    let std = (ss / (n - 1) as f64).sqrt();
    if std > 0.0 {
        std
    } else {
        1.0
    }
}

impl PlsRegression {
    /// Fits `y ~ x` where every row of `x` is one observation.
    pub fn fit(x: &DMatrix<f64>, y: &DVector<f64>, config: &PlsConfig) -> Result<Self, AnalysisError> {
        let (n, m) = x.shape();
        if y.len() != n {
            return Err(AnalysisError::LengthMismatch {
                what: "responses",
                expected: n,
                actual: y.len(),
            });
        }
        if n < 2 {
            return Err(AnalysisError::NotEnoughSamples(n));
        }
        let max_components = n.min(m);
        if config.components == 0 || config.components > max_components {
            return Err(AnalysisError::InvalidComponents {
                requested: config.components,
                max: max_components,
            });
        }

        let x_mean = x.row_mean();
        let mut xs = x.clone();
        for mut row in xs.row_iter_mut() {
            row -= &x_mean;
        }
        let y_mean = y.mean();
        let mut ys = y.add_scalar(-y_mean);

        let (x_std, y_std) = if config.scale {
            let x_std = RowDVector::from_iterator(
                m,
                xs.column_iter().map(|c| sample_std(c.iter().copied(), n)),
            );
            for (mut column, s) in xs.column_iter_mut().zip(x_std.iter()) {
                column /= *s;
            }
            let y_std = sample_std(ys.iter().copied(), n);
            ys /= y_std;
            (x_std, y_std)
        } else {
            (RowDVector::from_element(m, 1.0), 1.0)
        };

        let mut weights = Vec::with_capacity(config.components);
        let mut loadings = Vec::with_capacity(config.components);
        let mut y_loadings = Vec::with_capacity(config.components);
        for _ in 0..config.components {
            // With a single response the NIPALS inner loop converges in one
            // step: the weight is the normalized covariance with the response.
            let covariance = xs.tr_mul(&ys);
            let c_norm = covariance.norm();
            if c_norm <= f64::EPSILON {
                break;
            }
            let w = covariance / c_norm;
            let t = &xs * &w;
            let tt = t.dot(&t);
            if tt <= f64::EPSILON {
                break;
            }
            let p = xs.tr_mul(&t) / tt;
            let q = ys.dot(&t) / tt;
            xs -= &t * p.transpose();
            ys -= &t * q;
            weights.push(w);
            loadings.push(p);
            y_loadings.push(q);
        }
        if weights.is_empty() {
            return Err(AnalysisError::DegenerateResponse);
        }

        let w = DMatrix::from_columns(&weights);
        let p = DMatrix::from_columns(&loadings);
        let q = DVector::from_vec(y_loadings);
        let rotations = &w
            * (p.transpose() * &w)
                .try_inverse()
                .ok_or(AnalysisError::DegenerateResponse)?;
        let coefficients = rotations * q;

        Ok(Self {
            x_mean,
            x_std,
            y_mean,
            y_std,
            coefficients,
        })
    }

    /// Predicts the response for one observation.
    pub fn predict(&self, x: &RowDVector<f64>) -> Result<f64, AnalysisError> {
        if x.len() != self.x_mean.len() {
            return Err(AnalysisError::LengthMismatch {
                what: "predictors",
                expected: self.x_mean.len(),
                actual: x.len(),
            });
        }
        let z = (x - &self.x_mean).component_div(&self.x_std);
        let normalized: f64 = z
            .iter()
            .zip(self.coefficients.iter())
            .map(|(a, b)| a * b)
            .sum();
        Ok(normalized * self.y_std + self.y_mean)
    }
}

//! Leave-one-out cross-validation of the geodesic and PLS latitude predictors.

use log::{debug, info};
use nalgebra::{DMatrix, DVector};

use crate::config::ExperimentConfig;
use crate::regression::{geodesic::geodesic_ratio, PlsRegression};
use crate::space::ShapeSpace;
use crate::AnalysisError;

/// One round of leave-one-out: the held-out sample and everything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub held_out: usize,
    pub training: Vec<usize>,
}

/// The `n` leave-one-out folds, in sample order.
pub fn folds(n: usize) -> Result<Vec<Fold>, AnalysisError> {
    if n < 2 {
        return Err(AnalysisError::NotEnoughSamples(n));
    }
    Ok((0..n)
        .map(|held_out| Fold {
            held_out,
            training: (0..n).filter(|j| *j != held_out).collect(),
        })
        .collect())
}

/// Predictions for one held-out sample, on the normalized latitude scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub index: usize,
    pub truth: f64,
    pub geodesic: f64,
    pub pls: f64,
}

impl Prediction {
    pub fn geodesic_error(&self) -> f64 {
        (self.truth - self.geodesic).abs()
    }

    pub fn pls_error(&self) -> f64 {
        (self.truth - self.pls).abs()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrossValidation {
    pub predictions: Vec<Prediction>,
}

impl CrossValidation {
    pub fn geodesic_errors(&self) -> Vec<f64> {
        self.predictions.iter().map(|p| p.geodesic_error()).collect()
    }

    pub fn pls_errors(&self) -> Vec<f64> {
        self.predictions.iter().map(|p| p.pls_error()).collect()
    }
}

/// Runs leave-one-out cross-validation.
///
/// `points` are the samples encoded in `space`, `raw` holds the centered raw
/// coordinates (one row per sample) used by the PLS baseline, and `t` the
/// normalized latitudes. All three are indexed alike.
///
/// For each held-out sample a geodesic trend and a PLS model are fitted on the
/// remaining samples. The geodesic prediction is the position of the held-out
/// sample's projection along the trend between parameters 0 and 1.
pub fn leave_one_out<S: ShapeSpace + ?Sized>(
    space: &S,
    points: &[S::Point],
    raw: &DMatrix<f64>,
    t: &[f64],
    config: &ExperimentConfig,
) -> Result<CrossValidation, AnalysisError> {
    let n = points.len();
    for (what, actual) in [("latitudes", t.len()), ("raw coordinate rows", raw.nrows())] {
        if actual != n {
            return Err(AnalysisError::LengthMismatch {
                what,
                expected: n,
                actual,
            });
        }
    }

    let mut predictions = Vec::with_capacity(n);
    for fold in folds(n)? {
        let i = fold.held_out;
        info!("Predicting sundial {}", i);

        let train_points: Vec<S::Point> =
            fold.training.iter().map(|j| points[*j].clone()).collect();
        let train_t: Vec<f64> = fold.training.iter().map(|j| t[*j]).collect();

        let trend = space.fit_trend(&train_points, &train_t, &config.regression)?;
        let x = trend.eval(space, 0.0)?;
        let y = trend.eval(space, 1.0)?;
        let geodesic = geodesic_ratio(space, &x, &y, &points[i], &config.regression)?;

        let train_raw = raw.select_rows(fold.training.iter());
        let pls = PlsRegression::fit(&train_raw, &DVector::from_vec(train_t), &config.pls)?
            .predict(&raw.row(i).clone_owned())?;

        debug!(
            "sundial {}: truth {:.4}, geodesic {:.4}, pls {:.4}",
            i, t[i], geodesic, pls
        );
        predictions.push(Prediction {
            index: i,
            truth: t[i],
            geodesic,
            pls,
        });
    }
    Ok(CrossValidation { predictions })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::Euclidean;
    use float_eq::assert_float_eq;

    #[test]
    fn folds_hold_out_each_sample_once() {
        let folds = folds(5).unwrap();
        assert_eq!(folds.len(), 5);
        for (i, fold) in folds.iter().enumerate() {
            assert_eq!(fold.held_out, i);
            assert_eq!(fold.training.len(), 4);
            assert!(!fold.training.contains(&i));
        }
        let mut held_out: Vec<usize> = folds.iter().map(|f| f.held_out).collect();
        held_out.dedup();
        assert_eq!(held_out, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn single_sample_fails_fast() {
        assert!(matches!(folds(1), Err(AnalysisError::NotEnoughSamples(1))));
        let space = Euclidean::new(2);
        let raw = DMatrix::zeros(1, 2);
        assert!(matches!(
            leave_one_out(&space, &[vec![0.0, 0.0]], &raw, &[0.5], &ExperimentConfig::default()),
            Err(AnalysisError::NotEnoughSamples(1))
        ));
    }

    #[test]
    fn rejects_mismatched_inputs() {
        let space = Euclidean::new(1);
        let points = vec![vec![0.0], vec![1.0], vec![2.0]];
        let raw = DMatrix::from_column_slice(3, 1, &[-1.0, 0.0, 1.0]);
        let config = ExperimentConfig::default();
        assert!(matches!(
            leave_one_out(&space, &points, &raw, &[0.0, 1.0], &config),
            Err(AnalysisError::LengthMismatch {
                what: "latitudes",
                ..
            })
        ));
        let short = DMatrix::from_column_slice(2, 1, &[-1.0, 1.0]);
        assert!(matches!(
            leave_one_out(&space, &points, &short, &[0.0, 0.5, 1.0], &config),
            Err(AnalysisError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn points_on_a_line_are_predicted_exactly() {
        let t = [0.0, 0.2, 0.45, 0.7, 1.0];
        let points: Vec<Vec<f64>> = t.iter().map(|t| vec![1.0 + 2.0 * t, 3.0 - t]).collect();
        let raw = DMatrix::from_fn(5, 2, |i, j| points[i][j] - [2.3, 2.55][j]);
        let cv = leave_one_out(
            &Euclidean::new(2),
            &points,
            &raw,
            &t,
            &ExperimentConfig::default(),
        )
        .unwrap();
        assert_eq!(cv.predictions.len(), 5);
        for (p, truth) in cv.predictions.iter().zip(t) {
            assert_eq!(p.truth, truth);
            assert_float_eq!(p.geodesic, truth, abs <= 1e-9);
            assert_float_eq!(p.pls, truth, abs <= 1e-9);
        }
        assert!(cv.geodesic_errors().iter().all(|e| *e >= 0.0 && *e < 1e-9));
        assert!(cv.pls_errors().iter().all(|e| *e >= 0.0 && *e < 1e-9));
    }
}

mod config;
pub mod dataset;
mod experiment;
pub mod procrustes;
pub mod provision;
pub mod regression;
mod report;
pub mod space;
pub mod validation;

pub use config::*;
pub use experiment::*;
pub use report::*;

use sundials_mesh::MeshError;

use crate::dataset::DatasetError;
use crate::space::ShapeError;

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("need at least 2 samples, got {0}")]
    NotEnoughSamples(usize),
    #[error("expected {expected} {what}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("invalid number of PLS components {requested}, must be in 1..={max}")]
    InvalidComponents { requested: usize, max: usize },
    #[error("the response can not be explained by the predictors")]
    DegenerateResponse,
    #[error("rigid alignment failed")]
    AlignmentFailed,
    #[error(transparent)]
    Mesh(#[from] MeshError),
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

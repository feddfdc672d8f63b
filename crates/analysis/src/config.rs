/// Controls generalized Procrustes alignment of the sample surfaces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcrustesConfig {
    /// Also remove isotropic scale.
    pub scaling: bool,
    /// Alignment stops once the mean shape moves less than this (Frobenius norm).
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for ProcrustesConfig {
    fn default() -> Self {
        Self {
            scaling: false,
            tolerance: 1e-11,
            max_iterations: 1000,
        }
    }
}

/// Stopping criteria for the iterative geodesic computations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionConfig {
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlsConfig {
    /// Number of latent components.
    pub components: usize,
    /// Scale predictors and response to unit variance before fitting.
    pub scale: bool,
}

impl Default for PlsConfig {
    fn default() -> Self {
        Self {
            components: 1,
            scale: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExperimentConfig {
    pub procrustes: ProcrustesConfig,
    pub regression: RegressionConfig,
    pub pls: PlsConfig,
}

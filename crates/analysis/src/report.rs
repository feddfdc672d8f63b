use std::fmt;

/// Aggregated absolute errors of one method, in degrees of latitude.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub errors: Vec<f64>,
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
}

impl Summary {
    /// Scales normalized errors back to degrees by the latitude `range`.
    pub fn from_errors(errors: &[f64], range: f64) -> Self {
        let errors: Vec<f64> = errors.iter().map(|e| e * range).collect();
        let n = errors.len().max(1) as f64;
        let mean = errors.iter().sum::<f64>() / n;
        let variance = errors.iter().map(|e| (e - mean).powi(2)).sum::<f64>() / n;
        Self {
            errors,
            mean,
            std: variance.sqrt(),
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} ± {:.2}", self.mean, self.std)
    }
}

/// Errors of the geodesic method next to the PLS baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub geodesic: Summary,
    pub pls: Summary,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Geodesic regression: {}", self.geodesic)?;
        write!(f, "PLS: {}", self.pls)
    }
}

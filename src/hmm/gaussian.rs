//! Diagonal-covariance Gaussian emission density.

use ndarray::{Array1, ArrayView1};
use std::f64::consts::PI;

/// A Gaussian with diagonal covariance, one per hidden state.
///
/// Variances are kept strictly positive by the trainer's variance floor, so
/// the log-density is always finite for finite input.
#[derive(Debug, Clone)]
pub struct DiagGaussian {
    /// Mean vector.
    pub mean: Array1<f64>,
    /// Per-feature variance (the diagonal of the covariance matrix).
    pub var: Array1<f64>,
}

impl DiagGaussian {
    /// Create a new density. Caller guarantees `var` entries are positive.
    pub fn new(mean: Array1<f64>, var: Array1<f64>) -> Self {
        Self { mean, var }
    }

    /// Dimension of the distribution.
    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// Log probability density at a single frame.
    pub fn log_pdf(&self, x: ArrayView1<f64>) -> f64 {
        let mut acc = 0.0;
        for ((&xi, &mu), &v) in x.iter().zip(self.mean.iter()).zip(self.var.iter()) {
            let diff = xi - mu;
            acc += (2.0 * PI * v).ln() + diff * diff / v;
        }
        -0.5 * acc
    }
}

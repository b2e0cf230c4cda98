//! Hidden Markov Model fitting and scoring.
//!
//! The selection and recognition layers only depend on the [`Trainer`]
//! contract; [`GaussianTrainer`] is the shipped implementation, fitting
//! left-to-right diagonal-covariance Gaussian HMMs with bounded Baum-Welch.

pub mod gaussian;
pub mod model;

pub use gaussian::DiagGaussian;
pub use model::{GaussianHmm, GaussianTrainer};

use ndarray::Array2;

use crate::error::{FitError, ScoreError};

/// The fit/score contract between model fitting and everything downstream.
///
/// A trainer fits a model with a requested hidden-state count over a batch of
/// concatenated sequences and scores arbitrary batches against a fitted
/// model. Both operations are fallible: fitting fails on degenerate data and
/// scoring fails where the likelihood is undefined. Callers decide how much
/// of a failure that is — the selection layer treats both as "skip this
/// candidate".
pub trait Trainer {
    /// The fitted model type this trainer produces.
    type Model;

    /// Fit a model with exactly `n_states` hidden states.
    ///
    /// `x` is the concatenated observation matrix (frames x features) and
    /// `lengths` the per-sequence frame counts partitioning its rows. The
    /// same `seed` over the same input must reproduce the same model.
    fn fit(
        &self,
        x: &Array2<f64>,
        lengths: &[usize],
        n_states: usize,
        seed: u64,
    ) -> Result<Self::Model, FitError>;

    /// Total log-likelihood of a batch of sequences under a fitted model.
    fn score(
        &self,
        model: &Self::Model,
        x: &Array2<f64>,
        lengths: &[usize],
    ) -> Result<f64, ScoreError>;
}

/// Configuration for Baum-Welch fitting.
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    /// Maximum number of EM iterations.
    pub max_iter: usize,
    /// Stop when the log-likelihood gain per iteration falls below this.
    pub tol: f64,
    /// Lower bound applied to every emission variance.
    pub var_floor: f64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            tol: 1e-2,
            var_floor: 1e-3,
        }
    }
}

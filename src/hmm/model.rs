//! Left-to-right Gaussian HMM fitted with bounded Baum-Welch EM.
//!
//! All likelihood computation runs in log-space to avoid underflow on long
//! observation sequences. Training handles batches of multiple sequences via
//! the (matrix, lengths) concatenated representation.

use ndarray::{s, Array1, Array2, ArrayView2};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};

use super::gaussian::DiagGaussian;
use super::{Trainer, TrainerConfig};
use crate::error::{FitError, ScoreError};

/// A fitted left-to-right (Bakis) HMM with diagonal Gaussian emissions.
///
/// The transition matrix only carries mass on the self-loop and the
/// single-step advance; those structural zeros are set at initialization and
/// survive re-estimation.
#[derive(Debug, Clone)]
pub struct GaussianHmm {
    start: Array1<f64>,
    trans: Array2<f64>,
    emissions: Vec<DiagGaussian>,
    train_log_likelihood: f64,
}

impl GaussianHmm {
    /// Assemble a model from explicit parameters.
    ///
    /// Intended for constructing reference models by hand; `fit` is the
    /// normal way to obtain one. Rows of `trans` must be stochastic and
    /// `emissions` must hold one density per state.
    pub fn new(start: Array1<f64>, trans: Array2<f64>, emissions: Vec<DiagGaussian>) -> Self {
        debug_assert_eq!(start.len(), emissions.len());
        debug_assert_eq!(trans.nrows(), emissions.len());
        Self {
            start,
            trans,
            emissions,
            train_log_likelihood: f64::NEG_INFINITY,
        }
    }

    /// Number of hidden states.
    pub fn n_states(&self) -> usize {
        self.emissions.len()
    }

    /// Feature width the model was fitted on.
    pub fn n_features(&self) -> usize {
        self.emissions[0].dim()
    }

    /// Initial state distribution.
    pub fn start_probs(&self) -> &Array1<f64> {
        &self.start
    }

    /// State transition matrix.
    pub fn transition_matrix(&self) -> &Array2<f64> {
        &self.trans
    }

    /// Per-state emission densities.
    pub fn emissions(&self) -> &[DiagGaussian] {
        &self.emissions
    }

    /// Log-likelihood of the training batch at the final EM iteration.
    pub fn train_log_likelihood(&self) -> f64 {
        self.train_log_likelihood
    }

    /// Free parameter count `n^2 + 2*n*f - 1` for an `n`-state model over
    /// `f` features, as used by the BIC complexity penalty.
    pub fn n_parameters(&self) -> usize {
        let n = self.n_states();
        let f = self.n_features();
        n * n + 2 * n * f - 1
    }

    /// Total log-likelihood of a batch of sequences under this model.
    ///
    /// # Errors
    ///
    /// Fails if the feature width differs from the model's, if `lengths`
    /// does not partition the rows of `x`, or if any sequence has no finite
    /// path through the model.
    pub fn score(&self, x: &Array2<f64>, lengths: &[usize]) -> Result<f64, ScoreError> {
        if x.ncols() != self.n_features() {
            return Err(ScoreError::FeatureMismatch {
                expected: self.n_features(),
                found: x.ncols(),
            });
        }
        if lengths.is_empty()
            || lengths.iter().any(|&l| l == 0)
            || lengths.iter().sum::<usize>() != x.nrows()
        {
            return Err(ScoreError::BadLengths);
        }
        let log_start = self.start.mapv(f64::ln);
        let log_trans = self.trans.mapv(f64::ln);
        let mut total = 0.0;
        let mut offset = 0;
        for &len in lengths {
            let obs = x.slice(s![offset..offset + len, ..]);
            let logb = emission_logs(&self.emissions, obs);
            let (_, ll) = forward(&log_start, &log_trans, &logb);
            if !ll.is_finite() {
                return Err(ScoreError::Undefined);
            }
            total += ll;
            offset += len;
        }
        Ok(total)
    }
}

/// Baum-Welch trainer for [`GaussianHmm`].
#[derive(Debug, Clone, Default)]
pub struct GaussianTrainer {
    config: TrainerConfig,
}

impl GaussianTrainer {
    /// Trainer with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trainer with an explicit configuration.
    pub fn with_config(config: TrainerConfig) -> Self {
        Self { config }
    }
}

impl Trainer for GaussianTrainer {
    type Model = GaussianHmm;

    fn fit(
        &self,
        x: &Array2<f64>,
        lengths: &[usize],
        n_states: usize,
        seed: u64,
    ) -> Result<GaussianHmm, FitError> {
        fit_left_to_right(&self.config, x, lengths, n_states, seed)
    }

    fn score(
        &self,
        model: &GaussianHmm,
        x: &Array2<f64>,
        lengths: &[usize],
    ) -> Result<f64, ScoreError> {
        model.score(x, lengths)
    }
}

fn validate(x: &Array2<f64>, lengths: &[usize], n_states: usize) -> Result<(), FitError> {
    if n_states == 0 {
        return Err(FitError::ZeroStates);
    }
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(FitError::EmptyObservations);
    }
    if lengths.is_empty()
        || lengths.iter().any(|&l| l == 0)
        || lengths.iter().sum::<usize>() != x.nrows()
    {
        return Err(FitError::BadLengths);
    }
    if x.nrows() < n_states {
        return Err(FitError::TooFewFrames {
            frames: x.nrows(),
            states: n_states,
        });
    }
    Ok(())
}

fn fit_left_to_right(
    config: &TrainerConfig,
    x: &Array2<f64>,
    lengths: &[usize],
    n_states: usize,
    seed: u64,
) -> Result<GaussianHmm, FitError> {
    validate(x, lengths, n_states)?;
    let n = n_states;
    let f = x.ncols();
    let frames = x.nrows() as f64;

    // Bakis initialization: all initial mass on state 0, equal mass on
    // self-loop and advance, terminal state absorbing.
    let mut start = Array1::zeros(n);
    start[0] = 1.0;
    let mut trans = Array2::zeros((n, n));
    for i in 0..n {
        if i + 1 < n {
            trans[[i, i]] = 0.5;
            trans[[i, i + 1]] = 0.5;
        } else {
            trans[[i, i]] = 1.0;
        }
    }

    // Global feature statistics for variance init and jitter scale.
    let mut global_mean = Array1::<f64>::zeros(f);
    for row in x.rows() {
        global_mean += &row;
    }
    global_mean /= frames;
    let mut global_var = Array1::<f64>::zeros(f);
    for row in x.rows() {
        let diff = &row - &global_mean;
        global_var += &(&diff * &diff);
    }
    global_var /= frames;
    global_var.mapv_inplace(|v| v.max(config.var_floor));

    // Uniform segmentation: frame t of a length-L sequence seeds state
    // t*n/L, so every sequence contributes to states in temporal order.
    let mut seg_sum = Array2::<f64>::zeros((n, f));
    let mut seg_count = vec![0usize; n];
    let mut offset = 0;
    for &len in lengths {
        for t in 0..len {
            let j = t * n / len;
            let mut row = seg_sum.row_mut(j);
            row += &x.row(offset + t);
            seg_count[j] += 1;
        }
        offset += len;
    }
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut emissions = Vec::with_capacity(n);
    for j in 0..n {
        let mut mean = if seg_count[j] > 0 {
            seg_sum.row(j).to_owned() / seg_count[j] as f64
        } else {
            global_mean.clone()
        };
        // Seeded jitter breaks symmetry between states that segment to the
        // same frames; scale tracks the feature spread.
        for d in 0..f {
            let z: f64 = StandardNormal.sample(&mut rng);
            mean[d] += 0.01 * global_var[d].sqrt() * z;
        }
        emissions.push(DiagGaussian::new(mean, global_var.clone()));
    }

    let mut prev_ll = f64::NEG_INFINITY;
    let mut last_ll = f64::NEG_INFINITY;
    for iter in 0..config.max_iter {
        let log_start = start.mapv(f64::ln);
        let log_trans = trans.mapv(f64::ln);

        let mut start_acc = Array1::<f64>::zeros(n);
        let mut trans_acc = Array2::<f64>::zeros((n, n));
        let mut gamma_sum = Array1::<f64>::zeros(n);
        let mut mean_acc = Array2::<f64>::zeros((n, f));
        let mut sq_acc = Array2::<f64>::zeros((n, f));
        let mut total_ll = 0.0;

        let mut offset = 0;
        for &len in lengths {
            let obs = x.slice(s![offset..offset + len, ..]);
            let logb = emission_logs(&emissions, obs);
            let (alpha, ll) = forward(&log_start, &log_trans, &logb);
            if !ll.is_finite() {
                return Err(FitError::Diverged);
            }
            let beta = backward(&log_trans, &logb);

            for t in 0..len {
                for j in 0..n {
                    let g = (alpha[[t, j]] + beta[[t, j]] - ll).exp();
                    if g > 0.0 {
                        if t == 0 {
                            start_acc[j] += g;
                        }
                        gamma_sum[j] += g;
                        for d in 0..f {
                            let v = obs[[t, d]];
                            mean_acc[[j, d]] += g * v;
                            sq_acc[[j, d]] += g * v * v;
                        }
                    }
                }
            }
            for t in 0..len.saturating_sub(1) {
                for i in 0..n {
                    if alpha[[t, i]] == f64::NEG_INFINITY {
                        continue;
                    }
                    for j in 0..n {
                        let lt = log_trans[[i, j]];
                        if lt == f64::NEG_INFINITY {
                            continue;
                        }
                        trans_acc[[i, j]] +=
                            (alpha[[t, i]] + lt + logb[[t + 1, j]] + beta[[t + 1, j]] - ll).exp();
                    }
                }
            }
            total_ll += ll;
            offset += len;
        }
        last_ll = total_ll;

        // M-step. Accumulators carry zeros wherever the structure does, so
        // renormalization cannot create a backward transition.
        let start_sum = start_acc.sum();
        if start_sum > 0.0 {
            start = start_acc / start_sum;
        }
        for i in 0..n {
            let row_sum: f64 = trans_acc.row(i).sum();
            if row_sum > 0.0 {
                for j in 0..n {
                    trans[[i, j]] = trans_acc[[i, j]] / row_sum;
                }
            }
        }
        for j in 0..n {
            if gamma_sum[j] > 1e-10 {
                let mut mean = Array1::<f64>::zeros(f);
                let mut var = Array1::<f64>::zeros(f);
                for d in 0..f {
                    let m = mean_acc[[j, d]] / gamma_sum[j];
                    mean[d] = m;
                    var[d] = (sq_acc[[j, d]] / gamma_sum[j] - m * m).max(config.var_floor);
                }
                emissions[j] = DiagGaussian::new(mean, var);
            }
            // States starved of posterior mass keep their previous density.
        }

        if (total_ll - prev_ll).abs() < config.tol {
            log::trace!(
                "EM converged after {} iterations at log-likelihood {:.4}",
                iter + 1,
                total_ll
            );
            break;
        }
        prev_ll = total_ll;
    }

    if !last_ll.is_finite() {
        return Err(FitError::Diverged);
    }
    Ok(GaussianHmm {
        start,
        trans,
        emissions,
        train_log_likelihood: last_ll,
    })
}

/// Numerically stable `log(sum(exp(xs)))` over a slice.
fn log_sum_exp(xs: &[f64]) -> f64 {
    let max = xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    let sum: f64 = xs.iter().map(|&v| (v - max).exp()).sum();
    max + sum.ln()
}

/// Per-frame emission log-densities, frames x states.
fn emission_logs(emissions: &[DiagGaussian], obs: ArrayView2<f64>) -> Array2<f64> {
    let mut logb = Array2::zeros((obs.nrows(), emissions.len()));
    for t in 0..obs.nrows() {
        for (j, g) in emissions.iter().enumerate() {
            logb[[t, j]] = g.log_pdf(obs.row(t));
        }
    }
    logb
}

/// Log-space forward pass; returns the alpha lattice and the sequence
/// log-likelihood.
fn forward(
    log_start: &Array1<f64>,
    log_trans: &Array2<f64>,
    logb: &Array2<f64>,
) -> (Array2<f64>, f64) {
    let t_len = logb.nrows();
    let n = log_start.len();
    let mut alpha = Array2::from_elem((t_len, n), f64::NEG_INFINITY);
    for j in 0..n {
        alpha[[0, j]] = log_start[j] + logb[[0, j]];
    }
    let mut work = vec![f64::NEG_INFINITY; n];
    for t in 1..t_len {
        for j in 0..n {
            for i in 0..n {
                work[i] = alpha[[t - 1, i]] + log_trans[[i, j]];
            }
            alpha[[t, j]] = log_sum_exp(&work) + logb[[t, j]];
        }
    }
    let last: Vec<f64> = alpha.row(t_len - 1).to_vec();
    let ll = log_sum_exp(&last);
    (alpha, ll)
}

/// Log-space backward pass.
fn backward(log_trans: &Array2<f64>, logb: &Array2<f64>) -> Array2<f64> {
    let t_len = logb.nrows();
    let n = log_trans.nrows();
    let mut beta = Array2::zeros((t_len, n));
    let mut work = vec![f64::NEG_INFINITY; n];
    for t in (0..t_len.saturating_sub(1)).rev() {
        for i in 0..n {
            for j in 0..n {
                work[j] = log_trans[[i, j]] + logb[[t + 1, j]] + beta[[t + 1, j]];
            }
            beta[[t, i]] = log_sum_exp(&work);
        }
    }
    beta
}

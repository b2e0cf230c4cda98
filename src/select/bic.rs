//! Bayesian Information Criterion selection.

use crate::hmm::Trainer;
use crate::select::{constant_fallback, fit_candidate, ModelSelector, SelectionContext};

/// Selects the state count minimizing `BIC = -2*logL + p*ln(N)`.
///
/// `logL` is the candidate's log-likelihood over its own training data, `N`
/// the total number of observation frames, and `p = n^2 + 2*n*f - 1` the
/// free-parameter count of an `n`-state diagonal-covariance Gaussian HMM
/// over `f` features. Lower is better: the `p*ln(N)` term penalizes
/// complexity. Comparison is strictly less-than, so the first (smallest)
/// state count wins exact ties.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectorBic;

/// The BIC value for one already-scored candidate.
pub fn bic_score(log_l: f64, n_states: usize, n_features: usize, n_frames: usize) -> f64 {
    let n = n_states as f64;
    let f = n_features as f64;
    let p = n * n + 2.0 * n * f - 1.0;
    -2.0 * log_l + p * (n_frames as f64).ln()
}

impl ModelSelector for SelectorBic {
    fn select<T: Trainer>(&self, ctx: &SelectionContext<'_>, trainer: &T) -> Option<T::Model> {
        let n_features = ctx.index.n_features();
        let n_frames = ctx.index.n_frames();
        let mut best: Option<(f64, T::Model)> = None;
        for n in ctx.params.state_range() {
            let Some(model) = fit_candidate(trainer, ctx, ctx.index, n) else {
                continue;
            };
            let Ok(log_l) = trainer.score(&model, &ctx.index.x, &ctx.index.lengths) else {
                continue;
            };
            let bic = bic_score(log_l, n, n_features, n_frames);
            let better = match &best {
                None => true,
                Some((b, _)) => bic < *b,
            };
            if better {
                best = Some((bic, model));
            }
        }
        match best {
            Some((_, model)) => Some(model),
            None => constant_fallback(ctx, trainer),
        }
    }
}

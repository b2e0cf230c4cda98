//! Discriminative Information Criterion selection.

use crate::hmm::Trainer;
use crate::select::{constant_fallback, fit_candidate, ModelSelector, SelectionContext};

/// Selects the state count maximizing
/// `DIC = logL(word) - mean(logL(model, other words))`.
///
/// A good candidate explains its own word well while explaining every other
/// word poorly, which is what the recognizer ultimately needs. Higher is
/// better; comparison is strictly greater-than, so the first state count
/// reaching the maximum wins ties.
///
/// Cross-word scoring failures contribute negative infinity to the mean
/// instead of aborting the candidate. With a single-word vocabulary there is
/// no anti-evidence at all and the mean term is taken as zero, reducing DIC
/// to the candidate's own log-likelihood.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectorDic;

impl ModelSelector for SelectorDic {
    fn select<T: Trainer>(&self, ctx: &SelectionContext<'_>, trainer: &T) -> Option<T::Model> {
        let mut best: Option<(f64, T::Model)> = None;
        for n in ctx.params.state_range() {
            let Some(model) = fit_candidate(trainer, ctx, ctx.index, n) else {
                continue;
            };
            let Ok(log_l) = trainer.score(&model, &ctx.index.x, &ctx.index.lengths) else {
                continue;
            };
            let mut anti_sum = 0.0;
            let mut anti_count = 0usize;
            for (word, data) in ctx.corpus.iter() {
                if word == ctx.word {
                    continue;
                }
                anti_sum += trainer
                    .score(&model, &data.index.x, &data.index.lengths)
                    .unwrap_or(f64::NEG_INFINITY);
                anti_count += 1;
            }
            let anti_mean = if anti_count == 0 {
                0.0
            } else {
                anti_sum / anti_count as f64
            };
            let dic = log_l - anti_mean;
            let better = match &best {
                None => true,
                Some((b, _)) => dic > *b,
            };
            if better {
                best = Some((dic, model));
            }
        }
        match best {
            Some((_, model)) => Some(model),
            None => constant_fallback(ctx, trainer),
        }
    }
}

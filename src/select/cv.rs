//! Cross-validation selection.

use crate::data::ConcatenatedIndex;
use crate::hmm::Trainer;
use crate::select::{constant_fallback, fit_candidate, ModelSelector, SelectionContext};

/// Selects the state count maximizing mean held-out log-likelihood over
/// k-fold cross-validation of the word's own sequences.
///
/// Folds are contiguous blocks of sequence positions (the first
/// `len % k` folds take one extra sequence), with `k` capped at the number
/// of sequences. Words with fewer than two sequences cannot be folded, so
/// every candidate fails and selection falls back to the constant fit.
///
/// Only the state-count decision survives the folds: the returned model is
/// refit on the word's full concatenated data at the winning count, and the
/// fold-trained models are discarded.
#[derive(Debug, Clone, Copy)]
pub struct SelectorCv {
    /// Upper bound on the number of folds.
    pub n_splits: usize,
}

impl Default for SelectorCv {
    fn default() -> Self {
        Self { n_splits: 3 }
    }
}

impl SelectorCv {
    /// A selector with the default of three splits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mean held-out log-likelihood for one candidate, or `None` when any
    /// fold fails to assemble, fit, or score.
    fn cv_score<T: Trainer>(
        &self,
        ctx: &SelectionContext<'_>,
        trainer: &T,
        n_states: usize,
        k: usize,
    ) -> Option<f64> {
        let folds = fold_positions(ctx.sequences.len(), k);
        let mut total = 0.0;
        for test in &folds {
            let train: Vec<usize> =
                (0..ctx.sequences.len()).filter(|i| !test.contains(i)).collect();
            let train_ix = ConcatenatedIndex::combine(ctx.sequences, &train).ok()?;
            let test_ix = ConcatenatedIndex::combine(ctx.sequences, test).ok()?;
            let model = fit_candidate(trainer, ctx, &train_ix, n_states)?;
            total += trainer.score(&model, &test_ix.x, &test_ix.lengths).ok()?;
        }
        Some(total / folds.len() as f64)
    }
}

impl ModelSelector for SelectorCv {
    fn select<T: Trainer>(&self, ctx: &SelectionContext<'_>, trainer: &T) -> Option<T::Model> {
        let n_seqs = ctx.sequences.len();
        let k = self.n_splits.min(n_seqs);
        let mut best: Option<(f64, usize)> = None;
        if k >= 2 {
            for n in ctx.params.state_range() {
                let Some(score) = self.cv_score(ctx, trainer, n, k) else {
                    continue;
                };
                let better = match &best {
                    None => true,
                    Some((b, _)) => score > *b,
                };
                if better {
                    best = Some((score, n));
                }
            }
        }
        match best {
            // Refit on the full data; the fold models only existed to rank
            // the state counts.
            Some((_, n)) => {
                fit_candidate(trainer, ctx, ctx.index, n).or_else(|| constant_fallback(ctx, trainer))
            }
            None => constant_fallback(ctx, trainer),
        }
    }
}

/// Contiguous fold layout over `len` sequence positions.
fn fold_positions(len: usize, k: usize) -> Vec<Vec<usize>> {
    let base = len / k;
    let extra = len % k;
    let mut folds = Vec::with_capacity(k);
    let mut start = 0;
    for f in 0..k {
        let size = base + usize::from(f < extra);
        folds.push((start..start + size).collect());
        start += size;
    }
    folds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Corpus;
    use crate::select::testing::{flat_sequences, StubTrainer};
    use crate::select::SelectionParams;

    #[test]
    fn fold_layout_matches_contiguous_kfold() {
        assert_eq!(
            fold_positions(5, 3),
            vec![vec![0, 1], vec![2, 3], vec![4]]
        );
        assert_eq!(fold_positions(6, 3), vec![vec![0, 1], vec![2, 3], vec![4, 5]]);
        assert_eq!(fold_positions(2, 2), vec![vec![0], vec![1]]);
    }

    #[test]
    fn final_model_is_refit_on_the_full_sequence_set() {
        let mut corpus = Corpus::new();
        corpus.insert("FISH", flat_sequences(3.0, 5, 4)).unwrap();
        let params = SelectionParams::new().with_state_range(2, 5);
        let ctx = SelectionContext::new(&corpus, "FISH", params).unwrap();
        let model = SelectorCv::new()
            .select(&ctx, &StubTrainer::default())
            .unwrap();
        // Every fold trains on at most 4 of the 5 sequences (16 frames);
        // the returned model saw all 20.
        assert_eq!(model.n_frames, 20);
        // The stub's held-out score peaks where the state count matches the
        // data's first value.
        assert_eq!(model.n_states, 3);
    }

    #[test]
    fn single_sequence_word_falls_back_to_constant() {
        let mut corpus = Corpus::new();
        corpus.insert("RARE", flat_sequences(3.0, 1, 6)).unwrap();
        let params = SelectionParams::new()
            .with_state_range(2, 5)
            .with_constant_states(4);
        let ctx = SelectionContext::new(&corpus, "RARE", params).unwrap();
        let model = SelectorCv::new()
            .select(&ctx, &StubTrainer::default())
            .unwrap();
        assert_eq!(model.n_states, 4);
        assert_eq!(model.n_frames, 6);
    }

    #[test]
    fn two_sequences_cap_the_fold_count() {
        let mut corpus = Corpus::new();
        corpus.insert("FISH", flat_sequences(3.0, 2, 4)).unwrap();
        let params = SelectionParams::new().with_state_range(2, 5);
        let ctx = SelectionContext::new(&corpus, "FISH", params).unwrap();
        // Two sequences make exactly two folds; selection still runs.
        let model = SelectorCv::new()
            .select(&ctx, &StubTrainer::default())
            .unwrap();
        assert_eq!(model.n_states, 3);
        assert_eq!(model.n_frames, 8);
    }

    #[test]
    fn failing_candidates_are_skipped_not_fatal() {
        let mut corpus = Corpus::new();
        corpus.insert("FISH", flat_sequences(3.0, 5, 4)).unwrap();
        // The would-be winner cannot fit anywhere, in folds or in full.
        let trainer = StubTrainer {
            fail_fit: vec![3],
            ..Default::default()
        };
        let params = SelectionParams::new().with_state_range(2, 5);
        let ctx = SelectionContext::new(&corpus, "FISH", params).unwrap();
        let model = SelectorCv::new().select(&ctx, &trainer).unwrap();
        // Next-best under the stub rule is either neighbor of 3; the range
        // scan meets 2 first.
        assert_eq!(model.n_states, 2);
        assert_eq!(model.n_frames, 20);
    }

    #[test]
    fn exhausted_search_falls_back_to_constant() {
        let mut corpus = Corpus::new();
        corpus.insert("FISH", flat_sequences(3.0, 5, 4)).unwrap();
        let trainer = StubTrainer {
            fail_fit: vec![2, 3, 4, 5],
            ..Default::default()
        };
        let params = SelectionParams::new()
            .with_state_range(2, 5)
            .with_constant_states(6);
        let ctx = SelectionContext::new(&corpus, "FISH", params).unwrap();
        let model = SelectorCv::new().select(&ctx, &trainer).unwrap();
        assert_eq!(model.n_states, 6);
    }
}

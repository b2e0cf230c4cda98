//! Model-selection strategies for per-word HMM topology.
//!
//! Each strategy searches a range of hidden-state counts for one vocabulary
//! word and returns the single fitted model it judges best:
//!
//! - [`SelectorConstant`] fits one fixed state count, no search.
//! - [`SelectorBic`] minimizes the Bayesian Information Criterion.
//! - [`SelectorDic`] maximizes the Discriminative Information Criterion.
//! - [`SelectorCv`] maximizes mean held-out log-likelihood across folds.
//!
//! Fit and score failures demote a candidate instead of aborting the search;
//! when every candidate in range fails, the adaptive selectors fall back to
//! the constant-state-count fit. `select` therefore never errors: its only
//! "failure" mode is `None`, when even the fallback cannot be fitted.

pub mod bic;
pub mod constant;
pub mod cv;
pub mod dic;

pub use bic::SelectorBic;
pub use constant::SelectorConstant;
pub use cv::SelectorCv;
pub use dic::SelectorDic;

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use ndarray::Array2;
use rayon::prelude::*;

use crate::data::{ConcatenatedIndex, Corpus};
use crate::error::DataError;
use crate::hmm::Trainer;

/// Search bounds and fitting defaults shared by every selector.
///
/// The defaults match the classic isolated-sign setup: search [2, 10]
/// states, fall back to 3, seed 14.
#[derive(Debug, Clone)]
pub struct SelectionParams {
    /// Smallest state count to try (inclusive).
    pub min_states: usize,
    /// Largest state count to try (inclusive).
    pub max_states: usize,
    /// Deterministic fallback state count.
    pub constant_states: usize,
    /// Seed handed to every fit for reproducibility.
    pub seed: u64,
    /// Emit per-candidate fit diagnostics via `log`.
    pub verbose: bool,
}

impl Default for SelectionParams {
    fn default() -> Self {
        Self {
            min_states: 2,
            max_states: 10,
            constant_states: 3,
            seed: 14,
            verbose: false,
        }
    }
}

impl SelectionParams {
    /// Parameters with the standard defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Customize the inclusive state-count search range.
    pub fn with_state_range(mut self, min_states: usize, max_states: usize) -> Self {
        self.min_states = min_states;
        self.max_states = max_states;
        self
    }

    /// Customize the constant fallback state count.
    pub fn with_constant_states(mut self, constant_states: usize) -> Self {
        self.constant_states = constant_states;
        self
    }

    /// Customize the fitting seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Enable per-candidate diagnostics.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// The inclusive candidate range.
    pub fn state_range(&self) -> RangeInclusive<usize> {
        self.min_states..=self.max_states
    }
}

/// Read-only per-word view a selector works against.
///
/// Borrows the word's own sequences and concatenated index plus the whole
/// corpus (DIC scores candidates against every other word). Built once per
/// word and immutable for the lifetime of a `select` call.
#[derive(Debug)]
pub struct SelectionContext<'a> {
    /// The word being selected for.
    pub word: &'a str,
    /// The word's raw sequences, needed for fold construction.
    pub sequences: &'a [Array2<f64>],
    /// The word's sequences in concatenated form.
    pub index: &'a ConcatenatedIndex,
    /// The full vocabulary, for cross-word scoring.
    pub corpus: &'a Corpus,
    /// Search bounds and defaults.
    pub params: SelectionParams,
}

impl<'a> SelectionContext<'a> {
    /// Build the context for one word of the corpus.
    ///
    /// # Errors
    ///
    /// Fails if the word is not in the corpus.
    pub fn new(
        corpus: &'a Corpus,
        word: &'a str,
        params: SelectionParams,
    ) -> Result<Self, DataError> {
        let data = corpus
            .get(word)
            .ok_or_else(|| DataError::UnknownWord(word.to_string()))?;
        Ok(Self {
            word,
            sequences: &data.sequences,
            index: &data.index,
            corpus,
            params,
        })
    }
}

/// A model-selection strategy: pick one fitted model for the context's word.
pub trait ModelSelector {
    /// Run the strategy's search and return its chosen model.
    ///
    /// Never fails outright: strategies with a search range fall back to the
    /// constant-state-count fit on total search failure, and `None` only
    /// means that even that fit did not converge.
    fn select<T: Trainer>(&self, ctx: &SelectionContext<'_>, trainer: &T) -> Option<T::Model>;
}

/// Fit one candidate state count over the given index, demoting any fit
/// failure to an absent candidate.
///
/// This is the shared "base model" primitive: diagnostics are keyed by word
/// and state count and gated on the context's verbosity, and the outcome is
/// never an error.
pub(crate) fn fit_candidate<T: Trainer>(
    trainer: &T,
    ctx: &SelectionContext<'_>,
    index: &ConcatenatedIndex,
    n_states: usize,
) -> Option<T::Model> {
    match trainer.fit(&index.x, &index.lengths, n_states, ctx.params.seed) {
        Ok(model) => {
            if ctx.params.verbose {
                log::debug!("model created for {} with {} states", ctx.word, n_states);
            }
            Some(model)
        }
        Err(err) => {
            if ctx.params.verbose {
                log::debug!("failure on {} with {} states: {}", ctx.word, n_states, err);
            }
            None
        }
    }
}

/// The deterministic fallback fit at the constant state count.
pub(crate) fn constant_fallback<T: Trainer>(
    ctx: &SelectionContext<'_>,
    trainer: &T,
) -> Option<T::Model> {
    fit_candidate(trainer, ctx, ctx.index, ctx.params.constant_states)
}

/// Select a model for every word in the corpus, in parallel.
///
/// Each per-word selection only reads shared corpus data, so the words are
/// fanned out over rayon's pool. Words whose selection returns `None` (even
/// the constant fallback failed) are left out of the result.
pub fn select_vocabulary<S, T>(
    corpus: &Corpus,
    selector: &S,
    trainer: &T,
    params: &SelectionParams,
) -> BTreeMap<String, T::Model>
where
    S: ModelSelector + Sync,
    T: Trainer + Sync,
    T::Model: Send,
{
    let words: Vec<&str> = corpus.iter().map(|(w, _)| w).collect();
    words
        .par_iter()
        .filter_map(|word| {
            let ctx = SelectionContext::new(corpus, word, params.clone()).ok()?;
            selector
                .select(&ctx, trainer)
                .map(|model| (word.to_string(), model))
        })
        .collect()
}

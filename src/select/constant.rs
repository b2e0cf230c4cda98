//! The no-search baseline selector.

use crate::hmm::Trainer;
use crate::select::{fit_candidate, ModelSelector, SelectionContext};

/// Always fits the context's constant state count.
///
/// No search and no retry: if that one fit fails, the result is `None`.
/// The adaptive selectors use this same fit as their exhaustion fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectorConstant;

impl ModelSelector for SelectorConstant {
    fn select<T: Trainer>(&self, ctx: &SelectionContext<'_>, trainer: &T) -> Option<T::Model> {
        fit_candidate(trainer, ctx, ctx.index, ctx.params.constant_states)
    }
}

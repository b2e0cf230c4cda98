//! HMM topology selection and isolated-word recognition.
//!
//! Given a vocabulary of words, each observed as a handful of variable-length
//! feature sequences, this crate picks the best hidden-state count for each
//! word's left-to-right Gaussian HMM (by a fixed constant, BIC, DIC, or
//! cross-validation) and classifies unseen sequences against the selected
//! per-word models.

pub mod data;
pub mod error;
pub mod hmm;
pub mod recognize;
pub mod select;

pub use data::{ConcatenatedIndex, Corpus, TestSet, WordData};
pub use error::{DataError, FitError, ScoreError};
pub use hmm::{DiagGaussian, GaussianHmm, GaussianTrainer, Trainer, TrainerConfig};
pub use recognize::{recognize, GuessList, ScoreTable};
pub use select::{
    select_vocabulary, ModelSelector, SelectionContext, SelectionParams, SelectorBic,
    SelectorConstant, SelectorCv, SelectorDic,
};

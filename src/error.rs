use thiserror::Error;

/// Errors raised while assembling observation data.
///
/// These are construction-time errors: once a [`crate::data::ConcatenatedIndex`]
/// or [`crate::data::Corpus`] exists, its invariants hold for its lifetime.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataError {
    /// No sequences were provided for a word or a fold.
    #[error("no observation sequences provided")]
    Empty,
    /// A sequence contained zero frames.
    #[error("sequence {0} has zero frames")]
    EmptySequence(usize),
    /// The declared lengths do not partition the observation matrix rows.
    #[error("lengths sum to {sum} but the matrix has {rows} rows")]
    LengthMismatch { sum: usize, rows: usize },
    /// Sequences for one word disagree on feature width.
    #[error("sequence {index} has {found} features, expected {expected}")]
    FeatureMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },
    /// A fold referenced a sequence position that does not exist.
    #[error("sequence position {0} out of range")]
    BadPosition(usize),
    /// A selection was requested for a word the corpus does not hold.
    #[error("word {0:?} is not in the corpus")]
    UnknownWord(String),
}

/// Reasons an HMM fit can fail.
///
/// Fit failures are never fatal to a selection search: the selection layer
/// converts them to an absent candidate and moves on.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FitError {
    /// The requested state count was zero.
    #[error("cannot fit an HMM with zero states")]
    ZeroStates,
    /// Fewer total frames than hidden states.
    #[error("{frames} frames cannot support {states} states")]
    TooFewFrames { frames: usize, states: usize },
    /// The observation matrix was empty.
    #[error("empty observation matrix")]
    EmptyObservations,
    /// The declared lengths do not partition the observation matrix rows.
    #[error("lengths do not partition the observation rows")]
    BadLengths,
    /// EM produced a non-finite log-likelihood (degenerate covariance or
    /// a zero-probability path through the training data).
    #[error("log-likelihood diverged during EM")]
    Diverged,
}

/// Reasons scoring a sequence against a fitted model can fail.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScoreError {
    /// The sequence's feature width does not match the model's.
    #[error("sequence has {found} features, model expects {expected}")]
    FeatureMismatch { expected: usize, found: usize },
    /// The declared lengths do not partition the observation matrix rows.
    #[error("lengths do not partition the observation rows")]
    BadLengths,
    /// The forward pass produced a non-finite log-likelihood.
    #[error("log-likelihood is undefined for this sequence")]
    Undefined,
}

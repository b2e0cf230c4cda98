//! Observation data for training and recognition.
//!
//! Words are observed as variable-length sequences of feature frames. The
//! fitting layer consumes a word's sequences as one concatenated matrix plus
//! the list of per-sequence lengths, so both representations are kept
//! together: the raw sequence list (needed for cross-validation folds) and
//! the precomputed [`ConcatenatedIndex`].

use std::collections::BTreeMap;

use ndarray::{concatenate, Array2, Axis};

use crate::error::DataError;

/// A batch of variable-length sequences flattened into one matrix.
///
/// `lengths` partitions the rows of `x` into contiguous per-sequence blocks,
/// in the original sequence order. The constructor enforces the partition
/// invariant, so consumers may slice by running offset without re-checking.
#[derive(Debug, Clone)]
pub struct ConcatenatedIndex {
    /// Stacked observation frames, one row per frame.
    pub x: Array2<f64>,
    /// Frame count of each sequence; sums to `x.nrows()`.
    pub lengths: Vec<usize>,
}

impl ConcatenatedIndex {
    /// Wrap an already-flattened matrix and its length partition.
    ///
    /// # Errors
    ///
    /// Fails if `lengths` is empty, contains a zero, or does not sum to the
    /// row count of `x`.
    pub fn new(x: Array2<f64>, lengths: Vec<usize>) -> Result<Self, DataError> {
        if lengths.is_empty() {
            return Err(DataError::Empty);
        }
        if let Some(i) = lengths.iter().position(|&l| l == 0) {
            return Err(DataError::EmptySequence(i));
        }
        let sum: usize = lengths.iter().sum();
        if sum != x.nrows() {
            return Err(DataError::LengthMismatch { sum, rows: x.nrows() });
        }
        Ok(Self { x, lengths })
    }

    /// Concatenate a list of per-sequence matrices, preserving their order.
    ///
    /// # Errors
    ///
    /// Fails if the list is empty, any sequence has zero frames, or the
    /// sequences disagree on feature width.
    pub fn from_sequences(sequences: &[Array2<f64>]) -> Result<Self, DataError> {
        if sequences.is_empty() {
            return Err(DataError::Empty);
        }
        let n_features = sequences[0].ncols();
        let mut lengths = Vec::with_capacity(sequences.len());
        for (i, seq) in sequences.iter().enumerate() {
            if seq.nrows() == 0 {
                return Err(DataError::EmptySequence(i));
            }
            if seq.ncols() != n_features {
                return Err(DataError::FeatureMismatch {
                    index: i,
                    expected: n_features,
                    found: seq.ncols(),
                });
            }
            lengths.push(seq.nrows());
        }
        let views: Vec<_> = sequences.iter().map(|s| s.view()).collect();
        let x = concatenate(Axis(0), &views).map_err(|_| DataError::Empty)?;
        Ok(Self { x, lengths })
    }

    /// Build the index for a subset of sequence positions, in the order
    /// given. Cross-validation folds are assembled this way.
    ///
    /// # Errors
    ///
    /// Fails if `positions` is empty or references a sequence that does not
    /// exist, or on the same shape errors as [`Self::from_sequences`].
    pub fn combine(sequences: &[Array2<f64>], positions: &[usize]) -> Result<Self, DataError> {
        if positions.is_empty() {
            return Err(DataError::Empty);
        }
        let mut picked = Vec::with_capacity(positions.len());
        for &p in positions {
            let seq = sequences.get(p).ok_or(DataError::BadPosition(p))?;
            picked.push(seq.clone());
        }
        Self::from_sequences(&picked)
    }

    /// Total number of frames across all sequences.
    pub fn n_frames(&self) -> usize {
        self.x.nrows()
    }

    /// Feature width of each frame.
    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }

    /// Number of sequences in the batch.
    pub fn n_sequences(&self) -> usize {
        self.lengths.len()
    }
}

/// One vocabulary word's training material: the raw sequence list alongside
/// its concatenated form.
#[derive(Debug, Clone)]
pub struct WordData {
    /// Ordered observation sequences, frames x features each.
    pub sequences: Vec<Array2<f64>>,
    /// The sequences flattened for batch fitting.
    pub index: ConcatenatedIndex,
}

/// The training vocabulary: word -> sequences, with per-word concatenated
/// indices built at insertion time.
///
/// Words iterate in lexicographic order (`BTreeMap`), which fixes the
/// deterministic scan order the recognizer's tie-break relies on.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    words: BTreeMap<String, WordData>,
}

impl Corpus {
    /// Create an empty corpus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a word and its observation sequences.
    ///
    /// Replaces any existing entry for the same word.
    ///
    /// # Errors
    ///
    /// Fails if the sequence list is empty or shape-inconsistent; the corpus
    /// is left unchanged in that case.
    pub fn insert(&mut self, word: impl Into<String>, sequences: Vec<Array2<f64>>) -> Result<(), DataError> {
        let index = ConcatenatedIndex::from_sequences(&sequences)?;
        self.words.insert(word.into(), WordData { sequences, index });
        Ok(())
    }

    /// Look up one word's data.
    pub fn get(&self, word: &str) -> Option<&WordData> {
        self.words.get(word)
    }

    /// Iterate words in lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &WordData)> {
        self.words.iter().map(|(w, d)| (w.as_str(), d))
    }

    /// Number of words in the vocabulary.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether the vocabulary is empty.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// An ordered set of test items to recognize.
///
/// Iteration order is insertion order; recognizer output rows are
/// positionally aligned with it.
#[derive(Debug, Clone, Default)]
pub struct TestSet {
    items: Vec<(String, ConcatenatedIndex)>,
}

impl TestSet {
    /// Create an empty test set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a test item.
    pub fn push(&mut self, id: impl Into<String>, index: ConcatenatedIndex) {
        self.items.push((id.into(), index));
    }

    /// Iterate items in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConcatenatedIndex)> {
        self.items.iter().map(|(id, ix)| (id.as_str(), ix))
    }

    /// Number of test items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the set holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    fn seq(rows: usize, fill: f64) -> Array2<f64> {
        Array2::from_elem((rows, 2), fill)
    }

    #[test]
    fn index_partitions_rows() {
        let ix = ConcatenatedIndex::from_sequences(&[seq(3, 0.0), seq(5, 1.0)]).unwrap();
        assert_eq!(ix.n_frames(), 8);
        assert_eq!(ix.lengths, vec![3, 5]);
        assert_eq!(ix.n_features(), 2);
        // Order preserved: first block is the first sequence.
        assert_eq!(ix.x[[0, 0]], 0.0);
        assert_eq!(ix.x[[3, 0]], 1.0);
    }

    #[test]
    fn index_rejects_bad_lengths() {
        let x = arr2(&[[1.0, 2.0], [3.0, 4.0]]);
        assert!(matches!(
            ConcatenatedIndex::new(x.clone(), vec![3]),
            Err(DataError::LengthMismatch { sum: 3, rows: 2 })
        ));
        assert!(matches!(
            ConcatenatedIndex::new(x, vec![2, 0]),
            Err(DataError::EmptySequence(1))
        ));
    }

    #[test]
    fn index_rejects_mixed_widths() {
        let a = Array2::from_elem((2, 2), 0.0);
        let b = Array2::from_elem((2, 3), 0.0);
        assert!(matches!(
            ConcatenatedIndex::from_sequences(&[a, b]),
            Err(DataError::FeatureMismatch { index: 1, .. })
        ));
    }

    #[test]
    fn combine_selects_positions_in_order() {
        let seqs = vec![seq(2, 0.0), seq(3, 1.0), seq(4, 2.0)];
        let ix = ConcatenatedIndex::combine(&seqs, &[2, 0]).unwrap();
        assert_eq!(ix.lengths, vec![4, 2]);
        assert_eq!(ix.x[[0, 0]], 2.0);
        assert!(matches!(
            ConcatenatedIndex::combine(&seqs, &[5]),
            Err(DataError::BadPosition(5))
        ));
    }

    #[test]
    fn corpus_iterates_sorted() {
        let mut corpus = Corpus::new();
        corpus.insert("FISH", vec![seq(4, 0.0)]).unwrap();
        corpus.insert("BOOK", vec![seq(4, 1.0)]).unwrap();
        let words: Vec<_> = corpus.iter().map(|(w, _)| w).collect();
        assert_eq!(words, vec!["BOOK", "FISH"]);
    }

    #[test]
    fn corpus_rejects_empty_word() {
        let mut corpus = Corpus::new();
        assert!(corpus.insert("EMPTY", vec![]).is_err());
        assert!(corpus.is_empty());
    }
}

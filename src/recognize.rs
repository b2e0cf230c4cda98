//! Classification of test items against the trained per-word models.

use std::collections::BTreeMap;

use crate::data::TestSet;
use crate::hmm::Trainer;

/// One row of word -> log-likelihood per test item, in test-set order.
pub type ScoreTable = Vec<BTreeMap<String, f64>>;

/// The argmax word of each score row, in test-set order.
pub type GuessList = Vec<String>;

/// Score every test item against every trained word model and take the
/// best-scoring word as the guess.
///
/// Output rows are positionally aligned with the test set's iteration
/// order — downstream accuracy computation depends on that alignment. A
/// scoring failure for one (item, model) pair records negative infinity in
/// that cell and never aborts the row. Ties resolve to the first word
/// encountered in the model map's (lexicographic) scan order; when no model
/// produces a finite score, the guess degenerates to an empty string.
pub fn recognize<T: Trainer>(
    trainer: &T,
    models: &BTreeMap<String, T::Model>,
    test_set: &TestSet,
) -> (ScoreTable, GuessList) {
    let mut probabilities = Vec::with_capacity(test_set.len());
    let mut guesses = Vec::with_capacity(test_set.len());
    for (_id, index) in test_set.iter() {
        let mut row = BTreeMap::new();
        let mut best_score = f64::NEG_INFINITY;
        let mut best_guess = String::new();
        for (word, model) in models {
            let score = trainer
                .score(model, &index.x, &index.lengths)
                .unwrap_or(f64::NEG_INFINITY);
            row.insert(word.clone(), score);
            if score > best_score {
                best_score = score;
                best_guess = word.clone();
            }
        }
        probabilities.push(row);
        guesses.push(best_guess);
    }
    (probabilities, guesses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ConcatenatedIndex, Corpus, TestSet};
    use crate::hmm::GaussianTrainer;
    use crate::select::testing::{flat_sequences, StubModel, StubTrainer};
    use crate::select::{select_vocabulary, SelectionParams, SelectorBic};
    use ndarray::Array2;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rand_distr::{Distribution, Normal};

    fn stub_models(counts: &[(&str, usize)]) -> BTreeMap<String, StubModel> {
        counts
            .iter()
            .map(|&(w, n)| {
                (
                    w.to_string(),
                    StubModel {
                        n_states: n,
                        n_frames: 0,
                    },
                )
            })
            .collect()
    }

    fn item(value: f64, frames: usize) -> ConcatenatedIndex {
        ConcatenatedIndex::from_sequences(&[Array2::from_elem((frames, 2), value)]).unwrap()
    }

    #[test]
    fn rows_and_guesses_align_with_the_test_set() {
        let models = stub_models(&[("BOOK", 2), ("FISH", 5)]);
        let mut test_set = TestSet::new();
        test_set.push("item-0", item(5.0, 4)); // matches FISH's 5 states
        test_set.push("item-1", item(2.0, 4)); // matches BOOK's 2 states
        test_set.push("item-2", item(4.0, 4)); // closer to FISH

        let (probabilities, guesses) = recognize(&StubTrainer::default(), &models, &test_set);
        assert_eq!(probabilities.len(), 3);
        assert_eq!(guesses.len(), 3);
        assert_eq!(guesses, vec!["FISH", "BOOK", "FISH"]);
        // Each guess is the argmax of its own row.
        for (row, guess) in probabilities.iter().zip(&guesses) {
            let best = row
                .iter()
                .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
                .unwrap();
            assert_eq!(best.0, guess);
        }
    }

    #[test]
    fn scoring_failure_records_negative_infinity() {
        let models = stub_models(&[("BOOK", 2), ("FISH", 5)]);
        let trainer = StubTrainer {
            fail_score: vec![5],
            ..Default::default()
        };
        let mut test_set = TestSet::new();
        test_set.push("item-0", item(5.0, 4));
        let (probabilities, guesses) = recognize(&trainer, &models, &test_set);
        assert_eq!(probabilities[0]["FISH"], f64::NEG_INFINITY);
        assert!(probabilities[0]["BOOK"].is_finite());
        // FISH would have won; with its model unusable the item goes to BOOK.
        assert_eq!(guesses[0], "BOOK");
    }

    #[test]
    fn no_usable_model_degenerates_to_empty_guess() {
        let models = stub_models(&[("BOOK", 2)]);
        let trainer = StubTrainer {
            fail_score: vec![2],
            ..Default::default()
        };
        let mut test_set = TestSet::new();
        test_set.push("item-0", item(5.0, 4));
        let (probabilities, guesses) = recognize(&trainer, &models, &test_set);
        assert_eq!(probabilities[0]["BOOK"], f64::NEG_INFINITY);
        assert_eq!(guesses[0], "");
    }

    #[test]
    fn ties_resolve_to_the_first_word_scanned() {
        // Two models with the same state count score identically; the
        // lexicographically first word keeps the guess.
        let models = stub_models(&[("BOOK", 3), ("FISH", 3)]);
        let mut test_set = TestSet::new();
        test_set.push("item-0", item(3.0, 4));
        let (_, guesses) = recognize(&StubTrainer::default(), &models, &test_set);
        assert_eq!(guesses[0], "BOOK");
    }

    /// End-to-end: two words with well-separated feature distributions, BIC
    /// selection, then recognition of a sequence drawn near one of them.
    #[test]
    fn recognizes_the_resembling_word() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let noise = Normal::new(0.0, 0.3).unwrap();
        let word_sequences = |center: f64, rng: &mut ChaCha8Rng| {
            (0..3)
                .map(|_| {
                    let mut seq = Array2::zeros((10, 2));
                    for t in 0..10 {
                        let base = if t < 5 { center } else { center + 2.0 };
                        seq[[t, 0]] = base + noise.sample(rng);
                        seq[[t, 1]] = base + noise.sample(rng);
                    }
                    seq
                })
                .collect::<Vec<_>>()
        };

        let mut corpus = Corpus::new();
        corpus.insert("FISH", word_sequences(0.0, &mut rng)).unwrap();
        corpus.insert("BOOK", word_sequences(10.0, &mut rng)).unwrap();

        let trainer = GaussianTrainer::new();
        let params = SelectionParams::new().with_state_range(2, 3);
        let models = select_vocabulary(&corpus, &SelectorBic, &trainer, &params);
        assert_eq!(models.len(), 2);

        let mut test_set = TestSet::new();
        let probe = word_sequences(0.0, &mut rng).remove(0);
        test_set.push("probe", ConcatenatedIndex::from_sequences(&[probe]).unwrap());

        let (probabilities, guesses) = recognize(&trainer, &models, &test_set);
        assert_eq!(guesses[0], "FISH");
        assert!(probabilities[0]["FISH"] > probabilities[0]["BOOK"]);
    }

    #[test]
    fn fallback_chain_still_yields_a_usable_vocabulary() {
        // Even with BIC's whole range failing, selection degrades to the
        // constant fit and recognition keeps working.
        let mut corpus = Corpus::new();
        corpus.insert("BOOK", flat_sequences(2.0, 3, 5)).unwrap();
        corpus.insert("FISH", flat_sequences(5.0, 3, 5)).unwrap();
        let trainer = StubTrainer {
            fail_fit: vec![6, 7],
            ..Default::default()
        };
        let params = SelectionParams::new()
            .with_state_range(6, 7)
            .with_constant_states(2);
        let models = select_vocabulary(&corpus, &SelectorBic, &trainer, &params);
        assert_eq!(models.len(), 2);
        assert!(models.values().all(|m| m.n_states == 2));

        let mut test_set = TestSet::new();
        test_set.push("item-0", item(2.0, 4));
        let (probabilities, guesses) = recognize(&trainer, &models, &test_set);
        assert_eq!(probabilities.len(), 1);
        // Both models are identical 2-state fits; the tie goes to BOOK.
        assert_eq!(guesses[0], "BOOK");
    }
}

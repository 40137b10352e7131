//! Random down-sampling of frequent words.

use crate::{real, Rng};

/// Discards occurrences of frequent words with a probability that grows with
/// their frequency, while keeping the frequency ranking the same.
#[derive(Debug, Clone, Copy)]
pub struct Subsampler {
    /// `threshold * n_train_words`: the count at which a word becomes "frequent".
    k: real,
}

impl Subsampler {
    /// Returns `None` when `threshold` is zero, meaning every word is kept.
    pub fn new(threshold: real, n_train_words: u64) -> Option<Self> {
        (threshold > 0.0).then(|| Subsampler {
            k: threshold * n_train_words as real,
        })
    }

    /// The probability of keeping one occurrence of a word seen `count`
    /// times; values above 1 mean "always".
    pub fn keep_probability(&self, count: u64) -> real {
        let f = count as real;
        ((f / self.k).sqrt() + 1.0) * self.k / f
    }

    pub fn keep(&self, count: u64, rng: &mut Rng) -> bool {
        self.keep_probability(count) >= rng.rand_real()
    }
}

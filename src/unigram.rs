//! The unigram table for drawing negative samples.

use crate::{Error, Result, Vocabulary};

/// Default number of slots in the table.
pub const TABLE_SIZE: usize = 100_000_000;

/// Smoothing exponent applied to word counts.
pub const POWER: f64 = 0.75;

/// A table in which each word id fills a share of slots proportional to
/// `count^0.75`, so that a uniform slot index is a draw from the smoothed
/// unigram distribution.
#[derive(Debug, Clone)]
pub struct UnigramTable {
    table: Vec<u32>,
}

impl UnigramTable {
    pub fn new(vocab: &Vocabulary, table_size: usize) -> Result<Self> {
        if vocab.is_empty() {
            return Err(Error::EmptyVocabulary);
        }
        if table_size == 0 {
            return Err(Error::InvalidConfig("table_size must be positive".into()));
        }

        let weight = |i: usize| (vocab[i].count as f64).powf(POWER);
        let train_words_pow = (0..vocab.len()).map(weight).sum::<f64>();

        let last = vocab.len() - 1;
        let mut table = Vec::with_capacity(table_size);
        let mut i = 0;
        let mut d1 = weight(i) / train_words_pow;
        for a in 0..table_size {
            table.push(i as u32);
            // Round-off leaves the tail of the table to the last word.
            if (a as f64 / table_size as f64) > d1 && i < last {
                i += 1;
                d1 += weight(i) / train_words_pow;
            }
        }

        tracing::info!(table_size, vocab_size = vocab.len(), "built unigram table");
        Ok(UnigramTable { table })
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Map a uniformly random integer to a word id. Values of `random` at or
    /// beyond the table size wrap around.
    pub fn sample(&self, random: u64) -> usize {
        self.table[(random % self.table.len() as u64) as usize] as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VocabConfig;

    fn vocab(counts: &[(&str, usize)]) -> Vocabulary {
        let tokens = counts
            .iter()
            .flat_map(|&(w, n)| std::iter::repeat(w).take(n))
            .collect::<Vec<&str>>();
        let config = VocabConfig {
            min_count: 0,
            hash_size: 1000,
        };
        Vocabulary::fit(tokens, &config).unwrap()
    }

    #[test]
    fn slot_shares_follow_power_law() {
        let vocab = vocab(&[("a", 1000), ("b", 300), ("c", 100), ("d", 10), ("e", 1)]);
        let table = UnigramTable::new(&vocab, 1_000_000).unwrap();
        let mut slots = vec![0usize; vocab.len()];
        for r in 0..table.len() as u64 {
            slots[table.sample(r)] += 1;
        }
        let z: f64 = vocab.iter().map(|e| (e.count as f64).powf(POWER)).sum();
        for (entry, &n) in vocab.iter().zip(&slots) {
            let expected = (entry.count as f64).powf(POWER) / z;
            let got = n as f64 / table.len() as f64;
            assert!((got - expected).abs() < 1e-4, "{entry:?}: {got} vs {expected}");
        }
    }

    #[test]
    fn ids_are_monotone_and_in_range() {
        let vocab = vocab(&[("a", 5), ("b", 4), ("c", 3), ("d", 2), ("e", 1)]);
        let table = UnigramTable::new(&vocab, 1000).unwrap();
        let ids: Vec<usize> = (0..1000).map(|r| table.sample(r)).collect();
        assert_eq!(ids[0], 0);
        assert_eq!(ids[999], vocab.len() - 1);
        assert!(ids.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn single_word() {
        let vocab = vocab(&[("a", 3)]);
        let table = UnigramTable::new(&vocab, 10).unwrap();
        assert!((0..100).all(|r| table.sample(r) == 0));
    }

    #[test]
    fn tiny_table_never_overruns() {
        let vocab = vocab(&[("a", 1), ("b", 1), ("c", 1), ("d", 1)]);
        let table = UnigramTable::new(&vocab, 2).unwrap();
        assert_eq!(table.len(), 2);
        assert!((0..2).all(|r| table.sample(r) < vocab.len()));
    }

    #[test]
    fn rejects_empty_vocabulary() {
        let vocab = vocab(&[]);
        assert!(matches!(
            UnigramTable::new(&vocab, 100),
            Err(Error::EmptyVocabulary)
        ));
    }
}

//! Training options.

use serde::{Deserialize, Serialize};

use crate::{real, Error, Result};

/// Options controlling how a [`Vocabulary`](crate::Vocabulary) is fitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabConfig {
    /// Words occurring `min_count` times or fewer are discarded.
    pub min_count: u64,

    /// Number of slots in the open-addressing hash index. At most
    /// `0.7 * hash_size` words fit in the vocabulary.
    pub hash_size: usize,
}

impl Default for VocabConfig {
    fn default() -> Self {
        VocabConfig {
            min_count: 5,
            hash_size: 30_000_000,
        }
    }
}

impl VocabConfig {
    pub fn validate(&self) -> Result<()> {
        if self.hash_size == 0 {
            return Err(Error::InvalidConfig("hash_size must be positive".into()));
        }
        if self.hash_size >= u32::MAX as usize {
            return Err(Error::InvalidConfig(format!(
                "hash_size must be below {}",
                u32::MAX
            )));
        }
        Ok(())
    }
}

/// Options for the CBOW trainer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Length of each embedding vector.
    pub embedding_dim: usize,
    pub learn_hierarchical_softmax: bool,
    pub learn_negative_sampling: bool,
    pub starting_alpha: real,
    /// Maximum distance between the pivot and a context word.
    pub window: usize,
    /// Negative examples drawn per pivot.
    pub negative: usize,
    /// Words more frequent than this are randomly down-sampled. 0 disables
    /// subsampling.
    pub subsampling_threshold: real,
    /// Maximum number of tokens per training window.
    pub sentence_len: usize,
    pub num_threads: usize,
    pub epochs: usize,
    /// Seed of the linear congruential generator. Worker `k` uses `seed + 1 + k`.
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            embedding_dim: 100,
            learn_hierarchical_softmax: true,
            learn_negative_sampling: false,
            starting_alpha: 0.025,
            window: 5,
            negative: 5,
            subsampling_threshold: 1e-4,
            sentence_len: 1000,
            num_threads: 1,
            epochs: 1,
            seed: 0,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.learn_hierarchical_softmax && !self.learn_negative_sampling {
            return Err(Error::NoLearningMode);
        }
        let positive = [
            ("embedding_dim", self.embedding_dim),
            ("window", self.window),
            ("sentence_len", self.sentence_len),
            ("num_threads", self.num_threads),
            ("epochs", self.epochs),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(Error::InvalidConfig(format!("{name} must be positive")));
            }
        }
        if self.starting_alpha.is_nan() || self.starting_alpha <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "starting_alpha must be positive, got {}",
                self.starting_alpha
            )));
        }
        if self.subsampling_threshold < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "subsampling_threshold must not be negative, got {}",
                self.subsampling_threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        VocabConfig::default().validate().unwrap();
        TrainConfig::default().validate().unwrap();
    }

    #[test]
    fn both_modes_disabled() {
        let config = TrainConfig {
            learn_hierarchical_softmax: false,
            learn_negative_sampling: false,
            ..TrainConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::NoLearningMode)));
    }

    #[test]
    fn zero_window() {
        let config = TrainConfig {
            window: 0,
            ..TrainConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn learning_rate_must_be_positive() {
        for starting_alpha in [0.0, -0.1, real::NAN] {
            let config = TrainConfig {
                starting_alpha,
                ..TrainConfig::default()
            };
            assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
        }
    }

    #[test]
    fn zero_hash_size() {
        let config = VocabConfig {
            hash_size: 0,
            ..VocabConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }
}

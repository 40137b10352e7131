use std::io;

use thiserror::Error;

/// Errors produced while building a vocabulary or training a model.
#[derive(Debug, Error)]
pub enum Error {
    /// More words survived the `min_count` cutoff than the hash index can hold
    /// at a load factor of 0.7. Raise `min_count` or `hash_size` and start over.
    #[error(
        "vocabulary of {size} words is too large for a hash index of {capacity} slots; \
         increase min_count or hash_size"
    )]
    VocabularyTooLarge { size: usize, capacity: usize },

    /// Neither hierarchical softmax nor negative sampling is enabled.
    #[error("at least one of hierarchical softmax or negative sampling must be enabled")]
    NoLearningMode,

    #[error("the vocabulary is empty; no word occurs more than min_count times")]
    EmptyVocabulary,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to allocate a weight matrix of {elems} elements")]
    Allocation { elems: usize },

    #[error("a training worker panicked")]
    WorkerPanicked,

    #[error("malformed embedding file on line {line}: {reason}")]
    BadVectors { line: usize, reason: String },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("model serialization failed: {0}")]
    Bincode(#[from] bincode::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

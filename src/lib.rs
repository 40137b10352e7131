//! Word embeddings learned with the continuous-bag-of-words (CBOW) architecture.
//!
//! The pipeline is: a token stream ([`corpus`]) is counted into a hashed,
//! Huffman-coded [`Vocabulary`]; a [`UnigramTable`] is built from the
//! vocabulary's counts for negative sampling; and [`Cbow`] trains the input
//! embeddings with hierarchical softmax, negative sampling, or both.

pub mod cbow;
pub mod config;
pub mod corpus;
mod error;
pub mod huffman;
mod matrix;
pub mod model;
pub mod rng;
pub mod sigmoid;
pub mod subsample;
pub mod unigram;
pub mod vectors;
pub mod vocab;

pub use cbow::Cbow;
pub use config::{TrainConfig, VocabConfig};
pub use error::{Error, Result};
pub use model::Model;
pub use rng::Rng;
pub use sigmoid::ExpTable;
pub use unigram::UnigramTable;
pub use vectors::Embeddings;
pub use vocab::{VocabEntry, Vocabulary};

#[allow(non_camel_case_types)]
pub type real = f32; // Precision of float numbers

/// Tokens longer than `MAX_STRING - 1` bytes are truncated.
pub const MAX_STRING: usize = 100;

pub fn norm(v: &[real]) -> real {
    v.iter().copied().map(|e| e * e).sum::<real>().sqrt()
}

/// Scale `v` to unit length. A zero vector is left alone.
pub fn normalize(v: &mut [real]) {
    let len = norm(v);
    if len > 0.0 {
        for e in v {
            *e /= len;
        }
    }
}

pub fn dot(a: &[real], b: &[real]) -> real {
    assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(&a, &b)| a * b).sum()
}

//! A complete trained model, saved with bincode.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{dot, real, Result, TrainConfig, VocabEntry};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    pub config: TrainConfig,
    /// Vocabulary entries, with their Huffman codes and paths.
    pub vocab: Vec<VocabEntry>,
    /// Input vectors, `vocab.len()` rows of `config.embedding_dim`.
    pub embeddings: Vec<real>,
    /// Hierarchical-softmax weights, one row per internal node. Empty if the
    /// model was trained without hierarchical softmax.
    pub weights: Vec<real>,
}

fn sigmoid(x: real) -> real {
    1.0 / (1.0 + (-x).exp())
}

impl Model {
    pub fn save(&self, path: &Path) -> Result<()> {
        self.write(BufWriter::new(File::create(path)?))
    }

    /// Serialize to `out` and flush it.
    pub fn write<W: Write>(&self, mut out: W) -> Result<()> {
        bincode::serialize_into(&mut out, self)?;
        out.flush()?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let input = BufReader::new(File::open(path)?);
        Ok(bincode::deserialize_from(input)?)
    }

    pub fn size(&self) -> usize {
        self.config.embedding_dim
    }

    /// Estimate P(b|a), the probability the hierarchical softmax assigns to
    /// word `b` given the input vector of word `a` alone. Returns `None` if
    /// the model has no hierarchical-softmax weights.
    pub fn predict(&self, a: usize, b: usize) -> Option<real> {
        let size = self.size();
        let entry = &self.vocab[b];
        if self.weights.is_empty() && !entry.path.is_empty() {
            return None;
        }
        let va = &self.embeddings[a * size..][..size];
        let p: real = entry
            .path
            .iter()
            .zip(&entry.code)
            .map(|(&node, &bit)| {
                let sign = if bit == 0 { 1.0 } else { -1.0 };
                sigmoid(sign * dot(va, &self.weights[node as usize * size..][..size]))
            })
            .product();
        Some(p)
    }
}

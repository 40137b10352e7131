//! The hashed vocabulary: word counts, integer ids, and Huffman codes.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::huffman::HuffmanTree;
use crate::{Error, Result, VocabConfig};

/// Marks an unused slot of the hash index.
const EMPTY: u32 = u32::MAX;

/// Largest fraction of the hash index the vocabulary may occupy.
const MAX_LOAD_FACTOR: f64 = 0.7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabEntry {
    pub word: Vec<u8>,
    pub count: u64,
    /// Huffman code, root first.
    pub code: Vec<u8>,
    /// Internal nodes visited from the root down; `code[d]` is the decision at `path[d]`.
    pub path: Vec<u32>,
}

/// Polynomial string hash, `sum(c[i] * 257^(len - 1 - i)) mod hash_size`.
pub fn word_hash(word: &[u8], hash_size: usize) -> usize {
    let m = hash_size as u64;
    word.iter().fold(0u64, |h, &c| (h * 257 + c as u64) % m) as usize
}

/// Words sorted by descending count, with an open-addressing hash index from
/// word to id and a Huffman tree over the counts.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    entries: Vec<VocabEntry>,
    /// Linear-probing table of vocabulary ids.
    hash: Vec<u32>,
    /// Number of tokens in the stream the vocabulary was fitted on, kept or not.
    n_train_words: u64,
    tree: HuffmanTree,
}

impl Vocabulary {
    /// Count every token, drop words seen `min_count` times or fewer, and
    /// build the hash index and Huffman tree.
    ///
    /// Words with equal counts keep the order of their first occurrence.
    pub fn fit<I, W>(tokens: I, config: &VocabConfig) -> Result<Self>
    where
        I: IntoIterator<Item = W>,
        W: AsRef<[u8]>,
    {
        config.validate()?;

        let mut ids: HashMap<Vec<u8>, usize> = HashMap::new();
        let mut counts: Vec<(Vec<u8>, u64)> = Vec::new();
        let mut n_train_words = 0u64;
        for token in tokens {
            let word = token.as_ref();
            n_train_words += 1;
            match ids.get(word) {
                Some(&i) => counts[i].1 += 1,
                None => {
                    ids.insert(word.to_vec(), counts.len());
                    counts.push((word.to_vec(), 1));
                }
            }
        }
        drop(ids);

        // Words occurring min_count times or less will be discarded from the vocab
        counts.retain(|&(_, count)| count > config.min_count);
        Self::from_counts(counts, n_train_words, config)
    }

    /// Build a vocabulary from already-counted words. Nothing is filtered;
    /// the words are stably sorted by descending count.
    pub fn from_counts(
        mut counts: Vec<(Vec<u8>, u64)>,
        n_train_words: u64,
        config: &VocabConfig,
    ) -> Result<Self> {
        config.validate()?;
        let capacity = config.hash_size;
        if counts.len() as f64 > capacity as f64 * MAX_LOAD_FACTOR {
            return Err(Error::VocabularyTooLarge {
                size: counts.len(),
                capacity,
            });
        }
        counts.sort_by_key(|&(_, count)| Reverse(count));

        let tree = HuffmanTree::build(&counts.iter().map(|&(_, c)| c).collect::<Vec<u64>>());
        let entries: Vec<VocabEntry> = counts
            .into_iter()
            .enumerate()
            .map(|(i, (word, count))| {
                let (code, path) = tree.code_and_path(i);
                VocabEntry {
                    word,
                    count,
                    code,
                    path,
                }
            })
            .collect();

        let mut hash = vec![EMPTY; capacity];
        for (i, entry) in entries.iter().enumerate() {
            let mut slot = word_hash(&entry.word, capacity);
            while hash[slot] != EMPTY {
                slot = (slot + 1) % capacity;
            }
            hash[slot] = i as u32;
        }

        tracing::info!(
            vocab_size = entries.len(),
            train_words = n_train_words,
            "built vocabulary"
        );
        Ok(Vocabulary {
            entries,
            hash,
            n_train_words,
            tree,
        })
    }

    /// Returns the id of `word`, or `None` if it is not in the vocabulary.
    pub fn index_of(&self, word: &[u8]) -> Option<usize> {
        let capacity = self.hash.len();
        let mut slot = word_hash(word, capacity);
        loop {
            match self.hash[slot] {
                EMPTY => return None,
                i if self.entries[i as usize].word == word => return Some(i as usize),
                _ => slot = (slot + 1) % capacity,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[VocabEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, VocabEntry> {
        self.entries.iter()
    }

    pub fn n_train_words(&self) -> u64 {
        self.n_train_words
    }

    pub fn hash_size(&self) -> usize {
        self.hash.len()
    }

    pub fn tree(&self) -> &HuffmanTree {
        &self.tree
    }
}

impl Index<usize> for Vocabulary {
    type Output = VocabEntry;

    fn index(&self, i: usize) -> &VocabEntry {
        &self.entries[i]
    }
}

//! Writing and reading trained word vectors.

use std::cmp::{Ordering, Reverse};
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::ops::Index;
use std::path::Path;

use ordered_float::OrderedFloat;

use crate::{dot, norm, real, Error, Result, Vocabulary};

/// On-disk layout of an embedding file. Both start with a
/// `"<num_words> <size>\n"` header line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `word v_1 v_2 ... v_d\n`
    Text,
    /// `word `, then `size` native-endian `f32`s, then `\n`.
    Binary,
}

/// Write the vocabulary as `word<TAB>count` lines, in id order.
pub fn write_vocab<W: Write>(vocab: &Vocabulary, mut out: W) -> Result<()> {
    for entry in vocab.iter() {
        out.write_all(&entry.word)?;
        writeln!(out, "\t{}", entry.count)?;
    }
    out.flush()?;
    Ok(())
}

/// A word → vector mapping, words in vocabulary order.
#[derive(Debug, Clone)]
pub struct Embeddings {
    /// Embedding vector length (number of dimensions).
    size: usize,

    vocab: Vec<Vec<u8>>,

    /// `embeddings[k * size..(k+1) * size]` is the vector embedding for word `k`.
    embeddings: Vec<real>,
}

impl Index<usize> for Embeddings {
    type Output = [real];

    fn index(&self, i: usize) -> &[real] {
        &self.embeddings[i * self.size..][..self.size]
    }
}

fn bad(line: usize, reason: impl Into<String>) -> Error {
    Error::BadVectors {
        line,
        reason: reason.into(),
    }
}

impl Embeddings {
    pub fn new(vocab: Vec<Vec<u8>>, size: usize, embeddings: Vec<real>) -> Self {
        assert_eq!(vocab.len() * size, embeddings.len());
        Embeddings {
            size,
            vocab,
            embeddings,
        }
    }

    pub fn num_words(&self) -> usize {
        self.vocab.len()
    }

    /// Returns the vector size.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Get the index for a word. Exact match only, case-sensitive.
    pub fn lookup_word(&self, word: &[u8]) -> Option<usize> {
        self.vocab.iter().position(|v| v == word)
    }

    /// Get the word for a word-index. Panics if `word` is out of range.
    pub fn word(&self, word: usize) -> &[u8] {
        &self.vocab[word]
    }

    pub fn write<W: Write>(&self, mut out: W, format: Format) -> Result<()> {
        writeln!(out, "{} {}", self.num_words(), self.size)?;
        for (a, word) in self.vocab.iter().enumerate() {
            out.write_all(word)?;
            match format {
                Format::Text => {
                    for f in &self[a] {
                        write!(out, " {f}")?;
                    }
                }
                Format::Binary => {
                    out.write_all(b" ")?;
                    out.write_all(bytemuck::cast_slice::<real, u8>(&self[a]))?;
                }
            }
            writeln!(out)?;
        }
        out.flush()?;
        Ok(())
    }

    pub fn save(&self, path: &Path, format: Format) -> Result<()> {
        let out = std::io::BufWriter::new(File::create(path)?);
        self.write(out, format)
    }

    pub fn load(path: &Path, format: Format) -> Result<Self> {
        Self::read(BufReader::new(File::open(path)?), format)
    }

    pub fn read<R: BufRead>(mut input: R, format: Format) -> Result<Self> {
        let mut line = String::new();
        input.read_line(&mut line)?;
        let mut fields = line.split_whitespace();
        let mut header_field = |name: &str| -> Result<usize> {
            fields
                .next()
                .ok_or_else(|| bad(1, format!("missing {name}")))?
                .parse()
                .map_err(|_| bad(1, format!("invalid {name}")))
        };
        let num_words = header_field("word count")?;
        let size = header_field("vector size")?;

        if num_words
            .checked_mul(size)
            .and_then(|n| n.checked_mul(std::mem::size_of::<real>()))
            .is_none()
        {
            return Err(bad(1, "header dimensions overflow"));
        }

        // The header is untrusted, so storage grows with the rows actually read.
        let mut vocab = Vec::new();
        let mut embeddings = Vec::new();
        for b in 0..num_words {
            let line_num = b + 2;
            let word = match format {
                Format::Text => read_text_row(&mut input, size, &mut embeddings, line_num)?,
                Format::Binary => read_binary_row(&mut input, size, &mut embeddings, line_num)?,
            };
            vocab.push(word);
        }

        Ok(Embeddings {
            size,
            vocab,
            embeddings,
        })
    }

    /// The `n` words most similar to `query` by cosine similarity, best
    /// first, skipping the ids in `exclude`.
    pub fn rank(&self, query: &[real], exclude: &[usize], n: usize) -> Vec<(usize, real)> {
        let query_norm = norm(query);
        let mut best: Vec<(usize, real)> = (0..self.num_words())
            .filter(|c| !exclude.contains(c))
            .map(|c| {
                let denom = query_norm * norm(&self[c]);
                let sim = if denom > 0.0 {
                    dot(query, &self[c]) / denom
                } else {
                    0.0
                };
                (c, sim)
            })
            .collect();
        best.sort_by_key(|&(_, sim)| Reverse(OrderedFloat(sim)));
        best.truncate(n);
        best
    }

    /// Nearest neighbours of `word`, or `None` if it is unknown.
    pub fn nearest(&self, word: &[u8], n: usize) -> Option<Vec<(usize, real)>> {
        let i = self.lookup_word(word)?;
        Some(self.rank(&self[i], &[i], n))
    }

    /// Words closest to `b - a + c` ("a is to b as c is to ?"), or `None` if
    /// any of the three is unknown.
    pub fn analogy(&self, a: &[u8], b: &[u8], c: &[u8], n: usize) -> Option<Vec<(usize, real)>> {
        let ids = [self.lookup_word(a)?, self.lookup_word(b)?, self.lookup_word(c)?];
        let query: Vec<real> = (0..self.size)
            .map(|i| self[ids[1]][i] - self[ids[0]][i] + self[ids[2]][i])
            .collect();
        Some(self.rank(&query, &ids, n))
    }
}

fn read_text_row<R: BufRead>(
    input: &mut R,
    size: usize,
    out: &mut Vec<real>,
    line_num: usize,
) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    if input.read_until(b'\n', &mut bytes)? == 0 {
        return Err(bad(line_num, "unexpected end of file"));
    }
    let split = bytes
        .iter()
        .position(|&c| c == b' ')
        .ok_or_else(|| bad(line_num, "missing vector"))?;
    let word = bytes[..split].to_vec();
    let values =
        std::str::from_utf8(&bytes[split..]).map_err(|_| bad(line_num, "vector is not UTF-8"))?;
    let start = out.len();
    for value in values.split_whitespace() {
        out.push(value.parse().map_err(|_| bad(line_num, "invalid number"))?);
    }
    match (out.len() - start).cmp(&size) {
        Ordering::Less => Err(bad(line_num, "too few values")),
        Ordering::Greater => Err(bad(line_num, "too many values")),
        Ordering::Equal => Ok(word),
    }
}

fn read_binary_row<R: BufRead>(
    input: &mut R,
    size: usize,
    out: &mut Vec<real>,
    line_num: usize,
) -> Result<Vec<u8>> {
    let mut word = Vec::<u8>::new();
    if input.read_until(b' ', &mut word)? == 0 {
        return Err(bad(line_num, "unexpected end of file"));
    }
    if word.last() != Some(&b' ') {
        return Err(bad(line_num, "missing vector"));
    }
    word.pop();
    // The previous row's trailing newline.
    word.retain(|c| *c != b'\n');

    let byte_len = size * std::mem::size_of::<real>();
    let mut bytes = Vec::new();
    input.take(byte_len as u64).read_to_end(&mut bytes)?;
    if bytes.len() != byte_len {
        return Err(bad(line_num, "truncated vector"));
    }
    out.extend(
        bytes
            .chunks_exact(std::mem::size_of::<real>())
            .map(bytemuck::pod_read_unaligned::<real>),
    );
    Ok(word)
}

//! Training word vectors with the continuous-bag-of-words architecture.
//!
//! For each pivot word, the input vectors (`syn0`) of the words around it are
//! summed into `neu1`, and the output layer is asked to predict the pivot
//! from that sum, by hierarchical softmax over the Huffman tree (`syn1`,
//! one row per internal node) and/or by negative sampling (`syn1neg`, one row
//! per word). The error with respect to `neu1` is accumulated in `neu1e` and
//! added to every context word's input vector.
//!
//! Training is lock-free ("Hogwild"): the token slice is cut into one
//! contiguous shard per worker thread, and all workers update the same
//! matrices through relaxed atomic cells without synchronizing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Instant;

use indicatif::ProgressBar;

use crate::matrix::Matrix;
use crate::sigmoid::MAX_EXP;
use crate::subsample::Subsampler;
use crate::vectors::Embeddings;
use crate::{
    norm, real, Error, ExpTable, Model, Result, Rng, TrainConfig, UnigramTable, Vocabulary,
};

pub struct Cbow<'a> {
    vocab: &'a Vocabulary,
    table: Option<&'a UnigramTable>,
    exp_table: &'a ExpTable,
    config: TrainConfig,
    /// The learned word vectors.
    syn0: Matrix,
    /// Weights of the hierarchical-softmax predictors, one per internal node.
    syn1: Option<Matrix>,
    /// Output vectors for negative sampling.
    syn1neg: Option<Matrix>,
    /// Tokens consumed so far by all workers, for learning-rate decay.
    word_count_actual: AtomicU64,
    progress: ProgressBar,
}

impl<'a> Cbow<'a> {
    /// Allocate and initialise the network.
    ///
    /// `table` is required when negative sampling is enabled and ignored
    /// otherwise.
    pub fn new(
        vocab: &'a Vocabulary,
        table: Option<&'a UnigramTable>,
        exp_table: &'a ExpTable,
        config: TrainConfig,
    ) -> Result<Self> {
        config.validate()?;
        if vocab.is_empty() {
            return Err(Error::EmptyVocabulary);
        }
        if config.learn_negative_sampling && table.is_none() {
            return Err(Error::InvalidConfig(
                "negative sampling requires a unigram table".into(),
            ));
        }

        let vocab_size = vocab.len();
        let dim = config.embedding_dim;
        let syn0 = Matrix::zeros(vocab_size, dim)?;
        let mut rng = Rng::new(config.seed);
        for a in 0..vocab_size {
            for cell in syn0.row(a) {
                cell.store((rng.rand_real() - 0.5) / dim as real);
            }
        }
        // A one-word vocabulary has no internal nodes and nothing to predict.
        let syn1 = if config.learn_hierarchical_softmax && vocab_size > 1 {
            Some(Matrix::zeros(vocab_size - 1, dim)?)
        } else {
            None
        };
        let syn1neg = if config.learn_negative_sampling {
            Some(Matrix::zeros(vocab_size, dim)?)
        } else {
            None
        };

        Ok(Cbow {
            vocab,
            table: table.filter(|_| config.learn_negative_sampling),
            exp_table,
            config,
            syn0,
            syn1,
            syn1neg,
            word_count_actual: AtomicU64::new(0),
            progress: ProgressBar::hidden(),
        })
    }

    /// Report progress on `progress` while training.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    pub fn vocab(&self) -> &'a Vocabulary {
        self.vocab
    }

    /// Run `config.epochs` passes over `tokens`, updating the weights in place.
    pub fn fit<W>(&mut self, tokens: &[W]) -> Result<()>
    where
        W: AsRef<[u8]> + Sync,
    {
        let num_threads = self.config.num_threads.min(tokens.len()).max(1);
        let total = tokens.len() as u64 * self.config.epochs as u64;
        self.word_count_actual.store(0, Ordering::Relaxed);
        self.progress.set_length(total);
        self.progress.set_position(0);

        tracing::info!(
            tokens = tokens.len(),
            epochs = self.config.epochs,
            threads = num_threads,
            hs = self.syn1.is_some(),
            negative = self.syn1neg.is_some(),
            "starting training"
        );
        let start = Instant::now();

        let this: &Cbow = self;
        thread::scope(|s| -> Result<()> {
            let workers = (0..num_threads)
                .map(|id| {
                    let shard = &tokens
                        [tokens.len() * id / num_threads..tokens.len() * (id + 1) / num_threads];
                    s.spawn(move || this.train_shard(id, shard, total))
                })
                .collect::<Vec<_>>();
            for worker in workers {
                worker.join().map_err(|_| Error::WorkerPanicked)?;
            }
            Ok(())
        })?;

        self.progress.finish();
        tracing::info!(
            elapsed_secs = start.elapsed().as_secs_f64(),
            "finished training"
        );
        Ok(())
    }

    /// Publish this worker's newly consumed tokens and return the decayed
    /// learning rate.
    fn report_progress(&self, word_count: u64, last_word_count: &mut u64, total: u64) -> real {
        let n = word_count - *last_word_count;
        let word_count_actual = self.word_count_actual.fetch_add(n, Ordering::Relaxed) + n;
        *last_word_count = word_count;
        self.progress.inc(n);

        let starting_alpha = self.config.starting_alpha;
        starting_alpha * (1.0 - word_count_actual as real / (total + 1) as real).max(0.0001)
    }

    fn train_shard<W: AsRef<[u8]>>(&self, id: usize, shard: &[W], total: u64) {
        let dim = self.config.embedding_dim;
        let window = self.config.window;
        let sentence_len = self.config.sentence_len;
        let subsampler =
            Subsampler::new(self.config.subsampling_threshold, self.vocab.n_train_words());

        let mut rng = Rng::new(self.config.seed.wrapping_add(1 + id as u64));
        let mut neu1: Vec<real> = vec![0.0; dim];
        let mut neu1e: Vec<real> = vec![0.0; dim];
        let mut sen: Vec<usize> = Vec::with_capacity(sentence_len);
        let mut word_count: u64 = 0;
        let mut last_word_count: u64 = 0;
        let mut last_logged: u64 = 0;

        for epoch in 0..self.config.epochs {
            let mut tokens = shard.iter();
            loop {
                let alpha = self.report_progress(word_count, &mut last_word_count, total);
                if word_count - last_logged > 10_000 {
                    last_logged = word_count;
                    tracing::debug!(worker = id, epoch, alpha, word_count, "training progress");
                }

                sen.clear();
                for token in tokens.by_ref() {
                    word_count += 1;
                    let Some(word) = self.vocab.index_of(token.as_ref()) else {
                        continue;
                    };
                    // The subsampling randomly discards frequent words while keeping the ranking same
                    if let Some(subsampler) = &subsampler {
                        if !subsampler.keep(self.vocab[word].count, &mut rng) {
                            continue;
                        }
                    }
                    sen.push(word);
                    if sen.len() >= sentence_len {
                        break;
                    }
                }
                if sen.is_empty() {
                    break;
                }

                let sentence: &[usize] = &sen;
                for (pos, &pivot) in sentence.iter().enumerate() {
                    let b = (rng.rand_u64() % window as u64) as usize;
                    let reach = window - b;
                    let start = pos.saturating_sub(reach);
                    let stop = (pos + reach + 1).min(sentence.len());
                    let context = move || {
                        (start..stop)
                            .filter(move |&c| c != pos)
                            .map(move |c| sentence[c])
                    };

                    // in -> hidden
                    neu1.fill(0.0);
                    neu1e.fill(0.0);
                    let mut cw = 0;
                    for word in context() {
                        for (h, w) in neu1.iter_mut().zip(self.syn0.row(word)) {
                            *h += w.load();
                        }
                        cw += 1;
                    }
                    if cw == 0 {
                        continue;
                    }

                    if let Some(syn1) = &self.syn1 {
                        self.hierarchical_softmax(syn1, pivot, alpha, &neu1, &mut neu1e);
                    }
                    if let (Some(syn1neg), Some(table)) = (&self.syn1neg, self.table) {
                        self.negative_sampling(
                            syn1neg, table, pivot, alpha, &neu1, &mut neu1e, &mut rng,
                        );
                    }

                    // hidden -> in
                    for word in context() {
                        self.syn0.add_row(word, &neu1e);
                    }
                }

                let grad = norm(&neu1e);
                if grad < 1e-6 {
                    tracing::trace!(worker = id, grad, "near-zero gradient at end of sentence");
                }
            }
        }

        self.report_progress(word_count, &mut last_word_count, total);
    }

    fn hierarchical_softmax(
        &self,
        syn1: &Matrix,
        pivot: usize,
        alpha: real,
        neu1: &[real],
        neu1e: &mut [real],
    ) {
        let entry = &self.vocab[pivot];
        for (&node, &bit) in entry.path.iter().zip(&entry.code) {
            let node = node as usize;
            // Propagate hidden -> output
            let f = syn1.dot(node, neu1);
            if f <= -MAX_EXP || f >= MAX_EXP {
                continue;
            }
            // 'g' is the gradient multiplied by the learning rate; the target is 1 - bit
            let g = (1.0 - bit as real - self.exp_table.sigmoid(f)) * alpha;
            // Propagate errors output -> hidden
            syn1.accumulate_scaled(node, g, neu1e);
            // Learn weights hidden -> output
            syn1.add_scaled(node, g, neu1);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn negative_sampling(
        &self,
        syn1neg: &Matrix,
        table: &UnigramTable,
        pivot: usize,
        alpha: real,
        neu1: &[real],
        neu1e: &mut [real],
        rng: &mut Rng,
    ) {
        for d in 0..=self.config.negative {
            let (target, label) = if d == 0 {
                (pivot, 1.0)
            } else {
                let target = table.sample(rng.rand_u64() >> 16);
                if target == pivot {
                    continue;
                }
                (target, 0.0)
            };

            let f = syn1neg.dot(target, neu1);
            let g = if f > MAX_EXP {
                (label - 1.0) * alpha
            } else if f < -MAX_EXP {
                label * alpha
            } else {
                (label - self.exp_table.sigmoid(f)) * alpha
            };
            syn1neg.accumulate_scaled(target, g, neu1e);
            syn1neg.add_scaled(target, g, neu1);
        }
    }

    /// The current input vector of `word`.
    pub fn embedding(&self, word: usize) -> Vec<real> {
        self.syn0.row_to_vec(word)
    }

    /// The current weights of internal node `node` (numbered from 0, the root
    /// being `V - 2`), if hierarchical softmax is enabled.
    pub fn node_weights(&self, node: usize) -> Option<Vec<real>> {
        self.syn1.as_ref().map(|syn1| syn1.row_to_vec(node))
    }

    /// The current negative-sampling output vector of `word`, if enabled.
    pub fn output_vector(&self, word: usize) -> Option<Vec<real>> {
        self.syn1neg.as_ref().map(|m| m.row_to_vec(word))
    }

    /// Snapshot of the input vectors, in vocabulary order.
    pub fn embeddings(&self) -> Embeddings {
        Embeddings::new(
            self.vocab.iter().map(|e| e.word.clone()).collect(),
            self.syn0.cols(),
            self.syn0.to_vec(),
        )
    }

    /// Snapshot of everything needed to evaluate the model later.
    pub fn model(&self) -> Model {
        Model {
            config: self.config.clone(),
            vocab: self.vocab.entries().to_vec(),
            embeddings: self.syn0.to_vec(),
            weights: self.syn1.as_ref().map(Matrix::to_vec).unwrap_or_default(),
        }
    }

    #[cfg(test)]
    fn num_node_rows(&self) -> usize {
        self.syn1.as_ref().map_or(0, Matrix::rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VocabConfig;

    const CORPUS: &str = "a b a b a c a b";

    fn tokens() -> Vec<&'static str> {
        CORPUS.split_whitespace().collect()
    }

    fn vocab() -> Vocabulary {
        let config = VocabConfig {
            min_count: 0,
            hash_size: 100,
        };
        Vocabulary::fit(tokens(), &config).unwrap()
    }

    fn hs_config() -> TrainConfig {
        TrainConfig {
            embedding_dim: 4,
            learn_hierarchical_softmax: true,
            learn_negative_sampling: false,
            subsampling_threshold: 0.0,
            ..TrainConfig::default()
        }
    }

    fn set_row(m: &Matrix, i: usize, values: &[real]) {
        for (cell, &x) in m.row(i).iter().zip(values) {
            cell.store(x);
        }
    }

    #[test]
    fn hierarchical_softmax_skips_saturated_nodes() {
        let vocab = vocab();
        let exp_table = ExpTable::new();
        let config = TrainConfig {
            embedding_dim: 2,
            ..hs_config()
        };
        let cbow = Cbow::new(&vocab, None, &exp_table, config).unwrap();
        let syn1 = cbow.syn1.as_ref().unwrap();
        let a = vocab.index_of(b"a").unwrap();
        let b = vocab.index_of(b"b").unwrap();
        assert_eq!(vocab[b].path, vec![1, 0]);
        assert_eq!(vocab[b].code, vec![0, 1]);

        let neu1 = [1.0, 0.0];
        for root in [[10.0, 0.0], [-10.0, 0.0]] {
            set_row(syn1, 1, &root);
            let mut neu1e = vec![0.0; 2];
            cbow.hierarchical_softmax(syn1, a, 1.0, &neu1, &mut neu1e);
            assert_eq!(neu1e, vec![0.0, 0.0]);
            assert_eq!(syn1.row_to_vec(1), root.to_vec());
        }

        // Only the unsaturated node below the root learns: f = 0, bit 1, so
        // g = (1 - 1 - 0.5) * alpha.
        set_row(syn1, 1, &[10.0, 0.0]);
        set_row(syn1, 0, &[0.0, 0.0]);
        let mut neu1e = vec![0.0; 2];
        cbow.hierarchical_softmax(syn1, b, 1.0, &neu1, &mut neu1e);
        assert_eq!(neu1e, vec![0.0, 0.0]);
        assert_eq!(syn1.row_to_vec(1), vec![10.0, 0.0]);
        assert_eq!(syn1.row_to_vec(0), vec![-0.5, 0.0]);
    }

    #[test]
    fn negative_sampling_clamps_saturated_gradient() {
        let vocab = vocab();
        let table = UnigramTable::new(&vocab, 1000).unwrap();
        let exp_table = ExpTable::new();
        let config = TrainConfig {
            embedding_dim: 2,
            learn_hierarchical_softmax: false,
            learn_negative_sampling: true,
            negative: 0,
            ..hs_config()
        };
        let cbow = Cbow::new(&vocab, Some(&table), &exp_table, config).unwrap();
        let syn1neg = cbow.syn1neg.as_ref().unwrap();
        let a = vocab.index_of(b"a").unwrap();
        let neu1 = [10.0, 0.0];
        let mut rng = Rng::new(0);

        // f = 10 > MAX_EXP with label 1: g = (1 - 1) * alpha, nothing moves.
        set_row(syn1neg, a, &[1.0, 0.0]);
        let mut neu1e = vec![0.0; 2];
        cbow.negative_sampling(syn1neg, &table, a, 1.0, &neu1, &mut neu1e, &mut rng);
        assert_eq!(neu1e, vec![0.0, 0.0]);
        assert_eq!(syn1neg.row_to_vec(a), vec![1.0, 0.0]);

        // f = -10 < -MAX_EXP with label 1: g = alpha.
        set_row(syn1neg, a, &[-1.0, 0.0]);
        let mut neu1e = vec![0.0; 2];
        cbow.negative_sampling(syn1neg, &table, a, 1.0, &neu1, &mut neu1e, &mut rng);
        assert_eq!(neu1e, vec![-1.0, 0.0]);
        assert_eq!(syn1neg.row_to_vec(a), vec![9.0, 0.0]);
    }

    #[test]
    fn negative_draws_of_the_pivot_are_skipped() {
        let config = VocabConfig {
            min_count: 0,
            hash_size: 100,
        };
        let vocab = Vocabulary::fit(["x"; 4], &config).unwrap();
        // Every slot holds the pivot, so every negative draw is discarded.
        let table = UnigramTable::new(&vocab, 100).unwrap();
        let exp_table = ExpTable::new();
        let train_config = TrainConfig {
            embedding_dim: 2,
            learn_hierarchical_softmax: false,
            learn_negative_sampling: true,
            negative: 5,
            ..hs_config()
        };
        let cbow = Cbow::new(&vocab, Some(&table), &exp_table, train_config).unwrap();
        let syn1neg = cbow.syn1neg.as_ref().unwrap();
        let mut neu1e = vec![0.0; 2];
        let mut rng = Rng::new(0);
        cbow.negative_sampling(syn1neg, &table, 0, 1.0, &[1.0, 0.0], &mut neu1e, &mut rng);

        // Only the positive example: f = 0, g = (1 - 0.5) * alpha.
        assert_eq!(neu1e, vec![0.0, 0.0]);
        assert_eq!(syn1neg.row_to_vec(0), vec![0.5, 0.0]);
    }

    #[test]
    fn rejects_no_learning_mode() {
        let vocab = vocab();
        let exp_table = ExpTable::new();
        let config = TrainConfig {
            learn_hierarchical_softmax: false,
            ..hs_config()
        };
        assert!(matches!(
            Cbow::new(&vocab, None, &exp_table, config),
            Err(Error::NoLearningMode)
        ));
    }

    #[test]
    fn negative_sampling_needs_a_table() {
        let vocab = vocab();
        let exp_table = ExpTable::new();
        let config = TrainConfig {
            learn_negative_sampling: true,
            ..hs_config()
        };
        assert!(matches!(
            Cbow::new(&vocab, None, &exp_table, config),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_empty_vocabulary() {
        let config = VocabConfig {
            min_count: 10,
            hash_size: 100,
        };
        let vocab = Vocabulary::fit(tokens(), &config).unwrap();
        let exp_table = ExpTable::new();
        assert!(matches!(
            Cbow::new(&vocab, None, &exp_table, hs_config()),
            Err(Error::EmptyVocabulary)
        ));
    }

    #[test]
    fn initial_weights() {
        let vocab = vocab();
        let exp_table = ExpTable::new();
        let cbow = Cbow::new(&vocab, None, &exp_table, hs_config()).unwrap();
        assert_eq!(cbow.num_node_rows(), 2);
        for word in 0..vocab.len() {
            let v = cbow.embedding(word);
            assert!(v.iter().all(|x| x.abs() <= 0.5 / 4.0));
            assert!(v.iter().any(|&x| x != 0.0));
        }
        assert_eq!(cbow.node_weights(1), Some(vec![0.0; 4]));
        assert_eq!(cbow.output_vector(0), None);
    }

    #[test]
    fn hierarchical_softmax_updates_weights() {
        let vocab = vocab();
        let exp_table = ExpTable::new();
        let mut cbow = Cbow::new(&vocab, None, &exp_table, hs_config()).unwrap();
        let before = cbow.embeddings();
        cbow.fit(&tokens()).unwrap();
        let after = cbow.embeddings();

        let a = vocab.index_of(b"a").unwrap();
        let b = vocab.index_of(b"b").unwrap();
        for word in [a, b] {
            assert!(after[word].iter().any(|&x| x != 0.0));
            assert_ne!(after[word], before[word]);
        }
        let root = vocab.len() - 2;
        assert!(cbow.node_weights(root).unwrap().iter().any(|&x| x != 0.0));
    }

    #[test]
    fn same_seed_same_result() {
        let vocab = vocab();
        let exp_table = ExpTable::new();
        let train = || {
            let mut cbow = Cbow::new(&vocab, None, &exp_table, hs_config()).unwrap();
            cbow.fit(&tokens()).unwrap();
            cbow.embeddings()
        };
        let (x, y) = (train(), train());
        for word in 0..vocab.len() {
            assert_eq!(x[word], y[word]);
        }
    }

    #[test]
    fn single_word_vocabulary_trains_nothing_with_hs() {
        let config = VocabConfig {
            min_count: 0,
            hash_size: 100,
        };
        let tokens = ["x"; 10];
        let vocab = Vocabulary::fit(tokens, &config).unwrap();
        let exp_table = ExpTable::new();
        let mut cbow = Cbow::new(&vocab, None, &exp_table, hs_config()).unwrap();
        assert_eq!(cbow.num_node_rows(), 0);
        let before = cbow.embedding(0);
        cbow.fit(&tokens).unwrap();
        assert_eq!(cbow.embedding(0), before);
    }

    #[test]
    fn negative_sampling_only() {
        let vocab = vocab();
        let table = UnigramTable::new(&vocab, 1000).unwrap();
        let exp_table = ExpTable::new();
        let config = TrainConfig {
            learn_hierarchical_softmax: false,
            learn_negative_sampling: true,
            ..hs_config()
        };
        let mut cbow = Cbow::new(&vocab, Some(&table), &exp_table, config).unwrap();
        assert_eq!(cbow.num_node_rows(), 0);
        let before = cbow.embeddings();
        cbow.fit(&tokens()).unwrap();
        let after = cbow.embeddings();

        let a = vocab.index_of(b"a").unwrap();
        assert!(cbow.output_vector(a).unwrap().iter().any(|&x| x != 0.0));
        assert_ne!(after[a], before[a]);
        assert_eq!(cbow.node_weights(0), None);
    }

    #[test]
    fn unknown_tokens_are_skipped() {
        let vocab = vocab();
        let exp_table = ExpTable::new();
        let mut cbow = Cbow::new(&vocab, None, &exp_table, hs_config()).unwrap();
        let noisy = ["zz", "a", "qq", "b", "a", "zz"];
        cbow.fit(&noisy).unwrap();
        assert!(cbow.embedding(0).iter().all(|x| x.is_finite()));
    }
}

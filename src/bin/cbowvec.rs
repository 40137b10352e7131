use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::Level;

use cbowvec::unigram::TABLE_SIZE;
use cbowvec::vectors::{write_vocab, Format};
use cbowvec::{corpus, real, Cbow, ExpTable, TrainConfig, UnigramTable, VocabConfig, Vocabulary};

#[derive(Parser)]
#[command(about = "Train CBOW word vectors", long_about = None, version)]
struct Options {
    /// Use text data from FILE to train the model
    #[arg(long = "train", value_name = "FILE")]
    train_file: PathBuf,

    /// Use FILE to save the resulting word vectors
    #[arg(long = "output", value_name = "FILE")]
    output_file: Option<PathBuf>,

    /// Set size of word vectors
    #[arg(long = "size", default_value_t = 100)]
    layer1_size: usize,

    /// Set max skip length between words
    #[arg(long, default_value_t = 5)]
    window: usize,

    /// Set threshold for occurrence of words. Those that appear with higher
    /// frequency in the training data will be randomly down-sampled; 0 turns
    /// it off
    #[arg(long, default_value_t = 1e-4)]
    sample: real,

    /// Use Hierarchical Softmax
    #[arg(long)]
    hs: bool,

    /// Number of negative examples; common values are 3 - 10 (0 = not used)
    #[arg(long, default_value_t = 5)]
    negative: usize,

    /// Use N threads
    #[arg(long = "threads", value_name = "N", default_value_t = 1)]
    num_threads: usize,

    /// Run more training iterations
    #[arg(long, default_value_t = 1)]
    iter: usize,

    /// Discard words that appear N times or fewer
    #[arg(long = "min-count", value_name = "N", default_value_t = 5)]
    min_count: u64,

    /// Number of slots in the vocabulary hash index
    #[arg(long, default_value_t = 30_000_000)]
    hash_size: usize,

    /// Number of slots in the negative-sampling table
    #[arg(long, default_value_t = TABLE_SIZE)]
    table_size: usize,

    /// Set the starting learning rate
    #[arg(long, default_value_t = 0.025)]
    alpha: real,

    /// Seed for the random number generator
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Set the debug mode (0 = warnings only, 1 = info, 2 = progress)
    #[arg(long = "debug", default_value_t = 2)]
    debug_mode: usize,

    /// Save the resulting vectors in binary mode
    #[arg(long, group = "format")]
    binary: bool,

    /// Save the whole model in bincode format
    #[arg(long, group = "format")]
    bincode: bool,

    /// The vocabulary will be saved to FILE
    #[arg(long = "save-vocab", value_name = "FILE")]
    save_vocab_file: Option<PathBuf>,
}

impl Options {
    fn vocab_config(&self) -> VocabConfig {
        VocabConfig {
            min_count: self.min_count,
            hash_size: self.hash_size,
        }
    }

    fn train_config(&self) -> TrainConfig {
        TrainConfig {
            embedding_dim: self.layer1_size,
            learn_hierarchical_softmax: self.hs,
            learn_negative_sampling: self.negative > 0,
            starting_alpha: self.alpha,
            window: self.window,
            negative: self.negative,
            subsampling_threshold: self.sample,
            num_threads: self.num_threads,
            epochs: self.iter,
            seed: self.seed,
            ..TrainConfig::default()
        }
    }
}

fn train_model(options: &Options) -> Result<()> {
    let train_config = options.train_config();
    // Fail before reading the corpus if there is nothing to learn.
    train_config.validate()?;

    tracing::info!("Starting training using file {}", options.train_file.display());
    let words = corpus::read_corpus(&options.train_file).context("error reading training data file")?;
    let vocab = Vocabulary::fit(&words, &options.vocab_config())?;
    if let Some(f) = &options.save_vocab_file {
        let out = BufWriter::new(File::create(f).context("error creating vocab file for write")?);
        write_vocab(&vocab, out).context("error writing vocab file")?;
    }
    let output_file = match &options.output_file {
        Some(f) => f,
        None => return Ok(()),
    };

    let table = if train_config.learn_negative_sampling {
        Some(UnigramTable::new(&vocab, options.table_size)?)
    } else {
        None
    };
    let exp_table = ExpTable::new();

    let progress = if options.debug_mode > 1 {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{bar:40} {percent}% {per_sec} [{elapsed_precise}]")
                .context("invalid progress bar template")?,
        );
        bar
    } else {
        ProgressBar::hidden()
    };
    let mut cbow = Cbow::new(&vocab, table.as_ref(), &exp_table, train_config)?.with_progress(progress);
    cbow.fit(&words)?;

    if options.bincode {
        cbow.model()
            .save(output_file)
            .context("error writing output file")?;
    } else {
        let format = if options.binary {
            Format::Binary
        } else {
            Format::Text
        };
        let out = BufWriter::new(File::create(output_file).context("error creating output file")?);
        cbow.embeddings()
            .write(out, format)
            .context("error writing output file")?;
    }
    Ok(())
}

fn main() {
    let options = Options::parse();

    let level = match options.debug_mode {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = train_model(&options) {
        eprintln!("{err:#}");
        process::exit(1);
    }
}

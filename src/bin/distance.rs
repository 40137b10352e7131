use std::io::Write;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;

use cbowvec::vectors::Format;
use cbowvec::{real, Embeddings};

/// number of closest words that will be shown
const N: usize = 40;

#[derive(Parser)]
#[command(about = "Show the words closest to a word or sentence", version)]
struct Options {
    /// Contains word projections written by cbowvec.
    #[arg(value_name = "FILE")]
    file_name: PathBuf,

    /// The file is in binary format rather than text.
    #[arg(long)]
    binary: bool,
}

fn run(options: &Options) -> Result<()> {
    let format = if options.binary {
        Format::Binary
    } else {
        Format::Text
    };
    let vectors = Embeddings::load(&options.file_name, format).context("error reading input file")?;

    let mut line = String::new();
    'outer: loop {
        print!("Enter word or sentence (EXIT to break): ");
        let _ = std::io::stdout().flush();

        line.clear();
        if std::io::stdin()
            .read_line(&mut line)
            .context("error reading stdin")?
            == 0
        {
            break;
        }
        if line.trim() == "EXIT" {
            break;
        }

        let mut bi: Vec<usize> = vec![];
        for word in line.split_whitespace() {
            println!();
            print!("Word: {word}  Position in vocabulary: ");
            match vectors.lookup_word(word.as_bytes()) {
                None => {
                    println!("None");
                    println!("Out of dictionary word!");
                    continue 'outer;
                }
                Some(i) => {
                    println!("{i}");
                    bi.push(i);
                }
            }
        }
        if bi.is_empty() {
            continue;
        }

        println!();
        println!("                                              Word       Cosine distance");
        println!("------------------------------------------------------------------------");

        let mut query = vec![0.0 as real; vectors.size()];
        for &i in &bi {
            for (q, &x) in query.iter_mut().zip(&vectors[i]) {
                *q += x;
            }
        }
        for (c, dist) in vectors.rank(&query, &bi, N) {
            println!("{:>50}\t\t{:8.6}", String::from_utf8_lossy(vectors.word(c)), dist);
        }
    }
    Ok(())
}

fn main() {
    let options = Options::parse();
    if let Err(err) = run(&options) {
        eprintln!("{err:#}");
        process::exit(1);
    }
}

use std::io::Write;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;

use cbowvec::vectors::Format;
use cbowvec::Embeddings;

/// number of closest words that will be shown
const N: usize = 40;

#[derive(Parser)]
#[command(about = "Answer \"a is to b as c is to ?\" queries", version)]
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
    loop {
        print!("Enter three words (EXIT to break): ");
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

        let words: Vec<&str> = line.split_whitespace().collect();
        let &[a, b, c] = words.as_slice() else {
            println!(
                "{} words were entered.. three words are needed at the input to perform the calculation",
                words.len()
            );
            continue;
        };

        match vectors.analogy(a.as_bytes(), b.as_bytes(), c.as_bytes(), N) {
            None => println!("Out of dictionary word!"),
            Some(best) => {
                println!();
                println!("                                              Word       Cosine distance");
                println!("------------------------------------------------------------------------");
                for (w, dist) in best {
                    println!("{:>50}\t\t{:8.6}", String::from_utf8_lossy(vectors.word(w)), dist);
                }
            }
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

//! Splitting raw text into word tokens.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::iter;
use std::path::Path;

use crate::{Result, MAX_STRING};

fn is_separator(ch: u8) -> bool {
    ch.is_ascii_whitespace() || ch == 0x0b
}

/// Read words from `input`, treating any run of ASCII whitespace as a word
/// boundary. Over-long words are truncated to `MAX_STRING - 1` bytes.
pub fn read_words<R: Read>(input: R) -> impl Iterator<Item = io::Result<Vec<u8>>> {
    let mut bytes = BufReader::new(input).bytes();
    iter::from_fn(move || {
        let mut word = Vec::<u8>::new();
        for byte in bytes.by_ref() {
            let ch = match byte {
                Ok(ch) => ch,
                Err(err) => return Some(Err(err)),
            };
            if is_separator(ch) {
                if word.is_empty() {
                    continue;
                }
                return Some(Ok(word));
            }
            if word.len() < MAX_STRING - 1 {
                word.push(ch); // Truncate too long words
            }
        }
        if word.is_empty() {
            None
        } else {
            Some(Ok(word))
        }
    })
}

/// Load every token of the file at `path` into memory.
pub fn read_corpus(path: &Path) -> Result<Vec<Vec<u8>>> {
    let file = File::open(path)?;
    let words = read_words(file).collect::<io::Result<Vec<_>>>()?;
    Ok(words)
}

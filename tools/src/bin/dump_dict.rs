//! Inspect a compiled dictionary: header fields, and optionally the
//! full word or soundslike listing.
//!
//! Usage:
//!   cargo run -p libspell-tools --bin dump-dict -- data/en.rws --dict-dir data --words

use anyhow::{Context, Result};
use clap::Parser;
use libspell_core::dict::{Dictionary, SoundslikeKey};
use libspell_core::ReadOnlyDict;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dump-dict")]
#[command(about = "Show the contents of a compiled dictionary")]
struct Args {
    /// Compiled dictionary file
    dict: PathBuf,

    /// Directory with the language data files
    #[arg(long, default_value = ".")]
    dict_dir: PathBuf,

    /// List every word
    #[arg(long)]
    words: bool,

    /// List soundslike groups with their word counts
    #[arg(long)]
    soundslikes: bool,
}

fn run() -> Result<()> {
    let args = Args::parse();
    let dict = ReadOnlyDict::load(&args.dict, &args.dict_dir)
        .with_context(|| format!("loading {}", args.dict.display()))?;

    let head = dict.head();
    println!("language:        {}", dict.lang().name());
    println!("soundslike:      {} {}", dict.lang().soundslike_name(), dict.lang().soundslike_version());
    println!("words:           {}", head.word_count);
    println!("soundslikes:     {}", head.soundslike_count);
    println!("hash buckets:    {}", head.word_buckets);
    println!("max word length: {}", head.max_word_length);
    println!("affix compressed: {}", dict.flags().affix_compressed);

    if args.words || args.soundslikes {
        let mut iter = dict.soundslike_iter();
        while let Some(group) = iter.next(usize::MAX) {
            if matches!(group.key, SoundslikeKey::Empty) {
                continue;
            }
            let words = dict.soundslike_lookup(&group.key);
            if args.soundslikes {
                println!(
                    "{}\t{}",
                    String::from_utf8_lossy(&group.soundslike),
                    words.len()
                );
            }
            if args.words {
                for e in words {
                    if e.aff.is_empty() {
                        println!("{}", String::from_utf8_lossy(&e.word));
                    } else {
                        println!(
                            "{}/{}",
                            String::from_utf8_lossy(&e.word),
                            String::from_utf8_lossy(&e.aff)
                        );
                    }
                }
            }
        }
    }
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(2);
    }
}

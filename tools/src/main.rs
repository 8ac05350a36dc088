//! Compile a word list into a libspell read-only dictionary.
//!
//! Usage:
//!   cargo run -p libspell-tools --bin compile-dict -- \
//!       --lang en --dict-dir data --output data/en.rws words.txt
//!
//! Input lines are `word[/flags][:compound-info]`; with several inputs
//! the word streams are concatenated. Reads stdin when no input file is
//! given.

use anyhow::{Context, Result};
use clap::Parser;
use libspell_core::{compile, Language};
use std::io::BufRead;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "compile-dict")]
#[command(about = "Compile a word list into a read-only dictionary")]
struct Args {
    /// Language code (resolved as <dict-dir>/<lang>.dat)
    #[arg(long)]
    lang: String,

    /// Directory with the language data files
    #[arg(long, default_value = ".")]
    dict_dir: PathBuf,

    /// Output dictionary; defaults to <dict-dir>/<lang>.rws
    #[arg(long)]
    output: Option<PathBuf>,

    /// Word list files (stdin when empty)
    inputs: Vec<PathBuf>,
}

fn run() -> Result<()> {
    let args = Args::parse();
    let lang = Language::load(&args.lang, &args.dict_dir)
        .with_context(|| format!("loading language {}", args.lang))?;
    let output = args
        .output
        .unwrap_or_else(|| args.dict_dir.join(format!("{}.rws", args.lang)));

    let mut lines: Vec<String> = Vec::new();
    if args.inputs.is_empty() {
        for line in std::io::stdin().lock().lines() {
            lines.push(line.context("reading stdin")?);
        }
    } else {
        for input in &args.inputs {
            let text = std::fs::read_to_string(input)
                .with_context(|| format!("reading {}", input.display()))?;
            lines.extend(text.lines().map(str::to_string));
        }
    }

    let count = lines.len();
    compile::create(lines, &lang, &output)
        .with_context(|| format!("compiling {}", output.display()))?;
    println!("Wrote {} ({} input lines)", output.display(), count);
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(2);
    }
}

//! Export a personal dictionary to JSON or CSV.
//!
//! Usage:
//!   cargo run -p libspell-tools --bin export-personal -- \
//!       --lang en --dict-dir data --file en.pws --format json

use anyhow::{Context, Result};
use clap::Parser;
use libspell_core::{Language, WritableDict};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "export-personal")]
#[command(about = "Export a personal dictionary to JSON or CSV")]
struct Args {
    /// Language code
    #[arg(long)]
    lang: String,

    /// Directory with the language data files
    #[arg(long, default_value = ".")]
    dict_dir: PathBuf,

    /// Personal dictionary file
    #[arg(long)]
    file: PathBuf,

    /// Output format: json or csv
    #[arg(long, default_value = "json")]
    format: String,

    /// Output file (defaults to stdout)
    #[arg(long)]
    output: Option<PathBuf>,
}

fn run() -> Result<()> {
    let args = Args::parse();
    let lang = Language::load(&args.lang, &args.dict_dir)
        .with_context(|| format!("loading language {}", args.lang))?;
    let dict = WritableDict::load(lang, &args.file)
        .with_context(|| format!("loading {}", args.file.display()))?;

    let words: Vec<String> = dict
        .word_list()
        .into_iter()
        .map(|w| String::from_utf8_lossy(&w).into_owned())
        .collect();

    let out = match args.format.as_str() {
        "json" => serde_json::to_string_pretty(&words).context("serializing to JSON")?,
        "csv" => {
            let mut s = String::from("word\n");
            for w in &words {
                s.push_str(w);
                s.push('\n');
            }
            s
        }
        other => anyhow::bail!("Unsupported format: {}. Use 'json' or 'csv'", other),
    };

    match args.output {
        Some(path) => std::fs::write(&path, out)
            .with_context(|| format!("writing {}", path.display()))?,
        None => println!("{}", out),
    }
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(2);
    }
}

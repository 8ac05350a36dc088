//! Shared fixtures: a small English-flavored test language over an
//! ASCII character set, plus helpers to lay its data files out on disk.
#![allow(dead_code)]

use libspell_core::{compile_dict, Config, Language, LanguageSources, ReadOnlyDict, Speller};
use libspell_core::{Dict, DictRole, ReplDict, WritableDict};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Generate ASCII `.cset` text covering bytes 0..=255.
pub fn ascii_cset() -> String {
    let mut out = String::from("# test character set\n/\n");
    for i in 0..256u32 {
        let b = i as u8;
        let (class, upper, lower, title) = if b.is_ascii_lowercase() {
            ("L", b.to_ascii_uppercase(), b, b.to_ascii_uppercase())
        } else if b.is_ascii_uppercase() {
            ("L", b, b.to_ascii_lowercase(), b)
        } else if b == b' ' || b == b'\t' || b == b'\n' {
            ("W", b, b, b)
        } else {
            ("O", b, b, b)
        };
        let plain = b;
        let sl = if class == "L" { upper } else { 0 };
        let display = if b.is_ascii_graphic() { b as char } else { '.' };
        out.push_str(&format!(
            "{:02x} {:04x} {} {} {:02x} {:02x} {:02x} {:02x} {:02x} {:02x}\n",
            i, i, class, display, upper, lower, title, plain, sl, sl
        ));
    }
    out
}

pub const TEST_AFFIX: &str = "\
PFX A Y 1
PFX A 0 un .

SFX S N 2
SFX S y ies [^aeiou]y
SFX S 0 s [aeiou]y

SFX D Y 2
SFX D 0 ed [^e]
SFX D 0 d e
";

pub const DESCRIPTOR: &str = "\
name test
charset ascii
soundslike generic
affix test
special ' ***
special - -*-
";

/// A compact word list with enough structure for check and suggest
/// scenarios.
pub const WORDS: &[&str] = &[
    "hello", "hell", "help", "held", "hold", "world", "word", "work", "the", "then", "there",
    "they", "ten", "tea", "happy/A", "lock/AD", "day/S", "fly/S", "cold", "bold", "old",
];

pub fn test_lang() -> Arc<Language> {
    let sources = LanguageSources {
        descriptor: DESCRIPTOR.to_string(),
        cset: ascii_cset(),
        affix: Some(TEST_AFFIX.to_string()),
        phonet: None,
        repl: None,
    };
    Arc::new(Language::from_sources(&sources, Path::new("test.dat")).expect("test language"))
}

/// Unique scratch directory under the system temp dir.
pub fn temp_dir(tag: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!(
        "libspell_it_{}_{}",
        tag,
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

/// Write the language data files so the file loaders have something to
/// chew on.
pub fn write_lang_files(dir: &Path) {
    std::fs::write(dir.join("test.dat"), DESCRIPTOR).unwrap();
    std::fs::write(dir.join("ascii.cset"), ascii_cset()).unwrap();
    std::fs::write(dir.join("test_affix.dat"), TEST_AFFIX).unwrap();
}

pub fn compiled_main(lang: &Arc<Language>) -> ReadOnlyDict {
    let bytes = compile_dict(WORDS.iter().copied(), lang).expect("compile main dictionary");
    let lang = lang.clone();
    ReadOnlyDict::from_bytes(bytes, Path::new("test.rws"), move |_| Ok(lang)).expect("load main")
}

/// A fully-assembled speller: compiled main + empty personal, session
/// and replacement dictionaries.
pub fn build_speller(config: Config) -> Speller {
    let lang = test_lang();
    let mut sp = Speller::with_language(lang.clone(), config).expect("speller");
    sp.attach(Dict::ReadOnly(Arc::new(compiled_main(&lang))), DictRole::Main)
        .expect("attach main");
    sp.attach(Dict::Writable(WritableDict::new(lang.clone())), DictRole::Personal)
        .expect("attach personal");
    sp.attach(Dict::Writable(WritableDict::new(lang.clone())), DictRole::Session)
        .expect("attach session");
    sp.attach(Dict::Repl(ReplDict::new(lang)), DictRole::Repl)
        .expect("attach repl");
    sp
}

pub fn default_config() -> Config {
    Config {
        lang: "test".to_string(),
        ..Config::default()
    }
}

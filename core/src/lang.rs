//! A language: character tables, soundslike, affixes and the
//! language-level replacement table, built from a `.dat` descriptor and
//! its companion data files.
//!
//! Languages are interned in a process-wide cache keyed by name and data
//! directory; callers share one `Arc<Language>` per language and the
//! entry is rebuilt once every handle has dropped.

use crate::affix::AffixMgr;
use crate::charmap::{CharMap, SpecialChar, StoreAs};
use crate::error::{Error, Result};
use crate::phonet::PhonetRules;
use crate::soundslike::Soundslike;
use ahash::AHashMap;
use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};
use tracing::debug;

/// Raw file contents a language is built from; the file loader fills
/// this in, tests can hand in literals.
#[derive(Debug, Clone, Default)]
pub struct LanguageSources {
    pub descriptor: String,
    pub cset: String,
    pub affix: Option<String>,
    pub phonet: Option<String>,
    pub repl: Option<String>,
}

#[derive(Debug)]
pub struct Language {
    name: String,
    charset: String,
    data_encoding: String,
    charmap: CharMap,
    soundslike: Soundslike,
    affix: Option<AffixMgr>,
    affix_compress: bool,
    repls: Vec<(Vec<u8>, Vec<u8>)>,
    mid_chars: Vec<u8>,
    config_defaults: Vec<(String, String)>,
}

impl Language {
    /// Build a language from in-memory sources. `origin` names the
    /// descriptor for error messages.
    pub fn from_sources(sources: &LanguageSources, origin: &Path) -> Result<Language> {
        let mut kv: AHashMap<&str, String> = AHashMap::new();
        let mut specials: Vec<(u8, SpecialChar)> = Vec::new();
        let mut config_defaults = Vec::new();

        for (lineno, raw) in sources.descriptor.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = match line.split_once(char::is_whitespace) {
                Some((k, v)) => (k, v.trim()),
                None => (line, ""),
            };
            match key {
                "special" => {
                    let mut toks = value.split_whitespace();
                    while let Some(ch) = toks.next() {
                        let flags = toks.next().ok_or_else(|| {
                            Error::bad_format(
                                origin,
                                lineno as u32 + 1,
                                "special <char> <begin><middle><end>",
                                line.to_string(),
                            )
                        })?;
                        if ch.len() != 1 || flags.len() != 3 {
                            return Err(Error::bad_format(
                                origin,
                                lineno as u32 + 1,
                                "special <char> <begin><middle><end>",
                                line.to_string(),
                            ));
                        }
                        let f = flags.as_bytes();
                        specials.push((
                            ch.as_bytes()[0],
                            SpecialChar {
                                begin: f[0] == b'*',
                                middle: f[1] == b'*',
                                end: f[2] == b'*',
                            },
                        ));
                    }
                }
                "name" | "charset" | "data-encoding" | "soundslike" | "affix"
                | "affix-compress" | "store-as" | "try" | "repl-table" => {
                    kv.insert(key, value.to_string());
                }
                // remaining keys are configuration defaults the language
                // suggests (run-together, keyboard, ...)
                _ => config_defaults.push((key.to_string(), value.to_string())),
            }
        }

        let name = kv
            .get("name")
            .cloned()
            .ok_or_else(|| {
                Error::bad_format(origin, 0, "the required field \"name\"", "no name field")
            })?;
        let charset = kv
            .get("charset")
            .cloned()
            .unwrap_or_else(|| "iso-8859-1".to_string());
        let data_encoding = kv.get("data-encoding").cloned().unwrap_or_else(|| charset.clone());

        let affix_compress = matches!(kv.get("affix-compress").map(|s| s.as_str()), Some("true"));

        let store_as = match kv.get("store-as").map(|s| s.as_str()) {
            Some("stripped") => StoreAs::Stripped,
            Some("lower") => StoreAs::Lower,
            Some(other) => {
                return Err(Error::BadValue {
                    key: "store-as".to_string(),
                    value: other.to_string(),
                    expected: "stripped or lower".to_string(),
                })
            }
            None if affix_compress => StoreAs::Lower,
            None => StoreAs::Stripped,
        };

        let cset_name = format!("{}.cset", charset);
        let charmap = CharMap::from_cset(&sources.cset, Path::new(&cset_name), store_as, &specials)?;

        let soundslike = match kv.get("soundslike").map(|s| s.as_str()).unwrap_or("none") {
            "none" => Soundslike::None,
            "generic" => Soundslike::Generic,
            "phonet" => {
                let text = sources.phonet.as_deref().ok_or_else(|| {
                    Error::bad_format(origin, 0, "a phonet rule file", "no phonet source")
                })?;
                let phonet_name = format!("{}_phonet.dat", name);
                Soundslike::Phonet(PhonetRules::parse(text, Path::new(&phonet_name))?)
            }
            other => {
                return Err(Error::BadValue {
                    key: "soundslike".to_string(),
                    value: other.to_string(),
                    expected: "none, generic or phonet".to_string(),
                })
            }
        };

        let affix = match kv.get("affix").map(|s| s.as_str()).unwrap_or("none") {
            "none" => None,
            affix_name => {
                let text = sources.affix.as_deref().ok_or_else(|| {
                    Error::bad_format(origin, 0, "an affix file", "no affix source")
                })?;
                let affix_file = format!("{}_affix.dat", affix_name);
                Some(AffixMgr::parse(text, Path::new(&affix_file), affix_name)?)
            }
        };
        if affix_compress && affix.is_none() {
            return Err(Error::BadValue {
                key: "affix-compress".to_string(),
                value: "true".to_string(),
                expected: "an affix table when compression is enabled".to_string(),
            });
        }

        let mut repls: Vec<(Vec<u8>, Vec<u8>)> = Vec::new();
        if let Some(repl_name) = kv.get("repl-table") {
            if repl_name != "none" {
                let text = sources.repl.as_deref().ok_or_else(|| {
                    Error::bad_format(origin, 0, "a replacement table file", "no repl source")
                })?;
                let repl_file = format!("{}_repl.dat", repl_name);
                repls.extend(parse_repl_table(text, Path::new(&repl_file))?);
            }
        }
        if let Some(a) = &affix {
            for (mis, cor) in a.repls() {
                if !repls.iter().any(|(m, c)| m == mis && c == cor) {
                    repls.push((mis.clone(), cor.clone()));
                }
            }
        }

        let mid_chars: Vec<u8> = specials
            .iter()
            .filter(|(_, s)| s.middle)
            .map(|&(c, _)| c)
            .collect();

        Ok(Language {
            name,
            charset,
            data_encoding,
            charmap,
            soundslike,
            affix,
            affix_compress,
            repls,
            mid_chars,
            config_defaults,
        })
    }

    /// Load a language from `<data_dir>/<name>.dat` and its companion
    /// files, without touching the process cache.
    pub fn load_uncached(name: &str, data_dir: &Path) -> Result<Language> {
        let dat_path = data_dir.join(format!("{}.dat", name));
        let descriptor = match std::fs::read_to_string(&dat_path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::UnknownLanguage(name.to_string()))
            }
            Err(e) => return Err(Error::io(&dat_path, e)),
        };

        // peek at the descriptor for the file names we must pull in
        let mut charset = "iso-8859-1".to_string();
        let mut soundslike = "none".to_string();
        let mut affix = "none".to_string();
        let mut repl = "none".to_string();
        for line in descriptor.lines() {
            let line = line.trim();
            if let Some((k, v)) = line.split_once(char::is_whitespace) {
                match k {
                    "charset" => charset = v.trim().to_string(),
                    "soundslike" => soundslike = v.trim().to_string(),
                    "affix" => affix = v.trim().to_string(),
                    "repl-table" => repl = v.trim().to_string(),
                    _ => {}
                }
            }
        }

        let read = |p: PathBuf| -> Result<String> {
            std::fs::read_to_string(&p).map_err(|e| Error::io(&p, e))
        };

        let sources = LanguageSources {
            cset: read(data_dir.join(format!("{}.cset", charset)))?,
            affix: if affix != "none" {
                Some(read(data_dir.join(format!("{}_affix.dat", affix)))?)
            } else {
                None
            },
            phonet: if soundslike == "phonet" {
                Some(read(data_dir.join(format!("{}_phonet.dat", name)))?)
            } else {
                None
            },
            repl: if repl != "none" {
                Some(read(data_dir.join(format!("{}_repl.dat", repl)))?)
            } else {
                None
            },
            descriptor,
        };
        debug!(lang = name, dir = %data_dir.display(), "loading language");
        Language::from_sources(&sources, &dat_path)
    }

    /// Load through the process-wide language cache.
    pub fn load(name: &str, data_dir: &Path) -> Result<Arc<Language>> {
        let key = (name.to_string(), data_dir.to_path_buf());
        let mut cache = LANGUAGE_CACHE.lock().expect("language cache poisoned");
        if let Some(weak) = cache.get(&key) {
            if let Some(lang) = weak.upgrade() {
                debug!(lang = name, "language cache hit");
                return Ok(lang);
            }
        }
        let lang = Arc::new(Language::load_uncached(name, data_dir)?);
        cache.insert(key, Arc::downgrade(&lang));
        Ok(lang)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn charset(&self) -> &str {
        &self.charset
    }

    pub fn data_encoding(&self) -> &str {
        &self.data_encoding
    }

    pub fn charmap(&self) -> &CharMap {
        &self.charmap
    }

    pub fn affix(&self) -> Option<&AffixMgr> {
        self.affix.as_ref()
    }

    pub fn affix_compress(&self) -> bool {
        self.affix_compress
    }

    pub fn soundslike_name(&self) -> &str {
        self.soundslike.name()
    }

    pub fn soundslike_version(&self) -> &str {
        self.soundslike.version()
    }

    pub fn have_soundslike(&self) -> bool {
        self.soundslike.is_phonetic()
    }

    pub fn to_soundslike(&self, word: &[u8]) -> Vec<u8> {
        self.soundslike.to_soundslike(&self.charmap, word)
    }

    /// Language-level replacement pairs for the suggestion pipeline.
    pub fn repls(&self) -> &[(Vec<u8>, Vec<u8>)] {
        &self.repls
    }

    /// Characters legal as run-together glue.
    pub fn mid_chars(&self) -> &[u8] {
        &self.mid_chars
    }

    /// Configuration defaults the descriptor suggests (applied only when
    /// the user has not set the key).
    pub fn config_defaults(&self) -> &[(String, String)] {
        &self.config_defaults
    }

    pub fn check_if_valid(&self, word: &[u8]) -> Result<()> {
        self.charmap.check_if_valid(word)
    }
}

fn parse_repl_table(text: &str, path: &Path) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
    let mut out = Vec::new();
    let mut expected: Option<usize> = None;
    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields[0] != "rep" {
            continue;
        }
        match (expected, fields.len()) {
            (None, 2) => {
                expected = Some(fields[1].parse().map_err(|_| {
                    Error::bad_format(path, lineno as u32 + 1, "rep <count>", line.to_string())
                })?);
            }
            (Some(_), 3) => {
                out.push((fields[1].as_bytes().to_vec(), fields[2].as_bytes().to_vec()));
            }
            _ => {
                return Err(Error::bad_format(
                    path,
                    lineno as u32 + 1,
                    "rep <mis> <cor>",
                    line.to_string(),
                ));
            }
        }
    }
    if let Some(n) = expected {
        if out.len() != n {
            return Err(Error::bad_format(
                path,
                0,
                format!("{} replacement entries", n),
                format!("{} entries", out.len()),
            ));
        }
    }
    Ok(out)
}

type LangCacheKey = (String, PathBuf);

static LANGUAGE_CACHE: Lazy<Mutex<AHashMap<LangCacheKey, Weak<Language>>>> =
    Lazy::new(|| Mutex::new(AHashMap::new()));

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;
    use crate::charmap::test_util::ascii_cset;
    use std::sync::Arc;

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

    pub fn test_descriptor(extra: &str) -> String {
        format!(
            "name test\ncharset ascii\nsoundslike generic\nspecial ' ***\nspecial - -*-\n{}",
            extra
        )
    }

    /// A small English-flavored language over the ASCII test charset.
    pub fn test_lang() -> Arc<Language> {
        let sources = LanguageSources {
            descriptor: test_descriptor("affix test\n"),
            cset: ascii_cset(),
            affix: Some(TEST_AFFIX.to_string()),
            phonet: None,
            repl: None,
        };
        Arc::new(Language::from_sources(&sources, Path::new("test.dat")).expect("test lang"))
    }

    /// Same language without an affix table or soundslike.
    pub fn plain_lang() -> Arc<Language> {
        let sources = LanguageSources {
            descriptor: "name plain\ncharset ascii\nspecial ' ***\n".to_string(),
            cset: ascii_cset(),
            ..LanguageSources::default()
        };
        Arc::new(Language::from_sources(&sources, Path::new("plain.dat")).expect("plain lang"))
    }
}

#[cfg(test)]
mod tests {
    use super::test_util::*;
    use super::*;

    #[test]
    fn descriptor_round_trip() {
        let lang = test_lang();
        assert_eq!(lang.name(), "test");
        assert_eq!(lang.charset(), "ascii");
        assert_eq!(lang.soundslike_name(), "generic");
        assert!(lang.affix().is_some());
        assert_eq!(lang.mid_chars(), b"'-");
    }

    #[test]
    fn missing_name_is_rejected() {
        let sources = LanguageSources {
            descriptor: "charset ascii\n".to_string(),
            cset: crate::charmap::test_util::ascii_cset(),
            ..LanguageSources::default()
        };
        assert!(Language::from_sources(&sources, Path::new("x.dat")).is_err());
    }

    #[test]
    fn soundslike_defaults_to_none() {
        let lang = plain_lang();
        assert_eq!(lang.soundslike_name(), "none");
        assert!(!lang.have_soundslike());
        assert_eq!(lang.to_soundslike(b"Hello"), b"hello");
    }

    #[test]
    fn store_as_follows_affix_compress() {
        let sources = LanguageSources {
            descriptor: test_descriptor("affix test\naffix-compress true\n"),
            cset: crate::charmap::test_util::ascii_cset(),
            affix: Some(TEST_AFFIX.to_string()),
            ..LanguageSources::default()
        };
        let lang = Language::from_sources(&sources, Path::new("t.dat")).unwrap();
        assert!(lang.affix_compress());
        assert_eq!(lang.charmap().store_as(), crate::charmap::StoreAs::Lower);
    }

    #[test]
    fn repl_table_parses_and_merges_affix_reps() {
        let sources = LanguageSources {
            descriptor: test_descriptor("repl-table test\n"),
            cset: crate::charmap::test_util::ascii_cset(),
            affix: None,
            phonet: None,
            repl: Some("rep 1\nrep teh the\n".to_string()),
        };
        let mut d = sources.clone();
        d.descriptor = test_descriptor("affix test\nrepl-table test\n");
        d.affix = Some(format!("{}REP 1\nREP ei ie\n", TEST_AFFIX));
        let lang = Language::from_sources(&d, Path::new("t.dat")).unwrap();
        let repls = lang.repls();
        assert!(repls.iter().any(|(m, c)| m == b"teh" && c == b"the"));
        assert!(repls.iter().any(|(m, c)| m == b"ei" && c == b"ie"));
    }

    #[test]
    fn config_defaults_are_collected() {
        let sources = LanguageSources {
            descriptor: test_descriptor("run-together true\nkeyboard standard\n"),
            cset: crate::charmap::test_util::ascii_cset(),
            affix: Some(TEST_AFFIX.to_string()),
            ..LanguageSources::default()
        };
        let lang = Language::from_sources(&sources, Path::new("t.dat")).unwrap();
        assert!(lang
            .config_defaults()
            .iter()
            .any(|(k, v)| k == "run-together" && v == "true"));
    }
}

//! libspell-core
//!
//! Language model, dictionaries, check and suggestion engine for the
//! libspell spell checker.
//!
//! Public API:
//! - `Speller` - composes dictionaries and drives check & suggest
//! - `Language` - per-language character tables, soundslike and affixes
//! - `ReadOnlyDict` / `WritableDict` / `ReplDict` / `MultiDict` - the
//!   dictionary backends
//! - `compile_dict` - builds a compiled dictionary from a word stream
//! - `Config` - configuration and feature flags

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod error;
pub use error::{Error, Result};

pub mod charmap;
pub use charmap::{CasePattern, CharMap, CompareOptions, SpecialChar, StoreAs};

pub mod phonet;
pub use phonet::PhonetRules;

pub mod soundslike;
pub use soundslike::Soundslike;

pub mod affix;
pub use affix::{AffixMgr, CheckInfo, GuessInfo, WordAff};

pub mod editdist;
pub use editdist::{edit_distance, limit1_edit_distance, limit2_edit_distance, EditDistanceWeights};

pub mod typo_editdist;
pub use typo_editdist::{typo_edit_distance, TypoWeights};

pub mod lang;
pub use lang::{Language, LanguageSources};

pub mod dict;
pub use dict::{DictFlags, DictId, Dictionary, WordEntry, WordKind};

pub mod readonly;
pub use readonly::ReadOnlyDict;

pub mod compile;
pub use compile::{compile_dict, create};

pub mod writable;
pub use writable::WritableDict;

pub mod repl;
pub use repl::ReplDict;

pub mod multi;
pub use multi::MultiDict;

pub mod cache;
pub use cache::DictCache;

pub mod speller;
pub use speller::{AttachFlags, Dict, DictRole, Speller};

pub mod suggest;
pub use suggest::SuggestParms;

/// Engine configuration.
///
/// This is the typed key-value store the driver hands a speller; the
/// hyphenated names of the text interface map onto these fields through
/// [`Config::set`].
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Language code, e.g. "en"
    pub lang: String,
    /// Directory holding `.dat`, `.cset`, affix, phonet and dictionary
    /// files
    pub dict_dir: PathBuf,
    /// Main compiled dictionary (`.rws`, or a `.multi` set); defaults to
    /// `<dict_dir>/<lang>.rws`
    pub master: Option<PathBuf>,
    /// Personal dictionary file; defaults to `<lang>.pws` in `dict_dir`
    pub personal: Option<PathBuf>,
    /// Personal replacement file; defaults to `<lang>.prepl` in
    /// `dict_dir`
    pub repl: Option<PathBuf>,
    /// Extra compiled dictionaries to attach
    pub extra_dicts: Vec<PathBuf>,
    /// Create personal / session / replacement dictionaries
    pub use_other_dicts: bool,

    /// Accept words at most this many bytes long
    pub ignore: usize,
    pub ignore_case: bool,
    pub ignore_accents: bool,
    pub strip_accents: bool,
    /// Drop store_replacement requests
    pub ignore_repl: bool,

    pub run_together: bool,
    /// At most 8 compound members
    pub run_together_limit: usize,
    /// Minimum length of each compound member
    pub run_together_min: usize,

    /// ultra | fast | normal | slow | bad-spellers
    pub sug_mode: String,
    /// Override the mode's soundslike edit-distance level (1 or 2)
    pub sug_edit_dist: Option<u8>,
    pub sug_typo_analysis: Option<bool>,
    pub sug_repl_table: Option<bool>,
    /// Characters tried when splitting a run-on word
    pub sug_split_chars: String,
    /// Keyboard layout name (`.kbd` file) or "none"
    pub keyboard: String,

    /// Entries kept in the per-speller suggestion cache
    pub suggest_cache_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            lang: "en".to_string(),
            dict_dir: PathBuf::from("."),
            master: None,
            personal: None,
            repl: None,
            extra_dicts: Vec::new(),
            use_other_dicts: true,
            ignore: 1,
            ignore_case: false,
            ignore_accents: false,
            strip_accents: false,
            ignore_repl: false,
            run_together: false,
            run_together_limit: 8,
            run_together_min: 3,
            sug_mode: "normal".to_string(),
            sug_edit_dist: None,
            sug_typo_analysis: None,
            sug_repl_table: None,
            sug_split_chars: " -".to_string(),
            keyboard: "standard".to_string(),
            suggest_cache_size: 100,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_toml_str(&content).map_err(|e| Error::bad_format(path, 0, "TOML", e.to_string()))
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::bad_format(path, 0, "serializable config", e.to_string()))?;
        std::fs::write(path, content).map_err(|e| Error::io(path, e))
    }

    /// Load configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Set a field through its hyphenated text-interface name.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let bad = |expected: &str| Error::BadValue {
            key: key.to_string(),
            value: value.to_string(),
            expected: expected.to_string(),
        };
        let parse_bool = |v: &str| match v {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(bad("true or false")),
        };
        match key {
            "lang" | "dict-dir" | "master" => {
                return Err(Error::CantChangeValue(key.to_string()))
            }
            "personal" => self.personal = Some(PathBuf::from(value)),
            "repl" => self.repl = Some(PathBuf::from(value)),
            "use-other-dicts" => self.use_other_dicts = parse_bool(value)?,
            "ignore" => self.ignore = value.parse().map_err(|_| bad("an integer"))?,
            "ignore-case" => self.ignore_case = parse_bool(value)?,
            "ignore-accents" => self.ignore_accents = parse_bool(value)?,
            "strip-accents" => self.strip_accents = parse_bool(value)?,
            "ignore-repl" => self.ignore_repl = parse_bool(value)?,
            "run-together" => self.run_together = parse_bool(value)?,
            "run-together-limit" => {
                let v: usize = value.parse().map_err(|_| bad("an integer"))?;
                self.run_together_limit = v.min(8);
            }
            "run-together-min" => {
                self.run_together_min = value.parse().map_err(|_| bad("an integer"))?
            }
            "sug-mode" => {
                SuggestParms::from_mode(value)?;
                self.sug_mode = value.to_string();
            }
            "sug-edit-dist" => match value {
                "1" => self.sug_edit_dist = Some(1),
                "2" => self.sug_edit_dist = Some(2),
                _ => return Err(bad("1 or 2")),
            },
            "sug-typo-analysis" => self.sug_typo_analysis = Some(parse_bool(value)?),
            "sug-repl-table" => self.sug_repl_table = Some(parse_bool(value)?),
            "sug-split-chars" => self.sug_split_chars = value.to_string(),
            "keyboard" => self.keyboard = value.to_string(),
            _ => return Err(Error::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    /// Apply a language-descriptor default: only fills keys the user
    /// left at their built-in defaults.
    pub(crate) fn apply_lang_default(&mut self, key: &str, value: &str) {
        let untouched = match key {
            "run-together" => !self.run_together,
            "run-together-limit" => self.run_together_limit == 8,
            "run-together-min" => self.run_together_min == 3,
            "keyboard" => self.keyboard == "standard",
            "sug-split-chars" => self.sug_split_chars == " -",
            _ => false,
        };
        if untouched {
            let _ = self.set(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_round_trip() {
        let mut c = Config::default();
        c.run_together = true;
        c.sug_mode = "fast".to_string();
        let text = toml::to_string_pretty(&c).unwrap();
        let back = Config::from_toml_str(&text).unwrap();
        assert!(back.run_together);
        assert_eq!(back.sug_mode, "fast");
    }

    #[test]
    fn set_by_key() {
        let mut c = Config::default();
        c.set("run-together", "true").unwrap();
        assert!(c.run_together);
        c.set("sug-mode", "ultra").unwrap();
        assert_eq!(c.sug_mode, "ultra");
        assert!(matches!(
            c.set("sug-mode", "nonsense"),
            Err(Error::BadValue { .. })
        ));
        assert!(matches!(c.set("no-such-key", "1"), Err(Error::UnknownKey(_))));
        assert!(matches!(c.set("lang", "de"), Err(Error::CantChangeValue(_))));
    }

    #[test]
    fn run_together_limit_is_clamped() {
        let mut c = Config::default();
        c.set("run-together-limit", "20").unwrap();
        assert_eq!(c.run_together_limit, 8);
    }
}

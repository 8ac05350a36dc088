//! Soundslike transforms.
//!
//! A soundslike maps a word to a phonetic key used for candidate
//! generation. Three variants exist, selected by the language descriptor:
//! `none` (the stripped form), `generic` (per-letter soundslike tables
//! with run collapsing) and `phonet` (a rule-file transducer).
//!
//! Two implementations with the same name and version must produce
//! identical output for identical input; compiled dictionaries record the
//! name and version and are rejected when they disagree.

use crate::charmap::CharMap;
use crate::phonet::PhonetRules;

#[derive(Debug, Clone)]
pub enum Soundslike {
    None,
    Generic,
    Phonet(PhonetRules),
}

impl Soundslike {
    pub fn name(&self) -> &str {
        match self {
            Soundslike::None => "none",
            Soundslike::Generic => "generic",
            Soundslike::Phonet(_) => "phonet",
        }
    }

    pub fn version(&self) -> &str {
        match self {
            Soundslike::None | Soundslike::Generic => "1.0",
            Soundslike::Phonet(rules) => rules.version(),
        }
    }

    /// Whether keys carry real phonetic information. The `none` transform
    /// is just the stripped form, and dictionaries built with it do not
    /// store explicit soundslike data.
    pub fn is_phonetic(&self) -> bool {
        !matches!(self, Soundslike::None)
    }

    pub fn to_soundslike(&self, cm: &CharMap, word: &[u8]) -> Vec<u8> {
        match self {
            Soundslike::None => cm.stripped_word(word),
            Soundslike::Generic => {
                let mut out = Vec::with_capacity(word.len());
                for (i, &b) in word.iter().enumerate() {
                    let sl = if i == 0 { cm.sl_first(b) } else { cm.sl_rest(b) };
                    if sl != 0 && out.last() != Some(&sl) {
                        out.push(sl);
                    }
                }
                out
            }
            Soundslike::Phonet(rules) => rules.transform(cm, word),
        }
    }
}

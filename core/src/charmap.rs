//! Per-language character tables.
//!
//! A [`CharMap`] holds the fixed 256-entry tables describing one 8-bit
//! character set as seen by one language: case mappings, accent stripping,
//! the "clean" canonical form, soundslike letter classes and the special
//! characters (apostrophes, hyphens) that may appear only at certain word
//! positions. Words are byte strings in the language's data encoding;
//! nothing here allocates per lookup.

use crate::error::{Error, InvalidWordReason, Result};
use std::path::Path;

pub const SET_SIZE: usize = 256;

/// Broad class of a byte value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    Other,
    Space,
    Letter,
}

/// Position flags for punctuation-like characters that are legal inside
/// words (apostrophes, hyphens).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpecialChar {
    pub begin: bool,
    pub middle: bool,
    pub end: bool,
}

impl SpecialChar {
    pub fn any(&self) -> bool {
        self.begin || self.middle || self.end
    }
}

/// Case shape of a word, used to restore the original casing on
/// suggestions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasePattern {
    AllUpper,
    FirstUpper,
    AllLower,
    Other,
}

/// Which canonical form words are stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreAs {
    Stripped,
    Lower,
}

// CharInfo bits, and-able across a word: a byte that is its own upper
// form carries UPPER, etc. Non-letters are symmetric under case mapping
// and so carry every case bit, which keeps whole-word scans simple.
const LETTER: u8 = 1 << 0;
const UPPER: u8 = 1 << 1;
const LOWER: u8 = 1 << 2;
const TITLE: u8 = 1 << 3;
const PLAIN: u8 = 1 << 4;
const ALL_INFO: u8 = LETTER | UPPER | LOWER | TITLE | PLAIN;

#[derive(Debug)]
pub struct CharMap {
    to_upper: [u8; SET_SIZE],
    to_lower: [u8; SET_SIZE],
    to_title: [u8; SET_SIZE],
    to_plain: [u8; SET_SIZE],
    to_stripped: [u8; SET_SIZE],
    to_clean: [u8; SET_SIZE],
    sl_first: [u8; SET_SIZE],
    sl_rest: [u8; SET_SIZE],
    to_normalized: [u8; SET_SIZE],
    to_unicode: [u32; SET_SIZE],
    class: [CharClass; SET_SIZE],
    info: [u8; SET_SIZE],
    special: [SpecialChar; SET_SIZE],
    max_normalized: u8,
    clean_chars: Vec<u8>,
    stripped_chars: Vec<u8>,
    store_as: StoreAs,
}

impl CharMap {
    /// Build the tables from the text of a `.cset` file.
    ///
    /// The file starts with free-form comment lines; the last header line
    /// begins with `/`. It is followed by exactly 256 data lines, one per
    /// byte value:
    ///
    /// `<hex byte> <hex codepoint> <class> <display> <upper> <lower>
    ///  <title> <plain> <sl-first> <sl-rest>`
    pub fn from_cset(
        text: &str,
        path: &Path,
        store_as: StoreAs,
        special: &[(u8, SpecialChar)],
    ) -> Result<CharMap> {
        let mut cm = CharMap {
            to_upper: [0; SET_SIZE],
            to_lower: [0; SET_SIZE],
            to_title: [0; SET_SIZE],
            to_plain: [0; SET_SIZE],
            to_stripped: [0; SET_SIZE],
            to_clean: [0; SET_SIZE],
            sl_first: [0; SET_SIZE],
            sl_rest: [0; SET_SIZE],
            to_normalized: [0; SET_SIZE],
            to_unicode: [0; SET_SIZE],
            class: [CharClass::Other; SET_SIZE],
            info: [0; SET_SIZE],
            special: [SpecialChar::default(); SET_SIZE],
            max_normalized: 0,
            clean_chars: Vec::new(),
            stripped_chars: Vec::new(),
            store_as,
        };

        let mut lines = text.lines().enumerate();
        // Skip the header; it ends with a line starting with '/'.
        loop {
            match lines.next() {
                Some((_, l)) if l.starts_with('/') => break,
                Some(_) => continue,
                None => {
                    return Err(Error::bad_format(
                        path,
                        0,
                        "a '/' terminated header",
                        "end of file",
                    ))
                }
            }
        }

        let hex = |tok: &str, lineno: usize| -> Result<u32> {
            u32::from_str_radix(tok, 16).map_err(|_| {
                Error::bad_format(path, lineno as u32 + 1, "a hex number", tok.to_string())
            })
        };

        for i in 0..SET_SIZE {
            let (lineno, line) = match lines.find(|(_, l)| !l.trim().is_empty()) {
                Some(x) => x,
                None => {
                    return Err(Error::bad_format(
                        path,
                        0,
                        "256 character entries",
                        format!("{} entries", i),
                    ))
                }
            };
            let f: Vec<&str> = line.split_whitespace().collect();
            if f.len() < 10 {
                return Err(Error::bad_format(
                    path,
                    lineno as u32 + 1,
                    "10 fields",
                    format!("{} fields", f.len()),
                ));
            }
            if hex(f[0], lineno)? != i as u32 {
                return Err(Error::bad_format(
                    path,
                    lineno as u32 + 1,
                    format!("byte {:02x}", i),
                    f[0].to_string(),
                ));
            }
            cm.to_unicode[i] = hex(f[1], lineno)?;
            cm.class[i] = match f[2] {
                "L" => CharClass::Letter,
                "W" => CharClass::Space,
                _ => CharClass::Other,
            };
            // f[3] is the display form, unused here.
            cm.to_upper[i] = hex(f[4], lineno)? as u8;
            cm.to_lower[i] = hex(f[5], lineno)? as u8;
            cm.to_title[i] = hex(f[6], lineno)? as u8;
            cm.to_plain[i] = hex(f[7], lineno)? as u8;
            cm.sl_first[i] = hex(f[8], lineno)? as u8;
            cm.sl_rest[i] = hex(f[9], lineno)? as u8;

            let mut inf = if cm.class[i] == CharClass::Letter {
                LETTER
            } else {
                0
            };
            if cm.to_upper[i] as usize == i {
                inf |= UPPER;
            }
            if cm.to_lower[i] as usize == i {
                inf |= LOWER;
            }
            if cm.to_title[i] as usize == i {
                inf |= TITLE;
            }
            if cm.to_plain[i] as usize == i || cm.to_plain[i] == 0 {
                inf |= PLAIN;
            }
            cm.info[i] = inf;
        }

        for &(c, s) in special {
            cm.special[c as usize] = s;
        }

        // Byte 0 and 1 are reserved as sentinels for clean scans.
        cm.to_plain[0] = 1;
        cm.to_plain[1] = 1;

        for i in 0..SET_SIZE {
            cm.to_stripped[i] = cm.to_plain[cm.to_lower[i] as usize];
        }

        for i in 0..SET_SIZE {
            cm.to_clean[i] = if cm.class[i] == CharClass::Letter {
                match store_as {
                    StoreAs::Stripped => cm.to_stripped[i],
                    StoreAs::Lower => cm.to_lower[i],
                }
            } else {
                0
            };
        }
        cm.to_clean[0x00] = 0x10;
        cm.to_clean[0x10] = 0x10;

        // Letters sharing a stripped form share one small normalized
        // index; the typo weight matrix is indexed by it.
        let mut c: u8 = 1;
        for i in 0..SET_SIZE {
            if cm.is_alpha(i as u8) {
                let s = cm.to_stripped[i] as usize;
                if cm.to_normalized[s] == 0 {
                    cm.to_normalized[i] = c;
                    cm.to_normalized[s] = c;
                    c += 1;
                } else {
                    cm.to_normalized[i] = cm.to_normalized[s];
                }
            }
        }
        for i in 0..SET_SIZE {
            if cm.to_normalized[i] == 0 {
                cm.to_normalized[i] = c;
            }
        }
        cm.max_normalized = c;

        cm.clean_chars = cm.collect_forms(|cm, b| cm.to_clean[b as usize]);
        cm.stripped_chars = cm.collect_forms(|cm, b| cm.to_stripped[b as usize]);

        Ok(cm)
    }

    fn collect_forms(&self, form: impl Fn(&CharMap, u8) -> u8) -> Vec<u8> {
        let mut set = [false; SET_SIZE];
        for i in 0..SET_SIZE {
            let b = i as u8;
            if self.is_alpha(b) || self.special(b).any() {
                set[form(self, b) as usize] = true;
            }
        }
        (1..SET_SIZE).filter(|&i| set[i]).map(|i| i as u8).collect()
    }

    pub fn store_as(&self) -> StoreAs {
        self.store_as
    }

    pub fn to_upper(&self, b: u8) -> u8 {
        self.to_upper[b as usize]
    }
    pub fn to_lower(&self, b: u8) -> u8 {
        self.to_lower[b as usize]
    }
    pub fn to_title(&self, b: u8) -> u8 {
        self.to_title[b as usize]
    }
    pub fn to_plain(&self, b: u8) -> u8 {
        self.to_plain[b as usize]
    }
    pub fn to_stripped(&self, b: u8) -> u8 {
        self.to_stripped[b as usize]
    }
    pub fn to_clean(&self, b: u8) -> u8 {
        self.to_clean[b as usize]
    }
    pub fn sl_first(&self, b: u8) -> u8 {
        self.sl_first[b as usize]
    }
    pub fn sl_rest(&self, b: u8) -> u8 {
        self.sl_rest[b as usize]
    }
    pub fn to_normalized(&self, b: u8) -> u8 {
        self.to_normalized[b as usize]
    }
    pub fn max_normalized(&self) -> u8 {
        self.max_normalized
    }
    pub fn to_unicode(&self, b: u8) -> u32 {
        self.to_unicode[b as usize]
    }
    pub fn char_class(&self, b: u8) -> CharClass {
        self.class[b as usize]
    }
    pub fn special(&self, b: u8) -> SpecialChar {
        self.special[b as usize]
    }

    pub fn is_alpha(&self, b: u8) -> bool {
        self.class[b as usize] == CharClass::Letter
    }
    pub fn is_upper(&self, b: u8) -> bool {
        self.info[b as usize] & (LETTER | UPPER) == LETTER | UPPER
    }
    pub fn is_lower(&self, b: u8) -> bool {
        self.info[b as usize] & (LETTER | LOWER) == LETTER | LOWER
    }
    pub fn is_title(&self, b: u8) -> bool {
        self.info[b as usize] & (LETTER | TITLE) == LETTER | TITLE
    }
    pub fn is_plain(&self, b: u8) -> bool {
        self.info[b as usize] & PLAIN != 0
    }

    /// Every distinct nonzero clean form of a letter or special char,
    /// ascending. The one-edit suggestion pass substitutes from this set.
    pub fn clean_chars(&self) -> &[u8] {
        &self.clean_chars
    }

    pub fn stripped_chars(&self) -> &[u8] {
        &self.stripped_chars
    }

    // ---- whole-word helpers ----

    pub fn lower_word(&self, w: &[u8]) -> Vec<u8> {
        w.iter().map(|&b| self.to_lower(b)).collect()
    }

    pub fn upper_word(&self, w: &[u8]) -> Vec<u8> {
        w.iter().map(|&b| self.to_upper(b)).collect()
    }

    /// Clean form of a word: non-letters drop out.
    pub fn clean_word(&self, w: &[u8]) -> Vec<u8> {
        w.iter()
            .map(|&b| self.to_clean(b))
            .filter(|&c| c != 0 && c != 0x10)
            .collect()
    }

    /// Stripped (lowercased, accent-free) form of a word.
    pub fn stripped_word(&self, w: &[u8]) -> Vec<u8> {
        w.iter()
            .map(|&b| self.to_stripped(b))
            .filter(|&c| c > 1)
            .collect()
    }

    pub fn normalized_word(&self, w: &[u8]) -> Vec<u8> {
        w.iter().map(|&b| self.to_normalized(b)).collect()
    }

    /// Case shape of a word. A word with no letters counts as all-upper,
    /// which lets suggestions through unchanged.
    pub fn case_pattern(&self, w: &[u8]) -> CasePattern {
        let mut iter = w.iter();
        let mut all = ALL_INFO;
        let first;
        loop {
            match iter.next() {
                Some(&b) => {
                    let inf = self.info[b as usize];
                    all &= inf;
                    if inf & LETTER != 0 {
                        first = inf;
                        break;
                    }
                }
                None => return CasePattern::AllUpper,
            }
        }
        for &b in iter {
            all &= self.info[b as usize];
        }
        if all & UPPER != 0 {
            CasePattern::AllUpper
        } else if all & LOWER != 0 {
            CasePattern::AllLower
        } else if first & TITLE != 0 {
            CasePattern::FirstUpper
        } else {
            CasePattern::Other
        }
    }

    /// Re-apply a case shape to a (lowercase) suggestion.
    pub fn fix_case(&self, pattern: CasePattern, w: &[u8]) -> Vec<u8> {
        if w.is_empty() {
            return Vec::new();
        }
        match pattern {
            CasePattern::AllUpper => self.upper_word(w),
            CasePattern::FirstUpper if self.is_lower(w[0]) => {
                let mut out = w.to_vec();
                out[0] = self.to_title(w[0]);
                out
            }
            _ => w.to_vec(),
        }
    }

    /// Validate that a word is made of letters plus correctly positioned
    /// special characters.
    pub fn check_if_valid(&self, w: &[u8]) -> Result<()> {
        if w.is_empty() {
            return Err(Error::invalid_word(w, InvalidWordReason::Empty));
        }
        if !w.iter().any(|&b| self.is_alpha(b)) {
            return Err(Error::invalid_word(w, InvalidWordReason::NoLetters));
        }
        let first = w[0];
        if !self.is_alpha(first) && !self.special(first).begin {
            return Err(Error::invalid_word(
                w,
                InvalidWordReason::IllegalLeadingChar(first),
            ));
        }
        if w.len() > 1 {
            let last = w[w.len() - 1];
            if !self.is_alpha(last) && !self.special(last).end {
                return Err(Error::invalid_word(
                    w,
                    InvalidWordReason::IllegalTrailingChar(last),
                ));
            }
        }
        for &b in &w[1..w.len().saturating_sub(1)] {
            if !self.is_alpha(b) && !self.special(b).middle {
                return Err(Error::invalid_word(
                    w,
                    InvalidWordReason::IllegalMiddleChar(b),
                ));
            }
        }
        Ok(())
    }
}

/// How a looked-up word must compare against the dictionary form.
///
/// `matches` implements the asymmetric rules of a case-aware dictionary:
/// a lowercase list word accepts any casing of the input, a cased list
/// word requires compatible casing, and an all-upper input matches
/// regardless.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompareOptions {
    pub case_insensitive: bool,
    pub ignore_accents: bool,
    pub strip_accents: bool,
}

impl CompareOptions {
    pub fn matches(&self, cm: &CharMap, word: &[u8], inlist: &[u8]) -> bool {
        if word.is_empty() || inlist.is_empty() {
            return false;
        }
        let mut w = 0usize;
        let mut l = 0usize;
        // A leading begin-char in the list form must be present in the
        // input; a leading begin-char in the input alone is skipped.
        if cm.special(inlist[0]).begin {
            if word[0] != inlist[0] {
                return false;
            }
            w += 1;
            l += 1;
        } else if cm.special(word[0]).begin {
            w += 1;
        }
        if w >= word.len() || l >= inlist.len() {
            return false;
        }

        if self.case_insensitive {
            while w < word.len() && l < inlist.len() {
                let (a, b) = (word[w], inlist[l]);
                let ok = if self.ignore_accents {
                    cm.to_stripped(a) == cm.to_stripped(b)
                } else if self.strip_accents {
                    cm.to_lower(a) == cm.to_plain(cm.to_lower(b))
                } else {
                    cm.to_lower(a) == cm.to_lower(b)
                };
                if !ok {
                    return false;
                }
                w += 1;
                l += 1;
            }
        } else {
            let mut case_compatible = true;
            let (a, b) = (word[w], inlist[l]);
            if !self.ignore_accents {
                let ok = if self.strip_accents {
                    cm.to_lower(a) == cm.to_plain(cm.to_lower(b))
                } else {
                    cm.to_lower(a) == cm.to_lower(b)
                };
                if !ok {
                    return false;
                }
            }
            if !cm.is_lower(b) && cm.to_plain(a) != cm.to_plain(b) {
                case_compatible = false;
            }
            let mut all_upper = cm.is_upper(a);
            w += 1;
            l += 1;
            while w < word.len() && l < inlist.len() {
                let (a, b) = (word[w], inlist[l]);
                if !cm.is_upper(a) {
                    all_upper = false;
                }
                if self.ignore_accents {
                    if cm.to_plain(a) != cm.to_plain(b) {
                        if cm.to_stripped(a) != cm.to_stripped(b) {
                            return false;
                        }
                        case_compatible = false;
                    }
                } else if self.strip_accents {
                    if a != cm.to_plain(b) {
                        if cm.to_lower(a) != cm.to_plain(cm.to_lower(b)) {
                            return false;
                        }
                        case_compatible = false;
                    }
                } else if a != b {
                    if cm.to_lower(a) != cm.to_lower(b) {
                        return false;
                    }
                    case_compatible = false;
                }
                w += 1;
                l += 1;
            }
            if all_upper {
                case_compatible = true;
            }
            if !case_compatible {
                return false;
            }
        }

        if w + 1 == word.len() && cm.special(word[w]).end {
            w += 1;
        }
        w == word.len() && l == inlist.len()
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;

    /// Generate ASCII `.cset` text covering bytes 0..=255; letters map the
    /// way `a`..`z` / `A`..`Z` do in Latin charsets and sl tables collapse
    /// to the uppercase letter.
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
            // ASCII has no accents: the plain form is the byte itself.
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

    pub fn ascii_charmap() -> CharMap {
        let special = [
            (
                b'\'',
                SpecialChar {
                    begin: true,
                    middle: true,
                    end: true,
                },
            ),
            (
                b'-',
                SpecialChar {
                    begin: false,
                    middle: true,
                    end: false,
                },
            ),
        ];
        CharMap::from_cset(
            &ascii_cset(),
            Path::new("ascii.cset"),
            StoreAs::Stripped,
            &special,
        )
        .expect("ascii cset")
    }
}

#[cfg(test)]
mod tests {
    use super::test_util::ascii_charmap;
    use super::*;

    #[test]
    fn stripped_is_idempotent() {
        let cm = ascii_charmap();
        for i in 0..=255u8 {
            let s = cm.to_stripped(i);
            assert_eq!(cm.to_stripped(s), s, "byte {:#x}", i);
        }
    }

    #[test]
    fn lower_is_idempotent() {
        let cm = ascii_charmap();
        for i in 0..=255u8 {
            let l = cm.to_lower(i);
            assert_eq!(cm.to_lower(l), l);
        }
    }

    #[test]
    fn plain_sentinels() {
        let cm = ascii_charmap();
        assert_eq!(cm.to_plain(0), 1);
        assert_eq!(cm.to_plain(1), 1);
    }

    #[test]
    fn letters_have_nonzero_clean() {
        let cm = ascii_charmap();
        for i in 0..=255u8 {
            if cm.is_alpha(i) {
                assert_ne!(cm.to_clean(i), 0);
            } else if !cm.special(i).any() && i != 0 && i != 0x10 {
                assert_eq!(cm.to_clean(i), 0);
            }
        }
    }

    #[test]
    fn case_patterns() {
        let cm = ascii_charmap();
        assert_eq!(cm.case_pattern(b"HELLO"), CasePattern::AllUpper);
        assert_eq!(cm.case_pattern(b"Hello"), CasePattern::FirstUpper);
        assert_eq!(cm.case_pattern(b"hello"), CasePattern::AllLower);
        assert_eq!(cm.case_pattern(b"heLLo"), CasePattern::Other);
        assert_eq!(cm.case_pattern(b"123"), CasePattern::AllUpper);
    }

    #[test]
    fn fix_case_restores_shape() {
        let cm = ascii_charmap();
        assert_eq!(cm.fix_case(CasePattern::AllUpper, b"hello"), b"HELLO");
        assert_eq!(cm.fix_case(CasePattern::FirstUpper, b"hello"), b"Hello");
        assert_eq!(cm.fix_case(CasePattern::AllLower, b"hello"), b"hello");
    }

    #[test]
    fn word_validation() {
        let cm = ascii_charmap();
        assert!(cm.check_if_valid(b"hello").is_ok());
        assert!(cm.check_if_valid(b"don't").is_ok());
        assert!(cm.check_if_valid(b"well-known").is_ok());
        assert!(cm.check_if_valid(b"").is_err());
        assert!(cm.check_if_valid(b"123").is_err());
        assert!(cm.check_if_valid(b"-hello").is_err());
        assert!(cm.check_if_valid(b"hello-").is_err());
    }

    #[test]
    fn sensitive_compare_casing() {
        let cm = ascii_charmap();
        let sensitive = CompareOptions::default();
        // Lowercase list words accept any input casing.
        assert!(sensitive.matches(&cm, b"hello", b"hello"));
        assert!(sensitive.matches(&cm, b"Hello", b"hello"));
        assert!(sensitive.matches(&cm, b"HELLO", b"hello"));
        // A cased list word wants compatible casing; all-upper input is
        // always fine.
        assert!(sensitive.matches(&cm, b"Paris", b"Paris"));
        assert!(!sensitive.matches(&cm, b"paris", b"Paris"));
        assert!(sensitive.matches(&cm, b"PARIS", b"Paris"));

        let insensitive = CompareOptions {
            case_insensitive: true,
            ..CompareOptions::default()
        };
        assert!(insensitive.matches(&cm, b"paris", b"Paris"));
    }

    #[test]
    fn normalized_indices_are_compact() {
        let cm = ascii_charmap();
        assert_eq!(cm.to_normalized(b'a'), cm.to_normalized(b'A'));
        assert!(cm.max_normalized() >= 26);
        assert_eq!(cm.to_normalized(b'!'), cm.max_normalized());
    }
}

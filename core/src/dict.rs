//! The uniform dictionary interface.
//!
//! Every backing store (compiled read-only, writable personal/session,
//! replacement-pair, dictionary set) exposes the same lookup surface so
//! the speller can walk an ordered list of attachments without caring
//! what is behind each one.

use crate::charmap::{CharMap, CompareOptions};
use crate::lang::Language;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Process-unique dictionary identity, used by attach/detach.
pub type DictId = u64;

static NEXT_DICT_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_dict_id() -> DictId {
    NEXT_DICT_ID.fetch_add(1, Ordering::Relaxed)
}

/// What a dictionary entry represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordKind {
    Word,
    /// a known misspelling from a replacement dictionary
    Misspelled,
}

/// One word as handed out by a dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordEntry {
    pub word: Vec<u8>,
    /// affix flags still attached (affix-compressed dictionaries only)
    pub aff: Vec<u8>,
    pub what: WordKind,
}

impl WordEntry {
    pub fn new(word: impl Into<Vec<u8>>) -> WordEntry {
        WordEntry {
            word: word.into(),
            aff: Vec::new(),
            what: WordKind::Word,
        }
    }

    pub fn with_aff(word: impl Into<Vec<u8>>, aff: impl Into<Vec<u8>>) -> WordEntry {
        WordEntry {
            word: word.into(),
            aff: aff.into(),
            what: WordKind::Word,
        }
    }
}

/// Capability flags the speller uses to organize its work lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DictFlags {
    pub have_soundslike: bool,
    pub fast_lookup: bool,
    pub fast_scan: bool,
    pub affix_compressed: bool,
}

/// Handle to one soundslike group produced by a scan; pass it back to
/// `soundslike_lookup` to enumerate the words behind it.
#[derive(Debug, Clone)]
pub struct SoundslikeGroup {
    pub soundslike: Vec<u8>,
    pub key: SoundslikeKey,
}

#[derive(Debug, Clone)]
pub enum SoundslikeKey {
    /// offset of the word run inside a compiled data block
    Offset(u32),
    /// the soundslike itself, for hash-backed dictionaries
    Exact(Vec<u8>),
    /// a single word standing in for its own soundslike
    Single(WordEntry),
    /// a jump-table prefix with no words of its own; scored only to
    /// steer bucket skipping
    Empty,
}

/// A soundslike cursor. `stopped_at` hints how many leading bytes of the
/// previous soundslike already exceeded the caller's edit-distance limit;
/// implementations may use it to skip every entry sharing that prefix.
/// Pass `usize::MAX` to advance one entry.
pub trait SoundslikeIter {
    fn next(&mut self, stopped_at: usize) -> Option<SoundslikeGroup>;
}

/// The operations every dictionary provides.
pub trait Dictionary {
    fn id(&self) -> DictId;
    fn lang(&self) -> &Arc<Language>;
    fn size(&self) -> usize;
    fn flags(&self) -> DictFlags;

    /// Case/accent-aware lookup under the attachment's compare policy.
    fn lookup(&self, word: &[u8], cmp: &CompareOptions) -> Option<WordEntry>;

    /// Case-insensitive lookup by clean form; may return several entries
    /// when distinct words share one clean form.
    fn clean_lookup(&self, clean: &[u8]) -> Vec<WordEntry>;

    /// All words behind one soundslike group.
    fn soundslike_lookup(&self, key: &SoundslikeKey) -> Vec<WordEntry>;

    fn soundslike_iter(&self) -> Box<dyn SoundslikeIter + '_>;
}

/// Hash of a word's clean form; identical for any two words that compare
/// equal under insensitive comparison. Compiled dictionaries store this,
/// so the function is part of the file format.
pub fn insensitive_hash(cm: &CharMap, word: &[u8]) -> u32 {
    let mut h: u32 = 0;
    for &b in word {
        let c = cm.to_clean(b);
        if c != 0 && c != 0x10 {
            h = h.wrapping_mul(66).wrapping_add(c as u32);
        }
    }
    h
}

/// Insensitive equality: equal clean forms.
pub fn insensitive_eq(cm: &CharMap, a: &[u8], b: &[u8]) -> bool {
    let mut ai = a.iter().map(|&x| cm.to_clean(x)).filter(|&c| c != 0 && c != 0x10);
    let mut bi = b.iter().map(|&x| cm.to_clean(x)).filter(|&c| c != 0 && c != 0x10);
    loop {
        match (ai.next(), bi.next()) {
            (None, None) => return true,
            (Some(x), Some(y)) if x == y => continue,
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::test_util::test_lang;

    #[test]
    fn insensitive_hash_ignores_case_and_specials() {
        let lang = test_lang();
        let cm = lang.charmap();
        assert_eq!(insensitive_hash(cm, b"Hello"), insensitive_hash(cm, b"hello"));
        assert_eq!(insensitive_hash(cm, b"dont"), insensitive_hash(cm, b"don't"));
        assert_ne!(insensitive_hash(cm, b"hello"), insensitive_hash(cm, b"hallo"));
    }

    #[test]
    fn insensitive_eq_matches_hash_semantics() {
        let lang = test_lang();
        let cm = lang.charmap();
        assert!(insensitive_eq(cm, b"Hello", b"hello"));
        assert!(insensitive_eq(cm, b"dont", b"don't"));
        assert!(!insensitive_eq(cm, b"hello", b"hell"));
    }
}

//! Keyboard-aware edit distance used to re-rank suggestions.
//!
//! Substitution and extra-letter costs come from matrices indexed by the
//! language's normalized letter index; a `.kbd` layout file lists pairs of
//! adjacent keys, which get the cheaper distance-1 costs. Weight tables
//! are cached per (keyboard, language) since building them walks the full
//! matrix.

use crate::charmap::CharMap;
use crate::error::{Error, Result};
use ahash::AHashMap;
use once_cell::sync::Lazy;
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Debug)]
pub struct TypoWeights {
    /// cost of a letter missing from the typed word
    pub missing: i32,
    /// cost of two adjacent letters swapped
    pub swap: i32,
    /// substitution cost for keys next to each other
    pub repl_dis1: i32,
    /// substitution cost otherwise
    pub repl_dis2: i32,
    /// extra-letter cost when the neighbor matches (repeated letter)
    pub extra_dis1: i32,
    /// extra-letter cost otherwise (stray letter)
    pub extra_dis2: i32,
    pub keyboard: String,
    n: usize,
    repl: Vec<i32>,
    extra: Vec<i32>,
}

impl TypoWeights {
    /// Build the weight matrices from `.kbd` text: one pair of adjacent
    /// keys per line, blank lines and `#` comments ignored.
    pub fn from_kbd(text: &str, path: &Path, cm: &CharMap, keyboard: &str) -> Result<TypoWeights> {
        let n = cm.max_normalized() as usize + 1;
        let mut w = TypoWeights {
            missing: 85,
            swap: 60,
            repl_dis1: 70,
            repl_dis2: 110,
            extra_dis1: 70,
            extra_dis2: 100,
            keyboard: keyboard.to_string(),
            n,
            repl: vec![110; n * n],
            extra: vec![100; n * n],
        };

        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let pair = line.as_bytes();
            if pair.len() != 2 {
                return Err(Error::bad_format(
                    path,
                    lineno as u32 + 1,
                    "a pair of adjacent keys",
                    line.to_string(),
                ));
            }
            let (a, b) = (cm.to_normalized(pair[0]), cm.to_normalized(pair[1]));
            w.set_repl(a, b, w.repl_dis1);
            w.set_repl(b, a, w.repl_dis1);
            w.set_extra(a, b, w.extra_dis1);
            w.set_extra(b, a, w.extra_dis1);
        }

        for i in 0..n {
            w.set_repl(i as u8, i as u8, 0);
            let e1 = w.extra_dis1;
            w.set_extra(i as u8, i as u8, e1);
        }
        Ok(w)
    }

    /// Uniform weights when no keyboard layout is available.
    pub fn without_keyboard(cm: &CharMap) -> TypoWeights {
        Self::from_kbd("", Path::new("<none>"), cm, "none").expect("empty kbd")
    }

    fn set_repl(&mut self, a: u8, b: u8, v: i32) {
        let i = a as usize * self.n + b as usize;
        self.repl[i] = v;
    }

    pub fn repl(&self, a: u8, b: u8) -> i32 {
        self.repl[a as usize * self.n + b as usize]
    }

    fn set_extra(&mut self, a: u8, b: u8, v: i32) {
        let i = a as usize * self.n + b as usize;
        self.extra[i] = v;
    }

    pub fn extra(&self, a: u8, b: u8) -> i32 {
        self.extra[a as usize * self.n + b as usize]
    }
}

/// Distance from the typed `word` to a candidate `target`, both already
/// mapped through [`CharMap::normalized_word`].
pub fn typo_edit_distance(word: &[u8], target: &[u8], w: &TypoWeights) -> i32 {
    let (m, n) = (word.len(), target.len());
    let idx = |i: usize, j: usize| i * (n + 1) + j;
    let mut e = vec![0i32; (m + 1) * (n + 1)];
    for j in 1..=n {
        e[idx(0, j)] = e[idx(0, j - 1)] + w.missing;
    }
    // 1-based accessors over the input strings
    let wc = |i: usize| word[i - 1];
    let tc = |j: usize| target[j - 1];
    for i in 1..=m {
        e[idx(i, 0)] = e[idx(i - 1, 0)] + w.extra_dis2;
        for j in 1..=n {
            if wc(i) == tc(j) {
                e[idx(i, j)] = e[idx(i - 1, j - 1)];
                continue;
            }
            let mut best = e[idx(i - 1, j - 1)] + w.repl(wc(i), tc(j));
            if i != 1 {
                // dropping word[i] as an extra letter, judged against its
                // left neighbor
                best = best.min(e[idx(i - 1, j)] + w.extra(wc(i - 1), tc(j)));
                best = best.min(
                    e[idx(i - 2, j - 1)] + w.extra(wc(i - 1), tc(j)) + w.repl(wc(i), tc(j)),
                );
            } else {
                best = best.min(e[idx(i - 1, j)] + w.extra_dis2);
            }
            best = best.min(e[idx(i, j - 1)] + w.missing);
            if i != 1 && j != 1 {
                best = best.min(
                    e[idx(i - 2, j - 2)]
                        + w.swap
                        + w.repl(wc(i), tc(j - 1))
                        + w.repl(wc(i - 1), tc(j)),
                );
            }
            e[idx(i, j)] = best;
        }
    }
    e[idx(m, n)]
}

type TypoCacheKey = (String, String);

static TYPO_CACHE: Lazy<Mutex<AHashMap<TypoCacheKey, Arc<TypoWeights>>>> =
    Lazy::new(|| Mutex::new(AHashMap::new()));

/// Load (or fetch from the process cache) the typo weights for a keyboard
/// file, keyed per language since the matrices depend on its normalized
/// letter indices.
pub fn cached_typo_weights(
    kbd_text: &str,
    kbd_path: &Path,
    cm: &CharMap,
    keyboard: &str,
    lang_name: &str,
) -> Result<Arc<TypoWeights>> {
    let key = (keyboard.to_string(), lang_name.to_string());
    let mut cache = TYPO_CACHE.lock().expect("typo weight cache poisoned");
    if let Some(w) = cache.get(&key) {
        return Ok(w.clone());
    }
    let w = Arc::new(TypoWeights::from_kbd(kbd_text, kbd_path, cm, keyboard)?);
    cache.insert(key, w.clone());
    Ok(w)
}

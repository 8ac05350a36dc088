//! Candidate generation and scoring for misspelled words.
//!
//! The pipeline merges two classic strategies: find words whose
//! soundslike is within a small edit distance of the misspelling's, and
//! the near-miss transformations (split, change, swap, insert, delete a
//! letter). Survivors are scored by a weighted average of the soundslike
//! edit distance and the clean-form edit distance, optionally re-ranked
//! by keyboard-aware typo analysis, then deduplicated, limited and
//! re-cased like the input.
//!
//! Scoring is lazy: a first pass only computes word distances tight
//! enough to establish a threshold from the best few candidates, a
//! second pass gives the rest one chance under that threshold, and the
//! n-gram fallback only runs when the pool stayed thin.

use crate::charmap::CasePattern;
use crate::dict::{SoundslikeKey, WordKind};
use crate::editdist::{
    bounded_edit_distance, edit_distance, limit1_edit_distance, limit2_edit_distance, EditDist,
    EditDistanceWeights, LARGE_NUM,
};
use crate::error::{Error, Result};
use crate::speller::{Speller, SpellerDict};
use crate::typo_editdist::typo_edit_distance;
use crate::Config;
use ahash::AHashSet;

/// Tunables of one suggestion run, preset by mode.
#[derive(Debug, Clone)]
pub struct SuggestParms {
    pub edit_distance_weights: EditDistanceWeights,
    pub normal_soundslike_weight: i32,
    pub small_word_soundslike_weight: i32,
    pub small_word_threshold: usize,
    pub soundslike_weight: i32,
    pub word_weight: i32,
    pub split_chars: Vec<u8>,
    pub skip: usize,
    pub limit: usize,
    pub span: i32,
    pub soundslike_level: u8,
    pub use_typo_analysis: bool,
    pub use_repl_table: bool,
    pub try_one_edit_word: bool,
    pub try_scan: bool,
}

impl SuggestParms {
    pub fn from_mode(mode: &str) -> Result<SuggestParms> {
        let mut p = SuggestParms {
            edit_distance_weights: EditDistanceWeights::default(),
            normal_soundslike_weight: 50,
            small_word_soundslike_weight: 15,
            small_word_threshold: 4,
            soundslike_weight: 50,
            word_weight: 50,
            split_chars: b" -".to_vec(),
            skip: 2,
            limit: 100,
            span: 50,
            soundslike_level: 1,
            use_typo_analysis: false,
            use_repl_table: false,
            try_one_edit_word: true,
            try_scan: true,
        };
        match mode {
            "ultra" => {
                p.soundslike_level = 1;
            }
            "fast" => {
                p.soundslike_level = 1;
                p.use_typo_analysis = true;
                p.use_repl_table = true;
            }
            "normal" | "slow" => {
                p.soundslike_level = 2;
                p.use_typo_analysis = true;
                p.use_repl_table = true;
            }
            "bad-spellers" => {
                p.soundslike_level = 2;
                p.use_repl_table = true;
                p.normal_soundslike_weight = 55;
                p.small_word_threshold = 0;
                p.span = 125;
                p.limit = 1000;
            }
            other => {
                return Err(Error::BadValue {
                    key: "sug-mode".to_string(),
                    value: other.to_string(),
                    expected: "one of ultra, fast, normal, slow, or bad-spellers".to_string(),
                })
            }
        }
        p.soundslike_weight = p.normal_soundslike_weight;
        p.word_weight = 100 - p.soundslike_weight;
        Ok(p)
    }

    /// Mode plus the per-key overrides.
    pub fn from_config(config: &Config) -> Result<SuggestParms> {
        let mut p = SuggestParms::from_mode(&config.sug_mode)?;
        if let Some(level) = config.sug_edit_dist {
            p.soundslike_level = level.clamp(1, 2);
        }
        if let Some(t) = config.sug_typo_analysis {
            p.use_typo_analysis = t;
        }
        if let Some(r) = config.sug_repl_table {
            p.use_repl_table = r;
        }
        p.split_chars = config.sug_split_chars.as_bytes().to_vec();
        Ok(p)
    }

    /// Short words lean almost entirely on the word distance; their
    /// soundslikes carry too little signal.
    pub fn set_original_word_size(&mut self, size: usize) {
        self.soundslike_weight = if size <= self.small_word_threshold {
            self.small_word_soundslike_weight
        } else {
            self.normal_soundslike_weight
        };
        self.word_weight = 100 - self.soundslike_weight;
    }
}

struct OriginalWord {
    word: Vec<u8>,
    lower: Vec<u8>,
    clean: Vec<u8>,
    soundslike: Vec<u8>,
    case_pattern: CasePattern,
}

struct Candidate {
    word: Vec<u8>,
    word_clean: Vec<u8>,
    soundslike_score: i32,
    score: i32,
    scored: bool,
    /// split candidates are not counted toward the threshold
    count: bool,
    /// near-miss weight assigned at generation; when absent the word
    /// distance is computed during scoring
    fixed_word_score: Option<i32>,
    /// corrections to emit instead of the word (replacement dictionary)
    repl: Option<Vec<Vec<u8>>>,
}

/// Generate ranked suggestions for `word`.
pub(crate) fn suggest(sp: &Speller, parms: &SuggestParms, word: &[u8]) -> Vec<Vec<u8>> {
    if word.is_empty() {
        return Vec::new();
    }
    let mut working = Working::new(sp, parms, word);
    working.run();
    working.transfer()
}

struct Working<'a> {
    sp: &'a Speller,
    parms: &'a SuggestParms,
    original: OriginalWord,
    dicts: Vec<&'a SpellerDict>,
    candidates: Vec<Candidate>,
    seen: AHashSet<Vec<u8>>,
    threshold: i32,
    try_harder: bool,
}

impl<'a> Working<'a> {
    fn new(sp: &'a Speller, parms: &'a SuggestParms, word: &[u8]) -> Working<'a> {
        let lang = sp.lang();
        let cm = lang.charmap();
        let original = OriginalWord {
            word: word.to_vec(),
            lower: cm.lower_word(word),
            clean: cm.clean_word(word),
            soundslike: lang.to_soundslike(word),
            case_pattern: cm.case_pattern(word),
        };
        Working {
            sp,
            parms,
            original,
            dicts: sp.suggest_dicts().collect(),
            candidates: Vec::new(),
            seen: AHashSet::new(),
            threshold: 1,
            try_harder: true,
        }
    }

    fn run(&mut self) {
        self.try_split();
        if self.parms.try_one_edit_word {
            self.try_one_edit();
        }
        if self.parms.try_scan {
            self.try_scan();
        }
        if self.parms.use_repl_table {
            self.try_repl();
        }
        self.score_list();
        if self.try_harder {
            self.try_ngram();
            self.score_list();
        }
        self.fine_tune_score();
    }

    fn weights(&self) -> &EditDistanceWeights {
        &self.parms.edit_distance_weights
    }

    fn edit_dist(&self, sl: &[u8]) -> EditDist {
        if self.parms.soundslike_level == 1 {
            limit1_edit_distance(sl, &self.original.soundslike, self.weights())
        } else {
            limit2_edit_distance(sl, &self.original.soundslike, self.weights())
        }
    }

    fn add_nearmiss(
        &mut self,
        word: Vec<u8>,
        sl: Option<Vec<u8>>,
        sl_score: Option<i32>,
        fixed_word_score: Option<i32>,
        count: bool,
        repl: Option<Vec<Vec<u8>>>,
    ) {
        if !self.seen.insert(word.clone()) {
            return;
        }
        let lang = self.sp.lang();
        let sl = sl.unwrap_or_else(|| lang.to_soundslike(&word));
        let sl_score = sl_score
            .unwrap_or_else(|| edit_distance(&self.original.soundslike, &sl, self.weights()));
        self.candidates.push(Candidate {
            word_clean: lang.charmap().clean_word(&word),
            word,
            soundslike_score: sl_score,
            score: LARGE_NUM,
            scored: false,
            count,
            fixed_word_score,
            repl,
        });
    }

    /// Look a near-miss form up in every suggesting dictionary and the
    /// affix system, recording hits with the given near-miss weight.
    fn try_word(&mut self, s: &[u8], weight: i32) {
        for e in self.sp.clean_suggest_lookup(s) {
            self.add_nearmiss(e.word, None, None, Some(weight), true, None);
        }
        if self.sp.has_suggest_affix() && self.sp.affix_suggest_check(s) {
            self.add_nearmiss(s.to_vec(), None, None, Some(weight), true, None);
        }
    }

    /// Insert a split character at every sensible position.
    fn try_split(&mut self) {
        let word = self.original.word.clone();
        if word.len() < 4 || self.parms.split_chars.is_empty() {
            return;
        }
        let weight = self.weights().del2 * 3 / 2;
        let split_chars = self.parms.split_chars.clone();
        for i in 2..=word.len() - 2 {
            if self.sp.check_quietly(&word[..i]) && self.sp.check_quietly(&word[i..]) {
                for &c in &split_chars {
                    let mut split = word[..i].to_vec();
                    split.push(c);
                    split.extend_from_slice(&word[i..]);
                    self.add_nearmiss(split, None, None, Some(weight), false, None);
                }
            }
        }
    }

    /// The ispell near-miss strategy over the clean form: the word
    /// itself, one substitution, one transposition, one insertion, one
    /// deletion.
    fn try_one_edit(&mut self) {
        let orig = self.original.clean.clone();
        let chars = self.sp.lang().charmap().clean_chars().to_vec();
        let w = *self.weights();

        self.try_word(&orig, 0);

        // change one letter
        let mut new_word = orig.clone();
        for i in 0..orig.len() {
            for &c in &chars {
                if c == orig[i] {
                    continue;
                }
                new_word[i] = c;
                self.try_word(&new_word, w.sub);
            }
            new_word[i] = orig[i];
        }

        // interchange two adjacent letters
        for i in 0..orig.len().saturating_sub(1) {
            let mut swapped = orig.clone();
            swapped.swap(i, i + 1);
            self.try_word(&swapped, w.swap);
        }

        // add one letter
        for i in 0..=orig.len() {
            for &c in &chars {
                let mut inserted = orig.clone();
                inserted.insert(i, c);
                self.try_word(&inserted, w.del1);
            }
        }

        // delete one letter
        if orig.len() > 1 {
            for i in 0..orig.len() {
                let mut deleted = orig.clone();
                deleted.remove(i);
                self.try_word(&deleted, w.del2);
            }
        }
    }

    /// Walk every suggesting dictionary's soundslike data, keeping
    /// everything within the mode's edit-distance level and feeding the
    /// `stopped_at` results back to skip whole jump-table buckets.
    fn try_scan(&mut self) {
        // For affix-compressed dictionaries the stored roots stand in
        // for their surface forms, so the misspelling's own roots become
        // additional scan targets.
        let mut targets: Vec<Vec<u8>> = vec![self.original.soundslike.clone()];
        if self.sp.has_suggest_affix() {
            let lang = self.sp.lang();
            if let Some(affix) = lang.affix() {
                for (root, _) in affix.munch(&self.original.word) {
                    let sl = lang.to_soundslike(&root);
                    if !targets.contains(&sl) {
                        targets.push(sl);
                    }
                }
            }
            for guess in self.sp.guesses() {
                let sl = lang.to_soundslike(&guess.word);
                if !targets.contains(&sl) {
                    targets.push(sl);
                }
            }
        }

        for di in 0..self.dicts.len() {
            let sd = self.dicts[di];
            let dict = sd.dict();
            let mut iter = dict.soundslike_iter();
            let mut stopped_at = usize::MAX;
            while let Some(group) = iter.next(stopped_at) {
                // affix-compressed entries expand on demand
                if let SoundslikeKey::Single(entry) = &group.key {
                    if !entry.aff.is_empty() {
                        stopped_at = self.scan_affix_entry(&entry.word, &entry.aff);
                        continue;
                    }
                }
                let mut best: Option<EditDist> = None;
                let mut min_stop = usize::MAX;
                for target in &targets {
                    let d = if self.parms.soundslike_level == 1 {
                        limit1_edit_distance(&group.soundslike, target, self.weights())
                    } else {
                        limit2_edit_distance(&group.soundslike, target, self.weights())
                    };
                    min_stop = min_stop.min(d.stopped_at);
                    if d.within_limit() {
                        best = Some(d);
                        break;
                    }
                }
                match best {
                    Some(d) => {
                        stopped_at = usize::MAX;
                        if !matches!(group.key, SoundslikeKey::Empty) {
                            self.add_group_words(di, &group.key, &group.soundslike, d.score);
                        }
                    }
                    None => stopped_at = min_stop,
                }
            }
        }
    }

    /// Score an affix-compressed root: the root itself, its prefix
    /// expansions, and suffix expansions reaching no deeper than the
    /// edit distance already ruled out.
    fn scan_affix_entry(&mut self, word: &[u8], aff: &[u8]) -> usize {
        let lang = self.sp.lang();
        let Some(affix) = lang.affix() else {
            return usize::MAX;
        };
        let mut result_stop = usize::MAX;
        for p in affix.expand_prefix(word, aff) {
            let sl = lang.to_soundslike(&p.word);
            let d = self.edit_dist(&sl);
            let mut stop = d.stopped_at + p.word.len().saturating_sub(sl.len());
            if d.within_limit() {
                self.add_nearmiss(p.word.clone(), Some(sl), Some(d.score), None, true, None);
                stop = usize::MAX;
            } else if result_stop == usize::MAX {
                result_stop = stop;
            }
            if p.aff.is_empty() {
                continue;
            }
            // a suffix can only help if it changes bytes the distance
            // check actually looked at
            if p.word.len().saturating_sub(affix.max_strip()) > stop {
                continue;
            }
            let limit = stop.saturating_add(1);
            for q in affix.expand_suffix(&p.word, &p.aff, limit) {
                let sl = lang.to_soundslike(&q.word);
                let d = self.edit_dist(&sl);
                if d.within_limit() {
                    self.add_nearmiss(q.word, Some(sl), Some(d.score), None, true, None);
                    result_stop = usize::MAX;
                }
            }
        }
        result_stop
    }

    fn add_group_words(&mut self, di: usize, key: &SoundslikeKey, sl: &[u8], sl_score: i32) {
        let sd = self.dicts[di];
        let entries = sd.dict().soundslike_lookup(key);
        for e in entries {
            match e.what {
                WordKind::Misspelled => {
                    let corrections = sd
                        .repl()
                        .map(|r| r.repl_lookup(&e.word))
                        .unwrap_or_default();
                    if !corrections.is_empty() {
                        self.add_nearmiss(
                            e.word,
                            Some(sl.to_vec()),
                            Some(sl_score),
                            None,
                            true,
                            Some(corrections),
                        );
                    }
                }
                WordKind::Word => {
                    self.add_nearmiss(
                        e.word,
                        Some(sl.to_vec()),
                        Some(sl_score),
                        None,
                        true,
                        None,
                    );
                }
            }
        }
    }

    /// Language-level replacement table: substitute every occurrence of
    /// each pattern and keep the results that are real words.
    fn try_repl(&mut self) {
        let repls = self.sp.lang().repls().to_vec();
        let lower = self.original.lower.clone();
        let weight = self.weights().sub * 3 / 2;
        for (from, to) in &repls {
            if from.is_empty() {
                continue;
            }
            let mut start = 0;
            while let Some(p) = find_sub(&lower[start..], from) {
                let at = start + p;
                let mut replaced = lower[..at].to_vec();
                replaced.extend_from_slice(to);
                replaced.extend_from_slice(&lower[at + from.len()..]);
                let clean = self.sp.lang().charmap().clean_word(&replaced);
                self.try_word(&clean, weight);
                start = at + from.len();
            }
        }
    }

    /// Trigram fallback for when everything else came up thin: keep the
    /// soundslikes sharing the most n-grams with the misspelling's and
    /// pull in their words.
    fn try_ngram(&mut self) {
        let already: AHashSet<Vec<u8>> = self
            .candidates
            .iter()
            .map(|c| self.sp.lang().to_soundslike(&c.word))
            .collect();

        struct NGramHit {
            di: usize,
            key: SoundslikeKey,
            soundslike: Vec<u8>,
            score: i32,
        }

        let mut kept: Vec<NGramHit> = Vec::new();
        let mut min_score = 0i32;
        let mut above_min = 0usize;

        for di in 0..self.dicts.len() {
            let sd = self.dicts[di];
            let mut iter = sd.dict().soundslike_iter();
            while let Some(group) = iter.next(usize::MAX) {
                if matches!(group.key, SoundslikeKey::Empty) {
                    continue;
                }
                if already.contains(&group.soundslike) {
                    continue;
                }
                let ng = ngram(3, &self.original.soundslike, &group.soundslike);
                if ng < min_score {
                    continue;
                }
                if ng > min_score {
                    above_min += 1;
                }
                kept.push(NGramHit {
                    di,
                    key: group.key,
                    soundslike: group.soundslike,
                    score: ng,
                });
                // keep the pool small: once enough hits beat the floor,
                // raise it and drop the stragglers
                if above_min >= 10 {
                    let floor = min_score;
                    min_score = kept
                        .iter()
                        .filter(|h| h.score != floor)
                        .map(|h| h.score)
                        .min()
                        .unwrap_or(floor);
                    kept.retain(|h| h.score >= min_score);
                    above_min = kept.iter().filter(|h| h.score != min_score).count();
                }
            }
        }

        for hit in kept {
            let sl_score =
                edit_distance(&self.original.soundslike, &hit.soundslike, self.weights());
            self.add_group_words(hit.di, &hit.key, &hit.soundslike, sl_score);
        }
    }

    /// Two-phase lazy scoring; see the module docs.
    fn score_list(&mut self) {
        self.try_harder = true;
        if self.candidates.is_empty() {
            return;
        }
        let no_soundslike = !self.sp.lang().have_soundslike();
        let w = *self.weights();
        let unit = (self.parms.word_weight * w.max) / 100;
        let mut try_for = unit;

        loop {
            self.score_pass(try_for, no_soundslike, &w);
            let mut counted: Vec<i32> = self
                .candidates
                .iter()
                .filter(|c| c.scored && c.count)
                .map(|c| c.score)
                .collect();
            counted.sort_unstable();
            if counted.len() > self.parms.skip && counted[self.parms.skip] <= try_for {
                break;
            }
            if self.candidates.iter().all(|c| c.scored) {
                break;
            }
            try_for += unit;
            if try_for > 10 * unit {
                break;
            }
        }

        let mut counted: Vec<i32> = self
            .candidates
            .iter()
            .filter(|c| c.scored && c.count)
            .map(|c| c.score)
            .collect();
        counted.sort_unstable();
        self.threshold = counted
            .get(self.parms.skip)
            .map(|s| s + self.parms.span)
            .unwrap_or(try_for + self.parms.span);
        if self.threshold < w.max {
            self.threshold = w.max;
        }

        // second chance for everything the first passes skipped
        let threshold = self.threshold;
        self.score_pass(threshold, no_soundslike, &w);

        self.try_harder = self.candidates.iter().all(|c| c.scored);
    }

    fn score_pass(&mut self, want: i32, no_soundslike: bool, w: &EditDistanceWeights) {
        let orig_clean = self.original.clean.clone();
        let sl_weight = self.parms.soundslike_weight;
        let word_weight = self.parms.word_weight;
        for c in &mut self.candidates {
            if c.scored {
                continue;
            }
            let word_score = if let Some(fixed) = c.fixed_word_score {
                Some(fixed)
            } else if no_soundslike {
                Some(c.soundslike_score)
            } else {
                let level =
                    (100 * want - sl_weight * c.soundslike_score) / (word_weight * w.min);
                if level > 0 && level >= c.soundslike_score / w.min {
                    let d = bounded_edit_distance(&orig_clean, &c.word_clean, level, w);
                    if d < LARGE_NUM {
                        Some(d)
                    } else {
                        None
                    }
                } else {
                    None
                }
            };
            if let Some(ws) = word_score {
                c.score = (word_weight * ws + sl_weight * c.soundslike_score) / 100;
                c.scored = true;
            }
        }
    }

    /// Keyboard-aware re-ranking of everything at or under the
    /// threshold.
    fn fine_tune_score(&mut self) {
        self.sort_candidates();
        if !self.parms.use_typo_analysis {
            return;
        }
        let Some(tw) = self.sp.typo_weights() else {
            return;
        };
        let cm = self.sp.lang().charmap();
        let orig_norm = cm.normalized_word(&self.original.word);
        let mut max = 0i32;
        let old_threshold = self.threshold;
        for c in &mut self.candidates {
            if !c.scored {
                continue;
            }
            if c.score <= old_threshold {
                let cand_norm = cm.normalized_word(&c.word);
                let word_score = typo_edit_distance(&cand_norm, &orig_norm, tw);
                c.score = (self.parms.word_weight * word_score
                    + self.parms.soundslike_weight * c.soundslike_score)
                    / 100;
                max = max.max(c.score);
            }
        }
        self.threshold = max;
        for c in &mut self.candidates {
            if c.scored && c.score > self.threshold {
                c.score = self.threshold + 1;
            }
        }
        self.sort_candidates();
    }

    fn sort_candidates(&mut self) {
        self.candidates
            .sort_by(|a, b| a.score.cmp(&b.score).then_with(|| a.word.cmp(&b.word)));
    }

    /// Dedupe, apply the limit (always emitting at least the top three)
    /// and restore the original word's case shape.
    fn transfer(&self) -> Vec<Vec<u8>> {
        let cm = self.sp.lang().charmap();
        let mut out: Vec<Vec<u8>> = Vec::new();
        let mut dup: AHashSet<Vec<u8>> = AHashSet::new();
        let mut c = 1usize;
        for cand in &self.candidates {
            if !cand.scored {
                break; // unscored candidates sort to the end
            }
            if c > self.parms.limit || (cand.score > self.threshold && c > 3) {
                break;
            }
            if let Some(repls) = &cand.repl {
                for r in repls {
                    let fixed = cm.fix_case(self.original.case_pattern, r);
                    if !dup.insert(cm.lower_word(&fixed)) {
                        continue;
                    }
                    let ok = match r.iter().position(|&b| b == b' ') {
                        None => self.sp.check_quietly(r),
                        Some(p) => {
                            self.sp.check_quietly(&r[..p]) && self.sp.check_quietly(&r[p + 1..])
                        }
                    };
                    if ok {
                        out.push(fixed);
                    }
                }
            } else {
                let fixed = cm.fix_case(self.original.case_pattern, &cand.word);
                if dup.insert(cm.lower_word(&fixed)) {
                    out.push(fixed);
                }
            }
            c += 1;
        }
        out
    }
}

fn find_sub(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// N-gram similarity: how many length-1..=n substrings of `s1` occur
/// anywhere in `s2`, minus a length-difference penalty.
fn ngram(n: usize, s1: &[u8], s2: &[u8]) -> i32 {
    let (l1, l2) = (s1.len(), s2.len());
    let mut nscore = 0i32;
    for j in 1..=n {
        if l1 < j {
            break;
        }
        let mut ns = 0i32;
        for i in 0..=(l1 - j) {
            if s2.windows(j).any(|w| w == &s1[i..i + j]) {
                ns += 1;
            }
        }
        nscore += ns;
        if ns < 2 {
            break;
        }
    }
    let penalty = l2 as i32 - l1 as i32 - 2;
    nscore - penalty.max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_table() {
        let ultra = SuggestParms::from_mode("ultra").unwrap();
        assert_eq!(ultra.soundslike_level, 1);
        assert!(!ultra.use_typo_analysis);
        assert!(!ultra.use_repl_table);

        let normal = SuggestParms::from_mode("normal").unwrap();
        assert_eq!(normal.soundslike_level, 2);
        assert!(normal.use_typo_analysis);
        assert!(normal.use_repl_table);
        assert_eq!(normal.span, 50);
        assert_eq!(normal.limit, 100);

        let bad = SuggestParms::from_mode("bad-spellers").unwrap();
        assert_eq!(bad.span, 125);
        assert_eq!(bad.limit, 1000);
        assert!(!bad.use_typo_analysis);

        assert!(SuggestParms::from_mode("warp").is_err());
    }

    #[test]
    fn small_words_shift_the_weights() {
        let mut p = SuggestParms::from_mode("normal").unwrap();
        p.set_original_word_size(3);
        assert_eq!(p.soundslike_weight, 15);
        assert_eq!(p.word_weight, 85);
        p.set_original_word_size(9);
        assert_eq!(p.soundslike_weight, 50);
    }

    #[test]
    fn ngram_rewards_shared_substrings() {
        assert!(ngram(3, b"HELO", b"HELO") > ngram(3, b"HELO", b"WRLD"));
        assert!(ngram(3, b"HELO", b"HELIO") > ngram(3, b"HELO", b"HILO"));
    }

    #[test]
    fn find_sub_locates_patterns() {
        assert_eq!(find_sub(b"hello", b"ll"), Some(2));
        assert_eq!(find_sub(b"hello", b"xy"), None);
        assert_eq!(find_sub(b"hello", b""), None);
    }
}

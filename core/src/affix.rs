//! Prefix and suffix rules.
//!
//! An affix file declares rule groups keyed by single-byte flags; a
//! dictionary root tagged with a flag accepts every surface form its
//! entries derive. Checking strips candidate affixes from an input word
//! and asks the dictionary for the residual root; expansion enumerates
//! surface forms for the compiler and the suggestion scan; munching runs
//! expansion in reverse.
//!
//! Entries sharing a first key byte form a sorted chain with two extra
//! links, `next_eq` and `next_ne`: when the current entry's key is a
//! prefix of the word, continue to the more specific entries (`next_eq`),
//! otherwise jump past the whole subset subtree (`next_ne`). The links
//! are computed once after load; entries live in an arena and link by
//! index.

use crate::charmap::SET_SIZE;
use crate::error::{Error, Result};
use ahash::AHashMap;
use std::path::Path;

/// Outcome of a successful check, recording how the surface form maps
/// back onto a dictionary root. Run-together compounds chain through
/// `compound_next`.
#[derive(Debug, Clone, Default)]
pub struct CheckInfo {
    /// the dictionary root that validated
    pub word: Vec<u8>,
    pub prefix_strip: usize,
    pub prefix_add: Vec<u8>,
    pub suffix_strip: usize,
    pub suffix_add: Vec<u8>,
    pub pre_flag: Option<u8>,
    pub suf_flag: Option<u8>,
    pub compound_next: Option<Box<CheckInfo>>,
    pub guess: bool,
}

impl CheckInfo {
    pub fn simple(word: &[u8]) -> CheckInfo {
        CheckInfo {
            word: word.to_vec(),
            ..CheckInfo::default()
        }
    }
}

/// Bounded store of affix best-guesses produced when nothing validated;
/// only the suggestion pass reads it.
#[derive(Debug, Default)]
pub struct GuessInfo {
    entries: Vec<CheckInfo>,
    cap: usize,
}

impl GuessInfo {
    pub fn new(cap: usize) -> GuessInfo {
        GuessInfo {
            entries: Vec::new(),
            cap,
        }
    }

    pub fn add(&mut self, ci: CheckInfo) -> bool {
        if self.entries.len() >= self.cap {
            return false;
        }
        self.entries.push(ci);
        true
    }

    pub fn entries(&self) -> &[CheckInfo] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// A dictionary hit seen by the affix checker: the root and its flag
/// string.
#[derive(Debug, Clone)]
pub struct AffixRoot {
    pub word: Vec<u8>,
    pub flags: Vec<u8>,
}

/// Lookup callback used by [`AffixMgr::affix_check`]; the speller wires
/// it to a clean lookup across its affix-compressed dictionaries.
pub type LookupFn<'a> = dyn Fn(&[u8]) -> Option<AffixRoot> + 'a;

/// A surface form plus the (suffix) flags still attached to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordAff {
    pub word: Vec<u8>,
    pub aff: Vec<u8>,
}

#[derive(Debug, Clone)]
struct AffixEntry {
    flag: u8,
    strip: Vec<u8>,
    append: Vec<u8>,
    /// append for prefixes, reversed append for suffixes
    key: Vec<u8>,
    conds: Box<[u32; SET_SIZE]>,
    num_conds: u8,
    cross_product: bool,
    next: Option<usize>,
    next_eq: Option<usize>,
    next_ne: Option<usize>,
}

impl AffixEntry {
    /// Does `root[pos]` satisfy condition position `i`?
    fn cond_at(&self, i: usize, b: u8) -> bool {
        self.conds[b as usize] & (1 << i) != 0
    }

    /// Condition over the head of the root (prefix entries).
    fn head_cond(&self, root: &[u8]) -> bool {
        let nc = self.num_conds as usize;
        if root.len() < nc {
            return false;
        }
        (0..nc).all(|i| self.cond_at(i, root[i]))
    }

    /// Condition over the tail of the root (suffix entries).
    fn tail_cond(&self, root: &[u8]) -> bool {
        let nc = self.num_conds as usize;
        if root.len() < nc {
            return false;
        }
        let base = root.len() - nc;
        (0..nc).all(|i| self.cond_at(i, root[base + i]))
    }
}

fn is_subset(s1: &[u8], s2: &[u8]) -> bool {
    s2.len() >= s1.len() && &s2[..s1.len()] == s1
}

#[derive(Debug)]
pub struct AffixMgr {
    name: String,
    prefixes: Vec<AffixEntry>,
    suffixes: Vec<AffixEntry>,
    pfx_empty: Vec<usize>,
    pfx_start: [Option<usize>; SET_SIZE],
    sfx_empty: Vec<usize>,
    sfx_start: [Option<usize>; SET_SIZE],
    pfx_by_flag: AHashMap<u8, Vec<usize>>,
    sfx_by_flag: AHashMap<u8, Vec<usize>>,
    max_strip: usize,
    try_chars: Vec<u8>,
    repls: Vec<(Vec<u8>, Vec<u8>)>,
    compound_min: usize,
    encoding: Option<String>,
}

impl Default for AffixMgr {
    fn default() -> Self {
        AffixMgr {
            name: String::default(),
            prefixes: Vec::default(),
            suffixes: Vec::default(),
            pfx_empty: Vec::default(),
            pfx_start: [None; SET_SIZE],
            sfx_empty: Vec::default(),
            sfx_start: [None; SET_SIZE],
            pfx_by_flag: AHashMap::default(),
            sfx_by_flag: AHashMap::default(),
            max_strip: usize::default(),
            try_chars: Vec::default(),
            repls: Vec::default(),
            compound_min: usize::default(),
            encoding: None,
        }
    }
}

impl AffixMgr {
    /// Parse affix-file text.
    pub fn parse(text: &str, path: &Path, name: &str) -> Result<AffixMgr> {
        let mut mgr = AffixMgr {
            name: name.to_string(),
            compound_min: 3,
            ..AffixMgr::default()
        };

        let mut lines = text.lines().enumerate();
        while let Some((lineno, raw)) = lines.next() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            match fields[0] {
                "TRY" => {
                    if fields.len() != 2 {
                        return Err(Error::bad_format(
                            path,
                            lineno as u32 + 1,
                            "TRY <chars>",
                            line.to_string(),
                        ));
                    }
                    mgr.try_chars = fields[1].as_bytes().to_vec();
                }
                "SET" => {
                    if fields.len() != 2 {
                        return Err(Error::bad_format(
                            path,
                            lineno as u32 + 1,
                            "SET <encoding>",
                            line.to_string(),
                        ));
                    }
                    mgr.encoding = Some(fields[1].to_string());
                }
                "COMPOUNDMIN" => {
                    let n = fields
                        .get(1)
                        .and_then(|s| s.parse::<usize>().ok())
                        .ok_or_else(|| {
                            Error::bad_format(
                                path,
                                lineno as u32 + 1,
                                "COMPOUNDMIN <number>",
                                line.to_string(),
                            )
                        })?;
                    mgr.compound_min = if (1..=50).contains(&n) { n } else { 3 };
                }
                "REP" => {
                    let count = fields
                        .get(1)
                        .and_then(|s| s.parse::<usize>().ok())
                        .ok_or_else(|| {
                            Error::bad_format(
                                path,
                                lineno as u32 + 1,
                                "REP <count>",
                                line.to_string(),
                            )
                        })?;
                    for _ in 0..count {
                        let (ln, rep) = lines.next().ok_or_else(|| {
                            Error::bad_format(
                                path,
                                lineno as u32 + 1,
                                format!("{} REP entries", count),
                                "end of file",
                            )
                        })?;
                        let f: Vec<&str> = rep.split_whitespace().collect();
                        if f.len() != 3 || f[0] != "REP" {
                            return Err(Error::bad_format(
                                path,
                                ln as u32 + 1,
                                "REP <mis> <cor>",
                                rep.to_string(),
                            ));
                        }
                        mgr.repls
                            .push((f[1].as_bytes().to_vec(), f[2].as_bytes().to_vec()));
                    }
                }
                "PFX" | "SFX" => {
                    let is_pfx = fields[0] == "PFX";
                    if fields.len() != 4 {
                        return Err(Error::bad_format(
                            path,
                            lineno as u32 + 1,
                            "PFX/SFX <flag> <Y|N> <count>",
                            line.to_string(),
                        ));
                    }
                    let flag = single_byte(fields[1], path, lineno as u32 + 1)?;
                    let cross_product = fields[2] == "Y";
                    let count: usize = fields[3].parse().map_err(|_| {
                        Error::bad_format(
                            path,
                            lineno as u32 + 1,
                            "an entry count",
                            fields[3].to_string(),
                        )
                    })?;
                    for _ in 0..count {
                        let (ln, raw) = lines.next().ok_or_else(|| {
                            Error::bad_format(
                                path,
                                lineno as u32 + 1,
                                format!("{} affix entries", count),
                                "end of file",
                            )
                        })?;
                        let f: Vec<&str> = raw.split_whitespace().collect();
                        if f.len() != 5 || f[0] != fields[0] {
                            return Err(Error::bad_format(
                                path,
                                ln as u32 + 1,
                                "PFX/SFX <flag> <strip> <append> <condition>",
                                raw.to_string(),
                            ));
                        }
                        if single_byte(f[1], path, ln as u32 + 1)? != flag {
                            return Err(Error::bad_format(
                                path,
                                ln as u32 + 1,
                                format!("flag '{}'", flag as char),
                                f[1].to_string(),
                            ));
                        }
                        let strip = if f[2] == "0" {
                            Vec::new()
                        } else {
                            f[2].as_bytes().to_vec()
                        };
                        let append = if f[3] == "0" {
                            Vec::new()
                        } else {
                            f[3].as_bytes().to_vec()
                        };
                        let (conds, num_conds) = encode_condition(f[4], path, ln as u32 + 1)?;
                        let key = if is_pfx {
                            append.clone()
                        } else {
                            append.iter().rev().copied().collect()
                        };
                        let entry = AffixEntry {
                            flag,
                            strip,
                            append,
                            key,
                            conds,
                            num_conds,
                            cross_product,
                            next: None,
                            next_eq: None,
                            next_ne: None,
                        };
                        if is_pfx {
                            mgr.prefixes.push(entry);
                        } else {
                            mgr.suffixes.push(entry);
                        }
                    }
                }
                _ => {} // unknown line types are ignored
            }
        }

        mgr.max_strip = mgr
            .suffixes
            .iter()
            .map(|e| e.strip.len())
            .max()
            .unwrap_or(0);

        for (i, e) in mgr.prefixes.iter().enumerate() {
            mgr.pfx_by_flag.entry(e.flag).or_default().push(i);
        }
        for (i, e) in mgr.suffixes.iter().enumerate() {
            mgr.sfx_by_flag.entry(e.flag).or_default().push(i);
        }

        let (empty, start) = build_chains(&mut mgr.prefixes);
        mgr.pfx_empty = empty;
        mgr.pfx_start = start;
        let (empty, start) = build_chains(&mut mgr.suffixes);
        mgr.sfx_empty = empty;
        mgr.sfx_start = start;

        Ok(mgr)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_strip(&self) -> usize {
        self.max_strip
    }

    pub fn try_chars(&self) -> &[u8] {
        &self.try_chars
    }

    pub fn repls(&self) -> &[(Vec<u8>, Vec<u8>)] {
        &self.repls
    }

    pub fn compound_min(&self) -> usize {
        self.compound_min
    }

    pub fn has_flag(&self, flag: u8) -> bool {
        self.pfx_by_flag.contains_key(&flag) || self.sfx_by_flag.contains_key(&flag)
    }

    /// Reject flag strings referencing flags no rule group declares.
    pub fn validate_flags(&self, flags: &[u8], rule_source: &str) -> Result<()> {
        for &f in flags {
            if !self.has_flag(f) {
                return Err(Error::InvalidFlag {
                    flag: f as char,
                    rule_source: rule_source.to_string(),
                });
            }
        }
        Ok(())
    }

    // ---- checking ----

    /// Strip one prefix and/or one suffix so that the residual is a
    /// dictionary root carrying the necessary flags.
    pub fn affix_check(&self, lookup: &LookupFn, word: &[u8]) -> Option<CheckInfo> {
        if let Some(ci) = self.prefix_check(lookup, word) {
            return Some(ci);
        }
        self.suffix_check(lookup, word, None)
    }

    /// Record condition-passing strips as guesses even though no
    /// dictionary form validates them.
    pub fn affix_guess(&self, word: &[u8], gi: &mut GuessInfo) {
        self.for_each_prefix(word, &mut |entry, root| {
            let mut ci = CheckInfo::simple(&root);
            ci.prefix_strip = entry.strip.len();
            ci.prefix_add = entry.append.clone();
            ci.pre_flag = Some(entry.flag);
            ci.guess = true;
            gi.add(ci);
            false
        });
        self.for_each_suffix(word, &mut |entry, root| {
            let mut ci = CheckInfo::simple(&root);
            ci.suffix_strip = entry.strip.len();
            ci.suffix_add = entry.append.clone();
            ci.suf_flag = Some(entry.flag);
            ci.guess = true;
            gi.add(ci);
            false
        });
    }

    fn prefix_check(&self, lookup: &LookupFn, word: &[u8]) -> Option<CheckInfo> {
        let mut found = None;
        self.for_each_prefix(word, &mut |entry, root| {
            if let Some(hit) = lookup(&root) {
                if hit.flags.contains(&entry.flag) {
                    let mut ci = CheckInfo::simple(&hit.word);
                    ci.prefix_strip = entry.strip.len();
                    ci.prefix_add = entry.append.clone();
                    ci.pre_flag = Some(entry.flag);
                    found = Some(ci);
                    return true;
                }
            }
            if entry.cross_product {
                if let Some(mut ci) = self.suffix_check(lookup, &root, Some(entry.flag)) {
                    ci.prefix_strip = entry.strip.len();
                    ci.prefix_add = entry.append.clone();
                    ci.pre_flag = Some(entry.flag);
                    found = Some(ci);
                    return true;
                }
            }
            false
        });
        found
    }

    fn suffix_check(
        &self,
        lookup: &LookupFn,
        word: &[u8],
        cross_with: Option<u8>,
    ) -> Option<CheckInfo> {
        let mut found = None;
        self.for_each_suffix(word, &mut |entry, root| {
            if cross_with.is_some() && !entry.cross_product {
                return false;
            }
            if let Some(hit) = lookup(&root) {
                let flags_ok = hit.flags.contains(&entry.flag)
                    && cross_with.map_or(true, |pf| hit.flags.contains(&pf));
                if flags_ok {
                    let mut ci = CheckInfo::simple(&hit.word);
                    ci.suffix_strip = entry.strip.len();
                    ci.suffix_add = entry.append.clone();
                    ci.suf_flag = Some(entry.flag);
                    found = Some(ci);
                    return true;
                }
            }
            false
        });
        found
    }

    /// Walk every prefix entry whose append matches the start of `word`,
    /// deriving the candidate root. The callback returns true to stop.
    fn for_each_prefix(&self, word: &[u8], f: &mut dyn FnMut(&AffixEntry, Vec<u8>) -> bool) {
        for &i in &self.pfx_empty {
            let entry = &self.prefixes[i];
            if let Some(root) = derive_prefix_root(entry, word) {
                if f(entry, root) {
                    return;
                }
            }
        }
        let Some(&first) = word.first() else { return };
        let mut cur = self.pfx_start[first as usize];
        while let Some(i) = cur {
            let entry = &self.prefixes[i];
            if is_subset(&entry.key, word) {
                if let Some(root) = derive_prefix_root(entry, word) {
                    if f(entry, root) {
                        return;
                    }
                }
                cur = entry.next_eq;
            } else {
                cur = entry.next_ne;
            }
        }
    }

    /// Symmetric walk over suffix entries, keyed by the reversed word.
    fn for_each_suffix(&self, word: &[u8], f: &mut dyn FnMut(&AffixEntry, Vec<u8>) -> bool) {
        for &i in &self.sfx_empty {
            let entry = &self.suffixes[i];
            if let Some(root) = derive_suffix_root(entry, word) {
                if f(entry, root) {
                    return;
                }
            }
        }
        let Some(&last) = word.last() else { return };
        let rev: Vec<u8> = word.iter().rev().copied().collect();
        let mut cur = self.sfx_start[last as usize];
        while let Some(i) = cur {
            let entry = &self.suffixes[i];
            if is_subset(&entry.key, &rev) {
                if let Some(root) = derive_suffix_root(entry, word) {
                    if f(entry, root) {
                        return;
                    }
                }
                cur = entry.next_eq;
            } else {
                cur = entry.next_ne;
            }
        }
    }

    // ---- expansion ----

    /// Enumerate every legal surface form of `word` under `flags`,
    /// including the word itself. Unknown flags are skipped.
    pub fn expand(&self, word: &[u8], flags: &[u8]) -> Vec<WordAff> {
        let mut out = vec![WordAff {
            word: word.to_vec(),
            aff: Vec::new(),
        }];
        let suffixed = self.expand_suffix(word, flags, usize::MAX);
        out.extend(suffixed);
        for (entry_idx, pfx_word, keep) in self.prefix_forms(word, flags) {
            out.push(WordAff {
                word: pfx_word,
                aff: Vec::new(),
            });
            // cross products: the prefix re-applies to each suffixed form
            // (the suffix condition was validated against the root)
            let entry = &self.prefixes[entry_idx];
            for wa in self.expand_suffix(word, &keep, usize::MAX) {
                if !wa.word.starts_with(&entry.strip) {
                    continue;
                }
                let mut combined = entry.append.clone();
                combined.extend_from_slice(&wa.word[entry.strip.len()..]);
                out.push(WordAff {
                    word: combined,
                    aff: Vec::new(),
                });
            }
        }
        dedup_word_affs(&mut out);
        out
    }

    /// Expansion for the dictionary compiler: prefix forms are
    /// materialized (they shape the soundslike jump tables); suffix forms
    /// are materialized only when they touch the first `limit` bytes,
    /// otherwise their flags stay attached for on-demand expansion.
    pub fn expand_limited(&self, word: &[u8], flags: &[u8], limit: usize) -> Vec<WordAff> {
        let suffix_flags: Vec<u8> = flags
            .iter()
            .copied()
            .filter(|f| self.sfx_by_flag.contains_key(f))
            .collect();
        let mut out = vec![WordAff {
            word: word.to_vec(),
            aff: suffix_flags.clone(),
        }];
        // suffixes close enough to the front must be expanded up front
        for wa in self.expand_suffix(word, &suffix_flags, limit) {
            out.push(wa);
        }
        for (_, pfx_word, keep) in self.prefix_forms(word, flags) {
            let keep: Vec<u8> = keep
                .into_iter()
                .filter(|f| self.sfx_by_flag.contains_key(f))
                .collect();
            out.push(WordAff {
                word: pfx_word,
                aff: keep,
            });
        }
        dedup_word_affs(&mut out);
        out
    }

    /// Only prefix expansion; suffix flags ride along on each result.
    pub fn expand_prefix(&self, word: &[u8], flags: &[u8]) -> Vec<WordAff> {
        let suffix_flags: Vec<u8> = flags
            .iter()
            .copied()
            .filter(|f| self.sfx_by_flag.contains_key(f))
            .collect();
        let mut out = vec![WordAff {
            word: word.to_vec(),
            aff: suffix_flags,
        }];
        for (_, pfx_word, keep) in self.prefix_forms(word, flags) {
            let keep: Vec<u8> = keep
                .into_iter()
                .filter(|f| self.sfx_by_flag.contains_key(f))
                .collect();
            out.push(WordAff {
                word: pfx_word,
                aff: keep,
            });
        }
        dedup_word_affs(&mut out);
        out
    }

    /// Suffix-only expansion; forms whose modification point lies beyond
    /// `limit` are not produced.
    pub fn expand_suffix(&self, word: &[u8], flags: &[u8], limit: usize) -> Vec<WordAff> {
        let mut out = Vec::new();
        for &f in flags {
            let Some(entries) = self.sfx_by_flag.get(&f) else {
                continue;
            };
            for &i in entries {
                let entry = &self.suffixes[i];
                if !word.ends_with(&entry.strip) || !entry.tail_cond(word) {
                    continue;
                }
                let base = word.len() - entry.strip.len();
                if base > limit {
                    continue;
                }
                let mut derived = word[..base].to_vec();
                derived.extend_from_slice(&entry.append);
                if derived.is_empty() {
                    continue;
                }
                out.push(WordAff {
                    word: derived,
                    aff: Vec::new(),
                });
            }
        }
        dedup_word_affs(&mut out);
        out
    }

    /// Prefix forms of `word`, each with its entry index and the flags
    /// that may still combine (cross-product suffix flags).
    fn prefix_forms(&self, word: &[u8], flags: &[u8]) -> Vec<(usize, Vec<u8>, Vec<u8>)> {
        let mut out = Vec::new();
        for &f in flags {
            let Some(entries) = self.pfx_by_flag.get(&f) else {
                continue;
            };
            for &i in entries {
                let entry = &self.prefixes[i];
                if !word.starts_with(&entry.strip) || !entry.head_cond(word) {
                    continue;
                }
                let mut derived = entry.append.clone();
                derived.extend_from_slice(&word[entry.strip.len()..]);
                let keep = if entry.cross_product {
                    flags
                        .iter()
                        .copied()
                        .filter(|g| {
                            self.sfx_by_flag
                                .get(g)
                                .map(|es| es.iter().any(|&j| self.suffixes[j].cross_product))
                                .unwrap_or(false)
                        })
                        .collect()
                } else {
                    Vec::new()
                };
                out.push((i, derived, keep));
            }
        }
        out
    }

    // ---- munching ----

    /// Enumerate every root + flag combination that could have produced
    /// the surface form.
    pub fn munch(&self, word: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut out = Vec::new();
        self.for_each_prefix(word, &mut |entry, root| {
            out.push((root.clone(), vec![entry.flag]));
            if entry.cross_product {
                self.for_each_suffix(&root, &mut |sfx, root2| {
                    if sfx.cross_product {
                        out.push((root2, vec![entry.flag, sfx.flag]));
                    }
                    false
                });
            }
            false
        });
        self.for_each_suffix(word, &mut |entry, root| {
            out.push((root, vec![entry.flag]));
            false
        });
        out.sort();
        out.dedup();
        out
    }
}

fn derive_prefix_root(entry: &AffixEntry, word: &[u8]) -> Option<Vec<u8>> {
    if word.len() <= entry.append.len() || !word.starts_with(&entry.append) {
        return None;
    }
    let mut root = entry.strip.clone();
    root.extend_from_slice(&word[entry.append.len()..]);
    if entry.head_cond(&root) {
        Some(root)
    } else {
        None
    }
}

fn derive_suffix_root(entry: &AffixEntry, word: &[u8]) -> Option<Vec<u8>> {
    if word.len() <= entry.append.len() || !word.ends_with(&entry.append) {
        return None;
    }
    let mut root = word[..word.len() - entry.append.len()].to_vec();
    root.extend_from_slice(&entry.strip);
    if entry.tail_cond(&root) {
        Some(root)
    } else {
        None
    }
}

fn dedup_word_affs(list: &mut Vec<WordAff>) {
    list.sort_by(|a, b| a.word.cmp(&b.word).then(a.aff.cmp(&b.aff)));
    list.dedup();
}

fn single_byte(tok: &str, path: &Path, line: u32) -> Result<u8> {
    let b = tok.as_bytes();
    if b.len() != 1 {
        return Err(Error::bad_format(
            path,
            line,
            "a single-character flag",
            tok.to_string(),
        ));
    }
    Ok(b[0])
}

/// Compile a condition string into the per-byte bit masks. Bit `i` of
/// `conds[b]` is set iff byte `b` matches the i-th condition position;
/// `.` sets every bit at its position and `[^...]` complements a group.
fn encode_condition(cs: &str, path: &Path, line: u32) -> Result<(Box<[u32; SET_SIZE]>, u8)> {
    let mut conds = Box::new([0u32; SET_SIZE]);
    if cs == "." {
        return Ok((conds, 0));
    }
    let src = cs.as_bytes();
    let mut n = 0u32;
    let mut i = 0usize;
    while i < src.len() {
        if n >= 32 {
            return Err(Error::bad_format(
                path,
                line,
                "at most 32 condition positions",
                cs.to_string(),
            ));
        }
        match src[i] {
            b'[' => {
                let close = src[i..]
                    .iter()
                    .position(|&b| b == b']')
                    .map(|p| p + i)
                    .ok_or_else(|| {
                        Error::bad_format(path, line, "a ']' closing the group", cs.to_string())
                    })?;
                let mut members = &src[i + 1..close];
                let neg = members.first() == Some(&b'^');
                if neg {
                    members = &members[1..];
                }
                if neg {
                    for m in conds.iter_mut() {
                        *m |= 1 << n;
                    }
                    for &b in members {
                        conds[b as usize] &= !(1 << n);
                    }
                } else {
                    for &b in members {
                        conds[b as usize] |= 1 << n;
                    }
                }
                i = close + 1;
            }
            b'.' => {
                for m in conds.iter_mut() {
                    *m |= 1 << n;
                }
                i += 1;
            }
            b => {
                conds[b as usize] |= 1 << n;
                i += 1;
            }
        }
        n += 1;
    }
    Ok((conds, n as u8))
}

fn build_chains(entries: &mut [AffixEntry]) -> (Vec<usize>, [Option<usize>; SET_SIZE]) {
    let mut empty = Vec::new();
    let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); SET_SIZE];
    for (i, e) in entries.iter().enumerate() {
        match e.key.first() {
            None => empty.push(i),
            Some(&b) => buckets[b as usize].push(i),
        }
    }
    let mut start = [None; SET_SIZE];
    for (b, bucket) in buckets.iter_mut().enumerate() {
        if bucket.is_empty() {
            continue;
        }
        bucket.sort_by(|&x, &y| entries[x].key.cmp(&entries[y].key));
        start[b] = Some(bucket[0]);
        for w in 0..bucket.len() {
            entries[bucket[w]].next = bucket.get(w + 1).copied();
        }
        // next_ne skips the whole run of entries this key is a prefix of;
        // next_eq descends into it.
        for p in 0..bucket.len() {
            let key = entries[bucket[p]].key.clone();
            let mut ne = None;
            for &q in &bucket[p + 1..] {
                if !is_subset(&key, &entries[q].key) {
                    ne = Some(q);
                    break;
                }
            }
            entries[bucket[p]].next_ne = ne;
            entries[bucket[p]].next_eq = match bucket.get(p + 1) {
                Some(&q) if is_subset(&key, &entries[q].key) => Some(q),
                _ => None,
            };
        }
        // termination: the deepest member of a subset run ends the
        // search, walking the freshly linked chain
        let mut p = start[b];
        while let Some(i) = p {
            let key = entries[i].key.clone();
            let mut q = entries[i].next;
            let mut last = None;
            while let Some(j) = q {
                if !is_subset(&key, &entries[j].key) {
                    break;
                }
                last = Some(j);
                q = entries[j].next;
            }
            if let Some(j) = last {
                entries[j].next_ne = None;
            }
            p = entries[i].next;
        }
    }
    (empty, start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ahash::AHashMap;

    fn mgr(text: &str) -> AffixMgr {
        AffixMgr::parse(text, Path::new("test_affix.dat"), "test").expect("parse affix")
    }

    fn dict(words: &[(&str, &str)]) -> AHashMap<Vec<u8>, Vec<u8>> {
        words
            .iter()
            .map(|(w, f)| (w.as_bytes().to_vec(), f.as_bytes().to_vec()))
            .collect()
    }

    fn lookup_in(d: &AHashMap<Vec<u8>, Vec<u8>>) -> impl Fn(&[u8]) -> Option<AffixRoot> + '_ {
        move |w: &[u8]| {
            d.get(w).map(|flags| AffixRoot {
                word: w.to_vec(),
                flags: flags.clone(),
            })
        }
    }

    const SAMPLE: &str = "\
PFX A Y 1
PFX A 0 un .

SFX S N 2
SFX S y ies [^aeiou]y
SFX S 0 s [aeiou]y

SFX D Y 2
SFX D 0 ed [^e]
SFX D 0 d e
";

    #[test]
    fn prefix_check_strips_un() {
        let m = mgr(SAMPLE);
        let d = dict(&[("happy", "A")]);
        let ci = m.affix_check(&lookup_in(&d), b"unhappy").expect("check");
        assert_eq!(ci.word, b"happy");
        assert_eq!(ci.pre_flag, Some(b'A'));
        assert_eq!(ci.prefix_add, b"un");
    }

    #[test]
    fn suffix_check_obeys_condition() {
        let m = mgr(SAMPLE);
        let d = dict(&[("fly", "S"), ("day", "S")]);
        let lk = lookup_in(&d);
        // y -> ies only after a consonant
        let ci = m.affix_check(&lk, b"flies").expect("flies");
        assert_eq!(ci.word, b"fly");
        assert_eq!(ci.suf_flag, Some(b'S'));
        // vowel + y takes plain s
        let ci = m.affix_check(&lk, b"days").expect("days");
        assert_eq!(ci.word, b"day");
        // and not the other way around
        assert!(m.affix_check(&lk, b"dais").is_none());
    }

    #[test]
    fn check_requires_flag_on_root() {
        let m = mgr(SAMPLE);
        let d = dict(&[("happy", "S")]); // no A flag
        assert!(m.affix_check(&lookup_in(&d), b"unhappy").is_none());
    }

    #[test]
    fn cross_product_combines() {
        let m = mgr("PFX A Y 1\nPFX A 0 un .\n\nSFX D Y 1\nSFX D 0 ed [^e]\n");
        let d = dict(&[("lock", "AD")]);
        let ci = m.affix_check(&lookup_in(&d), b"unlocked").expect("check");
        assert_eq!(ci.word, b"lock");
        assert_eq!(ci.pre_flag, Some(b'A'));
        assert_eq!(ci.suf_flag, Some(b'D'));
    }

    #[test]
    fn non_cross_product_does_not_combine() {
        let m = mgr("PFX A Y 1\nPFX A 0 un .\n\nSFX S N 1\nSFX S 0 s .\n");
        let d = dict(&[("tie", "AS")]);
        let lk = lookup_in(&d);
        assert!(m.affix_check(&lk, b"unties").is_none());
        assert!(m.affix_check(&lk, b"untie").is_some());
        assert!(m.affix_check(&lk, b"ties").is_some());
    }

    #[test]
    fn expand_produces_all_forms() {
        let m = mgr(SAMPLE);
        let forms = m.expand(b"happy", b"A");
        let words: Vec<&[u8]> = forms.iter().map(|w| w.word.as_slice()).collect();
        assert!(words.contains(&b"happy".as_slice()));
        assert!(words.contains(&b"unhappy".as_slice()));
    }

    #[test]
    fn expand_cross_product() {
        let m = mgr("PFX A Y 1\nPFX A 0 un .\n\nSFX D Y 1\nSFX D 0 ed [^e]\n");
        let forms = m.expand(b"lock", b"AD");
        let words: Vec<&[u8]> = forms.iter().map(|w| w.word.as_slice()).collect();
        for expect in [&b"lock"[..], b"locked", b"unlock", b"unlocked"] {
            assert!(words.contains(&expect), "missing {:?}", expect);
        }
    }

    #[test]
    fn expand_strip_replaces() {
        let m = mgr(SAMPLE);
        let forms = m.expand(b"fly", b"S");
        let words: Vec<&[u8]> = forms.iter().map(|w| w.word.as_slice()).collect();
        assert!(words.contains(&b"flies".as_slice()));
        assert!(!words.contains(&b"flys".as_slice()));
    }

    #[test]
    fn munch_inverts_expand() {
        let m = mgr(SAMPLE);
        for wa in m.expand(b"happy", b"A") {
            if wa.word == b"happy" {
                continue;
            }
            let roots = m.munch(&wa.word);
            assert!(
                roots
                    .iter()
                    .any(|(root, flags)| root == b"happy" && flags.contains(&b'A')),
                "munch({:?}) missed the root",
                String::from_utf8_lossy(&wa.word)
            );
        }
    }

    #[test]
    fn munch_finds_cross_product_roots() {
        let m = mgr("PFX A Y 1\nPFX A 0 un .\n\nSFX D Y 1\nSFX D 0 ed [^e]\n");
        let roots = m.munch(b"unlocked");
        assert!(roots
            .iter()
            .any(|(root, flags)| root == b"lock" && flags == b"AD"));
    }

    #[test]
    fn expand_limited_keeps_far_suffix_flags() {
        let m = mgr(SAMPLE);
        let forms = m.expand_limited(b"holiday", b"S", 3);
        // the s/ies suffixes touch byte 6, beyond the limit, so the root
        // keeps the flag unexpanded
        assert!(forms
            .iter()
            .any(|wa| wa.word == b"holiday" && wa.aff == b"S"));
        assert!(!forms.iter().any(|wa| wa.word == b"holidays".as_slice()));
    }

    #[test]
    fn expand_limited_materializes_near_suffixes() {
        let m = mgr(SAMPLE);
        let forms = m.expand_limited(b"day", b"S", 3);
        assert!(forms.iter().any(|wa| wa.word == b"days".as_slice()));
    }

    #[test]
    fn unknown_flag_is_skipped_in_expand() {
        let m = mgr(SAMPLE);
        let forms = m.expand(b"happy", b"AZ");
        assert!(forms.iter().any(|wa| wa.word == b"unhappy".as_slice()));
        assert!(m.validate_flags(b"AZ", "happy").is_err());
        assert!(m.validate_flags(b"AS", "happy").is_ok());
    }

    #[test]
    fn guesses_are_recorded() {
        let m = mgr(SAMPLE);
        let mut gi = GuessInfo::new(8);
        m.affix_guess(b"unzzz", &mut gi);
        assert!(gi
            .entries()
            .iter()
            .any(|ci| ci.word == b"zzz" && ci.guess && ci.pre_flag == Some(b'A')));
    }

    #[test]
    fn rep_table_parses() {
        let m = mgr("REP 2\nREP teh the\nREP ei ie\n");
        assert_eq!(m.repls().len(), 2);
        assert_eq!(m.repls()[0].0, b"teh");
        assert_eq!(m.repls()[0].1, b"the");
    }

    #[test]
    fn subset_links_cover_all_entries() {
        // several prefixes sharing a first byte exercise the chain links
        let m = mgr(
            "PFX A Y 1\nPFX A 0 re .\n\nPFX B Y 1\nPFX B 0 r .\n\nPFX C Y 1\nPFX C 0 ret .\n",
        );
        let d = dict(&[("do", "A"), ("ice", "B"), ("ry", "C")]);
        let lk = lookup_in(&d);
        assert!(m.affix_check(&lk, b"redo").is_some());
        assert!(m.affix_check(&lk, b"rice").is_some());
        assert!(m.affix_check(&lk, b"retry").is_some());
    }
}

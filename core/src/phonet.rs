//! Phonet rule transducer.
//!
//! A phonet rule file turns a word into a phonetic key through an ordered
//! set of rewrite rules, one per line: `FROM (>|>^|^>) TO`. The separator
//! carries the anchoring: `^>` fires only at the word start, `>^` only
//! when the match reaches the word end, plain `>` anywhere. A rule line
//! may start with a digit priority, `FROM` may be flagged `!` to be
//! loaded but never applied and may contain character classes (`(abc)`).
//! At load time rules are bucketed by every byte their first pattern
//! element can match, so transformation probes only a small candidate
//! list per input position.

use crate::charmap::CharMap;
use crate::error::{Error, Result};
use ahash::AHashMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pat {
    Byte(u8),
    Class(Vec<u8>),
}

impl Pat {
    fn matches(&self, b: u8) -> bool {
        match self {
            Pat::Byte(p) => *p == b,
            Pat::Class(set) => set.contains(&b),
        }
    }
}

#[derive(Debug, Clone)]
struct PhonetRule {
    pattern: Vec<Pat>,
    to: Vec<u8>,
    start_only: bool,
    end_only: bool,
    priority: u8,
    disabled: bool,
    seq: usize,
}

#[derive(Debug, Clone, Default)]
pub struct PhonetRules {
    version: String,
    rules: Vec<PhonetRule>,
    // first-byte -> rule indices, best match first
    buckets: AHashMap<u8, Vec<usize>>,
}

impl PhonetRules {
    /// Parse rule-file text. The first data line must be `version <str>`.
    pub fn parse(text: &str, path: &Path) -> Result<PhonetRules> {
        let mut out = PhonetRules::default();
        let mut lines = text.lines().enumerate();

        loop {
            match lines.next() {
                Some((lineno, line)) => {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    match line.strip_prefix("version") {
                        Some(rest) => {
                            out.version = rest.trim().to_string();
                            break;
                        }
                        None => {
                            return Err(Error::bad_format(
                                path,
                                lineno as u32 + 1,
                                "version <string>",
                                line.to_string(),
                            ))
                        }
                    }
                }
                None => {
                    return Err(Error::bad_format(
                        path,
                        0,
                        "version <string>",
                        "end of file",
                    ))
                }
            }
        }

        for (lineno, line) in lines {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let lineno = lineno as u32 + 1;
            let mut fields = line.split_whitespace().peekable();
            // optional digit priority ahead of the rule proper
            let mut priority = 5u8;
            if let Some(tok) = fields.peek() {
                if tok.bytes().all(|b| b.is_ascii_digit()) {
                    priority = tok.parse::<u32>().unwrap_or(5).min(9) as u8;
                    fields.next();
                }
            }
            let (from, sep, to) = match (fields.next(), fields.next(), fields.next()) {
                (Some(f), Some(s), Some(t)) => (f, s, t),
                _ => {
                    return Err(Error::bad_format(
                        path,
                        lineno,
                        "FROM (>|>^|^>) TO",
                        line.to_string(),
                    ))
                }
            };
            if fields.next().is_some() {
                return Err(Error::bad_format(
                    path,
                    lineno,
                    "FROM (>|>^|^>) TO",
                    line.to_string(),
                ));
            }
            let (start_only, end_only) = match sep {
                ">" => (false, false),
                "^>" => (true, false),
                ">^" => (false, true),
                other => {
                    return Err(Error::bad_format(
                        path,
                        lineno,
                        "a separator of >, >^ or ^>",
                        other.to_string(),
                    ))
                }
            };
            let rule = Self::parse_rule(
                from,
                to,
                start_only,
                end_only,
                priority,
                out.rules.len(),
                path,
                lineno,
            )?;
            out.rules.push(rule);
        }

        out.build_buckets();
        Ok(out)
    }

    #[allow(clippy::too_many_arguments)]
    fn parse_rule(
        from: &str,
        to: &str,
        start_only: bool,
        end_only: bool,
        priority: u8,
        seq: usize,
        path: &Path,
        lineno: u32,
    ) -> Result<PhonetRule> {
        let mut src = from.as_bytes();
        let disabled = match src.strip_prefix(b"!") {
            Some(rest) => {
                src = rest;
                true
            }
            None => false,
        };

        let mut pattern = Vec::new();
        let mut i = 0;
        while i < src.len() {
            match src[i] {
                b'(' => {
                    let close = src[i..].iter().position(|&b| b == b')').map(|p| p + i);
                    match close {
                        Some(close) if close > i + 1 => {
                            pattern.push(Pat::Class(src[i + 1..close].to_vec()));
                            i = close + 1;
                        }
                        _ => {
                            return Err(Error::bad_format(
                                path,
                                lineno,
                                "a ')' closing the character class",
                                from.to_string(),
                            ))
                        }
                    }
                }
                b => {
                    pattern.push(Pat::Byte(b));
                    i += 1;
                }
            }
        }
        if pattern.is_empty() {
            return Err(Error::bad_format(
                path,
                lineno,
                "a non-empty FROM pattern",
                from.to_string(),
            ));
        }

        let to = if to == "_" || to == "0" {
            Vec::new()
        } else {
            to.as_bytes().to_vec()
        };

        Ok(PhonetRule {
            pattern,
            to,
            start_only,
            end_only,
            priority,
            disabled,
            seq,
        })
    }

    fn build_buckets(&mut self) {
        self.buckets.clear();
        for (idx, rule) in self.rules.iter().enumerate() {
            if rule.disabled {
                continue;
            }
            match &rule.pattern[0] {
                Pat::Byte(b) => self.buckets.entry(*b).or_default().push(idx),
                Pat::Class(set) => {
                    for &b in set {
                        self.buckets.entry(b).or_default().push(idx);
                    }
                }
            }
        }
        // Longest pattern wins, then priority, then file order.
        for list in self.buckets.values_mut() {
            let rules = &self.rules;
            list.sort_by(|&a, &b| {
                let (ra, rb) = (&rules[a], &rules[b]);
                rb.pattern
                    .len()
                    .cmp(&ra.pattern.len())
                    .then(rb.priority.cmp(&ra.priority))
                    .then(ra.seq.cmp(&rb.seq))
            });
            list.dedup();
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Every byte any rule can emit; the scan pipelines use this to size
    /// candidate alphabets.
    pub fn output_chars(&self) -> Vec<u8> {
        let mut set = [false; 256];
        for r in &self.rules {
            for &b in &r.to {
                set[b as usize] = true;
            }
        }
        (1..256).filter(|&i| set[i]).map(|i| i as u8).collect()
    }

    /// Transform a word into its phonetic key.
    ///
    /// At each position the best matching rule fires and consumes
    /// `len(FROM)` bytes; unmatched bytes fall back to the language's
    /// soundslike letter tables. Runs of identical output bytes collapse.
    pub fn transform(&self, cm: &CharMap, word: &[u8]) -> Vec<u8> {
        let mut out: Vec<u8> = Vec::with_capacity(word.len());
        let mut i = 0;
        while i < word.len() {
            let b = cm.to_upper(word[i]);
            let mut matched = false;
            if let Some(cands) = self.buckets.get(&b) {
                for &ri in cands {
                    let rule = &self.rules[ri];
                    if rule.start_only && i != 0 {
                        continue;
                    }
                    let n = rule.pattern.len();
                    if i + n > word.len() {
                        continue;
                    }
                    if rule.end_only && i + n != word.len() {
                        continue;
                    }
                    let hit = rule
                        .pattern
                        .iter()
                        .zip(&word[i..i + n])
                        .all(|(p, &w)| p.matches(cm.to_upper(w)));
                    if hit {
                        for &t in &rule.to {
                            if out.last() != Some(&t) {
                                out.push(t);
                            }
                        }
                        i += n;
                        matched = true;
                        break;
                    }
                }
            }
            if !matched {
                let fallback = if i == 0 {
                    cm.sl_first(word[i])
                } else {
                    cm.sl_rest(word[i])
                };
                if fallback != 0 && out.last() != Some(&fallback) {
                    out.push(fallback);
                }
                i += 1;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charmap::test_util::ascii_charmap;

    fn rules(body: &str) -> PhonetRules {
        let text = format!("version 1.0\n{}", body);
        PhonetRules::parse(&text, Path::new("test_phonet.dat")).expect("parse")
    }

    #[test]
    fn version_required() {
        let err = PhonetRules::parse("PH > F\n", Path::new("p.dat"));
        assert!(err.is_err());
    }

    #[test]
    fn separator_is_mandatory() {
        let text = "version 1.0\nPH F\n";
        let err = PhonetRules::parse(text, Path::new("p.dat"));
        assert!(err.is_err());
        let text = "version 1.0\nPH -> F\n";
        assert!(PhonetRules::parse(text, Path::new("p.dat")).is_err());
    }

    #[test]
    fn literal_rule_applies() {
        let cm = ascii_charmap();
        let r = rules("PH > F\n");
        assert_eq!(r.transform(&cm, b"phone"), b"FONE");
    }

    #[test]
    fn class_and_start_anchor() {
        let cm = ascii_charmap();
        let r = rules("KN ^> N\nGH(TS) > G\n");
        assert_eq!(r.transform(&cm, b"knee"), b"NE");
        // ^> rules only fire at the start
        assert_eq!(r.transform(&cm, b"akne"), b"AKNE");
    }

    #[test]
    fn end_anchor() {
        let cm = ascii_charmap();
        let r = rules("E >^ _\n");
        assert_eq!(r.transform(&cm, b"note"), b"NOT");
        assert_eq!(r.transform(&cm, b"net"), b"NET");
    }

    #[test]
    fn longest_match_wins() {
        let cm = ascii_charmap();
        let r = rules("S > Z\nSCH > X\n");
        assert_eq!(r.transform(&cm, b"schba"), b"XBA");
    }

    #[test]
    fn priority_breaks_length_ties() {
        let cm = ascii_charmap();
        let r = rules("PH > F\n9 PH > B\n");
        assert_eq!(r.transform(&cm, b"ph"), b"B");
    }

    #[test]
    fn equal_rules_apply_in_file_order() {
        let cm = ascii_charmap();
        let r = rules("PH > F\nPH > B\n");
        assert_eq!(r.transform(&cm, b"ph"), b"F");
    }

    #[test]
    fn disabled_rule_is_skipped() {
        let cm = ascii_charmap();
        let r = rules("!PH > Q\n");
        assert_eq!(r.transform(&cm, b"ph"), b"PH");
    }

    #[test]
    fn output_collapses_runs() {
        let cm = ascii_charmap();
        let r = rules("LL > L\n");
        assert_eq!(r.transform(&cm, b"hello"), b"HELO");
    }
}

//! Compiling a word stream into the read-only dictionary format.
//!
//! Input lines are `word[/flags][:compound-info]`. Every word is
//! validated; with affix compression enabled, flags are kept on the
//! stored entries and only the expansions that shape the first three
//! soundslike bytes are materialized (the jump tables depend on them),
//! otherwise flags are expanded away up front. The build streams:
//! words are interned and grouped, the sorted groups and jump tables are
//! emitted in one pass, and the hash table is resolved at the end.

use crate::dict::insensitive_hash;
use crate::error::{Error, Result};
use crate::lang::Language;
use crate::readonly::{round_up, DataHead, ALIGN, HEADER_FIXED, MAGIC, MAGIC_LEN};
use ahash::{AHashMap, AHashSet};
use std::io::Write as _;
use std::path::Path;
use tracing::{debug, warn};

struct PendingWord {
    word: Vec<u8>,
    aff: Vec<u8>,
    has_compound: bool,
}

/// Compile `lines` into dictionary bytes.
pub fn compile_dict<I, S>(lines: I, lang: &Language) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let affix_compress = lang.affix_compress();
    let use_soundslike = lang.have_soundslike();
    if affix_compress && use_soundslike {
        return Err(Error::BadValue {
            key: "affix-compress".to_string(),
            value: "true".to_string(),
            expected: "no explicit soundslike alongside affix compression".to_string(),
        });
    }

    // ---- read and expand the word stream ----

    let mut words: Vec<PendingWord> = Vec::new();
    let mut seen: AHashSet<Vec<u8>> = AHashSet::new();
    let mut push = |words: &mut Vec<PendingWord>, w: Vec<u8>, aff: Vec<u8>, compound: bool| {
        if seen.insert(w.clone()) {
            words.push(PendingWord {
                word: w,
                aff,
                has_compound: compound,
            });
        } else {
            warn!(word = %String::from_utf8_lossy(&w), "ignoring duplicate");
        }
    };

    for line in lines {
        let line = line.as_ref().trim();
        if line.is_empty() {
            continue;
        }
        let bytes = line.as_bytes();
        let slash = bytes.iter().position(|&b| b == b'/');
        let colon = bytes.iter().position(|&b| b == b':');
        if let (Some(s), Some(c)) = (slash, colon) {
            if s > c {
                return Err(Error::BadValue {
                    key: "word list entry".to_string(),
                    value: line.to_string(),
                    expected: "word[/flags][:compound-info]".to_string(),
                });
            }
        }
        let word_end = slash.or(colon).unwrap_or(bytes.len());
        let word = &bytes[..word_end];
        let flags = match slash {
            Some(s) => &bytes[s + 1..colon.unwrap_or(bytes.len())],
            None => &[][..],
        };
        let has_compound = colon.is_some();

        lang.check_if_valid(word)?;

        if flags.is_empty() {
            push(&mut words, word.to_vec(), Vec::new(), has_compound);
            continue;
        }
        let affix = lang.affix().ok_or_else(|| Error::InvalidFlag {
            flag: flags[0] as char,
            rule_source: String::from_utf8_lossy(word).into_owned(),
        })?;
        affix.validate_flags(flags, &String::from_utf8_lossy(word))?;

        if affix_compress {
            // expand only what shapes the first three soundslike bytes
            for wa in affix.expand_limited(word, flags, 3) {
                push(&mut words, wa.word, wa.aff, has_compound);
            }
        } else {
            for wa in affix.expand(word, flags) {
                push(&mut words, wa.word, Vec::new(), has_compound);
            }
        }
    }

    // ---- group by soundslike and sort ----

    let mut max_word_length = 0usize;
    let mut minimal_specified = u32::MAX;
    for pw in &words {
        max_word_length = max_word_length.max(pw.word.len());
        if pw.has_compound {
            minimal_specified = minimal_specified.min(pw.word.len() as u32);
        }
    }

    // With explicit soundslike data, words sharing a key share one
    // block; without it every word is its own block, ordered by its
    // stripped form so the jump tables still work.
    let ordered: Vec<(Vec<u8>, Vec<usize>)> = if use_soundslike {
        let mut groups: AHashMap<Vec<u8>, Vec<usize>> = AHashMap::new();
        for (i, pw) in words.iter().enumerate() {
            groups.entry(lang.to_soundslike(&pw.word)).or_default().push(i);
        }
        let mut out: Vec<(Vec<u8>, Vec<usize>)> = groups.into_iter().collect();
        out.sort();
        out
    } else {
        let mut out: Vec<(Vec<u8>, Vec<usize>)> = words
            .iter()
            .enumerate()
            .map(|(i, pw)| (lang.to_soundslike(&pw.word), vec![i]))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| words[a.1[0]].word.cmp(&words[b.1[0]].word)));
        out
    };
    let group_count = ordered.len();

    // ---- emit the data block and jump tables ----

    let mut data: Vec<u8> = Vec::new();
    data.extend_from_slice(&[0u8; 8]); // leading pad, keeps offsets nonzero
    let mut jump1: Vec<([u8; 4], u32)> = Vec::new();
    let mut jump2: Vec<([u8; 4], u32)> = Vec::new();
    let mut hash_offsets: Vec<(usize, u32)> = Vec::new(); // (word index, offset)
    let mut prev_sl: Vec<u8> = Vec::new();
    let mut prev_pos: usize = 4;
    let mut first = true;

    for (sl, members) in &ordered {
        if use_soundslike {
            if data.len() % 2 != 0 {
                data.push(0);
            }
            if sl.len() > u16::MAX as usize {
                return Err(Error::BadValue {
                    key: "soundslike".to_string(),
                    value: String::from_utf8_lossy(sl).into_owned(),
                    expected: "a soundslike shorter than 64K".to_string(),
                });
            }
            data.extend_from_slice(&(sl.len() as u16).to_le_bytes());
            data.extend_from_slice(&[0, 0]); // offset to next, patched below
        } else {
            data.extend_from_slice(&[0, 0]); // offset + affix offset
        }

        let new_prefix3 = first || prev_sl.iter().take(3).ne(sl.iter().take(3));
        if new_prefix3 {
            let mut key = [0u8; 4];
            for (i, &b) in sl.iter().take(3).enumerate() {
                key[i] = b;
            }
            jump2.push((key, data.len() as u32));
            if first || prev_sl.iter().take(2).ne(sl.iter().take(2)) {
                let mut key1 = [0u8; 4];
                for (i, &b) in sl.iter().take(2).enumerate() {
                    key1[i] = b;
                }
                jump1.push((key1, jump2.len() as u32 - 1));
            }
            patch_next(&mut data, prev_pos, 0, use_soundslike)?;
        } else {
            let dist = data.len() - prev_pos;
            patch_next(&mut data, prev_pos, dist, use_soundslike)?;
        }
        prev_pos = data.len();
        first = false;
        prev_sl = sl.clone();

        if use_soundslike {
            data.extend_from_slice(sl);
            data.push(0);
            for &wi in members {
                hash_offsets.push((wi, data.len() as u32));
                data.extend_from_slice(&words[wi].word);
                data.push(0);
            }
            data.push(0); // terminates the word run
        } else {
            // one word per entry; the affix offset byte points past it
            let wi = members[0];
            let pw = &words[wi];
            let entry_len = 2 + pw.word.len() + 1 + pw.aff.len() + 1;
            if entry_len > u8::MAX as usize {
                return Err(Error::BadValue {
                    key: "word".to_string(),
                    value: String::from_utf8_lossy(&pw.word).into_owned(),
                    expected: "an entry shorter than 255 bytes".to_string(),
                });
            }
            data[prev_pos - 1] = (pw.word.len() + 1) as u8;
            hash_offsets.push((wi, data.len() as u32));
            data.extend_from_slice(&pw.word);
            data.push(0);
            data.extend_from_slice(&pw.aff);
            data.push(0);
        }
    }

    // end sentinels
    if use_soundslike {
        if data.len() % 2 != 0 {
            data.push(0);
        }
        data.extend_from_slice(&[0u8; 4]);
    } else {
        data.extend_from_slice(&[0u8; 2]);
    }
    if !first {
        // close off the last run
        patch_next(&mut data, prev_pos, 0, use_soundslike)?;
    }
    jump1.push(([0u8; 4], 0));
    jump2.push(([0u8; 4], 0));

    // ---- resolve the hash table ----

    let word_count = hash_offsets.len();
    let buckets = (word_count * 5 / 4 + 1).next_power_of_two().max(16);
    let mut table = vec![u32::MAX; buckets];
    let cm = lang.charmap();
    for &(wi, offset) in &hash_offsets {
        let mut slot = insensitive_hash(cm, &words[wi].word) as usize % buckets;
        while table[slot] != u32::MAX {
            slot = (slot + 1) % buckets;
        }
        table[slot] = offset;
    }

    // ---- assemble the file ----

    let lang_name = lang.name().as_bytes();
    let sl_name = lang.soundslike_name().as_bytes();
    let sl_version = lang.soundslike_version().as_bytes();
    let mid_chars = lang.mid_chars();

    let mut head = DataHead {
        word_count: word_count as u32,
        word_buckets: buckets as u32,
        soundslike_count: group_count as u32,
        max_word_length: max_word_length as u32,
        lang_name_size: lang_name.len() as u32 + 1,
        soundslike_name_size: sl_name.len() as u32 + 1,
        soundslike_version_size: sl_version.len() as u32 + 1,
        minimal_specified,
        middle_chars_size: mid_chars.len() as u32 + 1,
        affix_info: affix_compress as u32,
        ..DataHead::default()
    };
    let head_size = round_up(
        HEADER_FIXED
            + head.lang_name_size as usize
            + head.soundslike_name_size as usize
            + head.soundslike_version_size as usize
            + head.middle_chars_size as usize,
        ALIGN,
    );
    head.head_size = head_size as u32;

    let mut out = Vec::new();
    out.extend_from_slice(MAGIC);
    out.resize(MAGIC_LEN, 0);
    out.extend_from_slice(&head.to_bytes());
    for s in [lang_name, sl_name, sl_version, mid_chars] {
        out.extend_from_slice(s);
        out.push(0);
    }
    out.resize(head_size, 0);

    head.jump1_offset = (out.len() - head_size) as u32;
    for (sl, loc) in &jump1 {
        out.extend_from_slice(sl);
        out.extend_from_slice(&loc.to_le_bytes());
    }
    out.resize(round_up(out.len(), ALIGN), 0);

    head.jump2_offset = (out.len() - head_size) as u32;
    for (sl, loc) in &jump2 {
        out.extend_from_slice(sl);
        out.extend_from_slice(&loc.to_le_bytes());
    }
    out.resize(round_up(out.len(), ALIGN), 0);

    head.word_offset = (out.len() - head_size) as u32;
    out.extend_from_slice(&data);
    out.resize(round_up(out.len(), ALIGN), 0);

    head.hash_offset = (out.len() - head_size) as u32;
    for v in &table {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out.resize(round_up(out.len(), ALIGN), 0);
    head.block_size = (out.len() - head_size) as u32;

    // header fields are final now; rewrite them in place
    out[MAGIC_LEN..HEADER_FIXED].copy_from_slice(&head.to_bytes());

    debug!(
        words = word_count,
        soundslikes = head.soundslike_count,
        bytes = out.len(),
        "compiled dictionary"
    );
    Ok(out)
}

/// Compile to a file, atomically.
pub fn create(
    lines: impl IntoIterator<Item = String>,
    lang: &Language,
    path: &Path,
) -> Result<()> {
    let bytes = compile_dict(lines, lang)?;
    let tmp = crate::writable::tmp_path(path);
    let mut f = std::fs::File::create(&tmp).map_err(|e| Error::io(&tmp, e))?;
    f.write_all(&bytes).map_err(|e| Error::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| Error::io(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charmap::test_util::ascii_cset;
    use crate::charmap::CompareOptions;
    use crate::dict::{Dictionary, SoundslikeKey};
    use crate::lang::test_util::{test_descriptor, test_lang, TEST_AFFIX};
    use crate::lang::{Language, LanguageSources};
    use crate::readonly::ReadOnlyDict;
    use std::sync::Arc;

    fn compiled(words: &[&str], lang: &Arc<Language>) -> ReadOnlyDict {
        let bytes = compile_dict(words.iter().copied(), lang).expect("compile");
        let lang = lang.clone();
        ReadOnlyDict::from_bytes(bytes, Path::new("test.rws"), move |_| Ok(lang)).expect("load")
    }

    fn affix_compressed_lang() -> Arc<Language> {
        let sources = LanguageSources {
            descriptor: "name test\ncharset ascii\naffix test\naffix-compress true\n\
                         special ' ***\nspecial - -*-\n"
                .to_string(),
            cset: ascii_cset(),
            affix: Some(TEST_AFFIX.to_string()),
            ..LanguageSources::default()
        };
        Arc::new(Language::from_sources(&sources, Path::new("test.dat")).expect("lang"))
    }

    #[test]
    fn roundtrip_lookup() {
        let lang = test_lang();
        let d = compiled(&["hello", "world", "helo", "Paris"], &lang);
        assert_eq!(d.size(), 4);
        let cmp = CompareOptions::default();
        assert!(d.lookup(b"hello", &cmp).is_some());
        assert!(d.lookup(b"world", &cmp).is_some());
        assert!(d.lookup(b"Paris", &cmp).is_some());
        assert!(d.lookup(b"paris", &cmp).is_none()); // cased list word
        assert!(d.lookup(b"PARIS", &cmp).is_some()); // all-upper input
        assert!(d.lookup(b"nothere", &cmp).is_none());
    }

    #[test]
    fn roundtrip_scan_covers_every_word() {
        let lang = test_lang();
        let words = ["hello", "helo", "world", "abacus", "zebra"];
        let d = compiled(&words, &lang);
        let mut seen = Vec::new();
        let mut iter = d.soundslike_iter();
        while let Some(group) = iter.next(usize::MAX) {
            for e in d.soundslike_lookup(&group.key) {
                seen.push(e.word);
            }
        }
        seen.sort();
        let mut expect: Vec<Vec<u8>> = words.iter().map(|w| w.as_bytes().to_vec()).collect();
        expect.sort();
        assert_eq!(seen, expect);
    }

    #[test]
    fn shared_soundslike_groups_words_together() {
        let lang = test_lang();
        let d = compiled(&["hello", "helo"], &lang);
        let mut iter = d.soundslike_iter();
        let mut grouped = None;
        while let Some(group) = iter.next(usize::MAX) {
            if group.soundslike == b"HELO" {
                grouped = Some(d.soundslike_lookup(&group.key).len());
            }
        }
        assert_eq!(grouped, Some(2));
    }

    #[test]
    fn stopped_at_skips_buckets() {
        let lang = test_lang();
        let d = compiled(&["apple", "apricot", "banana", "cherry"], &lang);
        let mut iter = d.soundslike_iter();
        // first yield is the first two-byte bucket ("AP")
        let first = iter.next(usize::MAX).expect("first bucket");
        assert!(matches!(first.key, SoundslikeKey::Empty));
        assert_eq!(first.soundslike, b"AP");
        // claiming the very first byte is already over budget skips the
        // whole bucket
        let next = iter.next(0).expect("next bucket");
        assert_eq!(next.soundslike, b"BANA"[..2].to_vec());
    }

    #[test]
    fn affix_compressed_roundtrip() {
        let lang = affix_compressed_lang();
        let bytes =
            compile_dict(["happy/A", "day/S"].iter().copied(), &lang).expect("compile");
        let l = lang.clone();
        let d = ReadOnlyDict::from_bytes(bytes, Path::new("t.rws"), move |_| Ok(l)).unwrap();
        assert!(d.flags().affix_compressed);
        let cmp = CompareOptions::default();
        // prefixed form was materialized, suffix flag kept on the root
        assert!(d.lookup(b"unhappy", &cmp).is_some());
        assert!(d.lookup(b"happy", &cmp).is_some());
        let day = d.lookup(b"day", &cmp).expect("day");
        assert_eq!(day.aff, b"S");
        assert!(d.lookup(b"days", &cmp).is_some());
    }

    #[test]
    fn unknown_flag_is_fatal() {
        let lang = test_lang();
        let err = compile_dict(["word/Z"].iter().copied(), &lang);
        assert!(matches!(err, Err(Error::InvalidFlag { .. })));
    }

    #[test]
    fn invalid_word_is_fatal() {
        let lang = test_lang();
        assert!(compile_dict(["123"].iter().copied(), &lang).is_err());
    }

    #[test]
    fn compound_info_sets_minimal_specified() {
        let lang = test_lang();
        let bytes = compile_dict(["foo:1", "longerword"].iter().copied(), &lang).unwrap();
        let l = lang.clone();
        let d = ReadOnlyDict::from_bytes(bytes, Path::new("t.rws"), move |_| Ok(l)).unwrap();
        assert_eq!(d.head().minimal_specified, 3);
    }

    #[test]
    fn mismatched_soundslike_is_rejected() {
        let lang = test_lang();
        let bytes = compile_dict(["hello"].iter().copied(), &lang).unwrap();
        let sources = LanguageSources {
            descriptor: test_descriptor(""),
            cset: ascii_cset(),
            ..LanguageSources::default()
        };
        // same name, but soundslike generic vs none
        let mut d = sources.clone();
        d.descriptor = "name test\ncharset ascii\nspecial ' ***\nspecial - -*-\n".to_string();
        let other = Arc::new(Language::from_sources(&d, Path::new("o.dat")).unwrap());
        let err = ReadOnlyDict::from_bytes(bytes, Path::new("t.rws"), move |_| Ok(other));
        assert!(matches!(err, Err(Error::MismatchedSoundslike { .. })));
    }

    #[test]
    fn empty_dictionary_scans_to_nothing() {
        let lang = test_lang();
        let d = compiled(&[], &lang);
        assert_eq!(d.size(), 0);
        let mut iter = d.soundslike_iter();
        assert!(iter.next(usize::MAX).is_none());
    }
}

fn patch_next(data: &mut [u8], pos: usize, dist: usize, use_soundslike: bool) -> Result<()> {
    if use_soundslike {
        if dist > u16::MAX as usize {
            return Err(Error::BadValue {
                key: "soundslike group".to_string(),
                value: format!("{} bytes", dist),
                expected: "a group shorter than 64K".to_string(),
            });
        }
        data[pos - 2..pos].copy_from_slice(&(dist as u16).to_le_bytes());
    } else {
        if dist > u8::MAX as usize {
            return Err(Error::BadValue {
                key: "dictionary entry".to_string(),
                value: format!("{} bytes", dist),
                expected: "an entry shorter than 255 bytes".to_string(),
            });
        }
        data[pos - 2] = dist as u8;
    }
    Ok(())
}

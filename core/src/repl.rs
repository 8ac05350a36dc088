//! The user replacement dictionary: misspelling -> accepted corrections.
//!
//! Entries are multi-valued and case-sensitive per (misspelling,
//! correction) pair; the misspelling side is stored lowercased. The
//! on-disk format shares the personal-file shape under a
//! `personal_repl-1.1 <lang> 0` header with `<mis> <repl>` body lines.
//! During suggestion scans the misspellings act as words of their own
//! (kind `Misspelled`) so a near-miss hit can expand into its stored
//! corrections.

use crate::charmap::CompareOptions;
use crate::dict::{
    next_dict_id, DictFlags, DictId, Dictionary, SoundslikeGroup, SoundslikeIter, SoundslikeKey,
    WordEntry, WordKind,
};
use crate::error::{Error, Result};
use crate::lang::Language;
use crate::writable::{modification_time, tmp_path};
use ahash::AHashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, warn};

pub const REPL_HEADER: &str = "personal_repl-1.1";

#[derive(Debug)]
pub struct ReplDict {
    id: DictId,
    lang: Arc<Language>,
    /// lowercased misspelling -> corrections, insertion order kept
    repls: AHashMap<Vec<u8>, Vec<Vec<u8>>>,
    /// soundslike of misspelling -> misspellings
    by_soundslike: AHashMap<Vec<u8>, Vec<Vec<u8>>>,
    size: usize,
    file: Option<PathBuf>,
    file_date: Option<SystemTime>,
}

impl ReplDict {
    pub fn new(lang: Arc<Language>) -> ReplDict {
        ReplDict {
            id: next_dict_id(),
            lang,
            repls: AHashMap::new(),
            by_soundslike: AHashMap::new(),
            size: 0,
            file: None,
            file_date: None,
        }
    }

    pub fn load(lang: Arc<Language>, path: impl AsRef<Path>) -> Result<ReplDict> {
        let path = path.as_ref();
        let mut dict = ReplDict::new(lang);
        dict.file = Some(path.to_path_buf());
        if path.exists() {
            dict.merge(path)?;
            dict.file_date = modification_time(path);
        }
        Ok(dict)
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn set_file(&mut self, path: impl Into<PathBuf>) {
        self.file = Some(path.into());
    }

    /// Record that `mis` should suggest `cor`. Idempotent per pair.
    pub fn add_repl(&mut self, mis: &[u8], cor: &[u8]) -> Result<bool> {
        self.lang.check_if_valid(mis)?;
        let mis = self.lang.charmap().lower_word(mis);
        let list = self.repls.entry(mis.clone()).or_default();
        if list.iter().any(|c| c == cor) {
            return Ok(false);
        }
        if list.is_empty() && self.lang.have_soundslike() {
            let sl = self.lang.to_soundslike(&mis);
            self.by_soundslike.entry(sl).or_default().push(mis);
        }
        list.push(cor.to_vec());
        self.size += 1;
        Ok(true)
    }

    /// The stored corrections for a misspelling.
    pub fn repl_lookup(&self, mis: &[u8]) -> Vec<Vec<u8>> {
        let mis = self.lang.charmap().lower_word(mis);
        self.repls.get(&mis).cloned().unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.repls.clear();
        self.by_soundslike.clear();
        self.size = 0;
    }

    fn pairs_sorted(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut out: Vec<(Vec<u8>, Vec<u8>)> = self
            .repls
            .iter()
            .flat_map(|(m, cs)| cs.iter().map(move |c| (m.clone(), c.clone())))
            .collect();
        out.sort();
        out
    }

    pub fn merge(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let mut lines = text.lines().enumerate();
        let (_, header) = lines
            .next()
            .ok_or_else(|| Error::bad_format(path, 1, REPL_HEADER, "an empty file"))?;
        let mut fields = header.split_whitespace();
        match fields.next() {
            Some(REPL_HEADER) => {}
            other => {
                return Err(Error::bad_format(
                    path,
                    1,
                    REPL_HEADER,
                    other.unwrap_or("an empty line").to_string(),
                ))
            }
        }
        match fields.next() {
            Some(l) if l == self.lang.name() => {}
            other => {
                return Err(Error::LanguageMismatch {
                    expected: self.lang.name().to_string(),
                    got: other.unwrap_or("<missing>").to_string(),
                })
            }
        }
        let mut count = 0usize;
        for (lineno, line) in lines {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut f = line.split_whitespace();
            match (f.next(), f.next()) {
                (Some(mis), Some(cor)) => {
                    self.add_repl(mis.as_bytes(), cor.as_bytes())?;
                    count += 1;
                }
                _ => {
                    warn!(
                        file = %path.display(),
                        line = lineno + 1,
                        "skipping malformed replacement line"
                    );
                }
            }
        }
        debug!(file = %path.display(), pairs = count, "merged replacement dictionary");
        Ok(())
    }

    pub fn save(&mut self, do_update: bool) -> Result<()> {
        let Some(path) = self.file.clone() else {
            return Ok(());
        };
        if do_update {
            if let Some(disk) = modification_time(&path) {
                if self.file_date.map_or(true, |s| disk > s) && path.exists() {
                    warn!(file = %path.display(), "file changed since load, re-merging");
                    self.merge(&path)?;
                }
            }
        }
        self.save_as(&path)?;
        self.file_date = modification_time(&path);
        Ok(())
    }

    pub fn save_as(&self, path: &Path) -> Result<()> {
        let tmp = tmp_path(path);
        let mut out = Vec::new();
        write!(out, "{} {} 0\n", REPL_HEADER, self.lang.name()).expect("write to vec");
        for (mis, cor) in self.pairs_sorted() {
            out.extend_from_slice(&mis);
            out.push(b' ');
            out.extend_from_slice(&cor);
            out.push(b'\n');
        }
        std::fs::write(&tmp, &out).map_err(|e| Error::io(&tmp, e))?;
        std::fs::rename(&tmp, path).map_err(|e| Error::io(path, e))?;
        Ok(())
    }

    fn misspelled_entry(&self, mis: &[u8]) -> WordEntry {
        WordEntry {
            word: mis.to_vec(),
            aff: Vec::new(),
            what: WordKind::Misspelled,
        }
    }
}

impl Dictionary for ReplDict {
    fn id(&self) -> DictId {
        self.id
    }

    fn lang(&self) -> &Arc<Language> {
        &self.lang
    }

    fn size(&self) -> usize {
        self.size
    }

    fn flags(&self) -> DictFlags {
        DictFlags {
            have_soundslike: self.lang.have_soundslike(),
            fast_lookup: true,
            fast_scan: false,
            affix_compressed: false,
        }
    }

    /// Misspellings are not words; plain lookup never accepts them.
    fn lookup(&self, _word: &[u8], _cmp: &CompareOptions) -> Option<WordEntry> {
        None
    }

    fn clean_lookup(&self, _clean: &[u8]) -> Vec<WordEntry> {
        Vec::new()
    }

    fn soundslike_lookup(&self, key: &SoundslikeKey) -> Vec<WordEntry> {
        match key {
            SoundslikeKey::Exact(sl) => self
                .by_soundslike
                .get(sl)
                .map(|ms| ms.iter().map(|m| self.misspelled_entry(m)).collect())
                .unwrap_or_default(),
            SoundslikeKey::Single(entry) => vec![entry.clone()],
            SoundslikeKey::Offset(_) | SoundslikeKey::Empty => Vec::new(),
        }
    }

    fn soundslike_iter(&self) -> Box<dyn SoundslikeIter + '_> {
        if self.lang.have_soundslike() {
            let mut keys: Vec<Vec<u8>> = self.by_soundslike.keys().cloned().collect();
            keys.sort();
            Box::new(ReplSoundslikeIter { keys, pos: 0 })
        } else {
            let mut mis: Vec<Vec<u8>> = self.repls.keys().cloned().collect();
            mis.sort();
            Box::new(ReplWordIter {
                lang: self.lang.clone(),
                mis: mis
                    .into_iter()
                    .map(|m| self.misspelled_entry(&m))
                    .collect(),
                pos: 0,
            })
        }
    }
}

struct ReplSoundslikeIter {
    keys: Vec<Vec<u8>>,
    pos: usize,
}

impl SoundslikeIter for ReplSoundslikeIter {
    fn next(&mut self, _stopped_at: usize) -> Option<SoundslikeGroup> {
        let sl = self.keys.get(self.pos)?.clone();
        self.pos += 1;
        Some(SoundslikeGroup {
            soundslike: sl.clone(),
            key: SoundslikeKey::Exact(sl),
        })
    }
}

struct ReplWordIter {
    lang: Arc<Language>,
    mis: Vec<WordEntry>,
    pos: usize,
}

impl SoundslikeIter for ReplWordIter {
    fn next(&mut self, _stopped_at: usize) -> Option<SoundslikeGroup> {
        let entry = self.mis.get(self.pos)?.clone();
        self.pos += 1;
        Some(SoundslikeGroup {
            soundslike: self.lang.to_soundslike(&entry.word),
            key: SoundslikeKey::Single(entry),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::test_util::test_lang;

    fn temp_file(tag: &str) -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!(
            "libspell_test_repl_{}_{}.prepl",
            tag,
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        p
    }

    #[test]
    fn add_and_lookup() {
        let mut d = ReplDict::new(test_lang());
        assert!(d.add_repl(b"teh", b"the").unwrap());
        assert!(!d.add_repl(b"teh", b"the").unwrap());
        assert!(d.add_repl(b"teh", b"ten").unwrap());
        assert_eq!(d.repl_lookup(b"teh"), vec![b"the".to_vec(), b"ten".to_vec()]);
        assert_eq!(d.repl_lookup(b"Teh"), vec![b"the".to_vec(), b"ten".to_vec()]);
        assert!(d.repl_lookup(b"xyz").is_empty());
    }

    #[test]
    fn save_and_reload() {
        let path = temp_file("roundtrip");
        {
            let mut d = ReplDict::load(test_lang(), &path).unwrap();
            d.add_repl(b"teh", b"the").unwrap();
            d.save(true).unwrap();
        }
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("personal_repl-1.1 test 0"));
        assert!(text.contains("teh the"));
        let d2 = ReplDict::load(test_lang(), &path).unwrap();
        assert_eq!(d2.repl_lookup(b"teh"), vec![b"the".to_vec()]);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn scan_sees_misspellings() {
        let mut d = ReplDict::new(test_lang());
        d.add_repl(b"teh", b"the").unwrap();
        let mut iter = d.soundslike_iter();
        let g = iter.next(usize::MAX).expect("one group");
        let words = d.soundslike_lookup(&g.key);
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].word, b"teh");
        assert_eq!(words[0].what, WordKind::Misspelled);
        assert!(iter.next(usize::MAX).is_none());
    }
}

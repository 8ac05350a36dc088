//! Writable word lists: the personal and session dictionaries.
//!
//! Words live in an in-memory map keyed by clean form, with a parallel
//! soundslike multi-map when the language has a real soundslike. The
//! on-disk format is one word per line under a
//! `personal_ws-1.1 <lang> <count>` header. Saving re-merges the on-disk
//! file first when someone else has written it since our last snapshot,
//! then replaces it atomically via a tempfile rename.

use crate::charmap::CompareOptions;
use crate::dict::{
    next_dict_id, DictFlags, DictId, Dictionary, SoundslikeGroup, SoundslikeIter, SoundslikeKey,
    WordEntry,
};
use crate::error::{Error, Result};
use crate::lang::Language;
use ahash::AHashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, warn};

pub const PERSONAL_HEADER: &str = "personal_ws-1.1";

#[derive(Debug)]
pub struct WritableDict {
    id: DictId,
    lang: Arc<Language>,
    /// clean form -> words stored under it
    words: AHashMap<Vec<u8>, Vec<Vec<u8>>>,
    /// soundslike -> words, kept only for phonetic languages
    by_soundslike: AHashMap<Vec<u8>, Vec<Vec<u8>>>,
    size: usize,
    file: Option<PathBuf>,
    file_date: Option<SystemTime>,
}

impl WritableDict {
    pub fn new(lang: Arc<Language>) -> WritableDict {
        WritableDict {
            id: next_dict_id(),
            lang,
            words: AHashMap::new(),
            by_soundslike: AHashMap::new(),
            size: 0,
            file: None,
            file_date: None,
        }
    }

    /// Open a personal dictionary file; a missing file yields an empty
    /// dictionary that will be created on the first save.
    pub fn load(lang: Arc<Language>, path: impl AsRef<Path>) -> Result<WritableDict> {
        let path = path.as_ref();
        let mut dict = WritableDict::new(lang);
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

    fn clean_key(&self, word: &[u8]) -> Vec<u8> {
        self.lang.charmap().clean_word(word)
    }

    /// Add a word. Returns false when an equal entry (under the default
    /// sensitive compare) was already present.
    pub fn add(&mut self, word: &[u8]) -> Result<bool> {
        self.lang.check_if_valid(word)?;
        if self.lookup(word, &CompareOptions::default()).is_some() {
            return Ok(false);
        }
        let key = self.clean_key(word);
        self.words.entry(key).or_default().push(word.to_vec());
        if self.lang.have_soundslike() {
            let sl = self.lang.to_soundslike(word);
            self.by_soundslike.entry(sl).or_default().push(word.to_vec());
        }
        self.size += 1;
        Ok(true)
    }

    /// Remove every stored casing of the word. Returns true if anything
    /// went away.
    pub fn remove(&mut self, word: &[u8]) -> bool {
        let key = self.clean_key(word);
        let Some(list) = self.words.get_mut(&key) else {
            return false;
        };
        let before = list.len();
        let removed: Vec<Vec<u8>> = list
            .iter()
            .filter(|w| crate::dict::insensitive_eq(self.lang.charmap(), w, word))
            .cloned()
            .collect();
        list.retain(|w| !crate::dict::insensitive_eq(self.lang.charmap(), w, word));
        let after = list.len();
        if list.is_empty() {
            self.words.remove(&key);
        }
        for w in &removed {
            let sl = self.lang.to_soundslike(w);
            if let Some(ws) = self.by_soundslike.get_mut(&sl) {
                ws.retain(|x| x != w);
                if ws.is_empty() {
                    self.by_soundslike.remove(&sl);
                }
            }
        }
        self.size -= before - after;
        before != after
    }

    pub fn clear(&mut self) {
        self.words.clear();
        self.by_soundslike.clear();
        self.size = 0;
    }

    /// All words, sorted; the on-disk order and the word-list views use
    /// this.
    pub fn word_list(&self) -> Vec<Vec<u8>> {
        let mut out: Vec<Vec<u8>> = self.words.values().flatten().cloned().collect();
        out.sort();
        out
    }

    /// Merge a personal file into this dictionary. Partial additions are
    /// rolled back if any line fails.
    pub fn merge(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let mut lines = text.lines().enumerate();
        let (_, header) = lines.next().ok_or_else(|| {
            Error::bad_format(path, 1, PERSONAL_HEADER, "an empty file")
        })?;
        let mut fields = header.split_whitespace();
        match fields.next() {
            Some(PERSONAL_HEADER) => {}
            other => {
                return Err(Error::bad_format(
                    path,
                    1,
                    PERSONAL_HEADER,
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

        let mut added: Vec<Vec<u8>> = Vec::new();
        for (lineno, line) in lines {
            let word = line.trim();
            if word.is_empty() {
                continue;
            }
            match self.add(word.as_bytes()) {
                Ok(true) => added.push(word.as_bytes().to_vec()),
                Ok(false) => {}
                Err(e) => {
                    for w in &added {
                        self.remove(w);
                    }
                    warn!(
                        file = %path.display(),
                        line = lineno + 1,
                        "merge failed, rolled back"
                    );
                    return Err(e);
                }
            }
        }
        debug!(file = %path.display(), words = added.len(), "merged personal dictionary");
        Ok(())
    }

    /// Write the dictionary back to its file. With `do_update`, changes
    /// written by someone else since our snapshot are merged in first.
    pub fn save(&mut self, do_update: bool) -> Result<()> {
        let Some(path) = self.file.clone() else {
            return Ok(()); // session dictionaries have no backing file
        };
        if do_update {
            let disk = modification_time(&path);
            if let (Some(disk), snapshot) = (disk, self.file_date) {
                if snapshot.map_or(true, |s| disk > s) && path.exists() {
                    warn!(file = %path.display(), "file changed since load, re-merging");
                    self.merge(&path)?;
                }
            }
        }
        self.save_as(&path)?;
        self.file_date = modification_time(&path);
        Ok(())
    }

    /// Write to an explicit path: tempfile next to the target, renamed
    /// over it on success so the original is never half-written.
    pub fn save_as(&self, path: &Path) -> Result<()> {
        let words = self.word_list();
        let tmp = tmp_path(path);
        let mut out = Vec::with_capacity(words.len() * 12 + 64);
        write!(
            out,
            "{} {} {}\n",
            PERSONAL_HEADER,
            self.lang.name(),
            words.len()
        )
        .expect("write to vec");
        for w in &words {
            out.extend_from_slice(w);
            out.push(b'\n');
        }
        std::fs::write(&tmp, &out).map_err(|e| Error::io(&tmp, e))?;
        std::fs::rename(&tmp, path).map_err(|e| Error::io(path, e))?;
        Ok(())
    }
}

pub(crate) fn modification_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

impl Dictionary for WritableDict {
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

    fn lookup(&self, word: &[u8], cmp: &CompareOptions) -> Option<WordEntry> {
        let key = self.clean_key(word);
        let list = self.words.get(&key)?;
        list.iter()
            .find(|w| cmp.matches(self.lang.charmap(), word, w))
            .map(|w| WordEntry::new(w.clone()))
    }

    fn clean_lookup(&self, clean: &[u8]) -> Vec<WordEntry> {
        self.words
            .get(clean)
            .map(|list| list.iter().map(|w| WordEntry::new(w.clone())).collect())
            .unwrap_or_default()
    }

    fn soundslike_lookup(&self, key: &SoundslikeKey) -> Vec<WordEntry> {
        match key {
            SoundslikeKey::Exact(sl) => self
                .by_soundslike
                .get(sl)
                .map(|ws| ws.iter().map(|w| WordEntry::new(w.clone())).collect())
                .unwrap_or_default(),
            SoundslikeKey::Single(entry) => vec![entry.clone()],
            SoundslikeKey::Offset(_) | SoundslikeKey::Empty => Vec::new(),
        }
    }

    fn soundslike_iter(&self) -> Box<dyn SoundslikeIter + '_> {
        if self.lang.have_soundslike() {
            let mut keys: Vec<Vec<u8>> = self.by_soundslike.keys().cloned().collect();
            keys.sort();
            Box::new(WritableSoundslikeIter { keys, pos: 0 })
        } else {
            let mut words = self.word_list();
            words.sort();
            Box::new(WritableWordIter {
                lang: self.lang.clone(),
                words,
                pos: 0,
            })
        }
    }
}

struct WritableSoundslikeIter {
    keys: Vec<Vec<u8>>,
    pos: usize,
}

impl SoundslikeIter for WritableSoundslikeIter {
    fn next(&mut self, _stopped_at: usize) -> Option<SoundslikeGroup> {
        let sl = self.keys.get(self.pos)?.clone();
        self.pos += 1;
        Some(SoundslikeGroup {
            soundslike: sl.clone(),
            key: SoundslikeKey::Exact(sl),
        })
    }
}

struct WritableWordIter {
    lang: Arc<Language>,
    words: Vec<Vec<u8>>,
    pos: usize,
}

impl SoundslikeIter for WritableWordIter {
    fn next(&mut self, _stopped_at: usize) -> Option<SoundslikeGroup> {
        let w = self.words.get(self.pos)?.clone();
        self.pos += 1;
        Some(SoundslikeGroup {
            soundslike: self.lang.to_soundslike(&w),
            key: SoundslikeKey::Single(WordEntry::new(w)),
        })
    }
}

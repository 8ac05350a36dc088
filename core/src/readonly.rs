//! The compiled read-only dictionary.
//!
//! On disk the dictionary is a 64-byte magic string, a fixed header of
//! little-endian u32 fields, the language / soundslike / middle-chars
//! name strings, and four 16-byte-aligned blocks:
//!
//! * `jump1`: entries keyed by the first two soundslike bytes, each
//!   pointing at a run of `jump2` entries;
//! * `jump2`: entries keyed by the first three soundslike bytes, each
//!   pointing into the data block;
//! * the data block: sorted soundslike groups. With explicit soundslike
//!   data each group is `<pad><u16 sl len><u16 offset to next group>
//!   <soundslike NUL>(<word NUL>)+<NUL>`; without it each word is its own
//!   two-byte-headed entry `<u8 offset><u8 affix offset><word NUL>
//!   <flags NUL>`;
//! * the hash table: u32 word offsets (`u32::MAX` empty) probed
//!   linearly under the insensitive hash.
//!
//! The whole file is slurped into one owned buffer; lookups and scans
//! borrow from it.

use crate::charmap::CompareOptions;
use crate::dict::{
    insensitive_eq, insensitive_hash, next_dict_id, DictFlags, DictId, Dictionary,
    SoundslikeGroup, SoundslikeIter, SoundslikeKey, WordEntry,
};
use crate::error::{Error, Result};
use crate::lang::Language;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub const MAGIC: &[u8; 32] = b"aspell default speller rowl 1.6\0";
pub const MAGIC_LEN: usize = 64;
pub const ALIGN: usize = 16;
/// magic + 16 u32 header fields
pub const HEADER_FIXED: usize = MAGIC_LEN + 16 * 4;

/// Parsed fixed header. Field order is the file order.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataHead {
    pub head_size: u32,
    pub block_size: u32,
    pub jump1_offset: u32,
    pub jump2_offset: u32,
    pub word_offset: u32,
    pub hash_offset: u32,
    pub word_count: u32,
    pub word_buckets: u32,
    pub soundslike_count: u32,
    pub max_word_length: u32,
    pub lang_name_size: u32,
    pub soundslike_name_size: u32,
    pub soundslike_version_size: u32,
    pub minimal_specified: u32,
    pub middle_chars_size: u32,
    pub affix_info: u32,
}

impl DataHead {
    pub fn to_bytes(&self) -> [u8; 16 * 4] {
        let fields = [
            self.head_size,
            self.block_size,
            self.jump1_offset,
            self.jump2_offset,
            self.word_offset,
            self.hash_offset,
            self.word_count,
            self.word_buckets,
            self.soundslike_count,
            self.max_word_length,
            self.lang_name_size,
            self.soundslike_name_size,
            self.soundslike_version_size,
            self.minimal_specified,
            self.middle_chars_size,
            self.affix_info,
        ];
        let mut out = [0u8; 16 * 4];
        for (i, f) in fields.iter().enumerate() {
            out[i * 4..i * 4 + 4].copy_from_slice(&f.to_le_bytes());
        }
        out
    }

    pub fn from_bytes(b: &[u8]) -> DataHead {
        let f = |i: usize| u32::from_le_bytes(b[i * 4..i * 4 + 4].try_into().unwrap());
        DataHead {
            head_size: f(0),
            block_size: f(1),
            jump1_offset: f(2),
            jump2_offset: f(3),
            word_offset: f(4),
            hash_offset: f(5),
            word_count: f(6),
            word_buckets: f(7),
            soundslike_count: f(8),
            max_word_length: f(9),
            lang_name_size: f(10),
            soundslike_name_size: f(11),
            soundslike_version_size: f(12),
            minimal_specified: f(13),
            middle_chars_size: f(14),
            affix_info: f(15),
        }
    }
}

pub(crate) fn round_up(i: usize, align: usize) -> usize {
    (i + align - 1) / align * align
}

const JUMP_ENTRY_SIZE: usize = 8;

#[derive(Debug)]
pub struct ReadOnlyDict {
    id: DictId,
    lang: Arc<Language>,
    block: Vec<u8>,
    head: DataHead,
    use_soundslike: bool,
    affix_info: bool,
}

impl ReadOnlyDict {
    /// Load a compiled dictionary, resolving its language through the
    /// language cache rooted at `data_dir`.
    pub fn load(path: impl AsRef<Path>, data_dir: &Path) -> Result<ReadOnlyDict> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
        Self::from_bytes(bytes, path, |name| Language::load(name, data_dir))
    }

    /// Load from raw file bytes; `resolve` maps the stored language name
    /// to a language handle (tests pass a closure over fixtures).
    pub fn from_bytes(
        bytes: Vec<u8>,
        path: &Path,
        resolve: impl FnOnce(&str) -> Result<Arc<Language>>,
    ) -> Result<ReadOnlyDict> {
        if bytes.len() < HEADER_FIXED {
            return Err(Error::bad_format(path, 0, "a dictionary header", "a short file"));
        }
        if &bytes[..MAGIC.len()] != MAGIC.as_slice() {
            return Err(Error::bad_format(
                path,
                0,
                "the dictionary magic string",
                String::from_utf8_lossy(&bytes[..MAGIC.len().min(bytes.len())]).into_owned(),
            ));
        }
        let head = DataHead::from_bytes(&bytes[MAGIC_LEN..HEADER_FIXED]);

        let mut pos = HEADER_FIXED;
        let mut take_str = |size: u32| -> Result<String> {
            let size = size as usize;
            if pos + size > bytes.len() || size == 0 {
                return Err(Error::bad_format(path, 0, "header strings", "a short file"));
            }
            let s = &bytes[pos..pos + size - 1]; // drop the NUL
            pos += size;
            Ok(String::from_utf8_lossy(s).into_owned())
        };
        let lang_name = take_str(head.lang_name_size)?;
        let sl_name = take_str(head.soundslike_name_size)?;
        let sl_version = take_str(head.soundslike_version_size)?;
        let middle_chars = take_str(head.middle_chars_size)?;

        let lang = resolve(&lang_name)?;
        if lang.name() != lang_name {
            return Err(Error::LanguageMismatch {
                expected: lang_name,
                got: lang.name().to_string(),
            });
        }
        if sl_name != lang.soundslike_name() || sl_version != lang.soundslike_version() {
            return Err(Error::MismatchedSoundslike {
                expected: format!("{} {}", lang.soundslike_name(), lang.soundslike_version()),
                got: format!("{} {}", sl_name, sl_version),
            });
        }
        if middle_chars.as_bytes() != lang.mid_chars() {
            return Err(Error::bad_format(
                path,
                0,
                format!("middle chars \"{}\"", String::from_utf8_lossy(lang.mid_chars())),
                middle_chars,
            ));
        }

        let head_size = head.head_size as usize;
        let block_size = head.block_size as usize;
        if head_size + block_size > bytes.len() {
            return Err(Error::bad_format(path, 0, "the full data block", "a short file"));
        }
        let block = bytes[head_size..head_size + block_size].to_vec();

        debug!(
            file = %path.display(),
            words = head.word_count,
            soundslikes = head.soundslike_count,
            "loaded compiled dictionary"
        );

        Ok(ReadOnlyDict {
            id: next_dict_id(),
            lang,
            block,
            head,
            use_soundslike: sl_name != "none",
            affix_info: head.affix_info != 0,
        })
    }

    pub fn head(&self) -> &DataHead {
        &self.head
    }

    pub fn max_word_length(&self) -> usize {
        self.head.max_word_length as usize
    }

    fn word_block(&self) -> &[u8] {
        &self.block[self.head.word_offset as usize..self.head.hash_offset as usize]
    }

    fn hash_slots(&self) -> usize {
        self.head.word_buckets as usize
    }

    fn hash_at(&self, slot: usize) -> u32 {
        let base = self.head.hash_offset as usize + slot * 4;
        u32::from_le_bytes(self.block[base..base + 4].try_into().unwrap())
    }

    fn cstr_at(&self, offset: usize) -> &[u8] {
        let wb = self.word_block();
        let end = wb[offset..]
            .iter()
            .position(|&b| b == 0)
            .map(|p| p + offset)
            .unwrap_or(wb.len());
        &wb[offset..end]
    }

    /// The word at a hash-table offset, with its affix flags when the
    /// dictionary is affix-compressed.
    fn entry_at(&self, offset: u32) -> WordEntry {
        let offset = offset as usize;
        let word = self.cstr_at(offset);
        if self.affix_info {
            let aff_off = self.word_block()[offset - 1] as usize;
            let aff = self.cstr_at(offset + aff_off);
            WordEntry::with_aff(word.to_vec(), aff.to_vec())
        } else {
            WordEntry::new(word.to_vec())
        }
    }

    fn probe(&self, key: &[u8]) -> Vec<WordEntry> {
        let slots = self.hash_slots();
        if slots == 0 {
            return Vec::new();
        }
        let cm = self.lang.charmap();
        let mut out = Vec::new();
        let mut slot = insensitive_hash(cm, key) as usize % slots;
        for _ in 0..slots {
            let v = self.hash_at(slot);
            if v == u32::MAX {
                break;
            }
            let word = self.cstr_at(v as usize);
            if insensitive_eq(cm, word, key) {
                out.push(self.entry_at(v));
            }
            slot = (slot + 1) % slots;
        }
        out
    }

    fn jump_entry(&self, table_offset: u32, index: usize) -> (&[u8], u32) {
        let base = table_offset as usize + index * JUMP_ENTRY_SIZE;
        let sl = &self.block[base..base + 4];
        let sl_end = sl.iter().position(|&b| b == 0).unwrap_or(4);
        let loc = u32::from_le_bytes(self.block[base + 4..base + 8].try_into().unwrap());
        (&sl[..sl_end], loc)
    }

    fn jump1(&self, index: usize) -> (&[u8], u32) {
        self.jump_entry(self.head.jump1_offset, index)
    }

    fn jump2(&self, index: usize) -> (&[u8], u32) {
        self.jump_entry(self.head.jump2_offset, index)
    }

    fn jump2_len(&self) -> usize {
        (self.head.word_offset - self.head.jump2_offset) as usize / JUMP_ENTRY_SIZE
    }

    /// Offset-to-next field of the group whose payload starts at `pos`
    /// (u16 for soundslike groups, u8 otherwise). Zero ends the run.
    fn next_pos(&self, pos: usize) -> usize {
        let wb = self.word_block();
        if self.use_soundslike {
            u16::from_le_bytes(wb[pos - 2..pos].try_into().unwrap()) as usize
        } else {
            wb[pos - 2] as usize
        }
    }

    fn group_at(&self, pos: usize) -> SoundslikeGroup {
        let wb = self.word_block();
        if self.use_soundslike {
            let sl_len = u16::from_le_bytes(wb[pos - 4..pos - 2].try_into().unwrap()) as usize;
            let sl = wb[pos..pos + sl_len].to_vec();
            SoundslikeGroup {
                soundslike: sl,
                key: SoundslikeKey::Offset((pos + sl_len + 1) as u32),
            }
        } else {
            let entry = self.entry_at(pos as u32);
            SoundslikeGroup {
                soundslike: self.lang.to_soundslike(&entry.word),
                key: SoundslikeKey::Single(entry),
            }
        }
    }
}

impl Dictionary for ReadOnlyDict {
    fn id(&self) -> DictId {
        self.id
    }

    fn lang(&self) -> &Arc<Language> {
        &self.lang
    }

    fn size(&self) -> usize {
        self.head.word_count as usize
    }

    fn flags(&self) -> DictFlags {
        DictFlags {
            have_soundslike: self.use_soundslike,
            fast_lookup: true,
            fast_scan: self.use_soundslike,
            affix_compressed: self.affix_info,
        }
    }

    fn lookup(&self, word: &[u8], cmp: &CompareOptions) -> Option<WordEntry> {
        let cm = self.lang.charmap();
        self.probe(word)
            .into_iter()
            .find(|e| cmp.matches(cm, word, &e.word))
    }

    fn clean_lookup(&self, clean: &[u8]) -> Vec<WordEntry> {
        self.probe(clean)
    }

    fn soundslike_lookup(&self, key: &SoundslikeKey) -> Vec<WordEntry> {
        match key {
            SoundslikeKey::Offset(start) => {
                let wb = self.word_block();
                let mut out = Vec::new();
                let mut pos = *start as usize;
                while pos < wb.len() && wb[pos] != 0 {
                    let word = self.cstr_at(pos);
                    let len = word.len();
                    out.push(WordEntry::new(word.to_vec()));
                    pos += len + 1;
                }
                out
            }
            SoundslikeKey::Single(entry) => vec![entry.clone()],
            SoundslikeKey::Exact(_) | SoundslikeKey::Empty => Vec::new(),
        }
    }

    fn soundslike_iter(&self) -> Box<dyn SoundslikeIter + '_> {
        Box::new(ReadOnlyIter {
            dict: self,
            state: IterState::Start,
            j1: 0,
            j2: 0,
            pos: 0,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IterState {
    Start,
    /// just yielded jump1[j1]'s two-byte prefix
    Jump1,
    /// just yielded jump2[j2]'s three-byte prefix
    Jump2,
    /// just yielded the group whose payload starts at `pos`
    InBlock,
    Done,
}

/// Three-level cursor over the sorted soundslike data, driven by the
/// caller's `stopped_at` feedback: `< 2` skips the rest of the current
/// two-byte bucket, `< 3` the current three-byte bucket.
struct ReadOnlyIter<'a> {
    dict: &'a ReadOnlyDict,
    state: IterState,
    j1: usize,
    j2: usize,
    pos: usize,
}

impl<'a> ReadOnlyIter<'a> {
    fn yield_jump1(&mut self) -> Option<SoundslikeGroup> {
        let (sl, _) = self.dict.jump1(self.j1);
        if sl.is_empty() {
            self.state = IterState::Done;
            return None;
        }
        self.state = IterState::Jump1;
        Some(SoundslikeGroup {
            soundslike: sl.to_vec(),
            key: SoundslikeKey::Empty,
        })
    }

    fn yield_jump2(&mut self) -> Option<SoundslikeGroup> {
        let (sl, _) = self.dict.jump2(self.j2);
        if sl.is_empty() {
            // exhausted this bucket's run: move to the next jump1 entry
            self.j1 += 1;
            return self.yield_jump1();
        }
        self.state = IterState::Jump2;
        Some(SoundslikeGroup {
            soundslike: sl.to_vec(),
            key: SoundslikeKey::Empty,
        })
    }

    /// Does jump2[j2] still belong to jump1[j1]'s two-byte bucket?
    fn jump2_in_bucket(&self) -> bool {
        if self.j2 >= self.dict.jump2_len() {
            return false;
        }
        let (sl1, _) = self.dict.jump1(self.j1);
        let (sl2, _) = self.dict.jump2(self.j2);
        sl2.len() >= sl1.len() && &sl2[..sl1.len()] == sl1
    }

    fn advance_jump2(&mut self) -> Option<SoundslikeGroup> {
        self.j2 += 1;
        if self.jump2_in_bucket() {
            self.yield_jump2()
        } else {
            self.j1 += 1;
            self.yield_jump1()
        }
    }

    fn enter_block(&mut self) -> Option<SoundslikeGroup> {
        let (_, loc) = self.dict.jump2(self.j2);
        self.pos = loc as usize;
        self.state = IterState::InBlock;
        Some(self.dict.group_at(self.pos))
    }

    fn advance_block(&mut self) -> Option<SoundslikeGroup> {
        let next = self.dict.next_pos(self.pos);
        if next == 0 {
            self.advance_jump2()
        } else {
            self.pos += next;
            Some(self.dict.group_at(self.pos))
        }
    }
}

impl<'a> SoundslikeIter for ReadOnlyIter<'a> {
    fn next(&mut self, stopped_at: usize) -> Option<SoundslikeGroup> {
        match self.state {
            IterState::Done => None,
            IterState::Start => self.yield_jump1(),
            IterState::Jump1 => {
                if stopped_at < 2 {
                    self.j1 += 1;
                    self.yield_jump1()
                } else {
                    self.j2 = self.dict.jump1(self.j1).1 as usize;
                    self.yield_jump2()
                }
            }
            IterState::Jump2 => {
                if stopped_at < 3 {
                    self.advance_jump2()
                } else {
                    self.enter_block()
                }
            }
            IterState::InBlock => {
                if stopped_at < 2 {
                    self.j1 += 1;
                    self.yield_jump1()
                } else if stopped_at < 3 {
                    self.advance_jump2()
                } else {
                    self.advance_block()
                }
            }
        }
    }
}

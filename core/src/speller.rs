//! The speller: any number of dictionaries composed behind one
//! check/suggest surface.
//!
//! Attached dictionaries keep their insertion order but are reorganized
//! into work lists on every attach/detach: the checking list, its
//! affix-compressed subset, the suggesting list and its affix-compressed
//! subset, each with larger dictionaries first grouped by backend type.
//! Checking walks the lists directly; suggestions are generated by
//! [`crate::suggest`] and memoized per speller until a dictionary
//! mutates.

use crate::affix::{AffixRoot, CheckInfo, GuessInfo};
use crate::cache::DictCache;
use crate::charmap::CompareOptions;
use crate::dict::{DictId, Dictionary, WordEntry};
use crate::error::{Error, Result};
use crate::lang::Language;
use crate::multi::MultiDict;
use crate::readonly::ReadOnlyDict;
use crate::repl::ReplDict;
use crate::suggest::{self, SuggestParms};
use crate::typo_editdist::{cached_typo_weights, TypoWeights};
use crate::writable::WritableDict;
use crate::Config;
use lru::LruCache;
use std::cell::RefCell;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// What an attachment is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictRole {
    Main,
    Personal,
    Session,
    Repl,
    Extra,
}

/// Per-attachment switches.
#[derive(Debug, Clone, Copy)]
pub struct AttachFlags {
    pub use_to_check: bool,
    pub use_to_suggest: bool,
    pub save_on_save_all: bool,
}

impl AttachFlags {
    /// The conventional flags for a role: replacement dictionaries never
    /// check, session dictionaries never persist.
    pub fn for_role(role: DictRole) -> AttachFlags {
        match role {
            DictRole::Repl => AttachFlags {
                use_to_check: false,
                use_to_suggest: true,
                save_on_save_all: true,
            },
            DictRole::Session => AttachFlags {
                use_to_check: true,
                use_to_suggest: true,
                save_on_save_all: false,
            },
            DictRole::Main | DictRole::Extra => AttachFlags {
                use_to_check: true,
                use_to_suggest: true,
                save_on_save_all: false,
            },
            DictRole::Personal => AttachFlags {
                use_to_check: true,
                use_to_suggest: true,
                save_on_save_all: true,
            },
        }
    }
}

/// A dictionary being attached. `Multi` flattens into its members.
pub enum Dict {
    ReadOnly(Arc<ReadOnlyDict>),
    Writable(WritableDict),
    Repl(ReplDict),
    Multi(MultiDict),
}

pub(crate) enum DictEntry {
    ReadOnly(Arc<ReadOnlyDict>),
    Writable(WritableDict),
    Repl(ReplDict),
}

impl DictEntry {
    fn type_rank(&self) -> u8 {
        match self {
            DictEntry::ReadOnly(_) => 0,
            DictEntry::Writable(_) => 1,
            DictEntry::Repl(_) => 2,
        }
    }
}

pub(crate) struct SpellerDict {
    pub(crate) entry: DictEntry,
    pub(crate) role: DictRole,
    pub(crate) flags: AttachFlags,
    pub(crate) cmp: CompareOptions,
}

impl SpellerDict {
    pub(crate) fn dict(&self) -> &dyn Dictionary {
        match &self.entry {
            DictEntry::ReadOnly(d) => d.as_ref(),
            DictEntry::Writable(d) => d,
            DictEntry::Repl(d) => d,
        }
    }

    pub(crate) fn repl(&self) -> Option<&ReplDict> {
        match &self.entry {
            DictEntry::Repl(d) => Some(d),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Clone)]
struct WorkLists {
    check: Vec<usize>,
    affix: Vec<usize>,
    suggest: Vec<usize>,
    suggest_affix: Vec<usize>,
}

pub struct Speller {
    config: Config,
    lang: Arc<Language>,
    parms: SuggestParms,
    typo_weights: Option<Arc<TypoWeights>>,
    dicts: Vec<SpellerDict>,
    lists: WorkLists,
    guess_info: RefCell<GuessInfo>,
    suggest_cache: RefCell<LruCache<Vec<u8>, Vec<Vec<u8>>>>,
    prev_mis: Option<Vec<u8>>,
    prev_cor: Option<Vec<u8>>,
}

impl Speller {
    /// Assemble a speller from configuration: language, main dictionary,
    /// extra dictionaries and (unless disabled) personal, session and
    /// replacement dictionaries, resolved through the shared dictionary
    /// cache.
    pub fn new(config: Config) -> Result<Speller> {
        Speller::with_cache(config, crate::cache::global())
    }

    /// Like [`Speller::new`] with an explicit dictionary cache, for
    /// callers that need isolation.
    pub fn with_cache(mut config: Config, cache: &DictCache) -> Result<Speller> {
        let lang = Language::load(&config.lang, &config.dict_dir)?;
        for (k, v) in lang.config_defaults().to_vec() {
            config.apply_lang_default(&k, &v);
        }
        let dict_dir = config.dict_dir.clone();
        let master = config
            .master
            .clone()
            .unwrap_or_else(|| dict_dir.join(format!("{}.rws", config.lang)));
        let extra = config.extra_dicts.clone();
        let use_other = config.use_other_dicts;
        let personal_path = config
            .personal
            .clone()
            .unwrap_or_else(|| dict_dir.join(format!("{}.pws", config.lang)));
        let repl_path = config
            .repl
            .clone()
            .unwrap_or_else(|| dict_dir.join(format!("{}.prepl", config.lang)));

        let mut sp = Speller::with_language(lang.clone(), config)?;

        if master.extension().map(|e| e == "multi").unwrap_or(false) {
            let multi = MultiDict::load(&master, &dict_dir, cache)?;
            sp.attach(Dict::Multi(multi), DictRole::Main)?;
        } else {
            sp.attach(Dict::ReadOnly(cache.get(&master, &dict_dir)?), DictRole::Main)?;
        }
        for p in extra {
            sp.attach(Dict::ReadOnly(cache.get(&p, &dict_dir)?), DictRole::Extra)?;
        }
        if use_other {
            sp.attach(
                Dict::Writable(WritableDict::load(lang.clone(), &personal_path)?),
                DictRole::Personal,
            )?;
            sp.attach(Dict::Writable(WritableDict::new(lang.clone())), DictRole::Session)?;
            sp.attach(
                Dict::Repl(ReplDict::load(lang.clone(), &repl_path)?),
                DictRole::Repl,
            )?;
        }
        Ok(sp)
    }

    /// A speller over an already-built language with no dictionaries
    /// attached yet.
    pub fn with_language(lang: Arc<Language>, config: Config) -> Result<Speller> {
        let parms = SuggestParms::from_config(&config)?;
        // typo analysis needs a keyboard; "none" switches it off
        let typo_weights = if parms.use_typo_analysis && config.keyboard != "none" {
            let cm = lang.charmap();
            let kbd_path: PathBuf = config.dict_dir.join(format!("{}.kbd", config.keyboard));
            match std::fs::read_to_string(&kbd_path) {
                Ok(text) => Some(cached_typo_weights(
                    &text,
                    &kbd_path,
                    cm,
                    &config.keyboard,
                    lang.name(),
                )?),
                Err(e) => {
                    warn!(
                        file = %kbd_path.display(),
                        error = %e,
                        "keyboard file unavailable, using flat typo weights"
                    );
                    Some(Arc::new(TypoWeights::without_keyboard(cm)))
                }
            }
        } else {
            None
        };
        let cache_size =
            NonZeroUsize::new(config.suggest_cache_size).unwrap_or(NonZeroUsize::new(100).unwrap());
        Ok(Speller {
            config,
            lang,
            parms,
            typo_weights,
            dicts: Vec::new(),
            lists: WorkLists::default(),
            guess_info: RefCell::new(GuessInfo::new(8)),
            suggest_cache: RefCell::new(LruCache::new(cache_size)),
            prev_mis: None,
            prev_cor: None,
        })
    }

    pub fn lang(&self) -> &Arc<Language> {
        &self.lang
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn typo_weights(&self) -> Option<&Arc<TypoWeights>> {
        self.typo_weights.as_ref()
    }

    // ---- attachment management ----

    /// Attach a dictionary under a role with the role's conventional
    /// flags. Returns the ids of the attachments made (several for a
    /// dictionary set).
    pub fn attach(&mut self, dict: Dict, role: DictRole) -> Result<Vec<DictId>> {
        self.attach_with_flags(dict, role, AttachFlags::for_role(role))
    }

    pub fn attach_with_flags(
        &mut self,
        dict: Dict,
        role: DictRole,
        flags: AttachFlags,
    ) -> Result<Vec<DictId>> {
        let entries: Vec<DictEntry> = match dict {
            Dict::ReadOnly(d) => vec![DictEntry::ReadOnly(d)],
            Dict::Writable(d) => vec![DictEntry::Writable(d)],
            Dict::Repl(d) => vec![DictEntry::Repl(d)],
            Dict::Multi(m) => m.into_members().into_iter().map(DictEntry::ReadOnly).collect(),
        };
        let cmp = CompareOptions {
            case_insensitive: self.config.ignore_case,
            ignore_accents: self.config.ignore_accents,
            strip_accents: self.config.strip_accents,
        };
        let mut ids = Vec::new();
        for entry in entries {
            let sd = SpellerDict {
                entry,
                role,
                flags,
                cmp,
            };
            let dict_lang = sd.dict().lang().name().to_string();
            if dict_lang != self.lang.name() {
                return Err(Error::LanguageMismatch {
                    expected: self.lang.name().to_string(),
                    got: dict_lang,
                });
            }
            ids.push(sd.dict().id());
            self.dicts.push(sd);
        }
        self.touch();
        debug!(role = ?role, count = ids.len(), "attached dictionaries");
        Ok(ids)
    }

    /// Detach by id; true if something was removed.
    pub fn detach(&mut self, id: DictId) -> bool {
        let before = self.dicts.len();
        self.dicts.retain(|d| d.dict().id() != id);
        let removed = self.dicts.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    /// Rebuild the work lists and drop memoized suggestions; every
    /// mutation funnels through here.
    fn touch(&mut self) {
        let mut order: Vec<usize> = (0..self.dicts.len()).collect();
        order.sort_by_key(|&i| {
            let d = &self.dicts[i];
            (d.entry.type_rank(), std::cmp::Reverse(d.dict().size()))
        });
        let mut lists = WorkLists::default();
        for &i in &order {
            let d = &self.dicts[i];
            let f = d.dict().flags();
            if d.flags.use_to_check {
                lists.check.push(i);
                if f.affix_compressed {
                    lists.affix.push(i);
                }
            }
            if d.flags.use_to_suggest {
                lists.suggest.push(i);
                if f.affix_compressed {
                    lists.suggest_affix.push(i);
                }
            }
        }
        self.lists = lists;
        self.suggest_cache.borrow_mut().clear();
    }

    fn find_role(&self, role: DictRole) -> Option<usize> {
        self.dicts.iter().position(|d| d.role == role)
    }

    // ---- checking ----

    pub fn check(&self, word: &str) -> bool {
        self.check_bytes(word.as_bytes())
    }

    pub fn check_bytes(&self, word: &[u8]) -> bool {
        word.len() <= self.config.ignore || self.check_info(word).is_some()
    }

    /// Full check, reporting how the word was validated. Fills the guess
    /// store with affix best-guesses when nothing validates.
    pub fn check_info(&self, word: &[u8]) -> Option<CheckInfo> {
        self.guess_info.borrow_mut().clear();
        if word.is_empty() {
            return None;
        }
        let limit = if self.config.run_together {
            self.config.run_together_limit.clamp(1, 8)
        } else {
            1
        };
        self.check_runtogether(word, limit, true)
    }

    fn check_runtogether(
        &self,
        word: &[u8],
        limit: usize,
        fill_guess: bool,
    ) -> Option<CheckInfo> {
        if let Some(ci) = self.check_affix(word, fill_guess) {
            return Some(ci);
        }
        if limit <= 1 {
            return None;
        }
        let min = self.config.run_together_min.max(1);
        if word.len() < 2 * min {
            return None;
        }
        for i in min..=word.len() - min {
            if let Some(mut left) = self.check_affix(&word[..i], false) {
                if let Some(right) = self.check_runtogether(&word[i..], limit - 1, false) {
                    left.compound_next = Some(Box::new(right));
                    return Some(left);
                }
            }
        }
        None
    }

    fn check_affix(&self, word: &[u8], fill_guess: bool) -> Option<CheckInfo> {
        if let Some(entry) = self.check_simple(word) {
            return Some(CheckInfo::simple(&entry.word));
        }
        if let Some(affix) = self.lang.affix() {
            if !self.lists.affix.is_empty() {
                let lookup = |root: &[u8]| self.affix_lookup(root);
                if let Some(ci) = affix.affix_check(&lookup, word) {
                    return Some(ci);
                }
            }
            if fill_guess {
                affix.affix_guess(word, &mut self.guess_info.borrow_mut());
            }
        }
        None
    }

    fn check_simple(&self, word: &[u8]) -> Option<WordEntry> {
        for &i in &self.lists.check {
            let d = &self.dicts[i];
            if let Some(entry) = d.dict().lookup(word, &d.cmp) {
                return Some(entry);
            }
        }
        None
    }

    /// Root lookup for the affix checker: clean-form search across the
    /// affix-compressed dictionaries.
    fn affix_lookup(&self, root: &[u8]) -> Option<AffixRoot> {
        let clean = self.lang.charmap().clean_word(root);
        for &i in &self.lists.affix {
            let entries = self.dicts[i].dict().clean_lookup(&clean);
            if let Some(e) = entries.into_iter().max_by_key(|e| e.aff.len()) {
                return Some(AffixRoot {
                    word: e.word,
                    flags: e.aff,
                });
            }
        }
        None
    }

    // ---- suggesting ----

    pub fn suggest(&self, word: &str) -> Vec<String> {
        self.suggest_bytes(word.as_bytes())
            .into_iter()
            .map(|w| String::from_utf8_lossy(&w).into_owned())
            .collect()
    }

    pub fn suggest_bytes(&self, word: &[u8]) -> Vec<Vec<u8>> {
        if let Some(hit) = self.suggest_cache.borrow_mut().get(word) {
            return hit.clone();
        }
        // populate the guess store for the scan's root targets
        let _ = self.check_info(word);
        let mut parms = self.parms.clone();
        parms.set_original_word_size(word.len());
        let result = suggest::suggest(self, &parms, word);
        self.suggest_cache
            .borrow_mut()
            .put(word.to_vec(), result.clone());
        result
    }

    // speller internals the suggestion pipeline reads

    pub(crate) fn suggest_dicts(&self) -> impl Iterator<Item = &SpellerDict> {
        self.lists.suggest.iter().map(move |&i| &self.dicts[i])
    }

    pub(crate) fn has_suggest_affix(&self) -> bool {
        !self.lists.suggest_affix.is_empty()
    }

    /// Clean-form lookup across the suggesting dictionaries.
    pub(crate) fn clean_suggest_lookup(&self, clean: &[u8]) -> Vec<WordEntry> {
        let mut out = Vec::new();
        for &i in &self.lists.suggest {
            out.extend(self.dicts[i].dict().clean_lookup(clean));
        }
        out
    }

    /// Does `word` validate as an affixed form over the suggesting
    /// affix-compressed dictionaries?
    pub(crate) fn affix_suggest_check(&self, word: &[u8]) -> bool {
        let Some(affix) = self.lang.affix() else {
            return false;
        };
        if self.lists.suggest_affix.is_empty() {
            return false;
        }
        let lookup = |root: &[u8]| {
            let clean = self.lang.charmap().clean_word(root);
            for &i in &self.lists.suggest_affix {
                let entries = self.dicts[i].dict().clean_lookup(&clean);
                if let Some(e) = entries.into_iter().max_by_key(|e| e.aff.len()) {
                    return Some(AffixRoot {
                        word: e.word,
                        flags: e.aff,
                    });
                }
            }
            None
        };
        affix.affix_check(&lookup, word).is_some()
    }

    /// Check without disturbing the guess store (used while validating
    /// split and replacement candidates).
    pub(crate) fn check_quietly(&self, word: &[u8]) -> bool {
        if word.len() <= self.config.ignore {
            return true;
        }
        let limit = if self.config.run_together {
            self.config.run_together_limit.clamp(1, 8)
        } else {
            1
        };
        self.check_runtogether(word, limit, false).is_some()
    }

    pub(crate) fn guesses(&self) -> Vec<CheckInfo> {
        self.guess_info.borrow().entries().to_vec()
    }

    // ---- word list management ----

    pub fn add_to_personal(&mut self, word: &[u8]) -> Result<()> {
        if let Some(i) = self.find_role(DictRole::Personal) {
            if let DictEntry::Writable(d) = &mut self.dicts[i].entry {
                d.add(word)?;
            }
            self.touch();
        }
        Ok(())
    }

    pub fn add_to_session(&mut self, word: &[u8]) -> Result<()> {
        if let Some(i) = self.find_role(DictRole::Session) {
            if let DictEntry::Writable(d) = &mut self.dicts[i].entry {
                d.add(word)?;
            }
            self.touch();
        }
        Ok(())
    }

    pub fn clear_session(&mut self) {
        if let Some(i) = self.find_role(DictRole::Session) {
            if let DictEntry::Writable(d) = &mut self.dicts[i].entry {
                d.clear();
            }
            self.touch();
        }
    }

    /// Remember that `mis` should be corrected to `cor`. A correction
    /// that does not currently check is buffered and given a second
    /// chance when the next call confirms it.
    pub fn store_replacement(&mut self, mis: &[u8], cor: &[u8]) -> Result<()> {
        self.store_replacement_inner(mis, cor, true)
    }

    fn store_replacement_inner(&mut self, mis: &[u8], cor: &[u8], memory: bool) -> Result<()> {
        if self.config.ignore_repl || self.find_role(DictRole::Repl).is_none() {
            return Ok(());
        }
        let first_suggestion = self.suggest_bytes(mis).into_iter().next();

        let correct = match cor.iter().position(|&b| b == b' ') {
            None => self.check_quietly(cor),
            Some(p) => self.check_quietly(&cor[..p]) && self.check_quietly(&cor[p + 1..]),
        };

        if correct {
            if first_suggestion.as_deref() != Some(cor) {
                if let Some(i) = self.find_role(DictRole::Repl) {
                    if let DictEntry::Repl(d) = &mut self.dicts[i].entry {
                        d.add_repl(mis, cor)?;
                    }
                    self.touch();
                }
            }
            if memory && self.prev_cor.as_deref() == Some(mis) {
                if let Some(prev_mis) = self.prev_mis.clone() {
                    self.store_replacement_inner(&prev_mis, cor, false)?;
                }
            }
        } else if memory {
            if self.prev_cor.as_deref() != Some(mis) {
                self.prev_mis = Some(mis.to_vec());
            }
            self.prev_cor = Some(cor.to_vec());
        }
        Ok(())
    }

    /// Persist every attachment flagged for saving.
    pub fn save_all(&mut self) -> Result<()> {
        for d in &mut self.dicts {
            if !d.flags.save_on_save_all {
                continue;
            }
            match &mut d.entry {
                DictEntry::Writable(w) => w.save(true)?,
                DictEntry::Repl(r) => r.save(true)?,
                DictEntry::ReadOnly(_) => {}
            }
        }
        Ok(())
    }

    pub fn personal_word_list(&self) -> Vec<Vec<u8>> {
        self.writable_word_list(DictRole::Personal)
    }

    pub fn session_word_list(&self) -> Vec<Vec<u8>> {
        self.writable_word_list(DictRole::Session)
    }

    fn writable_word_list(&self, role: DictRole) -> Vec<Vec<u8>> {
        match self.find_role(role).map(|i| &self.dicts[i].entry) {
            Some(DictEntry::Writable(d)) => d.word_list(),
            _ => Vec::new(),
        }
    }

    /// Every word of the main dictionary, in soundslike order.
    pub fn main_word_list(&self) -> Vec<Vec<u8>> {
        let Some(i) = self.find_role(DictRole::Main) else {
            return Vec::new();
        };
        let dict = self.dicts[i].dict();
        let mut out = Vec::new();
        let mut iter = dict.soundslike_iter();
        while let Some(group) = iter.next(usize::MAX) {
            for e in dict.soundslike_lookup(&group.key) {
                out.push(e.word);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::test_util::test_lang;
    use crate::Config;

    fn speller_with_personal(words: &[&str]) -> Speller {
        let lang = test_lang();
        let config = Config {
            lang: "test".to_string(),
            ..Config::default()
        };
        let mut sp = Speller::with_language(lang.clone(), config).unwrap();
        let mut personal = WritableDict::new(lang.clone());
        for w in words {
            personal.add(w.as_bytes()).unwrap();
        }
        sp.attach(Dict::Writable(personal), DictRole::Personal).unwrap();
        sp.attach(Dict::Writable(WritableDict::new(lang.clone())), DictRole::Session)
            .unwrap();
        sp.attach(Dict::Repl(ReplDict::new(lang)), DictRole::Repl).unwrap();
        sp
    }

    #[test]
    fn repl_dicts_never_check() {
        let mut sp = speller_with_personal(&["the"]);
        sp.store_replacement(b"teh", b"the").unwrap();
        assert!(!sp.check("teh"));
    }

    #[test]
    fn session_and_personal_both_check() {
        let mut sp = speller_with_personal(&["keeper"]);
        sp.add_to_session(b"passing").unwrap();
        assert!(sp.check("keeper"));
        assert!(sp.check("passing"));
        assert_eq!(sp.session_word_list(), vec![b"passing".to_vec()]);
    }

    #[test]
    fn check_rejects_unknown_words_without_dicts() {
        let lang = test_lang();
        let config = Config {
            lang: "test".to_string(),
            ..Config::default()
        };
        let sp = Speller::with_language(lang, config).unwrap();
        assert!(!sp.check("anything"));
        // but the ignore length still accepts stubs
        assert!(sp.check("a"));
    }

    #[test]
    fn run_together_chains_are_reported() {
        let lang = test_lang();
        let config = Config {
            lang: "test".to_string(),
            run_together: true,
            ..Config::default()
        };
        let mut sp = Speller::with_language(lang.clone(), config).unwrap();
        let mut personal = WritableDict::new(lang);
        personal.add(b"foo").unwrap();
        personal.add(b"barbaz").unwrap();
        sp.attach(Dict::Writable(personal), DictRole::Personal).unwrap();

        let ci = sp.check_info(b"foobarbaz").expect("compound accepted");
        assert_eq!(ci.word, b"foo");
        let next = ci.compound_next.expect("second member");
        assert_eq!(next.word, b"barbaz");
        assert!(next.compound_next.is_none());
    }

    #[test]
    fn mutations_invalidate_memoized_suggestions() {
        let mut sp = speller_with_personal(&["hello"]);
        let before = sp.suggest("helzo");
        assert!(before.iter().any(|s| s == "hello"));
        // an even closer personal word must show up on the next call
        sp.add_to_personal(b"helzoo").unwrap();
        let after = sp.suggest("helzo");
        assert!(after.iter().any(|s| s == "helzoo"), "got {:?}", after);
    }

    #[test]
    fn attach_flags_follow_roles() {
        let f = AttachFlags::for_role(DictRole::Repl);
        assert!(!f.use_to_check);
        assert!(f.use_to_suggest);
        assert!(f.save_on_save_all);
        let f = AttachFlags::for_role(DictRole::Session);
        assert!(f.use_to_check);
        assert!(!f.save_on_save_all);
    }
}

//! File-level behavior: language data on disk, compiled dictionaries
//! through the cache, personal dictionaries surviving restarts, and
//! dictionary sets.

mod common;

use common::{compiled_main, default_config, temp_dir, test_lang, write_lang_files, WORDS};
use libspell_core::{compile, Config, Dict, DictCache, DictRole, Speller, WritableDict};

fn write_main_dict(dir: &std::path::Path) {
    let lang = test_lang();
    compile::create(
        WORDS.iter().map(|w| w.to_string()),
        &lang,
        &dir.join("test.rws"),
    )
    .expect("write main dict");
}

#[test]
fn speller_assembles_from_files() {
    let dir = temp_dir("assemble");
    write_lang_files(&dir);
    write_main_dict(&dir);

    let config = Config {
        lang: "test".to_string(),
        dict_dir: dir.clone(),
        ..Config::default()
    };
    let cache = DictCache::new();
    let mut sp = Speller::with_cache(config, &cache).expect("speller from files");
    assert!(sp.check("hello"));
    assert!(!sp.check("helllo"));

    // personal words persist through save_all
    sp.add_to_personal(b"foobarbaz").unwrap();
    assert!(sp.check("foobarbaz"));
    sp.save_all().unwrap();

    let config = Config {
        lang: "test".to_string(),
        dict_dir: dir.clone(),
        ..Config::default()
    };
    let sp2 = Speller::with_cache(config, &cache).expect("fresh speller");
    assert!(sp2.check("foobarbaz"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn replacements_persist_across_spellers() {
    let dir = temp_dir("repl_persist");
    write_lang_files(&dir);
    write_main_dict(&dir);
    let cache = DictCache::new();

    let config = Config {
        lang: "test".to_string(),
        dict_dir: dir.clone(),
        ..Config::default()
    };
    let mut sp = Speller::with_cache(config.clone(), &cache).unwrap();
    sp.store_replacement(b"teh", b"the").unwrap();
    sp.save_all().unwrap();
    assert!(dir.join("test.prepl").exists());

    let sp2 = Speller::with_cache(config, &cache).unwrap();
    let sug = sp2.suggest("teh");
    assert_eq!(sug.first().map(String::as_str), Some("the"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn cache_shares_one_dictionary_between_spellers() {
    let dir = temp_dir("cache_share");
    write_lang_files(&dir);
    write_main_dict(&dir);

    let cache = DictCache::new();
    let d1 = cache.get(&dir.join("test.rws"), &dir).unwrap();
    let d2 = cache.get(&dir.join("test.rws"), &dir).unwrap();
    assert!(std::sync::Arc::ptr_eq(&d1, &d2));
    assert_eq!(cache.live(), 1);

    drop(d1);
    drop(d2);
    assert_eq!(cache.live(), 0);

    // a fresh load after everyone dropped still works
    let d3 = cache.get(&dir.join("test.rws"), &dir).unwrap();
    assert!(libspell_core::Dictionary::size(&*d3) > 0);
    assert_eq!(cache.live(), 1);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn multi_set_flattens_into_members() {
    let dir = temp_dir("multi");
    write_lang_files(&dir);
    let lang = test_lang();
    compile::create(
        ["hello".to_string(), "world".to_string()].into_iter(),
        &lang,
        &dir.join("test-a.rws"),
    )
    .unwrap();
    compile::create(
        ["cheese".to_string(), "crackers".to_string()].into_iter(),
        &lang,
        &dir.join("test-b.rws"),
    )
    .unwrap();
    std::fs::write(dir.join("test.multi"), "add test-a.rws\nadd test-b.rws\n").unwrap();

    let config = Config {
        lang: "test".to_string(),
        dict_dir: dir.clone(),
        master: Some(dir.join("test.multi")),
        ..Config::default()
    };
    let cache = DictCache::new();
    let sp = Speller::with_cache(config, &cache).unwrap();
    assert!(sp.check("hello"));
    assert!(sp.check("cheese"));
    assert!(!sp.check("zzyzx"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn detach_removes_a_dictionary() {
    let lang = test_lang();
    let mut sp = Speller::with_language(lang.clone(), default_config()).unwrap();
    let ids = sp
        .attach(
            Dict::ReadOnly(std::sync::Arc::new(compiled_main(&lang))),
            DictRole::Main,
        )
        .unwrap();
    assert!(sp.check("hello"));
    assert!(sp.detach(ids[0]));
    assert!(!sp.check("hello"));
    assert!(!sp.detach(ids[0]));
}

#[test]
fn language_mismatch_is_rejected_on_attach() {
    let lang = test_lang();
    let mut sp = Speller::with_language(lang, default_config()).unwrap();
    let other = {
        let sources = libspell_core::LanguageSources {
            descriptor: "name other\ncharset ascii\n".to_string(),
            cset: common::ascii_cset(),
            ..Default::default()
        };
        std::sync::Arc::new(
            libspell_core::Language::from_sources(&sources, std::path::Path::new("other.dat"))
                .unwrap(),
        )
    };
    let res = sp.attach(
        Dict::Writable(WritableDict::new(other)),
        DictRole::Personal,
    );
    assert!(matches!(
        res,
        Err(libspell_core::Error::LanguageMismatch { .. })
    ));
}

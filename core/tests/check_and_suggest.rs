//! End-to-end check and suggest behavior over a compiled main
//! dictionary plus personal, session and replacement dictionaries.

mod common;

use common::{build_speller, default_config};

#[test]
fn known_word_checks() {
    let sp = build_speller(default_config());
    assert!(sp.check("hello"));
    assert!(sp.check("world"));
    assert!(!sp.check("helllo"));
    assert!(!sp.check("zzyzx"));
}

#[test]
fn case_variants_of_lowercase_words_check() {
    let sp = build_speller(default_config());
    assert!(sp.check("Hello"));
    assert!(sp.check("HELLO"));
}

#[test]
fn short_words_are_ignored() {
    let sp = build_speller(default_config());
    // default ignore accepts single-byte words
    assert!(sp.check("q"));
}

#[test]
fn misspelling_suggests_the_word() {
    let sp = build_speller(default_config());
    let sug = sp.suggest("helllo");
    let top3: Vec<&String> = sug.iter().take(3).collect();
    assert!(
        top3.iter().any(|s| s.as_str() == "hello"),
        "expected hello in the first three of {:?}",
        sug
    );
}

#[test]
fn suggestions_are_deterministic() {
    let sp = build_speller(default_config());
    let a = sp.suggest("helllo");
    let b = sp.suggest("helllo");
    assert_eq!(a, b);
    // and stable across spellers with identical configuration
    let sp2 = build_speller(default_config());
    assert_eq!(a, sp2.suggest("helllo"));
}

#[test]
fn suggestions_preserve_case_shape() {
    let sp = build_speller(default_config());
    let upper = sp.suggest("HELLLO");
    assert!(!upper.is_empty());
    assert!(
        upper.iter().all(|s| s.chars().all(|c| !c.is_lowercase())),
        "all-upper input must give all-upper suggestions: {:?}",
        upper
    );
    let title = sp.suggest("Helllo");
    assert!(title
        .iter()
        .all(|s| s.chars().next().map(|c| !c.is_lowercase()).unwrap_or(true)));
}

#[test]
fn suggestion_count_respects_the_limit() {
    let sp = build_speller(default_config());
    let sug = sp.suggest("helllo");
    assert!(sug.len() <= 100 + 3);
}

#[test]
fn run_together_words_check_when_enabled() {
    let mut config = default_config();
    config.run_together = true;
    config.run_together_min = 3;
    let sp = build_speller(config);
    assert!(sp.check("helloworld"));
    assert!(sp.check("theold"));
    assert!(!sp.check("hellozz"));

    let off = build_speller(default_config());
    assert!(!off.check("helloworld"));
}

#[test]
fn run_together_respects_member_minimum() {
    let mut config = default_config();
    config.run_together = true;
    config.run_together_min = 6;
    let sp = build_speller(config);
    // both halves are shorter than the minimum
    assert!(!sp.check("helloworld"));
}

#[test]
fn personal_words_check_after_adding() {
    let mut sp = build_speller(default_config());
    assert!(!sp.check("foobarbaz"));
    sp.add_to_personal(b"foobarbaz").unwrap();
    assert!(sp.check("foobarbaz"));
    assert!(sp
        .personal_word_list()
        .contains(&b"foobarbaz".to_vec()));
}

#[test]
fn session_words_check_until_cleared() {
    let mut sp = build_speller(default_config());
    sp.add_to_session(b"ephemeral").unwrap();
    assert!(sp.check("ephemeral"));
    sp.clear_session();
    assert!(!sp.check("ephemeral"));
}

#[test]
fn stored_replacement_is_first_suggestion() {
    let mut sp = build_speller(default_config());
    sp.store_replacement(b"teh", b"the").unwrap();
    let sug = sp.suggest("teh");
    assert_eq!(sug.first().map(String::as_str), Some("the"), "got {:?}", sug);
}

#[test]
fn replacement_with_incorrect_correction_gets_second_chance() {
    let mut sp = build_speller(default_config());
    // "tjx" does not check, so nothing is stored yet
    sp.store_replacement(b"teh", b"tjx").unwrap();
    let sug = sp.suggest("teh");
    assert_ne!(sug.first().map(String::as_str), Some("tjx"));
}

#[test]
fn affixed_forms_check_against_compressed_roots() {
    let sp = build_speller(default_config());
    // happy/A, lock/AD, day/S and fly/S are stored expanded by the
    // compiler, so the surface forms must check
    for w in ["unhappy", "happy", "unlocked", "locked", "days", "flies"] {
        assert!(sp.check(w), "{} should check", w);
    }
    assert!(!sp.check("unflies"));
}

#[test]
fn suggestions_never_fail_on_garbage() {
    let sp = build_speller(default_config());
    assert!(sp.suggest("").is_empty());
    let _ = sp.suggest("qqqqqqqqqqqqqqqq");
    let _ = sp.suggest("a");
}

#[test]
fn bad_spellers_mode_casts_a_wider_net() {
    let mut config = default_config();
    config.sug_mode = "bad-spellers".to_string();
    let wide = build_speller(config);
    let mut config = default_config();
    config.sug_mode = "ultra".to_string();
    let narrow = build_speller(config);
    let w = wide.suggest("hilp");
    let n = narrow.suggest("hilp");
    assert!(w.len() >= n.len());
    assert!(w.iter().any(|s| s == "help"));
}

#[test]
fn split_words_are_offered() {
    let mut config = default_config();
    config.sug_mode = "normal".to_string();
    let sp = build_speller(config);
    // "theold" splits into two dictionary words
    let sug = sp.suggest("theold");
    assert!(
        sug.iter().any(|s| s == "the old" || s == "the-old"),
        "expected a split suggestion in {:?}",
        sug
    );
}

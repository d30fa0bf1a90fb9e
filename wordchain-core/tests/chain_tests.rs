//! End-to-end tests for building, generating, saving and restoring chains.
//!
//! These tests verify:
//! - The fox sentence produces the expected keys, order and dump
//! - Key count matches the distinct windows of the sanitized stream
//! - Save → restore reproduces keys, suffix multisets and starters
//! - Appending to a restored collection keeps weights exact
//! - Sampling frequency follows suffix duplication
//! - Concurrent readers never observe a torn insert

use std::collections::{BTreeMap, HashSet};
use std::io::Cursor;
use std::sync::Arc;
use std::thread;

use rand::SeedableRng;
use rand::rngs::StdRng;
use wordchain_core::model::persist::DEFAULT_WORKERS;
use wordchain_core::model::sanitize::sanitize;
use wordchain_core::store::{Collection, FileStore, MemoryStore, Store};
use wordchain_core::{Chain, ChainError, Prefix};

const FOX: &str = "The quick fox jumps over the lazy dog";

const TEXT: &str = "It was the best of times, it was the worst of times, it was the age of wisdom, \
	it was the age of foolishness, it was the epoch of belief, it was the epoch of incredulity.\n\
	It was the season of Light, it was the season of Darkness, it was the spring of hope, \
	it was the winter of despair.";

fn build(prefix_len: usize, text: &str) -> Chain {
	let chain = Chain::new(prefix_len, false, None);
	chain.build(Cursor::new(text)).unwrap();
	chain
}

/// Sorted suffix multiset per key.
fn multisets(chain: &Chain) -> BTreeMap<String, Vec<String>> {
	chain
		.prefixes()
		.into_iter()
		.map(|key| {
			let mut choices = chain.prefix(&key);
			choices.sort();
			(key, choices)
		})
		.collect()
}

#[test]
fn fox_has_eight_keys() {
	let chain = build(2, FOX);
	assert_eq!(chain.len(), 8);
	assert_eq!(chain.prefix(" "), vec!["the"]);
	assert_eq!(chain.prefix("the quick"), vec!["fox"]);
	assert_eq!(chain.prefix("quick fox"), vec!["jumps"]);
	assert_eq!(chain.prefix("the lazy"), vec!["dog"]);
	assert_eq!(chain.starters(), vec![" the"]);
}

#[test]
fn fox_prefixes_are_sorted() {
	let chain = build(2, FOX);
	let expected = [" ", " the", "fox jumps", "jumps over", "over the", "quick fox", "the lazy", "the quick"];
	assert_eq!(chain.prefixes(), expected);
	assert_eq!(chain.prefixes(), chain.prefixes());
}

#[test]
fn fox_dump() {
	let desired = "[ ]: the
[ the]: quick
[fox jumps]: over
[jumps over]: the
[over the]: lazy
[quick fox]: jumps
[the lazy]: dog
[the quick]: fox";
	assert_eq!(build(2, FOX).to_string(), desired);
}

#[test]
fn fox_prefix_three() {
	let chain = build(3, FOX);
	assert_eq!(chain.prefix("the quick fox"), vec!["jumps"]);
}

#[test]
fn key_count_matches_distinct_windows() {
	for prefix_len in 2..=5 {
		let chain = build(prefix_len, TEXT);

		let mut window = Prefix::new(prefix_len);
		let mut windows = HashSet::new();
		for token in TEXT.split_whitespace() {
			windows.insert(window.key());
			window.shift(&sanitize(token, false));
		}
		assert_eq!(chain.len(), windows.len(), "prefix length {prefix_len}");
	}
}

#[test]
fn every_key_has_prefix_len_slots() {
	for prefix_len in 2..=4 {
		let chain = build(prefix_len, TEXT);
		for key in chain.keys() {
			assert_eq!(key.split(' ').count(), prefix_len, "{key:?}");
		}
	}
}

#[test]
fn memory_round_trip() {
	let chain = Chain::new(2, false, Some("tale"));
	chain.build(Cursor::new(TEXT)).unwrap();

	let store = MemoryStore::new();
	let report = chain.save(&store, DEFAULT_WORKERS).unwrap();
	assert_eq!(report.saved, chain.len());

	let restored = Chain::new(2, false, Some("tale"));
	let coll = store.connect("tale").unwrap();
	assert_eq!(coll.count().unwrap(), chain.len());
	assert_eq!(restored.restore(coll.as_ref()).unwrap(), chain.len());

	assert_eq!(multisets(&restored), multisets(&chain));
	assert_eq!(restored.starters(), chain.starters());
}

#[test]
fn file_round_trip() {
	let dir = tempfile::tempdir().unwrap();
	let chain = Chain::new(3, false, Some("Tale of Two"));
	chain.build(Cursor::new(TEXT)).unwrap();

	{
		let store = FileStore::open(dir.path()).unwrap();
		chain.save(&store, DEFAULT_WORKERS).unwrap();
	}

	let store = FileStore::open(dir.path()).unwrap();
	assert_eq!(store.list_collections().unwrap(), vec!["taleoftwo"]);

	let restored = Chain::new(3, false, Some("taleoftwo"));
	restored.restore(store.connect("taleoftwo").unwrap().as_ref()).unwrap();
	assert_eq!(multisets(&restored), multisets(&chain));
	assert_eq!(restored.starters(), chain.starters());
	assert_eq!(restored.to_string(), chain.to_string());
}

#[test]
fn append_sessions_keep_weights() {
	let dir = tempfile::tempdir().unwrap();

	let first = Chain::new(2, false, Some("dict"));
	first.build(Cursor::new("a b c")).unwrap();
	first.save(&FileStore::open(dir.path()).unwrap(), DEFAULT_WORKERS).unwrap();

	let store = FileStore::open(dir.path()).unwrap();
	let second = Chain::open(store.connect_existing("dict").unwrap().as_ref(), false).unwrap();
	second.build(Cursor::new("a b d")).unwrap();
	second.save(&store, DEFAULT_WORKERS).unwrap();
	assert_eq!(second.prefix("a b"), vec!["c", "d"]);

	let store = FileStore::open(dir.path()).unwrap();
	let third = Chain::open(store.connect_existing("dict").unwrap().as_ref(), false).unwrap();
	assert_eq!(multisets(&third), multisets(&second));
	assert_eq!(third.starters(), second.starters());
}

#[test]
fn restore_keeps_the_stored_prefix_length() {
	let store = MemoryStore::new();
	let chain = Chain::new(3, false, Some("fox"));
	chain.build(Cursor::new(FOX)).unwrap();
	chain.save(&store, DEFAULT_WORKERS).unwrap();

	let coll = store.connect("fox").unwrap();
	let err = Chain::new(2, false, None).restore(coll.as_ref()).unwrap_err();
	assert!(matches!(err, ChainError::PrefixMismatch { .. }));

	let opened = Chain::open(coll.as_ref(), false).unwrap();
	for key in opened.keys() {
		assert_eq!(Prefix::slots(&key), 3, "{key:?}");
	}
	let text = opened.generate_text(20, &mut StdRng::seed_from_u64(1)).unwrap();
	assert!(text.ends_with("the lazy dog "), "{text:?}");
	assert!("quick fox jumps over the lazy dog ".ends_with(&text), "{text:?}");
}

#[test]
fn generation_never_exceeds_request() {
	let chain = build(2, TEXT);
	let mut rng = StdRng::seed_from_u64(2024);
	for n in 1..40 {
		let mut out = Vec::new();
		let written = chain.generate(&mut out, n, &mut rng).unwrap();
		let text = String::from_utf8(out).unwrap();
		assert!(written <= n);
		assert_eq!(text.split_whitespace().count(), written);
	}
}

#[test]
fn generated_words_follow_their_prefix() {
	let chain = build(2, TEXT);
	let mut rng = StdRng::seed_from_u64(99);
	let text = chain.generate_text(200, &mut rng).unwrap();

	let words: Vec<&str> = text.split_whitespace().collect();
	for pair in words.windows(3) {
		let key = format!("{} {}", pair[0], pair[1]);
		assert!(chain.prefix(&key).iter().any(|w| w == pair[2]), "{key} -> {}", pair[2]);
	}
}

#[test]
fn generate_zero_is_too_short() {
	let err = build(2, FOX).generate_text(0, &mut StdRng::seed_from_u64(0)).unwrap_err();
	assert!(matches!(err, ChainError::PrefixTooShort { .. }));
	assert!(err.to_string().contains("too short"));
}

#[test]
fn frequency_follows_duplication() {
	let chain = Chain::new(2, false, None);
	// "a b" is followed by "x" three times and by "y" once
	for suffix in ["x", "x", "x", "y"] {
		let mut prefix = Prefix::new(2);
		chain.insert("a", &mut prefix);
		chain.insert("b", &mut prefix);
		chain.insert(suffix, &mut prefix);
	}
	assert_eq!(chain.starters(), vec![" a"]);

	let mut rng = StdRng::seed_from_u64(5);
	let samples = 20_000;
	let mut x = 0;
	for _ in 0..samples {
		// " a" -> "b", then "a b" -> x|y
		let text = chain.generate_text(2, &mut rng).unwrap();
		if text == "b x " {
			x += 1;
		} else {
			assert_eq!(text, "b y ");
		}
	}
	let ratio = x as f64 / samples as f64;
	assert!((ratio - 0.75).abs() < 0.02, "ratio {ratio}");
}

#[test]
fn concurrent_readers_see_whole_inserts() {
	let chain = Arc::new(Chain::new(2, false, None));

	let writer = {
		let chain = Arc::clone(&chain);
		thread::spawn(move || {
			for i in 0..2_000 {
				chain.set(&format!("k {}", i % 50), vec![format!("w{i}"), format!("w{i}")]);
			}
		})
	};

	let readers: Vec<_> = (0..4)
		.map(|_| {
			let chain = Arc::clone(&chain);
			thread::spawn(move || {
				for _ in 0..500 {
					for key in chain.keys() {
						// each set appends a pair, so lists are always even
						assert_eq!(chain.prefix(&key).len() % 2, 0);
					}
				}
			})
		})
		.collect();

	writer.join().unwrap();
	for reader in readers {
		reader.join().unwrap();
	}
	assert_eq!(chain.len(), 50);
}

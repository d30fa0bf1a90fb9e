use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{debug, info};
use rand::Rng;
use rand::seq::{IndexedRandom, IteratorRandom};

use super::prefix::Prefix;
use super::sanitize::sanitize;

/// Mutable part of a chain, guarded by a single reader/writer lock.
#[derive(Debug, Default)]
struct Table {
	/// Prefix key → observed suffixes, duplicates preserved.
	/// Example: { "the quick" => ["fox", "fox", "dog"] }
	entries: HashMap<String, Vec<String>>,
	/// Keys that may begin a generation walk.
	starters: BTreeSet<String>,
	/// Per key, how many leading choices are already in the collection.
	persisted: HashMap<String, usize>,
}

/// A word-level Markov chain.
///
/// Maps a prefix key (the last `prefix_len` words joined by spaces) to the
/// ordered list of words observed right after it. A word seen `k` times after
/// a prefix appears `k` times in its list, which is what weights sampling.
///
/// ## Responsibilities
/// - Record (prefix, suffix) observations (`insert`) and restored entries (`set`)
/// - Track starters: keys that begin with an empty slot followed by a real word
/// - Answer read-only queries for generation, display and persistence
///
/// ## Invariants
/// - `prefix_len >= 2` and never changes
/// - Every key has exactly `prefix_len` space-separated slots
/// - Suffix lists are never deduplicated
///
/// All mutations take the write lock; readers share the read lock, so a chain
/// can be filled from one thread while another saves or prints it.
#[derive(Debug)]
pub struct Chain {
	table: RwLock<Table>,
	prefix_len: usize,
	verbose: bool,
	/// Sanitized collection name; empty until assigned.
	collection: Mutex<String>,
}

impl Chain {
	/// Creates an empty chain with prefixes of `max(prefix_len, 2)` words.
	///
	/// `name`, when given, is sanitized in strict mode and becomes the
	/// collection the chain saves to.
	pub fn new(prefix_len: usize, verbose: bool, name: Option<&str>) -> Self {
		Self {
			table: RwLock::new(Table::default()),
			prefix_len: prefix_len.max(Prefix::MIN_LEN),
			verbose,
			collection: Mutex::new(name.map(|n| sanitize(n, true)).unwrap_or_default()),
		}
	}

	fn read(&self) -> RwLockReadGuard<'_, Table> {
		self.table.read().unwrap_or_else(PoisonError::into_inner)
	}

	fn write(&self) -> RwLockWriteGuard<'_, Table> {
		self.table.write().unwrap_or_else(PoisonError::into_inner)
	}

	/// Returns `true` for keys marking a true text start:
	/// a leading empty slot followed by at least one real word.
	fn is_starter(key: &str) -> bool {
		key.starts_with(' ') && key.split(' ').any(|word| !word.is_empty())
	}

	fn register_starter(&self, table: &mut Table, key: &str) {
		if Self::is_starter(key) && table.starters.insert(key.to_owned()) && self.verbose {
			info!("New starter: [{key}]");
		}
	}

	/// Appends `choices` under `key` and registers `key` as a starter if it qualifies.
	fn record<I>(&self, key: &str, choices: I)
	where
		I: IntoIterator<Item = String>,
	{
		let mut guard = self.write();
		let table = &mut *guard;
		table.entries.entry(key.to_owned()).or_default().extend(choices);
		self.register_starter(table, key);
	}

	/// Records `token` as following `prefix`, then shifts it into `prefix`.
	///
	/// The token is sanitized first. The association is stored for the
	/// prefix that preceded the token, and only then does the window advance.
	pub fn insert(&self, token: &str, prefix: &mut Prefix) {
		let key = prefix.key();
		let word = sanitize(token, false);

		if self.verbose {
			info!("Association: |{key}| -> [{word}]");
		}

		self.record(&key, [word.clone()]);
		prefix.shift(&word);
	}

	/// Bulk-loads one known `(key, choices)` pair, e.g. from persisted storage.
	///
	/// Applies the same starter bookkeeping as [`Chain::insert`] but neither
	/// sanitizes nor shifts any prefix. Choices are appended to whatever the
	/// key already holds, so restoring several collections accumulates weights.
	pub fn set(&self, key: &str, choices: Vec<String>) {
		debug!("Set [{key}] with {} choices", choices.len());
		self.record(key, choices);
	}

	/// Like [`Chain::set`], for choices read back from the chain's own collection.
	///
	/// The choices are placed ahead of any not yet saved and counted as
	/// persisted, so the next save does not write them again.
	pub(crate) fn set_persisted(&self, key: &str, choices: Vec<String>) {
		debug!("Restore [{key}] with {} choices", choices.len());
		let mut guard = self.write();
		let table = &mut *guard;
		let mark = table.persisted.entry(key.to_owned()).or_default();
		let list = table.entries.entry(key.to_owned()).or_default();
		let at = (*mark).min(list.len());
		*mark = at + choices.len();
		let unsaved = list.split_off(at);
		list.extend(choices);
		list.extend(unsaved);
		self.register_starter(table, key);
	}

	/// Choices of `key` not yet saved, with the list length they end at.
	pub(crate) fn unsaved(&self, key: &str) -> (Vec<String>, usize) {
		let table = self.read();
		let Some(list) = table.entries.get(key) else {
			return (Vec::new(), 0);
		};
		let mark = table.persisted.get(key).copied().unwrap_or(0).min(list.len());
		(list[mark..].to_vec(), list.len())
	}

	/// Records that the first `end` choices of `key` are in the collection.
	pub(crate) fn mark_saved(&self, key: &str, end: usize) {
		let mut table = self.write();
		let mark = table.persisted.entry(key.to_owned()).or_default();
		*mark = (*mark).max(end);
	}

	/// Prefix length in words.
	pub fn prefix_len(&self) -> usize {
		self.prefix_len
	}

	pub fn verbose(&self) -> bool {
		self.verbose
	}

	/// Name of the collection this chain saves to (empty if unassigned).
	pub fn collection(&self) -> String {
		self.collection.lock().unwrap_or_else(PoisonError::into_inner).clone()
	}

	pub(crate) fn set_collection(&self, name: &str) {
		*self.collection.lock().unwrap_or_else(PoisonError::into_inner) = name.to_owned();
	}

	/// Returns all keys, in no particular order.
	pub fn keys(&self) -> Vec<String> {
		self.read().entries.keys().cloned().collect()
	}

	/// Returns all keys sorted ascending.
	pub fn prefixes(&self) -> Vec<String> {
		let mut keys = self.keys();
		keys.sort();
		keys
	}

	/// Returns the suffixes recorded for `key`, or an empty list.
	pub fn prefix(&self, key: &str) -> Vec<String> {
		self.read().entries.get(key).cloned().unwrap_or_default()
	}

	/// Returns the starters sorted ascending.
	pub fn starters(&self) -> Vec<String> {
		self.read().starters.iter().cloned().collect()
	}

	/// Number of keys.
	pub fn len(&self) -> usize {
		self.read().entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.read().entries.is_empty()
	}

	/// Picks a starter uniformly at random.
	///
	/// Returns an empty string when no starter exists; such a key has no
	/// suffixes, so a walk starting from it produces nothing.
	pub fn random_starter<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
		self.read().starters.iter().choose(rng).cloned().unwrap_or_default()
	}

	/// Draws one suffix of `key` uniformly from its list (duplicates weight the draw).
	///
	/// Returns `None` if the key is unknown or has no suffixes.
	pub(crate) fn choose<R: Rng + ?Sized>(&self, key: &str, rng: &mut R) -> Option<String> {
		self.read().entries.get(key)?.choose(rng).cloned()
	}

	/// Renders the chain as a coloured table: index, prefix key, choices.
	pub fn pretty(&self) -> String {
		let table = self.read();
		let mut keys: Vec<&String> = table.entries.keys().collect();
		keys.sort();

		let width = keys.iter().map(|k| k.chars().count()).max().unwrap_or(0).clamp(10, 50);
		let mut out = String::from("--------------\n");
		out.push_str(&format!("{:<5} | {:<width$} | Available choices\n", "Index", "Prefix key"));
		for (i, key) in keys.iter().enumerate() {
			let choices = table.entries.get(*key).map(|c| c.join(" ")).unwrap_or_default();
			out.push_str(&format!(
				"\x1b[0;37m {i:03} \x1b[0m| \x1b[0;32m{key:<width$}\x1b[0m | \x1b[0;33m[{choices}]\x1b[0m\n"
			));
		}
		out.push_str("--------------\n");
		out
	}
}

impl fmt::Display for Chain {
	/// One `[key]: suffix1, suffix2, ...` line per key, keys sorted ascending.
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let table = self.read();
		let mut keys: Vec<&String> = table.entries.keys().collect();
		keys.sort();

		for (i, key) in keys.iter().enumerate() {
			if i > 0 {
				f.write_str("\n")?;
			}
			let choices = table.entries.get(*key).map(|c| c.join(", ")).unwrap_or_default();
			write!(f, "[{key}]: {choices}")?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn new_chain_is_empty() {
		let chain = Chain::new(2, false, None);
		assert_eq!(chain.len(), 0);
		assert!(chain.is_empty());
		assert!(chain.starters().is_empty());
		assert_eq!(chain.collection(), "");
	}

	#[test]
	fn new_clamps_prefix_len_and_sanitizes_name() {
		let chain = Chain::new(1, false, Some("My Dict!"));
		assert_eq!(chain.prefix_len(), 2);
		assert_eq!(chain.collection(), "mydict");
	}

	#[test]
	fn insert_records_then_shifts() {
		let chain = Chain::new(2, false, None);
		let mut prefix = Prefix::new(2);
		chain.insert("The", &mut prefix);
		assert_eq!(prefix.key(), " the");
		chain.insert("Quick,", &mut prefix);
		assert_eq!(prefix.key(), "the quick");

		assert_eq!(chain.prefix(" "), vec!["the"]);
		assert_eq!(chain.prefix(" the"), vec!["quick"]);
		assert_eq!(chain.starters(), vec![" the"]);
	}

	#[test]
	fn blank_key_is_not_a_starter() {
		assert!(!Chain::is_starter(" "));
		assert!(!Chain::is_starter("  "));
		assert!(Chain::is_starter(" the"));
		assert!(Chain::is_starter("  the"));
		assert!(Chain::is_starter(" the quick"));
		assert!(!Chain::is_starter("the quick"));
	}

	#[test]
	fn duplicates_are_preserved() {
		let chain = Chain::new(2, false, None);
		for _ in 0..3 {
			let mut prefix: Prefix = ["a", "b"].into_iter().collect();
			chain.insert("c", &mut prefix);
		}
		assert_eq!(chain.prefix("a b"), vec!["c", "c", "c"]);
		assert_eq!(chain.len(), 1);
	}

	#[test]
	fn set_appends_and_tracks_starters() {
		let chain = Chain::new(2, false, None);
		chain.set(" hello", vec!["world".into()]);
		chain.set(" hello", vec!["there".into()]);
		chain.set("hello world", vec!["Again".into()]);

		assert_eq!(chain.prefix(" hello"), vec!["world", "there"]);
		// restored data is taken as-is
		assert_eq!(chain.prefix("hello world"), vec!["Again"]);
		assert_eq!(chain.starters(), vec![" hello"]);
	}

	#[test]
	fn persisted_choices_go_first_and_are_not_unsaved() {
		let chain = Chain::new(2, false, None);
		chain.set("a b", vec!["local".into()]);
		chain.set_persisted("a b", vec!["old".into(), "old".into()]);

		assert_eq!(chain.prefix("a b"), vec!["old", "old", "local"]);
		assert_eq!(chain.unsaved("a b"), (vec!["local".to_owned()], 3));

		chain.mark_saved("a b", 3);
		chain.set("a b", vec!["new".into()]);
		assert_eq!(chain.unsaved("a b"), (vec!["new".to_owned()], 4));
		assert_eq!(chain.unsaved("x y"), (Vec::new(), 0));
	}

	#[test]
	fn unknown_prefix_is_empty() {
		let chain = Chain::new(2, false, None);
		assert!(chain.prefix("nope nope").is_empty());
	}

	#[test]
	fn random_starter_without_starters_is_empty() {
		let chain = Chain::new(2, false, None);
		chain.set("a b", vec!["c".into()]);
		assert_eq!(chain.random_starter(&mut rand::rng()), "");
	}

	#[test]
	fn pretty_lists_every_key() {
		let chain = Chain::new(2, false, None);
		chain.set(" a", vec!["b".into()]);
		chain.set("a b", vec!["c".into(), "d".into()]);
		let pretty = chain.pretty();
		assert!(pretty.contains(" 000 "));
		assert!(pretty.contains(" 001 "));
		assert!(pretty.contains("[c d]"));
	}
}

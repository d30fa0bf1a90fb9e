use std::fmt;

/// A Markov chain prefix: the last `len` words seen, oldest first.
///
/// Its string form (words joined by a single space) is the lookup key
/// of a [`Chain`](super::chain::Chain). Empty slots are empty strings, so a
/// fresh prefix of length 2 reads `" "`.
///
/// # Invariants
/// - The length is at least [`Prefix::MIN_LEN`] and never changes after creation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prefix {
	words: Vec<String>,
}

impl Prefix {
	/// Smallest accepted prefix length.
	pub const MIN_LEN: usize = 2;

	/// Creates a prefix of `max(len, 2)` empty slots.
	pub fn new(len: usize) -> Self {
		Self { words: vec![String::new(); len.max(Self::MIN_LEN)] }
	}

	/// Drops the oldest word and appends `word`, trimmed of surrounding whitespace.
	pub fn shift(&mut self, word: &str) {
		self.words.rotate_left(1);
		if let Some(last) = self.words.last_mut() {
			*last = word.trim().to_owned();
		}
	}

	/// Returns the lookup key: words joined with a single space.
	pub fn key(&self) -> String {
		self.words.join(" ")
	}

	/// Number of slots in a lookup key.
	pub fn slots(key: &str) -> usize {
		key.split(' ').count()
	}

	/// Number of slots (never changes).
	pub fn len(&self) -> usize {
		self.words.len()
	}

	/// Always `false`: a prefix has at least two slots.
	pub fn is_empty(&self) -> bool {
		self.words.is_empty()
	}

	pub fn words(&self) -> &[String] {
		&self.words
	}
}

impl<S: Into<String>> FromIterator<S> for Prefix {
	/// Collects words into a prefix, padding with leading empty slots up to the minimum length.
	fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
		let mut words: Vec<String> = iter.into_iter().map(Into::into).collect();
		while words.len() < Self::MIN_LEN {
			words.insert(0, String::new());
		}
		Self { words }
	}
}

impl fmt::Display for Prefix {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.key())
	}
}

use std::io::Write;

use log::{info, warn};
use rand::Rng;

use super::chain::Chain;
use super::prefix::Prefix;
use crate::error::{ChainError, ChainResult};

/// Random walk over a trained [`Chain`].
///
/// # Responsibilities
/// - Pick a starter uniformly among the chain's starters
/// - Repeatedly draw a suffix of the current key and emit it
/// - Advance a rolling prefix to obtain the next key
///
/// The randomness source is injected, so a seeded generator gives a
/// reproducible walk.
pub struct Generator<'a, R: Rng + ?Sized> {
	chain: &'a Chain,
	rng: &'a mut R,
}

impl<'a, R: Rng + ?Sized> Generator<'a, R> {
	pub fn new(chain: &'a Chain, rng: &'a mut R) -> Self {
		Self { chain, rng }
	}

	/// Writes at most `n` words to `out`, each followed by a single space.
	///
	/// # Returns
	/// The number of words written. The walk halts early, without error,
	/// when the current key has no recorded suffixes; an empty chain yields 0.
	///
	/// # Errors
	/// - [`ChainError::PrefixTooShort`] if `n < 1`.
	/// - [`ChainError::Write`] if `out` rejects a write.
	pub fn generate<W: Write + ?Sized>(&mut self, out: &mut W, n: usize) -> ChainResult<usize> {
		if n < 1 {
			return Err(ChainError::PrefixTooShort { requested: n });
		}
		if self.chain.is_empty() {
			warn!("Empty text map. Cannot generate text");
			return Ok(0);
		}

		let verbose = self.chain.verbose();
		if verbose {
			info!(
				"{} prefixes, prefixes {} long. generating text ...",
				self.chain.len(),
				self.chain.prefix_len()
			);
		}

		let mut prefix = Prefix::new(self.chain.prefix_len());
		let mut key = self.chain.random_starter(&mut *self.rng);
		let mut written = 0;

		for i in 0..n {
			if verbose {
				info!("{i:02} iteration: key [{key}]");
			}

			let Some(next) = self.chain.choose(&key, &mut *self.rng) else {
				if verbose {
					info!("No more choices after [{key}]");
				}
				break;
			};

			write!(out, "{next} ").map_err(ChainError::Write)?;
			written += 1;

			// Seed the window with the starter's own slots.
			if i == 0 {
				for word in key.split(' ') {
					prefix.shift(word);
				}
			}
			prefix.shift(&next);
			key = prefix.key();
		}

		Ok(written)
	}
}

impl Chain {
	/// Generates at most `n` words into `out` using `rng`.
	///
	/// See [`Generator::generate`].
	pub fn generate<W, R>(&self, out: &mut W, n: usize, rng: &mut R) -> ChainResult<usize>
	where
		W: Write + ?Sized,
		R: Rng + ?Sized,
	{
		Generator::new(self, rng).generate(out, n)
	}

	/// Generates at most `n` words and returns them as a string.
	pub fn generate_text<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> ChainResult<String> {
		let mut out = Vec::new();
		self.generate(&mut out, n, rng)?;
		Ok(String::from_utf8_lossy(&out).into_owned())
	}
}

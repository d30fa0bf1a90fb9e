use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use super::chain::Chain;
use super::prefix::Prefix;
use crate::error::{ChainError, ChainResult};
use crate::io;

/// Consecutive empty reads that end a live session.
pub const BLANK_READS_TO_STOP: usize = 2;

/// How often the interrupt listener checks whether the reader already finished.
const INTERRUPT_POLL: Duration = Duration::from_millis(50);

/// How a live build session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveOutcome {
	/// Two consecutive empty lines were read.
	DoubleBlank,
	/// The input stream was exhausted.
	EndOfStream,
	/// The interrupt fired before the reader finished.
	Interrupted,
}

impl Chain {
	/// Builds the chain from a stream until end-of-stream (batch mode).
	///
	/// Tokens are whitespace-delimited and fed through [`Chain::insert`] with
	/// a single live prefix.
	///
	/// # Returns
	/// The number of tokens inserted.
	///
	/// # Errors
	/// Returns [`ChainError::Read`] if the stream cannot be read. Tokens read
	/// before the failure stay in the chain.
	pub fn build<R: BufRead>(&self, reader: R) -> ChainResult<usize> {
		let mut prefix = Prefix::new(self.prefix_len());
		let mut count = 0;
		io::for_each_token(reader, |token| {
			self.insert(token, &mut prefix);
			count += 1;
		})
		.map_err(ChainError::Read)?;

		debug!("Batch build inserted {count} tokens, chain has {} prefixes", self.len());
		Ok(count)
	}

	/// Builds the chain from a text file, line by line.
	///
	/// # Errors
	/// Returns [`ChainError::Io`] if the file cannot be opened or scanned.
	pub fn load<P: AsRef<Path>>(&self, path: P) -> ChainResult<usize> {
		let path = path.as_ref();
		let to_error = |source| ChainError::Io { path: path.to_path_buf(), source };

		let reader = io::open_lines(path).map_err(to_error)?;
		let mut prefix = Prefix::new(self.prefix_len());
		let mut count = 0;
		io::for_each_token(reader, |token| {
			self.insert(token, &mut prefix);
			count += 1;
		})
		.map_err(to_error)?;

		info!("Loaded {count} tokens from {}", path.display());
		Ok(count)
	}

	/// Builds the chain interactively until two consecutive empty lines are read.
	///
	/// Runs two tasks:
	/// - a reader that inserts tokens line by line
	/// - a listener that waits on `interrupt` and cancels the session
	///
	/// Whichever finishes first completes the session; this call returns
	/// exactly once with the corresponding [`LiveOutcome`].
	///
	/// # Notes
	/// - The reader checks for cancellation before every token, so nothing is
	///   inserted after an interrupt even if already buffered.
	/// - A token being inserted when the interrupt fires is completed.
	/// - Read errors count as empty reads.
	/// - If the reader is blocked on input when interrupted, its thread is left
	///   to finish that read and exits without touching the chain.
	pub fn build_live<R>(self: &Arc<Self>, reader: R, interrupt: Receiver<()>) -> LiveOutcome
	where
		R: BufRead + Send + 'static,
	{
		let (done_tx, done_rx) = mpsc::sync_channel::<LiveOutcome>(1);
		let stop = Arc::new(AtomicBool::new(false));

		{
			let done_tx = done_tx.clone();
			let stop = Arc::clone(&stop);
			let verbose = self.verbose();
			thread::spawn(move || {
				loop {
					match interrupt.recv_timeout(INTERRUPT_POLL) {
						Ok(()) => {
							if verbose {
								info!("Received an interrupt, stopping live build");
							}
							stop.store(true, Ordering::SeqCst);
							let _ = done_tx.try_send(LiveOutcome::Interrupted);
							break;
						}
						Err(RecvTimeoutError::Timeout) => {
							if stop.load(Ordering::SeqCst) {
								break;
							}
						}
						Err(RecvTimeoutError::Disconnected) => break,
					}
				}
			});
		}

		{
			let chain = Arc::clone(self);
			let stop = Arc::clone(&stop);
			thread::spawn(move || {
				let outcome = chain.read_live(reader, &stop);
				stop.store(true, Ordering::SeqCst);
				let _ = done_tx.try_send(outcome);
			});
		}

		let outcome = done_rx.recv().unwrap_or(LiveOutcome::Interrupted);
		debug!("Live build ended ({outcome:?}), chain has {} prefixes", self.len());
		outcome
	}

	/// Reader half of [`Chain::build_live`].
	fn read_live<R: BufRead>(&self, mut reader: R, stop: &AtomicBool) -> LiveOutcome {
		let mut prefix = Prefix::new(self.prefix_len());
		let mut blanks = 0;
		let mut line = String::new();

		loop {
			if stop.load(Ordering::SeqCst) {
				return LiveOutcome::Interrupted;
			}

			line.clear();
			match reader.read_line(&mut line) {
				Ok(0) => return LiveOutcome::EndOfStream,
				Ok(_) if line.trim().is_empty() => {
					blanks += 1;
					debug!("Empty read ({blanks})");
				}
				Ok(_) => {
					blanks = 0;
					for token in line.split_whitespace() {
						if stop.load(Ordering::SeqCst) {
							return LiveOutcome::Interrupted;
						}
						self.insert(token, &mut prefix);
					}
				}
				Err(e) => {
					blanks += 1;
					warn!("Scan error: {e}");
				}
			}

			if blanks >= BLANK_READS_TO_STOP {
				return LiveOutcome::DoubleBlank;
			}
		}
	}
}

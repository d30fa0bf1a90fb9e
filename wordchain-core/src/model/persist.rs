use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

use chrono::Utc;
use log::{debug, error, info};

use super::chain::Chain;
use super::prefix::Prefix;
use crate::error::{ChainError, ChainResult};
use crate::store::{Collection, Node, Store};

/// Default number of save workers.
pub const DEFAULT_WORKERS: usize = 5;

/// Result of a [`Chain::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
	/// Collection the chain was saved to.
	pub collection: String,
	/// Keys upserted successfully.
	pub saved: usize,
	/// Keys whose upsert failed (reported, not retried).
	pub failed: usize,
}

/// Collection name used when a chain is saved without one: `dict_YYYYMMDDTHHMMSS` (UTC).
pub fn time_name() -> String {
	format!("dict_{}", Utc::now().format("%Y%m%dT%H%M%S"))
}

impl Chain {
	/// Saves the chain into its collection of `store`.
	///
	/// If the chain has no collection name yet, one is generated with
	/// [`time_name`] and remembered.
	///
	/// Only choices not yet in the collection are written: those restored
	/// from it or written by an earlier save are skipped, so weights are
	/// never counted twice. Keys with nothing new are not upserted.
	///
	/// # Behavior
	/// - Spawns `workers` tasks (at least one) pulling nodes from a bounded queue.
	/// - Enqueues keys in ascending order, closes the queue, waits for the workers.
	/// - Upsert failures are logged and counted; they are not retried within
	///   this save and do not affect the in-memory chain. The next save
	///   writes those choices again.
	/// - Flushes the collection once all workers are done.
	///
	/// # Errors
	/// Returns an error if the collection cannot be opened or flushed.
	pub fn save(&self, store: &dyn Store, workers: usize) -> ChainResult<SaveReport> {
		let mut name = self.collection();
		if name.is_empty() {
			name = time_name();
		}

		let collection = store.connect(&name)?;
		self.set_collection(collection.name());

		let keys = self.prefixes();
		let workers = workers.max(1);
		info!("Saving {} prefixes to [{}] with {workers} workers", keys.len(), collection.name());

		let (tx, rx) = mpsc::sync_channel::<(Node, usize)>(workers);
		let rx = Mutex::new(rx);
		let saved = AtomicUsize::new(0);
		let failed = AtomicUsize::new(0);
		let target: &dyn Collection = collection.as_ref();

		thread::scope(|scope| {
			for _ in 0..workers {
				scope.spawn(|| {
					loop {
						let job = {
							let Ok(queue) = rx.lock() else { break };
							queue.recv()
						};
						let Ok((node, end)) = job else { break };

						match target.upsert(&node.key, &node.choices) {
							Ok(()) => {
								self.mark_saved(&node.key, end);
								saved.fetch_add(1, Ordering::Relaxed);
							}
							Err(e) => {
								error!("Error upserting node entry [{}]: {e}", node.key);
								failed.fetch_add(1, Ordering::Relaxed);
							}
						}
					}
				});
			}

			let count = keys.len();
			for (i, key) in keys.into_iter().enumerate() {
				let choices = self.prefix(&key);
				if tx.send(Node { key, choices }).is_err() {
					break;
				}
				debug!("Node ({}/{count})", i + 1);
			}
			drop(tx);
		});

		collection.flush()?;

		let report = SaveReport {
			collection: collection.name().to_owned(),
			saved: saved.into_inner(),
			failed: failed.into_inner(),
		};
		info!("Saved {} nodes to [{}], {} failed", report.saved, report.collection, report.failed);
		Ok(report)
	}

	/// Rehydrates the chain from every node of `collection`.
	///
	/// Each node goes through the same bookkeeping as [`Chain::set`]. Its
	/// choices are counted as already persisted, so a later [`Chain::save`]
	/// to the same collection only writes what was learned since.
	///
	/// # Returns
	/// The number of nodes applied.
	///
	/// # Errors
	/// Returns [`ChainError::PrefixMismatch`] without touching the chain if a
	/// stored key does not have `prefix_len` words.
	pub fn restore(&self, collection: &dyn Collection) -> ChainResult<usize> {
		let nodes: Vec<Node> = collection.iter_all()?.collect();
		let expected = self.prefix_len();
		if let Some(node) = nodes.iter().find(|n| Prefix::slots(&n.key) != expected) {
			return Err(ChainError::PrefixMismatch {
				key: node.key.clone(),
				expected,
				found: Prefix::slots(&node.key),
			});
		}

		let applied = nodes.len();
		for node in nodes {
			self.set_persisted(&node.key, node.choices);
		}
		info!("Restored {applied} prefixes from [{}]", collection.name());
		Ok(applied)
	}

	/// Creates a chain named after `collection` and restores it.
	///
	/// The prefix length is read from the stored keys; an empty collection
	/// gives the minimum length.
	pub fn open(collection: &dyn Collection, verbose: bool) -> ChainResult<Self> {
		let prefix_len = collection
			.iter_all()?
			.next()
			.map(|node| Prefix::slots(&node.key))
			.unwrap_or(Prefix::MIN_LEN);

		let chain = Self::new(prefix_len, verbose, Some(collection.name()));
		chain.restore(collection)?;
		Ok(chain)
	}
}

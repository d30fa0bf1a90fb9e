//! Persistence adapters for trained chains.
//!
//! A [`Store`] holds named collections; a [`Collection`] holds one [`Node`]
//! per chain key. Upserting an existing key appends choices instead of
//! replacing them, so frequency weights accumulate across sessions.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::model::sanitize::sanitize;

/// In-process store (tests, server).
pub mod memory;

/// One postcard file per collection.
pub mod file;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Persisted record: one chain key with its choices, duplicates preserved.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Node {
	pub key: String,
	pub choices: Vec<String>,
}

/// A named set of [`Node`]s, unique on `key`.
pub trait Collection: Send + Sync {
	fn name(&self) -> &str;

	/// Number of stored nodes.
	fn count(&self) -> Result<usize, StoreError>;

	/// Iterates over every stored node, in key order.
	fn iter_all(&self) -> Result<Box<dyn Iterator<Item = Node> + '_>, StoreError>;

	/// Appends `choices` to `key`, creating the node if needed.
	fn upsert(&self, key: &str, choices: &[String]) -> Result<(), StoreError>;

	/// Makes pending upserts durable. No-op for stores without a backing medium.
	fn flush(&self) -> Result<(), StoreError> {
		Ok(())
	}
}

/// A source of named collections.
pub trait Store: Send + Sync {
	/// Names of the available collections, sorted ascending.
	fn list_collections(&self) -> Result<Vec<String>, StoreError>;

	/// Opens the collection `name`, creating it if it does not exist.
	///
	/// # Errors
	/// Returns [`StoreError::InvalidName`] if `name` is empty once sanitized.
	fn connect(&self, name: &str) -> Result<Box<dyn Collection>, StoreError>;

	/// Opens the collection `name` only if it is already listed.
	///
	/// # Errors
	/// Returns [`StoreError::NotFound`] for an unknown collection.
	fn connect_existing(&self, name: &str) -> Result<Box<dyn Collection>, StoreError> {
		let name = collection_name(name)?;
		if !self.list_collections()?.contains(&name) {
			return Err(StoreError::NotFound(name));
		}
		self.connect(&name)
	}
}

/// Sanitizes a collection name in strict mode, rejecting empty results.
pub(crate) fn collection_name(name: &str) -> Result<String, StoreError> {
	let clean = sanitize(name, true);
	if clean.is_empty() {
		return Err(StoreError::InvalidName(name.to_owned()));
	}
	Ok(clean)
}

/// Key → choices map shared by the adapters.
#[derive(Debug, Default)]
pub(crate) struct NodeTable {
	nodes: RwLock<BTreeMap<String, Vec<String>>>,
}

impl NodeTable {
	pub(crate) fn from_nodes(nodes: Vec<Node>) -> Self {
		let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
		for node in nodes {
			map.entry(node.key).or_default().extend(node.choices);
		}
		Self { nodes: RwLock::new(map) }
	}

	pub(crate) fn len(&self) -> usize {
		self.nodes.read().unwrap_or_else(PoisonError::into_inner).len()
	}

	pub(crate) fn snapshot(&self) -> Vec<Node> {
		self.nodes
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.iter()
			.map(|(key, choices)| Node { key: key.clone(), choices: choices.clone() })
			.collect()
	}

	pub(crate) fn upsert(&self, key: &str, choices: &[String]) {
		self.nodes
			.write()
			.unwrap_or_else(PoisonError::into_inner)
			.entry(key.to_owned())
			.or_default()
			.extend_from_slice(choices);
	}
}

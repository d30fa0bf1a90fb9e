use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::{Collection, Node, NodeTable, Store, collection_name};
use crate::error::StoreError;

/// Collections kept in process memory.
///
/// Handles returned by [`Store::connect`] share state: a node upserted
/// through one handle is visible through every other handle on the same name.
#[derive(Debug, Default)]
pub struct MemoryStore {
	collections: Mutex<BTreeMap<String, Arc<NodeTable>>>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}
}

impl Store for MemoryStore {
	fn list_collections(&self) -> Result<Vec<String>, StoreError> {
		let collections = self.collections.lock().unwrap_or_else(PoisonError::into_inner);
		Ok(collections.keys().cloned().collect())
	}

	fn connect(&self, name: &str) -> Result<Box<dyn Collection>, StoreError> {
		let name = collection_name(name)?;
		let mut collections = self.collections.lock().unwrap_or_else(PoisonError::into_inner);
		let table = Arc::clone(collections.entry(name.clone()).or_default());
		Ok(Box::new(MemoryCollection { name, table }))
	}
}

/// Handle on one [`MemoryStore`] collection.
#[derive(Debug)]
pub struct MemoryCollection {
	name: String,
	table: Arc<NodeTable>,
}

impl Collection for MemoryCollection {
	fn name(&self) -> &str {
		&self.name
	}

	fn count(&self) -> Result<usize, StoreError> {
		Ok(self.table.len())
	}

	fn iter_all(&self) -> Result<Box<dyn Iterator<Item = Node> + '_>, StoreError> {
		Ok(Box::new(self.table.snapshot().into_iter()))
	}

	fn upsert(&self, key: &str, choices: &[String]) -> Result<(), StoreError> {
		self.table.upsert(key, choices);
		Ok(())
	}
}

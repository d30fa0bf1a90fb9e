use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use super::{Collection, Node, NodeTable, Store, collection_name};
use crate::error::StoreError;
use crate::io::{build_output_path, get_filename, list_files, write_atomic};

/// Extension of collection files.
const EXTENSION: &str = "bin";

/// Collections stored as postcard-encoded files, one `<name>.bin` per collection.
///
/// A connected collection is read fully into memory; upserts stay in memory
/// until [`Collection::flush`] rewrites the file.
#[derive(Debug, Clone)]
pub struct FileStore {
	dir: PathBuf,
}

impl FileStore {
	/// Opens a store rooted at `dir`, creating the directory if needed.
	///
	/// # Errors
	/// Returns [`StoreError::Io`] if the directory cannot be created.
	pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, StoreError> {
		let dir = dir.as_ref().to_path_buf();
		fs::create_dir_all(&dir)?;
		Ok(Self { dir })
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}
}

impl Store for FileStore {
	fn list_collections(&self) -> Result<Vec<String>, StoreError> {
		list_files(&self.dir, EXTENSION)?
			.iter()
			.map(|file| get_filename(file).map_err(StoreError::from))
			.collect()
	}

	fn connect(&self, name: &str) -> Result<Box<dyn Collection>, StoreError> {
		let name = collection_name(name)?;
		let path = build_output_path(&self.dir, &name, EXTENSION);

		let nodes: Vec<Node> = if path.exists() {
			let bytes = fs::read(&path)?;
			postcard::from_bytes(&bytes).map_err(StoreError::Decode)?
		} else {
			Vec::new()
		};
		debug!("Connected to {} ({} nodes)", path.display(), nodes.len());

		Ok(Box::new(FileCollection { name, path, table: NodeTable::from_nodes(nodes) }))
	}
}

/// Handle on one [`FileStore`] collection.
#[derive(Debug)]
pub struct FileCollection {
	name: String,
	path: PathBuf,
	table: NodeTable,
}

impl Collection for FileCollection {
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

	fn flush(&self) -> Result<(), StoreError> {
		let nodes = self.table.snapshot();
		let bytes = postcard::to_stdvec(&nodes).map_err(StoreError::Encode)?;
		write_atomic(&self.path, &bytes)?;
		info!("Wrote {} nodes to {}", nodes.len(), self.path.display());
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn flush_then_reconnect() {
		let dir = tempfile::tempdir().unwrap();
		let store = FileStore::open(dir.path()).unwrap();

		let coll = store.connect("dict").unwrap();
		coll.upsert("a b", &["c".to_owned(), "c".to_owned()]).unwrap();
		coll.flush().unwrap();

		let again = store.connect("dict").unwrap();
		let nodes: Vec<Node> = again.iter_all().unwrap().collect();
		assert_eq!(nodes, vec![Node { key: "a b".into(), choices: vec!["c".into(), "c".into()] }]);
		assert_eq!(store.list_collections().unwrap(), vec!["dict"]);
	}

	#[test]
	fn unflushed_collection_is_not_listed() {
		let dir = tempfile::tempdir().unwrap();
		let store = FileStore::open(dir.path().join("nested")).unwrap();
		store.connect("ghost").unwrap();
		assert!(store.list_collections().unwrap().is_empty());
	}

	#[test]
	fn corrupt_file_fails_to_decode() {
		let dir = tempfile::tempdir().unwrap();
		fs::write(dir.path().join("bad.bin"), [0xff, 0xff, 0xff]).unwrap();
		let store = FileStore::open(dir.path()).unwrap();
		assert!(matches!(store.connect("bad"), Err(StoreError::Decode(_))));
	}
}

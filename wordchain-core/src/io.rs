use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::{fs, io};

/// Opens a text file for line-by-line reading.
pub(crate) fn open_lines<P: AsRef<Path>>(filename: P) -> io::Result<BufReader<File>> {
	Ok(BufReader::new(File::open(filename)?))
}

/// Calls `f` with each whitespace-separated token of every line from `reader`.
///
/// Stops at the first read error and returns it.
pub(crate) fn for_each_token<R, F>(reader: R, mut f: F) -> io::Result<()>
where
	R: BufRead,
	F: FnMut(&str),
{
	for line in reader.lines() {
		for token in line?.split_whitespace() {
			f(token);
		}
	}
	Ok(())
}

/// Builds the path of a collection file inside a directory.
///
/// Example:
/// `data` + `"dict"` + `"bin"` → `data/dict.bin`
pub(crate) fn build_output_path<P: AsRef<Path>>(dir: P, name: &str, extension: &str) -> PathBuf {
	let mut output = dir.as_ref().join(name);
	output.set_extension(extension);
	output
}

/// Extracts the base filename without extension.
///
/// Examples:
/// - `"./data/model.bin"` → `"model"`
/// - `"model.bin"` → `"model"`
pub(crate) fn get_filename<P: AsRef<Path>>(input_path: P) -> io::Result<String> {
	let stem = input_path
		.as_ref()
		.file_stem()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Path has no filename"))?;

	Ok(stem.to_string_lossy().to_string())
}

/// Lists all files with a given extension in a directory.
///
/// Returns file names only (no paths), sorted ascending.
pub(crate) fn list_files<P: AsRef<Path>>(dir: P, extension: &str) -> io::Result<Vec<String>> {
	let mut files = Vec::new();

	for entry in fs::read_dir(dir)? {
		let entry = entry?;
		let path = entry.path();

		if path.is_file() && path.extension() == Some(std::ffi::OsStr::new(extension)) {
			if let Some(name) = path.file_name() {
				files.push(name.to_string_lossy().to_string());
			}
		}
	}

	files.sort();
	Ok(files)
}

/// Replaces `path` with `bytes` by writing a sibling temp file and renaming it.
pub(crate) fn write_atomic<P: AsRef<Path>>(path: P, bytes: &[u8]) -> io::Result<()> {
	let path = path.as_ref();
	let mut tmp = path.to_path_buf();
	tmp.set_extension("tmp");

	{
		let mut file = File::create(&tmp)?;
		file.write_all(bytes)?;
		file.sync_all()?;
	}
	fs::rename(&tmp, path)
}

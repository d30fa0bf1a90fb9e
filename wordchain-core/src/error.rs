use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by chain operations.
#[derive(Error, Debug)]
pub enum ChainError {
	/// Generation was asked for fewer than one word.
	#[error("Prefix too short: cannot generate {requested} words")]
	PrefixTooShort { requested: usize },

	/// A seed file could not be opened or scanned.
	#[error("Cannot read {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// Reading tokens from an input stream failed.
	#[error("Read error: {0}")]
	Read(#[source] std::io::Error),

	/// Writing generated text to the output failed.
	#[error("Write error: {0}")]
	Write(#[source] std::io::Error),

	/// A restored key does not have as many words as the chain's prefixes.
	#[error("Prefix length mismatch: [{key}] has {found} words, the chain uses {expected}")]
	PrefixMismatch { key: String, expected: usize, found: usize },

	#[error("Store error: {0}")]
	Store(#[from] StoreError),
}

/// Errors raised by persistence adapters.
#[derive(Error, Debug)]
pub enum StoreError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Encoding error: {0}")]
	Encode(#[source] postcard::Error),

	#[error("Decoding error: {0}")]
	Decode(#[source] postcard::Error),

	/// The collection name is empty once sanitized.
	#[error("Invalid collection name: {0:?}")]
	InvalidName(String),

	#[error("Collection not found: {0}")]
	NotFound(String),
}

pub type ChainResult<T> = Result<T, ChainError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn error_display_formats() {
		let err = ChainError::PrefixTooShort { requested: 0 };
		assert_eq!(err.to_string(), "Prefix too short: cannot generate 0 words");

		let err = StoreError::InvalidName("--".into());
		assert_eq!(err.to_string(), "Invalid collection name: \"--\"");

		let err = ChainError::PrefixMismatch { key: "a b c".into(), expected: 2, found: 3 };
		assert_eq!(err.to_string(), "Prefix length mismatch: [a b c] has 3 words, the chain uses 2");

		let err: ChainError = StoreError::NotFound("dict".into()).into();
		assert_eq!(err.to_string(), "Store error: Collection not found: dict");
	}
}

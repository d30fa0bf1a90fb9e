//! Word-level Markov chain text generation library.
//!
//! This crate learns word-transition statistics from text and samples new
//! text from them. It provides:
//! - A fixed-length sliding word window (`Prefix`)
//! - Token normalization before words enter the model
//! - The prefix → suffixes table with its starter set (`Chain`)
//! - Batch, live and file-based ingestion
//! - A random walk generator with an injectable randomness source
//! - Persistence adapters to save and rehydrate trained chains

/// Core chain model, ingestion and generation logic.
pub mod model;

/// Persistence adapters (collections of `Node` records).
pub mod store;

/// Error types shared by the model and the stores.
pub mod error;

/// I/O utilities (path helpers, directory listing).
///
/// Not exposed
pub(crate) mod io;

pub use error::{ChainError, StoreError};
pub use model::chain::Chain;
pub use model::prefix::Prefix;

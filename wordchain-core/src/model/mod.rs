//! Word-level Markov chain model.
//!
//! This module groups the pieces of the chain engine:
//! - The sliding word window used as lookup key (`Prefix`)
//! - Token normalization (`sanitize`)
//! - The prefix → suffixes table and its starters (`Chain`)
//! - Ingestion from streams and files (`builder`)
//! - The random walk (`Generator`)
//! - Saving to and restoring from a store (`persist`)

/// Fixed-length sliding window of the last N words.
pub mod prefix;

/// Token normalization before words enter the model.
pub mod sanitize;

/// Prefix → suffixes table, starter set and read accessors.
pub mod chain;

/// Batch, live and file-based ingestion into a `Chain`.
pub mod builder;

/// Random walk over a trained `Chain`.
pub mod generator;

/// Save and restore a `Chain` through a `Store`.
pub mod persist;

//! Storage layer for FIR Tracker
//!
//! Provides persistence for case records.
//! Supports both in-memory (for development and tests) and Couchbase backends.

pub mod error;
pub mod memory;
pub mod traits;

#[cfg(feature = "couchbase")]
pub mod couchbase;

pub use error::StorageError;
pub use memory::InMemoryStorage;
pub use traits::{CaseStorage, OpenScan, UnreadableCase};

#[cfg(feature = "couchbase")]
pub use couchbase::{CouchbaseConfig, CouchbaseStorage};

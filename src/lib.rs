//! Balanced name and number trees over a document object store.
//!
//! The [`tree`] module holds the index itself; [`objects`] provides the
//! object model and the [`ObjectStore`](objects::ObjectStore) seam it is
//! persisted through.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod objects;
pub mod tree;

pub use error::{Result, TreeError};
pub use objects::{Array, Dictionary, MemoryStore, Name, Object, ObjectStore, Reference};
pub use tree::{
    KeyCodec, NameKeys, NameTree, NumberKeys, NumberTree, Tree, TreeOptions, TreeStatsSnapshot,
    ValCodec, VerifyReport,
};

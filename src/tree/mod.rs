#![forbid(unsafe_code)]

//! Balanced name and number trees.
//!
//! A tree is a B-tree variant whose nodes live in an [`ObjectStore`]: only
//! leaves carry key/value pairs, interior nodes carry kid references, and
//! every non-root node caches the key range of its subtree as `Limits`.
//!
//! [`ObjectStore`]: crate::objects::ObjectStore

/// Key-domain strategies and value conversions.
pub mod codec;
/// Node records and their size bounds.
pub mod node;
mod definition;
mod iter;
mod options;
mod stats;
mod verify;

pub use codec::{KeyCodec, NameKeys, NumberKeys, ValCodec};
pub use definition::Tree;
pub use iter::{Entries, Keys, Values};
pub use node::{Interior, Leaf, Limits, Node, Sizing};
pub use options::{OptionsError, TreeOptions, DEFAULT_ORDER};
pub use stats::{TreeStats, TreeStatsSnapshot};
pub use verify::{NodeShape, VerifyCounts, VerifyFinding, VerifyReport, VerifySeverity};

/// Tree keyed by byte strings, stored under `Names`.
pub type NameTree<V> = Tree<NameKeys, V>;

/// Tree keyed by integers, stored under `Nums`.
pub type NumberTree<V> = Tree<NumberKeys, V>;

#[cfg(test)]
mod tests;

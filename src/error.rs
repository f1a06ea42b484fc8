use thiserror::Error;

use crate::objects::Reference;
use crate::tree::OptionsError;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TreeError>;

/// Failures surfaced by the object store and the balanced index.
#[derive(Debug, Error)]
pub enum TreeError {
    /// A resolved node matches neither the leaf nor the interior shape, or a
    /// required entry (such as `Limits`) is missing or malformed.
    #[error("corruption detected: {0}")]
    Corruption(String),
    /// A key object does not belong to the codec's key domain.
    #[error("key domain mismatch: expected {expected}, found {found}")]
    KeyDomain {
        /// Object kind the codec works with.
        expected: &'static str,
        /// Object kind that was actually found.
        found: &'static str,
    },
    /// The store holds no live object for the reference.
    #[error("invalid reference {0}")]
    InvalidReference(Reference),
    /// A caller-supplied argument is out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Tree options could not be loaded.
    #[error(transparent)]
    Options(#[from] OptionsError),
}

impl TreeError {
    pub(crate) fn corruption(message: impl Into<String>) -> Self {
        TreeError::Corruption(message.into())
    }
}

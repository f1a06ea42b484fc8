#![forbid(unsafe_code)]

//! Document object primitives consumed by the balanced index.
//!
//! Tree nodes are dictionaries registered as indirect objects in an
//! [`ObjectStore`]; their pair and kid lists are [`Array`]s.

mod array;
mod dictionary;
mod store;

use std::borrow::Borrow;
use std::fmt;

pub use array::Array;
pub use dictionary::Dictionary;
pub use store::{MemoryStore, ObjectStore};

/// Handle to an indirect object owned by an [`ObjectStore`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Reference {
    /// Object number (never zero for a registered object).
    pub number: u32,
    /// Generation of the slot the object number points at.
    pub generation: u16,
}

impl Reference {
    /// Builds a reference from its raw parts.
    pub const fn new(number: u32, generation: u16) -> Self {
        Self { number, generation }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.number, self.generation)
    }
}

/// Name object, used as dictionary key.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Name(pub String);

impl Name {
    /// Name of the interior-node kid list.
    pub const KIDS: &'static str = "Kids";
    /// Name of the subtree key-range boundary entry.
    pub const LIMITS: &'static str = "Limits";
    /// Pair-list entry of name tree leaves.
    pub const NAMES: &'static str = "Names";
    /// Pair-list entry of number tree leaves.
    pub const NUMS: &'static str = "Nums";

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Name {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Name(value.to_string())
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0)
    }
}

/// A document object value.
#[derive(Clone, PartialEq, Debug)]
pub enum Object {
    /// The null object.
    Null,
    /// Boolean value.
    Boolean(bool),
    /// Integer value.
    Integer(i64),
    /// Real value.
    Real(f64),
    /// Byte string.
    String(Vec<u8>),
    /// Name value.
    Name(Name),
    /// Ordered sequence of objects.
    Array(Array),
    /// Name-keyed record.
    Dictionary(Dictionary),
    /// Handle to an indirect object.
    Reference(Reference),
}

impl Object {
    /// Short name of the object's kind, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Object::Null => "null",
            Object::Boolean(_) => "boolean",
            Object::Integer(_) => "integer",
            Object::Real(_) => "real",
            Object::String(_) => "string",
            Object::Name(_) => "name",
            Object::Array(_) => "array",
            Object::Dictionary(_) => "dictionary",
            Object::Reference(_) => "reference",
        }
    }

    /// Returns the referenced handle when this object is a reference.
    pub fn as_reference(&self) -> Option<Reference> {
        match self {
            Object::Reference(reference) => Some(*reference),
            _ => None,
        }
    }

    /// Returns the array when this object is one.
    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Object::Array(array) => Some(array),
            _ => None,
        }
    }

    /// Returns the dictionary when this object is one.
    pub fn as_dictionary(&self) -> Option<&Dictionary> {
        match self {
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Null => f.write_str("null"),
            Object::Boolean(value) => write!(f, "{value}"),
            Object::Integer(value) => write!(f, "{value}"),
            Object::Real(value) => write!(f, "{value}"),
            Object::String(bytes) => write!(f, "({})", String::from_utf8_lossy(bytes)),
            Object::Name(name) => write!(f, "{name}"),
            Object::Array(array) => {
                f.write_str("[")?;
                for (idx, item) in array.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Object::Dictionary(dict) => {
                f.write_str("<<")?;
                for (name, value) in dict.iter() {
                    write!(f, " {name} {value}")?;
                }
                f.write_str(" >>")
            }
            Object::Reference(reference) => write!(f, "{reference}"),
        }
    }
}

impl From<Reference> for Object {
    fn from(value: Reference) -> Self {
        Object::Reference(value)
    }
}

impl From<Array> for Object {
    fn from(value: Array) -> Self {
        Object::Array(value)
    }
}

impl From<Dictionary> for Object {
    fn from(value: Dictionary) -> Self {
        Object::Dictionary(value)
    }
}

impl From<i64> for Object {
    fn from(value: i64) -> Self {
        Object::Integer(value)
    }
}

impl From<&str> for Object {
    fn from(value: &str) -> Self {
        Object::String(value.as_bytes().to_vec())
    }
}

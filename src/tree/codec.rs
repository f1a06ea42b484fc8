use std::cmp::Ordering;

use crate::error::{Result, TreeError};
use crate::objects::{Name, Object, Reference};

/// Key-domain strategy handed to a tree at construction.
///
/// Supplies the leaf pair-list field name, key ordering, and the conversion
/// between caller keys and stored key objects.
pub trait KeyCodec {
    /// Caller-facing key type.
    type Key;

    /// Name of the leaf entry holding the flat `key, value, ...` list.
    fn pairs_field(&self) -> &'static str;

    /// Converts a key into its stored object form.
    fn wrap_key(&self, key: &Self::Key) -> Object;

    /// Converts a stored key object back into a key.
    fn unwrap_key(&self, object: &Object) -> Result<Self::Key>;

    /// Orders two stored key objects.
    fn compare(&self, a: &Object, b: &Object) -> Result<Ordering>;
}

/// Trait implemented by value types that can be stored in a tree leaf.
pub trait ValCodec: Sized {
    /// Encode `value` as a stored object.
    fn encode_val(value: &Self) -> Object;

    /// Decode a value from its stored object.
    fn decode_val(src: &Object) -> Result<Self>;
}

/// Byte-string keys ordered lexicographically (name trees).
#[derive(Clone, Copy, Debug, Default)]
pub struct NameKeys;

impl NameKeys {
    fn bytes<'a>(&self, object: &'a Object) -> Result<&'a [u8]> {
        match object {
            Object::String(bytes) => Ok(bytes),
            other => Err(TreeError::KeyDomain {
                expected: "string",
                found: other.kind(),
            }),
        }
    }
}

impl KeyCodec for NameKeys {
    type Key = Vec<u8>;

    fn pairs_field(&self) -> &'static str {
        Name::NAMES
    }

    fn wrap_key(&self, key: &Vec<u8>) -> Object {
        Object::String(key.clone())
    }

    fn unwrap_key(&self, object: &Object) -> Result<Vec<u8>> {
        self.bytes(object).map(<[u8]>::to_vec)
    }

    fn compare(&self, a: &Object, b: &Object) -> Result<Ordering> {
        Ok(self.bytes(a)?.cmp(self.bytes(b)?))
    }
}

/// Integer keys ordered numerically (number trees).
#[derive(Clone, Copy, Debug, Default)]
pub struct NumberKeys;

impl NumberKeys {
    fn number(&self, object: &Object) -> Result<i64> {
        match object {
            Object::Integer(value) => Ok(*value),
            other => Err(TreeError::KeyDomain {
                expected: "integer",
                found: other.kind(),
            }),
        }
    }
}

impl KeyCodec for NumberKeys {
    type Key = i64;

    fn pairs_field(&self) -> &'static str {
        Name::NUMS
    }

    fn wrap_key(&self, key: &i64) -> Object {
        Object::Integer(*key)
    }

    fn unwrap_key(&self, object: &Object) -> Result<i64> {
        self.number(object)
    }

    fn compare(&self, a: &Object, b: &Object) -> Result<Ordering> {
        Ok(self.number(a)?.cmp(&self.number(b)?))
    }
}

impl ValCodec for Object {
    fn encode_val(value: &Self) -> Object {
        value.clone()
    }

    fn decode_val(src: &Object) -> Result<Self> {
        Ok(src.clone())
    }
}

impl ValCodec for Reference {
    fn encode_val(value: &Self) -> Object {
        Object::Reference(*value)
    }

    fn decode_val(src: &Object) -> Result<Self> {
        src.as_reference().ok_or_else(|| {
            TreeError::corruption(format!("expected reference value, found {}", src.kind()))
        })
    }
}

impl ValCodec for i64 {
    fn encode_val(value: &Self) -> Object {
        Object::Integer(*value)
    }

    fn decode_val(src: &Object) -> Result<Self> {
        match src {
            Object::Integer(value) => Ok(*value),
            other => Err(TreeError::corruption(format!(
                "expected integer value, found {}",
                other.kind()
            ))),
        }
    }
}

impl ValCodec for Vec<u8> {
    fn encode_val(value: &Self) -> Object {
        Object::String(value.clone())
    }

    fn decode_val(src: &Object) -> Result<Self> {
        match src {
            Object::String(bytes) => Ok(bytes.clone()),
            other => Err(TreeError::corruption(format!(
                "expected string value, found {}",
                other.kind()
            ))),
        }
    }
}

use crate::error::{Result, TreeError};

use super::Object;

/// Mutable, randomly indexable, insertion-ordered sequence of objects.
///
/// Physical storage of both leaf pair lists (`key, value, key, value, ...`)
/// and interior kid lists.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Array {
    items: Vec<Object>,
}

impl Array {
    /// Creates an empty array.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the array holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item at `idx`, if in range.
    pub fn get(&self, idx: usize) -> Option<&Object> {
        self.items.get(idx)
    }

    /// Replaces the item at `idx`, returning the previous one.
    pub fn set(&mut self, idx: usize, value: Object) -> Result<Object> {
        let len = self.items.len();
        let slot = self
            .items
            .get_mut(idx)
            .ok_or_else(|| out_of_range(idx, len))?;
        Ok(std::mem::replace(slot, value))
    }

    /// Inserts `value` at `idx`, shifting later items right. `idx == len()` appends.
    pub fn insert(&mut self, idx: usize, value: Object) -> Result<()> {
        if idx > self.items.len() {
            return Err(out_of_range(idx, self.items.len()));
        }
        self.items.insert(idx, value);
        Ok(())
    }

    /// Removes and returns the item at `idx`.
    pub fn remove_at(&mut self, idx: usize) -> Result<Object> {
        if idx >= self.items.len() {
            return Err(out_of_range(idx, self.items.len()));
        }
        Ok(self.items.remove(idx))
    }

    /// Appends `value` at the end.
    pub fn append(&mut self, value: Object) {
        self.items.push(value);
    }

    /// Removes the first `count` items and returns them as a new array.
    pub fn split_front(&mut self, count: usize) -> Result<Array> {
        if count > self.items.len() {
            return Err(out_of_range(count, self.items.len()));
        }
        let tail = self.items.split_off(count);
        let head = std::mem::replace(&mut self.items, tail);
        Ok(Array { items: head })
    }

    /// Removes the last `count` items and returns them as a new array.
    pub fn split_back(&mut self, count: usize) -> Result<Array> {
        let len = self.items.len();
        if count > len {
            return Err(out_of_range(count, len));
        }
        Ok(Array {
            items: self.items.split_off(len - count),
        })
    }

    /// Moves every item of `front` before the current items.
    pub fn prepend(&mut self, front: Array) {
        let mut items = front.items;
        items.append(&mut self.items);
        self.items = items;
    }

    /// Moves every item of `back` after the current items.
    pub fn extend(&mut self, back: Array) {
        self.items.extend(back.items);
    }

    /// Iterates over the items in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Object> {
        self.items.iter()
    }
}

impl From<Vec<Object>> for Array {
    fn from(items: Vec<Object>) -> Self {
        Self { items }
    }
}

impl FromIterator<Object> for Array {
    fn from_iter<T: IntoIterator<Item = Object>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Array {
    type Item = Object;
    type IntoIter = std::vec::IntoIter<Object>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Array {
    type Item = &'a Object;
    type IntoIter = std::slice::Iter<'a, Object>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

fn out_of_range(idx: usize, len: usize) -> TreeError {
    TreeError::InvalidArgument(format!("index {idx} out of range for array of {len} items"))
}

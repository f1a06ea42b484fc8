use std::iter::FusedIterator;

use super::codec::{KeyCodec, ValCodec};
use super::definition::Tree;
use super::node::Node;
use crate::error::{Result, TreeError};
use crate::objects::{Object, ObjectStore, Reference};

enum Frame {
    Kids(std::vec::IntoIter<Reference>),
    Pairs(std::vec::IntoIter<Object>),
}

/// In-order walk over the raw stored pairs.
///
/// Nodes are resolved only when the walk reaches them, so every call to
/// [`Tree::entries`] reflects the store's current content.
struct RawPairs<'a, S: ?Sized, C: KeyCodec, V: ValCodec> {
    tree: &'a Tree<C, V>,
    store: &'a S,
    stack: Vec<Frame>,
    done: bool,
}

impl<'a, S, C, V> RawPairs<'a, S, C, V>
where
    S: ObjectStore + ?Sized,
    C: KeyCodec,
    V: ValCodec,
{
    fn new(tree: &'a Tree<C, V>, store: &'a S) -> Self {
        Self {
            tree,
            store,
            stack: vec![Frame::Kids(vec![tree.root()].into_iter())],
            done: false,
        }
    }

    fn fail(&mut self, err: TreeError) -> Option<Result<(Object, Object)>> {
        self.done = true;
        self.stack.clear();
        Some(Err(err))
    }
}

impl<S, C, V> Iterator for RawPairs<'_, S, C, V>
where
    S: ObjectStore + ?Sized,
    C: KeyCodec,
    V: ValCodec,
{
    type Item = Result<(Object, Object)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let next_kid = match self.stack.last_mut()? {
                Frame::Pairs(pairs) => match (pairs.next(), pairs.next()) {
                    (Some(key), Some(value)) => return Some(Ok((key, value))),
                    (Some(_), None) => {
                        return self.fail(TreeError::corruption("dangling key in pair list"))
                    }
                    (None, _) => None,
                },
                Frame::Kids(kids) => kids.next(),
            };
            let Some(kid) = next_kid else {
                self.stack.pop();
                continue;
            };
            match self.tree.load(self.store, kid) {
                Ok(Node::Leaf(leaf)) => self.stack.push(Frame::Pairs(leaf.pairs.into_iter())),
                Ok(Node::Interior(interior)) => {
                    let kids: Vec<Reference> = interior.kids().collect();
                    self.stack.push(Frame::Kids(kids.into_iter()));
                }
                Err(err) => return self.fail(err),
            }
        }
    }
}

/// Ascending `(key, value)` pairs of a tree. Stops after the first error.
pub struct Entries<'a, S: ?Sized, C: KeyCodec, V: ValCodec> {
    raw: RawPairs<'a, S, C, V>,
}

impl<S, C, V> Iterator for Entries<'_, S, C, V>
where
    S: ObjectStore + ?Sized,
    C: KeyCodec,
    V: ValCodec,
{
    type Item = Result<(C::Key, V)>;

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.raw.tree;
        let codec = tree.codec();
        let decoded = self.raw.next()?.and_then(|(key, value)| {
            Ok((codec.unwrap_key(&key)?, V::decode_val(&value)?))
        });
        if decoded.is_err() {
            self.raw.done = true;
        }
        Some(decoded)
    }
}

impl<S, C, V> FusedIterator for Entries<'_, S, C, V>
where
    S: ObjectStore + ?Sized,
    C: KeyCodec,
    V: ValCodec,
{
}

/// Ascending keys of a tree. Stops after the first error.
pub struct Keys<'a, S: ?Sized, C: KeyCodec, V: ValCodec> {
    raw: RawPairs<'a, S, C, V>,
}

impl<S, C, V> Iterator for Keys<'_, S, C, V>
where
    S: ObjectStore + ?Sized,
    C: KeyCodec,
    V: ValCodec,
{
    type Item = Result<C::Key>;

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.raw.tree;
        let codec = tree.codec();
        let decoded = self
            .raw
            .next()?
            .and_then(|(key, _)| codec.unwrap_key(&key));
        if decoded.is_err() {
            self.raw.done = true;
        }
        Some(decoded)
    }
}

impl<S, C, V> FusedIterator for Keys<'_, S, C, V>
where
    S: ObjectStore + ?Sized,
    C: KeyCodec,
    V: ValCodec,
{
}

/// Values of a tree in ascending key order. Stops after the first error.
pub struct Values<'a, S: ?Sized, C: KeyCodec, V: ValCodec> {
    raw: RawPairs<'a, S, C, V>,
}

impl<S, C, V> Iterator for Values<'_, S, C, V>
where
    S: ObjectStore + ?Sized,
    C: KeyCodec,
    V: ValCodec,
{
    type Item = Result<V>;

    fn next(&mut self) -> Option<Self::Item> {
        let decoded = self
            .raw
            .next()?
            .and_then(|(_, value)| V::decode_val(&value));
        if decoded.is_err() {
            self.raw.done = true;
        }
        Some(decoded)
    }
}

impl<S, C, V> FusedIterator for Values<'_, S, C, V>
where
    S: ObjectStore + ?Sized,
    C: KeyCodec,
    V: ValCodec,
{
}

impl<C: KeyCodec, V: ValCodec> Tree<C, V> {
    /// Lazily walks every pair in ascending key order.
    pub fn entries<'a, S>(&'a self, store: &'a S) -> Entries<'a, S, C, V>
    where
        S: ObjectStore + ?Sized,
    {
        Entries {
            raw: RawPairs::new(self, store),
        }
    }

    /// Lazily walks every key in ascending order.
    pub fn keys<'a, S>(&'a self, store: &'a S) -> Keys<'a, S, C, V>
    where
        S: ObjectStore + ?Sized,
    {
        Keys {
            raw: RawPairs::new(self, store),
        }
    }

    /// Lazily walks every value in ascending key order.
    pub fn values<'a, S>(&'a self, store: &'a S) -> Values<'a, S, C, V>
    where
        S: ObjectStore + ?Sized,
    {
        Values {
            raw: RawPairs::new(self, store),
        }
    }
}

use std::cmp::Ordering;

use crate::error::{Result, TreeError};
use crate::objects::{Array, Dictionary, Name, Object, Reference};

use super::codec::KeyCodec;

/// Size bounds derived from the tree order `t`.
///
/// Leaves hold `[2t, 4t]` pairs and interior nodes `[t, 2t]` kids; the root is
/// exempt from the minimums.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Sizing {
    order: usize,
}

impl Sizing {
    /// Builds the bounds for order `t`.
    pub const fn new(order: usize) -> Self {
        Self { order }
    }

    /// Minimum pair count of a non-root leaf.
    pub const fn min_pairs(&self) -> usize {
        self.order * 2
    }

    /// Maximum pair count of any leaf.
    pub const fn max_pairs(&self) -> usize {
        self.order * 4
    }

    /// Minimum kid count of a non-root interior node.
    pub const fn min_kids(&self) -> usize {
        self.order
    }

    /// Maximum kid count of any interior node.
    pub const fn max_kids(&self) -> usize {
        self.order * 2
    }
}

/// Lowest and highest key reachable in a subtree.
#[derive(Clone, Debug, PartialEq)]
pub struct Limits {
    /// Minimum key.
    pub low: Object,
    /// Maximum key.
    pub high: Object,
}

impl Limits {
    pub(crate) fn parse(object: &Object) -> Result<Self> {
        let array = object
            .as_array()
            .ok_or_else(|| TreeError::corruption(format!("Limits is a {}", object.kind())))?;
        match (array.len(), array.get(0), array.get(1)) {
            (2, Some(low), Some(high)) => Ok(Self {
                low: low.clone(),
                high: high.clone(),
            }),
            (len, _, _) => Err(TreeError::corruption(format!(
                "Limits holds {len} items instead of 2"
            ))),
        }
    }

    pub(crate) fn to_object(&self) -> Object {
        Object::Array(Array::from(vec![self.low.clone(), self.high.clone()]))
    }

    /// Places `key` relative to the range: `Less` below it, `Greater` above it,
    /// `Equal` inside it.
    pub fn locate<C: KeyCodec>(&self, codec: &C, key: &Object) -> Result<Ordering> {
        if codec.compare(key, &self.low)? == Ordering::Less {
            Ok(Ordering::Less)
        } else if codec.compare(key, &self.high)? == Ordering::Greater {
            Ok(Ordering::Greater)
        } else {
            Ok(Ordering::Equal)
        }
    }
}

/// Node holding the actual key/value pairs.
#[derive(Clone, Debug, PartialEq)]
pub struct Leaf {
    pub(crate) pairs: Array,
    pub(crate) limits: Option<Limits>,
}

impl Leaf {
    /// An empty leaf with no Limits.
    pub fn empty() -> Self {
        Self {
            pairs: Array::new(),
            limits: None,
        }
    }

    /// Number of key/value pairs.
    pub fn pair_count(&self) -> usize {
        self.pairs.len() / 2
    }

    /// Key of pair `idx`.
    pub fn key(&self, idx: usize) -> Result<&Object> {
        self.pairs
            .get(idx * 2)
            .ok_or_else(|| TreeError::corruption(format!("leaf has no pair {idx}")))
    }

    /// Value of pair `idx`.
    pub fn value(&self, idx: usize) -> Result<&Object> {
        self.pairs
            .get(idx * 2 + 1)
            .ok_or_else(|| TreeError::corruption(format!("leaf has no pair {idx}")))
    }

    /// Binary search for `key`: `Ok(idx)` on an exact match, otherwise
    /// `Err(idx)` with the sorted insertion position.
    pub fn search<C: KeyCodec>(
        &self,
        codec: &C,
        key: &Object,
    ) -> Result<std::result::Result<usize, usize>> {
        let mut lo = 0usize;
        let mut hi = self.pair_count();
        while lo < hi {
            let mid = (lo + hi) / 2;
            match codec.compare(key, self.key(mid)?)? {
                Ordering::Less => hi = mid,
                Ordering::Greater => lo = mid + 1,
                Ordering::Equal => return Ok(Ok(mid)),
            }
        }
        Ok(Err(lo))
    }

    pub(crate) fn insert_pair(&mut self, idx: usize, key: Object, value: Object) -> Result<()> {
        self.pairs.insert(idx * 2, key)?;
        self.pairs.insert(idx * 2 + 1, value)
    }

    pub(crate) fn replace_pair(&mut self, idx: usize, key: Object, value: Object) -> Result<Object> {
        self.pairs.set(idx * 2, key)?;
        self.pairs.set(idx * 2 + 1, value)
    }

    pub(crate) fn remove_pair(&mut self, idx: usize) -> Result<(Object, Object)> {
        let value = self.pairs.remove_at(idx * 2 + 1)?;
        let key = self.pairs.remove_at(idx * 2)?;
        Ok((key, value))
    }

    /// Resets Limits to the first and last key; an empty leaf has none.
    pub(crate) fn refresh_limits(&mut self) -> Result<()> {
        let count = self.pair_count();
        self.limits = if count == 0 {
            None
        } else {
            Some(Limits {
                low: self.key(0)?.clone(),
                high: self.key(count - 1)?.clone(),
            })
        };
        Ok(())
    }
}

/// Node holding only kid references.
#[derive(Clone, Debug, PartialEq)]
pub struct Interior {
    pub(crate) kids: Array,
    pub(crate) limits: Option<Limits>,
}

impl Interior {
    pub(crate) fn with_kids(kids: Vec<Reference>) -> Self {
        Self {
            kids: kids.into_iter().map(Object::Reference).collect(),
            limits: None,
        }
    }

    /// Number of kids.
    pub fn kid_count(&self) -> usize {
        self.kids.len()
    }

    /// Reference of kid `idx`.
    pub fn kid(&self, idx: usize) -> Result<Reference> {
        self.kids
            .get(idx)
            .and_then(Object::as_reference)
            .ok_or_else(|| TreeError::corruption(format!("interior node has no kid {idx}")))
    }

    /// Iterates over the kid references in order.
    pub fn kids(&self) -> impl Iterator<Item = Reference> + '_ {
        self.kids.iter().filter_map(Object::as_reference)
    }
}

/// A tree node: exactly one of the two shapes.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    /// Pair-holding node.
    Leaf(Leaf),
    /// Kid-holding node.
    Interior(Interior),
}

impl Node {
    /// Decodes a resolved node record, rejecting anything that is neither a
    /// leaf nor an interior node.
    pub fn from_object(object: &Object, pairs_field: &str) -> Result<Self> {
        let dict = object.as_dictionary().ok_or_else(|| {
            TreeError::corruption(format!("tree node is a {}", object.kind()))
        })?;
        let limits = dict.get(Name::LIMITS).map(Limits::parse).transpose()?;
        match (dict.get(Name::KIDS), dict.get(pairs_field)) {
            (Some(kids), None) => {
                let kids = kids.as_array().ok_or_else(|| {
                    TreeError::corruption(format!("Kids is a {}", kids.kind()))
                })?;
                if let Some(bad) = kids.iter().find(|kid| kid.as_reference().is_none()) {
                    return Err(TreeError::corruption(format!(
                        "Kids holds a {} instead of a reference",
                        bad.kind()
                    )));
                }
                Ok(Node::Interior(Interior {
                    kids: kids.clone(),
                    limits,
                }))
            }
            (None, Some(pairs)) => {
                let pairs = pairs.as_array().ok_or_else(|| {
                    TreeError::corruption(format!("{pairs_field} is a {}", pairs.kind()))
                })?;
                if pairs.len() % 2 != 0 {
                    return Err(TreeError::corruption(format!(
                        "{pairs_field} holds an odd number of items ({})",
                        pairs.len()
                    )));
                }
                Ok(Node::Leaf(Leaf {
                    pairs: pairs.clone(),
                    limits,
                }))
            }
            (Some(_), Some(_)) => Err(TreeError::corruption(format!(
                "node carries both Kids and {pairs_field}"
            ))),
            (None, None) => Err(TreeError::corruption(format!(
                "node carries neither Kids nor {pairs_field}"
            ))),
        }
    }

    /// Encodes the node as a dictionary record.
    pub fn into_object(self, pairs_field: &str) -> Object {
        let mut dict = Dictionary::new();
        let limits = match self {
            Node::Leaf(leaf) => {
                dict.insert(pairs_field, Object::Array(leaf.pairs));
                leaf.limits
            }
            Node::Interior(interior) => {
                dict.insert(Name::KIDS, Object::Array(interior.kids));
                interior.limits
            }
        };
        if let Some(limits) = limits {
            dict.insert(Name::LIMITS, limits.to_object());
        }
        Object::Dictionary(dict)
    }

    /// An empty leaf, the shape of a fresh or cleared root.
    pub fn empty_leaf() -> Self {
        Node::Leaf(Leaf::empty())
    }

    /// `"leaf"` or `"interior"`.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Leaf(_) => "leaf",
            Node::Interior(_) => "interior",
        }
    }

    /// Item count: pairs for a leaf, kids for an interior node.
    pub fn len(&self) -> usize {
        match self {
            Node::Leaf(leaf) => leaf.pair_count(),
            Node::Interior(interior) => interior.kid_count(),
        }
    }

    /// Whether the node holds no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored Limits, if any.
    pub fn limits(&self) -> Option<&Limits> {
        match self {
            Node::Leaf(leaf) => leaf.limits.as_ref(),
            Node::Interior(interior) => interior.limits.as_ref(),
        }
    }

    pub(crate) fn set_limits(&mut self, limits: Option<Limits>) {
        match self {
            Node::Leaf(leaf) => leaf.limits = limits,
            Node::Interior(interior) => interior.limits = limits,
        }
    }

    /// Minimum item count for a non-root node of this shape.
    pub fn min_len(&self, sizing: &Sizing) -> usize {
        match self {
            Node::Leaf(_) => sizing.min_pairs(),
            Node::Interior(_) => sizing.min_kids(),
        }
    }

    /// Maximum item count for a node of this shape.
    pub fn max_len(&self, sizing: &Sizing) -> usize {
        match self {
            Node::Leaf(_) => sizing.max_pairs(),
            Node::Interior(_) => sizing.max_kids(),
        }
    }

    pub(crate) fn is_full(&self, sizing: &Sizing) -> bool {
        self.len() >= self.max_len(sizing)
    }

    /// Holds more than its minimum, so it can give up one item.
    pub(crate) fn can_lend(&self, sizing: &Sizing) -> bool {
        self.len() > self.min_len(sizing)
    }

    /// Container slots taken by one item.
    fn item_width(&self) -> usize {
        match self {
            Node::Leaf(_) => 2,
            Node::Interior(_) => 1,
        }
    }

    fn items_mut(&mut self) -> &mut Array {
        match self {
            Node::Leaf(leaf) => &mut leaf.pairs,
            Node::Interior(interior) => &mut interior.kids,
        }
    }

    /// Detaches the first `count` items.
    pub(crate) fn take_front(&mut self, count: usize) -> Result<Array> {
        let width = self.item_width();
        self.items_mut().split_front(count * width)
    }

    /// Detaches the last `count` items.
    pub(crate) fn take_back(&mut self, count: usize) -> Result<Array> {
        let width = self.item_width();
        self.items_mut().split_back(count * width)
    }

    /// Detaches every item.
    pub(crate) fn take_all(&mut self) -> Array {
        std::mem::take(self.items_mut())
    }

    pub(crate) fn prepend(&mut self, items: Array) {
        self.items_mut().prepend(items);
    }

    pub(crate) fn extend(&mut self, items: Array) {
        self.items_mut().extend(items);
    }

    /// A node of the same shape holding `items` and no Limits.
    pub(crate) fn sibling_with(&self, items: Array) -> Node {
        match self {
            Node::Leaf(_) => Node::Leaf(Leaf {
                pairs: items,
                limits: None,
            }),
            Node::Interior(_) => Node::Interior(Interior {
                kids: items,
                limits: None,
            }),
        }
    }
}

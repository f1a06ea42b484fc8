use std::cmp::Ordering;
use std::marker::PhantomData;
use std::sync::Arc;

use smallvec::SmallVec;

use super::codec::{KeyCodec, ValCodec};
use super::node::{Interior, Limits, Node, Sizing};
use super::options::TreeOptions;
use super::stats::{TreeStats, TreeStatsSnapshot};
use crate::error::{Result, TreeError};
use crate::objects::{Name, Object, ObjectStore, Reference};

mod maintenance;

use maintenance::Descend;

/// Balanced key/value index whose nodes are indirect objects of an
/// [`ObjectStore`].
///
/// Only leaves hold pairs; interior nodes hold kid references and every
/// non-root node caches the key range of its subtree as `Limits`. The tree
/// keeps nothing but its root handle, which stays valid for the tree's whole
/// life: growing and shrinking in height reuse the root unit.
pub struct Tree<C: KeyCodec, V: ValCodec> {
    root: Reference,
    codec: C,
    sizing: Sizing,
    options: TreeOptions,
    stats: Arc<TreeStats>,
    _marker: PhantomData<fn() -> V>,
}

/// Position of a visited node inside its parent.
#[derive(Clone, Copy, Debug)]
struct PathEntry {
    parent: Reference,
    slot: usize,
}

impl<C: KeyCodec, V: ValCodec> Tree<C, V> {
    /// Registers an empty leaf root and returns a tree over it.
    pub fn create<S>(store: &mut S, codec: C, options: TreeOptions) -> Result<Self>
    where
        S: ObjectStore + ?Sized,
    {
        options.validate()?;
        let root = store.register(Node::empty_leaf().into_object(codec.pairs_field()))?;
        tracing::debug!(
            target: "doctree::tree",
            root = %root,
            order = options.order,
            "created tree"
        );
        Ok(Self::from_parts(root, codec, options))
    }

    /// Adopts an existing root node.
    pub fn open<S>(store: &S, root: Reference, codec: C, options: TreeOptions) -> Result<Self>
    where
        S: ObjectStore + ?Sized,
    {
        options.validate()?;
        let tree = Self::from_parts(root, codec, options);
        let node = tree.load(store, root)?;
        if tree.options.verify_on_open {
            let report = tree.verify(store)?;
            if let Some(finding) = report.findings.iter().find(|f| f.is_error()) {
                return Err(TreeError::corruption(format!(
                    "tree rooted at {root} failed verification: {}",
                    finding.message
                )));
            }
        }
        tracing::debug!(
            target: "doctree::tree",
            root = %root,
            kind = node.kind(),
            order = tree.options.order,
            "opened tree"
        );
        Ok(tree)
    }

    fn from_parts(root: Reference, codec: C, options: TreeOptions) -> Self {
        Self {
            root,
            codec,
            sizing: options.sizing(),
            options,
            stats: Arc::new(TreeStats::default()),
            _marker: PhantomData,
        }
    }

    /// Return the root reference.
    pub fn root(&self) -> Reference {
        self.root
    }

    /// The key codec in use.
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Options the tree was built with.
    pub fn options(&self) -> &TreeOptions {
        &self.options
    }

    /// Size bounds derived from the order.
    pub fn sizing(&self) -> Sizing {
        self.sizing
    }

    /// Access the live statistics counters for this tree.
    pub fn stats(&self) -> Arc<TreeStats> {
        Arc::clone(&self.stats)
    }

    /// Snapshot the current statistics counters.
    pub fn stats_snapshot(&self) -> TreeStatsSnapshot {
        self.stats.snapshot()
    }

    /// Emit the current statistics to the tracing sink.
    pub fn emit_stats(&self) {
        self.stats.emit_tracing();
    }

    /// Retrieves the value stored under `key`.
    pub fn get<S>(&self, store: &S, key: &C::Key) -> Result<Option<V>>
    where
        S: ObjectStore + ?Sized,
    {
        let key = self.codec.wrap_key(key);
        self.find(store, &key)?
            .as_ref()
            .map(V::decode_val)
            .transpose()
    }

    /// Whether a pair is stored under `key`.
    pub fn contains_key<S>(&self, store: &S, key: &C::Key) -> Result<bool>
    where
        S: ObjectStore + ?Sized,
    {
        let key = self.codec.wrap_key(key);
        Ok(self.find(store, &key)?.is_some())
    }

    fn find<S>(&self, store: &S, key: &Object) -> Result<Option<Object>>
    where
        S: ObjectStore + ?Sized,
    {
        let mut current = self.root;
        loop {
            match self.load(store, current)? {
                Node::Leaf(leaf) => {
                    self.stats.inc_leaf_searches();
                    tracing::trace!(
                        target: "doctree::search",
                        node = %current,
                        kind = "leaf",
                        "located target leaf"
                    );
                    return match leaf.search(&self.codec, key)? {
                        Ok(idx) => Ok(Some(leaf.value(idx)?.clone())),
                        Err(_) => Ok(None),
                    };
                }
                Node::Interior(interior) => {
                    self.stats.inc_internal_searches();
                    tracing::trace!(
                        target: "doctree::search",
                        node = %current,
                        kind = "interior",
                        "descending through interior node"
                    );
                    match self.locate_kid(store, &interior, key)? {
                        Some(idx) => current = interior.kid(idx)?,
                        None => return Ok(None),
                    }
                }
            }
        }
    }

    /// Inserts or replaces the pair under `key`, returning the replaced value.
    pub fn put<S>(&self, store: &mut S, key: &C::Key, value: &V) -> Result<Option<V>>
    where
        S: ObjectStore + ?Sized,
    {
        let key = self.codec.wrap_key(key);
        let value = V::encode_val(value);
        let root = self.load(store, self.root)?;
        if root.is_full(&self.sizing) {
            self.demote_root(store, root)?;
        }
        self.insert(store, self.root, key, value)?
            .as_ref()
            .map(V::decode_val)
            .transpose()
    }

    /// Puts every pair of `entries`.
    pub fn extend<S, I>(&self, store: &mut S, entries: I) -> Result<()>
    where
        S: ObjectStore + ?Sized,
        I: IntoIterator<Item = (C::Key, V)>,
    {
        for (key, value) in entries {
            self.put(store, &key, &value)?;
        }
        Ok(())
    }

    fn insert<S>(
        &self,
        store: &mut S,
        reference: Reference,
        key: Object,
        value: Object,
    ) -> Result<Option<Object>>
    where
        S: ObjectStore + ?Sized,
    {
        match self.load(store, reference)? {
            Node::Leaf(mut leaf) => {
                self.stats.inc_leaf_searches();
                let previous = match leaf.search(&self.codec, &key)? {
                    Ok(idx) => Some(leaf.replace_pair(idx, key, value)?),
                    Err(idx) => {
                        leaf.insert_pair(idx, key, value)?;
                        None
                    }
                };
                leaf.refresh_limits()?;
                self.write_node(store, reference, &Node::Leaf(leaf))?;
                Ok(previous)
            }
            Node::Interior(mut interior) => {
                self.stats.inc_internal_searches();
                let mut idx = self.choose_kid(store, &interior, &key)?;
                let kid = self.load(store, interior.kid(idx)?)?;
                if kid.is_full(&self.sizing) {
                    let upper = self.split_kid(store, reference, &mut interior, idx, kid)?;
                    if self.codec.compare(&key, &upper.low)? != Ordering::Less {
                        idx += 1;
                    }
                }
                let previous = self.insert(store, interior.kid(idx)?, key, value)?;
                if reference != self.root {
                    interior.limits = Some(self.span_of_kids(store, &interior)?);
                    self.write_node(store, reference, &Node::Interior(interior))?;
                }
                Ok(previous)
            }
        }
    }

    /// Removes the pair under `key`, returning its value.
    pub fn remove<S>(&self, store: &mut S, key: &C::Key) -> Result<Option<V>>
    where
        S: ObjectStore + ?Sized,
    {
        let key = self.codec.wrap_key(key);
        let mut reference = self.root;
        let mut node = self.load(store, reference)?;
        let mut path: SmallVec<[PathEntry; 8]> = SmallVec::new();
        loop {
            match node {
                Node::Leaf(mut leaf) => {
                    self.stats.inc_leaf_searches();
                    let idx = match leaf.search(&self.codec, &key)? {
                        Ok(idx) => idx,
                        Err(_) => return Ok(None),
                    };
                    let (_, value) = leaf.remove_pair(idx)?;
                    let boundary = idx == 0 || idx == leaf.pair_count();
                    if boundary {
                        leaf.refresh_limits()?;
                    }
                    self.write_node(store, reference, &Node::Leaf(leaf))?;
                    if boundary {
                        self.propagate_limits(store, &path)?;
                    }
                    return V::decode_val(&value).map(Some);
                }
                Node::Interior(interior) => {
                    self.stats.inc_internal_searches();
                    let Some(idx) = self.locate_kid(store, &interior, &key)? else {
                        return Ok(None);
                    };
                    match self.ensure_spare(store, reference, interior, idx)? {
                        Descend::Kid {
                            slot,
                            reference: kid_ref,
                            node: kid,
                        } => {
                            path.push(PathEntry {
                                parent: reference,
                                slot,
                            });
                            reference = kid_ref;
                            node = kid;
                        }
                        Descend::Collapsed(root) => node = root,
                    }
                }
            }
        }
    }

    /// Refreshes ancestor Limits after a leaf boundary changed. Propagation
    /// stops at the first node that is neither the first nor the last kid of
    /// its parent, and at the root.
    fn propagate_limits<S>(&self, store: &mut S, path: &[PathEntry]) -> Result<()>
    where
        S: ObjectStore + ?Sized,
    {
        for entry in path.iter().rev() {
            if entry.parent == self.root {
                break;
            }
            let mut parent = self.load(store, entry.parent)?;
            if entry.slot != 0 && entry.slot + 1 != parent.len() {
                break;
            }
            self.refresh_limits(store, &mut parent)?;
            self.write_node(store, entry.parent, &parent)?;
        }
        Ok(())
    }

    /// Number of stored pairs.
    pub fn len<S>(&self, store: &S) -> Result<usize>
    where
        S: ObjectStore + ?Sized,
    {
        self.count_pairs(store, self.root)
    }

    fn count_pairs<S>(&self, store: &S, reference: Reference) -> Result<usize>
    where
        S: ObjectStore + ?Sized,
    {
        match self.load(store, reference)? {
            Node::Leaf(leaf) => Ok(leaf.pair_count()),
            Node::Interior(interior) => interior
                .kids()
                .try_fold(0, |total, kid| Ok(total + self.count_pairs(store, kid)?)),
        }
    }

    /// Whether the tree holds no pairs.
    pub fn is_empty<S>(&self, store: &S) -> Result<bool>
    where
        S: ObjectStore + ?Sized,
    {
        Ok(self.load(store, self.root)?.is_empty())
    }

    /// Drops every pair, releasing all nodes but the root. Stored values are
    /// left alone since other objects may reference them.
    pub fn clear<S>(&self, store: &mut S) -> Result<()>
    where
        S: ObjectStore + ?Sized,
    {
        let mut released = Vec::new();
        self.collect_descendants(store, self.root, &mut released)?;
        self.write_node(store, self.root, &Node::empty_leaf())?;
        for reference in &released {
            store.unregister(*reference)?;
        }
        tracing::debug!(
            target: "doctree::tree",
            root = %self.root,
            released = released.len(),
            "cleared tree"
        );
        Ok(())
    }

    fn collect_descendants<S>(
        &self,
        store: &S,
        reference: Reference,
        out: &mut Vec<Reference>,
    ) -> Result<()>
    where
        S: ObjectStore + ?Sized,
    {
        if let Node::Interior(interior) = self.load(store, reference)? {
            for kid in interior.kids() {
                self.collect_descendants(store, kid, out)?;
                out.push(kid);
            }
        }
        Ok(())
    }

    pub(crate) fn load<S>(&self, store: &S, reference: Reference) -> Result<Node>
    where
        S: ObjectStore + ?Sized,
    {
        Node::from_object(store.resolve(reference)?, self.codec.pairs_field())
    }

    fn write_node<S>(&self, store: &mut S, reference: Reference, node: &Node) -> Result<()>
    where
        S: ObjectStore + ?Sized,
    {
        store.mutate(reference, node.clone().into_object(self.codec.pairs_field()))
    }

    /// Limits of a kid; `None` only for an empty leaf that never had any.
    pub(crate) fn kid_limits<S>(&self, store: &S, reference: Reference) -> Result<Option<Limits>>
    where
        S: ObjectStore + ?Sized,
    {
        let object = store.resolve(reference)?;
        if let Some(limits) = object.as_dictionary().and_then(|d| d.get(Name::LIMITS)) {
            return Limits::parse(limits).map(Some);
        }
        match Node::from_object(object, self.codec.pairs_field())? {
            Node::Leaf(leaf) if leaf.pair_count() == 0 => Ok(None),
            node => Err(TreeError::corruption(format!(
                "{} node {reference} has no Limits",
                node.kind()
            ))),
        }
    }

    /// Index of the kid whose range contains `key`.
    fn locate_kid<S>(&self, store: &S, interior: &Interior, key: &Object) -> Result<Option<usize>>
    where
        S: ObjectStore + ?Sized,
    {
        let mut lo = 0usize;
        let mut hi = interior.kid_count();
        while lo < hi {
            let mid = (lo + hi) / 2;
            let Some(limits) = self.kid_limits(store, interior.kid(mid)?)? else {
                return Ok(None);
            };
            match limits.locate(&self.codec, key)? {
                Ordering::Less => hi = mid,
                Ordering::Greater => lo = mid + 1,
                Ordering::Equal => return Ok(Some(mid)),
            }
        }
        Ok(None)
    }

    /// Index of the kid that should receive `key`: the first kid whose upper
    /// limit is not below it, or the last kid.
    fn choose_kid<S>(&self, store: &S, interior: &Interior, key: &Object) -> Result<usize>
    where
        S: ObjectStore + ?Sized,
    {
        let count = interior.kid_count();
        if count == 0 {
            return Err(TreeError::corruption("interior node without kids"));
        }
        let mut lo = 0usize;
        let mut hi = count;
        while lo < hi {
            let mid = (lo + hi) / 2;
            let above = match self.kid_limits(store, interior.kid(mid)?)? {
                Some(limits) => self.codec.compare(key, &limits.high)? == Ordering::Greater,
                None => false,
            };
            if above {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        Ok(lo.min(count - 1))
    }
}

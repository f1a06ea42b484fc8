use super::super::codec::{KeyCodec, ValCodec};
use super::super::node::{Interior, Limits, Node};
use super::Tree;
use crate::error::{Result, TreeError};
use crate::objects::{Object, ObjectStore, Reference};

/// Where a deletion continues after its next kid was made safe to shrink.
pub(super) enum Descend {
    /// Continue into `node`, which sits at `slot` of the current parent.
    Kid {
        slot: usize,
        reference: Reference,
        node: Node,
    },
    /// The root absorbed its last kid; continue at the root with this content.
    Collapsed(Node),
}

impl<C: KeyCodec, V: ValCodec> Tree<C, V> {
    /// Pushes the full root one level down under a fresh interior root, then
    /// splits it. The root reference keeps pointing at the top of the tree.
    pub(super) fn demote_root<S>(&self, store: &mut S, mut old_root: Node) -> Result<()>
    where
        S: ObjectStore + ?Sized,
    {
        self.refresh_limits(store, &mut old_root)?;
        let demoted = store.register(old_root.clone().into_object(self.codec.pairs_field()))?;
        let mut root = Interior::with_kids(vec![demoted]);
        self.write_node(store, self.root, &Node::Interior(root.clone()))?;
        self.stats.inc_root_demotions();
        tracing::trace!(
            target: "doctree::split",
            root = %self.root,
            demoted = %demoted,
            kind = old_root.kind(),
            "pushed full root under a new root"
        );
        self.split_kid(store, self.root, &mut root, 0, old_root)?;
        Ok(())
    }

    /// Splits the full kid at `idx`: a new sibling takes its first `min` items
    /// and is inserted right before it. Returns the Limits of the upper half.
    pub(super) fn split_kid<S>(
        &self,
        store: &mut S,
        parent_ref: Reference,
        parent: &mut Interior,
        idx: usize,
        mut full: Node,
    ) -> Result<Limits>
    where
        S: ObjectStore + ?Sized,
    {
        let full_ref = parent.kid(idx)?;
        let moved = full.take_front(full.min_len(&self.sizing))?;
        let mut lower = full.sibling_with(moved);
        self.refresh_limits(store, &mut lower)?;
        self.refresh_limits(store, &mut full)?;

        let lower_ref = store.register(lower.into_object(self.codec.pairs_field()))?;
        parent.kids.insert(idx, Object::Reference(lower_ref))?;
        self.write_node(store, parent_ref, &Node::Interior(parent.clone()))?;
        self.write_node(store, full_ref, &full)?;

        self.stats.inc_splits(matches!(full, Node::Leaf(_)));
        tracing::trace!(
            target: "doctree::split",
            parent = %parent_ref,
            lower = %lower_ref,
            upper = %full_ref,
            kind = full.kind(),
            "split full node"
        );
        full.limits()
            .cloned()
            .ok_or_else(|| TreeError::corruption(format!("split left {full_ref} without Limits")))
    }

    /// Makes sure the kid at `idx` holds more than its minimum before a
    /// deletion descends into it: borrow one item from a sibling that can
    /// spare it, otherwise merge with a sibling (the left one first). A root
    /// left with a single kid absorbs it.
    pub(super) fn ensure_spare<S>(
        &self,
        store: &mut S,
        parent_ref: Reference,
        mut parent: Interior,
        idx: usize,
    ) -> Result<Descend>
    where
        S: ObjectStore + ?Sized,
    {
        let kid_ref = parent.kid(idx)?;
        let mut kid = self.load(store, kid_ref)?;
        if kid.can_lend(&self.sizing) {
            return Ok(Descend::Kid {
                slot: idx,
                reference: kid_ref,
                node: kid,
            });
        }

        let mut left_sibling = None;
        if idx > 0 {
            let left_ref = parent.kid(idx - 1)?;
            let mut left = self.load(store, left_ref)?;
            if left.can_lend(&self.sizing) {
                kid.prepend(left.take_back(1)?);
                self.finish_borrow(store, kid_ref, &mut kid, left_ref, &mut left, "left")?;
                return Ok(Descend::Kid {
                    slot: idx,
                    reference: kid_ref,
                    node: kid,
                });
            }
            left_sibling = Some((left_ref, left));
        }

        let mut right_sibling = None;
        if idx + 1 < parent.kid_count() {
            let right_ref = parent.kid(idx + 1)?;
            let mut right = self.load(store, right_ref)?;
            if right.can_lend(&self.sizing) {
                kid.extend(right.take_front(1)?);
                self.finish_borrow(store, kid_ref, &mut kid, right_ref, &mut right, "right")?;
                return Ok(Descend::Kid {
                    slot: idx,
                    reference: kid_ref,
                    node: kid,
                });
            }
            right_sibling = Some((right_ref, right));
        }

        let (slot, sibling_ref, direction) = match (left_sibling, right_sibling) {
            (Some((left_ref, mut left)), _) => {
                kid.prepend(left.take_all());
                parent.kids.remove_at(idx - 1)?;
                (idx - 1, left_ref, "left")
            }
            (None, Some((right_ref, mut right))) => {
                kid.extend(right.take_all());
                parent.kids.remove_at(idx + 1)?;
                (idx, right_ref, "right")
            }
            (None, None) => {
                return Ok(Descend::Kid {
                    slot: idx,
                    reference: kid_ref,
                    node: kid,
                })
            }
        };
        let leaf = matches!(kid, Node::Leaf(_));
        self.refresh_limits(store, &mut kid)?;
        self.write_node(store, kid_ref, &kid)?;
        self.stats.inc_merges(leaf);
        tracing::trace!(
            target: "doctree::merge",
            survivor = %kid_ref,
            removed = %sibling_ref,
            direction,
            kind = kid.kind(),
            "merged sibling into undersized node"
        );

        if parent_ref == self.root && parent.kid_count() == 1 {
            if matches!(kid, Node::Interior(_)) {
                kid.set_limits(None);
            }
            self.write_node(store, self.root, &kid)?;
            store.unregister(sibling_ref)?;
            store.unregister(kid_ref)?;
            self.stats.inc_root_collapses();
            tracing::trace!(
                target: "doctree::merge",
                root = %self.root,
                absorbed = %kid_ref,
                kind = kid.kind(),
                "collapsed root into its single kid"
            );
            return Ok(Descend::Collapsed(kid));
        }

        self.write_node(store, parent_ref, &Node::Interior(parent))?;
        store.unregister(sibling_ref)?;
        Ok(Descend::Kid {
            slot,
            reference: kid_ref,
            node: kid,
        })
    }

    fn finish_borrow<S>(
        &self,
        store: &mut S,
        kid_ref: Reference,
        kid: &mut Node,
        sibling_ref: Reference,
        sibling: &mut Node,
        direction: &'static str,
    ) -> Result<()>
    where
        S: ObjectStore + ?Sized,
    {
        self.refresh_limits(store, kid)?;
        self.refresh_limits(store, sibling)?;
        self.write_node(store, kid_ref, kid)?;
        self.write_node(store, sibling_ref, sibling)?;
        self.stats.inc_borrows();
        tracing::trace!(
            target: "doctree::merge",
            kid = %kid_ref,
            sibling = %sibling_ref,
            direction,
            kind = kid.kind(),
            "borrowed boundary item from sibling"
        );
        Ok(())
    }

    /// Recomputes the Limits of a non-root node from its own content.
    pub(super) fn refresh_limits<S>(&self, store: &S, node: &mut Node) -> Result<()>
    where
        S: ObjectStore + ?Sized,
    {
        match node {
            Node::Leaf(leaf) => leaf.refresh_limits(),
            Node::Interior(interior) => {
                interior.limits = Some(self.span_of_kids(store, interior)?);
                Ok(())
            }
        }
    }

    /// Range from the first kid's low limit to the last kid's high limit.
    pub(super) fn span_of_kids<S>(&self, store: &S, interior: &Interior) -> Result<Limits>
    where
        S: ObjectStore + ?Sized,
    {
        let count = interior.kid_count();
        if count == 0 {
            return Err(TreeError::corruption("interior node without kids"));
        }
        let first = interior.kid(0)?;
        let last = interior.kid(count - 1)?;
        match (self.kid_limits(store, first)?, self.kid_limits(store, last)?) {
            (Some(first), Some(last)) => Ok(Limits {
                low: first.low,
                high: last.high,
            }),
            _ => Err(TreeError::corruption(format!(
                "boundary kid of interior node has no Limits ({first}, {last})"
            ))),
        }
    }
}

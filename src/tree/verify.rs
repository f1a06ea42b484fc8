use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

use super::codec::{KeyCodec, ValCodec};
use super::definition::Tree;
use super::node::{Limits, Node};
use crate::error::Result;
use crate::objects::{ObjectStore, Reference};

const MAX_FINDINGS: usize = 32;

/// Indicates the severity level of a verification finding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifySeverity {
    /// Non-critical issue that may indicate a problem.
    Warning,
    /// Broken structural invariant.
    Error,
}

/// Represents a single issue discovered during verification.
#[derive(Clone, Debug, Serialize)]
pub struct VerifyFinding {
    /// The severity level of this finding.
    pub severity: VerifySeverity,
    /// Human-readable description of the issue.
    pub message: String,
}

impl VerifyFinding {
    fn new(severity: VerifySeverity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }

    /// Whether this finding marks a broken invariant.
    pub fn is_error(&self) -> bool {
        self.severity == VerifySeverity::Error
    }
}

/// Statistics collected during the verification walk.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct VerifyCounts {
    /// Leaf nodes visited, root included.
    pub leaves: u64,
    /// Interior nodes visited, root included.
    pub interiors: u64,
    /// Key/value pairs found in leaves.
    pub entries: u64,
    /// Number of node levels.
    pub height: u64,
}

/// Complete report of a verification walk.
#[derive(Clone, Debug, Serialize)]
pub struct VerifyReport {
    /// Whether verification found no errors. Warnings do not fail it.
    pub success: bool,
    /// Issues discovered, capped at 32.
    pub findings: Vec<VerifyFinding>,
    /// Statistics about the nodes examined.
    pub counts: VerifyCounts,
}

/// Nested description of a tree's layout.
#[derive(Clone, Debug, Serialize)]
pub struct NodeShape {
    /// Store handle of the node.
    pub reference: String,
    /// `"leaf"` or `"interior"`.
    pub kind: &'static str,
    /// Pairs of a leaf, kids of an interior node.
    pub items: usize,
    /// Stored Limits rendered as `[low high]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limits: Option<String>,
    /// Kid shapes, left to right.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub kids: Vec<NodeShape>,
}

impl NodeShape {
    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(
            f,
            "{:indent$}{} {} items={}",
            "",
            self.reference,
            self.kind,
            self.items,
            indent = depth * 2
        )?;
        if let Some(limits) = &self.limits {
            write!(f, " limits={limits}")?;
        }
        writeln!(f)?;
        for kid in &self.kids {
            kid.write_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for NodeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

struct Walk {
    findings: Vec<VerifyFinding>,
    counts: VerifyCounts,
    leaf_depth: Option<u64>,
}

impl Walk {
    fn push(&mut self, severity: VerifySeverity, message: impl Into<String>) {
        if self.findings.len() < MAX_FINDINGS {
            self.findings.push(VerifyFinding::new(severity, message));
        }
    }

    fn push_error(&mut self, message: impl Into<String>) {
        self.push(VerifySeverity::Error, message);
    }
}

fn render_limits(limits: &Limits) -> String {
    format!("[{} {}]", limits.low, limits.high)
}

impl<C: KeyCodec, V: ValCodec> Tree<C, V> {
    /// Walks the whole tree and checks every structural invariant without
    /// trusting any cached Limits.
    ///
    /// Broken invariants are reported as findings. Only failures that stop
    /// the walk itself, such as a dangling reference, are returned as errors.
    pub fn verify<S>(&self, store: &S) -> Result<VerifyReport>
    where
        S: ObjectStore + ?Sized,
    {
        let mut walk = Walk {
            findings: Vec::new(),
            counts: VerifyCounts::default(),
            leaf_depth: None,
        };
        self.verify_node(store, self.root(), 0, &mut walk)?;
        tracing::debug!(
            target: "doctree::tree",
            root = %self.root(),
            findings = walk.findings.len(),
            entries = walk.counts.entries,
            height = walk.counts.height,
            "verified tree"
        );
        Ok(VerifyReport {
            success: !walk.findings.iter().any(VerifyFinding::is_error),
            findings: walk.findings,
            counts: walk.counts,
        })
    }

    /// Returns the subtree's recomputed key range, `None` when it is empty
    /// or could not be decoded.
    fn verify_node<S>(
        &self,
        store: &S,
        reference: Reference,
        depth: u64,
        walk: &mut Walk,
    ) -> Result<Option<Limits>>
    where
        S: ObjectStore + ?Sized,
    {
        let object = store.resolve(reference)?;
        let node = match Node::from_object(object, self.codec().pairs_field()) {
            Ok(node) => node,
            Err(err) => {
                walk.push_error(format!("node {reference}: {err}"));
                return Ok(None);
            }
        };
        let is_root = reference == self.root();
        walk.counts.height = walk.counts.height.max(depth + 1);

        let len = node.len();
        let max = node.max_len(&self.sizing());
        let min = if is_root {
            match node {
                Node::Leaf(_) => 0,
                Node::Interior(_) => 1,
            }
        } else {
            node.min_len(&self.sizing())
        };
        if is_root && len == 1 && matches!(node, Node::Interior(_)) {
            walk.push(
                VerifySeverity::Warning,
                format!("interior root {reference} has a single kid"),
            );
        }
        if len < min || len > max {
            walk.push_error(format!(
                "{} node {reference} holds {len} items, allowed [{min}, {max}]",
                node.kind()
            ));
        }

        let computed = match &node {
            Node::Leaf(leaf) => {
                walk.counts.leaves += 1;
                walk.counts.entries += leaf.pair_count() as u64;
                match walk.leaf_depth {
                    Some(expected) if expected != depth => walk.push_error(format!(
                        "leaf {reference} sits at depth {depth}, other leaves at {expected}"
                    )),
                    Some(_) => {}
                    None => walk.leaf_depth = Some(depth),
                }
                let mut ordered = true;
                for idx in 0..leaf.pair_count() {
                    let key = leaf.key(idx)?;
                    if let Err(err) = self.codec().unwrap_key(key) {
                        walk.push_error(format!("leaf {reference} pair {idx}: {err}"));
                        ordered = false;
                        continue;
                    }
                    if idx == 0 || !ordered {
                        continue;
                    }
                    if self.codec().compare(leaf.key(idx - 1)?, key)? != Ordering::Less {
                        walk.push_error(format!(
                            "leaf {reference} keys not strictly ascending at pair {idx}"
                        ));
                    }
                }
                if !ordered {
                    return Ok(None);
                }
                match leaf.pair_count() {
                    0 => None,
                    count => Some(Limits {
                        low: leaf.key(0)?.clone(),
                        high: leaf.key(count - 1)?.clone(),
                    }),
                }
            }
            Node::Interior(interior) => {
                walk.counts.interiors += 1;
                let mut span: Option<Limits> = None;
                for (slot, kid) in interior.kids().enumerate() {
                    let Some(range) = self.verify_node(store, kid, depth + 1, walk)? else {
                        continue;
                    };
                    span = Some(match span {
                        None => range,
                        Some(previous) => {
                            match self.codec().compare(&previous.high, &range.low) {
                                Ok(Ordering::Less) => {}
                                Ok(_) => walk.push_error(format!(
                                    "kid {slot} of {reference} overlaps its left sibling"
                                )),
                                Err(err) => walk.push_error(format!(
                                    "kid {slot} of {reference} cannot be ordered: {err}"
                                )),
                            }
                            Limits {
                                low: previous.low,
                                high: range.high,
                            }
                        }
                    });
                }
                span
            }
        };

        let stored = node.limits();
        if is_root && matches!(node, Node::Interior(_)) {
            if stored.is_some() {
                walk.push_error(format!("interior root {reference} carries Limits"));
            }
        } else if stored != computed.as_ref() {
            walk.push_error(format!(
                "{} node {reference} stores Limits {} but holds {}",
                node.kind(),
                stored.map_or_else(|| "none".to_string(), render_limits),
                computed
                    .as_ref()
                    .map_or_else(|| "nothing".to_string(), render_limits)
            ));
        }
        Ok(computed)
    }

    /// Describes the current layout of the tree, root first.
    pub fn shape<S>(&self, store: &S) -> Result<NodeShape>
    where
        S: ObjectStore + ?Sized,
    {
        self.shape_of(store, self.root())
    }

    fn shape_of<S>(&self, store: &S, reference: Reference) -> Result<NodeShape>
    where
        S: ObjectStore + ?Sized,
    {
        let node = self.load(store, reference)?;
        let kids = match &node {
            Node::Leaf(_) => Vec::new(),
            Node::Interior(interior) => interior
                .kids()
                .map(|kid| self.shape_of(store, kid))
                .collect::<Result<_>>()?,
        };
        Ok(NodeShape {
            reference: reference.to_string(),
            kind: node.kind(),
            items: node.len(),
            limits: node.limits().map(render_limits),
            kids,
        })
    }
}

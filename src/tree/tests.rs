use super::{Limits, Node, NumberTree, Tree, TreeOptions};
use crate::error::{Result, TreeError};
use crate::objects::{Array, Dictionary, MemoryStore, Name, Object, ObjectStore, Reference};
use crate::tree::{NameKeys, NumberKeys};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

fn number_tree(store: &mut MemoryStore, order: usize) -> Result<NumberTree<i64>> {
    Tree::create(store, NumberKeys, TreeOptions::with_order(order))
}

fn kid_refs(store: &MemoryStore, reference: Reference) -> Result<Vec<Reference>> {
    match Node::from_object(store.resolve(reference)?, Name::NUMS)? {
        Node::Interior(interior) => Ok(interior.kids().collect()),
        Node::Leaf(_) => Ok(Vec::new()),
    }
}

fn node_at(store: &MemoryStore, reference: Reference) -> Result<Node> {
    Node::from_object(store.resolve(reference)?, Name::NUMS)
}

fn int_limits(low: i64, high: i64) -> Limits {
    Limits {
        low: Object::Integer(low),
        high: Object::Integer(high),
    }
}

fn assert_verified(tree: &NumberTree<i64>, store: &MemoryStore) -> Result<()> {
    let report = tree.verify(store)?;
    assert!(report.success, "verification failed: {:?}", report.findings);
    Ok(())
}

#[test]
fn ascending_inserts_split_root_once() -> Result<()> {
    let mut store = MemoryStore::new();
    let tree = number_tree(&mut store, 5)?;
    for key in 1..=21 {
        assert_eq!(tree.put(&mut store, &key, &(key * 10))?, None);
    }

    let stats = tree.stats_snapshot();
    assert_eq!(stats.leaf_splits, 1);
    assert_eq!(stats.internal_splits, 0);
    assert_eq!(stats.root_demotions, 1);

    let root = node_at(&store, tree.root())?;
    assert!(matches!(root, Node::Interior(_)));
    assert_eq!(root.limits(), None);
    let kids = kid_refs(&store, tree.root())?;
    assert_eq!(kids.len(), 2);
    let lower = node_at(&store, kids[0])?;
    let upper = node_at(&store, kids[1])?;
    assert_eq!(lower.len(), 10);
    assert_eq!(upper.len(), 11);
    assert_eq!(lower.limits(), Some(&int_limits(1, 10)));
    assert_eq!(upper.limits(), Some(&int_limits(11, 21)));
    assert_eq!(store.live_objects(), 3);
    assert_verified(&tree, &store)
}

#[test]
fn put_replaces_existing_value() -> Result<()> {
    let mut store = MemoryStore::new();
    let tree = number_tree(&mut store, 5)?;
    assert_eq!(tree.put(&mut store, &7, &70)?, None);
    assert_eq!(tree.put(&mut store, &7, &71)?, Some(70));
    assert_eq!(tree.get(&store, &7)?, Some(71));
    assert_eq!(tree.len(&store)?, 1);
    Ok(())
}

#[test]
fn put_then_remove_restores_empty_root() -> Result<()> {
    let mut store = MemoryStore::new();
    let tree = number_tree(&mut store, 5)?;
    tree.put(&mut store, &42, &1)?;
    let root = store.resolve(tree.root())?.as_dictionary().cloned();
    assert!(root.is_some_and(|dict| dict.contains_key(Name::LIMITS)));

    assert_eq!(tree.remove(&mut store, &42)?, Some(1));
    let root = store
        .resolve(tree.root())?
        .as_dictionary()
        .cloned()
        .expect("root is a dictionary");
    assert!(!root.contains_key(Name::LIMITS));
    assert_eq!(root.get(Name::NUMS), Some(&Object::Array(Array::new())));
    assert!(tree.is_empty(&store)?);
    assert_eq!(store.live_objects(), 1);
    Ok(())
}

#[test]
fn missing_keys_are_absent() -> Result<()> {
    let mut store = MemoryStore::new();
    let tree = number_tree(&mut store, 5)?;
    assert_eq!(tree.get(&store, &1)?, None);
    assert_eq!(tree.remove(&mut store, &1)?, None);
    tree.extend(&mut store, (0..50).map(|k| (k * 2, k)))?;
    assert_eq!(tree.get(&store, &-5)?, None);
    assert_eq!(tree.get(&store, &31)?, None);
    assert_eq!(tree.get(&store, &1000)?, None);
    assert!(!tree.contains_key(&store, &77)?);
    assert!(tree.contains_key(&store, &98)?);
    assert_eq!(tree.remove(&mut store, &31)?, None);
    assert_eq!(tree.len(&store)?, 50);
    assert_verified(&tree, &store)
}

#[test]
fn deleting_down_to_one_leaf_collapses_root() -> Result<()> {
    let mut store = MemoryStore::new();
    let tree = number_tree(&mut store, 5)?;
    for key in 1..=21 {
        tree.put(&mut store, &key, &key)?;
    }

    // First removal borrows from the right sibling, the second merges.
    assert_eq!(tree.remove(&mut store, &1)?, Some(1));
    assert_eq!(tree.stats_snapshot().borrows, 1);
    assert!(matches!(node_at(&store, tree.root())?, Node::Interior(_)));
    assert_verified(&tree, &store)?;

    assert_eq!(tree.remove(&mut store, &2)?, Some(2));
    let stats = tree.stats_snapshot();
    assert_eq!(stats.leaf_merges, 1);
    assert_eq!(stats.root_collapses, 1);

    let root = node_at(&store, tree.root())?;
    assert!(matches!(root, Node::Leaf(_)));
    assert_eq!(root.len(), 19);
    assert_eq!(root.limits(), Some(&int_limits(3, 21)));
    assert_eq!(store.live_objects(), 1);
    assert_verified(&tree, &store)
}

#[test]
fn removing_boundary_key_refreshes_ancestor_limits() -> Result<()> {
    let mut store = MemoryStore::new();
    let tree = number_tree(&mut store, 2)?;
    for key in 0..60 {
        tree.put(&mut store, &key, &key)?;
    }
    assert!(tree.verify(&store)?.counts.height >= 3);

    for key in [59, 58, 0, 1] {
        tree.remove(&mut store, &key)?;
        assert_verified(&tree, &store)?;
    }
    let kids = kid_refs(&store, tree.root())?;
    let first = node_at(&store, kids[0])?;
    let last = node_at(&store, kids[kids.len() - 1])?;
    assert_eq!(first.limits().map(|l| &l.low), Some(&Object::Integer(2)));
    assert_eq!(last.limits().map(|l| &l.high), Some(&Object::Integer(57)));
    Ok(())
}

#[test]
fn random_three_level_tree_survives_deletions() -> Result<()> {
    let mut rng = ChaCha8Rng::seed_from_u64(0x7ee5);
    let mut store = MemoryStore::new();
    let tree = number_tree(&mut store, 5)?;
    let mut reference = BTreeMap::new();
    while reference.len() < 400 {
        let key = rng.gen_range(0..10_000i64);
        let value = rng.gen::<i64>();
        assert_eq!(tree.put(&mut store, &key, &value)?, reference.insert(key, value));
    }
    let report = tree.verify(&store)?;
    assert!(report.success, "{:?}", report.findings);
    assert!(report.counts.height >= 3);
    assert_eq!(report.counts.entries, 400);

    let mut keys: Vec<i64> = reference.keys().copied().collect();
    let mut removed = Vec::with_capacity(240);
    for _ in 0..240 {
        let key = keys.swap_remove(rng.gen_range(0..keys.len()));
        assert_eq!(tree.remove(&mut store, &key)?, reference.remove(&key));
        assert_verified(&tree, &store)?;
        removed.push(key);
    }
    for key in &removed {
        assert_eq!(tree.get(&store, key)?, None, "key {key} still present");
        assert!(!tree.contains_key(&store, key)?);
    }
    for (key, value) in &reference {
        assert_eq!(tree.get(&store, key)?, Some(*value));
    }
    let collected: Vec<(i64, i64)> = tree.entries(&store).collect::<Result<_>>()?;
    let expected: Vec<(i64, i64)> = reference.into_iter().collect();
    assert_eq!(collected, expected);
    Ok(())
}

#[test]
fn order_one_tree_keeps_bounds() -> Result<()> {
    let mut rng = ChaCha8Rng::seed_from_u64(0x01);
    let mut store = MemoryStore::new();
    let tree = number_tree(&mut store, 1)?;
    let mut reference = BTreeMap::new();
    for _ in 0..1_500 {
        let key = rng.gen_range(0..200i64);
        if rng.gen_bool(0.6) {
            assert_eq!(tree.put(&mut store, &key, &key)?, reference.insert(key, key));
        } else {
            assert_eq!(tree.remove(&mut store, &key)?, reference.remove(&key));
        }
        let report = tree.verify(&store)?;
        assert!(report.success, "{:?}", report.findings);
        let nodes = report.counts.leaves + report.counts.interiors;
        assert_eq!(store.live_objects() as u64, nodes);
    }
    let collected: Vec<(i64, i64)> = tree.entries(&store).collect::<Result<_>>()?;
    assert_eq!(collected, reference.into_iter().collect::<Vec<_>>());
    Ok(())
}

#[test]
fn traversal_reflects_current_contents() -> Result<()> {
    let mut store = MemoryStore::new();
    let tree = number_tree(&mut store, 2)?;
    for key in (0..30).rev() {
        tree.put(&mut store, &key, &(key + 100))?;
    }
    let keys: Vec<i64> = tree.keys(&store).collect::<Result<_>>()?;
    assert_eq!(keys, (0..30).collect::<Vec<_>>());

    for key in 10..20 {
        tree.remove(&mut store, &key)?;
    }
    let keys: Vec<i64> = tree.keys(&store).collect::<Result<_>>()?;
    assert_eq!(keys.len(), 20);
    assert!(keys.windows(2).all(|w| w[0] < w[1]));
    let values: Vec<i64> = tree.values(&store).collect::<Result<_>>()?;
    assert_eq!(values[0], 100);
    assert_eq!(values[19], 129);

    let mut lazy = tree.entries(&store);
    assert_eq!(lazy.next().transpose()?, Some((0, 100)));
    assert_eq!(tree.entries(&store).count(), 20);
    Ok(())
}

#[test]
fn name_tree_orders_bytewise() -> Result<()> {
    let mut store = MemoryStore::new();
    let tree: Tree<NameKeys, Vec<u8>> =
        Tree::create(&mut store, NameKeys, TreeOptions::with_order(2))?;
    for name in ["delta", "Alpha", "alpha", "beta", "alphabet", "Zulu", "charlie"] {
        tree.put(&mut store, &name.as_bytes().to_vec(), &name.to_uppercase().into_bytes())?;
    }
    let keys: Vec<Vec<u8>> = tree.keys(&store).collect::<Result<_>>()?;
    let expected: Vec<Vec<u8>> = ["Alpha", "Zulu", "alpha", "alphabet", "beta", "charlie", "delta"]
        .iter()
        .map(|k| k.as_bytes().to_vec())
        .collect();
    assert_eq!(keys, expected);
    assert_eq!(tree.get(&store, &b"beta".to_vec())?, Some(b"BETA".to_vec()));
    let dict = store.resolve(tree.root())?.as_dictionary().cloned();
    assert!(dict.is_some_and(|d| d.contains_key(Name::NAMES)));
    Ok(())
}

#[test]
fn clear_releases_every_node_but_root() -> Result<()> {
    let mut store = MemoryStore::new();
    let tree = number_tree(&mut store, 2)?;
    tree.extend(&mut store, (0..100).map(|k| (k, k)))?;
    assert!(store.live_objects() > 1);
    let root = tree.root();

    tree.clear(&mut store)?;
    assert_eq!(store.live_objects(), 1);
    assert_eq!(tree.root(), root);
    assert!(tree.is_empty(&store)?);
    assert_eq!(tree.len(&store)?, 0);
    assert_eq!(tree.keys(&store).count(), 0);

    tree.put(&mut store, &5, &6)?;
    assert_eq!(tree.get(&store, &5)?, Some(6));
    Ok(())
}

#[test]
fn tree_reopens_from_root_reference() -> Result<()> {
    let mut store = MemoryStore::new();
    let root = {
        let tree = number_tree(&mut store, 3)?;
        tree.extend(&mut store, (0..40).map(|k| (k, -k)))?;
        tree.root()
    };
    let options = TreeOptions {
        order: 3,
        verify_on_open: true,
    };
    let tree: NumberTree<i64> = Tree::open(&store, root, NumberKeys, options)?;
    assert_eq!(tree.get(&store, &39)?, Some(-39));
    assert_eq!(tree.len(&store)?, 40);
    Ok(())
}

#[test]
fn verify_on_open_rejects_stale_limits() -> Result<()> {
    let mut store = MemoryStore::new();
    let tree = number_tree(&mut store, 5)?;
    for key in 1..=21 {
        tree.put(&mut store, &key, &key)?;
    }
    let kids = kid_refs(&store, tree.root())?;
    let mut lower = node_at(&store, kids[0])?;
    lower.set_limits(Some(int_limits(1, 9)));
    store.mutate(kids[0], lower.into_object(Name::NUMS))?;

    let lenient = TreeOptions::default();
    assert!(Tree::<NumberKeys, i64>::open(&store, tree.root(), NumberKeys, lenient).is_ok());
    let strict = TreeOptions {
        verify_on_open: true,
        ..TreeOptions::default()
    };
    let err = Tree::<NumberKeys, i64>::open(&store, tree.root(), NumberKeys, strict)
        .err()
        .expect("stale Limits must fail verification");
    assert!(matches!(err, TreeError::Corruption(_)));
    Ok(())
}

#[test]
fn malformed_nodes_surface_as_corruption() -> Result<()> {
    let mut store = MemoryStore::new();
    let tree = number_tree(&mut store, 5)?;
    for key in 1..=21 {
        tree.put(&mut store, &key, &key)?;
    }
    let kids = kid_refs(&store, tree.root())?;

    let mut no_limits = Dictionary::new();
    no_limits.insert(
        Name::NUMS,
        Object::Array(Array::from(vec![Object::Integer(1), Object::Integer(1)])),
    );
    store.mutate(kids[0], Object::Dictionary(no_limits))?;
    assert!(matches!(tree.get(&store, &1), Err(TreeError::Corruption(_))));

    store.mutate(kids[0], Object::Integer(3))?;
    assert!(matches!(tree.get(&store, &1), Err(TreeError::Corruption(_))));
    let report = tree.verify(&store)?;
    assert!(!report.success);
    assert!(report.findings.iter().any(|f| f.message.contains("integer")));

    let entries: Vec<Result<(i64, i64)>> = tree.entries(&store).collect();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].is_err());
    Ok(())
}

#[test]
fn foreign_keys_are_key_domain_errors() -> Result<()> {
    let mut store = MemoryStore::new();
    let mut leaf = Dictionary::new();
    leaf.insert(
        Name::NUMS,
        Object::Array(Array::from(vec![Object::from("one"), Object::Integer(1)])),
    );
    let root = store.register(Object::Dictionary(leaf))?;
    let tree: NumberTree<i64> = Tree::open(&store, root, NumberKeys, TreeOptions::default())?;
    let err = tree.get(&store, &1).err().expect("string key in number tree");
    assert!(matches!(
        err,
        TreeError::KeyDomain {
            expected: "integer",
            found: "string"
        }
    ));
    assert!(tree.keys(&store).next().is_some_and(|k| k.is_err()));
    Ok(())
}

#[test]
fn open_rejects_non_node_root_and_zero_order() {
    let mut store = MemoryStore::new();
    let root = store.register(Object::Null).expect("register");
    assert!(matches!(
        Tree::<NumberKeys, i64>::open(&store, root, NumberKeys, TreeOptions::default()),
        Err(TreeError::Corruption(_))
    ));
    assert!(matches!(
        Tree::<NumberKeys, i64>::create(&mut store, NumberKeys, TreeOptions::with_order(0)),
        Err(TreeError::InvalidArgument(_))
    ));
    let stale = Reference::new(99, 0);
    assert!(matches!(
        Tree::<NumberKeys, i64>::open(&store, stale, NumberKeys, TreeOptions::default()),
        Err(TreeError::InvalidReference(_))
    ));
}

#[test]
fn interior_splits_and_merges_are_counted() -> Result<()> {
    let mut store = MemoryStore::new();
    let tree = number_tree(&mut store, 2)?;
    tree.extend(&mut store, (0..200).map(|k| (k, k)))?;
    let grown = tree.stats_snapshot();
    assert!(grown.internal_splits > 0);
    assert!(grown.root_demotions >= 2);
    assert!(grown.internal_searches > 0);

    for key in 0..200 {
        tree.remove(&mut store, &key)?;
    }
    let shrunk = tree.stats_snapshot();
    assert!(shrunk.internal_merges > 0);
    assert!(shrunk.root_collapses >= 2);
    assert!(tree.is_empty(&store)?);
    assert_eq!(store.live_objects(), 1);
    assert_verified(&tree, &store)
}

#[test]
fn shape_describes_layout() -> Result<()> {
    let mut store = MemoryStore::new();
    let tree = number_tree(&mut store, 5)?;
    for key in 1..=21 {
        tree.put(&mut store, &key, &key)?;
    }
    let shape = tree.shape(&store)?;
    assert_eq!(shape.kind, "interior");
    assert_eq!(shape.limits, None);
    assert_eq!(shape.kids.len(), 2);
    assert_eq!(shape.kids[0].limits.as_deref(), Some("[1 10]"));
    assert_eq!(shape.kids[1].items, 11);

    let rendered = shape.to_string();
    assert_eq!(rendered.lines().count(), 3);
    assert!(rendered.lines().nth(1).is_some_and(|l| l.starts_with("  ")));
    Ok(())
}

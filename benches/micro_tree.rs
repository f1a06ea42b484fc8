//! Micro benchmarks for the balanced name/number tree.
#![forbid(unsafe_code)]
#![allow(missing_docs)]

use criterion::{
    black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput,
};
use doctree::tree::{NumberKeys, NumberTree, Tree, TreeOptions};
use doctree::MemoryStore;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const INSERT_COUNT: i64 = 16_384;
const LOOKUP_SAMPLES: usize = 4_096;

fn micro_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("micro/tree");
    group.sample_size(30);

    group.throughput(Throughput::Elements(INSERT_COUNT as u64));
    group.bench_function("sequential_insert", |b| {
        b.iter_batched(
            FreshTree::new,
            |mut tree| {
                tree.insert_sequence(INSERT_COUNT);
                black_box(tree.tree.root());
            },
            BatchSize::SmallInput,
        );
    });

    let mut random_keys: Vec<i64> = (0..INSERT_COUNT).collect();
    random_keys.shuffle(&mut ChaCha8Rng::seed_from_u64(0xBEEF_F00D));
    group.throughput(Throughput::Elements(INSERT_COUNT as u64));
    group.bench_function("random_insert", |b| {
        b.iter_batched(
            FreshTree::new,
            |mut tree| {
                tree.insert_keys(&random_keys);
                black_box(tree.tree.root());
            },
            BatchSize::SmallInput,
        );
    });

    group.throughput(Throughput::Elements(INSERT_COUNT as u64));
    group.bench_function("delete_random", |b| {
        b.iter_batched(
            || {
                let mut tree = FreshTree::new();
                tree.insert_sequence(INSERT_COUNT);
                tree
            },
            |mut tree| {
                tree.delete_keys(&random_keys);
                black_box(tree.tree.root());
            },
            BatchSize::SmallInput,
        );
    });

    let mut loaded = LoadedTree::new(INSERT_COUNT);
    group.throughput(Throughput::Elements(LOOKUP_SAMPLES as u64));
    group.bench_function(BenchmarkId::new("point_lookup", LOOKUP_SAMPLES), |b| {
        b.iter(|| loaded.point_lookup(LOOKUP_SAMPLES));
    });

    group.throughput(Throughput::Elements(INSERT_COUNT as u64));
    group.bench_function("full_scan", |b| {
        b.iter(|| loaded.full_scan());
    });

    group.finish();
}

struct FreshTree {
    store: MemoryStore,
    tree: NumberTree<i64>,
}

impl FreshTree {
    fn new() -> Self {
        let mut store = MemoryStore::new();
        let tree = Tree::create(&mut store, NumberKeys, TreeOptions::default()).expect("tree");
        Self { store, tree }
    }

    fn insert_sequence(&mut self, count: i64) {
        for key in 0..count {
            self.tree.put(&mut self.store, &key, &key).expect("insert");
        }
    }

    fn insert_keys(&mut self, keys: &[i64]) {
        for key in keys {
            self.tree.put(&mut self.store, key, key).expect("insert");
        }
    }

    fn delete_keys(&mut self, keys: &[i64]) {
        for key in keys {
            self.tree.remove(&mut self.store, key).expect("remove");
        }
    }
}

struct LoadedTree {
    fresh: FreshTree,
    max_key: i64,
    rng: ChaCha8Rng,
}

impl LoadedTree {
    fn new(count: i64) -> Self {
        let mut fresh = FreshTree::new();
        fresh.insert_sequence(count);
        Self {
            fresh,
            max_key: count,
            rng: ChaCha8Rng::seed_from_u64(0xFEED_FACE),
        }
    }

    fn point_lookup(&mut self, samples: usize) {
        for _ in 0..samples {
            let key = self.rng.gen_range(0..self.max_key);
            black_box(self.fresh.tree.get(&self.fresh.store, &key).expect("get"));
        }
    }

    fn full_scan(&self) {
        for entry in self.fresh.tree.entries(&self.fresh.store) {
            black_box(entry.expect("entry"));
        }
    }
}

criterion_group!(benches, micro_tree);
criterion_main!(benches);

//! Benchmarks for the intrusive containers against their std counterparts.
//!
//! Run with: cargo bench
//!
//! Record storage is allocated once per group; containers are rebuilt and
//! torn down inside each iteration.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use nexus_intrusive::{
    HashMap, HashNode, Hashed, Heap, HeapEntry, HeapNode, Linked, List, ListNode, RbNode, RbTree,
    TreeEntry,
};

const COUNT: usize = 10_000;

#[derive(Default)]
struct Rec {
    key: u64,
    link: ListNode<u32>,
    heap: HeapNode,
    hash: HashNode<u32>,
    tree: RbNode<u32>,
}

impl Linked<u32> for Rec {
    fn list_node(&self) -> &ListNode<u32> {
        &self.link
    }
    fn list_node_mut(&mut self) -> &mut ListNode<u32> {
        &mut self.link
    }
}

impl HeapEntry for Rec {
    fn heap_node(&self) -> &HeapNode {
        &self.heap
    }
    fn heap_node_mut(&mut self) -> &mut HeapNode {
        &mut self.heap
    }
}

impl Hashed<u32> for Rec {
    fn hash_node(&self) -> &HashNode<u32> {
        &self.hash
    }
    fn hash_node_mut(&mut self) -> &mut HashNode<u32> {
        &mut self.hash
    }
}

impl TreeEntry<u32> for Rec {
    fn tree_node(&self) -> &RbNode<u32> {
        &self.tree
    }
    fn tree_node_mut(&mut self) -> &mut RbNode<u32> {
        &mut self.tree
    }
}

/// Keys in scrambled order (multiplicative permutation of `0..COUNT`).
fn scrambled_keys() -> Vec<u64> {
    (0..COUNT as u64).map(|i| (i * 7919) % COUNT as u64).collect()
}

fn records() -> Vec<Rec> {
    scrambled_keys()
        .into_iter()
        .map(|key| Rec {
            key,
            ..Default::default()
        })
        .collect()
}

fn by_key(a: &Rec, b: &Rec) -> bool {
    a.key <= b.key
}

fn mix(key: &u64) -> u64 {
    key.wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

fn match_key(rec: &Rec, key: &u64) -> bool {
    rec.key == *key
}

fn compare_key(rec: &Rec, key: &u64) -> Ordering {
    rec.key.cmp(key)
}

// ============================================================================
// List
// ============================================================================

fn bench_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("list");
    group.throughput(Throughput::Elements(COUNT as u64));

    let mut storage = records();
    let mut list: List<u32> = List::new();

    group.bench_function("append+remove_middle_out", |b| {
        b.iter(|| {
            for idx in 0..COUNT as u32 {
                list.append(&mut storage, idx);
            }
            for idx in (0..COUNT as u32).rev() {
                list.remove(&mut storage, black_box(idx));
            }
        });
    });

    group.bench_function("append+clear", |b| {
        b.iter(|| {
            for idx in 0..COUNT as u32 {
                list.append(&mut storage, idx);
            }
            list.clear(&mut storage);
        });
    });

    group.finish();
}

// ============================================================================
// Heap
// ============================================================================

fn bench_heap(c: &mut Criterion) {
    let mut group = c.benchmark_group("heap");
    group.throughput(Throughput::Elements(COUNT as u64));

    let mut storage = records();
    let mut heap: Heap<u32, _> = Heap::with_capacity(COUNT, by_key);
    let keys = scrambled_keys();
    let mut std_heap = BinaryHeap::with_capacity(COUNT);

    group.bench_function("nexus-intrusive/insert+pop", |b| {
        b.iter(|| {
            for idx in 0..COUNT as u32 {
                heap.insert(&mut storage, idx);
            }
            while let Some(idx) = heap.pop(&mut storage) {
                black_box(idx);
            }
        });
    });

    group.bench_function("nexus-intrusive/insert+remove_any", |b| {
        b.iter(|| {
            for idx in 0..COUNT as u32 {
                heap.insert(&mut storage, idx);
            }
            for idx in 0..COUNT as u32 {
                heap.remove(&mut storage, black_box(idx));
            }
        });
    });

    group.bench_function("std/insert+pop", |b| {
        b.iter(|| {
            for &key in &keys {
                std_heap.push(std::cmp::Reverse(key));
            }
            while let Some(key) = std_heap.pop() {
                black_box(key);
            }
        });
    });

    group.finish();
}

// ============================================================================
// HashMap
// ============================================================================

fn bench_hash_map(c: &mut Criterion) {
    let mut group = c.benchmark_group("hash_map");
    group.throughput(Throughput::Elements(COUNT as u64));

    let mut storage = records();
    let keys = scrambled_keys();
    let mut map: HashMap<u32, _, _> = HashMap::new(mix, match_key);

    group.bench_function("nexus-intrusive/insert+remove", |b| {
        b.iter(|| {
            for (idx, key) in keys.iter().enumerate() {
                map.insert(&mut storage, idx as u32, key);
            }
            for idx in 0..COUNT as u32 {
                map.remove(&mut storage, idx);
            }
        });
    });

    for (idx, key) in keys.iter().enumerate() {
        map.insert(&mut storage, idx as u32, key);
    }
    group.bench_function("nexus-intrusive/find", |b| {
        b.iter(|| {
            for key in &keys {
                black_box(map.find(&storage, key));
            }
        });
    });
    map.clear(&mut storage);

    let std_map: std::collections::HashMap<u64, u32> =
        keys.iter().enumerate().map(|(idx, &key)| (key, idx as u32)).collect();
    group.bench_function("std/find", |b| {
        b.iter(|| {
            for key in &keys {
                black_box(std_map.get(key));
            }
        });
    });

    group.finish();
}

// ============================================================================
// RbTree
// ============================================================================

fn bench_rb_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("rb_tree");
    group.throughput(Throughput::Elements(COUNT as u64));

    let mut storage = records();
    let keys = scrambled_keys();
    let mut tree: RbTree<u32, _, _> = RbTree::new(by_key, compare_key);
    let mut std_map = BTreeMap::new();

    group.bench_function("nexus-intrusive/insert+remove", |b| {
        b.iter(|| {
            for idx in 0..COUNT as u32 {
                tree.insert(&mut storage, idx);
            }
            for idx in 0..COUNT as u32 {
                tree.remove(&mut storage, black_box(idx));
            }
        });
    });

    group.bench_function("std/insert+remove", |b| {
        b.iter(|| {
            for (idx, &key) in keys.iter().enumerate() {
                std_map.insert(key, idx as u32);
            }
            for key in &keys {
                black_box(std_map.remove(key));
            }
        });
    });

    for idx in 0..COUNT as u32 {
        tree.insert(&mut storage, idx);
    }
    group.bench_function("nexus-intrusive/find", |b| {
        b.iter(|| {
            for key in &keys {
                black_box(tree.find(&storage, key));
            }
        });
    });
    group.bench_function("nexus-intrusive/iter", |b| {
        b.iter(|| {
            for idx in tree.iter(&storage) {
                black_box(idx);
            }
        });
    });
    tree.clear(&mut storage);

    group.finish();
}

criterion_group!(benches, bench_list, bench_heap, bench_hash_map, bench_rb_tree);
criterion_main!(benches);

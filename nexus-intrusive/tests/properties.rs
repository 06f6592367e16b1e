//! Model-based property tests: random operation sequences checked against
//! std collections after every step.

use std::cmp::Ordering;
use std::collections::VecDeque;

use nexus_intrusive::{
    HashMap, HashNode, Hashed, Heap, HeapEntry, HeapNode, Linked, List, ListNode, RbNode, RbTree,
    TreeEntry,
};
use proptest::prelude::*;

const RECORDS: usize = 64;

#[derive(Debug, Default)]
struct Rec {
    key: u8,
    link: ListNode<u16>,
    heap: HeapNode,
    hash: HashNode<u16>,
    tree: RbNode<u16>,
}

impl Linked<u16> for Rec {
    fn list_node(&self) -> &ListNode<u16> {
        &self.link
    }
    fn list_node_mut(&mut self) -> &mut ListNode<u16> {
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

impl Hashed<u16> for Rec {
    fn hash_node(&self) -> &HashNode<u16> {
        &self.hash
    }
    fn hash_node_mut(&mut self) -> &mut HashNode<u16> {
        &mut self.hash
    }
}

impl TreeEntry<u16> for Rec {
    fn tree_node(&self) -> &RbNode<u16> {
        &self.tree
    }
    fn tree_node_mut(&mut self) -> &mut RbNode<u16> {
        &mut self.tree
    }
}

/// Records with small keys, so duplicates are common.
fn records(keys: &[u8]) -> Vec<Rec> {
    keys.iter()
        .map(|&key| Rec {
            key,
            ..Default::default()
        })
        .collect()
}

fn by_key(a: &Rec, b: &Rec) -> bool {
    a.key <= b.key
}

/// Deliberately weak hash: collisions and shared low bits.
fn hash_key(key: &u8) -> u64 {
    u64::from(*key % 24)
}

fn match_key(rec: &Rec, key: &u8) -> bool {
    rec.key == *key
}

fn compare_key(rec: &Rec, key: &u8) -> Ordering {
    rec.key.cmp(key)
}

#[derive(Debug, Clone)]
enum Op {
    /// Insert the record if it is not a member; otherwise remove it.
    Toggle(u16),
    /// Insert at the front (list) or pop the minimum (heap).
    Front(u16),
    Clear,
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let idx = 0..RECORDS as u16;
    let op = prop_oneof![
        70 => idx.clone().prop_map(Op::Toggle),
        25 => idx.prop_map(Op::Front),
        1 => Just(Op::Clear),
    ];
    prop::collection::vec(op, 0..=400)
}

fn keys_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0u8..40, RECORDS)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn list_matches_deque(keys in keys_strategy(), ops in ops_strategy()) {
        let mut storage = records(&keys);
        let mut list: List<u16> = List::new();
        let mut model: VecDeque<u16> = VecDeque::new();

        for op in ops {
            match op {
                Op::Toggle(idx) => {
                    if let Some(pos) = model.iter().position(|&m| m == idx) {
                        list.remove(&mut storage, idx);
                        model.remove(pos);
                    } else {
                        list.append(&mut storage, idx);
                        model.push_back(idx);
                    }
                }
                Op::Front(idx) => {
                    if !model.contains(&idx) {
                        list.prepend(&mut storage, idx);
                        model.push_front(idx);
                    }
                }
                Op::Clear => {
                    // Records removed earlier keep their stale links.
                    let members = std::mem::take(&mut model);
                    list.clear(&mut storage);
                    prop_assert!(members.iter().all(|&m| storage[m as usize].link.is_reset()));
                }
            }

            list.validate(&storage);
            prop_assert!(list.iter(&storage).eq(model.iter().copied()));
            prop_assert!(list.iter(&storage).rev().eq(model.iter().rev().copied()));
        }
    }

    #[test]
    fn heap_matches_sorted_model(keys in keys_strategy(), ops in ops_strategy()) {
        let mut storage = records(&keys);
        let mut heap: Heap<u16, _> = Heap::new(by_key);
        let mut model: Vec<u16> = Vec::new();

        for op in ops {
            match op {
                Op::Toggle(idx) => {
                    if let Some(pos) = model.iter().position(|&m| m == idx) {
                        heap.remove(&mut storage, idx);
                        model.swap_remove(pos);
                    } else {
                        heap.insert(&mut storage, idx);
                        model.push(idx);
                    }
                }
                Op::Front(_) => {
                    let popped = heap.pop(&mut storage);
                    let min = model.iter().map(|&m| keys[m as usize]).min();
                    prop_assert_eq!(popped.map(|idx| keys[idx as usize]), min);
                    if let Some(idx) = popped {
                        let pos = model.iter().position(|&m| m == idx).unwrap();
                        model.swap_remove(pos);
                    }
                }
                Op::Clear => {
                    // Records removed earlier keep their stale links.
                    let members = std::mem::take(&mut model);
                    heap.clear(&mut storage);
                    prop_assert!(members.iter().all(|&m| storage[m as usize].heap.is_reset()));
                }
            }

            heap.validate(&storage);
            prop_assert_eq!(heap.len(), model.len());
            let top_key = heap.top().map(|idx| keys[idx as usize]);
            prop_assert_eq!(top_key, model.iter().map(|&m| keys[m as usize]).min());
        }
    }

    #[test]
    fn hash_map_matches_model(keys in keys_strategy(), ops in ops_strategy()) {
        let mut storage = records(&keys);
        let mut map: HashMap<u16, _, _> = HashMap::new(hash_key, match_key);
        let mut model: Vec<u16> = Vec::new();

        for op in ops {
            match op {
                Op::Toggle(idx) | Op::Front(idx) => {
                    if let Some(pos) = model.iter().position(|&m| m == idx) {
                        map.remove(&mut storage, idx);
                        model.swap_remove(pos);
                    } else {
                        let key = keys[idx as usize];
                        map.insert(&mut storage, idx, &key);
                        model.push(idx);
                    }
                }
                Op::Clear => {
                    // Records removed earlier keep their stale links.
                    let members = std::mem::take(&mut model);
                    map.clear(&mut storage);
                    prop_assert!(members.iter().all(|&m| storage[m as usize].hash.is_reset()));
                }
            }

            map.validate(&storage);
            prop_assert_eq!(map.len(), model.len());
            prop_assert!(map.load_factor() <= map.max_load_factor());

            for key in 0u8..40 {
                let found = map.find(&storage, &key);
                let present = model.iter().any(|&m| keys[m as usize] == key);
                prop_assert_eq!(found.is_some(), present);
                if let Some(idx) = found {
                    prop_assert!(model.contains(&idx));
                    prop_assert_eq!(keys[idx as usize], key);
                }
            }

            let mut members: Vec<u16> = map.iter(&storage).collect();
            members.sort_unstable();
            let mut expected = model.clone();
            expected.sort_unstable();
            prop_assert_eq!(members, expected);
        }
    }

    #[test]
    fn rb_tree_matches_sorted_model(keys in keys_strategy(), ops in ops_strategy()) {
        let mut storage = records(&keys);
        let mut tree: RbTree<u16, _, _> = RbTree::new(by_key, compare_key);
        let mut model: Vec<u16> = Vec::new();

        for op in ops {
            match op {
                Op::Toggle(idx) | Op::Front(idx) => {
                    if let Some(pos) = model.iter().position(|&m| m == idx) {
                        tree.remove(&mut storage, idx);
                        model.swap_remove(pos);
                    } else {
                        tree.insert(&mut storage, idx);
                        model.push(idx);
                    }
                }
                Op::Clear => {
                    // Records removed earlier keep their stale links.
                    let members = std::mem::take(&mut model);
                    tree.clear(&mut storage);
                    prop_assert!(members.iter().all(|&m| storage[m as usize].tree.is_reset()));
                }
            }

            tree.validate(&storage);
            prop_assert_eq!(tree.len(), model.len());

            let mut expected: Vec<u8> = model.iter().map(|&m| keys[m as usize]).collect();
            expected.sort_unstable();
            let forward: Vec<u8> = tree.iter(&storage).map(|idx| keys[idx as usize]).collect();
            prop_assert_eq!(&forward, &expected);
            let mut backward: Vec<u8> = tree.iter_rev(&storage).map(|idx| keys[idx as usize]).collect();
            backward.reverse();
            prop_assert_eq!(&backward, &expected);

            for key in 0u8..40 {
                let found = tree.find(&storage, &key);
                prop_assert_eq!(found.is_some(), expected.binary_search(&key).is_ok());
                if let Some(idx) = found {
                    prop_assert_eq!(keys[idx as usize], key);
                }
            }
        }
    }
}

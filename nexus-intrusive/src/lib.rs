//! Intrusive containers over caller-owned record storage.
//!
//! Records live in storage the caller owns (a `Vec`, an array, a
//! `slab::Slab`). Each record embeds one small link field per container it
//! can join, and the containers only ever rewrite those link fields:
//!
//! ```text
//! Storage (Vec / Slab)      - owns records, provides stable indices
//! List/Heap/HashMap/RbTree  - coordinate indices through embedded nodes
//! ```
//!
//! Nothing is allocated per element. The heap keeps a position array and the
//! hash map a slot array; list and tree keep a single sentinel node inline.
//!
//! # Containers
//!
//! | Container | Node | Accessor | Highlights |
//! |-----------|------|----------|------------|
//! | [`List`] | [`ListNode`] | [`Linked`] | O(1) insert/remove, O(1) slice splicing |
//! | [`Heap`] | [`HeapNode`] | [`HeapEntry`] | min-heap with O(log n) removal of any member |
//! | [`HashMap`] | [`HashNode`] | [`Hashed`] | chained map that grows and shrinks one slot at a time |
//! | [`RbTree`] | [`RbNode`] | [`TreeEntry`] | ordered, duplicates allowed, O(log n) removal |
//!
//! # Quick Start
//!
//! ```
//! use nexus_intrusive::{Linked, List, ListNode};
//!
//! #[derive(Default)]
//! struct Order {
//!     id: u64,
//!     queue: ListNode<u32>,
//! }
//!
//! impl Linked<u32> for Order {
//!     fn list_node(&self) -> &ListNode<u32> {
//!         &self.queue
//!     }
//!     fn list_node_mut(&mut self) -> &mut ListNode<u32> {
//!         &mut self.queue
//!     }
//! }
//!
//! let mut orders: Vec<Order> = (0..3).map(|id| Order { id, ..Default::default() }).collect();
//! let mut queue: List<u32> = List::new();
//!
//! queue.append(&mut orders, 0);
//! queue.append(&mut orders, 1);
//! queue.append(&mut orders, 2);
//!
//! // O(1) removal from the middle, given only the index
//! queue.remove(&mut orders, 1);
//!
//! let ids: Vec<u64> = queue.iter(&orders).map(|i| orders[i as usize].id).collect();
//! assert_eq!(ids, [0, 2]);
//! ```
//!
//! # Membership in several containers
//!
//! A record joins as many containers as it embeds nodes. Two nodes of the
//! same kind are told apart with a tag type:
//!
//! ```
//! use nexus_intrusive::{Linked, List, ListNode};
//!
//! struct ByPrice;
//! struct ByTime;
//!
//! #[derive(Default)]
//! struct Order {
//!     price_level: ListNode<u32>,
//!     expiry: ListNode<u32>,
//! }
//!
//! impl Linked<u32, ByPrice> for Order {
//!     fn list_node(&self) -> &ListNode<u32> { &self.price_level }
//!     fn list_node_mut(&mut self) -> &mut ListNode<u32> { &mut self.price_level }
//! }
//!
//! impl Linked<u32, ByTime> for Order {
//!     fn list_node(&self) -> &ListNode<u32> { &self.expiry }
//!     fn list_node_mut(&mut self) -> &mut ListNode<u32> { &mut self.expiry }
//! }
//!
//! let mut orders: Vec<Order> = (0..2).map(|_| Order::default()).collect();
//! let mut level: List<u32, ByPrice> = List::new();
//! let mut expiry: List<u32, ByTime> = List::new();
//!
//! level.append(&mut orders, 0);
//! level.append(&mut orders, 1);
//! expiry.prepend(&mut orders, 0);
//! expiry.prepend(&mut orders, 1);
//!
//! assert_eq!(level.head(), 0);
//! assert_eq!(expiry.head(), 1);
//! ```
//!
//! # Destroying a container
//!
//! Every container has a detached cursor that never touches a node again
//! after handing it out. The caller may reset the node (or drop its record)
//! during the walk and then [`reset`](List::reset) the container:
//!
//! ```
//! use nexus_intrusive::{Linked, List, ListNode};
//!
//! #[derive(Default)]
//! struct Rec {
//!     link: ListNode<u32>,
//! }
//!
//! impl Linked<u32> for Rec {
//!     fn list_node(&self) -> &ListNode<u32> { &self.link }
//!     fn list_node_mut(&mut self) -> &mut ListNode<u32> { &mut self.link }
//! }
//!
//! let mut recs: Vec<Rec> = (0..4).map(|_| Rec::default()).collect();
//! let mut list: List<u32> = List::new();
//! for i in 0..4 {
//!     list.append(&mut recs, i);
//! }
//!
//! let mut cursor = list.cursor();
//! while let Some(idx) = cursor.next(&recs) {
//!     recs[idx as usize].link.reset();
//! }
//! list.reset();
//!
//! assert!(list.is_empty());
//! assert!(recs.iter().all(|r| r.link.is_reset()));
//! ```
//!
//! # Critical Invariant: Same Storage Instance
//!
//! All operations on a container must use the same storage instance, and a
//! linked record must stay at its index for as long as it is a member.
//! Indices that storage does not know panic; other violations corrupt the
//! container's links (never memory).
//!
//! # Features
//!
//! - `slab`: [`Storage`] impl for `slab::Slab`
//! - `log`: trace resize and reset events through the `log` facade

#![warn(missing_docs)]

mod log;

pub mod hash_map;
pub mod heap;
pub mod index;
pub mod list;
pub mod order;
pub mod rbtree;
pub mod storage;

pub use hash_map::{HashMap, HashNode, Hashed};
pub use heap::{Heap, HeapEntry, HeapNode};
pub use index::Index;
pub use list::{Linked, List, ListNode};
pub use order::{KeyCompare, KeyHash, KeyMatch, Natural, NodeOrder};
pub use rbtree::{Color, RbNode, RbTree, TreeEntry};
pub use storage::Storage;

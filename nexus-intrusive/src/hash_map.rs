//! Chained hash map with incremental (linear) resizing.
//!
//! Records embed a [`HashNode`]: the link to the next record in the same
//! slot plus the cached hash of the key the record was inserted under.
//!
//! # Resizing
//!
//! The slot array grows and shrinks one slot at a time. With `s` the shift
//! and `n` the slot count, `2^s <= n < 2^(s+1)` always holds. A hash maps to
//! `hash mod 2^(s+1)`; slots past the end fold back onto their low partner
//! by clearing bit `s`.
//!
//! Growing appends slot `n` and moves the nodes of its partner
//! `n & !(1 << s)` whose hash has bit `s` set. Shrinking pops the last slot
//! and concatenates its chain onto its partner. Either way a single chain is
//! touched, so no insertion or removal pays for a full rehash.

use core::fmt;
use core::marker::PhantomData;

use crate::log::trace;
use crate::storage::{record, record_mut};
use crate::{Index, KeyHash, KeyMatch, Storage};

/// Max load factor used when none (or a non-positive one) is given:
/// `1 - 1/e`.
pub const DEFAULT_MAX_LOAD_FACTOR: f64 = 1.0 - 1.0 / core::f64::consts::E;

/// Link field embedded in a record that can join a [`HashMap`].
///
/// The default value is the reset state: not a member of any map.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct HashNode<Idx: Index> {
    next: Idx,
    key_hash: u64,
}

impl<Idx: Index> HashNode<Idx> {
    /// Creates a node in the reset state.
    #[inline]
    pub const fn new() -> Self {
        Self {
            next: Idx::NONE,
            key_hash: 0,
        }
    }

    /// Returns `true` if the node has never been linked, or was reset since.
    ///
    /// Removing a node from a map does not reset it.
    #[inline]
    pub fn is_reset(&self) -> bool {
        self.next.is_none()
    }

    /// Returns the node to the reset state.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Hash of the key the node was last inserted under.
    #[inline]
    pub fn key_hash(&self) -> u64 {
        self.key_hash
    }
}

impl<Idx: Index> Default for HashNode<Idx> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Idx: Index + fmt::Debug> fmt::Debug for HashNode<Idx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashNode")
            .field("next", &self.next)
            .field("key_hash", &format_args!("{:#018x}", self.key_hash))
            .finish()
    }
}

/// Records that embed a [`HashNode`].
pub trait Hashed<Idx: Index, Tag = ()> {
    /// Returns the embedded node.
    fn hash_node(&self) -> &HashNode<Idx>;

    /// Returns the embedded node mutably.
    fn hash_node_mut(&mut self) -> &mut HashNode<Idx>;
}

/// A chained hash map over external storage.
///
/// The map stores no keys: a record is inserted under a key, the key's hash
/// is cached in the record's node, and lookups confirm candidates with the
/// matcher. Duplicate keys are allowed; [`find`](HashMap::find) returns the
/// most recently inserted of them.
///
/// # Example
///
/// ```
/// use nexus_intrusive::{HashMap, HashNode, Hashed};
///
/// #[derive(Default)]
/// struct Session {
///     id: u64,
///     node: HashNode<u32>,
/// }
///
/// impl Hashed<u32> for Session {
///     fn hash_node(&self) -> &HashNode<u32> { &self.node }
///     fn hash_node_mut(&mut self) -> &mut HashNode<u32> { &mut self.node }
/// }
///
/// let mut sessions: Vec<Session> = (0..100).map(|id| Session { id, ..Default::default() }).collect();
/// let mut by_id: HashMap<u32, _, _> = HashMap::new(
///     |id: &u64| id.wrapping_mul(0x9E37_79B9_7F4A_7C15),
///     |s: &Session, id: &u64| s.id == *id,
/// );
///
/// for idx in 0..100 {
///     let id = sessions[idx as usize].id;
///     by_id.insert(&mut sessions, idx, &id);
/// }
///
/// let found = by_id.find(&sessions, &42u64).unwrap();
/// assert_eq!(sessions[found as usize].id, 42);
///
/// by_id.remove(&mut sessions, found);
/// assert!(by_id.find(&sessions, &42u64).is_none());
/// assert_eq!(by_id.len(), 99);
/// ```
pub struct HashMap<Idx: Index, H, M, Tag = ()> {
    /// Chain heads, `Idx::NIL` for an empty slot.
    slots: Vec<Idx>,
    shift: u32,
    len: usize,
    max_load_factor: f64,
    hasher: H,
    matcher: M,
    _tag: PhantomData<fn() -> Tag>,
}

impl<Idx: Index + fmt::Debug, H, M, Tag> fmt::Debug for HashMap<Idx, H, M, Tag> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashMap")
            .field("len", &self.len)
            .field("slots", &self.slots.len())
            .field("max_load_factor", &self.max_load_factor)
            .finish()
    }
}

impl<Idx: Index, H, M, Tag> HashMap<Idx, H, M, Tag> {
    /// Creates an empty map with the default max load factor.
    #[inline]
    pub fn new(hasher: H, matcher: M) -> Self {
        Self::with_max_load_factor(DEFAULT_MAX_LOAD_FACTOR, hasher, matcher)
    }

    /// Creates an empty map that grows once `len / slots` exceeds
    /// `max_load_factor` and shrinks below half of it.
    ///
    /// A non-positive or NaN factor falls back to
    /// [`DEFAULT_MAX_LOAD_FACTOR`].
    pub fn with_max_load_factor(max_load_factor: f64, hasher: H, matcher: M) -> Self {
        let max_load_factor = if max_load_factor > 0.0 {
            max_load_factor
        } else {
            DEFAULT_MAX_LOAD_FACTOR
        };

        Self {
            slots: vec![Idx::NIL],
            shift: 0,
            len: 0,
            max_load_factor,
            hasher,
            matcher,
            _tag: PhantomData,
        }
    }

    /// Returns the number of members.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the map has no members.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the current number of slots.
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Returns `len / slots`.
    #[inline]
    pub fn load_factor(&self) -> f64 {
        self.len as f64 / self.slots.len() as f64
    }

    /// Load factor above which a slot is added.
    #[inline]
    pub fn max_load_factor(&self) -> f64 {
        self.max_load_factor
    }

    /// Load factor below which a slot is removed: half the max.
    #[inline]
    pub fn min_load_factor(&self) -> f64 {
        self.max_load_factor / 2.0
    }

    /// Forgets every member without touching the nodes, and drops back to a
    /// single slot.
    ///
    /// Pairs with [`cursor`](HashMap::cursor) to destroy a map.
    pub fn reset(&mut self) {
        trace!(
            "hash map reset, dropping {} members in {} slots",
            self.len,
            self.slots.len()
        );
        self.slots.clear();
        self.slots.push(Idx::NIL);
        self.shift = 0;
        self.len = 0;
    }

    /// Returns an erase-safe cursor over the members. See [`HashCursor`].
    #[inline]
    pub fn cursor(&self) -> HashCursor<Idx> {
        HashCursor {
            slot: 0,
            next: Idx::NIL,
        }
    }

    /// Returns an iterator over member indices: slots in ascending order,
    /// each chain most recent first.
    #[inline]
    pub fn iter<'a, T, S>(&'a self, storage: &'a S) -> Iter<'a, T, S, Idx, Tag>
    where
        T: Hashed<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        Iter {
            slots: &self.slots,
            storage,
            cursor: self.cursor(),
            _marker: PhantomData,
        }
    }

    /// Slot holding the chain for `key_hash`.
    #[inline]
    fn locate_slot(&self, key_hash: u64) -> usize {
        let mask = (2u64 << self.shift) - 1;
        let slot = (key_hash & mask) as usize;
        if slot < self.slots.len() {
            slot
        } else {
            slot & !(1usize << self.shift)
        }
    }
}

impl<Idx: Index, H, M, Tag> HashMap<Idx, H, M, Tag> {
    /// Inserts `idx` under `key`.
    ///
    /// The record joins the front of its chain, so it shadows earlier
    /// members with an equal key. May add slots.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is not valid in storage.
    pub fn insert<K, T, S>(&mut self, storage: &mut S, idx: Idx, key: &K)
    where
        K: ?Sized,
        T: Hashed<Idx, Tag>,
        H: KeyHash<K>,
        S: Storage<T, Idx> + ?Sized,
    {
        let key_hash = self.hasher.hash(key);
        let slot = self.locate_slot(key_hash);

        let node = record_mut(storage, idx).hash_node_mut();
        node.next = self.slots[slot];
        node.key_hash = key_hash;
        self.slots[slot] = idx;
        self.len += 1;

        while self.load_factor() > self.max_load_factor {
            self.add_slot(storage);
        }
    }

    /// Removes the member `idx`.
    ///
    /// Scans the member's chain to unlink it. The node keeps its stale link
    /// and cached hash. May remove slots.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is not valid in storage. Removing a node that is not a
    /// member of this map is caught by a debug assertion only.
    pub fn remove<T, S>(&mut self, storage: &mut S, idx: Idx)
    where
        T: Hashed<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        let HashNode { next, key_hash } = *record(storage, idx).hash_node();
        let slot = self.locate_slot(key_hash);

        if self.slots[slot] == idx {
            self.slots[slot] = next;
        } else {
            let mut cur = self.slots[slot];
            loop {
                debug_assert!(!cur.is_nil(), "node {} is not a member of this map", idx.as_usize());
                if cur.is_nil() {
                    return;
                }

                let node = record_mut(storage, cur).hash_node_mut();
                if node.next == idx {
                    node.next = next;
                    break;
                }
                cur = node.next;
            }
        }

        self.len -= 1;

        while self.slots.len() >= 2 && self.load_factor() < self.min_load_factor() {
            self.remove_slot(storage);
        }
    }

    /// Returns the most recently inserted member whose key matches `key`.
    ///
    /// Candidates are filtered by cached hash before the matcher runs.
    pub fn find<K, T, S>(&self, storage: &S, key: &K) -> Option<Idx>
    where
        K: ?Sized,
        T: Hashed<Idx, Tag>,
        H: KeyHash<K>,
        M: KeyMatch<T, K>,
        S: Storage<T, Idx> + ?Sized,
    {
        let key_hash = self.hasher.hash(key);
        let mut cur = self.slots[self.locate_slot(key_hash)];

        while !cur.is_nil() {
            let rec = record(storage, cur);
            let node = rec.hash_node();
            if node.key_hash == key_hash && self.matcher.matches(rec, key) {
                return Some(cur);
            }
            cur = node.next;
        }

        None
    }

    /// Removes every member, resets its node, and drops back to a single
    /// slot.
    pub fn clear<T, S>(&mut self, storage: &mut S)
    where
        T: Hashed<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        for &head in &self.slots {
            let mut cur = head;
            while !cur.is_nil() {
                let node = record_mut(storage, cur).hash_node_mut();
                cur = node.next;
                node.reset();
            }
        }

        self.reset();
    }

    /// Checks slot placement, the member count, and the slot/shift relation.
    ///
    /// # Panics
    ///
    /// Panics on the first inconsistency found.
    pub fn validate<T, S>(&self, storage: &S)
    where
        T: Hashed<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        let slots = self.slots.len();
        assert!(
            1usize << self.shift <= slots && slots < 2usize << self.shift,
            "{slots} slots do not fit shift {}",
            self.shift
        );
        assert!(
            self.load_factor() <= self.max_load_factor,
            "load factor {} above max {}",
            self.load_factor(),
            self.max_load_factor
        );

        let mut count = 0;
        for (slot, &head) in self.slots.iter().enumerate() {
            let mut cur = head;
            while !cur.is_nil() {
                let node = record(storage, cur).hash_node();
                assert_eq!(
                    self.locate_slot(node.key_hash),
                    slot,
                    "hash node {} sits in the wrong slot",
                    cur.as_usize()
                );
                count += 1;
                cur = node.next;
            }
        }
        assert_eq!(count, self.len, "member count mismatch");
    }

    /// Appends a slot, splitting its low partner's chain into it.
    fn add_slot<T, S>(&mut self, storage: &mut S)
    where
        T: Hashed<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        let high = self.slots.len();
        self.slots.push(Idx::NIL);
        let low = high & !(1usize << self.shift);
        let bit = 1u64 << self.shift;

        // Walk the low chain, moving every node with `bit` set to the tail of
        // the high chain. Relative order is kept on both sides.
        let mut prev = Idx::NIL;
        let mut tail = Idx::NIL;
        let mut cur = self.slots[low];
        while !cur.is_nil() {
            let node = *record(storage, cur).hash_node();
            if node.key_hash & bit == 0 {
                prev = cur;
            } else {
                if prev.is_nil() {
                    self.slots[low] = node.next;
                } else {
                    record_mut(storage, prev).hash_node_mut().next = node.next;
                }

                if tail.is_nil() {
                    self.slots[high] = cur;
                } else {
                    record_mut(storage, tail).hash_node_mut().next = cur;
                }
                tail = cur;
            }
            cur = node.next;
        }
        if !tail.is_nil() {
            record_mut(storage, tail).hash_node_mut().next = Idx::NIL;
        }

        if self.slots.len() == 2usize << self.shift {
            self.shift += 1;
        }

        trace!("hash map grew to {} slots ({} members)", self.slots.len(), self.len);
    }

    /// Pops the last slot, concatenating its chain onto its low partner.
    fn remove_slot<T, S>(&mut self, storage: &mut S)
    where
        T: Hashed<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        let Some(high_head) = self.slots.pop() else {
            return;
        };
        let high = self.slots.len();
        if high < 1usize << self.shift {
            self.shift -= 1;
        }
        let low = high & !(1usize << self.shift);

        if !high_head.is_nil() {
            let mut cur = self.slots[low];
            if cur.is_nil() {
                self.slots[low] = high_head;
            } else {
                loop {
                    let node = record_mut(storage, cur).hash_node_mut();
                    if node.next.is_nil() {
                        node.next = high_head;
                        break;
                    }
                    cur = node.next;
                }
            }
        }

        trace!("hash map shrank to {} slots ({} members)", self.slots.len(), self.len);
    }
}

// =============================================================================
// Cursor
// =============================================================================

/// Detached, erase-safe cursor over a [`HashMap`].
///
/// Visits slots in ascending order and each chain front to back. The
/// follower of a node is read before the node is returned, so the caller
/// may reset the returned node or drop its record, then
/// [`HashMap::reset`] the map once the walk is done.
///
/// Any insertion or removal invalidates the cursor: either may move chains
/// between slots.
#[derive(Debug, Clone)]
pub struct HashCursor<Idx: Index> {
    /// Next slot whose chain has not been started.
    slot: usize,
    /// Next node of the current chain.
    next: Idx,
}

impl<Idx: Index> HashCursor<Idx> {
    /// Returns the next member, or `None` once every slot was walked.
    #[inline]
    pub fn next<H, M, Tag, T, S>(&mut self, map: &HashMap<Idx, H, M, Tag>, storage: &S) -> Option<Idx>
    where
        T: Hashed<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        self.advance::<Tag, T, S>(&map.slots, storage)
    }

    #[inline]
    fn advance<Tag, T, S>(&mut self, slots: &[Idx], storage: &S) -> Option<Idx>
    where
        T: Hashed<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        loop {
            let idx = self.next;
            if !idx.is_nil() {
                self.next = record(storage, idx).hash_node().next;
                return Some(idx);
            }

            self.next = *slots.get(self.slot)?;
            self.slot += 1;
        }
    }
}

// =============================================================================
// Iter
// =============================================================================

/// Iterator over member indices of a [`HashMap`], borrowing storage.
pub struct Iter<'a, T, S: ?Sized, Idx: Index, Tag = ()> {
    slots: &'a [Idx],
    storage: &'a S,
    cursor: HashCursor<Idx>,
    _marker: PhantomData<fn() -> (T, Tag)>,
}

impl<T, S, Idx, Tag> Iterator for Iter<'_, T, S, Idx, Tag>
where
    T: Hashed<Idx, Tag>,
    S: Storage<T, Idx> + ?Sized,
    Idx: Index,
{
    type Item = Idx;

    #[inline]
    fn next(&mut self) -> Option<Idx> {
        self.cursor.advance::<Tag, T, S>(self.slots, self.storage)
    }
}

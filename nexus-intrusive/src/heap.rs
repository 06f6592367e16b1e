//! Binary min-heap over external storage with O(log n) removal by index.
//!
//! Records embed a [`HeapNode`] holding their current position in the heap,
//! so any member can be removed or re-settled without a search.

use core::fmt;
use core::marker::PhantomData;

use crate::log::trace;
use crate::storage::{record, record_mut};
use crate::{Index, NodeOrder, Storage};

/// Position field embedded in a record that can join a [`Heap`].
///
/// Stores the array position plus one; zero is the reset state. Removing a
/// node from a heap leaves the field as it was.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapNode {
    position: usize,
}

impl HeapNode {
    /// Creates a node in the reset state.
    #[inline]
    pub const fn new() -> Self {
        Self { position: 0 }
    }

    /// Returns `true` if the node has never joined a heap, or was reset since.
    #[inline]
    pub fn is_reset(&self) -> bool {
        self.position == 0
    }

    /// Returns the node to the reset state.
    #[inline]
    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// Array position last assigned by a heap, if any.
    ///
    /// Stale after the node is removed.
    #[inline]
    pub fn position(&self) -> Option<usize> {
        self.position.checked_sub(1)
    }
}

/// Records that embed a [`HeapNode`].
///
/// # Example
///
/// ```
/// use nexus_intrusive::{HeapEntry, HeapNode};
///
/// struct Timer {
///     fire_at: u64,
///     callback_id: u32,
///     timers: HeapNode,
/// }
///
/// impl HeapEntry for Timer {
///     fn heap_node(&self) -> &HeapNode { &self.timers }
///     fn heap_node_mut(&mut self) -> &mut HeapNode { &mut self.timers }
/// }
/// ```
pub trait HeapEntry<Tag = ()> {
    /// Returns the embedded node.
    fn heap_node(&self) -> &HeapNode;

    /// Returns the embedded node mutably.
    fn heap_node_mut(&mut self) -> &mut HeapNode;
}

/// A binary min-heap over external storage.
///
/// The heap keeps an array of member indices in heap order; every member
/// records its own array position. The orderer decides what "min" means.
/// Ties are broken by the sift mechanics, not by insertion order.
///
/// # Example
///
/// ```
/// use nexus_intrusive::{Heap, HeapEntry, HeapNode};
///
/// #[derive(Default)]
/// struct Task {
///     priority: u32,
///     name: &'static str,
///     node: HeapNode,
/// }
///
/// impl HeapEntry for Task {
///     fn heap_node(&self) -> &HeapNode { &self.node }
///     fn heap_node_mut(&mut self) -> &mut HeapNode { &mut self.node }
/// }
///
/// let mut storage = vec![
///     Task { priority: 10, name: "low", ..Default::default() },
///     Task { priority: 1, name: "high", ..Default::default() },
///     Task { priority: 5, name: "medium", ..Default::default() },
/// ];
/// let mut heap: Heap<u32, _> = Heap::with_capacity(16, |a: &Task, b: &Task| a.priority <= b.priority);
///
/// for idx in 0..3 {
///     heap.insert(&mut storage, idx);
/// }
///
/// // Pops in priority order (min-heap)
/// let idx = heap.pop(&mut storage).unwrap();
/// assert_eq!(storage[idx as usize].name, "high");
/// let idx = heap.pop(&mut storage).unwrap();
/// assert_eq!(storage[idx as usize].name, "medium");
/// let idx = heap.pop(&mut storage).unwrap();
/// assert_eq!(storage[idx as usize].name, "low");
/// ```
pub struct Heap<Idx: Index, O, Tag = ()> {
    /// Heap-ordered storage indices.
    nodes: Vec<Idx>,
    order: O,
    _tag: PhantomData<fn() -> Tag>,
}

impl<Idx: Index + fmt::Debug, O, Tag> fmt::Debug for Heap<Idx, O, Tag> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Heap").field("nodes", &self.nodes).finish()
    }
}

impl<Idx: Index, O, Tag> Heap<Idx, O, Tag> {
    /// Creates an empty heap ordered by `order`.
    #[inline]
    pub fn new(order: O) -> Self {
        Self {
            nodes: Vec::new(),
            order,
            _tag: PhantomData,
        }
    }

    /// Creates an empty heap with room for `capacity` members before the
    /// position array reallocates.
    #[inline]
    pub fn with_capacity(capacity: usize, order: O) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            order,
            _tag: PhantomData,
        }
    }

    /// Returns the number of members.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the heap has no members.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the capacity of the position array.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.nodes.capacity()
    }

    /// Returns the minimum member without removing it.
    ///
    /// Returns `None` if the heap is empty.
    #[inline]
    pub fn top(&self) -> Option<Idx> {
        self.nodes.first().copied()
    }

    /// Returns the orderer.
    #[inline]
    pub fn order(&self) -> &O {
        &self.order
    }

    /// Forgets every member without touching the nodes.
    ///
    /// Keeps the position array's capacity. Pairs with
    /// [`cursor`](Heap::cursor) to destroy a heap.
    pub fn reset(&mut self) {
        trace!("heap reset, dropping {} members", self.nodes.len());
        self.nodes.clear();
    }

    /// Returns an iterator over member indices in array order.
    ///
    /// The order is unspecified apart from the minimum coming first.
    #[inline]
    pub fn iter(&self) -> Iter<'_, Idx> {
        self.nodes.iter().copied()
    }

    /// Returns an erase-safe cursor over the members. See [`HeapCursor`].
    #[inline]
    pub fn cursor(&self) -> HeapCursor<Idx> {
        HeapCursor {
            start: self.nodes.len(),
            remaining: self.nodes.len(),
            _marker: PhantomData,
        }
    }
}

impl<Idx: Index, O, Tag> Heap<Idx, O, Tag> {
    /// Inserts `idx`.
    ///
    /// The node's previous position field is overwritten, so a node removed
    /// earlier can be inserted again without a reset.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is not valid in storage.
    pub fn insert<T, S>(&mut self, storage: &mut S, idx: Idx)
    where
        T: HeapEntry<Tag>,
        O: NodeOrder<T>,
        S: Storage<T, Idx> + ?Sized,
    {
        if self.nodes.len() == self.nodes.capacity() {
            trace!("heap growing past {} members", self.nodes.capacity());
        }

        let pos = self.nodes.len();
        self.nodes.push(idx);
        self.sift_up(storage, idx, pos);
    }

    /// Removes the member `idx`.
    ///
    /// The last entry fills the hole and is sifted up or down from there.
    /// The node's position field is left as it was.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is not valid in storage. Removing a node that is not a
    /// member of this heap is caught by a debug assertion only.
    pub fn remove<T, S>(&mut self, storage: &mut S, idx: Idx)
    where
        T: HeapEntry<Tag>,
        O: NodeOrder<T>,
        S: Storage<T, Idx> + ?Sized,
    {
        let position = record(storage, idx).heap_node().position;
        debug_assert!(
            position != 0 && self.nodes.get(position - 1) == Some(&idx),
            "node {} is not a member of this heap",
            idx.as_usize()
        );

        let Some(last) = self.nodes.pop() else {
            return;
        };
        if last == idx {
            return;
        }

        let hole = position - 1;
        if self.le(storage, last, idx) {
            self.sift_up(storage, last, hole);
        } else {
            self.sift_down(storage, last, hole);
        }
    }

    /// Removes and returns the minimum member.
    ///
    /// Returns `None` if the heap is empty.
    pub fn pop<T, S>(&mut self, storage: &mut S) -> Option<Idx>
    where
        T: HeapEntry<Tag>,
        O: NodeOrder<T>,
        S: Storage<T, Idx> + ?Sized,
    {
        let top = self.top()?;
        self.remove(storage, top);
        Some(top)
    }

    /// Restores heap order after the key of member `idx` changed in either
    /// direction.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is not valid in storage.
    pub fn update<T, S>(&mut self, storage: &mut S, idx: Idx)
    where
        T: HeapEntry<Tag>,
        O: NodeOrder<T>,
        S: Storage<T, Idx> + ?Sized,
    {
        let position = record(storage, idx).heap_node().position;
        debug_assert!(
            position != 0 && self.nodes.get(position - 1) == Some(&idx),
            "node {} is not a member of this heap",
            idx.as_usize()
        );

        let pos = position - 1;
        if pos > 0 && !self.le(storage, self.nodes[(pos - 1) / 2], idx) {
            self.sift_up(storage, idx, pos);
        } else {
            self.sift_down(storage, idx, pos);
        }
    }

    /// Removes every member and resets its node.
    pub fn clear<T, S>(&mut self, storage: &mut S)
    where
        T: HeapEntry<Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        trace!("heap cleared, resetting {} members", self.nodes.len());
        for &idx in &self.nodes {
            record_mut(storage, idx).heap_node_mut().reset();
        }
        self.nodes.clear();
    }

    /// Checks heap order and position bookkeeping.
    ///
    /// # Panics
    ///
    /// Panics on the first member out of order or with a wrong position.
    pub fn validate<T, S>(&self, storage: &S)
    where
        T: HeapEntry<Tag>,
        O: NodeOrder<T>,
        S: Storage<T, Idx> + ?Sized,
    {
        for (pos, &idx) in self.nodes.iter().enumerate() {
            assert_eq!(
                record(storage, idx).heap_node().position(),
                Some(pos),
                "heap node {} records a wrong position",
                idx.as_usize()
            );
            if pos > 0 {
                let parent = self.nodes[(pos - 1) / 2];
                assert!(
                    self.le(storage, parent, idx),
                    "heap node {} sorts before its parent",
                    idx.as_usize()
                );
            }
        }
    }

    #[inline]
    fn le<T, S>(&self, storage: &S, a: Idx, b: Idx) -> bool
    where
        O: NodeOrder<T>,
        S: Storage<T, Idx> + ?Sized,
    {
        self.order
            .less_or_equal(record(storage, a), record(storage, b))
    }

    #[inline]
    fn place<T, S>(&mut self, storage: &mut S, pos: usize, idx: Idx)
    where
        T: HeapEntry<Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        self.nodes[pos] = idx;
        record_mut(storage, idx).heap_node_mut().position = pos + 1;
    }

    /// Moves `idx` from `hole` toward the root, shifting parents down.
    fn sift_up<T, S>(&mut self, storage: &mut S, idx: Idx, mut hole: usize)
    where
        T: HeapEntry<Tag>,
        O: NodeOrder<T>,
        S: Storage<T, Idx> + ?Sized,
    {
        while hole > 0 {
            let parent = (hole - 1) / 2;
            let parent_idx = self.nodes[parent];
            if self.le(storage, parent_idx, idx) {
                break;
            }

            self.place(storage, hole, parent_idx);
            hole = parent;
        }

        self.place(storage, hole, idx);
    }

    /// Moves `idx` from `hole` toward the leaves, shifting the smaller child
    /// up.
    fn sift_down<T, S>(&mut self, storage: &mut S, idx: Idx, mut hole: usize)
    where
        T: HeapEntry<Tag>,
        O: NodeOrder<T>,
        S: Storage<T, Idx> + ?Sized,
    {
        let len = self.nodes.len();

        loop {
            let left = 2 * hole + 1;
            if left >= len {
                break;
            }

            let right = left + 1;
            let mut child = left;
            if right < len && !self.le(storage, self.nodes[left], self.nodes[right]) {
                child = right;
            }

            let child_idx = self.nodes[child];
            if self.le(storage, idx, child_idx) {
                break;
            }

            self.place(storage, hole, child_idx);
            hole = child;
        }

        self.place(storage, hole, idx);
    }
}

/// Iterator over heap members in array order.
pub type Iter<'a, Idx> = core::iter::Copied<core::slice::Iter<'a, Idx>>;

/// Detached, erase-safe cursor over a [`Heap`].
///
/// Walks the position array from the last entry to the first and never
/// reads a member again after returning it. While walking, the caller may:
///
/// - reset the returned node or drop its record, then [`Heap::reset`] the
///   heap once the walk is done;
/// - [`Heap::remove`] every returned node (draining). Each returned node is
///   then the last entry, so removal moves nothing.
///
/// Inserting, or removing anything else, invalidates the cursor.
#[derive(Debug, Clone)]
pub struct HeapCursor<Idx: Index> {
    /// Member count when the walk began.
    start: usize,
    remaining: usize,
    _marker: PhantomData<Idx>,
}

impl<Idx: Index> HeapCursor<Idx> {
    /// Returns the next member, or `None` once every member was returned.
    #[inline]
    pub fn next<O, Tag>(&mut self, heap: &Heap<Idx, O, Tag>) -> Option<Idx> {
        // Destroying leaves the heap untouched; draining removes every
        // returned node.
        debug_assert!(
            heap.len() == self.start || heap.len() == self.remaining,
            "heap changed under a cursor"
        );

        self.remaining = self.remaining.checked_sub(1)?;
        heap.nodes.get(self.remaining).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Task {
        priority: u32,
        node: HeapNode,
    }

    impl Task {
        fn new(priority: u32) -> Self {
            Self {
                priority,
                node: HeapNode::new(),
            }
        }
    }

    impl HeapEntry for Task {
        fn heap_node(&self) -> &HeapNode {
            &self.node
        }
        fn heap_node_mut(&mut self) -> &mut HeapNode {
            &mut self.node
        }
    }

    fn by_priority(a: &Task, b: &Task) -> bool {
        a.priority <= b.priority
    }

    type TaskHeap = Heap<u32, fn(&Task, &Task) -> bool>;

    fn new_heap() -> TaskHeap {
        Heap::new(by_priority)
    }

    fn drain(heap: &mut TaskHeap, storage: &mut [Task]) -> Vec<u32> {
        let mut out = Vec::new();
        while let Some(idx) = heap.pop(storage) {
            out.push(storage[idx as usize].priority);
        }
        out
    }

    #[test]
    fn new_is_empty() {
        let heap = new_heap();
        assert!(heap.is_empty());
        assert_eq!(heap.len(), 0);
        assert!(heap.top().is_none());
    }

    #[test]
    fn insert_orders() {
        let cases: [&[u32]; 5] = [
            &[],
            &[1, 2, 3, 4, 5, 6],
            &[6, 5, 4, 3, 2, 1],
            &[5, 6, 2, 3, 1, 4],
            &[2, 5, 3, 6, 1, 4],
        ];

        for (case, input) in cases.into_iter().enumerate() {
            let mut storage: Vec<Task> = input.iter().map(|&p| Task::new(p)).collect();
            let mut heap = new_heap();
            for idx in 0..input.len() as u32 {
                heap.insert(&mut storage, idx);
            }
            heap.validate(&storage);

            let mut expected = input.to_vec();
            expected.sort_unstable();
            assert_eq!(drain(&mut heap, &mut storage), expected, "case {case}");
        }
    }

    #[test]
    fn remove_arbitrary_members() {
        let cases: [(&[u32], &[u32]); 8] = [
            (&[], &[1, 2, 3, 4, 5, 6]),
            (&[1, 2, 3, 4, 5, 6], &[]),
            (&[4, 6, 1], &[2, 3, 5]),
            (&[2, 5, 3], &[1, 4, 6]),
            (&[5, 2, 1, 4], &[3, 6]),
            (&[3, 6, 1, 5], &[2, 4]),
            (&[5, 3, 2, 1, 4], &[6]),
            (&[3, 6, 4, 1, 5], &[2]),
        ];

        for (case, (removed, left)) in cases.into_iter().enumerate() {
            let mut storage: Vec<Task> = (1..=6).map(Task::new).collect();
            let mut heap = new_heap();
            for idx in 0..6 {
                heap.insert(&mut storage, idx);
            }
            assert_eq!(heap.len(), 6);
            assert!(heap.top().is_some());

            for &priority in removed {
                heap.remove(&mut storage, priority - 1);
                heap.validate(&storage);
            }
            assert_eq!(drain(&mut heap, &mut storage), left, "case {case}");
        }
    }

    #[test]
    fn removed_node_keeps_position_and_reinserts() {
        let mut storage: Vec<Task> = (0..4).map(Task::new).collect();
        let mut heap = new_heap();
        for idx in 0..4 {
            assert!(storage[idx as usize].node.is_reset());
            heap.insert(&mut storage, idx);
            assert!(!storage[idx as usize].node.is_reset());
        }

        heap.remove(&mut storage, 2);
        assert!(!storage[2].node.is_reset());

        heap.insert(&mut storage, 2);
        heap.validate(&storage);
        assert_eq!(drain(&mut heap, &mut storage), [0, 1, 2, 3]);
    }

    #[test]
    fn remove_moves_last_entry_up() {
        // Removing a deep node from one subtree can pull a smaller last
        // entry from the other subtree above its new parent.
        let priorities = [0, 10, 1, 11, 12, 2, 3];
        let mut storage: Vec<Task> = priorities.iter().map(|&p| Task::new(p)).collect();
        let mut heap = new_heap();
        for idx in 0..priorities.len() as u32 {
            heap.insert(&mut storage, idx);
        }

        heap.remove(&mut storage, 4);
        heap.validate(&storage);
        assert_eq!(drain(&mut heap, &mut storage), [0, 1, 2, 3, 10, 11]);
    }

    #[test]
    fn update_after_key_change() {
        let mut storage: Vec<Task> = (0..8).map(|p| Task::new(p * 10)).collect();
        let mut heap = new_heap();
        for idx in 0..8 {
            heap.insert(&mut storage, idx);
        }

        storage[7].priority = 1;
        heap.update(&mut storage, 7);
        heap.validate(&storage);
        assert_eq!(heap.top(), Some(0));

        storage[0].priority = 100;
        heap.update(&mut storage, 0);
        heap.validate(&storage);
        assert_eq!(heap.top(), Some(7));

        assert_eq!(drain(&mut heap, &mut storage), [1, 10, 20, 30, 40, 50, 60, 100]);
    }

    #[test]
    fn duplicates_all_come_out() {
        let mut storage: Vec<Task> = [3, 1, 3, 1, 2].into_iter().map(Task::new).collect();
        let mut heap = new_heap();
        for idx in 0..5 {
            heap.insert(&mut storage, idx);
        }

        assert_eq!(drain(&mut heap, &mut storage), [1, 1, 2, 3, 3]);
    }

    #[test]
    fn clear_resets_members() {
        let mut storage: Vec<Task> = (0..5).map(Task::new).collect();
        let mut heap: Heap<u32, _> = Heap::with_capacity(8, by_priority);
        for idx in 0..5u32 {
            heap.insert(&mut storage, idx);
        }

        heap.clear(&mut storage);

        assert!(heap.is_empty());
        assert!(heap.capacity() >= 8);
        assert!(storage.iter().all(|t| t.node.is_reset()));
    }

    #[test]
    fn iter_visits_every_member() {
        let mut storage: Vec<Task> = (0..6).rev().map(Task::new).collect();
        let mut heap = new_heap();
        for idx in 0..6 {
            heap.insert(&mut storage, idx);
        }

        let mut seen: Vec<u32> = heap.iter().collect();
        seen.sort_unstable();
        assert_eq!(seen, [0, 1, 2, 3, 4, 5]);
        assert_eq!(heap.iter().next(), Some(5));
    }

    #[test]
    fn cursor_destroys_heap() {
        let mut storage: Vec<Task> = (0..6).map(Task::new).collect();
        let mut heap = new_heap();
        for idx in 0..6 {
            heap.insert(&mut storage, idx);
        }

        let mut cursor = heap.cursor();
        let mut count = 0;
        while let Some(idx) = cursor.next(&heap) {
            storage[idx as usize].node.reset();
            count += 1;
        }
        heap.reset();

        assert_eq!(count, 6);
        assert!(heap.is_empty());
        assert!(storage.iter().all(|t| t.node.is_reset()));
    }

    #[test]
    fn cursor_walks_untouched_heap_back_to_front() {
        let mut storage: Vec<Task> = (0..3).map(Task::new).collect();
        let mut heap = new_heap();
        for idx in 0..3 {
            heap.insert(&mut storage, idx);
        }
        let positions: Vec<u32> = heap.iter().collect();

        // Nodes are reset as they come out; the heap itself is left alone
        // until the walk ends.
        let mut cursor = heap.cursor();
        let mut walked = Vec::new();
        while let Some(idx) = cursor.next(&heap) {
            storage[idx as usize].node.reset();
            walked.push(idx);
            assert_eq!(heap.len(), 3);
        }
        heap.reset();

        walked.reverse();
        assert_eq!(walked, positions);
        assert!(heap.is_empty());
    }

    #[test]
    fn cursor_drains_by_removal() {
        let mut storage: Vec<Task> = [4, 2, 6, 1, 5, 3].into_iter().map(Task::new).collect();
        let mut heap = new_heap();
        for idx in 0..6 {
            heap.insert(&mut storage, idx);
        }

        let mut cursor = heap.cursor();
        let mut seen = Vec::new();
        while let Some(idx) = cursor.next(&heap) {
            heap.remove(&mut storage, idx);
            seen.push(storage[idx as usize].priority);
        }

        assert!(heap.is_empty());
        seen.sort_unstable();
        assert_eq!(seen, [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn custom_order_makes_max_heap() {
        let mut storage: Vec<Task> = (0..5).map(Task::new).collect();
        let mut heap: Heap<u32, _> = Heap::new(|a: &Task, b: &Task| a.priority >= b.priority);
        for idx in 0..5 {
            heap.insert(&mut storage, idx);
        }

        let mut out = Vec::new();
        while let Some(idx) = heap.pop(&mut storage) {
            out.push(storage[idx as usize].priority);
        }
        assert_eq!(out, [4, 3, 2, 1, 0]);
    }

    #[test]
    fn natural_order_on_ord_records() {
        struct Deadline {
            at: u64,
            node: HeapNode,
        }

        impl PartialEq for Deadline {
            fn eq(&self, other: &Self) -> bool {
                self.at == other.at
            }
        }

        impl Eq for Deadline {}

        impl PartialOrd for Deadline {
            fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for Deadline {
            fn cmp(&self, other: &Self) -> core::cmp::Ordering {
                self.at.cmp(&other.at)
            }
        }

        impl HeapEntry for Deadline {
            fn heap_node(&self) -> &HeapNode {
                &self.node
            }
            fn heap_node_mut(&mut self) -> &mut HeapNode {
                &mut self.node
            }
        }

        let mut storage: Vec<Deadline> = [30, 10, 20]
            .into_iter()
            .map(|at| Deadline {
                at,
                node: HeapNode::new(),
            })
            .collect();
        let mut heap: Heap<usize, _> = Heap::new(crate::Natural);
        for idx in 0..3 {
            heap.insert(&mut storage, idx);
        }

        assert_eq!(heap.pop(&mut storage).map(|i| storage[i].at), Some(10));
        assert_eq!(heap.pop(&mut storage).map(|i| storage[i].at), Some(20));
    }
}

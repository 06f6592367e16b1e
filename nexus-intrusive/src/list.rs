//! Intrusive circular doubly-linked list.
//!
//! Records embed a [`ListNode`] and expose it through [`Linked`]. The list
//! keeps a single sentinel node inline; links equal to `Idx::NIL` point at
//! it, so head and tail need no special cases.
//!
//! The list keeps no length counter: whole runs of nodes can be spliced in
//! and out in O(1) without knowing how many they contain.

use core::fmt;
use core::marker::PhantomData;

use crate::log::trace;
use crate::storage::{record, record_mut};
use crate::{Index, Storage};

/// Link field embedded in a record that can join a [`List`].
///
/// The default value is the reset state: not a member of any list.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ListNode<Idx: Index> {
    prev: Idx,
    next: Idx,
}

impl<Idx: Index> ListNode<Idx> {
    /// Creates a node in the reset state.
    #[inline]
    pub const fn new() -> Self {
        Self {
            prev: Idx::NONE,
            next: Idx::NONE,
        }
    }

    /// Returns `true` if the node has never been linked, or was reset since.
    ///
    /// Removing a node from a list does not reset it.
    #[inline]
    pub fn is_reset(&self) -> bool {
        self.prev.is_none()
    }

    /// Returns the node to the reset state.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Raw previous link: `Idx::NIL` for the head of a list.
    #[inline]
    pub fn prev(&self) -> Idx {
        self.prev
    }

    /// Raw next link: `Idx::NIL` for the tail of a list.
    #[inline]
    pub fn next(&self) -> Idx {
        self.next
    }
}

impl<Idx: Index> Default for ListNode<Idx> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Idx: Index + fmt::Debug> fmt::Debug for ListNode<Idx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListNode")
            .field("prev", &self.prev)
            .field("next", &self.next)
            .finish()
    }
}

/// Records that embed a [`ListNode`].
///
/// `Tag` tells apart several list nodes embedded in the same record; each
/// [`List`] carries the tag of the node it links through.
///
/// # Example
///
/// ```
/// use nexus_intrusive::{Linked, ListNode};
///
/// struct Order {
///     id: u64,
///     qty: u64,
///     // Link for the price-level queue
///     level: ListNode<u32>,
/// }
///
/// impl Linked<u32> for Order {
///     fn list_node(&self) -> &ListNode<u32> { &self.level }
///     fn list_node_mut(&mut self) -> &mut ListNode<u32> { &mut self.level }
/// }
/// ```
pub trait Linked<Idx: Index, Tag = ()> {
    /// Returns the embedded node.
    fn list_node(&self) -> &ListNode<Idx>;

    /// Returns the embedded node mutably.
    fn list_node_mut(&mut self) -> &mut ListNode<Idx>;
}

/// A circular doubly-linked list over external storage.
///
/// The list owns only its sentinel. Member records stay in caller storage
/// and embed their links via [`Linked`]. Every operation is O(1) except
/// [`clear`](List::clear).
///
/// `head`/`tail`/`prev`/`next` return `Idx::NIL` where there is no node;
/// [`List::is_nil`] tests for it.
///
/// # Example
///
/// ```
/// use nexus_intrusive::{Linked, List, ListNode};
///
/// #[derive(Default)]
/// struct Node {
///     value: u64,
///     link: ListNode<u32>,
/// }
///
/// impl Linked<u32> for Node {
///     fn list_node(&self) -> &ListNode<u32> { &self.link }
///     fn list_node_mut(&mut self) -> &mut ListNode<u32> { &mut self.link }
/// }
///
/// let mut storage: Vec<Node> = (0..3).map(|value| Node { value, ..Default::default() }).collect();
/// let mut list: List<u32> = List::new();
///
/// list.append(&mut storage, 0);
/// list.append(&mut storage, 2);
/// list.insert_after(&mut storage, 0, 1);
///
/// let values: Vec<u64> = list.iter(&storage).map(|i| storage[i as usize].value).collect();
/// assert_eq!(values, [0, 1, 2]);
///
/// list.remove(&mut storage, 1);
/// assert_eq!(list.next(&storage, 0), 2);
/// ```
pub struct List<Idx: Index, Tag = ()> {
    sentinel: ListNode<Idx>,
    _tag: PhantomData<fn() -> Tag>,
}

impl<Idx: Index, Tag> Default for List<Idx, Tag> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Idx: Index + fmt::Debug, Tag> fmt::Debug for List<Idx, Tag> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("List")
            .field("head", &self.sentinel.next)
            .field("tail", &self.sentinel.prev)
            .finish()
    }
}

impl<Idx: Index, Tag> List<Idx, Tag> {
    /// Creates an empty list.
    #[inline]
    pub const fn new() -> Self {
        Self {
            sentinel: ListNode {
                prev: Idx::NIL,
                next: Idx::NIL,
            },
            _tag: PhantomData,
        }
    }

    /// Forgets every member without touching the nodes.
    ///
    /// Former members keep stale links; reset them (or drop their records)
    /// before linking them again. Pairs with [`cursor`](List::cursor) to
    /// destroy a list.
    #[inline]
    pub fn reset(&mut self) {
        self.sentinel = ListNode {
            prev: Idx::NIL,
            next: Idx::NIL,
        };
    }

    /// Returns `true` if the list has no members.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sentinel.next.is_nil()
    }

    /// Returns the first node, or `Idx::NIL` if empty.
    #[inline]
    pub fn head(&self) -> Idx {
        self.sentinel.next
    }

    /// Returns the last node, or `Idx::NIL` if empty.
    #[inline]
    pub fn tail(&self) -> Idx {
        self.sentinel.prev
    }

    /// Returns `true` if `idx` is the end marker returned past either end.
    #[inline]
    pub fn is_nil(&self, idx: Idx) -> bool {
        idx.is_nil()
    }

    /// Returns the node after `idx`, or `Idx::NIL` past the tail.
    ///
    /// `next(Idx::NIL)` is the head.
    #[inline]
    pub fn next<T, S>(&self, storage: &S, idx: Idx) -> Idx
    where
        T: Linked<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        self.node(storage, idx).next
    }

    /// Returns the node before `idx`, or `Idx::NIL` before the head.
    ///
    /// `prev(Idx::NIL)` is the tail.
    #[inline]
    pub fn prev<T, S>(&self, storage: &S, idx: Idx) -> Idx
    where
        T: Linked<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        self.node(storage, idx).prev
    }

    /// Links `idx` at the back.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is not valid in storage.
    #[inline]
    pub fn append<T, S>(&mut self, storage: &mut S, idx: Idx)
    where
        T: Linked<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        let tail = self.sentinel.prev;
        self.splice(storage, idx, idx, tail, Idx::NIL);
    }

    /// Links `idx` at the front.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is not valid in storage.
    #[inline]
    pub fn prepend<T, S>(&mut self, storage: &mut S, idx: Idx)
    where
        T: Linked<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        let head = self.sentinel.next;
        self.splice(storage, idx, idx, Idx::NIL, head);
    }

    /// Links `idx` right before the member `before`.
    ///
    /// `before == Idx::NIL` appends.
    ///
    /// # Panics
    ///
    /// Panics if `before` or `idx` is not valid in storage.
    #[inline]
    pub fn insert_before<T, S>(&mut self, storage: &mut S, before: Idx, idx: Idx)
    where
        T: Linked<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        self.insert_slice_before(storage, idx, idx, before);
    }

    /// Links `idx` right after the member `after`.
    ///
    /// `after == Idx::NIL` prepends.
    ///
    /// # Panics
    ///
    /// Panics if `after` or `idx` is not valid in storage.
    #[inline]
    pub fn insert_after<T, S>(&mut self, storage: &mut S, after: Idx, idx: Idx)
    where
        T: Linked<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        self.insert_slice_after(storage, idx, idx, after);
    }

    /// Unlinks the member `idx`.
    ///
    /// The node keeps its stale links; it is not reset.
    ///
    /// # Panics
    ///
    /// Panics if `idx` or one of its neighbours is not valid in storage.
    #[inline]
    pub fn remove<T, S>(&mut self, storage: &mut S, idx: Idx)
    where
        T: Linked<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        self.remove_slice(storage, idx, idx);
    }

    /// Links the run `first..=last` right before the member `before`.
    ///
    /// The run must be properly linked from `first` to `last`, and must not
    /// be a member of any list (or must have been unlinked from its old list
    /// with [`remove_slice`](List::remove_slice) first). A run taken as
    /// `head..=tail` of another list leaves that list broken; use
    /// [`append_list`](List::append_list) instead.
    #[inline]
    pub fn insert_slice_before<T, S>(&mut self, storage: &mut S, first: Idx, last: Idx, before: Idx)
    where
        T: Linked<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        let prev = self.node(storage, before).prev;
        self.splice(storage, first, last, prev, before);
    }

    /// Links the run `first..=last` right after the member `after`.
    ///
    /// Same requirements as [`insert_slice_before`](List::insert_slice_before).
    #[inline]
    pub fn insert_slice_after<T, S>(&mut self, storage: &mut S, first: Idx, last: Idx, after: Idx)
    where
        T: Linked<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        let next = self.node(storage, after).next;
        self.splice(storage, first, last, after, next);
    }

    /// Links the run `first..=last` at the back.
    #[inline]
    pub fn append_slice<T, S>(&mut self, storage: &mut S, first: Idx, last: Idx)
    where
        T: Linked<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        let tail = self.sentinel.prev;
        self.splice(storage, first, last, tail, Idx::NIL);
    }

    /// Links the run `first..=last` at the front.
    #[inline]
    pub fn prepend_slice<T, S>(&mut self, storage: &mut S, first: Idx, last: Idx)
    where
        T: Linked<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        let head = self.sentinel.next;
        self.splice(storage, first, last, Idx::NIL, head);
    }

    /// Unlinks the run `first..=last`, where `first` is `last` or precedes it.
    ///
    /// The run keeps its inner links, so it can be linked again as a whole
    /// with one of the slice operations.
    #[inline]
    pub fn remove_slice<T, S>(&mut self, storage: &mut S, first: Idx, last: Idx)
    where
        T: Linked<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        let prev = self.node(storage, first).prev;
        let next = self.node(storage, last).next;
        self.link(storage, prev, next);
    }

    /// Moves every member of `other` to the back of this list.
    ///
    /// `other` is left empty.
    pub fn append_list<T, S>(&mut self, storage: &mut S, other: &mut Self)
    where
        T: Linked<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        if other.is_empty() {
            return;
        }

        let (first, last) = (other.head(), other.tail());
        self.append_slice(storage, first, last);
        other.reset();
    }

    /// Moves every member of `other` to the front of this list.
    ///
    /// `other` is left empty.
    pub fn prepend_list<T, S>(&mut self, storage: &mut S, other: &mut Self)
    where
        T: Linked<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        if other.is_empty() {
            return;
        }

        let (first, last) = (other.head(), other.tail());
        self.prepend_slice(storage, first, last);
        other.reset();
    }

    /// Unlinks every member and resets its node.
    ///
    /// Records remain in storage.
    pub fn clear<T, S>(&mut self, storage: &mut S)
    where
        T: Linked<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        let mut idx = self.sentinel.next;
        let mut _cleared = 0usize;
        while !idx.is_nil() {
            let node = record_mut(storage, idx).list_node_mut();
            idx = node.next;
            node.reset();
            _cleared += 1;
        }

        trace!("list cleared, {} nodes reset", _cleared);
        self.reset();
    }

    /// Returns an erase-safe cursor from head to tail.
    ///
    /// See [`ListCursor`].
    #[inline]
    pub fn cursor(&self) -> ListCursor<Idx, Tag> {
        ListCursor {
            next: self.sentinel.next,
            reverse: false,
            _tag: PhantomData,
        }
    }

    /// Returns an erase-safe cursor from tail to head.
    #[inline]
    pub fn cursor_rev(&self) -> ListCursor<Idx, Tag> {
        ListCursor {
            next: self.sentinel.prev,
            reverse: true,
            _tag: PhantomData,
        }
    }

    /// Returns an iterator over member indices, head to tail.
    #[inline]
    pub fn iter<'a, T, S>(&self, storage: &'a S) -> Iter<'a, T, S, Idx, Tag>
    where
        T: Linked<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        Iter {
            storage,
            front: self.sentinel.next,
            back: self.sentinel.prev,
            _marker: PhantomData,
        }
    }

    /// Checks that every member's neighbours point back at it.
    ///
    /// # Panics
    ///
    /// Panics on the first broken link.
    pub fn validate<T, S>(&self, storage: &S)
    where
        T: Linked<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        let mut prev = Idx::NIL;
        let mut idx = self.sentinel.next;
        while !idx.is_nil() {
            let node = record(storage, idx).list_node();
            assert!(node.prev == prev, "list node {} has a broken prev link", idx.as_usize());
            prev = idx;
            idx = node.next;
        }
        assert!(self.sentinel.prev == prev, "list tail does not match the last node");
    }

    // =========================================================================
    // Linking primitives
    // =========================================================================

    /// Resolves `idx` to the sentinel or the node embedded in its record.
    #[inline]
    fn node<'a, T, S>(&'a self, storage: &'a S, idx: Idx) -> &'a ListNode<Idx>
    where
        T: Linked<Idx, Tag> + 'a,
        S: Storage<T, Idx> + ?Sized,
    {
        if idx.is_nil() {
            &self.sentinel
        } else {
            record(storage, idx).list_node()
        }
    }

    #[inline]
    fn node_mut<'a, T, S>(
        sentinel: &'a mut ListNode<Idx>,
        storage: &'a mut S,
        idx: Idx,
    ) -> &'a mut ListNode<Idx>
    where
        T: Linked<Idx, Tag> + 'a,
        S: Storage<T, Idx> + ?Sized,
    {
        if idx.is_nil() {
            sentinel
        } else {
            record_mut(storage, idx).list_node_mut()
        }
    }

    /// Makes `b` follow `a`.
    #[inline]
    fn link<T, S>(&mut self, storage: &mut S, a: Idx, b: Idx)
    where
        T: Linked<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        Self::node_mut(&mut self.sentinel, storage, a).next = b;
        Self::node_mut(&mut self.sentinel, storage, b).prev = a;
    }

    /// Places the run `first..=last` between the adjacent `prev` and `next`.
    #[inline]
    fn splice<T, S>(&mut self, storage: &mut S, first: Idx, last: Idx, prev: Idx, next: Idx)
    where
        T: Linked<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        self.link(storage, prev, first);
        self.link(storage, last, next);
    }
}

// =============================================================================
// Cursor
// =============================================================================

/// Detached, erase-safe cursor over a [`List`].
///
/// The cursor holds only the index it will yield next. [`next`](Self::next)
/// reads that node's follower before returning it, and never looks at a
/// returned node again. While walking, the caller may:
///
/// - unlink the returned node with [`List::remove`],
/// - reset the returned node or drop its record, then [`List::reset`] the
///   list once the walk is done.
///
/// Unlinking or relinking any *other* node invalidates the cursor.
pub struct ListCursor<Idx: Index, Tag = ()> {
    next: Idx,
    reverse: bool,
    _tag: PhantomData<fn() -> Tag>,
}

impl<Idx: Index, Tag> ListCursor<Idx, Tag> {
    /// Returns the next node, or `None` past the end.
    #[inline]
    pub fn next<T, S>(&mut self, storage: &S) -> Option<Idx>
    where
        T: Linked<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        let idx = self.next;
        if idx.is_nil() {
            return None;
        }

        let node = record(storage, idx).list_node();
        self.next = if self.reverse { node.prev } else { node.next };
        Some(idx)
    }
}

impl<Idx: Index + fmt::Debug, Tag> fmt::Debug for ListCursor<Idx, Tag> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListCursor")
            .field("next", &self.next)
            .field("reverse", &self.reverse)
            .finish()
    }
}

// =============================================================================
// Iter
// =============================================================================

/// Iterator over member indices of a [`List`], borrowing storage.
///
/// Double-ended: `next` walks from the head, `next_back` from the tail, and
/// the two meet in the middle.
pub struct Iter<'a, T, S: ?Sized, Idx: Index, Tag = ()> {
    storage: &'a S,
    front: Idx,
    back: Idx,
    _marker: PhantomData<fn() -> (T, Tag)>,
}

impl<T, S, Idx, Tag> Iterator for Iter<'_, T, S, Idx, Tag>
where
    T: Linked<Idx, Tag>,
    S: Storage<T, Idx> + ?Sized,
    Idx: Index,
{
    type Item = Idx;

    #[inline]
    fn next(&mut self) -> Option<Idx> {
        let idx = self.front;
        if idx.is_nil() {
            return None;
        }

        if idx == self.back {
            self.front = Idx::NIL;
            self.back = Idx::NIL;
        } else {
            self.front = record(self.storage, idx).list_node().next;
        }
        Some(idx)
    }
}

impl<T, S, Idx, Tag> DoubleEndedIterator for Iter<'_, T, S, Idx, Tag>
where
    T: Linked<Idx, Tag>,
    S: Storage<T, Idx> + ?Sized,
    Idx: Index,
{
    #[inline]
    fn next_back(&mut self) -> Option<Idx> {
        let idx = self.back;
        if idx.is_nil() {
            return None;
        }

        if idx == self.front {
            self.front = Idx::NIL;
            self.back = Idx::NIL;
        } else {
            self.back = record(self.storage, idx).list_node().prev;
        }
        Some(idx)
    }
}

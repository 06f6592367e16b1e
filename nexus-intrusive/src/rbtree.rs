//! Red-black tree over external storage.
//!
//! Records embed an [`RbNode`] (parent, children, color) and expose it via
//! [`TreeEntry`]. The tree keeps one black sentinel inline, addressed as
//! `Idx::NIL`: every missing child points at it, its `left` link is the root,
//! and it is the root's parent. Fix-ups may write the sentinel's parent link
//! while a removal is rebalanced; nothing else about it ever changes.
//!
//! Equal keys are allowed. A new node descends left past every node it
//! orders `<=`, so among equal keys the newest comes first in order.

use core::cmp::Ordering;
use core::fmt;
use core::marker::PhantomData;

use crate::log::trace;
use crate::storage::{record, record_mut};
use crate::{Index, KeyCompare, NodeOrder, Storage};

/// Stack depth reserved by cursors; enough for any tree of 2^32 nodes.
const CURSOR_STACK_DEPTH: usize = 64;

/// Node color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Color {
    /// Red: never the parent of another red node.
    #[default]
    Red,
    /// Black: every root-to-leaf path crosses the same number of them.
    Black,
}

/// Link field embedded in a record that can join an [`RbTree`].
///
/// The default value is the reset state: not a member of any tree.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RbNode<Idx: Index> {
    parent: Idx,
    left: Idx,
    right: Idx,
    color: Color,
}

impl<Idx: Index> RbNode<Idx> {
    /// Creates a node in the reset state.
    #[inline]
    pub const fn new() -> Self {
        Self {
            parent: Idx::NONE,
            left: Idx::NONE,
            right: Idx::NONE,
            color: Color::Red,
        }
    }

    const fn sentinel() -> Self {
        Self {
            parent: Idx::NIL,
            left: Idx::NIL,
            right: Idx::NIL,
            color: Color::Black,
        }
    }

    /// Returns `true` if the node has never been linked, or was reset since.
    ///
    /// Removing a node from a tree does not reset it.
    #[inline]
    pub fn is_reset(&self) -> bool {
        self.parent.is_none()
    }

    /// Returns the node to the reset state.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Raw parent link: `Idx::NIL` for the root.
    #[inline]
    pub fn parent(&self) -> Idx {
        self.parent
    }

    /// Raw left child link: `Idx::NIL` if absent.
    #[inline]
    pub fn left(&self) -> Idx {
        self.left
    }

    /// Raw right child link: `Idx::NIL` if absent.
    #[inline]
    pub fn right(&self) -> Idx {
        self.right
    }

    /// Current color.
    #[inline]
    pub fn color(&self) -> Color {
        self.color
    }
}

impl<Idx: Index> Default for RbNode<Idx> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Idx: Index + fmt::Debug> fmt::Debug for RbNode<Idx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RbNode")
            .field("parent", &self.parent)
            .field("left", &self.left)
            .field("right", &self.right)
            .field("color", &self.color)
            .finish()
    }
}

/// Records that embed an [`RbNode`].
pub trait TreeEntry<Idx: Index, Tag = ()> {
    /// Returns the embedded node.
    fn tree_node(&self) -> &RbNode<Idx>;

    /// Returns the embedded node mutably.
    fn tree_node_mut(&mut self) -> &mut RbNode<Idx>;
}

/// A red-black tree over external storage.
///
/// Ordering comes from two callbacks given at construction: an orderer
/// placing records relative to each other (used by [`insert`](RbTree::insert))
/// and a comparer placing a record relative to a lookup key (used by
/// [`find`](RbTree::find)). The two must agree.
///
/// # Example
///
/// ```
/// use std::cmp::Ordering;
/// use nexus_intrusive::{RbNode, RbTree, TreeEntry};
///
/// #[derive(Default)]
/// struct Level {
///     price: u64,
///     node: RbNode<u32>,
/// }
///
/// impl TreeEntry<u32> for Level {
///     fn tree_node(&self) -> &RbNode<u32> { &self.node }
///     fn tree_node_mut(&mut self) -> &mut RbNode<u32> { &mut self.node }
/// }
///
/// let mut levels: Vec<Level> = [105, 101, 103]
///     .into_iter()
///     .map(|price| Level { price, ..Default::default() })
///     .collect();
/// let mut book: RbTree<u32, _, _> = RbTree::new(
///     |a: &Level, b: &Level| a.price <= b.price,
///     |l: &Level, price: &u64| l.price.cmp(price),
/// );
///
/// for idx in 0..3 {
///     book.insert(&mut levels, idx);
/// }
///
/// let best = book.first(&levels).unwrap();
/// assert_eq!(levels[best as usize].price, 101);
/// assert_eq!(book.find(&levels, &103u64), Some(2));
///
/// let prices: Vec<u64> = book.iter(&levels).map(|i| levels[i as usize].price).collect();
/// assert_eq!(prices, [101, 103, 105]);
/// ```
pub struct RbTree<Idx: Index, O, C, Tag = ()> {
    nil: RbNode<Idx>,
    len: usize,
    order: O,
    compare: C,
    _tag: PhantomData<fn() -> Tag>,
}

impl<Idx: Index + fmt::Debug, O, C, Tag> fmt::Debug for RbTree<Idx, O, C, Tag> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RbTree")
            .field("root", &self.nil.left)
            .field("len", &self.len)
            .finish()
    }
}

impl<Idx: Index, O, C, Tag> RbTree<Idx, O, C, Tag> {
    /// Creates an empty tree.
    #[inline]
    pub fn new(order: O, compare: C) -> Self {
        Self {
            nil: RbNode::sentinel(),
            len: 0,
            order,
            compare,
            _tag: PhantomData,
        }
    }

    /// Returns the number of members.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the tree has no members.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nil.left.is_nil()
    }

    /// Returns the root, or `None` if empty.
    #[inline]
    pub fn root(&self) -> Option<Idx> {
        let root = self.nil.left;
        (!root.is_nil()).then_some(root)
    }

    /// Forgets every member without touching the nodes.
    ///
    /// Pairs with [`cursor`](RbTree::cursor) to destroy a tree.
    pub fn reset(&mut self) {
        trace!("rb tree reset, dropping {} members", self.len);
        self.nil = RbNode::sentinel();
        self.len = 0;
    }

    /// Returns an erase-safe cursor in ascending order. See [`TreeCursor`].
    #[inline]
    pub fn cursor(&self) -> TreeCursor<Idx, Tag> {
        TreeCursor::new(self.nil.left, false)
    }

    /// Returns an erase-safe cursor in descending order.
    #[inline]
    pub fn cursor_rev(&self) -> TreeCursor<Idx, Tag> {
        TreeCursor::new(self.nil.left, true)
    }

    /// Returns an iterator over member indices in ascending order.
    #[inline]
    pub fn iter<'a, T, S>(&self, storage: &'a S) -> Iter<'a, T, S, Idx, Tag>
    where
        T: TreeEntry<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        Iter {
            storage,
            cursor: self.cursor(),
            _marker: PhantomData,
        }
    }

    /// Returns an iterator over member indices in descending order.
    #[inline]
    pub fn iter_rev<'a, T, S>(&self, storage: &'a S) -> Iter<'a, T, S, Idx, Tag>
    where
        T: TreeEntry<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        Iter {
            storage,
            cursor: self.cursor_rev(),
            _marker: PhantomData,
        }
    }
}

impl<Idx: Index, O, C, Tag> RbTree<Idx, O, C, Tag> {
    /// Inserts `idx`, after any member it does not order strictly before.
    ///
    /// The node's previous links are overwritten, so a node removed earlier
    /// can be inserted again without a reset.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is not valid in storage.
    pub fn insert<T, S>(&mut self, storage: &mut S, idx: Idx)
    where
        T: TreeEntry<Idx, Tag>,
        O: NodeOrder<T>,
        S: Storage<T, Idx> + ?Sized,
    {
        let mut parent = Idx::NIL;
        let mut cur = self.nil.left;
        let mut go_left = true;

        while !cur.is_nil() {
            parent = cur;
            go_left = self
                .order
                .less_or_equal(record(storage, idx), record(storage, cur));
            cur = if go_left {
                self.left(storage, cur)
            } else {
                self.right(storage, cur)
            };
        }

        {
            let node = record_mut(storage, idx).tree_node_mut();
            node.left = Idx::NIL;
            node.right = Idx::NIL;
            node.color = Color::Red;
        }
        if go_left {
            self.set_left(storage, parent, idx);
        } else {
            self.set_right(storage, parent, idx);
        }

        self.fix_after_insert(storage, idx);
        self.len += 1;
    }

    /// Removes the member `idx`.
    ///
    /// A node with two children is replaced by its in-order predecessor or
    /// successor, whichever is reached first by descending both sides in
    /// lockstep. The node keeps its stale links.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is not valid in storage.
    pub fn remove<T, S>(&mut self, storage: &mut S, idx: Idx)
    where
        T: TreeEntry<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        debug_assert!(
            !record(storage, idx).tree_node().is_reset(),
            "node {} is not a member of this tree",
            idx.as_usize()
        );

        let x = idx;
        let (y, z) = if self.left(storage, x).is_nil() {
            (x, self.right(storage, x))
        } else if self.right(storage, x).is_nil() {
            (x, self.left(storage, x))
        } else {
            let mut v = self.left(storage, x);
            let mut w = self.right(storage, x);
            loop {
                if self.right(storage, v).is_nil() {
                    break (v, self.left(storage, v));
                }
                if self.left(storage, w).is_nil() {
                    break (w, self.right(storage, w));
                }
                v = self.right(storage, v);
                w = self.left(storage, w);
            }
        };

        // Splice y out; z takes its place (z may be the sentinel).
        self.replace(storage, y, z);
        let broken = self.color(storage, y) == Color::Black;

        if x != y {
            let left = self.left(storage, x);
            self.set_left(storage, y, left);
            let right = self.right(storage, x);
            self.set_right(storage, y, right);
            let color = self.color(storage, x);
            self.set_color(storage, y, color);
            self.replace(storage, x, y);
        }

        if broken {
            self.fix_after_remove(storage, z);
        }
        self.len -= 1;
    }

    /// Returns a member whose key compares equal to `key`.
    ///
    /// Among equal members, the first one met on the way down wins.
    pub fn find<K, T, S>(&self, storage: &S, key: &K) -> Option<Idx>
    where
        K: ?Sized,
        T: TreeEntry<Idx, Tag>,
        C: KeyCompare<T, K>,
        S: Storage<T, Idx> + ?Sized,
    {
        let mut cur = self.nil.left;

        while !cur.is_nil() {
            let rec = record(storage, cur);
            cur = match self.compare.compare(rec, key) {
                Ordering::Equal => return Some(cur),
                Ordering::Greater => rec.tree_node().left,
                Ordering::Less => rec.tree_node().right,
            };
        }

        None
    }

    /// Returns the minimum member, or `None` if empty.
    pub fn first<T, S>(&self, storage: &S) -> Option<Idx>
    where
        T: TreeEntry<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        let root = self.root()?;
        Some(self.leftmost(storage, root))
    }

    /// Returns the maximum member, or `None` if empty.
    pub fn last<T, S>(&self, storage: &S) -> Option<Idx>
    where
        T: TreeEntry<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        let root = self.root()?;
        Some(self.rightmost(storage, root))
    }

    /// Returns the member right before `idx` in order, or `None` at the
    /// start.
    pub fn prev<T, S>(&self, storage: &S, idx: Idx) -> Option<Idx>
    where
        T: TreeEntry<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        let left = self.left(storage, idx);
        if !left.is_nil() {
            return Some(self.rightmost(storage, left));
        }

        let mut child = idx;
        let mut parent = self.parent(storage, idx);
        while !parent.is_nil() {
            if self.right(storage, parent) == child {
                return Some(parent);
            }
            child = parent;
            parent = self.parent(storage, parent);
        }
        None
    }

    /// Returns the member right after `idx` in order, or `None` at the end.
    pub fn next<T, S>(&self, storage: &S, idx: Idx) -> Option<Idx>
    where
        T: TreeEntry<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        let right = self.right(storage, idx);
        if !right.is_nil() {
            return Some(self.leftmost(storage, right));
        }

        let mut child = idx;
        let mut parent = self.parent(storage, idx);
        while !parent.is_nil() {
            if self.left(storage, parent) == child {
                return Some(parent);
            }
            child = parent;
            parent = self.parent(storage, parent);
        }
        None
    }

    /// Removes every member and resets its node.
    pub fn clear<T, S>(&mut self, storage: &mut S)
    where
        T: TreeEntry<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        let mut cursor = self.cursor();
        while let Some(idx) = cursor.next(&*storage) {
            record_mut(storage, idx).tree_node_mut().reset();
        }
        self.reset();
    }

    /// Checks search order, coloring, black heights, parent links and the
    /// member count.
    ///
    /// # Panics
    ///
    /// Panics on the first violation found.
    pub fn validate<T, S>(&self, storage: &S)
    where
        T: TreeEntry<Idx, Tag>,
        O: NodeOrder<T>,
        S: Storage<T, Idx> + ?Sized,
    {
        assert_eq!(self.nil.color, Color::Black, "sentinel turned red");

        let root = self.nil.left;
        if root.is_nil() {
            assert_eq!(self.len, 0, "empty tree with members counted");
            return;
        }
        assert_eq!(self.color(storage, root), Color::Black, "red root");
        assert!(self.parent(storage, root).is_nil(), "root has a parent");

        let mut count = 0;
        self.validate_subtree(storage, root, &mut count);
        assert_eq!(count, self.len, "member count mismatch");

        let mut prev: Option<Idx> = None;
        for idx in self.iter(storage) {
            if let Some(prev) = prev {
                assert!(
                    self.order
                        .less_or_equal(record(storage, prev), record(storage, idx)),
                    "tree node {} out of order",
                    idx.as_usize()
                );
            }
            prev = Some(idx);
        }
    }

    /// Returns the black height of the subtree at `idx`.
    fn validate_subtree<T, S>(&self, storage: &S, idx: Idx, count: &mut usize) -> usize
    where
        T: TreeEntry<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        if idx.is_nil() {
            return 1;
        }
        *count += 1;

        let node = *record(storage, idx).tree_node();
        for child in [node.left, node.right] {
            if child.is_nil() {
                continue;
            }
            let child_node = record(storage, child).tree_node();
            assert!(
                child_node.parent == idx,
                "tree node {} has a broken parent link",
                child.as_usize()
            );
            assert!(
                node.color == Color::Black || child_node.color == Color::Black,
                "red tree node {} has a red child",
                idx.as_usize()
            );
        }

        let left = self.validate_subtree(storage, node.left, count);
        let right = self.validate_subtree(storage, node.right, count);
        assert_eq!(left, right, "black height differs below tree node {}", idx.as_usize());

        left + usize::from(node.color == Color::Black)
    }

    // =========================================================================
    // Rebalancing
    // =========================================================================

    fn fix_after_insert<T, S>(&mut self, storage: &mut S, mut x: Idx)
    where
        T: TreeEntry<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        loop {
            let y = self.parent(storage, x);
            if self.color(storage, y) == Color::Black {
                break;
            }

            let z = self.parent(storage, y);
            let uncle;

            if y == self.left(storage, z) {
                uncle = self.right(storage, z);
                if self.color(storage, uncle) == Color::Black {
                    let y = if x == self.right(storage, y) {
                        self.rotate_left(storage, y);
                        x
                    } else {
                        y
                    };
                    self.set_color(storage, y, Color::Black);
                    self.set_color(storage, z, Color::Red);
                    self.rotate_right(storage, z);
                    break;
                }
            } else {
                uncle = self.left(storage, z);
                if self.color(storage, uncle) == Color::Black {
                    let y = if x == self.left(storage, y) {
                        self.rotate_right(storage, y);
                        x
                    } else {
                        y
                    };
                    self.set_color(storage, y, Color::Black);
                    self.set_color(storage, z, Color::Red);
                    self.rotate_left(storage, z);
                    break;
                }
            }

            self.set_color(storage, y, Color::Black);
            self.set_color(storage, z, Color::Red);
            self.set_color(storage, uncle, Color::Black);
            x = z;
        }

        let root = self.nil.left;
        self.set_color(storage, root, Color::Black);
    }

    fn fix_after_remove<T, S>(&mut self, storage: &mut S, mut x: Idx)
    where
        T: TreeEntry<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        while x != self.nil.left && self.color(storage, x) == Color::Black {
            let y = self.parent(storage, x);
            let mut z;

            if x == self.left(storage, y) {
                z = self.right(storage, y);
                if self.color(storage, z) == Color::Red {
                    self.set_color(storage, y, Color::Red);
                    self.set_color(storage, z, Color::Black);
                    self.rotate_left(storage, y);
                    z = self.right(storage, y);
                }

                let mut v = self.right(storage, z);
                let w = self.left(storage, z);
                if self.color(storage, v) == Color::Red || self.color(storage, w) == Color::Red {
                    if self.color(storage, v) == Color::Black {
                        self.set_color(storage, z, Color::Red);
                        self.set_color(storage, w, Color::Black);
                        self.rotate_right(storage, z);
                        v = z;
                        z = w;
                    }

                    let color = self.color(storage, y);
                    self.set_color(storage, z, color);
                    self.set_color(storage, y, Color::Black);
                    self.set_color(storage, v, Color::Black);
                    self.rotate_left(storage, y);
                    x = self.nil.left;
                    break;
                }
            } else {
                z = self.left(storage, y);
                if self.color(storage, z) == Color::Red {
                    self.set_color(storage, z, Color::Black);
                    self.set_color(storage, y, Color::Red);
                    self.rotate_right(storage, y);
                    z = self.left(storage, y);
                }

                let mut v = self.left(storage, z);
                let w = self.right(storage, z);
                if self.color(storage, v) == Color::Red || self.color(storage, w) == Color::Red {
                    if self.color(storage, v) == Color::Black {
                        self.set_color(storage, z, Color::Red);
                        self.set_color(storage, w, Color::Black);
                        self.rotate_left(storage, z);
                        v = z;
                        z = w;
                    }

                    let color = self.color(storage, y);
                    self.set_color(storage, z, color);
                    self.set_color(storage, y, Color::Black);
                    self.set_color(storage, v, Color::Black);
                    self.rotate_right(storage, y);
                    x = self.nil.left;
                    break;
                }
            }

            self.set_color(storage, z, Color::Red);
            x = y;
        }

        self.set_color(storage, x, Color::Black);
    }

    // =========================================================================
    // Link primitives; `Idx::NIL` resolves to the sentinel
    // =========================================================================

    #[inline]
    fn node<'a, T, S>(&'a self, storage: &'a S, idx: Idx) -> &'a RbNode<Idx>
    where
        T: TreeEntry<Idx, Tag> + 'a,
        S: Storage<T, Idx> + ?Sized,
    {
        if idx.is_nil() {
            &self.nil
        } else {
            record(storage, idx).tree_node()
        }
    }

    #[inline]
    fn node_mut<'a, T, S>(&'a mut self, storage: &'a mut S, idx: Idx) -> &'a mut RbNode<Idx>
    where
        T: TreeEntry<Idx, Tag> + 'a,
        S: Storage<T, Idx> + ?Sized,
    {
        if idx.is_nil() {
            &mut self.nil
        } else {
            record_mut(storage, idx).tree_node_mut()
        }
    }

    #[inline]
    fn parent<T, S>(&self, storage: &S, idx: Idx) -> Idx
    where
        T: TreeEntry<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        self.node(storage, idx).parent
    }

    #[inline]
    fn left<T, S>(&self, storage: &S, idx: Idx) -> Idx
    where
        T: TreeEntry<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        self.node(storage, idx).left
    }

    #[inline]
    fn right<T, S>(&self, storage: &S, idx: Idx) -> Idx
    where
        T: TreeEntry<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        self.node(storage, idx).right
    }

    #[inline]
    fn color<T, S>(&self, storage: &S, idx: Idx) -> Color
    where
        T: TreeEntry<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        self.node(storage, idx).color
    }

    #[inline]
    fn set_color<T, S>(&mut self, storage: &mut S, idx: Idx, color: Color)
    where
        T: TreeEntry<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        self.node_mut(storage, idx).color = color;
    }

    #[inline]
    fn leftmost<T, S>(&self, storage: &S, mut idx: Idx) -> Idx
    where
        T: TreeEntry<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        loop {
            let left = self.left(storage, idx);
            if left.is_nil() {
                return idx;
            }
            idx = left;
        }
    }

    #[inline]
    fn rightmost<T, S>(&self, storage: &S, mut idx: Idx) -> Idx
    where
        T: TreeEntry<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        loop {
            let right = self.right(storage, idx);
            if right.is_nil() {
                return idx;
            }
            idx = right;
        }
    }

    /// Makes `child` the left child of `idx`. Either may be the sentinel.
    #[inline]
    fn set_left<T, S>(&mut self, storage: &mut S, idx: Idx, child: Idx)
    where
        T: TreeEntry<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        self.node_mut(storage, idx).left = child;
        self.node_mut(storage, child).parent = idx;
    }

    /// Makes `child` the right child of `idx`. Either may be the sentinel.
    #[inline]
    fn set_right<T, S>(&mut self, storage: &mut S, idx: Idx, child: Idx)
    where
        T: TreeEntry<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        self.node_mut(storage, idx).right = child;
        self.node_mut(storage, child).parent = idx;
    }

    /// Puts `other` where `idx` hangs off its parent.
    #[inline]
    fn replace<T, S>(&mut self, storage: &mut S, idx: Idx, other: Idx)
    where
        T: TreeEntry<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        let parent = self.parent(storage, idx);
        if self.left(storage, parent) == idx {
            self.set_left(storage, parent, other);
        } else {
            self.set_right(storage, parent, other);
        }
    }

    fn rotate_left<T, S>(&mut self, storage: &mut S, idx: Idx)
    where
        T: TreeEntry<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        let sub = self.right(storage, idx);
        let inner = self.left(storage, sub);
        self.set_right(storage, idx, inner);
        self.replace(storage, idx, sub);
        self.set_left(storage, sub, idx);
    }

    fn rotate_right<T, S>(&mut self, storage: &mut S, idx: Idx)
    where
        T: TreeEntry<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        let sub = self.left(storage, idx);
        let inner = self.right(storage, sub);
        self.set_left(storage, idx, inner);
        self.replace(storage, idx, sub);
        self.set_right(storage, sub, idx);
    }
}

// =============================================================================
// Cursor
// =============================================================================

/// Detached, erase-safe in-order cursor over an [`RbTree`].
///
/// Keeps an explicit stack of `(node, subtree)` pairs: the node still to be
/// returned, and the subtree to descend once it is. Before returning a node
/// the cursor has already pushed the spine of the subtree that follows it,
/// so the caller may reset the returned node or drop its record, then
/// [`RbTree::reset`] the tree once the walk is done.
///
/// Any insertion or removal invalidates the cursor: rebalancing rewires
/// nodes still on the stack.
pub struct TreeCursor<Idx: Index, Tag = ()> {
    stack: Vec<(Idx, Idx)>,
    reverse: bool,
    _tag: PhantomData<fn() -> Tag>,
}

impl<Idx: Index, Tag> TreeCursor<Idx, Tag> {
    fn new(root: Idx, reverse: bool) -> Self {
        let mut stack = Vec::with_capacity(CURSOR_STACK_DEPTH);
        // No node to return yet; the whole tree is still to be descended.
        stack.push((Idx::NIL, root));
        Self {
            stack,
            reverse,
            _tag: PhantomData,
        }
    }

    /// Returns the next member, or `None` past the end.
    pub fn next<T, S>(&mut self, storage: &S) -> Option<Idx>
    where
        T: TreeEntry<Idx, Tag>,
        S: Storage<T, Idx> + ?Sized,
    {
        loop {
            let (idx, mut subtree) = self.stack.pop()?;

            while !subtree.is_nil() {
                let node = record(storage, subtree).tree_node();
                let (toward, away) = if self.reverse {
                    (node.right, node.left)
                } else {
                    (node.left, node.right)
                };
                self.stack.push((subtree, away));
                subtree = toward;
            }

            if !idx.is_nil() {
                return Some(idx);
            }
        }
    }
}

impl<Idx: Index + fmt::Debug, Tag> fmt::Debug for TreeCursor<Idx, Tag> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeCursor")
            .field("stack", &self.stack)
            .field("reverse", &self.reverse)
            .finish()
    }
}

// =============================================================================
// Iter
// =============================================================================

/// In-order iterator over member indices of an [`RbTree`], borrowing
/// storage.
pub struct Iter<'a, T, S: ?Sized, Idx: Index, Tag = ()> {
    storage: &'a S,
    cursor: TreeCursor<Idx, Tag>,
    _marker: PhantomData<fn() -> T>,
}

impl<T, S, Idx, Tag> Iterator for Iter<'_, T, S, Idx, Tag>
where
    T: TreeEntry<Idx, Tag>,
    S: Storage<T, Idx> + ?Sized,
    Idx: Index,
{
    type Item = Idx;

    #[inline]
    fn next(&mut self) -> Option<Idx> {
        self.cursor.next(self.storage)
    }
}

//! Caller-supplied callbacks: ordering, key comparison, hashing, matching.
//!
//! Containers take these at construction and keep them for their whole
//! lifetime. Every trait has a blanket impl for the matching closure shape,
//! so plain closures work everywhere:
//!
//! ```
//! use nexus_intrusive::{KeyHash, NodeOrder};
//!
//! struct Timer {
//!     deadline: u64,
//! }
//!
//! let by_deadline = |a: &Timer, b: &Timer| a.deadline <= b.deadline;
//! assert!(by_deadline.less_or_equal(&Timer { deadline: 1 }, &Timer { deadline: 2 }));
//!
//! let hasher = |key: &u64| key.wrapping_mul(0x9E37_79B9_7F4A_7C15);
//! assert_eq!(hasher.hash(&0), 0);
//! ```

use core::cmp::Ordering;

/// Total preorder over records: `less_or_equal(a, b)` holds when `a` may
/// precede `b`.
///
/// Must stay consistent for as long as the records are in the container.
/// Ties are broken by the container's mechanics, not by insertion order.
pub trait NodeOrder<T: ?Sized> {
    /// Returns `true` if `a` is not greater than `b`.
    fn less_or_equal(&self, a: &T, b: &T) -> bool;
}

impl<T: ?Sized, F> NodeOrder<T> for F
where
    F: Fn(&T, &T) -> bool,
{
    #[inline]
    fn less_or_equal(&self, a: &T, b: &T) -> bool {
        self(a, b)
    }
}

/// Orders records by their own [`Ord`] impl.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Natural;

impl<T: Ord + ?Sized> NodeOrder<T> for Natural {
    #[inline]
    fn less_or_equal(&self, a: &T, b: &T) -> bool {
        a <= b
    }
}

/// Compares a record against a lookup key.
///
/// Returns the ordering of the record relative to the key: `Less` when the
/// record sorts before the key. Must agree in sign with the container's
/// [`NodeOrder`].
pub trait KeyCompare<T: ?Sized, K: ?Sized> {
    /// Orders `record` relative to `key`.
    fn compare(&self, record: &T, key: &K) -> Ordering;
}

impl<T: ?Sized, K: ?Sized, F> KeyCompare<T, K> for F
where
    F: Fn(&T, &K) -> Ordering,
{
    #[inline]
    fn compare(&self, record: &T, key: &K) -> Ordering {
        self(record, key)
    }
}

/// Hashes a lookup key into 64 bits.
///
/// The hash map splits and merges slots on individual hash bits, starting
/// from the lowest, so the low bits should be well mixed.
pub trait KeyHash<K: ?Sized> {
    /// Returns the hash of `key`.
    fn hash(&self, key: &K) -> u64;
}

impl<K: ?Sized, F> KeyHash<K> for F
where
    F: Fn(&K) -> u64,
{
    #[inline]
    fn hash(&self, key: &K) -> u64 {
        self(key)
    }
}

/// Decides whether a record is the one stored under a key.
///
/// Only called for records whose cached hash equals the key's hash.
pub trait KeyMatch<T: ?Sized, K: ?Sized> {
    /// Returns `true` if `record` matches `key`.
    fn matches(&self, record: &T, key: &K) -> bool;
}

impl<T: ?Sized, K: ?Sized, F> KeyMatch<T, K> for F
where
    F: Fn(&T, &K) -> bool,
{
    #[inline]
    fn matches(&self, record: &T, key: &K) -> bool {
        self(record, key)
    }
}

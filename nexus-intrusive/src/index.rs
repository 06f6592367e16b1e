//! Sentinel-based index trait for node links.
//!
//! Links are plain indices into caller storage. Two values of every index
//! type are reserved so a link never needs an `Option` wrapper:
//!
//! - [`Index::NONE`] marks a node that is not linked anywhere (reset).
//! - [`Index::NIL`] names the container's own sentinel.

/// A copyable index type with reserved "unlinked" and "sentinel" values.
///
/// # Example
///
/// ```
/// use nexus_intrusive::Index;
///
/// let idx: u32 = 5;
///
/// assert!(idx.is_some());
/// assert!(u32::NONE.is_none());
/// assert!(u32::NIL.is_nil());
/// assert!(!u32::NIL.is_none());
/// ```
pub trait Index: Copy + Eq {
    /// Sentinel value representing "not linked".
    const NONE: Self;

    /// Sentinel value naming a container's own sentinel node.
    const NIL: Self;

    /// Returns `true` if this is the unlinked value.
    #[inline]
    fn is_none(self) -> bool {
        self == Self::NONE
    }

    /// Returns `true` if this refers to a real slot in storage.
    #[inline]
    fn is_some(self) -> bool {
        !self.is_none() && !self.is_nil()
    }

    /// Returns `true` if this names the container's sentinel.
    #[inline]
    fn is_nil(self) -> bool {
        self == Self::NIL
    }

    /// Returns the index as a `usize` for slot addressing.
    fn as_usize(self) -> usize;
}

macro_rules! impl_index_for_unsigned {
    ($($ty:ty),*) => {
        $(
            impl Index for $ty {
                const NONE: Self = <$ty>::MAX;
                const NIL: Self = <$ty>::MAX - 1;

                #[inline]
                fn as_usize(self) -> usize {
                    self as usize
                }
            }
        )*
    };
}

impl_index_for_unsigned!(u8, u16, u32, u64, usize);

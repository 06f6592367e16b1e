//! Storage trait for caller-owned record pools with stable indices.
//!
//! Storage owns the records; containers only rewrite the link fields
//! embedded in them. Containers never insert into or remove from storage,
//! so any indexable pool works: a `Vec`, an array, a boxed slice, or a
//! `slab::Slab` (feature `slab`).

use crate::Index;

/// Record pool addressed by stable indices.
///
/// # Requirements
///
/// An index must keep naming the same record for as long as that record is
/// a member of any container. Removing or moving a linked record out from
/// under a container is a caller contract violation; the containers detect
/// it only when the slot becomes vacant (and then panic).
///
/// # Implementations
///
/// - `[T]`, `[T; N]`, `Vec<T>` - dense pools, every index below `len` is live
/// - `slab::Slab<T>` - sparse pool with slot reuse (feature `slab`)
pub trait Storage<T, Idx: Index> {
    /// Returns a reference to the record at `index`, if present.
    fn get(&self, index: Idx) -> Option<&T>;

    /// Returns a mutable reference to the record at `index`, if present.
    fn get_mut(&mut self, index: Idx) -> Option<&mut T>;
}

impl<T, Idx: Index> Storage<T, Idx> for [T] {
    #[inline]
    fn get(&self, index: Idx) -> Option<&T> {
        <[T]>::get(self, index.as_usize())
    }

    #[inline]
    fn get_mut(&mut self, index: Idx) -> Option<&mut T> {
        <[T]>::get_mut(self, index.as_usize())
    }
}

impl<T, Idx: Index, const N: usize> Storage<T, Idx> for [T; N] {
    #[inline]
    fn get(&self, index: Idx) -> Option<&T> {
        self.as_slice().get(index.as_usize())
    }

    #[inline]
    fn get_mut(&mut self, index: Idx) -> Option<&mut T> {
        self.as_mut_slice().get_mut(index.as_usize())
    }
}

impl<T, Idx: Index> Storage<T, Idx> for Vec<T> {
    #[inline]
    fn get(&self, index: Idx) -> Option<&T> {
        self.as_slice().get(index.as_usize())
    }

    #[inline]
    fn get_mut(&mut self, index: Idx) -> Option<&mut T> {
        self.as_mut_slice().get_mut(index.as_usize())
    }
}

// =============================================================================
// slab::Slab implementation
// =============================================================================

#[cfg(feature = "slab")]
impl<T, Idx: Index> Storage<T, Idx> for slab::Slab<T> {
    #[inline]
    fn get(&self, index: Idx) -> Option<&T> {
        slab::Slab::get(self, index.as_usize())
    }

    #[inline]
    fn get_mut(&mut self, index: Idx) -> Option<&mut T> {
        slab::Slab::get_mut(self, index.as_usize())
    }
}

/// Returns the record at `idx`, panicking on an index storage does not know.
#[inline]
#[track_caller]
pub(crate) fn record<T, Idx, S>(storage: &S, idx: Idx) -> &T
where
    Idx: Index,
    S: Storage<T, Idx> + ?Sized,
{
    match storage.get(idx) {
        Some(record) => record,
        None => invalid_index(idx.as_usize()),
    }
}

/// Mutable counterpart of [`record`].
#[inline]
#[track_caller]
pub(crate) fn record_mut<T, Idx, S>(storage: &mut S, idx: Idx) -> &mut T
where
    Idx: Index,
    S: Storage<T, Idx> + ?Sized,
{
    match storage.get_mut(idx) {
        Some(record) => record,
        None => invalid_index(idx.as_usize()),
    }
}

#[cold]
#[inline(never)]
#[track_caller]
fn invalid_index(idx: usize) -> ! {
    panic!("invalid index {idx}: no record in storage")
}

//! # Generational Handles
//!
//! Handles are lightweight references consisting of:
//! - An index into the table's sparse slots
//! - A generation counter for detecting stale references
//!
//! Generation `0` is never issued, so a zeroed handle is always invalid.

mod table;

pub use table::HandleTable;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use bytemuck::{Pod, Zeroable};

/// Untyped `{index, generation}` pair.
///
/// This is the representation stored in a table's dense handle array and the
/// form that crosses subsystem boundaries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct RawHandle {
    /// Index of the sparse slot.
    pub index: u32,
    /// Generation the slot had when the handle was issued.
    pub generation: u32,
}

impl RawHandle {
    /// The never-issued handle.
    pub const NULL: Self = Self {
        index: 0,
        generation: 0,
    };

    /// Creates a handle from index and generation.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Checks if this handle was never issued (generation 0).
    ///
    /// A non-null handle may still be stale; only the table can tell.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.generation == 0
    }

    /// Packs the handle into a `u64` (generation in the upper 32 bits).
    #[inline]
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        ((self.generation as u64) << 32) | (self.index as u64)
    }

    /// Unpacks a handle produced by [`RawHandle::to_bits`].
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}

impl fmt::Display for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Handle to a record of type `T` in a [`HandleTable`].
///
/// The type parameter keeps handles of different tables apart at compile
/// time; the layout is identical to [`RawHandle`].
#[repr(transparent)]
pub struct Handle<T> {
    raw: RawHandle,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    /// The never-issued handle.
    pub const NULL: Self = Self::from_raw(RawHandle::NULL);

    /// Wraps a raw handle.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: RawHandle) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    /// The untyped handle.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> RawHandle {
        self.raw
    }

    /// Index of the sparse slot.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.raw.index
    }

    /// Generation at issue time.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.raw.generation
    }

    /// Checks if this handle was never issued.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.raw.is_null()
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<T> Default for Handle<T> {
    fn default() -> Self {
        Self::NULL
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("index", &self.raw.index)
            .field("generation", &self.raw.generation)
            .finish()
    }
}

impl<T> From<Handle<T>> for RawHandle {
    fn from(handle: Handle<T>) -> Self {
        handle.raw
    }
}

/// Sentinel ending the sparse free list.
pub const FREE_LIST_END: u32 = u32::MAX;

/// Entry of a table's sparse array.
///
/// While occupied, `index_or_next` is the record's dense position. While
/// free, it is the next free sparse slot (or [`FREE_LIST_END`]). This list is
/// separate from the pool allocator's chunk free list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct SparseSlot {
    /// Dense position (occupied) or next free slot (free).
    pub index_or_next: u32,
    /// Current generation of the slot. `0` marks a retired slot.
    pub generation: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_bits_roundtrip() {
        let h = RawHandle::new(12345, 67890);
        assert_eq!(RawHandle::from_bits(h.to_bits()), h);
        assert_eq!(h.to_bits() >> 32, 67890);
    }

    #[test]
    fn test_handle_equality() {
        let h1 = RawHandle::new(5, 2);
        let h2 = RawHandle::new(5, 2);
        let h3 = RawHandle::new(5, 3);
        let h4 = RawHandle::new(6, 2);

        assert_eq!(h1, h2);
        assert_ne!(h1, h3);
        assert_ne!(h1, h4);
    }

    #[test]
    fn test_null_handles() {
        assert!(RawHandle::NULL.is_null());
        assert!(RawHandle::new(1, 0).is_null());
        assert!(!RawHandle::new(0, 2).is_null());
        assert!(!RawHandle::new(5, 10).is_null());
        assert!(Handle::<u32>::default().is_null());
    }

    #[test]
    fn test_typed_handle_cast() {
        let raw = RawHandle::new(42, 7);
        let typed: Handle<f32> = Handle::from_raw(raw);

        assert_eq!(typed.index(), 42);
        assert_eq!(typed.generation(), 7);
        assert_eq!(RawHandle::from(typed), raw);
    }

    #[test]
    fn test_layouts() {
        assert_eq!(std::mem::size_of::<RawHandle>(), 8);
        assert_eq!(std::mem::size_of::<Handle<[u8; 64]>>(), 8);
        assert_eq!(std::mem::size_of::<SparseSlot>(), 8);
    }
}

//! # Backing Storage
//!
//! The raw byte blocks that arenas and pools carve up.
//!
//! ## Safety Note
//!
//! `AlignedBuffer` is the only place in the crate that talks to the global
//! allocator directly. Everything above it works on safe slices.

#![allow(unsafe_code)]

use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};
use std::fmt;
use std::ptr::NonNull;

use crate::error::{MemoryError, MemoryResult};

use super::align::is_power_of_two;

/// A byte block an allocator can own.
///
/// `Default` must yield an empty block; allocators use it to release their
/// storage on `destroy`.
pub trait Backing: AsRef<[u8]> + AsMut<[u8]> + Default {}

impl<B: AsRef<[u8]> + AsMut<[u8]> + Default> Backing for B {}

/// Zero-initialised heap block with a guaranteed base alignment.
///
/// `Box<[u8]>` only promises byte alignment, which would make the usable
/// capacity of an arena depend on where the global allocator put it.
pub struct AlignedBuffer {
    /// Start of the block (dangling when empty).
    ptr: NonNull<u8>,
    /// Layout used for the allocation.
    layout: Layout,
}

impl AlignedBuffer {
    /// Allocates `size` zeroed bytes aligned to `align`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAlignment` if `align` is not a power of two and
    /// `LayoutOverflow` if the size cannot be represented.
    pub fn zeroed(size: usize, align: usize) -> MemoryResult<Self> {
        if !is_power_of_two(align) {
            return Err(MemoryError::InvalidAlignment(align));
        }
        let layout =
            Layout::from_size_align(size, align).map_err(|_| MemoryError::LayoutOverflow { size })?;

        if size == 0 {
            return Ok(Self {
                ptr: NonNull::dangling(),
                layout,
            });
        }

        // SAFETY: layout has a non-zero size.
        let raw = unsafe { alloc_zeroed(layout) };
        let Some(ptr) = NonNull::new(raw) else {
            handle_alloc_error(layout);
        };

        Ok(Self { ptr, layout })
    }

    /// Length of the block in bytes.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.layout.size()
    }

    /// Whether the block is empty.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.layout.size() == 0
    }

    /// Base alignment of the block.
    #[inline]
    #[must_use]
    pub const fn align(&self) -> usize {
        self.layout.align()
    }
}

impl Default for AlignedBuffer {
    fn default() -> Self {
        Self {
            ptr: NonNull::dangling(),
            layout: Layout::new::<()>(),
        }
    }
}

impl AsRef<[u8]> for AlignedBuffer {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        // SAFETY: ptr is valid for len() initialised bytes (zeroed on
        // allocation) or dangling with len() == 0.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len()) }
    }
}

impl AsMut<[u8]> for AlignedBuffer {
    #[inline]
    fn as_mut(&mut self) -> &mut [u8] {
        // SAFETY: as above, and &mut self guarantees exclusive access.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len()) }
    }
}

impl Drop for AlignedBuffer {
    fn drop(&mut self) {
        if self.layout.size() > 0 {
            // SAFETY: we allocated this block with exactly this layout.
            unsafe {
                dealloc(self.ptr.as_ptr(), self.layout);
            }
        }
    }
}

impl fmt::Debug for AlignedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlignedBuffer")
            .field("len", &self.len())
            .field("align", &self.align())
            .finish()
    }
}

// SAFETY: AlignedBuffer uniquely owns its allocation, like Box<[u8]>.
unsafe impl Send for AlignedBuffer {}
// SAFETY: shared access only hands out &[u8].
unsafe impl Sync for AlignedBuffer {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroed_and_aligned() {
        let buf = AlignedBuffer::zeroed(256, 64).unwrap();
        assert_eq!(buf.len(), 256);
        assert_eq!(buf.as_ref().as_ptr() as usize % 64, 0);
        assert!(buf.as_ref().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_empty_buffer() {
        let buf = AlignedBuffer::zeroed(0, 16).unwrap();
        assert!(buf.is_empty());
        assert!(buf.as_ref().is_empty());
        assert!(AlignedBuffer::default().is_empty());
    }

    #[test]
    fn test_rejects_bad_alignment() {
        assert_eq!(
            AlignedBuffer::zeroed(16, 3).unwrap_err(),
            MemoryError::InvalidAlignment(3)
        );
    }

    #[test]
    fn test_writes_are_visible() {
        let mut buf = AlignedBuffer::zeroed(8, 8).unwrap();
        buf.as_mut()[3] = 7;
        assert_eq!(buf.as_ref()[3], 7);
    }
}

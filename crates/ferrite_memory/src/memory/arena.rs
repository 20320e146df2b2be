//! # Arena Allocator
//!
//! A bump allocator over one fixed block. Allocations are freed all at once
//! when the arena is reset, never individually.

use std::fmt;

use crate::error::{MemoryError, MemoryResult};

use super::align::{align_forward, is_power_of_two, DEFAULT_ALIGNMENT};
use super::backing::{AlignedBuffer, Backing};
use super::block::Block;

/// A bump-pointer arena allocator.
///
/// Allocations are fast (just bump an offset) and zero-filled. Memory is
/// reclaimed all at once by [`Arena::reset_all`].
///
/// # Reset Contract
///
/// `reset_all` instantly invalidates every block handed out so far. Blocks
/// carry the epoch they were issued in, so debug builds catch a block that
/// outlives its reset. Release builds do not check.
///
/// # Thread Safety
///
/// This arena is NOT thread-safe. Use one arena per thread.
///
/// # Example
///
/// ```rust
/// use ferrite_memory::Arena;
///
/// let mut arena = Arena::new(1024).unwrap();
///
/// let block = arena.allocate(64).unwrap();
/// arena.bytes_mut(block)[0] = 1;
///
/// // Reset to free all allocations
/// arena.reset_all();
/// assert_eq!(arena.committed_size(), 0);
/// ```
pub struct Arena<B: Backing = AlignedBuffer> {
    /// The backing storage.
    storage: B,
    /// Current allocation offset.
    offset: usize,
    /// Incremented on every reset.
    epoch: u32,
}

impl Arena {
    /// Creates a new arena with a freshly allocated block of `capacity` bytes.
    ///
    /// The block is aligned to [`DEFAULT_ALIGNMENT`], so the full capacity is
    /// usable by default-aligned allocations.
    ///
    /// # Errors
    ///
    /// Returns `EmptyBuffer` if `capacity` is zero.
    pub fn new(capacity: usize) -> MemoryResult<Self> {
        if capacity == 0 {
            return Err(MemoryError::EmptyBuffer);
        }
        Self::from_buffer(AlignedBuffer::zeroed(capacity, DEFAULT_ALIGNMENT)?)
    }
}

impl<B: Backing> Arena<B> {
    /// Creates an arena over a caller-supplied block.
    ///
    /// # Arguments
    ///
    /// * `buffer` - The block to allocate from. The arena owns it until
    ///   [`Arena::destroy`] or drop.
    ///
    /// # Errors
    ///
    /// Returns `EmptyBuffer` if the block has no bytes.
    pub fn from_buffer(buffer: B) -> MemoryResult<Self> {
        let capacity = buffer.as_ref().len();
        if capacity == 0 {
            return Err(MemoryError::EmptyBuffer);
        }
        tracing::debug!("arena created: {} bytes", capacity);
        Ok(Self {
            storage: buffer,
            offset: 0,
            epoch: 0,
        })
    }

    /// Returns the total capacity in bytes.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.as_ref().len()
    }

    /// Returns the bytes committed so far (the bump offset).
    #[inline]
    #[must_use]
    pub fn committed_size(&self) -> usize {
        self.offset
    }

    /// Returns the remaining free space in bytes.
    #[inline]
    #[must_use]
    pub fn free_size(&self) -> usize {
        self.capacity() - self.offset
    }

    /// Number of resets this arena has gone through.
    #[inline]
    #[must_use]
    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Allocates `size` bytes aligned to `align`.
    ///
    /// The returned range is zero-filled. On failure the offset is left
    /// untouched.
    ///
    /// # Arguments
    ///
    /// * `size` - Number of bytes
    /// * `align` - Alignment of the first byte's address (power of two)
    ///
    /// # Returns
    ///
    /// The allocated block, or None if the arena cannot fit it.
    pub fn allocate_aligned(&mut self, size: usize, align: usize) -> Option<Block> {
        debug_assert!(is_power_of_two(align), "alignment {align} is not a power of two");
        if !is_power_of_two(align) {
            return None;
        }

        let base = self.storage.as_ref().as_ptr() as usize;
        let aligned = align_forward(base.checked_add(self.offset)?, align)? - base;
        let end = aligned.checked_add(size)?;

        if end > self.capacity() {
            tracing::debug!(
                "arena exhausted: requested {} bytes (align {}), {} of {} committed",
                size,
                align,
                self.offset,
                self.capacity()
            );
            return None;
        }

        self.offset = end;
        self.storage.as_mut()[aligned..end].fill(0);
        Some(Block::new(aligned, size, self.epoch))
    }

    /// Allocates `size` bytes with [`DEFAULT_ALIGNMENT`].
    #[inline]
    pub fn allocate(&mut self, size: usize) -> Option<Block> {
        self.allocate_aligned(size, DEFAULT_ALIGNMENT)
    }

    /// Moves an allocation into a new block of `new_size` bytes.
    ///
    /// Copies `min(committed_tail, new_size)` bytes, where `committed_tail`
    /// runs from the start of `block` to the current offset. The old block is
    /// abandoned, not reclaimed.
    ///
    /// # Returns
    ///
    /// The new block, or None if the arena is full. Passing a block that is
    /// not committed in the current epoch is a contract violation: it asserts
    /// in debug builds and returns None in release builds.
    pub fn reallocate(&mut self, block: Block, new_size: usize) -> Option<Block> {
        debug_assert!(self.contains(block), "reallocate of foreign or stale {block}");
        if !self.contains(block) {
            return None;
        }

        let committed_tail = self.offset - block.offset;
        let moved = self.allocate(new_size)?;
        let copy_len = committed_tail.min(new_size);
        self.storage
            .as_mut()
            .copy_within(block.offset..block.offset + copy_len, moved.offset);
        Some(moved)
    }

    /// Carves a child arena of `capacity` bytes out of this one.
    ///
    /// The child borrows its region, so the parent cannot be reset or
    /// destroyed while the child is alive.
    pub fn sub_arena(&mut self, capacity: usize) -> Option<Arena<&mut [u8]>> {
        if capacity == 0 {
            return None;
        }
        let block = self.allocate(capacity)?;
        let region = &mut self.storage.as_mut()[block.range()];
        Arena::from_buffer(region).ok()
    }

    /// Resets the arena, invalidating all previous allocations.
    ///
    /// This is an O(1) operation - no memory is freed or cleared. Blocks
    /// issued before the reset must not be used afterwards.
    #[inline]
    pub fn reset_all(&mut self) {
        tracing::trace!("arena reset: {} bytes released", self.offset);
        self.offset = 0;
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// Releases the backing block. The arena has zero capacity afterwards.
    pub fn destroy(&mut self) {
        self.storage = B::default();
        self.offset = 0;
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// Consumes the arena and hands the backing block back.
    #[must_use]
    pub fn into_inner(self) -> B {
        self.storage
    }

    /// Whether `block` is committed in this arena's current epoch.
    #[inline]
    #[must_use]
    pub fn contains(&self, block: Block) -> bool {
        block.epoch == self.epoch && block.end() <= self.offset
    }

    /// Bytes of a live block.
    #[inline]
    #[must_use]
    pub fn bytes(&self, block: Block) -> &[u8] {
        debug_assert!(self.contains(block), "access through stale {block}");
        &self.storage.as_ref()[block.range()]
    }

    /// Mutable bytes of a live block.
    #[inline]
    pub fn bytes_mut(&mut self, block: Block) -> &mut [u8] {
        debug_assert!(self.contains(block), "access through stale {block}");
        &mut self.storage.as_mut()[block.range()]
    }
}

impl<B: Backing> fmt::Debug for Arena<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("capacity", &self.capacity())
            .field("offset", &self.offset)
            .field("epoch", &self.epoch)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_allocation() {
        let mut arena = Arena::new(1024).unwrap();
        let block = arena.allocate(10).unwrap();
        assert_eq!(block.len(), 10);
        assert_eq!(block.offset(), 0);
        assert_eq!(arena.committed_size(), 10);
    }

    #[test]
    fn test_arena_reset() {
        let mut arena = Arena::new(1024).unwrap();
        let _ = arena.allocate(10).unwrap();
        assert!(arena.committed_size() > 0);

        arena.reset_all();
        assert_eq!(arena.committed_size(), 0);
        assert_eq!(arena.epoch(), 1);
    }

    #[test]
    fn test_alignment_padding() {
        let mut arena = Arena::new(1024).unwrap();
        let a = arena.allocate_aligned(3, 1).unwrap();
        let b = arena.allocate_aligned(8, 8).unwrap();
        assert_eq!(a.offset(), 0);
        assert_eq!(b.offset(), 8);
        assert_eq!(arena.bytes(b).as_ptr() as usize % 8, 0);
    }

    #[test]
    fn test_failure_does_not_advance() {
        let mut arena = Arena::new(64).unwrap();
        let _ = arena.allocate(40).unwrap();
        assert!(arena.allocate(40).is_none());
        assert_eq!(arena.committed_size(), 40);
        assert!(arena.allocate_aligned(24, 1).is_some());
    }

    #[test]
    fn test_allocations_are_zeroed() {
        let mut arena = Arena::new(64).unwrap();
        let block = arena.allocate(32).unwrap();
        arena.bytes_mut(block).fill(0xAB);

        arena.reset_all();
        let again = arena.allocate(32).unwrap();
        assert!(arena.bytes(again).iter().all(|&b| b == 0));
    }

    #[test]
    fn test_reallocate_copies_forward() {
        let mut arena = Arena::new(256).unwrap();
        let block = arena.allocate(4).unwrap();
        arena.bytes_mut(block).copy_from_slice(&[1, 2, 3, 4]);

        let grown = arena.reallocate(block, 8).unwrap();
        assert_ne!(grown.offset(), block.offset());
        assert_eq!(&arena.bytes(grown)[..4], &[1, 2, 3, 4]);
        assert_eq!(grown.len(), 8);
    }

    #[test]
    fn test_reallocate_shrinks() {
        let mut arena = Arena::new(256).unwrap();
        let block = arena.allocate(8).unwrap();
        arena.bytes_mut(block).copy_from_slice(&[9; 8]);

        let shrunk = arena.reallocate(block, 2).unwrap();
        assert_eq!(arena.bytes(shrunk), &[9, 9]);
    }

    #[test]
    fn test_free_size() {
        let mut arena = Arena::new(128).unwrap();
        let _ = arena.allocate(16).unwrap();
        assert_eq!(arena.free_size(), 112);
    }

    #[test]
    fn test_sub_arena() {
        let mut parent = Arena::new(1024).unwrap();
        {
            let mut child = parent.sub_arena(256).unwrap();
            assert_eq!(child.capacity(), 256);
            let block = child.allocate(256).unwrap();
            child.bytes_mut(block)[0] = 42;
            assert!(child.allocate(1).is_none());
        }
        assert_eq!(parent.committed_size(), 256);
        assert!(parent.sub_arena(2048).is_none());
    }

    #[test]
    fn test_destroy_releases_block() {
        let mut arena = Arena::new(128).unwrap();
        arena.destroy();
        assert_eq!(arena.capacity(), 0);
        assert!(arena.allocate(1).is_none());
    }

    #[test]
    fn test_from_buffer() {
        let arena = Arena::from_buffer(vec![0u8; 32].into_boxed_slice()).unwrap();
        assert_eq!(arena.capacity(), 32);
        assert_eq!(
            Arena::from_buffer(Box::<[u8]>::default()).err(),
            Some(MemoryError::EmptyBuffer)
        );
    }

    #[test]
    fn test_empty_capacity_rejected() {
        assert_eq!(Arena::new(0).err(), Some(MemoryError::EmptyBuffer));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "reallocate of foreign or stale")]
    fn test_reallocate_after_reset_asserts_in_debug() {
        let mut arena = Arena::new(256).unwrap();
        let block = arena.allocate(32).unwrap();
        arena.reset_all();
        let _ = arena.reallocate(block, 64);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "access through stale")]
    fn test_bytes_past_offset_asserts_in_debug() {
        let mut arena = Arena::new(256).unwrap();
        let _ = arena.allocate(16).unwrap();
        let beyond = Block::new(64, 16, arena.epoch());
        let _ = arena.bytes(beyond);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "access through stale")]
    fn test_bytes_mut_after_reset_asserts_in_debug() {
        let mut arena = Arena::new(256).unwrap();
        let block = arena.allocate(16).unwrap();
        arena.reset_all();
        arena.bytes_mut(block)[0] = 1;
    }
}

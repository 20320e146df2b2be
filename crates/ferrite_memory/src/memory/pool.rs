//! # Pool Allocator
//!
//! Fixed-size chunk allocator for objects that are frequently allocated and
//! freed. The free list lives inside the free chunks themselves.

use std::fmt;

use crate::error::{MemoryError, MemoryResult};

use super::align::{align_forward, padding_for, DEFAULT_ALIGNMENT};
use super::backing::{AlignedBuffer, Backing};
use super::block::Block;

/// Size of the free-list link stored at the start of every free chunk.
const LINK_SIZE: usize = std::mem::size_of::<usize>();

/// Free-list terminator.
const NIL: usize = usize::MAX;

/// Rounds a requested chunk size up to something that can hold a free-list
/// link and keeps every chunk on a [`DEFAULT_ALIGNMENT`] boundary.
#[inline]
#[must_use]
pub fn aligned_chunk_size(chunk_size: usize) -> usize {
    align_forward(chunk_size.max(LINK_SIZE), DEFAULT_ALIGNMENT).unwrap_or(usize::MAX)
}

/// A pool allocator handing out equal-size chunks of one block.
///
/// Construction threads a singly linked free list through every chunk: the
/// first machine word of a free chunk holds the index of the next free chunk.
/// Allocation pops the head, free pushes onto it, both in O(1).
///
/// # Free Contract
///
/// Freeing a chunk twice corrupts the free list. Debug builds assert
/// against it; release builds do not check.
///
/// # Thread Safety
///
/// This pool is NOT thread-safe. Use one pool per thread or wrap in a mutex.
///
/// # Example
///
/// ```rust
/// use ferrite_memory::Pool;
///
/// let mut pool = Pool::new(32, 4).unwrap();
///
/// // Allocate - O(1), no heap allocation
/// let chunk = pool.allocate().unwrap();
///
/// // Free - O(1), no heap deallocation
/// pool.free(chunk);
/// assert_eq!(pool.allocated_count(), 0);
/// ```
pub struct Pool<B: Backing = AlignedBuffer> {
    /// The backing storage.
    storage: B,
    /// Offset of the first chunk (alignment padding at the buffer start).
    base: usize,
    /// Size of every chunk in bytes.
    chunk_size: usize,
    /// Number of chunks carved from the block.
    chunk_count: usize,
    /// Number of chunks currently handed out.
    allocated_count: usize,
    /// Index of the first free chunk, or `NIL`.
    head: usize,
    /// Incremented on every `free_all`.
    epoch: u32,
}

impl Pool {
    /// Creates a pool of exactly `chunk_count` chunks on a fresh block.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` - Requested chunk size in bytes (rounded up)
    /// * `chunk_count` - Number of chunks
    ///
    /// # Errors
    ///
    /// Returns `ZeroChunkSize`, `EmptyBuffer` for a zero count, or
    /// `LayoutOverflow` if the block size overflows.
    pub fn new(chunk_size: usize, chunk_count: usize) -> MemoryResult<Self> {
        if chunk_size == 0 {
            return Err(MemoryError::ZeroChunkSize);
        }
        if chunk_count == 0 {
            return Err(MemoryError::EmptyBuffer);
        }
        let rounded = aligned_chunk_size(chunk_size);
        let size = rounded
            .checked_mul(chunk_count)
            .ok_or(MemoryError::LayoutOverflow { size: usize::MAX })?;
        Self::from_buffer(AlignedBuffer::zeroed(size, DEFAULT_ALIGNMENT)?, chunk_size)
    }
}

impl<B: Backing> Pool<B> {
    /// Creates a pool over a caller-supplied block.
    ///
    /// Bytes before the first [`DEFAULT_ALIGNMENT`] boundary and any tail
    /// shorter than a chunk are left unused.
    ///
    /// # Errors
    ///
    /// Returns `ZeroChunkSize` or `BufferTooSmall` if no chunk fits.
    pub fn from_buffer(buffer: B, chunk_size: usize) -> MemoryResult<Self> {
        if chunk_size == 0 {
            return Err(MemoryError::ZeroChunkSize);
        }
        let chunk_size = aligned_chunk_size(chunk_size);
        let len = buffer.as_ref().len();
        let base = padding_for(buffer.as_ref().as_ptr() as usize, DEFAULT_ALIGNMENT);
        let chunk_count = len.saturating_sub(base) / chunk_size;

        if chunk_count == 0 {
            return Err(MemoryError::BufferTooSmall { len, chunk_size });
        }

        let mut pool = Self {
            storage: buffer,
            base,
            chunk_size,
            chunk_count,
            allocated_count: 0,
            head: NIL,
            epoch: 0,
        };
        pool.thread_free_list();

        tracing::debug!(
            "pool created: {} chunks of {} bytes",
            chunk_count,
            chunk_size
        );
        Ok(pool)
    }

    /// Returns the size of each chunk in bytes.
    #[inline]
    #[must_use]
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Returns the number of chunks.
    #[inline]
    #[must_use]
    pub const fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// Returns the number of chunks currently handed out.
    #[inline]
    #[must_use]
    pub const fn allocated_count(&self) -> usize {
        self.allocated_count
    }

    /// Returns the number of free chunks.
    #[inline]
    #[must_use]
    pub const fn free_count(&self) -> usize {
        self.chunk_count - self.allocated_count
    }

    /// Returns the usable capacity in bytes (`chunk_count * chunk_size`).
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.chunk_count * self.chunk_size
    }

    /// Bytes held by allocated chunks.
    #[inline]
    #[must_use]
    pub const fn allocated_size(&self) -> usize {
        self.allocated_count * self.chunk_size
    }

    /// Bytes held by free chunks.
    #[inline]
    #[must_use]
    pub const fn free_size(&self) -> usize {
        self.free_count() * self.chunk_size
    }

    /// Number of `free_all` calls so far.
    #[inline]
    #[must_use]
    pub const fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Allocates one chunk.
    ///
    /// This is a **O(1)** operation. The chunk is zero-filled.
    ///
    /// # Returns
    ///
    /// The chunk, or None if the pool is exhausted.
    pub fn allocate(&mut self) -> Option<Block> {
        if self.head == NIL {
            tracing::debug!("pool exhausted: all {} chunks allocated", self.chunk_count);
            return None;
        }

        let index = self.head;
        self.head = self.read_link(index);
        self.allocated_count += 1;

        let offset = self.chunk_offset(index);
        self.storage.as_mut()[offset..offset + self.chunk_size].fill(0);
        Some(Block::new(offset, self.chunk_size, self.epoch))
    }

    /// Returns a chunk to the pool.
    ///
    /// This is a **O(1)** operation in release builds. Blocks that do not
    /// start on a chunk of this pool are ignored; debug builds assert on
    /// them and on double frees.
    pub fn free(&mut self, block: Block) {
        debug_assert!(self.owns(block), "pool free of foreign or stale {block}");
        let Some(index) = self.chunk_index(block) else {
            return;
        };
        debug_assert!(!self.is_free(index), "double free of pool chunk {index}");

        self.write_link(index, self.head);
        self.head = index;
        self.allocated_count = self.allocated_count.saturating_sub(1);
    }

    /// Returns every chunk to the pool, invalidating all outstanding blocks.
    ///
    /// Rebuilds the free list from scratch in O(`chunk_count`).
    pub fn free_all(&mut self) {
        tracing::trace!("pool reset: {} chunks released", self.allocated_count);
        self.thread_free_list();
        self.allocated_count = 0;
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// Releases the backing block. The pool has no chunks afterwards.
    pub fn destroy(&mut self) {
        self.storage = B::default();
        self.base = 0;
        self.chunk_count = 0;
        self.allocated_count = 0;
        self.head = NIL;
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// Consumes the pool and hands the backing block back.
    #[must_use]
    pub fn into_inner(self) -> B {
        self.storage
    }

    /// Whether `block` starts on a chunk of this pool in the current epoch.
    #[inline]
    #[must_use]
    pub fn owns(&self, block: Block) -> bool {
        block.epoch == self.epoch && self.chunk_index(block).is_some()
    }

    /// Bytes of a live chunk.
    #[inline]
    #[must_use]
    pub fn bytes(&self, block: Block) -> &[u8] {
        debug_assert!(self.owns(block), "access through stale {block}");
        &self.storage.as_ref()[block.range()]
    }

    /// Mutable bytes of a live chunk.
    #[inline]
    pub fn bytes_mut(&mut self, block: Block) -> &mut [u8] {
        debug_assert!(self.owns(block), "access through stale {block}");
        &mut self.storage.as_mut()[block.range()]
    }

    #[inline]
    fn chunk_offset(&self, index: usize) -> usize {
        self.base + index * self.chunk_size
    }

    fn chunk_index(&self, block: Block) -> Option<usize> {
        let relative = block.offset.checked_sub(self.base)?;
        let index = relative / self.chunk_size;
        (relative % self.chunk_size == 0 && index < self.chunk_count).then_some(index)
    }

    fn read_link(&self, index: usize) -> usize {
        let offset = self.chunk_offset(index);
        bytemuck::pod_read_unaligned(&self.storage.as_ref()[offset..offset + LINK_SIZE])
    }

    fn write_link(&mut self, index: usize, next: usize) {
        let offset = self.chunk_offset(index);
        self.storage.as_mut()[offset..offset + LINK_SIZE].copy_from_slice(bytemuck::bytes_of(&next));
    }

    fn thread_free_list(&mut self) {
        for index in 0..self.chunk_count {
            let next = if index + 1 < self.chunk_count { index + 1 } else { NIL };
            self.write_link(index, next);
        }
        self.head = if self.chunk_count > 0 { 0 } else { NIL };
    }

    /// Walks the free list; only used by debug assertions.
    fn is_free(&self, index: usize) -> bool {
        let mut cursor = self.head;
        let mut steps = 0;
        while cursor != NIL && steps <= self.chunk_count {
            if cursor == index {
                return true;
            }
            cursor = self.read_link(cursor);
            steps += 1;
        }
        false
    }
}

impl<B: Backing> fmt::Debug for Pool<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("chunk_size", &self.chunk_size)
            .field("chunk_count", &self.chunk_count)
            .field("allocated_count", &self.allocated_count)
            .field("epoch", &self.epoch)
            .finish()
    }
}

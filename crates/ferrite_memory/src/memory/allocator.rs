//! # Allocator Interface
//!
//! One dispatch surface over both allocation strategies. Higher-level
//! consumers (the handle table, scratch buffers in parsers and mixers) are
//! written once against [`Allocator`] and do not care whether an arena or a
//! pool sits underneath.
//!
//! ## Pool Restrictions
//!
//! The pool implementation deliberately narrows the interface:
//! - `reallocate` always returns `None` (chunks have a fixed size)
//! - `allocate` returns `None` for requests larger than a chunk, aligned
//!   beyond [`DEFAULT_ALIGNMENT`], or with an alignment that is not a power
//!   of two
//! - `reset_all` is `free_all`

use super::align::{is_power_of_two, DEFAULT_ALIGNMENT};
use super::arena::Arena;
use super::backing::Backing;
use super::block::Block;
use super::pool::Pool;

/// Which strategy backs an allocator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AllocatorKind {
    /// Bump allocation, reset all at once.
    Arena,
    /// Fixed-size chunks with per-chunk free.
    Pool,
}

/// Polymorphic allocation interface.
///
/// Allocation failure is a normal return value (`None`), never a panic.
/// Blocks are only meaningful to the allocator that issued them.
pub trait Allocator {
    /// Strategy behind this allocator.
    fn kind(&self) -> AllocatorKind;

    /// Allocates `size` bytes aligned to `align`.
    fn allocate(&mut self, size: usize, align: usize) -> Option<Block>;

    /// Moves `block` into a new allocation of `new_size` bytes.
    fn reallocate(&mut self, block: Block, new_size: usize) -> Option<Block>;

    /// Returns a single block. A no-op for arenas.
    fn free(&mut self, block: Block);

    /// Invalidates every outstanding block.
    fn reset_all(&mut self);

    /// Releases the backing storage.
    fn destroy(&mut self);

    /// Total capacity in bytes.
    fn capacity(&self) -> usize;

    /// Bytes currently handed out.
    fn committed_size(&self) -> usize;

    /// Bytes still available.
    fn free_size(&self) -> usize {
        self.capacity() - self.committed_size()
    }

    /// Bytes of a live block.
    fn bytes(&self, block: Block) -> &[u8];

    /// Mutable bytes of a live block.
    fn bytes_mut(&mut self, block: Block) -> &mut [u8];

    /// Allocates `size` bytes with [`DEFAULT_ALIGNMENT`].
    fn allocate_default(&mut self, size: usize) -> Option<Block> {
        self.allocate(size, DEFAULT_ALIGNMENT)
    }
}

/// Allocates room for `len` values of `T`, aligned for `T`.
///
/// Returns None on exhaustion or if the byte size overflows.
pub fn allocate_array<T, A: Allocator + ?Sized>(allocator: &mut A, len: usize) -> Option<Block> {
    let size = std::mem::size_of::<T>().checked_mul(len)?;
    allocator.allocate(size, std::mem::align_of::<T>())
}

impl<B: Backing> Allocator for Arena<B> {
    #[inline]
    fn kind(&self) -> AllocatorKind {
        AllocatorKind::Arena
    }

    #[inline]
    fn allocate(&mut self, size: usize, align: usize) -> Option<Block> {
        self.allocate_aligned(size, align)
    }

    #[inline]
    fn reallocate(&mut self, block: Block, new_size: usize) -> Option<Block> {
        Arena::reallocate(self, block, new_size)
    }

    #[inline]
    fn free(&mut self, _block: Block) {
        // Arenas only release everything at once.
    }

    #[inline]
    fn reset_all(&mut self) {
        Arena::reset_all(self);
    }

    fn destroy(&mut self) {
        Arena::destroy(self);
    }

    #[inline]
    fn capacity(&self) -> usize {
        Arena::capacity(self)
    }

    #[inline]
    fn committed_size(&self) -> usize {
        Arena::committed_size(self)
    }

    #[inline]
    fn bytes(&self, block: Block) -> &[u8] {
        Arena::bytes(self, block)
    }

    #[inline]
    fn bytes_mut(&mut self, block: Block) -> &mut [u8] {
        Arena::bytes_mut(self, block)
    }
}

impl<B: Backing> Allocator for Pool<B> {
    #[inline]
    fn kind(&self) -> AllocatorKind {
        AllocatorKind::Pool
    }

    fn allocate(&mut self, size: usize, align: usize) -> Option<Block> {
        debug_assert!(is_power_of_two(align), "alignment {align} is not a power of two");
        if !is_power_of_two(align) {
            return None;
        }
        if size > self.chunk_size() || align > DEFAULT_ALIGNMENT {
            tracing::debug!(
                "pool cannot serve {} bytes (align {}) from {}-byte chunks",
                size,
                align,
                self.chunk_size()
            );
            return None;
        }
        let chunk = Pool::allocate(self)?;
        Some(Block::new(chunk.offset(), size, chunk.epoch()))
    }

    fn reallocate(&mut self, _block: Block, new_size: usize) -> Option<Block> {
        tracing::debug!("pool reallocate to {} bytes is unsupported", new_size);
        None
    }

    #[inline]
    fn free(&mut self, block: Block) {
        Pool::free(self, block);
    }

    #[inline]
    fn reset_all(&mut self) {
        self.free_all();
    }

    fn destroy(&mut self) {
        Pool::destroy(self);
    }

    #[inline]
    fn capacity(&self) -> usize {
        Pool::capacity(self)
    }

    #[inline]
    fn committed_size(&self) -> usize {
        self.allocated_size()
    }

    #[inline]
    fn bytes(&self, block: Block) -> &[u8] {
        Pool::bytes(self, block)
    }

    #[inline]
    fn bytes_mut(&mut self, block: Block) -> &mut [u8] {
        Pool::bytes_mut(self, block)
    }
}

impl<A: Allocator + ?Sized> Allocator for &mut A {
    #[inline]
    fn kind(&self) -> AllocatorKind {
        (**self).kind()
    }

    #[inline]
    fn allocate(&mut self, size: usize, align: usize) -> Option<Block> {
        (**self).allocate(size, align)
    }

    #[inline]
    fn reallocate(&mut self, block: Block, new_size: usize) -> Option<Block> {
        (**self).reallocate(block, new_size)
    }

    #[inline]
    fn free(&mut self, block: Block) {
        (**self).free(block);
    }

    #[inline]
    fn reset_all(&mut self) {
        (**self).reset_all();
    }

    #[inline]
    fn destroy(&mut self) {
        (**self).destroy();
    }

    #[inline]
    fn capacity(&self) -> usize {
        (**self).capacity()
    }

    #[inline]
    fn committed_size(&self) -> usize {
        (**self).committed_size()
    }

    #[inline]
    fn free_size(&self) -> usize {
        (**self).free_size()
    }

    #[inline]
    fn bytes(&self, block: Block) -> &[u8] {
        (**self).bytes(block)
    }

    #[inline]
    fn bytes_mut(&mut self, block: Block) -> &mut [u8] {
        (**self).bytes_mut(block)
    }
}

impl<A: Allocator + ?Sized> Allocator for Box<A> {
    #[inline]
    fn kind(&self) -> AllocatorKind {
        (**self).kind()
    }

    #[inline]
    fn allocate(&mut self, size: usize, align: usize) -> Option<Block> {
        (**self).allocate(size, align)
    }

    #[inline]
    fn reallocate(&mut self, block: Block, new_size: usize) -> Option<Block> {
        (**self).reallocate(block, new_size)
    }

    #[inline]
    fn free(&mut self, block: Block) {
        (**self).free(block);
    }

    #[inline]
    fn reset_all(&mut self) {
        (**self).reset_all();
    }

    #[inline]
    fn destroy(&mut self) {
        (**self).destroy();
    }

    #[inline]
    fn capacity(&self) -> usize {
        (**self).capacity()
    }

    #[inline]
    fn committed_size(&self) -> usize {
        (**self).committed_size()
    }

    #[inline]
    fn free_size(&self) -> usize {
        (**self).free_size()
    }

    #[inline]
    fn bytes(&self, block: Block) -> &[u8] {
        (**self).bytes(block)
    }

    #[inline]
    fn bytes_mut(&mut self, block: Block) -> &mut [u8] {
        (**self).bytes_mut(block)
    }
}

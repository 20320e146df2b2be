//! # Allocation Blocks
//!
//! A [`Block`] stands in for the raw pointer a C allocator would return. It
//! records where the allocation lives inside its allocator's backing storage
//! and which reset epoch it was made in. Bytes are reached through the
//! allocator that issued the block, never through an address.

use std::fmt;
use std::ops::Range;

/// Location of one allocation inside an allocator's backing block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use]
pub struct Block {
    /// Byte offset from the start of the backing block.
    pub(crate) offset: usize,
    /// Length in bytes.
    pub(crate) len: usize,
    /// Allocator epoch the block was issued in.
    pub(crate) epoch: u32,
}

impl Block {
    /// Creates a block descriptor.
    #[inline]
    pub(crate) const fn new(offset: usize, len: usize, epoch: u32) -> Self {
        Self { offset, len, epoch }
    }

    /// Byte offset from the start of the backing block.
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Length in bytes.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether this is a zero-length block.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Epoch of the issuing allocator at allocation time.
    #[inline]
    #[must_use]
    pub const fn epoch(&self) -> u32 {
        self.epoch
    }

    /// One past the last byte.
    #[inline]
    #[must_use]
    pub const fn end(&self) -> usize {
        self.offset + self.len
    }

    /// Byte range inside the backing block.
    #[inline]
    #[must_use]
    pub const fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }

    /// Whether two blocks share any byte.
    #[inline]
    #[must_use]
    pub const fn overlaps(&self, other: &Block) -> bool {
        !self.is_empty() && !other.is_empty() && self.offset < other.end() && other.offset < self.end()
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Block(off={}, len={}, epoch={})",
            self.offset, self.len, self.epoch
        )
    }
}

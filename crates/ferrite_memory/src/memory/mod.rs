//! # Memory Management
//!
//! Pre-sized arenas and pools for allocation without garbage collection.
//!
//! ## Design Philosophy
//!
//! All memory is reserved once, up front. After that:
//! - Allocation is a bump or a free-list pop
//! - Release is all-at-once (arena) or per-chunk (pool)
//! - Exhaustion is a `None`, never a crash
//!
//! Allocations are described by [`Block`]s (offset + length + epoch) rather
//! than raw pointers; the bytes are borrowed from the owning allocator.

mod align;
mod allocator;
mod arena;
mod backing;
mod block;
mod pool;

pub use align::{align_forward, is_power_of_two, DEFAULT_ALIGNMENT};
pub use allocator::{allocate_array, Allocator, AllocatorKind};
pub use arena::Arena;
pub use backing::{AlignedBuffer, Backing};
pub use block::Block;
pub use pool::{aligned_chunk_size, Pool};

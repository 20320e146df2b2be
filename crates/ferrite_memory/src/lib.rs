//! # Ferrite Memory
//!
//! Explicit, pre-sized memory management for real-time programs:
//! - Bump arenas freed all at once
//! - Fixed-chunk pools with O(1) allocate and free
//! - One [`Allocator`] interface over both
//! - Generational handle tables that detect stale references
//!
//! ## Architecture Rules
//!
//! 1. **Reserve up front** - Every region is sized at startup
//! 2. **Exhaustion is a value** - Allocation returns `None`, never panics
//! 3. **Handles, not pointers** - Records are addressed by `{index, generation}`
//!
//! ## Example
//!
//! ```rust
//! use ferrite_memory::{Arena, HandleTable};
//!
//! let mut arena = Arena::new(64 * 1024).unwrap();
//! let mut table: HandleTable<[f32; 3], _> = HandleTable::new(&mut arena, 100).unwrap();
//!
//! let h = table.add([1.0, 2.0, 3.0]).unwrap();
//! table.remove(h);
//! assert!(!table.is_valid(h));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod handle;
pub mod memory;
pub mod regions;

pub use config::{ArenaConfig, MemoryConfig, PoolConfig, TableConfig, KB, MB};
pub use error::{MemoryError, MemoryResult};
pub use handle::{Handle, HandleTable, RawHandle};
pub use memory::{
    allocate_array, AlignedBuffer, Allocator, AllocatorKind, Arena, Backing, Block, Pool,
    DEFAULT_ALIGNMENT,
};
pub use regions::{MemoryRegions, RegionStats, RegionUsage};

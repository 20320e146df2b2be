//! # Memory Error Types
//!
//! Errors raised while *building* allocators and handle tables.
//!
//! Running out of space during normal operation is not an error: arena and
//! pool allocation report exhaustion with `None`, and stale handles simply
//! resolve to `None`.

use thiserror::Error;

/// Errors that can occur in the memory subsystem.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// An allocator was handed a zero-length backing block.
    #[error("backing buffer is empty")]
    EmptyBuffer,

    /// A pool was configured with a chunk size of zero.
    #[error("pool chunk size must be non-zero")]
    ZeroChunkSize,

    /// The backing buffer cannot hold a single pool chunk.
    #[error("buffer of {len} bytes cannot hold a single {chunk_size}-byte chunk")]
    BufferTooSmall {
        /// Length of the supplied buffer.
        len: usize,
        /// Rounded chunk size.
        chunk_size: usize,
    },

    /// Alignment is zero or not a power of two.
    #[error("alignment {0} is not a power of two")]
    InvalidAlignment(usize),

    /// The requested backing size does not form a valid memory layout.
    #[error("layout overflow for {size} bytes")]
    LayoutOverflow {
        /// Size that overflowed.
        size: usize,
    },

    /// A handle table was created with zero capacity.
    #[error("handle table capacity must be non-zero")]
    ZeroCapacity,

    /// A handle table was created for a zero-sized record type.
    #[error("handle table records must have a non-zero size")]
    ZeroSizedRecord,

    /// Capacity does not fit the 32-bit handle index space.
    #[error("capacity {requested} exceeds the handle index space")]
    CapacityOverflow {
        /// Capacity that was requested.
        requested: usize,
    },

    /// The backing allocator could not satisfy a request.
    #[error("allocator out of memory: requested {requested} bytes")]
    OutOfMemory {
        /// Bytes requested from the allocator.
        requested: usize,
    },

    /// Every slot of a handle table is in use.
    #[error("handle table full: capacity {capacity}")]
    TableFull {
        /// Fixed capacity of the table.
        capacity: u32,
    },

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read.
    #[error("i/o error: {0}")]
    Io(String),
}

impl From<std::io::Error> for MemoryError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<toml::de::Error> for MemoryError {
    fn from(err: toml::de::Error) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}

/// Result type for memory operations.
pub type MemoryResult<T> = Result<T, MemoryError>;

//! # Handle Table
//!
//! A generational slot map over memory obtained from an [`Allocator`].
//!
//! ## Layout
//!
//! ```text
//! sparse:   [S0][S1][S2][S3]          <- indexed by Handle.index
//!             │   │       │
//!             ▼   ▼       ▼
//! records:  [R0][R1][R2]...           <- dense, swap-removed
//! handles:  [H0][H1][H2]...           <- parallel to records
//! ```
//!
//! Free sparse slots form an intrusive list through `index_or_next`, headed
//! by `next`. Lookup, insertion and removal are all O(1).

use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

use bytemuck::Pod;

use crate::error::{MemoryError, MemoryResult};
use crate::memory::{allocate_array, Allocator, Block};

use super::{Handle, RawHandle, SparseSlot, FREE_LIST_END};

/// Fixed-capacity store of `T` records addressed by generational handles.
///
/// All three backing arrays (records, dense handles, sparse slots) are
/// allocated from `A` at construction; the table never grows.
///
/// # Dense Order
///
/// Records are kept contiguous. Removing a record moves whichever record was
/// last into its place, so dense order is insertion order only until the
/// first removal. Handles are unaffected by these moves.
///
/// # Example
///
/// ```rust
/// use ferrite_memory::{Arena, HandleTable};
///
/// let mut arena = Arena::new(4096).unwrap();
/// let mut table: HandleTable<u64, _> = HandleTable::new(&mut arena, 16).unwrap();
///
/// let h = table.add(7).unwrap();
/// assert_eq!(table.get(h), Some(&7));
///
/// table.remove(h);
/// assert_eq!(table.get(h), None);
/// ```
pub struct HandleTable<T: Pod, A: Allocator> {
    /// Allocator the three arrays live in.
    allocator: A,
    /// Dense record bytes (`capacity * size_of::<T>()`).
    records: Block,
    /// Dense handle array, parallel to `records`.
    handles: Block,
    /// Sparse slot array.
    sparse: Block,
    /// Fixed capacity.
    capacity: u32,
    /// Number of live records.
    len: u32,
    /// Number of sparse slots ever issued since the last clear.
    sparse_len: u32,
    /// Head of the sparse free list.
    next: u32,
    _marker: PhantomData<T>,
}

impl<T: Pod, A: Allocator> HandleTable<T, A> {
    /// Creates a table for `capacity` records, allocating its arrays from
    /// `allocator`.
    ///
    /// # Errors
    ///
    /// - `ZeroCapacity` / `ZeroSizedRecord` for degenerate tables
    /// - `CapacityOverflow` if `capacity` does not fit the handle index space
    /// - `OutOfMemory` if the allocator cannot hold the arrays
    pub fn new(mut allocator: A, capacity: usize) -> MemoryResult<Self> {
        if capacity == 0 {
            return Err(MemoryError::ZeroCapacity);
        }
        if std::mem::size_of::<T>() == 0 {
            return Err(MemoryError::ZeroSizedRecord);
        }
        let Ok(capacity_u32) = u32::try_from(capacity) else {
            return Err(MemoryError::CapacityOverflow { requested: capacity });
        };
        if capacity_u32 >= FREE_LIST_END {
            return Err(MemoryError::CapacityOverflow { requested: capacity });
        }

        let records = allocate_array::<T, A>(&mut allocator, capacity)
            .ok_or_else(|| out_of_memory::<T>(capacity))?;

        let Some(handles) = allocate_array::<RawHandle, A>(&mut allocator, capacity) else {
            allocator.free(records);
            return Err(out_of_memory::<RawHandle>(capacity));
        };

        let Some(sparse) = allocate_array::<SparseSlot, A>(&mut allocator, capacity) else {
            allocator.free(handles);
            allocator.free(records);
            return Err(out_of_memory::<SparseSlot>(capacity));
        };

        tracing::debug!(
            "handle table created: {} records of {} bytes",
            capacity,
            std::mem::size_of::<T>()
        );

        Ok(Self {
            allocator,
            records,
            handles,
            sparse,
            capacity: capacity_u32,
            len: 0,
            sparse_len: 0,
            next: FREE_LIST_END,
            _marker: PhantomData,
        })
    }

    /// Returns the number of live records.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Checks if the table holds no records.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the fixed capacity.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }

    /// Returns the allocator backing this table.
    #[inline]
    #[must_use]
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// Stores a copy of `item` and returns its handle.
    ///
    /// A freed sparse slot is reused if one exists (its generation was
    /// already bumped on removal); otherwise a new slot is issued at
    /// generation 1.
    ///
    /// # Errors
    ///
    /// Returns `TableFull` when every record slot, or every usable sparse
    /// slot, is taken.
    pub fn add(&mut self, item: T) -> MemoryResult<Handle<T>> {
        if self.len >= self.capacity {
            tracing::debug!("handle table full: capacity {}", self.capacity);
            return Err(MemoryError::TableFull {
                capacity: self.capacity,
            });
        }

        let dense = self.len;
        let raw = if self.next == FREE_LIST_END {
            if self.sparse_len >= self.capacity {
                // Only retired slots remain.
                tracing::debug!("handle table out of sparse slots: capacity {}", self.capacity);
                return Err(MemoryError::TableFull {
                    capacity: self.capacity,
                });
            }
            let index = self.sparse_len;
            self.sparse_mut()[index as usize] = SparseSlot {
                index_or_next: dense,
                generation: 1,
            };
            self.sparse_len += 1;
            RawHandle::new(index, 1)
        } else {
            let index = self.next;
            let slot = &mut self.sparse_mut()[index as usize];
            let next_free = slot.index_or_next;
            slot.index_or_next = dense;
            let generation = slot.generation;
            self.next = next_free;
            RawHandle::new(index, generation)
        };

        self.records_mut()[dense as usize] = item;
        self.handles_mut()[dense as usize] = raw;
        self.len += 1;

        Ok(Handle::from_raw(raw))
    }

    /// Gets a reference to the record behind `handle`.
    ///
    /// Returns None for null, out-of-range or stale handles.
    #[inline]
    #[must_use]
    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        let dense = self.dense_index(handle.raw())?;
        Some(&self.records()[dense])
    }

    /// Gets a mutable reference to the record behind `handle`.
    #[inline]
    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        let dense = self.dense_index(handle.raw())?;
        Some(&mut self.records_mut()[dense])
    }

    /// Checks whether `handle` still refers to a live record.
    #[inline]
    #[must_use]
    pub fn is_valid(&self, handle: Handle<T>) -> bool {
        self.dense_index(handle.raw()).is_some()
    }

    /// Removes the record behind `handle` and returns it.
    ///
    /// The last dense record is moved into the vacated position. The slot's
    /// generation is bumped, so `handle` and every copy of it become
    /// permanently stale. A slot whose generation is exhausted is retired
    /// instead of being reused.
    ///
    /// Invalid handles are a no-op returning None.
    pub fn remove(&mut self, handle: Handle<T>) -> Option<T> {
        let raw = handle.raw();
        let removed_at = self.dense_index(raw)?;
        let last = self.len as usize - 1;
        let removed = self.records()[removed_at];

        let free_head = self.next;
        let slot = &mut self.sparse_mut()[raw.index as usize];
        let retired = slot.generation == u32::MAX;
        if retired {
            slot.generation = 0;
            slot.index_or_next = FREE_LIST_END;
        } else {
            slot.generation += 1;
            slot.index_or_next = free_head;
        }
        if retired {
            tracing::debug!("handle slot {} retired: generation exhausted", raw.index);
        } else {
            self.next = raw.index;
        }

        if removed_at != last {
            let records = self.records_mut();
            records[removed_at] = records[last];

            let handles = self.handles_mut();
            let moved = handles[last];
            handles[removed_at] = moved;

            self.sparse_mut()[moved.index as usize].index_or_next = removed_at as u32;
        }

        self.len -= 1;
        Some(removed)
    }

    /// Removes every record in O(1).
    ///
    /// The sparse array is truncated together with the dense arrays, which is
    /// what makes every previously issued handle out of range. Slots are
    /// re-issued from generation 1 afterwards, so a handle from before the
    /// clear resolves again once a new record gets the same
    /// `{index, generation}`. Such handles must not be kept across a clear.
    pub fn clear(&mut self) {
        tracing::trace!("handle table cleared: {} records dropped", self.len);
        self.len = 0;
        self.sparse_len = 0;
        self.next = FREE_LIST_END;
    }

    /// Live records in dense order.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.records()[..self.len as usize]
    }

    /// Live records in dense order, mutable.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        let len = self.len as usize;
        &mut self.records_mut()[..len]
    }

    /// Handles of the live records, parallel to [`HandleTable::as_slice`].
    #[inline]
    #[must_use]
    pub fn raw_handles(&self) -> &[RawHandle] {
        &self.dense_handles()[..self.len as usize]
    }

    /// Iterates over live records in dense order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Iterates mutably over live records in dense order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.as_mut_slice().iter_mut()
    }

    /// Iterates over the handles of live records in dense order.
    pub fn handles(&self) -> impl Iterator<Item = Handle<T>> + '_ {
        self.raw_handles().iter().map(|&raw| Handle::from_raw(raw))
    }

    /// Iterates over `(handle, record)` pairs in dense order.
    pub fn iter_with_handles(&self) -> impl Iterator<Item = (Handle<T>, &T)> + '_ {
        self.handles().zip(self.as_slice())
    }

    /// Consumes the table and returns its allocator.
    ///
    /// The table's arrays stay committed until the allocator is reset.
    pub fn into_allocator(self) -> A {
        self.allocator
    }

    /// Returns the table's arrays to the allocator and hands it back.
    ///
    /// Pools get their chunks back; for arenas this is the same as
    /// [`HandleTable::into_allocator`].
    pub fn release(mut self) -> A {
        self.allocator.free(self.sparse);
        self.allocator.free(self.handles);
        self.allocator.free(self.records);
        self.allocator
    }

    fn dense_index(&self, raw: RawHandle) -> Option<usize> {
        if raw.is_null() || raw.index >= self.sparse_len {
            return None;
        }
        let slot = self.sparse_slots()[raw.index as usize];
        if slot.generation != raw.generation {
            return None;
        }
        // A free slot can carry a matching generation after a clear; only
        // an occupied slot points back at itself through the dense handles.
        let dense = slot.index_or_next as usize;
        (dense < self.len as usize && self.dense_handles()[dense] == raw).then_some(dense)
    }

    #[inline]
    fn records(&self) -> &[T] {
        bytemuck::cast_slice(self.allocator.bytes(self.records))
    }

    #[inline]
    fn records_mut(&mut self) -> &mut [T] {
        bytemuck::cast_slice_mut(self.allocator.bytes_mut(self.records))
    }

    #[inline]
    fn dense_handles(&self) -> &[RawHandle] {
        bytemuck::cast_slice(self.allocator.bytes(self.handles))
    }

    #[inline]
    fn handles_mut(&mut self) -> &mut [RawHandle] {
        bytemuck::cast_slice_mut(self.allocator.bytes_mut(self.handles))
    }

    #[inline]
    fn sparse_slots(&self) -> &[SparseSlot] {
        bytemuck::cast_slice(self.allocator.bytes(self.sparse))
    }

    #[inline]
    fn sparse_mut(&mut self) -> &mut [SparseSlot] {
        bytemuck::cast_slice_mut(self.allocator.bytes_mut(self.sparse))
    }
}

impl<T: Pod, A: Allocator> Index<Handle<T>> for HandleTable<T, A> {
    type Output = T;

    /// # Panics
    ///
    /// Panics if `handle` is null or stale. Use [`HandleTable::get`] when a
    /// stale handle is an expected outcome.
    fn index(&self, handle: Handle<T>) -> &T {
        match self.get(handle) {
            Some(record) => record,
            None => panic!("stale or invalid handle {handle:?}"),
        }
    }
}

impl<T: Pod, A: Allocator> IndexMut<Handle<T>> for HandleTable<T, A> {
    fn index_mut(&mut self, handle: Handle<T>) -> &mut T {
        match self.get_mut(handle) {
            Some(record) => record,
            None => panic!("stale or invalid handle {handle:?}"),
        }
    }
}

fn out_of_memory<E>(len: usize) -> MemoryError {
    MemoryError::OutOfMemory {
        requested: std::mem::size_of::<E>().saturating_mul(len),
    }
}

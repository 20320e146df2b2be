//! # Memory Regions
//!
//! The startup allocator set: a permanent arena that lives for the whole
//! program, a temporary arena reset once per frame, and a shared pool.
//!
//! ```text
//! ┌────────────────────┬───────────────┬──────────────────┐
//! │ permanent (arena)  │ temporary     │ pool             │
//! │ never reset        │ end_frame()   │ per-chunk free   │
//! └────────────────────┴───────────────┴──────────────────┘
//! ```

use crate::config::MemoryConfig;
use crate::error::MemoryResult;
use crate::memory::{Allocator, Arena, Pool};

/// Usage of one region.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegionStats {
    /// Bytes handed out.
    pub committed: usize,
    /// Total bytes.
    pub capacity: usize,
}

impl RegionStats {
    fn of(allocator: &dyn Allocator) -> Self {
        Self {
            committed: allocator.committed_size(),
            capacity: allocator.capacity(),
        }
    }

    /// Fraction of the region in use, in `[0, 1]`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.committed as f64 / self.capacity as f64
        }
    }
}

/// Snapshot of all three regions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegionUsage {
    /// Permanent arena.
    pub permanent: RegionStats,
    /// Temporary arena.
    pub temporary: RegionStats,
    /// Shared pool.
    pub pool: RegionStats,
}

/// The program's allocators, built from a [`MemoryConfig`].
///
/// # Example
///
/// ```rust
/// use ferrite_memory::{Allocator, MemoryConfig, MemoryRegions};
///
/// let mut config = MemoryConfig::default();
/// config.permanent.capacity = 4096;
/// config.temporary.capacity = 1024;
///
/// let mut regions = MemoryRegions::from_config(&config).unwrap();
/// let _scratch = regions.temporary().allocate_default(256).unwrap();
/// regions.end_frame();
/// assert_eq!(regions.temporary().committed_size(), 0);
/// ```
#[derive(Debug)]
pub struct MemoryRegions {
    permanent: Arena,
    temporary: Arena,
    pool: Pool,
    frame_count: u64,
}

impl MemoryRegions {
    /// Validates `config` and reserves every region.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for an invalid configuration, or the
    /// allocator construction error.
    pub fn from_config(config: &MemoryConfig) -> MemoryResult<Self> {
        config.validate()?;

        let permanent = Arena::new(config.permanent.capacity)?;
        let temporary = Arena::new(config.temporary.capacity)?;
        let pool = Pool::new(config.pool.chunk_size, config.pool.chunk_count)?;

        tracing::debug!(
            "memory regions reserved: permanent {} bytes, temporary {} bytes, pool {} bytes",
            permanent.capacity(),
            temporary.capacity(),
            pool.capacity()
        );

        Ok(Self {
            permanent,
            temporary,
            pool,
            frame_count: 0,
        })
    }

    /// Arena for data that lives until shutdown.
    #[inline]
    pub fn permanent(&mut self) -> &mut Arena {
        &mut self.permanent
    }

    /// Arena for per-frame scratch data.
    #[inline]
    pub fn temporary(&mut self) -> &mut Arena {
        &mut self.temporary
    }

    /// Shared fixed-chunk pool.
    #[inline]
    pub fn pool(&mut self) -> &mut Pool {
        &mut self.pool
    }

    /// Ends a frame: every temporary block is invalidated.
    pub fn end_frame(&mut self) {
        self.temporary.reset_all();
        self.frame_count += 1;
        tracing::trace!("frame {} ended", self.frame_count);
    }

    /// Number of completed frames.
    #[inline]
    #[must_use]
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Current usage of every region.
    #[must_use]
    pub fn usage(&self) -> RegionUsage {
        RegionUsage {
            permanent: RegionStats::of(&self.permanent),
            temporary: RegionStats::of(&self.temporary),
            pool: RegionStats::of(&self.pool),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ArenaConfig, PoolConfig};
    use crate::error::MemoryError;

    fn small_config() -> MemoryConfig {
        MemoryConfig {
            permanent: ArenaConfig { capacity: 4096 },
            temporary: ArenaConfig { capacity: 1024 },
            pool: PoolConfig {
                chunk_size: 32,
                chunk_count: 8,
            },
            ..MemoryConfig::default()
        }
    }

    #[test]
    fn test_from_config() {
        let regions = MemoryRegions::from_config(&small_config()).unwrap();
        let usage = regions.usage();

        assert_eq!(usage.permanent.capacity, 4096);
        assert_eq!(usage.temporary.capacity, 1024);
        assert_eq!(usage.pool.capacity, 32 * 8);
        assert_eq!(usage.permanent.committed, 0);
    }

    #[test]
    fn test_end_frame_resets_temporary_only() {
        let mut regions = MemoryRegions::from_config(&small_config()).unwrap();

        let kept = regions.permanent().allocate(128).unwrap();
        let scratch = regions.temporary().allocate(512).unwrap();
        let chunk = regions.pool().allocate().unwrap();
        regions.end_frame();

        assert_eq!(regions.frame_count(), 1);
        assert!(regions.permanent().contains(kept));
        assert!(!regions.temporary().contains(scratch));
        assert!(regions.pool().owns(chunk));

        let usage = regions.usage();
        assert_eq!(usage.temporary.committed, 0);
        assert_eq!(usage.permanent.committed, 128);
        assert_eq!(usage.pool.committed, 32);
    }

    #[test]
    fn test_utilization() {
        let mut regions = MemoryRegions::from_config(&small_config()).unwrap();
        let _block = regions.temporary().allocate(256).unwrap();

        let usage = regions.usage();
        assert!((usage.temporary.utilization() - 0.25).abs() < f64::EPSILON);
        assert!(RegionStats::default().utilization().abs() < f64::EPSILON);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = small_config();
        config.temporary.capacity = 0;
        assert!(matches!(
            MemoryRegions::from_config(&config),
            Err(MemoryError::InvalidConfig(_))
        ));
    }
}

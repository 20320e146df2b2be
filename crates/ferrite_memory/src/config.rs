//! # Memory Configuration
//!
//! Region sizes, loaded once at startup from TOML:
//!
//! ```toml
//! [permanent]
//! capacity = 67108864
//!
//! [temporary]
//! capacity = 8388608
//!
//! [pool]
//! chunk_size = 64
//! chunk_count = 1024
//!
//! [tables]
//! default_capacity = 1024
//! ```
//!
//! Every section and key is optional and falls back to the defaults below.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MemoryError, MemoryResult};

/// Bytes in a kibibyte.
pub const KB: usize = 1024;

/// Bytes in a mebibyte.
pub const MB: usize = 1024 * KB;

/// Size of an arena region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Capacity in bytes.
    pub capacity: usize,
}

/// Shape of the shared pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Requested chunk size in bytes (rounded up by the pool).
    pub chunk_size: usize,
    /// Number of chunks.
    pub chunk_count: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            chunk_size: 64,
            chunk_count: 1024,
        }
    }
}

/// Defaults for handle tables built on the regions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Capacity used when a caller has no better estimate.
    pub default_capacity: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            default_capacity: 1024,
        }
    }
}

/// Complete memory configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Arena for data that lives as long as the program.
    pub permanent: ArenaConfig,
    /// Arena reset at the end of every frame.
    pub temporary: ArenaConfig,
    /// Shared fixed-chunk pool.
    pub pool: PoolConfig,
    /// Handle table defaults.
    pub tables: TableConfig,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            permanent: ArenaConfig { capacity: 64 * MB },
            temporary: ArenaConfig { capacity: 8 * MB },
            pool: PoolConfig::default(),
            tables: TableConfig::default(),
        }
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self { capacity: MB }
    }
}

impl MemoryConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` on malformed TOML or failed validation.
    pub fn from_toml_str(source: &str) -> MemoryResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, otherwise as
    /// [`MemoryConfig::from_toml_str`].
    pub fn from_file(path: impl AsRef<Path>) -> MemoryResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!("memory config loaded from {}", path.display());
        Ok(config)
    }

    /// Checks that every region has a usable size.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the first offending key.
    pub fn validate(&self) -> MemoryResult<()> {
        let checks = [
            ("permanent.capacity", self.permanent.capacity),
            ("temporary.capacity", self.temporary.capacity),
            ("pool.chunk_size", self.pool.chunk_size),
            ("pool.chunk_count", self.pool.chunk_count),
            ("tables.default_capacity", self.tables.default_capacity),
        ];
        if let Some((key, _)) = checks.iter().find(|(_, value)| *value == 0) {
            return Err(MemoryError::InvalidConfig(format!("{key} must be non-zero")));
        }
        if u32::try_from(self.tables.default_capacity).map_or(true, |cap| cap == u32::MAX) {
            return Err(MemoryError::InvalidConfig(format!(
                "tables.default_capacity {} exceeds the handle index space",
                self.tables.default_capacity
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = MemoryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.permanent.capacity, 64 * MB);
        assert_eq!(config.temporary.capacity, 8 * MB);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        assert_eq!(MemoryConfig::from_toml_str("").unwrap(), MemoryConfig::default());
    }

    #[test]
    fn test_partial_document() {
        let config = MemoryConfig::from_toml_str(
            r#"
            [temporary]
            capacity = 4096

            [pool]
            chunk_count = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.temporary.capacity, 4096);
        assert_eq!(config.pool.chunk_count, 8);
        assert_eq!(config.pool.chunk_size, 64);
        assert_eq!(config.permanent.capacity, 64 * MB);
    }

    #[test]
    fn test_rejects_zero_sizes() {
        let err = MemoryConfig::from_toml_str("[pool]\nchunk_size = 0\n").unwrap_err();
        assert_eq!(
            err,
            MemoryError::InvalidConfig("pool.chunk_size must be non-zero".to_string())
        );
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let err = MemoryConfig::from_toml_str("[permanent\ncapacity = 1").unwrap_err();
        assert!(matches!(err, MemoryError::InvalidConfig(_)));

        let err = MemoryConfig::from_toml_str("[permanent]\ncapacity = \"big\"").unwrap_err();
        assert!(matches!(err, MemoryError::InvalidConfig(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = MemoryConfig::from_file("/nonexistent/ferrite/memory.toml").unwrap_err();
        assert!(matches!(err, MemoryError::Io(_)));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = MemoryConfig::default();
        let text = toml::to_string(&config).unwrap();
        assert_eq!(MemoryConfig::from_toml_str(&text).unwrap(), config);
    }
}

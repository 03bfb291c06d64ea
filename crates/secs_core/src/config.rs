//! # Registry Configuration
//!
//! Tunables for pool growth, the removal policy and the archetype graph.
//!
//! ```toml
//! removal = "shift_down"
//! graph_capacity = 8
//!
//! [pool]
//! baseline_bytes = 512
//! growth_factor = 2
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EcsError, EcsResult};

/// Minimum byte capacity a pool takes on its first growth.
pub const DEFAULT_BASELINE_BYTES: usize = 256;

/// Capacity multiplier applied on every growth.
pub const DEFAULT_GROWTH_FACTOR: usize = 2;

/// Initial vertex capacity of the archetype adjacency matrix.
pub const DEFAULT_GRAPH_CAPACITY: usize = 1;

/// How a pool closes the gap left by a removed element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    /// Move the last element into the hole. O(1); one slot is remapped.
    #[default]
    SwapRemove,
    /// Shift every later element down by one. O(n); preserves order and
    /// decrements every later slot.
    ShiftDown,
}

/// Growth settings shared by every pool of a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Minimum byte capacity after the first growth.
    pub baseline_bytes: usize,
    /// Capacity multiplier; must be at least 2.
    pub growth_factor: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            baseline_bytes: DEFAULT_BASELINE_BYTES,
            growth_factor: DEFAULT_GROWTH_FACTOR,
        }
    }
}

/// Configuration for a [`Registry`](crate::Registry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Pool growth settings.
    pub pool: PoolConfig,
    /// Removal policy applied by every archetype.
    pub removal: RemovalPolicy,
    /// Initial vertex capacity of the archetype graph.
    pub graph_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            removal: RemovalPolicy::default(),
            graph_capacity: DEFAULT_GRAPH_CAPACITY,
        }
    }
}

impl RegistryConfig {
    /// Preset for workloads with many archetypes and large pools.
    #[must_use]
    pub const fn large() -> Self {
        Self {
            pool: PoolConfig {
                baseline_bytes: 64 * 1024,
                growth_factor: 2,
            },
            removal: RemovalPolicy::SwapRemove,
            graph_capacity: 64,
        }
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] on malformed TOML or invalid values.
    pub fn from_toml_str(source: &str) -> EcsResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the file cannot be read or is invalid.
    pub fn load(path: impl AsRef<Path>) -> EcsResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| EcsError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> EcsResult<()> {
        if self.pool.growth_factor < 2 {
            return Err(EcsError::InvalidConfig(format!(
                "pool.growth_factor must be at least 2, got {}",
                self.pool.growth_factor
            )));
        }
        if self.pool.baseline_bytes == 0 {
            return Err(EcsError::InvalidConfig(
                "pool.baseline_bytes must be non-zero".to_string(),
            ));
        }
        if self.graph_capacity == 0 {
            return Err(EcsError::InvalidConfig(
                "graph_capacity must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

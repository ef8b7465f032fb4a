//! Per-run engine configuration, loaded from JSON at the process boundary.
//!
//! This is the one place in the workspace where failure is recoverable
//! rather than fatal: everywhere else, a contract violation is a
//! programmer error and panics; a malformed config file is an operator
//! error and returns a [`ConfigError`].

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Default slab capacity for a freshly constructed `ComponentRegistry`.
pub const DEFAULT_SLAB_CAPACITY: usize = 64;
/// Default fixed timestep: 60 Hz.
pub const DEFAULT_FIXED_DT: f64 = 1.0 / 60.0;
/// `graph_id` is 12 bits wide: at most 4096 active graphs.
pub const MAX_GRAPHS: u32 = 4096;
/// `graph_slot_id` is 20 bits wide, slot 0 reserved: 2^20 - 1 live entities
/// per graph.
pub const MAX_ENTITIES_PER_GRAPH: u32 = (1 << 20) - 1;

/// Top-level configuration for one engine run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Initial slab capacity handed to each lazily-constructed
    /// `ComponentRegistry<T>`.
    pub slab_capacity: usize,
    /// Fixed timestep in seconds, consumed by the `FixedUpdate` stage.
    pub fixed_dt: f64,
    /// Upper bound this run intends to stay under; not enforced by the
    /// core itself (which already caps `graph_id` at 12 bits), but used by
    /// tooling to pre-size tables.
    pub max_graphs: u32,
    /// Upper bound on entities per graph this run intends to stay under.
    pub max_entities_per_graph: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            slab_capacity: DEFAULT_SLAB_CAPACITY,
            fixed_dt: DEFAULT_FIXED_DT,
            max_graphs: MAX_GRAPHS,
            max_entities_per_graph: MAX_ENTITIES_PER_GRAPH,
        }
    }
}

impl EngineConfig {
    /// Parse configuration from a JSON string. Missing fields fall back to
    /// [`EngineConfig::default`] via `#[serde(default)]`.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and parse configuration from a file on disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&contents)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fixed_dt.is_finite() && self.fixed_dt > 0.0) {
            return Err(ConfigError::InvalidFixedDt {
                fixed_dt: self.fixed_dt,
            });
        }
        if self.max_graphs == 0 || self.max_graphs > MAX_GRAPHS {
            return Err(ConfigError::InvalidMaxGraphs {
                max_graphs: self.max_graphs,
            });
        }
        if self.max_entities_per_graph == 0 || self.max_entities_per_graph > MAX_ENTITIES_PER_GRAPH
        {
            return Err(ConfigError::InvalidMaxEntitiesPerGraph {
                max_entities_per_graph: self.max_entities_per_graph,
            });
        }
        Ok(())
    }
}

/// Errors that can occur while loading or validating an [`EngineConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("fixed_dt must be positive and finite, got {fixed_dt}")]
    InvalidFixedDt { fixed_dt: f64 },

    #[error("max_graphs must be in 1..={MAX_GRAPHS}, got {max_graphs}")]
    InvalidMaxGraphs { max_graphs: u32 },

    #[error(
        "max_entities_per_graph must be in 1..={MAX_ENTITIES_PER_GRAPH}, got {max_entities_per_graph}"
    )]
    InvalidMaxEntitiesPerGraph { max_entities_per_graph: u32 },
}

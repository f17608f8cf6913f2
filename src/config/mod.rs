//! Configuration module for filtergraph-rs
//!
//! Engine settings live in a single TOML file. Every section and every key
//! is optional; missing values fall back to the defaults below, so an
//! embedding host can run without any file at all.
//!
//! ```toml
//! [context]
//! root_prefix = ":"
//! default_context = "main"
//! release_intermediates = true
//!
//! [script]
//! max_operations = 100000
//! max_expr_depth = 64
//! max_call_levels = 32
//! max_array_size = 0
//!
//! [sweep]
//! default_mode = "full"
//!
//! [logging]
//! filter = "info,filtergraph_rs=debug"
//! ```

use crate::error::{FilterGraphError, Result};
use crate::state_space::TraversalMode;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default root name prefix
pub const DEFAULT_ROOT_PREFIX: char = crate::pipeline::graph::DEFAULT_ROOT_PREFIX;

/// Name of the context a workspace creates on its own
pub const DEFAULT_CONTEXT: &str = "main";

/// Default tracing filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "info,filtergraph_rs=debug";

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub context: ContextConfig,
    pub script: ScriptConfig,
    pub sweep: SweepConfig,
    pub logging: LoggingConfig,
}

/// Context and execution settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Character marking root names (`:a`)
    pub root_prefix: char,
    /// Name of the context created by `Workspace::new`
    pub default_context: String,
    /// Drop node results once their last consumer has read them
    pub release_intermediates: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            root_prefix: DEFAULT_ROOT_PREFIX,
            default_context: DEFAULT_CONTEXT.to_string(),
            release_intermediates: true,
        }
    }
}

/// Safety limits of the Rhai program runner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    pub max_operations: u64,
    pub max_expr_depth: usize,
    pub max_call_levels: usize,
    /// Largest array a program may hold (0 = unlimited)
    pub max_array_size: usize,
    /// Longest string a program may hold (0 = unlimited)
    pub max_string_size: usize,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            max_operations: 100_000,
            max_expr_depth: 64,
            max_call_levels: 32,
            max_array_size: 0,
            max_string_size: 0,
        }
    }
}

/// Parameter sweep settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub default_mode: TraversalMode,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| FilterGraphError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            FilterGraphError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load a configuration file, returning defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the configuration as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                FilterGraphError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| FilterGraphError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            FilterGraphError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }
}

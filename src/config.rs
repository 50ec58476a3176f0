//! Engine configuration
//!
//! ```toml
//! pattern_cache_capacity = 2048
//!
//! [store]
//! backend = "sqlite"
//! path = "/var/lib/app/policies.db"
//! ```

use crate::core::condition::ConditionRegistry;
use crate::core::engine::PolicyEngine;
use crate::error::{Result, WardenError};
use crate::store::{MemoryStore, PolicyStore, SqliteStore};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Default number of compiled patterns kept by the engine
pub const DEFAULT_PATTERN_CACHE_CAPACITY: usize = 1024;

/// Which policy store to construct
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    #[default]
    Memory,
    Sqlite {
        path: PathBuf,
    },
}

impl StoreConfig {
    /// Construct the configured store
    pub fn open(&self, registry: Arc<ConditionRegistry>) -> Result<Arc<dyn PolicyStore>> {
        let store: Arc<dyn PolicyStore> = match self {
            StoreConfig::Memory => Arc::new(MemoryStore::new()),
            StoreConfig::Sqlite { path } => Arc::new(SqliteStore::open(path, registry)?),
        };
        Ok(store)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Compiled patterns to cache; 0 disables the cache
    pub pattern_cache_capacity: usize,
    pub store: StoreConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            pattern_cache_capacity: DEFAULT_PATTERN_CACHE_CAPACITY,
            store: StoreConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        Ok(toml::from_str(toml)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }
}

impl PolicyEngine {
    /// Build an engine and its store from configuration
    pub fn from_config(config: &EngineConfig, registry: Arc<ConditionRegistry>) -> Result<Self> {
        let store = config.store.open(registry)?;
        PolicyEngineBuilder::new()
            .store(store)
            .pattern_cache_capacity(config.pattern_cache_capacity)
            .build()
    }
}

/// Builder for customizing engine creation
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use warden::{MemoryStore, PolicyEngineBuilder};
///
/// let engine = PolicyEngineBuilder::new()
///     .store(Arc::new(MemoryStore::new()))
///     .pattern_cache_capacity(256)
///     .build()
///     .unwrap();
/// assert_eq!(engine.pattern_cache().unwrap().capacity(), 256);
/// ```
pub struct PolicyEngineBuilder {
    store: Option<Arc<dyn PolicyStore>>,
    pattern_cache_capacity: usize,
}

impl PolicyEngineBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        PolicyEngineBuilder {
            store: None,
            pattern_cache_capacity: DEFAULT_PATTERN_CACHE_CAPACITY,
        }
    }

    /// Set the policy store (required)
    pub fn store(mut self, store: Arc<dyn PolicyStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the pattern cache size; 0 disables caching
    pub fn pattern_cache_capacity(mut self, capacity: usize) -> Self {
        self.pattern_cache_capacity = capacity;
        self
    }

    /// Disable the pattern cache
    pub fn without_pattern_cache(self) -> Self {
        self.pattern_cache_capacity(0)
    }

    /// Build the engine
    pub fn build(self) -> Result<PolicyEngine> {
        let store = self
            .store
            .ok_or_else(|| WardenError::Config("a policy store must be set".to_string()))?;

        info!(
            "Building policy engine with pattern cache capacity {}",
            self.pattern_cache_capacity
        );
        Ok(PolicyEngine::with_pattern_cache(
            store,
            self.pattern_cache_capacity,
        ))
    }
}

impl Default for PolicyEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//! Provider configuration
//!
//! Controls how the persistence session treats operations it has no handler for,
//! whether composite aggregates are cached per transaction, and which keyspace
//! rendered DDL is qualified with.

use crate::error::{PersistenceError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// What to do with an operation no handler is registered for.
///
/// - Warn: log at WARNING and continue (the provider does not persist that type)
/// - Error: fail with `PersistenceError::Unsupported`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnhandledPolicy {
    /// Log a warning and report `OperationOutcome::Unhandled`.
    Warn,

    /// Raise `PersistenceError::Unsupported`.
    ///
    /// Useful while wiring a new engine against the provider: every operation the
    /// engine issues must be covered by a handler.
    Error,
}

impl Default for UnhandledPolicy {
    fn default() -> Self {
        UnhandledPolicy::Warn
    }
}

/// Persistence session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Keyspace the engine tables live in
    pub keyspace: String,

    /// Handling of unregistered entity types, queries and bulk operations
    pub unhandled_operations: UnhandledPolicy,

    /// Cache assembled composites for the lifetime of a transaction
    ///
    /// Disabling this re-reads the store on every composite load; aggregates are then
    /// no longer reference-stable within a transaction.
    pub cache_composites: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            keyspace: "camunda".to_string(),
            unhandled_operations: UnhandledPolicy::Warn,
            cache_composites: true,
        }
    }
}

impl PersistenceConfig {
    /// Configuration for a named keyspace with default policies
    pub fn with_keyspace(keyspace: impl Into<String>) -> Self {
        Self {
            keyspace: keyspace.into(),
            ..Default::default()
        }
    }

    /// Strict configuration: every unhandled operation is an error
    pub fn strict() -> Self {
        Self {
            unhandled_operations: UnhandledPolicy::Error,
            ..Default::default()
        }
    }

    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn validate(&self) -> Result<()> {
        let valid = !self.keyspace.is_empty()
            && self
                .keyspace
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(PersistenceError::Configuration(format!(
                "invalid keyspace name '{}'",
                self.keyspace
            )));
        }
        Ok(())
    }
}

/// Reference in-memory store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryStoreConfig {
    /// Snappy-compress snapshot payloads
    pub compress_snapshots: bool,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            compress_snapshots: true,
        }
    }
}

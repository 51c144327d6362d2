//! Registry configuration.
//!
//! Controls how a [`ModelRegistry`](crate::registry::ModelRegistry) finishes
//! the model. Every field has a default, so an empty object is a valid file:
//!
//! ```json
//! {
//!   "auto_activate": true,
//!   "warn_unfired": false
//! }
//! ```

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration for a model registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
  /// Activate every registered module a rule depends on when the model is
  /// realized.
  pub auto_activate: bool,

  /// Log registrations that never fired at `warn` instead of `debug`.
  pub warn_unfired: bool,
}

impl Default for RegistryConfig {
  fn default() -> Self {
    Self {
      auto_activate: true,
      warn_unfired: true,
    }
  }
}

/// Errors that can occur when loading a registry configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
  /// Failed to read the configuration file.
  #[error("failed to read registry config: {0}")]
  Read(#[source] io::Error),

  /// Failed to parse the configuration JSON.
  #[error("failed to parse registry config: {0}")]
  Parse(#[source] serde_json::Error),
}

impl RegistryConfig {
  /// Parse a configuration from JSON.
  pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
    serde_json::from_str(content).map_err(ConfigError::Parse)
  }

  /// Load a configuration file.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Read)?;
    Self::from_json_str(&content)
  }
}

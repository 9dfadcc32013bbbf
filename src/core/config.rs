//! Decision core configuration
//!
//! Loaded from TOML by the embedding process; every field has a default so an
//! empty file is a valid configuration.

use super::pattern::{PatternOptions, DEFAULT_SIZE_LIMIT};
use crate::error::{AuthzError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use validator::Validate;

/// Default LRU capacity for compiled patterns
pub const DEFAULT_PATTERN_CACHE_CAPACITY: usize = 1024;

/// Configuration for the domain cache and authorization engine
///
/// # Examples
///
/// ```
/// use athenz_rbac::AuthzConfig;
///
/// let config = AuthzConfig::from_toml_str("deny_precedence = false").unwrap();
/// assert!(!config.deny_precedence);
/// assert!(config.case_insensitive);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AuthzConfig {
    /// Compile every pattern case-insensitively
    pub case_insensitive: bool,

    /// DENY assertions override ALLOW assertions
    pub deny_precedence: bool,

    /// Maximum compiled size of one pattern, in bytes
    #[validate(range(min = 1))]
    pub pattern_size_limit: usize,

    /// Compiled patterns kept for reuse across document refreshes (0 disables)
    pub pattern_cache_capacity: usize,
}

impl Default for AuthzConfig {
    fn default() -> Self {
        AuthzConfig {
            case_insensitive: true,
            deny_precedence: true,
            pattern_size_limit: DEFAULT_SIZE_LIMIT,
            pattern_cache_capacity: DEFAULT_PATTERN_CACHE_CAPACITY,
        }
    }
}

impl AuthzConfig {
    /// Parse and validate a TOML configuration
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: AuthzConfig = toml::from_str(source)?;
        config.validate_config()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Validate field ranges
    pub fn validate_config(&self) -> Result<()> {
        self.validate()
            .map_err(|e| AuthzError::Config(e.to_string()))
    }

    /// Options every pattern is compiled with
    pub fn pattern_options(&self) -> PatternOptions {
        PatternOptions {
            case_insensitive: self.case_insensitive,
            size_limit: self.pattern_size_limit,
        }
    }
}

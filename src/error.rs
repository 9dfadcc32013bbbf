//! Error types for the RBAC decision core

use thiserror::Error;

/// Display text for every structural failure of a signed domain document
pub const MALFORMED_DOCUMENT: &str =
    "one of document, domain data, policy container, or policy contents is nil";

/// RBAC core errors
#[derive(Error, Debug)]
pub enum AuthzError {
    /// Document skeleton is missing a required level; the parse is aborted
    #[error("{0}")]
    MalformedDocument(String),

    /// A single glob could not be compiled; callers drop the owning entry
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Authorization query for a domain with no cache entry
    #[error("{0} does not exist in cache map")]
    DomainNotFound(String),

    /// Configuration failed validation
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AuthzError {
    pub(crate) fn malformed() -> Self {
        AuthzError::MalformedDocument(MALFORMED_DOCUMENT.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AuthzError>;

//! Domain cache
//!
//! Maps domain names to immutable [`DomainEntry`] snapshots. Updates parse off
//! the lock and then swap the whole entry in a single map insert, so readers
//! see either the entry from before an update or the one after it.

use super::config::AuthzConfig;
use super::document::{AthenzDomain, SignedDomain};
use super::parser::{parse_domain, DomainEntry};
use super::pattern::PatternCompiler;
use crate::error::Result;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Change notification from the document refresh path
#[derive(Debug, Clone)]
pub enum DomainEvent {
    Added(AthenzDomain),
    Updated(AthenzDomain),
    Deleted(AthenzDomain),
}

/// Concurrent map of domain name to index snapshot
pub struct DomainCache {
    config: AuthzConfig,
    compiler: PatternCompiler,
    domains: RwLock<HashMap<String, Arc<DomainEntry>>>,
}

impl DomainCache {
    /// Create an empty cache
    pub fn new(config: AuthzConfig) -> Self {
        let compiler = PatternCompiler::new(config.pattern_options(), config.pattern_cache_capacity);
        DomainCache {
            config,
            compiler,
            domains: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &AuthzConfig {
        &self.config
    }

    /// Parse a document and replace the domain's entry with the result
    ///
    /// # Errors
    ///
    /// Returns `MalformedDocument` if the document skeleton is incomplete. The
    /// cache is left untouched on error.
    pub fn add_or_update(&self, domain: &str, document: Option<&SignedDomain>) -> Result<()> {
        let entry = match parse_domain(domain, document, &self.compiler) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Keeping previous entry for domain {}: {}", domain, e);
                return Err(e);
            }
        };

        if entry.domain() != domain {
            warn!(
                "Document for domain {} names itself '{}'; caching under {}",
                domain,
                entry.domain(),
                domain
            );
        }

        let roles = entry.role_count();
        let assertions = entry.assertion_count();
        let previous = self
            .domains
            .write()
            .insert(domain.to_string(), Arc::new(entry));

        if previous.is_some() {
            info!(
                "Updated domain {} ({} roles, {} assertions)",
                domain, roles, assertions
            );
        } else {
            info!(
                "Added domain {} ({} roles, {} assertions)",
                domain, roles, assertions
            );
        }

        Ok(())
    }

    /// Remove a domain; returns whether an entry was present
    pub fn delete(&self, domain: &str) -> bool {
        let removed = self.domains.write().remove(domain).is_some();
        if removed {
            info!("Deleted domain {}", domain);
        }
        removed
    }

    /// Snapshot of a domain's current entry
    pub fn lookup(&self, domain: &str) -> Option<Arc<DomainEntry>> {
        self.domains.read().get(domain).cloned()
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.domains.read().contains_key(domain)
    }

    pub fn len(&self) -> usize {
        self.domains.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.read().is_empty()
    }

    /// Cached domain names, sorted
    pub fn domain_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.domains.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.domains.write().clear();
    }

    /// Apply a watch notification for an `AthenzDomain` resource
    pub fn apply(&self, event: &DomainEvent) -> Result<()> {
        match event {
            DomainEvent::Added(resource) | DomainEvent::Updated(resource) => {
                self.add_or_update(resource.name(), Some(&resource.spec))
            }
            DomainEvent::Deleted(resource) => {
                self.delete(resource.name());
                Ok(())
            }
        }
    }
}

impl Default for DomainCache {
    fn default() -> Self {
        Self::new(AuthzConfig::default())
    }
}

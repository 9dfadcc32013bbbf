//! # athenz-rbac - RBAC Decision Core for Athenz Admission Webhooks
//!
//! `athenz-rbac` turns signed Athenz domain documents into in-memory indexes and
//! answers point-in-time authorization queries against them:
//!
//! - **Wildcard patterns** for principals, resources and actions (`*` only)
//! - **Atomic domain replacement** so readers never see a half-built domain
//! - **Expiring memberships** checked against the query instant
//! - **Explicit deny precedence** over matching allows
//!
//! Fetching documents, verifying their signatures and serving the webhook are
//! left to the embedding process; it feeds verified documents in and asks for
//! decisions.
//!
//! ## Quick Start
//!
//! ```rust
//! use athenz_rbac::{
//!     AccessCheck, Assertion, AssertionEffect, AuthorizationEngine, DomainCache, Policy, Result,
//!     Role, RoleMember, SignedDomain,
//! };
//! use std::sync::Arc;
//!
//! # fn main() -> Result<()> {
//! let doc = SignedDomain::new(
//!     "home.domain",
//!     vec![Role::new("home.domain:role.admin").with_member(RoleMember::new("user.name"))],
//!     vec![Policy::new("home.domain:policy.admin").with_assertion(Assertion::new(
//!         "home.domain:role.admin",
//!         "home.domain:*",
//!         "*",
//!         AssertionEffect::Allow,
//!     ))],
//! );
//!
//! // Refresh path
//! let cache = Arc::new(DomainCache::default());
//! cache.add_or_update("home.domain", Some(&doc))?;
//!
//! // Request path
//! let engine = AuthorizationEngine::new(Arc::clone(&cache));
//! assert!(engine.authorize("user.name", &AccessCheck::new("get", "home.domain:pods"))?);
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod error;

pub use crate::core::{
    cache::{DomainCache, DomainEvent},
    config::AuthzConfig,
    document::{
        Assertion, AssertionEffect, AthenzDomain, DomainData, DomainPolicies, Policy, Role,
        RoleMember, SignedDomain, SignedPolicies,
    },
    engine::{AccessCheck, AuthorizationEngine, Decision},
    parser::{parse_document, parse_domain, AssertionEntry, DomainEntry, PrincipalEntry},
    pattern::{Pattern, PatternCompiler, PatternOptions},
};
pub use crate::error::{AuthzError, Result};

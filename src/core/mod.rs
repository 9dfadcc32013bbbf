//! RBAC decision core
//!
//! Provides point-in-time authorization over signed Athenz domains with:
//! - Anchored wildcard patterns for principals, resources and actions
//! - Per-domain index pairs built from one document snapshot
//! - A concurrent domain cache with replace-on-update semantics
//! - Expiring role memberships and explicit deny precedence

pub mod cache;
pub mod config;
pub mod document;
pub mod engine;
pub mod parser;
pub mod pattern;

pub use cache::{DomainCache, DomainEvent};
pub use config::AuthzConfig;
pub use document::{
    Assertion, AssertionEffect, AthenzDomain, DomainData, DomainPolicies, ObjectMeta, Policy, Role,
    RoleMember, SignedDomain, SignedPolicies,
};
pub use engine::{evaluate_entry, AccessCheck, AuthorizationEngine, Decision};
pub use parser::{
    parse_document, parse_domain, qualify_role, AssertionEntry, DomainEntry, PrincipalEntry,
};
pub use pattern::{Pattern, PatternCompiler, PatternOptions};

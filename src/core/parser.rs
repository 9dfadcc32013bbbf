//! Signed domain document to index pair
//!
//! One pass over a signed domain produces a [`DomainEntry`]: the role to
//! principal index and the role to assertion index. Structural absence of the
//! document skeleton aborts the parse. Everything below the skeleton is
//! best-effort: nil, empty or uncompilable entries are dropped one at a time so
//! one bad rule cannot invalidate a whole domain.

use super::document::{AssertionEffect, SignedDomain};
use super::pattern::{Pattern, PatternCompiler};
use crate::error::{AuthzError, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{debug, warn};

/// One resolved role member
#[derive(Debug, Clone)]
pub struct PrincipalEntry {
    matcher: Pattern,
    expires_at: Option<DateTime<Utc>>,
}

impl PrincipalEntry {
    pub fn new(matcher: Pattern, expires_at: Option<DateTime<Utc>>) -> Self {
        PrincipalEntry {
            matcher,
            expires_at,
        }
    }

    pub fn matcher(&self) -> &Pattern {
        &self.matcher
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Check if the principal name matches this member
    pub fn matches(&self, principal: &str) -> bool {
        self.matcher.is_match(principal)
    }

    /// Membership is expired once `now` reaches the expiration
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| expiry <= now)
    }
}

/// One compiled permission rule
#[derive(Debug, Clone)]
pub struct AssertionEntry {
    resource: Pattern,
    action: Pattern,
    effect: AssertionEffect,
}

impl AssertionEntry {
    pub fn new(resource: Pattern, action: Pattern, effect: AssertionEffect) -> Self {
        AssertionEntry {
            resource,
            action,
            effect,
        }
    }

    pub fn resource(&self) -> &Pattern {
        &self.resource
    }

    pub fn action(&self) -> &Pattern {
        &self.action
    }

    pub fn effect(&self) -> AssertionEffect {
        self.effect
    }

    /// Check if this rule governs the action on the resource
    pub fn applies_to(&self, action: &str, resource: &str) -> bool {
        self.resource.is_match(resource) && self.action.is_match(action)
    }
}

/// Index pair for one domain, built from a single document snapshot
///
/// Immutable once built; the cache swaps whole entries and never edits one.
#[derive(Debug, Clone, Default)]
pub struct DomainEntry {
    domain: String,
    role_to_principals: HashMap<String, Vec<PrincipalEntry>>,
    role_to_assertions: HashMap<String, Vec<AssertionEntry>>,
}

impl DomainEntry {
    /// Domain name recorded in the source document
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Members of a fully-qualified role
    pub fn principals(&self, role: &str) -> &[PrincipalEntry] {
        self.role_to_principals
            .get(role)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Assertions granted to a fully-qualified role
    pub fn assertions(&self, role: &str) -> &[AssertionEntry] {
        self.role_to_assertions
            .get(role)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn role_to_principals(&self) -> &HashMap<String, Vec<PrincipalEntry>> {
        &self.role_to_principals
    }

    pub fn role_to_assertions(&self) -> &HashMap<String, Vec<AssertionEntry>> {
        &self.role_to_assertions
    }

    /// Roles with at least one member, sorted
    pub fn roles(&self) -> Vec<&str> {
        let mut roles: Vec<&str> = self.role_to_principals.keys().map(String::as_str).collect();
        roles.sort_unstable();
        roles
    }

    /// Number of roles with at least one member
    pub fn role_count(&self) -> usize {
        self.role_to_principals.len()
    }

    /// Total number of compiled assertions
    pub fn assertion_count(&self) -> usize {
        self.role_to_assertions.values().map(Vec::len).sum()
    }
}

/// Qualify a role reference as `domain:role.<name>`
///
/// References that already name a domain are kept as is.
pub fn qualify_role(domain: &str, role: &str) -> String {
    if role.contains(':') {
        role.to_string()
    } else if role.starts_with("role.") {
        format!("{}:{}", domain, role)
    } else {
        format!("{}:role.{}", domain, role)
    }
}

/// Parse a signed domain into its index pair
///
/// # Errors
///
/// Returns `MalformedDocument` if the document, its domain data, the policy
/// container, or the policy contents are absent. Pattern failures never
/// surface here.
pub fn parse_document(
    document: Option<&SignedDomain>,
    compiler: &PatternCompiler,
) -> Result<DomainEntry> {
    parse_domain("", document, compiler)
}

/// Parse a signed domain cached under `domain`
///
/// Role references are qualified with the document's own domain name, or with
/// `domain` when the document leaves its name empty.
pub fn parse_domain(
    domain: &str,
    document: Option<&SignedDomain>,
    compiler: &PatternCompiler,
) -> Result<DomainEntry> {
    let data = document
        .and_then(|doc| doc.domain.as_ref())
        .ok_or_else(AuthzError::malformed)?;
    let contents = data
        .policies
        .as_ref()
        .and_then(|signed| signed.contents.as_ref())
        .ok_or_else(AuthzError::malformed)?;

    let domain = if data.name.is_empty() {
        domain
    } else {
        data.name.as_str()
    };
    let mut role_to_assertions: HashMap<String, Vec<AssertionEntry>> = HashMap::new();

    for policy in contents.policies.iter().flatten() {
        if policy.assertions.is_empty() {
            debug!("Skipping policy '{}' with no assertions", policy.name);
            continue;
        }

        for assertion in policy.assertions.iter().flatten() {
            if assertion.is_empty() {
                debug!("Skipping empty assertion in policy '{}'", policy.name);
                continue;
            }

            let resource = match compiler.compile(&assertion.resource) {
                Ok(pattern) => pattern,
                Err(e) => {
                    warn!("Dropping assertion in policy '{}': {}", policy.name, e);
                    continue;
                }
            };
            let action = match compiler.compile(&assertion.action) {
                Ok(pattern) => pattern,
                Err(e) => {
                    warn!("Dropping assertion in policy '{}': {}", policy.name, e);
                    continue;
                }
            };

            role_to_assertions
                .entry(qualify_role(domain, &assertion.role))
                .or_default()
                .push(AssertionEntry::new(resource, action, assertion.effect()));
        }
    }

    let mut role_to_principals: HashMap<String, Vec<PrincipalEntry>> = HashMap::new();

    for role in data.roles.iter().flatten() {
        if role.name.is_empty() {
            debug!("Skipping role with no name");
            continue;
        }
        if role.role_members.is_empty() {
            if let Some(trust) = &role.trust {
                debug!("Role '{}' delegates to '{}', not indexed", role.name, trust);
            }
            continue;
        }

        let role_name = qualify_role(domain, &role.name);
        for member in role.role_members.iter().flatten() {
            if member.member_name.is_empty() {
                continue;
            }

            match compiler.compile(&member.member_name) {
                Ok(matcher) => role_to_principals
                    .entry(role_name.clone())
                    .or_default()
                    .push(PrincipalEntry::new(matcher, member.expiration)),
                Err(e) => warn!("Dropping member of role '{}': {}", role_name, e),
            }
        }
    }

    Ok(DomainEntry {
        domain: domain.to_string(),
        role_to_principals,
        role_to_assertions,
    })
}

//! Authorization engine with deny precedence
//!
//! Answers "can principal P perform action A on resource R?" against the
//! domain cache:
//! - The owning domain is the resource prefix before the first `:`
//! - Assertions matching the action and resource select candidate roles
//! - The principal must hold an unexpired membership in a candidate role
//! - Explicit deny takes precedence over allow (configurable)
//!
//! An unknown domain is an error. A principal without a matching, unexpired
//! membership is a normal `false` and never an error.

use super::cache::DomainCache;
use super::document::AssertionEffect;
use super::parser::DomainEntry;
use crate::error::{AuthzError, Result};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Access check request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccessCheck {
    /// Action being performed (e.g. `get`)
    pub action: String,
    /// Fully-qualified resource (e.g. `home.domain:pods`)
    pub resource: String,
}

impl AccessCheck {
    pub fn new(action: impl Into<String>, resource: impl Into<String>) -> Self {
        AccessCheck {
            action: action.into(),
            resource: resource.into(),
        }
    }

    /// Domain owning the resource
    ///
    /// A resource without `:` is treated as a bare domain name.
    pub fn domain(&self) -> &str {
        match self.resource.find(':') {
            Some(index) => &self.resource[..index],
            None => &self.resource,
        }
    }
}

/// Outcome of an authorization check, with the reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Principal holds a valid membership in a role with a matching ALLOW
    Allow { role: String },
    /// Principal holds a valid membership in a role with a matching DENY
    Deny { role: String },
    /// No assertion governs the action on the resource
    NoMatchingAssertion,
    /// Assertions matched but the principal is not a member of their roles
    NotAMember,
    /// The principal matched a member of an allowed role, but only expired ones
    MembershipExpired { role: String },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow { .. })
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Allow { role } => write!(f, "allowed by {}", role),
            Decision::Deny { role } => write!(f, "denied by {}", role),
            Decision::NoMatchingAssertion => write!(f, "no matching assertion"),
            Decision::NotAMember => write!(f, "principal is not a member of any matching role"),
            Decision::MembershipExpired { role } => {
                write!(f, "membership in {} has expired", role)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Membership {
    Valid,
    Expired,
    Absent,
}

fn membership(entry: &DomainEntry, role: &str, principal: &str, now: DateTime<Utc>) -> Membership {
    let mut expired = false;
    for member in entry.principals(role) {
        if !member.matches(principal) {
            continue;
        }
        if !member.is_expired(now) {
            return Membership::Valid;
        }
        expired = true;
    }

    if expired {
        Membership::Expired
    } else {
        Membership::Absent
    }
}

/// Evaluate a check against one domain snapshot
///
/// Candidate roles are visited in name order so the reported role is stable.
pub fn evaluate_entry(
    entry: &DomainEntry,
    principal: &str,
    check: &AccessCheck,
    now: DateTime<Utc>,
    deny_precedence: bool,
) -> Decision {
    let mut allow_roles = BTreeSet::new();
    let mut deny_roles = BTreeSet::new();

    for (role, assertions) in entry.role_to_assertions() {
        for assertion in assertions {
            if !assertion.applies_to(&check.action, &check.resource) {
                continue;
            }
            match assertion.effect() {
                AssertionEffect::Allow => {
                    allow_roles.insert(role.as_str());
                }
                AssertionEffect::Deny => {
                    deny_roles.insert(role.as_str());
                }
            }
        }
    }

    if deny_precedence {
        for role in &deny_roles {
            if membership(entry, role, principal, now) == Membership::Valid {
                return Decision::Deny {
                    role: role.to_string(),
                };
            }
        }
    }

    if allow_roles.is_empty() {
        return Decision::NoMatchingAssertion;
    }

    let mut expired_role = None;
    for role in &allow_roles {
        match membership(entry, role, principal, now) {
            Membership::Valid => {
                return Decision::Allow {
                    role: role.to_string(),
                }
            }
            Membership::Expired => {
                expired_role.get_or_insert(*role);
            }
            Membership::Absent => {}
        }
    }

    match expired_role {
        Some(role) => Decision::MembershipExpired {
            role: role.to_string(),
        },
        None => Decision::NotAMember,
    }
}

/// Authorization engine over a shared domain cache
pub struct AuthorizationEngine {
    cache: Arc<DomainCache>,
}

impl AuthorizationEngine {
    pub fn new(cache: Arc<DomainCache>) -> Self {
        AuthorizationEngine { cache }
    }

    pub fn cache(&self) -> &Arc<DomainCache> {
        &self.cache
    }

    /// Check if the principal may perform the action on the resource now
    ///
    /// # Errors
    ///
    /// Returns `DomainNotFound` if the resource's domain is not cached.
    ///
    /// # Examples
    ///
    /// ```
    /// use athenz_rbac::{
    ///     AccessCheck, Assertion, AssertionEffect, AuthorizationEngine, DomainCache, Policy,
    ///     Role, RoleMember, SignedDomain,
    /// };
    /// use std::sync::Arc;
    ///
    /// let doc = SignedDomain::new(
    ///     "home.domain",
    ///     vec![Role::new("home.domain:role.admin").with_member(RoleMember::new("user.name"))],
    ///     vec![Policy::new("home.domain:policy.admin").with_assertion(Assertion::new(
    ///         "home.domain:role.admin",
    ///         "home.domain:*",
    ///         "*",
    ///         AssertionEffect::Allow,
    ///     ))],
    /// );
    ///
    /// let cache = Arc::new(DomainCache::default());
    /// cache.add_or_update("home.domain", Some(&doc)).unwrap();
    ///
    /// let engine = AuthorizationEngine::new(cache);
    /// let check = AccessCheck::new("get", "home.domain:pods");
    /// assert!(engine.authorize("user.name", &check).unwrap());
    /// assert!(!engine.authorize("fakeclient", &check).unwrap());
    /// ```
    pub fn authorize(&self, principal: &str, check: &AccessCheck) -> Result<bool> {
        self.authorize_at(principal, check, Utc::now())
    }

    /// Check against a caller-supplied instant
    pub fn authorize_at(
        &self,
        principal: &str,
        check: &AccessCheck,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        Ok(self.evaluate_at(principal, check, now)?.is_allowed())
    }

    /// Evaluate and report why
    pub fn evaluate(&self, principal: &str, check: &AccessCheck) -> Result<Decision> {
        self.evaluate_at(principal, check, Utc::now())
    }

    /// Evaluate against a caller-supplied instant and report why
    pub fn evaluate_at(
        &self,
        principal: &str,
        check: &AccessCheck,
        now: DateTime<Utc>,
    ) -> Result<Decision> {
        let domain = check.domain();
        let entry = self
            .cache
            .lookup(domain)
            .ok_or_else(|| AuthzError::DomainNotFound(domain.to_string()))?;

        let decision = evaluate_entry(
            &entry,
            principal,
            check,
            now,
            self.cache.config().deny_precedence,
        );
        debug!(
            "{} {} on {}: {}",
            principal, check.action, check.resource, decision
        );

        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::AuthzConfig;
    use crate::core::document::{Assertion, Policy, Role, RoleMember, SignedDomain};
    use chrono::Duration;

    const DOMAIN: &str = "home.domain";
    const ADMIN: &str = "home.domain:role.admin";
    const READER: &str = "home.domain:role.reader";

    fn engine_with(doc: &SignedDomain, config: AuthzConfig) -> AuthorizationEngine {
        let cache = Arc::new(DomainCache::new(config));
        cache.add_or_update(DOMAIN, Some(doc)).unwrap();
        AuthorizationEngine::new(cache)
    }

    fn allow(role: &str, resource: &str, action: &str) -> Assertion {
        Assertion::new(role, resource, action, AssertionEffect::Allow)
    }

    fn deny(role: &str, resource: &str, action: &str) -> Assertion {
        Assertion::new(role, resource, action, AssertionEffect::Deny)
    }

    #[test]
    fn test_access_check_domain() {
        assert_eq!(AccessCheck::new("get", "home.domain:pods").domain(), "home.domain");
        assert_eq!(AccessCheck::new("get", "a:b:c").domain(), "a");
        assert_eq!(AccessCheck::new("get", "home.domain").domain(), "home.domain");
        assert_eq!(AccessCheck::new("get", ":pods").domain(), "");
    }

    #[test]
    fn test_simple_allow() {
        let doc = SignedDomain::new(
            DOMAIN,
            vec![Role::new(ADMIN).with_member(RoleMember::new("user.name"))],
            vec![Policy::new("home.domain:policy.admin")
                .with_assertion(allow(ADMIN, "home.domain:pods", "get"))],
        );
        let engine = engine_with(&doc, AuthzConfig::default());

        assert_eq!(
            engine
                .evaluate("user.name", &AccessCheck::new("get", "home.domain:pods"))
                .unwrap(),
            Decision::Allow {
                role: ADMIN.to_string()
            }
        );
        assert_eq!(
            engine
                .evaluate("user.name", &AccessCheck::new("delete", "home.domain:pods"))
                .unwrap(),
            Decision::NoMatchingAssertion
        );
        assert_eq!(
            engine
                .evaluate("user.other", &AccessCheck::new("get", "home.domain:pods"))
                .unwrap(),
            Decision::NotAMember
        );
    }

    #[test]
    fn test_wildcard_member() {
        let doc = SignedDomain::new(
            DOMAIN,
            vec![Role::new(ADMIN).with_member(RoleMember::new("user.*"))],
            vec![Policy::new("home.domain:policy.admin")
                .with_assertion(allow(ADMIN, "home.domain:*", "*"))],
        );
        let engine = engine_with(&doc, AuthzConfig::default());
        let check = AccessCheck::new("get", "home.domain:pods");

        assert!(engine.authorize("user.alice", &check).unwrap());
        assert!(!engine.authorize("other.user.alice", &check).unwrap());
    }

    #[test]
    fn test_deny_precedence() {
        let doc = SignedDomain::new(
            DOMAIN,
            vec![
                Role::new(ADMIN).with_member(RoleMember::new("user.name")),
                Role::new(READER).with_member(RoleMember::new("user.name")),
            ],
            vec![Policy::new("home.domain:policy.mixed")
                .with_assertion(allow(ADMIN, "home.domain:*", "*"))
                .with_assertion(deny(READER, "home.domain:secrets", "get"))],
        );

        let engine = engine_with(&doc, AuthzConfig::default());
        assert!(engine
            .authorize("user.name", &AccessCheck::new("get", "home.domain:pods"))
            .unwrap());
        assert_eq!(
            engine
                .evaluate("user.name", &AccessCheck::new("get", "home.domain:secrets"))
                .unwrap(),
            Decision::Deny {
                role: READER.to_string()
            }
        );

        let engine = engine_with(
            &doc,
            AuthzConfig {
                deny_precedence: false,
                ..AuthzConfig::default()
            },
        );
        assert!(engine
            .authorize("user.name", &AccessCheck::new("get", "home.domain:secrets"))
            .unwrap());
    }

    #[test]
    fn test_deny_requires_membership() {
        let doc = SignedDomain::new(
            DOMAIN,
            vec![
                Role::new(ADMIN).with_member(RoleMember::new("user.name")),
                Role::new(READER).with_member(RoleMember::new("user.other")),
            ],
            vec![Policy::new("home.domain:policy.mixed")
                .with_assertion(allow(ADMIN, "home.domain:*", "*"))
                .with_assertion(deny(READER, "home.domain:*", "*"))],
        );
        let engine = engine_with(&doc, AuthzConfig::default());
        let check = AccessCheck::new("get", "home.domain:pods");

        assert!(engine.authorize("user.name", &check).unwrap());
        assert!(!engine.authorize("user.other", &check).unwrap());
    }

    #[test]
    fn test_deny_only_match_has_no_governing_allow() {
        let doc = SignedDomain::new(
            DOMAIN,
            vec![Role::new(READER).with_member(RoleMember::new("user.other"))],
            vec![Policy::new("home.domain:policy.deny")
                .with_assertion(deny(READER, "home.domain:*", "*"))],
        );
        let engine = engine_with(&doc, AuthzConfig::default());

        assert_eq!(
            engine
                .evaluate("user.name", &AccessCheck::new("get", "home.domain:pods"))
                .unwrap(),
            Decision::NoMatchingAssertion
        );
        // A member of the DENY role is still denied explicitly
        assert_eq!(
            engine
                .evaluate("user.other", &AccessCheck::new("get", "home.domain:pods"))
                .unwrap(),
            Decision::Deny {
                role: READER.to_string()
            }
        );
    }

    #[test]
    fn test_membership_expiration() {
        let now = Utc::now();
        let doc = SignedDomain::new(
            DOMAIN,
            vec![Role::new(ADMIN)
                .with_member(RoleMember::expiring("user.past", now - Duration::hours(10)))
                .with_member(RoleMember::expiring("user.future", now + Duration::hours(10)))
                .with_member(RoleMember::new("user.forever"))],
            vec![Policy::new("home.domain:policy.admin")
                .with_assertion(allow(ADMIN, "home.domain:*", "*"))],
        );
        let engine = engine_with(&doc, AuthzConfig::default());
        let check = AccessCheck::new("get", "home.domain:pods");

        assert_eq!(
            engine.evaluate_at("user.past", &check, now).unwrap(),
            Decision::MembershipExpired {
                role: ADMIN.to_string()
            }
        );
        assert!(engine.authorize_at("user.future", &check, now).unwrap());
        assert!(engine.authorize_at("user.forever", &check, now).unwrap());

        // Expiration is exclusive of the expiry instant itself
        let expiry = now + Duration::hours(10);
        assert!(!engine.authorize_at("user.future", &check, expiry).unwrap());
    }

    #[test]
    fn test_expired_and_valid_entries_for_same_principal() {
        let now = Utc::now();
        let doc = SignedDomain::new(
            DOMAIN,
            vec![Role::new(ADMIN)
                .with_member(RoleMember::expiring("user.name", now - Duration::hours(1)))
                .with_member(RoleMember::new("user.*"))],
            vec![Policy::new("home.domain:policy.admin")
                .with_assertion(allow(ADMIN, "home.domain:*", "*"))],
        );
        let engine = engine_with(&doc, AuthzConfig::default());

        assert!(engine
            .authorize_at("user.name", &AccessCheck::new("get", "home.domain:pods"), now)
            .unwrap());
    }

    #[test]
    fn test_case_insensitive_matching() {
        let doc = SignedDomain::new(
            DOMAIN,
            vec![Role::new(ADMIN).with_member(RoleMember::new("user.name"))],
            vec![Policy::new("home.domain:policy.admin")
                .with_assertion(allow(ADMIN, "home.domain:Pods", "GET"))],
        );
        let check = AccessCheck::new("get", "home.domain:pods");

        let engine = engine_with(&doc, AuthzConfig::default());
        assert!(engine.authorize("User.Name", &check).unwrap());

        let engine = engine_with(
            &doc,
            AuthzConfig {
                case_insensitive: false,
                ..AuthzConfig::default()
            },
        );
        assert!(!engine.authorize("user.name", &check).unwrap());
    }

    #[test]
    fn test_domain_not_found() {
        let engine = AuthorizationEngine::new(Arc::new(DomainCache::default()));
        assert!(engine.cache().is_empty());
        let err = engine
            .authorize("user.name", &AccessCheck::new("get", "home.domain.test:pods"))
            .unwrap_err();
        assert_eq!(err.to_string(), "home.domain.test does not exist in cache map");
    }

    #[test]
    fn test_decision_display() {
        assert_eq!(
            Decision::Allow {
                role: ADMIN.to_string()
            }
            .to_string(),
            "allowed by home.domain:role.admin"
        );
        assert!(!Decision::NotAMember.is_allowed());
    }
}

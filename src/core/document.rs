//! Signed Athenz domain document
//!
//! Serde model of the ZMS signed-domain JSON as delivered by the document
//! refresh path. Every level the parser must treat as possibly absent is an
//! `Option`, and list elements are `Option<T>` so `null` entries survive
//! deserialization and can be skipped explicitly.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Effect of an assertion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AssertionEffect {
    Allow,
    Deny,
}

/// A single permission rule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assertion {
    /// Role granted (or denied) by this rule
    #[serde(default)]
    pub role: String,

    /// Resource glob, usually `domain:<resource>`
    #[serde(default)]
    pub resource: String,

    /// Action glob
    #[serde(default)]
    pub action: String,

    /// Missing effect means ALLOW
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<AssertionEffect>,
}

impl Assertion {
    pub fn new(
        role: impl Into<String>,
        resource: impl Into<String>,
        action: impl Into<String>,
        effect: AssertionEffect,
    ) -> Self {
        Assertion {
            role: role.into(),
            resource: resource.into(),
            action: action.into(),
            effect: Some(effect),
        }
    }

    /// Effective effect of this assertion
    pub fn effect(&self) -> AssertionEffect {
        self.effect.unwrap_or(AssertionEffect::Allow)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.role.is_empty() || self.resource.is_empty() || self.action.is_empty()
    }
}

/// A named list of assertions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,

    #[serde(default)]
    pub assertions: Vec<Option<Assertion>>,
}

impl Policy {
    pub fn new(name: impl Into<String>) -> Self {
        Policy {
            name: name.into(),
            ..Policy::default()
        }
    }

    /// Add an assertion to this policy
    pub fn with_assertion(mut self, assertion: Assertion) -> Self {
        self.assertions.push(Some(assertion));
        self
    }
}

/// Policy list for one domain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainPolicies {
    #[serde(default)]
    pub domain: String,

    #[serde(default)]
    pub policies: Vec<Option<Policy>>,
}

/// Signed wrapper around the domain's policies
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedPolicies {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<DomainPolicies>,

    #[serde(default)]
    pub signature: String,

    #[serde(default)]
    pub key_id: String,
}

/// Role member record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleMember {
    /// Principal name or glob (e.g. `user.*`)
    #[serde(default)]
    pub member_name: String,

    /// Membership is invalid at and after this instant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<DateTime<Utc>>,
}

impl RoleMember {
    pub fn new(member_name: impl Into<String>) -> Self {
        RoleMember {
            member_name: member_name.into(),
            expiration: None,
        }
    }

    pub fn expiring(member_name: impl Into<String>, expiration: DateTime<Utc>) -> Self {
        RoleMember {
            member_name: member_name.into(),
            expiration: Some(expiration),
        }
    }
}

/// A named collection of principals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    /// Fully-qualified role name (`domain:role.<name>`)
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,

    /// Plain member list; informational only
    #[serde(default)]
    pub members: Vec<String>,

    /// Member records used for membership resolution
    #[serde(default)]
    pub role_members: Vec<Option<RoleMember>>,

    /// Domain this role delegates membership to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust: Option<String>,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Role {
            name: name.into(),
            ..Role::default()
        }
    }

    /// Add a member record (and its plain member name)
    pub fn with_member(mut self, member: RoleMember) -> Self {
        self.members.push(member.member_name.clone());
        self.role_members.push(Some(member));
        self
    }

    /// Role delegated to another domain
    pub fn delegated(name: impl Into<String>, trust: impl Into<String>) -> Self {
        Role {
            name: name.into(),
            trust: Some(trust.into()),
            ..Role::default()
        }
    }
}

/// Domain data section of a signed domain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainData {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,

    #[serde(default)]
    pub roles: Vec<Option<Role>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policies: Option<SignedPolicies>,
}

/// Signed policy document for one domain
///
/// Signatures are carried but never verified here; the refresh path hands in
/// documents it has already verified.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedDomain {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<DomainData>,

    #[serde(default)]
    pub signature: String,

    #[serde(default)]
    pub key_id: String,
}

impl SignedDomain {
    /// Build a complete document skeleton from roles and policies
    ///
    /// # Examples
    /// ```
    /// use athenz_rbac::{Assertion, AssertionEffect, Policy, Role, RoleMember, SignedDomain};
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
    /// assert_eq!(doc.domain_name(), Some("home.domain"));
    /// ```
    pub fn new(name: impl Into<String>, roles: Vec<Role>, policies: Vec<Policy>) -> Self {
        let name = name.into();
        SignedDomain {
            domain: Some(DomainData {
                name: name.clone(),
                modified: None,
                roles: roles.into_iter().map(Some).collect(),
                policies: Some(SignedPolicies {
                    contents: Some(DomainPolicies {
                        domain: name,
                        policies: policies.into_iter().map(Some).collect(),
                    }),
                    signature: String::new(),
                    key_id: String::new(),
                }),
            }),
            signature: String::new(),
            key_id: String::new(),
        }
    }

    /// Name recorded inside the document, if the domain section is present
    pub fn domain_name(&self) -> Option<&str> {
        self.domain.as_ref().map(|d| d.name.as_str())
    }

    /// Parse a signed domain from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Object metadata of the cluster resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,
}

/// `AthenzDomain` custom resource carrying one signed domain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AthenzDomain {
    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: SignedDomain,
}

impl AthenzDomain {
    pub fn new(name: impl Into<String>, spec: SignedDomain) -> Self {
        AthenzDomain {
            metadata: ObjectMeta { name: name.into() },
            spec,
        }
    }

    /// Domain name the resource is keyed by
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

//! Claim lookup collaborator. The bridge asks a `ClaimResolver` for the local, remote or
//! merged runtime claims of a user and never caches the answer.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use thiserror::Error;

use super::store::add_domain_to_name;
use super::user::{AuthenticatedUser, IdpRef};

/// Claim URI -> value.
pub type Claims = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClaimScope {
    /// Claims held by the local user store.
    Local,
    /// Claims asserted by the identity provider that authenticated the step.
    Remote,
    /// Merged runtime view: local overlaid with remote.
    Runtime,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClaimError {
    #[error("claim lookup failed for '{user}': {message}")]
    Lookup { user: String, message: String },
}

/// What a claim lookup is about: a user snapshot plus the step/idp it was read through.
#[derive(Debug, Clone)]
pub struct ClaimTarget {
    pub user: AuthenticatedUser,
    pub step: Option<u32>,
    pub idp: Option<IdpRef>,
}

pub trait ClaimResolver: Send + Sync {
    fn resolve(&self, scope: ClaimScope, target: &ClaimTarget) -> Result<Claims, ClaimError>;
}

/// Local claims kept in memory per tenant and qualified username; remote claims come
/// from the user's attribute map.
#[derive(Default)]
pub struct InMemoryClaimResolver {
    local: RwLock<HashMap<(String, String), Claims>>,
    failure: RwLock<Option<String>>,
}

impl InMemoryClaimResolver {
    pub fn new() -> Self { Self::default() }

    pub fn set_local_claim(&self, tenant_domain: &str, qualified_username: &str, uri: &str, value: &str) {
        self.local
            .write()
            .entry((tenant_domain.to_ascii_lowercase(), qualified_username.to_string()))
            .or_default()
            .insert(uri.to_string(), value.to_string());
    }

    pub fn fail_with(&self, message: &str) { *self.failure.write() = Some(message.to_string()); }

    fn local_claims(&self, user: &AuthenticatedUser) -> Claims {
        let (Some(name), Some(tenant)) = (user.username.as_deref(), user.tenant_domain.as_deref()) else {
            return Claims::new();
        };
        let key = (tenant.to_ascii_lowercase(), add_domain_to_name(name, user.user_store_domain.as_deref()));
        self.local.read().get(&key).cloned().unwrap_or_default()
    }
}

impl ClaimResolver for InMemoryClaimResolver {
    fn resolve(&self, scope: ClaimScope, target: &ClaimTarget) -> Result<Claims, ClaimError> {
        if let Some(msg) = self.failure.read().clone() {
            return Err(ClaimError::Lookup { user: target.user.to_string(), message: msg });
        }
        Ok(match scope {
            ClaimScope::Local => self.local_claims(&target.user),
            ClaimScope::Remote => target.user.attributes.clone(),
            ClaimScope::Runtime => {
                let mut merged = self.local_claims(&target.user);
                merged.extend(target.user.attributes.clone());
                merged
            }
        })
    }
}

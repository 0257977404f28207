use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Reserved idp name denoting the system's own user store.
pub const LOCAL_IDP: &str = "LOCAL";

/// Default user store domain; names in it are never domain-qualified.
pub const PRIMARY_DOMAIN: &str = "PRIMARY";

/// Identity resolved by one authentication step.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthenticatedUser {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub user_store_domain: Option<String>,
    #[serde(default)]
    pub tenant_domain: Option<String>,
    #[serde(default)]
    pub authenticated_subject_identifier: Option<String>,
    #[serde(default)]
    pub federated_idp_name: Option<String>,
    /// Open attribute map; for federated users this carries the remote claims.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl AuthenticatedUser {
    pub fn new(username: &str, user_store_domain: &str, tenant_domain: &str) -> Self {
        Self {
            username: Some(username.to_string()),
            user_store_domain: Some(user_store_domain.to_string()),
            tenant_domain: Some(tenant_domain.to_string()),
            ..Default::default()
        }
    }

    pub fn with_subject(mut self, subject: &str) -> Self {
        self.authenticated_subject_identifier = Some(subject.to_string());
        self
    }

    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }

    pub fn federated(mut self, idp: &str) -> Self {
        self.federated_idp_name = Some(idp.to_string());
        self
    }

    pub fn into_shared(self) -> SharedUser { Arc::new(RwLock::new(self)) }
}

impl fmt::Display for AuthenticatedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.username.as_deref().unwrap_or("<anonymous>");
        match (&self.user_store_domain, &self.tenant_domain) {
            (Some(d), Some(t)) => write!(f, "{}/{}@{}", d, name, t),
            (None, Some(t)) => write!(f, "{}@{}", name, t),
            (Some(d), None) => write!(f, "{}/{}", d, name),
            (None, None) => write!(f, "{}", name),
        }
    }
}

/// Session-owned user handle. Wrappers hold a clone of the `Arc`, never a copy of the user.
pub type SharedUser = Arc<RwLock<AuthenticatedUser>>;

/// Identity provider that authenticated the user at a step.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdpRef {
    Local,
    Federated(String),
}

impl IdpRef {
    pub fn parse(name: &str) -> Self {
        if name == LOCAL_IDP { IdpRef::Local } else { IdpRef::Federated(name.to_string()) }
    }

    pub fn name(&self) -> &str {
        match self {
            IdpRef::Local => LOCAL_IDP,
            IdpRef::Federated(n) => n.as_str(),
        }
    }

    pub fn is_local(&self) -> bool { matches!(self, IdpRef::Local) }
}

impl fmt::Display for IdpRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

/// Scope a wrapper is bound to. Fixed for the wrapper's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserScope {
    /// Step independent, aggregated view of the user.
    Aggregate,
    Step { step: u32, idp: IdpRef },
}

impl UserScope {
    /// Blank idp names are treated as absent.
    pub fn for_step(step: u32, idp: Option<&str>) -> Self {
        match idp.map(str::trim) {
            Some(name) if !name.is_empty() => UserScope::Step { step, idp: IdpRef::parse(name) },
            _ => UserScope::Aggregate,
        }
    }

    pub fn idp(&self) -> Option<&IdpRef> {
        match self {
            UserScope::Aggregate => None,
            UserScope::Step { idp, .. } => Some(idp),
        }
    }

    pub fn step(&self) -> Option<u32> {
        match self {
            UserScope::Aggregate => None,
            UserScope::Step { step, .. } => Some(*step),
        }
    }

    /// True when roles and local claims come from the local user store.
    pub fn is_local_store(&self) -> bool { self.idp().map_or(true, IdpRef::is_local) }

    pub fn is_federated(&self) -> bool { self.idp().is_some_and(|i| !i.is_local()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idp_parse_recognizes_local_sentinel() {
        assert_eq!(IdpRef::parse("LOCAL"), IdpRef::Local);
        assert_eq!(IdpRef::parse("google"), IdpRef::Federated("google".into()));
        // sentinel is case sensitive
        assert_eq!(IdpRef::parse("local"), IdpRef::Federated("local".into()));
    }

    #[test]
    fn blank_idp_is_aggregate() {
        assert_eq!(UserScope::for_step(1, None), UserScope::Aggregate);
        assert_eq!(UserScope::for_step(1, Some("  ")), UserScope::Aggregate);
        let s = UserScope::for_step(2, Some("LOCAL"));
        assert_eq!(s.step(), Some(2));
        assert!(s.is_local_store());
        assert!(!s.is_federated());
        let f = UserScope::for_step(2, Some("federated-idp-1"));
        assert!(f.is_federated());
        assert!(!f.is_local_store());
        assert!(UserScope::Aggregate.is_local_store());
    }

    #[test]
    fn display_includes_domain_and_tenant() {
        let u = AuthenticatedUser::new("alice", "PRIMARY", "carbon.super");
        assert_eq!(u.to_string(), "PRIMARY/alice@carbon.super");
        assert_eq!(AuthenticatedUser::default().to_string(), "<anonymous>");
    }
}

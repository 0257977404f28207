//! Tenant-aware user store access consumed by role resolution.
//! The gateway is injected into wrappers; nothing here reaches for process-wide state.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use super::user::PRIMARY_DOMAIN;

pub const SUPER_TENANT_DOMAIN: &str = "carbon.super";
pub const SUPER_TENANT_ID: i32 = -1234;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("unknown tenant domain '{0}'")]
    UnknownTenant(String),
    #[error("no user realm for tenant {0}")]
    RealmUnavailable(i32),
    #[error("user store error: {0}")]
    Backend(String),
}

/// Role membership queries against one tenant's realm.
pub trait UserRealm: Send + Sync {
    fn role_list_of_user(&self, qualified_username: &str) -> Result<Vec<String>, StoreError>;
}

pub trait UserStoreGateway: Send + Sync {
    fn tenant_id(&self, tenant_domain: &str) -> Result<i32, StoreError>;

    fn realm(&self, tenant_id: i32) -> Result<Arc<dyn UserRealm>, StoreError>;

    /// Domain-qualified username per store convention.
    fn qualified_username(&self, username: &str, user_store_domain: Option<&str>) -> String {
        add_domain_to_name(username, user_store_domain)
    }
}

/// `DOMAIN/name` for secondary stores; names in the primary store, or already qualified, are kept as is.
pub fn add_domain_to_name(username: &str, domain: Option<&str>) -> String {
    match domain.map(str::trim) {
        Some(d) if !d.is_empty() && !d.eq_ignore_ascii_case(PRIMARY_DOMAIN) && !username.contains('/') => {
            format!("{}/{}", d.to_ascii_uppercase(), username)
        }
        _ => username.to_string(),
    }
}

#[derive(Default)]
pub struct InMemoryRealm {
    roles: RwLock<HashMap<String, Vec<String>>>,
    failure: RwLock<Option<String>>,
}

impl InMemoryRealm {
    pub fn set_roles(&self, qualified_username: &str, roles: Vec<String>) {
        self.roles.write().insert(qualified_username.to_string(), roles);
    }

    /// Make every subsequent lookup fail with a backend error.
    pub fn fail_with(&self, message: &str) { *self.failure.write() = Some(message.to_string()); }
}

impl UserRealm for InMemoryRealm {
    fn role_list_of_user(&self, qualified_username: &str) -> Result<Vec<String>, StoreError> {
        if let Some(msg) = self.failure.read().clone() {
            return Err(StoreError::Backend(msg));
        }
        Ok(self.roles.read().get(qualified_username).cloned().unwrap_or_default())
    }
}

/// Process-wide style user store kept in memory. Suitable for fixtures and tests.
pub struct InMemoryUserStore {
    tenants: RwLock<HashMap<String, i32>>,
    realms: RwLock<HashMap<i32, Arc<InMemoryRealm>>>,
    unavailable: RwLock<HashSet<i32>>,
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        let s = Self { tenants: RwLock::new(HashMap::new()), realms: RwLock::new(HashMap::new()), unavailable: RwLock::new(HashSet::new()) };
        s.add_tenant(SUPER_TENANT_DOMAIN, SUPER_TENANT_ID);
        s
    }
}

impl InMemoryUserStore {
    pub fn new() -> Self { Self::default() }

    pub fn add_tenant(&self, domain: &str, id: i32) -> Arc<InMemoryRealm> {
        self.tenants.write().insert(domain.to_ascii_lowercase(), id);
        self.realms.write().entry(id).or_default().clone()
    }

    /// Realm of a registered tenant domain, if any.
    pub fn realm_for(&self, tenant_domain: &str) -> Option<Arc<InMemoryRealm>> {
        let id = *self.tenants.read().get(&tenant_domain.to_ascii_lowercase())?;
        self.realms.read().get(&id).cloned()
    }

    pub fn set_roles(&self, tenant_domain: &str, qualified_username: &str, roles: &[&str]) -> Result<(), StoreError> {
        let realm = self.realm_for(tenant_domain).ok_or_else(|| StoreError::UnknownTenant(tenant_domain.to_string()))?;
        realm.set_roles(qualified_username, roles.iter().map(|r| r.to_string()).collect());
        Ok(())
    }

    /// Simulate a realm that cannot be acquired for the tenant.
    pub fn make_unavailable(&self, tenant_id: i32) { self.unavailable.write().insert(tenant_id); }
}

impl UserStoreGateway for InMemoryUserStore {
    fn tenant_id(&self, tenant_domain: &str) -> Result<i32, StoreError> {
        self.tenants
            .read()
            .get(&tenant_domain.to_ascii_lowercase())
            .copied()
            .ok_or_else(|| StoreError::UnknownTenant(tenant_domain.to_string()))
    }

    fn realm(&self, tenant_id: i32) -> Result<Arc<dyn UserRealm>, StoreError> {
        if self.unavailable.read().contains(&tenant_id) {
            return Err(StoreError::RealmUnavailable(tenant_id));
        }
        match self.realms.read().get(&tenant_id) {
            Some(r) => Ok(r.clone() as Arc<dyn UserRealm>),
            None => Err(StoreError::RealmUnavailable(tenant_id)),
        }
    }
}

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use authscript::identity::{
    AuthenticatedUser, AuthenticationContext, ClaimError, ClaimResolver, ClaimScope, ClaimTarget, Claims, IdpRef,
    InMemoryClaimResolver, InMemoryUserStore, SharedUser, StoreError, UserRealm, UserStoreGateway,
    SUPER_TENANT_DOMAIN,
};
use authscript::Services;

#[derive(Default)]
pub struct Calls {
    pub tenant_id: AtomicUsize,
    pub realm: AtomicUsize,
    pub roles: AtomicUsize,
}

impl Calls {
    pub fn total(&self) -> usize {
        self.tenant_id.load(Ordering::SeqCst) + self.realm.load(Ordering::SeqCst) + self.roles.load(Ordering::SeqCst)
    }

    pub fn role_lookups(&self) -> usize { self.roles.load(Ordering::SeqCst) }
}

struct CountingRealm {
    inner: Arc<dyn UserRealm>,
    calls: Arc<Calls>,
}

impl UserRealm for CountingRealm {
    fn role_list_of_user(&self, qualified_username: &str) -> Result<Vec<String>, StoreError> {
        self.calls.roles.fetch_add(1, Ordering::SeqCst);
        self.inner.role_list_of_user(qualified_username)
    }
}

/// Wraps the in-memory store and counts every call the bridge makes into it.
pub struct CountingStore {
    pub inner: InMemoryUserStore,
    pub calls: Arc<Calls>,
}

impl CountingStore {
    pub fn new() -> Self { Self { inner: InMemoryUserStore::new(), calls: Arc::new(Calls::default()) } }
}

impl UserStoreGateway for CountingStore {
    fn tenant_id(&self, tenant_domain: &str) -> Result<i32, StoreError> {
        self.calls.tenant_id.fetch_add(1, Ordering::SeqCst);
        self.inner.tenant_id(tenant_domain)
    }

    fn realm(&self, tenant_id: i32) -> Result<Arc<dyn UserRealm>, StoreError> {
        self.calls.realm.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.realm(tenant_id)?;
        Ok(Arc::new(CountingRealm { inner, calls: self.calls.clone() }))
    }
}

/// Claim resolver that counts lookups.
#[derive(Default)]
pub struct CountingClaims {
    pub inner: InMemoryClaimResolver,
    pub calls: AtomicUsize,
}

impl CountingClaims {
    pub fn lookups(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

impl ClaimResolver for CountingClaims {
    fn resolve(&self, scope: ClaimScope, target: &ClaimTarget) -> Result<Claims, ClaimError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.resolve(scope, target)
    }
}

pub struct Harness {
    pub store: Arc<CountingStore>,
    pub claims: Arc<InMemoryClaimResolver>,
    pub context: Arc<AuthenticationContext>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            store: Arc::new(CountingStore::new()),
            claims: Arc::new(InMemoryClaimResolver::new()),
            context: Arc::new(AuthenticationContext::new(SUPER_TENANT_DOMAIN)),
        }
    }

    pub fn services(&self) -> Services { Services::new(self.store.clone(), self.claims.clone()) }

    pub fn calls(&self) -> &Calls { &self.store.calls }

    pub fn place(&self, step: u32, idp: &str, user: AuthenticatedUser) -> SharedUser {
        self.context.set_step_user(step, &IdpRef::parse(idp), user)
    }
}

pub fn alice() -> AuthenticatedUser { AuthenticatedUser::new("alice", "PRIMARY", SUPER_TENANT_DOMAIN) }

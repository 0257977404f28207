//! Script-facing wrapper over an `AuthenticatedUser`.
//!
//! Gives controlled, property-style access to the session's user, e.g.
//! `user.username` instead of getter calls, and refuses writes that would leave
//! the runtime user inconsistent. Only `username`, `userStoreDomain` and
//! `tenantDomain` are assignable; claims and roles are read-only projections
//! that are built lazily on every read.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::config::ReadOnlyWrites;
use crate::identity::{
    AuthenticationContext, ClaimResolver, ClaimScope, SharedUser, StoreError, UserScope, UserStoreGateway,
};

use super::attributes::{Canonical, WritableField, USERNAME};
use super::claims::ClaimsView;
use super::error::{expect_string, ScriptError};
use super::object::{Attribute, ScriptObject};
use super::roles::RoleList;

/// Collaborators injected into every wrapper.
#[derive(Clone)]
pub struct Services {
    pub user_store: Arc<dyn UserStoreGateway>,
    pub claims: Arc<dyn ClaimResolver>,
}

impl Services {
    pub fn new(user_store: Arc<dyn UserStoreGateway>, claims: Arc<dyn ClaimResolver>) -> Self {
        Self { user_store, claims }
    }
}

pub struct ScriptableUser {
    user: SharedUser,
    scope: UserScope,
    context: Option<Arc<AuthenticationContext>>,
    services: Services,
    readonly_writes: ReadOnlyWrites,
    // ad hoc fields scripts attach during one step's evaluation
    extras: Mutex<serde_json::Map<String, serde_json::Value>>,
}

impl ScriptableUser {
    /// Step independent user without session access.
    pub fn new(user: SharedUser, services: Services) -> Self {
        Self {
            user,
            scope: UserScope::Aggregate,
            context: None,
            services,
            readonly_writes: ReadOnlyWrites::default(),
            extras: Mutex::new(serde_json::Map::new()),
        }
    }

    /// Step independent user with access to the session for nested views.
    pub fn with_context(context: Arc<AuthenticationContext>, user: SharedUser, services: Services) -> Self {
        Self { context: Some(context), ..Self::new(user, services) }
    }

    /// User authenticated at `step` by `idp`. A missing or blank idp yields the aggregate scope.
    pub fn for_step(
        context: Arc<AuthenticationContext>,
        user: SharedUser,
        step: u32,
        idp: Option<&str>,
        services: Services,
    ) -> Self {
        Self { scope: UserScope::for_step(step, idp), ..Self::with_context(context, user, services) }
    }

    /// Look the step user up in the session and wrap it.
    pub fn from_session(context: Arc<AuthenticationContext>, step: u32, idp: &str, services: Services) -> Option<Self> {
        let scope = UserScope::for_step(step, Some(idp));
        let user = match scope.idp() {
            Some(i) => context.step_user(step, i)?,
            None => context.subject()?,
        };
        Some(Self::for_step(context, user, step, Some(idp), services))
    }

    pub fn with_readonly_writes(mut self, policy: ReadOnlyWrites) -> Self {
        self.readonly_writes = policy;
        self
    }

    pub fn scope(&self) -> &UserScope { &self.scope }

    pub fn user(&self) -> &SharedUser { &self.user }

    pub fn context(&self) -> Option<&Arc<AuthenticationContext>> { self.context.as_ref() }

    fn field(&self, c: Canonical) -> Option<String> {
        let u = self.user.read();
        match c {
            Canonical::SubjectIdentifier => u.authenticated_subject_identifier.clone(),
            Canonical::Username => u.username.clone(),
            Canonical::UserStoreDomain => u.user_store_domain.clone(),
            Canonical::TenantDomain => u.tenant_domain.clone(),
            _ => None,
        }
    }

    fn claims_view(&self, scope: ClaimScope) -> ClaimsView {
        let resolver = self.services.claims.clone();
        match &self.scope {
            UserScope::Step { step, idp } => {
                ClaimsView::for_step(scope, self.context.clone(), *step, idp.clone(), self.user.clone(), resolver)
            }
            UserScope::Aggregate => ClaimsView::for_user(scope, self.context.clone(), self.user.clone(), resolver),
        }
    }

    /// Roles from the local user store. Federated users get none, without touching the store.
    /// Store failures are logged and read as an empty list.
    pub fn local_roles(&self) -> RoleList {
        if !self.scope.is_local_store() {
            debug!(target: "authscript::roles", "skipping role lookup for federated scope {:?}", self.scope);
            return RoleList::empty();
        }
        // copy what we need so no lock is held across the store call
        let (username, domain, tenant, shown) = {
            let u = self.user.read();
            (u.username.clone(), u.user_store_domain.clone(), u.tenant_domain.clone(), u.to_string())
        };
        let Some(username) = username else {
            debug!(target: "authscript::roles", "user has no username; no roles to look up");
            return RoleList::empty();
        };
        let tenant = tenant.or_else(|| self.context.as_ref().map(|c| c.tenant_domain().to_string()));
        match self.lookup_roles(&username, domain.as_deref(), tenant.as_deref()) {
            Ok(roles) => RoleList::new(roles),
            Err(e) => {
                error!(target: "authscript::roles", "Error when getting role list of user '{}': {}", shown, e);
                RoleList::empty()
            }
        }
    }

    fn lookup_roles(&self, username: &str, domain: Option<&str>, tenant: Option<&str>) -> Result<Vec<String>, StoreError> {
        let store = &self.services.user_store;
        let tenant = tenant.ok_or_else(|| StoreError::UnknownTenant(String::new()))?;
        let tenant_id = store.tenant_id(tenant)?;
        let qualified = store.qualified_username(username, domain);
        let realm = store.realm(tenant_id)?;
        let roles = realm.role_list_of_user(&qualified)?;
        debug!(target: "authscript::roles", "user '{}' in tenant {} has {} roles", qualified, tenant_id, roles.len());
        Ok(roles)
    }

    fn set_field(&self, field: WritableField, value: String) {
        let mut u = self.user.write();
        match field {
            WritableField::Username => u.username = Some(value),
            WritableField::UserStoreDomain => u.user_store_domain = Some(value),
            WritableField::TenantDomain => u.tenant_domain = Some(value),
        }
    }
}

impl ScriptObject for ScriptableUser {
    fn has_attribute(&self, name: &str) -> bool {
        match Canonical::parse(name) {
            Some(c @ (Canonical::SubjectIdentifier | Canonical::Username | Canonical::UserStoreDomain | Canonical::TenantDomain)) => {
                self.field(c).is_some()
            }
            Some(Canonical::LocalClaims) => self.scope.idp().is_some(),
            Some(Canonical::RemoteClaims) => self.scope.is_federated(),
            Some(Canonical::Claims | Canonical::LocalRoles) => true,
            None => self.extras.lock().contains_key(name),
        }
    }

    fn read_attribute(&self, name: &str) -> Option<Attribute> {
        let value = match Canonical::parse(name) {
            Some(c @ (Canonical::SubjectIdentifier | Canonical::Username | Canonical::UserStoreDomain | Canonical::TenantDomain)) => {
                Attribute::Value(self.field(c).map_or(serde_json::Value::Null, serde_json::Value::String))
            }
            Some(Canonical::LocalClaims) => Attribute::Claims(self.claims_view(ClaimScope::Local)),
            Some(Canonical::RemoteClaims) => Attribute::Claims(self.claims_view(ClaimScope::Remote)),
            Some(Canonical::Claims) => Attribute::Claims(self.claims_view(ClaimScope::Runtime)),
            Some(Canonical::LocalRoles) => Attribute::Roles(self.local_roles()),
            None => return self.extras.lock().get(name).cloned().map(Attribute::Value),
        };
        Some(value)
    }

    fn write_attribute(&self, name: &str, value: serde_json::Value) -> Result<(), ScriptError> {
        match Canonical::parse(name) {
            Some(c) => match c.writable() {
                Some(field) => {
                    let v = expect_string(name, value)?;
                    debug!(target: "authscript::user", "script set {} = '{}'", name, v);
                    self.set_field(field, v);
                    Ok(())
                }
                None if self.readonly_writes == ReadOnlyWrites::FallThrough => {
                    warn!(target: "authscript::user", "write to read-only attribute '{}' kept as ad hoc field", name);
                    self.extras.lock().insert(name.to_string(), value);
                    Ok(())
                }
                None => Err(ScriptError::ReadOnly(name.to_string())),
            },
            None => {
                self.extras.lock().insert(name.to_string(), value);
                Ok(())
            }
        }
    }

    fn required_type(&self, name: &str) -> Option<&'static str> { Canonical::parse(name).map(|_| "string") }

    /// Lazy attributes stay out of enumeration so iterating never triggers lookups.
    fn enumerate_keys(&self) -> Vec<String> { vec![USERNAME.to_string()] }

    fn describe(&self) -> String { format!("AuthenticatedUser({})", self.user.read()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{AuthenticatedUser, InMemoryClaimResolver, InMemoryUserStore, LOCAL_IDP};
    use serde_json::json;

    fn services() -> (Arc<InMemoryUserStore>, Services) {
        let store = Arc::new(InMemoryUserStore::new());
        let svc = Services::new(store.clone(), Arc::new(InMemoryClaimResolver::new()));
        (store, svc)
    }

    fn alice() -> SharedUser { AuthenticatedUser::new("alice", "PRIMARY", "carbon.super").into_shared() }

    #[test]
    fn identity_fields_and_presence() {
        let (_, svc) = services();
        let w = ScriptableUser::new(alice(), svc);
        assert_eq!(w.read_attribute("username").unwrap().as_str(), Some("alice"));
        assert_eq!(w.read_attribute("userStoreDomain").unwrap().as_str(), Some("PRIMARY"));
        assert_eq!(w.read_attribute("tenantDomain").unwrap().as_str(), Some("carbon.super"));
        assert!(w.read_attribute("authenticatedSubjectIdentifier").unwrap().is_null());
        assert!(!w.has_attribute("subjectIdentifier"));
        assert!(w.has_attribute("username"));
        w.user().write().authenticated_subject_identifier = Some("alice@carbon.super".into());
        assert!(w.has_attribute("authenticatedSubjectIdentifier"));
    }

    #[test]
    fn readonly_policy_controls_recognized_names() {
        let (_, svc) = services();
        let strict = ScriptableUser::new(alice(), svc.clone());
        assert_eq!(strict.write_attribute("localRoles", json!("x")), Err(ScriptError::ReadOnly("localRoles".into())));
        assert_eq!(strict.write_attribute("subjectIdentifier", json!("x")), Err(ScriptError::ReadOnly("subjectIdentifier".into())));

        let legacy = ScriptableUser::new(alice(), svc).with_readonly_writes(ReadOnlyWrites::FallThrough);
        legacy.write_attribute("authenticatedSubjectIdentifier", json!("spoofed")).unwrap();
        // the identity field itself is untouched
        assert!(legacy.user().read().authenticated_subject_identifier.is_none());
        assert!(legacy.read_attribute("authenticatedSubjectIdentifier").unwrap().is_null());
    }

    #[test]
    fn ad_hoc_fields_round_trip() {
        let (_, svc) = services();
        let w = ScriptableUser::new(alice(), svc);
        assert!(!w.has_attribute("riskScore"));
        assert!(w.read_attribute("riskScore").is_none());
        w.write_attribute("riskScore", json!(0.7)).unwrap();
        assert!(w.has_attribute("riskScore"));
        assert_eq!(w.read_attribute("riskScore").map(|a| matches!(a, Attribute::Value(v) if v == json!(0.7))), Some(true));
        assert_eq!(w.enumerate_keys(), vec!["username"]);
    }

    #[test]
    fn roles_use_qualified_name_and_context_tenant() {
        let (store, svc) = services();
        store.add_tenant("wso2.com", 3);
        store.set_roles("wso2.com", "LDAP/bob", &["admin"]).unwrap();
        let ctx = Arc::new(AuthenticationContext::new("wso2.com"));
        let mut bob = AuthenticatedUser::new("bob", "ldap", "wso2.com");
        bob.tenant_domain = None;
        let w = ScriptableUser::for_step(ctx, bob.into_shared(), 1, Some(LOCAL_IDP), svc);
        assert_eq!(w.local_roles().as_slice(), &["admin".to_string()]);
    }

    #[test]
    fn roles_without_username_or_tenant_are_empty() {
        let (_, svc) = services();
        let nameless = ScriptableUser::new(AuthenticatedUser::default().into_shared(), svc.clone());
        assert!(nameless.local_roles().is_empty());
        let mut u = AuthenticatedUser::new("alice", "PRIMARY", "carbon.super");
        u.tenant_domain = None;
        let no_tenant = ScriptableUser::new(u.into_shared(), svc);
        assert!(no_tenant.local_roles().is_empty());
    }

    #[test]
    fn from_session_picks_step_user_or_subject() {
        let (_, svc) = services();
        let ctx = Arc::new(AuthenticationContext::new("carbon.super"));
        ctx.set_step_user(1, &crate::identity::IdpRef::Local, AuthenticatedUser::new("alice", "PRIMARY", "carbon.super"));
        let w = ScriptableUser::from_session(ctx.clone(), 1, LOCAL_IDP, svc.clone()).unwrap();
        assert_eq!(w.scope().step(), Some(1));
        assert!(ScriptableUser::from_session(ctx.clone(), 2, LOCAL_IDP, svc.clone()).is_none());
        let agg = ScriptableUser::from_session(ctx, 5, "", svc).unwrap();
        assert_eq!(agg.scope(), &UserScope::Aggregate);
        assert_eq!(agg.read_attribute("username").unwrap().as_str(), Some("alice"));
    }
}

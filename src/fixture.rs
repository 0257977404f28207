//! JSON description of an authentication session: who authenticated at which step,
//! what the user store knows about them, and which stores misbehave.
//!
//! ```json
//! {
//!   "tenant_domain": "carbon.super",
//!   "tenants": { "wso2.com": 2 },
//!   "steps": [ { "step": 1, "idp": "LOCAL",
//!                "user": { "username": "alice", "user_store_domain": "PRIMARY", "tenant_domain": "carbon.super" } } ],
//!   "roles": [ { "tenant": "carbon.super", "user": "alice", "roles": ["admin"] } ],
//!   "local_claims": [ { "tenant": "carbon.super", "user": "alice", "claims": { "http://wso2.org/claims/email": "alice@wso2.com" } } ],
//!   "failing_tenants": [],
//!   "runtime_claims": {}
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::ReadOnlyWrites;
use crate::identity::{
    AuthenticatedUser, AuthenticationContext, IdpRef, InMemoryClaimResolver, InMemoryUserStore, StoreError,
};
use crate::scripting::{ScriptableUser, Services};

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("cannot read fixture: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid fixture json: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepUser {
    pub step: u32,
    pub idp: String,
    pub user: AuthenticatedUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleGrant {
    pub tenant: String,
    /// Domain-qualified username.
    pub user: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalClaims {
    pub tenant: String,
    pub user: String,
    pub claims: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionFixture {
    pub tenant_domain: String,
    #[serde(default)]
    pub tenants: BTreeMap<String, i32>,
    #[serde(default)]
    pub steps: Vec<StepUser>,
    /// Step independent subject; defaults to the last step user.
    #[serde(default)]
    pub subject: Option<AuthenticatedUser>,
    #[serde(default)]
    pub roles: Vec<RoleGrant>,
    #[serde(default)]
    pub local_claims: Vec<LocalClaims>,
    /// Tenants whose realm answers every role lookup with an error.
    #[serde(default)]
    pub failing_tenants: Vec<String>,
    #[serde(default)]
    pub runtime_claims: BTreeMap<String, String>,
}

/// Live objects built from a fixture.
pub struct Session {
    pub context: Arc<AuthenticationContext>,
    pub store: Arc<InMemoryUserStore>,
    pub claims: Arc<InMemoryClaimResolver>,
}

impl Session {
    pub fn services(&self) -> Services { Services::new(self.store.clone(), self.claims.clone()) }

    /// Wrapper for the user `idp` authenticated at `step`, or the aggregate subject when no idp is given.
    pub fn wrapper(&self, step: u32, idp: Option<&str>, policy: ReadOnlyWrites) -> Option<ScriptableUser> {
        let w = match idp {
            Some(name) => ScriptableUser::from_session(self.context.clone(), step, name, self.services())?,
            None => ScriptableUser::with_context(self.context.clone(), self.context.subject()?, self.services()),
        };
        Some(w.with_readonly_writes(policy))
    }
}

impl SessionFixture {
    pub fn from_path(path: &Path) -> Result<Self, FixtureError> {
        let txt = std::fs::read_to_string(path)?;
        Self::from_json(&txt)
    }

    pub fn from_json(txt: &str) -> Result<Self, FixtureError> { Ok(serde_json::from_str(txt)?) }

    pub fn build(&self) -> Result<Session, FixtureError> {
        let store = Arc::new(InMemoryUserStore::new());
        for (domain, id) in &self.tenants {
            store.add_tenant(domain, *id);
        }
        for grant in &self.roles {
            let roles: Vec<&str> = grant.roles.iter().map(String::as_str).collect();
            store.set_roles(&grant.tenant, &grant.user, &roles)?;
        }
        for tenant in &self.failing_tenants {
            let realm = store.realm_for(tenant).ok_or_else(|| StoreError::UnknownTenant(tenant.clone()))?;
            realm.fail_with("simulated user store failure");
        }

        let claims = Arc::new(InMemoryClaimResolver::new());
        for lc in &self.local_claims {
            for (uri, value) in &lc.claims {
                claims.set_local_claim(&lc.tenant, &lc.user, uri, value);
            }
        }

        let context = Arc::new(AuthenticationContext::new(&self.tenant_domain));
        for su in &self.steps {
            context.set_step_user(su.step, &IdpRef::parse(&su.idp), su.user.clone());
        }
        if let Some(step) = self.steps.iter().map(|s| s.step).max() {
            context.set_current_step(step);
        }
        if let Some(subject) = &self.subject {
            context.set_subject(subject.clone());
        }
        for (uri, value) in &self.runtime_claims {
            context.set_runtime_claim(uri, value);
        }
        debug!(target: "authscript::fixture", "session built: {} step users, {} role grants", self.steps.len(), self.roles.len());
        Ok(Session { context, store, claims })
    }
}

//! Mutable, multi-step session state for one authentication request.
//! Outlives any wrapper built over it; wrappers only hold `Arc` handles.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;

use super::user::{AuthenticatedUser, IdpRef, SharedUser};

#[derive(Debug, Default)]
struct SessionState {
    current_step: u32,
    // step -> idp name -> user
    steps: BTreeMap<u32, HashMap<String, SharedUser>>,
    subject: Option<SharedUser>,
    runtime_claims: BTreeMap<String, String>,
}

#[derive(Debug)]
pub struct AuthenticationContext {
    tenant_domain: String,
    state: RwLock<SessionState>,
}

impl AuthenticationContext {
    pub fn new(tenant_domain: &str) -> Self {
        Self { tenant_domain: tenant_domain.to_string(), state: RwLock::new(SessionState { current_step: 1, ..Default::default() }) }
    }

    /// Tenant domain of the service provider the request authenticates against.
    pub fn tenant_domain(&self) -> &str { &self.tenant_domain }

    pub fn current_step(&self) -> u32 { self.state.read().current_step }

    pub fn set_current_step(&self, step: u32) { self.state.write().current_step = step; }

    /// Record the user authenticated by `idp` at `step` and return the shared handle.
    /// The latest authenticated user also becomes the step independent subject.
    pub fn set_step_user(&self, step: u32, idp: &IdpRef, user: AuthenticatedUser) -> SharedUser {
        let shared = user.into_shared();
        let mut st = self.state.write();
        st.steps.entry(step).or_default().insert(idp.name().to_string(), shared.clone());
        st.subject = Some(shared.clone());
        shared
    }

    pub fn step_user(&self, step: u32, idp: &IdpRef) -> Option<SharedUser> {
        self.state.read().steps.get(&step).and_then(|m| m.get(idp.name())).cloned()
    }

    /// Idp names that authenticated the user at `step`, sorted.
    pub fn step_idps(&self, step: u32) -> Vec<String> {
        let st = self.state.read();
        let mut out: Vec<String> = st.steps.get(&step).map(|m| m.keys().cloned().collect()).unwrap_or_default();
        out.sort();
        out
    }

    pub fn set_subject(&self, user: AuthenticatedUser) -> SharedUser {
        let shared = user.into_shared();
        self.state.write().subject = Some(shared.clone());
        shared
    }

    /// Step independent, aggregated user of the session.
    pub fn subject(&self) -> Option<SharedUser> { self.state.read().subject.clone() }

    pub fn runtime_claims(&self) -> BTreeMap<String, String> { self.state.read().runtime_claims.clone() }

    pub fn set_runtime_claim(&self, uri: &str, value: &str) {
        self.state.write().runtime_claims.insert(uri.to_string(), value.to_string());
    }
}

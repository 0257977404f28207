//! Lazy claim projections handed to scripts through `localClaims`, `remoteClaims` and `claims`.
//!
//! A view does no I/O when it is built. Each read resolves the bound user and asks the
//! `ClaimResolver` again, so a view never serves stale data within a session.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error};

use crate::identity::{AuthenticationContext, ClaimResolver, ClaimScope, ClaimTarget, Claims, IdpRef, SharedUser};

use super::error::{expect_string, ScriptError};
use super::object::{Attribute, ScriptObject};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimBinding {
    /// Step independent user held by the wrapper.
    User,
    /// User the context recorded for `idp` at `step`.
    Step { step: u32, idp: IdpRef },
}

#[derive(Clone)]
pub struct ClaimsView {
    scope: ClaimScope,
    binding: ClaimBinding,
    user: SharedUser,
    context: Option<Arc<AuthenticationContext>>,
    resolver: Arc<dyn ClaimResolver>,
}

impl fmt::Debug for ClaimsView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaimsView")
            .field("scope", &self.scope)
            .field("binding", &self.binding)
            .field("has_context", &self.context.is_some())
            .finish()
    }
}

impl ClaimsView {
    pub fn for_step(
        scope: ClaimScope,
        context: Option<Arc<AuthenticationContext>>,
        step: u32,
        idp: IdpRef,
        user: SharedUser,
        resolver: Arc<dyn ClaimResolver>,
    ) -> Self {
        Self { scope, binding: ClaimBinding::Step { step, idp }, user, context, resolver }
    }

    pub fn for_user(
        scope: ClaimScope,
        context: Option<Arc<AuthenticationContext>>,
        user: SharedUser,
        resolver: Arc<dyn ClaimResolver>,
    ) -> Self {
        Self { scope, binding: ClaimBinding::User, user, context, resolver }
    }

    pub fn scope(&self) -> ClaimScope { self.scope }

    pub fn binding(&self) -> &ClaimBinding { &self.binding }

    // The context is authoritative for step-bound views; fall back to the wrapper's user.
    fn bound_user(&self) -> SharedUser {
        if let (ClaimBinding::Step { step, idp }, Some(ctx)) = (&self.binding, &self.context) {
            if let Some(u) = ctx.step_user(*step, idp) {
                return u;
            }
        }
        self.user.clone()
    }

    fn target(&self) -> ClaimTarget {
        let user = self.bound_user().read().clone();
        match &self.binding {
            ClaimBinding::User => ClaimTarget { user, step: None, idp: None },
            ClaimBinding::Step { step, idp } => ClaimTarget { user, step: Some(*step), idp: Some(idp.clone()) },
        }
    }

    /// Resolve the full claim map now. Lookup failures read as an empty map.
    pub fn claims(&self) -> Claims {
        let target = self.target();
        let mut claims = match self.resolver.resolve(self.scope, &target) {
            Ok(c) => c,
            Err(e) => {
                error!(target: "authscript::claims", "Error when resolving {:?} claims of user '{}': {}", self.scope, target.user, e);
                Claims::new()
            }
        };
        if self.scope == ClaimScope::Runtime {
            if let Some(ctx) = &self.context {
                claims.extend(ctx.runtime_claims());
            }
        }
        debug!(target: "authscript::claims", "resolved {} {:?} claims for '{}'", claims.len(), self.scope, target.user);
        claims
    }
}

impl ScriptObject for ClaimsView {
    fn has_attribute(&self, name: &str) -> bool { self.claims().contains_key(name) }

    fn read_attribute(&self, name: &str) -> Option<Attribute> {
        self.claims().remove(name).map(|v| Attribute::Value(serde_json::Value::String(v)))
    }

    fn write_attribute(&self, name: &str, value: serde_json::Value) -> Result<(), ScriptError> {
        match self.scope {
            // writing local claims would persist into the user store
            ClaimScope::Local => Err(ScriptError::ReadOnly(name.to_string())),
            ClaimScope::Remote => {
                let v = expect_string(name, value)?;
                self.bound_user().write().attributes.insert(name.to_string(), v);
                Ok(())
            }
            ClaimScope::Runtime => {
                let Some(ctx) = &self.context else {
                    return Err(ScriptError::ReadOnly(name.to_string()));
                };
                let v = expect_string(name, value)?;
                ctx.set_runtime_claim(name, &v);
                Ok(())
            }
        }
    }

    fn enumerate_keys(&self) -> Vec<String> { self.claims().into_keys().collect() }

    fn entries(&self) -> Vec<(String, Attribute)> {
        self.claims().into_iter().map(|(k, v)| (k, Attribute::Value(serde_json::Value::String(v)))).collect()
    }

    fn describe(&self) -> String { format!("claims({:?})", self.scope) }
}

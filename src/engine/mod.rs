//! Engine bindings: thin adapters from Lua's native property protocol
//! (`__index`, `__newindex`, `__pairs`, `__len`) onto `ScriptObject`.
//!
//! All dispatch, access control and laziness live in `scripting`; the adapters only
//! translate values and errors. Both bindings share the hook bodies below and differ
//! in how an object is represented inside the Lua state.

pub mod convert;
mod userdata;
mod proxy;

use std::sync::Arc;

use mlua::{Function, Lua, Table, Value as LVal};
use thiserror::Error;
use tracing::debug;

use crate::config::EngineKind;
use crate::scripting::{Attribute, ScriptError, ScriptObject, ScriptableUser};

pub use proxy::ProxyTableEngine;
pub use userdata::UserDataEngine;

/// Global function scripts use as the "has" hook: `hasAttribute(obj, name)`.
pub const HAS_ATTRIBUTE_FN: &str = "hasAttribute";

#[derive(Debug, Error)]
pub enum EvalError {
    /// A bridge-level failure raised inside the script, e.g. a type mismatch.
    #[error(transparent)]
    Attribute(ScriptError),
    #[error("lua error: {0}")]
    Lua(#[from] mlua::Error),
}

impl EvalError {
    /// Recover a `ScriptError` raised by one of our hooks, otherwise keep the Lua error.
    pub fn from_lua(err: mlua::Error) -> Self {
        match find_script_error(&err) {
            Some(se) => EvalError::Attribute(se),
            None => EvalError::Lua(err),
        }
    }

    pub fn script_error(&self) -> Option<&ScriptError> {
        match self {
            EvalError::Attribute(se) => Some(se),
            EvalError::Lua(_) => None,
        }
    }
}

fn find_script_error(err: &mlua::Error) -> Option<ScriptError> {
    match err {
        mlua::Error::CallbackError { cause, .. } => find_script_error(cause),
        mlua::Error::ExternalError(e) => (**e).downcast_ref::<ScriptError>().cloned(),
        _ => None,
    }
}

/// Turn an object into its native Lua representation for one binding.
pub(crate) type ExposeFn = for<'lua> fn(&'lua Lua, Arc<dyn ScriptObject>) -> mlua::Result<LVal<'lua>>;

pub trait ScriptEngine {
    fn kind(&self) -> EngineKind;

    fn lua(&self) -> &Lua;

    fn expose<'lua>(&'lua self, obj: Arc<dyn ScriptObject>) -> mlua::Result<LVal<'lua>>;

    /// The exposed object behind a Lua value, if it is one of ours.
    fn resolve(&self, value: &LVal) -> Option<Arc<dyn ScriptObject>>;

    fn bind_user(&self, name: &str, user: ScriptableUser) -> Result<(), EvalError> {
        let v = self.expose(Arc::new(user))?;
        self.lua().globals().set(name, v)?;
        Ok(())
    }

    fn bind_value(&self, name: &str, value: &serde_json::Value) -> Result<(), EvalError> {
        let v = convert::json_to_lua(self.lua(), value)?;
        self.lua().globals().set(name, v)?;
        Ok(())
    }

    /// Run a chunk and return its result as JSON.
    fn eval(&self, source: &str) -> Result<serde_json::Value, EvalError> {
        let out: LVal = self.lua().load(source).set_name("authscript").eval().map_err(EvalError::from_lua)?;
        convert::lua_to_json(out, &|v| self.resolve(v)).map_err(EvalError::from_lua)
    }

    fn exec(&self, source: &str) -> Result<(), EvalError> {
        self.lua().load(source).set_name("authscript").exec().map_err(EvalError::from_lua)
    }
}

pub fn new_engine(kind: EngineKind) -> Result<Box<dyn ScriptEngine>, EvalError> {
    debug!(target: "authscript::engine", "creating {} engine", kind);
    Ok(match kind {
        EngineKind::UserData => Box::new(UserDataEngine::new()?),
        EngineKind::ProxyTable => Box::new(ProxyTableEngine::new()?),
    })
}

// ---- hook bodies shared by both bindings ----

fn attribute_to_lua<'lua>(lua: &'lua Lua, attr: Attribute, expose: ExposeFn) -> mlua::Result<LVal<'lua>> {
    match attr {
        Attribute::Value(v) => convert::json_to_lua(lua, &v),
        Attribute::Roles(r) => expose(lua, Arc::new(r)),
        Attribute::Claims(c) => expose(lua, Arc::new(c)),
    }
}

pub(crate) fn index<'lua>(lua: &'lua Lua, obj: &dyn ScriptObject, key: LVal<'lua>, expose: ExposeFn) -> mlua::Result<LVal<'lua>> {
    let Some(name) = convert::key_name(&key) else { return Ok(LVal::Nil) };
    match obj.read_attribute(&name) {
        Some(attr) => attribute_to_lua(lua, attr, expose),
        None => Ok(LVal::Nil),
    }
}

pub(crate) fn new_index(obj: &dyn ScriptObject, key: &str, value: LVal, resolve: convert::Resolve) -> mlua::Result<()> {
    let found = value.type_name();
    let json = convert::lua_to_json(value, resolve).map_err(|e| {
        let err = match obj.required_type(key) {
            Some(expected) => ScriptError::type_mismatch(key, expected, found),
            None => ScriptError::NotStorable { attribute: key.to_string(), found: convert::conversion_reason(&e) },
        };
        mlua::Error::external(err)
    })?;
    obj.write_attribute(key, json).map_err(mlua::Error::external)
}

pub(crate) fn pairs<'lua>(lua: &'lua Lua, obj: &dyn ScriptObject, expose: ExposeFn) -> mlua::Result<(Function<'lua>, Table<'lua>, LVal<'lua>)> {
    let snapshot = lua.create_table()?;
    let sequence = obj.length().is_some();
    for (key, attr) in obj.entries() {
        let v = attribute_to_lua(lua, attr, expose)?;
        match key.parse::<i64>() {
            Ok(i) if sequence => snapshot.raw_set(i, v)?,
            _ => snapshot.raw_set(key, v)?,
        }
    }
    let next: Function = lua.globals().get("next")?;
    Ok((next, snapshot, LVal::Nil))
}

pub(crate) fn install_has_attribute(lua: &Lua, resolve: fn(&LVal) -> Option<Arc<dyn ScriptObject>>) -> mlua::Result<()> {
    let has = lua.create_function(move |_, (obj, name): (LVal, String)| {
        if let Some(o) = resolve(&obj) {
            return Ok(o.has_attribute(&name));
        }
        match obj {
            LVal::Table(t) => Ok(!t.raw_get::<_, LVal>(name)?.is_nil()),
            _ => Ok(false),
        }
    })?;
    lua.globals().set(HAS_ATTRIBUTE_FN, has)
}

//! Proxy-table binding. Each object is an empty table whose metatable routes every
//! access to the wrapped `ScriptObject`. Since the table never holds raw keys,
//! `__index` and `__newindex` fire for every property.
//!
//! The proxy is still a plain table, so `rawset(user, k, v)` stores `v` in the proxy
//! itself and later `user.k` reads it without consulting the object. Raw writes never
//! reach the session user or its claims; use the userdata binding where scripts must
//! not be able to shadow attributes this way.

use std::sync::Arc;

use mlua::{AnyUserData, Lua, Table, UserData, Value as LVal};

use crate::config::EngineKind;
use crate::scripting::ScriptObject;

use super::{EvalError, ScriptEngine};

const OBJECT_SLOT: &str = "__object";

// Lets Rust find the object behind a proxy; stored in the metatable only.
struct ObjectHandle(Arc<dyn ScriptObject>);

impl UserData for ObjectHandle {}

fn expose<'lua>(lua: &'lua Lua, obj: Arc<dyn ScriptObject>) -> mlua::Result<LVal<'lua>> {
    let proxy = lua.create_table()?;
    let meta = lua.create_table()?;

    let o = obj.clone();
    meta.raw_set("__index", lua.create_function(move |lua, (_t, key): (Table, LVal)| super::index(lua, o.as_ref(), key, expose))?)?;
    let o = obj.clone();
    meta.raw_set(
        "__newindex",
        lua.create_function(move |_, (_t, key, value): (Table, String, LVal)| super::new_index(o.as_ref(), &key, value, &resolve))?,
    )?;
    let o = obj.clone();
    meta.raw_set("__len", lua.create_function(move |_, _t: Table| Ok(o.length().unwrap_or(0)))?)?;
    let o = obj.clone();
    meta.raw_set("__pairs", lua.create_function(move |lua, _t: Table| super::pairs(lua, o.as_ref(), expose))?)?;
    let o = obj.clone();
    meta.raw_set("__tostring", lua.create_function(move |_, _t: Table| Ok(o.describe()))?)?;
    meta.raw_set(OBJECT_SLOT, lua.create_userdata(ObjectHandle(obj))?)?;
    // getmetatable() from scripts sees only this marker
    meta.raw_set("__metatable", "authscript.object")?;

    proxy.set_metatable(Some(meta));
    Ok(LVal::Table(proxy))
}

fn resolve(v: &LVal) -> Option<Arc<dyn ScriptObject>> {
    let LVal::Table(t) = v else { return None };
    let meta = t.get_metatable()?;
    let handle: AnyUserData = meta.raw_get(OBJECT_SLOT).ok()?;
    let obj = handle.borrow::<ObjectHandle>().ok().map(|h| h.0.clone());
    obj
}

pub struct ProxyTableEngine {
    lua: Lua,
}

impl ProxyTableEngine {
    pub fn new() -> Result<Self, EvalError> {
        let lua = Lua::new();
        super::install_has_attribute(&lua, resolve)?;
        Ok(Self { lua })
    }
}

impl ScriptEngine for ProxyTableEngine {
    fn kind(&self) -> EngineKind { EngineKind::ProxyTable }

    fn lua(&self) -> &Lua { &self.lua }

    fn expose<'lua>(&'lua self, obj: Arc<dyn ScriptObject>) -> mlua::Result<LVal<'lua>> { expose(&self.lua, obj) }

    fn resolve(&self, value: &LVal) -> Option<Arc<dyn ScriptObject>> { resolve(value) }
}

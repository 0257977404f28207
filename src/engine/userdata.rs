use std::sync::Arc;

use mlua::{Lua, MetaMethod, UserData, UserDataMethods, Value as LVal};

use crate::config::EngineKind;
use crate::scripting::ScriptObject;

use super::{EvalError, ScriptEngine};

/// Userdata handle around a script object.
pub(crate) struct LuaObject(pub(crate) Arc<dyn ScriptObject>);

impl UserData for LuaObject {
    fn add_methods<'lua, M: UserDataMethods<'lua, Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::Index, |lua, this, key: LVal| super::index(lua, this.0.as_ref(), key, expose));
        methods.add_meta_method(MetaMethod::NewIndex, |_, this, (key, value): (String, LVal)| {
            super::new_index(this.0.as_ref(), &key, value, &resolve)
        });
        methods.add_meta_method(MetaMethod::Len, |_, this, ()| Ok(this.0.length().unwrap_or(0)));
        methods.add_meta_method(MetaMethod::Pairs, |lua, this, ()| super::pairs(lua, this.0.as_ref(), expose));
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| Ok(this.0.describe()));
    }
}

fn expose<'lua>(lua: &'lua Lua, obj: Arc<dyn ScriptObject>) -> mlua::Result<LVal<'lua>> {
    lua.create_userdata(LuaObject(obj)).map(LVal::UserData)
}

fn resolve(v: &LVal) -> Option<Arc<dyn ScriptObject>> {
    match v {
        LVal::UserData(ud) => ud.borrow::<LuaObject>().ok().map(|o| o.0.clone()),
        _ => None,
    }
}

/// Exposes objects as opaque userdata; scripts cannot see or replace the metatable.
pub struct UserDataEngine {
    lua: Lua,
}

impl UserDataEngine {
    pub fn new() -> Result<Self, EvalError> {
        let lua = Lua::new();
        super::install_has_attribute(&lua, resolve)?;
        Ok(Self { lua })
    }
}

impl ScriptEngine for UserDataEngine {
    fn kind(&self) -> EngineKind { EngineKind::UserData }

    fn lua(&self) -> &Lua { &self.lua }

    fn expose<'lua>(&'lua self, obj: Arc<dyn ScriptObject>) -> mlua::Result<LVal<'lua>> { expose(&self.lua, obj) }

    fn resolve(&self, value: &LVal) -> Option<Arc<dyn ScriptObject>> { resolve(value) }
}

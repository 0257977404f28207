//! JSON <-> Lua value conversion shared by the engine bindings.

use std::collections::HashSet;
use std::sync::Arc;

use mlua::{Lua, Table, Value as LVal};

use crate::scripting::ScriptObject;

/// Recognizes a Lua value that stands for one of our exposed objects.
pub(crate) type Resolve<'a> = &'a dyn Fn(&LVal) -> Option<Arc<dyn ScriptObject>>;

pub fn json_to_lua<'lua>(lua: &'lua Lua, v: &serde_json::Value) -> mlua::Result<LVal<'lua>> {
    let lv = match v {
        serde_json::Value::Null => LVal::Nil,
        serde_json::Value::Bool(b) => LVal::Boolean(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() { LVal::Integer(i) } else { LVal::Number(n.as_f64().unwrap_or(0.0)) }
        }
        serde_json::Value::String(s) => LVal::String(lua.create_string(s)?),
        serde_json::Value::Array(arr) => {
            let tbl = lua.create_table()?;
            for (i, item) in arr.iter().enumerate() { tbl.set((i + 1) as i64, json_to_lua(lua, item)?)?; }
            LVal::Table(tbl)
        }
        serde_json::Value::Object(map) => {
            let tbl = lua.create_table()?;
            for (k, val) in map.iter() { tbl.set(k.as_str(), json_to_lua(lua, val)?)?; }
            LVal::Table(tbl)
        }
    };
    Ok(lv)
}

/// Deepest table nesting `lua_to_json` follows before giving up.
pub(crate) const MAX_DEPTH: usize = 32;

/// Convert a Lua value to JSON. Exposed objects found via `resolve` are rendered with
/// their snapshot; functions, threads, foreign userdata, cyclic tables and tables nested
/// deeper than `MAX_DEPTH` cannot be converted.
pub(crate) fn lua_to_json(v: LVal, resolve: Resolve) -> mlua::Result<serde_json::Value> {
    let mut open = HashSet::new();
    to_json(v, resolve, &mut open)
}

fn not_json(from: &'static str, message: Option<String>) -> mlua::Error {
    mlua::Error::FromLuaConversionError { from, to: "json", message }
}

// `open` holds the tables on the current path; a table seen twice on one path is a cycle.
fn to_json(v: LVal, resolve: Resolve, open: &mut HashSet<usize>) -> mlua::Result<serde_json::Value> {
    if let Some(obj) = resolve(&v) {
        return Ok(obj.snapshot());
    }
    let j = match v {
        LVal::Nil => serde_json::Value::Null,
        LVal::Boolean(b) => serde_json::Value::Bool(b),
        LVal::Integer(i) => serde_json::json!(i),
        LVal::Number(f) => serde_json::json!(f),
        LVal::String(s) => serde_json::Value::String(s.to_str()?.to_string()),
        LVal::Table(t) => {
            let id = t.to_pointer() as usize;
            if open.len() >= MAX_DEPTH {
                return Err(not_json("table", Some(format!("table nested deeper than {MAX_DEPTH} levels"))));
            }
            if !open.insert(id) {
                return Err(not_json("table", Some("cyclic table".to_string())));
            }
            let out = table_to_json(t, resolve, open);
            open.remove(&id);
            out?
        }
        other => return Err(not_json(other.type_name(), None)),
    };
    Ok(j)
}

// A table is an array only when its keys are exactly 1..=n.
fn table_to_json(t: Table, resolve: Resolve, open: &mut HashSet<usize>) -> mlua::Result<serde_json::Value> {
    let mut count = 0usize;
    let mut max_idx = 0i64;
    let mut sequence = true;
    for pair in t.clone().pairs::<LVal, LVal>() {
        let (k, _) = pair?;
        count += 1;
        match k {
            LVal::Integer(i) if i > 0 => max_idx = max_idx.max(i),
            _ => sequence = false,
        }
    }
    if sequence && count > 0 && max_idx as usize == count {
        let mut arr = Vec::with_capacity(count);
        for i in 1..=max_idx {
            arr.push(to_json(t.raw_get::<i64, LVal>(i)?, resolve, open)?);
        }
        return Ok(serde_json::Value::Array(arr));
    }
    let mut map = serde_json::Map::new();
    for pair in t.pairs::<LVal, LVal>() {
        let (k, v) = pair?;
        let key = match k {
            LVal::String(s) => s.to_str()?.to_string(),
            LVal::Integer(i) => i.to_string(),
            _ => continue,
        };
        map.insert(key, to_json(v, resolve, open)?);
    }
    Ok(serde_json::Value::Object(map))
}

/// Short reason a value could not be converted, for error messages.
pub(crate) fn conversion_reason(err: &mlua::Error) -> String {
    match err {
        mlua::Error::FromLuaConversionError { message: Some(m), .. } => m.clone(),
        mlua::Error::FromLuaConversionError { from, .. } => from.to_string(),
        other => other.to_string(),
    }
}

/// Attribute name for a Lua key; integers address 1-based sequence slots.
pub(crate) fn key_name(key: &LVal) -> Option<String> {
    match key {
        LVal::String(s) => s.to_str().ok().map(str::to_string),
        LVal::Integer(i) => Some(i.to_string()),
        LVal::Number(n) if n.fract() == 0.0 => Some((*n as i64).to_string()),
        _ => None,
    }
}

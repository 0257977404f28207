use super::claims::ClaimsView;
use super::error::ScriptError;
use super::roles::RoleList;

/// Engine-agnostic capability set every script-visible object implements.
/// Engine adapters translate their native property hooks into these four calls.
pub trait ScriptObject: Send + Sync {
    fn has_attribute(&self, name: &str) -> bool;

    /// `None` means the name is not found.
    fn read_attribute(&self, name: &str) -> Option<Attribute>;

    fn write_attribute(&self, name: &str, value: serde_json::Value) -> Result<(), ScriptError>;

    fn enumerate_keys(&self) -> Vec<String>;

    /// Value type a write to `name` must carry; `None` accepts any JSON value.
    fn required_type(&self, _name: &str) -> Option<&'static str> { Some("string") }

    /// Element count for sequence-like objects.
    fn length(&self) -> Option<usize> { None }

    fn describe(&self) -> String { "object".to_string() }

    /// Enumerable keys with their values, as `pairs` sees them. Objects backed by one
    /// expensive lookup override this to fetch once.
    fn entries(&self) -> Vec<(String, Attribute)> {
        self.enumerate_keys().into_iter().filter_map(|k| self.read_attribute(&k).map(|a| (k, a))).collect()
    }

    /// Plain JSON rendering of the enumerable part of the object.
    fn snapshot(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (key, attr) in self.entries() {
            let v = match attr {
                Attribute::Value(v) => v,
                Attribute::Roles(r) => r.snapshot(),
                Attribute::Claims(c) => c.snapshot(),
            };
            map.insert(key, v);
        }
        serde_json::Value::Object(map)
    }
}

/// Result of a read. Nested structures stay typed so adapters can expose them as
/// interceptable objects instead of flattening them.
#[derive(Debug, Clone)]
pub enum Attribute {
    Value(serde_json::Value),
    Roles(RoleList),
    Claims(ClaimsView),
}

impl Attribute {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Attribute::Value(serde_json::Value::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool { matches!(self, Attribute::Value(serde_json::Value::Null)) }

    pub fn into_value(self) -> Option<serde_json::Value> {
        match self {
            Attribute::Value(v) => Some(v),
            _ => None,
        }
    }
}

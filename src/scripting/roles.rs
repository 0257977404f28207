use super::error::ScriptError;
use super::object::{Attribute, ScriptObject};

/// Role names of a user, exposed as a read-only sequence with 1-based indices.
/// `has_attribute(role)` doubles as a membership test.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleList {
    roles: Vec<String>,
}

impl RoleList {
    pub fn new(roles: Vec<String>) -> Self { Self { roles } }

    pub fn empty() -> Self { Self::default() }

    pub fn as_slice(&self) -> &[String] { &self.roles }

    pub fn is_empty(&self) -> bool { self.roles.is_empty() }

    pub fn contains(&self, role: &str) -> bool { self.roles.iter().any(|r| r == role) }

    fn index(&self, name: &str) -> Option<&String> {
        let i: usize = name.parse().ok()?;
        if i == 0 { return None; }
        self.roles.get(i - 1)
    }
}

impl ScriptObject for RoleList {
    fn has_attribute(&self, name: &str) -> bool { self.index(name).is_some() || self.contains(name) }

    fn read_attribute(&self, name: &str) -> Option<Attribute> {
        self.index(name).map(|r| Attribute::Value(serde_json::Value::String(r.clone())))
    }

    fn write_attribute(&self, name: &str, _value: serde_json::Value) -> Result<(), ScriptError> {
        Err(ScriptError::ReadOnly(name.to_string()))
    }

    fn enumerate_keys(&self) -> Vec<String> { (1..=self.roles.len()).map(|i| i.to_string()).collect() }

    fn length(&self) -> Option<usize> { Some(self.roles.len()) }

    fn describe(&self) -> String { format!("roles[{}]", self.roles.join(",")) }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::Value::Array(self.roles.iter().map(|r| serde_json::Value::String(r.clone())).collect())
    }
}

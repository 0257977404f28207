use thiserror::Error;

/// Failures a script can observe when writing through the bridge.
/// Raised into the script runtime's own error channel by the engine adapters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("type mismatch on '{attribute}': expected {expected}, got {found}")]
    TypeMismatch { attribute: String, expected: &'static str, found: String },
    #[error("attribute '{0}' is read-only")]
    ReadOnly(String),
    /// Ad hoc fields hold JSON-representable values only.
    #[error("cannot store {found} in ad hoc field '{attribute}'")]
    NotStorable { attribute: String, found: String },
}

impl ScriptError {
    pub fn type_mismatch(attribute: &str, expected: &'static str, found: &str) -> Self {
        ScriptError::TypeMismatch { attribute: attribute.to_string(), expected, found: found.to_string() }
    }
}

pub(crate) fn json_type_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Accept only string values; anything else is a type mismatch for `attribute`.
pub(crate) fn expect_string(attribute: &str, value: serde_json::Value) -> Result<String, ScriptError> {
    match value {
        serde_json::Value::String(s) => Ok(s),
        other => Err(ScriptError::type_mismatch(attribute, "string", json_type_name(&other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expect_string_reports_found_type() {
        assert_eq!(expect_string("username", json!("bob")).unwrap(), "bob");
        let err = expect_string("username", json!(42)).unwrap_err();
        assert_eq!(err, ScriptError::type_mismatch("username", "string", "number"));
        assert_eq!(err.to_string(), "type mismatch on 'username': expected string, got number");
        assert!(matches!(expect_string("x", json!(null)), Err(ScriptError::TypeMismatch { .. })));
    }
}

//! Runtime configuration read from `AUTHSCRIPT_*` environment variables.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub const ENV_ENGINE: &str = "AUTHSCRIPT_ENGINE";
pub const ENV_READONLY_WRITES: &str = "AUTHSCRIPT_READONLY_WRITES";
pub const ENV_LOG: &str = "AUTHSCRIPT_LOG";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {var}; expected one of: {expected}")]
    Invalid { var: &'static str, value: String, expected: &'static str },
}

/// Which engine binding exposes objects to Lua.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EngineKind {
    /// Objects are `mlua` userdata with index/newindex metamethods.
    #[default]
    UserData,
    /// Objects are empty tables behind a locked metatable.
    ProxyTable,
}

impl FromStr for EngineKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "userdata" => Ok(EngineKind::UserData),
            "proxy" | "proxytable" => Ok(EngineKind::ProxyTable),
            _ => Err(ConfigError::Invalid { var: ENV_ENGINE, value: s.to_string(), expected: "userdata, proxy" }),
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self { EngineKind::UserData => "userdata", EngineKind::ProxyTable => "proxy" })
    }
}

/// What happens when a script assigns to a recognized but read-only user attribute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadOnlyWrites {
    /// Fail the write with `ScriptError::ReadOnly`.
    #[default]
    Reject,
    /// Legacy behavior: keep the value as an ad hoc field; identity state is untouched.
    FallThrough,
}

impl FromStr for ReadOnlyWrites {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(ReadOnlyWrites::Reject),
            "fallthrough" => Ok(ReadOnlyWrites::FallThrough),
            _ => Err(ConfigError::Invalid { var: ENV_READONLY_WRITES, value: s.to_string(), expected: "reject, fallthrough" }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    pub engine: EngineKind,
    pub readonly_writes: ReadOnlyWrites,
    pub log_filter: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self { engine: EngineKind::default(), readonly_writes: ReadOnlyWrites::default(), log_filter: "info".to_string() }
    }
}

impl BridgeConfig {
    pub fn from_env() -> Result<Self, ConfigError> { Self::from_lookup(|k| std::env::var(k).ok()) }

    /// Build from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(v) = lookup(ENV_ENGINE) { cfg.engine = v.parse()?; }
        if let Some(v) = lookup(ENV_READONLY_WRITES) { cfg.readonly_writes = v.parse()?; }
        if let Some(v) = lookup(ENV_LOG).filter(|v| !v.trim().is_empty()) { cfg.log_filter = v; }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = BridgeConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, BridgeConfig::default());
        assert_eq!(cfg.engine, EngineKind::UserData);
        assert_eq!(cfg.readonly_writes, ReadOnlyWrites::Reject);
    }

    #[test]
    fn parses_values_case_insensitively() {
        let cfg = BridgeConfig::from_lookup(lookup(&[
            (ENV_ENGINE, "Proxy"),
            (ENV_READONLY_WRITES, "FALLTHROUGH"),
            (ENV_LOG, "authscript=debug"),
        ]))
        .unwrap();
        assert_eq!(cfg.engine, EngineKind::ProxyTable);
        assert_eq!(cfg.readonly_writes, ReadOnlyWrites::FallThrough);
        assert_eq!(cfg.log_filter, "authscript=debug");
    }

    #[test]
    fn rejects_unknown_values() {
        let err = BridgeConfig::from_lookup(lookup(&[(ENV_ENGINE, "graal")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: ENV_ENGINE, .. }));
        assert!(err.to_string().contains("graal"));
        assert!("maybe".parse::<ReadOnlyWrites>().is_err());
        assert_eq!(EngineKind::ProxyTable.to_string(), "proxy");
    }
}

//! Scripted-authentication bridge: exposes the user authenticated during a login
//! flow to Lua scripts as a lazily evaluated object, with access control on writes
//! and on-demand role and claim lookups through injected store collaborators.

pub mod config;
pub mod engine;
pub mod fixture;
pub mod identity;
pub mod logging;
pub mod scripting;

pub use config::{BridgeConfig, EngineKind, ReadOnlyWrites};
pub use engine::{new_engine, EvalError, ScriptEngine};
pub use scripting::{ScriptError, ScriptObject, ScriptableUser, Services};

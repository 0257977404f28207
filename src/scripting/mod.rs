//! Engine-agnostic bridge between the authentication model and script objects.
//!
//! `ScriptObject` is the single capability set ({has, read, write, enumerate})
//! every engine adapter targets; the user wrapper, claim views and role lists
//! implement it once.

pub mod attributes;
mod error;
mod object;
mod user;
mod claims;
mod roles;

pub use error::ScriptError;
pub use object::{Attribute, ScriptObject};
pub use user::{ScriptableUser, Services};
pub use claims::{ClaimBinding, ClaimsView};
pub use roles::RoleList;

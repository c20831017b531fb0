//! Agent profile: settings structures, defaults, loading.
//!
//! Settings structs live in [`settings`], constants in [`defaults`],
//! YAML loading and validation in [`file`], and the environment-variable
//! profile in [`env`]. The rest of the crate consumes the profile through
//! [`Profile`] and the per-application [`AppMeta`] projection.

mod defaults;
mod env;
mod file;
mod settings;

pub use defaults::*;
pub use env::{env_bool, env_str, env_u64, env_profile_present, ENV_SERVER_ADDRESS};
pub use file::ProfileError;
pub use settings::{AppMeta, AppSettings, ClientSettings, InOneSettings, Profile, ServerSettings};

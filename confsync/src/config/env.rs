//! Environment-variable profile.
//!
//! Container deployments configure the agent entirely through `CONFSYNC_*`
//! variables instead of a YAML file. The presence of
//! [`ENV_SERVER_ADDRESS`] selects this mode.

use std::env;
use tracing::warn;

use super::file::ProfileError;
use super::settings::{AppSettings, Profile};

pub const ENV_SERVER_ADDRESS: &str = "CONFSYNC_SERVER_ADDRESS";
pub const ENV_SERVER_CLUSTER: &str = "CONFSYNC_SERVER_CLUSTER";
pub const ENV_CLIENT_TYPE: &str = "CONFSYNC_CLIENT_TYPE";
pub const ENV_CLIENT_ALL_IN_ONE: &str = "CONFSYNC_CLIENT_ALLINONE";
pub const ENV_CLIENT_IP: &str = "CONFSYNC_CLIENT_IP";
pub const ENV_CLIENT_BEAT_FREQ_SECS: &str = "CONFSYNC_CLIENT_BEATFREQ_SECS";
pub const ENV_APP_ID: &str = "CONFSYNC_APP_ID";
pub const ENV_APP_SECRET: &str = "CONFSYNC_APP_SECRET";
pub const ENV_APP_NAMESPACES: &str = "CONFSYNC_APP_NAMESPACES";
pub const ENV_APP_POLL_INTERVAL_SECS: &str = "CONFSYNC_APP_POLL_INTERVAL_SECS";
pub const ENV_APP_CONFIG_NAME: &str = "CONFSYNC_APP_CONFIG_NAME";
pub const ENV_APP_CONFIG_SYNTAX: &str = "CONFSYNC_APP_CONFIG_SYNTAX";

/// Whether the environment profile marker variable is set and non-empty.
pub fn env_profile_present() -> bool {
    !env_str(ENV_SERVER_ADDRESS, "").is_empty()
}

/// Builds a single-application profile from `CONFSYNC_*` variables.
pub fn from_env() -> Result<Profile, ProfileError> {
    let app_id = env_str(ENV_APP_ID, "");
    if app_id.is_empty() {
        return Err(ProfileError::Invalid(format!("{ENV_APP_ID} is not set")));
    }

    let mut profile = Profile::default();
    profile.server.address = env_str(ENV_SERVER_ADDRESS, "");
    profile.server.cluster = env_str(ENV_SERVER_CLUSTER, "");
    profile.client.poll_or_watch = env_str(ENV_CLIENT_TYPE, "");
    profile.client.all_in_one = env_bool(ENV_CLIENT_ALL_IN_ONE, true);
    profile.client.ip = env_str(ENV_CLIENT_IP, "");
    profile.client.beat_freq_secs = env_u64(ENV_CLIENT_BEAT_FREQ_SECS, 0);

    let namespaces: Vec<String> = env_str(ENV_APP_NAMESPACES, "")
        .split(',')
        .map(str::trim)
        .filter(|ns| !ns.is_empty())
        .map(str::to_string)
        .collect();

    let mut app = AppSettings {
        app_id,
        secret: env_str(ENV_APP_SECRET, ""),
        namespaces,
        poll_interval_secs: env_u64(ENV_APP_POLL_INTERVAL_SECS, 0),
        ..AppSettings::default()
    };
    let filename = env_str(ENV_APP_CONFIG_NAME, "");
    if !filename.is_empty() {
        app.in_one.filename = filename.into();
    }
    app.in_one.syntax = env_str(ENV_APP_CONFIG_SYNTAX, "");
    profile.apps.push(app);

    Ok(profile)
}

/// Value of `name` as a string, or `default` when missing or empty.
pub fn env_str(name: &str, default: &str) -> String {
    match env::var(name) {
        Ok(value) if !value.is_empty() => value,
        _ => default.to_string(),
    }
}

/// Value of `name` as a bool, or `default` when missing, empty, or
/// unparseable (the failure is logged, not fatal).
pub fn env_bool(name: &str, default: bool) -> bool {
    let value = env_str(name, "");
    if value.is_empty() {
        return default;
    }
    match value.parse::<bool>() {
        Ok(parsed) => parsed,
        Err(_) => {
            warn!(name, value = %value, "cannot parse environment variable as bool");
            default
        }
    }
}

/// Value of `name` as a u64, or `default` when missing, empty, or
/// unparseable.
pub fn env_u64(name: &str, default: u64) -> u64 {
    let value = env_str(name, "");
    if value.is_empty() {
        return default;
    }
    match value.parse::<u64>() {
        Ok(parsed) => parsed,
        Err(_) => {
            warn!(name, value = %value, "cannot parse environment variable as u64");
            default
        }
    }
}

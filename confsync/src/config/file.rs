//! Profile loading and validation.

use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::info;

use super::env;
use super::settings::Profile;

/// Profile load errors. Fatal at startup; at restart time they abort the
/// restart instead.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// Failed to read the profile file
    #[error("failed to read profile {path}: {source}")]
    Read { path: String, source: io::Error },

    /// Failed to parse the profile YAML
    #[error("failed to parse profile {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },

    /// Structurally valid but unusable configuration
    #[error("invalid profile: {0}")]
    Invalid(String),
}

impl Profile {
    /// Loads the profile, preferring environment variables when the
    /// environment profile marker is present, else the YAML file at `path`.
    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        if env::env_profile_present() {
            let mut profile = env::from_env()?;
            profile.normalize();
            profile.validate()?;
            info!("profile loaded from environment variables");
            return Ok(profile);
        }
        Self::load_from(path)
    }

    /// Loads and validates the YAML profile at `path`.
    pub fn load_from(path: &Path) -> Result<Self, ProfileError> {
        let raw = fs::read_to_string(path).map_err(|source| ProfileError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut profile: Profile =
            serde_yaml::from_str(&raw).map_err(|source| ProfileError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        profile.normalize();
        profile.validate()?;
        info!(path = %path.display(), apps = profile.apps.len(), "profile loaded");
        Ok(profile)
    }

    pub(super) fn validate(&self) -> Result<(), ProfileError> {
        if self.server.address.is_empty() {
            return Err(ProfileError::Invalid(
                "server.address is not set".to_string(),
            ));
        }
        if self.apps.is_empty() {
            return Err(ProfileError::Invalid(
                "no applications configured".to_string(),
            ));
        }
        for app in &self.apps {
            if app.app_id.is_empty() {
                return Err(ProfileError::Invalid(
                    "an application is missing its appId".to_string(),
                ));
            }
        }
        Ok(())
    }
}

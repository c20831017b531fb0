//! Agent profile settings structures.
//!
//! The profile is the agent's own configuration: which applications and
//! namespaces to synchronize, where to write them, and how the agent
//! behaves. It is consumed as an immutable snapshot per lifecycle
//! generation and replaced wholesale on restart.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use super::defaults;
use crate::materialize::Syntax;
use crate::worker::RunMode;

/// Full agent profile, as loaded from YAML or environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub client: ClientSettings,
    pub server: ServerSettings,
    pub apps: Vec<AppSettings>,
}

/// Agent-wide client behavior.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientSettings {
    /// Run mode for every fetch worker: `poll` or `watch`.
    pub poll_or_watch: String,

    /// Bundle each application's namespaces into one destination file.
    pub all_in_one: bool,

    /// Client IP reported to the configuration service (grayscale rules).
    pub ip: String,

    /// Control-loop heartbeat period in seconds.
    pub beat_freq_secs: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            poll_or_watch: defaults::DEFAULT_RUN_MODE.to_string(),
            all_in_one: defaults::DEFAULT_ALL_IN_ONE,
            ip: String::new(),
            beat_freq_secs: defaults::DEFAULT_HEARTBEAT_SECS,
        }
    }
}

/// Remote configuration service addressing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerSettings {
    /// Base URL of the configuration service.
    pub address: String,

    /// Cluster to read from; normalized to lowercase.
    pub cluster: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            address: String::new(),
            cluster: defaults::DEFAULT_CLUSTER.to_string(),
        }
    }
}

/// One synchronized application.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppSettings {
    pub app_id: String,

    /// Access secret; empty when the service does not require one.
    pub secret: String,

    /// Namespaces to synchronize, in the order they appear in the
    /// destination file.
    #[serde(rename = "namespace")]
    pub namespaces: Vec<String>,

    /// Polling interval in seconds; also the retry pacing in watch mode.
    pub poll_interval_secs: u64,

    /// All-in-one destination settings.
    pub in_one: InOneSettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            secret: String::new(),
            namespaces: Vec::new(),
            poll_interval_secs: defaults::DEFAULT_POLL_INTERVAL_SECS,
            in_one: InOneSettings::default(),
        }
    }
}

/// Destination file for all-in-one materialization.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InOneSettings {
    pub filename: PathBuf,
    pub syntax: String,
}

impl Default for InOneSettings {
    fn default() -> Self {
        Self {
            filename: PathBuf::from(defaults::DEFAULT_FILENAME),
            syntax: defaults::DEFAULT_SYNTAX.to_string(),
        }
    }
}

/// Immutable per-application metadata handed to workers and aggregators.
///
/// Built once per lifecycle generation from the profile; replaced wholesale
/// on restart.
#[derive(Debug, Clone)]
pub struct AppMeta {
    pub app_id: String,
    pub secret: String,
    pub client_ip: String,
    pub address: String,
    pub cluster: String,
    pub namespaces: Vec<String>,
    pub file_name: PathBuf,
    pub syntax: Syntax,
    pub poll_interval: Duration,
    pub all_in_one: bool,
    pub run_mode: RunMode,
}

impl Profile {
    /// Fills in every defaulted field, mirroring what an operator would
    /// reasonably leave out of the YAML file.
    pub(super) fn normalize(&mut self) {
        if self.client.poll_or_watch.is_empty() {
            self.client.poll_or_watch = defaults::DEFAULT_RUN_MODE.to_string();
        }
        if self.client.beat_freq_secs == 0 {
            self.client.beat_freq_secs = defaults::DEFAULT_HEARTBEAT_SECS;
        }
        if self.server.cluster.is_empty() {
            self.server.cluster = defaults::DEFAULT_CLUSTER.to_string();
        }
        self.server.cluster = self.server.cluster.to_lowercase();

        for app in &mut self.apps {
            if app.namespaces.is_empty() {
                app.namespaces = vec![defaults::DEFAULT_NAMESPACE.to_string()];
            }
            if app.poll_interval_secs == 0 {
                app.poll_interval_secs = defaults::DEFAULT_POLL_INTERVAL_SECS;
            }
            if app.in_one.syntax.is_empty() {
                app.in_one.syntax = defaults::DEFAULT_SYNTAX.to_string();
            }
            if app.in_one.filename.as_os_str().is_empty() {
                app.in_one.filename = PathBuf::from(defaults::DEFAULT_FILENAME);
            }
        }
    }

    /// Heartbeat period for the control loop.
    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(self.client.beat_freq_secs)
    }

    /// Run mode shared by every worker of a generation.
    pub fn run_mode(&self) -> RunMode {
        RunMode::parse(&self.client.poll_or_watch)
    }

    /// Projects the profile into one [`AppMeta`] per application.
    pub fn app_metas(&self) -> Vec<AppMeta> {
        let run_mode = self.run_mode();
        self.apps
            .iter()
            .map(|app| AppMeta {
                app_id: app.app_id.clone(),
                secret: app.secret.clone(),
                client_ip: self.client.ip.clone(),
                address: self.server.address.clone(),
                cluster: self.server.cluster.clone(),
                namespaces: app.namespaces.clone(),
                file_name: app.in_one.filename.clone(),
                syntax: Syntax::parse(&app.in_one.syntax),
                poll_interval: Duration::from_secs(app.poll_interval_secs),
                all_in_one: self.client.all_in_one,
                run_mode,
            })
            .collect()
    }
}

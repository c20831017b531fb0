//! Default values for the agent profile.

/// Default profile location relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "./conf/app.yaml";

/// Default log file location.
pub const DEFAULT_LOG_FILE: &str = "./logs/agent.log";

/// Default run mode when the profile does not choose one.
pub const DEFAULT_RUN_MODE: &str = "poll";

/// Bundle every namespace of an application into one file by default.
pub const DEFAULT_ALL_IN_ONE: bool = true;

/// Default cluster name on the configuration service.
pub const DEFAULT_CLUSTER: &str = "default";

/// Namespace assumed when an application lists none.
pub const DEFAULT_NAMESPACE: &str = "application.properties";

/// Destination file assumed when an application names none.
pub const DEFAULT_FILENAME: &str = "./application.properties";

/// Default polling interval.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Default destination syntax tag.
pub const DEFAULT_SYNTAX: &str = "env";

/// Default control-loop heartbeat, used purely for liveness logging.
pub const DEFAULT_HEARTBEAT_SECS: u64 = 600;

/// Capacity of each per-application update-event channel.
pub const DEFAULT_UPDATE_CHANNEL_CAPACITY: usize = 64;

//! Confsync - configuration synchronization agent
//!
//! This library pulls key/value configuration for a set of applications and
//! namespaces from a remote configuration service and materializes it into
//! local files consumed by other processes, keeping those files eventually
//! consistent with the remote source with minimal write churn.
//!
//! # High-Level API
//!
//! The [`agent`] module provides the lifecycle controller that wires
//! everything together:
//!
//! ```ignore
//! use confsync::agent::Agent;
//! use confsync::config::Profile;
//! use confsync::remote::HttpConfigClient;
//!
//! let profile_path = PathBuf::from("conf/app.yaml");
//! let agent = Agent::new(
//!     Box::new(move || Profile::load(&profile_path)),
//!     Box::new(|profile| {
//!         HttpConfigClient::new(&profile.server.address)
//!             .map(|client| Arc::new(client) as Arc<dyn ConfigClient>)
//!     }),
//! );
//! agent.run().await?;
//! ```

pub mod agent;
pub mod aggregate;
pub mod aggregator;
pub mod config;
pub mod logging;
pub mod materialize;
pub mod remote;
pub mod worker;

/// Version of the confsync library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

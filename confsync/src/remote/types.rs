//! Client trait and request/response types for the remote source.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

/// Errors surfaced by a [`ConfigClient`] implementor.
///
/// Workers treat every variant as transient: the error is logged and the
/// fetch is retried on the next tick, indefinitely.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The request never produced a usable response (connect, timeout, TLS,
    /// non-success HTTP status).
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered, but not in the shape this client understands.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// Addressing for one (application, namespace) pair.
///
/// Built once per fetch worker from the application's metadata; immutable
/// for the worker's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchParams {
    pub app_id: String,
    pub cluster: String,
    pub namespace: String,
    pub secret: String,
    pub client_ip: String,
}

/// A full configuration snapshot for one namespace.
#[derive(Debug, Clone, Default)]
pub struct ConfigSnapshot {
    /// Key/value configuration entries.
    pub configs: HashMap<String, String>,

    /// Opaque version marker for the release this snapshot belongs to.
    pub release_token: Option<String>,
}

/// Outcome of a change-notification call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationUpdate {
    /// Whether the namespace changed since the id the caller passed in.
    pub changed: bool,

    /// The newest notification id known to the service.
    pub notification_id: i64,
}

/// Capability for talking to the remote configuration source.
///
/// `fetch_notification` may block server-side (long poll) until the
/// namespace changes or the service's hold period elapses; callers must not
/// assume it returns quickly.
#[async_trait]
pub trait ConfigClient: Send + Sync + 'static {
    /// Fetches the current configuration snapshot for one namespace.
    async fn fetch_config(&self, params: &FetchParams) -> Result<ConfigSnapshot, RemoteError>;

    /// Asks whether the namespace changed since `last_notification_id`.
    async fn fetch_notification(
        &self,
        params: &FetchParams,
        last_notification_id: i64,
    ) -> Result<NotificationUpdate, RemoteError>;
}

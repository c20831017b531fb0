//! HTTP implementation of the remote configuration client.
//!
//! Speaks the configuration service's REST surface: a plain snapshot
//! endpoint and a long-polling notification endpoint that answers HTTP 304
//! while nothing changed. Everything protocol-specific stays inside this
//! file; the rest of the crate only sees [`ConfigClient`].

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use super::types::{ConfigClient, ConfigSnapshot, FetchParams, NotificationUpdate, RemoteError};
use async_trait::async_trait;
use tracing::{debug, trace};

/// Default timeout for snapshot requests.
pub const DEFAULT_CONFIG_TIMEOUT_SECS: u64 = 30;

/// Default timeout for notification requests.
///
/// Must exceed the service's long-poll hold period so the server, not this
/// client, decides when an unchanged poll returns.
pub const DEFAULT_NOTIFICATION_TIMEOUT_SECS: u64 = 90;

/// Real configuration client backed by reqwest.
#[derive(Clone)]
pub struct HttpConfigClient {
    client: reqwest::Client,
    address: String,
    config_timeout: Duration,
    notification_timeout: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigResponse {
    #[serde(default)]
    configurations: HashMap<String, String>,
    release_key: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NotificationDto {
    namespace_name: String,
    notification_id: i64,
}

impl HttpConfigClient {
    /// Creates a client for the service at `address` with default timeouts.
    pub fn new(address: &str) -> Result<Self, RemoteError> {
        Self::with_timeouts(
            address,
            Duration::from_secs(DEFAULT_CONFIG_TIMEOUT_SECS),
            Duration::from_secs(DEFAULT_NOTIFICATION_TIMEOUT_SECS),
        )
    }

    /// Creates a client with explicit snapshot and notification timeouts.
    pub fn with_timeouts(
        address: &str,
        config_timeout: Duration,
        notification_timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .tcp_keepalive(Duration::from_secs(30))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| RemoteError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            address: address.trim_end_matches('/').to_string(),
            config_timeout,
            notification_timeout,
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder, secret: &str) -> reqwest::RequestBuilder {
        if secret.is_empty() {
            request
        } else {
            request.header("Authorization", secret)
        }
    }
}

#[async_trait]
impl ConfigClient for HttpConfigClient {
    async fn fetch_config(&self, params: &FetchParams) -> Result<ConfigSnapshot, RemoteError> {
        let url = format!(
            "{}/configs/{}/{}/{}",
            self.address, params.app_id, params.cluster, params.namespace
        );
        trace!(url = %url, "config request starting");

        let request = self
            .client
            .get(&url)
            .query(&[("ip", params.client_ip.as_str())])
            .timeout(self.config_timeout);

        let response = self
            .authorize(request, &params.secret)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(format!("config request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(RemoteError::Transport(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let body: ConfigResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::UnexpectedResponse(format!("config body: {e}")))?;

        debug!(
            app_id = %params.app_id,
            namespace = %params.namespace,
            keys = body.configurations.len(),
            "config snapshot received"
        );

        Ok(ConfigSnapshot {
            configs: body.configurations,
            release_token: body.release_key,
        })
    }

    async fn fetch_notification(
        &self,
        params: &FetchParams,
        last_notification_id: i64,
    ) -> Result<NotificationUpdate, RemoteError> {
        let notifications = serde_json::to_string(&[NotificationDto {
            namespace_name: params.namespace.clone(),
            notification_id: last_notification_id,
        }])
        .map_err(|e| RemoteError::UnexpectedResponse(format!("notification param: {e}")))?;

        let url = format!("{}/notifications/v2", self.address);
        trace!(url = %url, namespace = %params.namespace, "notification long poll starting");

        let request = self
            .client
            .get(&url)
            .query(&[
                ("appId", params.app_id.as_str()),
                ("cluster", params.cluster.as_str()),
                ("notifications", notifications.as_str()),
            ])
            .timeout(self.notification_timeout);

        let response = self
            .authorize(request, &params.secret)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(format!("notification request failed: {e}")))?;

        // The service holds the request while nothing changed and finally
        // answers 304; that is a normal "no change", not an error.
        if response.status() == StatusCode::NOT_MODIFIED {
            return Ok(NotificationUpdate {
                changed: false,
                notification_id: last_notification_id,
            });
        }

        if !response.status().is_success() {
            return Err(RemoteError::Transport(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let body: Vec<NotificationDto> = response
            .json()
            .await
            .map_err(|e| RemoteError::UnexpectedResponse(format!("notification body: {e}")))?;

        if body.len() != 1 {
            return Err(RemoteError::UnexpectedResponse(format!(
                "{} notifications for a single-namespace poll",
                body.len()
            )));
        }

        Ok(NotificationUpdate {
            changed: body[0].notification_id != last_notification_id,
            notification_id: body[0].notification_id,
        })
    }
}

//! Fetch strategies.
//!
//! Poll and watch share one worker skeleton; a strategy only decides what a
//! single step does and whether the worker should idle afterwards. This
//! keeps the cancellation and pacing logic in exactly one place.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::aggregate::AppAggregate;
use crate::remote::{ConfigClient, FetchParams};

/// What the worker does after a strategy step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Run the next step immediately. Watch mode returns this after a
    /// handled notification: pacing comes from the long poll itself.
    Continue,

    /// Sleep one poll interval before the next step.
    Idle,
}

/// Event published on the per-application update channel after a
/// successful store into the aggregate.
#[derive(Debug, Clone)]
pub struct UpdateEvent {
    /// Namespace that produced the update; carried for logging only.
    pub namespace: String,
}

/// Shared state a strategy step operates on.
pub struct StrategyContext {
    pub client: Arc<dyn ConfigClient>,
    pub params: FetchParams,
    pub aggregate: Arc<AppAggregate>,
    pub events: mpsc::Sender<UpdateEvent>,
}

impl StrategyContext {
    /// Stores a fetched snapshot and signals the aggregator.
    ///
    /// The publish is non-blocking: when the channel is full the event is
    /// dropped and logged. The data itself stays in the aggregate, so any
    /// later event re-evaluates it; a worker must never stall behind a
    /// slow consumer.
    fn store_and_publish(&self, configs: std::collections::HashMap<String, String>) {
        debug!(
            app_id = %self.params.app_id,
            namespace = %self.params.namespace,
            keys = configs.len(),
            "configuration fetched"
        );
        self.aggregate.store(self.params.namespace.clone(), configs);
        let event = UpdateEvent {
            namespace: self.params.namespace.clone(),
        };
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(
                    app_id = %self.params.app_id,
                    namespace = %self.params.namespace,
                    "update channel full; dropping event"
                );
            }
            Err(TrySendError::Closed(_)) => {
                debug!(
                    app_id = %self.params.app_id,
                    namespace = %self.params.namespace,
                    "update channel closed; aggregator is gone"
                );
            }
        }
    }
}

/// A single fetch behavior plugged into [`crate::worker::FetchWorker`].
#[async_trait]
pub trait FetchStrategy: Send {
    /// Strategy name for logs.
    fn name(&self) -> &'static str;

    /// Performs one fetch step against the remote source.
    async fn step(&mut self, ctx: &StrategyContext) -> StepOutcome;
}

/// Fetches the full snapshot every tick.
pub struct PollStrategy;

#[async_trait]
impl FetchStrategy for PollStrategy {
    fn name(&self) -> &'static str {
        "poll"
    }

    async fn step(&mut self, ctx: &StrategyContext) -> StepOutcome {
        match ctx.client.fetch_config(&ctx.params).await {
            Ok(snapshot) => {
                if !snapshot.configs.is_empty() {
                    ctx.store_and_publish(snapshot.configs);
                }
            }
            Err(err) => {
                warn!(
                    app_id = %ctx.params.app_id,
                    namespace = %ctx.params.namespace,
                    error = %err,
                    "config fetch failed"
                );
            }
        }
        StepOutcome::Idle
    }
}

/// Long-polls for change notifications and fetches only on change.
pub struct WatchStrategy {
    last_notification_id: i64,
    last_release_token: Option<String>,
}

impl WatchStrategy {
    pub fn new() -> Self {
        Self {
            last_notification_id: 0,
            last_release_token: None,
        }
    }

    /// Last observed release token, if any snapshot carried one.
    pub fn release_token(&self) -> Option<&str> {
        self.last_release_token.as_deref()
    }
}

impl Default for WatchStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FetchStrategy for WatchStrategy {
    fn name(&self) -> &'static str {
        "watch"
    }

    async fn step(&mut self, ctx: &StrategyContext) -> StepOutcome {
        let update = match ctx
            .client
            .fetch_notification(&ctx.params, self.last_notification_id)
            .await
        {
            Ok(update) => update,
            Err(err) => {
                warn!(
                    app_id = %ctx.params.app_id,
                    namespace = %ctx.params.namespace,
                    error = %err,
                    "notification fetch failed"
                );
                return StepOutcome::Idle;
            }
        };

        if !update.changed {
            debug!(
                app_id = %ctx.params.app_id,
                namespace = %ctx.params.namespace,
                "no change since last notification"
            );
            return StepOutcome::Idle;
        }

        // Advance before the follow-up fetch: a failed fetch is retried by
        // the next change instead of replaying this notification forever.
        self.last_notification_id = update.notification_id;

        match ctx.client.fetch_config(&ctx.params).await {
            Ok(snapshot) => {
                if snapshot.release_token.is_some() {
                    self.last_release_token = snapshot.release_token.clone();
                }
                if !snapshot.configs.is_empty() {
                    ctx.store_and_publish(snapshot.configs);
                }
            }
            Err(err) => {
                warn!(
                    app_id = %ctx.params.app_id,
                    namespace = %ctx.params.namespace,
                    error = %err,
                    "config fetch after notification failed"
                );
            }
        }
        StepOutcome::Continue
    }
}

//! Per-(application, namespace) fetch workers.
//!
//! A fetch worker repeatedly pulls one namespace's configuration from the
//! remote source and pushes fresh data into its application's shared
//! aggregate. Workers run until their generation's cancellation token
//! fires; remote failures are logged and retried at the fixed poll
//! interval, never escalated.

mod strategy;

pub use strategy::{
    FetchStrategy, PollStrategy, StepOutcome, StrategyContext, UpdateEvent, WatchStrategy,
};

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::aggregate::AppAggregate;
use crate::remote::{ConfigClient, FetchParams};

/// Run mode selecting the fetch strategy for every worker of a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Fetch the full snapshot every poll interval.
    #[default]
    Poll,
    /// Long-poll for change notifications, fetch only on change.
    Watch,
}

impl RunMode {
    /// Parses a mode tag; anything other than `watch` polls.
    pub fn parse(tag: &str) -> Self {
        if tag.eq_ignore_ascii_case("watch") {
            Self::Watch
        } else {
            Self::Poll
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Poll => "poll",
            Self::Watch => "watch",
        }
    }

    fn strategy(self) -> Box<dyn FetchStrategy> {
        match self {
            Self::Poll => Box::new(PollStrategy),
            Self::Watch => Box::new(WatchStrategy::new()),
        }
    }
}

/// One fetch worker, bound to a single (application, namespace) pair and
/// one lifecycle generation.
pub struct FetchWorker {
    ctx: StrategyContext,
    strategy: Box<dyn FetchStrategy>,
    interval: Duration,
}

impl FetchWorker {
    pub fn new(
        client: Arc<dyn ConfigClient>,
        params: FetchParams,
        aggregate: Arc<AppAggregate>,
        events: mpsc::Sender<UpdateEvent>,
        interval: Duration,
        mode: RunMode,
    ) -> Self {
        Self {
            ctx: StrategyContext {
                client,
                params,
                aggregate,
                events,
            },
            strategy: mode.strategy(),
            interval,
        }
    }

    /// Runs until `cancel` fires.
    ///
    /// Cancellation is checked before every step; an in-flight remote call
    /// delays shutdown by at most its own timeout, since long polls are
    /// not interruptible mid-flight.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(
            app_id = %self.ctx.params.app_id,
            namespace = %self.ctx.params.namespace,
            strategy = self.strategy.name(),
            "fetch worker started"
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }
            let outcome = self.strategy.step(&self.ctx).await;
            if outcome == StepOutcome::Idle {
                tokio::select! {
                    biased;

                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.interval) => {}
                }
            }
        }

        info!(
            app_id = %self.ctx.params.app_id,
            namespace = %self.ctx.params.namespace,
            "fetch worker stopped"
        );
    }
}

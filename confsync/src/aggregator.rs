//! Per-application update consumption and write gating.
//!
//! Exactly one aggregator task runs per application and is the only writer
//! of that application's destination file(s); events are handled strictly
//! in arrival order, so materializations for one destination never
//! interleave.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::aggregate::AppAggregate;
use crate::config::AppMeta;
use crate::materialize::syntax::{namespace_stem, Syntax};
use crate::materialize::FileMaterializer;
use crate::worker::UpdateEvent;

/// Consumes one application's update events and materializes its files.
pub struct AppAggregator {
    meta: Arc<AppMeta>,
    aggregate: Arc<AppAggregate>,
    materializer: FileMaterializer,
    events: mpsc::Receiver<UpdateEvent>,
}

impl AppAggregator {
    pub fn new(
        meta: Arc<AppMeta>,
        aggregate: Arc<AppAggregate>,
        events: mpsc::Receiver<UpdateEvent>,
    ) -> Self {
        Self {
            meta,
            aggregate,
            materializer: FileMaterializer::new(),
            events,
        }
    }

    /// Runs until `cancel` fires or every worker's sender is gone.
    ///
    /// An in-flight materialization always completes before this returns,
    /// which is what lets the lifecycle controller treat joining this task
    /// as "pending writes drained".
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(
            app_id = %self.meta.app_id,
            all_in_one = self.meta.all_in_one,
            "aggregator started"
        );

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,
                event = self.events.recv() => {
                    match event {
                        Some(event) => self.handle_update(&event),
                        None => break,
                    }
                }
            }
        }

        info!(app_id = %self.meta.app_id, "aggregator stopped");
    }

    fn handle_update(&self, event: &UpdateEvent) {
        debug!(
            app_id = %self.meta.app_id,
            namespace = %event.namespace,
            "update event received"
        );
        if self.meta.all_in_one {
            self.write_all_in_one();
        } else {
            self.write_per_namespace();
        }
    }

    /// All-in-one gating: publish only once every configured namespace has
    /// reported since the last consumed write.
    fn write_all_in_one(&self) {
        let present = self.aggregate.len();
        let expected = self.meta.namespaces.len();
        if present < expected {
            debug!(
                app_id = %self.meta.app_id,
                present,
                expected,
                "write gated; namespaces still missing"
            );
            return;
        }

        let data = self.aggregate.snapshot();
        match self.materializer.materialize(
            &self.meta.file_name,
            self.meta.syntax,
            &self.meta.namespaces,
            &data,
        ) {
            Ok(result) => {
                if result.changed {
                    info!(
                        app_id = %self.meta.app_id,
                        target = %result.target.display(),
                        "destination file updated"
                    );
                } else {
                    debug!(
                        app_id = %self.meta.app_id,
                        target = %result.target.display(),
                        "destination file unchanged"
                    );
                }
                // Consumed either way: the next write waits for every
                // namespace to refill.
                self.aggregate.clear();
            }
            Err(err) => {
                // The aggregate is kept so the next event retries.
                error!(
                    app_id = %self.meta.app_id,
                    target = %self.meta.file_name.display(),
                    error = %err,
                    "materialization failed"
                );
            }
        }
    }

    /// Per-namespace mode: every event flushes whichever namespaces are
    /// currently present, each into its own file.
    fn write_per_namespace(&self) {
        let data = self.aggregate.snapshot();
        for namespace in &self.meta.namespaces {
            let Some(configs) = data.get(namespace) else {
                continue;
            };
            let syntax = Syntax::from_namespace(namespace);
            let target = self.namespace_target(namespace, syntax);

            match self
                .materializer
                .materialize_single(&target, syntax, configs)
            {
                Ok(result) => {
                    if result.changed {
                        info!(
                            app_id = %self.meta.app_id,
                            namespace = %namespace,
                            target = %result.target.display(),
                            "namespace file updated"
                        );
                    } else {
                        debug!(
                            app_id = %self.meta.app_id,
                            namespace = %namespace,
                            "namespace file unchanged"
                        );
                    }
                    self.aggregate.remove(namespace);
                }
                Err(err) => {
                    error!(
                        app_id = %self.meta.app_id,
                        namespace = %namespace,
                        target = %target.display(),
                        error = %err,
                        "namespace materialization failed"
                    );
                }
            }
        }
    }

    /// Destination for one namespace: the app's destination directory plus
    /// `<stem>.<syntax extension>`.
    fn namespace_target(&self, namespace: &str, syntax: Syntax) -> PathBuf {
        let dir = match self.meta.file_name.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        dir.join(format!("{}.{}", namespace_stem(namespace), syntax.as_str()))
    }
}

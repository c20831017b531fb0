//! Agent lifecycle: start, stop, restart, and the signal-bus control loop.
//!
//! The [`Agent`] owns the whole worker population for the current
//! configuration generation. Its control loop is the only writer of the
//! running/stopped transition, so concurrent start/stop races cannot
//! occur; external callers only ever enqueue requests through a
//! [`SignalHandle`].

pub mod signal;

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::aggregate::AppAggregate;
use crate::aggregator::AppAggregator;
use crate::config::{Profile, ProfileError, DEFAULT_HEARTBEAT_SECS, DEFAULT_UPDATE_CHANNEL_CAPACITY};
use crate::remote::{ConfigClient, FetchParams, RemoteError};
use crate::worker::FetchWorker;

/// Reloads the profile at start and restart time.
///
/// Injected as a closure so the agent never holds a back-reference to
/// whatever owns the configuration source.
pub type ProfileLoader = Box<dyn Fn() -> Result<Profile, ProfileError> + Send>;

/// Builds the remote client for a freshly loaded profile.
///
/// Runs at every (re)start, so a changed server address takes effect on
/// restart.
pub type ClientFactory =
    Box<dyn Fn(&Profile) -> Result<Arc<dyn ConfigClient>, RemoteError> + Send>;

/// Agent lifecycle errors. Only startup-time failures surface here; every
/// per-worker error is handled locally and logged.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("profile error: {0}")]
    Profile(#[from] ProfileError),

    #[error("client error: {0}")]
    Client(#[from] RemoteError),
}

/// Cloneable sender half of the agent's signal bus.
#[derive(Clone)]
pub struct SignalHandle {
    stop: mpsc::Sender<()>,
    restart: mpsc::Sender<()>,
}

impl SignalHandle {
    /// Requests a stop. A request already pending is left as-is.
    pub fn request_stop(&self) {
        let _ = self.stop.try_send(());
    }

    /// Requests a restart with freshly reloaded configuration.
    pub fn request_restart(&self) {
        let _ = self.restart.try_send(());
    }
}

/// One running population of workers, torn down as a unit.
struct Generation {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

enum ControlEvent {
    Stop,
    Restart,
    Heartbeat,
}

/// The process-wide lifecycle controller.
pub struct Agent {
    loader: ProfileLoader,
    client_factory: ClientFactory,
    heartbeat: Duration,
    stop_rx: mpsc::Receiver<()>,
    restart_rx: mpsc::Receiver<()>,
    handle: SignalHandle,
    generation: Option<Generation>,
}

impl Agent {
    pub fn new(loader: ProfileLoader, client_factory: ClientFactory) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel(1);
        let (restart_tx, restart_rx) = mpsc::channel(1);
        Self {
            loader,
            client_factory,
            heartbeat: Duration::from_secs(DEFAULT_HEARTBEAT_SECS),
            stop_rx,
            restart_rx,
            handle: SignalHandle {
                stop: stop_tx,
                restart: restart_tx,
            },
            generation: None,
        }
    }

    /// Sender half of the signal bus, for OS signal wiring and tests.
    pub fn signal_handle(&self) -> SignalHandle {
        self.handle.clone()
    }

    pub fn is_running(&self) -> bool {
        self.generation.is_some()
    }

    /// Starts the first generation and runs the control loop until a stop
    /// request lands. Startup-time configuration errors are fatal.
    pub async fn run(mut self) -> Result<(), AgentError> {
        self.start()?;
        self.control_loop().await;
        Ok(())
    }

    fn start(&mut self) -> Result<(), AgentError> {
        if self.generation.is_some() {
            return Ok(());
        }
        let profile = (self.loader)()?;
        let client = (self.client_factory)(&profile)?;
        self.spawn_generation(&profile, client);
        Ok(())
    }

    /// Builds and launches the full worker population for one profile
    /// snapshot: per application one aggregate, one aggregator task, and
    /// one fetch worker per namespace, all under a single fresh
    /// cancellation token.
    fn spawn_generation(&mut self, profile: &Profile, client: Arc<dyn ConfigClient>) {
        let cancel = CancellationToken::new();
        let mut tasks = Vec::new();
        let mut worker_count = 0usize;
        let metas = profile.app_metas();
        let app_count = metas.len();

        for meta in metas {
            let meta = Arc::new(meta);
            let aggregate = Arc::new(AppAggregate::new());
            let (event_tx, event_rx) = mpsc::channel(DEFAULT_UPDATE_CHANNEL_CAPACITY);

            let aggregator =
                AppAggregator::new(Arc::clone(&meta), Arc::clone(&aggregate), event_rx);
            tasks.push(tokio::spawn(aggregator.run(cancel.clone())));

            for namespace in &meta.namespaces {
                let params = FetchParams {
                    app_id: meta.app_id.clone(),
                    cluster: meta.cluster.clone(),
                    namespace: namespace.clone(),
                    secret: meta.secret.clone(),
                    client_ip: meta.client_ip.clone(),
                };
                let worker = FetchWorker::new(
                    Arc::clone(&client),
                    params,
                    Arc::clone(&aggregate),
                    event_tx.clone(),
                    meta.poll_interval,
                    meta.run_mode,
                );
                tasks.push(tokio::spawn(worker.run(cancel.clone())));
                worker_count += 1;
            }
        }

        self.heartbeat = profile.heartbeat();
        self.generation = Some(Generation { cancel, tasks });
        info!(apps = app_count, workers = worker_count, "worker generation started");
    }

    /// Cancels the current generation and joins every task.
    ///
    /// This is a hard synchronization point: it does not return while any
    /// fetch worker or in-flight materialization is still running.
    async fn stop(&mut self) {
        let Some(generation) = self.generation.take() else {
            return;
        };
        info!("stopping worker generation");
        generation.cancel.cancel();
        for task in generation.tasks {
            if let Err(err) = task.await {
                error!(error = %err, "worker task join failed");
            }
        }
        info!("worker generation stopped");
    }

    /// Stop, then start with freshly reloaded configuration.
    ///
    /// The profile is re-read *before* the teardown: when reloading fails
    /// the restart is aborted and the previous generation keeps running.
    async fn restart(&mut self) {
        let profile = match (self.loader)() {
            Ok(profile) => profile,
            Err(err) => {
                error!(error = %err, "profile reload failed; restart aborted");
                return;
            }
        };
        let client = match (self.client_factory)(&profile) {
            Ok(client) => client,
            Err(err) => {
                error!(error = %err, "client rebuild failed; restart aborted");
                return;
            }
        };

        self.stop().await;
        self.spawn_generation(&profile, client);
        info!("agent restarted");
    }

    async fn control_loop(&mut self) {
        info!("signal bus ready");
        loop {
            let event = tokio::select! {
                _ = self.stop_rx.recv() => ControlEvent::Stop,
                _ = self.restart_rx.recv() => ControlEvent::Restart,
                _ = tokio::time::sleep(self.heartbeat) => ControlEvent::Heartbeat,
            };
            match event {
                ControlEvent::Stop => {
                    self.stop().await;
                    info!("agent stopped");
                    break;
                }
                ControlEvent::Restart => self.restart().await,
                ControlEvent::Heartbeat => info!("agent heartbeat"),
            }
        }
    }
}

//! OS signal wiring for the agent's signal bus.
//!
//! SIGINT, SIGTERM and SIGQUIT request a stop; SIGHUP requests a restart
//! with freshly reloaded configuration. On non-unix platforms only Ctrl-C
//! is wired, mapping to stop.

use super::SignalHandle;
use tracing::{info, warn};

/// Watches process signals and forwards them to the agent.
///
/// Runs until the process exits; spawn it alongside the agent's run loop.
#[cfg(unix)]
pub async fn watch_os_signals(handle: SignalHandle) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(err) => {
            warn!(error = %err, "cannot install SIGTERM handler");
            return;
        }
    };
    let mut interrupt = match signal(SignalKind::interrupt()) {
        Ok(stream) => stream,
        Err(err) => {
            warn!(error = %err, "cannot install SIGINT handler");
            return;
        }
    };
    let mut quit = match signal(SignalKind::quit()) {
        Ok(stream) => stream,
        Err(err) => {
            warn!(error = %err, "cannot install SIGQUIT handler");
            return;
        }
    };
    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(stream) => stream,
        Err(err) => {
            warn!(error = %err, "cannot install SIGHUP handler");
            return;
        }
    };

    loop {
        tokio::select! {
            _ = terminate.recv() => {
                info!("received SIGTERM; requesting stop");
                handle.request_stop();
            }
            _ = interrupt.recv() => {
                info!("received SIGINT; requesting stop");
                handle.request_stop();
            }
            _ = quit.recv() => {
                info!("received SIGQUIT; requesting stop");
                handle.request_stop();
            }
            _ = hangup.recv() => {
                info!("received SIGHUP; requesting restart");
                handle.request_restart();
            }
        }
    }
}

/// Watches Ctrl-C and forwards it as a stop request.
#[cfg(not(unix))]
pub async fn watch_os_signals(handle: SignalHandle) {
    loop {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "cannot listen for Ctrl-C");
            return;
        }
        info!("received Ctrl-C; requesting stop");
        handle.request_stop();
    }
}

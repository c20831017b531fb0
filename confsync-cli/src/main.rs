//! Confsync CLI - the config-synchronization agent daemon
//!
//! This binary wires the library together: profile loading, logging,
//! the HTTP configuration client, OS signal handling, and the agent's
//! run loop.

use clap::Parser;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::info;

use confsync::agent::{signal, Agent};
use confsync::config::{Profile, DEFAULT_CONFIG_FILE, DEFAULT_LOG_FILE};
use confsync::logging;
use confsync::remote::{ConfigClient, HttpConfigClient};

#[derive(Parser)]
#[command(name = "confsync")]
#[command(version = confsync::VERSION)]
#[command(about = "Synchronize remote configuration into local files", long_about = None)]
struct Args {
    /// Agent profile file (YAML); ignored when CONFSYNC_SERVER_ADDRESS is set
    #[arg(short = 'c', long = "config", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Log file path
    #[arg(short = 'l', long = "log", default_value = DEFAULT_LOG_FILE)]
    log: PathBuf,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let _logging_guard = match logging::init_logging(&args.log) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Error initializing logging: {err}");
            process::exit(1);
        }
    };

    info!(version = confsync::VERSION, "confsync agent starting");

    let profile_path = args.config.clone();
    let agent = Agent::new(
        Box::new(move || Profile::load(&profile_path)),
        Box::new(|profile| {
            HttpConfigClient::new(&profile.server.address)
                .map(|client| Arc::new(client) as Arc<dyn ConfigClient>)
        }),
    );

    tokio::spawn(signal::watch_os_signals(agent.signal_handle()));

    if let Err(err) = agent.run().await {
        eprintln!("Error starting agent: {err}");
        process::exit(1);
    }
}

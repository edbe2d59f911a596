//! flock-agent binary entry point.

use clap::Parser;
use flock_agent::{telemetry, Agent, AgentError, BackendChange, Config, RecordChange, TaskGroup};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Capacity of each downstream change feed.
const CHANGE_QUEUE_CAPACITY: usize = 1024;

/// Node-local agent for the flock cluster scheduler.
#[derive(Parser, Debug)]
#[command(name = "flock-agent")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML).
    #[arg(short, long, default_value = "flock-agent.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration
    let config: Config = config::Config::builder()
        .add_source(config::File::from(args.config.clone()))
        .add_source(
            config::Environment::with_prefix("FLOCK_AGENT")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;

    // Initialize telemetry
    telemetry::init(&config.telemetry).map_err(|e| e as Box<dyn std::error::Error>)?;

    info!(
        config_file = %args.config.display(),
        join_addrs = ?config.agent.join_addrs,
        advertise_ip = %config.agent.advertise_ip,
        base_domain = %config.agent.dns.base_domain,
        "Starting flock-agent"
    );

    let (record_tx, record_rx) = mpsc::channel(CHANGE_QUEUE_CAPACITY);
    let (backend_tx, backend_rx) = mpsc::channel(CHANGE_QUEUE_CAPACITY);

    let group = TaskGroup::new();

    let agent = Agent::new(config.agent);
    agent.start(&group, record_tx, backend_tx)?;

    // The DNS resolver and reverse-proxy subsystems attach to these feeds;
    // until they are wired in, the binary drains them into the log.
    group.spawn("dns-sink", drain_record_changes(record_rx));
    group.spawn("proxy-sink", drain_backend_changes(backend_rx));

    if let Some(failure) = group.wait().await {
        error!(task = failure.task, error = %failure.error, "agent task failed");
        return Err(failure.error.into());
    }

    info!("flock-agent shutdown complete");
    Ok(())
}

async fn drain_record_changes(mut rx: mpsc::Receiver<RecordChange>) -> Result<(), AgentError> {
    while let Some(change) = rx.recv().await {
        info!(change = ?change, "dns record change");
    }
    Ok(())
}

async fn drain_backend_changes(mut rx: mpsc::Receiver<BackendChange>) -> Result<(), AgentError> {
    while let Some(change) = rx.recv().await {
        info!(change = ?change, "proxy backend change");
    }
    Ok(())
}

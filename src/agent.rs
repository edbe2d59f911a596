//! Agent assembly: wiring the event pipeline together.

use tokio::sync::mpsc;
use tracing::info;

use crate::config::AgentConfig;
use crate::dispatch::{BackendChange, EventRouter, RecordChange};
use crate::error::AgentError;
use crate::stream::EventWatcher;
use crate::supervisor::TaskGroup;

/// Capacity of the bounded queue between the stream watcher and the router.
/// A full queue stalls the watcher's reads rather than dropping events.
pub const EVENT_QUEUE_CAPACITY: usize = 1024;

/// The node-local agent of the cluster scheduler.
///
/// Owns the event pipeline configuration; [`Agent::start`] spawns the
/// pipeline into a caller-supplied [`TaskGroup`] so the external subsystems
/// (resolver, proxy, control API) can share the same supervision.
pub struct Agent {
    config: AgentConfig,
}

impl Agent {
    /// Create an agent from its configuration.
    pub fn new(config: AgentConfig) -> Self {
        Self { config }
    }

    /// Spawn the event watcher and router into `group`.
    ///
    /// `records` and `backends` are the inbound edges of the DNS resolver and
    /// proxy subsystems. The watcher and router communicate only over the
    /// bounded event queue built here — there is no shared mutable state.
    pub fn start(
        &self,
        group: &TaskGroup,
        records: mpsc::Sender<RecordChange>,
        backends: mpsc::Sender<BackendChange>,
    ) -> Result<(), AgentError> {
        if self.config.join_addrs.is_empty() {
            return Err(AgentError::Config(
                "no manager join addresses configured".to_string(),
            ));
        }

        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);

        let watcher = EventWatcher::new(self.config.join_addrs.clone(), event_tx)?;
        group.spawn("event-watcher", watcher.run());

        let router = EventRouter::new(
            event_rx,
            records,
            backends,
            self.config.advertise_ip.clone(),
        );
        group.spawn("dispatcher", router.run());

        info!(
            join_addrs = ?self.config.join_addrs,
            advertise_ip = %self.config.advertise_ip,
            "agent event pipeline started"
        );

        Ok(())
    }
}

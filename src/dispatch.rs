//! Decoding and fan-out of task lifecycle events.
//!
//! The [`EventRouter`] is the sole consumer of the event queue. Each event's
//! payload decodes into a [`TaskSnapshot`]; from there an event fans out as
//! zero, one, or two notifications — a [`BackendChange`] for the proxy
//! subsystem when the task is gateway-enabled, and a [`RecordChange`] for the
//! DNS subsystem on health transitions. Nothing here is retried: a malformed
//! event is logged and dropped, and the loop moves on.

use std::ops::BitOr;

use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::AgentError;
use crate::metrics::{self, DispatchSink};
use crate::stream::RawEvent;

/// Task became healthy and should be routable.
pub const TASK_HEALTHY: &str = "task_healthy";
/// Task became unhealthy and must be withdrawn.
pub const TASK_UNHEALTHY: &str = "task_unhealthy";
/// Task's load-balancing weight changed.
pub const TASK_WEIGHT_CHANGE: &str = "task_weight_change";

/// Snapshot of one task as carried on a lifecycle event payload.
///
/// Absent fields default — only a type-level mismatch rejects a payload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TaskSnapshot {
    /// Owning application.
    pub app_id: String,
    /// Task instance identifier.
    pub task_id: String,
    /// Application version the task runs.
    pub version_id: String,
    /// Task IP.
    pub ip: String,
    /// Task service port.
    pub port: i64,
    /// Load-balancing weight.
    pub weight: f64,
    /// True when the task wants reverse-proxy routing.
    pub gateway_enabled: bool,
}

/// Resource-record types a change notification applies to.
///
/// A task record serves both A and SRV answers, so flags combine as a union.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordFlags(u8);

impl RecordFlags {
    /// Address records.
    pub const A: RecordFlags = RecordFlags(1);
    /// Service records.
    pub const SRV: RecordFlags = RecordFlags(1 << 1);

    /// True when every flag in `other` is also set in `self`.
    pub const fn contains(self, other: RecordFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for RecordFlags {
    type Output = RecordFlags;

    fn bitor(self, rhs: RecordFlags) -> RecordFlags {
        RecordFlags(self.0 | rhs.0)
    }
}

/// Operation on the DNS record set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOp {
    /// Publish the record.
    Add,
    /// Withdraw the record.
    Del,
}

impl RecordOp {
    /// Label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            RecordOp::Add => "add",
            RecordOp::Del => "del",
        }
    }
}

/// Operation on a proxy backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendOp {
    /// Register the backend.
    Add,
    /// Deregister the backend.
    Del,
    /// Update the backend in place.
    Change,
}

impl BackendOp {
    /// Label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            BackendOp::Add => "add",
            BackendOp::Del => "del",
            BackendOp::Change => "change",
        }
    }
}

/// Change notification consumed by the DNS resolver subsystem.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordChange {
    /// Operation to apply.
    pub change: RecordOp,
    /// Record types the change applies to.
    pub flags: RecordFlags,
    /// Application name the record belongs to.
    pub app_name: String,
    /// Task IP, string form.
    pub ip: String,
    /// Task port, string form.
    pub port: String,
    /// Load-balancing weight.
    pub weight: f64,
    /// True for the agent's own proxy address record.
    pub proxy: bool,
}

/// Change notification consumed by the proxy subsystem.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendChange {
    /// Operation to apply.
    pub action: BackendOp,
    /// Upstream (application) name.
    pub upstream: String,
    /// Upstream alias; currently unpopulated upstream-wide.
    pub alias: String,
    /// Upstream listen address; currently unpopulated upstream-wide.
    pub listen: String,
    /// Backend (task) identifier.
    pub backend: String,
    /// Backend IP.
    pub ip: String,
    /// Application version of the backend.
    pub version: String,
    /// Backend port.
    pub port: i64,
    /// Backend weight.
    pub weight: f64,
}

/// DNS-side translation: only health transitions touch the record set.
fn record_change(name: &str, task: &TaskSnapshot) -> Option<RecordChange> {
    let change = match name {
        TASK_HEALTHY => RecordOp::Add,
        TASK_UNHEALTHY => RecordOp::Del,
        _ => return None,
    };

    Some(RecordChange {
        change,
        flags: RecordFlags::A | RecordFlags::SRV,
        app_name: task.app_id.clone(),
        ip: task.ip.clone(),
        port: task.port.to_string(),
        weight: task.weight,
        proxy: false,
    })
}

/// Proxy-side translation, applied to any event of a gateway-enabled task.
fn backend_change(name: &str, task: &TaskSnapshot) -> Option<BackendChange> {
    let action = match name {
        TASK_HEALTHY => BackendOp::Add,
        TASK_UNHEALTHY => BackendOp::Del,
        TASK_WEIGHT_CHANGE => BackendOp::Change,
        _ => return None,
    };

    Some(BackendChange {
        action,
        upstream: task.app_id.clone(),
        alias: String::new(),
        listen: String::new(),
        backend: task.task_id.clone(),
        ip: task.ip.clone(),
        version: task.version_id.clone(),
        port: task.port,
        weight: task.weight,
    })
}

/// Sole consumer of the event queue; fans events out to the DNS and proxy
/// subsystems in arrival order.
pub struct EventRouter {
    rx: mpsc::Receiver<RawEvent>,
    records: mpsc::Sender<RecordChange>,
    backends: mpsc::Sender<BackendChange>,
    advertise_ip: String,
}

impl EventRouter {
    /// Create a router draining `rx` into the two outbound queues.
    pub fn new(
        rx: mpsc::Receiver<RawEvent>,
        records: mpsc::Sender<RecordChange>,
        backends: mpsc::Sender<BackendChange>,
        advertise_ip: String,
    ) -> Self {
        Self {
            rx,
            records,
            backends,
            advertise_ip,
        }
    }

    /// Run until the event queue closes.
    ///
    /// Decode failures drop the event and keep the loop alive; the only
    /// errors out of here are closed queues.
    pub async fn run(mut self) -> Result<(), AgentError> {
        // announce the local proxy address before any real event, so it
        // resolves even on a quiet cluster
        self.records
            .send(RecordChange {
                change: RecordOp::Add,
                flags: RecordFlags::A,
                app_name: String::new(),
                ip: self.advertise_ip.clone(),
                port: String::new(),
                weight: 0.0,
                proxy: true,
            })
            .await
            .map_err(|_| AgentError::QueueClosed)?;

        while let Some(event) = self.rx.recv().await {
            let task: TaskSnapshot = match serde_json::from_slice(&event.payload) {
                Ok(task) => task,
                Err(err) => {
                    warn!(event = %event.name, error = %err, "undecodable task event, dropping");
                    metrics::record_decode_failure();
                    continue;
                }
            };

            if task.gateway_enabled {
                if let Some(change) = backend_change(&event.name, &task) {
                    debug!(
                        action = change.action.as_str(),
                        backend = %change.backend,
                        "proxy backend change"
                    );
                    metrics::record_dispatch(DispatchSink::Proxy, change.action.as_str());
                    self.backends
                        .send(change)
                        .await
                        .map_err(|_| AgentError::QueueClosed)?;
                }
            }

            // the resolver only recognizes health transitions
            if let Some(change) = record_change(&event.name, &task) {
                debug!(
                    change = change.change.as_str(),
                    app = %change.app_name,
                    "dns record change"
                );
                metrics::record_dispatch(DispatchSink::Dns, change.change.as_str());
                self.records
                    .send(change)
                    .await
                    .map_err(|_| AgentError::QueueClosed)?;
            }
        }

        Ok(())
    }
}

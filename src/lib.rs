//! flock-agent — the node-local agent of the flock cluster scheduler.
//!
//! The agent discovers the cluster's current manager leader, holds a
//! long-lived connection to its task event feed, and fans each event out to
//! two local subsystems: the DNS resolver (service name → task IPs) and the
//! reverse proxy (routable backends).
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         flock-agent                          │
//! │                                                              │
//! │  managers ──probe /ping──▶ ┌──────────────┐                  │
//! │                            │ EventWatcher │                  │
//! │  leader ──/events feed───▶ │ (classifier) │                  │
//! │                            └──────┬───────┘                  │
//! │                                   │ bounded queue (1024)     │
//! │                            ┌──────▼───────┐                  │
//! │                            │ EventRouter  │                  │
//! │                            └──┬────────┬──┘                  │
//! │              RecordChange ────▼        ▼──── BackendChange   │
//! │              (DNS resolver)            (reverse proxy)       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! A broken stream always forces fresh leader discovery, since a dropped
//! connection may mean leadership moved. The resolver and proxy are external
//! collaborators; this crate owns the pipeline and the DNS record model
//! ([`records::Record`]) they consume.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use flock_agent::{Agent, AgentConfig, TaskGroup};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AgentConfig {
//!         join_addrs: vec!["10.0.0.1:9999".into(), "10.0.0.2:9999".into()],
//!         advertise_ip: "10.0.0.17".into(),
//!         dns: Default::default(),
//!     };
//!
//!     let (record_tx, record_rx) = mpsc::channel(1024);
//!     let (backend_tx, backend_rx) = mpsc::channel(1024);
//!
//!     let group = TaskGroup::new();
//!     Agent::new(config).start(&group, record_tx, backend_tx).unwrap();
//!     // hand record_rx / backend_rx to the resolver and proxy subsystems ...
//!
//!     if let Some(failure) = group.wait().await {
//!         eprintln!("agent task {} failed: {}", failure.task, failure.error);
//!     }
//! }
//! ```

#![warn(missing_docs)]

pub mod agent;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod leader;
pub mod metrics;
pub mod records;
pub mod stream;
pub mod supervisor;
pub mod telemetry;

// Re-export main types
pub use agent::{Agent, EVENT_QUEUE_CAPACITY};
pub use config::{AgentConfig, Config, DnsConfig, TelemetryConfig};
pub use dispatch::{BackendChange, EventRouter, RecordChange};
pub use error::AgentError;
pub use records::Record;
pub use stream::{EventWatcher, RawEvent};
pub use supervisor::{TaskFailure, TaskGroup};

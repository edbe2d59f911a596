//! Configuration types for flock-agent.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Agent pipeline configuration.
    pub agent: AgentConfig,

    /// Telemetry configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Agent pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Manager candidate addresses (`host:port`), probed in order when
    /// looking for the current leader.
    pub join_addrs: Vec<String>,

    /// IP the local reverse proxy advertises. Announced as a proxy A record
    /// before any task event is processed.
    pub advertise_ip: String,

    /// Record-construction parameters handed to the DNS subsystem.
    #[serde(default)]
    pub dns: DnsConfig,
}

/// Record-construction parameters for the DNS subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsConfig {
    /// Base domain appended to derived record names.
    #[serde(default = "default_base_domain")]
    pub base_domain: String,

    /// TTL for published records in seconds.
    #[serde(default = "default_ttl")]
    pub ttl: u32,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            base_domain: default_base_domain(),
            ttl: default_ttl(),
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level filter (e.g., "info", "flock_agent=debug,warn").
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Prometheus metrics exporter address.
    #[serde(default)]
    pub prometheus_addr: Option<SocketAddr>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            prometheus_addr: None,
        }
    }
}

fn default_base_domain() -> String {
    "flock.local".to_string()
}

fn default_ttl() -> u32 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

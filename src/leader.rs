//! Manager leader discovery.

use reqwest::Client;
use tracing::debug;

use crate::error::AgentError;
use crate::metrics;

/// Probes a static candidate list and returns the first reachable manager.
#[derive(Debug, Clone)]
pub struct LeaderLocator {
    client: Client,
    candidates: Vec<String>,
}

impl LeaderLocator {
    /// Create a locator over `candidates` (`host:port`), probed in order.
    pub fn new(client: Client, candidates: Vec<String>) -> Self {
        Self { client, candidates }
    }

    /// Return the first candidate whose `/ping` answers without a transport
    /// error.
    ///
    /// The HTTP status is ignored — an error page still proves a manager is
    /// listening there. No retries here; retry policy belongs to the caller.
    pub async fn locate(&self) -> Result<String, AgentError> {
        for addr in &self.candidates {
            let url = format!("http://{}/ping", addr);
            match self.client.get(&url).send().await {
                Ok(_) => {
                    metrics::record_leader_probe(true);
                    return Ok(addr.clone());
                }
                Err(err) => {
                    metrics::record_leader_probe(false);
                    debug!(addr = %addr, error = %err, "manager probe failed");
                }
            }
        }

        Err(AgentError::NoLeaderReachable)
    }
}

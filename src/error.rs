//! Error types for flock-agent.

use thiserror::Error;

/// Errors that can occur in the agent.
#[derive(Debug, Error)]
pub enum AgentError {
    /// IO error (network, file, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client error (leader probe or event stream)
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Every manager candidate failed the liveness probe
    #[error("no manager leader reachable")]
    NoLeaderReachable,

    /// The event stream reached EOF
    #[error("event stream ended")]
    StreamEnded,

    /// A pipeline queue's consumer went away
    #[error("event queue closed")]
    QueueClosed,

    /// A record field failed validation
    #[error("invalid record {field}: {value:?}")]
    InvalidRecord {
        /// Which field was rejected.
        field: &'static str,
        /// The offending value.
        value: String,
    },

    /// DNS protocol error
    #[error("DNS protocol error: {0}")]
    Proto(#[from] hickory_proto::ProtoError),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),
}

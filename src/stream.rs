//! Streaming consumption of the manager's task event feed.
//!
//! The feed is a persistent line-oriented stream of `event:` / `data:` pairs.
//! [`EventWatcher`] owns the outer loop: probe for the leader, stream its
//! feed, and start over from leader discovery whenever the stream breaks — a
//! dropped connection may mean leadership moved. Framing is handled by an
//! explicit two-state line classifier so partial reads and desync cases stay
//! testable without a network.

use std::time::Duration;

use bytes::BytesMut;
use futures::StreamExt;
use reqwest::Client;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::dispatch::{TASK_HEALTHY, TASK_UNHEALTHY, TASK_WEIGHT_CHANGE};
use crate::error::AgentError;
use crate::leader::LeaderLocator;
use crate::metrics::{self, ReconnectReason, StreamOutcome};

/// Delay before retrying after a failed leader probe or a broken stream.
pub const REJOIN_BACKOFF: Duration = Duration::from_secs(3);

const EVENT_PREFIX: &str = "event:";
const DATA_PREFIX: &str = "data:";

/// Event types the agent acts on; everything else is dropped at the protocol
/// layer.
const WATCHED_EVENTS: [&str; 3] = [TASK_HEALTHY, TASK_UNHEALTHY, TASK_WEIGHT_CHANGE];

/// One event lifted off the wire: allow-listed name plus undecoded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    /// Event type, one of the watched names.
    pub name: String,
    /// Raw payload bytes; decoding is the router's job.
    pub payload: Vec<u8>,
}

/// Accumulates body chunks and yields complete lines, so a read boundary in
/// the middle of a line never corrupts framing.
#[derive(Debug, Default)]
struct LineBuffer {
    buf: BytesMut,
}

impl LineBuffer {
    fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Next complete line, with its `\r?\n` terminator stripped.
    fn next_line(&mut self) -> Option<String> {
        let pos = self.buf.iter().position(|&b| b == b'\n')?;
        let raw = self.buf.split_to(pos + 1);
        let line = String::from_utf8_lossy(&raw);
        Some(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

#[derive(Debug)]
enum ClassifierState {
    /// Scanning for an `event:` marker line.
    ExpectEvent,
    /// Saw an allow-listed marker; the next line must be its `data:` line.
    ExpectData { name: String },
}

/// Line classifier for the `event:`/`data:` framing.
///
/// Fed one line at a time; emits a [`RawEvent`] whenever an allow-listed
/// `event:` line is immediately followed by a `data:` line. A filtered
/// event's data line never matches the marker rule and falls out on the next
/// feed. An expected data line that fails to appear drops the pending event
/// and consumes the offending line.
#[derive(Debug)]
struct LineClassifier {
    state: ClassifierState,
}

impl LineClassifier {
    fn new() -> Self {
        Self {
            state: ClassifierState::ExpectEvent,
        }
    }

    fn feed(&mut self, line: &str) -> Option<RawEvent> {
        match std::mem::replace(&mut self.state, ClassifierState::ExpectEvent) {
            ClassifierState::ExpectEvent => {
                if line.is_empty() {
                    return None;
                }
                // anything without the marker (stray data lines included) is
                // framing noise at this point
                let name = line.strip_prefix(EVENT_PREFIX)?.trim();
                if !WATCHED_EVENTS.contains(&name) {
                    metrics::record_stream_outcome(StreamOutcome::Filtered);
                    return None;
                }
                self.state = ClassifierState::ExpectData {
                    name: name.to_string(),
                };
                None
            }
            ClassifierState::ExpectData { name } => match line.strip_prefix(DATA_PREFIX) {
                Some(payload) => {
                    metrics::record_stream_outcome(StreamOutcome::Accepted);
                    Some(RawEvent {
                        name,
                        payload: payload.as_bytes().to_vec(),
                    })
                }
                None => {
                    metrics::record_stream_outcome(StreamOutcome::Desync);
                    warn!(event = %name, "event line not followed by data, dropping");
                    None
                }
            },
        }
    }
}

/// Holds the streaming connection to the leader's event feed and pushes
/// matched events into the bounded event queue.
pub struct EventWatcher {
    client: Client,
    locator: LeaderLocator,
    tx: mpsc::Sender<RawEvent>,
    backoff: Duration,
}

impl EventWatcher {
    /// Create a watcher probing `join_addrs` for the manager leader.
    pub fn new(join_addrs: Vec<String>, tx: mpsc::Sender<RawEvent>) -> Result<Self, AgentError> {
        let client = Client::builder().build()?;
        Ok(Self {
            locator: LeaderLocator::new(client.clone(), join_addrs),
            client,
            tx,
            backoff: REJOIN_BACKOFF,
        })
    }

    /// Override the reconnect backoff.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Run the watch loop for the life of the process.
    ///
    /// The only terminal exit is the event queue closing underneath us; every
    /// other failure backs off and re-enters leader discovery.
    pub async fn run(mut self) -> Result<(), AgentError> {
        loop {
            let leader = match self.locator.locate().await {
                Ok(addr) => addr,
                Err(err) => {
                    warn!(error = %err, "manager leader detection failed, retrying");
                    metrics::record_stream_reconnect(ReconnectReason::NoLeader);
                    sleep(self.backoff).await;
                    continue;
                }
            };
            info!(leader = %leader, "detected manager leader, watching events");

            if let Err(err) = self.stream_events(&leader).await {
                if matches!(err, AgentError::QueueClosed) {
                    return Err(err);
                }
                let reason = match err {
                    AgentError::StreamEnded => ReconnectReason::StreamEnded,
                    _ => ReconnectReason::StreamError,
                };
                warn!(leader = %leader, error = %err, "event stream broke, rejoining");
                metrics::record_stream_reconnect(reason);
                sleep(self.backoff).await;
            }
        }
    }

    /// Consume the leader's event feed until the stream breaks.
    ///
    /// The catch-up flag asks the manager to replay events buffered while
    /// the agent was away. EOF is a failure like any other read error: it
    /// forces re-discovery.
    async fn stream_events(&mut self, leader: &str) -> Result<(), AgentError> {
        let url = format!("http://{}/events?catchUp=true", leader);
        let resp = self.client.get(&url).send().await?;

        let mut body = resp.bytes_stream();
        let mut lines = LineBuffer::default();
        let mut classifier = LineClassifier::new();

        while let Some(chunk) = body.next().await {
            lines.extend(&chunk?);
            while let Some(line) = lines.next_line() {
                if let Some(event) = classifier.feed(&line) {
                    debug!(event = %event.name, "queueing task event");
                    // a full queue intentionally stalls the read loop
                    self.tx
                        .send(event)
                        .await
                        .map_err(|_| AgentError::QueueClosed)?;
                }
            }
        }

        Err(AgentError::StreamEnded)
    }
}

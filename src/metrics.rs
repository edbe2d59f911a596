//! Metrics instrumentation for flock-agent.
//!
//! All metrics are prefixed with `flock_agent.`

use metrics::counter;

/// Record a manager liveness probe.
pub fn record_leader_probe(reachable: bool) {
    let result = if reachable { "ok" } else { "error" };
    counter!("flock_agent.leader.probe.count", "result" => result).increment(1);
}

/// Record a stream reconnect cycle.
pub fn record_stream_reconnect(reason: ReconnectReason) {
    let reason_str = match reason {
        ReconnectReason::NoLeader => "no_leader",
        ReconnectReason::StreamError => "stream_error",
        ReconnectReason::StreamEnded => "stream_ended",
    };

    counter!("flock_agent.stream.reconnect.count", "reason" => reason_str).increment(1);
}

/// Why the watcher went back to leader discovery.
#[derive(Debug, Clone, Copy)]
pub enum ReconnectReason {
    /// No manager candidate answered its probe.
    NoLeader,
    /// The streaming connection or a read on it failed.
    StreamError,
    /// The stream reached EOF.
    StreamEnded,
}

/// Record the classifier's verdict on a wire line pair.
pub fn record_stream_outcome(outcome: StreamOutcome) {
    let outcome_str = match outcome {
        StreamOutcome::Accepted => "accepted",
        StreamOutcome::Filtered => "filtered",
        StreamOutcome::Desync => "desync",
    };

    counter!("flock_agent.stream.event.count", "outcome" => outcome_str).increment(1);
}

/// Classifier outcomes.
#[derive(Debug, Clone, Copy)]
pub enum StreamOutcome {
    /// Allow-listed event with its data line, queued.
    Accepted,
    /// Event type outside the allow-list.
    Filtered,
    /// Event line without its data line.
    Desync,
}

/// Record an event payload that failed to decode.
pub fn record_decode_failure() {
    counter!("flock_agent.dispatch.decode_failure.count").increment(1);
}

/// Record a change notification handed to a downstream subsystem.
pub fn record_dispatch(sink: DispatchSink, action: &'static str) {
    let sink_str = match sink {
        DispatchSink::Dns => "dns",
        DispatchSink::Proxy => "proxy",
    };

    counter!("flock_agent.dispatch.count", "sink" => sink_str, "action" => action).increment(1);
}

/// Downstream subsystems fed by the router.
#[derive(Debug, Clone, Copy)]
pub enum DispatchSink {
    /// DNS resolver.
    Dns,
    /// Reverse proxy.
    Proxy,
}

//! Client instrumentation.
//!
//! Uses the `metrics` facade; nothing is recorded unless the application
//! installs a recorder (the `cable` CLI installs a Prometheus exporter).

use cable_protocol::{Command, FrameType};
use metrics::{counter, gauge};

/// Metric names.
pub mod names {
    pub const FRAMES_RECEIVED: &str = "cable_frames_received_total";
    pub const ENVELOPES_SENT: &str = "cable_envelopes_sent_total";
    pub const MESSAGES_DROPPED: &str = "cable_messages_dropped_total";
    pub const PENDING_ACTIONS: &str = "cable_pending_actions";
    pub const ERRORS_TOTAL: &str = "cable_errors_total";
}

/// Describe the client metrics to the installed recorder.
pub fn describe_metrics() {
    metrics::describe_counter!(names::FRAMES_RECEIVED, "Inbound frames by type");
    metrics::describe_counter!(names::ENVELOPES_SENT, "Outbound envelopes by command");
    metrics::describe_counter!(
        names::MESSAGES_DROPPED,
        "Actions dropped because the channel was not subscribed"
    );
    metrics::describe_gauge!(names::PENDING_ACTIONS, "Actions waiting in the send queue");
    metrics::describe_counter!(names::ERRORS_TOTAL, "Total number of errors");
}

/// Record an inbound frame.
pub fn record_frame(frame_type: FrameType) {
    counter!(names::FRAMES_RECEIVED, "type" => frame_type.as_str()).increment(1);
}

/// Record an outbound envelope.
pub fn record_envelope(command: Command) {
    counter!(names::ENVELOPES_SENT, "command" => command.as_str()).increment(1);
}

/// Record an action dropped while unsubscribed.
pub fn record_dropped() {
    counter!(names::MESSAGES_DROPPED).increment(1);
}

/// Update the queue depth.
pub fn set_pending(count: usize) {
    gauge!(names::PENDING_ACTIONS).set(count as f64);
}

/// Record an error.
pub fn record_error(error_type: &'static str) {
    counter!(names::ERRORS_TOTAL, "type" => error_type).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder() {
        // No recorder installed: every call is a no-op
        describe_metrics();
        record_frame(FrameType::Ping);
        record_envelope(Command::Subscribe);
        record_dropped();
        set_pending(3);
        record_error("malformed_frame");
    }
}

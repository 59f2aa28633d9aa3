//! The single measurement type produced by a step attempt.

use std::time::Duration;

use serde::Serialize;

/// One immutable measurement produced by a step attempt.
///
/// Created inside a [`crate::step::StepConfig`] execution on completion, handed to a
/// [`crate::collector::Reporter`], and never mutated afterward.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    /// Id of the actor that produced this event (monotonic, starts at 1).
    pub actor_id: u64,
    /// Wall-clock time the event was created, as milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    /// Name of the step that produced this event.
    pub step_name: String,
    /// Protocol tag; currently always `"http"`.
    pub protocol: &'static str,
    /// Observed duration of the attempt.
    pub duration: Duration,
    /// Whether the attempt was considered successful.
    pub success: bool,
    /// Error description; empty iff `success`.
    pub error: String,
    /// Protocol-specific status code; 0 when not applicable.
    pub status_code: i64,
    /// Bytes sent in the request body.
    pub bytes_sent: u64,
    /// Bytes read from the response body.
    pub bytes_received: u64,
}

impl Event {
    /// Builds a synthetic event for a panic caught at the actor boundary.
    pub fn panic(actor_id: u64, payload: &str) -> Self {
        Self {
            actor_id,
            timestamp_ms: now_ms(),
            step_name: "panic".to_string(),
            protocol: "http",
            duration: Duration::ZERO,
            success: false,
            error: format!("panic: {payload}"),
            status_code: 0,
            bytes_sent: 0,
            bytes_received: 0,
        }
    }
}

/// Current wall time in milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

//! Client metrics
//!
//! Emitted through the `metrics` facade; whichever recorder the binary
//! installs (Prometheus in `session-cli`) picks them up. Without a recorder
//! every call is a no-op.
//!
//! - `session_client_requests_total` (counter): labels `method`, `outcome`
//! - `session_client_renewals_total` (counter): label `outcome`
//! - `session_client_renewal_queue_depth` (histogram): callers per renewal
//! - `session_client_replays_total` (counter): label `outcome`
//! - `session_client_invalidations_total` (counter)

use crate::error::Error;

/// Outcome label: `ok` or the error kind.
pub fn outcome_label<T>(result: &Result<T, Error>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(e) => e.kind(),
    }
}

/// Record a finished logical call.
pub fn record_request(method: &str, outcome: &'static str) {
    metrics::counter!("session_client_requests_total", "method" => method.to_string(), "outcome" => outcome)
        .increment(1);
}

/// Record a settled renewal and how many callers were waiting on it.
pub fn record_renewal(success: bool, queued: usize) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!("session_client_renewals_total", "outcome" => outcome).increment(1);
    metrics::histogram!("session_client_renewal_queue_depth").record(queued as f64);
}

/// Record one replayed request.
pub fn record_replay(outcome: &'static str) {
    metrics::counter!("session_client_replays_total", "outcome" => outcome).increment(1);
}

pub fn record_invalidation() {
    metrics::counter!("session_client_invalidations_total").increment(1);
}

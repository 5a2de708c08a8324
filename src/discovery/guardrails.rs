//! Per-query guardrails.
//!
//! Every discovery call is bounded before it reaches a transport: a port
//! list too large to scan cheaply fails fast, and caller-supplied timeouts
//! are clamped so neither a zero timeout (leaked handles) nor an unbounded
//! one (hung collector) can escape.

use crate::error::ValidationError;

/// Lower clamp bound for discovery timeouts, in seconds.
pub const MIN_TIMEOUT_SECS: i64 = 1;
/// Upper clamp bound for discovery timeouts, in seconds.
pub const MAX_TIMEOUT_SECS: i64 = 300;

/// Reject a ports spec whose non-empty comma-separated token count exceeds
/// `max_ports`. Returns the token count on success.
pub fn enforce_max_ports(ports_spec: &str, max_ports: usize) -> Result<usize, ValidationError> {
    let count = ports_spec
        .split(',')
        .filter(|token| !token.trim().is_empty())
        .count();
    if count > max_ports {
        return Err(ValidationError::TooManyPorts {
            count,
            max: max_ports,
        });
    }
    Ok(count)
}

/// Clamp a caller-supplied timeout into `[1, 300]` seconds and convert to
/// milliseconds for the transport layer.
pub fn clamp_timeout(seconds: i64) -> u64 {
    (seconds.clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS) as u64) * 1000
}

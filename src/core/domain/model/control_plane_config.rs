//! Settings applied to every control-plane round trip.

use std::time::Duration;

/// Configuration for rate limiting control-plane calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Sustained number of calls allowed per second.
    pub requests_per_second: u32,
    /// Number of calls allowed in a burst above the sustained rate.
    pub burst_size: u32,
}

/// Behaviour of the control-plane wrapper shared by all guests of a manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlPlaneConfig {
    /// Deadline for a single call. `None` waits indefinitely.
    pub call_timeout: Option<Duration>,
    /// Optional client-side rate limit. `None` disables limiting.
    pub rate_limit: Option<RateLimitConfig>,
}

impl ControlPlaneConfig {
    pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            call_timeout: Some(Self::DEFAULT_CALL_TIMEOUT),
            rate_limit: None,
        }
    }
}

/// Centralized configuration constants for wifiman
use std::time::Duration;

// Timing
pub const CONNECTION_TIMEOUT_SECS: u64 = 60;

// Provider ids
pub const INVALID_NETWORK_ID: i32 = -1;

// Logging
pub const DEFAULT_LOG_FILTER: &str = "wifiman=info";

/// Tunables for a `ConnectionCoordinator`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorOptions {
    /// How long an activated attempt may wait for its association event
    pub connect_timeout: Duration,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(CONNECTION_TIMEOUT_SECS),
        }
    }
}

impl CoordinatorOptions {
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

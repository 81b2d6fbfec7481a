/// Typed errors for wifiman Wi-Fi operations
use std::time::Duration;

use thiserror::Error;

use crate::wifi::{NetworkId, SecurityMode};

/// Result type alias for network provider calls
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Faults raised by a network provider implementation.
///
/// The coordinator never lets these escape: each one is logged and read as a
/// failed provider call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Network provider unavailable: {0}")]
    Unavailable(String),

    #[error("Wi-Fi radio is disabled")]
    RadioDisabled,

    #[error("Unknown network id {id}")]
    UnknownNetwork { id: NetworkId },
}

/// Why a connection attempt failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    #[error("Provider rejected the configuration for {ssid}")]
    InvalidConfig { ssid: String },

    #[error("{mode} network {ssid} requires a credential")]
    MissingCredential { ssid: String, mode: SecurityMode },

    #[error("Failed to disconnect from {ssid}")]
    DisconnectFailed { ssid: String },

    #[error("Provider refused to enable {ssid}")]
    ActivationFailed { ssid: String },

    #[error("No association with {ssid} after {}s", .timeout.as_secs())]
    TimedOut { ssid: String, timeout: Duration },
}

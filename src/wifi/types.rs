use crate::config::INVALID_NETWORK_ID;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// Provider-assigned handle for a saved network configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetworkId(i32);

impl NetworkId {
    /// Sentinel returned by a provider that rejected a configuration
    pub const INVALID: NetworkId = NetworkId(INVALID_NETWORK_ID);

    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> i32 {
        self.0
    }

    pub const fn is_valid(self) -> bool {
        self.0 >= 0
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Network security mode. `Wpa` covers both WPA and WPA2 personal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecurityMode {
    Open,
    Wep,
    Wpa,
}

impl SecurityMode {
    /// Classify a scan result's capability string.
    ///
    /// WPA is checked before WEP, so a network advertising both is WPA.
    pub fn from_capabilities(capabilities: &str) -> Self {
        if capabilities.contains("WPA") {
            SecurityMode::Wpa
        } else if capabilities.contains("WEP") {
            SecurityMode::Wep
        } else {
            SecurityMode::Open
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SecurityMode::Open => "Open",
            SecurityMode::Wep => "WEP",
            SecurityMode::Wpa => "WPA/WPA2",
        }
    }
}

impl fmt::Display for SecurityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The network a caller wants to reach
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NetworkIdentity {
    ssid: String,
    security: SecurityMode,
}

impl NetworkIdentity {
    pub fn new(ssid: impl Into<String>, security: SecurityMode) -> Self {
        Self {
            ssid: ssid.into(),
            security,
        }
    }

    pub fn open(ssid: impl Into<String>) -> Self {
        Self::new(ssid, SecurityMode::Open)
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn security(&self) -> SecurityMode {
        self.security
    }
}

/// Password or pre-shared key for a WEP/WPA network
#[derive(Debug)]
pub struct NetworkCredential(SecretString);

impl NetworkCredential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(SecretString::from(secret.into()))
    }

    pub(crate) fn to_secret(&self) -> SecretString {
        SecretString::from(self.0.expose_secret().to_owned())
    }
}

impl From<&str> for NetworkCredential {
    fn from(secret: &str) -> Self {
        Self::new(secret)
    }
}

impl From<String> for NetworkCredential {
    fn from(secret: String) -> Self {
        Self::new(secret)
    }
}

/// One network seen by a scan
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub ssid: String,
    pub capabilities: String,
}

impl ScanResult {
    pub fn new(ssid: impl Into<String>, capabilities: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            capabilities: capabilities.into(),
        }
    }

    pub fn security_mode(&self) -> SecurityMode {
        SecurityMode::from_capabilities(&self.capabilities)
    }
}

/// A configuration the provider already has saved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedNetwork {
    pub ssid: String,
    pub network_id: NetworkId,
}

/// The device's active link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Association {
    pub ssid: String,
    pub network_id: NetworkId,
}

/// Radio power sub-states reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioState {
    Enabling,
    Enabled,
    Disabling,
    Disabled,
    Unknown,
}

impl RadioState {
    /// Map a platform integer radio-state code, for adapters whose stack
    /// reports radio changes as raw codes
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => RadioState::Disabling,
            1 => RadioState::Disabled,
            2 => RadioState::Enabling,
            3 => RadioState::Enabled,
            _ => RadioState::Unknown,
        }
    }

    /// Settled on/off value, if this is not a transitional state
    pub fn settled(self) -> Option<bool> {
        match self {
            RadioState::Enabled => Some(true),
            RadioState::Disabled => Some(false),
            RadioState::Enabling | RadioState::Disabling | RadioState::Unknown => None,
        }
    }
}

/// Events pushed by the provider over its event channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    RadioState(RadioState),
    AssociationChanged {
        connected: bool,
        ssid: String,
        network_id: NetworkId,
    },
}

/// Where the coordinator's current connection attempt stands
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting(String),
    Connected(String),
    Failed,
}

impl ConnectionState {
    /// SSID of the attempt still waiting for its association event
    pub fn connecting_ssid(&self) -> Option<&str> {
        match self {
            ConnectionState::Connecting(ssid) => Some(ssid),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_capability_strings() {
        assert_eq!(
            SecurityMode::from_capabilities("WPA2-PSK-CCMP"),
            SecurityMode::Wpa
        );
        assert_eq!(SecurityMode::from_capabilities("WEP"), SecurityMode::Wep);
        assert_eq!(SecurityMode::from_capabilities(""), SecurityMode::Open);
        assert_eq!(SecurityMode::from_capabilities("[ESS]"), SecurityMode::Open);
    }

    #[test]
    fn wpa_wins_over_wep() {
        assert_eq!(
            SecurityMode::from_capabilities("[WEP][WPA-PSK-TKIP]"),
            SecurityMode::Wpa
        );
    }

    #[test]
    fn invalid_id_sentinel() {
        assert!(!NetworkId::INVALID.is_valid());
        assert_eq!(NetworkId::INVALID.raw(), -1);
        assert!(NetworkId::new(0).is_valid());
    }

    #[test]
    fn radio_codes() {
        assert_eq!(RadioState::from_code(3), RadioState::Enabled);
        assert_eq!(RadioState::from_code(1), RadioState::Disabled);
        assert_eq!(RadioState::from_code(2).settled(), None);
        assert_eq!(RadioState::from_code(42), RadioState::Unknown);
    }
}

//! Wi-Fi connection management for wifiman
//!
//! This module turns "connect to network X" requests into provider calls,
//! tracks the attempt in flight, and reports its lifecycle to listeners.

mod connection;
mod listener;
mod profile;
mod provider;
mod scanning;
mod simulated;
mod types;

// Re-export public API
pub use connection::ConnectionCoordinator;
pub use listener::{ChannelListener, ConnectListener, EnabledListener, ListenerEvent};
pub use profile::{
    AuthAlgorithm, Cipher, ConfigStatus, Encoding, KeyManagement, NetworkConfig, SecretSlot,
};
pub use provider::NetworkProvider;
pub use scanning::{saved_network_id, scan_networks};
pub use simulated::{Faults, ProviderCall, SimulatedProvider};
pub use types::{
    Association, ConnectionState, NetworkCredential, NetworkId, NetworkIdentity, ProviderEvent,
    RadioState, SavedNetwork, ScanResult, SecurityMode,
};

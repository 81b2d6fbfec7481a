//! wifiman: a Wi-Fi connection coordinator over a pluggable network provider.

pub mod config;
pub mod error;
pub mod wifi;

pub use config::CoordinatorOptions;
pub use error::{ConnectError, ProviderError, ProviderResult};
pub use wifi::{
    ConnectListener, ConnectionCoordinator, ConnectionState, EnabledListener, NetworkCredential,
    NetworkId, NetworkIdentity, NetworkProvider, ProviderEvent, SecurityMode,
};

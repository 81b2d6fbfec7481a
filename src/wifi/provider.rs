use crate::error::ProviderResult;
use crate::wifi::profile::NetworkConfig;
use crate::wifi::types::{Association, NetworkId, SavedNetwork, ScanResult};
use std::sync::Arc;

/// The host platform's Wi-Fi stack, as seen by the coordinator.
///
/// Boolean returns report whether the platform accepted the request.
/// `add_configuration`/`update_configuration` report rejection by returning
/// [`NetworkId::INVALID`]. `Err` is reserved for unexpected faults.
///
/// Asynchronous state changes are not returned here; the provider pushes
/// them as [`ProviderEvent`](crate::wifi::ProviderEvent)s over its own event
/// channel.
pub trait NetworkProvider: Send + Sync {
    /// Trigger a scan and return the latest results
    fn scan(&self) -> ProviderResult<Vec<ScanResult>>;

    fn list_configurations(&self) -> ProviderResult<Vec<SavedNetwork>>;

    fn add_configuration(&self, config: &NetworkConfig) -> ProviderResult<NetworkId>;

    /// Update the saved configuration named by `config.network_id`
    fn update_configuration(&self, config: &NetworkConfig) -> ProviderResult<NetworkId>;

    /// Enable a saved network. With `exclusive`, every other network is
    /// disabled, which also starts association with this one.
    fn enable_network(&self, id: NetworkId, exclusive: bool) -> ProviderResult<bool>;

    fn disable_network(&self, id: NetworkId) -> ProviderResult<bool>;

    fn remove_network(&self, id: NetworkId) -> ProviderResult<bool>;

    /// Persist saved configurations
    fn save_configuration(&self) -> ProviderResult<bool>;

    /// Drop the current association
    fn disconnect(&self) -> ProviderResult<bool>;

    fn current_connection(&self) -> ProviderResult<Option<Association>>;

    fn is_radio_enabled(&self) -> ProviderResult<bool>;

    fn set_radio_enabled(&self, enabled: bool) -> ProviderResult<bool>;
}

impl<P: NetworkProvider + ?Sized> NetworkProvider for Arc<P> {
    fn scan(&self) -> ProviderResult<Vec<ScanResult>> {
        (**self).scan()
    }

    fn list_configurations(&self) -> ProviderResult<Vec<SavedNetwork>> {
        (**self).list_configurations()
    }

    fn add_configuration(&self, config: &NetworkConfig) -> ProviderResult<NetworkId> {
        (**self).add_configuration(config)
    }

    fn update_configuration(&self, config: &NetworkConfig) -> ProviderResult<NetworkId> {
        (**self).update_configuration(config)
    }

    fn enable_network(&self, id: NetworkId, exclusive: bool) -> ProviderResult<bool> {
        (**self).enable_network(id, exclusive)
    }

    fn disable_network(&self, id: NetworkId) -> ProviderResult<bool> {
        (**self).disable_network(id)
    }

    fn remove_network(&self, id: NetworkId) -> ProviderResult<bool> {
        (**self).remove_network(id)
    }

    fn save_configuration(&self) -> ProviderResult<bool> {
        (**self).save_configuration()
    }

    fn disconnect(&self) -> ProviderResult<bool> {
        (**self).disconnect()
    }

    fn current_connection(&self) -> ProviderResult<Option<Association>> {
        (**self).current_connection()
    }

    fn is_radio_enabled(&self) -> ProviderResult<bool> {
        (**self).is_radio_enabled()
    }

    fn set_radio_enabled(&self, enabled: bool) -> ProviderResult<bool> {
        (**self).set_radio_enabled(enabled)
    }
}

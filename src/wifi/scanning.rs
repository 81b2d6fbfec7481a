use crate::error::ProviderResult;
use crate::wifi::provider::NetworkProvider;
use crate::wifi::types::{NetworkId, ScanResult};

/// Trigger a network scan and return what the provider saw, hidden
/// (empty-SSID) networks included
pub fn scan_networks<P: NetworkProvider + ?Sized>(
    provider: &P,
) -> ProviderResult<Vec<ScanResult>> {
    let results = provider.scan()?;
    tracing::debug!("Scan returned {} networks", results.len());
    Ok(results)
}

/// Id of the saved configuration for `ssid`, if the provider has one
pub fn saved_network_id<P: NetworkProvider + ?Sized>(
    provider: &P,
    ssid: &str,
) -> ProviderResult<Option<NetworkId>> {
    let saved = provider.list_configurations()?;
    for network in &saved {
        tracing::debug!(
            "Saved configuration {} (id {})",
            network.ssid,
            network.network_id
        );
    }
    Ok(saved
        .into_iter()
        .find(|network| network.ssid == ssid)
        .map(|network| network.network_id))
}

//! In-memory network provider.
//!
//! Behaves like a platform Wi-Fi stack closely enough to drive the
//! coordinator end to end: it keeps saved profiles, tracks one association,
//! emits events on enable/disconnect/radio changes, and records every call.
//! Faults can be injected per operation.
//!
//! Enabling with the radio off fails with [`ProviderError::RadioDisabled`];
//! enable, disable and remove of an id with no saved profile fail with
//! [`ProviderError::UnknownNetwork`].

use crate::error::{ProviderError, ProviderResult};
use crate::wifi::profile::NetworkConfig;
use crate::wifi::provider::NetworkProvider;
use crate::wifi::types::{
    Association, NetworkId, ProviderEvent, RadioState, SavedNetwork, ScanResult,
};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::writer::Writer;
use std::io::Cursor;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::UnboundedSender;

/// Provider calls, as recorded by [`SimulatedProvider::calls`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    Scan,
    ListConfigurations,
    AddConfiguration(String),
    UpdateConfiguration(NetworkId),
    EnableNetwork(NetworkId, bool),
    DisableNetwork(NetworkId),
    RemoveNetwork(NetworkId),
    SaveConfiguration,
    Disconnect,
    CurrentConnection,
    IsRadioEnabled,
    SetRadioEnabled(bool),
}

/// Injected failures. `false` everywhere means a healthy provider.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Faults {
    /// Every call returns `ProviderError::Unavailable`
    pub unavailable: bool,
    /// Add/update return the invalid id
    pub reject_config: bool,
    pub fail_disable: bool,
    pub fail_disconnect: bool,
    pub reject_enable: bool,
    pub fail_remove: bool,
    pub fail_save: bool,
    /// Enable succeeds but no association ever follows
    pub withhold_association: bool,
}

#[derive(Debug)]
struct StoredProfile {
    network_id: NetworkId,
    ssid: String,
    xml: String,
}

#[derive(Debug)]
struct SimState {
    radio_enabled: bool,
    in_range: Vec<ScanResult>,
    profiles: Vec<StoredProfile>,
    next_id: i32,
    association: Option<Association>,
    persisted: Option<String>,
    faults: Faults,
    calls: Vec<ProviderCall>,
}

impl SimState {
    fn saved_ssid(&self, id: NetworkId) -> ProviderResult<String> {
        self.profiles
            .iter()
            .find(|profile| profile.network_id == id)
            .map(|profile| profile.ssid.clone())
            .ok_or(ProviderError::UnknownNetwork { id })
    }
}

#[derive(Debug)]
pub struct SimulatedProvider {
    state: Mutex<SimState>,
    events: Option<UnboundedSender<ProviderEvent>>,
}

impl Default for SimulatedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedProvider {
    /// Radio on, nothing in range, nothing saved, no event channel
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SimState {
                radio_enabled: true,
                in_range: Vec::new(),
                profiles: Vec::new(),
                next_id: 0,
                association: None,
                persisted: None,
                faults: Faults::default(),
                calls: Vec::new(),
            }),
            events: None,
        }
    }

    pub fn with_events(mut self, events: UnboundedSender<ProviderEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Put a network in range of the simulated radio
    pub fn with_network(self, ssid: &str, capabilities: &str) -> Self {
        self.lock().in_range.push(ScanResult::new(ssid, capabilities));
        self
    }

    pub fn with_radio_enabled(self, enabled: bool) -> Self {
        self.lock().radio_enabled = enabled;
        self
    }

    /// Save a bare profile for `ssid` and return its id
    pub fn save_profile(&self, ssid: &str) -> NetworkId {
        let mut state = self.lock();
        let network_id = NetworkId::new(state.next_id);
        state.next_id += 1;
        state.profiles.push(StoredProfile {
            network_id,
            ssid: ssid.to_string(),
            xml: String::new(),
        });
        network_id
    }

    /// Associate with `ssid` directly, saving a profile for it if needed.
    /// No event is emitted and no call is recorded.
    pub fn associate(&self, ssid: &str) -> NetworkId {
        let existing = self
            .lock()
            .profiles
            .iter()
            .find(|profile| profile.ssid == ssid)
            .map(|profile| profile.network_id);
        let network_id = existing.unwrap_or_else(|| self.save_profile(ssid));
        self.lock().association = Some(Association {
            ssid: ssid.to_string(),
            network_id,
        });
        network_id
    }

    pub fn set_faults(&self, faults: Faults) {
        self.lock().faults = faults;
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.lock().calls.clone()
    }

    pub fn association(&self) -> Option<Association> {
        self.lock().association.clone()
    }

    pub fn saved_ssids(&self) -> Vec<String> {
        self.lock()
            .profiles
            .iter()
            .map(|profile| profile.ssid.clone())
            .collect()
    }

    /// Profile XML stored for `id`, as handed over by add/update
    pub fn profile_xml(&self, id: NetworkId) -> Option<String> {
        self.lock()
            .profiles
            .iter()
            .find(|profile| profile.network_id == id)
            .map(|profile| profile.xml.clone())
    }

    /// The config store document written by the last `save_configuration`
    pub fn persisted_store(&self) -> Option<String> {
        self.lock().persisted.clone()
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record `call` and hand back the state, or fail if the provider is down
    fn begin(&self, call: ProviderCall) -> ProviderResult<MutexGuard<'_, SimState>> {
        let mut state = self.lock();
        state.calls.push(call);
        if state.faults.unavailable {
            return Err(ProviderError::Unavailable(
                "simulated provider is offline".to_string(),
            ));
        }
        Ok(state)
    }

    fn emit(&self, event: ProviderEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    fn drop_association(&self, state: &mut SimState) {
        if let Some(association) = state.association.take() {
            self.emit(ProviderEvent::AssociationChanged {
                connected: false,
                ssid: association.ssid,
                network_id: association.network_id,
            });
        }
    }
}

impl NetworkProvider for SimulatedProvider {
    fn scan(&self) -> ProviderResult<Vec<ScanResult>> {
        let state = self.begin(ProviderCall::Scan)?;
        if !state.radio_enabled {
            return Ok(Vec::new());
        }
        Ok(state.in_range.clone())
    }

    fn list_configurations(&self) -> ProviderResult<Vec<SavedNetwork>> {
        let state = self.begin(ProviderCall::ListConfigurations)?;
        Ok(state
            .profiles
            .iter()
            .map(|profile| SavedNetwork {
                ssid: profile.ssid.clone(),
                network_id: profile.network_id,
            })
            .collect())
    }

    fn add_configuration(&self, config: &NetworkConfig) -> ProviderResult<NetworkId> {
        let mut state = self.begin(ProviderCall::AddConfiguration(config.ssid.clone()))?;
        if state.faults.reject_config {
            return Ok(NetworkId::INVALID);
        }
        let network_id = NetworkId::new(state.next_id);
        state.next_id += 1;
        state.profiles.push(StoredProfile {
            network_id,
            ssid: config.ssid.clone(),
            xml: config.to_profile_xml(),
        });
        Ok(network_id)
    }

    fn update_configuration(&self, config: &NetworkConfig) -> ProviderResult<NetworkId> {
        let network_id = config.network_id.unwrap_or(NetworkId::INVALID);
        let mut state = self.begin(ProviderCall::UpdateConfiguration(network_id))?;
        if state.faults.reject_config {
            return Ok(NetworkId::INVALID);
        }
        match state
            .profiles
            .iter_mut()
            .find(|profile| profile.network_id == network_id)
        {
            Some(profile) => {
                profile.ssid = config.ssid.clone();
                profile.xml = config.to_profile_xml();
                Ok(network_id)
            }
            None => Ok(NetworkId::INVALID),
        }
    }

    fn enable_network(&self, id: NetworkId, exclusive: bool) -> ProviderResult<bool> {
        let mut state = self.begin(ProviderCall::EnableNetwork(id, exclusive))?;
        if !state.radio_enabled {
            return Err(ProviderError::RadioDisabled);
        }
        let ssid = state.saved_ssid(id)?;
        if state.faults.reject_enable {
            return Ok(false);
        }

        let in_range = state.in_range.iter().any(|result| result.ssid == ssid);
        if exclusive && in_range && !state.faults.withhold_association {
            self.drop_association(&mut state);
            state.association = Some(Association {
                ssid: ssid.clone(),
                network_id: id,
            });
            self.emit(ProviderEvent::AssociationChanged {
                connected: true,
                ssid,
                network_id: id,
            });
        }
        Ok(true)
    }

    fn disable_network(&self, id: NetworkId) -> ProviderResult<bool> {
        let state = self.begin(ProviderCall::DisableNetwork(id))?;
        state.saved_ssid(id)?;
        Ok(!state.faults.fail_disable)
    }

    fn remove_network(&self, id: NetworkId) -> ProviderResult<bool> {
        let mut state = self.begin(ProviderCall::RemoveNetwork(id))?;
        state.saved_ssid(id)?;
        if state.faults.fail_remove {
            return Ok(false);
        }
        state.profiles.retain(|profile| profile.network_id != id);
        if state
            .association
            .as_ref()
            .is_some_and(|association| association.network_id == id)
        {
            self.drop_association(&mut state);
        }
        Ok(true)
    }

    fn save_configuration(&self) -> ProviderResult<bool> {
        let mut state = self.begin(ProviderCall::SaveConfiguration)?;
        if state.faults.fail_save {
            return Ok(false);
        }

        let mut writer = Writer::new(Cursor::new(Vec::new()));
        let _ = writer.write_event(Event::Decl(BytesDecl::new("1.0", None, None)));
        let _ = writer.write_event(Event::Start(BytesStart::new("WifiConfigStore")));
        for profile in &state.profiles {
            let id = profile.network_id.to_string();
            let mut start = BytesStart::new("profile");
            start.push_attribute(("ssid", profile.ssid.as_str()));
            start.push_attribute(("networkId", id.as_str()));
            let _ = writer.write_event(Event::Empty(start));
        }
        let _ = writer.write_event(Event::End(BytesEnd::new("WifiConfigStore")));

        let store = String::from_utf8(writer.into_inner().into_inner()).unwrap_or_default();
        state.persisted = Some(store);
        Ok(true)
    }

    fn disconnect(&self) -> ProviderResult<bool> {
        let mut state = self.begin(ProviderCall::Disconnect)?;
        if state.faults.fail_disconnect {
            return Ok(false);
        }
        self.drop_association(&mut state);
        Ok(true)
    }

    fn current_connection(&self) -> ProviderResult<Option<Association>> {
        let state = self.begin(ProviderCall::CurrentConnection)?;
        Ok(state.association.clone())
    }

    fn is_radio_enabled(&self) -> ProviderResult<bool> {
        let state = self.begin(ProviderCall::IsRadioEnabled)?;
        Ok(state.radio_enabled)
    }

    fn set_radio_enabled(&self, enabled: bool) -> ProviderResult<bool> {
        let mut state = self.begin(ProviderCall::SetRadioEnabled(enabled))?;
        if enabled {
            self.emit(ProviderEvent::RadioState(RadioState::Enabling));
            state.radio_enabled = true;
            self.emit(ProviderEvent::RadioState(RadioState::Enabled));
        } else {
            self.emit(ProviderEvent::RadioState(RadioState::Disabling));
            self.drop_association(&mut state);
            state.radio_enabled = false;
            self.emit(ProviderEvent::RadioState(RadioState::Disabled));
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wifi::types::{NetworkIdentity, SecurityMode};
    use tokio::sync::mpsc;

    fn wpa_config(ssid: &str) -> NetworkConfig {
        let identity = NetworkIdentity::new(ssid, SecurityMode::Wpa);
        NetworkConfig::build(&identity, Some(&"password1".into())).unwrap()
    }

    #[test]
    fn exclusive_enable_associates_in_range_network() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let provider = SimulatedProvider::new()
            .with_events(tx)
            .with_network("Home", "[WPA2-PSK-CCMP]");

        let id = provider.add_configuration(&wpa_config("Home")).unwrap();
        assert!(provider.enable_network(id, true).unwrap());
        assert_eq!(
            provider.association(),
            Some(Association {
                ssid: "Home".to_string(),
                network_id: id,
            })
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            ProviderEvent::AssociationChanged {
                connected: true,
                ssid: "Home".to_string(),
                network_id: id,
            }
        );
    }

    #[test]
    fn out_of_range_network_never_associates() {
        let provider = SimulatedProvider::new();
        let id = provider.add_configuration(&wpa_config("Faraway")).unwrap();
        assert!(provider.enable_network(id, true).unwrap());
        assert_eq!(provider.association(), None);
    }

    #[test]
    fn unavailable_provider_faults_every_call() {
        let provider = SimulatedProvider::new();
        provider.set_faults(Faults {
            unavailable: true,
            ..Faults::default()
        });
        assert!(provider.scan().is_err());
        assert!(provider.disconnect().is_err());
        assert_eq!(
            provider.calls(),
            vec![ProviderCall::Scan, ProviderCall::Disconnect]
        );
    }

    #[test]
    fn scan_sees_nothing_with_radio_off() {
        let provider = SimulatedProvider::new()
            .with_network("Home", "[ESS]")
            .with_radio_enabled(false);
        assert!(provider.scan().unwrap().is_empty());
    }

    #[test]
    fn enable_with_radio_off_is_rejected() {
        let provider = SimulatedProvider::new().with_radio_enabled(false);
        let id = provider.save_profile("Home");
        assert_eq!(
            provider.enable_network(id, true),
            Err(ProviderError::RadioDisabled)
        );
    }

    #[test]
    fn unknown_ids_are_rejected() {
        let provider = SimulatedProvider::new();
        let id = NetworkId::new(7);
        let unknown = Err(ProviderError::UnknownNetwork { id });
        assert_eq!(provider.enable_network(id, true), unknown);
        assert_eq!(provider.disable_network(id), unknown);
        assert_eq!(provider.remove_network(id), unknown);
    }

    #[test]
    fn failed_remove_keeps_profile() {
        let provider = SimulatedProvider::new();
        let id = provider.save_profile("Home");
        provider.set_faults(Faults {
            fail_remove: true,
            ..Faults::default()
        });
        assert!(!provider.remove_network(id).unwrap());
        assert_eq!(provider.saved_ssids(), vec!["Home".to_string()]);
    }

    #[test]
    fn update_replaces_stored_profile() {
        let provider = SimulatedProvider::new();
        let id = provider.save_profile("Home");
        let mut config = wpa_config("Home");
        config.network_id = Some(id);

        assert_eq!(provider.update_configuration(&config).unwrap(), id);
        let xml = provider.profile_xml(id).unwrap();
        assert!(xml.contains("<keyManagement>WPA-PSK</keyManagement>"));
    }

    #[test]
    fn save_writes_config_store() {
        let provider = SimulatedProvider::new();
        provider.save_profile("Home");
        assert!(provider.save_configuration().unwrap());
        let store = provider.persisted_store().unwrap();
        assert!(store.contains(r#"<profile ssid="Home" networkId="0"/>"#));
    }

    #[test]
    fn radio_off_drops_association() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let provider = SimulatedProvider::new().with_events(tx);
        let id = provider.associate("Home");

        assert!(provider.set_radio_enabled(false).unwrap());
        assert_eq!(provider.association(), None);
        assert!(!provider.is_radio_enabled().unwrap());

        let events: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(
            events,
            vec![
                ProviderEvent::RadioState(RadioState::Disabling),
                ProviderEvent::AssociationChanged {
                    connected: false,
                    ssid: "Home".to_string(),
                    network_id: id,
                },
                ProviderEvent::RadioState(RadioState::Disabled),
            ]
        );
    }
}

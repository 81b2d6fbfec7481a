use crate::config::CoordinatorOptions;
use crate::error::{ConnectError, ProviderResult};
use crate::wifi::listener::{ConnectListener, EnabledListener, ListenerEvent};
use crate::wifi::profile::NetworkConfig;
use crate::wifi::provider::NetworkProvider;
use crate::wifi::scanning::{saved_network_id, scan_networks};
use crate::wifi::types::{
    ConnectionState, NetworkCredential, NetworkId, NetworkIdentity, ProviderEvent, RadioState,
    ScanResult, SecurityMode,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Bookkeeping for the attempt in flight
#[derive(Debug, Default)]
struct Attempt {
    state: ConnectionState,
    /// Bumped on every new attempt so a stale deadline can't expire a newer one
    generation: u64,
    deadline: Option<Instant>,
    last_failure: Option<ConnectError>,
    /// Notifications not yet handed to listeners, in state-transition order
    outbox: VecDeque<ListenerEvent>,
    dispatching: bool,
}

impl Attempt {
    fn begin(&mut self, ssid: &str) {
        self.generation += 1;
        self.state = ConnectionState::Connecting(ssid.to_string());
        self.deadline = None;
    }

    fn settle(&mut self, state: ConnectionState) {
        self.state = state;
        self.deadline = None;
    }

    fn succeed(&mut self, state: ConnectionState) {
        self.settle(state);
        self.outbox.push_back(ListenerEvent::Success);
        self.outbox.push_back(ListenerEvent::Finish);
    }

    fn fail(&mut self, state: ConnectionState, reason: ConnectError) {
        warn!("Connection attempt failed: {reason}");
        self.settle(state);
        self.last_failure = Some(reason);
        self.outbox.push_back(ListenerEvent::Failure);
        self.outbox.push_back(ListenerEvent::Finish);
    }
}

/// Drives connection attempts against a [`NetworkProvider`].
///
/// Synchronous calls resolve the early paths (invalid config, already
/// connected, teardown or activation rejected). A successful activation is
/// confirmed later by an association event consumed in [`run`](Self::run),
/// or failed by the connect timeout.
///
/// Attempts and provider events are serialized by one gate. State changes
/// queue their listener notifications; the queue is drained in order once
/// every lock is released, so listeners may read state or start a new attempt.
pub struct ConnectionCoordinator<P> {
    provider: P,
    connect_listener: Option<Arc<dyn ConnectListener>>,
    enabled_listener: Option<Arc<dyn EnabledListener>>,
    options: CoordinatorOptions,
    gate: Mutex<()>,
    attempt: Mutex<Attempt>,
    wake: Notify,
}

impl<P: NetworkProvider> ConnectionCoordinator<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            connect_listener: None,
            enabled_listener: None,
            options: CoordinatorOptions::default(),
            gate: Mutex::new(()),
            attempt: Mutex::new(Attempt::default()),
            wake: Notify::new(),
        }
    }

    pub fn with_connect_listener(mut self, listener: Arc<dyn ConnectListener>) -> Self {
        self.connect_listener = Some(listener);
        self
    }

    pub fn with_enabled_listener(mut self, listener: Arc<dyn EnabledListener>) -> Self {
        self.enabled_listener = Some(listener);
        self
    }

    pub fn with_options(mut self, options: CoordinatorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn state(&self) -> ConnectionState {
        self.lock().state.clone()
    }

    /// Reason the most recent failed attempt failed
    pub fn last_failure(&self) -> Option<ConnectError> {
        self.lock().last_failure.clone()
    }

    /// Save (or refresh) the configuration for `identity` and connect to it
    pub fn request_connection(
        &self,
        identity: &NetworkIdentity,
        credential: Option<&NetworkCredential>,
    ) -> bool {
        info!(
            "Connecting to {} ({})",
            identity.ssid(),
            identity.security()
        );
        let gate = self.serialize();
        self.lock().begin(identity.ssid());

        let network_id = self.store_configuration(identity, credential);
        let accepted = self.run_attempt(identity, network_id);
        drop(gate);
        self.dispatch();
        accepted
    }

    /// Connect to an already saved configuration
    pub fn request_connection_by_id(
        &self,
        identity: &NetworkIdentity,
        network_id: NetworkId,
    ) -> bool {
        let gate = self.serialize();
        self.lock().begin(identity.ssid());

        let accepted = self.run_attempt(identity, network_id);
        drop(gate);
        self.dispatch();
        accepted
    }

    /// Disable `network_id`, then drop the current association
    pub fn disconnect(&self, network_id: NetworkId) -> bool {
        let disabled = self.succeeded("disable_network", self.provider.disable_network(network_id));
        let disconnected = self.succeeded("disconnect", self.provider.disconnect());
        disabled && disconnected
    }

    /// Disable, remove and persist removal of a saved configuration
    pub fn delete_configuration(&self, network_id: NetworkId) -> bool {
        let disabled = self.succeeded("disable_network", self.provider.disable_network(network_id));
        let removed = self.succeeded("remove_network", self.provider.remove_network(network_id));
        let saved = self.succeeded("save_configuration", self.provider.save_configuration());
        info!(
            "Deleted configuration {network_id}: disabled={disabled} removed={removed} saved={saved}"
        );
        disabled && removed && saved
    }

    /// Turn the radio on if it is off
    pub fn open_radio(&self) -> bool {
        self.switch_radio(true)
    }

    /// Turn the radio off if it is on
    pub fn close_radio(&self) -> bool {
        self.switch_radio(false)
    }

    pub fn is_radio_enabled(&self) -> bool {
        self.succeeded("is_radio_enabled", self.provider.is_radio_enabled())
    }

    pub fn is_connected(&self) -> bool {
        match self.provider.current_connection() {
            Ok(association) => association.is_some(),
            Err(err) => {
                warn!("current_connection failed: {err}");
                false
            }
        }
    }

    /// Scan and return the networks in range; empty if the provider faults
    pub fn scan(&self) -> Vec<ScanResult> {
        scan_networks(&self.provider).unwrap_or_else(|err| {
            warn!("scan failed: {err}");
            Vec::new()
        })
    }

    pub fn security_mode(&self, scan_result: &ScanResult) -> SecurityMode {
        scan_result.security_mode()
    }

    /// Saved configuration id for a scanned network, or the invalid id
    pub fn network_id_for(&self, scan_result: &ScanResult) -> NetworkId {
        match saved_network_id(&self.provider, &scan_result.ssid) {
            Ok(id) => id.unwrap_or(NetworkId::INVALID),
            Err(err) => {
                warn!("list_configurations failed: {err}");
                NetworkId::INVALID
            }
        }
    }

    /// Apply one provider event
    pub fn handle_event(&self, event: &ProviderEvent) {
        let gate = self.serialize();
        match event {
            ProviderEvent::RadioState(radio) => self.handle_radio_state(*radio),
            ProviderEvent::AssociationChanged {
                connected: true,
                ssid,
                ..
            } => {
                let mut attempt = self.lock();
                if attempt.state.connecting_ssid() == Some(ssid.as_str()) {
                    info!("Connected to {ssid}");
                    attempt.succeed(ConnectionState::Connected(ssid.clone()));
                } else {
                    debug!("Ignoring association with {ssid}");
                }
            }
            ProviderEvent::AssociationChanged {
                connected: false,
                ssid,
                ..
            } => {
                let mut attempt = self.lock();
                if attempt.state == ConnectionState::Connected(ssid.clone()) {
                    info!("Disconnected from {ssid}");
                    attempt.settle(ConnectionState::Idle);
                }
            }
        }
        drop(gate);
        self.dispatch();
    }

    /// Consume provider events until the channel closes, failing any
    /// activated attempt whose association doesn't arrive within the
    /// connect timeout.
    pub async fn run(&self, mut events: UnboundedReceiver<ProviderEvent>) {
        loop {
            let pending = self.pending_deadline();
            tokio::select! {
                biased;

                event = events.recv() => match event {
                    Some(event) => self.handle_event(&event),
                    None => break,
                },
                () = self.wake.notified() => {}
                () = sleep_until(pending.map(|(_, deadline)| deadline)) => {
                    if let Some((generation, _)) = pending {
                        self.expire_attempt(generation);
                    }
                }
            }
        }
        debug!("Provider event channel closed");
    }

    fn store_configuration(
        &self,
        identity: &NetworkIdentity,
        credential: Option<&NetworkCredential>,
    ) -> NetworkId {
        let mut config = match NetworkConfig::build(identity, credential) {
            Ok(config) => config,
            Err(err) => {
                warn!("{err}");
                return NetworkId::INVALID;
            }
        };

        let stored = match saved_network_id(&self.provider, identity.ssid()) {
            Ok(Some(existing)) => {
                debug!("Updating saved configuration {existing} for {}", identity.ssid());
                config.network_id = Some(existing);
                self.provider.update_configuration(&config)
            }
            Ok(None) => {
                debug!("Adding configuration for {}", identity.ssid());
                self.provider.add_configuration(&config)
            }
            Err(err) => Err(err),
        };

        stored.unwrap_or_else(|err| {
            warn!("Storing configuration for {} failed: {err}", identity.ssid());
            NetworkId::INVALID
        })
    }

    /// Guards and activation for an attempt already marked `Connecting`.
    /// Caller holds the gate.
    fn run_attempt(&self, identity: &NetworkIdentity, network_id: NetworkId) -> bool {
        let ssid = identity.ssid();
        self.queue(ListenerEvent::Start(ssid.to_string()));

        if !network_id.is_valid() {
            let reason = ConnectError::InvalidConfig {
                ssid: ssid.to_string(),
            };
            self.lock().fail(ConnectionState::Idle, reason);
            return false;
        }

        let current = self.provider.current_connection().unwrap_or_else(|err| {
            warn!("current_connection failed: {err}");
            None
        });
        if let Some(current) = current {
            if current.ssid == ssid {
                info!("Already connected to {ssid}");
                self.lock().succeed(ConnectionState::Idle);
                return true;
            }

            let released = self.disconnect(current.network_id);
            info!(
                "Disconnect from {}: {}",
                current.ssid,
                if released { "ok" } else { "failed" }
            );
            if !released {
                let reason = ConnectError::DisconnectFailed { ssid: current.ssid };
                self.lock().fail(ConnectionState::Idle, reason);
                return false;
            }
        }

        if !self.succeeded("enable_network", self.provider.enable_network(network_id, true)) {
            let reason = ConnectError::ActivationFailed {
                ssid: ssid.to_string(),
            };
            self.lock().fail(ConnectionState::Idle, reason);
            return false;
        }

        debug!("Enabled {ssid} ({network_id}), waiting for association");
        self.lock().deadline = Some(Instant::now() + self.options.connect_timeout);
        self.wake.notify_one();
        true
    }

    fn expire_attempt(&self, generation: u64) {
        let gate = self.serialize();
        {
            let mut attempt = self.lock();
            let expired = attempt.generation == generation
                && attempt
                    .deadline
                    .is_some_and(|deadline| deadline <= Instant::now());
            if let Some(ssid) = attempt.state.connecting_ssid().filter(|_| expired) {
                let reason = ConnectError::TimedOut {
                    ssid: ssid.to_string(),
                    timeout: self.options.connect_timeout,
                };
                attempt.fail(ConnectionState::Failed, reason);
            }
        }
        drop(gate);
        self.dispatch();
    }

    fn pending_deadline(&self) -> Option<(u64, Instant)> {
        let attempt = self.lock();
        attempt.deadline.map(|deadline| (attempt.generation, deadline))
    }

    fn handle_radio_state(&self, radio: RadioState) {
        info!("Radio state: {radio:?}");
        if let Some(enabled) = radio.settled() {
            self.queue(ListenerEvent::RadioEnabled(enabled));
        }
    }

    fn switch_radio(&self, enabled: bool) -> bool {
        match self.provider.is_radio_enabled() {
            Ok(current) if current == enabled => false,
            Ok(_) => self.succeeded("set_radio_enabled", self.provider.set_radio_enabled(enabled)),
            Err(err) => {
                warn!("is_radio_enabled failed: {err}");
                false
            }
        }
    }

    fn succeeded(&self, operation: &str, result: ProviderResult<bool>) -> bool {
        result.unwrap_or_else(|err| {
            warn!("{operation} failed: {err}");
            false
        })
    }

    fn queue(&self, event: ListenerEvent) {
        self.lock().outbox.push_back(event);
    }

    /// Hand queued notifications to listeners with no lock held.
    ///
    /// Only one caller drains at a time; anything queued meanwhile, including
    /// by a listener callback, is picked up by the drain already running.
    fn dispatch(&self) {
        {
            let mut attempt = self.lock();
            if attempt.dispatching {
                return;
            }
            attempt.dispatching = true;
        }
        loop {
            let next = {
                let mut attempt = self.lock();
                let next = attempt.outbox.pop_front();
                if next.is_none() {
                    attempt.dispatching = false;
                }
                next
            };
            match next {
                Some(event) => self.deliver(event),
                None => return,
            }
        }
    }

    fn deliver(&self, event: ListenerEvent) {
        if let ListenerEvent::RadioEnabled(enabled) = event {
            if let Some(listener) = &self.enabled_listener {
                listener.on_changed(enabled);
            }
            return;
        }
        let Some(listener) = &self.connect_listener else {
            return;
        };
        match event {
            ListenerEvent::Start(ssid) => listener.on_start(&ssid),
            ListenerEvent::Success => listener.on_success(),
            ListenerEvent::Failure => listener.on_failure(),
            ListenerEvent::Finish => listener.on_finish(),
            ListenerEvent::RadioEnabled(_) => {}
        }
    }

    fn serialize(&self) -> MutexGuard<'_, ()> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> MutexGuard<'_, Attempt> {
        self.attempt.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

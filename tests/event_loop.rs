use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use wifiman::{
    ConnectError, ConnectionCoordinator, ConnectionState, CoordinatorOptions, NetworkIdentity,
    SecurityMode,
    wifi::{ChannelListener, Faults, ListenerEvent, SimulatedProvider},
};

type Coordinator = ConnectionCoordinator<Arc<SimulatedProvider>>;

struct Session {
    coordinator: Arc<Coordinator>,
    provider: Arc<SimulatedProvider>,
    notifications: mpsc::UnboundedReceiver<ListenerEvent>,
    event_loop: tokio::task::JoinHandle<()>,
}

impl Session {
    fn start(provider: SimulatedProvider, timeout: Duration) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (listener_tx, notifications) = mpsc::unbounded_channel();
        let provider = Arc::new(provider.with_events(event_tx));
        let listener = Arc::new(ChannelListener::new(listener_tx));
        let coordinator = Arc::new(
            ConnectionCoordinator::new(Arc::clone(&provider))
                .with_connect_listener(listener.clone())
                .with_enabled_listener(listener)
                .with_options(CoordinatorOptions::default().with_connect_timeout(timeout)),
        );

        let runner = Arc::clone(&coordinator);
        let event_loop = tokio::spawn(async move { runner.run(event_rx).await });

        Self {
            coordinator,
            provider,
            notifications,
            event_loop,
        }
    }

    /// Collect notifications up to and including the next `Finish`
    async fn until_finish(&mut self) -> Vec<ListenerEvent> {
        let mut seen = Vec::new();
        while let Some(event) = self.notifications.recv().await {
            let done = event == ListenerEvent::Finish;
            seen.push(event);
            if done {
                break;
            }
        }
        seen
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.event_loop.abort();
    }
}

fn completed(ssid: &str, outcome: ListenerEvent) -> Vec<ListenerEvent> {
    vec![
        ListenerEvent::Start(ssid.to_string()),
        outcome,
        ListenerEvent::Finish,
    ]
}

#[tokio::test(start_paused = true)]
async fn association_event_completes_attempt() {
    let mut session = Session::start(
        SimulatedProvider::new().with_network("Home", "[WPA2-PSK-CCMP]"),
        Duration::from_secs(60),
    );
    let identity = NetworkIdentity::new("Home", SecurityMode::Wpa);

    assert!(
        session
            .coordinator
            .request_connection(&identity, Some(&"password1".into()))
    );
    assert_eq!(
        session.until_finish().await,
        completed("Home", ListenerEvent::Success)
    );
    assert_eq!(
        session.coordinator.state(),
        ConnectionState::Connected("Home".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn missing_association_times_out() {
    let mut session = Session::start(
        SimulatedProvider::new().with_network("Home", "[ESS]"),
        Duration::from_secs(30),
    );
    session.provider.set_faults(Faults {
        withhold_association: true,
        ..Faults::default()
    });

    let started = tokio::time::Instant::now();
    assert!(
        session
            .coordinator
            .request_connection(&NetworkIdentity::open("Home"), None)
    );
    assert_eq!(
        session.until_finish().await,
        completed("Home", ListenerEvent::Failure)
    );
    assert!(started.elapsed() >= Duration::from_secs(30));
    assert_eq!(session.coordinator.state(), ConnectionState::Failed);
    assert_eq!(
        session.coordinator.last_failure(),
        Some(ConnectError::TimedOut {
            ssid: "Home".to_string(),
            timeout: Duration::from_secs(30),
        })
    );
}

#[tokio::test(start_paused = true)]
async fn newer_attempt_is_not_expired_by_older_deadline() {
    let mut session = Session::start(
        SimulatedProvider::new()
            .with_network("Slow", "[ESS]")
            .with_network("Fast", "[ESS]"),
        Duration::from_secs(30),
    );
    session.provider.set_faults(Faults {
        withhold_association: true,
        ..Faults::default()
    });
    assert!(
        session
            .coordinator
            .request_connection(&NetworkIdentity::open("Slow"), None)
    );
    assert_eq!(
        session.notifications.recv().await,
        Some(ListenerEvent::Start("Slow".to_string()))
    );

    tokio::time::sleep(Duration::from_secs(20)).await;
    session.provider.set_faults(Faults::default());
    assert!(
        session
            .coordinator
            .request_connection(&NetworkIdentity::open("Fast"), None)
    );

    assert_eq!(
        session.until_finish().await,
        completed("Fast", ListenerEvent::Success)
    );

    // Well past the first attempt's deadline: nothing else fires
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(session.notifications.try_recv().is_err());
    assert_eq!(
        session.coordinator.state(),
        ConnectionState::Connected("Fast".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn radio_toggle_notifies_enabled_listener() {
    let mut session = Session::start(SimulatedProvider::new(), Duration::from_secs(60));

    assert!(session.coordinator.close_radio());
    assert_eq!(
        session.notifications.recv().await,
        Some(ListenerEvent::RadioEnabled(false))
    );
    assert!(!session.coordinator.is_radio_enabled());

    assert!(session.coordinator.open_radio());
    assert_eq!(
        session.notifications.recv().await,
        Some(ListenerEvent::RadioEnabled(true))
    );
}

#[tokio::test]
async fn loop_exits_when_event_channel_closes() {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let coordinator = ConnectionCoordinator::new(SimulatedProvider::new());
    drop(event_tx);
    coordinator.run(event_rx).await;
    assert_eq!(coordinator.state(), ConnectionState::Idle);
}

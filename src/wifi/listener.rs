use tokio::sync::mpsc::UnboundedSender;

/// Lifecycle notifications for one connection attempt.
///
/// Every attempt gets `on_start`, then exactly one of `on_success` or
/// `on_failure`, then `on_finish`. Callbacks run in order with no coordinator
/// lock held: the state already reflects the outcome, and a callback may start
/// another attempt, whose notifications follow once it returns.
pub trait ConnectListener: Send + Sync {
    fn on_start(&self, ssid: &str);
    fn on_success(&self);
    fn on_failure(&self);
    fn on_finish(&self);
}

/// Radio on/off notifications
pub trait EnabledListener: Send + Sync {
    fn on_changed(&self, enabled: bool);
}

/// Notification forwarded by a [`ChannelListener`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerEvent {
    Start(String),
    Success,
    Failure,
    Finish,
    RadioEnabled(bool),
}

/// Listener that turns callbacks into messages on a channel
#[derive(Debug, Clone)]
pub struct ChannelListener {
    sender: UnboundedSender<ListenerEvent>,
}

impl ChannelListener {
    pub fn new(sender: UnboundedSender<ListenerEvent>) -> Self {
        Self { sender }
    }

    fn forward(&self, event: ListenerEvent) {
        // The receiver going away just means nobody is watching anymore
        let _ = self.sender.send(event);
    }
}

impl ConnectListener for ChannelListener {
    fn on_start(&self, ssid: &str) {
        self.forward(ListenerEvent::Start(ssid.to_string()));
    }

    fn on_success(&self) {
        self.forward(ListenerEvent::Success);
    }

    fn on_failure(&self) {
        self.forward(ListenerEvent::Failure);
    }

    fn on_finish(&self) {
        self.forward(ListenerEvent::Finish);
    }
}

impl EnabledListener for ChannelListener {
    fn on_changed(&self, enabled: bool) {
        self.forward(ListenerEvent::RadioEnabled(enabled));
    }
}

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::watch;

use super::protocol::{CoreMessage, Envelope, StateData};

/// A popup the Core asked the shell to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Popup {
    pub id: String,
    pub title: String,
    pub content: String,
}

/// A status bar entry pushed by an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusBarItem {
    pub id: String,
    pub label: String,
}

/// Everything a subscriber can receive from the client.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// The channel became ready. Emitted once per client.
    Connected,
    ShowPopup(Popup),
    StateUpdated(StateData),
    ShowStatusBarItem(StatusBarItem),
    HideStatusBarItem { id: String },
}

/// Subscription key, one per [`ClientEvent`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connected,
    ShowPopup,
    StateUpdated,
    ShowStatusBarItem,
    HideStatusBarItem,
}

impl ClientEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ClientEvent::Connected => EventKind::Connected,
            ClientEvent::ShowPopup(_) => EventKind::ShowPopup,
            ClientEvent::StateUpdated(_) => EventKind::StateUpdated,
            ClientEvent::ShowStatusBarItem(_) => EventKind::ShowStatusBarItem,
            ClientEvent::HideStatusBarItem { .. } => EventKind::HideStatusBarItem,
        }
    }
}

impl From<CoreMessage> for ClientEvent {
    fn from(message: CoreMessage) -> Self {
        match message {
            CoreMessage::ShowPopup {
                popup_id,
                title,
                content,
            } => ClientEvent::ShowPopup(Popup {
                id: popup_id,
                title,
                content,
            }),
            CoreMessage::StateUpdated { state_data } => ClientEvent::StateUpdated(state_data),
            CoreMessage::ShowStatusBarItem {
                statusbar_item_id,
                label,
            } => ClientEvent::ShowStatusBarItem(StatusBarItem {
                id: statusbar_item_id,
                label,
            }),
            CoreMessage::HideStatusBarItem { statusbar_item_id } => {
                ClientEvent::HideStatusBarItem {
                    id: statusbar_item_id,
                }
            }
        }
    }
}

type Handler = Arc<dyn Fn(&ClientEvent) + Send + Sync>;

/// Dispatch table from event kind to registered handlers.
///
/// Shared between the client handle and the strategy's inbound task, which may
/// run on another thread (host bridges deliver from their own threads).
pub struct EventHub {
    handlers: Mutex<HashMap<EventKind, Vec<Handler>>>,
    connected: AtomicBool,
    ready: watch::Sender<bool>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self {
            handlers: Mutex::new(HashMap::new()),
            connected: AtomicBool::new(false),
            ready: watch::Sender::new(false),
        }
    }
}

impl EventHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register `handler` for every event of `kind`.
    pub fn on(&self, kind: EventKind, handler: impl Fn(&ClientEvent) + Send + Sync + 'static) {
        self.handlers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(kind)
            .or_default()
            .push(Arc::new(handler));
    }

    /// Deliver `event` to the handlers registered for its kind.
    ///
    /// Handlers run outside the table lock, so they may register more handlers.
    pub fn emit(&self, event: ClientEvent) {
        let handlers: Vec<Handler> = self
            .handlers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&event.kind())
            .cloned()
            .unwrap_or_default();
        tracing::trace!(kind = ?event.kind(), handlers = handlers.len(), "dispatching event");
        for handler in handlers {
            handler(&event);
        }
    }

    /// Mark the channel ready and emit [`ClientEvent::Connected`].
    ///
    /// Only the first call has any effect; returns whether it was that call.
    pub fn emit_connected(&self) -> bool {
        if self.connected.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.ready.send_replace(true);
        self.emit(ClientEvent::Connected);
        true
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Watch that flips to `true` once the channel is ready.
    pub fn ready(&self) -> watch::Receiver<bool> {
        self.ready.subscribe()
    }

    /// Decode a text frame from the push socket and dispatch it.
    pub fn dispatch_text(&self, text: &str) {
        match serde_json::from_str::<Envelope>(text) {
            Ok(envelope) => self.dispatch_envelope(envelope),
            Err(e) => tracing::warn!(error = %e, "dropping undecodable push frame"),
        }
    }

    /// Decode a host channel payload and dispatch it.
    pub fn dispatch_value(&self, payload: Value) {
        match serde_json::from_value::<Envelope>(payload) {
            Ok(envelope) => self.dispatch_envelope(envelope),
            Err(e) => tracing::warn!(error = %e, "dropping undecodable host message"),
        }
    }

    fn dispatch_envelope(&self, envelope: Envelope) {
        tracing::debug!(
            state_id = envelope.state_id,
            trigger = %envelope.trigger,
            "push message received"
        );
        self.emit(envelope.message.into());
    }
}

//! Embedded strategy: requests go through the host's invoke bridge and push
//! messages arrive on a single named host channel.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use serde_json::Value;

use super::events::EventHub;
use super::protocol::Call;
use crate::error::ClientError;

/// Host channel carrying push envelopes to the shell.
pub const INBOUND_CHANNEL: &str = "to_webview";
/// Host channel carrying shell signals to the Core.
pub const OUTBOUND_CHANNEL: &str = "to_core";
/// The bridge exists as soon as the module loads; `Connected` is deferred
/// only so subscribers registered right after construction still see it.
pub const CONNECT_DELAY: Duration = Duration::from_millis(1);

/// Callback registered on a host channel.
pub type HostListener = Box<dyn Fn(Value) + Send + Sync>;

/// Native bridge offered by an embedding host.
pub trait HostBridge: Send + Sync {
    /// Run host command `command` with named `args`. A rejection carries the
    /// host's error message.
    fn invoke(&self, command: &str, args: Value) -> BoxFuture<'static, Result<Value, String>>;

    /// Subscribe to messages on `channel`.
    fn listen(&self, channel: &str, listener: HostListener);

    /// Fire-and-forget message on `channel`.
    fn emit(&self, channel: &str, payload: String);
}

pub struct EmbeddedTransport {
    host: Arc<dyn HostBridge>,
}

impl EmbeddedTransport {
    /// Subscribe to the host channel and schedule the `Connected` event.
    ///
    /// Must be called inside a tokio runtime.
    pub fn attach(host: Arc<dyn HostBridge>, hub: Arc<EventHub>) -> Self {
        let inbound = hub.clone();
        host.listen(
            INBOUND_CHANNEL,
            Box::new(move |payload| inbound.dispatch_value(payload)),
        );
        tokio::spawn(async move {
            tokio::time::sleep(CONNECT_DELAY).await;
            hub.emit_connected();
        });
        Self { host }
    }

    pub async fn call(&self, call: &Call) -> Result<Value, ClientError> {
        tracing::debug!(command = call.method, "host invoke");
        self.host
            .invoke(call.method, call.named())
            .await
            .map_err(ClientError::Host)
    }

    pub fn signal(&self, payload: String) {
        self.host.emit(OUTBOUND_CHANNEL, payload);
    }
}

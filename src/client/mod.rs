//! Client for the Core process.
//!
//! One request/event contract over two interchangeable transports, picked once
//! at construction: a network transport (JSON-RPC + WebSocket) or an embedded
//! host bridge. Every request carries the session id and token bound here.

pub mod embedded;
pub mod events;
pub mod network;
pub mod protocol;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::error::ClientError;
use embedded::{EmbeddedTransport, HostBridge};
use events::{ClientEvent, EventHub, EventKind};
use network::NetworkTransport;
use protocol::{
    decode_core_response, listen_to_state_signal, Call, DirItemInfo, ExtensionInfo, FileInfo,
    Session, StateData,
};

/// Addresses of the network transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub http_uri: String,
    pub ws_uri: String,
}

/// Optional deadlines. `None` waits forever.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timeouts {
    pub request: Option<Duration>,
    pub connect: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub session: Session,
    pub endpoints: Endpoints,
    pub timeouts: Timeouts,
}

/// Which transport a client was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Network,
    Embedded,
}

enum Transport {
    Network(NetworkTransport),
    Embedded(EmbeddedTransport),
}

struct Inner {
    session: Session,
    timeouts: Timeouts,
    transport: Transport,
    hub: Arc<EventHub>,
}

/// Cheap-to-clone handle to the Core.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

async fn with_deadline<T>(
    deadline: Option<Duration>,
    what: &'static str,
    fut: impl Future<Output = Result<T, ClientError>>,
) -> Result<T, ClientError> {
    match deadline {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| ClientError::Timeout(what))?,
        None => fut.await,
    }
}

impl Client {
    /// Pick the embedded transport when the host offers a bridge, the network
    /// transport otherwise.
    pub fn detect(settings: ClientSettings, host: Option<Arc<dyn HostBridge>>) -> Self {
        match host {
            Some(host) => Self::embedded(settings.session, settings.timeouts, host),
            None => Self::network(settings),
        }
    }

    pub fn network(settings: ClientSettings) -> Self {
        let hub = EventHub::new();
        let transport = NetworkTransport::connect(
            settings.endpoints.http_uri,
            settings.endpoints.ws_uri,
            hub.clone(),
        );
        Self::build(
            settings.session,
            settings.timeouts,
            Transport::Network(transport),
            hub,
        )
    }

    pub fn embedded(session: Session, timeouts: Timeouts, host: Arc<dyn HostBridge>) -> Self {
        let hub = EventHub::new();
        let transport = EmbeddedTransport::attach(host, hub.clone());
        Self::build(session, timeouts, Transport::Embedded(transport), hub)
    }

    fn build(session: Session, timeouts: Timeouts, transport: Transport, hub: Arc<EventHub>) -> Self {
        let client = Self {
            inner: Arc::new(Inner {
                session,
                timeouts,
                transport,
                hub,
            }),
        };
        tracing::info!(
            strategy = ?client.strategy(),
            state_id = client.inner.session.state_id,
            "core client created"
        );
        client
    }

    pub fn strategy(&self) -> Strategy {
        match self.inner.transport {
            Transport::Network(_) => Strategy::Network,
            Transport::Embedded(_) => Strategy::Embedded,
        }
    }

    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    async fn request(&self, call: Call) -> Result<Value, ClientError> {
        let fut = async {
            match &self.inner.transport {
                Transport::Network(network) => network.call(&call).await,
                Transport::Embedded(embedded) => embedded.call(&call).await,
            }
        };
        with_deadline(self.inner.timeouts.request, call.method, fut).await
    }

    /// Register `handler` for every event of `kind`.
    pub fn on(&self, kind: EventKind, handler: impl Fn(&ClientEvent) + Send + Sync + 'static) {
        self.inner.hub.on(kind, handler);
    }

    /// Resolve once the channel is ready.
    ///
    /// Immediate for the embedded transport. For the network transport this
    /// waits for the socket handshake, forever unless a connect timeout is set.
    pub async fn when_connected(&self) -> Result<(), ClientError> {
        if let Transport::Embedded(_) = self.inner.transport {
            return Ok(());
        }
        let mut ready = self.inner.hub.ready();
        let wait = async move {
            ready
                .wait_for(|connected| *connected)
                .await
                .map(|_| ())
                .map_err(|_| ClientError::Closed)
        };
        with_deadline(self.inner.timeouts.connect, "connection", wait).await
    }

    /// Ask the Core to push state updates for this session.
    pub fn notify_listen_to_state(&self) -> Result<(), ClientError> {
        let signal = listen_to_state_signal(self.inner.session.state_id)?;
        match &self.inner.transport {
            Transport::Network(network) => network.signal(signal),
            Transport::Embedded(embedded) => {
                embedded.signal(signal);
                Ok(())
            }
        }
    }

    /// Fetch this session's persisted state. Any failure is a hard error.
    pub async fn get_session_state(&self) -> Result<StateData, ClientError> {
        let value = self.request(Call::get_state(&self.inner.session)).await?;
        if value.is_null() {
            return Err(ClientError::MissingState(self.inner.session.state_id));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Replace this session's persisted state.
    pub async fn set_session_state(&self, state: &StateData) -> Result<(), ClientError> {
        let value = self
            .request(Call::set_state(&self.inner.session, state)?)
            .await?;
        let rejected = value
            .as_object()
            .map_or(false, |map| map.contains_key("Err"));
        if rejected {
            return decode_core_response(value);
        }
        Ok(())
    }

    pub async fn read_file(&self, path: &str, filesystem: &str) -> Result<FileInfo, ClientError> {
        let value = self
            .request(Call::read_file(&self.inner.session, path, filesystem))
            .await?;
        decode_core_response(value)
    }

    pub async fn write_file(
        &self,
        path: &str,
        content: &str,
        filesystem: &str,
    ) -> Result<(), ClientError> {
        let value = self
            .request(Call::write_file(&self.inner.session, path, content, filesystem))
            .await?;
        decode_core_response(value)
    }

    pub async fn list_directory(
        &self,
        path: &str,
        filesystem: &str,
    ) -> Result<Vec<DirItemInfo>, ClientError> {
        let value = self
            .request(Call::list_dir(&self.inner.session, path, filesystem))
            .await?;
        decode_core_response(value)
    }

    pub async fn get_extension_info(&self, id: &str) -> Result<ExtensionInfo, ClientError> {
        let value = self
            .request(Call::get_ext_info(&self.inner.session, id))
            .await?;
        decode_core_response(value)
    }

    pub async fn list_extension_ids(&self) -> Result<Vec<String>, ClientError> {
        let value = self
            .request(Call::get_ext_list(&self.inner.session))
            .await?;
        decode_core_response(value)
    }

    /// Every extension the Core reports, in id order. An id whose info cannot
    /// be fetched is skipped; only a failed id list is an error.
    pub async fn list_extensions(&self) -> Result<Vec<ExtensionInfo>, ClientError> {
        let ids = self.list_extension_ids().await?;
        let mut extensions = Vec::with_capacity(ids.len());
        for id in ids {
            match self.get_extension_info(&id).await {
                Ok(info) => extensions.push(info),
                Err(e) => tracing::warn!(extension = %id, error = %e, "skipping extension"),
            }
        }
        Ok(extensions)
    }
}

//! Network strategy: JSON-RPC 2.0 over HTTP for requests, a WebSocket for
//! server-pushed messages.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::events::EventHub;
use super::protocol::Call;
use crate::error::ClientError;

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

/// Build the JSON-RPC request body for `call`.
pub fn rpc_request(call: &Call, id: u64) -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": call.method,
        "params": call.positional(),
        "id": id,
    })
}

/// Extract the `result` of a JSON-RPC response, turning an `error` member into
/// a hard failure.
pub fn rpc_result(body: Value) -> Result<Value, ClientError> {
    let response: RpcResponse = serde_json::from_value(body)?;
    if let Some(error) = response.error {
        return Err(ClientError::Rpc {
            code: error.code,
            message: error.message,
        });
    }
    Ok(response.result.unwrap_or(Value::Null))
}

pub struct NetworkTransport {
    http: reqwest::Client,
    http_uri: String,
    next_id: AtomicU64,
    outbound: mpsc::UnboundedSender<String>,
}

impl NetworkTransport {
    /// Start the push socket in the background and return the request side.
    ///
    /// Must be called inside a tokio runtime. Outbound signals queued before
    /// the socket opens are flushed once it does.
    pub fn connect(http_uri: String, ws_uri: String, hub: Arc<EventHub>) -> Self {
        Self::with_http_client(reqwest::Client::new(), http_uri, ws_uri, hub)
    }

    /// `connect` with a caller-built HTTP client.
    pub fn with_http_client(
        http: reqwest::Client,
        http_uri: String,
        ws_uri: String,
        hub: Arc<EventHub>,
    ) -> Self {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_socket(ws_uri, hub, outbound_rx));
        Self {
            http,
            http_uri,
            next_id: AtomicU64::new(1),
            outbound,
        }
    }

    pub async fn call(&self, call: &Call) -> Result<Value, ClientError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(method = call.method, id, "rpc call");
        let body: Value = self
            .http
            .post(&self.http_uri)
            .json(&rpc_request(call, id))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        rpc_result(body)
    }

    /// Queue a text frame for the push socket.
    pub fn signal(&self, payload: String) -> Result<(), ClientError> {
        self.outbound.send(payload).map_err(|_| ClientError::Closed)
    }
}

async fn run_socket(
    ws_uri: String,
    hub: Arc<EventHub>,
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
) {
    let stream = match connect_async(ws_uri.as_str()).await {
        Ok((stream, _)) => stream,
        Err(e) => {
            // Without a socket `when_connected` never resolves; callers that
            // care configure a connect timeout.
            tracing::error!(uri = %ws_uri, error = %e, "push socket handshake failed");
            return;
        }
    };
    tracing::info!(uri = %ws_uri, "push socket connected");
    hub.emit_connected();

    let (mut ws_tx, mut ws_rx) = stream.split();
    loop {
        tokio::select! {
            Some(payload) = outbound_rx.recv() => {
                if let Err(e) = ws_tx.send(Message::Text(payload.into())).await {
                    tracing::error!(error = %e, "push socket send failed");
                    break;
                }
            }
            frame = ws_rx.next() => match frame {
                Some(Ok(Message::Text(text))) => hub.dispatch_text(&text),
                Some(Ok(Message::Close(_))) | None => {
                    tracing::info!("push socket closed");
                    break;
                }
                Some(Err(e)) => {
                    tracing::error!(error = %e, "push socket error");
                    break;
                }
                Some(Ok(_)) => {}
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::events::{ClientEvent, EventKind};
    use crate::client::protocol::Session;
    use crate::client::{Client, Timeouts, Transport};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;
    use tokio_tungstenite::accept_async;

    /// Answer a single HTTP request with `status` and `body`. The handle
    /// yields the JSON the client posted.
    async fn serve_once(status: &'static str, body: Value) -> (String, JoinHandle<Value>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            let (head_end, content_length) = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                assert!(n > 0, "request ended early");
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&buf[..pos]).to_string();
                    assert!(head.starts_with("POST "), "unexpected request: {head}");
                    let length = head
                        .lines()
                        .filter_map(|line| line.split_once(':'))
                        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                        .map(|(_, value)| value.trim().parse::<usize>().unwrap())
                        .unwrap_or(0);
                    break (pos + 4, length);
                }
            };
            while buf.len() < head_end + content_length {
                let n = socket.read(&mut chunk).await.unwrap();
                assert!(n > 0, "body ended early");
                buf.extend_from_slice(&chunk[..n]);
            }
            let posted: Value =
                serde_json::from_slice(&buf[head_end..head_end + content_length]).unwrap();

            let payload = body.to_string();
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
                payload.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            posted
        });
        (format!("http://{addr}"), server)
    }

    fn network_client(http_uri: String) -> Client {
        let hub = EventHub::new();
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        let transport = NetworkTransport::with_http_client(
            http,
            http_uri,
            "ws://127.0.0.1:1/websockets".into(),
            hub.clone(),
        );
        Client::build(
            Session {
                state_id: 1,
                token: "tok".into(),
            },
            Timeouts {
                request: Some(Duration::from_secs(5)),
                connect: None,
            },
            Transport::Network(transport),
            hub,
        )
    }

    #[test]
    fn request_body_is_jsonrpc_with_positional_params() {
        let session = Session {
            state_id: 1,
            token: "test".into(),
        };
        let call = Call::read_file(&session, "/a.rs", "local");
        assert_eq!(
            rpc_request(&call, 7),
            json!({
                "jsonrpc": "2.0",
                "method": "read_file_by_path",
                "params": ["/a.rs", "local", 1, "test"],
                "id": 7
            })
        );
    }

    #[test]
    fn result_member_is_returned() {
        let body = json!({ "jsonrpc": "2.0", "result": { "Ok": [] }, "id": 1 });
        assert_eq!(rpc_result(body).unwrap(), json!({ "Ok": [] }));
    }

    #[test]
    fn null_result_is_null() {
        let body = json!({ "jsonrpc": "2.0", "result": null, "id": 1 });
        assert_eq!(rpc_result(body).unwrap(), Value::Null);
    }

    #[test]
    fn error_member_is_a_hard_failure() {
        let body = json!({
            "jsonrpc": "2.0",
            "error": { "code": -32602, "message": "Invalid params" },
            "id": 1
        });
        match rpc_result(body) {
            Err(ClientError::Rpc { code, message }) => {
                assert_eq!(code, -32602);
                assert_eq!(message, "Invalid params");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn socket_emits_connected_flushes_signals_and_dispatches_frames() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            let first = loop {
                match ws.next().await.unwrap().unwrap() {
                    Message::Text(text) => break text.to_string(),
                    _ => continue,
                }
            };
            let popup = json!({
                "state_id": 1,
                "trigger": "extension",
                "msg_type": "ShowPopup",
                "popup_id": "p1",
                "title": "Hi",
                "content": "there"
            });
            ws.send(Message::Text(popup.to_string().into())).await.unwrap();
            first
        });

        let hub = EventHub::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        for kind in [EventKind::Connected, EventKind::ShowPopup] {
            let tx = tx.clone();
            hub.on(kind, move |event| {
                let _ = tx.send(event.clone());
            });
        }

        let transport = NetworkTransport::connect(
            "http://127.0.0.1:1".into(),
            format!("ws://{addr}/websockets"),
            hub.clone(),
        );
        transport
            .signal(r#"{"trigger":"client","msg_type":"ListenToState","state_id":1}"#.into())
            .unwrap();

        let wait = Duration::from_secs(5);
        let first = tokio::time::timeout(wait, rx.recv()).await.unwrap().unwrap();
        assert_eq!(first, ClientEvent::Connected);
        let second = tokio::time::timeout(wait, rx.recv()).await.unwrap().unwrap();
        assert!(matches!(second, ClientEvent::ShowPopup(ref p) if p.id == "p1"));

        let sent = server.await.unwrap();
        let sent: Value = serde_json::from_str(&sent).unwrap();
        assert_eq!(sent["msg_type"], json!("ListenToState"));
    }

    #[tokio::test]
    async fn list_directory_posts_positional_params_and_decodes_ok() {
        let (uri, server) = serve_once(
            "200 OK",
            json!({
                "jsonrpc": "2.0",
                "result": { "Ok": [
                    { "path": "/p/a", "name": "a", "is_file": false },
                    { "path": "/p/b.txt", "name": "b.txt", "is_file": true }
                ] },
                "id": 1
            }),
        )
        .await;
        let client = network_client(uri);

        let items = client.list_directory("/p", "local").await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].path, "/p/a");
        assert!(items[1].is_file);

        let posted = server.await.unwrap();
        assert_eq!(posted["jsonrpc"], json!("2.0"));
        assert_eq!(posted["method"], json!("list_dir_by_path"));
        assert_eq!(posted["params"], json!(["/p", "local", 1, "tok"]));
        assert!(posted["id"].is_u64());
    }

    #[tokio::test]
    async fn core_err_payload_surfaces_as_core_error() {
        let (uri, server) = serve_once(
            "200 OK",
            json!({
                "jsonrpc": "2.0",
                "result": { "Err": { "Filesystem": "DirNotFound" } },
                "id": 1
            }),
        )
        .await;
        let client = network_client(uri);

        match client.list_directory("/missing", "local").await {
            Err(ClientError::Core(payload)) => {
                assert_eq!(payload, json!({ "Filesystem": "DirNotFound" }));
            }
            other => panic!("unexpected: {other:?}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn rpc_error_member_surfaces_as_rpc_error() {
        let (uri, server) = serve_once(
            "200 OK",
            json!({
                "jsonrpc": "2.0",
                "error": { "code": -32601, "message": "Method not found" },
                "id": 1
            }),
        )
        .await;
        let client = network_client(uri);

        match client.read_file("/a.rs", "local").await {
            Err(ClientError::Rpc { code, message }) => {
                assert_eq!(code, -32601);
                assert_eq!(message, "Method not found");
            }
            other => panic!("unexpected: {other:?}"),
        }
        let posted = server.await.unwrap();
        assert_eq!(posted["method"], json!("read_file_by_path"));
    }

    #[tokio::test]
    async fn http_error_status_is_a_transport_error() {
        let (uri, server) = serve_once("500 Internal Server Error", json!({})).await;
        let client = network_client(uri);

        let err = client.list_directory("/", "local").await.unwrap_err();
        assert!(matches!(err, ClientError::Http(_)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn failed_handshake_never_reports_connected() {
        // Bind then drop to get a port with nothing listening.
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let hub = EventHub::new();
        let _transport = NetworkTransport::connect(
            "http://127.0.0.1:1".into(),
            format!("ws://{addr}/websockets"),
            hub.clone(),
        );
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!hub.is_connected());
    }
}

use thiserror::Error;

/// Application-wide result type alias.
pub type Result<T> = std::result::Result<T, AppError>;

/// Errors raised while talking to the Core.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The HTTP request for a JSON-RPC call failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The push socket failed.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// A request or response could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The Core rejected a JSON-RPC call outright.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The embedded host rejected an invoke.
    #[error("Host error: {0}")]
    Host(String),

    /// The Core answered with an explicit `Err` payload. The payload is opaque.
    #[error("Core error: {0}")]
    Core(serde_json::Value),

    /// The Core has no state for this session id.
    #[error("No state stored for session {0}")]
    MissingState(u8),

    /// A configured deadline elapsed.
    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),

    /// The underlying channel is gone.
    #[error("Connection closed")]
    Closed,
}

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// I/O errors from the terminal or config files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Terminal initialization or rendering errors.
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// Errors from the Core client.
    #[error(transparent)]
    Client(#[from] ClientError),
}

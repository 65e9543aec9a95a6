//! Wire types shared by both transport strategies.
//!
//! Every Core operation is described once, as a [`Call`]: a method name plus
//! an ordered list of named arguments. The network strategy sends the values
//! positionally, the embedded strategy sends them as a named-argument object,
//! so both agree on ordering and naming by construction.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ClientError;

// ── Method names ─────────────────────────────────────────────────────────────

pub const GET_STATE: &str = "get_state_by_id";
pub const SET_STATE: &str = "set_state_by_id";
pub const READ_FILE: &str = "read_file_by_path";
pub const WRITE_FILE: &str = "write_file_by_path";
pub const LIST_DIR: &str = "list_dir_by_path";
pub const GET_EXT_INFO: &str = "get_ext_info_by_id";
pub const GET_EXT_LIST: &str = "get_ext_list_by_id";

// ── Payload types ────────────────────────────────────────────────────────────

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirItemInfo {
    pub path: String,
    pub name: String,
    pub is_file: bool,
}

/// How the Core interpreted a file's bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileFormat {
    Unknown,
    Binary,
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub content: String,
    pub format: FileFormat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionInfo {
    pub name: String,
    pub id: String,
}

/// Persisted session state.
///
/// Only `id` is interpreted here; every other field is carried through
/// untouched so the client never drops data it does not understand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateData {
    #[serde(default)]
    pub id: u8,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Identity attached to every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub state_id: u8,
    pub token: String,
}

// ── Calls ────────────────────────────────────────────────────────────────────

/// A single Core operation with its ordered, named arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: &'static str,
    pub params: Vec<(&'static str, Value)>,
}

impl Call {
    fn new(method: &'static str) -> Self {
        Self {
            method,
            params: Vec::new(),
        }
    }

    fn arg(mut self, name: &'static str, value: impl Into<Value>) -> Self {
        self.params.push((name, value.into()));
        self
    }

    fn session(self, session: &Session) -> Self {
        self.arg("state_id", session.state_id)
            .arg("token", session.token.clone())
    }

    pub fn get_state(session: &Session) -> Self {
        Call::new(GET_STATE).session(session)
    }

    /// The session id is injected into the state object as `id`.
    pub fn set_state(session: &Session, state: &StateData) -> Result<Self, ClientError> {
        let mut state = state.clone();
        state.id = session.state_id;
        Ok(Call::new(SET_STATE)
            .arg("state_id", session.state_id)
            .arg("state_data", serde_json::to_value(&state)?)
            .arg("token", session.token.clone()))
    }

    pub fn read_file(session: &Session, path: &str, filesystem: &str) -> Self {
        Call::new(READ_FILE)
            .arg("path", path)
            .arg("filesystem_name", filesystem)
            .session(session)
    }

    pub fn write_file(session: &Session, path: &str, content: &str, filesystem: &str) -> Self {
        Call::new(WRITE_FILE)
            .arg("path", path)
            .arg("content", content)
            .arg("filesystem_name", filesystem)
            .session(session)
    }

    pub fn list_dir(session: &Session, path: &str, filesystem: &str) -> Self {
        Call::new(LIST_DIR)
            .arg("path", path)
            .arg("filesystem_name", filesystem)
            .session(session)
    }

    pub fn get_ext_info(session: &Session, extension_id: &str) -> Self {
        Call::new(GET_EXT_INFO)
            .arg("extension_id", extension_id)
            .session(session)
    }

    pub fn get_ext_list(session: &Session) -> Self {
        Call::new(GET_EXT_LIST).session(session)
    }

    /// Argument values in order, for JSON-RPC `params`.
    pub fn positional(&self) -> Value {
        Value::Array(self.params.iter().map(|(_, v)| v.clone()).collect())
    }

    /// Arguments keyed by their camelCase names, for host invokes.
    pub fn named(&self) -> Value {
        let map: Map<String, Value> = self
            .params
            .iter()
            .map(|(name, v)| (camel_case(name), v.clone()))
            .collect();
        Value::Object(map)
    }
}

fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

// ── Results ──────────────────────────────────────────────────────────────────

/// Decode a `{ Ok?: T, Err?: any }` response.
///
/// The presence of `Ok` means success, even when its value is `null`.
/// Anything else is a failure whose payload is handed back uninterpreted.
pub fn decode_core_response<T: DeserializeOwned>(value: Value) -> Result<T, ClientError> {
    match value {
        Value::Object(mut map) => match map.remove("Ok") {
            Some(ok) => Ok(serde_json::from_value(ok)?),
            None => Err(ClientError::Core(map.remove("Err").unwrap_or(Value::Null))),
        },
        other => Err(ClientError::Core(other)),
    }
}

// ── Push messages ────────────────────────────────────────────────────────────

/// Inbound push envelope: `{ state_id, trigger, msg_type, ...payload }`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub state_id: u8,
    #[serde(default)]
    pub trigger: String,
    #[serde(flatten)]
    pub message: CoreMessage,
}

/// Push messages the Core is known to send, tagged by `msg_type`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "msg_type")]
pub enum CoreMessage {
    ShowPopup {
        popup_id: String,
        title: String,
        content: String,
    },
    #[serde(rename = "ListenToState", alias = "StateUpdated")]
    StateUpdated { state_data: StateData },
    ShowStatusBarItem {
        statusbar_item_id: String,
        label: String,
    },
    HideStatusBarItem { statusbar_item_id: String },
}

#[derive(Serialize)]
struct Signal {
    trigger: &'static str,
    msg_type: &'static str,
    state_id: u8,
}

/// The outbound request to start pushing state updates for `state_id`.
pub fn listen_to_state_signal(state_id: u8) -> Result<String, ClientError> {
    Ok(serde_json::to_string(&Signal {
        trigger: "client",
        msg_type: "ListenToState",
        state_id,
    })?)
}

//! Application configuration: TOML file loading, CLI overrides, and defaults.
//!
//! Resolution order (first found wins, values merge/override):
//! 1. CLI flags (`--config`, `--http-uri`, `--token`, etc.)
//! 2. `$EXPLORER_CONFIG` environment variable (path to config file)
//! 3. Project-local `.explorer.toml` in the current working directory
//! 4. Global `~/.config/explorer/config.toml`
//! 5. Built-in defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::client::protocol::Session;
use crate::client::{ClientSettings, Endpoints, Timeouts};

// ── Section configs ──────────────────────────────────────────────────────────

/// General application settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable mouse support.
    pub mouse: Option<bool>,
}

/// How to reach the Core.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ConnectionConfig {
    /// JSON-RPC endpoint.
    pub http_uri: Option<String>,
    /// Push socket endpoint. Derived from the token and state id when unset.
    pub ws_uri: Option<String>,
    /// Session whose state this client works on.
    pub state_id: Option<u8>,
    /// Authentication token attached to every request.
    pub token: Option<String>,
    /// Per-request deadline; unset waits forever.
    pub request_timeout_ms: Option<u64>,
    /// Deadline for the push socket handshake; unset waits forever.
    pub connect_timeout_ms: Option<u64>,
}

/// Explorer panel settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Route the explorer opens at (overridden by CLI positional arg).
    pub initial_route: Option<String>,
    /// Name of the filesystem installed in the Core.
    pub filesystem: Option<String>,
}

/// Theme configuration section.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ThemeConfig {
    /// Color scheme: "dark" or "light".
    pub scheme: Option<String>,
}

// ── Top-level config ─────────────────────────────────────────────────────────

/// Top-level application configuration.
///
/// All fields are optional so that partial configs from different sources
/// can be merged together (CLI overrides file, file overrides defaults).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub connection: ConnectionConfig,
    pub explorer: ExplorerConfig,
    pub theme: ThemeConfig,
}

// ── Default constants ────────────────────────────────────────────────────────

/// Default Core address.
pub const DEFAULT_HTTP_URI: &str = "http://localhost:50010";
/// Default session id.
pub const DEFAULT_STATE_ID: u8 = 1;
/// Default filesystem name.
pub const DEFAULT_FILESYSTEM: &str = "local";
/// Default initial route.
pub const DEFAULT_ROUTE: &str = "/";

// ── Config file locator ──────────────────────────────────────────────────────

/// Return the list of candidate config file paths in priority order.
///
/// Does NOT include the CLI `--config` path; `load` handles that separately.
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(env_path) = std::env::var("EXPLORER_CONFIG") {
        paths.push(PathBuf::from(env_path));
    }

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(".explorer.toml"));
    }

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("explorer").join("config.toml"));
    }

    paths
}

/// Try to read and parse a TOML config file. Returns `None` if the file
/// doesn't exist or can't be parsed (the parse error is logged).
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<AppConfig>(&content) {
        Ok(cfg) => {
            tracing::debug!(path = %path.display(), "loaded config file");
            Some(cfg)
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to parse config file");
            None
        }
    }
}

// ── Merge logic ──────────────────────────────────────────────────────────────

impl AppConfig {
    /// Merge `other` on top of `self`: `other`'s `Some` values win.
    pub fn merge(self, other: &AppConfig) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                mouse: other.general.mouse.or(self.general.mouse),
            },
            connection: ConnectionConfig {
                http_uri: other
                    .connection
                    .http_uri
                    .clone()
                    .or(self.connection.http_uri),
                ws_uri: other.connection.ws_uri.clone().or(self.connection.ws_uri),
                state_id: other.connection.state_id.or(self.connection.state_id),
                token: other.connection.token.clone().or(self.connection.token),
                request_timeout_ms: other
                    .connection
                    .request_timeout_ms
                    .or(self.connection.request_timeout_ms),
                connect_timeout_ms: other
                    .connection
                    .connect_timeout_ms
                    .or(self.connection.connect_timeout_ms),
            },
            explorer: ExplorerConfig {
                initial_route: other
                    .explorer
                    .initial_route
                    .clone()
                    .or(self.explorer.initial_route),
                filesystem: other
                    .explorer
                    .filesystem
                    .clone()
                    .or(self.explorer.filesystem),
            },
            theme: ThemeConfig {
                scheme: other.theme.scheme.clone().or(self.theme.scheme),
            },
        }
    }

    /// Load the final merged configuration.
    ///
    /// `cli_config_path` is an explicit config file path from `--config`.
    /// `cli_overrides` are partial overrides derived from CLI flags.
    pub fn load(cli_config_path: Option<&Path>, cli_overrides: Option<&AppConfig>) -> AppConfig {
        let mut config = AppConfig::default();

        // Walk in reverse so that highest-priority (env var) overwrites lower.
        for path in candidate_paths().iter().rev() {
            if let Some(file_cfg) = load_file(path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(cli_path) = cli_config_path {
            if let Some(file_cfg) = load_file(cli_path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(overrides) = cli_overrides {
            config = config.merge(overrides);
        }

        config
    }

    // ── Convenience getters with built-in defaults ──────────────────────────

    /// Whether mouse support is enabled.
    pub fn mouse_enabled(&self) -> bool {
        self.general.mouse.unwrap_or(true)
    }

    pub fn http_uri(&self) -> &str {
        self.connection.http_uri.as_deref().unwrap_or(DEFAULT_HTTP_URI)
    }

    pub fn state_id(&self) -> u8 {
        self.connection.state_id.unwrap_or(DEFAULT_STATE_ID)
    }

    pub fn token(&self) -> &str {
        self.connection.token.as_deref().unwrap_or("")
    }

    /// Push socket address; the Core authenticates the socket through the
    /// query string. Unless set, it lives on the same host and port as
    /// `http_uri`.
    pub fn ws_uri(&self) -> String {
        if let Some(uri) = &self.connection.ws_uri {
            return uri.clone();
        }
        push_socket_uri(self.http_uri(), self.token(), self.state_id()).unwrap_or_else(|| {
            tracing::warn!(
                http_uri = self.http_uri(),
                "unusable http_uri, push socket on default host"
            );
            push_socket_uri(DEFAULT_HTTP_URI, self.token(), self.state_id()).unwrap_or_default()
        })
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.connection
            .request_timeout_ms
            .map(Duration::from_millis)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connection
            .connect_timeout_ms
            .map(Duration::from_millis)
    }

    pub fn initial_route(&self) -> &str {
        self.explorer
            .initial_route
            .as_deref()
            .unwrap_or(DEFAULT_ROUTE)
    }

    pub fn filesystem(&self) -> &str {
        self.explorer
            .filesystem
            .as_deref()
            .unwrap_or(DEFAULT_FILESYSTEM)
    }

    /// Theme scheme: "dark" or "light".
    pub fn theme_scheme(&self) -> &str {
        self.theme.scheme.as_deref().unwrap_or("dark")
    }

    /// Everything the Core client needs.
    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            session: Session {
                state_id: self.state_id(),
                token: self.token().to_string(),
            },
            endpoints: Endpoints {
                http_uri: self.http_uri().to_string(),
                ws_uri: self.ws_uri(),
            },
            timeouts: Timeouts {
                request: self.request_timeout(),
                connect: self.connect_timeout(),
            },
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// `http(s)://host:port/...` becomes `ws(s)://host:port/websockets?token=..&state_id=..`.
fn push_socket_uri(http_uri: &str, token: &str, state_id: u8) -> Option<String> {
    let mut url = reqwest::Url::parse(http_uri).ok()?;
    let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
    url.set_scheme(scheme).ok()?;
    url.set_path("/websockets");
    url.set_fragment(None);
    url.query_pairs_mut()
        .clear()
        .append_pair("token", token)
        .append_pair("state_id", &state_id.to_string());
    Some(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_values() {
        let cfg = AppConfig::default();
        assert!(cfg.mouse_enabled());
        assert_eq!(cfg.http_uri(), "http://localhost:50010");
        assert_eq!(cfg.state_id(), 1);
        assert_eq!(cfg.token(), "");
        assert_eq!(cfg.request_timeout(), None);
        assert_eq!(cfg.connect_timeout(), None);
        assert_eq!(cfg.initial_route(), "/");
        assert_eq!(cfg.filesystem(), "local");
        assert_eq!(cfg.theme_scheme(), "dark");
    }

    #[test]
    fn test_ws_uri_derived_from_session() {
        let cfg = AppConfig {
            connection: ConnectionConfig {
                token: Some("abc".into()),
                state_id: Some(3),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            cfg.ws_uri(),
            "ws://localhost:50010/websockets?token=abc&state_id=3"
        );
    }

    #[test]
    fn test_ws_uri_follows_http_uri_and_encodes_token() {
        let cfg = AppConfig {
            connection: ConnectionConfig {
                http_uri: Some("http://core.lan:9000/rpc".into()),
                token: Some("a b&c#d".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            cfg.ws_uri(),
            "ws://core.lan:9000/websockets?token=a+b%26c%23d&state_id=1"
        );

        let secure = AppConfig {
            connection: ConnectionConfig {
                http_uri: Some("https://core.lan:9443".into()),
                token: Some("t".into()),
                state_id: Some(4),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            secure.ws_uri(),
            "wss://core.lan:9443/websockets?token=t&state_id=4"
        );
    }

    #[test]
    fn test_ws_uri_falls_back_when_http_uri_unparseable() {
        let cfg = AppConfig {
            connection: ConnectionConfig {
                http_uri: Some("not a uri".into()),
                token: Some("abc".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            cfg.ws_uri(),
            "ws://localhost:50010/websockets?token=abc&state_id=1"
        );
    }

    #[test]
    fn test_toml_parsing_full() {
        let toml = r#"
[general]
mouse = false

[connection]
http_uri = "http://core.local:9000"
ws_uri = "ws://core.local:9000/websockets"
state_id = 2
token = "secret"
request_timeout_ms = 5000
connect_timeout_ms = 2000

[explorer]
initial_route = "/home/me/project"
filesystem = "remote"

[theme]
scheme = "light"
"#;
        let cfg: AppConfig = toml::from_str(toml).expect("parse failed");
        assert!(!cfg.mouse_enabled());
        assert_eq!(cfg.http_uri(), "http://core.local:9000");
        assert_eq!(cfg.ws_uri(), "ws://core.local:9000/websockets");
        assert_eq!(cfg.state_id(), 2);
        assert_eq!(cfg.token(), "secret");
        assert_eq!(cfg.request_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(cfg.connect_timeout(), Some(Duration::from_secs(2)));
        assert_eq!(cfg.initial_route(), "/home/me/project");
        assert_eq!(cfg.filesystem(), "remote");
        assert_eq!(cfg.theme_scheme(), "light");
    }

    #[test]
    fn test_toml_parsing_partial() {
        let toml = r#"
[connection]
token = "test"
"#;
        let cfg: AppConfig = toml::from_str(toml).expect("parse failed");
        assert_eq!(cfg.token(), "test");
        assert_eq!(cfg.state_id(), 1);
        assert_eq!(cfg.filesystem(), "local");
    }

    #[test]
    fn test_toml_parsing_empty() {
        let cfg: AppConfig = toml::from_str("").expect("parse failed");
        assert_eq!(cfg.http_uri(), DEFAULT_HTTP_URI);
    }

    #[test]
    fn test_merge_overrides() {
        let base = AppConfig {
            connection: ConnectionConfig {
                token: Some("base".into()),
                state_id: Some(4),
                ..Default::default()
            },
            explorer: ExplorerConfig {
                filesystem: Some("local".into()),
                initial_route: Some("/srv".into()),
            },
            ..Default::default()
        };

        let over = AppConfig {
            connection: ConnectionConfig {
                token: Some("over".into()),
                ..Default::default()
            },
            explorer: ExplorerConfig {
                initial_route: Some("/tmp".into()),
                ..Default::default()
            },
            ..Default::default()
        };

        let merged = base.merge(&over);
        assert_eq!(merged.token(), "over"); // overridden
        assert_eq!(merged.state_id(), 4); // from base
        assert_eq!(merged.initial_route(), "/tmp"); // overridden
        assert_eq!(merged.filesystem(), "local"); // from base
    }

    #[test]
    fn test_merge_none_does_not_clear_some() {
        let base = AppConfig {
            connection: ConnectionConfig {
                request_timeout_ms: Some(100),
                ..Default::default()
            },
            general: GeneralConfig { mouse: Some(false) },
            ..Default::default()
        };
        let merged = base.merge(&AppConfig::default());
        assert_eq!(merged.request_timeout(), Some(Duration::from_millis(100)));
        assert!(!merged.mouse_enabled());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("test-config.toml");
        let mut f = std::fs::File::create(&cfg_path).expect("create");
        writeln!(
            f,
            r#"
[connection]
token = "from-file"

[explorer]
filesystem = "memory"
"#
        )
        .expect("write");

        let cfg = load_file(&cfg_path).expect("load");
        assert_eq!(cfg.token(), "from-file");
        assert_eq!(cfg.filesystem(), "memory");
        assert_eq!(cfg.initial_route(), "/");
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load_file(Path::new("/nonexistent/config.toml")).is_none());
    }

    #[test]
    fn test_load_invalid_toml_returns_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("bad.toml");
        std::fs::write(&cfg_path, "this is { not valid toml").expect("write");
        assert!(load_file(&cfg_path).is_none());
    }

    #[test]
    fn test_load_with_cli_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("config.toml");
        std::fs::write(
            &cfg_path,
            r#"
[connection]
token = "file"
state_id = 7
"#,
        )
        .expect("write");

        let cli_overrides = AppConfig {
            connection: ConnectionConfig {
                token: Some("cli".into()),
                ..Default::default()
            },
            ..Default::default()
        };

        let cfg = AppConfig::load(Some(&cfg_path), Some(&cli_overrides));
        assert_eq!(cfg.token(), "cli");
        assert_eq!(cfg.state_id(), 7);
    }

    #[test]
    fn test_client_settings_carry_session_and_timeouts() {
        let cfg = AppConfig {
            connection: ConnectionConfig {
                token: Some("t".into()),
                connect_timeout_ms: Some(250),
                ..Default::default()
            },
            ..Default::default()
        };
        let settings = cfg.client_settings();
        assert_eq!(settings.session.token, "t");
        assert_eq!(settings.session.state_id, 1);
        assert_eq!(settings.endpoints.http_uri, DEFAULT_HTTP_URI);
        assert_eq!(settings.timeouts.connect, Some(Duration::from_millis(250)));
        assert_eq!(settings.timeouts.request, None);
    }
}

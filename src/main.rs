mod logging;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc::UnboundedSender;

use project_explorer::app::{App, Command};
use project_explorer::client::events::{ClientEvent, EventKind};
use project_explorer::client::Client;
use project_explorer::config::{AppConfig, ConnectionConfig, ExplorerConfig, GeneralConfig};
use project_explorer::error;
use project_explorer::event::{Event, EventHandler};
use project_explorer::tui::{install_panic_hook, Tui};
use project_explorer::{handler, theme};

/// Browse a project served by a running editor Core.
#[derive(Parser, Debug)]
#[command(name = "explorer", version, about)]
struct Cli {
    /// Route to open (defaults to the configured initial route)
    route: Option<String>,

    /// Path to a config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Core JSON-RPC endpoint
    #[arg(long)]
    http_uri: Option<String>,

    /// Core push socket endpoint
    #[arg(long)]
    ws_uri: Option<String>,

    /// Session id
    #[arg(long)]
    state_id: Option<u8>,

    /// Authentication token
    #[arg(long)]
    token: Option<String>,

    /// Filesystem to browse
    #[arg(long)]
    filesystem: Option<String>,

    /// Disable mouse support
    #[arg(long)]
    no_mouse: bool,
}

impl Cli {
    fn overrides(&self) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                mouse: self.no_mouse.then_some(false),
            },
            connection: ConnectionConfig {
                http_uri: self.http_uri.clone(),
                ws_uri: self.ws_uri.clone(),
                state_id: self.state_id,
                token: self.token.clone(),
                ..Default::default()
            },
            explorer: ExplorerConfig {
                initial_route: self.route.clone(),
                filesystem: self.filesystem.clone(),
            },
            ..Default::default()
        }
    }
}

/// Run `command` in the background and post the answer back to the loop.
fn spawn_command(client: &Client, command: Command, tx: &UnboundedSender<Event>) {
    let client = client.clone();
    let tx = tx.clone();
    match command {
        Command::List { ticket, filesystem } => tokio::spawn(async move {
            let result = client.list_directory(&ticket.path, &filesystem).await;
            let _ = tx.send(Event::Listed { ticket, result });
        }),
        Command::Open { path, filesystem } => tokio::spawn(async move {
            let result = client.read_file(&path, &filesystem).await;
            let _ = tx.send(Event::Opened { path, result });
        }),
    };
}

/// Wait for the push channel, subscribe to state updates, then pull the
/// session state and extension list.
async fn startup(client: Client, tx: UnboundedSender<Event>) {
    if let Err(e) = client.when_connected().await {
        tracing::error!(error = %e, "core connection not established");
        let _ = tx.send(Event::SessionLoaded(Err(e)));
        return;
    }
    let _ = tx.send(Event::Core(ClientEvent::Connected));

    if let Err(e) = client.notify_listen_to_state() {
        tracing::warn!(error = %e, "could not subscribe to state updates");
    }
    let _ = tx.send(Event::SessionLoaded(client.get_session_state().await));
    let _ = tx.send(Event::ExtensionsLoaded(client.list_extensions().await));
}

#[tokio::main]
async fn main() -> error::Result<()> {
    let cli = Cli::parse();
    let _log_guard = logging::init();

    let config = AppConfig::load(cli.config.as_deref(), Some(&cli.overrides()));
    tracing::info!(
        http_uri = config.http_uri(),
        route = config.initial_route(),
        filesystem = config.filesystem(),
        "starting explorer"
    );

    let mut events = EventHandler::new(Duration::from_millis(16));
    let event_tx = events.sender();

    let client = Client::detect(config.client_settings(), None);
    for kind in [
        EventKind::ShowPopup,
        EventKind::StateUpdated,
        EventKind::ShowStatusBarItem,
        EventKind::HideStatusBarItem,
    ] {
        let tx = event_tx.clone();
        client.on(kind, move |event| {
            let _ = tx.send(Event::Core(event.clone()));
        });
    }
    tokio::spawn(startup(client.clone(), event_tx.clone()));

    install_panic_hook();
    let mut tui = Tui::new(config.mouse_enabled())?;
    let mut app = App::new(
        config.initial_route(),
        config.filesystem(),
        theme::resolve_theme(config.theme_scheme()),
    );
    app.on_item_selected(|row| {
        tracing::debug!(path = %row.path, is_file = row.is_file, "item selected");
    });
    if let Some(command) = app.load_root() {
        spawn_command(&client, command, &event_tx);
    }

    loop {
        tui.draw(&mut app)?;

        let command = match events.next().await? {
            Event::Key(key) => handler::handle_key_event(&mut app, key),
            Event::Mouse(mouse) => {
                handler::handle_mouse_event(&mut app, mouse);
                None
            }
            Event::Tick | Event::Resize(_, _) => None,
            Event::Core(event) => {
                app.handle_client_event(event);
                None
            }
            Event::Listed { ticket, result } => {
                app.handle_listed(ticket, result);
                None
            }
            Event::Opened { path, result } => {
                app.handle_opened(path, result);
                None
            }
            Event::SessionLoaded(result) => {
                app.handle_session_loaded(result);
                None
            }
            Event::ExtensionsLoaded(result) => {
                app.handle_extensions_loaded(result);
                None
            }
        };
        if let Some(command) = command {
            spawn_command(&client, command, &event_tx);
        }

        if app.should_quit {
            break;
        }
    }

    tui.restore()?;
    tracing::info!("explorer exited");
    Ok(())
}

use std::time::Duration;

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind, MouseEvent};
use tokio::sync::mpsc;

use crate::client::events::ClientEvent;
use crate::client::protocol::{DirItemInfo, ExtensionInfo, FileInfo, StateData};
use crate::error::{ClientError, Result};
use crate::explorer::loader::FetchTicket;

/// Application events.
#[derive(Debug)]
pub enum Event {
    /// A key press event.
    Key(KeyEvent),
    /// A mouse event.
    Mouse(MouseEvent),
    /// A periodic tick for rendering.
    Tick,
    /// Terminal resize event.
    Resize(u16, u16),
    /// Something the Core pushed, or the client becoming ready.
    Core(ClientEvent),
    /// A directory listing came back.
    Listed {
        ticket: FetchTicket,
        result: std::result::Result<Vec<DirItemInfo>, ClientError>,
    },
    /// A file read for the preview came back.
    Opened {
        path: String,
        result: std::result::Result<FileInfo, ClientError>,
    },
    /// Session state fetched during startup.
    SessionLoaded(std::result::Result<StateData, ClientError>),
    /// Installed extensions resolved during startup.
    ExtensionsLoaded(std::result::Result<Vec<ExtensionInfo>, ClientError>),
}

/// Async event handler that polls crossterm events and forwards them via a channel.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<Event>,
    tx: mpsc::UnboundedSender<Event>,
}

impl EventHandler {
    /// Create a new EventHandler with the given tick rate.
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let event_tx = tx.clone();

        // crossterm polling blocks, so it gets a thread of its own.
        tokio::task::spawn_blocking(move || loop {
            let event = if event::poll(tick_rate).unwrap_or(false) {
                match event::read() {
                    Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                        Event::Key(key)
                    }
                    Ok(CrosstermEvent::Mouse(mouse)) => Event::Mouse(mouse),
                    Ok(CrosstermEvent::Resize(w, h)) => Event::Resize(w, h),
                    _ => continue,
                }
            } else {
                Event::Tick
            };
            if event_tx.send(event).is_err() {
                break;
            }
        });

        Self { rx, tx }
    }

    /// Sender for background tasks and client subscriptions.
    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.tx.clone()
    }

    /// Receive the next event (blocks until available).
    pub async fn next(&mut self) -> Result<Event> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| crate::error::AppError::Terminal("Event channel closed".into()))
    }
}

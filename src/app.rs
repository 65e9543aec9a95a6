use std::time::{Duration, Instant};

use indexmap::IndexMap;

use crate::client::events::{ClientEvent, Popup};
use crate::client::protocol::{DirItemInfo, ExtensionInfo, FileFormat, FileInfo, StateData};
use crate::error::ClientError;
use crate::explorer::loader::{DirectoryLoader, FetchTicket, Toggle};
use crate::explorer::projection::{DisplayRow, RowState};
use crate::theme::ThemeColors;

/// How long a status message stays up.
const STATUS_TTL: Duration = Duration::from_secs(3);

/// Work the app wants done against the Core. The event loop runs it in the
/// background and feeds the answer back as an [`crate::event::Event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List {
        ticket: FetchTicket,
        filesystem: String,
    },
    Open {
        path: String,
        filesystem: String,
    },
}

/// What the preview panel currently shows.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PreviewState {
    pub path: Option<String>,
    pub lines: Vec<String>,
    /// Shown instead of content (loading, binary, unknown format).
    pub notice: Option<String>,
    pub scroll_offset: usize,
}

impl PreviewState {
    fn loading(path: &str) -> Self {
        Self {
            path: Some(path.to_string()),
            notice: Some("Loading…".into()),
            ..Default::default()
        }
    }
}

/// A transient message in the status bar.
#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
    pub created: Instant,
}

/// Called with every row the user activates.
pub type ItemSelectedHook = Box<dyn FnMut(&DisplayRow)>;

/// Main application state.
pub struct App {
    pub loader: DirectoryLoader,
    pub rows: Vec<DisplayRow>,
    rows_revision: u64,
    pub selected_index: usize,
    pub scroll_offset: usize,
    pub preview: PreviewState,
    pub popup: Option<Popup>,
    /// Extension status items keyed by id, in arrival order.
    pub status_items: IndexMap<String, String>,
    pub status_message: Option<StatusMessage>,
    pub extensions: Vec<ExtensionInfo>,
    pub session_state: Option<StateData>,
    pub connected: bool,
    pub should_quit: bool,
    pub theme: ThemeColors,
    item_selected: Option<ItemSelectedHook>,
}

impl App {
    pub fn new(route: &str, filesystem: &str, theme: ThemeColors) -> Self {
        let loader = DirectoryLoader::new(route, filesystem);
        let rows_revision = loader.revision();
        Self {
            loader,
            rows: Vec::new(),
            rows_revision,
            selected_index: 0,
            scroll_offset: 0,
            preview: PreviewState::default(),
            popup: None,
            status_items: IndexMap::new(),
            status_message: None,
            extensions: Vec::new(),
            session_state: None,
            connected: false,
            should_quit: false,
            theme,
            item_selected: None,
        }
    }

    /// Report every activated row, directory or file, to `hook`. Replaces any
    /// earlier hook.
    pub fn on_item_selected(&mut self, hook: impl FnMut(&DisplayRow) + 'static) {
        self.item_selected = Some(Box::new(hook));
    }

    pub fn route(&self) -> &str {
        self.loader.tree().route()
    }

    /// Re-project the tree when the loader has changed it.
    fn refresh_rows(&mut self) {
        if self.loader.revision() == self.rows_revision {
            return;
        }
        let selected_path = self.selected_row().map(|row| row.path.clone());
        self.rows = self.loader.rows();
        self.rows_revision = self.loader.revision();

        // Keep the cursor on the same entry when it survived the change.
        if let Some(path) = selected_path {
            if let Some(idx) = self.rows.iter().position(|row| row.path == path) {
                self.selected_index = idx;
            }
        }
        self.selected_index = self.selected_index.min(self.rows.len().saturating_sub(1));
    }

    pub fn selected_row(&self) -> Option<&DisplayRow> {
        self.rows.get(self.selected_index)
    }

    // ── Navigation ───────────────────────────────────────────────────────────

    /// Move selection down by one item.
    pub fn select_next(&mut self) {
        if self.selected_index + 1 < self.rows.len() {
            self.selected_index += 1;
        }
    }

    /// Move selection up by one item.
    pub fn select_previous(&mut self) {
        self.selected_index = self.selected_index.saturating_sub(1);
    }

    pub fn select_first(&mut self) {
        self.selected_index = 0;
    }

    pub fn select_last(&mut self) {
        self.selected_index = self.rows.len().saturating_sub(1);
    }

    /// Keep the selected row inside a viewport of `visible_height` rows.
    pub fn update_scroll(&mut self, visible_height: usize) {
        if visible_height == 0 {
            return;
        }
        if self.selected_index < self.scroll_offset {
            self.scroll_offset = self.selected_index;
        } else if self.selected_index >= self.scroll_offset + visible_height {
            self.scroll_offset = self.selected_index + 1 - visible_height;
        }
    }

    pub fn scroll_preview_down(&mut self, lines: usize) {
        let max = self.preview.lines.len().saturating_sub(1);
        self.preview.scroll_offset = (self.preview.scroll_offset + lines).min(max);
    }

    pub fn scroll_preview_up(&mut self, lines: usize) {
        self.preview.scroll_offset = self.preview.scroll_offset.saturating_sub(lines);
    }

    // ── Tree intents ─────────────────────────────────────────────────────────

    fn list(&self, ticket: FetchTicket) -> Command {
        Command::List {
            ticket,
            filesystem: self.loader.filesystem().to_string(),
        }
    }

    /// Request the listing of the configured route.
    pub fn load_root(&mut self) -> Option<Command> {
        let route = self.route().to_string();
        let ticket = self.loader.begin_expand(&route)?;
        Some(self.list(ticket))
    }

    /// Throw the tree away and list the route again.
    pub fn reload_root(&mut self) -> Option<Command> {
        let route = self.route().to_string();
        self.loader.reset(route);
        self.selected_index = 0;
        self.scroll_offset = 0;
        self.preview = PreviewState::default();
        self.refresh_rows();
        self.load_root()
    }

    /// Toggle the selected directory, or preview the selected file. Either
    /// way the row goes to the item-selected hook first.
    pub fn toggle_selected(&mut self) -> Option<Command> {
        let row = self.selected_row()?.clone();
        if let Some(hook) = self.item_selected.as_mut() {
            hook(&row);
        }
        if row.is_file {
            return self.open_selected();
        }
        match self.loader.begin_toggle(&row.path) {
            Toggle::Collapsed => {
                self.refresh_rows();
                None
            }
            Toggle::Fetch(ticket) => Some(self.list(ticket)),
            Toggle::Pending => {
                self.set_status_message(format!("Still loading {}", row.name), false);
                None
            }
            Toggle::Ignored => None,
        }
    }

    /// Open the selected directory if it is closed; preview files.
    pub fn expand_selected(&mut self) -> Option<Command> {
        let state = self.selected_row()?.state;
        match state {
            RowState::File | RowState::Collapsed => self.toggle_selected(),
            RowState::Expanded | RowState::Empty => None,
        }
    }

    /// Close the selected directory, or jump to the parent row.
    pub fn collapse_selected(&mut self) {
        let Some(row) = self.selected_row() else {
            return;
        };
        if row.state.is_open() {
            let path = row.path.clone();
            self.loader.collapse(&path);
            self.refresh_rows();
            return;
        }
        if row.depth == 0 {
            return;
        }
        let parent_depth = row.depth - 1;
        if let Some(idx) = self.rows[..self.selected_index]
            .iter()
            .rposition(|r| r.depth == parent_depth)
        {
            self.selected_index = idx;
        }
    }

    /// Read the selected file into the preview.
    pub fn open_selected(&mut self) -> Option<Command> {
        let row = self.selected_row()?;
        if !row.is_file {
            return None;
        }
        let path = row.path.clone();
        self.preview = PreviewState::loading(&path);
        Some(Command::Open {
            path,
            filesystem: self.loader.filesystem().to_string(),
        })
    }

    // ── Results from the Core ────────────────────────────────────────────────

    pub fn handle_listed(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<DirItemInfo>, ClientError>,
    ) {
        let path = ticket.path.clone();
        match self.loader.finish_expand(ticket, result) {
            Ok(_) => self.refresh_rows(),
            Err(e) => self.set_status_message(format!("Cannot list {}: {}", path, e), true),
        }
    }

    pub fn handle_opened(&mut self, path: String, result: Result<FileInfo, ClientError>) {
        // The user moved on to another file meanwhile.
        if self.preview.path.as_deref() != Some(path.as_str()) {
            return;
        }
        match result {
            Ok(info) => {
                self.preview = match info.format {
                    FileFormat::Text(_) => PreviewState {
                        path: Some(path),
                        lines: info.content.lines().map(str::to_string).collect(),
                        notice: None,
                        scroll_offset: 0,
                    },
                    FileFormat::Binary => PreviewState {
                        path: Some(path),
                        notice: Some("Binary file".into()),
                        ..Default::default()
                    },
                    FileFormat::Unknown => PreviewState {
                        path: Some(path),
                        notice: Some("Unknown file format".into()),
                        ..Default::default()
                    },
                };
            }
            Err(e) => {
                self.preview = PreviewState::default();
                self.set_status_message(format!("Cannot read {}: {}", path, e), true);
            }
        }
    }

    pub fn handle_client_event(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::Connected => {
                self.connected = true;
                self.set_status_message("Connected to Core".into(), false);
            }
            ClientEvent::ShowPopup(popup) => self.popup = Some(popup),
            ClientEvent::StateUpdated(state) => self.session_state = Some(state),
            ClientEvent::ShowStatusBarItem(item) => {
                self.status_items.insert(item.id, item.label);
            }
            ClientEvent::HideStatusBarItem { id } => {
                self.status_items.shift_remove(&id);
            }
        }
    }

    pub fn handle_session_loaded(&mut self, result: Result<StateData, ClientError>) {
        match result {
            Ok(state) => self.session_state = Some(state),
            Err(e) => self.set_status_message(format!("Cannot load session: {}", e), true),
        }
    }

    pub fn handle_extensions_loaded(&mut self, result: Result<Vec<ExtensionInfo>, ClientError>) {
        match result {
            Ok(extensions) => self.extensions = extensions,
            Err(e) => self.set_status_message(format!("Cannot list extensions: {}", e), true),
        }
    }

    // ── Chrome ───────────────────────────────────────────────────────────────

    pub fn dismiss_popup(&mut self) {
        self.popup = None;
    }

    pub fn set_status_message(&mut self, text: String, is_error: bool) {
        self.status_message = Some(StatusMessage {
            text,
            is_error,
            created: Instant::now(),
        });
    }

    /// Clear the status message once it has been up long enough.
    pub fn clear_expired_status(&mut self) {
        if let Some(msg) = &self.status_message {
            if msg.created.elapsed() > STATUS_TTL {
                self.status_message = None;
            }
        }
    }

    /// Quit the application.
    pub fn quit(&mut self) {
        self.should_quit = true;
    }
}

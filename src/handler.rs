use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};

use crate::app::{App, Command};

const PREVIEW_PAGE: usize = 10;

/// Handle a key event. Returns work for the Core, if any.
pub fn handle_key_event(app: &mut App, key: KeyEvent) -> Option<Command> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.quit();
        return None;
    }

    // A popup is modal: only dismissal gets through.
    if app.popup.is_some() {
        if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
            app.dismiss_popup();
        }
        return None;
    }

    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Up | KeyCode::Char('k') => app.select_previous(),
        KeyCode::Home | KeyCode::Char('g') => app.select_first(),
        KeyCode::End | KeyCode::Char('G') => app.select_last(),
        KeyCode::Enter | KeyCode::Char(' ') => return app.toggle_selected(),
        KeyCode::Right | KeyCode::Char('l') => return app.expand_selected(),
        KeyCode::Left | KeyCode::Char('h') => app.collapse_selected(),
        KeyCode::Char('r') => return app.reload_root(),
        KeyCode::PageDown => app.scroll_preview_down(PREVIEW_PAGE),
        KeyCode::PageUp => app.scroll_preview_up(PREVIEW_PAGE),
        _ => {}
    }
    None
}

/// Wheel scrolling moves the tree selection.
pub fn handle_mouse_event(app: &mut App, mouse: MouseEvent) {
    if app.popup.is_some() {
        return;
    }
    match mouse.kind {
        MouseEventKind::ScrollDown => app.select_next(),
        MouseEventKind::ScrollUp => app.select_previous(),
        _ => {}
    }
}

use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::Style,
    widgets::{Block, Borders},
    Frame,
};

use crate::app::App;
use crate::components::popup::PopupWidget;
use crate::components::preview::PreviewWidget;
use crate::components::status_bar::StatusBarWidget;
use crate::components::tree::TreeWidget;

/// Render the application UI: tree and preview side by side, status bar
/// underneath, popup on top.
pub fn render(app: &mut App, frame: &mut Frame) {
    app.clear_expired_status();

    let [main_area, status_area] = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .areas(frame.area());
    let [tree_area, preview_area] = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .areas(main_area);

    // Account for the border when keeping the selection in view.
    app.update_scroll(tree_area.height.saturating_sub(2) as usize);

    let theme = &app.theme;
    let tree_block = Block::default()
        .title(format!(" {} ", app.loader.tree().route()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border_focused_fg));
    frame.render_widget(
        TreeWidget::new(&app.rows, &app.loader, theme)
            .selection(app.selected_index, app.scroll_offset)
            .block(tree_block),
        tree_area,
    );

    let preview_title = app
        .preview
        .path
        .as_deref()
        .and_then(|p| p.rsplit(['/', '\\']).next())
        .unwrap_or("Preview");
    let preview_block = Block::default()
        .title(format!(" {} ", preview_title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border_fg));
    frame.render_widget(
        PreviewWidget::new(&app.preview, theme).block(preview_block),
        preview_area,
    );

    let path = app
        .selected_row()
        .map(|row| row.path.as_str())
        .unwrap_or_else(|| app.loader.tree().route());
    let mut status = StatusBarWidget::new(path, app.connected, theme)
        .items(app.status_items.values().map(String::as_str));
    if let Some(msg) = &app.status_message {
        status = status.status_message(&msg.text, msg.is_error);
    }
    frame.render_widget(status, status_area);

    if let Some(popup) = &app.popup {
        frame.render_widget(PopupWidget::new(popup, theme), frame.area());
    }
}

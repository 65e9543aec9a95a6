use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

use crate::theme::ThemeColors;

const KEY_HINTS: &str = " enter:toggle  r:reload  q:quit ";

/// Status bar: connection dot, selected path, extension items and key hints.
/// A status message takes over the whole bar while it is up.
pub struct StatusBarWidget<'a> {
    path_str: &'a str,
    connected: bool,
    items: Vec<&'a str>,
    theme: &'a ThemeColors,
    status_message: Option<&'a str>,
    is_error: bool,
}

impl<'a> StatusBarWidget<'a> {
    pub fn new(path_str: &'a str, connected: bool, theme: &'a ThemeColors) -> Self {
        Self {
            path_str,
            connected,
            items: Vec::new(),
            theme,
            status_message: None,
            is_error: false,
        }
    }

    pub fn items(mut self, items: impl IntoIterator<Item = &'a str>) -> Self {
        self.items = items.into_iter().collect();
        self
    }

    pub fn status_message(mut self, msg: &'a str, is_error: bool) -> Self {
        self.status_message = Some(msg);
        self.is_error = is_error;
        self
    }
}

/// Keep the tail of `s` so that it fits in `width` columns.
fn truncate_left(s: &str, width: usize) -> String {
    let count = s.chars().count();
    if count <= width {
        return s.to_string();
    }
    if width <= 1 {
        return s.chars().skip(count - width).collect();
    }
    let tail: String = s.chars().skip(count - (width - 1)).collect();
    format!("…{}", tail)
}

impl<'a> Widget for StatusBarWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }
        let width = area.width as usize;
        let base = Style::default()
            .bg(self.theme.status_bg)
            .fg(self.theme.status_fg);
        buf.set_style(area, base);

        if let Some(msg) = self.status_message {
            let style = if self.is_error {
                Style::default()
                    .bg(self.theme.error_fg)
                    .fg(self.theme.status_bg)
            } else {
                base.fg(self.theme.success_fg)
            };
            let display = format!("{:<width$}", truncate_left(msg, width), width = width);
            buf.set_line(area.x, area.y, &Line::from(Span::styled(display, style)), area.width);
            return;
        }

        let (dot, dot_style) = if self.connected {
            ("● ", base.fg(self.theme.success_fg))
        } else {
            ("○ ", base.fg(self.theme.warning_fg))
        };

        let items_display = if self.items.is_empty() {
            String::new()
        } else {
            format!(" {} ", self.items.join(" │ "))
        };

        let hints_len = KEY_HINTS.chars().count();
        let items_len = items_display.chars().count();
        let path_budget = width
            .saturating_sub(2)
            .saturating_sub(items_len)
            .saturating_sub(hints_len);
        let path_display = truncate_left(self.path_str, path_budget);
        let used = 2 + path_display.chars().count() + items_len + hints_len;

        let spans = vec![
            Span::styled(dot, dot_style),
            Span::styled(path_display, base),
            Span::raw(" ".repeat(width.saturating_sub(used))),
            Span::styled(
                items_display,
                base.fg(self.theme.accent_fg).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                KEY_HINTS,
                base.fg(self.theme.dim_fg).add_modifier(Modifier::DIM),
            ),
        ];
        buf.set_line(area.x, area.y, &Line::from(spans), area.width);
    }
}

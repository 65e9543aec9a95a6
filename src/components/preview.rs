use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Widget},
};

use crate::app::PreviewState;
use crate::theme::ThemeColors;

/// Preview widget that renders file content with a line-number gutter.
pub struct PreviewWidget<'a> {
    preview_state: &'a PreviewState,
    theme: &'a ThemeColors,
    block: Option<Block<'a>>,
}

impl<'a> PreviewWidget<'a> {
    pub fn new(preview_state: &'a PreviewState, theme: &'a ThemeColors) -> Self {
        Self {
            preview_state,
            theme,
            block: None,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = block.into();
        self
    }
}

impl<'a> Widget for PreviewWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = if let Some(block) = self.block {
            let inner = block.inner(area);
            block.render(area, buf);
            inner
        } else {
            area
        };

        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let state = self.preview_state;
        let placeholder = match (&state.notice, state.path.is_some()) {
            (Some(notice), _) => Some(notice.as_str()),
            (None, false) => Some("No preview"),
            (None, true) if state.lines.is_empty() => Some("Empty file"),
            _ => None,
        };
        if let Some(msg) = placeholder {
            let style = Style::default()
                .fg(self.theme.dim_fg)
                .add_modifier(Modifier::ITALIC);
            buf.set_line(inner.x, inner.y, &Line::from(Span::styled(msg, style)), inner.width);
            return;
        }

        let gutter = state.lines.len().to_string().len();
        let nr_style = Style::default().fg(self.theme.preview_line_nr_fg);
        let text_style = Style::default().fg(self.theme.preview_fg);

        let visible = inner.height as usize;
        let start = state.scroll_offset.min(state.lines.len());
        for (i, text) in state.lines[start..].iter().take(visible).enumerate() {
            let line = Line::from(vec![
                Span::styled(format!("{:>gutter$} ", start + i + 1), nr_style),
                Span::styled(text.as_str(), text_style),
            ]);
            buf.set_line(inner.x, inner.y + i as u16, &line, inner.width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme;
    use ratatui::widgets::Borders;

    fn row(buf: &Buffer, y: u16, width: u16) -> String {
        (0..width)
            .map(|x| buf.cell((x, y)).unwrap().symbol().to_string())
            .collect()
    }

    fn text_state(lines: &[&str]) -> PreviewState {
        PreviewState {
            path: Some("/f".into()),
            lines: lines.iter().map(|l| l.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_preview_shows_placeholder() {
        let state = PreviewState::default();
        let tc = theme::dark_theme();
        let widget = PreviewWidget::new(&state, &tc)
            .block(Block::default().borders(Borders::ALL).title(" Preview "));
        let area = Rect::new(0, 0, 30, 5);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);
        assert!(row(&buf, 1, 30).contains("No preview"));
    }

    #[test]
    fn test_notice_replaces_content() {
        let state = PreviewState {
            path: Some("/bin".into()),
            notice: Some("Binary file".into()),
            ..Default::default()
        };
        let tc = theme::dark_theme();
        let area = Rect::new(0, 0, 20, 2);
        let mut buf = Buffer::empty(area);
        PreviewWidget::new(&state, &tc).render(area, &mut buf);
        assert!(row(&buf, 0, 20).contains("Binary file"));
    }

    #[test]
    fn test_preview_with_line_numbers() {
        let state = text_state(&["line 1", "line 2", "line 3"]);
        let tc = theme::dark_theme();
        let area = Rect::new(0, 0, 20, 5);
        let mut buf = Buffer::empty(area);
        PreviewWidget::new(&state, &tc).render(area, &mut buf);
        assert!(row(&buf, 0, 20).starts_with("1 line 1"));
        assert!(row(&buf, 2, 20).starts_with("3 line 3"));
    }

    #[test]
    fn test_preview_scroll_offset() {
        let mut state = text_state(&["line 1", "line 2", "line 3"]);
        state.scroll_offset = 1;
        let tc = theme::dark_theme();
        let area = Rect::new(0, 0, 20, 3);
        let mut buf = Buffer::empty(area);
        PreviewWidget::new(&state, &tc).render(area, &mut buf);
        assert!(row(&buf, 0, 20).contains("2 line 2"));
    }

    #[test]
    fn test_empty_text_file() {
        let state = text_state(&[]);
        let tc = theme::dark_theme();
        let area = Rect::new(0, 0, 20, 2);
        let mut buf = Buffer::empty(area);
        PreviewWidget::new(&state, &tc).render(area, &mut buf);
        assert!(row(&buf, 0, 20).contains("Empty file"));
    }

    #[test]
    fn test_zero_area_no_panic() {
        let state = PreviewState::default();
        let tc = theme::dark_theme();
        let area = Rect::new(0, 0, 0, 0);
        let mut buf = Buffer::empty(area);
        PreviewWidget::new(&state, &tc).render(area, &mut buf);
    }
}

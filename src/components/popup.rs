use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Padding, Paragraph, Widget, Wrap},
};

use crate::client::events::Popup;
use crate::theme::ThemeColors;

const HINT: &str = "[Esc] Close";

/// Centered modal showing a popup pushed by the Core.
pub struct PopupWidget<'a> {
    popup: &'a Popup,
    theme: &'a ThemeColors,
}

impl<'a> PopupWidget<'a> {
    pub fn new(popup: &'a Popup, theme: &'a ThemeColors) -> Self {
        Self { popup, theme }
    }

    /// Calculate a centered rectangle within the given area.
    fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
        let w = width.min(area.width);
        let h = height.min(area.height);
        let x = area.x + area.width.saturating_sub(w) / 2;
        let y = area.y + area.height.saturating_sub(h) / 2;
        Rect::new(x, y, w, h)
    }
}

impl<'a> Widget for PopupWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let width = 60.min(area.width.saturating_sub(4));
        // Borders, padding and the hint line take five rows.
        let text_width = width.saturating_sub(4).max(1) as usize;
        let wrapped: usize = self
            .popup
            .content
            .lines()
            .map(|l| l.chars().count().max(1).div_ceil(text_width))
            .sum();
        let height = (wrapped as u16 + 5).min(area.height.saturating_sub(2));
        let rect = Self::centered_rect(width, height, area);
        if rect.width == 0 || rect.height == 0 {
            return;
        }

        Clear.render(rect, buf);

        let block = Block::default()
            .title(format!(" {} ", self.popup.title))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.popup_border_fg))
            .style(Style::default().bg(self.theme.popup_bg))
            .padding(Padding::uniform(1));

        let inner = block.inner(rect);
        block.render(rect, buf);
        if inner.height == 0 || inner.width == 0 {
            return;
        }

        let body = Rect::new(inner.x, inner.y, inner.width, inner.height.saturating_sub(1));
        Paragraph::new(self.popup.content.as_str())
            .wrap(Wrap { trim: false })
            .render(body, buf);

        let hint_style = Style::default()
            .fg(self.theme.dim_fg)
            .add_modifier(Modifier::DIM);
        buf.set_line(
            inner.x,
            inner.y + inner.height - 1,
            &Line::from(Span::styled(HINT, hint_style)),
            inner.width,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme;

    fn screen(buf: &Buffer, area: Rect) -> String {
        let mut out = String::new();
        for y in 0..area.height {
            for x in 0..area.width {
                out.push_str(buf.cell((x, y)).unwrap().symbol());
            }
            out.push('\n');
        }
        out
    }

    fn popup(content: &str) -> Popup {
        Popup {
            id: "p1".into(),
            title: "Extension".into(),
            content: content.into(),
        }
    }

    #[test]
    fn renders_title_content_and_hint() {
        let tc = theme::dark_theme();
        let p = popup("Indexing finished");
        let area = Rect::new(0, 0, 80, 20);
        let mut buf = Buffer::empty(area);
        PopupWidget::new(&p, &tc).render(area, &mut buf);

        let text = screen(&buf, area);
        assert!(text.contains("Extension"));
        assert!(text.contains("Indexing finished"));
        assert!(text.contains("[Esc] Close"));
    }

    #[test]
    fn centered_rect_is_centered() {
        let rect = PopupWidget::centered_rect(20, 4, Rect::new(0, 0, 80, 24));
        assert_eq!(rect, Rect::new(30, 10, 20, 4));
    }

    #[test]
    fn tiny_area_does_not_panic() {
        let tc = theme::dark_theme();
        let p = popup("x");
        let area = Rect::new(0, 0, 3, 2);
        let mut buf = Buffer::empty(area);
        PopupWidget::new(&p, &tc).render(area, &mut buf);
    }
}

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Widget},
};

use crate::explorer::loader::DirectoryLoader;
use crate::explorer::projection::{DisplayRow, RowState};
use crate::theme::ThemeColors;

/// Tree widget that renders projected rows with box-drawing guides.
pub struct TreeWidget<'a> {
    rows: &'a [DisplayRow],
    loader: &'a DirectoryLoader,
    theme: &'a ThemeColors,
    selected: usize,
    scroll_offset: usize,
    block: Option<Block<'a>>,
}

impl<'a> TreeWidget<'a> {
    pub fn new(rows: &'a [DisplayRow], loader: &'a DirectoryLoader, theme: &'a ThemeColors) -> Self {
        Self {
            rows,
            loader,
            theme,
            selected: 0,
            scroll_offset: 0,
            block: None,
        }
    }

    pub fn selection(mut self, selected: usize, scroll_offset: usize) -> Self {
        self.selected = selected;
        self.scroll_offset = scroll_offset;
        self
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    fn marker(&self, row: &DisplayRow) -> &'static str {
        if self.loader.is_pending(&row.path) {
            return "… ";
        }
        match row.state {
            RowState::File => "  ",
            RowState::Collapsed => "▸ ",
            RowState::Expanded => "▾ ",
            RowState::Empty => "▿ ",
        }
    }
}

/// For every row, whether no later sibling follows it under the same parent.
fn last_sibling_flags(rows: &[DisplayRow]) -> Vec<bool> {
    let mut flags = vec![false; rows.len()];
    // `seen[d]`: a sibling at depth d was already met further down.
    let mut seen: Vec<bool> = Vec::new();
    for (i, row) in rows.iter().enumerate().rev() {
        let depth = row.depth;
        if seen.len() <= depth {
            seen.resize(depth + 1, false);
        }
        flags[i] = !seen[depth];
        seen[depth] = true;
        seen.truncate(depth + 1);
    }
    flags
}

/// Guide columns for one row, e.g. `│  └──`.
fn build_prefix(rows: &[DisplayRow], last: &[bool], index: usize) -> String {
    let depth = rows[index].depth;
    let mut parts: Vec<&str> = Vec::with_capacity(depth + 1);

    for level in 0..depth {
        let ancestor_is_last = rows[..index]
            .iter()
            .rposition(|r| r.depth == level)
            .map(|j| last[j])
            .unwrap_or(true);
        parts.push(if ancestor_is_last { "   " } else { "│  " });
    }
    parts.push(if last[index] { "└─ " } else { "├─ " });
    parts.concat()
}

impl<'a> Widget for TreeWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = match &self.block {
            Some(block) => {
                let inner = block.inner(area);
                block.clone().render(area, buf);
                inner
            }
            None => area,
        };

        let visible_height = inner.height as usize;
        if visible_height == 0 || inner.width == 0 {
            return;
        }

        if self.rows.is_empty() {
            let msg = if self.loader.is_pending(self.loader.tree().route()) {
                "Loading…"
            } else {
                "Nothing here"
            };
            let line = Line::from(Span::styled(msg, Style::default().fg(self.theme.dim_fg)));
            buf.set_line(inner.x, inner.y, &line, inner.width);
            return;
        }

        let last = last_sibling_flags(self.rows);
        let guide_style = Style::default().fg(self.theme.tree_guide_fg);

        for (i, (idx, row)) in self
            .rows
            .iter()
            .enumerate()
            .skip(self.scroll_offset)
            .take(visible_height)
            .enumerate()
        {
            let style = if idx == self.selected {
                Style::default()
                    .bg(self.theme.tree_selected_bg)
                    .fg(self.theme.tree_selected_fg)
                    .add_modifier(Modifier::BOLD)
            } else if row.is_file {
                Style::default().fg(self.theme.tree_file_fg)
            } else {
                Style::default()
                    .fg(self.theme.tree_dir_fg)
                    .add_modifier(Modifier::BOLD)
            };

            let line = Line::from(vec![
                Span::styled(build_prefix(self.rows, &last, idx), guide_style),
                Span::styled(format!("{}{}", self.marker(row), row.name), style),
            ]);
            buf.set_line(inner.x, inner.y + i as u16, &line, inner.width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme;

    fn row(path: &str, depth: usize, state: RowState) -> DisplayRow {
        DisplayRow {
            path: path.into(),
            name: path.rsplit('/').next().unwrap_or(path).into(),
            is_file: state == RowState::File,
            depth,
            state,
        }
    }

    fn line_at(buf: &Buffer, y: u16, width: u16) -> String {
        (0..width)
            .map(|x| buf.cell((x, y)).unwrap().symbol().to_string())
            .collect()
    }

    /// a/ (open) -> a/x, a/y ; b
    fn sample() -> Vec<DisplayRow> {
        vec![
            row("/a", 0, RowState::Expanded),
            row("/a/x", 1, RowState::File),
            row("/a/y", 1, RowState::Empty),
            row("/b", 0, RowState::Collapsed),
        ]
    }

    #[test]
    fn last_sibling_flags_follow_structure() {
        assert_eq!(last_sibling_flags(&sample()), [false, false, true, true]);
    }

    #[test]
    fn prefix_draws_continuation_lines() {
        let rows = sample();
        let last = last_sibling_flags(&rows);
        assert_eq!(build_prefix(&rows, &last, 0), "├─ ");
        assert_eq!(build_prefix(&rows, &last, 1), "│  ├─ ");
        assert_eq!(build_prefix(&rows, &last, 2), "│  └─ ");
        assert_eq!(build_prefix(&rows, &last, 3), "└─ ");
    }

    #[test]
    fn renders_markers_and_names() {
        let rows = sample();
        let loader = DirectoryLoader::new("/", "local");
        let tc = theme::dark_theme();
        let area = Rect::new(0, 0, 30, 4);
        let mut buf = Buffer::empty(area);
        TreeWidget::new(&rows, &loader, &tc).render(area, &mut buf);

        assert!(line_at(&buf, 0, 30).contains("▾ a"));
        assert!(line_at(&buf, 1, 30).contains("x"));
        assert!(line_at(&buf, 2, 30).contains("▿ y"));
        assert!(line_at(&buf, 3, 30).contains("▸ b"));
    }

    #[test]
    fn pending_directory_shows_ellipsis() {
        let rows = vec![row("/b", 0, RowState::Collapsed)];
        let mut loader = DirectoryLoader::new("/", "local");
        loader.begin_expand("/b");
        let tc = theme::dark_theme();
        let area = Rect::new(0, 0, 20, 1);
        let mut buf = Buffer::empty(area);
        TreeWidget::new(&rows, &loader, &tc).render(area, &mut buf);
        assert!(line_at(&buf, 0, 20).contains("… b"));
    }

    #[test]
    fn scroll_offset_skips_rows() {
        let rows = sample();
        let loader = DirectoryLoader::new("/", "local");
        let tc = theme::dark_theme();
        let area = Rect::new(0, 0, 30, 1);
        let mut buf = Buffer::empty(area);
        TreeWidget::new(&rows, &loader, &tc)
            .selection(3, 3)
            .render(area, &mut buf);
        assert!(line_at(&buf, 0, 30).contains("b"));
        let cell = buf.cell((3, 0)).unwrap();
        assert_eq!(cell.bg, tc.tree_selected_bg);
    }

    #[test]
    fn empty_tree_shows_loading_while_root_pending() {
        let mut loader = DirectoryLoader::new("/", "local");
        loader.begin_expand("/");
        let tc = theme::dark_theme();
        let area = Rect::new(0, 0, 20, 2);
        let mut buf = Buffer::empty(area);
        TreeWidget::new(&[], &loader, &tc).render(area, &mut buf);
        assert!(line_at(&buf, 0, 20).contains("Loading"));
    }

    #[test]
    fn zero_area_does_not_panic() {
        let loader = DirectoryLoader::new("/", "local");
        let tc = theme::dark_theme();
        let area = Rect::new(0, 0, 0, 0);
        let mut buf = Buffer::empty(area);
        TreeWidget::new(&sample(), &loader, &tc).render(area, &mut buf);
    }
}
